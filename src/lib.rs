//! # Rift
//!
//! An Entity-Component-System runtime for simulation loops running at
//! interactive frame rates.
//!
//! The runtime decomposes simulation state into *entities* (versioned
//! handles to storage slots), *components* (plain data records attached to
//! entities), and *systems* (bulk transformations over entities filtered
//! by which component types they own).
//!
//! ## Design
//! - **Versioned handles** — an [`Entity`] is a generation-tagged index;
//!   destruction bumps the generation, invalidating every outstanding copy
//!   at once.
//! - **Deferred destruction** — [`EntityRegistry::destroy`] marks;
//!   [`EntityRegistry::flush`] finalises at end of frame, so a system may
//!   destroy the entity it is currently visiting.
//! - **Bitmask-indexed pools** — each component family owns a dense pool
//!   addressed by slot index; the per-entity mask is the single source of
//!   truth for occupancy.
//! - **Cached queries** — each distinct signature memoizes the sparse set
//!   of matching slots, built once and maintained incrementally under
//!   every structural mutation.
//! - **Parallel iteration** — with the `parallel` feature,
//!   [`EntityRegistry::par_for_entities_with`] fans a visitor out across
//!   rayon workers over disjoint slots.
//!
//! ## Example
//! ```
//! use rift::prelude::*;
//!
//! #[derive(Default, Clone)]
//! struct Position { x: f64, y: f64 }
//! #[derive(Default, Clone)]
//! struct Direction { x: f64, y: f64 }
//!
//! struct Movement;
//!
//! impl System for Movement {
//!     fn update(&mut self, entities: &mut EntityRegistry, dt: f64) {
//!         entities.for_entities_with::<(Position, Direction), _>(|_, (p, d)| {
//!             p.x += d.x * dt;
//!             p.y += d.y * dt;
//!         });
//!     }
//! }
//!
//! let mut entities = EntityRegistry::new();
//! let mut systems = SystemRegistry::new();
//! systems.add(Movement);
//!
//! let e = entities.create_entity();
//! entities.add_component(e, Position::default());
//! entities.add_component(e, Direction { x: 1.0, y: 0.0 });
//!
//! systems.update_all(&mut entities, 1.0);
//! assert_eq!(entities.get_component::<Position>(e).x, 1.0);
//! ```

#![forbid(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]
#![allow(clippy::module_inception)]

pub mod engine;
pub mod profiling;

// ─────────────────────────────────────────────────────────────────────────────
// Re-exports (Public API)
// ─────────────────────────────────────────────────────────────────────────────

pub use engine::types::{
    ComponentMask, Entity, EntityId, Family, SystemFamily, MAX_COMPONENTS,
};

pub use engine::component::{family_count, family_desc, family_of, Component, FamilyDesc};

pub use engine::entity::EntityRegistry;

pub use engine::pool::{AnyPool, Pool};

pub use engine::sparse::SparseSet;

pub use engine::query::{signature_of, ComponentSet};

pub use engine::commands::CommandBuffer;

pub use engine::systems::{system_family_of, System, SystemRegistry, SystemSet};

pub use engine::error::{
    DuplicateComponentError, DuplicateQueryComponentError, DuplicateSystemError,
    FamilyCapacityError, MissingComponentError, MissingSystemError, RegistryError,
    StaleEntityError,
};

// ─────────────────────────────────────────────────────────────────────────────
// Prelude
// ─────────────────────────────────────────────────────────────────────────────

/// Commonly used types.
///
/// Import with:
/// ```rust
/// use rift::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        family_of, signature_of, CommandBuffer, Component, ComponentMask, Entity, EntityId,
        EntityRegistry, SparseSet, System, SystemRegistry,
    };
}
