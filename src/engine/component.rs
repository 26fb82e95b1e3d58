//! Component trait and the global family registry.
//!
//! Every component type is assigned a dense integer *family* id at first
//! use, stable and monotone for the lifetime of the process. The family
//! indexes the registry's pool table and addresses one bit of a
//! [`ComponentMask`](crate::engine::types::ComponentMask).
//!
//! ## Design
//! - `by_type` maps `TypeId -> Family`; `by_id` stores a descriptor per
//!   assigned family for diagnostics.
//! - Ids are handed out sequentially until [`MAX_COMPONENTS`], after which
//!   registration is a fatal configuration error.
//!
//! ## Concurrency
//! The registry is a process-wide `RwLock`: concurrent lookups share the
//! read lock, first-use registration takes the write lock. The capacity
//! check releases the lock before panicking so the registry is never
//! poisoned by its own bound.

use std::any::{type_name, TypeId};
use std::collections::HashMap;
use std::sync::{OnceLock, RwLock};

use crate::engine::error::{FamilyCapacityError, RegistryError};
use crate::engine::types::{Family, MAX_COMPONENTS};

/// Marker trait for component types.
///
/// A component is a plain data record attached to at most one entity per
/// family. The bounds are the runtime's storage requirements:
///
/// - `Default` — pools grow by filling fresh slots with default values.
/// - `Clone` — [`create_copy_of`](crate::engine::entity::EntityRegistry::create_copy_of)
///   duplicates every component of the source entity.
/// - `Send + Sync + 'static` — components may be visited from worker
///   threads during parallel iteration.
///
/// The trait is blanket-implemented; any type meeting the bounds is a
/// component once it has been used with the registry.
pub trait Component: Send + Sync + Default + Clone + 'static {}

impl<T: Send + Sync + Default + Clone + 'static> Component for T {}

/// Describes a registered component family.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FamilyDesc {
    /// The assigned dense id.
    pub family: Family,
    /// Rust type name, for diagnostics.
    pub name: &'static str,
    /// Runtime type id of the component.
    pub type_id: TypeId,
}

struct FamilyRegistry {
    next: Family,
    by_type: HashMap<TypeId, Family>,
    by_id: Vec<FamilyDesc>,
}

impl FamilyRegistry {
    fn lookup(&self, type_id: TypeId) -> Option<Family> {
        self.by_type.get(&type_id).copied()
    }

    fn register(&mut self, type_id: TypeId, name: &'static str) -> Result<Family, RegistryError> {
        if let Some(existing) = self.lookup(type_id) {
            return Ok(existing);
        }
        if self.next >= MAX_COMPONENTS {
            return Err(FamilyCapacityError {
                capacity: MAX_COMPONENTS,
            }
            .into());
        }
        let family = self.next;
        self.next += 1;
        self.by_type.insert(type_id, family);
        self.by_id.push(FamilyDesc {
            family,
            name,
            type_id,
        });
        Ok(family)
    }
}

static REGISTRY: OnceLock<RwLock<FamilyRegistry>> = OnceLock::new();

fn registry() -> &'static RwLock<FamilyRegistry> {
    REGISTRY.get_or_init(|| {
        RwLock::new(FamilyRegistry {
            next: 0,
            by_type: HashMap::new(),
            by_id: Vec::new(),
        })
    })
}

fn try_family(type_id: TypeId, name: &'static str) -> Result<Family, RegistryError> {
    {
        let reg = registry().read().map_err(|_| RegistryError::PoisonedLock)?;
        if let Some(family) = reg.lookup(type_id) {
            return Ok(family);
        }
    }
    let mut reg = registry().write().map_err(|_| RegistryError::PoisonedLock)?;
    reg.register(type_id, name)
}

/// Returns the family id of `C`, assigning one on first use.
///
/// Ids are dense, stable, and monotone in order of first use.
///
/// ## Panics
/// Panics with [`FamilyCapacityError`] if the number of distinct component
/// types would exceed [`MAX_COMPONENTS`], and with
/// [`RegistryError::PoisonedLock`] if the registry was poisoned by an
/// unrelated panic. Both are fatal configuration errors.
pub fn family_of<C: Component>() -> Family {
    match try_family(TypeId::of::<C>(), type_name::<C>()) {
        Ok(family) => family,
        Err(e) => panic!("{e}"),
    }
}

/// Returns the descriptor for an assigned family, if any.
pub fn family_desc(family: Family) -> Option<FamilyDesc> {
    let reg = registry().read().ok()?;
    reg.by_id.get(family).copied()
}

/// Returns the number of families assigned so far.
pub fn family_count() -> usize {
    registry().read().map(|reg| reg.next).unwrap_or(0)
}
