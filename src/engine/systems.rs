//! System abstraction and the system registry.
//!
//! A **system** is a unit of bulk logic run once per frame against the
//! entity registry, typically iterating a query and transforming the
//! matched components. The [`SystemRegistry`] owns at most one instance of
//! each system type, indexed by a system family id assigned at first use
//! under the same scheme component families use.
//!
//! ## Execution model
//! [`SystemRegistry::update_all`] runs every managed system in family-id
//! order (stable across runs within a process, but not across builds) and
//! then flushes the entity registry, finalising the frame's deferred
//! destructions. [`SystemRegistry::update`] runs an explicit sequence of
//! system types in the listed order instead, with the same trailing flush.
//!
//! Systems receive `&mut EntityRegistry` and may mutate it freely between
//! their own iteration passes; the registry performs no scheduling beyond
//! the sequential order above.

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::sync::{OnceLock, RwLock};

use crate::engine::entity::EntityRegistry;
use crate::engine::error::{DuplicateSystemError, MissingSystemError, RegistryError};
use crate::engine::types::SystemFamily;
use crate::profiling::profiler;

/// A unit of per-frame logic over the entity registry.
///
/// ```
/// use rift::prelude::*;
///
/// #[derive(Default, Clone)]
/// struct Position { x: f64, y: f64 }
/// #[derive(Default, Clone)]
/// struct Direction { x: f64, y: f64 }
///
/// struct Movement;
///
/// impl System for Movement {
///     fn update(&mut self, entities: &mut EntityRegistry, dt: f64) {
///         entities.for_entities_with::<(Position, Direction), _>(|_, (p, d)| {
///             p.x += d.x * dt;
///             p.y += d.y * dt;
///         });
///     }
/// }
/// ```
pub trait System: 'static {
    /// Runs the system's transformation for one frame.
    fn update(&mut self, entities: &mut EntityRegistry, dt: f64);
}

struct SystemFamilies {
    next: SystemFamily,
    by_type: HashMap<TypeId, SystemFamily>,
}

static FAMILIES: OnceLock<RwLock<SystemFamilies>> = OnceLock::new();

fn families() -> &'static RwLock<SystemFamilies> {
    FAMILIES.get_or_init(|| {
        RwLock::new(SystemFamilies {
            next: 0,
            by_type: HashMap::new(),
        })
    })
}

fn try_system_family(type_id: TypeId) -> Result<SystemFamily, RegistryError> {
    {
        let reg = families().read().map_err(|_| RegistryError::PoisonedLock)?;
        if let Some(&family) = reg.by_type.get(&type_id) {
            return Ok(family);
        }
    }
    let mut reg = families().write().map_err(|_| RegistryError::PoisonedLock)?;
    if let Some(&family) = reg.by_type.get(&type_id) {
        return Ok(family);
    }
    let family = reg.next;
    reg.next += 1;
    reg.by_type.insert(type_id, family);
    Ok(family)
}

/// Returns the family id of system type `S`, assigning one at first use.
///
/// ## Panics
/// Panics with [`RegistryError::PoisonedLock`] if the registry was
/// poisoned by an unrelated panic. This is a fatal configuration error.
pub fn system_family_of<S: System>() -> SystemFamily {
    match try_system_family(TypeId::of::<S>()) {
        Ok(family) => family,
        Err(e) => panic!("{e}"),
    }
}

trait AnySystem: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn update_dyn(&mut self, entities: &mut EntityRegistry, dt: f64);
}

impl<S: System> AnySystem for S {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn update_dyn(&mut self, entities: &mut EntityRegistry, dt: f64) {
        self.update(entities, dt);
    }
}

/// Owner of at most one instance of each system type.
#[derive(Default)]
pub struct SystemRegistry {
    systems: Vec<Option<Box<dyn AnySystem>>>,
}

impl SystemRegistry {
    /// Creates an empty system registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of managed systems.
    pub fn len(&self) -> usize {
        self.systems.iter().filter(|slot| slot.is_some()).count()
    }

    /// Returns `true` if no system is managed.
    pub fn is_empty(&self) -> bool {
        self.systems.iter().all(|slot| slot.is_none())
    }

    /// Drops every managed system.
    pub fn clear(&mut self) {
        self.systems.clear();
    }

    /// Stores `system` as the managed instance of its type.
    ///
    /// ## Panics
    /// Panics if a system of type `S` is already managed.
    #[track_caller]
    pub fn add<S: System>(&mut self, system: S) {
        let family = system_family_of::<S>();
        if self.systems.len() <= family {
            self.systems.resize_with(family + 1, || None);
        }
        if self.systems[family].is_some() {
            panic!(
                "{}",
                DuplicateSystemError {
                    system: type_name::<S>(),
                }
            );
        }
        self.systems[family] = Some(Box::new(system));
    }

    /// Drops the managed instance of `S`.
    ///
    /// ## Panics
    /// Panics if no system of type `S` is managed.
    #[track_caller]
    pub fn remove<S: System>(&mut self) {
        let family = system_family_of::<S>();
        if !matches!(self.systems.get(family), Some(Some(_))) {
            panic!(
                "{}",
                MissingSystemError {
                    system: type_name::<S>(),
                }
            );
        }
        self.systems[family] = None;
    }

    /// Returns `true` if a system of type `S` is managed.
    pub fn has<S: System>(&self) -> bool {
        let family = system_family_of::<S>();
        matches!(self.systems.get(family), Some(Some(_)))
    }

    /// Returns the managed instance of `S`.
    ///
    /// ## Panics
    /// Panics if no system of type `S` is managed.
    #[track_caller]
    pub fn get<S: System>(&self) -> &S {
        self.fetch::<S>()
            .as_any()
            .downcast_ref::<S>()
            .expect("system stored under a different family")
    }

    /// Returns the managed instance of `S` mutably.
    ///
    /// ## Panics
    /// Panics if no system of type `S` is managed.
    #[track_caller]
    pub fn get_mut<S: System>(&mut self) -> &mut S {
        self.fetch_mut::<S>()
            .as_any_mut()
            .downcast_mut::<S>()
            .expect("system stored under a different family")
    }

    /// Runs every managed system in family-id order, then flushes the
    /// entity registry.
    pub fn update_all(&mut self, entities: &mut EntityRegistry, dt: f64) {
        let _span = profiler::span("SystemRegistry::update_all");
        for slot in self.systems.iter_mut() {
            if let Some(system) = slot {
                system.update_dyn(entities, dt);
            }
        }
        entities.flush();
    }

    /// Runs the listed system types in order, then flushes the entity
    /// registry.
    ///
    /// ## Panics
    /// Panics if any listed system type is not managed.
    #[track_caller]
    pub fn update<Seq: SystemSet>(&mut self, entities: &mut EntityRegistry, dt: f64) {
        let _span = profiler::span("SystemRegistry::update");
        Seq::run(self, entities, dt);
        entities.flush();
    }

    #[track_caller]
    fn fetch<S: System>(&self) -> &dyn AnySystem {
        let family = system_family_of::<S>();
        match self.systems.get(family) {
            Some(Some(system)) => system.as_ref(),
            _ => panic!(
                "{}",
                MissingSystemError {
                    system: type_name::<S>(),
                }
            ),
        }
    }

    #[track_caller]
    fn fetch_mut<S: System>(&mut self) -> &mut dyn AnySystem {
        let family = system_family_of::<S>();
        match self.systems.get_mut(family) {
            Some(Some(system)) => system.as_mut(),
            _ => panic!(
                "{}",
                MissingSystemError {
                    system: type_name::<S>(),
                }
            ),
        }
    }

    #[track_caller]
    fn run_one<S: System>(&mut self, entities: &mut EntityRegistry, dt: f64) {
        self.fetch_mut::<S>().update_dyn(entities, dt);
    }
}

/// A non-empty tuple of system types naming an execution sequence for
/// [`SystemRegistry::update`]. Implemented for tuples of one through
/// eight system types.
pub trait SystemSet {
    /// Runs each listed system in order.
    fn run(registry: &mut SystemRegistry, entities: &mut EntityRegistry, dt: f64);
}

macro_rules! system_set {
    ($($ty:ident),+) => {
        impl<$($ty: System),+> SystemSet for ($($ty,)+) {
            fn run(registry: &mut SystemRegistry, entities: &mut EntityRegistry, dt: f64) {
                $(registry.run_one::<$ty>(entities, dt);)+
            }
        }
    };
}

system_set!(A);
system_set!(A, B);
system_set!(A, B, C);
system_set!(A, B, C, D);
system_set!(A, B, C, D, E);
system_set!(A, B, C, D, E, F);
system_set!(A, B, C, D, E, F, G);
system_set!(A, B, C, D, E, F, G, H);
