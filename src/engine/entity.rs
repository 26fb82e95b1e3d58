//! Entity lifecycle, component attachment, and deferred destruction.
//!
//! ## Purpose
//! [`EntityRegistry`] owns every parallel array of the runtime: per-slot
//! component masks and generation counters, the free-slot stack, the
//! component pools, the pending-destroy set, and the query caches. An
//! [`Entity`](crate::engine::types::Entity) handle is nothing but a
//! generation-tagged index into those arrays.
//!
//! ## Entity model
//! - A slot is *live* when its index is not on the free stack; live slots
//!   have generation `>= 1`.
//! - A handle is *valid* iff its generation equals the slot's current
//!   generation. Destruction bumps the generation, invalidating every
//!   outstanding copy of the handle at once.
//!
//! ## Deferred destruction
//! `destroy` only marks the slot; the handle (and its components) stay
//! fully usable until [`flush`](EntityRegistry::flush) finalises the frame.
//! Marking is a set operation, so destroying the same entity repeatedly
//! within one frame is idempotent. `flush` removes the slot from every
//! query cache, clears its mask, bumps its generation, and returns the
//! index to the free stack.
//!
//! ## Cache coherence
//! Every path that flips a mask bit (add, remove, the flush side of
//! destroy, and the mask copy inside `create_copy_of`) funnels through the
//! `caches_*` helpers in this module, which update every cached signature
//! intersecting the flipped bit. Keeping those call sites centralised is
//! what keeps the memoized query results exact.
//!
//! ## Concurrency
//! The registry is single-threaded by construction: all structural
//! operations take `&mut self`. The one concurrent primitive, parallel
//! iteration, lives in the query module and forbids structural mutation by
//! construction.

use std::collections::HashMap;

use crate::engine::component::{family_of, Component};
use crate::engine::error::{DuplicateComponentError, MissingComponentError, StaleEntityError};
use crate::engine::pool::{AnyPool, Pool};
use crate::engine::sparse::SparseSet;
use crate::engine::types::{ComponentMask, Entity, EntityId, Family};
use crate::profiling::profiler;

/// Owner of all entity state: masks, generations, pools, and query caches.
///
/// ## Invariants (between public calls)
/// 1. Every slot is either on the free stack or live with generation
///    `>= 1`.
/// 2. A handle is valid iff its generation matches its slot's.
/// 3. For every family bit set in a live slot's mask, the family's pool
///    holds an addressable component at that slot.
/// 4. Every cached signature's sparse set equals the exact set of slots
///    whose mask is a superset of the signature. Slots marked for
///    destruction remain members until `flush`.
/// 5. `pending_destroy` holds each slot at most once.
pub struct EntityRegistry {
    /// Per-slot component masks.
    pub(crate) masks: Vec<ComponentMask>,
    /// Per-slot generation counters.
    pub(crate) generations: Vec<u32>,
    /// LIFO stack of reusable slot indices.
    pub(crate) free_indexes: Vec<u32>,
    /// Slots marked for destruction this frame.
    pub(crate) pending_destroy: SparseSet,
    /// Component pools indexed by family, lazily instantiated.
    pub(crate) pools: Vec<Option<Box<dyn AnyPool>>>,
    /// Memoized query results keyed by signature.
    pub(crate) index_caches: HashMap<ComponentMask, SparseSet>,
}

impl Default for EntityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Inserts `index` into every cache whose signature contains `family` and
/// is a subset of `mask`.
fn caches_insert_for_added(
    caches: &mut HashMap<ComponentMask, SparseSet>,
    family: Family,
    mask: &ComponentMask,
    index: u32,
) {
    for (signature, set) in caches.iter_mut() {
        if signature.test(family) && mask.contains_all(signature) {
            set.insert(index);
        }
    }
}

/// Erases `index` from every cache whose signature contains `family` and
/// was a subset of `mask` (the mask before the bit is cleared).
fn caches_erase_for_removed(
    caches: &mut HashMap<ComponentMask, SparseSet>,
    family: Family,
    mask: &ComponentMask,
    index: u32,
) {
    for (signature, set) in caches.iter_mut() {
        if signature.test(family) && mask.contains_all(signature) {
            set.erase(index);
        }
    }
}

/// Inserts `index` into every cache whose signature is a subset of `mask`.
/// Used when a whole mask appears at once (entity copy).
fn caches_insert_for_mask(
    caches: &mut HashMap<ComponentMask, SparseSet>,
    mask: &ComponentMask,
    index: u32,
) {
    for (signature, set) in caches.iter_mut() {
        if mask.contains_all(signature) {
            set.insert(index);
        }
    }
}

/// Erases `index` from every cache that contains it. Used when a whole
/// mask disappears at once (destroy flush, registry clear).
fn caches_erase_everywhere(caches: &mut HashMap<ComponentMask, SparseSet>, index: u32) {
    for set in caches.values_mut() {
        if set.contains(index) {
            set.erase(index);
        }
    }
}

impl EntityRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            masks: Vec::new(),
            generations: Vec::new(),
            free_indexes: Vec::new(),
            pending_destroy: SparseSet::new(),
            pools: Vec::new(),
            index_caches: HashMap::new(),
        }
    }

    /// Creates an empty registry with room for `capacity` entity slots.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            masks: Vec::with_capacity(capacity),
            generations: Vec::with_capacity(capacity),
            free_indexes: Vec::with_capacity(capacity),
            pending_destroy: SparseSet::with_capacity(capacity),
            pools: Vec::new(),
            index_caches: HashMap::new(),
        }
    }

    /// Asserts that `entity` is valid, panicking with a diagnostic if not.
    #[inline]
    #[track_caller]
    fn validate(&self, entity: Entity) {
        if !self.valid(entity) {
            panic!("{}", StaleEntityError { id: entity.id() });
        }
    }

    /// Returns `true` if the handle's generation matches its slot.
    #[inline]
    pub fn valid(&self, entity: Entity) -> bool {
        let index = entity.index() as usize;
        index < self.generations.len() && self.generations[index] == entity.generation()
    }

    /// Creates a new entity with an empty component mask.
    ///
    /// Reuses a free slot if one exists (its generation was already bumped
    /// when it was flushed), otherwise appends a fresh slot with
    /// generation 1. Never fails.
    pub fn create_entity(&mut self) -> Entity {
        let index = match self.free_indexes.pop() {
            Some(index) => index,
            None => {
                let index = self.masks.len() as u32;
                self.masks.push(ComponentMask::empty());
                self.generations.push(1);
                index
            }
        };
        Entity::from_id(EntityId::new(index, self.generations[index as usize]))
    }

    /// Creates a new entity that owns a copy of every component of
    /// `source`.
    ///
    /// The new entity's mask equals the source mask, each component is
    /// cloned pool-side, and the new slot joins every query cache whose
    /// signature the copied mask satisfies.
    ///
    /// ## Panics
    /// Panics if `source` is stale.
    #[track_caller]
    pub fn create_copy_of(&mut self, source: Entity) -> Entity {
        self.validate(source);
        let copy = self.create_entity();
        let source_index = source.index();
        let copy_index = copy.index();
        let mask = self.masks[source_index as usize];

        for family in mask.ones() {
            let pool = self.pools[family]
                .as_mut()
                .expect("mask bit set without a backing pool");
            pool.copy_slot(source_index, copy_index);
        }

        self.masks[copy_index as usize] = mask;
        caches_insert_for_mask(&mut self.index_caches, &mask, copy_index);
        copy
    }

    /// Marks `entity` (and thereby every copy of its handle) for
    /// destruction at the end of the frame.
    ///
    /// The handle stays valid and its components stay readable until
    /// [`flush`](Self::flush). Repeated calls within one frame are
    /// idempotent.
    ///
    /// ## Panics
    /// Panics if `entity` is stale.
    #[track_caller]
    pub fn destroy(&mut self, entity: Entity) {
        self.validate(entity);
        let index = entity.index();
        if !self.pending_destroy.contains(index) {
            self.pending_destroy.insert(index);
        }
    }

    /// Returns `true` if `entity` was marked for destruction this frame.
    ///
    /// ## Panics
    /// Panics if `entity` is stale.
    #[track_caller]
    pub fn marked_for_destruction(&self, entity: Entity) -> bool {
        self.validate(entity);
        self.pending_destroy.contains(entity.index())
    }

    /// Finalises every destruction marked since the previous flush.
    ///
    /// For each marked slot: removes it from every query cache, clears its
    /// mask, bumps its generation (invalidating all outstanding handles),
    /// and returns the index to the free stack. Component pools are left
    /// untouched; the next `insert` on a reused slot overwrites the stale
    /// value.
    ///
    /// Called once per frame by the host, typically at the tail of
    /// [`SystemRegistry::update_all`](crate::engine::systems::SystemRegistry::update_all).
    pub fn flush(&mut self) {
        let _span = profiler::span("EntityRegistry::flush");
        let Self {
            masks,
            generations,
            free_indexes,
            pending_destroy,
            index_caches,
            ..
        } = self;

        for &index in pending_destroy.iter() {
            caches_erase_everywhere(index_caches, index);
            masks[index as usize].reset();
            generations[index as usize] += 1;
            free_indexes.push(index);
        }
        pending_destroy.clear();
    }

    /// Attaches a component of type `C` to `entity`.
    ///
    /// The family's pool is instantiated lazily and grown before the mask
    /// bit is set, so the registry stays consistent if allocation aborts.
    /// Every query cache whose signature includes the family and is
    /// satisfied by the new mask gains the slot.
    ///
    /// ## Panics
    /// Panics if `entity` is stale or already owns a `C`.
    #[track_caller]
    pub fn add_component<C: Component>(&mut self, entity: Entity, value: C) {
        self.validate(entity);
        let family = family_of::<C>();
        let index = entity.index();
        if self.masks[index as usize].test(family) {
            panic!(
                "{}",
                DuplicateComponentError {
                    id: entity.id(),
                    component: std::any::type_name::<C>(),
                }
            );
        }

        self.pool_mut::<C>(family).insert(index, value);
        self.masks[index as usize].set(family);

        let mask = self.masks[index as usize];
        caches_insert_for_added(&mut self.index_caches, family, &mask, index);
    }

    /// Overwrites the `C` owned by `entity` with `value`.
    ///
    /// Mask and query caches are unchanged.
    ///
    /// ## Panics
    /// Panics if `entity` is stale or does not own a `C`.
    #[track_caller]
    pub fn replace_component<C: Component>(&mut self, entity: Entity, value: C) {
        self.validate(entity);
        let family = family_of::<C>();
        let index = entity.index();
        self.assert_owns::<C>(entity, family);
        self.pool_mut::<C>(family).replace(index, value);
    }

    /// Detaches the `C` owned by `entity`.
    ///
    /// Every query cache whose signature includes the family and was
    /// satisfied by the old mask loses the slot. The pool slot's contents
    /// are left in place until overwritten.
    ///
    /// ## Panics
    /// Panics if `entity` is stale or does not own a `C`.
    #[track_caller]
    pub fn remove_component<C: Component>(&mut self, entity: Entity) {
        self.validate(entity);
        let family = family_of::<C>();
        let index = entity.index();
        self.assert_owns::<C>(entity, family);

        let mask = self.masks[index as usize];
        caches_erase_for_removed(&mut self.index_caches, family, &mask, index);
        self.masks[index as usize].clear(family);
    }

    /// Returns `true` if `entity` owns a component of type `C`.
    ///
    /// ## Panics
    /// Panics if `entity` is stale.
    #[track_caller]
    pub fn has_component<C: Component>(&self, entity: Entity) -> bool {
        self.validate(entity);
        self.masks[entity.index() as usize].test(family_of::<C>())
    }

    /// Returns a mutable reference to the `C` owned by `entity`.
    ///
    /// ## Panics
    /// Panics if `entity` is stale or does not own a `C`.
    #[track_caller]
    pub fn get_component<C: Component>(&mut self, entity: Entity) -> &mut C {
        self.validate(entity);
        let family = family_of::<C>();
        self.assert_owns::<C>(entity, family);
        let index = entity.index();
        self.pool_mut::<C>(family).get_mut(index)
    }

    /// Returns a copy of the component mask of `entity`.
    ///
    /// ## Panics
    /// Panics if `entity` is stale.
    #[track_caller]
    pub fn component_mask(&self, entity: Entity) -> ComponentMask {
        self.validate(entity);
        self.masks[entity.index() as usize]
    }

    /// Number of live entities, including those marked for destruction but
    /// not yet flushed.
    #[inline]
    pub fn size(&self) -> usize {
        self.masks.len() - self.free_indexes.len()
    }

    /// Total number of slots ever allocated (live plus reusable).
    #[inline]
    pub fn capacity(&self) -> usize {
        self.masks.len()
    }

    /// Number of slots awaiting reuse.
    #[inline]
    pub fn number_of_reusable_entities(&self) -> usize {
        self.free_indexes.len()
    }

    /// Number of entities marked for destruction this frame.
    #[inline]
    pub fn number_of_entities_to_destroy(&self) -> usize {
        self.pending_destroy.len()
    }

    /// Drops every entity, component pool, query cache, and pending mark.
    ///
    /// All outstanding handles become invalid: their slots no longer
    /// exist. Generations restart from 1 for slots allocated afterwards.
    pub fn clear(&mut self) {
        self.masks.clear();
        self.generations.clear();
        self.free_indexes.clear();
        self.pending_destroy = SparseSet::new();
        self.pools.clear();
        self.index_caches.clear();
    }

    #[inline]
    #[track_caller]
    fn assert_owns<C: Component>(&self, entity: Entity, family: Family) {
        if !self.masks[entity.index() as usize].test(family) {
            panic!(
                "{}",
                MissingComponentError {
                    id: entity.id(),
                    component: std::any::type_name::<C>(),
                }
            );
        }
    }

    /// Returns the pool for `family`, instantiating it on first use.
    fn pool_mut<C: Component>(&mut self, family: Family) -> &mut Pool<C> {
        if self.pools.len() <= family {
            self.pools.resize_with(family + 1, || None);
        }
        self.pools[family]
            .get_or_insert_with(|| Box::new(Pool::<C>::default()))
            .as_any_mut()
            .downcast_mut::<Pool<C>>()
            .expect("family registered with a different component type")
    }
}
