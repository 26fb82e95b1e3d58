//! Typed query signatures, the memoized query cache, and the iteration
//! engine.
//!
//! ## Query model
//! A query is identified by its *signature*: the bitwise OR of the
//! component families named in a tuple of component types. The registry
//! memoizes, per distinct signature, the sparse set of slot indices whose
//! mask is a superset. The set is built once by scanning the mask array on
//! first use and maintained incrementally by every structural mutation
//! thereafter (see the `caches_*` helpers in the entity module).
//!
//! ## Execution model
//! - [`for_entities_with`](crate::engine::entity::EntityRegistry::for_entities_with)
//!   visits each cached slot sequentially with the entity handle and
//!   mutable references to the requested components.
//! - [`par_for_entities_with`](crate::engine::entity::EntityRegistry::par_for_entities_with)
//!   (behind the `parallel` feature) fans the visitor out across rayon
//!   worker threads with component references only.
//!
//! No ordering guarantee is given for the visited slots: the cache erases
//! by swap-with-last, so iteration order is unspecified and visitors must
//! not depend on it.
//!
//! ## Mutation during iteration
//! Both passes hold the registry exclusively, so a visitor cannot touch it
//! structurally and there is no aliasing to guard against at runtime. A
//! visitor that needs to create, destroy, or re-shape entities records the
//! operations into a [`CommandBuffer`](crate::engine::commands::CommandBuffer)
//! and applies it after the pass. A pass therefore visits exactly the
//! entities that matched the signature when it started.
//!
//! ## Safety
//! The per-slot fetch hands out `&mut` references derived from raw pool
//! pointers. Soundness rests on two invariants enforced here:
//! - the families of one tuple are distinct (a repeated type panics while
//!   the signature is built, in every build profile), so references for
//!   one slot never alias, and
//! - every slot in a cache satisfies the signature, so each family's pool
//!   is populated at that slot (mask/pool coherence).

use crate::engine::component::{family_of, Component};
use crate::engine::entity::EntityRegistry;
use crate::engine::error::DuplicateQueryComponentError;
use crate::engine::pool::{AnyPool, Pool};
use crate::engine::sparse::SparseSet;
use crate::engine::types::{ComponentMask, Entity, EntityId};
use crate::profiling::profiler;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Raw base pointer into one family's pool, captured for the duration of
/// a single iteration pass.
pub struct PoolPtr<C> {
    base: *mut C,
    len: usize,
}

impl<C> Clone for PoolPtr<C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C> Copy for PoolPtr<C> {}

// A PoolPtr is only ever dereferenced at distinct slot indices handed out
// by one iteration pass, so sending it across rayon workers is sound
// whenever the component itself is.
unsafe impl<C: Send> Send for PoolPtr<C> {}
unsafe impl<C: Sync> Sync for PoolPtr<C> {}

impl<C> PoolPtr<C> {
    /// Returns the component at `index`.
    ///
    /// ## Safety
    /// `index` must be below the pool length captured at creation, and no
    /// two live references to the same `index` may coexist.
    #[inline]
    unsafe fn slot<'a>(self, index: u32) -> &'a mut C {
        debug_assert!((index as usize) < self.len);
        unsafe { &mut *self.base.add(index as usize) }
    }
}

fn pool_ptr<C: Component>(pools: &mut [Option<Box<dyn AnyPool>>]) -> Option<PoolPtr<C>> {
    let family = family_of::<C>();
    let pool = pools.get_mut(family)?.as_mut()?;
    let pool = pool.as_any_mut().downcast_mut::<Pool<C>>()?;
    Some(PoolPtr {
        base: pool.base_ptr(),
        len: pool.len(),
    })
}

/// A non-empty tuple of component types naming a query signature.
///
/// Implemented for tuples of one through eight component types. The empty
/// tuple is deliberately not implemented: a query over no components is
/// rejected at compile time. Listing the same component type twice in one
/// tuple is a programming error; [`signature`](ComponentSet::signature)
/// panics with a diagnostic before any component is fetched.
pub trait ComponentSet {
    /// Mutable references to one slot's components.
    type Refs<'a>;

    /// Captured pool pointers for one iteration pass.
    type Ptrs: Copy + Send + Sync;

    /// The bitwise OR of the tuple's families. Symmetric under
    /// reordering of the tuple by construction.
    ///
    /// ## Panics
    /// Panics with [`DuplicateQueryComponentError`] if the tuple lists the
    /// same component type more than once.
    fn signature() -> ComponentMask;

    /// Captures base pointers to each family's pool, or `None` if any
    /// pool was never instantiated (the query then matches nothing).
    fn pointers(pools: &mut [Option<Box<dyn AnyPool>>]) -> Option<Self::Ptrs>;

    /// Materialises references to the components of `index`.
    ///
    /// ## Safety
    /// `index` must satisfy the signature (every pool populated at that
    /// slot), and the caller must not fetch the same slot twice while
    /// references are live.
    unsafe fn fetch<'a>(ptrs: Self::Ptrs, index: u32) -> Self::Refs<'a>;
}

macro_rules! component_set {
    ($(($ty:ident, $ptr:ident)),+) => {
        impl<$($ty: Component),+> ComponentSet for ($($ty,)+) {
            type Refs<'a> = ($(&'a mut $ty,)+);
            type Ptrs = ($(PoolPtr<$ty>,)+);

            fn signature() -> ComponentMask {
                let mut mask = ComponentMask::empty();
                $(
                    let family = family_of::<$ty>();
                    if mask.test(family) {
                        panic!(
                            "{}",
                            DuplicateQueryComponentError {
                                component: std::any::type_name::<$ty>(),
                            }
                        );
                    }
                    mask.set(family);
                )+
                mask
            }

            fn pointers(pools: &mut [Option<Box<dyn AnyPool>>]) -> Option<Self::Ptrs> {
                Some(($(pool_ptr::<$ty>(pools)?,)+))
            }

            unsafe fn fetch<'a>(ptrs: Self::Ptrs, index: u32) -> Self::Refs<'a> {
                let ($($ptr,)+) = ptrs;
                ($(unsafe { $ptr.slot(index) },)+)
            }
        }
    };
}

component_set!((A, a));
component_set!((A, a), (B, b));
component_set!((A, a), (B, b), (C, c));
component_set!((A, a), (B, b), (C, c), (D, d));
component_set!((A, a), (B, b), (C, c), (D, d), (E, e));
component_set!((A, a), (B, b), (C, c), (D, d), (E, e), (F, f));
component_set!((A, a), (B, b), (C, c), (D, d), (E, e), (F, f), (G, g));
component_set!((A, a), (B, b), (C, c), (D, d), (E, e), (F, f), (G, g), (H, h));

/// Returns the signature mask of a component tuple.
///
/// Exposed so hosts can key their own bookkeeping on the same value the
/// query cache uses.
pub fn signature_of<Q: ComponentSet>() -> ComponentMask {
    Q::signature()
}

impl EntityRegistry {
    /// Builds the cache for `signature` if it does not exist yet, by a
    /// single scan over the mask array.
    fn ensure_cache(&mut self, signature: ComponentMask) {
        if self.index_caches.contains_key(&signature) {
            return;
        }
        let _span = profiler::span("QueryCache::build");
        let mut set = SparseSet::with_capacity(self.masks.len());
        for (index, mask) in self.masks.iter().enumerate() {
            if mask.contains_all(&signature) {
                set.insert(index as u32);
            }
        }
        self.index_caches.insert(signature, set);
    }

    /// Returns the number of entities owning every component in `Q`,
    /// building the query cache on first use of the signature.
    pub fn number_of_entities_with<Q: ComponentSet>(&mut self) -> usize {
        let signature = Q::signature();
        self.ensure_cache(signature);
        self.index_caches[&signature].len()
    }

    /// Applies `f` to every entity owning all components in `Q`.
    ///
    /// The visitor receives the entity handle and mutable references to
    /// the requested components, in unspecified order. Entities marked for
    /// destruction but not yet flushed are still visited. Structural
    /// mutation from inside the visitor goes through a
    /// [`CommandBuffer`](crate::engine::commands::CommandBuffer) applied
    /// after the pass.
    pub fn for_entities_with<Q, F>(&mut self, mut f: F)
    where
        Q: ComponentSet,
        F: for<'a> FnMut(Entity, Q::Refs<'a>),
    {
        let signature = Q::signature();
        self.ensure_cache(signature);

        let Self {
            pools,
            index_caches,
            generations,
            ..
        } = self;
        let cache = &index_caches[&signature];
        if cache.is_empty() {
            return;
        }
        let Some(ptrs) = Q::pointers(pools) else {
            return;
        };

        for &index in cache.iter() {
            let entity = Entity::from_id(EntityId::new(index, generations[index as usize]));
            // Each cached slot satisfies the signature, and indices in a
            // sparse set are unique, so the fetched references are disjoint.
            let refs = unsafe { Q::fetch(ptrs, index) };
            f(entity, refs);
        }
    }

    /// Applies `f` to the components of every entity owning all components
    /// in `Q`, in parallel across rayon worker threads.
    ///
    /// The visitor receives component references only (no handle), and
    /// invocation order is unspecified. Every cached slot is visited
    /// exactly once. The exclusive borrow of the registry rules out
    /// structural mutation for the duration of the pass, and visitors
    /// writing to distinct slots of the listed families are data-race-free.
    #[cfg(feature = "parallel")]
    pub fn par_for_entities_with<Q, F>(&mut self, f: F)
    where
        Q: ComponentSet,
        F: for<'a> Fn(Q::Refs<'a>) + Send + Sync,
    {
        let signature = Q::signature();
        self.ensure_cache(signature);
        let _span = profiler::span("EntityRegistry::par_for_entities_with");

        let Self {
            pools,
            index_caches,
            ..
        } = self;
        let cache = &index_caches[&signature];
        if cache.is_empty() {
            return;
        }
        let Some(ptrs) = Q::pointers(pools) else {
            return;
        };

        cache.as_slice().par_iter().for_each(|&index| {
            // Indices in the cache are unique, so concurrent fetches
            // address disjoint slots.
            let refs = unsafe { Q::fetch(ptrs, index) };
            f(refs);
        });
    }
}
