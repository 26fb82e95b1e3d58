//! Core identifiers, bit-level layouts, and component masks.
//!
//! This module defines the **fundamental types and bit layouts** shared by
//! every subsystem of the runtime: entity identifiers, component family
//! ids, and the fixed-width component masks used for query signatures.
//!
//! ## Entity representation
//!
//! Entities are encoded as a packed 64-bit integer:
//!
//! ```text
//! | generation | index |
//! ```
//!
//! - **Index** identifies the slot in the registry's parallel arrays.
//! - **Generation** enables stale-handle detection after destruction.
//!
//! The halves are 32 bits each; the exact widths are fixed by compile-time
//! constants and validated with static assertions.
//!
//! ## Component masks
//!
//! A [`ComponentMask`] is a fixed-size array of `u64` words, one bit per
//! component family. Masks:
//!
//! - support fast bitwise comparison and subset tests,
//! - allow efficient iteration over set bits,
//! - serve both as per-entity component sets and as query signatures.
//!
//! ## Capacity
//!
//! The number of distinct component families is bounded by
//! [`MAX_COMPONENTS`] (128 by default, 256 with the `max-components-256`
//! feature). Exceeding the bound is a fatal configuration error enforced by
//! the family registry.

/// Bit-width type used for compile-time layout calculations.
pub type Bits = u8;

/// Dense integer identity of a component type within one process.
pub type Family = usize;

/// Dense integer identity of a system type within one process.
pub type SystemFamily = usize;

/// Maximum number of distinct component families.
pub const MAX_COMPONENTS: usize = if cfg!(feature = "max-components-256") {
    256
} else {
    128
};

/// Number of `u64` words required to represent a full component mask.
pub const MASK_WORDS: usize = (MAX_COMPONENTS + 63) / 64;

/// Total number of bits in a packed [`EntityId`].
pub const ENTITY_BITS: Bits = 64;
/// Number of bits reserved for the slot index.
pub const INDEX_BITS: Bits = 32;
/// Number of bits reserved for the generation counter.
pub const GENERATION_BITS: Bits = ENTITY_BITS - INDEX_BITS;

const _: [(); 1] = [(); (INDEX_BITS > 0) as usize];
const _: [(); 1] = [(); (INDEX_BITS < ENTITY_BITS) as usize];
const _: [(); 1] = [(); (INDEX_BITS + GENERATION_BITS == ENTITY_BITS) as usize];
const _: [(); 1] = [(); (MAX_COMPONENTS % 64 == 0) as usize];

const fn mask(bits: Bits) -> u64 {
    if bits == 0 {
        0
    } else if bits == 64 {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}

/// Mask selecting the index portion of a packed [`EntityId`].
pub const INDEX_MASK: u64 = mask(INDEX_BITS);

/// Versioned identifier for an entity slot.
///
/// An `EntityId` packs a 32-bit slot index and a 32-bit generation counter
/// into a single 64-bit value. The index addresses the registry's parallel
/// arrays; the generation detects stale identifiers after the slot has been
/// destroyed and reused.
///
/// ## Invariants
/// - Two ids are equal iff both index and generation are equal.
/// - Ordering is total over the packed 64-bit integer.
/// - [`EntityId::INVALID`] carries generation 0; live slots always have
///   generation `>= 1`.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct EntityId(u64);

impl EntityId {
    /// The invalid sentinel id (index 0, generation 0).
    pub const INVALID: EntityId = EntityId(0);

    /// Packs an index and a generation into an id.
    #[inline]
    pub const fn new(index: u32, generation: u32) -> Self {
        EntityId((index as u64) | ((generation as u64) << INDEX_BITS))
    }

    /// Returns the slot index encoded in this id.
    #[inline]
    pub const fn index(self) -> u32 {
        (self.0 & INDEX_MASK) as u32
    }

    /// Returns the generation encoded in this id.
    #[inline]
    pub const fn generation(self) -> u32 {
        (self.0 >> INDEX_BITS) as u32
    }

    /// Returns the packed 64-bit representation.
    #[inline]
    pub const fn to_bits(self) -> u64 {
        self.0
    }
}

impl Default for EntityId {
    fn default() -> Self {
        EntityId::INVALID
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ID(index={},version={})", self.index(), self.generation())
    }
}

/// Copyable handle to an entity.
///
/// The handle is the generation-tagged index itself: every operation goes
/// through the owning [`EntityRegistry`](crate::engine::entity::EntityRegistry),
/// which validates the generation before acting. A handle whose slot has
/// been destroyed and flushed is stale and panics on use.
///
/// Handles are cheap to copy, hash by `index XOR generation`, and order by
/// the packed id.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct Entity(EntityId);

impl Entity {
    /// An invalid handle, never valid in any registry.
    pub const INVALID: Entity = Entity(EntityId::INVALID);

    /// Wraps a raw id into a handle.
    #[inline]
    pub const fn from_id(id: EntityId) -> Self {
        Entity(id)
    }

    /// Returns the underlying versioned id.
    #[inline]
    pub const fn id(self) -> EntityId {
        self.0
    }

    /// Returns the slot index of this handle.
    #[inline]
    pub const fn index(self) -> u32 {
        self.0.index()
    }

    /// Returns the generation of this handle.
    #[inline]
    pub const fn generation(self) -> u32 {
        self.0.generation()
    }
}

impl std::hash::Hash for Entity {
    #[inline]
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        state.write_u32(self.0.index() ^ self.0.generation());
    }
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Entity({})", self.0)
    }
}

/// Fixed-width bit set over component families.
///
/// Bit `f` is set iff family `f` is a member. Masks are used both as the
/// per-entity component set and as query signatures; the query cache keys
/// its memo table on the mask value.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ComponentMask {
    words: [u64; MASK_WORDS],
}

impl Default for ComponentMask {
    fn default() -> Self {
        Self {
            words: [0u64; MASK_WORDS],
        }
    }
}

impl ComponentMask {
    /// Returns the empty mask.
    #[inline]
    pub const fn empty() -> Self {
        Self {
            words: [0u64; MASK_WORDS],
        }
    }

    /// Sets the bit for `family`.
    #[inline]
    pub fn set(&mut self, family: Family) {
        debug_assert!(family < MAX_COMPONENTS);
        self.words[family / 64] |= 1u64 << (family % 64);
    }

    /// Clears the bit for `family`.
    #[inline]
    pub fn clear(&mut self, family: Family) {
        debug_assert!(family < MAX_COMPONENTS);
        self.words[family / 64] &= !(1u64 << (family % 64));
    }

    /// Returns `true` if the bit for `family` is set.
    #[inline]
    pub fn test(&self, family: Family) -> bool {
        debug_assert!(family < MAX_COMPONENTS);
        (self.words[family / 64] >> (family % 64)) & 1 == 1
    }

    /// Returns `true` if every bit set in `other` is also set in `self`.
    #[inline]
    pub fn contains_all(&self, other: &ComponentMask) -> bool {
        self.words
            .iter()
            .zip(other.words.iter())
            .all(|(word, required)| (word & required) == *required)
    }

    /// Returns `true` if no bit is set.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&word| word == 0)
    }

    /// Returns the number of set bits.
    #[inline]
    pub fn count_ones(&self) -> u32 {
        self.words.iter().map(|word| word.count_ones()).sum()
    }

    /// Resets every bit.
    #[inline]
    pub fn reset(&mut self) {
        self.words = [0u64; MASK_WORDS];
    }

    /// Iterates over all set families in ascending order.
    pub fn ones(&self) -> impl Iterator<Item = Family> + '_ {
        self.words.iter().enumerate().flat_map(|(word_index, &word)| {
            let base = word_index * 64;
            let mut bits = word;
            std::iter::from_fn(move || {
                if bits == 0 {
                    return None;
                }
                let tz = bits.trailing_zeros() as usize;
                bits &= bits - 1;
                Some(base + tz)
            })
        })
    }
}

/// Builds a mask from a list of families.
pub fn mask_for(families: &[Family]) -> ComponentMask {
    let mut mask = ComponentMask::empty();
    for &family in families {
        mask.set(family);
    }
    mask
}
