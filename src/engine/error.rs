//! Diagnostic error types for contract violations.
//!
//! The runtime does not return errors through normal control flow: misuse
//! of the API contract (stale handles, duplicate components, capacity
//! overruns) is a programming error and aborts via panic. This module
//! declares the structured values those panics carry so that failures stay
//! actionable in logs without reproducing the issue.
//!
//! ## Goals
//! * **Specificity:** each type models a single failure mode.
//! * **Ergonomics:** every type implements [`std::error::Error`] and
//!   [`std::fmt::Display`], with `From<T>` conversions into the aggregate
//!   [`RegistryError`].
//! * **Actionability:** structured fields (offending id, component name,
//!   configured capacity) make the diagnostic self-contained.
//!
//! ## Display vs. Debug
//! * `Display` is a short, single-line message suitable for panic output.
//! * `Debug` (derived) retains full structure.

use std::fmt;

use crate::engine::types::EntityId;

/// Raised when an operation is attempted through a handle whose generation
/// no longer matches its slot.
///
/// Destruction bumps the slot's generation at flush time, which invalidates
/// every outstanding copy of the handle at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaleEntityError {
    /// The stale id that was presented.
    pub id: EntityId,
}

impl fmt::Display for StaleEntityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stale or dead entity reference {}", self.id)
    }
}

impl std::error::Error for StaleEntityError {}

/// Raised when `add` targets a family the entity already owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DuplicateComponentError {
    /// The entity that already owns the component.
    pub id: EntityId,
    /// Rust type name of the offending component.
    pub component: &'static str,
}

impl fmt::Display for DuplicateComponentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "entity {} already owns a component of type {}",
            self.id, self.component
        )
    }
}

impl std::error::Error for DuplicateComponentError {}

/// Raised when `get`, `replace`, or `remove` targets a family the entity
/// does not own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MissingComponentError {
    /// The entity that lacks the component.
    pub id: EntityId,
    /// Rust type name of the missing component.
    pub component: &'static str,
}

impl fmt::Display for MissingComponentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "entity {} does not own a component of type {}",
            self.id, self.component
        )
    }
}

impl std::error::Error for MissingComponentError {}

/// Raised when the same component type is listed more than once in a
/// query signature tuple.
///
/// A repeated type would make the iteration engine hand out two live
/// mutable references to the same pool slot, so the signature is rejected
/// before any fetch happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DuplicateQueryComponentError {
    /// Rust type name of the repeated component.
    pub component: &'static str,
}

impl fmt::Display for DuplicateQueryComponentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "component type {} appears more than once in a query signature",
            self.component
        )
    }
}

impl std::error::Error for DuplicateQueryComponentError {}

/// Raised when registering a component type would exceed the configured
/// family capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FamilyCapacityError {
    /// The configured maximum number of component families.
    pub capacity: usize,
}

impl fmt::Display for FamilyCapacityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "component family limit reached (capacity {})",
            self.capacity
        )
    }
}

impl std::error::Error for FamilyCapacityError {}

/// Aggregate error for the global family registries.
///
/// Registration failures are fatal configuration errors; callers observe
/// them as panics at the public boundary, with this value as the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryError {
    /// Family capacity was exhausted.
    CapacityExceeded(FamilyCapacityError),
    /// The registry lock was poisoned by a panic on another thread.
    PoisonedLock,
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::CapacityExceeded(e) => write!(f, "{e}"),
            RegistryError::PoisonedLock => f.write_str("family registry lock poisoned"),
        }
    }
}

impl std::error::Error for RegistryError {}

impl From<FamilyCapacityError> for RegistryError {
    fn from(e: FamilyCapacityError) -> Self {
        RegistryError::CapacityExceeded(e)
    }
}

/// Raised when `SystemRegistry::add` targets a system type that is already
/// managed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DuplicateSystemError {
    /// Rust type name of the offending system.
    pub system: &'static str,
}

impl fmt::Display for DuplicateSystemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a system of type {} is already managed", self.system)
    }
}

impl std::error::Error for DuplicateSystemError {}

/// Raised when `SystemRegistry::remove` or `get` targets an unmanaged
/// system type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MissingSystemError {
    /// Rust type name of the missing system.
    pub system: &'static str,
}

impl fmt::Display for MissingSystemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no system of type {} is managed", self.system)
    }
}

impl std::error::Error for MissingSystemError {}
