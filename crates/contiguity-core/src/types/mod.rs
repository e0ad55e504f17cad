//! # Core Type Definitions
//!
//! This module contains the shared vocabulary of the contiguity engine:
//! - Host and arena identifiers (`ActionId`, `TaskId`)
//! - Traversal direction of an ordered run (`Direction`)
//! - Error types (`ContiguityError`)
//!
//! ## Determinism Guarantees
//!
//! All identifiers implement `Ord` so that arena storage can use
//! `BTreeMap`/`BTreeSet` and every walk over the tree is reproducible.

use crate::identity::Label;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Host-defined identifier of an atomic action.
///
/// Every action maps 1:1 to a Primitive in a tree. Reusing an `ActionId`
/// across demonstrations means "the same action".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ActionId(pub u64);

/// Stable arena index of a task inside one `ContiguityTree`.
///
/// Arena indices are never reused: a destroyed group leaves a hole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TaskId(pub u64);

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// =============================================================================
// DIRECTION
// =============================================================================

/// Direction in which a demonstration walks an ordered run, relative to
/// the run's stored order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Demonstration order equals stored order.
    Forward,
    /// Demonstration order is the exact reverse of stored order.
    Backward,
}

impl Direction {
    /// The opposite direction.
    #[must_use]
    pub const fn reverse(self) -> Self {
        match self {
            Self::Forward => Self::Backward,
            Self::Backward => Self::Forward,
        }
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the contiguity engine and its host.
///
/// Conflicting demonstrations are never errors: the tree loosens instead.
/// The variants below are either rejected input or contract breaches
/// inside the incorporation algorithm.
#[derive(Debug, Error)]
pub enum ContiguityError {
    /// A demonstration lists the same action more than once.
    #[error("Action {0:?} appears more than once in the demonstration")]
    DuplicateAction(ActionId),

    /// A demonstration exceeds `MAX_DEMONSTRATION_LENGTH`.
    #[error("Demonstration length {0} exceeds the maximum")]
    DemonstrationTooLong(usize),

    /// The requested task was not found in the tree.
    #[error("Task not found: {0}")]
    TaskNotFound(TaskId),

    /// A group operation was requested on a primitive.
    #[error("Task {0} is not a group")]
    NotAGroup(TaskId),

    /// A task that already has a parent was attached to a second group.
    #[error("Task {task} is already owned by {parent}")]
    AlreadyOwned { task: TaskId, parent: TaskId },

    /// A fragment label reached a path that only accepts canonical labels.
    #[error("Fragment label {0} used where a canonical label is required")]
    UnsealedLabel(Label),

    /// An action was completed that the tree does not allow next.
    #[error("Action {0:?} is not a legal next action")]
    IllegalAction(ActionId),

    /// An internal invariant of the tree was broken.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Host input could not be interpreted.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),
}

// =============================================================================
// TESTS
// =============================================================================
