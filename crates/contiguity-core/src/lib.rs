//! # contiguity-core
//!
//! The deterministic contiguity-tree engine - THE LOGIC.
//!
//! A contiguity tree is learned from demonstrations: ordered sequences of
//! atomic actions. Each internal node records a set of actions that has
//! always occurred as one unbroken block, and how its children were
//! ordered across every demonstration seen so far:
//!
//! - sequential groups: always in the stored order
//! - reversible groups: in the stored order or its exact reverse
//! - unordered groups: any order, children still contiguous
//!
//! ## Architectural Constraints
//!
//! - Pure Rust: no async, no network, no file I/O
//! - Deterministic: `BTreeMap`/`BTreeSet` only, no floats, no randomness
//! - Identities come from an injected `LabelGenerator`, never a global
//! - One incorporation at a time per tree; the tree is never observed
//!   mid-merge

// =============================================================================
// MODULES
// =============================================================================

pub mod demonstration;
pub mod encorporator;
pub mod identity;
mod incorporator;
pub mod metrics;
pub mod primitives;
pub mod session;
pub mod task;
pub mod traversal;
pub mod tree;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{ActionId, ContiguityError, Direction, TaskId};

// =============================================================================
// RE-EXPORTS: Tree Engine
// =============================================================================

pub use demonstration::Demonstration;
pub use encorporator::Encorporator;
pub use identity::{Label, LabelGenerator, SealedLabel};
pub use metrics::TreeMetrics;
pub use session::{Progress, Session};
pub use task::{Group, GroupLayout, Task, TaskKind};
pub use tree::{ContiguityTree, Shape, ShapeKind, TaskRef, content_equals};

// =============================================================================
// RE-EXPORTS: Constants
// =============================================================================

pub use primitives::{DEFAULT_LABEL_START, MAX_DEMONSTRATION_LENGTH, MAX_TREE_DEPTH};
