//! # Innate Primitives
//!
//! Hardcoded runtime constants for the contiguity CORE.
//!
//! The engine starts with an empty tree but fixed logic.
//! These primitives are compiled into the binary and are immutable at runtime.

/// Maximum number of actions in a single demonstration.
///
/// Demonstrations longer than this are rejected before any mutation,
/// bounding the cost of one incorporation.
pub const MAX_DEMONSTRATION_LENGTH: usize = 10000;

/// Maximum depth reported by bounded tree walks.
///
/// A valid tree cannot be deeper than its leaf count; this bound protects
/// metrics and rendering walks over a corrupted arena.
pub const MAX_TREE_DEPTH: usize = 1024;

/// First canonical label handed out by a fresh session.
pub const DEFAULT_LABEL_START: u64 = 1;
