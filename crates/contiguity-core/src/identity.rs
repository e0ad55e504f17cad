//! # Identity
//!
//! Labels identify tasks across merges. There are two kinds:
//!
//! - canonical labels, the only kind a stabilised tree contains;
//! - fragment labels, which exist only while a merge is in progress.
//!   When a group fails to stay contiguous in a new demonstration its
//!   pieces are tagged with a fragment label derived from the group's
//!   own label, recording how many pieces it was split into.
//!
//! A `Label` compares equal to any other `Label` with the same integer,
//! fragment or not. `strict_eq` additionally requires both to be canonical.
//! `SealedLabel` is the canonical-only type handed out by the generator.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

// =============================================================================
// LABEL
// =============================================================================

/// Integer identity of a task, optionally marked as a fragment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Label {
    id: u64,
    /// Number of sibling fragments; `None` for canonical labels.
    brotherhood: Option<u32>,
}

impl Label {
    /// Derive a fragment label from the label of the group that split.
    #[must_use]
    pub const fn piece(origin: Label, brotherhood: u32) -> Self {
        Self {
            id: origin.id,
            brotherhood: Some(brotherhood),
        }
    }

    /// The integer identity.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Whether this label marks a transient fragment.
    #[must_use]
    pub const fn is_piece(&self) -> bool {
        self.brotherhood.is_some()
    }

    /// Number of fragments the origin was split into; 1 when canonical.
    #[must_use]
    pub fn brotherhood_size(&self) -> u32 {
        self.brotherhood.unwrap_or(1)
    }

    /// Both canonical and the same integer.
    #[must_use]
    pub fn strict_eq(&self, other: &Label) -> bool {
        !self.is_piece() && !other.is_piece() && self.id == other.id
    }

    /// The canonical form of this label, if it is not a fragment.
    #[must_use]
    pub const fn sealed(&self) -> Option<SealedLabel> {
        match self.brotherhood {
            None => Some(SealedLabel(self.id)),
            Some(_) => None,
        }
    }
}

impl PartialEq for Label {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Label {}

impl Hash for Label {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl PartialOrd for Label {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Label {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.brotherhood {
            None => write!(f, "{}", self.id),
            Some(n) => write!(f, "{}/{}", self.id, n),
        }
    }
}

// =============================================================================
// SEALED LABEL
// =============================================================================

/// A label that is guaranteed canonical.
///
/// Only `LabelGenerator` and `Label::sealed` construct one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SealedLabel(u64);

impl SealedLabel {
    /// The integer identity.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.0
    }
}

impl From<SealedLabel> for Label {
    fn from(sealed: SealedLabel) -> Self {
        Self {
            id: sealed.0,
            brotherhood: None,
        }
    }
}

impl std::fmt::Display for SealedLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// GENERATOR
// =============================================================================

/// Monotonic supplier of canonical labels.
///
/// Passed explicitly into every incorporation so that independent trees
/// (and independent tests) never share a counter.
#[derive(Debug, Clone, Default)]
pub struct LabelGenerator {
    next_available_id: u64,
}

impl LabelGenerator {
    /// Create a generator starting at 0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a generator whose first label is `start`.
    #[must_use]
    pub const fn starting_at(start: u64) -> Self {
        Self {
            next_available_id: start,
        }
    }

    /// Allocate a fresh canonical label.
    pub fn allocate(&mut self) -> SealedLabel {
        let label = SealedLabel(self.next_available_id);
        self.next_available_id = self.next_available_id.saturating_add(1);
        label
    }

    /// Canonicalise a label: fragments get a fresh identity, canonical
    /// labels are returned unchanged.
    pub fn seal(&mut self, label: Label) -> SealedLabel {
        match label.sealed() {
            Some(sealed) => sealed,
            None => self.allocate(),
        }
    }

    /// The identity the next call to `allocate` will return.
    #[must_use]
    pub const fn peek(&self) -> u64 {
        self.next_available_id
    }
}

// =============================================================================
// TESTS
// =============================================================================
