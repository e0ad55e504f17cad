//! # Session Module
//!
//! Session management combining a tree, its label generator and a
//! volatile execution progress.
//!
//! - Progress is session-local state
//! - Never serialized
//! - Cleared whenever the tree changes shape
//!
//! A session is the single mutator of its tree: demonstrations are
//! incorporated one at a time, to completion.

use crate::encorporator::Encorporator;
use crate::identity::LabelGenerator;
use crate::primitives::DEFAULT_LABEL_START;
use crate::tree::ContiguityTree;
use crate::{ActionId, ContiguityError};
use std::collections::BTreeSet;
use tracing::debug;

// =============================================================================
// PROGRESS
// =============================================================================

/// Actions completed so far in the current execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Progress {
    completed: BTreeSet<ActionId>,
}

impl Progress {
    /// Create an empty progress.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Completed actions, ascending.
    #[must_use]
    pub fn completed(&self) -> &BTreeSet<ActionId> {
        &self.completed
    }

    /// Number of completed actions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.completed.len()
    }

    /// Whether nothing has been completed yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.completed.is_empty()
    }

    fn clear(&mut self) {
        self.completed.clear();
    }
}

// =============================================================================
// SESSION
// =============================================================================

/// A learner: one tree, one label generator, one execution in progress.
#[derive(Debug, Clone)]
pub struct Session {
    tree: ContiguityTree,
    labels: LabelGenerator,
    progress: Progress,
    demonstrations: u64,
}

impl Default for Session {
    fn default() -> Self {
        Self::with_label_start(DEFAULT_LABEL_START)
    }
}

impl Session {
    /// Create a new session with an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session whose labels start at `start`.
    #[must_use]
    pub fn with_label_start(start: u64) -> Self {
        Self {
            tree: ContiguityTree::new(),
            labels: LabelGenerator::starting_at(start),
            progress: Progress::new(),
            demonstrations: 0,
        }
    }

    /// The learned tree.
    #[must_use]
    pub fn tree(&self) -> &ContiguityTree {
        &self.tree
    }

    /// The current execution progress.
    #[must_use]
    pub fn progress(&self) -> &Progress {
        &self.progress
    }

    /// Number of demonstrations incorporated.
    #[must_use]
    pub fn demonstrations(&self) -> u64 {
        self.demonstrations
    }

    /// Incorporate a demonstration. Resets progress.
    pub fn observe(&mut self, demonstration: &[ActionId]) -> Result<(), ContiguityError> {
        Encorporator::incorporate(&mut self.tree, &mut self.labels, demonstration)?;
        self.demonstrations = self.demonstrations.saturating_add(1);
        self.progress.clear();
        debug!(
            demonstrations = self.demonstrations,
            leaves = self.tree.leaf_count(),
            "demonstration observed"
        );
        Ok(())
    }

    /// Actions that may legally run next.
    #[must_use]
    pub fn next_actions(&self) -> Vec<ActionId> {
        self.tree.next_possible_tasks(&self.progress.completed)
    }

    /// Mark `action` as done.
    ///
    /// Returns `ContiguityError::IllegalAction` if the tree does not allow it
    /// next; progress is left unchanged in that case.
    pub fn complete(&mut self, action: ActionId) -> Result<(), ContiguityError> {
        if !self.next_actions().contains(&action) {
            return Err(ContiguityError::IllegalAction(action));
        }
        self.progress.completed.insert(action);
        Ok(())
    }

    /// Forget the current execution.
    pub fn reset_progress(&mut self) {
        self.progress.clear();
    }

    /// Whether every known action has been completed.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        !self.tree.is_empty() && self.tree.is_completed_by(&self.progress.completed)
    }

    /// Whether the tree already accepts `execution` as a full run.
    #[must_use]
    pub fn accepts(&self, execution: &[ActionId]) -> bool {
        self.tree.accepts(execution)
    }

    /// The tree that incorporating `demonstration` would produce.
    ///
    /// Neither the tree nor the label generator of this session change.
    pub fn trial(&self, demonstration: &[ActionId]) -> Result<ContiguityTree, ContiguityError> {
        Encorporator::trial(&self.tree, &self.labels, demonstration)
    }
}

// =============================================================================
// TESTS
// =============================================================================
