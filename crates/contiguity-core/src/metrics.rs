//! # Tree Metrics
//!
//! Informational counts over a contiguity tree. Metrics never gate any
//! operation; the host prints them.

use crate::primitives::MAX_TREE_DEPTH;
use crate::task::TaskKind;
use crate::tree::ContiguityTree;
use serde::{Deserialize, Serialize};

/// Shape summary of a tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeMetrics {
    /// Total number of nodes.
    pub task_count: usize,
    /// Number of primitives.
    pub primitive_count: usize,
    /// Number of sequential (non-reversible ordered) groups.
    pub sequential_count: usize,
    /// Number of reversible ordered groups.
    pub reversible_count: usize,
    /// Number of unordered groups.
    pub unordered_count: usize,
    /// Leaf count of the root.
    pub leaf_count: usize,
    /// Depth of the deepest primitive (a root over primitives has depth 1).
    /// Walks stop at `MAX_TREE_DEPTH`.
    pub max_depth: usize,
}

impl TreeMetrics {
    /// Compute metrics from a tree.
    #[must_use]
    pub fn from_tree(tree: &ContiguityTree) -> Self {
        let mut metrics = Self::default();
        let Some(root) = tree.root() else {
            return metrics;
        };
        metrics.leaf_count = tree.absolute_size(root).unwrap_or(0);

        let mut stack = vec![(root, 0usize)];
        while let Some((id, depth)) = stack.pop() {
            let Ok(task) = tree.task(id) else { continue };
            metrics.task_count += 1;
            metrics.max_depth = metrics.max_depth.max(depth);
            match task.kind() {
                TaskKind::Primitive(_) => metrics.primitive_count += 1,
                TaskKind::Group(group) => {
                    if group.is_sequential() {
                        metrics.sequential_count += 1;
                    } else if group.is_reversible() {
                        metrics.reversible_count += 1;
                    } else {
                        metrics.unordered_count += 1;
                    }
                    if depth < MAX_TREE_DEPTH {
                        stack.extend(group.sub_tasks().into_iter().map(|c| (c, depth + 1)));
                    }
                }
            }
        }
        metrics
    }

    /// Number of groups of any layout.
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.sequential_count + self.reversible_count + self.unordered_count
    }
}
