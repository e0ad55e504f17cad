//! # Traversal
//!
//! Legal next actions under a completion state, and which partial
//! executions the tree permits.
//!
//! A group is *completed* when every leaf below it is completed and
//! *started* when at least one is. Children are contiguous blocks, so a
//! started child must be drained before any sibling is entered. Beyond
//! that:
//!
//! - sequential groups continue with their first incomplete child;
//! - reversible groups may start at either end, and once an end child is
//!   completed they continue from that end;
//! - unordered groups may enter any incomplete child.

use crate::task::{GroupLayout, TaskKind};
use crate::tree::ContiguityTree;
use crate::{ActionId, ContiguityError, TaskId};
use std::collections::{BTreeMap, BTreeSet};

/// Per-node completion counts for one traversal query.
struct Progress<'a> {
    tree: &'a ContiguityTree,
    done: BTreeMap<TaskId, usize>,
}

impl<'a> Progress<'a> {
    fn measure(tree: &'a ContiguityTree, completed: &BTreeSet<ActionId>) -> Self {
        let mut done = BTreeMap::new();
        let Some(root) = tree.root() else {
            return Self { tree, done };
        };
        let mut order = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            order.push(id);
            if let Ok(task) = tree.task(id)
                && let Some(group) = task.group()
            {
                stack.extend(group.sub_tasks());
            }
        }
        for id in order.into_iter().rev() {
            let Ok(task) = tree.task(id) else { continue };
            let count = match task.kind() {
                TaskKind::Primitive(action) => usize::from(completed.contains(action)),
                TaskKind::Group(group) => group
                    .sub_tasks()
                    .iter()
                    .map(|child| done.get(child).copied().unwrap_or(0))
                    .sum(),
            };
            done.insert(id, count);
        }
        Self { tree, done }
    }

    fn done(&self, id: TaskId) -> usize {
        self.done.get(&id).copied().unwrap_or(0)
    }

    fn is_completed(&self, id: TaskId) -> bool {
        self.tree
            .task(id)
            .is_ok_and(|task| self.done(id) >= task.absolute_size())
    }

    fn is_started(&self, id: TaskId) -> bool {
        self.done(id) > 0
    }

    fn collect(&self, id: TaskId, out: &mut Vec<ActionId>) {
        if self.is_completed(id) {
            return;
        }
        let Ok(task) = self.tree.task(id) else { return };
        let group = match task.kind() {
            TaskKind::Primitive(action) => {
                if !out.contains(action) {
                    out.push(*action);
                }
                return;
            }
            TaskKind::Group(group) => group,
        };
        let children = group.sub_tasks();

        if let Some(&open) = children
            .iter()
            .find(|&&child| self.is_started(child) && !self.is_completed(child))
        {
            self.collect(open, out);
            return;
        }

        match group.layout() {
            GroupLayout::Ordered { reversible, .. } => {
                let (Some(&first), Some(&last)) = (children.first(), children.last()) else {
                    return;
                };
                if self.is_completed(first) {
                    if let Some(&next) = children.iter().find(|&&c| !self.is_completed(c)) {
                        self.collect(next, out);
                    }
                } else if *reversible && self.is_completed(last) {
                    if let Some(&next) = children.iter().rev().find(|&&c| !self.is_completed(c)) {
                        self.collect(next, out);
                    }
                } else {
                    self.collect(first, out);
                    if *reversible {
                        self.collect(last, out);
                    }
                }
            }
            GroupLayout::Unordered => {
                for child in children {
                    self.collect(child, out);
                }
            }
        }
    }
}

impl ContiguityTree {
    /// Atomic actions that may legally run next.
    ///
    /// `completed` entries the tree does not know are ignored. The result
    /// is deduplicated and ordered by first discovery; it is empty when
    /// the tree is empty or fully completed.
    #[must_use]
    pub fn next_possible_tasks(&self, completed: &BTreeSet<ActionId>) -> Vec<ActionId> {
        let mut out = Vec::new();
        if let Some(root) = self.root() {
            let progress = Progress::measure(self, completed);
            progress.collect(root, &mut out);
        }
        out
    }

    /// Whether every leaf of the tree is in `completed`.
    #[must_use]
    pub fn is_completed_by(&self, completed: &BTreeSet<ActionId>) -> bool {
        self.actions().all(|action| completed.contains(&action))
    }

    /// Replay `execution` step by step from an empty completion state.
    ///
    /// True when every step is legal and the tree ends fully completed.
    #[must_use]
    pub fn accepts(&self, execution: &[ActionId]) -> bool {
        let mut completed = BTreeSet::new();
        for &action in execution {
            if !self.next_possible_tasks(&completed).contains(&action) {
                return false;
            }
            completed.insert(action);
        }
        self.is_completed_by(&completed)
    }

    /// Whether `partial` is some accepted execution restricted to its own
    /// actions.
    ///
    /// Unknown or repeated actions are never permitted. For a full
    /// execution this agrees with [`accepts`](Self::accepts).
    pub fn permits(&self, partial: &[ActionId]) -> Result<bool, ContiguityError> {
        let mut position = BTreeMap::new();
        for (at, &action) in partial.iter().enumerate() {
            if self.primitive_for(action).is_none() || position.insert(action, at).is_some() {
                return Ok(false);
            }
        }
        match self.root() {
            Some(root) => Ok(self.projection(root, &position)?.is_some()),
            None => Ok(partial.is_empty()),
        }
    }

    /// Sorted positions of the leaves below `id` that `position` names, or
    /// `None` when no execution of `id` restricts to them.
    ///
    /// Present children must occupy one run each, and the runs must follow
    /// the group's order when it has one.
    fn projection(
        &self,
        id: TaskId,
        position: &BTreeMap<ActionId, usize>,
    ) -> Result<Option<Vec<usize>>, ContiguityError> {
        let group = match self.task(id)?.kind() {
            TaskKind::Primitive(action) => {
                return Ok(Some(position.get(action).copied().into_iter().collect()));
            }
            TaskKind::Group(group) => group,
        };

        let mut tagged = Vec::new();
        for (rank, child) in group.sub_tasks().into_iter().enumerate() {
            let Some(found) = self.projection(child, position)? else {
                return Ok(None);
            };
            tagged.extend(found.into_iter().map(|at| (at, rank)));
        }
        tagged.sort_unstable();

        let mut runs: Vec<usize> = Vec::new();
        for &(_, rank) in &tagged {
            if runs.last() == Some(&rank) {
                continue;
            }
            if runs.contains(&rank) {
                return Ok(None);
            }
            runs.push(rank);
        }

        let fits = match group.layout() {
            GroupLayout::Ordered { reversible, .. } => {
                runs.is_sorted() || (*reversible && runs.iter().rev().is_sorted())
            }
            GroupLayout::Unordered => true,
        };
        Ok(fits.then(|| tagged.into_iter().map(|(at, _)| at).collect()))
    }
}

// =============================================================================
// TESTS
// =============================================================================
