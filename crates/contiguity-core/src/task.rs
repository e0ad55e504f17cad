//! # Task Model
//!
//! Nodes of a contiguity tree.
//!
//! A `Task` is either a `Primitive` (one atomic action) or a `Group` that
//! owns a set of child tasks. Groups come in two layouts:
//!
//! - `Ordered`: the children also carry an explicit sequence, the observed
//!   execution order. A `reversible` ordered group accepts the exact reverse
//!   of that sequence as well.
//! - `Unordered`: any permutation of the children is accepted.
//!
//! Parent links are arena indices, never ownership edges. All mutation goes
//! through `ContiguityTree`, which keeps the member set, the sequence and
//! the parent links consistent.

use crate::identity::Label;
use crate::{ActionId, TaskId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// =============================================================================
// TASK
// =============================================================================

/// A node stored in the tree arena.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub(crate) id: TaskId,
    pub(crate) label: Label,
    pub(crate) parent: Option<TaskId>,
    pub(crate) absolute_size: usize,
    pub(crate) kind: TaskKind,
}

/// Variant payload of a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskKind {
    /// Leaf: one atomic, indivisible action.
    Primitive(ActionId),
    /// Internal node.
    Group(Group),
}

impl Task {
    pub(crate) fn new_primitive(id: TaskId, label: Label, action: ActionId) -> Self {
        Self {
            id,
            label,
            parent: None,
            absolute_size: 1,
            kind: TaskKind::Primitive(action),
        }
    }

    pub(crate) fn new_group(id: TaskId, label: Label, layout: GroupLayout) -> Self {
        Self {
            id,
            label,
            parent: None,
            absolute_size: 0,
            kind: TaskKind::Group(Group {
                members: BTreeSet::new(),
                layout,
            }),
        }
    }

    /// Arena index of this task.
    #[must_use]
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Identity of this task.
    #[must_use]
    pub fn label(&self) -> Label {
        self.label
    }

    /// Owning group, `None` for the root and for detached tasks.
    #[must_use]
    pub fn parent(&self) -> Option<TaskId> {
        self.parent
    }

    /// Total number of leaves below (and including) this task.
    #[must_use]
    pub fn absolute_size(&self) -> usize {
        self.absolute_size
    }

    /// Variant payload.
    #[must_use]
    pub fn kind(&self) -> &TaskKind {
        &self.kind
    }

    /// The action of a primitive.
    #[must_use]
    pub fn action(&self) -> Option<ActionId> {
        match &self.kind {
            TaskKind::Primitive(action) => Some(*action),
            TaskKind::Group(_) => None,
        }
    }

    /// The group payload of an internal node.
    #[must_use]
    pub fn group(&self) -> Option<&Group> {
        match &self.kind {
            TaskKind::Primitive(_) => None,
            TaskKind::Group(group) => Some(group),
        }
    }

    pub(crate) fn group_mut(&mut self) -> Option<&mut Group> {
        match &mut self.kind {
            TaskKind::Primitive(_) => None,
            TaskKind::Group(group) => Some(group),
        }
    }

    /// Whether this task is a leaf.
    #[must_use]
    pub fn is_primitive(&self) -> bool {
        matches!(self.kind, TaskKind::Primitive(_))
    }

    /// Declared child count (0 for a primitive).
    #[must_use]
    pub fn size(&self) -> usize {
        self.group().map_or(0, Group::size)
    }
}

// =============================================================================
// GROUP
// =============================================================================

/// Internal node payload: a set of children plus an optional order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub(crate) members: BTreeSet<TaskId>,
    pub(crate) layout: GroupLayout,
}

/// Ordering constraint of a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroupLayout {
    /// Children must run in `sequence` order (or its exact reverse when
    /// `reversible`).
    Ordered {
        sequence: Vec<TaskId>,
        reversible: bool,
    },
    /// Children may run in any order.
    Unordered,
}

impl GroupLayout {
    /// An empty ordered layout.
    #[must_use]
    pub fn ordered(reversible: bool) -> Self {
        Self::Ordered {
            sequence: Vec::new(),
            reversible,
        }
    }
}

impl Group {
    /// Number of distinct children.
    #[must_use]
    pub fn size(&self) -> usize {
        self.members.len()
    }

    /// Membership test on the immediate child set.
    #[must_use]
    pub fn contains(&self, task: TaskId) -> bool {
        self.members.contains(&task)
    }

    /// Whether the order of the children is significant.
    #[must_use]
    pub fn is_ordered(&self) -> bool {
        matches!(self.layout, GroupLayout::Ordered { .. })
    }

    /// Whether the exact reverse of the sequence is also accepted.
    #[must_use]
    pub fn is_reversible(&self) -> bool {
        matches!(
            self.layout,
            GroupLayout::Ordered {
                reversible: true,
                ..
            }
        )
    }

    /// Ordered groups with a fixed direction.
    #[must_use]
    pub fn is_sequential(&self) -> bool {
        matches!(
            self.layout,
            GroupLayout::Ordered {
                reversible: false,
                ..
            }
        )
    }

    /// The layout of this group.
    #[must_use]
    pub fn layout(&self) -> &GroupLayout {
        &self.layout
    }

    /// Children in canonical iteration order: the sequence for ordered
    /// groups, ascending arena index for unordered ones.
    #[must_use]
    pub fn sub_tasks(&self) -> Vec<TaskId> {
        match &self.layout {
            GroupLayout::Ordered { sequence, .. } => sequence.clone(),
            GroupLayout::Unordered => self.members.iter().copied().collect(),
        }
    }

    /// Positional access into `sub_tasks`.
    #[must_use]
    pub fn get_sub_task(&self, index: usize) -> Option<TaskId> {
        match &self.layout {
            GroupLayout::Ordered { sequence, .. } => sequence.get(index).copied(),
            GroupLayout::Unordered => self.members.iter().nth(index).copied(),
        }
    }

    /// Display name of the group variant.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match &self.layout {
            GroupLayout::Ordered {
                reversible: false, ..
            } => "Sequential",
            GroupLayout::Ordered {
                reversible: true, ..
            } => "Reversible",
            GroupLayout::Unordered => "Unordered",
        }
    }

    pub(crate) fn push(&mut self, child: TaskId) {
        if self.members.insert(child)
            && let GroupLayout::Ordered { sequence, .. } = &mut self.layout
        {
            sequence.push(child);
        }
    }

    pub(crate) fn insert_at(&mut self, index: usize, child: TaskId) {
        if self.members.insert(child)
            && let GroupLayout::Ordered { sequence, .. } = &mut self.layout
        {
            let index = index.min(sequence.len());
            sequence.insert(index, child);
        }
    }

    pub(crate) fn remove(&mut self, child: TaskId) -> bool {
        if !self.members.remove(&child) {
            return false;
        }
        if let GroupLayout::Ordered { sequence, .. } = &mut self.layout {
            sequence.retain(|&t| t != child);
        }
        true
    }

    pub(crate) fn replace(&mut self, old: TaskId, new: TaskId) -> bool {
        if !self.members.remove(&old) {
            return false;
        }
        self.members.insert(new);
        if let GroupLayout::Ordered { sequence, .. } = &mut self.layout {
            for slot in sequence.iter_mut().filter(|slot| **slot == old) {
                *slot = new;
            }
        }
        true
    }

    /// Index of `child` in the sequence (ordered groups only).
    pub(crate) fn index_of(&self, child: TaskId) -> Option<usize> {
        match &self.layout {
            GroupLayout::Ordered { sequence, .. } => sequence.iter().position(|&t| t == child),
            GroupLayout::Unordered => None,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::LabelGenerator;

    fn ordered_group(reversible: bool) -> Task {
        let label = LabelGenerator::new().allocate().into();
        Task::new_group(TaskId(0), label, GroupLayout::ordered(reversible))
    }

    #[test]
    fn push_keeps_set_and_sequence_in_step() {
        let mut task = ordered_group(false);
        let group = task.group_mut().expect("group");
        group.push(TaskId(2));
        group.push(TaskId(1));
        group.push(TaskId(2));

        assert_eq!(group.size(), 2);
        assert_eq!(group.sub_tasks(), vec![TaskId(2), TaskId(1)]);
        assert!(group.contains(TaskId(1)));
    }

    #[test]
    fn replace_preserves_slot() {
        let mut task = ordered_group(true);
        let group = task.group_mut().expect("group");
        group.push(TaskId(1));
        group.push(TaskId(2));
        group.push(TaskId(3));

        assert!(group.replace(TaskId(2), TaskId(9)));
        assert_eq!(group.sub_tasks(), vec![TaskId(1), TaskId(9), TaskId(3)]);
        assert!(!group.contains(TaskId(2)));
        assert_eq!(group.index_of(TaskId(9)), Some(1));
    }

    #[test]
    fn insert_at_and_remove() {
        let mut task = ordered_group(false);
        let group = task.group_mut().expect("group");
        group.push(TaskId(1));
        group.push(TaskId(3));
        group.insert_at(1, TaskId(2));
        assert_eq!(group.get_sub_task(1), Some(TaskId(2)));

        assert!(group.remove(TaskId(1)));
        assert!(!group.remove(TaskId(1)));
        assert_eq!(group.sub_tasks(), vec![TaskId(2), TaskId(3)]);
    }

    #[test]
    fn names_follow_layout() {
        assert_eq!(ordered_group(false).group().map(Group::name), Some("Sequential"));
        assert_eq!(ordered_group(true).group().map(Group::name), Some("Reversible"));

        let label = LabelGenerator::new().allocate().into();
        let unordered = Task::new_group(TaskId(1), label, GroupLayout::Unordered);
        assert_eq!(unordered.group().map(Group::name), Some("Unordered"));
        assert!(!unordered.group().is_some_and(Group::is_ordered));
    }

    #[test]
    fn group_accessor_reads_constructed_group() {
        let label = LabelGenerator::new().allocate().into();
        let tasks = [
            Task::new_group(TaskId(0), label, GroupLayout::ordered(false)),
            Task::new_primitive(TaskId(1), label, ActionId(1)),
        ];

        let groups: Vec<Option<&Group>> = tasks.iter().map(Task::group).collect();
        assert!(groups[0].is_some_and(Group::is_sequential));
        assert!(groups[1].is_none());
        assert_eq!(tasks[0].absolute_size(), 0);
    }

    #[test]
    fn primitive_has_unit_size() {
        let label = LabelGenerator::new().allocate().into();
        let leaf = Task::new_primitive(TaskId(5), label, ActionId(42));
        assert_eq!(leaf.absolute_size(), 1);
        assert_eq!(leaf.size(), 0);
        assert_eq!(leaf.action(), Some(ActionId(42)));
        assert!(leaf.is_primitive());
    }
}
