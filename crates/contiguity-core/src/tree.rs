//! # Contiguity Tree
//!
//! The arena that owns every task of one tree.
//!
//! Tasks are addressed by `TaskId`; parent links are index-valued
//! back-references. Fragmentation and absorption become map edits:
//! remove a child index from its old owner, insert it into the new one.
//!
//! All data structures use `BTreeMap`/`BTreeSet` for deterministic ordering.

use crate::identity::{Label, SealedLabel};
use crate::task::{Group, GroupLayout, Task, TaskKind};
use crate::{ActionId, ContiguityError, TaskId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// STRUCTURAL SHAPE
// =============================================================================

/// Structural kind of a node, as seen by `content_equals`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    /// A leaf and its action.
    Primitive(ActionId),
    /// An ordered group.
    Ordered { reversible: bool },
    /// An unordered group.
    Unordered,
}

/// Anything that can be compared structurally: live tree nodes, nodes of
/// another tree, or drafts built during an incorporation.
pub trait Shape: Sized {
    /// Variant of this node.
    fn shape_kind(&self) -> ShapeKind;

    /// Total leaf count.
    fn leaf_count(&self) -> usize;

    /// Children in canonical iteration order.
    fn parts(&self) -> Vec<Self>;
}

/// Deep structural equality.
///
/// Same variant and leaf count; ordered groups match element-wise in
/// forward order, or in exact reverse when reversible; unordered groups
/// match under some bijection of their children. Labels are ignored.
pub fn content_equals<A: Shape, B: Shape>(a: &A, b: &B) -> bool {
    let kind = a.shape_kind();
    if kind != b.shape_kind() || a.leaf_count() != b.leaf_count() {
        return false;
    }
    match kind {
        ShapeKind::Primitive(_) => true,
        ShapeKind::Ordered { reversible } => {
            let left = a.parts();
            let right = b.parts();
            if left.len() != right.len() {
                return false;
            }
            let forward = left
                .iter()
                .zip(right.iter())
                .all(|(x, y)| content_equals(x, y));
            forward
                || (reversible
                    && left
                        .iter()
                        .zip(right.iter().rev())
                        .all(|(x, y)| content_equals(x, y)))
        }
        ShapeKind::Unordered => {
            let left = a.parts();
            let mut right: Vec<Option<B>> = b.parts().into_iter().map(Some).collect();
            if left.len() != right.len() {
                return false;
            }
            // Structural equality is an equivalence, so greedy matching suffices.
            left.iter().all(|x| {
                let matched = right
                    .iter()
                    .position(|slot| slot.as_ref().is_some_and(|y| content_equals(x, y)));
                match matched {
                    Some(index) => {
                        right[index] = None;
                        true
                    }
                    None => false,
                }
            })
        }
    }
}

/// Borrowed view of one node inside a tree.
#[derive(Debug, Clone, Copy)]
pub struct TaskRef<'a> {
    tree: &'a ContiguityTree,
    id: TaskId,
}

impl<'a> TaskRef<'a> {
    /// Arena index of the viewed node.
    #[must_use]
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// The tree the node lives in.
    #[must_use]
    pub fn tree(&self) -> &'a ContiguityTree {
        self.tree
    }
}

impl Shape for TaskRef<'_> {
    fn shape_kind(&self) -> ShapeKind {
        match self.tree.tasks.get(&self.id).map(|t| &t.kind) {
            Some(TaskKind::Primitive(action)) => ShapeKind::Primitive(*action),
            Some(TaskKind::Group(group)) => match group.layout {
                GroupLayout::Ordered { reversible, .. } => ShapeKind::Ordered { reversible },
                GroupLayout::Unordered => ShapeKind::Unordered,
            },
            // Dangling views compare equal only to other dangling views.
            None => ShapeKind::Unordered,
        }
    }

    fn leaf_count(&self) -> usize {
        self.tree
            .tasks
            .get(&self.id)
            .map_or(0, |t| t.absolute_size)
    }

    fn parts(&self) -> Vec<Self> {
        self.tree
            .tasks
            .get(&self.id)
            .and_then(Task::group)
            .map(|group| {
                group
                    .sub_tasks()
                    .into_iter()
                    .map(|id| TaskRef {
                        tree: self.tree,
                        id,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

// =============================================================================
// TREE
// =============================================================================

/// Arena owning every node of one contiguity tree.
///
/// Uses `BTreeMap` exclusively for deterministic ordering.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContiguityTree {
    /// Node storage: TaskId -> Task
    tasks: BTreeMap<TaskId, Task>,

    /// Reverse lookup: ActionId -> primitive TaskId
    action_index: BTreeMap<ActionId, TaskId>,

    /// Root group, `None` until the first demonstration.
    root: Option<TaskId>,

    /// Next available TaskId
    next_task_id: u64,
}

impl ContiguityTree {
    /// Create a new empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // -------------------------------------------------------------------------
    // Read API
    // -------------------------------------------------------------------------

    /// Root group, if any demonstration has been incorporated.
    #[must_use]
    pub fn root(&self) -> Option<TaskId> {
        self.root
    }

    /// Whether the tree has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Number of nodes in the arena.
    #[must_use]
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Number of distinct actions known to the tree.
    #[must_use]
    pub fn leaf_count(&self) -> usize {
        self.action_index.len()
    }

    /// Known actions, ascending.
    pub fn actions(&self) -> impl Iterator<Item = ActionId> + '_ {
        self.action_index.keys().copied()
    }

    /// All nodes, ascending by arena index.
    pub fn tasks(&self) -> impl Iterator<Item = &Task> + '_ {
        self.tasks.values()
    }

    /// Lookup a node.
    pub fn task(&self, id: TaskId) -> Result<&Task, ContiguityError> {
        self.tasks.get(&id).ok_or(ContiguityError::TaskNotFound(id))
    }

    /// Borrowed structural view of a node.
    pub fn task_ref(&self, id: TaskId) -> Result<TaskRef<'_>, ContiguityError> {
        self.task(id)?;
        Ok(TaskRef { tree: self, id })
    }

    /// Primitive registered for a host action.
    #[must_use]
    pub fn primitive_for(&self, action: ActionId) -> Option<TaskId> {
        self.action_index.get(&action).copied()
    }

    /// Identity of a node.
    pub fn label(&self, id: TaskId) -> Result<Label, ContiguityError> {
        Ok(self.task(id)?.label)
    }

    /// Total leaf count below a node.
    pub fn absolute_size(&self, id: TaskId) -> Result<usize, ContiguityError> {
        Ok(self.task(id)?.absolute_size)
    }

    fn group(&self, id: TaskId) -> Result<&Group, ContiguityError> {
        self.task(id)?
            .group()
            .ok_or(ContiguityError::NotAGroup(id))
    }

    /// Whether `task` is an immediate child of `group`.
    pub fn contains(&self, group: TaskId, task: TaskId) -> Result<bool, ContiguityError> {
        Ok(self.group(group)?.contains(task))
    }

    /// Positional access to a child.
    pub fn get_sub_task(
        &self,
        group: TaskId,
        index: usize,
    ) -> Result<Option<TaskId>, ContiguityError> {
        Ok(self.group(group)?.get_sub_task(index))
    }

    /// Index of the first child whose label loosely equals `label`.
    ///
    /// A fragment label finds the child it was derived from.
    pub fn lenient_index_of_sub_task(
        &self,
        group: TaskId,
        label: Label,
    ) -> Result<Option<usize>, ContiguityError> {
        let children = self.group(group)?.sub_tasks();
        for (index, child) in children.into_iter().enumerate() {
            if self.task(child)?.label == label {
                return Ok(Some(index));
            }
        }
        Ok(None)
    }

    /// Structural equality of two nodes of this tree.
    #[must_use]
    pub fn content_equals(&self, a: TaskId, b: TaskId) -> bool {
        self.content_equals_in(a, self, b)
    }

    /// Structural equality of a node of this tree and a node of `other`.
    #[must_use]
    pub fn content_equals_in(&self, a: TaskId, other: &ContiguityTree, b: TaskId) -> bool {
        match (self.task_ref(a), other.task_ref(b)) {
            (Ok(left), Ok(right)) => content_equals(&left, &right),
            _ => false,
        }
    }

    /// Whether both trees describe the same structure.
    #[must_use]
    pub fn structurally_equals(&self, other: &ContiguityTree) -> bool {
        match (self.root, other.root) {
            (None, None) => true,
            (Some(a), Some(b)) => self.content_equals_in(a, other, b),
            _ => false,
        }
    }

    /// Leaves below a node in stored order (ordered sequences forward,
    /// unordered members by arena index).
    ///
    /// The result is always an execution the subtree accepts.
    pub fn leaves_in_order(&self, id: TaskId) -> Result<Vec<ActionId>, ContiguityError> {
        let mut leaves = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            match &self.task(current)?.kind {
                TaskKind::Primitive(action) => leaves.push(*action),
                TaskKind::Group(group) => stack.extend(group.sub_tasks().into_iter().rev()),
            }
        }
        Ok(leaves)
    }

    /// Deep copy of the subtree at `id` into `into`.
    ///
    /// Labels are copied, not shared; the copy has no parent and the caller
    /// must attach it or make it a root.
    pub fn full_copy(
        &self,
        id: TaskId,
        into: &mut ContiguityTree,
    ) -> Result<TaskId, ContiguityError> {
        let task = self.task(id)?;
        let sealed = task
            .label
            .sealed()
            .ok_or(ContiguityError::UnsealedLabel(task.label))?;
        match &task.kind {
            TaskKind::Primitive(action) => into.insert_primitive(*action, sealed),
            TaskKind::Group(group) => {
                let layout = match group.layout {
                    GroupLayout::Ordered { reversible, .. } => GroupLayout::ordered(reversible),
                    GroupLayout::Unordered => GroupLayout::Unordered,
                };
                let copy = into.insert_group(sealed, layout);
                for child in group.sub_tasks() {
                    let child_copy = self.full_copy(child, into)?;
                    into.attach(copy, child_copy)?;
                }
                into.refresh_size(copy)?;
                Ok(copy)
            }
        }
    }

    /// Copy of the whole tree, built with `full_copy`.
    pub fn deep_copy(&self) -> Result<ContiguityTree, ContiguityError> {
        let mut copy = ContiguityTree::new();
        if let Some(root) = self.root {
            let new_root = self.full_copy(root, &mut copy)?;
            copy.set_root(new_root);
        }
        Ok(copy)
    }

    /// Verify every structural invariant of a stabilised tree.
    pub fn check_invariants(&self) -> Result<(), ContiguityError> {
        let violation = |msg: String| Err(ContiguityError::InvariantViolation(msg));

        let Some(root) = self.root else {
            if !self.tasks.is_empty() {
                return violation(format!("{} tasks without a root", self.tasks.len()));
            }
            return Ok(());
        };

        let root_task = self.task(root)?;
        if root_task.parent.is_some() {
            return violation(format!("root {} has a parent", root));
        }
        if root_task.group().is_none_or(|g| g.size() == 0) {
            return violation(format!("root {} is not a non-empty group", root));
        }

        let mut reached = BTreeSet::new();
        let mut labels = BTreeSet::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if !reached.insert(id) {
                return violation(format!("task {} reached twice", id));
            }
            let task = self.task(id)?;
            if task.label.is_piece() {
                return violation(format!("fragment label {} on task {}", task.label, id));
            }
            if !labels.insert(task.label.id()) {
                return violation(format!("label {} used twice", task.label));
            }
            let group = match &task.kind {
                TaskKind::Primitive(action) => {
                    if task.absolute_size != 1 {
                        return violation(format!("primitive {} has size {}", id, task.absolute_size));
                    }
                    if self.action_index.get(action) != Some(&id) {
                        return violation(format!("primitive {} not indexed", id));
                    }
                    continue;
                }
                TaskKind::Group(group) => group,
            };

            if id != root && group.size() < 2 {
                return violation(format!("group {} has {} children", id, group.size()));
            }
            if let GroupLayout::Ordered {
                sequence,
                reversible,
            } = &group.layout
            {
                let distinct: BTreeSet<TaskId> = sequence.iter().copied().collect();
                if distinct != group.members || sequence.len() != group.members.len() {
                    return violation(format!("group {} sequence disagrees with members", id));
                }
                if *reversible && sequence.len() == 2 {
                    return violation(format!("reversible pair {} is not canonical", id));
                }
            }

            let mut total = 0usize;
            for &child in &group.members {
                let child_task = self.task(child)?;
                if child_task.parent != Some(id) {
                    return violation(format!("child {} does not point back to {}", child, id));
                }
                if let Some(child_group) = child_task.group() {
                    let flattenable = (group.is_sequential() && child_group.is_sequential())
                        || (!group.is_ordered() && !child_group.is_ordered());
                    if flattenable {
                        return violation(format!(
                            "{} group {} nests {} group {}",
                            group.name(),
                            id,
                            child_group.name(),
                            child
                        ));
                    }
                }
                total = total.saturating_add(child_task.absolute_size);
                stack.push(child);
            }
            if total != task.absolute_size {
                return violation(format!(
                    "group {} has size {} but its children sum to {}",
                    id, task.absolute_size, total
                ));
            }
        }

        if reached.len() != self.tasks.len() {
            return violation(format!(
                "{} tasks unreachable from the root",
                self.tasks.len() - reached.len()
            ));
        }
        if self.action_index.len() != self.tasks.values().filter(|t| t.is_primitive()).count() {
            return violation("action index out of step with primitives".to_string());
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Crate-internal mutation
    // -------------------------------------------------------------------------

    fn allocate(&mut self) -> TaskId {
        let id = TaskId(self.next_task_id);
        self.next_task_id = self.next_task_id.saturating_add(1);
        id
    }

    pub(crate) fn task_mut(&mut self, id: TaskId) -> Result<&mut Task, ContiguityError> {
        self.tasks
            .get_mut(&id)
            .ok_or(ContiguityError::TaskNotFound(id))
    }

    fn group_mut(&mut self, id: TaskId) -> Result<&mut Group, ContiguityError> {
        self.task_mut(id)?
            .group_mut()
            .ok_or(ContiguityError::NotAGroup(id))
    }

    /// Register a new primitive for `action`.
    pub(crate) fn insert_primitive(
        &mut self,
        action: ActionId,
        label: SealedLabel,
    ) -> Result<TaskId, ContiguityError> {
        if let Some(existing) = self.action_index.get(&action) {
            return Err(ContiguityError::InvariantViolation(format!(
                "action {:?} already has primitive {}",
                action, existing
            )));
        }
        let id = self.allocate();
        self.tasks
            .insert(id, Task::new_primitive(id, label.into(), action));
        self.action_index.insert(action, id);
        Ok(id)
    }

    /// Create an empty, detached group.
    pub(crate) fn insert_group(&mut self, label: SealedLabel, layout: GroupLayout) -> TaskId {
        let id = self.allocate();
        self.tasks.insert(id, Task::new_group(id, label.into(), layout));
        id
    }

    fn check_attachable(&self, child: TaskId) -> Result<(), ContiguityError> {
        let task = self.task(child)?;
        if let Some(parent) = task.parent {
            return Err(ContiguityError::AlreadyOwned {
                task: child,
                parent,
            });
        }
        if task.label.is_piece() {
            return Err(ContiguityError::UnsealedLabel(task.label));
        }
        Ok(())
    }

    /// Append a detached, canonically labelled task to a group.
    pub(crate) fn attach(&mut self, group: TaskId, child: TaskId) -> Result<(), ContiguityError> {
        self.check_attachable(child)?;
        self.group_mut(group)?.push(child);
        self.task_mut(child)?.parent = Some(group);
        Ok(())
    }

    /// Insert a detached task at a sequence position of an ordered group.
    pub(crate) fn attach_at(
        &mut self,
        group: TaskId,
        index: usize,
        child: TaskId,
    ) -> Result<(), ContiguityError> {
        self.check_attachable(child)?;
        self.group_mut(group)?.insert_at(index, child);
        self.task_mut(child)?.parent = Some(group);
        Ok(())
    }

    /// Put a detached task in the slot currently held by `old`, detaching `old`.
    pub(crate) fn replace_child(&mut self, old: TaskId, new: TaskId) -> Result<(), ContiguityError> {
        self.check_attachable(new)?;
        match self.task(old)?.parent {
            Some(parent) => {
                self.group_mut(parent)?.replace(old, new);
                self.task_mut(new)?.parent = Some(parent);
            }
            None if self.root == Some(old) => self.root = Some(new),
            None => {}
        }
        self.task_mut(old)?.parent = None;
        Ok(())
    }

    /// Sequence index of a task inside its ordered parent.
    pub(crate) fn index_in_parent(&self, id: TaskId) -> Result<Option<usize>, ContiguityError> {
        match self.task(id)?.parent {
            Some(parent) => Ok(self.group(parent)?.index_of(id)),
            None => Ok(None),
        }
    }

    /// Detach a task from its parent.
    pub(crate) fn detach(&mut self, id: TaskId) -> Result<(), ContiguityError> {
        if let Some(parent) = self.task(id)?.parent {
            if let Some(task) = self.tasks.get_mut(&parent)
                && let Some(group) = task.group_mut()
            {
                group.remove(id);
            }
            self.task_mut(id)?.parent = None;
        }
        Ok(())
    }

    /// Drop a node from the arena. Children keep their (now dangling)
    /// parent links until reattached.
    pub(crate) fn remove(&mut self, id: TaskId) -> Result<Task, ContiguityError> {
        let task = self
            .tasks
            .remove(&id)
            .ok_or(ContiguityError::TaskNotFound(id))?;
        if let TaskKind::Primitive(action) = task.kind {
            self.action_index.remove(&action);
        }
        if self.root == Some(id) {
            self.root = None;
        }
        Ok(task)
    }

    pub(crate) fn set_root(&mut self, id: TaskId) {
        self.root = Some(id);
    }

    fn refresh_size(&mut self, id: TaskId) -> Result<usize, ContiguityError> {
        let children = match self.task(id)?.group() {
            Some(group) => group.sub_tasks(),
            None => return Ok(1),
        };
        let mut total = 0usize;
        for child in children {
            total = total.saturating_add(self.task(child)?.absolute_size);
        }
        self.task_mut(id)?.absolute_size = total;
        Ok(total)
    }

    /// Recompute `absolute_size` for every node reachable from the root.
    pub(crate) fn refresh_sizes(&mut self) -> Result<(), ContiguityError> {
        let Some(root) = self.root else {
            return Ok(());
        };
        // Post-order: reverse of a pre-order walk visits children first.
        let mut order = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            order.push(id);
            if let Some(group) = self.task(id)?.group() {
                stack.extend(group.sub_tasks());
            }
        }
        for id in order.into_iter().rev() {
            self.refresh_size(id)?;
        }
        Ok(())
    }

    /// Recompute `absolute_size` from `id` up to the root.
    pub(crate) fn refresh_ancestors(&mut self, id: TaskId) -> Result<(), ContiguityError> {
        let mut current = Some(id);
        while let Some(node) = current {
            self.refresh_size(node)?;
            current = self.task(node)?.parent;
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
