//! # Incorporators
//!
//! Transient, per-group, per-merge objects that reconcile the outcomes of a
//! group's children against one demonstration.
//!
//! Every child first incorporates itself and reports either one *whole*
//! piece (its leaves form one contiguous block that respects its own order)
//! or several *fragments*. The incorporator then decides what the group
//! becomes:
//!
//! - `OrderedIncorporator` decomposes each gap-free run of pieces into
//!   common intervals of the stored order and the demonstration order.
//!   Runs that keep their order become sequential groups, runs walked
//!   backwards become reversible, tangled runs are demoted to unordered.
//! - `UnorderedIncorporator` only checks contiguity.
//!
//! A group whose leaves stay contiguous is *whole* and keeps its label;
//! otherwise it fragments and its composite pieces carry fragment labels
//! until the next level up seals them.
//!
//! Results are `Draft`s: planned structure over existing tasks, written into
//! the arena only once the whole tree has been reconciled.

use crate::identity::{Label, LabelGenerator};
use crate::task::{GroupLayout, Task};
use crate::tree::{ContiguityTree, Shape, ShapeKind, TaskRef, content_equals};
use crate::{ContiguityError, Direction, TaskId};
use tracing::{debug, trace};

// =============================================================================
// DRAFTS
// =============================================================================

/// Layout of a planned group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DraftLayout {
    Ordered { reversible: bool },
    Unordered,
}

impl DraftLayout {
    fn of(layout: &GroupLayout) -> Self {
        match layout {
            GroupLayout::Ordered { reversible, .. } => Self::Ordered {
                reversible: *reversible,
            },
            GroupLayout::Unordered => Self::Unordered,
        }
    }

    pub(crate) fn into_layout(self) -> GroupLayout {
        match self {
            Self::Ordered { reversible } => GroupLayout::ordered(reversible),
            Self::Unordered => GroupLayout::Unordered,
        }
    }
}

/// Planned structure produced by an incorporation.
#[derive(Debug, Clone)]
pub(crate) enum Draft {
    /// An existing subtree, kept exactly as it is.
    Existing(TaskId),
    /// A group to be (re)built from its planned children.
    Group {
        label: Label,
        layout: DraftLayout,
        leaves: usize,
        children: Vec<Draft>,
    },
}

impl Draft {
    fn group(
        tree: &ContiguityTree,
        label: Label,
        layout: DraftLayout,
        children: Vec<Draft>,
    ) -> Result<Self, ContiguityError> {
        let leaves = children
            .iter()
            .map(|child| child.leaf_count(tree))
            .sum::<Result<usize, _>>()?;
        Ok(Self::Group {
            label,
            layout,
            leaves,
            children,
        })
    }

    /// Leaves below this draft; `TaskNotFound` for a stale existing task.
    fn leaf_count(&self, tree: &ContiguityTree) -> Result<usize, ContiguityError> {
        match self {
            Self::Existing(id) => tree.absolute_size(*id),
            Self::Group { leaves, .. } => Ok(*leaves),
        }
    }

    fn layout(&self, tree: &ContiguityTree) -> Option<DraftLayout> {
        match self {
            Self::Existing(id) => tree
                .task(*id)
                .ok()
                .and_then(Task::group)
                .map(|group| DraftLayout::of(group.layout())),
            Self::Group { layout, .. } => Some(*layout),
        }
    }

    /// Children of a group draft, or the draft itself for a leaf.
    fn into_parts(self, tree: &ContiguityTree) -> Vec<Draft> {
        match self {
            Self::Existing(id) => match tree.task(id).ok().and_then(Task::group) {
                Some(group) => group.sub_tasks().into_iter().map(Self::Existing).collect(),
                None => vec![Self::Existing(id)],
            },
            Self::Group { children, .. } => children,
        }
    }

    /// Replace a fragment label with a fresh canonical one.
    fn seal(self, labels: &mut LabelGenerator) -> Self {
        match self {
            Self::Group {
                label,
                layout,
                leaves,
                children,
            } if label.is_piece() => {
                let sealed = labels.seal(label);
                trace!(fragment = %label, sealed = %sealed, "fragment sealed");
                Self::Group {
                    label: sealed.into(),
                    layout,
                    leaves,
                    children,
                }
            }
            other => other,
        }
    }

    /// Roots of the existing subtrees this draft keeps.
    pub(crate) fn collect_existing(&self, out: &mut Vec<TaskId>) {
        match self {
            Self::Existing(id) => out.push(*id),
            Self::Group { children, .. } => {
                for child in children {
                    child.collect_existing(out);
                }
            }
        }
    }
}

/// Build an unordered draft, absorbing unordered children.
pub(crate) fn build_unordered(
    tree: &ContiguityTree,
    label: Label,
    children: Vec<Draft>,
) -> Result<Draft, ContiguityError> {
    let mut flat = Vec::with_capacity(children.len());
    for child in children {
        if child.layout(tree) == Some(DraftLayout::Unordered) {
            flat.extend(child.into_parts(tree));
        } else {
            flat.push(child);
        }
    }
    Draft::group(tree, label, DraftLayout::Unordered, flat)
}

/// Build an ordered draft from children listed in stored order.
///
/// A sequential group absorbs sequential children. A reversible pair
/// accepts every order of its two children and is built as unordered.
pub(crate) fn build_ordered(
    tree: &ContiguityTree,
    label: Label,
    reversible: bool,
    children: Vec<Draft>,
) -> Result<Draft, ContiguityError> {
    if reversible && children.len() == 2 {
        return build_unordered(tree, label, children);
    }
    let sequential = DraftLayout::Ordered { reversible: false };
    let mut flat = Vec::with_capacity(children.len());
    for child in children {
        if !reversible && child.layout(tree) == Some(sequential) {
            flat.extend(child.into_parts(tree));
        } else {
            flat.push(child);
        }
    }
    Draft::group(tree, label, DraftLayout::Ordered { reversible }, flat)
}

// =============================================================================
// STRUCTURAL VIEW OF DRAFTS
// =============================================================================

/// A draft or live node, comparable with `content_equals`.
#[derive(Debug, Clone, Copy)]
pub(crate) enum DraftRef<'a> {
    Live(TaskRef<'a>),
    Planned(&'a ContiguityTree, &'a Draft),
}

impl<'a> DraftRef<'a> {
    pub(crate) fn new(tree: &'a ContiguityTree, draft: &'a Draft) -> Self {
        match draft {
            Draft::Existing(id) => match tree.task_ref(*id) {
                Ok(live) => Self::Live(live),
                Err(_) => Self::Planned(tree, draft),
            },
            Draft::Group { .. } => Self::Planned(tree, draft),
        }
    }
}

impl Shape for DraftRef<'_> {
    fn shape_kind(&self) -> ShapeKind {
        match self {
            Self::Live(live) => live.shape_kind(),
            Self::Planned(_, Draft::Group { layout, .. }) => match layout {
                DraftLayout::Ordered { reversible } => ShapeKind::Ordered {
                    reversible: *reversible,
                },
                DraftLayout::Unordered => ShapeKind::Unordered,
            },
            Self::Planned(_, Draft::Existing(_)) => ShapeKind::Unordered,
        }
    }

    fn leaf_count(&self) -> usize {
        match self {
            Self::Live(live) => live.leaf_count(),
            // Group drafts carry a count checked when they were built.
            Self::Planned(_, Draft::Group { leaves, .. }) => *leaves,
            Self::Planned(_, Draft::Existing(_)) => 0,
        }
    }

    fn parts(&self) -> Vec<Self> {
        match self {
            Self::Live(live) => live.parts().into_iter().map(Self::Live).collect(),
            Self::Planned(tree, Draft::Group { children, .. }) => children
                .iter()
                .map(|child| DraftRef::new(tree, child))
                .collect(),
            Self::Planned(_, Draft::Existing(_)) => Vec::new(),
        }
    }
}

/// `Existing(group)` when `draft` describes the same structure as `group`.
fn keep_if_unchanged(
    tree: &ContiguityTree,
    group: TaskId,
    draft: Draft,
) -> Result<Draft, ContiguityError> {
    let live = tree.task_ref(group)?;
    if content_equals(&DraftRef::new(tree, &draft), &live) {
        trace!(group = %group, "group unchanged");
        Ok(Draft::Existing(group))
    } else {
        trace!(group = %group, "group rewritten");
        Ok(draft)
    }
}

// =============================================================================
// OUTCOMES
// =============================================================================

/// A contiguous block `lo..=hi` of the completed demonstration.
#[derive(Debug, Clone)]
pub(crate) struct Piece {
    pub(crate) lo: usize,
    pub(crate) hi: usize,
    pub(crate) draft: Draft,
}

/// Result of incorporating one task.
#[derive(Debug, Clone)]
pub(crate) enum Outcome {
    Whole(Piece),
    Fragmented(Vec<Piece>),
}

impl Outcome {
    fn into_pieces(self) -> Vec<Piece> {
        match self {
            Self::Whole(piece) => vec![piece],
            Self::Fragmented(pieces) => pieces,
        }
    }
}

/// What a child reports to its parent's incorporator.
#[derive(Debug, Clone)]
pub(crate) struct ChildOutcome {
    /// The child's own label when whole, a fragment label otherwise.
    pub(crate) label: Label,
    pub(crate) outcome: Outcome,
}

/// Per-group reconciliation state machine.
pub(crate) trait Incorporator {
    /// Receive the outcome of one child.
    fn offer(&mut self, child: ChildOutcome) -> Result<(), ContiguityError>;

    /// Decide what the group becomes.
    fn reconcile(self, labels: &mut LabelGenerator) -> Result<Outcome, ContiguityError>;
}

/// One piece at a group's level, ranked by the child it came from.
#[derive(Debug)]
struct Item {
    lo: usize,
    hi: usize,
    rank: usize,
    draft: Draft,
}

fn split_runs(items: Vec<Item>) -> Vec<Vec<Item>> {
    let mut runs: Vec<Vec<Item>> = Vec::new();
    for item in items {
        match runs.last_mut() {
            Some(run) if run.last().is_some_and(|prev| prev.hi + 1 == item.lo) => run.push(item),
            _ => runs.push(vec![item]),
        }
    }
    runs
}

fn child_rank(
    tree: &ContiguityTree,
    group: TaskId,
    child: &ChildOutcome,
) -> Result<usize, ContiguityError> {
    tree.lenient_index_of_sub_task(group, child.label)?
        .ok_or_else(|| {
            ContiguityError::InvariantViolation(format!(
                "label {} is not a child of {}",
                child.label, group
            ))
        })
}

// =============================================================================
// COMMON-INTERVAL DECOMPOSITION
// =============================================================================

#[derive(Debug)]
enum NodeShape {
    Single(Draft),
    Linear {
        direction: Direction,
        children: Vec<Node>,
    },
    Prime(Vec<Node>),
}

/// A block of the demonstration covering pieces of children `min..=max`.
#[derive(Debug)]
struct Node {
    lo: usize,
    hi: usize,
    min: usize,
    max: usize,
    covered: usize,
    shape: NodeShape,
}

impl Node {
    fn single(item: Item) -> Self {
        Self {
            lo: item.lo,
            hi: item.hi,
            min: item.rank,
            max: item.rank,
            covered: 1,
            shape: NodeShape::Single(item.draft),
        }
    }

    fn linear(first: Node, second: Node, direction: Direction) -> Self {
        Self {
            lo: first.lo,
            hi: second.hi,
            min: first.min.min(second.min),
            max: first.max.max(second.max),
            covered: first.covered + second.covered,
            shape: NodeShape::Linear {
                direction,
                children: vec![first, second],
            },
        }
    }

    fn prime(mut members: Vec<Node>, last: Node) -> Self {
        members.push(last);
        let lo = members.first().map_or(0, |n| n.lo);
        let hi = members.last().map_or(0, |n| n.hi);
        let min = members.iter().map(|n| n.min).min().unwrap_or(0);
        let max = members.iter().map(|n| n.max).max().unwrap_or(0);
        let covered = members.iter().map(|n| n.covered).sum();
        Self {
            lo,
            hi,
            min,
            max,
            covered,
            shape: NodeShape::Prime(members),
        }
    }

    /// Direction in which `next` continues this node, if it is adjacent.
    fn adjacency(&self, next: &Node) -> Option<Direction> {
        if self.max + 1 == next.min {
            Some(Direction::Forward)
        } else if next.max + 1 == self.min {
            Some(Direction::Backward)
        } else {
            None
        }
    }

    fn extends_with(&self, next: &Node) -> bool {
        match self.shape {
            NodeShape::Linear { direction, .. } => self.adjacency(next) == Some(direction),
            _ => false,
        }
    }

    fn append(&mut self, next: Node) {
        self.hi = next.hi;
        self.min = self.min.min(next.min);
        self.max = self.max.max(next.max);
        self.covered += next.covered;
        if let NodeShape::Linear { children, .. } = &mut self.shape {
            children.push(next);
        }
    }
}

/// Finds common intervals of the stored child order and the demonstration.
///
/// A node is *complete* when it covers every piece of the children
/// `min..=max`; only complete nodes may be ordered against each other.
struct Decomposer {
    /// `prefix[i]` is the number of pieces of children `0..i`.
    prefix: Vec<usize>,
}

impl Decomposer {
    fn new(pieces: &[usize]) -> Self {
        let mut prefix = Vec::with_capacity(pieces.len() + 1);
        let mut total = 0usize;
        prefix.push(total);
        for &count in pieces {
            total += count;
            prefix.push(total);
        }
        Self { prefix }
    }

    fn is_complete(&self, min: usize, max: usize, covered: usize) -> bool {
        match (self.prefix.get(max + 1), self.prefix.get(min)) {
            (Some(&upper), Some(&lower)) => upper.saturating_sub(lower) == covered,
            _ => false,
        }
    }

    fn node_complete(&self, node: &Node) -> bool {
        self.is_complete(node.min, node.max, node.covered)
    }

    /// Shortest suffix of `stack` that forms a complete node with `next`.
    fn interval_suffix(&self, stack: &[Node], next: &Node) -> Option<usize> {
        let (mut min, mut max, mut covered) = (next.min, next.max, next.covered);
        for (start, node) in stack.iter().enumerate().rev() {
            min = min.min(node.min);
            max = max.max(node.max);
            covered += node.covered;
            if self.is_complete(min, max, covered) {
                return Some(start);
            }
        }
        None
    }

    /// Stack-based decomposition of one gap-free run, in demonstration order.
    fn decompose(&self, run: Vec<Item>) -> Vec<Node> {
        let mut stack: Vec<Node> = Vec::new();
        for item in run {
            let mut next = Node::single(item);
            while let Some(top) = stack.last() {
                if self.node_complete(top) && self.node_complete(&next) {
                    if top.extends_with(&next) {
                        if let Some(mut top) = stack.pop() {
                            top.append(next);
                            next = top;
                            continue;
                        }
                    } else if let Some(direction) = top.adjacency(&next)
                        && let Some(top) = stack.pop()
                    {
                        next = Node::linear(top, next, direction);
                        continue;
                    }
                }
                if let Some(start) = self.interval_suffix(&stack, &next) {
                    let members = stack.split_off(start);
                    next = Node::prime(members, next);
                    continue;
                }
                break;
            }
            stack.push(next);
        }
        stack
    }
}

/// Turn a decomposition node into a draft.
///
/// `label` names the node itself; inner nodes get fresh labels.
fn node_draft(
    tree: &ContiguityTree,
    labels: &mut LabelGenerator,
    node: Node,
    label: Option<Label>,
    was_reversible: bool,
) -> Result<Draft, ContiguityError> {
    match node.shape {
        NodeShape::Single(draft) => Ok(draft),
        NodeShape::Linear {
            direction,
            children,
        } => {
            let label = label.unwrap_or_else(|| labels.allocate().into());
            let mut parts = children
                .into_iter()
                .map(|child| node_draft(tree, labels, child, None, was_reversible))
                .collect::<Result<Vec<_>, _>>()?;
            let backward = direction == Direction::Backward;
            if backward {
                parts.reverse();
                if !was_reversible {
                    debug!(label = %label, children = parts.len(), "order observed in reverse");
                }
            }
            build_ordered(tree, label, backward || was_reversible, parts)
        }
        NodeShape::Prime(children) => {
            let label = label.unwrap_or_else(|| labels.allocate().into());
            debug!(label = %label, children = children.len(), "order conflict demoted to unordered");
            let parts = children
                .into_iter()
                .map(|child| node_draft(tree, labels, child, None, was_reversible))
                .collect::<Result<Vec<_>, _>>()?;
            build_unordered(tree, label, parts)
        }
    }
}

// =============================================================================
// ORDERED INCORPORATOR
// =============================================================================

/// Reconciles the children of an ordered group.
pub(crate) struct OrderedIncorporator<'a> {
    tree: &'a ContiguityTree,
    group: TaskId,
    label: Label,
    reversible: bool,
    /// Number of pieces reported by each child, by stored index.
    pieces: Vec<usize>,
    items: Vec<Item>,
}

impl<'a> OrderedIncorporator<'a> {
    pub(crate) fn new(tree: &'a ContiguityTree, group: TaskId) -> Result<Self, ContiguityError> {
        let task = tree.task(group)?;
        let payload = task.group().ok_or(ContiguityError::NotAGroup(group))?;
        Ok(Self {
            tree,
            group,
            label: task.label(),
            reversible: payload.is_reversible(),
            pieces: vec![0; payload.size()],
            items: Vec::new(),
        })
    }
}

impl Incorporator for OrderedIncorporator<'_> {
    fn offer(&mut self, child: ChildOutcome) -> Result<(), ContiguityError> {
        let rank = child_rank(self.tree, self.group, &child)?;
        let pieces = child.outcome.into_pieces();
        if let Some(slot) = self.pieces.get_mut(rank) {
            *slot = pieces.len();
        }
        self.items.extend(pieces.into_iter().map(|piece| Item {
            lo: piece.lo,
            hi: piece.hi,
            rank,
            draft: piece.draft,
        }));
        Ok(())
    }

    fn reconcile(self, labels: &mut LabelGenerator) -> Result<Outcome, ContiguityError> {
        let Self {
            tree,
            group,
            label,
            reversible,
            pieces,
            mut items,
        } = self;

        items.sort_by_key(|item| item.lo);
        for item in &mut items {
            item.draft = std::mem::replace(&mut item.draft, Draft::Existing(group)).seal(labels);
        }

        let decomposer = Decomposer::new(&pieces);
        let mut nodes = Vec::new();
        for run in split_runs(items) {
            nodes.extend(decomposer.decompose(run));
        }
        trace!(group = %group, nodes = nodes.len(), "ordered group decomposed");

        if nodes.len() == 1
            && let Some(node) = nodes.pop()
        {
            let (lo, hi) = (node.lo, node.hi);
            let draft = match node.shape {
                NodeShape::Single(only) => Draft::group(
                    tree,
                    label,
                    DraftLayout::Ordered { reversible },
                    vec![only],
                )?,
                _ => node_draft(tree, labels, node, Some(label), reversible)?,
            };
            let draft = keep_if_unchanged(tree, group, draft)?;
            return Ok(Outcome::Whole(Piece { lo, hi, draft }));
        }

        debug!(group = %group, label = %label, pieces = nodes.len(), "ordered group fragmented");
        let brotherhood = Label::piece(label, u32::try_from(nodes.len()).unwrap_or(u32::MAX));
        let fragments = nodes
            .into_iter()
            .map(|node| {
                let (lo, hi) = (node.lo, node.hi);
                let draft = node_draft(tree, labels, node, Some(brotherhood), reversible)?;
                Ok(Piece { lo, hi, draft })
            })
            .collect::<Result<Vec<_>, ContiguityError>>()?;
        Ok(Outcome::Fragmented(fragments))
    }
}

// =============================================================================
// UNORDERED INCORPORATOR
// =============================================================================

/// Reconciles the children of an unordered group.
pub(crate) struct UnorderedIncorporator<'a> {
    tree: &'a ContiguityTree,
    group: TaskId,
    label: Label,
    items: Vec<Item>,
}

impl<'a> UnorderedIncorporator<'a> {
    pub(crate) fn new(tree: &'a ContiguityTree, group: TaskId) -> Result<Self, ContiguityError> {
        let task = tree.task(group)?;
        if task.group().is_none() {
            return Err(ContiguityError::NotAGroup(group));
        }
        Ok(Self {
            tree,
            group,
            label: task.label(),
            items: Vec::new(),
        })
    }
}

impl Incorporator for UnorderedIncorporator<'_> {
    fn offer(&mut self, child: ChildOutcome) -> Result<(), ContiguityError> {
        let rank = child_rank(self.tree, self.group, &child)?;
        self.items
            .extend(child.outcome.into_pieces().into_iter().map(|piece| Item {
                lo: piece.lo,
                hi: piece.hi,
                rank,
                draft: piece.draft,
            }));
        Ok(())
    }

    fn reconcile(self, labels: &mut LabelGenerator) -> Result<Outcome, ContiguityError> {
        let Self {
            tree,
            group,
            label,
            mut items,
        } = self;
        items.sort_by_key(|item| (item.lo, item.rank));

        let contiguous = items.windows(2).all(|pair| pair[0].hi + 1 == pair[1].lo);
        if contiguous {
            let lo = items.first().map_or(0, |item| item.lo);
            let hi = items.last().map_or(0, |item| item.hi);
            let parts = items
                .into_iter()
                .map(|item| item.draft.seal(labels))
                .collect();
            let draft = keep_if_unchanged(tree, group, build_unordered(tree, label, parts)?)?;
            return Ok(Outcome::Whole(Piece { lo, hi, draft }));
        }

        debug!(group = %group, label = %label, pieces = items.len(), "unordered group fragmented");
        Ok(Outcome::Fragmented(
            items
                .into_iter()
                .map(|item| Piece {
                    lo: item.lo,
                    hi: item.hi,
                    draft: item.draft.seal(labels),
                })
                .collect(),
        ))
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::ActionId;

    /// Detached primitives 0..n in a fresh tree.
    fn leaves(n: u64, labels: &mut LabelGenerator) -> (ContiguityTree, Vec<TaskId>) {
        let mut tree = ContiguityTree::new();
        let ids = (0..n)
            .map(|a| {
                tree.insert_primitive(ActionId(a), labels.allocate())
                    .expect("insert")
            })
            .collect();
        (tree, ids)
    }

    fn existing(ids: &[TaskId]) -> Vec<Draft> {
        ids.iter().copied().map(Draft::Existing).collect()
    }

    fn children_of(draft: &Draft) -> usize {
        match draft {
            Draft::Group { children, .. } => children.len(),
            Draft::Existing(_) => 0,
        }
    }

    #[test]
    fn sequential_absorbs_sequential_child() {
        let mut labels = LabelGenerator::new();
        let (tree, ids) = leaves(4, &mut labels);
        let inner = build_ordered(&tree, labels.allocate().into(), false, existing(&ids[1..3]))
            .expect("draft");
        let outer = build_ordered(
            &tree,
            labels.allocate().into(),
            false,
            vec![Draft::Existing(ids[0]), inner, Draft::Existing(ids[3])],
        )
        .expect("draft");
        assert_eq!(children_of(&outer), 4);
        assert_eq!(outer.leaf_count(&tree).expect("leaves"), 4);
    }

    #[test]
    fn reversible_keeps_sequential_child_nested() {
        let mut labels = LabelGenerator::new();
        let (tree, ids) = leaves(4, &mut labels);
        let inner = build_ordered(&tree, labels.allocate().into(), false, existing(&ids[1..3]))
            .expect("draft");
        let outer = build_ordered(
            &tree,
            labels.allocate().into(),
            true,
            vec![Draft::Existing(ids[0]), inner, Draft::Existing(ids[3])],
        )
        .expect("draft");
        assert_eq!(children_of(&outer), 3);
    }

    #[test]
    fn reversible_pair_becomes_unordered() {
        let mut labels = LabelGenerator::new();
        let (tree, ids) = leaves(2, &mut labels);
        let pair = build_ordered(&tree, labels.allocate().into(), true, existing(&ids))
            .expect("draft");
        assert_eq!(pair.layout(&tree), Some(DraftLayout::Unordered));
    }

    #[test]
    fn unordered_absorbs_unordered_child() {
        let mut labels = LabelGenerator::new();
        let (tree, ids) = leaves(3, &mut labels);
        let inner = build_unordered(&tree, labels.allocate().into(), existing(&ids[..2]))
            .expect("draft");
        let outer = build_unordered(
            &tree,
            labels.allocate().into(),
            vec![inner, Draft::Existing(ids[2])],
        )
        .expect("draft");
        assert_eq!(children_of(&outer), 3);
    }

    #[test]
    fn stale_existing_child_is_reported() {
        let mut labels = LabelGenerator::new();
        let (tree, ids) = leaves(1, &mut labels);
        let stale = TaskId(99);
        let result = build_unordered(
            &tree,
            labels.allocate().into(),
            vec![Draft::Existing(ids[0]), Draft::Existing(stale)],
        );
        assert!(matches!(result, Err(ContiguityError::TaskNotFound(id)) if id == stale));
    }

    #[test]
    fn adjacency_reports_direction() {
        let nodes = decompose(&[2, 1, 0]);
        assert_eq!(nodes.len(), 1);
        let NodeShape::Linear { direction, ref children } = nodes[0].shape else {
            panic!("expected a linear root");
        };
        assert_eq!(direction, Direction::Backward);
        assert_eq!(children.len(), 3);
    }

    #[test]
    fn sealing_replaces_fragment_labels_only() {
        let mut labels = LabelGenerator::new();
        let (tree, ids) = leaves(2, &mut labels);
        let origin: Label = labels.allocate().into();
        let fragment = build_unordered(&tree, Label::piece(origin, 2), existing(&ids))
            .expect("draft");
        match fragment.seal(&mut labels) {
            Draft::Group { label, .. } => {
                assert!(!label.is_piece());
                assert_ne!(label.id(), origin.id());
            }
            Draft::Existing(_) => panic!("expected a group"),
        }
    }

    fn decompose(ranks: &[usize]) -> Vec<Node> {
        let pieces = vec![1; ranks.len()];
        let items = ranks
            .iter()
            .enumerate()
            .map(|(pos, &rank)| Item {
                lo: pos,
                hi: pos,
                rank,
                draft: Draft::Existing(TaskId(rank as u64)),
            })
            .collect();
        Decomposer::new(&pieces).decompose(items)
    }

    #[test]
    fn identity_order_is_one_forward_node() {
        let nodes = decompose(&[0, 1, 2, 3]);
        assert_eq!(nodes.len(), 1);
        assert!(matches!(
            nodes[0].shape,
            NodeShape::Linear {
                direction: Direction::Forward,
                ref children
            } if children.len() == 4
        ));
    }

    #[test]
    fn swapped_prefix_nests_a_backward_pair() {
        let nodes = decompose(&[1, 0, 2]);
        assert_eq!(nodes.len(), 1);
        let NodeShape::Linear {
            direction: Direction::Forward,
            children,
        } = &nodes[0].shape
        else {
            panic!("expected a forward root");
        };
        assert!(matches!(
            children[0].shape,
            NodeShape::Linear {
                direction: Direction::Backward,
                ..
            }
        ));
    }

    #[test]
    fn tangled_order_is_prime() {
        let nodes = decompose(&[1, 3, 0, 2]);
        assert_eq!(nodes.len(), 1);
        assert!(matches!(nodes[0].shape, NodeShape::Prime(ref c) if c.len() == 4));
    }

    #[test]
    fn incomplete_pieces_only_join_through_intervals() {
        // Child 0 split in two around child 1.
        let items = vec![
            Item {
                lo: 0,
                hi: 0,
                rank: 0,
                draft: Draft::Existing(TaskId(10)),
            },
            Item {
                lo: 1,
                hi: 1,
                rank: 1,
                draft: Draft::Existing(TaskId(11)),
            },
            Item {
                lo: 2,
                hi: 2,
                rank: 0,
                draft: Draft::Existing(TaskId(12)),
            },
            Item {
                lo: 3,
                hi: 3,
                rank: 2,
                draft: Draft::Existing(TaskId(13)),
            },
        ];
        let nodes = Decomposer::new(&[2, 1, 1]).decompose(items);
        assert_eq!(nodes.len(), 1);
        let NodeShape::Linear {
            direction: Direction::Forward,
            children,
        } = &nodes[0].shape
        else {
            panic!("expected a forward root");
        };
        assert!(matches!(children[0].shape, NodeShape::Prime(ref c) if c.len() == 3));
    }

    #[test]
    fn gaps_split_runs() {
        let items = vec![
            Item {
                lo: 0,
                hi: 1,
                rank: 0,
                draft: Draft::Existing(TaskId(0)),
            },
            Item {
                lo: 3,
                hi: 3,
                rank: 1,
                draft: Draft::Existing(TaskId(1)),
            },
        ];
        assert_eq!(split_runs(items).len(), 2);
    }
}
