//! # Encorporator
//!
//! The stateless coordinator that merges one demonstration into a tree.
//!
//! ## Pipeline
//!
//! 1. Validate the demonstration. An empty one is a no-op.
//! 2. Admit unseen actions as new primitives beside their nearest known
//!    neighbour in the demonstration.
//! 3. Complete the demonstration: known leaves it does not mention are
//!    placed beside their nearest present sibling, so the merge sees a
//!    permutation of every leaf whose restriction is the demonstration.
//! 4. Descend depth-first; every group delegates to its incorporator and
//!    reconciles its children bottom-up.
//! 5. Write the reconciled drafts into the arena, drop destroyed groups,
//!    refresh sizes and verify every invariant.
//!
//! Conflicting evidence never fails a merge: the tree loosens instead.
//! Errors are either rejected input or contract breaches.

use crate::demonstration::Demonstration;
use crate::identity::{Label, LabelGenerator};
use crate::incorporator::{
    ChildOutcome, Draft, Incorporator, OrderedIncorporator, Outcome, Piece,
    UnorderedIncorporator, build_unordered,
};
use crate::task::{Group, GroupLayout, TaskKind};
use crate::tree::ContiguityTree;
use crate::{ActionId, ContiguityError, Direction, TaskId};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, trace};

/// Ghost leaves queued around each demonstration position.
struct Ghosts {
    before: Vec<Vec<ActionId>>,
    after: Vec<Vec<ActionId>>,
}

impl Ghosts {
    fn new(len: usize) -> Self {
        Self {
            before: vec![Vec::new(); len],
            after: vec![Vec::new(); len],
        }
    }

    /// Queue `block` ahead of everything already waiting before `pos`.
    fn prepend_before(&mut self, pos: usize, block: Vec<ActionId>) {
        if let Some(slot) = self.before.get_mut(pos) {
            slot.splice(0..0, block);
        }
    }

    /// Queue `block` behind everything already waiting after `pos`.
    fn append_after(&mut self, pos: usize, block: Vec<ActionId>) {
        if let Some(slot) = self.after.get_mut(pos) {
            slot.extend(block);
        }
    }
}

/// Merges demonstrations into contiguity trees.
pub struct Encorporator;

impl Encorporator {
    /// Incorporate `demonstration` into `tree`.
    ///
    /// Labels for new primitives and groups come from `labels`.
    pub fn incorporate(
        tree: &mut ContiguityTree,
        labels: &mut LabelGenerator,
        demonstration: &[ActionId],
    ) -> Result<(), ContiguityError> {
        Demonstration::validate(demonstration)?;
        if demonstration.is_empty() {
            trace!("empty demonstration ignored");
            return Ok(());
        }

        Self::admit(tree, labels, demonstration)?;
        let completed = Self::complete(tree, demonstration)?;
        let positions: BTreeMap<ActionId, usize> = completed
            .iter()
            .enumerate()
            .map(|(pos, &action)| (action, pos))
            .collect();
        trace!(
            length = demonstration.len(),
            completed = completed.len(),
            "demonstration completed"
        );

        let root = tree
            .root()
            .ok_or_else(|| ContiguityError::InvariantViolation("no root after admission".into()))?;
        let draft = match Self::descend(tree, labels, &positions, root)? {
            Outcome::Whole(piece) => piece.draft,
            Outcome::Fragmented(pieces) => {
                let label: Label = labels.allocate().into();
                debug!(label = %label, pieces = pieces.len(), "root fragmented, replaced by unordered root");
                let parts = pieces.into_iter().map(|piece| piece.draft).collect();
                build_unordered(tree, label, parts)?
            }
        };

        Self::materialize(tree, draft)?;
        tree.refresh_sizes()?;
        tree.check_invariants()
    }

    /// Incorporate into a deep copy, leaving `tree` and `labels` untouched.
    pub fn trial(
        tree: &ContiguityTree,
        labels: &LabelGenerator,
        demonstration: &[ActionId],
    ) -> Result<ContiguityTree, ContiguityError> {
        let mut copy = tree.deep_copy()?;
        let mut labels = labels.clone();
        Self::incorporate(&mut copy, &mut labels, demonstration)?;
        Ok(copy)
    }

    // -------------------------------------------------------------------------
    // Admission
    // -------------------------------------------------------------------------

    fn admit(
        tree: &mut ContiguityTree,
        labels: &mut LabelGenerator,
        demonstration: &[ActionId],
    ) -> Result<(), ContiguityError> {
        let fresh: BTreeSet<ActionId> = demonstration
            .iter()
            .copied()
            .filter(|&action| tree.primitive_for(action).is_none())
            .collect();
        if fresh.is_empty() {
            return Ok(());
        }

        if tree.is_empty() {
            let root = Self::sequence(tree, labels, demonstration)?;
            tree.set_root(root);
            tree.refresh_sizes()?;
            debug!(root = %root, leaves = demonstration.len(), "tree created");
            return Ok(());
        }

        if fresh.len() == demonstration.len() {
            return Self::admit_disjoint(tree, labels, demonstration);
        }

        let mut index = 0;
        while index < demonstration.len() {
            if !fresh.contains(&demonstration[index]) {
                index += 1;
                continue;
            }
            let start = index;
            while index < demonstration.len() && fresh.contains(&demonstration[index]) {
                index += 1;
            }
            let run = &demonstration[start..index];
            let (anchor, after) = match start.checked_sub(1) {
                Some(previous) => (demonstration[previous], true),
                None => match demonstration.get(index) {
                    Some(&following) => (following, false),
                    None => {
                        return Err(ContiguityError::InvariantViolation(
                            "new run without a known neighbour".into(),
                        ));
                    }
                },
            };
            Self::splice(tree, labels, anchor, run, after)?;
        }
        Ok(())
    }

    /// A detached sequential group over new primitives.
    fn sequence(
        tree: &mut ContiguityTree,
        labels: &mut LabelGenerator,
        actions: &[ActionId],
    ) -> Result<TaskId, ContiguityError> {
        let group = tree.insert_group(labels.allocate(), GroupLayout::ordered(false));
        for &action in actions {
            let leaf = tree.insert_primitive(action, labels.allocate())?;
            tree.attach(group, leaf)?;
        }
        Ok(group)
    }

    /// Place a demonstration sharing no action with the tree beside the
    /// existing root, under an unordered root.
    fn admit_disjoint(
        tree: &mut ContiguityTree,
        labels: &mut LabelGenerator,
        demonstration: &[ActionId],
    ) -> Result<(), ContiguityError> {
        let part = match demonstration {
            [single] => tree.insert_primitive(*single, labels.allocate())?,
            _ => Self::sequence(tree, labels, demonstration)?,
        };
        let old_root = tree
            .root()
            .ok_or_else(|| ContiguityError::InvariantViolation("disjoint admission without root".into()))?;
        let (unordered, only_child) = {
            let group = tree
                .task(old_root)?
                .group()
                .ok_or(ContiguityError::NotAGroup(old_root))?;
            let only_child = match group.size() {
                1 => group.get_sub_task(0),
                _ => None,
            };
            (!group.is_ordered(), only_child)
        };

        if unordered {
            tree.attach(old_root, part)?;
        } else {
            let root = tree.insert_group(labels.allocate(), GroupLayout::Unordered);
            let kept = match only_child {
                Some(child) => {
                    tree.detach(child)?;
                    tree.remove(old_root)?;
                    child
                }
                None => old_root,
            };
            tree.attach(root, kept)?;
            tree.attach(root, part)?;
            tree.set_root(root);
        }
        tree.refresh_sizes()?;
        debug!(leaves = demonstration.len(), "disjoint demonstration placed beside root");
        Ok(())
    }

    /// Insert a run of new actions next to the primitive of `anchor`.
    fn splice(
        tree: &mut ContiguityTree,
        labels: &mut LabelGenerator,
        anchor: ActionId,
        run: &[ActionId],
        after: bool,
    ) -> Result<(), ContiguityError> {
        let anchor = tree.primitive_for(anchor).ok_or_else(|| {
            ContiguityError::InvariantViolation(format!("anchor {:?} has no primitive", anchor))
        })?;
        let parent = tree.task(anchor)?.parent().ok_or_else(|| {
            ContiguityError::InvariantViolation(format!("primitive {} has no parent", anchor))
        })?;
        let mut leaves = Vec::with_capacity(run.len());
        for &action in run {
            leaves.push(tree.insert_primitive(action, labels.allocate())?);
        }

        let sequential = tree.task(parent)?.group().is_some_and(Group::is_sequential);
        if sequential {
            let index = tree.index_in_parent(anchor)?.ok_or_else(|| {
                ContiguityError::InvariantViolation(format!("{} missing from its parent", anchor))
            })?;
            let start = if after { index + 1 } else { index };
            for (at, leaf) in (start..).zip(leaves) {
                tree.attach_at(parent, at, leaf)?;
            }
            tree.refresh_ancestors(parent)?;
            trace!(parent = %parent, new = run.len(), "new actions spliced into sequence");
        } else {
            let wrapper = tree.insert_group(labels.allocate(), GroupLayout::ordered(false));
            tree.replace_child(anchor, wrapper)?;
            if after {
                tree.attach(wrapper, anchor)?;
            }
            for leaf in leaves {
                tree.attach(wrapper, leaf)?;
            }
            if !after {
                tree.attach(wrapper, anchor)?;
            }
            tree.refresh_ancestors(wrapper)?;
            trace!(wrapper = %wrapper, new = run.len(), "new actions paired with anchor");
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Completion
    // -------------------------------------------------------------------------

    /// Extend the demonstration to a permutation of every leaf.
    fn complete(
        tree: &ContiguityTree,
        demonstration: &[ActionId],
    ) -> Result<Vec<ActionId>, ContiguityError> {
        let positions = Demonstration::positions(demonstration)?;
        let root = tree
            .root()
            .ok_or_else(|| ContiguityError::InvariantViolation("no root to complete against".into()))?;
        let mut ghosts = Ghosts::new(demonstration.len());
        Self::place_ghosts(tree, root, &positions, &mut ghosts)?;

        let mut completed = Vec::with_capacity(tree.leaf_count());
        for (pos, &action) in demonstration.iter().enumerate() {
            if let Some(before) = ghosts.before.get(pos) {
                completed.extend_from_slice(before);
            }
            completed.push(action);
            if let Some(after) = ghosts.after.get(pos) {
                completed.extend_from_slice(after);
            }
        }
        if completed.len() != tree.leaf_count() {
            return Err(ContiguityError::InvariantViolation(format!(
                "completion produced {} of {} leaves",
                completed.len(),
                tree.leaf_count()
            )));
        }
        Ok(completed)
    }

    /// Leaves of `children` as one block, children walked in `direction`.
    /// Each child's own leaves stay in stored order.
    fn block(
        tree: &ContiguityTree,
        children: &[TaskId],
        direction: Direction,
    ) -> Result<Vec<ActionId>, ContiguityError> {
        let mut block = Vec::new();
        match direction {
            Direction::Forward => {
                for &child in children {
                    block.extend(tree.leaves_in_order(child)?);
                }
            }
            Direction::Backward => {
                for &child in children.iter().rev() {
                    block.extend(tree.leaves_in_order(child)?);
                }
            }
        }
        Ok(block)
    }

    /// Post-order: queue the leaves of absent children of `id` and return
    /// the first and last demonstration positions present below `id`.
    fn place_ghosts(
        tree: &ContiguityTree,
        id: TaskId,
        positions: &BTreeMap<ActionId, usize>,
        ghosts: &mut Ghosts,
    ) -> Result<Option<(usize, usize)>, ContiguityError> {
        let task = tree.task(id)?;
        let group = match task.kind() {
            TaskKind::Primitive(action) => return Ok(positions.get(action).map(|&p| (p, p))),
            TaskKind::Group(group) => group,
        };
        let children = group.sub_tasks();
        let mut spans = Vec::with_capacity(children.len());
        for &child in &children {
            spans.push(Self::place_ghosts(tree, child, positions, ghosts)?);
        }
        let present: Vec<(usize, (usize, usize))> = spans
            .iter()
            .enumerate()
            .filter_map(|(index, span)| span.map(|s| (index, s)))
            .collect();
        let (Some(&(first, first_span)), Some(&(last, last_span))) =
            (present.first(), present.last())
        else {
            return Ok(None);
        };
        let lo = present.iter().map(|(_, (lo, _))| *lo).min().unwrap_or(first_span.0);
        let hi = present.iter().map(|(_, (_, hi))| *hi).max().unwrap_or(last_span.1);
        if present.len() == children.len() {
            return Ok(Some((lo, hi)));
        }

        if !group.is_ordered() {
            let absent: Vec<TaskId> = children
                .iter()
                .zip(&spans)
                .filter(|(_, span)| span.is_none())
                .map(|(&child, _)| child)
                .collect();
            ghosts.append_after(hi, Self::block(tree, &absent, Direction::Forward)?);
            return Ok(Some((lo, hi)));
        }

        let direction = if present.len() < 2 || first_span.0 <= last_span.0 {
            Direction::Forward
        } else {
            Direction::Backward
        };
        let leading = &children[..first];
        let trailing = &children[last + 1..];
        match direction {
            Direction::Forward => {
                ghosts.prepend_before(first_span.0, Self::block(tree, leading, direction)?);
                ghosts.append_after(last_span.1, Self::block(tree, trailing, direction)?);
            }
            Direction::Backward => {
                ghosts.append_after(first_span.1, Self::block(tree, leading, direction)?);
                ghosts.prepend_before(last_span.0, Self::block(tree, trailing, direction)?);
            }
        }
        for pair in present.windows(2) {
            let (prev, prev_span) = pair[0];
            let (next, _) = pair[1];
            let between = Self::block(tree, &children[prev + 1..next], direction)?;
            if between.is_empty() {
                continue;
            }
            match direction {
                Direction::Forward => ghosts.append_after(prev_span.1, between),
                Direction::Backward => ghosts.prepend_before(prev_span.0, between),
            }
        }
        Ok(Some((lo, hi)))
    }

    // -------------------------------------------------------------------------
    // Descent and reconciliation
    // -------------------------------------------------------------------------

    fn descend(
        tree: &ContiguityTree,
        labels: &mut LabelGenerator,
        positions: &BTreeMap<ActionId, usize>,
        id: TaskId,
    ) -> Result<Outcome, ContiguityError> {
        let task = tree.task(id)?;
        match task.kind() {
            TaskKind::Primitive(action) => {
                let pos = *positions.get(action).ok_or_else(|| {
                    ContiguityError::InvariantViolation(format!(
                        "leaf {:?} missing from completed demonstration",
                        action
                    ))
                })?;
                Ok(Outcome::Whole(Piece {
                    lo: pos,
                    hi: pos,
                    draft: Draft::Existing(id),
                }))
            }
            TaskKind::Group(group) => {
                let children = group.sub_tasks();
                if group.is_ordered() {
                    let incorporator = OrderedIncorporator::new(tree, id)?;
                    Self::drive(tree, labels, positions, &children, incorporator)
                } else {
                    let incorporator = UnorderedIncorporator::new(tree, id)?;
                    Self::drive(tree, labels, positions, &children, incorporator)
                }
            }
        }
    }

    fn drive<I: Incorporator>(
        tree: &ContiguityTree,
        labels: &mut LabelGenerator,
        positions: &BTreeMap<ActionId, usize>,
        children: &[TaskId],
        mut incorporator: I,
    ) -> Result<Outcome, ContiguityError> {
        for &child in children {
            let outcome = Self::descend(tree, labels, positions, child)?;
            let own = tree.label(child)?;
            let label = match &outcome {
                Outcome::Whole(_) => own,
                Outcome::Fragmented(pieces) => {
                    Label::piece(own, u32::try_from(pieces.len()).unwrap_or(u32::MAX))
                }
            };
            incorporator.offer(ChildOutcome { label, outcome })?;
        }
        incorporator.reconcile(labels)
    }

    // -------------------------------------------------------------------------
    // Materialization
    // -------------------------------------------------------------------------

    /// Replace the tree's structure with `draft`.
    fn materialize(tree: &mut ContiguityTree, draft: Draft) -> Result<(), ContiguityError> {
        if let Draft::Existing(id) = draft
            && tree.root() == Some(id)
        {
            trace!("tree unchanged");
            return Ok(());
        }

        let mut tops = Vec::new();
        draft.collect_existing(&mut tops);
        let mut kept = BTreeSet::new();
        for &top in &tops {
            let mut stack = vec![top];
            while let Some(id) = stack.pop() {
                kept.insert(id);
                if let Some(group) = tree.task(id)?.group() {
                    stack.extend(group.sub_tasks());
                }
            }
        }
        let stale: Vec<TaskId> = tree
            .tasks()
            .filter(|task| !task.is_primitive() && !kept.contains(&task.id()))
            .map(|task| task.id())
            .collect();

        for &top in &tops {
            tree.detach(top)?;
        }
        for id in stale {
            tree.remove(id)?;
        }
        trace!(kept = tops.len(), "stale groups removed");

        let root = Self::build(tree, draft)?;
        tree.set_root(root);
        Ok(())
    }

    fn build(tree: &mut ContiguityTree, draft: Draft) -> Result<TaskId, ContiguityError> {
        match draft {
            Draft::Existing(id) => Ok(id),
            Draft::Group {
                label,
                layout,
                children,
                ..
            } => {
                let mut ids = Vec::with_capacity(children.len());
                for child in children {
                    ids.push(Self::build(tree, child)?);
                }
                let sealed = label
                    .sealed()
                    .ok_or(ContiguityError::UnsealedLabel(label))?;
                let group = tree.insert_group(sealed, layout.into_layout());
                for id in ids {
                    tree.attach(group, id)?;
                }
                Ok(group)
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(values: &[u64]) -> Vec<ActionId> {
        values.iter().copied().map(ActionId).collect()
    }

    fn learn(demos: &[&[u64]]) -> (ContiguityTree, LabelGenerator) {
        let mut tree = ContiguityTree::new();
        let mut labels = LabelGenerator::new();
        for demo in demos {
            Encorporator::incorporate(&mut tree, &mut labels, &ids(demo)).expect("incorporate");
        }
        (tree, labels)
    }

    fn root_group(tree: &ContiguityTree) -> &Group {
        tree.root()
            .and_then(|root| tree.task(root).ok())
            .and_then(|task| task.group())
            .expect("root group")
    }

    #[test]
    fn first_demonstration_creates_sequence() {
        let (tree, _) = learn(&[&[1, 2, 3]]);
        let root = root_group(&tree);
        assert_eq!(root.name(), "Sequential");
        assert_eq!(root.size(), 3);
        assert!(tree.accepts(&ids(&[1, 2, 3])));
    }

    #[test]
    fn single_action_root_is_stable() {
        let (mut tree, mut labels) = learn(&[&[7]]);
        assert_eq!(root_group(&tree).size(), 1);
        let before = tree.clone();
        Encorporator::incorporate(&mut tree, &mut labels, &ids(&[7])).expect("again");
        assert!(tree.structurally_equals(&before));
    }

    #[test]
    fn empty_demonstration_is_ignored() {
        let (mut tree, mut labels) = learn(&[&[1, 2]]);
        let next = labels.peek();
        Encorporator::incorporate(&mut tree, &mut labels, &[]).expect("empty");
        assert_eq!(labels.peek(), next);
        assert_eq!(tree.leaf_count(), 2);
    }

    #[test]
    fn duplicate_action_rejected_before_mutation() {
        let (mut tree, mut labels) = learn(&[&[1, 2]]);
        let before = tree.clone();
        let err = Encorporator::incorporate(&mut tree, &mut labels, &ids(&[3, 3]));
        assert!(matches!(err, Err(ContiguityError::DuplicateAction(ActionId(3)))));
        assert!(tree.structurally_equals(&before));
        assert_eq!(tree.leaf_count(), 2);
    }

    #[test]
    fn new_action_spliced_into_sequence() {
        let (tree, _) = learn(&[&[1, 2, 3], &[1, 2, 4, 3]]);
        let root = root_group(&tree);
        assert_eq!(root.name(), "Sequential");
        assert_eq!(root.size(), 4);
        assert!(tree.accepts(&ids(&[1, 2, 4, 3])));
    }

    #[test]
    fn new_run_spliced_in_demonstrated_order() {
        let (tree, _) = learn(&[&[1, 2, 3], &[1, 2, 4, 5, 3]]);
        let root = root_group(&tree);
        assert_eq!(root.size(), 5);
        assert!(tree.accepts(&ids(&[1, 2, 4, 5, 3])));
        assert!(!tree.accepts(&ids(&[1, 2, 5, 4, 3])));
    }

    #[test]
    fn partial_demonstration_keeps_absent_leaves() {
        let (tree, _) = learn(&[&[1, 2, 3, 4], &[3, 1]]);
        assert_eq!(tree.leaf_count(), 4);
        assert!(tree.permits(&ids(&[3, 1])).expect("permits"));
        tree.check_invariants().expect("valid");
    }

    #[test]
    fn disjoint_demonstration_goes_beside_root() {
        let (tree, _) = learn(&[&[1, 2], &[3, 4]]);
        let root = root_group(&tree);
        assert_eq!(root.name(), "Unordered");
        assert_eq!(root.size(), 2);
        assert!(tree.accepts(&ids(&[3, 4, 1, 2])));
        assert!(tree.accepts(&ids(&[1, 2, 3, 4])));
    }

    #[test]
    fn disjoint_after_single_action_unwraps_root() {
        let (tree, _) = learn(&[&[1], &[2]]);
        let root = root_group(&tree);
        assert_eq!(root.name(), "Unordered");
        assert_eq!(root.size(), 2);
        tree.check_invariants().expect("valid");
    }

    #[test]
    fn completion_places_absent_leaves_beside_siblings() {
        let (tree, _) = learn(&[&[1, 2, 3, 4]]);
        let completed = Encorporator::complete(&tree, &ids(&[1, 3])).expect("complete");
        assert_eq!(completed, ids(&[1, 2, 3, 4]));

        let (tree, _) = learn(&[&[1, 2, 3, 4], &[4, 3, 2, 1]]);
        let completed = Encorporator::complete(&tree, &ids(&[4, 2])).expect("complete");
        assert_eq!(completed, ids(&[4, 3, 2, 1]));
    }

    #[test]
    fn trial_leaves_live_tree_untouched() {
        let (tree, labels) = learn(&[&[1, 2, 3]]);
        let trial = Encorporator::trial(&tree, &labels, &ids(&[3, 2, 1])).expect("trial");
        assert_eq!(root_group(&tree).name(), "Sequential");
        assert_eq!(root_group(&trial).name(), "Reversible");
    }
}
