//! # Demonstration Module
//!
//! Validation of incoming demonstrations before any tree mutation.
//!
//! - Reject an action repeated within one demonstration
//! - Reject demonstrations longer than `MAX_DEMONSTRATION_LENGTH`
//! - No inference: unknown actions are accepted as new evidence

use crate::primitives::MAX_DEMONSTRATION_LENGTH;
use crate::{ActionId, ContiguityError};
use std::collections::BTreeMap;

/// Validation and indexing of demonstrations.
pub struct Demonstration;

impl Demonstration {
    /// Validate a demonstration.
    ///
    /// Returns `ContiguityError::DemonstrationTooLong` or
    /// `ContiguityError::DuplicateAction` if validation fails.
    pub fn validate(actions: &[ActionId]) -> Result<(), ContiguityError> {
        Self::positions(actions).map(|_| ())
    }

    /// Validate a demonstration and map every action to its position.
    pub fn positions(actions: &[ActionId]) -> Result<BTreeMap<ActionId, usize>, ContiguityError> {
        if actions.len() > MAX_DEMONSTRATION_LENGTH {
            return Err(ContiguityError::DemonstrationTooLong(actions.len()));
        }
        let mut positions = BTreeMap::new();
        for (index, &action) in actions.iter().enumerate() {
            if positions.insert(action, index).is_some() {
                return Err(ContiguityError::DuplicateAction(action));
            }
        }
        Ok(positions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_distinct_actions() {
        let demo = [ActionId(3), ActionId(1), ActionId(2)];
        let positions = Demonstration::positions(&demo).expect("valid");
        assert_eq!(positions.get(&ActionId(1)), Some(&1));
        assert_eq!(positions.len(), 3);
    }

    #[test]
    fn rejects_repeated_action() {
        let demo = [ActionId(1), ActionId(2), ActionId(1)];
        assert!(matches!(
            Demonstration::validate(&demo),
            Err(ContiguityError::DuplicateAction(ActionId(1)))
        ));
    }

    #[test]
    fn rejects_oversized_demonstration() {
        let demo: Vec<ActionId> = (0..=MAX_DEMONSTRATION_LENGTH as u64).map(ActionId).collect();
        assert!(matches!(
            Demonstration::validate(&demo),
            Err(ContiguityError::DemonstrationTooLong(_))
        ));
    }

    #[test]
    fn empty_demonstration_is_valid() {
        assert!(Demonstration::validate(&[]).is_ok());
    }
}
