//! # Action Catalog
//!
//! Host-side mapping between action names and `ActionId`. Identifiers are
//! assigned in first-seen order starting at 0, so the same input file
//! always yields the same identifiers.

use contiguity_core::{ActionId, ContiguityError};
use std::collections::BTreeMap;

/// 1:1 mapping of action names to identifiers.
#[derive(Debug, Clone, Default)]
pub struct ActionCatalog {
    ids: BTreeMap<String, ActionId>,
    names: Vec<String>,
}

impl ActionCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Identifier of `name`, assigning the next one if unseen.
    pub fn intern(&mut self, name: &str) -> ActionId {
        if let Some(&id) = self.ids.get(name) {
            return id;
        }
        let id = ActionId(self.names.len() as u64);
        self.ids.insert(name.to_string(), id);
        self.names.push(name.to_string());
        id
    }

    /// Intern every name of a demonstration, in order.
    pub fn intern_all(&mut self, names: &[String]) -> Vec<ActionId> {
        names.iter().map(|name| self.intern(name)).collect()
    }

    /// Identifier of a known name.
    #[must_use]
    pub fn id(&self, name: &str) -> Option<ActionId> {
        self.ids.get(name).copied()
    }

    /// Name of a known identifier.
    #[must_use]
    pub fn name(&self, id: ActionId) -> Option<&str> {
        usize::try_from(id.0)
            .ok()
            .and_then(|index| self.names.get(index))
            .map(String::as_str)
    }

    /// Name of `id`, or its number when unknown.
    #[must_use]
    pub fn display(&self, id: ActionId) -> String {
        self.name(id)
            .map_or_else(|| format!("#{}", id.0), str::to_string)
    }

    /// Resolve names that must already be known.
    pub fn resolve(&self, names: &[String]) -> Result<Vec<ActionId>, ContiguityError> {
        names
            .iter()
            .map(|name| {
                self.id(name)
                    .ok_or_else(|| ContiguityError::InvalidInput(format!("Unknown action '{}'", name)))
            })
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn first_seen_order() {
        let mut catalog = ActionCatalog::new();
        let ids = catalog.intern_all(&names(&["boil", "pour", "boil", "stir"]));

        assert_eq!(ids, vec![ActionId(0), ActionId(1), ActionId(0), ActionId(2)]);
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.name(ActionId(2)), Some("stir"));
    }

    #[test]
    fn resolve_rejects_unknown() {
        let mut catalog = ActionCatalog::new();
        catalog.intern("a");

        assert_eq!(catalog.resolve(&names(&["a"])).expect("known"), vec![ActionId(0)]);
        assert!(matches!(
            catalog.resolve(&names(&["b"])),
            Err(ContiguityError::InvalidInput(_))
        ));
    }

    #[test]
    fn display_falls_back_to_number() {
        let catalog = ActionCatalog::new();
        assert_eq!(catalog.display(ActionId(7)), "#7");
    }
}
