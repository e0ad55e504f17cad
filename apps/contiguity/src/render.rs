//! # Tree Rendering
//!
//! Text and JSON views of a contiguity tree, with action names resolved
//! through the catalog.
//!
//! Text output is one node per line:
//!
//! ```text
//! Sequential [4]
//!   Unordered [5]
//!     boil
//!     grind
//!   pour
//! ```

use crate::catalog::ActionCatalog;
use contiguity_core::{ContiguityError, ContiguityTree, TaskId, TaskKind};
use serde_json::{Value, json};

/// Indented text view. Empty string for an empty tree.
pub fn tree_text(
    tree: &ContiguityTree,
    catalog: &ActionCatalog,
    indent: usize,
) -> Result<String, ContiguityError> {
    let mut out = String::new();
    let Some(root) = tree.root() else {
        return Ok(out);
    };

    let mut stack = vec![(root, 0usize)];
    while let Some((id, depth)) = stack.pop() {
        let task = tree.task(id)?;
        out.push_str(&" ".repeat(depth * indent));
        match task.kind() {
            TaskKind::Primitive(action) => out.push_str(&catalog.display(*action)),
            TaskKind::Group(group) => {
                out.push_str(&format!("{} [{}]", group.name(), task.label()));
                stack.extend(group.sub_tasks().into_iter().rev().map(|c| (c, depth + 1)));
            }
        }
        out.push('\n');
    }
    Ok(out)
}

/// JSON view. `null` for an empty tree.
pub fn tree_json(tree: &ContiguityTree, catalog: &ActionCatalog) -> Result<Value, ContiguityError> {
    match tree.root() {
        Some(root) => node_json(tree, catalog, root),
        None => Ok(Value::Null),
    }
}

fn node_json(
    tree: &ContiguityTree,
    catalog: &ActionCatalog,
    id: TaskId,
) -> Result<Value, ContiguityError> {
    let task = tree.task(id)?;
    match task.kind() {
        TaskKind::Primitive(action) => Ok(json!({ "action": catalog.display(*action) })),
        TaskKind::Group(group) => {
            let children = group
                .sub_tasks()
                .into_iter()
                .map(|child| node_json(tree, catalog, child))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(json!({
                "kind": group.name(),
                "label": task.label().id(),
                "size": task.absolute_size(),
                "children": children,
            }))
        }
    }
}

/// Names of `actions`, comma separated.
pub fn action_list(catalog: &ActionCatalog, actions: &[contiguity_core::ActionId]) -> String {
    actions
        .iter()
        .map(|a| catalog.display(*a))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use contiguity_core::Session;

    fn learned(demos: &[&[&str]]) -> (Session, ActionCatalog) {
        let mut catalog = ActionCatalog::new();
        let mut session = Session::new();
        for demo in demos {
            let names: Vec<String> = demo.iter().map(|s| s.to_string()).collect();
            let ids = catalog.intern_all(&names);
            session.observe(&ids).expect("observe");
        }
        (session, catalog)
    }

    #[test]
    fn text_lists_leaves_in_stored_order() {
        let (session, catalog) = learned(&[&["a", "b", "c"]]);
        let text = tree_text(session.tree(), &catalog, 2).expect("render");

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("Sequential ["));
        assert_eq!(&lines[1..], &["  a", "  b", "  c"]);
    }

    #[test]
    fn json_nests_groups() {
        let (session, catalog) = learned(&[&["a", "b", "c"], &["b", "a", "c"]]);
        let value = tree_json(session.tree(), &catalog).expect("render");

        assert_eq!(value["kind"], "Sequential");
        assert_eq!(value["size"], 3);
        assert_eq!(value["children"][0]["kind"], "Unordered");
        assert_eq!(value["children"][1]["action"], "c");
    }

    #[test]
    fn empty_tree_renders_nothing() {
        let (session, catalog) = learned(&[]);
        assert_eq!(tree_text(session.tree(), &catalog, 2).expect("render"), "");
        assert_eq!(tree_json(session.tree(), &catalog).expect("render"), Value::Null);
    }
}
