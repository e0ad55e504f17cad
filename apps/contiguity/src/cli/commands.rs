//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use super::Output;
use crate::catalog::ActionCatalog;
use crate::config::Config;
use crate::render::{action_list, tree_json, tree_text};
use contiguity_core::{ActionId, ContiguityError, Session, TreeMetrics};
use std::path::{Path, PathBuf};

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum demonstration file size (16 MB).
///
/// This prevents memory exhaustion from malicious or accidental large files.
const MAX_INPUT_FILE_SIZE: u64 = 16 * 1024 * 1024;

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), ContiguityError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| ContiguityError::IoError(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(ContiguityError::InvalidInput(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Validate file path: resolves `..` and symlinks, and requires a regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, ContiguityError> {
    let canonical = path.canonicalize().map_err(|e| {
        ContiguityError::IoError(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(ContiguityError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

// =============================================================================
// INPUT PARSING
// =============================================================================

/// Split a comma-separated action list. Blank entries are dropped.
pub fn split_actions(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse demonstrations from file contents.
///
/// - `json`: an array of arrays of action names
/// - `text`: one demonstration per line, comma separated; blank lines and
///   lines starting with `#` are skipped
pub fn parse_demonstrations(
    contents: &[u8],
    format: &str,
) -> Result<Vec<Vec<String>>, ContiguityError> {
    match format {
        "json" => serde_json::from_slice(contents).map_err(|e| {
            ContiguityError::SerializationError(format!("Invalid demonstration file: {}", e))
        }),
        "text" => {
            let text = std::str::from_utf8(contents).map_err(|e| {
                ContiguityError::SerializationError(format!("Input is not UTF-8: {}", e))
            })?;
            Ok(text
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#'))
                .map(split_actions)
                .collect())
        }
        _ => Err(ContiguityError::InvalidInput(format!(
            "Unknown format: {}",
            format
        ))),
    }
}

/// Read and parse a demonstration file.
pub fn read_demonstrations(
    file: &Path,
    format: &str,
) -> Result<Vec<Vec<String>>, ContiguityError> {
    let validated_path = validate_file_path(file)?;
    validate_file_size(&validated_path, MAX_INPUT_FILE_SIZE)?;

    let contents = std::fs::read(&validated_path)
        .map_err(|e| ContiguityError::IoError(format!("Read file: {}", e)))?;
    parse_demonstrations(&contents, format)
}

// =============================================================================
// LEARNING
// =============================================================================

/// A session trained on a demonstration file.
#[derive(Debug, Clone)]
pub struct Learned {
    pub session: Session,
    pub catalog: ActionCatalog,
    pub demonstrations: Vec<Vec<ActionId>>,
}

impl Learned {
    /// Incorporate `demonstrations` one by one into a fresh session.
    pub fn from_demonstrations(
        config: &Config,
        demonstrations: &[Vec<String>],
    ) -> Result<Self, ContiguityError> {
        let mut session = Session::with_label_start(config.learning.label_start);
        let mut catalog = ActionCatalog::new();
        let mut learned = Vec::with_capacity(demonstrations.len());

        for (index, names) in demonstrations.iter().enumerate() {
            let ids = catalog.intern_all(names);
            session.observe(&ids).map_err(|e| match e {
                ContiguityError::DuplicateAction(action) => {
                    ContiguityError::InvalidInput(format!(
                        "Demonstration {} repeats action '{}'",
                        index + 1,
                        catalog.display(action)
                    ))
                }
                other => other,
            })?;
            tracing::debug!(index, actions = ids.len(), "incorporated demonstration");
            learned.push(ids);
        }

        let learned = Self {
            session,
            catalog,
            demonstrations: learned,
        };
        if config.learning.verify {
            learned.verify()?;
        }
        Ok(learned)
    }

    /// Read a file and learn from it.
    pub fn from_file(config: &Config, file: &Path, format: &str) -> Result<Self, ContiguityError> {
        tracing::info!("Learning from {:?} (format: {})", file, format);
        let demonstrations = read_demonstrations(file, format)?;
        Self::from_demonstrations(config, &demonstrations)
    }

    /// Every demonstration must still be permitted.
    ///
    /// Demonstrations that predate later-introduced actions are checked as
    /// projections of some accepted execution.
    pub fn verify(&self) -> Result<(), ContiguityError> {
        let tree = self.session.tree();
        for (index, demo) in self.demonstrations.iter().enumerate() {
            if !tree.permits(demo)? {
                return Err(ContiguityError::InvariantViolation(format!(
                    "demonstration {} is no longer accepted",
                    index + 1
                )));
            }
        }
        Ok(())
    }
}

fn print_json(value: &serde_json::Value) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).unwrap_or_default()
    );
}

// =============================================================================
// LEARN COMMAND
// =============================================================================

/// Learn from a file and print the tree.
pub fn cmd_learn(
    config: &Config,
    output: Output,
    file: &Path,
    format: &str,
) -> Result<(), ContiguityError> {
    let learned = Learned::from_file(config, file, format)?;
    let tree = learned.session.tree();

    if output.json {
        print_json(&serde_json::json!({
            "demonstrations": learned.session.demonstrations(),
            "actions": learned.catalog.len(),
            "tree": tree_json(tree, &learned.catalog)?,
        }));
        return Ok(());
    }

    if !output.quiet {
        println!(
            "Learned {} demonstrations over {} actions",
            learned.session.demonstrations(),
            learned.catalog.len()
        );
        println!();
    }
    print!("{}", tree_text(tree, &learned.catalog, output.indent)?);

    Ok(())
}

// =============================================================================
// NEXT COMMAND
// =============================================================================

/// Replay `done` and list the legal next actions.
pub fn next_actions(
    learned: &mut Learned,
    done: Option<&str>,
) -> Result<Vec<ActionId>, ContiguityError> {
    let done = done.map(split_actions).unwrap_or_default();
    let done = learned.catalog.resolve(&done)?;

    for action in done {
        learned.session.complete(action).map_err(|e| match e {
            ContiguityError::IllegalAction(action) => ContiguityError::InvalidInput(format!(
                "Action '{}' cannot run at this point",
                learned.catalog.display(action)
            )),
            other => other,
        })?;
    }
    Ok(learned.session.next_actions())
}

/// Show the actions that may legally run next.
pub fn cmd_next(
    config: &Config,
    output: Output,
    file: &Path,
    format: &str,
    done: Option<&str>,
) -> Result<(), ContiguityError> {
    let mut learned = Learned::from_file(config, file, format)?;
    let next = next_actions(&mut learned, done)?;
    let finished = learned.session.is_finished();

    if output.json {
        let names: Vec<String> = next.iter().map(|a| learned.catalog.display(*a)).collect();
        print_json(&serde_json::json!({
            "next": names,
            "finished": finished,
        }));
        return Ok(());
    }

    if finished {
        println!("All actions done");
    } else {
        if !output.quiet {
            println!("Next possible actions:");
        }
        println!("{}", action_list(&learned.catalog, &next));
    }

    Ok(())
}

// =============================================================================
// CHECK COMMAND
// =============================================================================

/// Result of checking a candidate demonstration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckReport {
    /// The tree already accepts the candidate as a full execution.
    pub accepted: bool,
    /// Incorporating the candidate would change the tree.
    pub restructures: bool,
    /// Candidate actions the tree has never seen.
    pub new_actions: Vec<String>,
}

/// Check `candidate` against the learned tree without changing it.
pub fn check_candidate(
    learned: &Learned,
    candidate: &str,
) -> Result<CheckReport, ContiguityError> {
    let names = split_actions(candidate);
    let new_actions: Vec<String> = names
        .iter()
        .filter(|name| learned.catalog.id(name).is_none())
        .cloned()
        .collect();

    let mut catalog = learned.catalog.clone();
    let ids = catalog.intern_all(&names);

    let accepted = new_actions.is_empty() && learned.session.accepts(&ids);
    let trial = learned.session.trial(&ids)?;
    let restructures = !trial.structurally_equals(learned.session.tree());

    Ok(CheckReport {
        accepted,
        restructures,
        new_actions,
    })
}

/// Check a candidate demonstration.
pub fn cmd_check(
    config: &Config,
    output: Output,
    file: &Path,
    format: &str,
    candidate: &str,
) -> Result<(), ContiguityError> {
    let learned = Learned::from_file(config, file, format)?;
    let report = check_candidate(&learned, candidate)?;

    if output.json {
        print_json(&serde_json::json!({
            "accepted": report.accepted,
            "restructures": report.restructures,
            "new_actions": report.new_actions,
        }));
        return Ok(());
    }

    println!("Accepted:     {}", report.accepted);
    println!("Restructures: {}", report.restructures);
    if !report.new_actions.is_empty() {
        println!("New actions:  {}", report.new_actions.join(", "));
    }

    Ok(())
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Show tree metrics.
pub fn cmd_status(
    config: &Config,
    output: Output,
    file: &Path,
    format: &str,
) -> Result<(), ContiguityError> {
    let learned = Learned::from_file(config, file, format)?;
    let metrics = TreeMetrics::from_tree(learned.session.tree());

    if output.json {
        print_json(&serde_json::json!({
            "file": file.to_string_lossy(),
            "demonstrations": learned.session.demonstrations(),
            "metrics": metrics,
        }));
        return Ok(());
    }

    println!("Contiguity Tree Status");
    println!("======================");
    println!("File:           {:?}", file);
    println!("Demonstrations: {}", learned.session.demonstrations());
    println!();
    println!("Tasks:          {}", metrics.task_count);
    println!("Primitives:     {}", metrics.primitive_count);
    println!("Sequential:     {}", metrics.sequential_count);
    println!("Reversible:     {}", metrics.reversible_count);
    println!("Unordered:      {}", metrics.unordered_count);
    println!("Max Depth:      {}", metrics.max_depth);

    Ok(())
}
