//! Integration tests for the CLI commands and demonstration files.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use contiguity::cli::{
    Learned, Output, check_candidate, cmd_check, cmd_learn, cmd_next, cmd_status, next_actions,
    parse_demonstrations, read_demonstrations, split_actions,
};
use contiguity::config::Config;
use contiguity_core::ContiguityError;
use std::io::Write;
use tempfile::NamedTempFile;

fn write_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn quiet() -> Output {
    Output {
        json: false,
        indent: 2,
        quiet: true,
    }
}

const COFFEE_JSON: &str = r#"[
    ["grind", "boil", "brew", "pour"],
    ["boil", "grind", "brew", "pour"]
]"#;

const COFFEE_TEXT: &str = "# coffee\ngrind, boil, brew, pour\n\nboil,grind,brew,pour\n";

// =============================================================================
// PARSING TESTS
// =============================================================================

#[test]
fn test_split_actions_trims_and_drops_blanks() {
    assert_eq!(split_actions(" a, b,,c "), vec!["a", "b", "c"]);
    assert!(split_actions("").is_empty());
}

#[test]
fn test_json_and_text_formats_agree() {
    let json = parse_demonstrations(COFFEE_JSON.as_bytes(), "json").unwrap();
    let text = parse_demonstrations(COFFEE_TEXT.as_bytes(), "text").unwrap();
    assert_eq!(json, text);
    assert_eq!(json.len(), 2);
}

#[test]
fn test_unknown_format_rejected() {
    let result = parse_demonstrations(b"a,b", "yaml");
    assert!(matches!(result, Err(ContiguityError::InvalidInput(_))));
}

#[test]
fn test_malformed_json_rejected() {
    let result = parse_demonstrations(b"[[\"a\", 1]]", "json");
    assert!(matches!(result, Err(ContiguityError::SerializationError(_))));
}

#[test]
fn test_missing_file_rejected() {
    let result = read_demonstrations(std::path::Path::new("/nonexistent/demos.json"), "json");
    assert!(matches!(result, Err(ContiguityError::IoError(_))));
}

#[test]
fn test_directory_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let result = read_demonstrations(dir.path(), "json");
    assert!(matches!(result, Err(ContiguityError::IoError(_))));
}

// =============================================================================
// LEARNING TESTS
// =============================================================================

#[test]
fn test_learn_from_file() {
    let file = write_file(COFFEE_JSON);
    let learned = Learned::from_file(&Config::default(), file.path(), "json").unwrap();

    assert_eq!(learned.session.demonstrations(), 2);
    assert_eq!(learned.catalog.len(), 4);
    assert_eq!(learned.session.tree().leaf_count(), 4);
}

#[test]
fn test_repeated_action_names_the_action() {
    let demos = vec![vec!["a".to_string(), "b".to_string(), "a".to_string()]];
    let err = Learned::from_demonstrations(&Config::default(), &demos).unwrap_err();

    match err {
        ContiguityError::InvalidInput(message) => assert!(message.contains("'a'")),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_label_start_from_config() {
    let config = Config::from_toml_str("[learning]\nlabel_start = 500\n").unwrap();
    let demos = vec![vec!["a".to_string(), "b".to_string()]];
    let learned = Learned::from_demonstrations(&config, &demos).unwrap();

    assert!(learned.session.tree().tasks().all(|t| t.label().id() >= 500));
}

#[test]
fn test_verify_checks_partial_demonstrations() {
    let config = Config::from_toml_str("[learning]\nverify = true\n").unwrap();
    let demos: Vec<Vec<String>> = [vec!["grind", "brew"], vec!["boil", "grind", "brew", "pour"]]
        .iter()
        .map(|demo| demo.iter().map(|name| name.to_string()).collect())
        .collect();
    let mut learned = Learned::from_demonstrations(&config, &demos).unwrap();
    learned.verify().unwrap();

    // A partial demonstration the tree does not permit is reported.
    let brew = learned.catalog.id("brew").unwrap();
    let grind = learned.catalog.id("grind").unwrap();
    learned.demonstrations.push(vec![brew, grind]);
    let result = learned.verify();
    assert!(matches!(result, Err(ContiguityError::InvariantViolation(_))));
}

// =============================================================================
// NEXT / CHECK TESTS
// =============================================================================

#[test]
fn test_next_after_unordered_prefix() {
    let file = write_file(COFFEE_JSON);
    let mut learned = Learned::from_file(&Config::default(), file.path(), "json").unwrap();

    let next = next_actions(&mut learned, Some("boil")).unwrap();
    let names: Vec<String> = next.iter().map(|a| learned.catalog.display(*a)).collect();
    assert_eq!(names, vec!["grind"]);
}

#[test]
fn test_next_rejects_illegal_done() {
    let file = write_file(COFFEE_JSON);
    let mut learned = Learned::from_file(&Config::default(), file.path(), "json").unwrap();

    let result = next_actions(&mut learned, Some("pour"));
    assert!(matches!(result, Err(ContiguityError::InvalidInput(_))));
}

#[test]
fn test_next_rejects_unknown_done() {
    let file = write_file(COFFEE_JSON);
    let mut learned = Learned::from_file(&Config::default(), file.path(), "json").unwrap();

    let result = next_actions(&mut learned, Some("milk"));
    assert!(matches!(result, Err(ContiguityError::InvalidInput(_))));
}

#[test]
fn test_check_accepted_candidate() {
    let file = write_file(COFFEE_JSON);
    let learned = Learned::from_file(&Config::default(), file.path(), "json").unwrap();

    let report = check_candidate(&learned, "boil,grind,brew,pour").unwrap();
    assert!(report.accepted);
    assert!(!report.restructures);
    assert!(report.new_actions.is_empty());
}

#[test]
fn test_check_conflicting_candidate() {
    let file = write_file(COFFEE_JSON);
    let learned = Learned::from_file(&Config::default(), file.path(), "json").unwrap();

    let report = check_candidate(&learned, "grind,boil,pour,brew").unwrap();
    assert!(!report.accepted);
    assert!(report.restructures);
}

#[test]
fn test_check_reports_new_actions() {
    let file = write_file(COFFEE_JSON);
    let learned = Learned::from_file(&Config::default(), file.path(), "json").unwrap();

    let report = check_candidate(&learned, "grind,boil,brew,pour,milk").unwrap();
    assert!(!report.accepted);
    assert!(report.restructures);
    assert_eq!(report.new_actions, vec!["milk"]);
    // The live tree is untouched.
    assert_eq!(learned.session.tree().leaf_count(), 4);
}

// =============================================================================
// COMMAND TESTS
// =============================================================================

#[test]
fn test_commands_run_on_text_file() {
    let file = write_file(COFFEE_TEXT);
    let config = Config::default();

    cmd_learn(&config, quiet(), file.path(), "text").unwrap();
    cmd_next(&config, quiet(), file.path(), "text", Some("grind")).unwrap();
    cmd_check(&config, quiet(), file.path(), "text", "boil,grind,brew,pour").unwrap();
    cmd_status(&config, quiet(), file.path(), "text").unwrap();
}

#[test]
fn test_commands_run_in_json_mode() {
    let file = write_file(COFFEE_JSON);
    let config = Config::default();
    let json = Output {
        json: true,
        ..quiet()
    };

    cmd_learn(&config, json, file.path(), "json").unwrap();
    cmd_status(&config, json, file.path(), "json").unwrap();
}

#[test]
fn test_config_file_loaded_from_path() {
    let file = write_file("[output]\njson = true\nindent = 4\n");
    let config = Config::load(Some(file.path())).unwrap();

    assert!(config.output.json);
    assert_eq!(config.output.indent, 4);
}

#[test]
fn test_missing_config_path_rejected() {
    let result = Config::load(Some(std::path::Path::new("/nonexistent/contiguity.toml")));
    assert!(matches!(result, Err(ContiguityError::IoError(_))));
}
