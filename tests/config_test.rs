//! Integration tests for Settings config loading with layered merge semantics.
//!
//! Merge Semantics:
//! - Defaults → Global → Local file: overlay wins per field
//! - Lists (branching, args): REPLACE, never union
//!
//! Note: These tests run from temp directories only; a global config on the
//! test machine would shift the baseline but not the overlay assertions.

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

use deductree::application::ApplicationError;
use deductree::config::{BranchEntry, Settings};

#[test]
fn given_explicit_config_file_when_load_then_overlays_specified_fields() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("custom.toml");
    fs::write(
        &path,
        r#"
output_dir = "/tmp/records"
seed = 42

[expansion]
max_retries = 5

[producer]
command = "llm"
args = ["-m", "gpt-4o"]
"#,
    )
    .unwrap();

    // Act
    let settings = Settings::load(Some(&path)).expect("load settings");

    // Assert
    assert_eq!(settings.output_dir, PathBuf::from("/tmp/records"));
    assert_eq!(settings.seed, Some(42));
    assert_eq!(settings.expansion.max_retries, 5);
    assert_eq!(settings.producer.command.as_deref(), Some("llm"));
    assert_eq!(settings.producer.args, vec!["-m", "gpt-4o"]);
}

#[test]
fn given_missing_explicit_file_when_load_then_config_error() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.toml");

    // Act
    let result = Settings::load(Some(&path));

    // Assert
    assert!(matches!(result, Err(ApplicationError::Config { .. })));
}

#[test]
fn given_malformed_toml_when_load_file_then_config_error_names_file() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.toml");
    fs::write(&path, "[expansion\nmax_retries = ").unwrap();

    // Act
    let err = Settings::load_file(&path).unwrap_err();

    // Assert
    assert!(err.to_string().contains("broken.toml"));
}

#[test]
fn given_branching_list_when_load_file_then_replaces_default_list() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("shape.toml");
    fs::write(
        &path,
        r#"
[structure]
depth = 4
prune = true
branching = [{ depth = 3, probability = 0.5 }]
"#,
    )
    .unwrap();

    // Act
    let settings = Settings::load_file(&path).unwrap();

    // Assert
    assert_eq!(settings.structure.depth, 4);
    assert!(settings.structure.prune);
    assert_eq!(
        settings.structure.branching,
        vec![BranchEntry {
            depth: 3,
            probability: 0.5
        }]
    );
    let policy = settings.structure.branching_policy();
    assert_eq!(policy.probability(2), 1.0);
    assert_eq!(policy.probability(3), 0.5);
}

#[test]
fn given_partial_file_when_load_file_then_other_sections_keep_defaults() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("judge.toml");
    fs::write(
        &path,
        r#"
[judge]
command = "judge-cli"
early_escape_command = "cheap-judge"
"#,
    )
    .unwrap();

    // Act
    let settings = Settings::load_file(&path).unwrap();

    // Assert
    let defaults = Settings::default();
    assert_eq!(settings.judge.command.as_deref(), Some("judge-cli"));
    assert_eq!(
        settings.judge.early_escape_command.as_deref(),
        Some("cheap-judge")
    );
    assert_eq!(settings.structure, defaults.structure);
    assert_eq!(settings.expansion, defaults.expansion);
    assert_eq!(settings.producer, defaults.producer);
}

#[test]
fn given_template_when_loaded_as_file_then_equals_defaults() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("template.toml");
    fs::write(&path, Settings::template()).unwrap();

    // Act
    let settings = Settings::load_file(&path).unwrap();

    // Assert
    assert_eq!(settings, Settings::default());
}
