//! Tests for layered configuration loading.

use super::*;
use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Write JSON5 contents to a path, creating parent directories if needed.
fn write_json5(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("dir");
    }
    fs::write(path, contents).expect("write");
}

/// A minimal config parses with defaults.
#[test]
fn parse_minimal_config() {
    let config = PipConfig::load_from_str("{}").expect("config");
    assert_eq!(config.assistant.name, "Pip");
    assert_eq!(config.assistant.history_window, 10);
    assert_eq!(config.classifier.confidence_threshold, 0.6);
    assert_eq!(config.recommender.top_n, 3);
    assert_eq!(config, PipConfig::default());
}

/// JSON5 comments and trailing commas are accepted.
#[test]
fn parses_json5_sections() {
    let json5 = r#"{
        // tighter recommendations
        recommender: { top_n: 2, candidate_pool: 8, },
        decide: { min_relevance: 0.5 },
    }"#;
    let config = PipConfig::load_from_str(json5).expect("config");
    assert_eq!(config.recommender.top_n, 2);
    assert_eq!(config.recommender.candidate_pool, 8);
    assert_eq!(config.decide.min_relevance, 0.5);
}

/// Unexpected top-level keys are rejected.
#[test]
fn rejects_unknown_top_level_key() {
    let err = PipConfig::load_from_str(r#"{ unexpected: true }"#).unwrap_err();
    assert!(format!("{err}").contains("unknown key"));
}

/// Wrong value types report the dotted path.
#[test]
fn rejects_wrong_field_type() {
    let err = PipConfig::load_from_str(r#"{ classifier: { confidence_threshold: "high" } }"#)
        .unwrap_err();
    let msg = format!("{err}");
    assert!(msg.contains("classifier.confidence_threshold"));
    assert!(msg.contains("expected number"));
}

/// History windows above the maximum are refused.
#[test]
fn rejects_oversized_history_window() {
    let err = PipConfig::load_from_str(r#"{ assistant: { history_window: 50 } }"#).unwrap_err();
    assert!(matches!(err, ConfigError::OutOfRange { ref path, .. } if path == "assistant.history_window"));
}

/// A candidate pool smaller than top_n is refused.
#[test]
fn rejects_pool_smaller_than_top_n() {
    let err = PipConfig::load_from_str(r#"{ recommender: { top_n: 5, candidate_pool: 2 } }"#)
        .unwrap_err();
    assert!(format!("{err}").contains("recommender.candidate_pool"));
}

/// Later layers win: user < project < cwd < runtime.
#[test]
fn layered_config_applies_precedence() {
    let temp = TempDir::new().expect("tmp");
    let root = temp.path();
    let project_root = root.join("project");
    fs::create_dir_all(project_root.join(".git")).expect("git");
    let cwd = project_root.join("subdir");
    fs::create_dir_all(&cwd).expect("cwd");

    let user_config = root.join("user.json5");
    write_json5(
        &user_config,
        "{ assistant: { name: \"user\" }, llm: { model: \"user-model\" } }",
    );
    write_json5(
        &project_root.join(DEFAULT_CONFIG_DIR).join(DEFAULT_CONFIG_FILE),
        "{ assistant: { name: \"project\" }, recommender: { top_n: 4 } }",
    );
    write_json5(&cwd.join(DEFAULT_CONFIG_FILE), "{ assistant: { name: \"cwd\" } }");
    let runtime = root.join("runtime.json5");
    write_json5(&runtime, "{ recommender: { top_n: 2 } }");

    let options = LayeredConfigOptions::new(&cwd)
        .with_user_path(Some(user_config))
        .with_runtime_path(&runtime);
    let layered = PipConfig::load_layered_with_options(options).expect("layered");

    assert_eq!(layered.config.assistant.name, "cwd");
    assert_eq!(layered.config.llm.model, "user-model");
    assert_eq!(layered.config.recommender.top_n, 2);
    let sources = layered
        .layers
        .iter()
        .map(|layer| layer.source)
        .collect::<Vec<_>>();
    assert_eq!(
        sources,
        vec![
            ConfigLayerSource::User,
            ConfigLayerSource::Project,
            ConfigLayerSource::Cwd,
            ConfigLayerSource::Runtime,
        ]
    );
}

/// Missing optional layers are skipped, missing runtime layers fail.
#[test]
fn missing_runtime_layer_is_an_error() {
    let temp = TempDir::new().expect("tmp");
    let options = LayeredConfigOptions::new(temp.path()).with_user_path(None);
    let layered = PipConfig::load_layered_with_options(options.clone()).expect("defaults");
    assert!(layered.layers.is_empty());

    let err = PipConfig::load_layered_with_options(
        options.with_runtime_path(temp.path().join("missing.json5")),
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::ReadFailed(_)));
}

/// Schema errors name the offending layer.
#[test]
fn layer_errors_include_layer_label() {
    let temp = TempDir::new().expect("tmp");
    write_json5(
        &temp.path().join(DEFAULT_CONFIG_FILE),
        "{ photo: { blur: 1 } }",
    );
    let options = LayeredConfigOptions::new(temp.path()).with_user_path(None);
    let err = PipConfig::load_layered_with_options(options).unwrap_err();
    let msg = format!("{err}");
    assert!(msg.contains("cwd("));
    assert!(msg.contains("photo.blur"));
}
