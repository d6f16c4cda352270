use std::io::Write;
use std::sync::Arc;

use tempfile::NamedTempFile;

use iris_refine::refine::NoopProvider;
use iris_refine::{Mode, PatternCatalog, PolicyCategory, RefineConfig, ReflectionController};

const CUSTOM_CATALOG: &str = r#"
version = "test-1"
default_locale = "de"

[critical]
keywords = ["TOPSECRET"]

[[categories]]
name = "development"
query_patterns = ['(?i)\bproject\s+falcon\b']

[replies.development]
de = "Dazu kann ich nichts sagen."

[replies.default]
de = "Das kann ich nicht beantworten."
"#;

fn write_temp(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn file_overrides_mode_presets() {
    let file = write_temp(
        r#"
default_mode = "deep"

[modes.fast]
max_steps = 1
max_latency_ms = 750
max_output_size = 500
improvement_epsilon = 0.1
tool_call_cap = 1

[weights]
relevance = 2.0
"#,
    );

    let config = RefineConfig::load_from(file.path()).unwrap();
    assert_eq!(config.default_mode, Mode::Deep);
    assert_eq!(config.config_path, file.path());

    let fast = config.engine_config(Mode::Fast);
    assert_eq!(fast.max_steps, 1);
    assert_eq!(fast.max_latency.as_millis(), 750);
    assert_eq!(fast.max_output_size, 500);
    assert!((fast.weights.relevance - 2.0).abs() < f64::EPSILON);

    let normal = config.engine_config(Mode::Normal);
    assert_eq!(normal.max_steps, 3);
    assert_eq!(normal.tool_call_cap, 3);
}

#[test]
fn invalid_config_is_rejected() {
    let file = write_temp(
        r#"
[modes.normal]
max_steps = 3
max_latency_ms = 0
max_output_size = 4000
improvement_epsilon = 0.03
tool_call_cap = 3
"#,
    );
    assert!(RefineConfig::load_from(file.path()).is_err());
}

#[tokio::test]
async fn controller_uses_external_catalog() {
    let catalog_file = write_temp(CUSTOM_CATALOG);
    let mut config = RefineConfig::default();
    config.policy.catalog_path = Some(catalog_file.path().display().to_string());
    config.policy.default_locale = "de".into();

    let catalog = PatternCatalog::from_config(&config).unwrap();
    assert_eq!(catalog.version(), "test-1");
    assert_eq!(catalog.fingerprint().len(), 64);

    let controller = ReflectionController::from_config(&config, Arc::new(NoopProvider)).unwrap();
    let query = "What is the status of Project Falcon?";
    assert_eq!(
        controller.filter().should_use_policy_response(query),
        (true, Some(PolicyCategory::Development))
    );
    // The built-in architecture patterns are not part of this catalog.
    assert_eq!(
        controller
            .filter()
            .should_use_policy_response("Explain your internal architecture"),
        (false, None)
    );

    let result = controller
        .enhance("draft", query, &iris_refine::RequestContext::new(query), Mode::Fast)
        .await;
    assert_eq!(result.final_response, "Dazu kann ich nichts sagen.");
}

#[test]
fn catalog_without_default_reply_is_rejected() {
    let file = write_temp(
        r#"
version = "broken"

[[categories]]
name = "technical"
query_patterns = ['(?i)\bsecrets\b']
"#,
    );
    assert!(PatternCatalog::load(file.path()).is_err());
}

#[test]
fn missing_catalog_file_fails_controller_construction() {
    let mut config = RefineConfig::default();
    config.policy.catalog_path = Some("/definitely/not/here/catalog.toml".into());
    assert!(ReflectionController::from_config(&config, Arc::new(NoopProvider)).is_err());
}
