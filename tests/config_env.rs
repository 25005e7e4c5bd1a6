// tests/config_env.rs
//
// Config loading through SENTIMENT_CONFIG_PATH and "ENV" key markers.
// These tests mutate process env, so they run serially.

use std::io::Write;

use serial_test::serial;
use tempfile::NamedTempFile;

use chat_sentiment_engine::config::{ENV_AZURE_KEY, ENV_CONFIG_PATH, ENV_OPENAI_KEY};
use chat_sentiment_engine::{AnalysisMode, EngineConfig, ProviderKind, Sensitivity};

fn toml_file(body: &str) -> NamedTempFile {
    let mut f = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("temp file");
    f.write_all(body.as_bytes()).expect("write config");
    f
}

#[test]
#[serial]
fn env_path_loads_toml_and_resolves_env_keys() {
    let f = toml_file(
        r#"
        analysis_provider = "openai"
        analysis_mode = "detailed"
        sensitivity_level = "high"
        confidence_threshold = 1.7

        [api_keys]
        openai = "ENV"
        azure = "ENV"

        [domain_specific_vocabulary.gaming]
        op = 0.7
        "#,
    );
    std::env::set_var(ENV_CONFIG_PATH, f.path());
    std::env::set_var(ENV_OPENAI_KEY, "sk-from-env");
    std::env::remove_var(ENV_AZURE_KEY);

    let cfg = EngineConfig::load_default().expect("load");
    assert_eq!(cfg.analysis_provider, ProviderKind::OpenAi);
    assert_eq!(cfg.analysis_mode, AnalysisMode::Detailed);
    assert_eq!(cfg.sensitivity_level, Sensitivity::High);
    assert_eq!(cfg.confidence_threshold, 1.0);
    assert_eq!(cfg.api_key(ProviderKind::OpenAi), Some("sk-from-env"));
    assert_eq!(cfg.api_key(ProviderKind::Azure), None, "missing env var drops the key");
    assert!(cfg.domain_specific_vocabulary.contains_key("gaming"));

    std::env::remove_var(ENV_CONFIG_PATH);
    std::env::remove_var(ENV_OPENAI_KEY);
}

#[test]
#[serial]
fn env_path_to_missing_file_is_an_error() {
    std::env::set_var(ENV_CONFIG_PATH, "/definitely/not/here/engine.toml");
    assert!(EngineConfig::load_default().is_err());
    std::env::remove_var(ENV_CONFIG_PATH);
}

#[tokio::test]
#[serial]
async fn app_builds_from_env_config() {
    let f = toml_file(
        r#"
        analysis_provider = "local"
        enabled_providers = ["local"]
        "#,
    );
    std::env::set_var(ENV_CONFIG_PATH, f.path());
    let app = chat_sentiment_engine::app().await;
    std::env::remove_var(ENV_CONFIG_PATH);
    assert!(app.is_ok());
}
