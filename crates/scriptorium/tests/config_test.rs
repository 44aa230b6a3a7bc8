//! Configuration layering tests.

use scriptorium::{
    BackendConfig, OrchestratorSettings, RetryPolicy, ScriptoriumConfig, SummaryMode,
};
use std::collections::HashMap;

#[test]
fn test_bundled_defaults_match_code_defaults() {
    let config = ScriptoriumConfig::bundled().unwrap();
    assert_eq!(config.retry(), &RetryPolicy::default());
    assert_eq!(config.generation(), &OrchestratorSettings::default());
    assert_eq!(config.backend(), &BackendConfig::default());
}

#[test]
fn test_file_overrides_only_named_keys() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("custom.toml");
    std::fs::write(
        &path,
        "[retry]\nmax_retries = 5\n\n[generation]\nsummary = \"heuristic\"\nmax_words_per_segment = 2000\n\n[backend]\nmodel = \"local-model\"\n",
    )
    .unwrap();

    let config = ScriptoriumConfig::from_file(&path).unwrap();
    assert_eq!(*config.retry().max_retries(), 5);
    assert_eq!(*config.retry().base_delay_ms(), 15_000);
    assert_eq!(*config.generation().summary(), SummaryMode::Heuristic);
    assert_eq!(*config.generation().max_words_per_segment(), 2000);
    assert_eq!(*config.generation().word_count_buffer_factor(), 2.8);
    assert_eq!(config.backend().model(), "local-model");
    assert_eq!(config.backend().api_key_env(), "SCRIPTORIUM_API_KEY");
}

#[test]
fn test_missing_explicit_file_is_a_configuration_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = ScriptoriumConfig::load(Some(&dir.path().join("absent.toml"))).unwrap_err();
    assert!(err.is_configuration());
}

#[test]
fn test_api_key_lookup_order() {
    let backend = BackendConfig::default();
    let env: HashMap<&str, &str> = [("SCRIPTORIUM_API_KEY", "primary"), ("NEBIUS_API_KEY", "fallback")]
        .into_iter()
        .collect();
    let key = backend
        .api_key_from(|name| env.get(name).map(|v| v.to_string()))
        .unwrap();
    assert_eq!(key, "primary");

    let key = backend
        .api_key_from(|name| (name == "NEBIUS_API_KEY").then(|| "fallback".to_string()))
        .unwrap();
    assert_eq!(key, "fallback");

    let err = backend
        .api_key_from(|name| (name == "SCRIPTORIUM_API_KEY").then(|| "  ".to_string()))
        .unwrap_err();
    assert!(err.is_configuration());
    assert!(err.to_string().contains("SCRIPTORIUM_API_KEY"));
}
