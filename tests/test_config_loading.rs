//! Configuration loading and validation tests
//!
//! Tests focus on observable behavior of loading, validation and secret
//! resolution, not on TOML parsing details.

use quizchain::config::{AppConfig, ConfigError, FetcherMode};
use std::collections::HashMap;
use std::io::Write;
use tempfile::NamedTempFile;

fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let env: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |name: &str| env.get(name).cloned()
}

#[test]
fn test_config_loads_successfully_from_valid_toml() {
    let mut temp_file = NamedTempFile::new().unwrap();
    writeln!(
        temp_file,
        r#"
[identity]
email_env = "QUIZ_EMAIL"
secret_env = "QUIZ_SECRET"

[server]
host = "127.0.0.1"
port = 9000

[chain]
max_attempts = 10
solver_timeout_secs = 30

[fetcher]
mode = "http"
page_load_timeout_ms = 5000
settle_delay_ms = 250

[llm]
model = "gpt-4o"
token_envs = ["MY_TOKEN"]
"#
    )
    .unwrap();

    let config = AppConfig::load_from_file(temp_file.path()).unwrap();

    assert_eq!(config.identity.email_env, "QUIZ_EMAIL");
    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.server.port, 9000);
    assert_eq!(config.chain.max_attempts, 10);
    assert_eq!(config.chain.solver_timeout_secs, 30);
    assert_eq!(config.fetcher.mode, FetcherMode::Http);
    assert_eq!(config.fetcher.settle_delay_ms, 250);
    assert_eq!(config.llm.model, "gpt-4o");
    assert_eq!(config.llm.token_envs, vec!["MY_TOKEN"]);
}

#[test]
fn test_explicit_path_wins_over_defaults() {
    let mut temp_file = NamedTempFile::new().unwrap();
    writeln!(temp_file, "[server]\nport = 7070").unwrap();

    let config = AppConfig::load(Some(temp_file.path())).unwrap();
    assert_eq!(config.server.port, 7070);
    assert_eq!(config.chain.max_attempts, 15);
}

#[test]
fn test_missing_explicit_file_is_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = AppConfig::load(Some(&dir.path().join("absent.toml")));
    assert!(matches!(result, Err(ConfigError::FileRead(_))));
}

#[test]
fn test_invalid_toml_is_parse_error() {
    let mut temp_file = NamedTempFile::new().unwrap();
    writeln!(temp_file, "[chain\nmax_attempts = ").unwrap();

    let result = AppConfig::load_from_file(temp_file.path());
    assert!(matches!(result, Err(ConfigError::TomlParse(_))));
}

#[test]
fn test_unknown_fetcher_mode_is_parse_error() {
    let result = AppConfig::from_toml_str("[fetcher]\nmode = \"telepathy\"");
    assert!(matches!(result, Err(ConfigError::TomlParse(_))));
}

#[test]
fn test_zero_attempt_ceiling_is_rejected() {
    let result = AppConfig::from_toml_str("[chain]\nmax_attempts = 0");
    assert!(matches!(result, Err(ConfigError::InvalidConfig(_))));
}

#[test]
fn test_attempt_ceiling_above_fifteen_is_rejected() {
    match AppConfig::from_toml_str("[chain]\nmax_attempts = 40") {
        Err(ConfigError::InvalidConfig(message)) => assert!(message.contains("chain.max_attempts")),
        other => panic!("expected InvalidConfig, got {other:?}"),
    }
    assert!(AppConfig::from_toml_str("[chain]\nmax_attempts = 15").is_ok());
}

#[test]
fn test_zero_timeouts_are_rejected() {
    for (section, field) in [
        ("chain", "solver_timeout_secs"),
        ("fetcher", "page_load_timeout_ms"),
        ("submit", "timeout_secs"),
        ("llm", "timeout_secs"),
        ("solvers", "fetch_timeout_secs"),
    ] {
        let toml = format!("[{section}]\n{field} = 0");
        match AppConfig::from_toml_str(&toml) {
            Err(ConfigError::InvalidConfig(message)) => {
                assert!(message.contains(&format!("{section}.{field}")), "{message}")
            }
            other => panic!("expected InvalidConfig for {section}.{field}, got {other:?}"),
        }
    }
}

#[test]
fn test_invalid_base_url_is_rejected() {
    let result = AppConfig::from_toml_str("[solvers]\nrepo_api_base_url = \"not a url\"");
    match result {
        Err(ConfigError::InvalidConfig(message)) => {
            assert!(message.contains("solvers.repo_api_base_url"))
        }
        other => panic!("expected InvalidConfig, got {other:?}"),
    }
}

#[test]
fn test_out_of_range_temperature_is_rejected() {
    let result = AppConfig::from_toml_str("[llm]\ntemperature = 3.5");
    assert!(matches!(result, Err(ConfigError::InvalidConfig(_))));
}

#[test]
fn test_secrets_resolve_from_named_variables() {
    let config = AppConfig::from_toml_str(
        r#"
[identity]
email_env = "QUIZ_EMAIL"
secret_env = "QUIZ_SECRET"
"#,
    )
    .unwrap();

    let secrets = config
        .resolve_secrets_with(lookup(&[
            ("QUIZ_EMAIL", "me@example.com"),
            ("QUIZ_SECRET", "hunter2"),
            ("OPENAI_API_KEY", "sk-test"),
        ]))
        .unwrap();

    assert_eq!(secrets.expected_identity.email, "me@example.com");
    assert_eq!(secrets.expected_identity.secret, "hunter2");
    assert_eq!(secrets.llm_token.as_deref(), Some("sk-test"));
}

#[test]
fn test_first_non_empty_token_wins() {
    let secrets = AppConfig::default()
        .resolve_secrets_with(lookup(&[
            ("STUDENT_EMAIL", "me@example.com"),
            ("STUDENT_SECRET", "s"),
            ("AIPROXY_TOKEN", "  "),
            ("OPENAI_API_KEY", "sk-fallback"),
        ]))
        .unwrap();

    assert_eq!(secrets.llm_token.as_deref(), Some("sk-fallback"));
}

#[test]
fn test_missing_identity_variable_is_error() {
    let result = AppConfig::default().resolve_secrets_with(lookup(&[("STUDENT_EMAIL", "a@b.c")]));
    match result {
        Err(ConfigError::EnvVarNotFound(name)) => assert_eq!(name, "STUDENT_SECRET"),
        other => panic!("expected EnvVarNotFound, got {other:?}"),
    }
}

#[test]
fn test_secrets_debug_hides_values() {
    let secrets = AppConfig::default()
        .resolve_secrets_with(lookup(&[
            ("STUDENT_EMAIL", "me@example.com"),
            ("STUDENT_SECRET", "very-private"),
            ("AIPROXY_TOKEN", "proxy-token-value"),
        ]))
        .unwrap();

    let rendered = format!("{secrets:?}");
    assert!(!rendered.contains("very-private"));
    assert!(!rendered.contains("proxy-token-value"));
}

#[test]
fn test_config_round_trips_through_toml() {
    let config = AppConfig::default();
    let rendered = toml::to_string_pretty(&config).unwrap();
    assert_eq!(AppConfig::from_toml_str(&rendered).unwrap(), config);
}
