//! Configuration for the quiz chain service
//!
//! The whole configuration is a TOML document whose sections all have defaults,
//! so an empty file (or no file) is a valid configuration. Credentials are never
//! stored in the file: each section names the environment variable holding the
//! value, and [`AppConfig::resolve_secrets`] reads them exactly once at startup.

use crate::chain::SubmitterIdentity;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default locations probed when no `--config` flag is given
pub const DEFAULT_CONFIG_PATHS: &[&str] = &["quizchain.toml", "config/quizchain.toml"];

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub identity: IdentitySection,
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub chain: ChainSection,
    #[serde(default)]
    pub fetcher: FetcherSection,
    #[serde(default)]
    pub submit: SubmitSection,
    #[serde(default)]
    pub llm: LlmSection,
    #[serde(default)]
    pub solvers: SolverSection,
}

/// Expected submitter identity, sourced from the environment
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IdentitySection {
    /// Environment variable containing the expected email
    #[serde(default = "default_email_env")]
    pub email_env: String,
    /// Environment variable containing the expected secret
    #[serde(default = "default_secret_env")]
    pub secret_env: String,
}

impl Default for IdentitySection {
    fn default() -> Self {
        Self {
            email_env: default_email_env(),
            secret_env: default_secret_env(),
        }
    }
}

fn default_email_env() -> String {
    "STUDENT_EMAIL".to_string()
}

fn default_secret_env() -> String {
    "STUDENT_SECRET".to_string()
}

/// HTTP entry point settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

/// Chain loop policy
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChainSection {
    /// Hard upper bound on loop iterations per chain run
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Upper bound on a single solver invocation
    #[serde(default = "default_solver_timeout")]
    pub solver_timeout_secs: u64,
}

impl Default for ChainSection {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            solver_timeout_secs: default_solver_timeout(),
        }
    }
}

/// Hard ceiling on loop iterations per chain run; configs may lower it
pub const MAX_ATTEMPTS_CEILING: u32 = 15;

fn default_max_attempts() -> u32 {
    MAX_ATTEMPTS_CEILING
}

fn default_solver_timeout() -> u64 {
    60
}

/// How quiz pages are rendered
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FetcherMode {
    /// Render with a headless Chromium instance
    #[default]
    Headless,
    /// Plain HTTP GET, for servers that render on the server side
    Http,
}

/// Page fetcher settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FetcherSection {
    #[serde(default)]
    pub mode: FetcherMode,
    /// Bound on navigation until the network is idle
    #[serde(default = "default_page_load_timeout")]
    pub page_load_timeout_ms: u64,
    /// Fixed wait after load for client-side rendering to settle
    #[serde(default = "default_settle_delay")]
    pub settle_delay_ms: u64,
    /// Browser binary; autodetected when absent
    pub chrome_executable: Option<PathBuf>,
}

impl Default for FetcherSection {
    fn default() -> Self {
        Self {
            mode: FetcherMode::default(),
            page_load_timeout_ms: default_page_load_timeout(),
            settle_delay_ms: default_settle_delay(),
            chrome_executable: None,
        }
    }
}

fn default_page_load_timeout() -> u64 {
    15_000
}

fn default_settle_delay() -> u64 {
    1_000
}

/// Submission client settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubmitSection {
    #[serde(default = "default_submit_timeout")]
    pub timeout_secs: u64,
}

impl Default for SubmitSection {
    fn default() -> Self {
        Self {
            timeout_secs: default_submit_timeout(),
        }
    }
}

fn default_submit_timeout() -> u64 {
    30
}

/// LLM settings for the open-ended and audio solvers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LlmSection {
    /// Environment variables probed in order for the API token
    #[serde(default = "default_token_envs")]
    pub token_envs: Vec<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_transcription_model")]
    pub transcription_model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Endpoint used for `sk-` tokens
    #[serde(default = "default_direct_base_url")]
    pub direct_base_url: String,
    /// Endpoint used for every other token
    #[serde(default = "default_proxy_base_url")]
    pub proxy_base_url: String,
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            token_envs: default_token_envs(),
            model: default_model(),
            transcription_model: default_transcription_model(),
            temperature: default_temperature(),
            direct_base_url: default_direct_base_url(),
            proxy_base_url: default_proxy_base_url(),
            timeout_secs: default_llm_timeout(),
        }
    }
}

fn default_token_envs() -> Vec<String> {
    vec!["AIPROXY_TOKEN".to_string(), "OPENAI_API_KEY".to_string()]
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_transcription_model() -> String {
    "whisper-1".to_string()
}

fn default_temperature() -> f32 {
    0.1
}

fn default_direct_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_proxy_base_url() -> String {
    "https://aiproxy.sanand.workers.dev/openai/v1".to_string()
}

fn default_llm_timeout() -> u64 {
    60
}

/// Settings shared by the solvers' auxiliary fetches
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SolverSection {
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
    /// Base of the repository file-tree listing API
    #[serde(default = "default_repo_api_base_url")]
    pub repo_api_base_url: String,
    /// Where well-known context files for open-ended questions live
    #[serde(default = "default_context_base_url")]
    pub context_base_url: String,
    /// Context attached to an open-ended prompt is cut to this many characters
    #[serde(default = "default_max_context_chars")]
    pub max_context_chars: usize,
}

impl Default for SolverSection {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: default_fetch_timeout(),
            repo_api_base_url: default_repo_api_base_url(),
            context_base_url: default_context_base_url(),
            max_context_chars: default_max_context_chars(),
        }
    }
}

fn default_fetch_timeout() -> u64 {
    10
}

fn default_repo_api_base_url() -> String {
    "https://api.github.com".to_string()
}

fn default_context_base_url() -> String {
    "https://tds-llm-analysis.s-anand.net/project2-reevals/".to_string()
}

fn default_max_context_chars() -> usize {
    10_000
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Values read from the environment once at startup
#[derive(Clone, PartialEq)]
pub struct RuntimeSecrets {
    /// Identity every `/solve` request must match
    pub expected_identity: SubmitterIdentity,
    /// API token for the LLM-backed solvers, if any is configured
    pub llm_token: Option<String>,
}

impl std::fmt::Debug for RuntimeSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeSecrets")
            .field("expected_identity", &self.expected_identity)
            .field("llm_token", &self.llm_token.as_ref().map(|_| "***"))
            .finish()
    }
}

impl AppConfig {
    /// Load configuration from a TOML file and validate it
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from an explicit path, else the first default path that exists,
    /// else built-in defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load_from_file(path);
        }

        for candidate in DEFAULT_CONFIG_PATHS {
            let path = Path::new(candidate);
            if path.exists() {
                return Self::load_from_file(path);
            }
        }

        Ok(Self::default())
    }

    /// Check cross-field constraints serde cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_ATTEMPTS_CEILING).contains(&self.chain.max_attempts) {
            return Err(ConfigError::InvalidConfig(format!(
                "chain.max_attempts must be within 1..={MAX_ATTEMPTS_CEILING}, got {}",
                self.chain.max_attempts
            )));
        }

        for (field, value) in [
            ("chain.solver_timeout_secs", self.chain.solver_timeout_secs),
            ("fetcher.page_load_timeout_ms", self.fetcher.page_load_timeout_ms),
            ("submit.timeout_secs", self.submit.timeout_secs),
            ("llm.timeout_secs", self.llm.timeout_secs),
            ("solvers.fetch_timeout_secs", self.solvers.fetch_timeout_secs),
        ] {
            if value == 0 {
                return Err(ConfigError::InvalidConfig(format!("{field} must be non-zero")));
            }
        }

        for (field, value) in [
            ("llm.direct_base_url", &self.llm.direct_base_url),
            ("llm.proxy_base_url", &self.llm.proxy_base_url),
            ("solvers.repo_api_base_url", &self.solvers.repo_api_base_url),
            ("solvers.context_base_url", &self.solvers.context_base_url),
        ] {
            url::Url::parse(value).map_err(|e| {
                ConfigError::InvalidConfig(format!("{field} is not a valid URL ({value}): {e}"))
            })?;
        }

        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ConfigError::InvalidConfig(format!(
                "llm.temperature must be within 0.0..=2.0, got {}",
                self.llm.temperature
            )));
        }

        Ok(())
    }

    /// Read the expected identity and LLM token from the process environment
    pub fn resolve_secrets(&self) -> Result<RuntimeSecrets, ConfigError> {
        self.resolve_secrets_with(|name| std::env::var(name).ok())
    }

    /// Same as [`resolve_secrets`](Self::resolve_secrets) with a custom lookup
    pub fn resolve_secrets_with<F>(&self, lookup: F) -> Result<RuntimeSecrets, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &str| {
            lookup(name)
                .filter(|value| !value.is_empty())
                .ok_or_else(|| ConfigError::EnvVarNotFound(name.to_string()))
        };

        let email = required(&self.identity.email_env)?;
        let secret = required(&self.identity.secret_env)?;

        let llm_token = self
            .llm
            .token_envs
            .iter()
            .filter_map(|name| lookup(name))
            .find(|value| !value.trim().is_empty());

        Ok(RuntimeSecrets {
            expected_identity: SubmitterIdentity::new(email, secret),
            llm_token,
        })
    }

    /// Configuration for unit tests
    #[cfg(test)]
    pub fn test_config() -> Self {
        let toml_content = r#"
[chain]
max_attempts = 15
solver_timeout_secs = 5

[fetcher]
mode = "http"
page_load_timeout_ms = 2000
settle_delay_ms = 0
"#;
        toml::from_str(toml_content).expect("Test config should parse")
    }
}
