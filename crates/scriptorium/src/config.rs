//! Layered configuration for the Scriptorium binary.
//!
//! Sources, later overriding earlier:
//! - Bundled defaults (include_str! from scriptorium.toml)
//! - `~/.config/scriptorium/scriptorium.toml`
//! - `./scriptorium.toml`
//! - A file passed with `--config`

use config::{Config, File, FileFormat};
use derive_getters::Getters;
use scriptorium_error::{ConfigError, ScriptoriumError, ScriptoriumResult};
use scriptorium_models::OpenAiCompatClient;
use scriptorium_narrative::OrchestratorSettings;
use scriptorium_retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, instrument};

/// Bundled default configuration.
const DEFAULT_CONFIG: &str = include_str!("../../../scriptorium.toml");

/// Key variable accepted when the configured one is unset.
pub const FALLBACK_API_KEY_ENV: &str = "NEBIUS_API_KEY";

/// Generation backend connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters, derive_setters::Setters)]
#[setters(prefix = "with_")]
#[serde(default)]
pub struct BackendConfig {
    /// Provider label for logs
    provider: String,
    /// Model identifier
    model: String,
    /// API root of the chat-completions endpoint
    base_url: String,
    /// Environment variable holding the API key
    api_key_env: String,
    /// Per-request timeout in seconds
    request_timeout_secs: u64,
    /// Whether responses are streamed
    streaming: bool,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            provider: "nebius".to_string(),
            model: "meta-llama/Meta-Llama-3.1-70B-Instruct".to_string(),
            base_url: "https://api.studio.nebius.com/v1/".to_string(),
            api_key_env: "SCRIPTORIUM_API_KEY".to_string(),
            request_timeout_secs: 600,
            streaming: true,
        }
    }
}

impl BackendConfig {
    /// Resolve the API key through `lookup`, trying the configured variable
    /// and then [`FALLBACK_API_KEY_ENV`].
    pub fn api_key_from(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> ScriptoriumResult<String> {
        [self.api_key_env.as_str(), FALLBACK_API_KEY_ENV]
            .into_iter()
            .filter_map(|name| lookup(name))
            .map(|key| key.trim().to_string())
            .find(|key| !key.is_empty())
            .ok_or_else(|| {
                ConfigError::new(format!(
                    "No API key found; set {} (or {})",
                    self.api_key_env, FALLBACK_API_KEY_ENV
                ))
                .into()
            })
    }

    /// Resolve the API key from the process environment.
    pub fn api_key(&self) -> ScriptoriumResult<String> {
        self.api_key_from(|name| std::env::var(name).ok())
    }

    /// Build a client for this backend.
    pub fn client(&self) -> ScriptoriumResult<OpenAiCompatClient> {
        let client = OpenAiCompatClient::new(
            self.api_key()?,
            self.model.clone(),
            &self.base_url,
            Duration::from_secs(self.request_timeout_secs),
        )?;
        Ok(client
            .with_provider_name(provider_label(&self.provider))
            .with_streaming(self.streaming))
    }
}

fn provider_label(provider: &str) -> &'static str {
    match provider.to_ascii_lowercase().as_str() {
        "nebius" => "nebius",
        "openai" => "openai",
        "groq" => "groq",
        "ollama" => "ollama",
        _ => "openai-compatible",
    }
}

/// Where artifacts are written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters)]
#[serde(default)]
pub struct OutputConfig {
    /// Output directory
    directory: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
        }
    }
}

/// Top-level Scriptorium configuration.
///
/// # Example
///
/// ```no_run
/// use scriptorium::ScriptoriumConfig;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = ScriptoriumConfig::load(None)?;
/// println!("Retries: {}", config.retry().max_retries());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, Getters)]
#[serde(default)]
pub struct ScriptoriumConfig {
    /// Retry budget and backoff
    retry: RetryPolicy,
    /// Orchestration limits
    generation: OrchestratorSettings,
    /// Backend connection
    backend: BackendConfig,
    /// Artifact output
    output: OutputConfig,
}

impl ScriptoriumConfig {
    /// Load every layer, ending with `explicit` when given.
    ///
    /// Missing user files are skipped; a missing explicit file is an error.
    #[instrument]
    pub fn load(explicit: Option<&Path>) -> ScriptoriumResult<Self> {
        debug!("Loading configuration with precedence: explicit > current dir > home dir > bundled defaults");

        let mut builder =
            Config::builder().add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml));

        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".config/scriptorium/scriptorium.toml");
            builder = builder.add_source(File::from(home_config).required(false));
        }

        builder = builder.add_source(File::with_name("scriptorium").required(false));

        if let Some(path) = explicit {
            builder = builder.add_source(File::from(path).required(true));
        }

        Self::deserialize_from(builder)
    }

    /// Bundled defaults overlaid with one file and nothing else.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> ScriptoriumResult<Self> {
        debug!("Loading configuration from file");
        let builder = Config::builder()
            .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
            .add_source(File::from(path.as_ref()));
        Self::deserialize_from(builder)
    }

    /// Bundled defaults only.
    pub fn bundled() -> ScriptoriumResult<Self> {
        Self::deserialize_from(
            Config::builder().add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml)),
        )
    }

    fn deserialize_from(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> ScriptoriumResult<Self> {
        builder
            .build()
            .map_err(|e| {
                ScriptoriumError::from(ConfigError::new(format!(
                    "Failed to build configuration: {}",
                    e
                )))
            })?
            .try_deserialize()
            .map_err(|e| {
                ScriptoriumError::from(ConfigError::new(format!(
                    "Failed to parse configuration: {}",
                    e
                )))
            })
    }
}
