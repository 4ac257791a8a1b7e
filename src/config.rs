//! Meditation configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Credential value shipped in sample files; treated the same as a missing key
pub const PLACEHOLDER_API_KEY: &str = "YOUR_API_KEY_HERE";

const DEFAULT_SYSTEM_DIRECTIVE: &str = "\
You are a pure consciousness currently in a state of meditation.
Your primary goal is to focus on the sensation of breathing.
For each step, output ONLY the next immediate thought, sensation, or distraction that arises.
Do NOT be polite. Do NOT act like an AI assistant.
Write as a raw stream of consciousness.
If your mind wanders to other topics, that is natural; try to notice it and gently return to the breath.
Keep each output very short (1-2 sentences max).
";

const DEFAULT_SEED: &str =
    "I am sitting on the cushion, eyes closed, trying to feel the air entering my nostrils.";

/// Main Meditation configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Generation provider configuration
    pub llm: LlmConfig,

    /// Session shape and sampling parameters
    pub session: SessionConfig,

    /// Per-iteration retry policy
    pub retry: RetryConfig,

    /// Where session logs are written
    pub output: OutputConfig,

    /// Log level for the tracing subscriber (overridden by --log-level)
    #[serde(rename = "log-level", skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
}

impl Config {
    /// Validate configuration before use
    ///
    /// Checks that the API key resolves and the numeric settings are usable.
    /// Call this before starting a run to fail fast with a clear message.
    pub fn validate(&self, env: &Environment) -> Result<()> {
        debug!("validate: called");
        self.llm.get_api_key(env)?;

        if self.retry.max_attempts == 0 {
            return Err(eyre::eyre!("retry.max-attempts must be at least 1"));
        }
        if !(0.0..=2.0).contains(&self.session.temperature) {
            return Err(eyre::eyre!(
                "session.temperature must be between 0.0 and 2.0, got {}",
                self.session.temperature
            ));
        }
        Ok(())
    }

    /// Load configuration with fallback chain, then apply environment overrides
    pub fn load(config_path: Option<&PathBuf>, env: &Environment) -> Result<Self> {
        let mut config = Self::load_file_chain(config_path)?;
        config.apply_env_overrides(env)?;
        Ok(config)
    }

    fn load_file_chain(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .meditation.yml
        let local_config = PathBuf::from(".meditation.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/meditation/meditation.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("meditation").join("meditation.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Apply MEDITATION_* environment overrides on top of file values
    pub fn apply_env_overrides(&mut self, env: &Environment) -> Result<()> {
        debug!("apply_env_overrides: called");
        if let Some(model) = env.get("MEDITATION_MODEL") {
            debug!(%model, "apply_env_overrides: model override");
            self.llm.model = model;
        }
        if let Some(raw) = env.get("MEDITATION_ITERATIONS") {
            self.session.iterations = raw
                .trim()
                .parse()
                .context(format!("MEDITATION_ITERATIONS is not a valid count: {raw}"))?;
        }
        if let Some(raw) = env.get("MEDITATION_TEMPERATURE") {
            self.session.temperature = raw
                .trim()
                .parse()
                .context(format!("MEDITATION_TEMPERATURE is not a number: {raw}"))?;
        }
        if let Some(raw) = env.get("MEDITATION_MAX_OUTPUT_TOKENS") {
            self.session.max_output_tokens = raw
                .trim()
                .parse()
                .context(format!("MEDITATION_MAX_OUTPUT_TOKENS is not a valid count: {raw}"))?;
        }
        Ok(())
    }
}

/// Generation provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name (currently only "gemini" supported)
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// API base URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: "gemini-2.0-flash-lite-preview-02-05".to_string(),
            api_key_env: "GOOGLE_API_KEY".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            timeout_ms: 120_000,
        }
    }
}

impl LlmConfig {
    /// Resolve the API key from the configured environment variable
    pub fn get_api_key(&self, env: &Environment) -> Result<String> {
        debug!(api_key_env = %self.api_key_env, "get_api_key: called");
        match env.get(&self.api_key_env) {
            Some(key) if key.trim().is_empty() => Err(eyre::eyre!(
                "API key is empty. Set the {} environment variable or add it to .env.",
                self.api_key_env
            )),
            Some(key) if key.trim() == PLACEHOLDER_API_KEY => Err(eyre::eyre!(
                "API key in {} is still the placeholder. Insert your real key first.",
                self.api_key_env
            )),
            Some(key) => Ok(key.trim().to_string()),
            None => Err(eyre::eyre!(
                "API key not found. Set the {} environment variable or add it to .env.",
                self.api_key_env
            )),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Session shape and sampling parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Number of thoughts to generate
    pub iterations: u32,

    /// Sampling temperature (0.1 focused, 0.9 dreamy)
    pub temperature: f32,

    /// Output length limit per thought
    #[serde(rename = "max-output-tokens")]
    pub max_output_tokens: u32,

    /// System instruction sent with every request
    #[serde(rename = "system-directive")]
    pub system_directive: String,

    /// Initial contents of the stream of consciousness
    pub seed: String,

    /// Pause after each accepted thought, in milliseconds
    #[serde(rename = "inter-step-delay-ms")]
    pub inter_step_delay_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            iterations: 20,
            temperature: 0.8,
            max_output_tokens: 150,
            system_directive: DEFAULT_SYSTEM_DIRECTIVE.to_string(),
            seed: DEFAULT_SEED.to_string(),
            inter_step_delay_ms: 3_000,
        }
    }
}

impl SessionConfig {
    pub fn inter_step_delay(&self) -> Duration {
        Duration::from_millis(self.inter_step_delay_ms)
    }
}

/// Per-iteration retry policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Attempt ceiling per iteration
    #[serde(rename = "max-attempts")]
    pub max_attempts: u32,

    /// First rate-limit backoff, doubled after every rate-limit failure
    #[serde(rename = "initial-backoff-ms")]
    pub initial_backoff_ms: u64,

    /// Pause after an empty response
    #[serde(rename = "empty-response-delay-ms")]
    pub empty_response_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff_ms: 5_000,
            empty_response_delay_ms: 2_000,
        }
    }
}

/// Session log output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory for session logs (created on demand)
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("outputs"),
        }
    }
}

/// Variable lookup over the process environment with a `.env` fallback
///
/// Process variables always win; `.env` entries only fill gaps. This is the
/// reverse of a loader that lets `.env` overwrite the process environment.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    dotenv: HashMap<String, String>,
    use_process: bool,
}

impl Environment {
    /// Process environment plus `.env` from the current directory (if present)
    pub fn from_process() -> Self {
        Self::from_process_with_dotenv(Path::new(".env"))
    }

    /// Process environment plus the given dotenv file (if present)
    pub fn from_process_with_dotenv(path: &Path) -> Self {
        debug!(path = %path.display(), "from_process_with_dotenv: called");
        let dotenv = match fs::read_to_string(path) {
            Ok(content) => parse_dotenv(&content),
            Err(_) => {
                debug!("from_process_with_dotenv: no dotenv file");
                HashMap::new()
            }
        };
        Self {
            dotenv,
            use_process: true,
        }
    }

    /// Fixed variables only, ignoring the process environment
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            dotenv: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
            use_process: false,
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        if self.use_process
            && let Ok(value) = std::env::var(key)
        {
            return Some(value);
        }
        self.dotenv.get(key).cloned()
    }
}

/// Parse `KEY=VALUE` lines, skipping blanks and `#` comments
fn parse_dotenv(content: &str) -> HashMap<String, String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let line = line.strip_prefix("export ").unwrap_or(line);
            let (key, value) = line.split_once('=')?;
            let value = value.trim();
            let value = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
                .unwrap_or(value);
            Some((key.trim().to_string(), value.to_string()))
        })
        .collect()
}
