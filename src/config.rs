//! Layered run configuration: defaults, YAML file, environment, CLI flags.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::refactor::{ModelChain, RetryPolicy, Sampling};

/// Environment variable holding the completion API credential.
pub const API_KEY_VAR: &str = "OPENAI_API_KEY";
/// Environment variable overriding the completion API base URL.
pub const BASE_URL_VAR: &str = "OPENAI_BASE_URL";
/// Environment variable overriding the primary model.
pub const PRIMARY_MODEL_VAR: &str = "TSMIGRATE_PRIMARY_MODEL";
/// Environment variable overriding the fallback model.
pub const FALLBACK_MODEL_VAR: &str = "TSMIGRATE_FALLBACK_MODEL";
/// Config file picked up from the project root when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "tsmigrate.yaml";

/// Configuration errors. All of them abort the run before any file is touched.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The credential variable is unset or empty.
    #[error("OPENAI_API_KEY is not set; export it or add it to a .env file")]
    MissingApiKey,
    /// The config file could not be read.
    #[error("failed to read config file {}: {source}", .path.display())]
    Read {
        /// Path of the config file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// The config file is not valid YAML for [`FileConfig`].
    #[error("failed to parse config file {}: {source}", .path.display())]
    Parse {
        /// Path of the config file.
        path: PathBuf,
        /// Underlying YAML error.
        source: serde_yaml::Error,
    },
    /// A value is out of range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Optional settings read from a YAML config file.
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// Base URL of the chat-completions API.
    pub base_url: Option<String>,
    /// Primary model identifier.
    pub primary_model: Option<String>,
    /// Fallback model identifier.
    pub fallback_model: Option<String>,
    /// Attempts per model on rate limits.
    pub max_attempts: Option<u32>,
    /// First backoff delay in milliseconds.
    pub base_delay_ms: Option<u64>,
    /// Exclusive jitter ceiling in milliseconds.
    pub max_jitter_ms: Option<u64>,
    /// Pause after each written file in milliseconds.
    pub post_write_delay_ms: Option<u64>,
    /// Maximum tokens per completion.
    pub max_tokens: Option<u32>,
    /// Sampling temperature.
    pub temperature: Option<f32>,
}

impl FileConfig {
    /// Reads and parses a config file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] or [`ConfigError::Parse`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Values given on the command line; `None` means "not given".
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Overrides {
    /// `--primary-model`.
    pub primary_model: Option<String>,
    /// `--fallback-model`.
    pub fallback_model: Option<String>,
    /// `--max-attempts`.
    pub max_attempts: Option<u32>,
    /// `--base-delay-ms`.
    pub base_delay_ms: Option<u64>,
    /// `--post-write-delay-ms`.
    pub post_write_delay_ms: Option<u64>,
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Completion API credential, if one was found.
    pub api_key: Option<String>,
    /// Base URL of the chat-completions API.
    pub base_url: String,
    /// Primary then fallback model.
    pub models: ModelChain,
    /// Rate-limit retry policy.
    pub retry: RetryPolicy,
    /// Sampling parameters.
    pub sampling: Sampling,
    /// Pause after each written file.
    pub post_write_delay: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            models: ModelChain {
                primary: "gpt-4o".to_string(),
                fallback: "gpt-4o-mini".to_string(),
            },
            retry: RetryPolicy::default(),
            sampling: Sampling {
                max_tokens: 4096,
                temperature: 0.2,
            },
            post_write_delay: Duration::from_millis(1000),
        }
    }
}

impl Settings {
    /// Resolves settings from the layers, later layers winning.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the merged values are out of range.
    pub fn resolve(
        file: &FileConfig,
        env: impl Fn(&str) -> Option<String>,
        overrides: &Overrides,
    ) -> Result<Self, ConfigError> {
        let mut settings = Self::default();
        settings.apply_file(file);
        settings.apply_env(env);
        settings.apply_overrides(overrides);
        settings.validate()?;
        Ok(settings)
    }

    /// The credential, or the fatal startup error when it is missing.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingApiKey`].
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.api_key.as_deref().ok_or(ConfigError::MissingApiKey)
    }

    fn apply_file(&mut self, file: &FileConfig) {
        if let Some(url) = &file.base_url {
            self.base_url.clone_from(url);
        }
        if let Some(model) = &file.primary_model {
            self.models.primary.clone_from(model);
        }
        if let Some(model) = &file.fallback_model {
            self.models.fallback.clone_from(model);
        }
        if let Some(n) = file.max_attempts {
            self.retry.max_attempts = n;
        }
        if let Some(ms) = file.base_delay_ms {
            self.retry.base_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = file.max_jitter_ms {
            self.retry.max_jitter = Duration::from_millis(ms);
        }
        if let Some(ms) = file.post_write_delay_ms {
            self.post_write_delay = Duration::from_millis(ms);
        }
        if let Some(n) = file.max_tokens {
            self.sampling.max_tokens = n;
        }
        if let Some(t) = file.temperature {
            self.sampling.temperature = t;
        }
    }

    fn apply_env(&mut self, env: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| env(key).filter(|v| !v.trim().is_empty());
        self.api_key = non_empty(API_KEY_VAR);
        if let Some(url) = non_empty(BASE_URL_VAR) {
            self.base_url = url;
        }
        if let Some(model) = non_empty(PRIMARY_MODEL_VAR) {
            self.models.primary = model;
        }
        if let Some(model) = non_empty(FALLBACK_MODEL_VAR) {
            self.models.fallback = model;
        }
    }

    fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(model) = &overrides.primary_model {
            self.models.primary.clone_from(model);
        }
        if let Some(model) = &overrides.fallback_model {
            self.models.fallback.clone_from(model);
        }
        if let Some(n) = overrides.max_attempts {
            self.retry.max_attempts = n;
        }
        if let Some(ms) = overrides.base_delay_ms {
            self.retry.base_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = overrides.post_write_delay_ms {
            self.post_write_delay = Duration::from_millis(ms);
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "max_attempts must be at least 1".into(),
            ));
        }
        if self.models.primary.trim().is_empty() || self.models.fallback.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "model identifiers must not be empty".into(),
            ));
        }
        if self.sampling.max_tokens == 0 {
            return Err(ConfigError::Invalid("max_tokens must be at least 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let file = FileConfig::default();
        let settings = Settings::resolve(&file, env(&[]), &Overrides::default()).unwrap();
        assert_eq!(settings.models.primary, "gpt-4o");
        assert_eq!(settings.retry.max_attempts, 5);
        assert_eq!(settings.post_write_delay, Duration::from_millis(1000));
        assert!(matches!(
            settings.require_api_key(),
            Err(ConfigError::MissingApiKey)
        ));
    }

    #[test]
    fn later_layers_win() {
        let file = FileConfig {
            primary_model: Some("file-primary".into()),
            fallback_model: Some("file-fallback".into()),
            max_attempts: Some(3),
            ..FileConfig::default()
        };
        let overrides = Overrides {
            max_attempts: Some(7),
            ..Overrides::default()
        };
        let vars = [(PRIMARY_MODEL_VAR, "env-primary"), (API_KEY_VAR, "sk-test")];
        let settings = Settings::resolve(&file, env(&vars), &overrides).unwrap();

        assert_eq!(settings.models.primary, "env-primary");
        assert_eq!(settings.models.fallback, "file-fallback");
        assert_eq!(settings.retry.max_attempts, 7);
        assert_eq!(settings.require_api_key().unwrap(), "sk-test");
    }

    #[test]
    fn blank_api_key_counts_as_missing() {
        let file = FileConfig::default();
        let blank = env(&[(API_KEY_VAR, "  ")]);
        let settings = Settings::resolve(&file, blank, &Overrides::default()).unwrap();
        assert!(settings.api_key.is_none());
    }

    #[test]
    fn zero_attempts_is_rejected() {
        let overrides = Overrides {
            max_attempts: Some(0),
            ..Overrides::default()
        };
        let err = Settings::resolve(&FileConfig::default(), env(&[]), &overrides).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn yaml_file_is_parsed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        let yaml = "primary_model: gpt-4.1\nbase_delay_ms: 250\ntemperature: 0.0\n";
        std::fs::write(&path, yaml).unwrap();

        let file = FileConfig::load(&path).unwrap();
        assert_eq!(file.primary_model.as_deref(), Some("gpt-4.1"));
        assert_eq!(file.base_delay_ms, Some(250));
        assert_eq!(file.temperature, Some(0.0));
    }

    #[test]
    fn unknown_yaml_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        std::fs::write(&path, "api_key: leaked\n").unwrap();

        let err = FileConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
