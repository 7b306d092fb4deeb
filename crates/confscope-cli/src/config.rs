//! CLI configuration: an optional JSON file plus environment overrides.
//!
//! ```json
//! { "parallel": true, "vocabulary": { "sections_element": "dimension" } }
//! ```

use std::path::{Path, PathBuf};

use confscope_engine::ManifestVocabulary;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable consulted when `--parallel` is not given.
pub const PARALLEL_ENV: &str = "CONFSCOPE_PARALLEL";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file {}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("CONFSCOPE_PARALLEL must be `true` or `false`, got `{value}`")]
    Parallel { value: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Run leaves on the worker pool. `None` means "not configured".
    pub parallel: Option<bool>,
    pub vocabulary: ManifestVocabulary,
}

impl CliConfig {
    /// Load `path` if given, otherwise start from the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "config file loaded");
        Ok(config)
    }

    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply `CONFSCOPE_*` overrides from `lookup`.
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(value) = lookup(PARALLEL_ENV).filter(|value| !value.is_empty()) {
            let parallel = match value.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => true,
                "false" | "0" => false,
                _ => return Err(ConfigError::Parallel { value }),
            };
            self.parallel = Some(parallel);
        }
        self.vocabulary = self.vocabulary.with_overrides(&lookup);
        Ok(self)
    }

    /// An explicit flag wins over configuration; the default is serial.
    pub fn resolve_parallel(&self, flag: Option<bool>) -> bool {
        flag.or(self.parallel).unwrap_or(false)
    }
}
