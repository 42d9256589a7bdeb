use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// A settings file read from TOML and checked once decoded. Binaries that
/// embed [`ExperimentConfig`] in a larger file implement this for the outer
/// type and delegate `validate`.
pub trait TomlConfig: DeserializeOwned {
    fn validate(&self) -> Result<(), ConfigError>;

    fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }
}

/// Stroop session timing. Defaults are the contractual values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StroopConfig {
    pub session_secs: u32,
    pub batch_size: u32,
    pub feedback_ms: u64,
}

impl Default for StroopConfig {
    fn default() -> Self {
        Self {
            session_secs: 60,
            batch_size: 10,
            feedback_ms: 1500,
        }
    }
}

/// Memory-chain round count and reveal script timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryChainConfig {
    pub total_rounds: u32,
    pub start_level: u32,
    pub lead_in_ms: u64,
    pub reveal_ms: u64,
    pub gap_ms: u64,
}

impl Default for MemoryChainConfig {
    fn default() -> Self {
        Self {
            total_rounds: 10,
            start_level: 1,
            lead_in_ms: 600,
            reveal_ms: 800,
            gap_ms: 600,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub stroop: StroopConfig,
    pub memory: MemoryChainConfig,
}

impl TomlConfig for ExperimentConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.stroop;
        if s.session_secs == 0 {
            return Err(ConfigError::Invalid("stroop.session_secs must be > 0".into()));
        }
        if s.batch_size == 0 {
            return Err(ConfigError::Invalid("stroop.batch_size must be > 0".into()));
        }
        let m = &self.memory;
        if m.total_rounds == 0 {
            return Err(ConfigError::Invalid("memory.total_rounds must be > 0".into()));
        }
        if m.start_level == 0 {
            return Err(ConfigError::Invalid("memory.start_level must be >= 1".into()));
        }
        if m.reveal_ms == 0 {
            return Err(ConfigError::Invalid("memory.reveal_ms must be > 0".into()));
        }
        Ok(())
    }
}
