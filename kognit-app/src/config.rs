use anyhow::Result;
use kognit_client::{Participant, Sex};
use kognit_experiment::{ConfigError, ExperimentConfig, TomlConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_AI_URL: &str = "http://localhost:5001/api/analyze";

/// Where finished sessions go and who plays them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// Base URL of the persistence service. Unset means play offline.
    pub url: Option<String>,
    pub user_id: Option<u64>,
    /// Port for `kognit serve`.
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            url: None,
            user_id: None,
            port: DEFAULT_PORT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiSection {
    pub url: String,
}

impl Default for AiSection {
    fn default() -> Self {
        Self {
            url: DEFAULT_AI_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticipantSection {
    pub age: u32,
    pub sex: Sex,
}

impl Default for ParticipantSection {
    fn default() -> Self {
        Self {
            age: 30,
            sex: Sex::Female,
        }
    }
}

impl From<&ParticipantSection> for Participant {
    fn from(p: &ParticipantSection) -> Self {
        Participant {
            age: p.age,
            sex: p.sex,
        }
    }
}

/// Whole `kognit.toml`. Game tables (`[stroop]`, `[memory]`) sit at the top
/// level next to the service sections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    #[serde(flatten)]
    pub experiment: ExperimentConfig,
    pub server: ServerSection,
    pub ai: AiSection,
    pub participant: ParticipantSection,
}

impl TomlConfig for AppConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.experiment.validate()
    }
}

impl AppConfig {
    /// Loads `path` when given, otherwise the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Ok(Self::load(path)?),
            None => Ok(Self::default()),
        }
    }
}
