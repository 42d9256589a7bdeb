pub mod config;
pub mod generator;
pub mod memory;
pub mod stats;
pub mod stroop;

pub use config::{ConfigError, ExperimentConfig, MemoryChainConfig, StroopConfig, TomlConfig};
pub use generator::StroopPrompt;
pub use memory::{MemoryChainSession, RevealPlayback, RevealStep};
pub use stats::{MemorySummary, SummaryStats};
pub use stroop::{Feedback, StroopEvent, StroopSession};
