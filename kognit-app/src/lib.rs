pub mod config;
pub mod play;
pub mod simulate;
pub mod submit;

pub use config::AppConfig;
pub use simulate::{SimulatedPlayer, SimulationReport, parse_accuracy, run_memory, run_stroop};
