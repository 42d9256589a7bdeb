//! kognit - Stroop and memory-chain sessions in the terminal

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand, ValueEnum};
use kognit_app::{AppConfig, play, simulate, submit};
use kognit_client::{CompletedSession, HttpAnalysisService, Participant};
use kognit_experiment::{MemorySummary, SummaryStats, stats};
use kognit_server::{AppState, Store};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Cognitive test sessions: Stroop and memory chain
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Set the log level (overridden by RUST_LOG)
    #[arg(short, long, default_value = "warn", global = true)]
    log_level: String,

    /// TOML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Game {
    Stroop,
    Memory,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a session in the terminal
    Play {
        game: Game,

        /// Persistence service base URL
        #[arg(long)]
        server: Option<String>,

        /// User id sent to the persistence service
        #[arg(long)]
        user_id: Option<u64>,
    },

    /// Run a session with a simulated participant and print the result as JSON
    Simulate {
        game: Game,

        #[arg(long, default_value = "7")]
        seed: u64,

        /// Probability of a correct answer (0.0 to 1.0)
        #[arg(long, default_value = "0.8", value_parser = simulate::parse_accuracy)]
        accuracy: f64,

        /// Mean reaction time per answer in milliseconds
        #[arg(long, default_value = "900")]
        mean_rt_ms: u64,
    },

    /// Run the persistence service
    Serve {
        #[arg(short, long)]
        port: Option<u16>,
    },
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_stroop_summary(s: &SummaryStats) {
    println!("\n=== RESULTS ===");
    println!("Trials:           {} ({} correct)", s.total_trials, s.correct_trials);
    println!("Accuracy:         {:.1}%", s.accuracy_pct);
    println!("Avg reaction:     {:.0} ms", s.avg_reaction_time_ms);
    println!(
        "Congruent:        {}/{} ({:.1}%)",
        s.congruent_correct, s.congruent_trials, s.congruent_accuracy_pct
    );
    println!(
        "Incongruent:      {}/{} ({:.1}%)",
        s.incongruent_correct, s.incongruent_trials, s.incongruent_accuracy_pct
    );
    println!("Cognitive score:  {}", s.cognitive_score);
}

fn print_memory_summary(m: &MemorySummary) {
    println!("\n=== RESULTS ===");
    println!("Rounds:           {} ({} perfect)", m.rounds_played, m.perfect_rounds);
    println!("Mean accuracy:    {:.1}%", m.mean_accuracy_pct);
    println!("Level:            {} (max {})", m.final_level, m.max_level);
    println!("Total time:       {:.1} s", m.total_time_ms as f64 / 1000.0);
}

async fn run_play(mut config: AppConfig, game: Game, server: Option<String>, user_id: Option<u64>) -> Result<()> {
    if server.is_some() {
        config.server.url = server;
    }
    if user_id.is_some() {
        config.server.user_id = user_id;
    }
    let participant = Participant::from(&config.participant);

    let completed = match game {
        Game::Stroop => {
            let record = play::play_stroop(config.experiment.stroop.clone()).await?;
            print_stroop_summary(&stats::summarize(record.trials()));
            if record.is_empty() {
                return Ok(());
            }
            CompletedSession::from_stroop(&record, &participant, Local::now())
        }
        Game::Memory => {
            let record = play::play_memory(config.experiment.memory.clone()).await?;
            let final_level = record.last().map(|t| stats::next_level(t.level, t.accuracy_pct));
            print_memory_summary(&stats::summarize_memory(
                record.trials(),
                final_level.unwrap_or(config.experiment.memory.start_level),
            ));
            if record.is_empty() {
                return Ok(());
            }
            CompletedSession::from_memory(&record, &participant, Local::now())
        }
    };

    submit::submit_and_report(&config, &completed).await;
    Ok(())
}

fn run_simulate(config: &AppConfig, game: Game, seed: u64, accuracy: f64, mean_rt_ms: u64) -> Result<()> {
    let report = match game {
        Game::Stroop => simulate::run_stroop(&config.experiment, seed, accuracy, mean_rt_ms).0,
        Game::Memory => simulate::run_memory(&config.experiment, seed, accuracy, mean_rt_ms).0,
    };
    let json = serde_json::to_string_pretty(&report).context("failed to encode report")?;
    println!("{json}");
    Ok(())
}

async fn run_serve(config: &AppConfig, port: Option<u16>) -> Result<()> {
    let port = port.unwrap_or(config.server.port);
    let analyzer = HttpAnalysisService::new(config.ai.url.as_str())
        .context("failed to build analysis client")?;
    let state = AppState::new(Arc::new(Store::new()), Arc::new(analyzer));
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, ai = %config.ai.url, "starting persistence service");
    kognit_server::serve(addr, state)
        .await
        .with_context(|| format!("server on {addr} failed"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let config = AppConfig::load_or_default(cli.config.as_deref())?;

    match cli.command {
        Commands::Play {
            game,
            server,
            user_id,
        } => run_play(config, game, server, user_id).await,
        Commands::Simulate {
            game,
            seed,
            accuracy,
            mean_rt_ms,
        } => run_simulate(&config, game, seed, accuracy, mean_rt_ms),
        Commands::Serve { port } => run_serve(&config, port).await,
    }
}
