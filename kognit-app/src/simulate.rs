//! Headless sessions played by a scripted participant on a manual clock.

use kognit_core::{InkColor, MemoryTrial, SessionRecord, StroopTrial};
use kognit_experiment::{
    ExperimentConfig, MemoryChainSession, MemorySummary, StroopEvent, StroopPrompt, StroopSession,
    SummaryStats,
};
use kognit_timing::ManualClock;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::debug;

/// Scripted participant: answers correctly with probability `accuracy`
/// after a reaction time spread around `mean_rt_ms`.
pub struct SimulatedPlayer {
    rng: StdRng,
    accuracy: f64,
    mean_rt_ms: u64,
}

/// Command-line parser for a probability: finite and within `0.0..=1.0`.
pub fn parse_accuracy(raw: &str) -> Result<f64, String> {
    let value: f64 = raw.trim().parse().map_err(|e| format!("{e}"))?;
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        return Err(format!("{raw} is not a probability between 0.0 and 1.0"));
    }
    Ok(value)
}

impl SimulatedPlayer {
    /// NaN accuracy is treated as 0.
    pub fn new(seed: u64, accuracy: f64, mean_rt_ms: u64) -> Self {
        let accuracy = if accuracy.is_nan() { 0.0 } else { accuracy.clamp(0.0, 1.0) };
        Self {
            rng: StdRng::seed_from_u64(seed),
            accuracy,
            mean_rt_ms: mean_rt_ms.max(2),
        }
    }

    pub fn reaction_ms(&mut self) -> u64 {
        let half = self.mean_rt_ms / 2;
        self.rng.random_range(half..=self.mean_rt_ms.saturating_add(half))
    }

    pub fn pick_color(&mut self, prompt: &StroopPrompt) -> InkColor {
        let target = prompt.stimulus.ink;
        if self.rng.random_bool(self.accuracy) {
            return target;
        }
        let wrong: Vec<InkColor> = prompt.options.iter().copied().filter(|c| *c != target).collect();
        wrong.choose(&mut self.rng).copied().unwrap_or(target)
    }

    pub fn recall_digit(&mut self, digit: u8) -> u8 {
        if self.rng.random_bool(self.accuracy) {
            digit
        } else {
            (digit + 1) % 10
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "game", rename_all = "lowercase")]
pub enum SimulationReport {
    #[serde(rename_all = "camelCase")]
    Stroop {
        seed: u64,
        summary: SummaryStats,
        best_streak: u32,
        batches_reached: u32,
    },
    #[serde(rename_all = "camelCase")]
    Memory {
        seed: u64,
        summary: MemorySummary,
        aggregate: SummaryStats,
    },
}

/// Drives the session clock forward, delivering one `Tick` per whole second.
struct SimClock {
    clock: ManualClock,
    since_tick_ms: u64,
}

impl SimClock {
    fn pass<R: Rng>(&mut self, ms: u64, session: &mut StroopSession<ManualClock, R>) {
        self.clock.advance_ms(ms);
        self.since_tick_ms += ms;
        while self.since_tick_ms >= 1000 {
            self.since_tick_ms -= 1000;
            session.handle_event(StroopEvent::Tick);
        }
    }
}

pub fn run_stroop(
    config: &ExperimentConfig,
    seed: u64,
    accuracy: f64,
    mean_rt_ms: u64,
) -> (SimulationReport, SessionRecord<StroopTrial>) {
    let clock = ManualClock::new();
    let mut session = StroopSession::new(
        config.stroop.clone(),
        clock.clone(),
        StdRng::seed_from_u64(seed),
    );
    let mut player = SimulatedPlayer::new(seed.wrapping_add(1), accuracy, mean_rt_ms);
    let mut sim = SimClock {
        clock,
        since_tick_ms: 0,
    };

    session.handle_event(StroopEvent::Start);
    while !session.is_complete() {
        let Some(prompt) = session.current_prompt().cloned() else {
            break;
        };
        let rt = player.reaction_ms();
        sim.pass(rt, &mut session);
        session.handle_event(StroopEvent::Answer(player.pick_color(&prompt)));

        sim.pass(session.config.feedback_ms.max(1), &mut session);
        for event in session.update() {
            session.handle_event(event);
        }
    }
    session.teardown();
    debug!(seed, trials = session.record().len(), "simulated stroop finished");

    let report = SimulationReport::Stroop {
        seed,
        summary: session.summary(),
        best_streak: session.record().best_streak(),
        batches_reached: session.batch_index(),
    };
    (report, session.into_record())
}

pub fn run_memory(
    config: &ExperimentConfig,
    seed: u64,
    accuracy: f64,
    mean_rt_ms: u64,
) -> (SimulationReport, SessionRecord<MemoryTrial>) {
    let clock = ManualClock::new();
    let mut session = MemoryChainSession::new(
        config.memory.clone(),
        clock.clone(),
        StdRng::seed_from_u64(seed),
    );
    let mut player = SimulatedPlayer::new(seed.wrapping_add(1), accuracy, mean_rt_ms);

    let mut playback = session.start();
    while let Some(current) = playback.take() {
        if !session.play_reveal(&current) {
            break;
        }
        let digits = session.sequence().digits().to_vec();
        for digit in digits {
            clock.advance_ms(player.reaction_ms());
            session.enter_digit(player.recall_digit(digit));
        }
        playback = session.next_round();
    }
    debug!(seed, rounds = session.record().len(), "simulated memory chain finished");

    let report = SimulationReport::Memory {
        seed,
        summary: session.summary(),
        aggregate: kognit_experiment::stats::summarize(session.record().trials()),
    };
    (report, session.into_record())
}
