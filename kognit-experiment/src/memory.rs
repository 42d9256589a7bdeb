use crate::config::MemoryChainConfig;
use crate::generator;
use crate::stats::{self, MemorySummary};
use kognit_core::{DigitSequence, GamePhase, MemoryTrial, Phase, SessionRecord};
use kognit_timing::{CancelToken, Timer};
use rand::Rng;
use std::time::Duration;
use tracing::{debug, info};

/// One timed step of the digit reveal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealStep {
    LeadIn { ms: u64 },
    Show { digit: u8, ms: u64 },
    Gap { ms: u64 },
}

impl RevealStep {
    pub fn duration(&self) -> Duration {
        match *self {
            RevealStep::LeadIn { ms } | RevealStep::Show { ms, .. } | RevealStep::Gap { ms } => {
                Duration::from_millis(ms)
            }
        }
    }

    pub fn visible_digit(&self) -> Option<u8> {
        match *self {
            RevealStep::Show { digit, .. } => Some(digit),
            _ => None,
        }
    }
}

/// Reveal script for one round, bound to the round that created it.
///
/// The driver sleeps through the steps and feeds them back to the session;
/// once cancelled, or once the session has moved to another round, every
/// call made with it is ignored.
#[derive(Debug, Clone)]
pub struct RevealPlayback {
    generation: u64,
    steps: Vec<RevealStep>,
    token: CancelToken,
}

impl RevealPlayback {
    fn new(generation: u64, sequence: &DigitSequence, config: &MemoryChainConfig) -> Self {
        let mut steps = Vec::with_capacity(sequence.len() * 2 + 1);
        steps.push(RevealStep::LeadIn {
            ms: config.lead_in_ms,
        });
        for &digit in sequence.digits() {
            steps.push(RevealStep::Show {
                digit,
                ms: config.reveal_ms,
            });
            steps.push(RevealStep::Gap { ms: config.gap_ms });
        }
        Self {
            generation,
            steps,
            token: CancelToken::new(),
        }
    }

    pub fn steps(&self) -> &[RevealStep] {
        &self.steps
    }

    pub fn token(&self) -> &CancelToken {
        &self.token
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn total_duration(&self) -> Duration {
        self.steps.iter().map(RevealStep::duration).sum()
    }
}

pub struct MemoryChainSession<T, R>
where
    T: Timer,
    R: Rng,
{
    pub config: MemoryChainConfig,
    timer: T,
    rng: R,
    phase: GamePhase,
    level: u32,
    next_level: u32,
    round: u32,
    sequence: DigitSequence,
    user_sequence: Vec<u8>,
    visible_digit: Option<u8>,
    last_accuracy: Option<f64>,
    generation: u64,
    active_token: Option<CancelToken>,
    input_opened_at: Option<T::Timestamp>,
    record: SessionRecord<MemoryTrial>,
}

impl<T, R> MemoryChainSession<T, R>
where
    T: Timer<Timestamp = u64>,
    R: Rng,
{
    pub fn new(config: MemoryChainConfig, timer: T, rng: R) -> Self {
        let level = config.start_level.max(1);
        Self {
            config,
            timer,
            rng,
            phase: GamePhase::default(),
            level,
            next_level: level,
            round: 0,
            sequence: DigitSequence::default(),
            user_sequence: Vec::new(),
            visible_digit: None,
            last_accuracy: None,
            generation: 0,
            active_token: None,
            input_opened_at: None,
            record: SessionRecord::new(),
        }
    }

    pub fn start(&mut self) -> Option<RevealPlayback> {
        if !self.phase.is_intro() {
            return None;
        }
        self.round = 1;
        info!(
            session = %self.record.id,
            rounds = self.config.total_rounds,
            level = self.level,
            "memory chain started"
        );
        Some(self.begin_round())
    }

    fn begin_round(&mut self) -> RevealPlayback {
        self.cancel_playback();
        self.sequence = generator::digit_sequence(&mut self.rng, self.level);
        self.user_sequence.clear();
        self.visible_digit = None;
        self.last_accuracy = None;
        self.input_opened_at = None;
        self.generation += 1;
        self.advance_phase();

        let playback = RevealPlayback::new(self.generation, &self.sequence, &self.config);
        self.active_token = Some(playback.token.clone());
        debug!(round = self.round, level = self.level, "memory round revealing");
        playback
    }

    fn advance_phase(&mut self) {
        if let Some(next) = self.phase.next() {
            self.phase = next;
        }
    }

    fn cancel_playback(&mut self) {
        if let Some(token) = self.active_token.take() {
            token.cancel();
        }
    }

    fn is_live(&self, playback: &RevealPlayback) -> bool {
        !playback.token.is_cancelled()
            && playback.generation == self.generation
            && self.phase == GamePhase::Presenting
    }

    /// Applies step `index` of the playback. Returns `false` without touching
    /// state when the playback is cancelled or stale.
    pub fn apply_reveal_step(&mut self, playback: &RevealPlayback, index: usize) -> bool {
        if !self.is_live(playback) {
            return false;
        }
        let Some(step) = playback.steps.get(index) else {
            return false;
        };
        self.visible_digit = step.visible_digit();
        true
    }

    /// Ends the reveal and opens input.
    pub fn finish_reveal(&mut self, playback: &RevealPlayback) -> bool {
        if !self.is_live(playback) {
            return false;
        }
        self.visible_digit = None;
        self.active_token = None;
        self.input_opened_at = Some(self.timer.now());
        self.advance_phase();
        true
    }

    /// Plays the whole reveal on this thread using the session's timer.
    /// Returns `false` if it was cut short by cancellation.
    pub fn play_reveal(&mut self, playback: &RevealPlayback) -> bool {
        let timer = self.timer.clone();
        for (index, step) in playback.steps.iter().enumerate() {
            if !self.apply_reveal_step(playback, index) {
                return false;
            }
            timer.sleep(step.duration());
        }
        self.finish_reveal(playback)
    }

    /// Accepts one digit. Ignored outside input, past the sequence length,
    /// or for values above 9. The last digit scores the round.
    pub fn enter_digit(&mut self, digit: u8) -> bool {
        if !self.phase.allows_input()
            || digit > 9
            || self.user_sequence.len() >= self.sequence.len()
        {
            return false;
        }
        self.user_sequence.push(digit);
        if self.user_sequence.len() == self.sequence.len() {
            self.score_round();
        }
        true
    }

    fn score_round(&mut self) {
        let response_ms = self
            .input_opened_at
            .map(|t| self.timer.elapsed(t).as_millis() as u64)
            .unwrap_or(0);
        let trial = MemoryTrial::recalled(
            self.level,
            &self.sequence,
            self.user_sequence.clone(),
            response_ms,
        );
        let accuracy = trial.accuracy_pct;
        self.next_level = stats::next_level(self.level, accuracy);
        self.last_accuracy = Some(accuracy);
        self.record.record(trial);
        self.advance_phase();
        debug!(
            round = self.round,
            level = self.level,
            accuracy,
            next_level = self.next_level,
            "memory round scored"
        );
    }

    /// Player-driven step out of the result screen.
    pub fn next_round(&mut self) -> Option<RevealPlayback> {
        if !self.phase.is_scored() {
            return None;
        }
        if self.round >= self.config.total_rounds {
            self.complete();
            return None;
        }
        self.round += 1;
        self.level = self.next_level;
        Some(self.begin_round())
    }

    /// Player ends the game early.
    pub fn end(&mut self) -> bool {
        if self.phase.is_terminal() {
            return false;
        }
        self.complete();
        true
    }

    /// Back to the intro screen with a fresh record. Any playback in flight goes stale.
    pub fn reset(&mut self) {
        self.cancel_playback();
        self.generation += 1;
        self.phase = GamePhase::Intro;
        self.level = self.config.start_level.max(1);
        self.next_level = self.level;
        self.round = 0;
        self.sequence = DigitSequence::default();
        self.user_sequence.clear();
        self.visible_digit = None;
        self.last_accuracy = None;
        self.input_opened_at = None;
        self.record = SessionRecord::new();
    }

    fn complete(&mut self) {
        self.cancel_playback();
        self.visible_digit = None;
        self.phase = GamePhase::Complete;
        let summary = self.summary();
        info!(
            session = %self.record.id,
            rounds = summary.rounds_played,
            final_level = summary.final_level,
            "memory chain complete"
        );
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn is_complete(&self) -> bool {
        self.phase.is_terminal()
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn next_level(&self) -> u32 {
        self.next_level
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn sequence(&self) -> &DigitSequence {
        &self.sequence
    }

    pub fn user_sequence(&self) -> &[u8] {
        &self.user_sequence
    }

    pub fn visible_digit(&self) -> Option<u8> {
        self.visible_digit
    }

    pub fn last_accuracy(&self) -> Option<f64> {
        self.last_accuracy
    }

    pub fn record(&self) -> &SessionRecord<MemoryTrial> {
        &self.record
    }

    pub fn into_record(self) -> SessionRecord<MemoryTrial> {
        self.record
    }

    pub fn summary(&self) -> MemorySummary {
        let final_level = if self.phase.is_scored() || self.phase.is_terminal() {
            self.next_level
        } else {
            self.level
        };
        stats::summarize_memory(self.record.trials(), final_level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kognit_timing::ManualClock;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn session(rounds: u32) -> (MemoryChainSession<ManualClock, StdRng>, ManualClock) {
        let clock = ManualClock::new();
        let config = MemoryChainConfig {
            total_rounds: rounds,
            ..MemoryChainConfig::default()
        };
        (
            MemoryChainSession::new(config, clock.clone(), StdRng::seed_from_u64(9)),
            clock,
        )
    }

    fn recall(s: &mut MemoryChainSession<ManualClock, StdRng>, perfect: bool) {
        let digits: Vec<u8> = s.sequence().digits().to_vec();
        for d in digits {
            let d = if perfect { d } else { (d + 1) % 10 };
            s.enter_digit(d);
        }
    }

    #[test]
    fn reveal_script_layout() {
        let (mut s, clock) = session(10);
        let playback = s.start().unwrap();
        assert_eq!(s.sequence().len(), 1);
        let digit = s.sequence().digits()[0];
        assert_eq!(
            playback.steps(),
            &[
                RevealStep::LeadIn { ms: 600 },
                RevealStep::Show { digit, ms: 800 },
                RevealStep::Gap { ms: 600 },
            ]
        );
        assert!(s.play_reveal(&playback));
        assert_eq!(s.phase(), GamePhase::AwaitingInput);
        assert_eq!(clock.now(), playback.total_duration().as_nanos() as u64);
    }

    #[test]
    fn digits_before_input_phase_are_ignored() {
        let (mut s, _) = session(10);
        assert!(!s.enter_digit(3));
        let playback = s.start().unwrap();
        assert!(!s.enter_digit(3));
        assert!(s.user_sequence().is_empty());
        s.play_reveal(&playback);
        assert!(!s.enter_digit(10));
        assert!(s.enter_digit(3));
    }

    #[test]
    fn scores_on_final_digit_and_ignores_extra_input() {
        let (mut s, clock) = session(10);
        let p = s.start().unwrap();
        s.play_reveal(&p);
        clock.advance_ms(700);
        recall(&mut s, true);
        assert_eq!(s.phase(), GamePhase::Scored);
        assert_eq!(s.last_accuracy(), Some(100.0));
        assert_eq!(s.next_level(), 2);
        assert!(!s.enter_digit(1));
        assert_eq!(s.record().len(), 1);
        assert_eq!(s.record().last().unwrap().response_time_ms, 700);
    }

    #[test]
    fn level_steps_up_and_down() {
        let (mut s, _) = session(10);
        let p = s.start().unwrap();
        s.play_reveal(&p);
        recall(&mut s, true);
        let p = s.next_round().unwrap();
        assert_eq!(s.level(), 2);
        s.play_reveal(&p);
        recall(&mut s, true);
        let p = s.next_round().unwrap();
        assert_eq!(s.level(), 3);
        s.play_reveal(&p);
        recall(&mut s, false);
        assert_eq!(s.last_accuracy(), Some(0.0));
        assert_eq!(s.next_level(), 2);
    }

    #[test]
    fn level_floor_is_one() {
        let (mut s, _) = session(10);
        let p = s.start().unwrap();
        s.play_reveal(&p);
        recall(&mut s, false);
        s.next_round();
        assert_eq!(s.level(), 1);
    }

    #[test]
    fn cancellation_stops_mid_reveal() {
        let (mut s, _) = session(10);
        let p = s.start().unwrap();
        assert!(s.apply_reveal_step(&p, 0));
        assert!(s.apply_reveal_step(&p, 1));
        let shown = s.visible_digit();
        assert!(shown.is_some());
        p.cancel();
        assert!(!s.apply_reveal_step(&p, 2));
        assert_eq!(s.visible_digit(), shown);
        assert!(!s.finish_reveal(&p));
        assert_eq!(s.phase(), GamePhase::Presenting);
    }

    #[test]
    fn reset_makes_playback_stale() {
        let (mut s, _) = session(10);
        let p = s.start().unwrap();
        s.apply_reveal_step(&p, 0);
        s.reset();
        assert!(p.token().is_cancelled());
        assert!(!s.play_reveal(&p));
        assert_eq!(s.phase(), GamePhase::Intro);
        assert!(s.record().is_empty());
    }

    #[test]
    fn completes_after_round_limit() {
        let (mut s, _) = session(3);
        let mut p = s.start().unwrap();
        for round in 1..=3 {
            assert_eq!(s.round(), round);
            s.play_reveal(&p);
            recall(&mut s, true);
            match s.next_round() {
                Some(next) => p = next,
                None => break,
            }
        }
        assert!(s.is_complete());
        assert_eq!(s.record().len(), 3);
        let m = s.summary();
        assert_eq!(m.rounds_played, 3);
        assert_eq!(m.perfect_rounds, 3);
        assert_eq!(m.final_level, 4);
        assert!(s.next_round().is_none());
        assert!(!s.end());
    }

    #[test]
    fn end_cancels_running_reveal() {
        let (mut s, _) = session(10);
        let p = s.start().unwrap();
        assert!(s.end());
        assert!(p.token().is_cancelled());
        assert!(!s.apply_reveal_step(&p, 0));
        assert!(s.is_complete());
    }
}
