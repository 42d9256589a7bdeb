use crate::config::StroopConfig;
use crate::generator::{self, StroopPrompt};
use crate::stats::{self, SummaryStats};
use kognit_core::{GamePhase, InkColor, Phase, SessionRecord, StroopTrial};
use kognit_timing::{Countdown, TickResult, Timer};
use rand::Rng;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq)]
pub enum StroopEvent {
    Start,
    Answer(InkColor),
    /// Player skipped the feedback screen.
    Continue,
    /// Feedback auto-advance fired for the given trial ordinal.
    FeedbackElapsed { trial: usize },
    /// One second of the session clock elapsed.
    Tick,
}

/// What the feedback screen shows after an answer
#[derive(Debug, Clone, PartialEq)]
pub struct Feedback {
    /// 1-based ordinal of the trial this feedback belongs to.
    pub trial: usize,
    pub correct: bool,
    pub score: u32,
    pub streak: u32,
}

struct ActivePrompt<Ts> {
    prompt: StroopPrompt,
    presented_at: Ts,
}

pub struct StroopSession<T, R>
where
    T: Timer,
    R: Rng,
{
    pub config: StroopConfig,
    timer: T,
    rng: R,
    phase: GamePhase,
    countdown: Countdown,
    batch_index: u32,
    trial_in_batch: u32,
    current: Option<ActivePrompt<T::Timestamp>>,
    feedback: Option<(Feedback, T::Timestamp)>,
    record: SessionRecord<StroopTrial>,
}

impl<T, R> StroopSession<T, R>
where
    T: Timer<Timestamp = u64>,
    R: Rng,
{
    pub fn new(config: StroopConfig, timer: T, rng: R) -> Self {
        let countdown = Countdown::new(config.session_secs);
        Self {
            config,
            timer,
            rng,
            phase: GamePhase::default(),
            countdown,
            batch_index: 1,
            trial_in_batch: 1,
            current: None,
            feedback: None,
            record: SessionRecord::new(),
        }
    }

    pub fn handle_event(&mut self, event: StroopEvent) -> bool {
        match event {
            StroopEvent::Start => self.start(),
            StroopEvent::Answer(color) => self.answer(color),
            StroopEvent::Continue => match &self.feedback {
                Some((fb, _)) => {
                    let trial = fb.trial;
                    self.advance_from_feedback(trial)
                }
                None => false,
            },
            StroopEvent::FeedbackElapsed { trial } => self.advance_from_feedback(trial),
            StroopEvent::Tick => self.tick(),
        }
    }

    /// Polls the clock and reports timed events that are due.
    pub fn update(&mut self) -> Vec<StroopEvent> {
        let mut events = Vec::new();
        if self.phase.is_scored() {
            if let Some((fb, shown_at)) = &self.feedback {
                let delay = Duration::from_millis(self.config.feedback_ms);
                if self.timer.elapsed(*shown_at) >= delay {
                    events.push(StroopEvent::FeedbackElapsed { trial: fb.trial });
                }
            }
        }
        events
    }

    pub fn start(&mut self) -> bool {
        if !self.phase.is_intro() {
            return false;
        }
        self.countdown.start();
        self.batch_index = 1;
        self.trial_in_batch = 1;
        info!(
            session = %self.record.id,
            secs = self.config.session_secs,
            "stroop session started"
        );
        self.present_next();
        true
    }

    pub fn answer(&mut self, color: InkColor) -> bool {
        if !self.phase.allows_input() {
            return false;
        }
        let Some(active) = self.current.take() else {
            return false;
        };

        let now = self.timer.now();
        let rt_ms = self.timer.elapsed(active.presented_at).as_millis() as u64;
        let trial = StroopTrial::answered(&active.prompt.stimulus, color, rt_ms);
        let correct = trial.is_correct;
        self.record.record(trial);

        let fb = Feedback {
            trial: self.record.len(),
            correct,
            score: self.record.score(),
            streak: self.record.streak(),
        };
        debug!(
            trial = fb.trial,
            batch = self.batch_index,
            correct,
            rt_ms,
            "stroop answer recorded"
        );
        self.feedback = Some((fb, now));
        self.advance_phase();
        true
    }

    /// Single transition out of the feedback screen. Whichever of the
    /// auto-advance timer or the player's continue arrives first wins; the
    /// other, and any stale timer from an earlier trial, finds nothing to do.
    pub fn advance_from_feedback(&mut self, trial: usize) -> bool {
        if !self.phase.is_scored() {
            return false;
        }
        match &self.feedback {
            Some((fb, _)) if fb.trial == trial => {}
            _ => return false,
        }
        self.feedback = None;

        self.trial_in_batch += 1;
        if self.trial_in_batch > self.config.batch_size {
            self.trial_in_batch = 1;
            self.batch_index += 1;
            debug!(batch = self.batch_index, "stroop batch advanced");
        }
        self.present_next();
        true
    }

    /// One second of session time. At zero the session completes wherever it is.
    pub fn tick(&mut self) -> bool {
        if self.phase.is_intro() || self.phase.is_terminal() {
            return false;
        }
        match self.countdown.tick() {
            TickResult::Running(_) => true,
            TickResult::Expired => {
                self.complete();
                true
            }
            TickResult::Idle => false,
        }
    }

    /// Ends the session and releases the countdown. Safe to call on any exit path.
    pub fn teardown(&mut self) {
        if !self.phase.is_terminal() {
            self.complete();
        }
        self.countdown.stop();
    }

    /// Steps along the trial loop. Completion is set directly, never stepped into.
    fn advance_phase(&mut self) {
        if let Some(next) = self.phase.next() {
            self.phase = next;
        }
    }

    /// Entered from `Intro` or `Scored`.
    fn present_next(&mut self) {
        self.advance_phase();
        let prompt = generator::stroop_prompt(&mut self.rng, self.batch_index);
        self.current = Some(ActivePrompt {
            prompt,
            presented_at: self.timer.now(),
        });
        self.advance_phase();
    }

    fn complete(&mut self) {
        self.countdown.stop();
        self.current = None;
        self.feedback = None;
        self.phase = GamePhase::Complete;
        let summary = self.summary();
        info!(
            session = %self.record.id,
            trials = summary.total_trials,
            accuracy = summary.accuracy_pct,
            cognitive_score = summary.cognitive_score,
            "stroop session complete"
        );
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn is_complete(&self) -> bool {
        self.phase.is_terminal()
    }

    pub fn current_prompt(&self) -> Option<&StroopPrompt> {
        self.current.as_ref().map(|a| &a.prompt)
    }

    pub fn feedback(&self) -> Option<&Feedback> {
        self.feedback.as_ref().map(|(fb, _)| fb)
    }

    pub fn time_remaining_secs(&self) -> u32 {
        self.countdown.remaining_secs()
    }

    pub fn countdown_running(&self) -> bool {
        self.countdown.is_running()
    }

    pub fn batch_index(&self) -> u32 {
        self.batch_index
    }

    pub fn trial_in_batch(&self) -> u32 {
        self.trial_in_batch
    }

    pub fn record(&self) -> &SessionRecord<StroopTrial> {
        &self.record
    }

    pub fn into_record(self) -> SessionRecord<StroopTrial> {
        self.record
    }

    pub fn summary(&self) -> SummaryStats {
        stats::summarize(self.record.trials())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kognit_timing::ManualClock;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn session() -> (StroopSession<ManualClock, StdRng>, ManualClock) {
        let clock = ManualClock::new();
        let s = StroopSession::new(
            StroopConfig::default(),
            clock.clone(),
            StdRng::seed_from_u64(42),
        );
        (s, clock)
    }

    fn correct_answer(s: &StroopSession<ManualClock, StdRng>) -> InkColor {
        s.current_prompt().unwrap().stimulus.ink
    }

    fn wrong_answer(s: &StroopSession<ManualClock, StdRng>) -> InkColor {
        let ink = correct_answer(s);
        *s.current_prompt()
            .unwrap()
            .options
            .iter()
            .find(|c| **c != ink)
            .unwrap()
    }

    #[test]
    fn answers_are_ignored_before_start() {
        let (mut s, _) = session();
        assert!(!s.handle_event(StroopEvent::Answer(InkColor::Red)));
        assert!(!s.handle_event(StroopEvent::Tick));
        assert_eq!(s.phase(), GamePhase::Intro);
        assert!(s.record().is_empty());
    }

    #[test]
    fn answer_records_reaction_time() {
        let (mut s, clock) = session();
        s.handle_event(StroopEvent::Start);
        assert_eq!(s.phase(), GamePhase::AwaitingInput);
        clock.advance_ms(640);
        let c = correct_answer(&s);
        assert!(s.handle_event(StroopEvent::Answer(c)));
        assert_eq!(s.phase(), GamePhase::Scored);
        let t = s.record().last().unwrap();
        assert_eq!(t.reaction_time_ms, 640);
        assert!(t.is_correct);
        assert_eq!(s.feedback().unwrap().streak, 1);

        // second answer while the feedback screen is up is a no-op
        assert!(!s.handle_event(StroopEvent::Answer(c)));
        assert_eq!(s.record().len(), 1);
    }

    #[test]
    fn auto_advance_and_continue_race_once() {
        let (mut s, clock) = session();
        s.start();
        let c = correct_answer(&s);
        s.answer(c);
        assert!(s.update().is_empty());
        clock.advance_ms(1500);
        let due = s.update();
        assert_eq!(due, vec![StroopEvent::FeedbackElapsed { trial: 1 }]);

        assert!(s.handle_event(StroopEvent::Continue));
        assert_eq!(s.trial_in_batch(), 2);
        for e in due {
            assert!(!s.handle_event(e));
        }
        assert_eq!(s.trial_in_batch(), 2);
        assert_eq!(s.phase(), GamePhase::AwaitingInput);
    }

    #[test]
    fn stale_timer_does_not_skip_next_feedback() {
        let (mut s, _) = session();
        s.start();
        let c = correct_answer(&s);
        s.answer(c);
        s.handle_event(StroopEvent::Continue);
        let c = correct_answer(&s);
        s.answer(c);
        // timer armed for trial 1 fires during trial 2's feedback
        assert!(!s.handle_event(StroopEvent::FeedbackElapsed { trial: 1 }));
        assert_eq!(s.phase(), GamePhase::Scored);
        assert!(s.handle_event(StroopEvent::FeedbackElapsed { trial: 2 }));
    }

    #[test]
    fn batches_roll_over_every_ten_trials() {
        let (mut s, _) = session();
        s.start();
        for _ in 0..25 {
            let c = correct_answer(&s);
            s.answer(c);
            s.handle_event(StroopEvent::Continue);
        }
        assert_eq!(s.batch_index(), 3);
        assert_eq!(s.trial_in_batch(), 6);
        assert_eq!(s.current_prompt().unwrap().batch, 3);
        assert_eq!(s.current_prompt().unwrap().options.len(), 6);
        assert!(!s.is_complete());
    }

    #[test]
    fn countdown_forces_completion_mid_feedback() {
        let (mut s, _) = session();
        s.start();
        let w = wrong_answer(&s);
        s.answer(w);
        for _ in 0..59 {
            assert!(s.handle_event(StroopEvent::Tick));
        }
        assert_eq!(s.time_remaining_secs(), 1);
        assert_eq!(s.phase(), GamePhase::Scored);
        assert!(s.handle_event(StroopEvent::Tick));
        assert!(s.is_complete());
        assert!(!s.countdown_running());
        assert!(!s.handle_event(StroopEvent::Tick));
        assert!(!s.handle_event(StroopEvent::Continue));
        assert_eq!(s.record().streak(), 0);
        assert_eq!(s.summary().total_trials, 1);
    }

    #[test]
    fn teardown_releases_clock() {
        let (mut s, _) = session();
        s.start();
        s.teardown();
        assert!(s.is_complete());
        assert!(!s.countdown_running());
        assert!(!s.tick());
    }

    #[test]
    fn unanswered_trial_is_not_recorded_on_timeout() {
        let (mut s, _) = session();
        s.start();
        for _ in 0..60 {
            s.tick();
        }
        assert!(s.is_complete());
        assert!(s.record().is_empty());
        assert!(s.current_prompt().is_none());
        assert_eq!(s.summary(), SummaryStats::default());
    }
}
