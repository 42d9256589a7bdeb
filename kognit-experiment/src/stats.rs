use kognit_core::{MemoryTrial, Outcome};
use serde::{Deserialize, Serialize};

const ACCURACY_WEIGHT: f64 = 0.6;
const SPEED_WEIGHT: f64 = 0.4;
/// Average reaction time that scores 0 on speed.
const SLOWEST_MS: f64 = 3000.0;
/// Width of the linear band: 500 ms scores 100.
const SPEED_BAND_MS: f64 = 2500.0;

/// Aggregate figures for a finished session
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryStats {
    pub total_trials: u32,
    pub correct_trials: u32,
    pub accuracy_pct: f64,
    /// Mean over correct trials only.
    pub avg_reaction_time_ms: f64,
    pub congruent_trials: u32,
    pub congruent_correct: u32,
    pub congruent_accuracy_pct: f64,
    pub incongruent_trials: u32,
    pub incongruent_correct: u32,
    pub incongruent_accuracy_pct: f64,
    pub speed_score: f64,
    pub cognitive_score: u32,
}

pub fn speed_score(avg_reaction_time_ms: f64) -> f64 {
    ((SLOWEST_MS - avg_reaction_time_ms) / SPEED_BAND_MS * 100.0).clamp(0.0, 100.0)
}

pub fn cognitive_score(accuracy_pct: f64, avg_reaction_time_ms: f64) -> u32 {
    let combined =
        accuracy_pct * ACCURACY_WEIGHT + speed_score(avg_reaction_time_ms) * SPEED_WEIGHT;
    combined.round().max(0.0) as u32
}

fn pct(part: u32, whole: u32) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

/// Reduces a trial list to its summary. An empty list yields all zeros.
///
/// With trials present but none correct the average reaction time is 0, which
/// the speed formula reads as a perfect 100.
pub fn summarize<O: Outcome>(trials: &[O]) -> SummaryStats {
    if trials.is_empty() {
        return SummaryStats::default();
    }

    let mut s = SummaryStats::default();
    let mut correct_rt_sum: u64 = 0;

    for trial in trials {
        s.total_trials += 1;
        let correct = trial.is_correct();
        if correct {
            s.correct_trials += 1;
            correct_rt_sum += trial.reaction_time_ms();
        }
        match trial.congruency() {
            Some(true) => {
                s.congruent_trials += 1;
                s.congruent_correct += u32::from(correct);
            }
            Some(false) => {
                s.incongruent_trials += 1;
                s.incongruent_correct += u32::from(correct);
            }
            None => {}
        }
    }

    s.accuracy_pct = pct(s.correct_trials, s.total_trials);
    s.avg_reaction_time_ms = if s.correct_trials == 0 {
        0.0
    } else {
        correct_rt_sum as f64 / s.correct_trials as f64
    };
    s.congruent_accuracy_pct = pct(s.congruent_correct, s.congruent_trials);
    s.incongruent_accuracy_pct = pct(s.incongruent_correct, s.incongruent_trials);
    s.speed_score = speed_score(s.avg_reaction_time_ms);
    s.cognitive_score = cognitive_score(s.accuracy_pct, s.avg_reaction_time_ms);
    s
}

/// Level for the next memory-chain round: up on a perfect recall, down below 30 %.
pub fn next_level(level: u32, accuracy_pct: f64) -> u32 {
    if accuracy_pct == 100.0 {
        level + 1
    } else if accuracy_pct >= 30.0 {
        level
    } else {
        level.saturating_sub(1).max(1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemorySummary {
    pub rounds_played: u32,
    pub perfect_rounds: u32,
    pub mean_accuracy_pct: f64,
    pub final_level: u32,
    pub max_level: u32,
    pub total_time_ms: u64,
}

pub fn summarize_memory(trials: &[MemoryTrial], final_level: u32) -> MemorySummary {
    if trials.is_empty() {
        return MemorySummary {
            final_level,
            max_level: final_level,
            ..MemorySummary::default()
        };
    }
    let n = trials.len() as u32;
    MemorySummary {
        rounds_played: n,
        perfect_rounds: trials.iter().filter(|t| t.is_correct()).count() as u32,
        mean_accuracy_pct: trials.iter().map(|t| t.accuracy_pct).sum::<f64>() / n as f64,
        final_level,
        max_level: trials
            .iter()
            .map(|t| t.level)
            .chain(std::iter::once(final_level))
            .max()
            .unwrap_or(final_level),
        total_time_ms: trials.iter().map(|t| t.response_time_ms).sum(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kognit_core::{DigitSequence, InkColor, StroopStimulus, StroopTrial};

    fn trial(congruent: bool, correct: bool, rt: u64) -> StroopTrial {
        let stim = StroopStimulus {
            word: InkColor::Red,
            ink: if congruent { InkColor::Red } else { InkColor::Blue },
        };
        let answer = if correct { stim.ink } else { InkColor::Green };
        StroopTrial::answered(&stim, answer, rt)
    }

    #[test]
    fn average_excludes_incorrect_trials() {
        let trials = [
            trial(false, true, 100),
            trial(false, false, 5000),
            trial(true, true, 300),
        ];
        let s = summarize(&trials);
        assert_eq!(s.avg_reaction_time_ms, 200.0);
        assert_eq!(s.correct_trials, 2);
    }

    #[test]
    fn documented_score_example() {
        assert_eq!(speed_score(1000.0), 80.0);
        assert_eq!(cognitive_score(80.0, 1000.0), 80);
    }

    #[test]
    fn speed_score_clamps() {
        assert_eq!(speed_score(500.0), 100.0);
        assert_eq!(speed_score(200.0), 100.0);
        assert_eq!(speed_score(3000.0), 0.0);
        assert_eq!(speed_score(9000.0), 0.0);
        assert_eq!(speed_score(1750.0), 50.0);
    }

    #[test]
    fn perfect_ten_trial_session() {
        let trials: Vec<_> = (0..10).map(|i| trial(i % 3 == 0, true, 500)).collect();
        let s = summarize(&trials);
        assert_eq!(s.accuracy_pct, 100.0);
        assert_eq!(s.avg_reaction_time_ms, 500.0);
        assert_eq!(s.speed_score, 100.0);
        assert_eq!(s.cognitive_score, 100);
    }

    #[test]
    fn empty_session_is_all_zero() {
        let s = summarize::<StroopTrial>(&[]);
        assert_eq!(s, SummaryStats::default());
        assert_eq!(s.cognitive_score, 0);
        assert_eq!(s.speed_score, 0.0);
    }

    #[test]
    fn zero_correct_reads_as_fast() {
        let trials = [trial(false, false, 2000), trial(true, false, 900)];
        let s = summarize(&trials);
        assert_eq!(s.avg_reaction_time_ms, 0.0);
        assert_eq!(s.speed_score, 100.0);
        assert_eq!(s.cognitive_score, 40);
    }

    #[test]
    fn partitions_sum_to_totals() {
        let trials = [
            trial(true, true, 400),
            trial(true, false, 400),
            trial(false, true, 700),
            trial(false, true, 800),
            trial(false, false, 900),
        ];
        let s = summarize(&trials);
        assert_eq!(s.congruent_trials + s.incongruent_trials, s.total_trials);
        assert_eq!(s.congruent_correct + s.incongruent_correct, s.correct_trials);
        assert_eq!(s.congruent_accuracy_pct, 50.0);
        assert!((s.incongruent_accuracy_pct - 200.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn level_rule() {
        assert_eq!(next_level(4, 100.0), 5);
        assert_eq!(next_level(4, 50.0), 4);
        assert_eq!(next_level(4, 30.0), 4);
        assert_eq!(next_level(4, 29.9), 3);
        assert_eq!(next_level(4, 10.0), 3);
        assert_eq!(next_level(1, 10.0), 1);
        assert_eq!(next_level(1, 0.0), 1);
    }

    #[test]
    fn memory_summary() {
        let seq = DigitSequence(vec![1, 2]);
        let trials = vec![
            MemoryTrial::recalled(2, &seq, vec![1, 2], 1200),
            MemoryTrial::recalled(2, &seq, vec![1, 0], 800),
        ];
        let m = summarize_memory(&trials, 3);
        assert_eq!(m.rounds_played, 2);
        assert_eq!(m.perfect_rounds, 1);
        assert_eq!(m.mean_accuracy_pct, 75.0);
        assert_eq!(m.max_level, 3);
        assert_eq!(m.total_time_ms, 2000);
    }
}
