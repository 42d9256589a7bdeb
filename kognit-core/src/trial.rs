use crate::color::InkColor;
use crate::stimulus::{DigitSequence, Stimulus, StroopStimulus};
use serde::{Deserialize, Serialize};

/// What the session record and the aggregator need from a finished trial
pub trait Outcome {
    fn is_correct(&self) -> bool;
    fn reaction_time_ms(&self) -> u64;

    /// `Some(true)` for congruent Stroop trials, `None` where congruency has no meaning.
    fn congruency(&self) -> Option<bool> {
        None
    }
}

/// Recorded Stroop trial. Field names follow the persistence wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StroopTrial {
    pub is_congruent: bool,
    pub word_text: InkColor,
    pub display_color: InkColor,
    pub correct_answer: InkColor,
    pub user_answer: InkColor,
    pub is_correct: bool,
    #[serde(rename = "reactionTime")]
    pub reaction_time_ms: u64,
}

impl StroopTrial {
    pub fn answered(stimulus: &StroopStimulus, answer: InkColor, reaction_time_ms: u64) -> Self {
        Self {
            is_congruent: stimulus.is_congruent(),
            word_text: stimulus.word,
            display_color: stimulus.ink,
            correct_answer: stimulus.correct_answer(),
            user_answer: answer,
            is_correct: stimulus.is_correct(&answer),
            reaction_time_ms,
        }
    }
}

impl Outcome for StroopTrial {
    fn is_correct(&self) -> bool {
        self.is_correct
    }

    fn reaction_time_ms(&self) -> u64 {
        self.reaction_time_ms
    }

    fn congruency(&self) -> Option<bool> {
        Some(self.is_congruent)
    }
}

/// Recorded memory-chain round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryTrial {
    pub level: u32,
    pub sequence: Vec<u8>,
    pub user_sequence: Vec<u8>,
    pub accuracy_pct: f64,
    pub response_time_ms: u64,
}

impl MemoryTrial {
    pub fn recalled(
        level: u32,
        sequence: &DigitSequence,
        user_sequence: Vec<u8>,
        response_time_ms: u64,
    ) -> Self {
        let accuracy_pct = sequence.recall_accuracy(&user_sequence);
        Self {
            level,
            sequence: sequence.correct_answer(),
            user_sequence,
            accuracy_pct,
            response_time_ms,
        }
    }
}

impl Outcome for MemoryTrial {
    fn is_correct(&self) -> bool {
        self.accuracy_pct >= 100.0
    }

    fn reaction_time_ms(&self) -> u64 {
        self.response_time_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stroop_trial_wire_shape() {
        let stim = StroopStimulus {
            word: InkColor::Green,
            ink: InkColor::Red,
        };
        let trial = StroopTrial::answered(&stim, InkColor::Red, 640);
        let json = serde_json::to_value(&trial).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "isCongruent": false,
                "wordText": "GREEN",
                "displayColor": "RED",
                "correctAnswer": "RED",
                "userAnswer": "RED",
                "isCorrect": true,
                "reactionTime": 640
            })
        );
    }

    #[test]
    fn memory_trial_correct_only_when_perfect() {
        let seq = DigitSequence(vec![3, 1, 4]);
        let perfect = MemoryTrial::recalled(3, &seq, vec![3, 1, 4], 900);
        let partial = MemoryTrial::recalled(3, &seq, vec![3, 1, 5], 900);
        assert!(perfect.is_correct());
        assert!(!partial.is_correct());
        assert_eq!(partial.sequence, vec![3, 1, 4]);
        assert_eq!(partial.congruency(), None);
    }
}
