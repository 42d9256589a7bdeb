use crate::color::InkColor;
use serde::{Deserialize, Serialize};

/// Defines stimuli and the response they expect
pub trait Stimulus: Clone + Send + Sync + std::fmt::Debug {
    type Answer: PartialEq;

    fn correct_answer(&self) -> Self::Answer;

    fn is_correct(&self, answer: &Self::Answer) -> bool {
        *answer == self.correct_answer()
    }
}

/// A colour word printed in an ink colour. The ink is the answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StroopStimulus {
    pub word: InkColor,
    pub ink: InkColor,
}

impl StroopStimulus {
    pub fn is_congruent(&self) -> bool {
        self.word == self.ink
    }
}

impl Stimulus for StroopStimulus {
    type Answer = InkColor;

    fn correct_answer(&self) -> InkColor {
        self.ink
    }
}

/// Digits to memorise, in presentation order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DigitSequence(pub Vec<u8>);

impl DigitSequence {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn digits(&self) -> &[u8] {
        &self.0
    }

    /// Percentage of positions recalled correctly. Missing positions count as wrong.
    pub fn recall_accuracy(&self, recalled: &[u8]) -> f64 {
        if self.0.is_empty() {
            return 0.0;
        }
        let hits = self
            .0
            .iter()
            .zip(recalled)
            .filter(|(expected, got)| expected == got)
            .count();
        hits as f64 / self.0.len() as f64 * 100.0
    }
}

impl Stimulus for DigitSequence {
    type Answer = Vec<u8>;

    fn correct_answer(&self) -> Vec<u8> {
        self.0.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ink_is_the_answer() {
        let s = StroopStimulus {
            word: InkColor::Red,
            ink: InkColor::Blue,
        };
        assert!(!s.is_congruent());
        assert!(s.is_correct(&InkColor::Blue));
        assert!(!s.is_correct(&InkColor::Red));
    }

    #[test]
    fn recall_accuracy_by_position() {
        let seq = DigitSequence(vec![1, 2, 3, 4]);
        assert_eq!(seq.recall_accuracy(&[1, 2, 3, 4]), 100.0);
        assert_eq!(seq.recall_accuracy(&[1, 2, 0, 0]), 50.0);
        assert_eq!(seq.recall_accuracy(&[4, 3, 2, 1]), 0.0);
        assert_eq!(DigitSequence::default().recall_accuracy(&[]), 0.0);
        assert!(seq.is_correct(&vec![1, 2, 3, 4]));
        assert!(!seq.is_correct(&vec![1, 2, 3]));
    }
}
