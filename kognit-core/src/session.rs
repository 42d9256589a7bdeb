use crate::trial::Outcome;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Chronological trial log of one play-through, with running score and streak.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord<T> {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    trials: Vec<T>,
    score: u32,
    streak: u32,
    best_streak: u32,
}

impl<T: Outcome> SessionRecord<T> {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            trials: Vec::new(),
            score: 0,
            streak: 0,
            best_streak: 0,
        }
    }

    /// Appends a finished trial. Score counts correct trials; the streak
    /// resets to 0 on any miss.
    pub fn record(&mut self, trial: T) {
        if trial.is_correct() {
            self.score += 1;
            self.streak += 1;
            self.best_streak = self.best_streak.max(self.streak);
        } else {
            self.streak = 0;
        }
        self.trials.push(trial);
    }

    pub fn trials(&self) -> &[T] {
        &self.trials
    }

    pub fn last(&self) -> Option<&T> {
        self.trials.last()
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn streak(&self) -> u32 {
        self.streak
    }

    pub fn best_streak(&self) -> u32 {
        self.best_streak
    }

    pub fn len(&self) -> usize {
        self.trials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trials.is_empty()
    }
}

impl<T: Outcome> Default for SessionRecord<T> {
    fn default() -> Self {
        Self::new()
    }
}
