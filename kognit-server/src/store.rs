//! In-memory tables behind the persistence API.
//!
//! Ids come from per-table counters starting at 1 and are never reused, so
//! rows stay sorted by id and insertion order and id order coincide even
//! after users are deleted.

use crate::error::StoreError;
use chrono::{DateTime, NaiveDate, Utc};
use kognit_client::{GameResultPayload, Sex};
use kognit_core::StroopTrial;
use kognit_experiment::stats;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

pub const HISTORY_LIMIT: usize = 20;
pub const DEFAULT_LEADERBOARD_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    #[default]
    User,
    Admin,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: u64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub birth_date: NaiveDate,
    pub sex: Sex,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Public name on the leaderboard: first name and last initial.
    pub fn display_name(&self) -> String {
        match self.last_name.chars().next() {
            Some(initial) => format!("{} {}.", self.first_name, initial),
            None => self.first_name.clone(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Registration form. Every field defaults so that blanks are reported as
/// validation errors rather than decode failures.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    /// `YYYY-MM-DD`
    pub birth_date: String,
    pub sex: String,
    pub role: Option<Role>,
}

fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && domain.split('.').all(|label| !label.is_empty())
}

fn parse_sex(raw: &str) -> Option<Sex> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "f" | "female" => Some(Sex::Female),
        "m" | "male" => Some(Sex::Male),
        _ => None,
    }
}

impl NewUser {
    fn validate(&self, today: NaiveDate) -> Result<(NaiveDate, Sex), StoreError> {
        let required = [
            ("firstName", &self.first_name),
            ("lastName", &self.last_name),
            ("email", &self.email),
            ("birthDate", &self.birth_date),
            ("sex", &self.sex),
        ];
        if let Some((field, _)) = required.iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(StoreError::Invalid(format!("{field} is required")));
        }
        if !is_valid_email(self.email.trim()) {
            return Err(StoreError::Invalid("invalid email address".into()));
        }
        let birth_date = NaiveDate::parse_from_str(self.birth_date.trim(), "%Y-%m-%d")
            .map_err(|_| StoreError::Invalid("birthDate must be YYYY-MM-DD".into()))?;
        if birth_date > today {
            return Err(StoreError::Invalid("birthDate is in the future".into()));
        }
        let sex = parse_sex(&self.sex)
            .ok_or_else(|| StoreError::Invalid("sex must be female or male".into()))?;
        Ok((birth_date, sex))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameScore {
    pub accuracy: f64,
    /// Mean reaction time of correct trials, in ms.
    pub speed: f64,
    pub cognitive_score: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrialRow {
    pub trial_number: u32,
    #[serde(flatten)]
    pub trial: StroopTrial,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameRecord {
    pub id: u64,
    pub user_id: u64,
    pub played_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub total_rounds: u32,
    pub errors: u32,
    pub avg_reaction_time_ms: f64,
    pub congruent_trials: u32,
    pub incongruent_trials: u32,
    pub congruent_accuracy: f64,
    pub incongruent_accuracy: f64,
    pub result: GameScore,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub trials: Vec<TrialRow>,
}

impl GameRecord {
    /// Validates a submitted result and derives the stored figures. When the
    /// trial log is present it is authoritative over the client's averages.
    pub fn from_payload(
        id: u64,
        user_id: u64,
        payload: GameResultPayload,
        played_at: DateTime<Utc>,
    ) -> Result<Self, StoreError> {
        if payload.score > payload.total_rounds {
            return Err(StoreError::Invalid("score exceeds totalRounds".into()));
        }
        if !(0.0..=100.0).contains(&payload.accuracy) {
            return Err(StoreError::Invalid("accuracy must be within 0..=100".into()));
        }
        if !payload.avg_time.is_finite() || payload.avg_time < 0.0 {
            return Err(StoreError::Invalid("avgTime must be a non-negative number".into()));
        }
        let rounds = payload.total_rounds as usize;
        if payload.round_times.len() != rounds || payload.answers.len() != rounds {
            return Err(StoreError::Invalid(
                "roundTimes and answers must have totalRounds entries".into(),
            ));
        }
        let duration_ms = payload
            .round_times
            .iter()
            .try_fold(0u64, |total, &t| total.checked_add(t))
            .ok_or_else(|| StoreError::Invalid("roundTimes too large".into()))?;

        let trials = payload.trials.unwrap_or_default();
        let summary = stats::summarize(&trials);
        let (avg_time, congruent_accuracy, incongruent_accuracy) = if trials.is_empty() {
            (
                payload.avg_time,
                payload.congruent_accuracy.unwrap_or(0.0),
                payload.incongruent_accuracy.unwrap_or(0.0),
            )
        } else {
            (
                summary.avg_reaction_time_ms,
                summary.congruent_accuracy_pct,
                summary.incongruent_accuracy_pct,
            )
        };
        let cognitive_score = if payload.total_rounds == 0 {
            0
        } else {
            stats::cognitive_score(payload.accuracy, avg_time)
        };

        Ok(Self {
            id,
            user_id,
            played_at,
            duration_ms,
            total_rounds: payload.total_rounds,
            errors: payload.total_rounds - payload.score,
            avg_reaction_time_ms: avg_time,
            congruent_trials: summary.congruent_trials,
            incongruent_trials: summary.incongruent_trials,
            congruent_accuracy,
            incongruent_accuracy,
            result: GameScore {
                accuracy: payload.accuracy,
                speed: avg_time,
                cognitive_score,
            },
            trials: trials
                .into_iter()
                .zip(1..)
                .map(|(trial, trial_number)| TrialRow {
                    trial_number,
                    trial,
                })
                .collect(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStats {
    pub total_games: u32,
    pub avg_accuracy: f64,
    pub avg_speed: f64,
    pub best_score: u32,
    pub avg_cognitive_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub rank: u32,
    pub user_id: u64,
    pub name: String,
    pub score: u32,
    pub accuracy: f64,
    pub avg_time: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRank {
    pub rank: u32,
    pub best_score: u32,
    pub accuracy: f64,
    pub speed: f64,
}

/// Row of the admin user list.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    #[serde(flatten)]
    pub user: User,
    pub game_count: u32,
}

/// One game on a user's progress chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartPoint {
    pub date: NaiveDate,
    /// Unix milliseconds, for ordering on the client
    pub date_time: i64,
    pub game_number: u32,
    pub accuracy: f64,
    pub cognitive_score: u32,
    pub avg_time: f64,
    pub total_trials: u32,
    pub correct_trials: u32,
    pub congruent_accuracy: f64,
    pub incongruent_accuracy: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserChart {
    pub user_id: u64,
    pub total_games: u32,
    pub avg_accuracy: f64,
    pub avg_cognitive_score: f64,
    pub chart_data: Vec<ChartPoint>,
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

#[derive(Debug, Default)]
struct Tables {
    users: Vec<User>,
    games: Vec<GameRecord>,
    last_user_id: u64,
    last_game_id: u64,
}

impl Tables {
    fn user(&self, id: u64) -> Option<&User> {
        let index = self.users.binary_search_by_key(&id, |u| u.id).ok()?;
        self.users.get(index)
    }

    /// Best game of every non-admin user. Ties within a user keep the
    /// earliest game; the list is sorted by score, then by that game's id.
    fn best_games(&self) -> Vec<(&User, &GameRecord)> {
        let mut slot: HashMap<u64, usize> = HashMap::new();
        let mut best: Vec<(&User, &GameRecord)> = Vec::new();
        for game in &self.games {
            let Some(user) = self.user(game.user_id).filter(|u| !u.is_admin()) else {
                continue;
            };
            match slot.get(&user.id) {
                Some(&i) => {
                    if game.result.cognitive_score > best[i].1.result.cognitive_score {
                        best[i].1 = game;
                    }
                }
                None => {
                    slot.insert(user.id, best.len());
                    best.push((user, game));
                }
            }
        }
        best.sort_by(|a, b| {
            b.1.result
                .cognitive_score
                .cmp(&a.1.result.cognitive_score)
                .then(a.1.id.cmp(&b.1.id))
        });
        best
    }
}

#[derive(Debug, Default)]
pub struct Store {
    tables: RwLock<Tables>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, form: NewUser) -> Result<User, StoreError> {
        let (birth_date, sex) = form.validate(Utc::now().date_naive())?;
        let email = form.email.trim().to_ascii_lowercase();

        let mut tables = self.tables.write();
        if tables.users.iter().any(|u| u.email == email) {
            return Err(StoreError::DuplicateEmail);
        }
        tables.last_user_id += 1;
        let user = User {
            id: tables.last_user_id,
            first_name: form.first_name.trim().to_string(),
            last_name: form.last_name.trim().to_string(),
            email,
            birth_date,
            sex,
            role: form.role.unwrap_or_default(),
            created_at: Utc::now(),
        };
        tables.users.push(user.clone());
        info!(user = user.id, role = ?user.role, "user registered");
        Ok(user)
    }

    pub fn user(&self, id: u64) -> Option<User> {
        self.tables.read().user(id).cloned()
    }

    pub fn save_result(
        &self,
        user_id: u64,
        payload: GameResultPayload,
    ) -> Result<GameRecord, StoreError> {
        let mut tables = self.tables.write();
        if tables.user(user_id).is_none() {
            return Err(StoreError::Unauthenticated);
        }
        let id = tables.last_game_id + 1;
        let record = GameRecord::from_payload(id, user_id, payload, Utc::now())?;
        tables.last_game_id = id;
        tables.games.push(record.clone());
        info!(
            user = user_id,
            game = id,
            cognitive_score = record.result.cognitive_score,
            "game result stored"
        );
        Ok(record)
    }

    /// Every user with their game count, newest account first.
    pub fn list_users(&self) -> Vec<UserSummary> {
        let tables = self.tables.read();
        let mut counts: HashMap<u64, u32> = HashMap::new();
        for game in &tables.games {
            *counts.entry(game.user_id).or_default() += 1;
        }
        tables
            .users
            .iter()
            .rev()
            .map(|user| UserSummary {
                user: user.clone(),
                game_count: counts.get(&user.id).copied().unwrap_or(0),
            })
            .collect()
    }

    /// Removes a user and their games. An account cannot delete itself.
    pub fn delete_user(&self, caller: u64, id: u64) -> Result<User, StoreError> {
        if caller == id {
            return Err(StoreError::Invalid("cannot delete your own account".into()));
        }
        let mut tables = self.tables.write();
        let index = tables
            .users
            .binary_search_by_key(&id, |u| u.id)
            .map_err(|_| StoreError::NotFound)?;
        let user = tables.users.remove(index);
        let before = tables.games.len();
        tables.games.retain(|g| g.user_id != id);
        info!(
            user = id,
            by = caller,
            games = before - tables.games.len(),
            "user deleted"
        );
        Ok(user)
    }

    /// Per-game series of one user, oldest first, for progress charts.
    pub fn user_chart(&self, user_id: u64) -> Result<UserChart, StoreError> {
        let tables = self.tables.read();
        if tables.user(user_id).is_none() {
            return Err(StoreError::NotFound);
        }
        let chart_data: Vec<ChartPoint> = tables
            .games
            .iter()
            .filter(|g| g.user_id == user_id)
            .zip(1..)
            .map(|(g, game_number)| ChartPoint {
                date: g.played_at.date_naive(),
                date_time: g.played_at.timestamp_millis(),
                game_number,
                accuracy: g.result.accuracy,
                cognitive_score: g.result.cognitive_score,
                avg_time: g.avg_reaction_time_ms,
                total_trials: g.total_rounds,
                correct_trials: g.total_rounds - g.errors,
                congruent_accuracy: g.congruent_accuracy,
                incongruent_accuracy: g.incongruent_accuracy,
            })
            .collect();
        let (avg_accuracy, avg_cognitive_score) = if chart_data.is_empty() {
            (0.0, 0.0)
        } else {
            let n = chart_data.len() as f64;
            (
                chart_data.iter().map(|p| p.accuracy).sum::<f64>() / n,
                chart_data.iter().map(|p| p.cognitive_score as f64).sum::<f64>() / n,
            )
        };
        Ok(UserChart {
            user_id,
            total_games: chart_data.len() as u32,
            avg_accuracy: round2(avg_accuracy),
            avg_cognitive_score: round2(avg_cognitive_score),
            chart_data,
        })
    }

    /// Latest games of one user, newest first
    pub fn history(&self, user_id: u64) -> Vec<GameRecord> {
        self.tables
            .read()
            .games
            .iter()
            .rev()
            .filter(|g| g.user_id == user_id)
            .take(HISTORY_LIMIT)
            .cloned()
            .collect()
    }

    pub fn stats(&self, user_id: u64) -> GameStats {
        let tables = self.tables.read();
        let scores: Vec<&GameScore> = tables
            .games
            .iter()
            .filter(|g| g.user_id == user_id)
            .map(|g| &g.result)
            .collect();
        if scores.is_empty() {
            return GameStats::default();
        }
        let n = scores.len() as f64;
        GameStats {
            total_games: scores.len() as u32,
            avg_accuracy: scores.iter().map(|s| s.accuracy).sum::<f64>() / n,
            avg_speed: scores.iter().map(|s| s.speed).sum::<f64>() / n,
            best_score: scores.iter().map(|s| s.cognitive_score).max().unwrap_or(0),
            avg_cognitive_score: scores.iter().map(|s| s.cognitive_score as f64).sum::<f64>() / n,
        }
    }

    pub fn leaderboard(&self, limit: usize) -> Vec<LeaderboardEntry> {
        let tables = self.tables.read();
        tables
            .best_games()
            .into_iter()
            .take(limit)
            .zip(1..)
            .map(|((user, game), rank)| LeaderboardEntry {
                rank,
                user_id: user.id,
                name: user.display_name(),
                score: game.result.cognitive_score,
                accuracy: game.result.accuracy,
                avg_time: game.result.speed,
            })
            .collect()
    }

    /// `None` when the user has no games yet.
    pub fn rank(&self, user_id: u64) -> Option<UserRank> {
        let tables = self.tables.read();
        let mine = tables
            .games
            .iter()
            .filter(|g| g.user_id == user_id)
            .fold(None::<&GameRecord>, |best, g| match best {
                Some(b) if b.result.cognitive_score >= g.result.cognitive_score => Some(b),
                _ => Some(g),
            })?;
        let better = tables
            .best_games()
            .iter()
            .filter(|(user, game)| {
                user.id != user_id && game.result.cognitive_score > mine.result.cognitive_score
            })
            .count() as u32;
        Some(UserRank {
            rank: better + 1,
            best_score: mine.result.cognitive_score,
            accuracy: mine.result.accuracy,
            speed: mine.result.speed,
        })
    }
}
