//! Wire shapes exchanged with the persistence and analysis services.

use crate::error::ClientError;
use chrono::Timelike;
use kognit_core::{MemoryTrial, Outcome, SessionRecord, StroopTrial};
use kognit_experiment::stats;
use serde::{Deserialize, Serialize};

/// Body of `POST /api/game/result`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameResultPayload {
    pub score: u32,
    pub total_rounds: u32,
    pub accuracy: f64,
    pub avg_time: f64,
    pub round_times: Vec<u64>,
    pub answers: Vec<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trials: Option<Vec<StroopTrial>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub congruent_accuracy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incongruent_accuracy: Option<f64>,
}

fn base_payload<T: Outcome>(record: &SessionRecord<T>) -> GameResultPayload {
    let summary = stats::summarize(record.trials());
    GameResultPayload {
        score: record.score(),
        total_rounds: summary.total_trials,
        accuracy: summary.accuracy_pct,
        avg_time: summary.avg_reaction_time_ms,
        round_times: record.trials().iter().map(|t| t.reaction_time_ms()).collect(),
        answers: record.trials().iter().map(|t| t.is_correct()).collect(),
        trials: None,
        congruent_accuracy: None,
        incongruent_accuracy: None,
    }
}

impl GameResultPayload {
    pub fn from_stroop(record: &SessionRecord<StroopTrial>) -> Self {
        let summary = stats::summarize(record.trials());
        Self {
            trials: Some(record.trials().to_vec()),
            congruent_accuracy: Some(summary.congruent_accuracy_pct),
            incongruent_accuracy: Some(summary.incongruent_accuracy_pct),
            ..base_payload(record)
        }
    }

    /// Memory rounds count as correct only when recalled perfectly.
    pub fn from_memory(record: &SessionRecord<MemoryTrial>) -> Self {
        base_payload(record)
    }
}

/// Acknowledgement returned by the persistence service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveAck {
    pub message: String,
    pub game_id: u64,
    pub cognitive_score: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Female,
    Male,
}

impl Sex {
    pub fn code(&self) -> u8 {
        match self {
            Sex::Female => 0,
            Sex::Male => 1,
        }
    }
}

/// Demographics the analysis model takes as features
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub age: u32,
    pub sex: Sex,
}

/// Body of the analysis call. Feature names are the model's.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    /// Accuracy as a 0..=1 fraction.
    pub corr_mean: f64,
    pub rt_mean: f64,
    pub age: u32,
    pub sex: u8,
    /// Minutes since local midnight.
    pub timeofday: u32,
    #[serde(rename = "roundTimes")]
    pub round_times: Vec<u64>,
    pub answers: Vec<u8>,
    #[serde(rename = "totalRounds")]
    pub total_rounds: u32,
}

impl AnalysisRequest {
    pub fn from_result<T: Timelike>(
        result: &GameResultPayload,
        participant: &Participant,
        played_at: &T,
    ) -> Self {
        Self {
            corr_mean: result.accuracy / 100.0,
            rt_mean: result.avg_time,
            age: participant.age,
            sex: participant.sex.code(),
            timeofday: played_at.hour() * 60 + played_at.minute(),
            round_times: result.round_times.clone(),
            answers: result.answers.iter().map(|a| u8::from(*a)).collect(),
            total_rounds: result.total_rounds,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalysisComponents {
    pub accuracy: f64,
    pub speed: f64,
    pub consistency: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub cognitive_score: f64,
    pub level: String,
    pub level_color: String,
    pub components: AnalysisComponents,
    /// Model class: 0 good, 1 flagged.
    pub y: u8,
    #[serde(default)]
    pub improvement: Option<f64>,
    #[serde(default)]
    pub feedback: Option<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawAnalysisResponse {
    success: bool,
    #[serde(default)]
    analysis: Option<Analysis>,
    #[serde(default)]
    error: Option<String>,
}

/// Validated reply of the analysis service
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisOutcome {
    Ok(Analysis),
    Err { message: String },
}

impl AnalysisOutcome {
    pub fn from_slice(body: &[u8]) -> Result<Self, ClientError> {
        let raw: RawAnalysisResponse = serde_json::from_slice(body)?;
        match raw {
            RawAnalysisResponse {
                success: true,
                analysis: Some(analysis),
                ..
            } => {
                if analysis.y > 1 {
                    return Err(ClientError::Malformed(format!(
                        "analysis class y={} outside 0|1",
                        analysis.y
                    )));
                }
                Ok(AnalysisOutcome::Ok(analysis))
            }
            RawAnalysisResponse { success: true, .. } => Err(ClientError::Malformed(
                "success without analysis".to_string(),
            )),
            RawAnalysisResponse { error, .. } => Ok(AnalysisOutcome::Err {
                message: error.unwrap_or_else(|| "analysis failed".to_string()),
            }),
        }
    }

    pub fn into_result(self) -> Result<Analysis, ClientError> {
        match self {
            AnalysisOutcome::Ok(analysis) => Ok(analysis),
            AnalysisOutcome::Err { message } => Err(ClientError::Rejected(message)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;
    use kognit_core::{InkColor, StroopStimulus};

    fn stroop_record() -> SessionRecord<StroopTrial> {
        let congruent = StroopStimulus {
            word: InkColor::Red,
            ink: InkColor::Red,
        };
        let incongruent = StroopStimulus {
            word: InkColor::Blue,
            ink: InkColor::Green,
        };
        let mut rec = SessionRecord::new();
        rec.record(StroopTrial::answered(&congruent, InkColor::Red, 100));
        rec.record(StroopTrial::answered(&incongruent, InkColor::Blue, 5000));
        rec.record(StroopTrial::answered(&incongruent, InkColor::Green, 300));
        rec
    }

    #[test]
    fn stroop_payload_shape() {
        let payload = GameResultPayload::from_stroop(&stroop_record());
        assert_eq!(payload.score, 2);
        assert_eq!(payload.total_rounds, 3);
        assert_eq!(payload.avg_time, 200.0);
        assert_eq!(payload.round_times, vec![100, 5000, 300]);
        assert_eq!(payload.answers, vec![true, false, true]);
        assert_eq!(payload.congruent_accuracy, Some(100.0));
        assert_eq!(payload.incongruent_accuracy, Some(50.0));

        let json = serde_json::to_value(&payload).unwrap();
        assert!(json.get("totalRounds").is_some());
        assert!(json.get("roundTimes").is_some());
        assert_eq!(json["trials"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn memory_payload_omits_optional_fields() {
        let seq = kognit_core::DigitSequence(vec![1, 2]);
        let mut rec = SessionRecord::new();
        rec.record(MemoryTrial::recalled(2, &seq, vec![1, 2], 900));
        let json = serde_json::to_value(GameResultPayload::from_memory(&rec)).unwrap();
        assert!(json.get("trials").is_none());
        assert!(json.get("congruentAccuracy").is_none());
        assert_eq!(json["score"], 1);
    }

    #[test]
    fn analysis_request_features() {
        let payload = GameResultPayload::from_stroop(&stroop_record());
        let who = Participant {
            age: 34,
            sex: Sex::Male,
        };
        let at = NaiveTime::from_hms_opt(14, 30, 0).unwrap();
        let req = AnalysisRequest::from_result(&payload, &who, &at);
        assert!((req.corr_mean - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(req.rt_mean, 200.0);
        assert_eq!(req.sex, 1);
        assert_eq!(req.timeofday, 870);
        assert_eq!(req.answers, vec![1, 0, 1]);

        let json = serde_json::to_value(&req).unwrap();
        for key in ["corr_mean", "rt_mean", "timeofday", "roundTimes", "totalRounds"] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
    }

    #[test]
    fn analysis_outcomes() {
        let ok = br#"{"success":true,"analysis":{"cognitiveScore":53.5,"level":"Average",
            "levelColor":"yellow","components":{"accuracy":0.8,"speed":72.0,"consistency":50},
            "y":1,"improvement":0,"feedback":"ok","recommendations":["a"]}}"#;
        match AnalysisOutcome::from_slice(ok).unwrap() {
            AnalysisOutcome::Ok(a) => {
                assert_eq!(a.cognitive_score, 53.5);
                assert_eq!(a.y, 1);
                assert_eq!(a.recommendations, vec!["a".to_string()]);
            }
            other => panic!("unexpected {other:?}"),
        }

        let rejected = br#"{"success":false,"error":"Model failed to load."}"#;
        assert_eq!(
            AnalysisOutcome::from_slice(rejected).unwrap(),
            AnalysisOutcome::Err {
                message: "Model failed to load.".into()
            }
        );

        let hollow = br#"{"success":true}"#;
        assert!(matches!(
            AnalysisOutcome::from_slice(hollow),
            Err(ClientError::Malformed(_))
        ));

        let bad_class = br#"{"success":true,"analysis":{"cognitiveScore":1,"level":"x",
            "levelColor":"x","components":{"accuracy":1,"speed":1,"consistency":1},"y":3}}"#;
        assert!(matches!(
            AnalysisOutcome::from_slice(bad_class),
            Err(ClientError::Malformed(_))
        ));

        assert!(matches!(
            AnalysisOutcome::from_slice(b"<html>"),
            Err(ClientError::Malformed(_))
        ));
    }
}
