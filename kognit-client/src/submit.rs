use crate::error::ClientError;
use crate::payload::{Analysis, AnalysisRequest, GameResultPayload, Participant, SaveAck};
use crate::service::{AnalysisService, ResultSink};
use chrono::{DateTime, Local};
use kognit_core::{MemoryTrial, SessionRecord, StroopTrial};
use std::sync::atomic::{AtomicU8, Ordering};
use tracing::{debug, info, warn};
use uuid::Uuid;

const IDLE: u8 = 0;
const IN_FLIGHT: u8 = 1;
const SUBMITTED: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionState {
    Idle,
    InFlight,
    Submitted,
}

/// At-most-once marker carried by a finished session. Claimed before the
/// first network call; released unless persistence succeeds.
#[derive(Debug, Default)]
pub struct SubmissionMarker(AtomicU8);

/// Held while a submission is in flight. Dropping it without
/// [`Claim::persisted`] returns the marker to Idle, so a failed or
/// abandoned attempt can be retried.
struct Claim<'a>(&'a SubmissionMarker);

impl Claim<'_> {
    fn persisted(self) {
        (self.0).0.store(SUBMITTED, Ordering::SeqCst);
    }
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        // no-op once persisted
        let _ = (self.0).0.compare_exchange(IN_FLIGHT, IDLE, Ordering::SeqCst, Ordering::SeqCst);
    }
}

impl SubmissionMarker {
    fn try_claim(&self) -> Option<Claim<'_>> {
        self.0
            .compare_exchange(IDLE, IN_FLIGHT, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Claim(self))
    }

    pub fn state(&self) -> SubmissionState {
        match self.0.load(Ordering::SeqCst) {
            IDLE => SubmissionState::Idle,
            IN_FLIGHT => SubmissionState::InFlight,
            _ => SubmissionState::Submitted,
        }
    }
}

/// A finished session ready to leave the device
#[derive(Debug)]
pub struct CompletedSession {
    pub id: Uuid,
    pub result: GameResultPayload,
    pub analysis: AnalysisRequest,
    marker: SubmissionMarker,
}

impl CompletedSession {
    pub fn new(id: Uuid, result: GameResultPayload, analysis: AnalysisRequest) -> Self {
        Self {
            id,
            result,
            analysis,
            marker: SubmissionMarker::default(),
        }
    }

    pub fn from_stroop(
        record: &SessionRecord<StroopTrial>,
        participant: &Participant,
        played_at: DateTime<Local>,
    ) -> Self {
        let result = GameResultPayload::from_stroop(record);
        let analysis = AnalysisRequest::from_result(&result, participant, &played_at);
        Self::new(record.id, result, analysis)
    }

    pub fn from_memory(
        record: &SessionRecord<MemoryTrial>,
        participant: &Participant,
        played_at: DateTime<Local>,
    ) -> Self {
        let result = GameResultPayload::from_memory(record);
        let analysis = AnalysisRequest::from_result(&result, participant, &played_at);
        Self::new(record.id, result, analysis)
    }

    pub fn submission_state(&self) -> SubmissionState {
        self.marker.state()
    }
}

#[derive(Debug)]
pub struct SubmissionReport {
    pub saved: SaveAck,
    /// Analysis failures do not undo a successful save.
    pub analysis: Result<Analysis, ClientError>,
}

/// Sends finished sessions to its collaborators, each session at most once.
pub struct Submitter<S, A> {
    sink: S,
    analyzer: A,
}

impl<S, A> Submitter<S, A>
where
    S: ResultSink,
    A: AnalysisService,
{
    pub fn new(sink: S, analyzer: A) -> Self {
        Self { sink, analyzer }
    }

    /// Persists the session and requests its analysis.
    ///
    /// Returns `Ok(None)` when the session is already submitted or a
    /// submission is in flight. A persistence error, or dropping the future
    /// before it completes, releases the marker so the caller may retry.
    pub async fn submit(
        &self,
        session: &CompletedSession,
    ) -> Result<Option<SubmissionReport>, ClientError> {
        let Some(claim) = session.marker.try_claim() else {
            debug!(session = %session.id, state = ?session.marker.state(), "duplicate submission ignored");
            return Ok(None);
        };

        let (saved, analysis) = tokio::join!(
            self.sink.save(&session.result),
            self.analyzer.analyze(&session.analysis)
        );
        let analysis = analysis.and_then(|outcome| outcome.into_result());
        if let Err(err) = &analysis {
            warn!(session = %session.id, error = %err, "analysis unavailable");
        }

        match saved {
            Ok(saved) => {
                claim.persisted();
                info!(session = %session.id, game_id = saved.game_id, "session submitted");
                Ok(Some(SubmissionReport { saved, analysis }))
            }
            Err(err) => {
                drop(claim);
                warn!(session = %session.id, error = %err, "session not persisted");
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::{AnalysisComponents, AnalysisOutcome, Sex};
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicUsize};
    use std::time::Duration;

    #[derive(Default)]
    struct CountingSink {
        calls: AtomicUsize,
        fail: AtomicBool,
        slow: AtomicBool,
    }

    #[async_trait]
    impl ResultSink for CountingSink {
        async fn save(&self, _payload: &GameResultPayload) -> Result<SaveAck, ClientError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) as u64;
            let delay = if self.slow.load(Ordering::SeqCst) { 200 } else { 20 };
            tokio::time::sleep(Duration::from_millis(delay)).await;
            if self.fail.load(Ordering::SeqCst) {
                return Err(ClientError::Status {
                    status: 503,
                    message: "down".into(),
                });
            }
            Ok(SaveAck {
                message: "saved".into(),
                game_id: n + 1,
                cognitive_score: 80,
            })
        }
    }

    #[derive(Default)]
    struct FakeAnalyzer {
        calls: AtomicUsize,
        reject: bool,
    }

    #[async_trait]
    impl AnalysisService for FakeAnalyzer {
        async fn analyze(&self, _r: &AnalysisRequest) -> Result<AnalysisOutcome, ClientError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.reject {
                return Ok(AnalysisOutcome::Err {
                    message: "Model failed to load.".into(),
                });
            }
            Ok(AnalysisOutcome::Ok(Analysis {
                cognitive_score: 100.0,
                level: "Excellent".into(),
                level_color: "green".into(),
                components: AnalysisComponents {
                    accuracy: 1.0,
                    speed: 80.0,
                    consistency: 50.0,
                },
                y: 0,
                improvement: None,
                feedback: None,
                recommendations: vec![],
            }))
        }
    }

    fn completed() -> CompletedSession {
        let record = SessionRecord::<StroopTrial>::new();
        let who = Participant {
            age: 30,
            sex: Sex::Female,
        };
        CompletedSession::from_stroop(&record, &who, Local::now())
    }

    #[tokio::test]
    async fn concurrent_triggers_persist_once() {
        let sink = Arc::new(CountingSink::default());
        let analyzer = Arc::new(FakeAnalyzer::default());
        let submitter = Submitter::new(sink.clone(), analyzer.clone());
        let session = completed();

        let (a, b) = tokio::join!(submitter.submit(&session), submitter.submit(&session));
        let reports: Vec<_> = [a.unwrap(), b.unwrap()].into_iter().flatten().collect();
        assert_eq!(reports.len(), 1);
        assert_eq!(sink.calls.load(Ordering::SeqCst), 1);
        assert_eq!(analyzer.calls.load(Ordering::SeqCst), 1);
        assert_eq!(session.submission_state(), SubmissionState::Submitted);

        assert!(submitter.submit(&session).await.unwrap().is_none());
        assert_eq!(sink.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_save_allows_retry() {
        let sink = Arc::new(CountingSink::default());
        sink.fail.store(true, Ordering::SeqCst);
        let submitter = Submitter::new(sink.clone(), FakeAnalyzer::default());
        let session = completed();

        let err = submitter.submit(&session).await.unwrap_err();
        assert!(matches!(err, ClientError::Status { status: 503, .. }));
        assert_eq!(session.submission_state(), SubmissionState::Idle);

        sink.fail.store(false, Ordering::SeqCst);
        let report = submitter.submit(&session).await.unwrap().unwrap();
        assert_eq!(report.saved.game_id, 2);
        assert_eq!(sink.calls.load(Ordering::SeqCst), 2);
        assert_eq!(session.submission_state(), SubmissionState::Submitted);
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_submit_can_be_retried() {
        let sink = Arc::new(CountingSink::default());
        sink.slow.store(true, Ordering::SeqCst);
        let submitter = Submitter::new(sink.clone(), FakeAnalyzer::default());
        let session = completed();

        let attempt = tokio::time::timeout(Duration::from_millis(10), submitter.submit(&session)).await;
        assert!(attempt.is_err());
        assert_eq!(session.submission_state(), SubmissionState::Idle);

        sink.slow.store(false, Ordering::SeqCst);
        let report = submitter.submit(&session).await.unwrap().unwrap();
        assert_eq!(report.saved.game_id, 2);
        assert_eq!(sink.calls.load(Ordering::SeqCst), 2);
        assert_eq!(session.submission_state(), SubmissionState::Submitted);
    }

    #[tokio::test]
    async fn rejected_analysis_is_not_fatal() {
        let analyzer = FakeAnalyzer {
            reject: true,
            ..FakeAnalyzer::default()
        };
        let submitter = Submitter::new(CountingSink::default(), analyzer);
        let session = completed();
        let report = submitter.submit(&session).await.unwrap().unwrap();
        assert!(matches!(report.analysis, Err(ClientError::Rejected(_))));
        assert_eq!(session.submission_state(), SubmissionState::Submitted);
    }
}
