use crate::error::ClientError;
use crate::payload::{AnalysisOutcome, AnalysisRequest, GameResultPayload, SaveAck};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Header carrying the caller's user id to the persistence service.
pub const USER_HEADER: &str = "x-user-id";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Stores finished sessions
#[async_trait]
pub trait ResultSink: Send + Sync {
    async fn save(&self, payload: &GameResultPayload) -> Result<SaveAck, ClientError>;
}

/// Produces an external analysis of a finished session
#[async_trait]
pub trait AnalysisService: Send + Sync {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisOutcome, ClientError>;
}

#[async_trait]
impl<T: ResultSink + ?Sized> ResultSink for Arc<T> {
    async fn save(&self, payload: &GameResultPayload) -> Result<SaveAck, ClientError> {
        (**self).save(payload).await
    }
}

#[async_trait]
impl<T: AnalysisService + ?Sized> AnalysisService for Arc<T> {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisOutcome, ClientError> {
        (**self).analyze(request).await
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

fn status_error(status: reqwest::StatusCode, body: &[u8]) -> ClientError {
    let message = serde_json::from_slice::<ErrorBody>(body)
        .map(|b| b.error)
        .unwrap_or_else(|_| String::from_utf8_lossy(body).into_owned());
    ClientError::Status {
        status: status.as_u16(),
        message,
    }
}

fn build_client() -> Result<reqwest::Client, ClientError> {
    Ok(reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?)
}

/// Persistence over HTTP: `POST {base}/api/game/result`
#[derive(Debug, Clone)]
pub struct HttpResultSink {
    client: reqwest::Client,
    base_url: String,
    user_id: u64,
}

impl HttpResultSink {
    pub fn new(base_url: impl Into<String>, user_id: u64) -> Result<Self, ClientError> {
        Ok(Self::with_client(build_client()?, base_url, user_id))
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>, user_id: u64) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            user_id,
        }
    }
}

#[async_trait]
impl ResultSink for HttpResultSink {
    async fn save(&self, payload: &GameResultPayload) -> Result<SaveAck, ClientError> {
        let url = format!("{}/api/game/result", self.base_url);
        debug!(%url, rounds = payload.total_rounds, "saving game result");
        let response = self
            .client
            .post(&url)
            .header(USER_HEADER, self.user_id.to_string())
            .json(payload)
            .send()
            .await?;
        let status = response.status();
        let body = response.bytes().await?;
        if !status.is_success() {
            return Err(status_error(status, &body));
        }
        Ok(serde_json::from_slice(&body)?)
    }
}

/// Analysis over HTTP. `endpoint` is the full URL, e.g. the AI service's
/// `/api/analyze` or the persistence service's `/api/ai/analyze` proxy.
#[derive(Debug, Clone)]
pub struct HttpAnalysisService {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpAnalysisService {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, ClientError> {
        Ok(Self::with_client(build_client()?, endpoint))
    }

    pub fn with_client(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl AnalysisService for HttpAnalysisService {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisOutcome, ClientError> {
        debug!(endpoint = %self.endpoint, "requesting analysis");
        let response = self.client.post(&self.endpoint).json(request).send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        // The service reports its own failures as `{success: false, error}`,
        // usually with a 500; only fall back to the status when that shape is absent.
        match AnalysisOutcome::from_slice(&body) {
            Ok(outcome) => Ok(outcome),
            Err(_) if !status.is_success() => Err(status_error(status, &body)),
            Err(err) => Err(err),
        }
    }
}
