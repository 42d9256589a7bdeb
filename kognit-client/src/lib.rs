pub mod error;
pub mod payload;
pub mod service;
pub mod submit;

pub use error::ClientError;
pub use payload::{
    Analysis, AnalysisComponents, AnalysisOutcome, AnalysisRequest, GameResultPayload,
    Participant, SaveAck, Sex,
};
pub use service::{AnalysisService, HttpAnalysisService, HttpResultSink, ResultSink, USER_HEADER};
pub use submit::{CompletedSession, SubmissionReport, SubmissionState, Submitter};
