use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not authenticated")]
    Unauthenticated,

    #[error("administrator role required")]
    Forbidden,

    #[error("user not found")]
    NotFound,

    #[error("{0}")]
    Invalid(String),

    #[error("user with this email already exists")]
    DuplicateEmail,

    /// The analysis collaborator failed or declined.
    #[error("{0}")]
    Analysis(String),
}

impl StoreError {
    pub fn status(&self) -> StatusCode {
        match self {
            StoreError::Unauthenticated => StatusCode::UNAUTHORIZED,
            StoreError::Forbidden => StatusCode::FORBIDDEN,
            StoreError::NotFound => StatusCode::NOT_FOUND,
            StoreError::Invalid(_) | StoreError::DuplicateEmail => StatusCode::BAD_REQUEST,
            StoreError::Analysis(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for StoreError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (self.status(), body).into_response()
    }
}
