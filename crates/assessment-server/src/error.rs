//! HTTP error types for the assessment server.
//!
//! Maps [`SessionError`]s into HTTP responses. Every error variant produces
//! a JSON body `{"error": "<message>"}`, the shape the assessment client
//! surfaces verbatim.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::session::SessionError;

/// Application-level error returned from HTTP handlers.
#[derive(Debug)]
pub enum AppError {
    /// Client sent invalid input.
    BadRequest(String),
    /// The session has not passed OTP verification.
    Unauthorized(String),
    /// Requested resource not found.
    NotFound(String),
    /// The resource existed but is no longer usable (expired OTP).
    Gone(String),
    /// Too many failed attempts against one session.
    TooManyRequests(String),
}

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::Gone(msg) => (StatusCode::GONE, msg),
            Self::TooManyRequests(msg) => (StatusCode::TOO_MANY_REQUESTS, msg),
        };

        (status, axum::Json(ErrorBody { error: message })).into_response()
    }
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NotFound => Self::NotFound(err.to_string()),
            SessionError::OtpExpired => Self::Gone(err.to_string()),
            SessionError::NotVerified => Self::Unauthorized(err.to_string()),
            SessionError::TooManyAttempts => Self::TooManyRequests(err.to_string()),
            SessionError::InvalidRegistration(_)
            | SessionError::InvalidOtp
            | SessionError::InvalidStep
            | SessionError::StepLocked
            | SessionError::MissingFields(_) => Self::BadRequest(err.to_string()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    async fn body_of(err: AppError) -> (StatusCode, serde_json::Value) {
        let resp = err.into_response();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), 1024).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn session_errors_map_to_statuses() {
        let (status, body) = body_of(SessionError::NotFound.into()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, serde_json::json!({"error": "Session not found"}));

        let (status, _) = body_of(SessionError::OtpExpired.into()).await;
        assert_eq!(status, StatusCode::GONE);

        let (status, _) = body_of(SessionError::NotVerified.into()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = body_of(SessionError::TooManyAttempts.into()).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["error"], "Too many attempts");

        let (status, body) =
            body_of(SessionError::MissingFields(vec!["a".into(), "b".into()]).into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Missing required fields: a, b");
    }
}
