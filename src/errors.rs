use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::models::{ErrorKind, ErrorResponse};

/// SessionError
///
/// Failures the session core can observe while talking to the backend. Bootstrap
/// absorbs every one of them into `UNAUTHENTICATED`; only `login` hands them back to
/// its caller.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The call could not complete (transport error, timeout, unexpected status).
    #[error("network failure: {0}")]
    NetworkFailure(String),

    /// No session, or the session is no longer valid.
    #[error("not authenticated")]
    Unauthenticated,

    /// The backend rejected the supplied email/password.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The body did not match the expected shape.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// A role tag outside the closed set. Never treated as an allowed role.
    #[error("unknown role: {0:?}")]
    UnknownRole(String),
}

impl SessionError {
    /// The status the portal shell reports for this failure.
    pub fn status_code(&self) -> StatusCode {
        match self {
            SessionError::Unauthenticated | SessionError::InvalidCredentials => {
                StatusCode::UNAUTHORIZED
            }
            SessionError::NetworkFailure(_)
            | SessionError::MalformedResponse(_)
            | SessionError::UnknownRole(_) => StatusCode::BAD_GATEWAY,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            SessionError::NetworkFailure(_) => ErrorKind::NetworkFailure,
            SessionError::Unauthenticated => ErrorKind::Unauthenticated,
            SessionError::InvalidCredentials => ErrorKind::InvalidCredentials,
            SessionError::MalformedResponse(_) => ErrorKind::MalformedResponse,
            SessionError::UnknownRole(_) => ErrorKind::UnknownRole,
        }
    }
}

impl IntoResponse for SessionError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            kind: self.kind(),
            message: self.to_string(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}

impl From<reqwest::Error> for SessionError {
    fn from(err: reqwest::Error) -> Self {
        SessionError::NetworkFailure(err.to_string())
    }
}
