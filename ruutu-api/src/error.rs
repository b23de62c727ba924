//! Error types for the highscore service and client.

use axum::{http::StatusCode, Json};
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};

/// Failure while reading or writing highscores, remotely or locally.
#[derive(Debug, Display, Error)]
pub enum PersistenceError {
    #[display("highscore request failed: {_0}")]
    Http(reqwest::Error),
    #[display("malformed highscore response: {reason}")]
    Malformed {
        #[error(not(source))]
        reason: String,
    },
    #[display("highscore file: {_0}")]
    Io(std::io::Error),
    #[display("highscore JSON: {_0}")]
    Json(serde_json::Error),
    #[display("highscore database: {_0}")]
    Store(rusqlite::Error),
}

impl PersistenceError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed {
            reason: reason.into(),
        }
    }
}

impl From<reqwest::Error> for PersistenceError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err)
    }
}

impl From<std::io::Error> for PersistenceError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<serde_json::Error> for PersistenceError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err)
    }
}

impl From<rusqlite::Error> for PersistenceError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Store(err)
    }
}

/// Body of every non-2xx response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorModel {
    pub error: String,
}

/// Request-level failure, rendered as `{"error": ...}`.
#[derive(Debug, Display, Error)]
pub enum ApiError {
    #[display("invalid payload")]
    InvalidPayload,
    #[display("score mismatch")]
    ScoreMismatch,
    /// Details stay in the log.
    #[display("storage failure")]
    Storage(PersistenceError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidPayload | ApiError::ScoreMismatch => StatusCode::BAD_REQUEST,
            ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<PersistenceError> for ApiError {
    fn from(err: PersistenceError) -> Self {
        ApiError::Storage(err)
    }
}

impl From<ApiError> for (StatusCode, Json<ErrorModel>) {
    fn from(err: ApiError) -> Self {
        (
            err.status(),
            Json(ErrorModel {
                error: err.to_string(),
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors_are_bad_request() {
        assert_eq!(ApiError::InvalidPayload.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::ScoreMismatch.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_storage_details_not_exposed() {
        let err = ApiError::from(PersistenceError::malformed("disk on fire"));
        let (status, Json(body)) = <(StatusCode, Json<ErrorModel>)>::from(err);
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error, "storage failure");
    }
}
