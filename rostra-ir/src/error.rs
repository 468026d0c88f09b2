//! Error types for rostra-ir
//!
//! Maps the core error taxonomy (parse, validation, submission, review)
//! onto HTTP responses with enough structured detail for the caller to
//! decide whether to retry, resume, or abandon.

use crate::services::{ParseError, ReviewError, SubmissionError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Missing or malformed operator identity headers (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Malformed CSV upload
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Batch submission failure
    #[error(transparent)]
    Submission(#[from] SubmissionError),

    /// Review workflow failure
    #[error(transparent)]
    Review(#[from] ReviewError),

    /// rostra-common error
    #[error("Common error: {0}")]
    Common(#[from] rostra_common::Error),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    fn parts(self) -> (StatusCode, &'static str, String, Option<Value>) {
        match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg, None),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg, None),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg, None),

            ApiError::Parse(err) => (
                StatusCode::BAD_REQUEST,
                "PARSE_ERROR",
                err.to_string(),
                None,
            ),

            ApiError::Submission(err) => {
                let message = err.to_string();
                match err {
                    SubmissionError::Invalid(_) => {
                        (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message, None)
                    }
                    SubmissionError::NotFound(_) => {
                        (StatusCode::NOT_FOUND, "NOT_FOUND", message, None)
                    }
                    SubmissionError::NotResumable { batch_id, state } => (
                        StatusCode::CONFLICT,
                        "NOT_RESUMABLE",
                        message,
                        Some(json!({ "batch_id": batch_id, "ingest_state": state })),
                    ),
                    SubmissionError::RowCountMismatch {
                        batch_id,
                        supplied,
                        declared,
                    } => (
                        StatusCode::BAD_REQUEST,
                        "ROW_COUNT_MISMATCH",
                        message,
                        Some(json!({
                            "batch_id": batch_id,
                            "supplied": supplied,
                            "declared": declared,
                        })),
                    ),
                    SubmissionError::ChunkFailed {
                        batch_id,
                        chunk_index,
                        total_chunks,
                        chunks_committed,
                        rows_written,
                        ..
                    } => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "CHUNK_FAILED",
                        message,
                        Some(json!({
                            "batch_id": batch_id,
                            "chunk_index": chunk_index,
                            "total_chunks": total_chunks,
                            "chunks_committed": chunks_committed,
                            "rows_written": rows_written,
                        })),
                    ),
                    SubmissionError::BatchCreate { .. } | SubmissionError::Finalize { .. } => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "SUBMISSION_FAILED",
                        message,
                        None,
                    ),
                }
            }

            ApiError::Review(err) => {
                let message = err.to_string();
                match err {
                    ReviewError::CommentRequired => {
                        (StatusCode::BAD_REQUEST, "COMMENT_REQUIRED", message, None)
                    }
                    ReviewError::NotFound { .. } => {
                        (StatusCode::NOT_FOUND, "NOT_FOUND", message, None)
                    }
                    ReviewError::Conflict {
                        current,
                        last_decision,
                        ..
                    } => (
                        StatusCode::CONFLICT,
                        "CONFLICT",
                        message,
                        Some(json!({
                            "current_status": current,
                            "last_decision": last_decision,
                        })),
                    ),
                    ReviewError::Store { .. } | ReviewError::EntryWrite { .. } => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "REVIEW_LOG_FAILED",
                        message,
                        None,
                    ),
                    ReviewError::DecisionLoggedStatusUnchanged { entry_id, .. } => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "DECISION_LOGGED_STATUS_UNCHANGED",
                        message,
                        Some(json!({ "entry_id": entry_id })),
                    ),
                }
            }

            ApiError::Common(err) => match err {
                rostra_common::Error::NotFound(msg) => {
                    (StatusCode::NOT_FOUND, "NOT_FOUND", msg, None)
                }
                rostra_common::Error::InvalidInput(msg) => {
                    (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg, None)
                }
                other => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    other.to_string(),
                    None,
                ),
            },

            ApiError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg, None)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message, detail) = self.parts();

        let mut error = json!({
            "code": error_code,
            "message": message,
        });
        if let Some(detail) = detail {
            error["detail"] = detail;
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
