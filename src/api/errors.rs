//! API error handling
//!
//! Structured error responses with proper HTTP status codes and request
//! tracking. Game errors map onto the HTTP taxonomy here; handlers never
//! build status codes by hand.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::GameError;

/// Top-level API error response with request tracking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub request_id: String,
    pub error: ErrorBody,
}

/// Error body with structured information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Error code (BAD_REQUEST, UNAUTHORIZED, CONFLICT, INTERNAL_ERROR)
    pub code: String,
    /// Human-readable error message
    pub message: String,
}

/// API error with the originating request's ID attached
#[derive(Debug)]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub request_id: String,
}

#[derive(Debug)]
pub enum ApiErrorKind {
    BadRequest(String),
    Unauthorized(String),
    Conflict(String),
    InternalError(String),
}

impl ApiError {
    pub fn bad_request(request_id: String, message: String) -> Self {
        Self {
            kind: ApiErrorKind::BadRequest(message),
            request_id,
        }
    }

    pub fn unauthorized(request_id: String, message: String) -> Self {
        Self {
            kind: ApiErrorKind::Unauthorized(message),
            request_id,
        }
    }

    pub fn conflict(request_id: String, message: String) -> Self {
        Self {
            kind: ApiErrorKind::Conflict(message),
            request_id,
        }
    }

    pub fn internal_error(request_id: String, message: String) -> Self {
        Self {
            kind: ApiErrorKind::InternalError(message),
            request_id,
        }
    }

    /// Map a game error onto the HTTP taxonomy.
    pub fn from_game(request_id: String, err: GameError) -> Self {
        match err {
            GameError::Validation(msg) => Self::bad_request(request_id, msg),
            GameError::Auth(msg) => Self::unauthorized(request_id, msg),
            GameError::StateConflict(conflict) => Self::conflict(request_id, conflict.to_string()),
            GameError::Persistence(msg) => Self::internal_error(request_id, msg),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ApiErrorKind::BadRequest(msg) => write!(f, "[{}] Bad Request: {}", self.request_id, msg),
            ApiErrorKind::Unauthorized(msg) => {
                write!(f, "[{}] Unauthorized: {}", self.request_id, msg)
            }
            ApiErrorKind::Conflict(msg) => write!(f, "[{}] Conflict: {}", self.request_id, msg),
            ApiErrorKind::InternalError(msg) => {
                write!(f, "[{}] Internal Error: {}", self.request_id, msg)
            }
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self.kind {
            ApiErrorKind::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiErrorKind::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg),
            ApiErrorKind::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            ApiErrorKind::InternalError(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg)
            }
        };

        let body = Json(ErrorResponse {
            request_id: self.request_id,
            error: ErrorBody {
                code: code.to_string(),
                message,
            },
        });

        (status, body).into_response()
    }
}
