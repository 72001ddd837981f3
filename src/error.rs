/*
 * Responsibility
 * - the application-wide AppError
 * - IntoResponse: HTTP status + the error envelope
 * - one place that turns repo / validation / auth failures into responses
 */
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::domain::order::TransitionError;
use crate::domain::ownership::OwnershipError;
use crate::domain::validation::ValidationError;
use crate::repos::error::RepoError;
use crate::services::auth::{PasswordError, TokenError};
use crate::services::id_codec::IdCodecError;

pub const MISSING_TOKEN: &str = "Access denied. No token provided.";
pub const EXPIRED_TOKEN: &str = "Token has expired";
pub const INVALID_TOKEN: &str = "Invalid token";

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub status: &'static str,
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{message}")]
    BadRequest { code: &'static str, message: String },
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{resource} not found")]
    NotFound { resource: &'static str },
    #[error("{0}")]
    Conflict(String),
    #[error("Request body is too large")]
    PayloadTooLarge,
    #[error("request timed out")]
    Timeout,
    #[error("internal server error")]
    Internal,
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self::BadRequest {
            code,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::bad_request("VALIDATION_ERROR", message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn not_found(resource: &'static str) -> Self {
        Self::NotFound { resource }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Timeout => StatusCode::REQUEST_TIMEOUT,
            AppError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            AppError::BadRequest { code, .. } => *code,
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::NotFound { .. } => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
            AppError::Timeout => "TIMEOUT",
            AppError::Internal => "INTERNAL_SERVER_ERROR",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            status: "error",
            code: self.code(),
            message: self.to_string(),
        };

        (self.status(), Json(body)).into_response()
    }
}

impl From<RepoError> for AppError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::Conflict { .. } => AppError::bad_request("DUPLICATE", e.to_string()),
            RepoError::InUse => AppError::conflict("Record is still referenced by other records"),
            RepoError::OutOfStock { .. } => AppError::validation("Insufficient quantity"),
            RepoError::Db(_) | RepoError::Corrupt(_) => {
                error!(error = ?e, "repository failure");
                AppError::Internal
            }
        }
    }
}

impl From<ValidationError> for AppError {
    fn from(e: ValidationError) -> Self {
        AppError::validation(e.to_string())
    }
}

impl From<OwnershipError> for AppError {
    fn from(e: OwnershipError) -> Self {
        AppError::Forbidden(e.to_string())
    }
}

impl From<TransitionError> for AppError {
    fn from(e: TransitionError) -> Self {
        AppError::bad_request("INVALID_TRANSITION", e.to_string())
    }
}

impl From<TokenError> for AppError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Expired => AppError::unauthorized(EXPIRED_TOKEN),
            TokenError::Invalid => AppError::unauthorized(INVALID_TOKEN),
            TokenError::MissingSecret | TokenError::Signing(_) => {
                error!(error = ?e, "token service failure");
                AppError::Internal
            }
        }
    }
}

impl From<PasswordError> for AppError {
    fn from(e: PasswordError) -> Self {
        error!(error = ?e, "password hashing failure");
        AppError::Internal
    }
}

impl From<IdCodecError> for AppError {
    fn from(e: IdCodecError) -> Self {
        match e {
            // Client supplied a malformed public id
            IdCodecError::DecodeInvalidFormat | IdCodecError::DecodeOutOfRange => {
                AppError::bad_request("INVALID_PUBLIC_ID", "Invalid ID")
            }
            _ => {
                error!(error = %e, "id codec failure");
                AppError::Internal
            }
        }
    }
}
