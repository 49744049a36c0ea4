use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Failures surfaced by the account and credential services.
///
/// `NotFound` means a referenced entity is absent, `BadRequest` means the
/// references resolved but a business rule rejected the input, and
/// `IllegalArgument` means the input was malformed before any lookup.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    IllegalArgument(String),

    #[error("One-time code is invalid or expired")]
    Unverified,

    #[error("{0}")]
    Unauthorized(String),

    #[error("Storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn not_found(reason: impl Into<String>) -> Self {
        Self::NotFound(reason.into())
    }

    pub fn bad_request(reason: impl Into<String>) -> Self {
        Self::BadRequest(reason.into())
    }

    pub fn illegal_argument(reason: impl Into<String>) -> Self {
        Self::IllegalArgument(reason.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) | Self::IllegalArgument(_) => StatusCode::BAD_REQUEST,
            Self::Unverified | Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub status: String,
    pub reason: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let reason = match &self {
            // Do not leak storage details to clients.
            Self::Storage(err) => {
                tracing::error!(error = %err, "storage failure");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        (
            status,
            Json(ErrorBody {
                status: "ERROR".to_string(),
                reason,
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(AppError::not_found("Account not found").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::bad_request("PIN is wrong").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::illegal_argument("Invalid transaction type provided: x").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::Unverified.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AppError::from(anyhow::anyhow!("disk full")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_display_is_the_reason() {
        assert_eq!(AppError::bad_request("Invalid payment type").to_string(), "Invalid payment type");
    }
}
