use axum::{http::StatusCode, response::IntoResponse, Json};
use thiserror::Error;

use crate::types::ErrorBody;

/// User-facing message for any request that fails the pair/timeframe check.
pub const INVALID_INPUT_MESSAGE: &str = "Dados de entrada inválidos";

/// User-facing message for storage and unexpected failures.
pub const INTERNAL_ERROR_MESSAGE: &str = "Erro interno ao gerar sinal";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let body = match &self {
            AppError::Validation(_) => ErrorBody {
                message: INVALID_INPUT_MESSAGE.to_string(),
                details: None,
            },
            _ => ErrorBody {
                message: INTERNAL_ERROR_MESSAGE.to_string(),
                details: Some(self.to_string()),
            },
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_maps_to_bad_request() {
        let err = AppError::Validation("missing field `pair`".to_string());
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn storage_and_unexpected_map_to_internal() {
        let storage = AppError::Storage(sqlx::Error::RowNotFound);
        assert_eq!(storage.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let unexpected = AppError::Internal("boom".to_string());
        assert_eq!(unexpected.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
