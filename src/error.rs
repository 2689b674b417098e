//! Error handling module
//!
//! Centralized error types and HTTP response conversion.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::domain::LedgerError;

/// Application-wide Result type
pub type AppResult<T> = Result<T, AppError>;

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Client errors (4xx)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    // Ledger errors
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    // Server errors (5xx)
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl AppError {
    /// HTTP status for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Ledger(err) => match err {
                LedgerError::AccountNotFound(_) | LedgerError::BillNotFound(_) => {
                    StatusCode::NOT_FOUND
                }
                LedgerError::InsufficientBalance { .. } => StatusCode::PAYMENT_REQUIRED,
                LedgerError::BelowMinimum { .. }
                | LedgerError::InvalidAmount(_)
                | LedgerError::InvalidSplit(_)
                | LedgerError::SameAccount => StatusCode::BAD_REQUEST,
                LedgerError::BillAlreadyPaid(_) | LedgerError::BillNotPayable { .. } => {
                    StatusCode::CONFLICT
                }
                LedgerError::TransactionFailed | LedgerError::PersistenceFailure(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let (error_code, details) = match &self {
            AppError::InvalidRequest(msg) => ("invalid_request", Some(msg.clone())),

            AppError::Ledger(err) => match err {
                LedgerError::AccountNotFound(account) => (err.code(), Some(account.to_string())),
                LedgerError::BillNotFound(id) | LedgerError::BillAlreadyPaid(id) => {
                    (err.code(), Some(id.clone()))
                }
                // Storage causes stay in the logs
                LedgerError::PersistenceFailure(cause) => {
                    tracing::error!("Persistence failure: {}", cause);
                    (err.code(), None)
                }
                LedgerError::TransactionFailed => (err.code(), None),
                other => (other.code(), Some(other.to_string())),
            },

            AppError::Config(e) => {
                tracing::error!("Config error: {:?}", e);
                ("config_error", None)
            }
        };

        let error = match &self {
            AppError::Ledger(LedgerError::PersistenceFailure(_)) => {
                "Persistence failure".to_string()
            }
            other => other.to_string(),
        };

        let body = ErrorResponse {
            error,
            error_code: error_code.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AccountRef, AmountError, BillStatus};
    use rust_decimal_macros::dec;

    #[test]
    fn test_status_mapping() {
        let cases = vec![
            (LedgerError::AccountNotFound(AccountRef::user("0811")), StatusCode::NOT_FOUND),
            (LedgerError::BillNotFound("TX-1".into()), StatusCode::NOT_FOUND),
            (
                LedgerError::insufficient_balance(dec!(10), dec!(5)),
                StatusCode::PAYMENT_REQUIRED,
            ),
            (
                LedgerError::BelowMinimum {
                    amount: dec!(5),
                    minimum: dec!(10),
                },
                StatusCode::BAD_REQUEST,
            ),
            (LedgerError::InvalidAmount(AmountError::NotPositive(dec!(0))), StatusCode::BAD_REQUEST),
            (LedgerError::InvalidSplit("x".into()), StatusCode::BAD_REQUEST),
            (LedgerError::SameAccount, StatusCode::BAD_REQUEST),
            (LedgerError::BillAlreadyPaid("TX-1".into()), StatusCode::CONFLICT),
            (
                LedgerError::BillNotPayable {
                    transaction_id: "TX-1".into(),
                    status: BillStatus::Failed,
                },
                StatusCode::CONFLICT,
            ),
            (LedgerError::TransactionFailed, StatusCode::INTERNAL_SERVER_ERROR),
            (
                LedgerError::PersistenceFailure("down".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(AppError::from(err.clone()).status_code(), status, "{:?}", err);
        }
    }

    #[test]
    fn test_response_status() {
        let response = AppError::InvalidRequest("bad".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = AppError::from(LedgerError::TransactionFailed).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
