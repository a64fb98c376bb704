use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use rust_decimal::Decimal;
use serde_json::json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LedgerError>;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Contract not found: {0}")]
    ContractNotFound(i64),

    #[error("Job not found: {0}")]
    JobNotFound(i64),

    #[error("Job is already paid: {0}")]
    AlreadyPaid(i64),

    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: Decimal, available: Decimal },

    #[error("Invalid amount: {0}")]
    InvalidAmount(Decimal),

    #[error("Profile is not a client or does not exist: {0}")]
    NotAClient(i64),

    #[error("Deposit of {amount} exceeds the limit of {limit}")]
    DepositLimitExceeded { amount: Decimal, limit: Decimal },

    #[error("Invalid limit: {0}")]
    InvalidLimit(i64),

    #[error("Invalid date range: {0}")]
    InvalidDateRange(String),

    #[error("Unauthorized access")]
    Unauthorized,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ResponseError for LedgerError {
    fn error_response(&self) -> HttpResponse {
        let status_code = self.status_code();
        let error_message = match self {
            // Store details stay in the logs.
            LedgerError::Database(_) | LedgerError::Migration(_) | LedgerError::Internal(_) => {
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        };

        HttpResponse::build(status_code).json(json!({
            "error": {
                "code": status_code.as_u16(),
                "message": error_message,
                "type": self.error_type()
            }
        }))
    }

    fn status_code(&self) -> StatusCode {
        match self {
            LedgerError::ContractNotFound(_) => StatusCode::NOT_FOUND,
            LedgerError::JobNotFound(_) => StatusCode::NOT_FOUND,
            LedgerError::AlreadyPaid(_) => StatusCode::CONFLICT,
            LedgerError::InsufficientBalance { .. } => StatusCode::BAD_REQUEST,
            LedgerError::InvalidAmount(_) => StatusCode::BAD_REQUEST,
            LedgerError::NotAClient(_) => StatusCode::BAD_REQUEST,
            LedgerError::DepositLimitExceeded { .. } => StatusCode::BAD_REQUEST,
            LedgerError::InvalidLimit(_) => StatusCode::BAD_REQUEST,
            LedgerError::InvalidDateRange(_) => StatusCode::BAD_REQUEST,
            LedgerError::Unauthorized => StatusCode::UNAUTHORIZED,
            LedgerError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            LedgerError::Migration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            LedgerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl LedgerError {
    /// Stable machine-readable tag, also used as the rejection metric label.
    pub fn error_type(&self) -> &'static str {
        match self {
            LedgerError::ContractNotFound(_) => "not_found",
            LedgerError::JobNotFound(_) => "not_found",
            LedgerError::AlreadyPaid(_) => "already_paid",
            LedgerError::InsufficientBalance { .. } => "insufficient_balance",
            LedgerError::InvalidAmount(_) => "invalid_amount",
            LedgerError::NotAClient(_) => "not_a_client",
            LedgerError::DepositLimitExceeded { .. } => "deposit_limit_exceeded",
            LedgerError::InvalidLimit(_) => "invalid_limit",
            LedgerError::InvalidDateRange(_) => "invalid_date_range",
            LedgerError::Unauthorized => "unauthorized",
            LedgerError::Database(_) => "store_failure",
            LedgerError::Migration(_) => "store_failure",
            LedgerError::Internal(_) => "internal_error",
        }
    }

    /// True for rejections caused by the request rather than the store.
    pub fn is_domain(&self) -> bool {
        !matches!(
            self,
            LedgerError::Database(_) | LedgerError::Migration(_) | LedgerError::Internal(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_not_found_variants_share_shape() {
        let contract = LedgerError::ContractNotFound(7);
        let job = LedgerError::JobNotFound(7);

        assert_eq!(contract.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(contract.status_code(), job.status_code());
        assert_eq!(contract.error_type(), job.error_type());
    }

    #[test]
    fn test_store_failures_are_not_domain_errors() {
        let err = LedgerError::Database(sqlx::Error::PoolTimedOut);
        assert!(!err.is_domain());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.error_type(), "store_failure");

        let err = LedgerError::DepositLimitExceeded {
            amount: dec!(100.01),
            limit: dec!(100.00),
        };
        assert!(err.is_domain());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }
}
