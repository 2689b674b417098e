//! Ledger Error Types
//!
//! The closed set of outcomes a ledger operation can fail with.
//! Callers match on the variant, never on the message.

use rust_decimal::Decimal;
use thiserror::Error;

use super::account::AccountRef;
use super::amount::AmountError;
use super::bill::BillStatus;

/// Ledger engine errors
///
/// Everything except `TransactionFailed` and `PersistenceFailure` is detected
/// before any mutation is issued.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LedgerError {
    /// Sender or destination does not resolve to a stored account
    #[error("Account not found: {0}")]
    AccountNotFound(AccountRef),

    /// Sender balance (plus fee, where applicable) is below the required amount
    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: Decimal, available: Decimal },

    /// Amount is under the configured minimum threshold
    #[error("Amount {amount} is below the minimum transaction of {minimum}")]
    BelowMinimum { amount: Decimal, minimum: Decimal },

    /// Amount is not a valid positive monetary value
    #[error("Invalid amount: {0}")]
    InvalidAmount(#[from] AmountError),

    /// Split-bill receivers and amounts do not line up
    #[error("Invalid split: {0}")]
    InvalidSplit(String),

    /// Sender and destination are the same account
    #[error("Cannot transfer to the same account")]
    SameAccount,

    /// Pay-bill references an unknown transaction id
    #[error("Bill not found: {0}")]
    BillNotFound(String),

    /// Pay-bill targets a bill that is already paid
    #[error("Bill has already been paid: {0}")]
    BillAlreadyPaid(String),

    /// Pay-bill targets a bill in a terminal state other than paid
    #[error("Bill {transaction_id} cannot be paid in status {status}")]
    BillNotPayable {
        transaction_id: String,
        status: BillStatus,
    },

    /// A failure after mutation began; the unit of work was rolled back
    #[error("Transaction failed")]
    TransactionFailed,

    /// The store could not be read while checking preconditions
    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),
}

impl LedgerError {
    /// Create an insufficient balance error
    pub fn insufficient_balance(required: Decimal, available: Decimal) -> Self {
        Self::InsufficientBalance {
            required,
            available,
        }
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            Self::AccountNotFound(_) => "account_not_found",
            Self::InsufficientBalance { .. } => "insufficient_balance",
            Self::BelowMinimum { .. } => "below_minimum",
            Self::InvalidAmount(_) => "invalid_amount",
            Self::InvalidSplit(_) => "invalid_split",
            Self::SameAccount => "same_account",
            Self::BillNotFound(_) => "bill_not_found",
            Self::BillAlreadyPaid(_) => "bill_already_paid",
            Self::BillNotPayable { .. } => "bill_not_payable",
            Self::TransactionFailed => "transaction_failed",
            Self::PersistenceFailure(_) => "persistence_failure",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_insufficient_balance_error() {
        let err = LedgerError::insufficient_balance(dec!(60000), dec!(50000));

        assert!(err.to_string().contains("60000"));
        assert!(err.to_string().contains("50000"));
        assert_eq!(err.code(), "insufficient_balance");
    }

    #[test]
    fn test_failure_messages_carry_no_cause() {
        assert_eq!(LedgerError::TransactionFailed.to_string(), "Transaction failed");
        assert_eq!(LedgerError::TransactionFailed.code(), "transaction_failed");
        assert_eq!(
            LedgerError::PersistenceFailure("connection reset".to_string()).code(),
            "persistence_failure"
        );
    }

    #[test]
    fn test_amount_error_converts() {
        let err: LedgerError = AmountError::NotPositive(dec!(0)).into();
        assert!(matches!(err, LedgerError::InvalidAmount(AmountError::NotPositive(_))));
        assert_eq!(err.code(), "invalid_amount");
    }
}
