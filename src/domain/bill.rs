//! Bill records
//!
//! A bill record is the log entry of one money movement. It is created by
//! the ledger engine inside the same unit of work as the balance changes it
//! describes, and is never physically deleted.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::account::{AccountKind, AccountRef, UnknownVariant};
use super::amount::Amount;

/// Kind of money movement a bill records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    TopUp,
    MerchantPayment,
    BankWithdrawal,
    UserTransfer,
    SplitShare,
}

impl OperationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::TopUp => "top_up",
            OperationType::MerchantPayment => "merchant_payment",
            OperationType::BankWithdrawal => "bank_withdrawal",
            OperationType::UserTransfer => "user_transfer",
            OperationType::SplitShare => "split_share",
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "top_up" => Ok(OperationType::TopUp),
            "merchant_payment" => Ok(OperationType::MerchantPayment),
            "bank_withdrawal" => Ok(OperationType::BankWithdrawal),
            "user_transfer" => Ok(OperationType::UserTransfer),
            "split_share" => Ok(OperationType::SplitShare),
            other => Err(UnknownVariant {
                type_name: "operation type",
                value: other.to_string(),
            }),
        }
    }
}

/// Bill settlement status
///
/// `Created` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillStatus {
    Created,
    Paid,
    Failed,
}

impl BillStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillStatus::Created => "created",
            BillStatus::Paid => "paid",
            BillStatus::Failed => "failed",
        }
    }

    /// Status only moves forward out of `Created`
    pub fn can_transition_to(&self, next: BillStatus) -> bool {
        matches!(
            (self, next),
            (BillStatus::Created, BillStatus::Paid) | (BillStatus::Created, BillStatus::Failed)
        )
    }
}

impl fmt::Display for BillStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BillStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(BillStatus::Created),
            "paid" => Ok(BillStatus::Paid),
            "failed" => Ok(BillStatus::Failed),
            other => Err(UnknownVariant {
                type_name: "bill status",
                value: other.to_string(),
            }),
        }
    }
}

/// Generate an external transaction reference: `TX-` followed by 32 hex digits
pub fn new_transaction_id() -> String {
    format!("TX-{}", Uuid::new_v4().simple()).to_uppercase()
}

/// Insert payload for a bill record (everything but the store-assigned id)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewBill {
    pub transaction_id: String,
    pub sender: AccountRef,
    pub operation: OperationType,
    pub amount: Amount,
    pub date: DateTime<Utc>,
    pub destination: AccountRef,
    pub status: BillStatus,
}

impl NewBill {
    pub fn new(
        transaction_id: String,
        sender: AccountRef,
        operation: OperationType,
        amount: Amount,
        destination: AccountRef,
        status: BillStatus,
    ) -> Self {
        Self {
            transaction_id,
            sender,
            operation,
            amount,
            date: Utc::now(),
            destination,
            status,
        }
    }

    /// Attach the store-assigned id
    pub fn into_record(self, id: i64) -> BillRecord {
        BillRecord {
            id,
            transaction_id: self.transaction_id,
            sender: self.sender,
            operation: self.operation,
            amount: self.amount.value(),
            date: self.date,
            destination: self.destination,
            status: self.status,
        }
    }
}

/// Stored bill record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillRecord {
    pub id: i64,
    pub transaction_id: String,
    pub sender: AccountRef,
    pub operation: OperationType,
    pub amount: Decimal,
    pub date: DateTime<Utc>,
    pub destination: AccountRef,
    pub status: BillStatus,
}

impl BillRecord {
    /// Whether `account` is either side of this bill
    pub fn involves(&self, account: &AccountRef) -> bool {
        &self.sender == account || &self.destination == account
    }

    /// The party on the other side from `account`
    pub fn counterparty_of(&self, account: &AccountRef) -> &AccountRef {
        if &self.sender == account {
            &self.destination
        } else {
            &self.sender
        }
    }
}

/// Optional filters for an account's bill history
///
/// Amount bounds are exclusive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryFilter {
    pub operation: Option<OperationType>,
    pub counterparty_kind: Option<AccountKind>,
    pub more_than: Option<Decimal>,
    pub less_than: Option<Decimal>,
}

impl HistoryFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_operation(mut self, operation: OperationType) -> Self {
        self.operation = Some(operation);
        self
    }

    pub fn with_counterparty_kind(mut self, kind: AccountKind) -> Self {
        self.counterparty_kind = Some(kind);
        self
    }

    pub fn with_amount_between(mut self, more_than: Decimal, less_than: Decimal) -> Self {
        self.more_than = Some(more_than);
        self.less_than = Some(less_than);
        self
    }

    /// Evaluate the filter against a bill already known to involve `account`
    pub fn matches(&self, account: &AccountRef, bill: &BillRecord) -> bool {
        if let Some(operation) = self.operation {
            if bill.operation != operation {
                return false;
            }
        }
        if let Some(kind) = self.counterparty_kind {
            if bill.counterparty_of(account).kind != kind {
                return false;
            }
        }
        if let Some(floor) = self.more_than {
            if bill.amount <= floor {
                return false;
            }
        }
        if let Some(ceiling) = self.less_than {
            if bill.amount >= ceiling {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn record(operation: OperationType, amount: Decimal) -> BillRecord {
        NewBill::new(
            new_transaction_id(),
            AccountRef::user("0811"),
            operation,
            Amount::new(amount).unwrap(),
            AccountRef::merchant("M-01"),
            BillStatus::Paid,
        )
        .into_record(1)
    }

    #[test]
    fn test_status_transitions_only_forward() {
        assert!(BillStatus::Created.can_transition_to(BillStatus::Paid));
        assert!(BillStatus::Created.can_transition_to(BillStatus::Failed));
        assert!(!BillStatus::Paid.can_transition_to(BillStatus::Created));
        assert!(!BillStatus::Paid.can_transition_to(BillStatus::Paid));
        assert!(!BillStatus::Failed.can_transition_to(BillStatus::Paid));
    }

    #[test]
    fn test_enum_storage_strings() {
        assert_eq!("split_share".parse::<OperationType>().unwrap(), OperationType::SplitShare);
        assert_eq!("paid".parse::<BillStatus>().unwrap(), BillStatus::Paid);
        assert!("settled".parse::<BillStatus>().is_err());
    }

    #[test]
    fn test_transaction_id_format() {
        let id = new_transaction_id();
        assert!(id.starts_with("TX-"));
        assert_eq!(id.len(), 35);
        assert_ne!(id, new_transaction_id());
    }

    #[test]
    fn test_history_filter_amount_bounds_are_exclusive() {
        let account = AccountRef::user("0811");
        let bill = record(OperationType::MerchantPayment, dec!(10000));

        let inside = HistoryFilter::new().with_amount_between(dec!(9999), dec!(10001));
        let at_floor = HistoryFilter::new().with_amount_between(dec!(10000), dec!(20000));

        assert!(inside.matches(&account, &bill));
        assert!(!at_floor.matches(&account, &bill));
    }

    #[test]
    fn test_history_filter_by_operation_and_counterparty() {
        let account = AccountRef::user("0811");
        let bill = record(OperationType::MerchantPayment, dec!(10000));

        assert!(HistoryFilter::new()
            .with_operation(OperationType::MerchantPayment)
            .with_counterparty_kind(AccountKind::Merchant)
            .matches(&account, &bill));
        assert!(!HistoryFilter::new()
            .with_operation(OperationType::TopUp)
            .matches(&account, &bill));
        assert!(!HistoryFilter::new()
            .with_counterparty_kind(AccountKind::Bank)
            .matches(&account, &bill));
    }
}
