//! Command definitions
//!
//! Commands carry plain account references and amounts into the ledger
//! engine. Each operation decides which account kind a reference names.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{AccountRef, BillRecord, BillStatus, OperationType};

// =========================================================================
// TransferCommand
// =========================================================================

/// Command for the four immediately-settled movements
/// (merchant payment, bank withdrawal, user transfer, bank top-up)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferCommand {
    /// Reference of the debited account
    pub sender: String,
    /// Reference of the credited account
    pub destination: String,
    /// Requested amount, before any admin fee
    pub amount: Decimal,
    /// Caller-assigned transaction id; generated when absent
    pub transaction_id: Option<String>,
}

impl TransferCommand {
    pub fn new(sender: impl Into<String>, destination: impl Into<String>, amount: Decimal) -> Self {
        Self {
            sender: sender.into(),
            destination: destination.into(),
            amount,
            transaction_id: None,
        }
    }

    pub fn with_transaction_id(mut self, transaction_id: impl Into<String>) -> Self {
        self.transaction_id = Some(transaction_id.into());
        self
    }
}

// =========================================================================
// SplitBillCommand
// =========================================================================

/// Command to split a bill among several users.
///
/// `receivers[i]` owes `amounts[i]` to the sender.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitBillCommand {
    pub sender: String,
    pub receivers: Vec<String>,
    pub amounts: Vec<Decimal>,
}

impl SplitBillCommand {
    pub fn new(sender: impl Into<String>, receivers: Vec<String>, amounts: Vec<Decimal>) -> Self {
        Self {
            sender: sender.into(),
            receivers,
            amounts,
        }
    }
}

// =========================================================================
// PayBillCommand
// =========================================================================

/// Command to settle an outstanding bill
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayBillCommand {
    /// Phone number of the user the bill is addressed to
    pub payer: String,
    pub transaction_id: String,
}

impl PayBillCommand {
    pub fn new(payer: impl Into<String>, transaction_id: impl Into<String>) -> Self {
        Self {
            payer: payer.into(),
            transaction_id: transaction_id.into(),
        }
    }
}

/// Result of a successful money movement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
    pub transaction_id: String,
    pub operation: OperationType,
    pub sender: AccountRef,
    pub destination: AccountRef,
    /// Amount recorded on the bill
    pub amount: Decimal,
    /// Amount taken from the sender
    pub debited: Decimal,
    /// Amount given to the destination
    pub credited: Decimal,
    pub status: BillStatus,
}

/// Result of a successful split
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitBillReceipt {
    pub sender: AccountRef,
    pub total: Decimal,
    pub shares: Vec<BillRecord>,
}

impl SplitBillReceipt {
    pub fn transaction_ids(&self) -> Vec<&str> {
        self.shares
            .iter()
            .map(|share| share.transaction_id.as_str())
            .collect()
    }
}
