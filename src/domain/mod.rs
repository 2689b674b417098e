//! Domain module
//!
//! Core domain types and business rules.

pub mod account;
pub mod amount;
pub mod bill;
pub mod error;
pub mod policy;

pub use account::{AccountKind, AccountRef, UnknownVariant};
pub use amount::{Amount, AmountError, Balance};
pub use bill::{new_transaction_id, BillRecord, BillStatus, HistoryFilter, NewBill, OperationType};
pub use error::LedgerError;
pub use policy::{Policy, PolicyConfig};
