//! easycash ledger library
//!
//! Re-exports modules for integration testing and external use.

pub mod api;
pub mod domain;
pub mod ledger;
pub mod store;

pub mod config;
pub mod db;
mod error;

pub use config::Config;
pub use error::{AppError, AppResult, ErrorResponse};
pub use domain::{AccountKind, AccountRef, Amount, AmountError, Balance, LedgerError, Policy};
pub use ledger::LedgerEngine;
