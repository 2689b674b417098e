//! Ledger module
//!
//! The transaction engine. Each operation runs inside a single unit of work
//! obtained from a `LedgerStore`, so balances and bill records change
//! together or not at all.

mod commands;
mod engine;


pub use commands::*;
pub use engine::LedgerEngine;
