//! Account references
//!
//! Every balance-bearing entity is addressed by its kind and a reference
//! code: a phone number for users, a bank number for banks, a merchant code
//! for merchants.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of balance-bearing account
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountKind {
    User,
    Bank,
    Merchant,
}

impl AccountKind {
    /// Storage / wire representation
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountKind::User => "user",
            AccountKind::Bank => "bank",
            AccountKind::Merchant => "merchant",
        }
    }
}

impl fmt::Display for AccountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountKind {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(AccountKind::User),
            "bank" => Ok(AccountKind::Bank),
            "merchant" => Ok(AccountKind::Merchant),
            other => Err(UnknownVariant {
                type_name: "account kind",
                value: other.to_string(),
            }),
        }
    }
}

/// A stored string did not match any variant of a domain enum
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown {type_name}: {value}")]
pub struct UnknownVariant {
    pub type_name: &'static str,
    pub value: String,
}

/// Typed account reference: `(kind, reference)`.
///
/// Ordering is by kind, then reference. Stores lock accounts in this order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AccountRef {
    pub kind: AccountKind,
    pub reference: String,
}

impl AccountRef {
    pub fn new(kind: AccountKind, reference: impl Into<String>) -> Self {
        Self {
            kind,
            reference: reference.into(),
        }
    }

    /// User account addressed by phone number
    pub fn user(phone_number: impl Into<String>) -> Self {
        Self::new(AccountKind::User, phone_number)
    }

    /// Bank account addressed by bank number
    pub fn bank(bank_number: impl Into<String>) -> Self {
        Self::new(AccountKind::Bank, bank_number)
    }

    /// Merchant account addressed by merchant code
    pub fn merchant(merchant_code: impl Into<String>) -> Self {
        Self::new(AccountKind::Merchant, merchant_code)
    }
}

impl fmt::Display for AccountRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.reference)
    }
}
