//! Transaction Policy
//!
//! Pure business rules applied before the ledger touches the store:
//! the minimum transaction threshold and the flat admin fees charged on
//! top-ups and withdrawals.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

use super::amount::Amount;
use super::error::LedgerError;

/// Raw policy values as loaded from configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Smallest amount any ledger operation accepts
    pub minimum_transaction: Decimal,
    /// Flat fee subtracted from the credited side of a top-up
    pub top_up_fee: Decimal,
    /// Flat fee added to the debited side of a withdrawal
    pub withdrawal_fee: Decimal,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            minimum_transaction: Decimal::from(10_000),
            top_up_fee: Decimal::from(1_000),
            withdrawal_fee: Decimal::from(2_500),
        }
    }
}

/// Validated transaction policy
#[derive(Debug, Clone, PartialEq)]
pub struct Policy {
    minimum_transaction: Decimal,
    top_up_fee: Decimal,
    withdrawal_fee: Decimal,
}

impl Policy {
    pub fn new(config: PolicyConfig) -> Result<Self, ConfigError> {
        if config.minimum_transaction <= Decimal::ZERO {
            return Err(ConfigError::InvalidValue("MINIMUM_TRANSACTION"));
        }
        if config.top_up_fee < Decimal::ZERO {
            return Err(ConfigError::InvalidValue("ADMIN_FEE_TOPUP"));
        }
        if config.withdrawal_fee < Decimal::ZERO {
            return Err(ConfigError::InvalidValue("ADMIN_FEE_WITHDRAWAL"));
        }

        Ok(Self {
            minimum_transaction: config.minimum_transaction,
            top_up_fee: config.top_up_fee,
            withdrawal_fee: config.withdrawal_fee,
        })
    }

    pub fn minimum_transaction(&self) -> Decimal {
        self.minimum_transaction
    }

    pub fn top_up_fee(&self) -> Decimal {
        self.top_up_fee
    }

    pub fn withdrawal_fee(&self) -> Decimal {
        self.withdrawal_fee
    }

    /// Reject amounts under the minimum threshold
    pub fn check_minimum(&self, amount: &Amount) -> Result<(), LedgerError> {
        if amount.value() < self.minimum_transaction {
            return Err(LedgerError::BelowMinimum {
                amount: amount.value(),
                minimum: self.minimum_transaction,
            });
        }
        Ok(())
    }

    /// Amount credited to the user for a top-up of `amount`
    ///
    /// A fee that swallows the whole top-up is reported as `BelowMinimum`.
    pub fn top_up_net(&self, amount: &Amount) -> Result<Amount, LedgerError> {
        Amount::new(amount.value() - self.top_up_fee).map_err(|_| LedgerError::BelowMinimum {
            amount: amount.value(),
            minimum: self.top_up_fee,
        })
    }

    /// Amount debited from the user for a withdrawal of `amount`
    pub fn withdrawal_gross(&self, amount: &Amount) -> Result<Amount, LedgerError> {
        Amount::new(amount.value() + self.withdrawal_fee).map_err(LedgerError::InvalidAmount)
    }
}

impl Default for Policy {
    fn default() -> Self {
        let config = PolicyConfig::default();
        Self {
            minimum_transaction: config.minimum_transaction,
            top_up_fee: config.top_up_fee,
            withdrawal_fee: config.withdrawal_fee,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn amount(value: Decimal) -> Amount {
        Amount::new(value).unwrap()
    }

    #[test]
    fn test_minimum_threshold_is_inclusive() {
        let policy = Policy::default();

        assert!(policy.check_minimum(&amount(dec!(10000))).is_ok());
        assert!(matches!(
            policy.check_minimum(&amount(dec!(9999.99))),
            Err(LedgerError::BelowMinimum { .. })
        ));
    }

    #[test]
    fn test_top_up_fee_is_subtracted() {
        let policy = Policy::default();
        let net = policy.top_up_net(&amount(dec!(20000))).unwrap();
        assert_eq!(net.value(), dec!(19000));
    }

    #[test]
    fn test_top_up_fee_cannot_consume_whole_amount() {
        let policy = Policy::new(PolicyConfig {
            minimum_transaction: dec!(500),
            top_up_fee: dec!(1000),
            withdrawal_fee: dec!(0),
        })
        .unwrap();

        assert!(matches!(
            policy.top_up_net(&amount(dec!(1000))),
            Err(LedgerError::BelowMinimum { .. })
        ));
    }

    #[test]
    fn test_withdrawal_fee_is_added() {
        let policy = Policy::default();
        let gross = policy.withdrawal_gross(&amount(dec!(20000))).unwrap();
        assert_eq!(gross.value(), dec!(22500));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let negative_fee = PolicyConfig {
            top_up_fee: dec!(-1),
            ..PolicyConfig::default()
        };
        assert!(matches!(
            Policy::new(negative_fee),
            Err(ConfigError::InvalidValue("ADMIN_FEE_TOPUP"))
        ));

        let zero_minimum = PolicyConfig {
            minimum_transaction: Decimal::ZERO,
            ..PolicyConfig::default()
        };
        assert!(Policy::new(zero_minimum).is_err());
    }
}
