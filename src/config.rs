//! Configuration module
//!
//! Loads configuration from environment variables.

use std::env;
use std::str::FromStr;

use rust_decimal::Decimal;

use crate::domain::{Policy, PolicyConfig};

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Database connection URL
    pub database_url: String,

    /// Maximum database connections in pool
    pub database_max_connections: u32,

    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Environment (development, production)
    pub environment: String,

    /// Smallest amount any ledger operation accepts
    pub minimum_transaction: Decimal,

    /// Flat fee kept from every top-up
    pub admin_fee_topup: Decimal,

    /// Flat fee added to every withdrawal
    pub admin_fee_withdrawal: Decimal,
}

/// Read an optional variable, falling back to `default` when unset
fn var_or<T: FromStr>(name: &'static str, default: &str) -> Result<T, ConfigError> {
    env::var(name)
        .unwrap_or_else(|_| default.to_string())
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue(name))
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingEnv("DATABASE_URL"))?;

        let database_max_connections = var_or("DATABASE_MAX_CONNECTIONS", "10")?;

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let port = var_or("PORT", "3000")?;

        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        let minimum_transaction = var_or("MINIMUM_TRANSACTION", "10000")?;
        let admin_fee_topup = var_or("ADMIN_FEE_TOPUP", "1000")?;
        let admin_fee_withdrawal = var_or("ADMIN_FEE_WITHDRAWAL", "2500")?;

        let config = Self {
            database_url,
            database_max_connections,
            host,
            port,
            environment,
            minimum_transaction,
            admin_fee_topup,
            admin_fee_withdrawal,
        };

        // Fail at startup rather than on the first request
        config.policy()?;

        Ok(config)
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Transaction policy described by this configuration
    pub fn policy(&self) -> Result<Policy, ConfigError> {
        Policy::new(PolicyConfig {
            minimum_transaction: self.minimum_transaction,
            top_up_fee: self.admin_fee_topup,
            withdrawal_fee: self.admin_fee_withdrawal,
        })
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnv(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn config() -> Config {
        Config {
            database_url: "postgres://localhost/easycash".to_string(),
            database_max_connections: 10,
            host: "127.0.0.1".to_string(),
            port: 3000,
            environment: "development".to_string(),
            minimum_transaction: dec!(10000),
            admin_fee_topup: dec!(1000),
            admin_fee_withdrawal: dec!(2500),
        }
    }

    #[test]
    fn test_policy_from_config() {
        let policy = config().policy().unwrap();
        assert_eq!(policy, Policy::default());
        assert!(!config().is_production());
    }

    #[test]
    fn test_negative_fee_rejected() {
        let config = Config {
            admin_fee_withdrawal: dec!(-5),
            ..config()
        };
        assert!(matches!(
            config.policy(),
            Err(ConfigError::InvalidValue("ADMIN_FEE_WITHDRAWAL"))
        ));
    }
}
