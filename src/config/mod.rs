//! CLI configuration module

use clap::{Parser, Subcommand};
use thiserror::Error;

use crate::{
    config::{
        api::ApiConfig, observability::LoggingConfig, promotion::PromotionConfig,
        storage::StorageConfig,
    },
    products::ProductId,
};

pub mod api;
pub mod observability;
pub mod promotion;
pub mod storage;

/// Errors raised while interpreting configuration values.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Currency code is not an ISO 4217 currency.
    #[error("unknown currency code: {0}")]
    UnknownCurrency(String),

    /// Gift threshold below zero.
    #[error("gift threshold must not be negative: {0}")]
    NegativeThreshold(i64),
}

/// `GenziKart` cart CLI configuration
#[derive(Debug, Parser)]
#[command(name = "genzikart", about = "GenziKart shopping cart", long_about = None)]
pub struct CartConfig {
    /// Storefront API settings.
    #[command(flatten)]
    pub api: ApiConfig,

    /// Local storage settings.
    #[command(flatten)]
    pub storage: StorageConfig,

    /// Free gift promotion settings.
    #[command(flatten)]
    pub promotion: PromotionConfig,

    /// Logging output settings.
    #[command(flatten)]
    pub logging: LoggingConfig,

    /// Cart operation to run.
    #[command(subcommand)]
    pub command: CartCommand,
}

impl CartConfig {
    /// Load configuration from environment and CLI arguments
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be parsed
    pub fn load() -> Result<Self, clap::Error> {
        // Load .env file if present (ignore if missing)
        _ = dotenvy::dotenv();

        Self::try_parse()
    }
}

/// Cart operations exposed on the command line.
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum CartCommand {
    /// Print the cart.
    Show,

    /// Add a catalog product.
    Add {
        /// Product identifier
        product_id: ProductId,

        /// Units to add
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },

    /// Change a line's quantity by a signed delta.
    Quantity {
        /// Product identifier
        product_id: ProductId,

        /// Units to add (positive) or take away (negative)
        #[arg(allow_negative_numbers = true)]
        delta: i64,
    },

    /// Remove a line.
    Remove {
        /// Product identifier
        product_id: ProductId,
    },

    /// Check whether checkout may start.
    Checkout,

    /// Store a session token from the sign-in flow.
    Login {
        /// Bearer token
        token: String,
    },

    /// Clear the stored session token.
    Logout,
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    #[test]
    fn parses_add_with_quantity() -> TestResult {
        let config = CartConfig::try_parse_from(["genzikart", "add", "case", "-q", "3"])?;

        assert_eq!(
            config.command,
            CartCommand::Add {
                product_id: ProductId::new("case"),
                quantity: 3,
            }
        );

        Ok(())
    }

    #[test]
    fn parses_negative_delta() -> TestResult {
        let config = CartConfig::try_parse_from(["genzikart", "quantity", "case", "-2"])?;

        assert_eq!(
            config.command,
            CartCommand::Quantity {
                product_id: ProductId::new("case"),
                delta: -2,
            }
        );

        Ok(())
    }

    #[test]
    fn requires_a_command() {
        assert!(
            CartConfig::try_parse_from(["genzikart"]).is_err(),
            "a subcommand is mandatory"
        );
    }
}
