//! Promotion Config

use clap::Args;
use rusty_money::{
    Money,
    iso::{self, Currency},
};

use crate::{
    config::ConfigError,
    promotions::{DEFAULT_GIFT_THRESHOLD, FreeGiftPromotion},
};

/// Free gift promotion settings.
#[derive(Debug, Args)]
pub struct PromotionConfig {
    /// Subtotal, in major currency units, that unlocks the free gift
    #[arg(long, env = "GENZIKART_GIFT_THRESHOLD", default_value_t = DEFAULT_GIFT_THRESHOLD)]
    pub gift_threshold: i64,

    /// ISO 4217 currency code the catalog is priced in
    #[arg(long, env = "GENZIKART_CURRENCY", default_value = "INR")]
    pub currency: String,
}

impl PromotionConfig {
    /// Configured currency.
    ///
    /// # Errors
    ///
    /// Returns an error if the code is not a known ISO 4217 currency.
    pub fn currency(&self) -> Result<&'static Currency, ConfigError> {
        let code = self.currency.trim().to_ascii_uppercase();

        iso::find(&code).ok_or(ConfigError::UnknownCurrency(code))
    }

    /// Free gift promotion at the configured threshold.
    ///
    /// # Errors
    ///
    /// Returns an error if the currency is unknown or the threshold is negative.
    pub fn promotion(&self) -> Result<FreeGiftPromotion, ConfigError> {
        if self.gift_threshold < 0 {
            return Err(ConfigError::NegativeThreshold(self.gift_threshold));
        }

        Ok(FreeGiftPromotion::with_threshold(Money::from_major(
            self.gift_threshold,
            self.currency()?,
        )))
    }
}

#[cfg(test)]
mod tests {
    use rusty_money::iso::{GBP, INR};
    use testresult::TestResult;

    use super::*;

    fn config(gift_threshold: i64, currency: &str) -> PromotionConfig {
        PromotionConfig {
            gift_threshold,
            currency: currency.to_string(),
        }
    }

    #[test]
    fn currency_codes_are_case_insensitive() -> TestResult {
        assert_eq!(config(1499, "inr").currency()?, INR);
        assert_eq!(config(1499, " GBP ").currency()?, GBP);

        Ok(())
    }

    #[test]
    fn unknown_currency_is_rejected() {
        assert!(matches!(
            config(1499, "XYZ").currency(),
            Err(ConfigError::UnknownCurrency(code)) if code == "XYZ"
        ));
    }

    #[test]
    fn threshold_is_in_major_units() -> TestResult {
        let promotion = config(1499, "INR").promotion()?;

        assert_eq!(promotion.threshold(), &Money::from_major(1499, INR));

        Ok(())
    }

    #[test]
    fn negative_threshold_is_rejected() {
        assert!(matches!(
            config(-1, "INR").promotion(),
            Err(ConfigError::NegativeThreshold(-1))
        ));
    }
}
