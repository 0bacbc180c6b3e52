use serde::{Deserialize, Serialize};

use crate::decimal::CURRENCY_SCALE;
use crate::errors::{AccrualError, Result};

/// minimum fractional digits kept on a day-count fraction
pub const MIN_FRACTION_SCALE: u32 = 10;

/// accrual engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccrualConfig {
    /// fractional digits of the day-count fraction (intermediate precision)
    pub fraction_scale: u32,
    /// fractional digits of monetary amounts; fixed at 2
    pub currency_scale: u32,
    /// transition token used when the reconciler writes the loan
    pub loan_balance_transition: String,
    /// how many fresh-read attempts the driver makes when the loan update conflicts
    pub max_reconcile_attempts: u32,
    /// how many times the driver submits the POSTED accrual after its loan
    /// write, on persistence failures; the loan write itself is never repeated
    pub max_post_attempts: u32,
    /// log a warning for zero or negative interest amounts
    pub warn_on_non_positive_interest: bool,
}

impl Default for AccrualConfig {
    fn default() -> Self {
        Self {
            fraction_scale: MIN_FRACTION_SCALE,
            currency_scale: CURRENCY_SCALE,
            loan_balance_transition: "accrue_interest".to_string(),
            max_reconcile_attempts: 3,
            max_post_attempts: 3,
            warn_on_non_positive_interest: true,
        }
    }
}

impl AccrualConfig {
    /// parse and validate a json configuration; absent keys take defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: AccrualConfig =
            serde_json::from_str(json).map_err(|e| AccrualError::InvalidConfiguration {
                message: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.fraction_scale < MIN_FRACTION_SCALE || self.fraction_scale > 28 {
            return Err(AccrualError::InvalidConfiguration {
                message: format!(
                    "fraction_scale must be between {} and 28, got {}",
                    MIN_FRACTION_SCALE, self.fraction_scale
                ),
            });
        }
        if self.currency_scale != CURRENCY_SCALE {
            return Err(AccrualError::InvalidConfiguration {
                message: format!(
                    "currency_scale is fixed at {}, got {}",
                    CURRENCY_SCALE, self.currency_scale
                ),
            });
        }
        if self.loan_balance_transition.trim().is_empty() {
            return Err(AccrualError::InvalidConfiguration {
                message: "loan_balance_transition must not be empty".to_string(),
            });
        }
        if self.max_reconcile_attempts == 0 {
            return Err(AccrualError::InvalidConfiguration {
                message: "max_reconcile_attempts must be at least 1".to_string(),
            });
        }
        if self.max_post_attempts == 0 {
            return Err(AccrualError::InvalidConfiguration {
                message: "max_post_attempts must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}
