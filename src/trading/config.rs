//! Risk configuration.

use std::path::Path;

use anyhow::{ensure, Context, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Configuration for position sizing and trade gating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    /// Account balance used when the broker does not report one
    pub starting_balance: Decimal,

    /// Percentage of unutilized capital risked per trade (1.0 = 1%)
    pub risk_percent: Decimal,

    /// Price units added to a points stop before sizing
    pub points_buffer: Decimal,

    /// Percentage points added to a percent stop before sizing
    pub percent_buffer: Decimal,

    /// Maximum trades per UTC day across all symbols
    pub daily_max_trades: u32,

    /// Maximum trades per UTC day for a single symbol
    pub daily_max_per_symbol: u32,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            starting_balance: dec!(10000.00),
            risk_percent: dec!(1.0),     // 1% of unutilized capital
            points_buffer: dec!(20.0),
            percent_buffer: dec!(0.2),
            daily_max_trades: 4,
            daily_max_per_symbol: 2,
        }
    }
}

impl RiskConfig {
    /// Load a JSON config file; missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the sizing formulas cannot work with.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.starting_balance > Decimal::ZERO,
            "starting_balance must be positive, got {}",
            self.starting_balance
        );
        ensure!(
            self.risk_percent > Decimal::ZERO && self.risk_percent <= Decimal::ONE_HUNDRED,
            "risk_percent must be in (0, 100], got {}",
            self.risk_percent
        );
        ensure!(
            self.points_buffer >= Decimal::ZERO,
            "points_buffer must not be negative, got {}",
            self.points_buffer
        );
        ensure!(
            self.percent_buffer >= Decimal::ZERO,
            "percent_buffer must not be negative, got {}",
            self.percent_buffer
        );
        ensure!(self.daily_max_trades > 0, "daily_max_trades must be at least 1");
        ensure!(
            self.daily_max_per_symbol > 0,
            "daily_max_per_symbol must be at least 1"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = RiskConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.risk_percent, dec!(1));
        assert_eq!(config.daily_max_trades, 4);
        assert_eq!(config.daily_max_per_symbol, 2);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = RiskConfig {
            risk_percent: Decimal::ZERO,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = RiskConfig {
            points_buffer: dec!(-1),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = RiskConfig {
            daily_max_per_symbol: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: RiskConfig =
            serde_json::from_str(r#"{"daily_max_trades": 999, "risk_percent": "0.5"}"#).unwrap();
        assert_eq!(config.daily_max_trades, 999);
        assert_eq!(config.risk_percent, dec!(0.5));
        assert_eq!(config.points_buffer, dec!(20));
    }
}
