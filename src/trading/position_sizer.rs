//! Fixed-fractional position sizing for points and percent stop-losses.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use tracing::debug;

use crate::models::StopMode;
use super::RiskConfig;

/// Whether the sizer could produce a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SizingStatus {
    Sized,
    /// Non-positive capital, entry price or stop value, or a figure out of range
    InvalidInput,
}

/// Output of the sizer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SizingResult {
    pub status: SizingStatus,

    /// Capital lost if the stop is hit
    pub risk_amount: Decimal,

    pub units: Decimal,

    /// Never below 1 when sized
    pub suggested_leverage: Decimal,

    pub notional: Decimal,
    pub unutilized_capital: Decimal,
    pub max_leverage: Decimal,
}

impl SizingResult {
    fn invalid(unutilized_capital: Decimal) -> Self {
        Self {
            status: SizingStatus::InvalidInput,
            risk_amount: Decimal::ZERO,
            units: Decimal::ZERO,
            suggested_leverage: Decimal::ONE,
            notional: Decimal::ZERO,
            unutilized_capital,
            max_leverage: Decimal::ZERO,
        }
    }

    pub fn is_sized(&self) -> bool {
        self.status == SizingStatus::Sized
    }
}

/// Calculator for risk-bounded position sizes.
pub struct PositionSizer {
    config: RiskConfig,
}

impl PositionSizer {
    /// Create a new position sizer with given config.
    pub fn new(config: RiskConfig) -> Self {
        Self { config }
    }

    /// Size a position so that hitting the (buffered) stop loses
    /// `risk_percent` of unutilized capital.
    ///
    /// # Arguments
    /// * `unutilized_capital` - Balance not already committed as margin
    /// * `entry_price` - Intended entry price
    /// * `stop_mode` - How `stop_value` is expressed
    /// * `stop_value` - Points distance or percent move
    ///
    /// Non-positive inputs, and inputs whose figures leave the `Decimal` range,
    /// yield an `InvalidInput` result with zero units.
    pub fn size_position(
        &self,
        unutilized_capital: Decimal,
        entry_price: Decimal,
        stop_mode: StopMode,
        stop_value: Decimal,
    ) -> SizingResult {
        if unutilized_capital <= Decimal::ZERO
            || entry_price <= Decimal::ZERO
            || stop_value <= Decimal::ZERO
        {
            debug!(
                unutilized = %unutilized_capital,
                entry = %entry_price,
                stop = %stop_value,
                "Cannot size position"
            );
            return SizingResult::invalid(unutilized_capital.max(Decimal::ZERO));
        }

        let sized = unutilized_capital
            .checked_mul(self.config.risk_percent)
            .and_then(|risk| risk.checked_div(Decimal::ONE_HUNDRED))
            .and_then(|risk_amount| match stop_mode {
                StopMode::Points => {
                    self.points_size(unutilized_capital, risk_amount, entry_price, stop_value)
                }
                StopMode::Percent => {
                    self.percent_size(unutilized_capital, risk_amount, entry_price, stop_value)
                }
            });

        let Some(result) = sized else {
            debug!(
                mode = ?stop_mode,
                unutilized = %unutilized_capital,
                entry = %entry_price,
                stop = %stop_value,
                "Sizing out of range"
            );
            return SizingResult::invalid(unutilized_capital);
        };

        debug!(
            mode = ?stop_mode,
            risk = %result.risk_amount,
            units = %result.units,
            leverage = %result.suggested_leverage,
            max_leverage = %result.max_leverage,
            "Sized position"
        );

        result
    }

    /// Points stop: the stop is an absolute price distance.
    ///
    /// Suggested leverage is the leverage needed to fit the notional into
    /// unutilized capital, rounded up to the next half turn.
    /// `None` when the distance is non-positive or a figure leaves the `Decimal` range.
    fn points_size(
        &self,
        unutilized: Decimal,
        risk_amount: Decimal,
        entry: Decimal,
        points: Decimal,
    ) -> Option<SizingResult> {
        let effective_distance = points.checked_add(self.config.points_buffer)?;
        if effective_distance <= Decimal::ZERO {
            return None;
        }

        let units = risk_amount.checked_div(effective_distance)?;
        let notional = units.checked_mul(entry)?;

        let required_leverage = notional.checked_div(unutilized)?;
        let suggested_leverage =
            (required_leverage.checked_mul(dec!(2))?.ceil() / dec!(2)).max(Decimal::ONE);

        // Approximate stop % so a max leverage can be shown for points stops too
        let stop_percent = points.checked_div(entry)?.checked_mul(Decimal::ONE_HUNDRED)?;
        let max_leverage = if stop_percent > Decimal::ZERO {
            Decimal::ONE_HUNDRED.checked_div(stop_percent)?
        } else {
            Decimal::ZERO
        };

        Some(SizingResult {
            status: SizingStatus::Sized,
            risk_amount,
            units,
            suggested_leverage,
            notional,
            unutilized_capital: unutilized,
            max_leverage,
        })
    }

    /// Percent stop: the stop is a percentage move from entry.
    ///
    /// Suggested leverage equals the max leverage derived from the
    /// unbuffered stop percent.
    fn percent_size(
        &self,
        unutilized: Decimal,
        risk_amount: Decimal,
        entry: Decimal,
        percent: Decimal,
    ) -> Option<SizingResult> {
        let effective_percent = percent.checked_add(self.config.percent_buffer)?;
        let price_distance = (effective_percent / Decimal::ONE_HUNDRED).checked_mul(entry)?;
        if price_distance <= Decimal::ZERO {
            return None;
        }

        let units = risk_amount.checked_div(price_distance)?;
        let notional = units.checked_mul(entry)?;

        let max_leverage = Decimal::ONE_HUNDRED.checked_div(percent)?;
        let suggested_leverage = max_leverage.max(Decimal::ONE);

        Some(SizingResult {
            status: SizingStatus::Sized,
            risk_amount,
            units,
            suggested_leverage,
            notional,
            unutilized_capital: unutilized,
            max_leverage,
        })
    }
}
