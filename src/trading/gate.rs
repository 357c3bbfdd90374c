//! Trade gate: the single choke point a proposal passes before execution.
//!
//! Checks, in order:
//! - the symbol is present
//! - daily and per-symbol trade-count ceilings
//! - the sizer produced a position for valid inputs
//! - manual overrides only size down from the suggestion, never below 1x
//! - required margin fits in unutilized capital
//! - take-profit allocations add up to at most 100%

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use tracing::{debug, warn};

use crate::models::{normalize_symbol, DailyStats, OrderTicket};
use super::{RiskConfig, SizingResult, TradeError};

/// Slack allowed when comparing overrides and margin against their ceilings.
pub const EPSILON: Decimal = dec!(0.000000001);

/// A proposal that passed every check, ready to be submitted and recorded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApprovedTrade {
    pub units: Decimal,
    pub leverage: Decimal,
    pub notional: Decimal,
    pub margin_required: Decimal,
}

/// Validates proposals against limits and the sizer's suggestion.
pub struct TradeGate {
    daily_max_trades: u32,
    daily_max_per_symbol: u32,
}

impl TradeGate {
    pub fn new(config: &RiskConfig) -> Self {
        Self {
            daily_max_trades: config.daily_max_trades,
            daily_max_per_symbol: config.daily_max_per_symbol,
        }
    }

    /// Decide whether `ticket` may proceed. Never mutates state.
    pub fn validate_and_prepare(
        &self,
        ticket: &OrderTicket,
        today: &DailyStats,
        sizing: &SizingResult,
        unutilized_capital: Decimal,
    ) -> Result<ApprovedTrade, TradeError> {
        let result = self.check(ticket, today, sizing, unutilized_capital);

        match &result {
            Ok(approved) => debug!(
                symbol = %ticket.symbol,
                units = %approved.units,
                leverage = %approved.leverage,
                margin = %approved.margin_required,
                "Proposal approved"
            ),
            Err(e) => warn!(
                symbol = %ticket.symbol,
                code = e.code(),
                reason = %e,
                "Proposal rejected"
            ),
        }

        result
    }

    fn check(
        &self,
        ticket: &OrderTicket,
        today: &DailyStats,
        sizing: &SizingResult,
        unutilized_capital: Decimal,
    ) -> Result<ApprovedTrade, TradeError> {
        let symbol = normalize_symbol(&ticket.symbol);
        if symbol.is_empty() {
            return Err(TradeError::InvalidInput("symbol is empty".to_string()));
        }

        // ==================== Trade Counts ====================

        if today.total_count >= self.daily_max_trades {
            return Err(TradeError::DailyLimitReached {
                count: today.total_count,
                limit: self.daily_max_trades,
            });
        }

        let symbol_count = today.symbol_count(&symbol);
        if symbol_count >= self.daily_max_per_symbol {
            return Err(TradeError::SymbolLimitReached {
                symbol,
                count: symbol_count,
                limit: self.daily_max_per_symbol,
            });
        }

        // ==================== Inputs ====================

        if ticket.entry_price <= Decimal::ZERO {
            return Err(TradeError::InvalidInput(format!(
                "entry price must be positive, got {}",
                ticket.entry_price
            )));
        }
        if !sizing.is_sized() {
            return Err(TradeError::InvalidInput(format!(
                "cannot size position: unutilized {}, entry {}, stop {}",
                sizing.unutilized_capital, ticket.entry_price, ticket.stop_value
            )));
        }

        // ==================== Overrides ====================

        if let Some(leverage) = ticket.leverage_override {
            if leverage > Decimal::ZERO && leverage < Decimal::ONE {
                return Err(TradeError::InvalidInput(format!(
                    "leverage override must be at least 1x, got {}",
                    leverage
                )));
            }
        }

        let units = effective(ticket.units_override, sizing.units);
        let leverage = effective(ticket.leverage_override, sizing.suggested_leverage);

        if units > sizing.units + EPSILON {
            return Err(TradeError::OverrideExceedsSuggested {
                field: "units",
                attempted: units,
                allowed: sizing.units,
            });
        }
        if leverage > sizing.suggested_leverage + EPSILON {
            return Err(TradeError::OverrideExceedsSuggested {
                field: "leverage",
                attempted: leverage,
                allowed: sizing.suggested_leverage,
            });
        }

        // ==================== Margin ====================

        let sized = units
            .checked_mul(ticket.entry_price)
            .and_then(|notional| notional.checked_div(leverage).map(|margin| (notional, margin)));
        let Some((notional, margin_required)) = sized else {
            return Err(TradeError::InvalidInput(format!(
                "order size out of range: {} units at {}",
                units, ticket.entry_price
            )));
        };
        if margin_required > unutilized_capital + EPSILON {
            return Err(TradeError::InsufficientCapital {
                required: margin_required,
                available: unutilized_capital,
            });
        }

        // ==================== Take Profits ====================

        let mut allocated = Decimal::ZERO;
        for (i, tp) in ticket.take_profits.iter().enumerate() {
            if tp.price <= Decimal::ZERO {
                return Err(TradeError::InvalidTakeProfits(format!(
                    "TP{} price must be positive, got {}",
                    i + 1,
                    tp.price
                )));
            }
            if tp.percentage <= Decimal::ZERO || tp.percentage > Decimal::ONE_HUNDRED {
                return Err(TradeError::InvalidTakeProfits(format!(
                    "TP{} percentage must be in (0, 100], got {}",
                    i + 1,
                    tp.percentage
                )));
            }
            allocated += tp.percentage;
        }
        if allocated > Decimal::ONE_HUNDRED {
            return Err(TradeError::InvalidTakeProfits(format!(
                "allocations sum to {}%",
                allocated
            )));
        }

        Ok(ApprovedTrade {
            units,
            leverage,
            notional,
            margin_required,
        })
    }
}

/// Use the override when it is positive, the suggestion otherwise.
fn effective(user_override: Option<Decimal>, suggested: Decimal) -> Decimal {
    match user_override {
        Some(value) if value > Decimal::ZERO => value,
        _ => suggested,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Side, StopMode};
    use crate::trading::PositionSizer;
    use proptest::prelude::*;

    fn gate() -> TradeGate {
        TradeGate::new(&RiskConfig::default())
    }

    fn ticket() -> OrderTicket {
        OrderTicket::new("BTCUSDT", Side::Long, dec!(1000), StopMode::Points, dec!(5))
    }

    /// 4 units at 1x on 10000 capital
    fn sizing() -> SizingResult {
        PositionSizer::new(RiskConfig::default()).size_position(
            dec!(10000),
            dec!(1000),
            StopMode::Points,
            dec!(5),
        )
    }

    #[test]
    fn test_accepts_suggestion() {
        let approved = gate()
            .validate_and_prepare(&ticket(), &DailyStats::default(), &sizing(), dec!(10000))
            .unwrap();

        assert_eq!(approved.units, dec!(4));
        assert_eq!(approved.leverage, dec!(1));
        assert_eq!(approved.notional, dec!(4000));
        assert_eq!(approved.margin_required, dec!(4000));
    }

    #[test]
    fn test_smaller_override_accepted() {
        let t = ticket().with_units(dec!(2)).with_leverage(Decimal::ZERO);
        let approved = gate()
            .validate_and_prepare(&t, &DailyStats::default(), &sizing(), dec!(10000))
            .unwrap();

        assert_eq!(approved.units, dec!(2));
        assert_eq!(approved.leverage, dec!(1)); // zero override falls back to suggestion
        assert_eq!(approved.notional, dec!(2000));
    }

    #[test]
    fn test_units_override_ten_percent_above_rejected() {
        let t = ticket().with_units(dec!(4.4));
        let err = gate()
            .validate_and_prepare(&t, &DailyStats::default(), &sizing(), dec!(10000))
            .unwrap_err();

        assert_eq!(err.code(), "OVERRIDE_EXCEEDS_SUGGESTED");
        assert!(err.to_string().contains("4.4"));
    }

    #[test]
    fn test_leverage_override_above_suggestion_rejected() {
        let t = ticket().with_leverage(dec!(2));
        let err = gate()
            .validate_and_prepare(&t, &DailyStats::default(), &sizing(), dec!(10000))
            .unwrap_err();
        assert!(matches!(
            err,
            TradeError::OverrideExceedsSuggested { field: "leverage", .. }
        ));
    }

    #[test]
    fn test_override_within_epsilon_accepted() {
        let t = ticket().with_units(dec!(4.0000000005));
        assert!(gate()
            .validate_and_prepare(&t, &DailyStats::default(), &sizing(), dec!(10000))
            .is_ok());
    }

    #[test]
    fn test_leverage_override_below_one_rejected() {
        let t = ticket().with_leverage(dec!(0.5));
        let err = gate()
            .validate_and_prepare(&t, &DailyStats::default(), &sizing(), dec!(10000))
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_INPUT");
        assert!(err.to_string().contains("0.5"));

        let exact = ticket().with_leverage(dec!(1));
        let approved = gate()
            .validate_and_prepare(&exact, &DailyStats::default(), &sizing(), dec!(10000))
            .unwrap();
        assert_eq!(approved.leverage, dec!(1));
        assert_eq!(approved.margin_required, dec!(4000));
    }

    #[test]
    fn test_limits_checked_before_sizing_inputs() {
        let mut today = DailyStats::default();
        for symbol in ["BTCUSDT", "ETHUSDT", "SOLUSDT", "XRPUSDT"] {
            today.increment(symbol);
        }
        let invalid = PositionSizer::new(RiskConfig::default()).size_position(
            dec!(10000),
            dec!(1000),
            StopMode::Points,
            Decimal::ZERO,
        );

        let t = OrderTicket::new("DOGEUSDT", Side::Long, dec!(1000), StopMode::Points, Decimal::ZERO);
        let err = gate()
            .validate_and_prepare(&t, &today, &invalid, dec!(10000))
            .unwrap_err();
        assert_eq!(err.code(), "DAILY_LIMIT_REACHED");
    }

    #[test]
    fn test_notional_out_of_range_rejected() {
        let huge = SizingResult {
            units: Decimal::MAX / dec!(2),
            ..sizing()
        };
        let t = OrderTicket::new("BTCUSDT", Side::Long, dec!(3), StopMode::Points, dec!(5));
        let err = gate()
            .validate_and_prepare(&t, &DailyStats::default(), &huge, dec!(10000))
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_INPUT");
    }

    #[test]
    fn test_daily_limit_checked_before_symbol_limit() {
        let mut today = DailyStats::default();
        for symbol in ["BTCUSDT", "BTCUSDT", "ETHUSDT", "SOLUSDT"] {
            today.increment(symbol);
        }

        let err = gate()
            .validate_and_prepare(&ticket(), &today, &sizing(), dec!(10000))
            .unwrap_err();
        assert!(matches!(err, TradeError::DailyLimitReached { count: 4, limit: 4 }));
    }

    #[test]
    fn test_empty_symbol_rejected() {
        let mut t = ticket();
        t.symbol = "  ".to_string();
        let err = gate()
            .validate_and_prepare(&t, &DailyStats::default(), &sizing(), dec!(10000))
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_INPUT");
    }

    #[test]
    fn test_symbol_limit() {
        let mut today = DailyStats::default();
        today.increment("BTCUSDT");
        today.increment("BTCUSDT");

        let err = gate()
            .validate_and_prepare(&ticket(), &today, &sizing(), dec!(10000))
            .unwrap_err();
        assert_eq!(err.code(), "SYMBOL_LIMIT_REACHED");

        let other = OrderTicket::new("ETHUSDT", Side::Short, dec!(1000), StopMode::Points, dec!(5));
        assert!(gate()
            .validate_and_prepare(&other, &today, &sizing(), dec!(10000))
            .is_ok());
    }

    #[test]
    fn test_insufficient_capital() {
        // Suggestion computed on 10000, but only 3000 is left unutilized.
        let err = gate()
            .validate_and_prepare(&ticket(), &DailyStats::default(), &sizing(), dec!(3000))
            .unwrap_err();

        match err {
            TradeError::InsufficientCapital { required, available } => {
                assert_eq!(required, dec!(4000));
                assert_eq!(available, dec!(3000));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_invalid_sizing_rejected() {
        let invalid = PositionSizer::new(RiskConfig::default()).size_position(
            Decimal::ZERO,
            dec!(1000),
            StopMode::Points,
            dec!(5),
        );
        let err = gate()
            .validate_and_prepare(&ticket(), &DailyStats::default(), &invalid, Decimal::ZERO)
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_INPUT");
    }

    #[test]
    fn test_take_profit_allocation() {
        let ok = ticket()
            .with_take_profit(dec!(1005), dec!(70))
            .with_take_profit(dec!(1015), dec!(30));
        assert!(gate()
            .validate_and_prepare(&ok, &DailyStats::default(), &sizing(), dec!(10000))
            .is_ok());

        let over = ticket()
            .with_take_profit(dec!(1005), dec!(70))
            .with_take_profit(dec!(1015), dec!(40));
        let err = gate()
            .validate_and_prepare(&over, &DailyStats::default(), &sizing(), dec!(10000))
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_TAKE_PROFITS");

        let zero_price = ticket().with_take_profit(Decimal::ZERO, dec!(50));
        assert!(gate()
            .validate_and_prepare(&zero_price, &DailyStats::default(), &sizing(), dec!(10000))
            .is_err());
    }

    proptest! {
        #[test]
        fn approved_never_exceeds_suggestion(
            units_milli in 0u64..10_000,
            leverage_tenths in 0u64..50,
        ) {
            let t = ticket()
                .with_units(Decimal::new(units_milli as i64, 3))
                .with_leverage(Decimal::new(leverage_tenths as i64, 1));
            let s = sizing();

            if let Ok(approved) = gate().validate_and_prepare(&t, &DailyStats::default(), &s, dec!(10000)) {
                prop_assert!(approved.units <= s.units + EPSILON);
                prop_assert!(approved.leverage <= s.suggested_leverage + EPSILON);
                prop_assert!(approved.leverage >= Decimal::ONE);
            }
        }
    }
}
