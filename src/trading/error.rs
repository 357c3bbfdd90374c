//! Trade rejection and execution errors.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::api::CollaboratorError;

/// Why a proposed trade was not placed. Every variant is recoverable.
#[derive(Debug, Error)]
pub enum TradeError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("daily trade limit reached: {count} of {limit} trades today")]
    DailyLimitReached { count: u32, limit: u32 },

    #[error("daily limit for {symbol} reached: {count} of {limit} trades today")]
    SymbolLimitReached {
        symbol: String,
        count: u32,
        limit: u32,
    },

    #[error("{field} override {attempted} exceeds suggested maximum {allowed}")]
    OverrideExceedsSuggested {
        field: &'static str,
        attempted: Decimal,
        allowed: Decimal,
    },

    #[error("insufficient unutilized capital: margin {required} > available {available}")]
    InsufficientCapital { required: Decimal, available: Decimal },

    #[error("invalid take-profits: {0}")]
    InvalidTakeProfits(String),

    #[error("broker rejected order: {0}")]
    Broker(#[source] CollaboratorError),
}

impl TradeError {
    /// Stable code shown next to the message.
    pub fn code(&self) -> &'static str {
        match self {
            TradeError::InvalidInput(_) => "INVALID_INPUT",
            TradeError::DailyLimitReached { .. } => "DAILY_LIMIT_REACHED",
            TradeError::SymbolLimitReached { .. } => "SYMBOL_LIMIT_REACHED",
            TradeError::OverrideExceedsSuggested { .. } => "OVERRIDE_EXCEEDS_SUGGESTED",
            TradeError::InsufficientCapital { .. } => "INSUFFICIENT_CAPITAL",
            TradeError::InvalidTakeProfits(_) => "INVALID_TAKE_PROFITS",
            TradeError::Broker(_) => "BROKER_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_messages_name_both_figures() {
        let err = TradeError::OverrideExceedsSuggested {
            field: "units",
            attempted: dec!(4.4),
            allowed: dec!(4),
        };
        assert_eq!(err.code(), "OVERRIDE_EXCEEDS_SUGGESTED");
        assert_eq!(err.to_string(), "units override 4.4 exceeds suggested maximum 4");

        let err = TradeError::InsufficientCapital {
            required: dec!(12000),
            available: dec!(6000),
        };
        assert!(err.to_string().contains("12000"));
        assert!(err.to_string().contains("6000"));
    }
}
