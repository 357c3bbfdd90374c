//! Order ticket: the user's inputs for one proposed trade.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::trade::{normalize_symbol, OrderType, Side, StopMode, TakeProfit};

/// Proposed trade as entered at the desk, before sizing and gating.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderTicket {
    pub symbol: String,
    pub side: Side,
    pub order_type: OrderType,
    pub entry_price: Decimal,
    pub stop_mode: StopMode,

    /// Points distance or percent, depending on `stop_mode`
    pub stop_value: Decimal,

    #[serde(default)]
    pub take_profits: Vec<TakeProfit>,

    /// Manual unit quantity; `None` or a non-positive value uses the suggestion
    #[serde(default)]
    pub units_override: Option<Decimal>,

    /// Manual leverage; `None` or a non-positive value uses the suggestion
    #[serde(default)]
    pub leverage_override: Option<Decimal>,
}

impl OrderTicket {
    pub fn new(
        symbol: &str,
        side: Side,
        entry_price: Decimal,
        stop_mode: StopMode,
        stop_value: Decimal,
    ) -> Self {
        Self {
            symbol: normalize_symbol(symbol),
            side,
            order_type: OrderType::default(),
            entry_price,
            stop_mode,
            stop_value,
            take_profits: Vec::new(),
            units_override: None,
            leverage_override: None,
        }
    }

    /// Ticket whose stop is given as a price; the distance becomes a points stop.
    pub fn from_stop_price(symbol: &str, side: Side, entry_price: Decimal, stop_price: Decimal) -> Self {
        Self::new(
            symbol,
            side,
            entry_price,
            StopMode::Points,
            (entry_price - stop_price).abs(),
        )
    }

    pub fn with_order_type(mut self, order_type: OrderType) -> Self {
        self.order_type = order_type;
        self
    }

    pub fn with_take_profit(mut self, price: Decimal, percentage: Decimal) -> Self {
        self.take_profits.push(TakeProfit::new(price, percentage));
        self
    }

    pub fn with_units(mut self, units: Decimal) -> Self {
        self.units_override = Some(units);
        self
    }

    pub fn with_leverage(mut self, leverage: Decimal) -> Self {
        self.leverage_override = Some(leverage);
        self
    }
}
