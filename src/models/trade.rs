//! Trade model representing a futures order recorded in the session ledger.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::OrderTicket;

/// Direction of a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Long,
    Short,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Long => "LONG",
            Side::Short => "SHORT",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "long" | "buy" => Some(Self::Long),
            "short" | "sell" => Some(Self::Short),
            _ => None,
        }
    }
}

/// Order type forwarded to the broker. Has no effect on sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderType {
    #[default]
    Market,
    Limit,
    Stop,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Market => "MARKET",
            OrderType::Limit => "LIMIT",
            OrderType::Stop => "STOP",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "market" | "mkt" => Some(Self::Market),
            "limit" | "lmt" => Some(Self::Limit),
            "stop" => Some(Self::Stop),
            _ => None,
        }
    }
}

/// How the stop-loss distance is expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StopMode {
    /// Absolute price distance from entry
    Points,
    /// Percentage move from entry (0.5 means 0.5%)
    Percent,
}

impl StopMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "points" | "pts" | "p" => Some(Self::Points),
            "percent" | "pct" | "%" => Some(Self::Percent),
            _ => None,
        }
    }

    /// Stop-loss price implied by a stop value on the losing side of `entry`.
    pub fn stop_price(&self, side: Side, entry: Decimal, value: Decimal) -> Decimal {
        let distance = match self {
            StopMode::Points => value,
            StopMode::Percent => entry.saturating_mul(value) / Decimal::ONE_HUNDRED,
        };
        match side {
            Side::Long => entry.saturating_sub(distance),
            Side::Short => entry.saturating_add(distance),
        }
    }
}

/// One take-profit leg: close `percentage` of the position at `price`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TakeProfit {
    pub price: Decimal,
    pub percentage: Decimal,
}

impl TakeProfit {
    pub fn new(price: Decimal, percentage: Decimal) -> Self {
        Self { price, percentage }
    }
}

/// Trim and upper-case an instrument symbol.
pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

/// A trade accepted by the gate and recorded in the ledger.
///
/// Immutable once recorded; `notional` is always `units * entry_price`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    /// Creation time in epoch milliseconds, unique within a session
    pub id: i64,

    /// UTC calendar date the trade was recorded on
    pub date: NaiveDate,

    /// Full creation timestamp
    pub time: DateTime<Utc>,

    pub symbol: String,
    pub side: Side,
    pub order_type: OrderType,
    pub entry_price: Decimal,

    /// Stop input as entered by the user
    pub stop_mode: StopMode,
    pub stop_value: Decimal,

    /// Derived stop-loss price
    pub stop_loss_price: Decimal,

    pub units: Decimal,
    pub leverage: Decimal,

    /// `units * entry_price`
    pub notional: Decimal,

    pub take_profits: Vec<TakeProfit>,
}

impl Trade {
    /// Build a trade from a ticket and the gate's finalized size.
    pub fn new(
        id: i64,
        time: DateTime<Utc>,
        ticket: &OrderTicket,
        units: Decimal,
        leverage: Decimal,
    ) -> Self {
        Self {
            id,
            date: time.date_naive(),
            time,
            symbol: normalize_symbol(&ticket.symbol),
            side: ticket.side,
            order_type: ticket.order_type,
            entry_price: ticket.entry_price,
            stop_mode: ticket.stop_mode,
            stop_value: ticket.stop_value,
            stop_loss_price: ticket
                .stop_mode
                .stop_price(ticket.side, ticket.entry_price, ticket.stop_value),
            units,
            leverage,
            notional: units * ticket.entry_price,
            take_profits: ticket.take_profits.clone(),
        }
    }

    /// Capital committed as margin: notional over leverage, with leverage floored at 1.
    pub fn margin(&self) -> Decimal {
        self.notional / self.leverage.max(Decimal::ONE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    #[test]
    fn test_stop_price_both_modes() {
        assert_eq!(StopMode::Points.stop_price(Side::Long, dec!(1000), dec!(5)), dec!(995));
        assert_eq!(StopMode::Points.stop_price(Side::Short, dec!(1000), dec!(5)), dec!(1005));
        assert_eq!(StopMode::Percent.stop_price(Side::Long, dec!(2000), dec!(0.5)), dec!(1990));
        assert_eq!(StopMode::Percent.stop_price(Side::Short, dec!(2000), dec!(0.5)), dec!(2010));
    }

    #[test]
    fn test_stop_price_saturates() {
        let stop = StopMode::Percent.stop_price(Side::Short, Decimal::MAX, dec!(50));
        assert_eq!(stop, Decimal::MAX);
    }

    #[test]
    fn test_trade_derives_notional_and_date() {
        let time = Utc.with_ymd_and_hms(2024, 3, 9, 23, 59, 0).unwrap();
        let ticket = OrderTicket::new(" btcusdt ", Side::Long, dec!(1000), StopMode::Points, dec!(5));
        let trade = Trade::new(1, time, &ticket, dec!(4), dec!(2));

        assert_eq!(trade.symbol, "BTCUSDT");
        assert_eq!(trade.notional, dec!(4000));
        assert_eq!(trade.margin(), dec!(2000));
        assert_eq!(trade.stop_loss_price, dec!(995));
        assert_eq!(trade.date, NaiveDate::from_ymd_opt(2024, 3, 9).unwrap());
    }

    #[test]
    fn test_margin_floors_leverage_at_one() {
        let ticket = OrderTicket::new("ETHUSDT", Side::Short, dec!(100), StopMode::Percent, dec!(1));
        let trade = Trade::new(1, Utc::now(), &ticket, dec!(3), dec!(0.5));
        assert_eq!(trade.margin(), dec!(300));
    }

    #[test]
    fn test_parse_enums() {
        assert_eq!(Side::parse("Buy"), Some(Side::Long));
        assert_eq!(Side::parse("short"), Some(Side::Short));
        assert_eq!(Side::parse("flat"), None);
        assert_eq!(OrderType::parse("LIMIT"), Some(OrderType::Limit));
        assert_eq!(StopMode::parse("%"), Some(StopMode::Percent));
    }
}
