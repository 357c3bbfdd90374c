//! Data models for order tickets, recorded trades, and daily counters.

mod order;
mod stats;
mod trade;

pub use order::OrderTicket;
pub use stats::DailyStats;
pub use trade::{normalize_symbol, OrderType, Side, StopMode, TakeProfit, Trade};
