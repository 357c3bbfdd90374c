//! Trading logic: risk configuration, position sizing, trade gate.

mod config;
mod error;
mod gate;
mod position_sizer;

pub use config::RiskConfig;
pub use error::TradeError;
pub use gate::{ApprovedTrade, TradeGate};
pub use position_sizer::{PositionSizer, SizingResult, SizingStatus};
