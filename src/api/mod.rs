//! External collaborators: market price sources and the broker gateway.
//!
//! The desk only consumes a price and a submit status; how either is
//! obtained lives behind these traits.

mod broker;
mod price_source;
mod types;

use rust_decimal::Decimal;
use thiserror::Error;

pub use broker::{BrokerOrder, PaperBroker};
pub use price_source::{HttpPriceSource, SimulatedPriceSource};

/// Failure reported by a price source or broker.
#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("no price available for {0}")]
    UnknownSymbol(String),

    #[error("non-positive price {price} for {symbol}")]
    InvalidPrice { symbol: String, price: Decimal },

    #[error("{0}")]
    Rejected(String),
}

/// Supplies the current market price for a symbol.
pub trait PriceSource {
    /// Latest price; implementations never return a non-positive value.
    async fn get_price(&self, symbol: &str) -> Result<Decimal, CollaboratorError>;
}

/// Accepts finalized orders and reports the account balance.
pub trait BrokerGateway {
    /// Submit an order and return the broker's status string.
    async fn submit_order(&self, order: &BrokerOrder) -> Result<String, CollaboratorError>;

    /// Account balance available for sizing.
    async fn fetch_balance(&self) -> Result<Decimal, CollaboratorError>;
}
