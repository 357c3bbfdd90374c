//! Response types for the public spot ticker endpoint.

use rust_decimal::Decimal;
use serde::Deserialize;

/// Ticker response from /api/v3/ticker/price.
///
/// The exchange sends the price as a string; `Decimal` parses it losslessly.
#[derive(Debug, Clone, Deserialize)]
pub struct TickerResponse {
    pub symbol: String,
    pub price: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_ticker() {
        let ticker: TickerResponse =
            serde_json::from_str(r#"{"symbol":"BTCUSDT","price":"27050.01000000"}"#).unwrap();
        assert_eq!(ticker.symbol, "BTCUSDT");
        assert_eq!(ticker.price, dec!(27050.01));
    }
}
