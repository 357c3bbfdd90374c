//! Price sources: a fixed-quote simulator and a public HTTP ticker.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};
use backoff::ExponentialBackoffBuilder;
use reqwest::Client;
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::models::normalize_symbol;

use super::types::TickerResponse;
use super::{CollaboratorError, PriceSource};

const TICKER_API_BASE: &str = "https://api.binance.com";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_RETRY_ELAPSED: Duration = Duration::from_secs(15);

/// In-memory quotes, used for paper sessions and tests.
#[derive(Debug, Clone, Default)]
pub struct SimulatedPriceSource {
    quotes: HashMap<String, Decimal>,
}

impl SimulatedPriceSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_price(mut self, symbol: &str, price: Decimal) -> Self {
        self.set_price(symbol, price);
        self
    }

    pub fn set_price(&mut self, symbol: &str, price: Decimal) {
        self.quotes.insert(normalize_symbol(symbol), price);
    }
}

impl PriceSource for SimulatedPriceSource {
    async fn get_price(&self, symbol: &str) -> Result<Decimal, CollaboratorError> {
        let symbol = normalize_symbol(symbol);
        let price = *self
            .quotes
            .get(&symbol)
            .ok_or_else(|| CollaboratorError::UnknownSymbol(symbol.clone()))?;

        if price <= Decimal::ZERO {
            return Err(CollaboratorError::InvalidPrice { symbol, price });
        }
        Ok(price)
    }
}

/// Public spot ticker over HTTP, retried with exponential backoff.
pub struct HttpPriceSource {
    client: Client,
    base_url: String,
}

impl HttpPriceSource {
    /// Create a new price source against the default ticker API.
    pub fn new() -> Result<Self> {
        Self::with_base_url(TICKER_API_BASE.to_string())
    }

    /// Create with custom base URL (for testing).
    pub fn with_base_url(base_url: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, base_url })
    }
}

impl PriceSource for HttpPriceSource {
    async fn get_price(&self, symbol: &str) -> Result<Decimal, CollaboratorError> {
        let symbol = normalize_symbol(symbol);
        let url = format!("{}/api/v3/ticker/price?symbol={}", self.base_url, symbol);
        debug!(url = %url, "Fetching ticker");

        let policy = ExponentialBackoffBuilder::new()
            .with_max_elapsed_time(Some(MAX_RETRY_ELAPSED))
            .build();

        let client = &self.client;
        let url = url.as_str();
        let ticker: TickerResponse = backoff::future::retry(policy, || async move {
            let response = client
                .get(url)
                .send()
                .await
                .map_err(|e| backoff::Error::transient(CollaboratorError::from(e)))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let err = CollaboratorError::Status {
                    status: status.as_u16(),
                    body,
                };
                // Server-side and rate-limit failures are worth retrying
                if status.is_server_error() || status.as_u16() == 429 {
                    warn!(status = status.as_u16(), "Ticker request failed, retrying");
                    return Err(backoff::Error::transient(err));
                }
                return Err(backoff::Error::permanent(err));
            }

            response
                .json::<TickerResponse>()
                .await
                .map_err(|e| backoff::Error::permanent(CollaboratorError::from(e)))
        })
        .await?;
        debug!(symbol = %ticker.symbol, price = %ticker.price, "Ticker received");

        if ticker.price <= Decimal::ZERO {
            return Err(CollaboratorError::InvalidPrice {
                symbol,
                price: ticker.price,
            });
        }
        Ok(ticker.price)
    }
}
