//! Per-user trading session: owns the ledger and the daily counters.
//!
//! Handles:
//! - Sizing queries against unutilized capital
//! - Gating proposals against today's counters
//! - Submitting approved orders to the broker
//! - Recording filled trades and resetting today's limits

mod ledger;

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use tracing::{error, info};

use crate::api::{BrokerGateway, BrokerOrder};
use crate::models::{DailyStats, OrderTicket, StopMode, Trade};
use crate::trading::{ApprovedTrade, PositionSizer, RiskConfig, SizingResult, TradeError, TradeGate};

pub use ledger::Ledger;

/// A trade that was filled by the broker and recorded.
#[derive(Debug, Clone)]
pub struct Execution {
    pub trade: Trade,
    pub broker_status: String,
}

/// One user's desk state. Not shared between users.
pub struct Session {
    config: RiskConfig,
    sizer: PositionSizer,
    gate: TradeGate,
    ledger: Ledger,
    daily: HashMap<NaiveDate, DailyStats>,
    last_id: i64,
}

impl Session {
    pub fn new(config: RiskConfig) -> Self {
        Self {
            sizer: PositionSizer::new(config.clone()),
            gate: TradeGate::new(&config),
            config,
            ledger: Ledger::new(),
            daily: HashMap::new(),
            last_id: 0,
        }
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn unutilized_capital(&self, balance: Decimal) -> Decimal {
        self.ledger.unutilized_capital(balance)
    }

    /// Counters for `date`, created on first access.
    pub fn stats_for(&mut self, date: NaiveDate) -> &DailyStats {
        self.daily.entry(date).or_default()
    }

    // ==================== Sizing ====================

    /// Suggested size for an entry and stop, given the current ledger.
    pub fn size(
        &mut self,
        balance: Decimal,
        entry_price: Decimal,
        stop_mode: StopMode,
        stop_value: Decimal,
        now: DateTime<Utc>,
    ) -> SizingResult {
        self.daily.entry(now.date_naive()).or_default();

        let unutilized = self.unutilized_capital(balance);
        self.sizer
            .size_position(unutilized, entry_price, stop_mode, stop_value)
    }

    /// Size the ticket and run it through the gate. Nothing is recorded.
    pub fn prepare(
        &mut self,
        ticket: &OrderTicket,
        balance: Decimal,
        now: DateTime<Utc>,
    ) -> Result<ApprovedTrade, TradeError> {
        let unutilized = self.ledger.unutilized_capital(balance);
        let sizing = self.sizer.size_position(
            unutilized,
            ticket.entry_price,
            ticket.stop_mode,
            ticket.stop_value,
        );
        let today = self.daily.entry(now.date_naive()).or_default();

        self.gate
            .validate_and_prepare(ticket, today, &sizing, unutilized)
    }

    // ==================== Recording ====================

    /// Append a trade and bump its date's counters. Not idempotent.
    pub fn record(&mut self, trade: Trade) {
        self.daily
            .entry(trade.date)
            .or_default()
            .increment(&trade.symbol);

        info!(
            id = trade.id,
            symbol = %trade.symbol,
            side = trade.side.as_str(),
            units = %trade.units,
            leverage = %trade.leverage,
            notional = %trade.notional,
            "Trade recorded"
        );

        self.last_id = self.last_id.max(trade.id);
        self.ledger.append(trade);
    }

    /// Gate, submit, and record on fill.
    ///
    /// A broker failure leaves the ledger and counters untouched.
    pub async fn execute<B: BrokerGateway>(
        &mut self,
        ticket: &OrderTicket,
        balance: Decimal,
        broker: &B,
        now: DateTime<Utc>,
    ) -> Result<Execution, TradeError> {
        let approved = self.prepare(ticket, balance, now)?;
        let order = BrokerOrder::new(ticket, &approved);

        let broker_status = match broker.submit_order(&order).await {
            Ok(status) => status,
            Err(e) => {
                error!(symbol = %order.symbol, error = %e, "Order submission failed");
                return Err(TradeError::Broker(e));
            }
        };

        let trade = Trade::new(self.next_id(now), now, ticket, approved.units, approved.leverage);
        self.record(trade.clone());

        Ok(Execution {
            trade,
            broker_status,
        })
    }

    /// Clear today's trades and counters; returns how many trades were removed.
    pub fn reset_daily(&mut self, today: NaiveDate) -> usize {
        let removed = self.ledger.remove_on(today);
        self.daily.entry(today).or_default().clear();

        info!(date = %today, removed = removed, "Daily limits reset");
        removed
    }

    /// Millisecond timestamp, bumped past the last id when two trades share one.
    fn next_id(&self, now: DateTime<Utc>) -> i64 {
        now.timestamp_millis().max(self.last_id + 1)
    }
}
