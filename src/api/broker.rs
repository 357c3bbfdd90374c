//! Broker gateway: the finalized order and a paper implementation.

use std::sync::atomic::{AtomicU64, Ordering};

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;

use crate::models::{normalize_symbol, OrderTicket, OrderType, Side, TakeProfit};
use crate::trading::ApprovedTrade;

use super::{BrokerGateway, CollaboratorError};

/// Order tuple handed to the broker once the gate has approved it.
#[derive(Debug, Clone, Serialize)]
pub struct BrokerOrder {
    pub symbol: String,
    pub side: Side,
    pub order_type: OrderType,
    pub entry_price: Decimal,
    pub stop_loss_price: Decimal,
    pub units: Decimal,
    pub leverage: Decimal,
    pub take_profits: Vec<TakeProfit>,
}

impl BrokerOrder {
    pub fn new(ticket: &OrderTicket, approved: &ApprovedTrade) -> Self {
        Self {
            symbol: normalize_symbol(&ticket.symbol),
            side: ticket.side,
            order_type: ticket.order_type,
            entry_price: ticket.entry_price,
            stop_loss_price: ticket
                .stop_mode
                .stop_price(ticket.side, ticket.entry_price, ticket.stop_value),
            units: approved.units,
            leverage: approved.leverage,
            take_profits: ticket.take_profits.clone(),
        }
    }
}

/// Simulated broker: fills every order and reports a fixed balance.
pub struct PaperBroker {
    balance: Decimal,
    next_order: AtomicU64,
}

impl PaperBroker {
    pub fn new(balance: Decimal) -> Self {
        Self {
            balance,
            next_order: AtomicU64::new(1),
        }
    }
}

impl BrokerGateway for PaperBroker {
    async fn submit_order(&self, order: &BrokerOrder) -> Result<String, CollaboratorError> {
        let order_no = self.next_order.fetch_add(1, Ordering::SeqCst);

        info!(
            order = order_no,
            symbol = %order.symbol,
            side = order.side.as_str(),
            order_type = order.order_type.as_str(),
            units = %order.units,
            leverage = %order.leverage,
            entry = %order.entry_price,
            stop = %order.stop_loss_price,
            "[PAPER] Order filled"
        );

        Ok(format!("FILLED paper-{}", order_no))
    }

    async fn fetch_balance(&self) -> Result<Decimal, CollaboratorError> {
        Ok(self.balance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StopMode;
    use rust_decimal_macros::dec;

    #[test]
    fn test_paper_broker_fills_in_sequence() {
        let broker = PaperBroker::new(dec!(10000));
        let ticket = OrderTicket::new("BTCUSDT", Side::Short, dec!(1000), StopMode::Percent, dec!(1))
            .with_order_type(OrderType::Limit);
        let approved = ApprovedTrade {
            units: dec!(2),
            leverage: dec!(1),
            notional: dec!(2000),
            margin_required: dec!(2000),
        };
        let order = BrokerOrder::new(&ticket, &approved);
        assert_eq!(order.stop_loss_price, dec!(1010));

        tokio_test::block_on(async {
            assert_eq!(broker.submit_order(&order).await.unwrap(), "FILLED paper-1");
            assert_eq!(broker.submit_order(&order).await.unwrap(), "FILLED paper-2");
            assert_eq!(broker.fetch_balance().await.unwrap(), dec!(10000));
        });
    }
}
