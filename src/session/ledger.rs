//! Capital ledger: the ordered list of recorded trades.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::models::Trade;

/// Capital left after margin committed by `trades`, floored at zero.
///
/// Margin per trade is `notional / max(leverage, 1)`. Every recorded trade
/// counts, whatever date it was recorded on.
pub fn unutilized_capital(balance: Decimal, trades: &[Trade]) -> Decimal {
    let used: Decimal = trades.iter().map(Trade::margin).sum();
    (balance - used).max(Decimal::ZERO)
}

/// Recorded trades, newest first.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    trades: Vec<Trade>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert at the front so the newest trade comes first.
    pub fn append(&mut self, trade: Trade) {
        self.trades.insert(0, trade);
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn len(&self) -> usize {
        self.trades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }

    /// Total margin committed by recorded trades.
    pub fn used_margin(&self) -> Decimal {
        self.trades.iter().map(Trade::margin).sum()
    }

    pub fn unutilized_capital(&self, balance: Decimal) -> Decimal {
        unutilized_capital(balance, &self.trades)
    }

    /// Drop every trade recorded on `date`; returns how many were removed.
    pub fn remove_on(&mut self, date: NaiveDate) -> usize {
        let before = self.trades.len();
        self.trades.retain(|t| t.date != date);
        before - self.trades.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OrderTicket, Side, StopMode};
    use chrono::{Duration, TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn trade(id: i64, days_ago: i64, units: Decimal, leverage: Decimal) -> Trade {
        let time = Utc.with_ymd_and_hms(2024, 5, 20, 12, 0, 0).unwrap() - Duration::days(days_ago);
        let ticket = OrderTicket::new("BTCUSDT", Side::Long, dec!(1000), StopMode::Points, dec!(5));
        Trade::new(id, time, &ticket, units, leverage)
    }

    #[test]
    fn test_unutilized_after_one_trade() {
        let mut ledger = Ledger::new();
        ledger.append(trade(1, 0, dec!(4), dec!(1)));

        assert_eq!(ledger.unutilized_capital(dec!(10000)), dec!(6000));
        // Same answer when asked again
        assert_eq!(ledger.unutilized_capital(dec!(10000)), dec!(6000));
    }

    #[test]
    fn test_leverage_reduces_margin() {
        let trades = vec![trade(1, 0, dec!(4), dec!(2)), trade(2, 0, dec!(1), dec!(0.5))];
        // 4000 / 2 + 1000 / 1
        assert_eq!(unutilized_capital(dec!(10000), &trades), dec!(7000));
    }

    #[test]
    fn test_never_negative() {
        let trades = vec![trade(1, 0, dec!(20), dec!(1))];
        assert_eq!(unutilized_capital(dec!(10000), &trades), Decimal::ZERO);
        assert_eq!(unutilized_capital(dec!(10000), &[]), dec!(10000));
    }

    #[test]
    fn test_prior_days_still_count() {
        let mut ledger = Ledger::new();
        ledger.append(trade(1, 1, dec!(2), dec!(1)));
        ledger.append(trade(2, 0, dec!(3), dec!(1)));

        assert_eq!(ledger.used_margin(), dec!(5000));
        assert_eq!(ledger.unutilized_capital(dec!(10000)), dec!(5000));
    }

    #[test]
    fn test_newest_first_and_remove_on() {
        let mut ledger = Ledger::new();
        ledger.append(trade(1, 1, dec!(1), dec!(1)));
        ledger.append(trade(2, 0, dec!(1), dec!(1)));
        ledger.append(trade(3, 0, dec!(1), dec!(1)));

        let ids: Vec<_> = ledger.trades().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);

        let today = NaiveDate::from_ymd_opt(2024, 5, 20).unwrap();
        assert_eq!(ledger.remove_on(today), 2);
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.trades()[0].id, 1);
    }
}
