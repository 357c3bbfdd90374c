//! Per-date trade counters used by the daily and per-symbol limits.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Trade counts for one UTC calendar date.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyStats {
    /// Trades recorded on this date
    pub total_count: u32,

    /// Trades recorded on this date, keyed by normalized symbol
    pub by_symbol_count: HashMap<String, u32>,
}

impl DailyStats {
    /// Count for a symbol; zero when it has not traded this date.
    pub fn symbol_count(&self, symbol: &str) -> u32 {
        self.by_symbol_count.get(symbol).copied().unwrap_or(0)
    }

    pub fn increment(&mut self, symbol: &str) {
        self.total_count += 1;
        *self.by_symbol_count.entry(symbol.to_string()).or_insert(0) += 1;
    }

    pub fn clear(&mut self) {
        self.total_count = 0;
        self.by_symbol_count.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_increment_and_clear() {
        let mut stats = DailyStats::default();
        assert_eq!(stats.symbol_count("BTCUSDT"), 0);

        stats.increment("BTCUSDT");
        stats.increment("BTCUSDT");
        stats.increment("ETHUSDT");

        assert_eq!(stats.total_count, 3);
        assert_eq!(stats.symbol_count("BTCUSDT"), 2);
        assert_eq!(stats.symbol_count("ETHUSDT"), 1);

        stats.clear();
        assert_eq!(stats, DailyStats::default());
    }
}
