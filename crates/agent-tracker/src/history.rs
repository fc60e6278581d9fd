//! Closed-trade history sources.

use dashmap::DashMap;
use governance_core::types::ClosedTrade;
use governance_core::Result;

/// Source of an agent's closed trades.
#[cfg_attr(test, mockall::automock)]
pub trait TradeHistory: Send + Sync {
    /// Closed trades for `agent_id`, in any order.
    fn closed_trades(&self, agent_id: &str) -> Result<Vec<ClosedTrade>>;
}

/// Trade history held in memory, keyed by agent.
#[derive(Default)]
pub struct InMemoryTradeHistory {
    trades: DashMap<String, Vec<ClosedTrade>>,
}

impl InMemoryTradeHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, trade: ClosedTrade) {
        self.trades
            .entry(trade.agent_id.clone())
            .or_default()
            .push(trade);
    }

    pub fn extend(&self, trades: impl IntoIterator<Item = ClosedTrade>) {
        for trade in trades {
            self.record(trade);
        }
    }

    pub fn agent_ids(&self) -> Vec<String> {
        self.trades.iter().map(|e| e.key().clone()).collect()
    }

    pub fn trade_count(&self, agent_id: &str) -> usize {
        self.trades.get(agent_id).map(|t| t.len()).unwrap_or(0)
    }
}

impl TradeHistory for InMemoryTradeHistory {
    fn closed_trades(&self, agent_id: &str) -> Result<Vec<ClosedTrade>> {
        Ok(self
            .trades
            .get(agent_id)
            .map(|t| t.clone())
            .unwrap_or_default())
    }
}
