//! Agent Tracker
//!
//! Performance metrics, tier resolution and cached effective state for
//! trading agents.

pub mod history;
pub mod metrics;
pub mod stability;
pub mod store;
pub mod tiers;

pub use history::{InMemoryTradeHistory, TradeHistory};
pub use metrics::{profit_factor, AgentMetrics, PROFIT_FACTOR_SENTINEL};
pub use stability::StabilityScore;
pub use store::AgentStateStore;
pub use tiers::{AgentEffectiveState, Badge, EffectiveTier, RawTier, RescueStatus, TierResolver};
