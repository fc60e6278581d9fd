//! Closed-trade records supplied by the trade history store.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::market::{Direction, Pair, RegimeLabel, Session};

/// A single closed trade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClosedTrade {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub agent_id: String,
    pub pair: Pair,
    pub direction: Direction,
    pub entry_price: Decimal,
    pub exit_price: Decimal,
    pub opened_at: DateTime<Utc>,
    pub closed_at: DateTime<Utc>,
    #[serde(default)]
    pub session: Option<Session>,
    #[serde(default)]
    pub regime: Option<RegimeLabel>,
}

impl ClosedTrade {
    /// Signed result in pips, positive when the trade made money.
    pub fn pips(&self) -> Decimal {
        let raw = (self.exit_price - self.entry_price) * Decimal::from(self.direction.sign());
        raw / self.pair.pip_size()
    }

    /// Signed result in pips as `f64` for statistics.
    pub fn pips_f64(&self) -> f64 {
        self.pips().to_f64().unwrap_or(0.0)
    }

    pub fn is_win(&self) -> bool {
        self.pips() > Decimal::ZERO
    }

    /// Holding period in hours.
    pub fn holding_hours(&self) -> f64 {
        (self.closed_at - self.opened_at).num_seconds() as f64 / 3600.0
    }
}
