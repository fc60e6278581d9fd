//! Trailing stops governed by post-entry health.
//!
//! A trailing stop follows the best price reached and triggers on pullback.
//! Governance actions can only tighten the trailing distance and block
//! adds; nothing here ever widens a stop or closes a position by itself.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use governance_core::types::Direction;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::trade_health::{GovernanceAction, GovernanceActionKind};

/// A trailing stop attached to an open position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrailingStopRule {
    pub position_id: Uuid,
    pub direction: Direction,
    pub entry_price: Decimal,
    /// Distance the stop was opened with. Tightening factors apply to this,
    /// never to an already tightened distance.
    pub base_distance: Decimal,
    /// Distance between the best price and the stop, in price units.
    pub trail_distance: Decimal,
    /// Best price reached in the trade's favor.
    pub best_price: Decimal,
    pub stop_price: Decimal,
    pub adds_blocked: bool,
    /// Whether the caller has been told to consider exiting.
    pub exit_flagged: bool,
    pub tightenings: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TrailingStopRule {
    /// Create a trailing stop whose initial stop sits `stop_distance` from
    /// entry.
    pub fn new(
        position_id: Uuid,
        direction: Direction,
        entry_price: Decimal,
        stop_distance: Decimal,
    ) -> Self {
        let now = Utc::now();
        let distance = stop_distance.abs();
        Self {
            position_id,
            direction,
            entry_price,
            base_distance: distance,
            trail_distance: distance,
            best_price: entry_price,
            stop_price: Self::stop_from(direction, entry_price, distance),
            adds_blocked: false,
            exit_flagged: false,
            tightenings: 0,
            created_at: now,
            updated_at: now,
        }
    }

    fn stop_from(direction: Direction, best: Decimal, distance: Decimal) -> Decimal {
        match direction {
            Direction::Long => best - distance,
            Direction::Short => best + distance,
        }
    }

    /// Move the stop only in the trade's favor.
    fn ratchet(&mut self, candidate: Decimal) {
        let improves = match self.direction {
            Direction::Long => candidate > self.stop_price,
            Direction::Short => candidate < self.stop_price,
        };
        if improves {
            self.stop_price = candidate;
        }
    }

    /// Update with a new price. Returns true when the stop is hit.
    pub fn update_price(&mut self, price: Decimal) -> bool {
        let new_best = match self.direction {
            Direction::Long => price > self.best_price,
            Direction::Short => price < self.best_price,
        };
        if new_best {
            self.best_price = price;
            let candidate = Self::stop_from(self.direction, self.best_price, self.trail_distance);
            self.ratchet(candidate);
            self.updated_at = Utc::now();
            debug!(
                position_id = %self.position_id,
                best = %self.best_price,
                stop = %self.stop_price,
                "Trailing stop advanced"
            );
        }

        self.is_triggered(price)
    }

    pub fn is_triggered(&self, price: Decimal) -> bool {
        match self.direction {
            Direction::Long => price <= self.stop_price,
            Direction::Short => price >= self.stop_price,
        }
    }

    /// Apply a governance action. The distance becomes `base_distance`
    /// times the factor when that is tighter than the current distance, so
    /// repeating an action changes nothing. Factors at or above 1.0 leave the
    /// distance unchanged.
    pub fn apply(&mut self, action: &GovernanceAction) {
        if action.block_adds {
            self.adds_blocked = true;
        }
        if action.kind == GovernanceActionKind::ConsiderExit {
            self.exit_flagged = true;
        }

        let factor = action.trailing_tighten_factor;
        if factor.is_finite() && factor > 0.0 && factor < 1.0 {
            let target = Decimal::from_f64(factor).and_then(|f| self.base_distance.checked_mul(f));
            if let Some(target) = target.filter(|t| *t < self.trail_distance) {
                self.trail_distance = target;
                let candidate =
                    Self::stop_from(self.direction, self.best_price, self.trail_distance);
                self.ratchet(candidate);
                self.tightenings += 1;
                self.updated_at = Utc::now();
            }
        }
    }
}

/// A trailing stop that was hit.
#[derive(Debug, Clone)]
pub struct TriggeredStop {
    pub rule: TrailingStopRule,
    pub trigger_price: Decimal,
    pub current_price: Decimal,
}

/// Trailing stops for every open position.
#[derive(Default)]
pub struct TrailingStopGovernor {
    rules: DashMap<Uuid, TrailingStopRule>,
}

impl TrailingStopGovernor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, rule: TrailingStopRule) {
        info!(
            position_id = %rule.position_id,
            direction = %rule.direction,
            stop = %rule.stop_price,
            "Registered trailing stop"
        );
        self.rules.insert(rule.position_id, rule);
    }

    /// Feed a price. Returns the triggered stop, if any; the caller decides
    /// whether to exit.
    pub fn on_price(&self, position_id: &Uuid, price: Decimal) -> Option<TriggeredStop> {
        let mut rule = self.rules.get_mut(position_id)?;
        if rule.update_price(price) {
            return Some(TriggeredStop {
                trigger_price: rule.stop_price,
                current_price: price,
                rule: rule.clone(),
            });
        }
        None
    }

    /// Apply a health governance action to a position's stop.
    pub fn apply_action(&self, position_id: &Uuid, action: &GovernanceAction) -> bool {
        match self.rules.get_mut(position_id) {
            Some(mut rule) => {
                rule.apply(action);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, position_id: &Uuid) -> Option<TrailingStopRule> {
        self.rules.get(position_id).map(|r| r.clone())
    }

    pub fn adds_blocked(&self, position_id: &Uuid) -> bool {
        self.rules
            .get(position_id)
            .map(|r| r.adds_blocked)
            .unwrap_or(false)
    }

    /// Drop a position's stop at close.
    pub fn remove(&self, position_id: &Uuid) -> Option<TrailingStopRule> {
        self.rules.remove(position_id).map(|(_, r)| r)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
