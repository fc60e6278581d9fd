//! Trade proposals submitted for admission.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::market::{Direction, Pair};

/// Range of expected payoff in pips.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PayoffRange {
    pub min: f64,
    pub max: f64,
}

impl PayoffRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Midpoint of the range, never negative.
    pub fn mid(&self) -> f64 {
        ((self.min + self.max) / 2.0).max(0.0)
    }
}

/// A candidate trade. Created once per signal and never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeProposal {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub agent_id: String,
    pub pair: Pair,
    pub direction: Direction,
    /// Base win-probability estimate (0-1) before governance adjustment.
    pub base_win_probability: f64,
    /// Expected winning payoff, in pips.
    pub win_payoff: PayoffRange,
    /// Expected losing payoff, in pips (positive numbers).
    pub loss_payoff: PayoffRange,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl TradeProposal {
    /// Create a new proposal.
    pub fn new(
        agent_id: impl Into<String>,
        pair: impl Into<Pair>,
        direction: Direction,
        base_win_probability: f64,
        win_payoff: PayoffRange,
        loss_payoff: PayoffRange,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            agent_id: agent_id.into(),
            pair: pair.into(),
            direction,
            base_win_probability,
            win_payoff,
            loss_payoff,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payoff_mid() {
        assert_eq!(PayoffRange::new(10.0, 20.0).mid(), 15.0);
        assert_eq!(PayoffRange::new(-10.0, 4.0).mid(), 0.0);
    }

    #[test]
    fn test_proposal_defaults_id_and_timestamp() {
        let json = r#"{
            "agent_id": "agent-7",
            "pair": "eur_usd",
            "direction": "long",
            "base_win_probability": 0.55,
            "win_payoff": { "min": 12.0, "max": 20.0 },
            "loss_payoff": { "min": 8.0, "max": 10.0 }
        }"#;
        let proposal: TradeProposal = serde_json::from_str(json).unwrap();
        assert_eq!(proposal.direction, Direction::Long);
        assert_eq!(proposal.win_payoff.mid(), 16.0);
        assert!(!proposal.id.is_nil());
    }
}
