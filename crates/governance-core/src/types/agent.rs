//! Agent-level types shared between the tier resolver and the router.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::market::{Direction, Pair, Session};

/// A constraint placed on an agent's live trading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentConstraint {
    BlockDirection { direction: Direction },
    BlockPair { pair: Pair },
    BlockSession { session: Session },
    /// Require the adjusted win probability to clear the base floor by
    /// `delta` before admission.
    RaiseThreshold { delta: f64 },
}

impl AgentConstraint {
    pub fn describe(&self) -> String {
        match self {
            AgentConstraint::BlockDirection { direction } => format!("block {} trades", direction),
            AgentConstraint::BlockPair { pair } => format!("block pair {}", pair),
            AgentConstraint::BlockSession { session } => format!("block session {}", session),
            AgentConstraint::RaiseThreshold { delta } => {
                format!("raise win-probability threshold by {:.2}", delta)
            }
        }
    }
}

/// The part of an agent's effective state the execution router reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentDirective {
    pub size_multiplier: f64,
    #[serde(default)]
    pub blocked_directions: HashSet<Direction>,
    #[serde(default)]
    pub blocked_pairs: HashSet<Pair>,
    #[serde(default)]
    pub blocked_sessions: HashSet<Session>,
    #[serde(default)]
    pub threshold_raise: f64,
}

impl Default for AgentDirective {
    /// An agent with no recorded state trades at full size, unconstrained.
    fn default() -> Self {
        Self {
            size_multiplier: 1.0,
            blocked_directions: HashSet::new(),
            blocked_pairs: HashSet::new(),
            blocked_sessions: HashSet::new(),
            threshold_raise: 0.0,
        }
    }
}

impl AgentDirective {
    /// Build a directive from a size multiplier and a constraint set.
    pub fn from_constraints(size_multiplier: f64, constraints: &[AgentConstraint]) -> Self {
        let mut directive = Self {
            size_multiplier,
            ..Self::default()
        };
        for constraint in constraints {
            match constraint {
                AgentConstraint::BlockDirection { direction } => {
                    directive.blocked_directions.insert(*direction);
                }
                AgentConstraint::BlockPair { pair } => {
                    directive.blocked_pairs.insert(pair.clone());
                }
                AgentConstraint::BlockSession { session } => {
                    directive.blocked_sessions.insert(*session);
                }
                AgentConstraint::RaiseThreshold { delta } => {
                    directive.threshold_raise = directive.threshold_raise.max(*delta);
                }
            }
        }
        directive
    }

    pub fn blocks_direction(&self, direction: Direction) -> bool {
        self.blocked_directions.contains(&direction)
    }
}

/// Pre-aggregated statistics for one side (or all) of an agent's book.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SideStats {
    pub trades: u64,
    pub wins: u64,
    /// Sum of winning pips (positive).
    pub gross_profit_pips: f64,
    /// Sum of losing pips (positive).
    pub gross_loss_pips: f64,
}

impl SideStats {
    pub fn net_pips(&self) -> f64 {
        self.gross_profit_pips - self.gross_loss_pips
    }

    /// Accumulate one trade's pip result.
    pub fn record(&mut self, pips: f64) {
        self.trades += 1;
        if pips > 0.0 {
            self.wins += 1;
            self.gross_profit_pips += pips;
        } else {
            self.gross_loss_pips += -pips;
        }
    }

    pub fn merge(&self, other: &SideStats) -> SideStats {
        SideStats {
            trades: self.trades + other.trades,
            wins: self.wins + other.wins,
            gross_profit_pips: self.gross_profit_pips + other.gross_profit_pips,
            gross_loss_pips: self.gross_loss_pips + other.gross_loss_pips,
        }
    }
}

/// Pre-aggregated per-agent stats for the lightweight resolution path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentStats {
    pub agent_id: String,
    #[serde(default)]
    pub long: SideStats,
    #[serde(default)]
    pub short: SideStats,
}

impl AgentStats {
    pub fn new(agent_id: impl Into<String>, long: SideStats, short: SideStats) -> Self {
        Self {
            agent_id: agent_id.into(),
            long,
            short,
        }
    }

    pub fn combined(&self) -> SideStats {
        self.long.merge(&self.short)
    }

    pub fn side(&self, direction: Direction) -> &SideStats {
        match direction {
            Direction::Long => &self.long,
            Direction::Short => &self.short,
        }
    }
}
