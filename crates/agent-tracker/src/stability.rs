//! Display-only stability score for agents.
//!
//! Each component is normalized to [0.0, 1.0] and weighted into a 0-100
//! total. The score never feeds tier decisions.

use serde::{Deserialize, Serialize};

use crate::metrics::AgentMetrics;

/// Component weights, in score points.
pub const WIN_RATE_WEIGHT: f64 = 30.0;
pub const EXPECTANCY_WEIGHT: f64 = 30.0;
pub const PROFIT_FACTOR_WEIGHT: f64 = 20.0;
pub const SAMPLE_WEIGHT: f64 = 20.0;

/// Normalization targets: the raw value that scores 1.0.
const TARGET_WIN_RATE: f64 = 0.6;
const TARGET_EXPECTANCY_PIPS: f64 = 2.0;
const TARGET_PROFIT_FACTOR_EDGE: f64 = 1.0;
const TARGET_TRADES: f64 = 200.0;

fn unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StabilityScore {
    pub win_rate_score: f64,
    pub expectancy_score: f64,
    pub profit_factor_score: f64,
    pub sample_score: f64,
    /// Weighted total, 0-100.
    pub total: f64,
}

impl StabilityScore {
    pub fn from_metrics(metrics: &AgentMetrics) -> Self {
        let win_rate_score = unit(metrics.win_rate / TARGET_WIN_RATE);
        let expectancy_score = unit(metrics.expectancy / TARGET_EXPECTANCY_PIPS);
        let profit_factor_score =
            unit((metrics.profit_factor - 1.0) / TARGET_PROFIT_FACTOR_EDGE);
        let sample_score = unit(metrics.trade_count as f64 / TARGET_TRADES);

        let total = win_rate_score * WIN_RATE_WEIGHT
            + expectancy_score * EXPECTANCY_WEIGHT
            + profit_factor_score * PROFIT_FACTOR_WEIGHT
            + sample_score * SAMPLE_WEIGHT;

        Self {
            win_rate_score,
            expectancy_score,
            profit_factor_score,
            sample_score,
            total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weights_sum_to_hundred() {
        let sum = WIN_RATE_WEIGHT + EXPECTANCY_WEIGHT + PROFIT_FACTOR_WEIGHT + SAMPLE_WEIGHT;
        assert!((sum - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_perfect_agent_scores_hundred() {
        let metrics = AgentMetrics {
            trade_count: 400,
            win_rate: 0.7,
            expectancy: 3.0,
            profit_factor: 2.5,
            ..AgentMetrics::default()
        };
        assert!((StabilityScore::from_metrics(&metrics).total - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_partial_scores() {
        let metrics = AgentMetrics {
            trade_count: 100,
            win_rate: 0.3,
            expectancy: 1.0,
            profit_factor: 1.5,
            ..AgentMetrics::default()
        };
        // 15 + 15 + 10 + 10
        let score = StabilityScore::from_metrics(&metrics);
        assert!((score.total - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_losing_agent_floors_components() {
        let metrics = AgentMetrics {
            trade_count: 0,
            win_rate: 0.0,
            expectancy: -4.0,
            profit_factor: 0.2,
            ..AgentMetrics::default()
        };
        assert_eq!(StabilityScore::from_metrics(&metrics).total, 0.0);
    }
}
