//! Per-agent performance metrics in pips.

use governance_core::types::SideStats;
use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, Distribution};

/// Profit factor reported when an agent has gross profit but no losses.
pub const PROFIT_FACTOR_SENTINEL: f64 = 999.0;

/// Gross profit over gross loss, with a finite sentinel in place of
/// infinity.
pub fn profit_factor(gross_profit_pips: f64, gross_loss_pips: f64) -> f64 {
    if gross_loss_pips > 0.0 {
        gross_profit_pips / gross_loss_pips
    } else if gross_profit_pips > 0.0 {
        PROFIT_FACTOR_SENTINEL
    } else {
        0.0
    }
}

/// Performance metrics for one agent or one slice of its book.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentMetrics {
    pub trade_count: u64,
    pub wins: u64,
    pub win_rate: f64,
    /// Mean pips per trade.
    pub expectancy: f64,
    pub profit_factor: f64,
    pub net_pips: f64,
    pub gross_profit_pips: f64,
    pub gross_loss_pips: f64,

    // Only available when computed from individual trades
    pub pip_std_dev: Option<f64>,
    pub consistency_score: Option<f64>,
    pub winning_streak: u32,
    pub losing_streak: u32,
    /// Positive for a run of wins, negative for a run of losses.
    pub current_streak: i32,
}

impl AgentMetrics {
    /// Metrics from pre-aggregated counts. Distribution fields stay empty.
    pub fn from_side(stats: &SideStats) -> Self {
        let trade_count = stats.trades;
        let (win_rate, expectancy) = if trade_count > 0 {
            (
                stats.wins as f64 / trade_count as f64,
                stats.net_pips() / trade_count as f64,
            )
        } else {
            (0.0, 0.0)
        };

        Self {
            trade_count,
            wins: stats.wins,
            win_rate,
            expectancy,
            profit_factor: profit_factor(stats.gross_profit_pips, stats.gross_loss_pips),
            net_pips: stats.net_pips(),
            gross_profit_pips: stats.gross_profit_pips,
            gross_loss_pips: stats.gross_loss_pips,
            ..Self::default()
        }
    }

    /// Metrics from individual trade results in pips, in close order.
    /// Non-finite results are skipped.
    pub fn from_pips(pips: &[f64]) -> Self {
        let pips: Vec<f64> = pips.iter().copied().filter(|p| p.is_finite()).collect();
        let mut stats = SideStats::default();
        for p in &pips {
            stats.record(*p);
        }

        let (winning_streak, losing_streak, current_streak) = streaks(&pips);
        Self {
            pip_std_dev: std_dev(&pips),
            consistency_score: consistency(&pips),
            winning_streak,
            losing_streak,
            current_streak,
            ..Self::from_side(&stats)
        }
    }
}

fn std_dev(pips: &[f64]) -> Option<f64> {
    if pips.len() < 2 {
        return None;
    }
    Data::new(pips.to_vec()).std_dev()
}

/// Share of winning trades discounted by the coefficient of variation.
fn consistency(pips: &[f64]) -> Option<f64> {
    if pips.len() < 5 {
        return None;
    }

    let profitable = pips.iter().filter(|&&p| p > 0.0).count() as f64;
    let profit_rate = profitable / pips.len() as f64;

    let data = Data::new(pips.to_vec());
    let cv = match (data.mean(), data.std_dev()) {
        (Some(mean), Some(std)) if mean != 0.0 => (std / mean.abs()).min(2.0),
        _ => 1.0,
    };

    Some(profit_rate / (1.0 + cv))
}

fn streaks(pips: &[f64]) -> (u32, u32, i32) {
    let mut max_win = 0u32;
    let mut max_lose = 0u32;
    let mut current_win = 0u32;
    let mut current_lose = 0u32;
    let mut current = 0i32;

    for &p in pips {
        if p > 0.0 {
            current_win += 1;
            current_lose = 0;
            current = current_win as i32;
            max_win = max_win.max(current_win);
        } else {
            current_lose += 1;
            current_win = 0;
            current = -(current_lose as i32);
            max_lose = max_lose.max(current_lose);
        }
    }

    (max_win, max_lose, current)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profit_factor_sentinel() {
        assert_eq!(profit_factor(50.0, 0.0), PROFIT_FACTOR_SENTINEL);
        assert_eq!(profit_factor(0.0, 0.0), 0.0);
        assert!((profit_factor(130.0, 100.0) - 1.3).abs() < 1e-12);
    }

    #[test]
    fn test_from_side() {
        let stats = SideStats {
            trades: 60,
            wins: 33,
            gross_profit_pips: 104.0,
            gross_loss_pips: 80.0,
        };
        let m = AgentMetrics::from_side(&stats);
        assert!((m.expectancy - 0.4).abs() < 1e-12);
        assert!((m.profit_factor - 1.3).abs() < 1e-12);
        assert!((m.win_rate - 0.55).abs() < 1e-12);
        assert!(m.pip_std_dev.is_none());
    }

    #[test]
    fn test_empty_side_is_zero() {
        let m = AgentMetrics::from_side(&SideStats::default());
        assert_eq!(m.trade_count, 0);
        assert_eq!(m.expectancy, 0.0);
        assert_eq!(m.profit_factor, 0.0);
    }

    #[test]
    fn test_from_pips_streaks_and_spread() {
        let m = AgentMetrics::from_pips(&[10.0, 12.0, -5.0, 8.0, 9.0, 11.0, -3.0, -4.0]);
        assert_eq!(m.trade_count, 8);
        assert_eq!(m.wins, 5);
        assert_eq!(m.winning_streak, 3);
        assert_eq!(m.losing_streak, 2);
        assert_eq!(m.current_streak, -2);
        assert!(m.pip_std_dev.unwrap() > 0.0);
        let consistency = m.consistency_score.unwrap();
        assert!(consistency > 0.0 && consistency < 1.0);
    }

    #[test]
    fn test_consistency_needs_five_trades() {
        let m = AgentMetrics::from_pips(&[10.0, -2.0, 4.0]);
        assert!(m.consistency_score.is_none());
        assert!(m.pip_std_dev.is_some());
    }
}
