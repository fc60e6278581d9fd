//! Initial stop placement.

use governance_core::types::{Direction, GovernanceContext};
use serde::{Deserialize, Serialize};

/// Initial stop geometry handed to the position executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopGeometry {
    pub direction: Direction,
    /// Stop distance in multiples of ATR.
    pub initial_stop_r: f64,
    pub stop_distance_pips: f64,
    pub trailing_enabled: bool,
    pub volatility_adaptive: bool,
}

/// Confidence at which the trail adapts to volatility.
const ADAPTIVE_CONFIDENCE: f64 = 0.5;

fn long_stop_r(stability_rank: f64) -> f64 {
    if stability_rank >= 70.0 {
        1.0
    } else if stability_rank >= 40.0 {
        1.25
    } else {
        1.5
    }
}

fn short_stop_r(stability_rank: f64) -> f64 {
    if stability_rank >= 60.0 {
        1.35
    } else {
        1.5
    }
}

/// Compute the initial stop. The distance is never below
/// `min_distance_pips`, and a short stop is never inside twice the spread.
pub fn compute_stop_geometry(
    direction: Direction,
    ctx: &GovernanceContext,
    min_distance_pips: f64,
) -> StopGeometry {
    let floor = if min_distance_pips.is_finite() && min_distance_pips > 0.0 {
        min_distance_pips
    } else {
        f64::EPSILON
    };

    let (initial_stop_r, candidates) = match direction {
        Direction::Long => {
            let r = long_stop_r(ctx.spread_stability_rank);
            (r, vec![r * ctx.atr_pips, ctx.spread_pips])
        }
        Direction::Short => {
            let r = short_stop_r(ctx.spread_stability_rank);
            (
                r,
                vec![
                    r * ctx.atr_pips,
                    ctx.swing_distance_pips + ctx.spread_pips,
                    2.0 * ctx.spread_pips,
                ],
            )
        }
    };

    // f64::max discards NaN candidates.
    let stop_distance_pips = candidates.into_iter().fold(floor, f64::max);

    StopGeometry {
        direction,
        initial_stop_r,
        stop_distance_pips,
        trailing_enabled: ctx.volatility_phase.is_expanding(),
        volatility_adaptive: ctx.volatility_confidence >= ADAPTIVE_CONFIDENCE,
    }
}
