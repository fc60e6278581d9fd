//! Direction-specific entry validation.
//!
//! Long entries want a fresh volatility expansion backed by indicator
//! agreement. Short entries want a confirmed downside break. Required checks
//! gate the entry; advisory checks are reported but never block.

use governance_core::types::{Direction, GovernanceContext, VolatilityPhase};
use serde::{Deserialize, Serialize};

/// Trend efficiency above which long momentum counts as persistent.
const LONG_MIN_TREND_EFFICIENCY: f64 = 0.55;
/// ADX above which long momentum counts as persistent.
const LONG_MIN_ADX: f64 = 25.0;
/// ADX a short entry must exceed (and be rising through).
const SHORT_MIN_ADX: f64 = 20.0;
const LONG_ADVISORY_STABILITY_RANK: f64 = 50.0;
const LONG_ADVISORY_AGGRESSIVENESS: f64 = 0.5;
const SHORT_ADVISORY_MAX_SHOCK: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckSeverity {
    Required,
    Advisory,
}

/// One named entry check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryCheck {
    pub name: String,
    pub severity: CheckSeverity,
    pub passed: bool,
    pub detail: String,
}

impl EntryCheck {
    fn required(name: &str, passed: bool, detail: String) -> Self {
        Self {
            name: name.to_string(),
            severity: CheckSeverity::Required,
            passed,
            detail,
        }
    }

    fn advisory(name: &str, passed: bool, detail: String) -> Self {
        Self {
            name: name.to_string(),
            severity: CheckSeverity::Advisory,
            passed,
            detail,
        }
    }
}

/// Outcome of entry validation for one direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryValidation {
    pub direction: Direction,
    pub checks: Vec<EntryCheck>,
    /// True when every required check passed.
    pub passed: bool,
}

impl EntryValidation {
    pub fn new(direction: Direction, checks: Vec<EntryCheck>) -> Self {
        let passed = checks
            .iter()
            .filter(|c| c.severity == CheckSeverity::Required)
            .all(|c| c.passed);
        Self {
            direction,
            checks,
            passed,
        }
    }

    /// Names of required checks that failed.
    pub fn failed_required(&self) -> Vec<&str> {
        self.checks
            .iter()
            .filter(|c| c.severity == CheckSeverity::Required && !c.passed)
            .map(|c| c.name.as_str())
            .collect()
    }

    /// Advisory checks that failed.
    pub fn warnings(&self) -> impl Iterator<Item = &EntryCheck> {
        self.checks
            .iter()
            .filter(|c| c.severity == CheckSeverity::Advisory && !c.passed)
    }
}

pub fn validate_entry(direction: Direction, ctx: &GovernanceContext) -> EntryValidation {
    let checks = match direction {
        Direction::Long => long_checks(ctx),
        Direction::Short => short_checks(ctx),
    };
    EntryValidation::new(direction, checks)
}

fn long_checks(ctx: &GovernanceContext) -> Vec<EntryCheck> {
    let phase = ctx.volatility_phase;
    vec![
        EntryCheck::required(
            "volatility_phase",
            matches!(phase, VolatilityPhase::Ignition | VolatilityPhase::Expansion),
            format!("phase {:?}", phase),
        ),
        EntryCheck::required(
            "indicator_coalition",
            ctx.indicator_coalition_confirmed,
            format!("coalition confirmed: {}", ctx.indicator_coalition_confirmed),
        ),
        EntryCheck::required(
            "phase_transition",
            ctx.prior_volatility_phase.is_valid_transition(phase),
            format!("{:?} -> {:?}", ctx.prior_volatility_phase, phase),
        ),
        EntryCheck::required(
            "momentum_persistence",
            ctx.trend_efficiency > LONG_MIN_TREND_EFFICIENCY || ctx.adx > LONG_MIN_ADX,
            format!(
                "trend efficiency {:.2}, ADX {:.1}",
                ctx.trend_efficiency, ctx.adx
            ),
        ),
        EntryCheck::advisory(
            "spread_stability",
            ctx.spread_stability_rank >= LONG_ADVISORY_STABILITY_RANK,
            format!("stability rank {:.0}", ctx.spread_stability_rank),
        ),
        EntryCheck::advisory(
            "session_aggressiveness",
            ctx.session_aggressiveness >= LONG_ADVISORY_AGGRESSIVENESS,
            format!("aggressiveness {:.2}", ctx.session_aggressiveness),
        ),
    ]
}

fn short_checks(ctx: &GovernanceContext) -> Vec<EntryCheck> {
    vec![
        EntryCheck::required(
            "donchian_lower_break",
            ctx.donchian_lower_break,
            format!("lower channel broken: {}", ctx.donchian_lower_break),
        ),
        EntryCheck::required(
            "adx_rising",
            ctx.adx > SHORT_MIN_ADX && ctx.adx_rising,
            format!("ADX {:.1}, rising: {}", ctx.adx, ctx.adx_rising),
        ),
        EntryCheck::required(
            "supertrend_bearish",
            ctx.supertrend_bearish,
            format!("supertrend bearish: {}", ctx.supertrend_bearish),
        ),
        EntryCheck::required(
            "post_break_ignition",
            ctx.post_break_ignition_candle,
            format!("ignition candle: {}", ctx.post_break_ignition_candle),
        ),
        EntryCheck::advisory(
            "volatility_expansion",
            ctx.volatility_phase.is_expanding(),
            format!("phase {:?}", ctx.volatility_phase),
        ),
        EntryCheck::advisory(
            "liquidity_stable",
            ctx.liquidity_shock_probability <= SHORT_ADVISORY_MAX_SHOCK,
            format!("shock probability {:.2}", ctx.liquidity_shock_probability),
        ),
    ]
}
