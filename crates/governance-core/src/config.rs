//! Configuration management for the trade governance engine.
//!
//! Every threshold the engine uses lives here with its default. Configuration
//! can come from the process environment ([`EngineConfig::from_env`]) or from
//! a file layered with `GOVERNANCE__` environment overrides
//! ([`EngineConfig::from_file`]).

use crate::types::Session;
use crate::{GovernanceError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::env;
use std::path::Path;

/// Ceiling for the short-side capital multiplier; configs may lower it only.
pub const SHORT_CAPITAL_CAP_LIMIT: f64 = 0.25;

/// Outer band for the adjusted win probability; configs may narrow it only.
pub const WIN_PROBABILITY_FLOOR: f64 = 0.30;
pub const WIN_PROBABILITY_CEILING: f64 = 0.88;

/// Engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub gates: GateConfig,
    pub execution: ExecutionConfig,
    pub health: HealthConfig,
    pub tiers: TierConfig,
    pub rollback: RollbackConfig,
}

/// Admission gate thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// G1 fires below this friction ratio.
    pub min_friction_ratio: f64,
    /// G2 fires below this alignment score.
    pub min_alignment_score: f64,
    /// G2 also fires when fewer timeframes than this are aligned.
    pub min_aligned_timeframes: usize,
    /// G3 fires above this shock probability (outside ignition).
    pub max_liquidity_shock: f64,
    /// G4 fires below this spread stability rank.
    pub min_spread_stability_rank: f64,
    /// G5 fires below this pair expectancy rank.
    pub min_pair_expectancy_rank: f64,
    /// G7 fires below this session aggressiveness.
    pub min_session_aggressiveness: f64,
    /// G9 fires in exhaustion at or above this confidence.
    pub exhaustion_confidence: f64,
    /// G10 fires above this spread/ATR fraction.
    pub max_spread_to_atr: f64,
    /// Governance score deducted per soft gate fired.
    pub score_penalty_per_gate: f64,
    /// Position scale applied to throttled proposals.
    pub throttle_scale: f64,
    /// Adjusted win probability clamp, within [`WIN_PROBABILITY_FLOOR`,
    /// `WIN_PROBABILITY_CEILING`].
    pub min_win_probability: f64,
    pub max_win_probability: f64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            min_friction_ratio: 3.0,
            min_alignment_score: 40.0,
            min_aligned_timeframes: 2,
            max_liquidity_shock: 0.60,
            min_spread_stability_rank: 30.0,
            min_pair_expectancy_rank: 25.0,
            min_session_aggressiveness: 0.25,
            exhaustion_confidence: 0.60,
            max_spread_to_atr: 0.25,
            score_penalty_per_gate: 12.0,
            throttle_scale: 0.5,
            min_win_probability: 0.30,
            max_win_probability: 0.88,
        }
    }
}

/// Execution router thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Maximum spread accepted by the safety check, in pips.
    pub max_spread_pips: f64,
    /// Maximum slippage accepted by the safety check, in pips.
    pub max_slippage_pips: f64,
    /// Liquidity counts as confirmed at or below this shock probability.
    pub max_liquidity_shock: f64,
    /// Hard cap on the short-side capital multiplier, at most
    /// [`SHORT_CAPITAL_CAP_LIMIT`].
    pub short_capital_cap: f64,
    /// Upper clamp of the final position multiplier.
    pub max_position_multiplier: f64,
    /// Survivorship score that maps to a neutral final multiplier.
    pub survivorship_reference: f64,
    /// Sessions in which no new entries are made.
    pub suppressed_sessions: HashSet<Session>,
    /// Pairs the short engine may trade. Empty means every pair.
    pub short_authorized_pairs: HashSet<String>,
    /// Smallest stop distance ever produced, in pips.
    pub min_stop_distance_pips: f64,
    /// Win-probability floor that an agent's threshold raise is added to.
    /// Agents without a raise are not held to it.
    pub raise_threshold_base: f64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_spread_pips: 3.0,
            max_slippage_pips: 1.0,
            max_liquidity_shock: 0.70,
            short_capital_cap: 0.25,
            max_position_multiplier: 2.0,
            survivorship_reference: 75.0,
            suppressed_sessions: [Session::Rollover].into_iter().collect(),
            short_authorized_pairs: HashSet::new(),
            min_stop_distance_pips: 0.1,
            raise_threshold_base: 0.50,
        }
    }
}

/// Post-entry health monitor thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    pub validation_window_bars: u32,
    /// Window used when the volatility score is below `low_volatility_score`.
    pub low_volatility_window_bars: u32,
    pub low_volatility_score: f64,
    /// Progress fails when MFE (in R) stays below this after the window.
    pub min_progress_mfe_r: f64,
    /// Unrealized R below which a critical trade is flagged for exit.
    pub consider_exit_r: f64,
    pub healthy_threshold: f64,
    pub caution_threshold: f64,
    pub sick_threshold: f64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            validation_window_bars: 3,
            low_volatility_window_bars: 4,
            low_volatility_score: 30.0,
            min_progress_mfe_r: 0.25,
            consider_exit_r: -0.35,
            healthy_threshold: 70.0,
            caution_threshold: 45.0,
            sick_threshold: 30.0,
        }
    }
}

/// Tier resolver thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TierConfig {
    /// Fewer trades than this resolve to tier C.
    pub min_trades: u64,
    pub tier_a_min_trades: u64,
    pub tier_a_profit_factor: f64,
    pub tier_b_profit_factor: f64,
    pub tier_c_profit_factor: f64,
    /// Short side is destructive below this net pips...
    pub short_destructive_net_pips: f64,
    /// ...over more than this many short trades.
    pub short_destructive_min_trades: u64,
    pub rescue_profit_factor: f64,
    pub promotion_profit_factor: f64,
    /// A rescued agent becomes promotable at this profit factor...
    pub rescued_promotable_profit_factor: f64,
    /// ...over at least this many trades.
    pub rescued_promotable_min_trades: u64,
    /// Pairs and sessions are blocked below this net pips...
    pub segment_block_net_pips: f64,
    /// ...over at least this many trades.
    pub segment_block_min_trades: u64,
    pub legacy_threshold_raise: f64,
    pub size_tier_a: f64,
    pub size_rescued: f64,
    pub size_promotable: f64,
    pub size_legacy: f64,
    pub size_tier_c: f64,
}

impl Default for TierConfig {
    fn default() -> Self {
        Self {
            min_trades: 20,
            tier_a_min_trades: 50,
            tier_a_profit_factor: 1.5,
            tier_b_profit_factor: 0.8,
            tier_c_profit_factor: 0.5,
            short_destructive_net_pips: -500.0,
            short_destructive_min_trades: 50,
            rescue_profit_factor: 1.2,
            promotion_profit_factor: 1.1,
            rescued_promotable_profit_factor: 1.5,
            rescued_promotable_min_trades: 100,
            segment_block_net_pips: -250.0,
            segment_block_min_trades: 20,
            legacy_threshold_raise: 0.05,
            size_tier_a: 1.0,
            size_rescued: 0.5,
            size_promotable: 0.75,
            size_legacy: 0.35,
            size_tier_c: 0.25,
        }
    }
}

/// Ensemble rollback hysteresis band.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RollbackConfig {
    /// Activate when performance falls below this fraction of baseline.
    pub activate_ratio: f64,
    /// Once active, deactivate only above this fraction of baseline.
    pub recover_ratio: f64,
}

impl Default for RollbackConfig {
    fn default() -> Self {
        Self {
            activate_ratio: 0.80,
            recover_ratio: 1.05,
        }
    }
}

fn env_f64(key: &str, default: f64) -> f64 {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl EngineConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();
        let config = Self {
            gates: GateConfig {
                min_friction_ratio: env_f64(
                    "GOVERNANCE_MIN_FRICTION_RATIO",
                    defaults.gates.min_friction_ratio,
                ),
                max_liquidity_shock: env_f64(
                    "GOVERNANCE_MAX_LIQUIDITY_SHOCK",
                    defaults.gates.max_liquidity_shock,
                ),
                min_spread_stability_rank: env_f64(
                    "GOVERNANCE_MIN_SPREAD_STABILITY_RANK",
                    defaults.gates.min_spread_stability_rank,
                ),
                throttle_scale: env_f64("GOVERNANCE_THROTTLE_SCALE", defaults.gates.throttle_scale),
                ..defaults.gates
            },
            execution: ExecutionConfig {
                max_spread_pips: env_f64(
                    "GOVERNANCE_MAX_SPREAD_PIPS",
                    defaults.execution.max_spread_pips,
                ),
                max_slippage_pips: env_f64(
                    "GOVERNANCE_MAX_SLIPPAGE_PIPS",
                    defaults.execution.max_slippage_pips,
                ),
                short_capital_cap: env_f64(
                    "GOVERNANCE_SHORT_CAPITAL_CAP",
                    defaults.execution.short_capital_cap,
                ),
                short_authorized_pairs: env::var("GOVERNANCE_SHORT_PAIRS")
                    .map(|s| {
                        s.split(',')
                            .map(|p| p.trim().to_uppercase())
                            .filter(|p| !p.is_empty())
                            .collect()
                    })
                    .unwrap_or_default(),
                ..defaults.execution
            },
            health: defaults.health,
            tiers: TierConfig {
                short_destructive_net_pips: env_f64(
                    "GOVERNANCE_SHORT_DESTRUCTIVE_NET_PIPS",
                    defaults.tiers.short_destructive_net_pips,
                ),
                short_destructive_min_trades: env_u64(
                    "GOVERNANCE_SHORT_DESTRUCTIVE_MIN_TRADES",
                    defaults.tiers.short_destructive_min_trades,
                ),
                ..defaults.tiers
            },
            rollback: RollbackConfig {
                activate_ratio: env_f64(
                    "GOVERNANCE_ROLLBACK_ACTIVATE_RATIO",
                    defaults.rollback.activate_ratio,
                ),
                recover_ratio: env_f64(
                    "GOVERNANCE_ROLLBACK_RECOVER_RATIO",
                    defaults.rollback.recover_ratio,
                ),
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file (TOML, JSON, YAML or anything else the
    /// `config` crate recognizes by extension), layered with
    /// `GOVERNANCE__SECTION__KEY` environment overrides.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let settings = config::Config::builder()
            .add_source(config::File::from(path))
            .add_source(
                config::Environment::with_prefix("GOVERNANCE")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "Loaded engine configuration");
        Ok(config)
    }

    /// Reject configurations whose bands are inverted or out of range.
    pub fn validate(&self) -> Result<()> {
        let rollback = &self.rollback;
        if !(rollback.activate_ratio > 0.0 && rollback.activate_ratio < rollback.recover_ratio) {
            return Err(GovernanceError::Config {
                message: format!(
                    "rollback activate_ratio ({}) must be positive and below recover_ratio ({})",
                    rollback.activate_ratio, rollback.recover_ratio
                ),
            });
        }

        let gates = &self.gates;
        let band = WIN_PROBABILITY_FLOOR..=WIN_PROBABILITY_CEILING;
        if !(band.contains(&gates.min_win_probability)
            && band.contains(&gates.max_win_probability)
            && gates.min_win_probability <= gates.max_win_probability)
        {
            return Err(GovernanceError::Config {
                message: format!(
                    "win probability bounds ({}, {}) must satisfy {} <= min <= max <= {}",
                    gates.min_win_probability,
                    gates.max_win_probability,
                    WIN_PROBABILITY_FLOOR,
                    WIN_PROBABILITY_CEILING
                ),
            });
        }

        if !(0.0..=1.0).contains(&gates.throttle_scale) {
            return Err(GovernanceError::Config {
                message: format!("throttle_scale ({}) must be within [0, 1]", gates.throttle_scale),
            });
        }

        let health = &self.health;
        if !(health.healthy_threshold > health.caution_threshold
            && health.caution_threshold > health.sick_threshold)
        {
            return Err(GovernanceError::Config {
                message: "health thresholds must be strictly descending".to_string(),
            });
        }

        if !(0.0..=SHORT_CAPITAL_CAP_LIMIT).contains(&self.execution.short_capital_cap) {
            return Err(GovernanceError::Config {
                message: format!(
                    "short_capital_cap ({}) must be within [0, {}]",
                    self.execution.short_capital_cap, SHORT_CAPITAL_CAP_LIMIT
                ),
            });
        }

        if !(self.execution.survivorship_reference > 0.0) {
            return Err(GovernanceError::Config {
                message: "survivorship_reference must be > 0".to_string(),
            });
        }

        Ok(())
    }
}
