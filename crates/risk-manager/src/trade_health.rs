//! Post-entry health scoring for open positions.
//!
//! Health is re-scored on every tick from price progress (normalized to the
//! initial risk unit R), indicator persistence, and regime drift. The monitor
//! never closes a position; it only recommends trailing-stop tightening and
//! add-blocking through a [`GovernanceAction`].

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use governance_core::config::HealthConfig;
use governance_core::types::Direction;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::admission::clamp_finite;

/// Smallest risk unit used for R normalization, in pips.
const MIN_R_PIPS: f64 = 1e-6;

/// Component weights. They sum to 1.0.
pub const WEIGHT_PROGRESS: f64 = 0.34;
pub const WEIGHT_PERSISTENCE: f64 = 0.18;
pub const WEIGHT_ACCELERATION: f64 = 0.14;
pub const WEIGHT_REGIME: f64 = 0.22;
pub const WEIGHT_DRIFT: f64 = 0.12;

/// Drift score used while the validation window is still open.
const DRIFT_GRACE_SCORE: f64 = 50.0;

/// Snapshot of an open position at one re-evaluation tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeHealthInput {
    pub position_id: Uuid,
    pub direction: Direction,
    pub entry_price: Decimal,
    pub current_price: Decimal,
    /// Initial stop price; its distance from entry defines R.
    pub initial_stop_price: Decimal,
    /// Best price reached since entry in the trade's favor.
    pub best_price: Decimal,
    pub pip_size: Decimal,
    pub bars_elapsed: u32,
    /// 0-100.
    pub volatility_score: f64,
    /// Momentum persistence (0-1) at entry and now.
    pub persistence_at_entry: f64,
    pub persistence_now: f64,
    /// Price acceleration (0-1) at entry and now.
    pub acceleration_at_entry: f64,
    pub acceleration_now: f64,
    /// 0-100.
    pub regime_stability: f64,
    #[serde(default)]
    pub regime_diverging: bool,
    #[serde(default)]
    pub regime_early_warning: bool,
}

/// Health classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthBand {
    Healthy,
    Caution,
    Sick,
    Critical,
}

/// Kind of governance action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GovernanceActionKind {
    Maintain,
    Tighten,
    /// Tighten, and the caller should consider exiting.
    ConsiderExit,
}

/// Trailing-stop governance recommendation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GovernanceAction {
    pub kind: GovernanceActionKind,
    /// Multiplier applied to the trailing distance (1.0 = unchanged).
    pub trailing_tighten_factor: f64,
    pub block_adds: bool,
    pub reason: String,
}

/// The five weighted health components, each 0-100.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HealthComponents {
    pub progress: f64,
    pub persistence_delta: f64,
    pub acceleration_delta: f64,
    pub regime_stability: f64,
    pub drift_penalty: f64,
}

impl HealthComponents {
    pub fn weighted(&self) -> f64 {
        self.progress * WEIGHT_PROGRESS
            + self.persistence_delta * WEIGHT_PERSISTENCE
            + self.acceleration_delta * WEIGHT_ACCELERATION
            + self.regime_stability * WEIGHT_REGIME
            + self.drift_penalty * WEIGHT_DRIFT
    }
}

/// Health of an open position at one tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeHealthResult {
    pub position_id: Uuid,
    /// Initial risk unit, in pips.
    pub r_pips: f64,
    /// Maximum favorable excursion, in R.
    pub mfe_r: f64,
    /// Current unrealized excursion, in R.
    pub unrealized_r: f64,
    pub components: HealthComponents,
    /// 0-100.
    pub score: f64,
    pub band: HealthBand,
    pub validation_window: u32,
    pub progress_fail: bool,
    pub action: GovernanceAction,
    pub evaluated_at: DateTime<Utc>,
}

/// Scores open positions.
#[derive(Debug, Clone, Default)]
pub struct HealthMonitor {
    config: HealthConfig,
}

impl HealthMonitor {
    pub fn new(config: HealthConfig) -> Self {
        Self { config }
    }

    /// Bars a trade gets to show progress before it can fail.
    pub fn validation_window(&self, volatility_score: f64) -> u32 {
        if volatility_score < self.config.low_volatility_score {
            self.config.low_volatility_window_bars
        } else {
            self.config.validation_window_bars
        }
    }

    /// Compute the health of an open position.
    pub fn compute_health(&self, input: &TradeHealthInput) -> TradeHealthResult {
        let cfg = &self.config;
        let sign = Decimal::from(input.direction.sign());
        let pip = if input.pip_size > Decimal::ZERO {
            input.pip_size
        } else {
            Decimal::new(1, 4)
        };

        // Overflowing price arithmetic counts as zero pips.
        let to_pips = |d: Option<Decimal>| {
            d.and_then(|d| d.checked_div(pip))
                .and_then(|v| v.to_f64())
                .unwrap_or(0.0)
        };
        let directed = |price: Decimal| {
            price
                .checked_sub(input.entry_price)
                .and_then(|d| d.checked_mul(sign))
        };
        let r_pips = to_pips(
            input
                .entry_price
                .checked_sub(input.initial_stop_price)
                .map(|d| d.abs()),
        )
        .max(MIN_R_PIPS);
        let favorable_pips = to_pips(directed(input.best_price)).max(0.0);
        let unrealized_pips = to_pips(directed(input.current_price));

        let mfe_r = favorable_pips / r_pips;
        let unrealized_r = unrealized_pips / r_pips;

        let window = self.validation_window(input.volatility_score);
        let window_elapsed = input.bars_elapsed >= window;
        let progress_fail = window_elapsed && mfe_r < cfg.min_progress_mfe_r;

        let progress = 0.5 * clamp_finite(mfe_r * 100.0, 0.0, 100.0)
            + 0.5 * clamp_finite(50.0 + unrealized_r * 50.0, 0.0, 100.0);
        let persistence_delta = clamp_finite(
            50.0 + (input.persistence_now - input.persistence_at_entry) * 100.0,
            0.0,
            100.0,
        );
        let acceleration_delta = clamp_finite(
            50.0 + (input.acceleration_now - input.acceleration_at_entry) * 100.0,
            0.0,
            100.0,
        );
        let mut regime_stability = input.regime_stability;
        if input.regime_diverging {
            regime_stability -= 25.0;
        }
        if input.regime_early_warning {
            regime_stability -= 15.0;
        }
        let regime_stability = clamp_finite(regime_stability, 0.0, 100.0);

        let drift_penalty = if window_elapsed {
            let adverse = 100.0 * (-unrealized_r).max(0.0);
            let stalled = 100.0 * (0.5 - mfe_r).max(0.0);
            clamp_finite(100.0 - adverse - stalled, 0.0, 100.0)
        } else {
            DRIFT_GRACE_SCORE
        };

        let components = HealthComponents {
            progress,
            persistence_delta,
            acceleration_delta,
            regime_stability,
            drift_penalty,
        };
        let score = clamp_finite(components.weighted(), 0.0, 100.0);

        let mut band = self.band_for(score);
        if progress_fail && (input.regime_diverging || input.regime_early_warning) {
            band = HealthBand::Critical;
        }

        let action = self.action_for(band, unrealized_r, progress_fail);

        debug!(
            position_id = %input.position_id,
            score,
            band = ?band,
            mfe_r,
            unrealized_r,
            progress_fail,
            "Computed trade health"
        );

        TradeHealthResult {
            position_id: input.position_id,
            r_pips,
            mfe_r,
            unrealized_r,
            components,
            score,
            band,
            validation_window: window,
            progress_fail,
            action,
            evaluated_at: Utc::now(),
        }
    }

    /// Band implied by the weighted score alone.
    pub fn band_for(&self, score: f64) -> HealthBand {
        if score >= self.config.healthy_threshold {
            HealthBand::Healthy
        } else if score >= self.config.caution_threshold {
            HealthBand::Caution
        } else if score >= self.config.sick_threshold {
            HealthBand::Sick
        } else {
            HealthBand::Critical
        }
    }

    fn action_for(&self, band: HealthBand, unrealized_r: f64, progress_fail: bool) -> GovernanceAction {
        let suffix = if progress_fail { " (progress failed)" } else { "" };
        match band {
            HealthBand::Healthy => GovernanceAction {
                kind: GovernanceActionKind::Maintain,
                trailing_tighten_factor: 1.0,
                block_adds: false,
                reason: "healthy: maintain trailing stop".to_string(),
            },
            HealthBand::Caution => GovernanceAction {
                kind: GovernanceActionKind::Tighten,
                trailing_tighten_factor: 0.8,
                block_adds: true,
                reason: format!("caution: tighten trailing 20%{}", suffix),
            },
            HealthBand::Sick => GovernanceAction {
                kind: GovernanceActionKind::Tighten,
                trailing_tighten_factor: 0.6,
                block_adds: true,
                reason: format!("sick: tighten trailing 40%{}", suffix),
            },
            HealthBand::Critical => {
                let consider_exit = unrealized_r < self.config.consider_exit_r;
                GovernanceAction {
                    kind: if consider_exit {
                        GovernanceActionKind::ConsiderExit
                    } else {
                        GovernanceActionKind::Tighten
                    },
                    trailing_tighten_factor: 0.5,
                    block_adds: true,
                    reason: if consider_exit {
                        format!(
                            "critical: tighten trailing 50%, consider exit at {:.2}R{}",
                            unrealized_r, suffix
                        )
                    } else {
                        format!("critical: tighten trailing 50%{}", suffix)
                    },
                }
            }
        }
    }
}

/// Latest health result per open position.
///
/// Entries live from the first tick until the caller removes them at close.
pub struct PositionHealthTracker {
    monitor: HealthMonitor,
    latest: DashMap<Uuid, TradeHealthResult>,
}

impl PositionHealthTracker {
    pub fn new(monitor: HealthMonitor) -> Self {
        Self {
            monitor,
            latest: DashMap::new(),
        }
    }

    /// Score a position and record the result, logging band changes.
    pub fn evaluate(&self, input: &TradeHealthInput) -> TradeHealthResult {
        let result = self.monitor.compute_health(input);

        if let Some(previous) = self.latest.get(&input.position_id) {
            if previous.band != result.band {
                info!(
                    position_id = %input.position_id,
                    from = ?previous.band,
                    to = ?result.band,
                    score = result.score,
                    "Position health band changed"
                );
            }
        }

        self.latest.insert(input.position_id, result.clone());
        result
    }

    pub fn latest(&self, position_id: &Uuid) -> Option<TradeHealthResult> {
        self.latest.get(position_id).map(|r| r.clone())
    }

    /// Discard a position's health at close.
    pub fn remove(&self, position_id: &Uuid) -> Option<TradeHealthResult> {
        self.latest.remove(position_id).map(|(_, r)| r)
    }

    /// Positions currently in the given band.
    pub fn positions_in(&self, band: HealthBand) -> Vec<Uuid> {
        self.latest
            .iter()
            .filter(|entry| entry.band == band)
            .map(|entry| *entry.key())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.latest.len()
    }

    pub fn is_empty(&self) -> bool {
        self.latest.is_empty()
    }
}
