//! Hysteretic ensemble rollback.
//!
//! Rollback activates when performance drops below a fraction of the recorded
//! baseline and, once active, only releases when performance clears a higher
//! recovery bar. The gap between the two ratios keeps noisy short-window
//! metrics from flapping the flag.

use chrono::{DateTime, Utc};
use governance_core::config::RollbackConfig;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;
use tracing::{debug, info, warn};

/// A change of rollback state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RollbackTransition {
    Activated,
    Deactivated,
}

/// Result of one rollback evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollbackDecision {
    /// Whether rollback is active after this evaluation.
    pub active: bool,
    /// current / baseline, `None` when the baseline is unusable.
    pub ratio: Option<f64>,
    pub transition: Option<RollbackTransition>,
    pub reason: String,
}

/// Current rollback state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RollbackState {
    pub active: bool,
    pub activated_at: Option<DateTime<Utc>>,
    pub deactivated_at: Option<DateTime<Utc>>,
    pub last_ratio: Option<f64>,
    pub last_baseline: Option<f64>,
    /// Times rollback has activated since construction or reset.
    pub activations: u32,
}

/// Ensemble rollback evaluator.
///
/// One instance owns one hysteresis flag; construct it explicitly and share
/// it by reference rather than through a global.
pub struct RollbackEvaluator {
    config: RollbackConfig,
    state: RwLock<RollbackState>,
    /// Fast path flag for checking if rollback is active.
    is_active: AtomicBool,
}

impl RollbackEvaluator {
    /// Create a new evaluator with rollback inactive.
    pub fn new(config: RollbackConfig) -> Self {
        Self {
            config,
            state: RwLock::new(RollbackState::default()),
            is_active: AtomicBool::new(false),
        }
    }

    /// Restore a previously persisted state.
    pub fn with_state(config: RollbackConfig, state: RollbackState) -> Self {
        let is_active = AtomicBool::new(state.active);
        Self {
            config,
            state: RwLock::new(state),
            is_active,
        }
    }

    /// Check if rollback is currently active (fast path).
    pub fn is_active(&self) -> bool {
        self.is_active.load(Ordering::SeqCst)
    }

    /// Snapshot of the current state, for persistence by the caller.
    pub fn state(&self) -> RollbackState {
        self.state
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Evaluate current performance against the baseline.
    ///
    /// A baseline that is zero, negative or not finite leaves the state
    /// untouched: the ratio is undefined, so it can neither activate nor
    /// release rollback.
    pub fn evaluate(&self, current: f64, baseline: f64) -> RollbackDecision {
        let mut state = self
            .state
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if !(baseline.is_finite() && baseline > 0.0) || !current.is_finite() {
            debug!(current, baseline, "Rollback skipped: unusable baseline or metric");
            return RollbackDecision {
                active: state.active,
                ratio: None,
                transition: None,
                reason: "baseline or metric unusable; state unchanged".to_string(),
            };
        }

        let ratio = current / baseline;
        state.last_ratio = Some(ratio);
        state.last_baseline = Some(baseline);

        let transition = if !state.active && ratio < self.config.activate_ratio {
            state.active = true;
            state.activated_at = Some(Utc::now());
            state.activations += 1;
            warn!(
                ratio,
                threshold = self.config.activate_ratio,
                activations = state.activations,
                "Ensemble rollback activated"
            );
            Some(RollbackTransition::Activated)
        } else if state.active && ratio > self.config.recover_ratio {
            state.active = false;
            state.deactivated_at = Some(Utc::now());
            info!(
                ratio,
                threshold = self.config.recover_ratio,
                "Ensemble rollback released"
            );
            Some(RollbackTransition::Deactivated)
        } else {
            None
        };

        self.is_active.store(state.active, Ordering::SeqCst);

        let reason = match (state.active, transition) {
            (true, Some(_)) => format!(
                "performance at {:.0}% of baseline, below {:.0}%",
                ratio * 100.0,
                self.config.activate_ratio * 100.0
            ),
            (false, Some(_)) => format!(
                "performance recovered to {:.0}% of baseline, above {:.0}%",
                ratio * 100.0,
                self.config.recover_ratio * 100.0
            ),
            (true, None) => format!(
                "holding rollback: {:.0}% of baseline has not cleared {:.0}%",
                ratio * 100.0,
                self.config.recover_ratio * 100.0
            ),
            (false, None) => format!("performance at {:.0}% of baseline", ratio * 100.0),
        };

        RollbackDecision {
            active: state.active,
            ratio: Some(ratio),
            transition,
            reason,
        }
    }

    /// Manually clear rollback.
    pub fn reset(&self) {
        let mut state = self
            .state
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if state.active {
            info!("Ensemble rollback manually reset");
            state.deactivated_at = Some(Utc::now());
        }
        state.active = false;
        self.is_active.store(false, Ordering::SeqCst);
    }
}

impl Default for RollbackEvaluator {
    fn default() -> Self {
        Self::new(RollbackConfig::default())
    }
}
