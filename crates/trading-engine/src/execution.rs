//! Final execution decision for an admitted proposal.
//!
//! Combines the admission gate result, routing, regime and pair
//! authorization, entry validation, the agent's directive, safety checks and
//! sizing into one [`ExecutionDecision`]. A decision is permitted only when
//! nothing blocks it, and a blocked decision always carries a zero final
//! multiplier.

use chrono::{DateTime, Utc};
use governance_core::config::ExecutionConfig;
use governance_core::types::{
    AgentDirective, Direction, GovernanceContext, Pair, TradeProposal,
};
use risk_manager::GateResult;
use serde::{Deserialize, Serialize};
use std::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::entry::{validate_entry, EntryValidation};
use crate::router::{DirectionalRouter, RouteDecision};
use crate::sizing::{capital_multiplier, session_multiplier};
use crate::stop_geometry::{compute_stop_geometry, StopGeometry};

/// Everything the router needs to decide on one proposal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRequest {
    pub proposal: TradeProposal,
    pub context: GovernanceContext,
    pub gate: GateResult,
    /// Agent survivorship score, 0-100.
    pub survivorship_score: f64,
    #[serde(default)]
    pub directive: AgentDirective,
}

/// One pre-trade safety check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyCheck {
    pub name: String,
    pub passed: bool,
    pub detail: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionDecision {
    pub proposal_id: Uuid,
    pub agent_id: String,
    pub pair: Pair,
    pub direction: Direction,
    pub permitted: bool,
    /// Everything that blocked the trade, in evaluation order.
    pub block_reasons: Vec<String>,
    pub route: RouteDecision,
    pub pair_authorized: bool,
    pub regime_authorized: bool,
    pub entry: EntryValidation,
    pub stop: StopGeometry,
    pub capital_multiplier: f64,
    pub session_multiplier: f64,
    pub safety_checks: Vec<SafetyCheck>,
    /// clamp(capital x session x survivorship / reference, 0, max), then
    /// scaled by the gate's position scale (0.5 when throttled). Zero
    /// whenever the trade is not permitted.
    pub final_position_multiplier: f64,
    pub decided_at: DateTime<Utc>,
}

/// Counters for decisions made.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DecisionMetrics {
    pub decided: u64,
    pub permitted: u64,
    pub blocked: u64,
}

/// Turns admitted proposals into execution decisions.
pub struct ExecutionRouter {
    config: ExecutionConfig,
    router: DirectionalRouter,
    metrics: RwLock<DecisionMetrics>,
}

impl ExecutionRouter {
    pub fn new(config: ExecutionConfig, router: DirectionalRouter) -> Self {
        Self {
            config,
            router,
            metrics: RwLock::new(DecisionMetrics::default()),
        }
    }

    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    pub fn router(&self) -> &DirectionalRouter {
        &self.router
    }

    pub fn metrics(&self) -> DecisionMetrics {
        self.metrics
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn pair_authorized(&self, direction: Direction, pair: &Pair) -> bool {
        match direction {
            Direction::Long => true,
            Direction::Short => {
                self.config.short_authorized_pairs.is_empty()
                    || self.config.short_authorized_pairs.contains(pair.as_str())
            }
        }
    }

    fn safety_checks(&self, ctx: &GovernanceContext) -> Vec<SafetyCheck> {
        vec![
            SafetyCheck {
                name: "spread".to_string(),
                passed: ctx.spread_pips <= self.config.max_spread_pips,
                detail: format!(
                    "spread {:.2} pips (max {:.2})",
                    ctx.spread_pips, self.config.max_spread_pips
                ),
            },
            SafetyCheck {
                name: "liquidity".to_string(),
                passed: ctx.liquidity_shock_probability <= self.config.max_liquidity_shock,
                detail: format!(
                    "shock probability {:.2} (max {:.2})",
                    ctx.liquidity_shock_probability, self.config.max_liquidity_shock
                ),
            },
            SafetyCheck {
                name: "slippage".to_string(),
                passed: ctx.slippage_pips <= self.config.max_slippage_pips,
                detail: format!(
                    "slippage {:.2} pips (max {:.2})",
                    ctx.slippage_pips, self.config.max_slippage_pips
                ),
            },
        ]
    }

    /// Decide whether and how large to execute a proposal.
    pub fn decide(&self, request: &ExecutionRequest) -> ExecutionDecision {
        let proposal = &request.proposal;
        let ctx = &request.context;
        let directive = &request.directive;
        let direction = proposal.direction;
        let mut block_reasons = Vec::new();

        if request.gate.is_rejected() {
            let reasons = request.gate.reasons();
            if reasons.is_empty() {
                block_reasons.push("admission gate rejected".to_string());
            } else {
                block_reasons.push(format!("admission gate rejected: {}", reasons.join("; ")));
            }
        }

        let route = self
            .router
            .route(direction, &proposal.pair, &proposal.agent_id);
        if route.is_blocked() {
            block_reasons.push(format!("route blocked: {}", route.reason));
        }

        let pair_authorized = self.pair_authorized(direction, &proposal.pair);
        if !pair_authorized {
            block_reasons.push(format!(
                "pair {} not authorized for {}",
                proposal.pair, direction
            ));
        }

        let regime_authorized = ctx.regime.authorizes(direction);
        if !regime_authorized {
            block_reasons.push(format!(
                "regime {} does not authorize {}",
                ctx.regime, direction
            ));
        }

        let entry = validate_entry(direction, ctx);
        if !entry.passed {
            block_reasons.push(format!(
                "entry validation failed: {}",
                entry.failed_required().join(", ")
            ));
        }

        if self.config.suppressed_sessions.contains(&ctx.session) {
            block_reasons.push(format!("session {} suppressed", ctx.session));
        }

        let safety_checks = self.safety_checks(ctx);
        for check in safety_checks.iter().filter(|c| !c.passed) {
            block_reasons.push(format!("safety check failed: {}", check.detail));
        }

        if directive.blocks_direction(direction) {
            block_reasons.push(format!("agent blocked from {}", direction));
        }
        if directive.blocked_pairs.contains(&proposal.pair) {
            block_reasons.push(format!("agent blocked on pair {}", proposal.pair));
        }
        if directive.blocked_sessions.contains(&ctx.session) {
            block_reasons.push(format!("agent blocked in session {}", ctx.session));
        }
        if directive.threshold_raise > 0.0 {
            let required = self.config.raise_threshold_base + directive.threshold_raise;
            // NaN fails.
            if !(request.gate.adjusted_win_probability >= required) {
                block_reasons.push(format!(
                    "win probability {:.3} below raised threshold {:.3}",
                    request.gate.adjusted_win_probability, required
                ));
            }
        }

        let stop = compute_stop_geometry(direction, ctx, self.config.min_stop_distance_pips);
        let capital = capital_multiplier(
            direction,
            request.survivorship_score,
            directive.size_multiplier,
            self.config.short_capital_cap,
        );
        let session = session_multiplier(ctx.session);

        let final_position_multiplier = if block_reasons.is_empty() {
            let survivorship = if request.survivorship_score.is_finite() {
                request.survivorship_score.max(0.0)
            } else {
                0.0
            };
            let sized = capital * session * survivorship / self.config.survivorship_reference;
            let clamped = if sized.is_nan() {
                0.0
            } else {
                sized.clamp(0.0, self.config.max_position_multiplier)
            };
            let scaled = clamped * request.gate.position_scale.clamp(0.0, 1.0);
            if scaled > 0.0 {
                scaled
            } else {
                block_reasons.push(format!(
                    "final position multiplier is zero (capital {:.2}, session {:.2}, survivorship {:.1})",
                    capital, session, request.survivorship_score
                ));
                0.0
            }
        } else {
            0.0
        };

        let permitted = block_reasons.is_empty();

        {
            let mut metrics = self
                .metrics
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            metrics.decided += 1;
            if permitted {
                metrics.permitted += 1;
            } else {
                metrics.blocked += 1;
            }
        }

        if permitted {
            info!(
                proposal_id = %proposal.id,
                agent_id = %proposal.agent_id,
                pair = %proposal.pair,
                direction = %direction,
                engine = %route.engine,
                multiplier = final_position_multiplier,
                stop_pips = stop.stop_distance_pips,
                "Execution permitted"
            );
        } else {
            debug!(
                proposal_id = %proposal.id,
                agent_id = %proposal.agent_id,
                pair = %proposal.pair,
                direction = %direction,
                reasons = block_reasons.len(),
                "Execution blocked"
            );
        }

        ExecutionDecision {
            proposal_id: proposal.id,
            agent_id: proposal.agent_id.clone(),
            pair: proposal.pair.clone(),
            direction,
            permitted,
            block_reasons,
            route,
            pair_authorized,
            regime_authorized,
            entry,
            stop,
            capital_multiplier: capital,
            session_multiplier: session,
            safety_checks,
            final_position_multiplier,
            decided_at: Utc::now(),
        }
    }
}

impl Default for ExecutionRouter {
    fn default() -> Self {
        Self::new(ExecutionConfig::default(), DirectionalRouter::default())
    }
}
