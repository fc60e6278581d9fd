//! End-to-end governance pipeline.
//!
//! Wires admission, execution routing, post-entry health, tier resolution
//! and ensemble rollback around one explicitly constructed
//! [`GovernanceState`]. Everything except that state is a pure function of
//! its inputs.

use agent_tracker::{AgentEffectiveState, AgentStateStore, TierResolver, TradeHistory};
use governance_core::types::{AgentStats, GovernanceContext, Pair, TradeProposal};
use governance_core::{EngineConfig, Result};
use risk_manager::{
    AdmissionGate, GateResult, HealthMonitor, PositionHealthTracker, RollbackDecision,
    RollbackEvaluator, TradeHealthInput, TradeHealthResult, TrailingStopGovernor,
    TrailingStopRule,
};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};
use trading_engine::{
    validate_router_integrity, DirectionalRouter, ExecutionDecision, ExecutionRequest,
    ExecutionRouter,
};
use uuid::Uuid;

/// Mutable state shared by everything that governs live trades.
pub struct GovernanceState {
    pub agents: AgentStateStore,
    pub rollback: RollbackEvaluator,
    pub health: PositionHealthTracker,
    pub stops: TrailingStopGovernor,
}

impl GovernanceState {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            agents: AgentStateStore::new(),
            rollback: RollbackEvaluator::new(config.rollback.clone()),
            health: PositionHealthTracker::new(HealthMonitor::new(config.health.clone())),
            stops: TrailingStopGovernor::new(),
        }
    }
}

/// Gate and execution outcome for one proposal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposalOutcome {
    pub gate: GateResult,
    pub execution: ExecutionDecision,
    /// Whether ensemble rollback was active when the proposal was evaluated.
    pub rollback_active: bool,
}

pub struct GovernancePipeline {
    gate: AdmissionGate,
    execution: ExecutionRouter,
    resolver: TierResolver,
    state: Arc<GovernanceState>,
}

impl GovernancePipeline {
    /// Build a pipeline with fresh state.
    pub fn new(config: EngineConfig, router: DirectionalRouter) -> Result<Self> {
        let state = Arc::new(GovernanceState::new(&config));
        Self::with_state(config, router, state)
    }

    /// Build a pipeline around existing state.
    pub fn with_state(
        config: EngineConfig,
        router: DirectionalRouter,
        state: Arc<GovernanceState>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            gate: AdmissionGate::new(config.gates),
            execution: ExecutionRouter::new(config.execution, router),
            resolver: TierResolver::new(config.tiers),
            state,
        })
    }

    pub fn state(&self) -> &Arc<GovernanceState> {
        &self.state
    }

    pub fn router(&self) -> &DirectionalRouter {
        self.execution.router()
    }

    /// Validate the live router configuration. Callers should halt on error.
    pub fn check_router_integrity(&self, pairs: &[Pair], agent_ids: &[String]) -> Result<()> {
        validate_router_integrity(&self.execution.router().config(), pairs, agent_ids)
    }

    /// Run a proposal through admission and the execution router.
    pub fn evaluate(
        &self,
        proposal: &TradeProposal,
        context: &GovernanceContext,
        survivorship_score: f64,
    ) -> ProposalOutcome {
        let gate = self.gate.evaluate(proposal, context);
        let request = ExecutionRequest {
            proposal: proposal.clone(),
            context: context.clone(),
            gate: gate.clone(),
            survivorship_score,
            directive: self.state.agents.directive(&proposal.agent_id),
        };
        let execution = self.execution.decide(&request);
        let rollback_active = self.state.rollback.is_active();

        debug!(
            proposal_id = %proposal.id,
            decision = ?gate.decision,
            permitted = execution.permitted,
            multiplier = execution.final_position_multiplier,
            rollback_active,
            "Proposal evaluated"
        );

        ProposalOutcome {
            gate,
            execution,
            rollback_active,
        }
    }

    /// Attach a trailing stop to a newly opened position. Returns `None`
    /// when the decision was blocked or its geometry does not trail.
    pub fn open_position(
        &self,
        decision: &ExecutionDecision,
        position_id: Uuid,
        entry_price: Decimal,
    ) -> Option<TrailingStopRule> {
        if !decision.permitted || !decision.stop.trailing_enabled {
            return None;
        }

        let distance = Decimal::from_f64(decision.stop.stop_distance_pips)?
            * decision.pair.pip_size();
        let rule = TrailingStopRule::new(position_id, decision.direction, entry_price, distance);
        self.state.stops.register(rule.clone());
        Some(rule)
    }

    /// Score an open position and apply the resulting action to its stop.
    pub fn monitor(&self, input: &TradeHealthInput) -> TradeHealthResult {
        let result = self.state.health.evaluate(input);
        self.state
            .stops
            .apply_action(&input.position_id, &result.action);
        result
    }

    /// Forget a closed position.
    pub fn close_position(&self, position_id: &Uuid) {
        self.state.health.remove(position_id);
        self.state.stops.remove(position_id);
    }

    /// Resolve an agent from aggregated stats and cache the result.
    pub fn resolve_agent(&self, stats: &AgentStats) -> AgentEffectiveState {
        let state = self.resolver.resolve_from_stats(stats);
        self.state.agents.insert(state.clone());
        state
    }

    /// Resolve an agent from its trade history and cache the result.
    pub fn resolve_agent_history(
        &self,
        source: &dyn TradeHistory,
        agent_id: &str,
    ) -> Result<AgentEffectiveState> {
        let state = self.resolver.resolve_from_source(source, agent_id)?;
        self.state.agents.insert(state.clone());
        Ok(state)
    }

    /// Feed the ensemble's current performance metric.
    pub fn evaluate_rollback(&self, current: f64, baseline: f64) -> RollbackDecision {
        let decision = self.state.rollback.evaluate(current, baseline);
        if let Some(transition) = decision.transition {
            info!(transition = ?transition, reason = %decision.reason, "Rollback state changed");
        } else if decision.ratio.is_none() {
            warn!(current, baseline, "Rollback evaluation skipped");
        }
        decision
    }
}
