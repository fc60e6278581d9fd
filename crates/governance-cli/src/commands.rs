//! Subcommand implementations. Each returns the JSON document to print.

use agent_tracker::{InMemoryTradeHistory, TierResolver};
use anyhow::{Context, Result};
use governance_core::types::{AgentStats, ClosedTrade, GovernanceContext, Pair, TradeProposal};
use governance_core::EngineConfig;
use risk_manager::{HealthMonitor, RollbackEvaluator, RollbackState, TradeHealthInput};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::Path;
use tracing::{info, warn};
use trade_governance::GovernancePipeline;
use trading_engine::{validate_router_integrity, DirectionalRouter, RouterConfig};

/// One proposal with the market snapshot it was generated against.
#[derive(Debug, Clone, Deserialize)]
pub struct EvaluationRequest {
    pub proposal: TradeProposal,
    pub context: GovernanceContext,
    pub survivorship_score: f64,
}

pub enum TierSource {
    Stats(Vec<AgentStats>),
    Trades(Vec<ClosedTrade>),
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

/// Read a file holding either a single object or an array of them.
pub fn read_one_or_many<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let value: Value = read_json(path)?;
    let items = match value {
        Value::Array(_) => serde_json::from_value(value)?,
        other => vec![serde_json::from_value(other)?],
    };
    Ok(items)
}

pub fn evaluate(
    config: EngineConfig,
    router: RouterConfig,
    agents: &[AgentStats],
    requests: &[EvaluationRequest],
) -> Result<Value> {
    let pipeline = GovernancePipeline::new(config, DirectionalRouter::new(router))?;
    for stats in agents {
        pipeline.resolve_agent(stats);
    }

    let outcomes: Vec<_> = requests
        .iter()
        .map(|r| pipeline.evaluate(&r.proposal, &r.context, r.survivorship_score))
        .collect();

    let permitted = outcomes.iter().filter(|o| o.execution.permitted).count();
    info!(
        evaluated = outcomes.len(),
        permitted,
        blocked = outcomes.len() - permitted,
        "Evaluation complete"
    );

    Ok(serde_json::to_value(outcomes)?)
}

pub fn health(config: &EngineConfig, inputs: &[TradeHealthInput]) -> Value {
    let monitor = HealthMonitor::new(config.health.clone());
    let results: Vec<_> = inputs.iter().map(|i| monitor.compute_health(i)).collect();
    json!(results)
}

pub fn resolve_tiers(config: &EngineConfig, source: TierSource) -> Result<Value> {
    let resolver = TierResolver::new(config.tiers.clone());

    let states = match source {
        TierSource::Stats(stats) => stats
            .iter()
            .map(|s| resolver.resolve_from_stats(s))
            .collect::<Vec<_>>(),
        TierSource::Trades(trades) => {
            let history = InMemoryTradeHistory::new();
            history.extend(trades);
            let mut agent_ids = history.agent_ids();
            agent_ids.sort();
            agent_ids
                .iter()
                .map(|id| resolver.resolve_from_source(&history, id))
                .collect::<governance_core::Result<Vec<_>>>()?
        }
    };

    info!(agents = states.len(), "Resolved agent tiers");
    Ok(serde_json::to_value(states)?)
}

pub fn validate_router(router: &RouterConfig, pairs: &[String], agents: &[String]) -> Result<Value> {
    let pairs: Vec<Pair> = pairs.iter().map(Pair::new).collect();
    if let Err(e) = validate_router_integrity(router, &pairs, agents) {
        warn!(error = %e, "Router integrity check failed");
        return Err(e.into());
    }
    Ok(json!({
        "valid": true,
        "pairs": pairs,
        "agents": agents,
    }))
}

pub fn rollback(config: &EngineConfig, current: f64, baseline: f64, active: bool) -> Value {
    let evaluator = RollbackEvaluator::with_state(
        config.rollback.clone(),
        RollbackState {
            active,
            ..Default::default()
        },
    );
    let decision = evaluator.evaluate(current, baseline);
    json!({
        "decision": decision,
        "state": evaluator.state(),
    })
}
