//! Admission gates for trade proposals.
//!
//! Each gate is a pure predicate over the [`GovernanceContext`]. Hard gates
//! (missing data) reject outright; soft gates are counted, and the count
//! decides between approval, throttling and rejection. The surviving
//! probability estimate is scaled by a composite of four independent
//! multipliers and clamped into a fixed band.

use governance_core::config::GateConfig;
use governance_core::types::{
    EdgeDecayState, GovernanceContext, SequencingCluster, TradeProposal, VolatilityPhase,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Identifier of an admission gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateId {
    PriceDataUnavailable,
    AnalysisUnavailable,
    /// G1
    Friction,
    /// G2
    TimeframeMisalignment,
    /// G3
    LiquidityShock,
    /// G4
    SpreadInstability,
    /// G5
    PairExpectancy,
    /// G6
    EdgeDecay,
    /// G7
    SessionHostility,
    /// G8
    LossClustering,
    /// G9
    VolatilityExhaustion,
    /// G10
    SpreadToAtr,
}

impl GateId {
    /// Hard gates reject regardless of how many other gates fired.
    pub fn is_hard(&self) -> bool {
        matches!(self, GateId::PriceDataUnavailable | GateId::AnalysisUnavailable)
    }

    /// Short code used in logs and dashboards.
    pub fn code(&self) -> &'static str {
        match self {
            GateId::PriceDataUnavailable => "H1",
            GateId::AnalysisUnavailable => "H2",
            GateId::Friction => "G1",
            GateId::TimeframeMisalignment => "G2",
            GateId::LiquidityShock => "G3",
            GateId::SpreadInstability => "G4",
            GateId::PairExpectancy => "G5",
            GateId::EdgeDecay => "G6",
            GateId::SessionHostility => "G7",
            GateId::LossClustering => "G8",
            GateId::VolatilityExhaustion => "G9",
            GateId::SpreadToAtr => "G10",
        }
    }
}

impl fmt::Display for GateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A gate that fired, with its human-readable reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggeredGate {
    pub id: GateId,
    pub reason: String,
}

/// Admission decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateDecision {
    Approved,
    Throttled,
    Rejected,
}

/// Composite multiplier and its components.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompositeMultiplier {
    pub alignment: f64,
    pub session: f64,
    pub sequencing: f64,
    pub volatility: f64,
    pub composite: f64,
}

impl CompositeMultiplier {
    pub fn new(alignment: f64, session: f64, sequencing: f64, volatility: f64) -> Self {
        Self {
            alignment,
            session,
            sequencing,
            volatility,
            composite: alignment * session * sequencing * volatility,
        }
    }
}

/// How fast a position can be unwound given current friction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitLatencyGrade {
    Fast,
    Normal,
    Slow,
}

/// Trading posture implied by the admission outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeMode {
    Aggressive,
    Standard,
    Defensive,
    Blocked,
}

/// Outcome of evaluating a proposal against every admission gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateResult {
    /// Gates that fired, in evaluation order.
    pub triggered: Vec<TriggeredGate>,
    pub decision: GateDecision,
    pub multiplier: CompositeMultiplier,
    /// Always within the configured win-probability band.
    pub adjusted_win_probability: f64,
    /// 0-100.
    pub governance_score: f64,
    /// Position scale implied by the decision (1.0, throttle scale, or 0).
    pub position_scale: f64,
    // Forensics
    pub capture_ratio: f64,
    pub expected_expectancy: f64,
    pub friction_cost: f64,
    pub exit_latency: ExitLatencyGrade,
    pub trade_mode: TradeMode,
}

impl GateResult {
    pub fn is_rejected(&self) -> bool {
        self.decision == GateDecision::Rejected
    }

    /// Number of soft gates that fired.
    pub fn soft_gate_count(&self) -> usize {
        self.triggered.iter().filter(|g| !g.id.is_hard()).count()
    }

    pub fn has_hard_gate(&self) -> bool {
        self.triggered.iter().any(|g| g.id.is_hard())
    }

    pub fn fired(&self, id: GateId) -> bool {
        self.triggered.iter().any(|g| g.id == id)
    }

    /// Human-readable reasons, in evaluation order.
    pub fn reasons(&self) -> Vec<String> {
        self.triggered
            .iter()
            .map(|g| format!("{}: {}", g.id, g.reason))
            .collect()
    }
}

/// Evaluates trade proposals against the admission gates.
#[derive(Debug, Clone, Default)]
pub struct AdmissionGate {
    config: GateConfig,
}

impl AdmissionGate {
    pub fn new(config: GateConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Evaluate a proposal. Pure: the same inputs always give the same result.
    pub fn evaluate(&self, proposal: &TradeProposal, ctx: &GovernanceContext) -> GateResult {
        let mut triggered = self.hard_gates(ctx);
        let hard_reject = !triggered.is_empty();
        triggered.extend(self.soft_gates(ctx));

        let soft_count = triggered.iter().filter(|g| !g.id.is_hard()).count();
        let decision = if hard_reject {
            GateDecision::Rejected
        } else {
            match soft_count {
                0 => GateDecision::Approved,
                1 => GateDecision::Throttled,
                _ => GateDecision::Rejected,
            }
        };

        let multiplier = self.composite_multiplier(ctx);
        let adjusted_win_probability = clamp_finite(
            proposal.base_win_probability * multiplier.composite,
            self.config.min_win_probability,
            self.config.max_win_probability,
        );

        let governance_score = if hard_reject {
            0.0
        } else {
            clamp_finite(
                adjusted_win_probability * 100.0
                    - self.config.score_penalty_per_gate * soft_count as f64,
                0.0,
                100.0,
            )
        };

        let friction_cost = (ctx.spread_pips + ctx.slippage_pips).max(0.0);
        let avg_win = proposal.win_payoff.mid();
        let avg_loss = proposal.loss_payoff.mid();

        let (capture_ratio, expected_expectancy) = if decision == GateDecision::Rejected {
            (0.0, 0.0)
        } else {
            let capture = if avg_win > 0.0 {
                clamp_finite((avg_win - friction_cost) / avg_win, 0.0, 1.0)
            } else {
                0.0
            };
            let expectancy = adjusted_win_probability * avg_win
                - (1.0 - adjusted_win_probability) * avg_loss
                - friction_cost;
            (capture, if expectancy.is_finite() { expectancy } else { 0.0 })
        };

        let exit_latency = if ctx.friction_ratio >= 6.0 {
            ExitLatencyGrade::Fast
        } else if ctx.friction_ratio >= self.config.min_friction_ratio {
            ExitLatencyGrade::Normal
        } else {
            ExitLatencyGrade::Slow
        };

        let trade_mode = match decision {
            GateDecision::Approved if multiplier.composite >= 1.05 => TradeMode::Aggressive,
            GateDecision::Approved => TradeMode::Standard,
            GateDecision::Throttled => TradeMode::Defensive,
            GateDecision::Rejected => TradeMode::Blocked,
        };

        let position_scale = match decision {
            GateDecision::Approved => 1.0,
            GateDecision::Throttled => self.config.throttle_scale,
            GateDecision::Rejected => 0.0,
        };

        debug!(
            proposal_id = %proposal.id,
            pair = %proposal.pair,
            direction = %proposal.direction,
            decision = ?decision,
            gates = ?triggered.iter().map(|g| g.id.code()).collect::<Vec<_>>(),
            composite = multiplier.composite,
            adjusted_win_probability,
            "Evaluated admission gates"
        );

        GateResult {
            triggered,
            decision,
            multiplier,
            adjusted_win_probability,
            governance_score,
            position_scale,
            capture_ratio,
            expected_expectancy,
            friction_cost,
            exit_latency,
            trade_mode,
        }
    }

    fn hard_gates(&self, ctx: &GovernanceContext) -> Vec<TriggeredGate> {
        let mut fired = Vec::new();
        if !ctx.price_data_available {
            fired.push(TriggeredGate {
                id: GateId::PriceDataUnavailable,
                reason: "price data unavailable".to_string(),
            });
        }
        if !ctx.analysis_available {
            fired.push(TriggeredGate {
                id: GateId::AnalysisUnavailable,
                reason: "analysis unavailable".to_string(),
            });
        }
        fired
    }

    fn soft_gates(&self, ctx: &GovernanceContext) -> Vec<TriggeredGate> {
        let cfg = &self.config;
        let mut fired = Vec::new();
        let mut fire = |id: GateId, reason: String| fired.push(TriggeredGate { id, reason });

        if ctx.friction_ratio < cfg.min_friction_ratio {
            fire(
                GateId::Friction,
                format!(
                    "friction ratio {:.2} below {:.2}",
                    ctx.friction_ratio, cfg.min_friction_ratio
                ),
            );
        }

        let aligned = ctx.aligned_timeframes();
        if ctx.mtf_alignment_score < cfg.min_alignment_score || aligned < cfg.min_aligned_timeframes
        {
            fire(
                GateId::TimeframeMisalignment,
                format!(
                    "alignment score {:.0} with {} of 3 timeframes aligned",
                    ctx.mtf_alignment_score, aligned
                ),
            );
        }

        // Shock probability spikes at the start of every ignition move, so the
        // gate is suppressed for that phase.
        if ctx.volatility_phase != VolatilityPhase::Ignition
            && ctx.liquidity_shock_probability > cfg.max_liquidity_shock
        {
            fire(
                GateId::LiquidityShock,
                format!(
                    "liquidity shock probability {:.2} above {:.2}",
                    ctx.liquidity_shock_probability, cfg.max_liquidity_shock
                ),
            );
        }

        if ctx.spread_stability_rank < cfg.min_spread_stability_rank {
            fire(
                GateId::SpreadInstability,
                format!(
                    "spread stability rank {:.0} below {:.0}",
                    ctx.spread_stability_rank, cfg.min_spread_stability_rank
                ),
            );
        }

        if ctx.pair_expectancy_rank < cfg.min_pair_expectancy_rank {
            fire(
                GateId::PairExpectancy,
                format!(
                    "pair expectancy rank {:.0} below {:.0}",
                    ctx.pair_expectancy_rank, cfg.min_pair_expectancy_rank
                ),
            );
        }

        if ctx.edge_decay == EdgeDecayState::Decaying {
            fire(GateId::EdgeDecay, "signal edge decaying".to_string());
        }

        if ctx.session_aggressiveness < cfg.min_session_aggressiveness {
            fire(
                GateId::SessionHostility,
                format!(
                    "{} session aggressiveness {:.2} below {:.2}",
                    ctx.session, ctx.session_aggressiveness, cfg.min_session_aggressiveness
                ),
            );
        }

        if ctx.sequencing_cluster == SequencingCluster::LossCluster {
            fire(GateId::LossClustering, "inside a loss cluster".to_string());
        }

        if ctx.volatility_phase == VolatilityPhase::Exhaustion
            && ctx.volatility_confidence >= cfg.exhaustion_confidence
        {
            fire(
                GateId::VolatilityExhaustion,
                format!(
                    "volatility exhaustion at confidence {:.2}",
                    ctx.volatility_confidence
                ),
            );
        }

        if let Some(ratio) = ctx.spread_to_atr() {
            if ratio > cfg.max_spread_to_atr {
                fire(
                    GateId::SpreadToAtr,
                    format!(
                        "spread is {:.0}% of ATR (max {:.0}%)",
                        ratio * 100.0,
                        cfg.max_spread_to_atr * 100.0
                    ),
                );
            }
        }

        fired
    }

    /// Product of the alignment, session, sequencing and volatility factors.
    pub fn composite_multiplier(&self, ctx: &GovernanceContext) -> CompositeMultiplier {
        let alignment = 0.85 + 0.30 * clamp_finite(ctx.mtf_alignment_score / 100.0, 0.0, 1.0);
        let session = 0.85 + 0.25 * clamp_finite(ctx.session_aggressiveness, 0.0, 1.0);
        let sequencing = match ctx.sequencing_cluster {
            SequencingCluster::Momentum => 1.05,
            SequencingCluster::Neutral => 1.0,
            SequencingCluster::Choppy => 0.92,
            SequencingCluster::LossCluster => 0.85,
        };
        let phase_base = match ctx.volatility_phase {
            VolatilityPhase::Ignition => 1.10,
            VolatilityPhase::Expansion => 1.05,
            VolatilityPhase::Compression => 0.95,
            VolatilityPhase::Exhaustion => 0.85,
        };
        let confidence = clamp_finite(ctx.volatility_confidence, 0.0, 1.0);
        let volatility = 1.0 + (phase_base - 1.0) * confidence;

        CompositeMultiplier::new(alignment, session, sequencing, volatility)
    }
}

/// Clamp that maps NaN to the lower bound.
pub(crate) fn clamp_finite(value: f64, min: f64, max: f64) -> f64 {
    if value.is_nan() {
        min
    } else {
        value.clamp(min, max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use governance_core::types::{Direction, PayoffRange};

    fn proposal() -> TradeProposal {
        TradeProposal::new(
            "agent-1",
            "EUR_USD",
            Direction::Long,
            0.58,
            PayoffRange::new(14.0, 22.0),
            PayoffRange::new(8.0, 12.0),
        )
    }

    #[test]
    fn test_nominal_context_approves() {
        let gate = AdmissionGate::default();
        let result = gate.evaluate(&proposal(), &GovernanceContext::nominal());
        assert_eq!(result.decision, GateDecision::Approved);
        assert!(result.triggered.is_empty());
        assert_eq!(result.position_scale, 1.0);
        assert!(result.expected_expectancy > 0.0);
    }

    #[test]
    fn test_single_gate_throttles() {
        let ctx = GovernanceContext {
            friction_ratio: 2.0,
            ..GovernanceContext::nominal()
        };
        let result = AdmissionGate::default().evaluate(&proposal(), &ctx);
        assert_eq!(result.decision, GateDecision::Throttled);
        assert_eq!(result.soft_gate_count(), 1);
        assert!(result.fired(GateId::Friction));
        assert_eq!(result.position_scale, 0.5);
        assert_eq!(result.trade_mode, TradeMode::Defensive);
    }

    #[test]
    fn test_two_gates_reject() {
        let ctx = GovernanceContext {
            friction_ratio: 2.0,
            spread_stability_rank: 20.0,
            ..GovernanceContext::nominal()
        };
        let result = AdmissionGate::default().evaluate(&proposal(), &ctx);
        assert_eq!(result.decision, GateDecision::Rejected);
        assert!(result.fired(GateId::Friction));
        assert!(result.fired(GateId::SpreadInstability));
        assert_eq!(result.capture_ratio, 0.0);
        assert_eq!(result.expected_expectancy, 0.0);
    }

    #[test]
    fn test_missing_data_is_hard_reject() {
        let ctx = GovernanceContext {
            price_data_available: false,
            ..GovernanceContext::nominal()
        };
        let result = AdmissionGate::default().evaluate(&proposal(), &ctx);
        assert_eq!(result.decision, GateDecision::Rejected);
        assert!(result.has_hard_gate());
        assert_eq!(result.soft_gate_count(), 0);
        assert_eq!(result.governance_score, 0.0);

        let ctx = GovernanceContext {
            analysis_available: false,
            ..GovernanceContext::nominal()
        };
        let result = AdmissionGate::default().evaluate(&proposal(), &ctx);
        assert!(result.fired(GateId::AnalysisUnavailable));
        assert!(result.is_rejected());
    }

    #[test]
    fn test_liquidity_shock_suppressed_in_ignition() {
        let gate = AdmissionGate::default();
        for shock in [0.61, 0.9, 1.0, 50.0] {
            let ctx = GovernanceContext {
                volatility_phase: VolatilityPhase::Ignition,
                liquidity_shock_probability: shock,
                ..GovernanceContext::nominal()
            };
            assert!(!gate.evaluate(&proposal(), &ctx).fired(GateId::LiquidityShock));
        }

        let ctx = GovernanceContext {
            volatility_phase: VolatilityPhase::Expansion,
            liquidity_shock_probability: 0.9,
            ..GovernanceContext::nominal()
        };
        assert!(gate.evaluate(&proposal(), &ctx).fired(GateId::LiquidityShock));
    }

    #[test]
    fn test_win_probability_clamped() {
        let gate = AdmissionGate::default();
        let mut high = proposal();
        high.base_win_probability = 0.99;
        let ctx = GovernanceContext {
            sequencing_cluster: SequencingCluster::Momentum,
            mtf_alignment_score: 100.0,
            session_aggressiveness: 1.0,
            ..GovernanceContext::nominal()
        };
        assert_eq!(gate.evaluate(&high, &ctx).adjusted_win_probability, 0.88);

        let mut low = proposal();
        low.base_win_probability = 0.05;
        assert_eq!(
            gate.evaluate(&low, &GovernanceContext::nominal())
                .adjusted_win_probability,
            0.30
        );

        let mut nan = proposal();
        nan.base_win_probability = f64::NAN;
        let result = gate.evaluate(&nan, &GovernanceContext::nominal());
        assert_eq!(result.adjusted_win_probability, 0.30);
        assert!((0.0..=100.0).contains(&result.governance_score));
    }

    #[test]
    fn test_composite_multiplier_bounds() {
        let gate = AdmissionGate::default();
        let worst = GovernanceContext {
            mtf_alignment_score: 0.0,
            session_aggressiveness: 0.0,
            sequencing_cluster: SequencingCluster::LossCluster,
            volatility_phase: VolatilityPhase::Exhaustion,
            volatility_confidence: 1.0,
            ..GovernanceContext::nominal()
        };
        let m = gate.composite_multiplier(&worst);
        assert!((m.alignment - 0.85).abs() < 1e-9);
        assert!((m.session - 0.85).abs() < 1e-9);
        assert!((m.volatility - 0.85).abs() < 1e-9);
        assert!((m.composite - 0.85f64.powi(4)).abs() < 1e-9);

        let best = GovernanceContext {
            mtf_alignment_score: 100.0,
            session_aggressiveness: 1.0,
            sequencing_cluster: SequencingCluster::Momentum,
            volatility_phase: VolatilityPhase::Ignition,
            volatility_confidence: 1.0,
            ..GovernanceContext::nominal()
        };
        let m = gate.composite_multiplier(&best);
        assert!((m.composite - 1.15 * 1.10 * 1.05 * 1.10).abs() < 1e-9);
    }

    #[test]
    fn test_every_soft_gate_fires_independently() {
        let gate = AdmissionGate::default();
        let cases: Vec<(GateId, GovernanceContext)> = vec![
            (
                GateId::TimeframeMisalignment,
                GovernanceContext {
                    htf_aligned: false,
                    mtf_aligned: false,
                    ..GovernanceContext::nominal()
                },
            ),
            (
                GateId::PairExpectancy,
                GovernanceContext {
                    pair_expectancy_rank: 10.0,
                    ..GovernanceContext::nominal()
                },
            ),
            (
                GateId::EdgeDecay,
                GovernanceContext {
                    edge_decay: EdgeDecayState::Decaying,
                    ..GovernanceContext::nominal()
                },
            ),
            (
                GateId::SessionHostility,
                GovernanceContext {
                    session_aggressiveness: 0.1,
                    ..GovernanceContext::nominal()
                },
            ),
            (
                GateId::LossClustering,
                GovernanceContext {
                    sequencing_cluster: SequencingCluster::LossCluster,
                    ..GovernanceContext::nominal()
                },
            ),
            (
                GateId::VolatilityExhaustion,
                GovernanceContext {
                    volatility_phase: VolatilityPhase::Exhaustion,
                    volatility_confidence: 0.8,
                    ..GovernanceContext::nominal()
                },
            ),
            (
                GateId::SpreadToAtr,
                GovernanceContext {
                    spread_pips: 4.0,
                    atr_pips: 10.0,
                    ..GovernanceContext::nominal()
                },
            ),
        ];

        for (id, ctx) in cases {
            let result = gate.evaluate(&proposal(), &ctx);
            assert_eq!(result.soft_gate_count(), 1, "{} should fire alone", id);
            assert!(result.fired(id));
            assert_eq!(result.decision, GateDecision::Throttled);
        }
    }

    #[test]
    fn test_gate_result_serializes_for_dashboards() {
        let ctx = GovernanceContext {
            friction_ratio: 2.0,
            ..GovernanceContext::nominal()
        };
        let result = AdmissionGate::default().evaluate(&proposal(), &ctx);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["decision"], "throttled");
        assert_eq!(json["triggered"][0]["id"], "friction");
        assert_eq!(json["trade_mode"], "defensive");
        assert_eq!(result.reasons()[0], "G1: friction ratio 2.00 below 3.00");
    }
}
