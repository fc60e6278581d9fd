//! Agent tier resolution with B-tier rescue.
//!
//! Every agent gets a raw tier from its combined record. Tier-B agents whose
//! short side is destroying an otherwise viable long edge are re-evaluated
//! long-only: a surviving long edge is rescued at reduced size, anything else
//! is parked in shadow. Other B agents are split into promotable and legacy.

use chrono::{DateTime, Utc};
use governance_core::config::TierConfig;
use governance_core::types::{
    AgentConstraint, AgentDirective, AgentStats, ClosedTrade, Direction, Pair, Session, SideStats,
};
use governance_core::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info};

use crate::history::TradeHistory;
use crate::metrics::AgentMetrics;
use crate::stability::StabilityScore;

/// Tier from the combined record alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RawTier {
    A,
    B,
    C,
    D,
}

/// Deployment tier after rescue logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EffectiveTier {
    A,
    #[serde(rename = "B-Rescued")]
    BRescued,
    #[serde(rename = "B-Shadow")]
    BShadow,
    #[serde(rename = "B-Promotable")]
    BPromotable,
    #[serde(rename = "B-Legacy")]
    BLegacy,
    C,
    D,
}

impl fmt::Display for EffectiveTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EffectiveTier::A => "A",
            EffectiveTier::BRescued => "B-Rescued",
            EffectiveTier::BShadow => "B-Shadow",
            EffectiveTier::BPromotable => "B-Promotable",
            EffectiveTier::BLegacy => "B-Legacy",
            EffectiveTier::C => "C",
            EffectiveTier::D => "D",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RescueStatus {
    None,
    InProgress,
    Stabilized,
    Promotable,
}

/// Display badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Badge {
    Deployable,
    Rescued,
    LongOnly,
    Shadow,
    Promotable,
    Legacy,
    Blocked,
}

/// Resolved state of one agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentEffectiveState {
    pub agent_id: String,
    pub raw_tier: RawTier,
    pub effective_tier: EffectiveTier,
    pub constraints: Vec<AgentConstraint>,
    pub rescue_status: RescueStatus,
    pub size_multiplier: f64,
    pub raw_metrics: AgentMetrics,
    /// Metrics the effective tier was decided on (long-only for rescues).
    pub effective_metrics: AgentMetrics,
    pub stability: StabilityScore,
    pub badges: Vec<Badge>,
    pub computed_at: DateTime<Utc>,
}

impl AgentEffectiveState {
    /// The slice of this state the execution router enforces.
    pub fn directive(&self) -> AgentDirective {
        AgentDirective::from_constraints(self.size_multiplier, &self.constraints)
    }

    pub fn has_badge(&self, badge: Badge) -> bool {
        self.badges.contains(&badge)
    }

    pub fn is_deployable(&self) -> bool {
        self.size_multiplier > 0.0
    }
}

struct BResolution {
    tier: EffectiveTier,
    status: RescueStatus,
    size: f64,
    metrics: AgentMetrics,
    constraints: Vec<AgentConstraint>,
}

/// Resolves raw and effective tiers.
#[derive(Debug, Clone, Default)]
pub struct TierResolver {
    config: TierConfig,
}

impl TierResolver {
    pub fn new(config: TierConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TierConfig {
        &self.config
    }

    pub fn raw_tier(&self, metrics: &AgentMetrics) -> RawTier {
        let cfg = &self.config;
        if metrics.trade_count < cfg.min_trades {
            RawTier::C
        } else if metrics.profit_factor >= cfg.tier_a_profit_factor
            && metrics.expectancy > 0.0
            && metrics.trade_count >= cfg.tier_a_min_trades
        {
            RawTier::A
        } else if metrics.profit_factor >= cfg.tier_b_profit_factor {
            RawTier::B
        } else if metrics.profit_factor >= cfg.tier_c_profit_factor {
            RawTier::C
        } else {
            RawTier::D
        }
    }

    /// Whether the short side is losing enough, often enough, to warrant a
    /// long-only rescue.
    pub fn is_short_destructive(&self, short: &AgentMetrics) -> bool {
        short.net_pips < self.config.short_destructive_net_pips
            && short.trade_count > self.config.short_destructive_min_trades
    }

    /// Resolve from pre-aggregated stats.
    pub fn resolve_from_stats(&self, stats: &AgentStats) -> AgentEffectiveState {
        self.resolve(
            &stats.agent_id,
            AgentMetrics::from_side(&stats.combined()),
            AgentMetrics::from_side(&stats.long),
            AgentMetrics::from_side(&stats.short),
            Vec::new(),
        )
    }

    /// Resolve from individual closed trades. Trades belonging to other
    /// agents are ignored. Also blocks persistently losing pairs and
    /// sessions.
    pub fn resolve_from_trades(&self, agent_id: &str, trades: &[ClosedTrade]) -> AgentEffectiveState {
        let mut own: Vec<&ClosedTrade> = trades.iter().filter(|t| t.agent_id == agent_id).collect();
        own.sort_by_key(|t| t.closed_at);

        let mut all = Vec::with_capacity(own.len());
        let mut long = Vec::new();
        let mut short = Vec::new();
        let mut by_pair: HashMap<Pair, SideStats> = HashMap::new();
        let mut by_session: HashMap<Session, SideStats> = HashMap::new();

        for trade in &own {
            let pips = trade.pips_f64();
            all.push(pips);
            match trade.direction {
                Direction::Long => long.push(pips),
                Direction::Short => short.push(pips),
            }
            by_pair.entry(trade.pair.clone()).or_default().record(pips);
            if let Some(session) = trade.session {
                by_session.entry(session).or_default().record(pips);
            }
        }

        let mut segment_blocks = Vec::new();
        let mut blocked_pairs: Vec<_> = by_pair
            .into_iter()
            .filter(|(_, stats)| self.is_losing_segment(stats))
            .map(|(pair, _)| pair)
            .collect();
        blocked_pairs.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        segment_blocks.extend(
            blocked_pairs
                .into_iter()
                .map(|pair| AgentConstraint::BlockPair { pair }),
        );

        let mut blocked_sessions: Vec<_> = by_session
            .into_iter()
            .filter(|(_, stats)| self.is_losing_segment(stats))
            .map(|(session, _)| session)
            .collect();
        blocked_sessions.sort_by_key(|s| s.name());
        segment_blocks.extend(
            blocked_sessions
                .into_iter()
                .map(|session| AgentConstraint::BlockSession { session }),
        );

        self.resolve(
            agent_id,
            AgentMetrics::from_pips(&all),
            AgentMetrics::from_pips(&long),
            AgentMetrics::from_pips(&short),
            segment_blocks,
        )
    }

    /// Fetch an agent's trades from `source` and resolve them.
    pub fn resolve_from_source(
        &self,
        source: &dyn TradeHistory,
        agent_id: &str,
    ) -> Result<AgentEffectiveState> {
        let trades = source.closed_trades(agent_id)?;
        debug!(agent_id, trades = trades.len(), "Fetched trade history");
        Ok(self.resolve_from_trades(agent_id, &trades))
    }

    fn is_losing_segment(&self, stats: &SideStats) -> bool {
        stats.trades >= self.config.segment_block_min_trades
            && stats.net_pips() < self.config.segment_block_net_pips
    }

    fn resolve(
        &self,
        agent_id: &str,
        raw: AgentMetrics,
        long: AgentMetrics,
        short: AgentMetrics,
        segment_blocks: Vec<AgentConstraint>,
    ) -> AgentEffectiveState {
        let cfg = &self.config;
        let raw_tier = self.raw_tier(&raw);

        let resolution = match raw_tier {
            RawTier::A => BResolution {
                tier: EffectiveTier::A,
                status: RescueStatus::None,
                size: cfg.size_tier_a,
                metrics: raw.clone(),
                constraints: Vec::new(),
            },
            RawTier::B => self.resolve_b(&raw, long, &short),
            RawTier::C => BResolution {
                tier: EffectiveTier::C,
                status: RescueStatus::None,
                size: cfg.size_tier_c,
                metrics: raw.clone(),
                constraints: Vec::new(),
            },
            RawTier::D => BResolution {
                tier: EffectiveTier::D,
                status: RescueStatus::None,
                size: 0.0,
                metrics: raw.clone(),
                constraints: Vec::new(),
            },
        };

        let mut constraints = resolution.constraints;
        constraints.extend(segment_blocks);

        let badges = badges_for(resolution.tier, resolution.status);
        let stability = StabilityScore::from_metrics(&resolution.metrics);

        debug!(
            agent_id,
            raw_tier = ?raw_tier,
            effective_tier = %resolution.tier,
            size = resolution.size,
            constraints = constraints.len(),
            stability = stability.total,
            "Resolved agent tier"
        );

        AgentEffectiveState {
            agent_id: agent_id.to_string(),
            raw_tier,
            effective_tier: resolution.tier,
            constraints,
            rescue_status: resolution.status,
            size_multiplier: resolution.size,
            raw_metrics: raw,
            effective_metrics: resolution.metrics,
            stability,
            badges,
            computed_at: Utc::now(),
        }
    }

    fn resolve_b(&self, raw: &AgentMetrics, long: AgentMetrics, short: &AgentMetrics) -> BResolution {
        let cfg = &self.config;

        if self.is_short_destructive(short) {
            let block_short = vec![AgentConstraint::BlockDirection {
                direction: Direction::Short,
            }];

            if long.expectancy > 0.0 && long.profit_factor >= cfg.rescue_profit_factor {
                let status = if long.profit_factor >= cfg.rescued_promotable_profit_factor
                    && long.trade_count >= cfg.rescued_promotable_min_trades
                {
                    RescueStatus::Promotable
                } else {
                    RescueStatus::Stabilized
                };
                info!(
                    short_net_pips = short.net_pips,
                    long_expectancy = long.expectancy,
                    long_profit_factor = long.profit_factor,
                    status = ?status,
                    "Rescued tier-B agent long-only"
                );
                return BResolution {
                    tier: EffectiveTier::BRescued,
                    status,
                    size: cfg.size_rescued,
                    metrics: long,
                    constraints: block_short,
                };
            }

            return BResolution {
                tier: EffectiveTier::BShadow,
                status: RescueStatus::InProgress,
                size: 0.0,
                metrics: long,
                constraints: block_short,
            };
        }

        if raw.expectancy > 0.0 && raw.profit_factor >= cfg.promotion_profit_factor {
            BResolution {
                tier: EffectiveTier::BPromotable,
                status: RescueStatus::Promotable,
                size: cfg.size_promotable,
                metrics: raw.clone(),
                constraints: Vec::new(),
            }
        } else {
            BResolution {
                tier: EffectiveTier::BLegacy,
                status: RescueStatus::None,
                size: cfg.size_legacy,
                metrics: raw.clone(),
                constraints: vec![AgentConstraint::RaiseThreshold {
                    delta: cfg.legacy_threshold_raise,
                }],
            }
        }
    }
}

fn badges_for(tier: EffectiveTier, status: RescueStatus) -> Vec<Badge> {
    match tier {
        EffectiveTier::A => vec![Badge::Deployable],
        EffectiveTier::BRescued if status == RescueStatus::Promotable => {
            vec![Badge::Rescued, Badge::LongOnly, Badge::Promotable]
        }
        EffectiveTier::BRescued => vec![Badge::Rescued, Badge::LongOnly],
        EffectiveTier::BShadow => vec![Badge::Shadow, Badge::LongOnly],
        EffectiveTier::BPromotable => vec![Badge::Promotable],
        EffectiveTier::BLegacy => vec![Badge::Legacy],
        EffectiveTier::C => Vec::new(),
        EffectiveTier::D => vec![Badge::Blocked],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::MockTradeHistory;
    use chrono::Duration;
    use governance_core::GovernanceError;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    fn side(trades: u64, wins: u64, gross_profit: f64, gross_loss: f64) -> SideStats {
        SideStats {
            trades,
            wins,
            gross_profit_pips: gross_profit,
            gross_loss_pips: gross_loss,
        }
    }

    /// Long side: 300 trades, expectancy +0.4, PF 1.3.
    /// Short side: 80 trades, net -600.
    fn rescue_candidate() -> AgentStats {
        AgentStats::new(
            "agent-rescue",
            side(300, 160, 520.0, 400.0),
            side(80, 30, 2000.0, 2600.0),
        )
    }

    #[test]
    fn test_rescued_long_only() {
        let state = TierResolver::default().resolve_from_stats(&rescue_candidate());
        assert_eq!(state.raw_tier, RawTier::B);
        assert_eq!(state.effective_tier, EffectiveTier::BRescued);
        assert_eq!(state.rescue_status, RescueStatus::Stabilized);
        assert_eq!(state.size_multiplier, 0.5);
        assert!(state.has_badge(Badge::Rescued));
        assert!(state.has_badge(Badge::LongOnly));
        assert!(state.directive().blocks_direction(Direction::Short));
        assert!(!state.directive().blocks_direction(Direction::Long));
        assert!((state.effective_metrics.expectancy - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_rescued_becomes_promotable() {
        let stats = AgentStats::new(
            "agent-strong-long",
            side(150, 90, 480.0, 300.0),
            side(80, 30, 2000.0, 2600.0),
        );
        let state = TierResolver::default().resolve_from_stats(&stats);
        assert_eq!(state.effective_tier, EffectiveTier::BRescued);
        assert_eq!(state.rescue_status, RescueStatus::Promotable);
        assert!(state.has_badge(Badge::Promotable));
    }

    #[test]
    fn test_shadow_when_long_edge_is_weak() {
        let stats = AgentStats::new(
            "agent-shadow",
            side(300, 150, 1100.0, 1000.0),
            side(80, 30, 2000.0, 2600.0),
        );
        let state = TierResolver::default().resolve_from_stats(&stats);
        assert_eq!(state.raw_tier, RawTier::B);
        assert_eq!(state.effective_tier, EffectiveTier::BShadow);
        assert_eq!(state.rescue_status, RescueStatus::InProgress);
        assert_eq!(state.size_multiplier, 0.0);
        assert!(!state.is_deployable());
        assert!(state.has_badge(Badge::Shadow));
    }

    #[test]
    fn test_promotable_and_legacy() {
        let resolver = TierResolver::default();

        let promotable =
            resolver.resolve_from_stats(&AgentStats::new("p", side(100, 55, 240.0, 200.0), SideStats::default()));
        assert_eq!(promotable.effective_tier, EffectiveTier::BPromotable);
        assert_eq!(promotable.size_multiplier, 0.75);

        let legacy =
            resolver.resolve_from_stats(&AgentStats::new("l", side(100, 45, 190.0, 200.0), SideStats::default()));
        assert_eq!(legacy.effective_tier, EffectiveTier::BLegacy);
        assert_eq!(legacy.size_multiplier, 0.35);
        assert!((legacy.directive().threshold_raise - 0.05).abs() < 1e-12);
        assert!(legacy.has_badge(Badge::Legacy));
    }

    #[test]
    fn test_raw_tiers() {
        let resolver = TierResolver::default();
        let tier = |long: SideStats| {
            resolver
                .resolve_from_stats(&AgentStats::new("x", long, SideStats::default()))
                .effective_tier
        };

        assert_eq!(tier(side(19, 19, 500.0, 0.0)), EffectiveTier::C);
        assert_eq!(tier(side(60, 40, 400.0, 200.0)), EffectiveTier::A);
        assert_eq!(tier(side(40, 30, 400.0, 200.0)), EffectiveTier::BPromotable);
        assert_eq!(tier(side(60, 20, 120.0, 200.0)), EffectiveTier::C);
        assert_eq!(tier(side(60, 10, 40.0, 200.0)), EffectiveTier::D);
    }

    #[test]
    fn test_sizes_and_badges_for_plain_tiers() {
        let resolver = TierResolver::default();
        let a = resolver.resolve_from_stats(&AgentStats::new("a", side(60, 40, 400.0, 200.0), SideStats::default()));
        assert_eq!(a.size_multiplier, 1.0);
        assert_eq!(a.badges, vec![Badge::Deployable]);

        let d = resolver.resolve_from_stats(&AgentStats::new("d", side(60, 10, 40.0, 200.0), SideStats::default()));
        assert_eq!(d.size_multiplier, 0.0);
        assert_eq!(d.badges, vec![Badge::Blocked]);
    }

    #[test]
    fn test_flawless_record_uses_sentinel() {
        let state = TierResolver::default()
            .resolve_from_stats(&AgentStats::new("flawless", side(60, 60, 300.0, 0.0), SideStats::default()));
        assert_eq!(state.raw_metrics.profit_factor, 999.0);
        assert_eq!(state.effective_tier, EffectiveTier::A);
    }

    #[test]
    fn test_short_destructive_thresholds_are_configurable() {
        let config = TierConfig {
            short_destructive_net_pips: -1000.0,
            ..TierConfig::default()
        };
        let state = TierResolver::new(config).resolve_from_stats(&rescue_candidate());
        assert_ne!(state.effective_tier, EffectiveTier::BRescued);
    }

    fn closed(pair: &str, direction: Direction, pips: i64, session: Session, hours_ago: i64) -> ClosedTrade {
        let entry = Decimal::new(11000, 4);
        let delta = Decimal::new(pips, 4) * Decimal::from(direction.sign());
        let closed_at = Utc::now() - Duration::hours(hours_ago);
        ClosedTrade {
            id: Uuid::new_v4(),
            agent_id: "agent-heavy".to_string(),
            pair: Pair::new(pair),
            direction,
            entry_price: entry,
            exit_price: entry + delta,
            opened_at: closed_at - Duration::hours(1),
            closed_at,
            session: Some(session),
            regime: None,
        }
    }

    fn heavy_history() -> Vec<ClosedTrade> {
        let mut trades = Vec::new();
        let mut hours = 1_000;
        for i in 0..60 {
            hours -= 1;
            let pips = if i % 3 == 0 { -8 } else { 10 };
            trades.push(closed("EUR_USD", Direction::Long, pips, Session::London, hours));
        }
        for _ in 0..25 {
            hours -= 1;
            trades.push(closed("GBP_USD", Direction::Long, -12, Session::Tokyo, hours));
        }
        for i in 0..40 {
            hours -= 1;
            let pips = if i % 2 == 0 { 30 } else { -15 };
            trades.push(closed("EUR_USD", Direction::Long, pips, Session::NewYork, hours));
        }
        trades
    }

    #[test]
    fn test_heavy_path_blocks_losing_segments() {
        let state = TierResolver::default().resolve_from_trades("agent-heavy", &heavy_history());
        assert_eq!(state.raw_metrics.trade_count, 125);
        assert!(state.constraints.contains(&AgentConstraint::BlockPair {
            pair: Pair::new("GBP_USD")
        }));
        assert!(state.constraints.contains(&AgentConstraint::BlockSession {
            session: Session::Tokyo
        }));
        assert!(!state.constraints.contains(&AgentConstraint::BlockPair {
            pair: Pair::new("EUR_USD")
        }));

        let directive = state.directive();
        assert!(directive.blocked_pairs.contains(&Pair::new("GBP_USD")));
        assert!(directive.blocked_sessions.contains(&Session::Tokyo));
        assert!(state.raw_metrics.pip_std_dev.is_some());
    }

    #[test]
    fn test_heavy_path_ignores_other_agents() {
        let mut trades = heavy_history();
        for trade in trades.iter_mut().take(10) {
            trade.agent_id = "someone-else".to_string();
        }
        let state = TierResolver::default().resolve_from_trades("agent-heavy", &trades);
        assert_eq!(state.raw_metrics.trade_count, 115);
    }

    #[test]
    fn test_resolve_from_source_uses_history() {
        let mut source = MockTradeHistory::new();
        source
            .expect_closed_trades()
            .withf(|agent_id: &str| agent_id == "agent-heavy")
            .times(1)
            .returning(|_| Ok(heavy_history()));

        let state = TierResolver::default()
            .resolve_from_source(&source, "agent-heavy")
            .unwrap();
        assert_eq!(state.agent_id, "agent-heavy");
        assert_eq!(state.raw_metrics.trade_count, 125);
    }

    #[test]
    fn test_resolve_from_source_propagates_errors() {
        let mut source = MockTradeHistory::new();
        source.expect_closed_trades().returning(|_| {
            Err(GovernanceError::TradeHistory {
                message: "store offline".to_string(),
            })
        });

        let err = TierResolver::default()
            .resolve_from_source(&source, "agent-1")
            .unwrap_err();
        assert!(err.to_string().contains("store offline"));
    }

    #[test]
    fn test_effective_tier_serializes_with_hyphen() {
        let json = serde_json::to_string(&EffectiveTier::BRescued).unwrap();
        assert_eq!(json, "\"B-Rescued\"");
        let badge = serde_json::to_string(&Badge::LongOnly).unwrap();
        assert_eq!(badge, "\"LONG_ONLY\"");
    }
}
