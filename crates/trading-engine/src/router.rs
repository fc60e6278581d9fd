//! Directional routing of proposals to the long and short engines.
//!
//! The router configuration is mutable at runtime, so a bad assignment could
//! point a direction at the wrong engine. [`DirectionalRouter::route`] fails
//! closed on such a mismatch, and [`validate_router_integrity`] checks a
//! configuration on its own so callers can halt before trading on it.

use governance_core::types::{Direction, ExecutionEngine, Pair};
use governance_core::{GovernanceError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};
use tracing::{debug, error, info};

/// Directions an individual agent may trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectionPermissions {
    pub allow_long: bool,
    pub allow_short: bool,
}

impl DirectionPermissions {
    pub fn long_only() -> Self {
        Self {
            allow_long: true,
            allow_short: false,
        }
    }

    pub fn allows(&self, direction: Direction) -> bool {
        match direction {
            Direction::Long => self.allow_long,
            Direction::Short => self.allow_short,
        }
    }
}

impl Default for DirectionPermissions {
    fn default() -> Self {
        Self {
            allow_long: true,
            allow_short: true,
        }
    }
}

/// Runtime routing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Engine serving each direction.
    pub engine_assignment: HashMap<Direction, ExecutionEngine>,
    pub long_enabled: bool,
    pub short_enabled: bool,
    pub blocked_pairs: HashSet<Pair>,
    /// Per-agent overrides; agents not listed may trade both directions.
    pub agent_permissions: HashMap<String, DirectionPermissions>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            engine_assignment: Direction::all()
                .iter()
                .map(|d| (*d, ExecutionEngine::for_direction(*d)))
                .collect(),
            long_enabled: true,
            short_enabled: true,
            blocked_pairs: HashSet::new(),
            agent_permissions: HashMap::new(),
        }
    }
}

impl RouterConfig {
    fn assigned_engine(&self, direction: Direction) -> ExecutionEngine {
        self.engine_assignment
            .get(&direction)
            .copied()
            .unwrap_or_else(|| ExecutionEngine::for_direction(direction))
    }

    fn direction_enabled(&self, direction: Direction) -> bool {
        match direction {
            Direction::Long => self.long_enabled,
            Direction::Short => self.short_enabled,
        }
    }
}

/// Outcome of routing one proposal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteDecision {
    pub direction: Direction,
    pub engine: ExecutionEngine,
    pub reason: String,
}

impl RouteDecision {
    fn blocked(direction: Direction, reason: impl Into<String>) -> Self {
        Self {
            direction,
            engine: ExecutionEngine::Blocked,
            reason: reason.into(),
        }
    }

    pub fn is_blocked(&self) -> bool {
        self.engine == ExecutionEngine::Blocked
    }
}

/// Routes proposals by direction against a shared, mutable configuration.
#[derive(Clone, Default)]
pub struct DirectionalRouter {
    config: Arc<RwLock<RouterConfig>>,
}

impl DirectionalRouter {
    pub fn new(config: RouterConfig) -> Self {
        Self {
            config: Arc::new(RwLock::new(config)),
        }
    }

    /// Snapshot of the current configuration.
    pub fn config(&self) -> RouterConfig {
        self.config
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Mutate the configuration in place.
    pub fn update_config<F>(&self, update: F)
    where
        F: FnOnce(&mut RouterConfig),
    {
        let mut config = self
            .config
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        update(&mut config);
        info!(
            long_enabled = config.long_enabled,
            short_enabled = config.short_enabled,
            blocked_pairs = config.blocked_pairs.len(),
            "Router configuration updated"
        );
    }

    /// Route a proposal. Never returns an engine that cannot serve
    /// `direction`.
    pub fn route(&self, direction: Direction, pair: &Pair, agent_id: &str) -> RouteDecision {
        let config = self
            .config
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if config.blocked_pairs.contains(pair) {
            return RouteDecision::blocked(direction, format!("pair {} is blocked", pair));
        }

        if !config.direction_enabled(direction) {
            return RouteDecision::blocked(direction, format!("{} engine disabled", direction));
        }

        if let Some(permissions) = config.agent_permissions.get(agent_id) {
            if !permissions.allows(direction) {
                return RouteDecision::blocked(
                    direction,
                    format!("agent {} not permitted to trade {}", agent_id, direction),
                );
            }
        }

        let engine = config.assigned_engine(direction);
        if engine == ExecutionEngine::Blocked {
            return RouteDecision::blocked(direction, format!("no engine assigned for {}", direction));
        }

        if !engine.serves(direction) {
            error!(
                direction = %direction,
                engine = %engine,
                pair = %pair,
                agent_id,
                "Router assignment mismatches direction; failing closed"
            );
            return RouteDecision::blocked(
                direction,
                format!("routing integrity violation: {} assigned to {}", direction, engine),
            );
        }

        debug!(direction = %direction, engine = %engine, pair = %pair, agent_id, "Routed proposal");
        RouteDecision {
            direction,
            engine,
            reason: format!("{} routed to {}", direction, engine),
        }
    }
}

/// Check a single routing outcome.
pub fn verify_route(decision: &RouteDecision, pair: &Pair, agent_id: &str) -> Result<()> {
    if decision.engine.serves(decision.direction) {
        Ok(())
    } else {
        Err(GovernanceError::RoutingIntegrity {
            direction: decision.direction,
            engine: decision.engine,
            pair: pair.to_string(),
            agent_id: agent_id.to_string(),
        })
    }
}

/// Validate a router configuration independently of routing.
///
/// Checks the raw engine assignment for every direction, then routes every
/// `(pair, agent, direction)` combination given and verifies each outcome.
/// Any violation is a configuration defect; the caller should halt.
pub fn validate_router_integrity(
    config: &RouterConfig,
    pairs: &[Pair],
    agent_ids: &[String],
) -> Result<()> {
    for &direction in Direction::all() {
        let engine = config.assigned_engine(direction);
        if !engine.serves(direction) {
            return Err(GovernanceError::RoutingIntegrity {
                direction,
                engine,
                pair: "*".to_string(),
                agent_id: "*".to_string(),
            });
        }
    }

    let router = DirectionalRouter::new(config.clone());
    for pair in pairs {
        for agent_id in agent_ids {
            for &direction in Direction::all() {
                let decision = router.route(direction, pair, agent_id);
                verify_route(&decision, pair, agent_id)?;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eur_usd() -> Pair {
        Pair::new("EUR_USD")
    }

    #[test]
    fn test_default_routes_by_direction() {
        let router = DirectionalRouter::default();
        let long = router.route(Direction::Long, &eur_usd(), "agent-1");
        assert_eq!(long.engine, ExecutionEngine::LongEngine);
        let short = router.route(Direction::Short, &eur_usd(), "agent-1");
        assert_eq!(short.engine, ExecutionEngine::ShortEngine);
    }

    #[test]
    fn test_swapped_assignment_fails_closed() {
        let router = DirectionalRouter::default();
        router.update_config(|c| {
            c.engine_assignment
                .insert(Direction::Long, ExecutionEngine::ShortEngine);
            c.engine_assignment
                .insert(Direction::Short, ExecutionEngine::LongEngine);
        });

        for &direction in Direction::all() {
            let decision = router.route(direction, &eur_usd(), "agent-1");
            assert!(decision.is_blocked());
            assert!(decision.reason.contains("integrity"));
            assert!(verify_route(&decision, &eur_usd(), "agent-1").is_ok());
        }
    }

    #[test]
    fn test_validator_rejects_mismatched_config() {
        let mut config = RouterConfig::default();
        config
            .engine_assignment
            .insert(Direction::Short, ExecutionEngine::LongEngine);
        let err = validate_router_integrity(&config, &[eur_usd()], &["agent-1".to_string()])
            .unwrap_err();
        assert!(err.is_fatal());
        match err {
            GovernanceError::RoutingIntegrity {
                direction, engine, ..
            } => {
                assert_eq!(direction, Direction::Short);
                assert_eq!(engine, ExecutionEngine::LongEngine);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_validator_accepts_default_and_blocked_assignments() {
        let pairs = vec![eur_usd(), Pair::new("USD_JPY")];
        let agents = vec!["a".to_string(), "b".to_string()];
        assert!(validate_router_integrity(&RouterConfig::default(), &pairs, &agents).is_ok());

        let mut config = RouterConfig::default();
        config
            .engine_assignment
            .insert(Direction::Short, ExecutionEngine::Blocked);
        assert!(validate_router_integrity(&config, &pairs, &agents).is_ok());
    }

    #[test]
    fn test_verify_route_flags_mismatch() {
        let forged = RouteDecision {
            direction: Direction::Long,
            engine: ExecutionEngine::ShortEngine,
            reason: "forged".to_string(),
        };
        assert!(verify_route(&forged, &eur_usd(), "agent-1").is_err());
    }

    #[test]
    fn test_blocking_rules() {
        let mut config = RouterConfig::default();
        config.blocked_pairs.insert(Pair::new("GBP_JPY"));
        config.short_enabled = false;
        config
            .agent_permissions
            .insert("long-only".to_string(), DirectionPermissions::long_only());
        let router = DirectionalRouter::new(config);

        assert!(router
            .route(Direction::Long, &Pair::new("GBP_JPY"), "agent-1")
            .is_blocked());
        assert!(router
            .route(Direction::Short, &eur_usd(), "agent-1")
            .is_blocked());

        router.update_config(|c| c.short_enabled = true);
        assert!(router
            .route(Direction::Short, &eur_usd(), "long-only")
            .is_blocked());
        assert!(!router
            .route(Direction::Long, &eur_usd(), "long-only")
            .is_blocked());
    }

    #[test]
    fn test_no_assignment_can_cross_directions() {
        let engines = [
            ExecutionEngine::LongEngine,
            ExecutionEngine::ShortEngine,
            ExecutionEngine::Blocked,
        ];
        let router = DirectionalRouter::default();
        for long_engine in engines {
            for short_engine in engines {
                router.update_config(|c| {
                    c.engine_assignment.insert(Direction::Long, long_engine);
                    c.engine_assignment.insert(Direction::Short, short_engine);
                });
                let long = router.route(Direction::Long, &eur_usd(), "x");
                let short = router.route(Direction::Short, &eur_usd(), "x");
                assert_ne!(long.engine, ExecutionEngine::ShortEngine);
                assert_ne!(short.engine, ExecutionEngine::LongEngine);
            }
        }
    }
}
