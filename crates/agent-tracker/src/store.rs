//! Cache of resolved agent states.

use dashmap::DashMap;
use governance_core::types::AgentDirective;
use tracing::{info, warn};

use crate::tiers::AgentEffectiveState;

/// Resolved agent states keyed by agent id.
///
/// Entries are replaced only by [`AgentStateStore::insert`] and dropped only
/// by [`AgentStateStore::remove`] or [`AgentStateStore::clear`]; nothing
/// expires on its own.
#[derive(Default)]
pub struct AgentStateStore {
    states: DashMap<String, AgentEffectiveState>,
}

impl AgentStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, agent_id: &str) -> Option<AgentEffectiveState> {
        self.states.get(agent_id).map(|s| s.clone())
    }

    /// Store a resolved state, returning the one it replaced.
    pub fn insert(&self, state: AgentEffectiveState) -> Option<AgentEffectiveState> {
        let agent_id = state.agent_id.clone();
        let new_tier = state.effective_tier;
        let previous = self.states.insert(agent_id.clone(), state);

        match &previous {
            Some(old) if old.effective_tier != new_tier => {
                info!(
                    agent_id = %agent_id,
                    from = %old.effective_tier,
                    to = %new_tier,
                    "Agent tier changed"
                );
            }
            None => {
                info!(agent_id = %agent_id, tier = %new_tier, "Agent tier recorded");
            }
            _ => {}
        }

        previous
    }

    /// Directive for an agent. Agents never resolved trade unconstrained.
    pub fn directive(&self, agent_id: &str) -> AgentDirective {
        self.states
            .get(agent_id)
            .map(|s| s.directive())
            .unwrap_or_default()
    }

    pub fn remove(&self, agent_id: &str) -> Option<AgentEffectiveState> {
        self.states.remove(agent_id).map(|(_, s)| s)
    }

    pub fn agent_ids(&self) -> Vec<String> {
        self.states.iter().map(|e| e.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn clear(&self) {
        let count = self.states.len();
        self.states.clear();
        if count > 0 {
            warn!(count, "Cleared agent state store");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tiers::{EffectiveTier, TierResolver};
    use governance_core::types::{AgentStats, Direction, SideStats};

    fn stats(agent_id: &str, short_net: f64) -> AgentStats {
        AgentStats::new(
            agent_id,
            SideStats {
                trades: 300,
                wins: 160,
                gross_profit_pips: 520.0,
                gross_loss_pips: 400.0,
            },
            SideStats {
                trades: 80,
                wins: 30,
                gross_profit_pips: 2000.0,
                gross_loss_pips: 2000.0 - short_net,
            },
        )
    }

    #[test]
    fn test_insert_get_and_directive() {
        let store = AgentStateStore::new();
        let resolver = TierResolver::default();
        assert!(store.is_empty());
        assert_eq!(store.directive("agent-1"), AgentDirective::default());

        let state = resolver.resolve_from_stats(&stats("agent-1", -600.0));
        assert!(store.insert(state).is_none());
        assert_eq!(store.len(), 1);
        assert_eq!(
            store.get("agent-1").unwrap().effective_tier,
            EffectiveTier::BRescued
        );
        assert!(store.directive("agent-1").blocks_direction(Direction::Short));
    }

    #[test]
    fn test_replace_and_clear() {
        let store = AgentStateStore::new();
        let resolver = TierResolver::default();
        store.insert(resolver.resolve_from_stats(&stats("agent-1", -600.0)));

        let previous = store
            .insert(resolver.resolve_from_stats(&stats("agent-1", -100.0)))
            .unwrap();
        assert_eq!(previous.effective_tier, EffectiveTier::BRescued);
        assert_ne!(
            store.get("agent-1").unwrap().effective_tier,
            EffectiveTier::BRescued
        );

        store.insert(resolver.resolve_from_stats(&stats("agent-2", -600.0)));
        assert_eq!(store.len(), 2);
        store.clear();
        assert!(store.is_empty());
        assert!(store.get("agent-2").is_none());
    }
}
