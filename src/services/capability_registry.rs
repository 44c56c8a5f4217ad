//! In-memory agent registry.
//!
//! Single source of truth for agent capability sets, clearance, load, and
//! reputation. Load reservation happens under the write lock so concurrent
//! selection cannot double-book an agent past its declared capacity.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::domain::error::{CoordinationError, Result};
use crate::domain::models::Agent;

/// Registry of all registered agents.
#[derive(Default)]
pub struct CapabilityRegistry {
    agents: Arc<RwLock<HashMap<Uuid, Agent>>>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an agent. Re-registering an existing id replaces the record
    /// but preserves accumulated reputation and load.
    #[instrument(skip(self, agent), fields(agent_id = %agent.id, name = %agent.name))]
    pub async fn register(&self, mut agent: Agent) -> Uuid {
        let mut agents = self.agents.write().await;
        if let Some(existing) = agents.get(&agent.id) {
            agent.reputation = existing.reputation;
            agent.current_load = existing.current_load;
        }
        let id = agent.id;
        agents.insert(id, agent);
        info!("Agent registered");
        id
    }

    /// Remove an agent from the registry.
    pub async fn deregister(&self, agent_id: Uuid) -> Result<Agent> {
        self.agents
            .write()
            .await
            .remove(&agent_id)
            .ok_or(CoordinationError::AgentNotFound(agent_id))
    }

    pub async fn get(&self, agent_id: Uuid) -> Option<Agent> {
        self.agents.read().await.get(&agent_id).cloned()
    }

    pub async fn list(&self) -> Vec<Agent> {
        self.agents.read().await.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.agents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.agents.read().await.is_empty()
    }

    /// Atomically reserve one unit of load on an agent.
    ///
    /// Fails with `AgentAtCapacity` when the agent already holds its
    /// maximum concurrent tasks; the check and increment happen under the
    /// same write lock.
    #[instrument(skip(self))]
    pub async fn try_reserve(&self, agent_id: Uuid) -> Result<()> {
        let mut agents = self.agents.write().await;
        let agent = agents
            .get_mut(&agent_id)
            .ok_or(CoordinationError::AgentNotFound(agent_id))?;

        if !agent.has_capacity() {
            return Err(CoordinationError::AgentAtCapacity(agent_id));
        }
        agent.current_load += 1;
        debug!(load = agent.current_load, "Load reserved");
        Ok(())
    }

    /// Release one unit of load. Saturates at zero.
    pub async fn release(&self, agent_id: Uuid) -> Result<()> {
        let mut agents = self.agents.write().await;
        let agent = agents
            .get_mut(&agent_id)
            .ok_or(CoordinationError::AgentNotFound(agent_id))?;
        agent.current_load = agent.current_load.saturating_sub(1);
        debug!(load = agent.current_load, "Load released");
        Ok(())
    }

    /// Apply a reputation delta, clamped to [0, 100].
    ///
    /// Only the performance tracker calls this; reputation never changes
    /// through any other path.
    pub async fn adjust_reputation(&self, agent_id: Uuid, delta: f64) -> Result<f64> {
        let mut agents = self.agents.write().await;
        let agent = agents
            .get_mut(&agent_id)
            .ok_or(CoordinationError::AgentNotFound(agent_id))?;
        agent.adjust_reputation(delta);
        Ok(agent.reputation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{Capability, REPUTATION_DEFAULT};

    #[tokio::test]
    async fn test_register_and_get() {
        let registry = CapabilityRegistry::new();
        let agent = Agent::new("worker-1").with_capability(Capability::DataAnalysis);
        let id = registry.register(agent).await;

        let fetched = registry.get(id).await.unwrap();
        assert_eq!(fetched.name, "worker-1");
        assert!(fetched.capabilities.contains(&Capability::DataAnalysis));
    }

    #[tokio::test]
    async fn test_reregister_preserves_reputation_and_load() {
        let registry = CapabilityRegistry::new();
        let agent = Agent::new("worker-1");
        let id = registry.register(agent.clone()).await;

        registry.adjust_reputation(id, 10.0).await.unwrap();
        registry.try_reserve(id).await.unwrap();

        registry.register(agent).await;
        let fetched = registry.get(id).await.unwrap();
        assert_eq!(fetched.reputation, REPUTATION_DEFAULT + 10.0);
        assert_eq!(fetched.current_load, 1);
    }

    #[tokio::test]
    async fn test_reserve_respects_capacity() {
        let registry = CapabilityRegistry::new();
        let id = registry.register(Agent::new("worker-1").with_max_load(2)).await;

        registry.try_reserve(id).await.unwrap();
        registry.try_reserve(id).await.unwrap();
        assert!(matches!(
            registry.try_reserve(id).await,
            Err(CoordinationError::AgentAtCapacity(_))
        ));
    }

    #[tokio::test]
    async fn test_release_saturates_at_zero() {
        let registry = CapabilityRegistry::new();
        let id = registry.register(Agent::new("worker-1")).await;

        registry.release(id).await.unwrap();
        assert_eq!(registry.get(id).await.unwrap().current_load, 0);
    }

    #[tokio::test]
    async fn test_deregister_unknown_agent() {
        let registry = CapabilityRegistry::new();
        assert!(registry.deregister(Uuid::new_v4()).await.is_err());
    }

    #[tokio::test]
    async fn test_concurrent_reservation_never_exceeds_capacity() {
        let registry = Arc::new(CapabilityRegistry::new());
        let id = registry.register(Agent::new("worker-1").with_max_load(3)).await;

        let mut handles = Vec::new();
        for _ in 0..10 {
            let registry = Arc::clone(&registry);
            handles.push(tokio::spawn(async move { registry.try_reserve(id).await }));
        }

        let mut granted = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                granted += 1;
            }
        }
        assert_eq!(granted, 3);
        assert_eq!(registry.get(id).await.unwrap().current_load, 3);
    }
}
