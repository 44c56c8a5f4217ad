//! Coordination engine facade.
//!
//! The programmatic surface external collaborators call: task submission,
//! assignment, outcome recording, governance votes, and reward
//! distribution. Surrounding CLI/HTTP layers live outside this crate.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::domain::error::{CoordinationError, Result};
use crate::domain::models::{
    Agent, AllocationSplit, Config, CoordinationPlan, DistributionSummary, ProposalStatus,
    ProposalType, ResourceFootprint, RewardTier, Strategy, Task, TaskOutcome, TaskSpec, TaskStatus,
};
use crate::domain::ports::TaskExecutor;
use crate::services::agent_selector::AgentSelector;
use crate::services::capability_registry::CapabilityRegistry;
use crate::services::consensus_engine::ConsensusEngine;
use crate::services::coordination_planner::CoordinationPlanner;
use crate::services::dispatcher::Dispatcher;
use crate::services::performance_tracker::PerformanceTracker;
use crate::services::reward_allocator::RewardAllocator;
use crate::services::task_scheduler::TaskScheduler;

/// Point-in-time agent status for external consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentStatusView {
    pub agent_id: Uuid,
    pub reputation: f64,
    pub current_load: u32,
    pub tier: RewardTier,
    pub composite_score: f64,
}

/// The assembled coordination engine.
pub struct CoordinationEngine {
    registry: Arc<CapabilityRegistry>,
    scheduler: Arc<TaskScheduler>,
    selector: AgentSelector,
    planner: CoordinationPlanner,
    tracker: Arc<PerformanceTracker>,
    consensus: ConsensusEngine,
    allocator: RewardAllocator,
    config: Config,
}

impl CoordinationEngine {
    pub fn new(config: Config) -> Self {
        let registry = Arc::new(CapabilityRegistry::new());
        let scheduler = Arc::new(TaskScheduler::new(config.scheduler.clone()));
        let selector = AgentSelector::new(config.selection.clone());
        let planner = CoordinationPlanner::new(selector.clone());
        let tracker = Arc::new(PerformanceTracker::new(
            Arc::clone(&registry),
            config.performance.clone(),
        ));
        let consensus = ConsensusEngine::new(Arc::clone(&registry), config.consensus.clone());
        let allocator = RewardAllocator::new(config.rewards.clone());

        Self {
            registry,
            scheduler,
            selector,
            planner,
            tracker,
            consensus,
            allocator,
            config,
        }
    }

    /// Build a dispatcher over this engine's state for the given executor.
    pub fn dispatcher(&self, executor: Arc<dyn TaskExecutor>) -> Dispatcher {
        Dispatcher::new(
            Arc::clone(&self.scheduler),
            Arc::clone(&self.registry),
            self.selector.clone(),
            Arc::clone(&self.tracker),
            executor,
            &self.config.scheduler,
        )
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    pub fn tracker(&self) -> &PerformanceTracker {
        &self.tracker
    }

    // ---- Agents ----

    pub async fn register_agent(&self, agent: Agent) -> Uuid {
        self.registry.register(agent).await
    }

    pub async fn deregister_agent(&self, agent_id: Uuid) -> Result<Agent> {
        self.registry.deregister(agent_id).await
    }

    /// Reputation, load, and current reward tier for an agent.
    pub async fn agent_status(&self, agent_id: Uuid) -> Result<AgentStatusView> {
        let agent = self
            .registry
            .get(agent_id)
            .await
            .ok_or(CoordinationError::AgentNotFound(agent_id))?;
        let snapshot = self.tracker.snapshot(agent_id).await;
        let composite_score = self.allocator.composite_score(&snapshot);
        let tier = RewardTier::for_score(composite_score, self.allocator.elite_eligible(&agent));
        Ok(AgentStatusView {
            agent_id,
            reputation: agent.reputation,
            current_load: agent.current_load,
            tier,
            composite_score,
        })
    }

    // ---- Tasks ----

    /// Submit a single task into an existing workflow.
    pub async fn submit_task(&self, workflow_id: Uuid, spec: TaskSpec) -> Result<Uuid> {
        self.scheduler.submit(spec, workflow_id).await
    }

    /// Submit a batch of tasks as a new workflow.
    pub async fn submit_workflow(&self, specs: Vec<TaskSpec>) -> Result<(Uuid, Vec<Uuid>)> {
        let workflow_id = Uuid::new_v4();
        let ids = self.scheduler.submit_workflow(specs, workflow_id).await?;
        Ok((workflow_id, ids))
    }

    /// All tasks ready to run, ordered by composite priority.
    pub async fn ready_tasks(&self) -> Vec<Task> {
        self.scheduler.ready_tasks().await
    }

    pub async fn get_task(&self, task_id: Uuid) -> Option<Task> {
        self.scheduler.get(task_id).await
    }

    /// Explicitly assign a ready task to an agent.
    ///
    /// Fails with the specific filter violation (capability, clearance,
    /// reputation, capacity) and reserves load atomically on success.
    #[instrument(skip(self), err)]
    pub async fn assign_task(&self, task_id: Uuid, agent_id: Uuid) -> Result<()> {
        let task = self
            .scheduler
            .get(task_id)
            .await
            .ok_or(CoordinationError::TaskNotFound(task_id))?;
        let agent = self
            .registry
            .get(agent_id)
            .await
            .ok_or(CoordinationError::AgentNotFound(agent_id))?;

        self.selector.eligibility(&task, &agent)?;

        self.registry.try_reserve(agent_id).await?;
        if let Err(err) = self.scheduler.mark_assigned(task_id, agent_id).await {
            self.registry.release(agent_id).await?;
            return Err(err);
        }
        info!(task_id = %task_id, agent_id = %agent_id, "Task assigned");
        Ok(())
    }

    /// Record the outcome of an executed task.
    ///
    /// Updates the task graph, the agent's reputation and history, and
    /// releases the load held by the assignment.
    #[instrument(skip(self, outcome), err)]
    pub async fn record_outcome(
        &self,
        agent_id: Uuid,
        task_id: Uuid,
        outcome: TaskOutcome,
    ) -> Result<()> {
        let task = self
            .scheduler
            .get(task_id)
            .await
            .ok_or(CoordinationError::TaskNotFound(task_id))?;

        // Assigned tasks pass through Running before settling
        if task.status == TaskStatus::Assigned {
            self.scheduler.mark_running(task_id).await?;
        }

        self.tracker.record_outcome(agent_id, &task, outcome).await?;
        self.scheduler.record_result(task_id, outcome.success).await?;

        if let Some(assigned) = task.assigned_agent {
            self.registry.release(assigned).await?;
        }
        Ok(())
    }

    /// Cancel all non-terminal tasks of a workflow and release held load.
    pub async fn cancel_workflow(&self, workflow_id: Uuid) -> Result<()> {
        let released = self.scheduler.cancel_workflow(workflow_id).await;
        for agent_id in released {
            self.registry.release(agent_id).await?;
        }
        Ok(())
    }

    /// Build a coordination plan for a workflow against a resource pool.
    pub async fn plan_workflow(
        &self,
        workflow_id: Uuid,
        resource_pool: &ResourceFootprint,
        strategy: Strategy,
    ) -> Result<CoordinationPlan> {
        let tasks = self.scheduler.tasks_for_workflow(workflow_id).await;
        let agents = self.registry.list().await;
        self.planner
            .create_plan(workflow_id, &tasks, &agents, resource_pool, strategy)
    }

    // ---- Governance ----

    pub async fn create_proposal(
        &self,
        proposal_type: ProposalType,
        subject: impl Into<String>,
        deadline: Option<DateTime<Utc>>,
    ) -> Uuid {
        self.consensus
            .create_proposal(proposal_type, subject, deadline)
            .await
    }

    pub async fn vote(
        &self,
        proposal_id: Uuid,
        agent_id: Uuid,
        approve: bool,
    ) -> Result<ProposalStatus> {
        self.consensus.vote(proposal_id, agent_id, approve).await
    }

    pub async fn proposal_status(&self, proposal_id: Uuid) -> Result<ProposalStatus> {
        self.consensus
            .get(proposal_id)
            .await
            .map(|p| p.status)
            .ok_or(CoordinationError::ProposalNotFound(proposal_id))
    }

    /// Expire Active proposals past their deadline.
    pub async fn expire_proposals(&self) -> Vec<Uuid> {
        self.consensus.expire_overdue().await
    }

    // ---- Rewards ----

    pub async fn create_reward_pool(
        &self,
        workflow_id: Uuid,
        total_budget: f64,
        split: AllocationSplit,
    ) -> Result<Uuid> {
        self.allocator
            .create_pool(workflow_id, total_budget, split)
            .await
    }

    /// Distribute a pool across the agents that completed the workflow's
    /// tasks.
    #[instrument(skip(self), err)]
    pub async fn distribute_rewards(&self, pool_id: Uuid) -> Result<DistributionSummary> {
        let pool = self
            .allocator
            .get_pool(pool_id)
            .await
            .ok_or(CoordinationError::PoolNotFound(pool_id))?;

        let tasks = self.scheduler.tasks_for_workflow(pool.workflow_id).await;
        let mut participant_ids: Vec<Uuid> = tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Completed)
            .filter_map(|t| t.assigned_agent)
            .collect();
        participant_ids.sort_unstable();
        participant_ids.dedup();

        let mut participants = Vec::with_capacity(participant_ids.len());
        for agent_id in participant_ids {
            if let Some(agent) = self.registry.get(agent_id).await {
                let snapshot = self.tracker.snapshot(agent_id).await;
                participants.push((agent, snapshot));
            }
        }

        self.allocator.distribute(pool_id, &participants).await
    }
}

impl Default for CoordinationEngine {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::Capability;

    fn engine() -> CoordinationEngine {
        CoordinationEngine::default()
    }

    fn capable_agent() -> Agent {
        Agent::new("worker").with_capability(Capability::DataAnalysis)
    }

    #[tokio::test]
    async fn test_assign_task_validates_capabilities() {
        let engine = engine();
        let agent_id = engine
            .register_agent(Agent::new("blind").with_capability(Capability::Monitoring))
            .await;
        let (_, ids) = engine
            .submit_workflow(vec![
                TaskSpec::new("analysis").with_capability(Capability::DataAnalysis)
            ])
            .await
            .unwrap();

        engine.ready_tasks().await;
        let err = engine.assign_task(ids[0], agent_id).await.unwrap_err();
        assert!(matches!(err, CoordinationError::CapabilityMismatch { .. }));
    }

    #[tokio::test]
    async fn test_assign_task_reserves_load() {
        let engine = engine();
        let agent_id = engine.register_agent(capable_agent()).await;
        let (_, ids) = engine
            .submit_workflow(vec![
                TaskSpec::new("analysis").with_capability(Capability::DataAnalysis)
            ])
            .await
            .unwrap();

        engine.ready_tasks().await;
        engine.assign_task(ids[0], agent_id).await.unwrap();

        let status = engine.agent_status(agent_id).await.unwrap();
        assert_eq!(status.current_load, 1);
    }

    #[tokio::test]
    async fn test_record_outcome_releases_load_and_updates_reputation() {
        let engine = engine();
        let agent_id = engine.register_agent(capable_agent()).await;
        let (_, ids) = engine
            .submit_workflow(vec![
                TaskSpec::new("analysis").with_capability(Capability::DataAnalysis)
            ])
            .await
            .unwrap();

        engine.ready_tasks().await;
        engine.assign_task(ids[0], agent_id).await.unwrap();
        engine
            .record_outcome(agent_id, ids[0], TaskOutcome::success(1.0, 10))
            .await
            .unwrap();

        let status = engine.agent_status(agent_id).await.unwrap();
        assert_eq!(status.current_load, 0);
        assert!(status.reputation > 50.0);
        assert_eq!(
            engine.get_task(ids[0]).await.unwrap().status,
            TaskStatus::Completed
        );
    }

    #[tokio::test]
    async fn test_cancel_workflow_releases_load() {
        let engine = engine();
        let agent_id = engine.register_agent(capable_agent()).await;
        let (workflow_id, ids) = engine
            .submit_workflow(vec![
                TaskSpec::new("analysis").with_capability(Capability::DataAnalysis)
            ])
            .await
            .unwrap();

        engine.ready_tasks().await;
        engine.assign_task(ids[0], agent_id).await.unwrap();
        engine.cancel_workflow(workflow_id).await.unwrap();

        let status = engine.agent_status(agent_id).await.unwrap();
        assert_eq!(status.current_load, 0);
        assert_eq!(
            engine.get_task(ids[0]).await.unwrap().status,
            TaskStatus::Cancelled
        );
    }

    #[tokio::test]
    async fn test_agent_status_unknown_agent() {
        let engine = engine();
        assert!(engine.agent_status(Uuid::new_v4()).await.is_err());
    }
}
