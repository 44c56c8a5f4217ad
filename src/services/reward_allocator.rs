//! Reward allocator.
//!
//! Converts performance snapshots into tiered allocations and distributes
//! a bounded budget. A raw sum over budget is corrected by scaling every
//! allocation with the same factor before anything is marked distributed;
//! the overrun is a logged warning, never a hard failure.

use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::domain::error::{CoordinationError, Result};
use crate::domain::models::{
    Agent, AllocationSplit, Capability, ClearanceLevel, DistributionSummary, PerformanceSnapshot,
    RewardAllocation, RewardConfig, RewardPool, RewardTier,
};

/// Reward pools and allocation math.
pub struct RewardAllocator {
    pools: RwLock<HashMap<Uuid, RewardPool>>,
    config: RewardConfig,
}

impl RewardAllocator {
    pub fn new(config: RewardConfig) -> Self {
        Self {
            pools: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// Create a reward pool for a workflow.
    #[instrument(skip(self), err)]
    pub async fn create_pool(
        &self,
        workflow_id: Uuid,
        total_budget: f64,
        split: AllocationSplit,
    ) -> Result<Uuid> {
        if !split.is_valid() {
            return Err(CoordinationError::InvalidAllocationSplit);
        }
        if total_budget < 0.0 || !total_budget.is_finite() {
            return Err(CoordinationError::InvalidBudget(total_budget));
        }
        let pool = RewardPool::new(workflow_id, total_budget, split);
        let id = pool.id;
        self.pools.write().await.insert(id, pool);
        info!(pool_id = %id, total_budget, "Reward pool created");
        Ok(id)
    }

    pub async fn get_pool(&self, pool_id: Uuid) -> Option<RewardPool> {
        self.pools.read().await.get(&pool_id).cloned()
    }

    /// Weighted composite over the nine sub-scores.
    pub fn composite_score(&self, snapshot: &PerformanceSnapshot) -> f64 {
        let w = &self.config.score_weights;
        snapshot.success_rate * w.success_rate
            + snapshot.quality * w.quality
            + snapshot.security_compliance * w.security_compliance
            + snapshot.efficiency * w.efficiency
            + snapshot.uptime * w.uptime
            + snapshot.cost_efficiency * w.cost_efficiency
            + snapshot.user_satisfaction * w.user_satisfaction
            + snapshot.innovation * w.innovation
            + snapshot.coordination * w.coordination
    }

    /// The domain eligibility flag gating TopTier: quantum capability or
    /// enterprise security compliance.
    pub fn elite_eligible(&self, agent: &Agent) -> bool {
        agent.capabilities.contains(&Capability::QuantumOptimization)
            || (agent.clearance >= ClearanceLevel::Secret
                && (agent.capabilities.contains(&Capability::SecurityAudit)
                    || agent.capabilities.contains(&Capability::Encryption)))
    }

    /// Compute one agent's raw (unscaled) allocation.
    pub fn compute_allocation(
        &self,
        agent: &Agent,
        snapshot: &PerformanceSnapshot,
        pool: &RewardPool,
        agent_count: usize,
    ) -> RewardAllocation {
        let count = agent_count.max(1) as f64;
        let score = self.composite_score(snapshot);
        let elite = self.elite_eligible(agent);
        let tier = RewardTier::for_score(score, elite);

        let base_amount = pool.agent_budget() / count * tier.multiplier();

        let bonus_eligibility = if score >= RewardTier::Bronze.threshold() {
            1.0
        } else {
            0.0
        };
        let bonus_step = if score > 0.95 {
            self.config.bonus_step_elite
        } else if score > 0.90 {
            self.config.bonus_step_high
        } else {
            1.0
        };
        let bonus_amount = pool.bonus_budget() / count * bonus_eligibility * bonus_step;

        let quantum_bonus = if agent.capabilities.contains(&Capability::QuantumOptimization)
            && score >= RewardTier::Gold.threshold()
        {
            self.config.quantum_bonus
        } else {
            0.0
        };
        let security_bonus = if agent.clearance >= ClearanceLevel::Secret
            && (agent.capabilities.contains(&Capability::SecurityAudit)
                || agent.capabilities.contains(&Capability::Encryption))
        {
            self.config.security_bonus
        } else {
            0.0
        };

        let mut allocation = RewardAllocation {
            agent_id: agent.id,
            workflow_id: pool.workflow_id,
            base_amount,
            bonus_amount,
            quantum_bonus,
            security_bonus,
            total_amount: 0.0,
            tier,
            composite_score: score,
            distributed: false,
        };
        allocation.recompute_total();
        allocation
    }

    /// Distribute a pool across the given participants.
    ///
    /// Executes as one logical transaction: allocations are computed,
    /// scaled together when the raw sum overruns the available budget,
    /// and only then marked distributed. A pool distributes at most once.
    #[instrument(skip(self, participants), fields(participants = participants.len()), err)]
    pub async fn distribute(
        &self,
        pool_id: Uuid,
        participants: &[(Agent, PerformanceSnapshot)],
    ) -> Result<DistributionSummary> {
        let mut pools = self.pools.write().await;
        let pool = pools
            .get_mut(&pool_id)
            .ok_or(CoordinationError::PoolNotFound(pool_id))?;
        if pool.distributed {
            return Err(CoordinationError::PoolAlreadyDistributed(pool_id));
        }

        let mut allocations: Vec<RewardAllocation> = participants
            .iter()
            .map(|(agent, snapshot)| {
                self.compute_allocation(agent, snapshot, pool, participants.len())
            })
            .collect();

        let available = pool.available();
        let (total_requested, scale_factor) = scale_to_budget(&mut allocations, available);
        if scale_factor < 1.0 {
            warn!(
                pool_id = %pool_id,
                total_requested,
                available,
                scale_factor,
                "Raw allocations exceed budget; scaling proportionally"
            );
        }

        for allocation in &mut allocations {
            allocation.distributed = true;
        }
        pool.distributed = true;

        let total_distributed = allocations.iter().map(|a| a.total_amount).sum();
        let summary = DistributionSummary {
            pool_id,
            workflow_id: pool.workflow_id,
            total_requested,
            total_distributed,
            scale_factor,
            allocations,
            distributed_at: Utc::now(),
        };
        info!(
            pool_id = %pool_id,
            total_distributed = summary.total_distributed,
            "Rewards distributed"
        );
        Ok(summary)
    }
}

/// Scale allocations down to the available budget when needed.
///
/// Returns the raw requested sum and the uniform factor applied (1.0 when
/// the budget already covers the request).
fn scale_to_budget(allocations: &mut [RewardAllocation], available: f64) -> (f64, f64) {
    let requested: f64 = allocations.iter().map(|a| a.total_amount).sum();
    if requested <= available || requested <= 0.0 {
        return (requested, 1.0);
    }
    let factor = available / requested;
    for allocation in allocations.iter_mut() {
        allocation.scale(factor);
    }
    (requested, factor)
}
