//! Performance tracker.
//!
//! Records task outcomes and maintains agent reputation. Failure is
//! penalized twice as hard as success is rewarded; the asymmetry biases
//! the system toward caution and must be preserved. Reputation changes
//! only through recorded outcomes — there is no passive decay.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::domain::error::Result;
use crate::domain::models::{
    AgentPerformance, AuxMetrics, OutcomeRecord, PerformanceConfig, PerformanceSnapshot, Task,
    TaskOutcome,
};
use crate::services::capability_registry::CapabilityRegistry;

/// Reputation gained on success.
const SUCCESS_REWARD: f64 = 1.0;
/// Reputation lost on failure: twice the success reward.
const FAILURE_PENALTY: f64 = -2.0;

/// Tracks per-agent outcomes and drives reputation updates.
pub struct PerformanceTracker {
    registry: Arc<CapabilityRegistry>,
    state: RwLock<HashMap<Uuid, AgentPerformance>>,
    config: PerformanceConfig,
}

impl PerformanceTracker {
    pub fn new(registry: Arc<CapabilityRegistry>, config: PerformanceConfig) -> Self {
        Self {
            registry,
            state: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// Record an execution outcome and update the agent's reputation.
    ///
    /// `delta = (success ? +1 : -2) + (quality - 0.5)*2 + (timeliness - 0.5)*2`,
    /// with the result clamped to [0, 100]. Returns the new reputation.
    #[instrument(skip(self, task, outcome), fields(agent_id = %agent_id, task_id = %task.id), err)]
    pub async fn record_outcome(
        &self,
        agent_id: Uuid,
        task: &Task,
        outcome: TaskOutcome,
    ) -> Result<f64> {
        let timeliness = timeliness_score(outcome.latency_secs, task.hints.estimated_duration_secs);
        let base = if outcome.success {
            SUCCESS_REWARD
        } else {
            FAILURE_PENALTY
        };
        let delta = base + (outcome.quality - 0.5) * 2.0 + (timeliness - 0.5) * 2.0;

        let reputation = self.registry.adjust_reputation(agent_id, delta).await?;

        let mut state = self.state.write().await;
        let perf = state
            .entry(agent_id)
            .or_insert_with(|| AgentPerformance::new(agent_id, self.config.history_window));
        perf.push(
            OutcomeRecord {
                task_id: task.id,
                success: outcome.success,
                quality: outcome.quality,
                timeliness,
                recorded_at: Utc::now(),
            },
            task.has_dependencies(),
        );

        info!(
            success = outcome.success,
            delta,
            reputation,
            "Outcome recorded"
        );
        Ok(reputation)
    }

    /// Merge externally measured sub-scores for an agent.
    pub async fn report_aux_metrics(&self, agent_id: Uuid, aux: AuxMetrics) {
        let mut state = self.state.write().await;
        let perf = state
            .entry(agent_id)
            .or_insert_with(|| AgentPerformance::new(agent_id, self.config.history_window));
        perf.aux = aux;
    }

    /// Snapshot of an agent's sub-scores; a fresh neutral snapshot when
    /// nothing has been recorded yet.
    pub async fn snapshot(&self, agent_id: Uuid) -> PerformanceSnapshot {
        let state = self.state.read().await;
        match state.get(&agent_id) {
            Some(perf) => PerformanceSnapshot::from_performance(perf),
            None => PerformanceSnapshot::from_performance(&AgentPerformance::new(
                agent_id,
                self.config.history_window,
            )),
        }
    }
}

/// Map latency against the task estimate into [0, 1].
///
/// On-time or faster scores 1.0; the score decays toward zero as latency
/// grows past the estimate.
fn timeliness_score(latency_secs: u64, estimated_secs: u64) -> f64 {
    if latency_secs == 0 {
        return 1.0;
    }
    let estimated = estimated_secs.max(1) as f64;
    (estimated / latency_secs as f64).clamp(0.0, 1.0)
}
