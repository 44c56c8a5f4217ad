//! Dispatcher.
//!
//! Drains the ready set through the executor port. Execution is external
//! and asynchronous; the dispatcher awaits results under a timeout and
//! never holds a scheduler or registry lock across that suspension.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::time::timeout;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::domain::models::{SchedulerConfig, Task, TaskOutcome};
use crate::domain::ports::TaskExecutor;
use crate::services::agent_selector::AgentSelector;
use crate::services::capability_registry::CapabilityRegistry;
use crate::services::performance_tracker::PerformanceTracker;
use crate::services::task_scheduler::TaskScheduler;

/// Counters for one dispatch cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleStats {
    pub dispatched: usize,
    pub completed: usize,
    pub failed: usize,
    pub timed_out: usize,
    /// Ready tasks left behind because no eligible agent was available
    pub unassigned: usize,
}

/// Pulls ready tasks, assigns agents, and awaits execution results.
pub struct Dispatcher {
    scheduler: Arc<TaskScheduler>,
    registry: Arc<CapabilityRegistry>,
    selector: AgentSelector,
    tracker: Arc<PerformanceTracker>,
    executor: Arc<dyn TaskExecutor>,
    execution_timeout: Duration,
}

impl Dispatcher {
    pub fn new(
        scheduler: Arc<TaskScheduler>,
        registry: Arc<CapabilityRegistry>,
        selector: AgentSelector,
        tracker: Arc<PerformanceTracker>,
        executor: Arc<dyn TaskExecutor>,
        config: &SchedulerConfig,
    ) -> Self {
        Self {
            scheduler,
            registry,
            selector,
            tracker,
            executor,
            execution_timeout: Duration::from_secs(config.execution_timeout_secs),
        }
    }

    /// Dispatch the current ready set once and await every result.
    ///
    /// Unrelated tasks execute concurrently. Tasks without an eligible
    /// agent stay Ready for a later cycle.
    #[instrument(skip(self))]
    pub async fn run_cycle(&self) -> CycleStats {
        let ready = self.scheduler.ready_tasks().await;
        let mut stats = CycleStats::default();
        let mut inflight = FuturesUnordered::new();

        for task in ready {
            let agents = self.registry.list().await;
            let Some(agent_id) = self.selector.select(&task, &agents) else {
                stats.unassigned += 1;
                continue;
            };
            if self.registry.try_reserve(agent_id).await.is_err() {
                stats.unassigned += 1;
                continue;
            }
            if let Err(err) = self.scheduler.mark_assigned(task.id, agent_id).await {
                warn!(task_id = %task.id, %err, "Assignment lost; releasing load");
                let _ = self.registry.release(agent_id).await;
                continue;
            }
            if let Err(err) = self.scheduler.mark_running(task.id).await {
                error!(task_id = %task.id, %err, "Failed to start task");
                let _ = self.registry.release(agent_id).await;
                continue;
            }

            stats.dispatched += 1;
            let executor = Arc::clone(&self.executor);
            let limit = self.execution_timeout;
            inflight.push(async move {
                let result = timeout(limit, executor.execute(&task, agent_id)).await;
                (task, agent_id, result)
            });
        }

        while let Some((task, agent_id, result)) = inflight.next().await {
            match result {
                Ok(Ok(outcome)) => {
                    self.settle(&task, agent_id, outcome).await;
                    if outcome.success {
                        stats.completed += 1;
                    } else {
                        stats.failed += 1;
                    }
                }
                Ok(Err(err)) => {
                    warn!(task_id = %task.id, %err, "Executor error; recording failure");
                    self.settle(&task, agent_id, TaskOutcome::failure(0)).await;
                    stats.failed += 1;
                }
                Err(_) => {
                    warn!(
                        task_id = %task.id,
                        timeout_secs = self.execution_timeout.as_secs(),
                        "Execution timed out"
                    );
                    self.settle(
                        &task,
                        agent_id,
                        TaskOutcome::failure(self.execution_timeout.as_secs()),
                    )
                    .await;
                    stats.timed_out += 1;
                }
            }
            if let Err(err) = self.registry.release(agent_id).await {
                error!(agent_id = %agent_id, %err, "Failed to release load");
            }
        }

        info!(?stats, "Dispatch cycle finished");
        stats
    }

    /// Run cycles until no further task can be dispatched.
    ///
    /// Failed tasks with retry budget re-enter the ready set and are
    /// retried here up to their `max_retries`.
    pub async fn drain(&self) -> CycleStats {
        let mut total = CycleStats::default();
        loop {
            let stats = self.run_cycle().await;
            total.dispatched += stats.dispatched;
            total.completed += stats.completed;
            total.failed += stats.failed;
            total.timed_out += stats.timed_out;
            total.unassigned = stats.unassigned;
            if stats.dispatched == 0 {
                break;
            }
        }
        total
    }

    async fn settle(&self, task: &Task, agent_id: Uuid, outcome: TaskOutcome) {
        if let Err(err) = self.tracker.record_outcome(agent_id, task, outcome).await {
            error!(task_id = %task.id, %err, "Failed to record outcome");
        }
        if let Err(err) = self.scheduler.record_result(task.id, outcome.success).await {
            error!(task_id = %task.id, %err, "Failed to record result");
        }
    }
}
