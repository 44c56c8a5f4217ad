//! Executor port - interface for external task execution.
//!
//! The engine decides who runs what and when; the actual computation is
//! external. The dispatcher awaits this port under a timeout and never
//! simulates execution delay itself.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::models::{Task, TaskOutcome};

/// Trait for external execution backends.
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    /// Backend name for logs.
    fn name(&self) -> &'static str;

    /// Execute a task to completion on behalf of the assigned agent.
    ///
    /// An `Err` is an infrastructure failure (the dispatcher retries up to
    /// the task's budget); a returned outcome with `success == false` is a
    /// valid result that flows into performance tracking.
    async fn execute(&self, task: &Task, agent_id: Uuid) -> anyhow::Result<TaskOutcome>;
}

/// Scripted executor for tests and local development.
///
/// Outcomes can be pinned per task id; unpinned tasks resolve with the
/// default outcome.
pub struct MockExecutor {
    default_outcome: TaskOutcome,
    scripted: Arc<RwLock<HashMap<Uuid, TaskOutcome>>>,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self {
            default_outcome: TaskOutcome::success(0.9, 10),
            scripted: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn with_default(mut self, outcome: TaskOutcome) -> Self {
        self.default_outcome = outcome;
        self
    }

    /// Pin the outcome returned for a specific task.
    pub async fn script(&self, task_id: Uuid, outcome: TaskOutcome) {
        self.scripted.write().await.insert(task_id, outcome);
    }
}

impl Default for MockExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskExecutor for MockExecutor {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn execute(&self, task: &Task, _agent_id: Uuid) -> anyhow::Result<TaskOutcome> {
        let scripted = self.scripted.read().await;
        Ok(scripted.get(&task.id).copied().unwrap_or(self.default_outcome))
    }
}
