//! Task scheduler.
//!
//! Owns the task set and dependency graph. All status mutations are
//! serialized through the internal write lock; `ready_tasks` therefore
//! always reflects a consistent snapshot of the graph.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::domain::error::{CoordinationError, Result};
use crate::domain::models::{SchedulerConfig, Task, TaskSpec, TaskStatus};

/// Scheduler over the task dependency graph.
pub struct TaskScheduler {
    tasks: Arc<RwLock<HashMap<Uuid, Task>>>,
    config: SchedulerConfig,
}

impl TaskScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            tasks: Arc::new(RwLock::new(HashMap::new())),
            config,
        }
    }

    /// Submit a single task into a workflow.
    ///
    /// Every dependency must already exist — forward declarations are not
    /// accepted on this path; use [`submit_workflow`](Self::submit_workflow)
    /// for batches with internal references. Cycle detection runs over the
    /// whole graph including the new task before anything is inserted.
    #[instrument(skip(self, spec), fields(task_type = %spec.task_type), err)]
    pub async fn submit(&self, spec: TaskSpec, workflow_id: Uuid) -> Result<Uuid> {
        spec.validate()?;

        let mut tasks = self.tasks.write().await;
        for dep_id in &spec.depends_on {
            if !tasks.contains_key(dep_id) {
                return Err(CoordinationError::UnknownDependency(*dep_id));
            }
        }

        let mut task = Task::from_spec(spec, workflow_id);
        if task.depends_on.contains(&task.id) {
            return Err(CoordinationError::CyclicDependency(vec![task.id]));
        }

        if let Some(cycle) = detect_cycle_with(&tasks, &[&task]) {
            warn!(?cycle, "Rejecting submission: circular dependency");
            return Err(CoordinationError::CyclicDependency(cycle));
        }

        task.calculated_priority = self.composite_priority(&task, Utc::now());
        let id = task.id;
        tasks.insert(id, task);
        info!(task_id = %id, "Task submitted");
        Ok(id)
    }

    /// Submit a batch of interdependent tasks as one workflow.
    ///
    /// Specs may reference each other through caller-assigned ids. The
    /// whole batch is validated — unknown dependencies and cycles reject
    /// the entire submission before any task is inserted.
    #[instrument(skip(self, specs), fields(count = specs.len()), err)]
    pub async fn submit_workflow(
        &self,
        specs: Vec<TaskSpec>,
        workflow_id: Uuid,
    ) -> Result<Vec<Uuid>> {
        let mut tasks = self.tasks.write().await;

        let mut batch = Vec::with_capacity(specs.len());
        for spec in specs {
            spec.validate()?;
            batch.push(Task::from_spec(spec, workflow_id));
        }

        let batch_ids: HashSet<Uuid> = batch.iter().map(|t| t.id).collect();
        for task in &batch {
            for dep_id in &task.depends_on {
                if !tasks.contains_key(dep_id) && !batch_ids.contains(dep_id) {
                    return Err(CoordinationError::UnknownDependency(*dep_id));
                }
            }
        }

        let refs: Vec<&Task> = batch.iter().collect();
        if let Some(cycle) = detect_cycle_with(&tasks, &refs) {
            warn!(?cycle, "Rejecting workflow: circular dependency");
            return Err(CoordinationError::CyclicDependency(cycle));
        }

        let now = Utc::now();
        let mut ids = Vec::with_capacity(batch.len());
        for mut task in batch {
            task.calculated_priority = self.composite_priority(&task, now);
            ids.push(task.id);
            tasks.insert(task.id, task);
        }
        info!(workflow_id = %workflow_id, count = ids.len(), "Workflow submitted");
        Ok(ids)
    }

    /// All tasks that can run now, ordered by composite priority.
    ///
    /// Pending tasks whose dependencies are all Completed flip to Ready as
    /// a side effect; tasks already Ready are included so an undispatched
    /// task stays visible. The flip and the snapshot happen under one
    /// write lock.
    pub async fn ready_tasks(&self) -> Vec<Task> {
        let mut tasks = self.tasks.write().await;
        let now = Utc::now();

        let completed: HashSet<Uuid> = tasks
            .values()
            .filter(|t| t.status == TaskStatus::Completed)
            .map(|t| t.id)
            .collect();

        let newly_ready: Vec<Uuid> = tasks
            .values()
            .filter(|t| {
                t.status == TaskStatus::Pending
                    && t.depends_on.iter().all(|dep| completed.contains(dep))
            })
            .map(|t| t.id)
            .collect();

        for id in newly_ready {
            if let Some(task) = tasks.get_mut(&id) {
                // Pending -> Ready is always a valid transition
                let _ = task.transition_to(TaskStatus::Ready);
                task.calculated_priority = self.composite_priority(task, now);
                debug!(task_id = %id, priority = task.calculated_priority, "Task ready");
            }
        }

        let mut ready: Vec<Task> = tasks
            .values()
            .filter(|t| t.status == TaskStatus::Ready)
            .cloned()
            .collect();
        sort_by_priority(&mut ready);
        ready
    }

    /// Composite priority key.
    ///
    /// `priority x business_value x impact_weight + urgency_bonus`, where
    /// the urgency bonus grows with task age (capped) so a long-waiting
    /// task floats upward instead of starving.
    pub fn composite_priority(&self, task: &Task, now: DateTime<Utc>) -> f64 {
        let base = f64::from(task.priority) * task.hints.business_value * task.hints.impact_weight;
        let urgency = (task.age_minutes(now) * self.config.urgency_bonus_per_minute)
            .min(self.config.urgency_bonus_cap);
        base + urgency
    }

    pub async fn get(&self, task_id: Uuid) -> Option<Task> {
        self.tasks.read().await.get(&task_id).cloned()
    }

    pub async fn all_tasks(&self) -> Vec<Task> {
        self.tasks.read().await.values().cloned().collect()
    }

    pub async fn tasks_for_workflow(&self, workflow_id: Uuid) -> Vec<Task> {
        self.tasks
            .read()
            .await
            .values()
            .filter(|t| t.workflow_id == workflow_id)
            .cloned()
            .collect()
    }

    /// Move a Ready task to Assigned and attach the agent.
    pub async fn mark_assigned(&self, task_id: Uuid, agent_id: Uuid) -> Result<Task> {
        let mut tasks = self.tasks.write().await;
        let task = tasks
            .get_mut(&task_id)
            .ok_or(CoordinationError::TaskNotFound(task_id))?;
        if task.status != TaskStatus::Ready {
            return Err(CoordinationError::NotAssignable {
                task_id,
                status: task.status,
            });
        }
        task.transition_to(TaskStatus::Assigned)?;
        task.assigned_agent = Some(agent_id);
        Ok(task.clone())
    }

    /// Move an Assigned task to Running.
    pub async fn mark_running(&self, task_id: Uuid) -> Result<Task> {
        let mut tasks = self.tasks.write().await;
        let task = tasks
            .get_mut(&task_id)
            .ok_or(CoordinationError::TaskNotFound(task_id))?;
        task.transition_to(TaskStatus::Running)?;
        Ok(task.clone())
    }

    /// Record an execution result.
    ///
    /// Failures re-queue through the dependency gate while the retry
    /// budget lasts; an exhausted budget leaves the task Failed.
    #[instrument(skip(self), err)]
    pub async fn record_result(&self, task_id: Uuid, success: bool) -> Result<Task> {
        let mut tasks = self.tasks.write().await;
        let task = tasks
            .get_mut(&task_id)
            .ok_or(CoordinationError::TaskNotFound(task_id))?;

        if success {
            task.transition_to(TaskStatus::Completed)?;
            info!(task_id = %task_id, "Task completed");
        } else {
            task.transition_to(TaskStatus::Failed)?;
            if task.can_retry() {
                task.retry()?;
                info!(
                    task_id = %task_id,
                    retry = task.retry_count,
                    max = task.max_retries,
                    "Task failed, re-queued"
                );
            } else {
                warn!(task_id = %task_id, "Task failed permanently");
            }
        }
        Ok(task.clone())
    }

    /// Cancel every non-terminal task of a workflow.
    ///
    /// Returns the agents whose in-flight assignments were released so the
    /// caller can return their load. Other workflows are untouched.
    #[instrument(skip(self))]
    pub async fn cancel_workflow(&self, workflow_id: Uuid) -> Vec<Uuid> {
        let mut tasks = self.tasks.write().await;
        let mut released_agents = Vec::new();

        for task in tasks.values_mut() {
            if task.workflow_id != workflow_id || task.is_terminal() {
                continue;
            }
            if let Some(agent_id) = task.assigned_agent {
                released_agents.push(agent_id);
            }
            let _ = task.transition_to(TaskStatus::Cancelled);
        }
        info!(workflow_id = %workflow_id, released = released_agents.len(), "Workflow cancelled");
        released_agents
    }
}

/// Sort by descending composite priority, breaking ties by earliest
/// creation time.
pub fn sort_by_priority(tasks: &mut [Task]) {
    tasks.sort_by(|a, b| {
        b.calculated_priority
            .partial_cmp(&a.calculated_priority)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.created_at.cmp(&b.created_at))
    });
}

/// DFS cycle detection over the stored graph plus not-yet-inserted tasks.
///
/// Returns the offending path when a cycle exists.
fn detect_cycle_with(existing: &HashMap<Uuid, Task>, pending: &[&Task]) -> Option<Vec<Uuid>> {
    let mut graph: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for task in existing.values() {
        graph.entry(task.id).or_default().extend(&task.depends_on);
    }
    for task in pending {
        graph.entry(task.id).or_default().extend(&task.depends_on);
    }

    let mut visited = HashSet::new();
    let mut rec_stack = HashSet::new();
    let mut path = Vec::new();

    let nodes: Vec<Uuid> = graph.keys().copied().collect();
    for node in nodes {
        if !visited.contains(&node)
            && dfs_cycle(node, &graph, &mut visited, &mut rec_stack, &mut path)
        {
            return Some(path);
        }
    }
    None
}

fn dfs_cycle(
    node: Uuid,
    graph: &HashMap<Uuid, Vec<Uuid>>,
    visited: &mut HashSet<Uuid>,
    rec_stack: &mut HashSet<Uuid>,
    path: &mut Vec<Uuid>,
) -> bool {
    visited.insert(node);
    rec_stack.insert(node);
    path.push(node);

    if let Some(neighbors) = graph.get(&node) {
        for &neighbor in neighbors {
            if !visited.contains(&neighbor) {
                if dfs_cycle(neighbor, graph, visited, rec_stack, path) {
                    return true;
                }
            } else if rec_stack.contains(&neighbor) {
                if let Some(cycle_start) = path.iter().position(|&id| id == neighbor) {
                    path.drain(0..cycle_start);
                    return true;
                }
            }
        }
    }

    rec_stack.remove(&node);
    path.pop();
    false
}
