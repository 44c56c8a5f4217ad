//! Coordination plan domain model.
//!
//! A plan is the concrete agent-to-task assignment and timeline the
//! planner produces for a whole workflow.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::agent::ResourceFootprint;

/// Execution strategy for a workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Independent tasks at the same dependency level run concurrently
    Parallel,
    /// Tasks run one at a time in topological order
    Sequential,
    /// The planner chooses per dependency level
    #[default]
    Adaptive,
}

/// The concrete assignment and timeline for a workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinationPlan {
    /// Plan identifier
    pub id: Uuid,
    /// Workflow the plan covers
    pub workflow_id: Uuid,
    /// All task ids in topological order
    pub task_order: Vec<Uuid>,
    /// Chosen strategy after any degradation
    pub strategy: Strategy,
    /// Agent id -> tasks assigned to it
    pub assignments: HashMap<Uuid, Vec<Uuid>>,
    /// Tasks no eligible agent was found for; caller retries or escalates
    pub unassigned: Vec<Uuid>,
    /// Total resource requirements across the workflow
    pub resource_budget: ResourceFootprint,
    /// Longest dependency-respecting chain, in order
    pub critical_path: Vec<Uuid>,
    /// Estimated completion time in seconds (critical path length)
    pub estimated_duration_secs: u64,
    /// Tasks grouped by dependency depth; same-level tasks may run in parallel
    pub parallel_levels: Vec<Vec<Uuid>>,
    /// When the plan was produced
    pub created_at: DateTime<Utc>,
}

impl CoordinationPlan {
    /// Every task referenced in the assignment map must appear in the task
    /// list exactly once.
    pub fn validate(&self) -> bool {
        let mut seen: HashMap<Uuid, usize> = HashMap::new();
        for task_id in self.assignments.values().flatten() {
            *seen.entry(*task_id).or_insert(0) += 1;
        }
        seen.iter()
            .all(|(id, count)| *count == 1 && self.task_order.contains(id))
    }

    /// Number of tasks that received an assignment.
    pub fn assigned_count(&self) -> usize {
        self.assignments.values().map(Vec::len).sum()
    }
}
