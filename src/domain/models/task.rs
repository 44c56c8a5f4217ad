//! Task domain model.
//!
//! Tasks are discrete units of work that agents execute.
//! They form a DAG with dependencies; the scheduler owns all status mutations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::agent::{Capability, ClearanceLevel};
use crate::domain::error::TaskError;

/// Status of a task in the coordination pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Task is defined but dependencies not met
    #[default]
    Pending,
    /// Task is ready to be picked up (dependencies met)
    Ready,
    /// Task has been assigned to an agent
    Assigned,
    /// Task is currently being executed
    Running,
    /// Task completed successfully
    Completed,
    /// Task failed during execution
    Failed,
    /// Task was cancelled
    Cancelled,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Ready => "ready",
            Self::Assigned => "assigned",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "ready" => Some(Self::Ready),
            "assigned" => Some(Self::Assigned),
            "running" => Some(Self::Running),
            "completed" | "complete" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            "cancelled" | "canceled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Check if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Valid transitions from this status.
    pub fn valid_transitions(&self) -> Vec<TaskStatus> {
        match self {
            Self::Pending => vec![Self::Ready, Self::Cancelled],
            Self::Ready => vec![Self::Assigned, Self::Cancelled],
            Self::Assigned => vec![Self::Running, Self::Cancelled],
            Self::Running => vec![Self::Completed, Self::Failed, Self::Cancelled],
            Self::Completed => vec![],
            Self::Failed => vec![Self::Pending], // Retry re-enters the dependency gate
            Self::Cancelled => vec![],
        }
    }

    pub fn can_transition_to(&self, new_status: Self) -> bool {
        self.valid_transitions().contains(&new_status)
    }
}

/// Weighting hints used for priority ordering.
///
/// These feed the composite priority key; they never gate execution on
/// their own. Compliance tags additionally act as hard selection filters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightingHints {
    /// Business-value multiplier (the enterprise weight in the priority key).
    pub business_value: f64,
    /// Impact multiplier on the priority key and selection score.
    pub impact_weight: f64,
    /// Compliance tags every candidate agent must declare.
    pub compliance_tags: Vec<Capability>,
    /// Expected execution duration, used for timeline estimation and
    /// timeliness scoring.
    pub estimated_duration_secs: u64,
}

impl Default for WeightingHints {
    fn default() -> Self {
        Self {
            business_value: 1.0,
            impact_weight: 1.0,
            compliance_tags: Vec::new(),
            estimated_duration_secs: 300,
        }
    }
}

/// Submission-time description of a task.
///
/// Specs are expanded into [`Task`]s by the scheduler, which owns id
/// allocation and priority calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSpec {
    /// Caller-assigned id; batch submissions use these to reference
    /// sibling tasks. Generated when absent.
    pub id: Option<Uuid>,
    /// Kind of work, matched against agent specializations
    pub task_type: String,
    /// Opaque payload handed to the executor
    pub payload: serde_json::Value,
    /// Base priority, 1 (lowest) to 10 (highest)
    pub priority: u8,
    /// Task IDs this task depends on
    pub depends_on: Vec<Uuid>,
    /// Capabilities a candidate agent must cover
    pub required_capabilities: Vec<Capability>,
    /// Minimum security clearance of the executing agent
    pub required_clearance: ClearanceLevel,
    /// Priority/selection weighting hints
    pub hints: WeightingHints,
    /// Maximum execution retries before the task is marked Failed
    pub max_retries: u32,
}

impl TaskSpec {
    pub fn new(task_type: impl Into<String>) -> Self {
        Self {
            id: None,
            task_type: task_type.into(),
            payload: serde_json::Value::Null,
            priority: 5,
            depends_on: Vec::new(),
            required_capabilities: Vec::new(),
            required_clearance: ClearanceLevel::Public,
            hints: WeightingHints::default(),
            max_retries: 3,
        }
    }

    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_dependency(mut self, task_id: Uuid) -> Self {
        if !self.depends_on.contains(&task_id) {
            self.depends_on.push(task_id);
        }
        self
    }

    pub fn with_capability(mut self, capability: Capability) -> Self {
        if !self.required_capabilities.contains(&capability) {
            self.required_capabilities.push(capability);
        }
        self
    }

    pub fn with_clearance(mut self, clearance: ClearanceLevel) -> Self {
        self.required_clearance = clearance;
        self
    }

    pub fn with_hints(mut self, hints: WeightingHints) -> Self {
        self.hints = hints;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Validate spec fields that do not require graph context.
    pub fn validate(&self) -> Result<(), TaskError> {
        if self.task_type.trim().is_empty() {
            return Err(TaskError::EmptyTaskType);
        }
        if !(1..=10).contains(&self.priority) {
            return Err(TaskError::InvalidPriority(self.priority));
        }
        if let Some(id) = self.id {
            if self.depends_on.contains(&id) {
                return Err(TaskError::SelfDependency(id));
            }
        }
        Ok(())
    }
}

/// A discrete unit of work assigned to and executed by an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier
    pub id: Uuid,
    /// Workflow this task belongs to
    pub workflow_id: Uuid,
    /// Kind of work, matched against agent specializations
    pub task_type: String,
    /// Opaque payload handed to the executor
    pub payload: serde_json::Value,
    /// Base priority, 1-10
    pub priority: u8,
    /// Task IDs this task depends on
    pub depends_on: Vec<Uuid>,
    /// Current status
    pub status: TaskStatus,
    /// Agent currently holding the assignment
    pub assigned_agent: Option<Uuid>,
    /// Capabilities a candidate agent must cover
    pub required_capabilities: Vec<Capability>,
    /// Minimum security clearance of the executing agent
    pub required_clearance: ClearanceLevel,
    /// Weighting hints for priority ordering
    pub hints: WeightingHints,
    /// Composite priority computed at submission and re-sorts
    pub calculated_priority: f64,
    /// Retry count
    pub retry_count: u32,
    /// Maximum retries
    pub max_retries: u32,
    /// When created
    pub created_at: DateTime<Utc>,
    /// When last updated
    pub updated_at: DateTime<Utc>,
    /// When execution started
    pub started_at: Option<DateTime<Utc>>,
    /// When execution reached a terminal state
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Materialize a task from a spec within a workflow.
    pub fn from_spec(spec: TaskSpec, workflow_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: spec.id.unwrap_or_else(Uuid::new_v4),
            workflow_id,
            task_type: spec.task_type,
            payload: spec.payload,
            priority: spec.priority,
            depends_on: spec.depends_on,
            status: TaskStatus::default(),
            assigned_agent: None,
            required_capabilities: spec.required_capabilities,
            required_clearance: spec.required_clearance,
            hints: spec.hints,
            calculated_priority: 0.0,
            retry_count: 0,
            max_retries: spec.max_retries,
            created_at: now,
            updated_at: now,
            started_at: None,
            completed_at: None,
        }
    }

    pub fn has_dependencies(&self) -> bool {
        !self.depends_on.is_empty()
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn can_transition_to(&self, new_status: TaskStatus) -> bool {
        self.status.can_transition_to(new_status)
    }

    /// Transition to a new status, updating lifecycle timestamps.
    pub fn transition_to(&mut self, new_status: TaskStatus) -> Result<(), TaskError> {
        if !self.can_transition_to(new_status) {
            return Err(TaskError::InvalidTransition {
                from: self.status,
                to: new_status,
            });
        }

        self.status = new_status;
        self.updated_at = Utc::now();

        match new_status {
            TaskStatus::Running => self.started_at = Some(Utc::now()),
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled => {
                self.completed_at = Some(Utc::now());
            }
            _ => {}
        }

        Ok(())
    }

    pub fn can_retry(&self) -> bool {
        self.status == TaskStatus::Failed && self.retry_count < self.max_retries
    }

    /// Increment the retry count and return the task to the dependency gate.
    pub fn retry(&mut self) -> Result<(), TaskError> {
        if !self.can_retry() {
            return Err(TaskError::MaxRetriesExceeded {
                retry_count: self.retry_count,
                max_retries: self.max_retries,
            });
        }
        self.retry_count += 1;
        self.status = TaskStatus::Pending;
        self.assigned_agent = None;
        self.completed_at = None;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Age of the task since submission, in whole minutes.
    pub fn age_minutes(&self, now: DateTime<Utc>) -> f64 {
        let elapsed = now - self.created_at;
        (elapsed.num_seconds().max(0) as f64) / 60.0
    }
}
