use thiserror::Error;
use uuid::Uuid;

use super::models::agent::ClearanceLevel;
use super::models::task::TaskStatus;

/// Domain-level errors for task operations.
#[derive(Error, Debug)]
pub enum TaskError {
    #[error("Task type cannot be empty")]
    EmptyTaskType,

    #[error("Invalid priority: {0} (must be 1-10)")]
    InvalidPriority(u8),

    #[error("Invalid state transition from {from:?} to {to:?}")]
    InvalidTransition { from: TaskStatus, to: TaskStatus },

    #[error("Task cannot be retried: retry count {retry_count} reached max retries {max_retries}")]
    MaxRetriesExceeded { retry_count: u32, max_retries: u32 },

    #[error("Task {0} cannot depend on itself")]
    SelfDependency(Uuid),
}

/// Errors surfaced by the coordination engine.
///
/// Graph-structural errors (cycles, unknown dependencies) are fatal and
/// rejected before any state mutation. Assignment errors are recoverable;
/// callers retry or escalate. Budget overruns and consensus outcomes are
/// represented as data, never as errors.
#[derive(Error, Debug)]
pub enum CoordinationError {
    #[error("Circular dependency detected: {0:?}")]
    CyclicDependency(Vec<Uuid>),

    #[error("Unknown dependency: task {0} does not exist")]
    UnknownDependency(Uuid),

    #[error("Task not found: {0}")]
    TaskNotFound(Uuid),

    #[error("Agent not found: {0}")]
    AgentNotFound(Uuid),

    #[error("Agent {agent_id} does not cover required capabilities for task {task_id}")]
    CapabilityMismatch { agent_id: Uuid, task_id: Uuid },

    #[error(
        "Agent {agent_id} clearance {held} is below the {required} required by task {task_id}"
    )]
    InsufficientClearance {
        agent_id: Uuid,
        task_id: Uuid,
        held: ClearanceLevel,
        required: ClearanceLevel,
    },

    #[error("Agent {agent_id} reputation {reputation:.1} is below the floor {floor:.1}")]
    InsufficientReputation {
        agent_id: Uuid,
        reputation: f64,
        floor: f64,
    },

    #[error("No eligible agent for task {0}")]
    NoEligibleAgent(Uuid),

    #[error("Agent {0} is at capacity")]
    AgentAtCapacity(Uuid),

    #[error("Task {task_id} is not in an assignable state: {status:?}")]
    NotAssignable { task_id: Uuid, status: TaskStatus },

    #[error("Proposal not found: {0}")]
    ProposalNotFound(Uuid),

    #[error("Proposal {0} has expired; vote not accepted")]
    ProposalExpired(Uuid),

    #[error("Proposal {0} is already decided")]
    ProposalClosed(Uuid),

    #[error("Allocation split fractions must be non-negative and sum to 1.0")]
    InvalidAllocationSplit,

    #[error("Reward pool budget must be non-negative, got {0}")]
    InvalidBudget(f64),

    #[error("Reward pool not found: {0}")]
    PoolNotFound(Uuid),

    #[error("Reward pool {0} was already distributed")]
    PoolAlreadyDistributed(Uuid),

    #[error("Execution of task {task_id} timed out after {timeout_secs}s")]
    ExecutionTimeout { task_id: Uuid, timeout_secs: u64 },

    #[error(transparent)]
    Task(#[from] TaskError),
}

pub type Result<T> = std::result::Result<T, CoordinationError>;
