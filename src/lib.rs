//! Apiary - Multi-Agent Task Coordination & Reward Engine
//!
//! Apiary decomposes workflows into dependent tasks, assigns each task to
//! the best-fit agent under capability, load, and security constraints,
//! tracks per-agent performance and reputation, runs weighted-consensus
//! governance votes, and distributes bounded reward budgets proportionally
//! to measured contribution.
//!
//! # Architecture
//!
//! - **Domain Layer** (`domain`): Pure models, errors, and ports
//! - **Service Layer** (`services`): The coordination components and the
//!   engine facade
//! - **Infrastructure Layer** (`infrastructure`): Config loading, logging
//!
//! # Example
//!
//! ```no_run
//! use apiary::domain::models::{Agent, Capability, Config, TaskSpec};
//! use apiary::services::CoordinationEngine;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let engine = CoordinationEngine::new(Config::default());
//!     engine
//!         .register_agent(Agent::new("analyst").with_capability(Capability::DataAnalysis))
//!         .await;
//!     let (_workflow, _ids) = engine
//!         .submit_workflow(vec![
//!             TaskSpec::new("analysis").with_capability(Capability::DataAnalysis),
//!         ])
//!         .await?;
//!     Ok(())
//! }
//! ```

pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::error::{CoordinationError, TaskError};
pub use domain::models::{
    Agent, AllocationSplit, Capability, ClearanceLevel, Config, CoordinationPlan,
    DistributionSummary, PerformanceSnapshot, Proposal, ProposalStatus, ProposalType,
    ResourceFootprint, RewardAllocation, RewardPool, RewardTier, Strategy, Task, TaskOutcome,
    TaskSpec, TaskStatus,
};
pub use domain::ports::{MockExecutor, TaskExecutor};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{
    AgentSelector, AgentStatusView, CapabilityRegistry, ConsensusEngine, CoordinationEngine,
    CoordinationPlanner, CycleStats, Dispatcher, PerformanceTracker, RewardAllocator,
    TaskScheduler,
};
