pub mod agent;
pub mod config;
pub mod performance;
pub mod plan;
pub mod proposal;
pub mod reward;
pub mod task;

pub use agent::{
    Agent, Capability, ClearanceLevel, ResourceFootprint, REPUTATION_DEFAULT, REPUTATION_MAX,
    REPUTATION_MIN,
};
pub use config::{
    Config, ConsensusConfig, LoggingConfig, PerformanceConfig, RewardConfig, SchedulerConfig,
    ScoreWeights, SelectionConfig,
};
pub use performance::{
    AgentPerformance, AuxMetrics, OutcomeRecord, PerformanceSnapshot, TaskOutcome,
};
pub use plan::{CoordinationPlan, Strategy};
pub use proposal::{Proposal, ProposalStatus, ProposalType, Vote, VoteOutcome, VotePolicy};
pub use reward::{
    AllocationSplit, DistributionSummary, RewardAllocation, RewardPool, RewardTier,
};
pub use task::{Task, TaskSpec, TaskStatus, WeightingHints};
