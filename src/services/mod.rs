pub mod agent_selector;
pub mod capability_registry;
pub mod consensus_engine;
pub mod coordination_planner;
pub mod dispatcher;
pub mod engine;
pub mod performance_tracker;
pub mod reward_allocator;
pub mod task_scheduler;

pub use agent_selector::AgentSelector;
pub use capability_registry::CapabilityRegistry;
pub use consensus_engine::ConsensusEngine;
pub use coordination_planner::CoordinationPlanner;
pub use dispatcher::{CycleStats, Dispatcher};
pub use engine::{AgentStatusView, CoordinationEngine};
pub use performance_tracker::PerformanceTracker;
pub use reward_allocator::RewardAllocator;
pub use task_scheduler::TaskScheduler;
