//! Property tests for the engine's core invariants.

use apiary::domain::models::{
    Agent, PerformanceConfig, SchedulerConfig, SelectionConfig, TaskOutcome, TaskSpec,
};
use apiary::services::{
    AgentSelector, CapabilityRegistry, CoordinationPlanner, PerformanceTracker, TaskScheduler,
};
use proptest::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime")
}

proptest! {
    /// Property: reputation stays within [0, 100] for any outcome sequence.
    #[test]
    fn prop_reputation_always_bounded(
        outcomes in prop::collection::vec(
            (any::<bool>(), 0.0f64..=1.0, 0u64..5000),
            1..60,
        )
    ) {
        let rt = runtime();
        rt.block_on(async {
            let registry = Arc::new(CapabilityRegistry::new());
            let agent_id = registry.register(Agent::new("prop-agent")).await;
            let tracker =
                PerformanceTracker::new(Arc::clone(&registry), PerformanceConfig::default());
            let task = apiary::domain::models::Task::from_spec(
                TaskSpec::new("prop-task"),
                Uuid::new_v4(),
            );

            for (success, quality, latency) in outcomes {
                let outcome = TaskOutcome {
                    success,
                    quality,
                    latency_secs: latency,
                };
                let reputation = tracker
                    .record_outcome(agent_id, &task, outcome)
                    .await
                    .expect("record");
                prop_assert!((0.0..=100.0).contains(&reputation));
            }
            Ok(())
        })?;
    }

    /// Property: a task is ready iff every dependency is completed.
    #[test]
    fn prop_ready_iff_dependencies_complete(chain_len in 2usize..10) {
        let rt = runtime();
        rt.block_on(async {
            let scheduler = TaskScheduler::new(SchedulerConfig::default());
            let workflow = Uuid::new_v4();

            // Linear chain t0 <- t1 <- ... <- tn
            let ids: Vec<Uuid> = (0..chain_len).map(|_| Uuid::new_v4()).collect();
            let specs = ids
                .iter()
                .enumerate()
                .map(|(i, &id)| {
                    let spec = TaskSpec::new(format!("step-{i}")).with_id(id);
                    if i > 0 {
                        spec.with_dependency(ids[i - 1])
                    } else {
                        spec
                    }
                })
                .collect();
            scheduler.submit_workflow(specs, workflow).await.expect("submit");

            for (i, &id) in ids.iter().enumerate() {
                // Exactly one task is ready at each step: the chain head
                let ready: Vec<Uuid> =
                    scheduler.ready_tasks().await.iter().map(|t| t.id).collect();
                prop_assert_eq!(&ready, &vec![id], "step {}", i);

                scheduler.mark_assigned(id, Uuid::new_v4()).await.expect("assign");
                scheduler.mark_running(id).await.expect("run");
                scheduler.record_result(id, true).await.expect("complete");
            }
            prop_assert!(scheduler.ready_tasks().await.is_empty());
            Ok(())
        })?;
    }

    /// Property: the critical path length never exceeds the duration sum
    /// and the plan orders dependencies before dependents.
    #[test]
    fn prop_plan_topological_and_bounded(width in 1usize..6, depth in 1usize..5) {
        let rt = runtime();
        rt.block_on(async {
            let scheduler = TaskScheduler::new(SchedulerConfig::default());
            let workflow = Uuid::new_v4();

            // Layered DAG: each task depends on every task one layer up
            let mut layers: Vec<Vec<Uuid>> = Vec::new();
            let mut specs = Vec::new();
            for d in 0..depth {
                let mut layer = Vec::new();
                for w in 0..width {
                    let id = Uuid::new_v4();
                    let mut spec = TaskSpec::new(format!("l{d}-t{w}")).with_id(id);
                    if let Some(previous) = layers.last() {
                        for &dep in previous {
                            spec = spec.with_dependency(dep);
                        }
                    }
                    layer.push(id);
                    specs.push(spec);
                }
                layers.push(layer);
            }
            scheduler.submit_workflow(specs, workflow).await.expect("submit");

            let tasks = scheduler.tasks_for_workflow(workflow).await;
            let planner = CoordinationPlanner::new(AgentSelector::new(SelectionConfig::default()));
            let plan = planner
                .create_plan(
                    workflow,
                    &tasks,
                    &[],
                    &apiary::ResourceFootprint::new(),
                    apiary::Strategy::Adaptive,
                )
                .expect("plan");

            // Topological order: dependencies precede dependents
            let position: HashMap<Uuid, usize> = plan
                .task_order
                .iter()
                .enumerate()
                .map(|(i, &id)| (id, i))
                .collect();
            for task in &tasks {
                for dep in &task.depends_on {
                    prop_assert!(position[dep] < position[&task.id]);
                }
            }

            // Critical path bounded by total duration sum
            let sum: u64 = tasks.iter().map(|t| t.hints.estimated_duration_secs).sum();
            prop_assert!(plan.estimated_duration_secs <= sum);
            // And equals depth * per-task estimate for this layered shape
            let per_task = 300;
            prop_assert_eq!(plan.estimated_duration_secs, depth as u64 * per_task);
            Ok(())
        })?;
    }

    /// Property: after scaling, a distribution never exceeds the available
    /// budget regardless of participant count or scores.
    #[test]
    fn prop_distribution_bounded_by_budget(
        budget in 1.0f64..10_000.0,
        scores in prop::collection::vec(0.0f64..=1.0, 1..10),
    ) {
        let rt = runtime();
        rt.block_on(async {
            let allocator =
                apiary::RewardAllocator::new(apiary::domain::models::RewardConfig::default());
            let workflow = Uuid::new_v4();
            let pool_id = allocator
                .create_pool(workflow, budget, apiary::AllocationSplit::default())
                .await
                .expect("pool");

            let participants: Vec<_> = scores
                .iter()
                .map(|&s| {
                    let agent = Agent::new("prop-worker");
                    let snapshot = apiary::PerformanceSnapshot {
                        agent_id: agent.id,
                        success_rate: s,
                        quality: s,
                        security_compliance: s,
                        efficiency: s,
                        uptime: s,
                        cost_efficiency: s,
                        user_satisfaction: s,
                        innovation: s,
                        coordination: s,
                        tasks_recorded: 1,
                    };
                    (agent, snapshot)
                })
                .collect();

            let summary = allocator.distribute(pool_id, &participants).await.expect("distribute");
            let available = budget * 0.7;
            prop_assert!(summary.total_distributed <= available + 1e-6);

            let sum: f64 = summary.allocations.iter().map(|a| a.total_amount).sum();
            prop_assert!((sum - summary.total_distributed).abs() < 1e-6);
            Ok(())
        })?;
    }
}
