//! Coordination planner.
//!
//! Builds an execution plan for a whole workflow: per-task assignments,
//! a critical-path timeline from earliest-start times, and the parallel
//! opportunities at each dependency level. Resource overruns degrade the
//! strategy to Sequential instead of failing.

use std::collections::HashMap;

use chrono::Utc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::domain::error::{CoordinationError, Result};
use crate::domain::models::{Agent, CoordinationPlan, ResourceFootprint, Strategy, Task};
use crate::services::agent_selector::AgentSelector;

/// Planner over a workflow's task graph.
#[derive(Debug, Clone, Default)]
pub struct CoordinationPlanner {
    selector: AgentSelector,
}

impl CoordinationPlanner {
    pub fn new(selector: AgentSelector) -> Self {
        Self { selector }
    }

    /// Produce a plan for the given tasks.
    ///
    /// Assignment walks tasks in topological order with simulated loads so
    /// early picks raise an agent's load for later scoring. Tasks with no
    /// eligible agent land in `unassigned`; the plan is still usable.
    #[instrument(skip(self, tasks, agents, resource_pool), fields(workflow_id = %workflow_id, tasks = tasks.len()))]
    pub fn create_plan(
        &self,
        workflow_id: Uuid,
        tasks: &[Task],
        agents: &[Agent],
        resource_pool: &ResourceFootprint,
        requested: Strategy,
    ) -> Result<CoordinationPlan> {
        let order = topological_order(tasks)?;
        let by_id: HashMap<Uuid, &Task> = tasks.iter().map(|t| (t.id, t)).collect();

        // Earliest-start pass over the topological order
        let mut earliest_start: HashMap<Uuid, u64> = HashMap::new();
        let mut critical_pred: HashMap<Uuid, Uuid> = HashMap::new();
        let mut depth: HashMap<Uuid, usize> = HashMap::new();

        for &id in &order {
            let task = by_id[&id];
            let mut start = 0;
            let mut level = 0;
            for dep_id in &task.depends_on {
                let Some(dep) = by_id.get(dep_id) else {
                    // Dependency outside this workflow; treat as satisfied
                    continue;
                };
                let dep_finish =
                    earliest_start[dep_id] + dep.hints.estimated_duration_secs;
                if dep_finish > start {
                    start = dep_finish;
                    critical_pred.insert(id, *dep_id);
                }
                level = level.max(depth[dep_id] + 1);
            }
            earliest_start.insert(id, start);
            depth.insert(id, level);
        }

        // Total duration and the critical-path tail
        let mut total_duration = 0;
        let mut tail: Option<Uuid> = None;
        for &id in &order {
            let finish = earliest_start[&id] + by_id[&id].hints.estimated_duration_secs;
            if finish > total_duration {
                total_duration = finish;
                tail = Some(id);
            }
        }

        let mut critical_path = Vec::new();
        let mut cursor = tail;
        while let Some(id) = cursor {
            critical_path.push(id);
            cursor = critical_pred.get(&id).copied();
        }
        critical_path.reverse();

        // Parallel opportunities: tasks sharing a dependency-depth level
        let max_depth = depth.values().copied().max().unwrap_or(0);
        let mut parallel_levels: Vec<Vec<Uuid>> = vec![Vec::new(); max_depth + 1];
        for &id in &order {
            parallel_levels[depth[&id]].push(id);
        }
        if tasks.is_empty() {
            parallel_levels.clear();
        }

        // Assignment with simulated load
        let mut pool_agents: Vec<Agent> = agents.to_vec();
        let mut assignments: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        let mut assigned_agent_of: HashMap<Uuid, Uuid> = HashMap::new();
        let mut unassigned = Vec::new();

        for &id in &order {
            let task = by_id[&id];
            match self.selector.select(task, &pool_agents) {
                Some(agent_id) => {
                    assignments.entry(agent_id).or_default().push(id);
                    assigned_agent_of.insert(id, agent_id);
                    if let Some(agent) = pool_agents.iter_mut().find(|a| a.id == agent_id) {
                        agent.current_load += 1;
                    }
                }
                None => {
                    debug!(task_id = %id, "No eligible agent during planning");
                    unassigned.push(id);
                }
            }
        }

        // Peak concurrent resource requirement: the widest level's agents
        let mut resource_budget = ResourceFootprint::new();
        if let Some(widest) = parallel_levels.iter().max_by_key(|level| level.len()) {
            for task_id in widest {
                if let Some(agent_id) = assigned_agent_of.get(task_id) {
                    if let Some(agent) = agents.iter().find(|a| a.id == *agent_id) {
                        resource_budget.add(&agent.footprint);
                    }
                }
            }
        }

        let parallelizable = parallel_levels.iter().any(|level| level.len() > 1);
        let fits = resource_budget.fits_within(resource_pool);
        let strategy = match requested {
            Strategy::Sequential => Strategy::Sequential,
            Strategy::Parallel | Strategy::Adaptive => {
                if !fits {
                    // Degradation, not an error
                    warn!(workflow_id = %workflow_id, "Resource pool exceeded; degrading to sequential");
                    Strategy::Sequential
                } else if parallelizable {
                    Strategy::Parallel
                } else {
                    Strategy::Sequential
                }
            }
        };

        let plan = CoordinationPlan {
            id: Uuid::new_v4(),
            workflow_id,
            task_order: order,
            strategy,
            assignments,
            unassigned,
            resource_budget,
            critical_path,
            estimated_duration_secs: total_duration,
            parallel_levels,
            created_at: Utc::now(),
        };
        info!(
            plan_id = %plan.id,
            strategy = ?plan.strategy,
            duration = plan.estimated_duration_secs,
            unassigned = plan.unassigned.len(),
            "Plan created"
        );
        Ok(plan)
    }
}

/// Kahn's algorithm over the workflow's internal dependency edges.
fn topological_order(tasks: &[Task]) -> Result<Vec<Uuid>> {
    let ids: HashMap<Uuid, &Task> = tasks.iter().map(|t| (t.id, t)).collect();
    let mut in_degree: HashMap<Uuid, usize> = HashMap::new();
    let mut dependents: HashMap<Uuid, Vec<Uuid>> = HashMap::new();

    for task in tasks {
        in_degree.entry(task.id).or_insert(0);
        for dep_id in &task.depends_on {
            if ids.contains_key(dep_id) {
                dependents.entry(*dep_id).or_default().push(task.id);
                *in_degree.entry(task.id).or_insert(0) += 1;
            }
        }
    }

    // Deterministic pop order: earliest creation first among the frontier
    let mut frontier: Vec<Uuid> = in_degree
        .iter()
        .filter(|(_, &degree)| degree == 0)
        .map(|(&id, _)| id)
        .collect();
    frontier.sort_by_key(|id| std::cmp::Reverse(ids[id].created_at));

    let mut order = Vec::with_capacity(tasks.len());
    while let Some(id) = frontier.pop() {
        order.push(id);
        if let Some(children) = dependents.get(&id) {
            for &child in children {
                let degree = in_degree.get_mut(&child).expect("child tracked");
                *degree -= 1;
                if *degree == 0 {
                    frontier.push(child);
                }
            }
        }
    }

    if order.len() != tasks.len() {
        let stuck: Vec<Uuid> = in_degree
            .into_iter()
            .filter(|(_, degree)| *degree > 0)
            .map(|(id, _)| id)
            .collect();
        return Err(CoordinationError::CyclicDependency(stuck));
    }
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{Capability, SelectionConfig, TaskSpec, WeightingHints};

    fn task(task_type: &str, duration: u64, deps: Vec<Uuid>) -> Task {
        let mut spec = TaskSpec::new(task_type)
            .with_capability(Capability::DataAnalysis)
            .with_hints(WeightingHints {
                estimated_duration_secs: duration,
                ..WeightingHints::default()
            });
        for dep in deps {
            spec = spec.with_dependency(dep);
        }
        Task::from_spec(spec, Uuid::new_v4())
    }

    fn planner() -> CoordinationPlanner {
        CoordinationPlanner::new(AgentSelector::new(SelectionConfig::default()))
    }

    fn worker(name: &str) -> Agent {
        Agent::new(name)
            .with_capability(Capability::DataAnalysis)
            .with_footprint(ResourceFootprint::new().with("cpu_cores", 2.0))
    }

    fn ample_pool() -> ResourceFootprint {
        ResourceFootprint::new().with("cpu_cores", 100.0)
    }

    #[test]
    fn test_critical_path_is_longest_chain() {
        // a(10) -> b(5) -> d(1); a(10) -> c(20) -> d(1)
        let a = task("a", 10, vec![]);
        let b = task("b", 5, vec![a.id]);
        let c = task("c", 20, vec![a.id]);
        let d = task("d", 1, vec![b.id, c.id]);
        let tasks = vec![a.clone(), b.clone(), c.clone(), d.clone()];

        let plan = planner()
            .create_plan(
                Uuid::new_v4(),
                &tasks,
                &[worker("w1"), worker("w2")],
                &ample_pool(),
                Strategy::Adaptive,
            )
            .unwrap();

        assert_eq!(plan.estimated_duration_secs, 31); // 10 + 20 + 1
        assert_eq!(plan.critical_path, vec![a.id, c.id, d.id]);
    }

    #[test]
    fn test_parallel_levels_by_depth() {
        let a = task("a", 10, vec![]);
        let b = task("b", 10, vec![a.id]);
        let c = task("c", 10, vec![a.id]);
        let tasks = vec![a.clone(), b.clone(), c.clone()];

        let plan = planner()
            .create_plan(
                Uuid::new_v4(),
                &tasks,
                &[worker("w1"), worker("w2")],
                &ample_pool(),
                Strategy::Adaptive,
            )
            .unwrap();

        assert_eq!(plan.parallel_levels.len(), 2);
        assert_eq!(plan.parallel_levels[0], vec![a.id]);
        assert_eq!(plan.parallel_levels[1].len(), 2);
        assert_eq!(plan.strategy, Strategy::Parallel);
    }

    #[test]
    fn test_resource_overrun_degrades_to_sequential() {
        let a = task("a", 10, vec![]);
        let b = task("b", 10, vec![]);
        let tasks = vec![a, b];

        // Pool holds fewer cores than two concurrent workers need
        let tight_pool = ResourceFootprint::new().with("cpu_cores", 3.0);
        let plan = planner()
            .create_plan(
                Uuid::new_v4(),
                &tasks,
                &[worker("w1"), worker("w2")],
                &tight_pool,
                Strategy::Parallel,
            )
            .unwrap();

        assert_eq!(plan.strategy, Strategy::Sequential);
        assert!(plan.unassigned.is_empty());
    }

    #[test]
    fn test_assignments_spread_by_load() {
        let a = task("a", 10, vec![]);
        let b = task("b", 10, vec![]);
        let tasks = vec![a, b];
        let w1 = worker("w1");
        let w2 = worker("w2");

        let plan = planner()
            .create_plan(
                Uuid::new_v4(),
                &tasks,
                &[w1, w2],
                &ample_pool(),
                Strategy::Adaptive,
            )
            .unwrap();

        // Both agents score identically; simulated load pushes the second
        // task onto the other agent
        assert_eq!(plan.assignments.len(), 2);
        assert!(plan.validate());
    }

    #[test]
    fn test_unassignable_tasks_reported_not_fatal() {
        let mut t = task("a", 10, vec![]);
        t.required_capabilities = vec![Capability::QuantumOptimization];

        let plan = planner()
            .create_plan(
                Uuid::new_v4(),
                &[t.clone()],
                &[worker("w1")],
                &ample_pool(),
                Strategy::Adaptive,
            )
            .unwrap();

        assert_eq!(plan.unassigned, vec![t.id]);
        assert_eq!(plan.assigned_count(), 0);
    }

    #[test]
    fn test_empty_workflow() {
        let plan = planner()
            .create_plan(
                Uuid::new_v4(),
                &[],
                &[worker("w1")],
                &ample_pool(),
                Strategy::Adaptive,
            )
            .unwrap();
        assert_eq!(plan.estimated_duration_secs, 0);
        assert!(plan.critical_path.is_empty());
        assert!(plan.parallel_levels.is_empty());
    }
}
