//! Agent selector.
//!
//! Scores candidate agents for a task under capability, clearance,
//! compliance, reputation, and load constraints. Finding no candidate is
//! a normal outcome, not an error; callers retry later or escalate.

use tracing::{debug, instrument};
use uuid::Uuid;

use crate::domain::error::{CoordinationError, Result};
use crate::domain::models::{Agent, SelectionConfig, Task};

/// Multi-criteria agent selection.
#[derive(Debug, Clone, Default)]
pub struct AgentSelector {
    config: SelectionConfig,
}

impl AgentSelector {
    pub fn new(config: SelectionConfig) -> Self {
        Self { config }
    }

    /// Pick the best-fit agent, or `None` when no candidate passes the
    /// hard filters.
    ///
    /// Ties on score break toward the lowest current load.
    #[instrument(skip(self, task, candidates), fields(task_id = %task.id))]
    pub fn select(&self, task: &Task, candidates: &[Agent]) -> Option<Uuid> {
        let mut best: Option<(&Agent, f64)> = None;

        for agent in candidates {
            if self.eligibility(task, agent).is_err() {
                continue;
            }
            let score = self.score(task, agent);
            debug!(agent_id = %agent.id, score, "Candidate scored");

            best = match best {
                None => Some((agent, score)),
                Some((current, current_score)) => {
                    if score > current_score
                        || (score == current_score && agent.current_load < current.current_load)
                    {
                        Some((agent, score))
                    } else {
                        Some((current, current_score))
                    }
                }
            };
        }

        best.map(|(agent, _)| agent.id)
    }

    /// Hard pre-filters, with the specific violation as the error.
    ///
    /// Used directly by explicit task assignment so callers learn why an
    /// agent was refused.
    pub fn eligibility(&self, task: &Task, agent: &Agent) -> Result<()> {
        // Capability intersection must be non-empty when the task requires any
        if !task.required_capabilities.is_empty()
            && !task
                .required_capabilities
                .iter()
                .any(|cap| agent.capabilities.contains(cap))
        {
            return Err(CoordinationError::CapabilityMismatch {
                agent_id: agent.id,
                task_id: task.id,
            });
        }

        // Every compliance tag must be declared by the agent
        if let Some(missing) = task
            .hints
            .compliance_tags
            .iter()
            .find(|tag| !agent.capabilities.contains(tag))
        {
            debug!(agent_id = %agent.id, tag = %missing, "Missing compliance tag");
            return Err(CoordinationError::CapabilityMismatch {
                agent_id: agent.id,
                task_id: task.id,
            });
        }

        if agent.clearance < task.required_clearance {
            return Err(CoordinationError::InsufficientClearance {
                agent_id: agent.id,
                task_id: task.id,
                held: agent.clearance,
                required: task.required_clearance,
            });
        }

        let floor = self.reputation_floor(task);
        if agent.reputation < floor {
            return Err(CoordinationError::InsufficientReputation {
                agent_id: agent.id,
                reputation: agent.reputation,
                floor,
            });
        }

        if !agent.has_capacity() {
            return Err(CoordinationError::AgentAtCapacity(agent.id));
        }

        Ok(())
    }

    /// The reputation floor scales with task value: high-value tasks
    /// require the raised minimum.
    pub fn reputation_floor(&self, task: &Task) -> f64 {
        if task.hints.business_value > self.config.high_value_threshold {
            self.config.high_value_min_reputation
        } else {
            self.config.min_reputation
        }
    }

    /// Weighted selection score.
    pub fn score(&self, task: &Task, agent: &Agent) -> f64 {
        let capability_match = if task.required_capabilities.is_empty() {
            1.0
        } else {
            let covered = task
                .required_capabilities
                .iter()
                .filter(|cap| agent.capabilities.contains(cap))
                .count();
            covered as f64 / task.required_capabilities.len() as f64
        };

        let specialization = if agent.specializations.contains(&task.task_type) {
            self.config.specialization_bonus
        } else {
            0.0
        };

        let mut score = capability_match * self.config.capability_weight
            + specialization
            + agent.reputation / 100.0 * self.config.reputation_weight
            + 1.0 / (f64::from(agent.current_load) + 1.0) * self.config.load_weight;

        let multiplier = task
            .hints
            .impact_weight
            .clamp(1.0, self.config.max_impact_multiplier);
        score *= multiplier;
        score
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{
        Capability, ClearanceLevel, TaskSpec, WeightingHints,
    };

    fn task_requiring(caps: Vec<Capability>) -> Task {
        let mut spec = TaskSpec::new("analysis");
        for cap in caps {
            spec = spec.with_capability(cap);
        }
        Task::from_spec(spec, Uuid::new_v4())
    }

    fn capable_agent() -> Agent {
        Agent::new("worker").with_capability(Capability::DataAnalysis)
    }

    fn selector() -> AgentSelector {
        AgentSelector::new(SelectionConfig::default())
    }

    #[test]
    fn test_selects_only_capable_agent() {
        let task = task_requiring(vec![Capability::DataAnalysis]);
        let fit = capable_agent();
        let unfit = Agent::new("other").with_capability(Capability::Monitoring);

        let chosen = selector().select(&task, &[unfit, fit.clone()]);
        assert_eq!(chosen, Some(fit.id));
    }

    #[test]
    fn test_no_candidate_is_none_not_error() {
        let task = task_requiring(vec![Capability::QuantumOptimization]);
        assert_eq!(selector().select(&task, &[capable_agent()]), None);
        assert_eq!(selector().select(&task, &[]), None);
    }

    #[test]
    fn test_clearance_filter() {
        let task = Task::from_spec(
            TaskSpec::new("audit")
                .with_capability(Capability::SecurityAudit)
                .with_clearance(ClearanceLevel::Secret),
            Uuid::new_v4(),
        );
        let low = Agent::new("low")
            .with_capability(Capability::SecurityAudit)
            .with_clearance(ClearanceLevel::Confidential);
        let high = Agent::new("high")
            .with_capability(Capability::SecurityAudit)
            .with_clearance(ClearanceLevel::TopSecret);

        assert_eq!(selector().select(&task, &[low, high.clone()]), Some(high.id));
    }

    #[test]
    fn test_compliance_tags_are_hard_filters() {
        let mut task = task_requiring(vec![Capability::DataAnalysis]);
        task.hints.compliance_tags = vec![Capability::GdprCompliance];

        let non_compliant = capable_agent();
        let compliant = capable_agent().with_capability(Capability::GdprCompliance);

        assert_eq!(
            selector().select(&task, &[non_compliant, compliant.clone()]),
            Some(compliant.id)
        );
    }

    #[test]
    fn test_high_value_reputation_floor() {
        let mut task = task_requiring(vec![Capability::DataAnalysis]);
        task.hints = WeightingHints {
            business_value: 10.0,
            ..WeightingHints::default()
        };

        // Default reputation (50) is below the raised floor of 80,
        // regardless of an otherwise perfect fit
        let strong = capable_agent().with_specialization("analysis");
        assert_eq!(selector().select(&task, &[strong]), None);

        let mut veteran = capable_agent();
        veteran.reputation = 85.0;
        assert_eq!(selector().select(&task, &[veteran.clone()]), Some(veteran.id));
    }

    #[test]
    fn test_specialization_bonus_wins() {
        let task = task_requiring(vec![Capability::DataAnalysis]);
        let generalist = capable_agent();
        let specialist = capable_agent().with_specialization("analysis");

        assert_eq!(
            selector().select(&task, &[generalist, specialist.clone()]),
            Some(specialist.id)
        );
    }

    #[test]
    fn test_lower_load_preferred() {
        let task = task_requiring(vec![Capability::DataAnalysis]);
        let mut busy = capable_agent();
        busy.current_load = 3;
        let idle = capable_agent();

        assert_eq!(selector().select(&task, &[busy, idle.clone()]), Some(idle.id));
    }

    #[test]
    fn test_agent_at_capacity_excluded() {
        let task = task_requiring(vec![Capability::DataAnalysis]);
        let mut full = capable_agent().with_max_load(2);
        full.current_load = 2;

        assert_eq!(selector().select(&task, &[full]), None);
    }

    #[test]
    fn test_impact_multiplier_capped() {
        let sel = selector();
        let mut task = task_requiring(vec![Capability::DataAnalysis]);
        task.hints.impact_weight = 10.0;
        let agent = capable_agent();

        let capped = sel.score(&task, &agent);
        task.hints.impact_weight = SelectionConfig::default().max_impact_multiplier;
        let at_cap = sel.score(&task, &agent);
        assert!((capped - at_cap).abs() < 1e-9);
    }

    #[test]
    fn test_eligibility_error_kinds() {
        let sel = selector();
        let task = task_requiring(vec![Capability::DataAnalysis]);

        let wrong_caps = Agent::new("w").with_capability(Capability::Monitoring);
        assert!(matches!(
            sel.eligibility(&task, &wrong_caps),
            Err(CoordinationError::CapabilityMismatch { .. })
        ));

        let mut low_rep = capable_agent();
        low_rep.reputation = 10.0;
        assert!(matches!(
            sel.eligibility(&task, &low_rep),
            Err(CoordinationError::InsufficientReputation { .. })
        ));
    }
}
