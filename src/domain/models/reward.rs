//! Reward domain model.
//!
//! A reward pool is a fixed budget for a workflow, split into treasury,
//! agent, and bonus shares. Allocations are tiered by composite performance
//! score and scaled down together when the raw sum overruns the budget.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Discrete performance brackets driving reward multipliers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardTier {
    Bronze,
    Silver,
    Gold,
    Platinum,
    TopTier,
}

impl RewardTier {
    /// Minimum composite score for this tier.
    pub fn threshold(&self) -> f64 {
        match self {
            Self::Bronze => 0.70,
            Self::Silver => 0.80,
            Self::Gold => 0.88,
            Self::Platinum => 0.94,
            Self::TopTier => 0.97,
        }
    }

    /// Multiplier applied to the per-agent base share.
    pub fn multiplier(&self) -> f64 {
        match self {
            Self::Bronze => 1.0,
            Self::Silver => 1.15,
            Self::Gold => 1.35,
            Self::Platinum => 1.6,
            Self::TopTier => 2.0,
        }
    }

    /// Highest tier whose threshold the score meets.
    ///
    /// TopTier additionally requires the domain eligibility flag (quantum
    /// or enterprise-security compliance). Scores below the Bronze
    /// threshold stay Bronze; the tier ladder has no lower bracket.
    pub fn for_score(score: f64, elite_eligible: bool) -> Self {
        if score >= Self::TopTier.threshold() && elite_eligible {
            Self::TopTier
        } else if score >= Self::Platinum.threshold() {
            Self::Platinum
        } else if score >= Self::Gold.threshold() {
            Self::Gold
        } else if score >= Self::Silver.threshold() {
            Self::Silver
        } else {
            Self::Bronze
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bronze => "bronze",
            Self::Silver => "silver",
            Self::Gold => "gold",
            Self::Platinum => "platinum",
            Self::TopTier => "top_tier",
        }
    }
}

/// Fractional split of a pool budget. Fractions must sum to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AllocationSplit {
    pub treasury: f64,
    pub agents: f64,
    pub bonus: f64,
}

impl Default for AllocationSplit {
    fn default() -> Self {
        Self {
            treasury: 0.30,
            agents: 0.60,
            bonus: 0.10,
        }
    }
}

impl AllocationSplit {
    pub fn is_valid(&self) -> bool {
        let sum = self.treasury + self.agents + self.bonus;
        (sum - 1.0).abs() < 1e-9
            && self.treasury >= 0.0
            && self.agents >= 0.0
            && self.bonus >= 0.0
    }
}

/// A fixed reward budget tied to one workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardPool {
    pub id: Uuid,
    pub workflow_id: Uuid,
    pub total_budget: f64,
    pub split: AllocationSplit,
    pub distributed: bool,
    pub created_at: DateTime<Utc>,
}

impl RewardPool {
    pub fn new(workflow_id: Uuid, total_budget: f64, split: AllocationSplit) -> Self {
        Self {
            id: Uuid::new_v4(),
            workflow_id,
            total_budget,
            split,
            distributed: false,
            created_at: Utc::now(),
        }
    }

    pub fn agent_budget(&self) -> f64 {
        self.total_budget * self.split.agents
    }

    pub fn bonus_budget(&self) -> f64 {
        self.total_budget * self.split.bonus
    }

    /// The ceiling that distributed allocations may never exceed.
    pub fn available(&self) -> f64 {
        self.agent_budget() + self.bonus_budget()
    }
}

/// One agent's share of a pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardAllocation {
    pub agent_id: Uuid,
    pub workflow_id: Uuid,
    pub base_amount: f64,
    pub bonus_amount: f64,
    /// Domain-specific bonus for quantum-capable agents; zero when inapplicable
    pub quantum_bonus: f64,
    /// Domain-specific bonus for enterprise-security-compliant agents
    pub security_bonus: f64,
    pub total_amount: f64,
    pub tier: RewardTier,
    pub composite_score: f64,
    pub distributed: bool,
}

impl RewardAllocation {
    /// Recompute the total from its parts.
    pub fn recompute_total(&mut self) {
        self.total_amount =
            self.base_amount + self.bonus_amount + self.quantum_bonus + self.security_bonus;
    }

    /// Scale every component by the same factor (budget-overrun correction).
    pub fn scale(&mut self, factor: f64) {
        self.base_amount *= factor;
        self.bonus_amount *= factor;
        self.quantum_bonus *= factor;
        self.security_bonus *= factor;
        self.recompute_total();
    }
}

/// Result of distributing a pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionSummary {
    pub pool_id: Uuid,
    pub workflow_id: Uuid,
    /// Sum of raw allocation totals before any scaling
    pub total_requested: f64,
    /// Sum actually paid out
    pub total_distributed: f64,
    /// Uniform factor applied to every allocation (1.0 when no overrun)
    pub scale_factor: f64,
    pub allocations: Vec<RewardAllocation>,
    pub distributed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_thresholds_ascend() {
        assert!(RewardTier::Bronze.threshold() < RewardTier::Silver.threshold());
        assert!(RewardTier::Silver.threshold() < RewardTier::Gold.threshold());
        assert!(RewardTier::Gold.threshold() < RewardTier::Platinum.threshold());
        assert!(RewardTier::Platinum.threshold() < RewardTier::TopTier.threshold());
    }

    #[test]
    fn test_tier_for_score() {
        assert_eq!(RewardTier::for_score(0.50, false), RewardTier::Bronze);
        assert_eq!(RewardTier::for_score(0.75, false), RewardTier::Bronze);
        assert_eq!(RewardTier::for_score(0.82, false), RewardTier::Silver);
        assert_eq!(RewardTier::for_score(0.90, false), RewardTier::Gold);
        assert_eq!(RewardTier::for_score(0.95, false), RewardTier::Platinum);
        assert_eq!(RewardTier::for_score(0.98, true), RewardTier::TopTier);
    }

    #[test]
    fn test_top_tier_requires_eligibility() {
        assert_eq!(RewardTier::for_score(0.99, false), RewardTier::Platinum);
        assert_eq!(RewardTier::for_score(0.99, true), RewardTier::TopTier);
    }

    #[test]
    fn test_default_split_sums_to_one() {
        assert!(AllocationSplit::default().is_valid());
    }

    #[test]
    fn test_invalid_split() {
        let split = AllocationSplit {
            treasury: 0.5,
            agents: 0.6,
            bonus: 0.1,
        };
        assert!(!split.is_valid());
    }

    #[test]
    fn test_pool_budget_shares() {
        let pool = RewardPool::new(Uuid::new_v4(), 100.0, AllocationSplit::default());
        assert!((pool.agent_budget() - 60.0).abs() < 1e-9);
        assert!((pool.bonus_budget() - 10.0).abs() < 1e-9);
        assert!((pool.available() - 70.0).abs() < 1e-9);
    }

    #[test]
    fn test_allocation_scaling() {
        let mut alloc = RewardAllocation {
            agent_id: Uuid::new_v4(),
            workflow_id: Uuid::new_v4(),
            base_amount: 40.0,
            bonus_amount: 10.0,
            quantum_bonus: 8.0,
            security_bonus: 2.0,
            total_amount: 60.0,
            tier: RewardTier::Gold,
            composite_score: 0.9,
            distributed: false,
        };
        alloc.scale(0.5);
        assert!((alloc.total_amount - 30.0).abs() < 1e-9);
        assert!((alloc.base_amount - 20.0).abs() < 1e-9);
    }
}
