//! Governance proposal domain model.
//!
//! Proposals run weighted-consensus votes independent of task flow. Each
//! proposal type carries its own approval policy from a fixed table.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Per-type approval policy: minimum consensus ratio and participant count.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VotePolicy {
    /// Minimum approve-weight / total-weight ratio
    pub required_ratio: f64,
    /// Minimum number of distinct voters
    pub required_participants: usize,
}

/// Kinds of governance decisions, each with a fixed policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalType {
    SystemUpgrade,
    ResourceAllocation,
    AgentCertification,
    PolicyChange,
    EmergencyAction,
}

impl ProposalType {
    /// The fixed policy table.
    pub fn policy(&self) -> VotePolicy {
        match self {
            Self::SystemUpgrade => VotePolicy {
                required_ratio: 0.75,
                required_participants: 5,
            },
            Self::ResourceAllocation => VotePolicy {
                required_ratio: 0.60,
                required_participants: 3,
            },
            Self::AgentCertification => VotePolicy {
                required_ratio: 0.66,
                required_participants: 4,
            },
            Self::PolicyChange => VotePolicy {
                required_ratio: 0.70,
                required_participants: 4,
            },
            Self::EmergencyAction => VotePolicy {
                required_ratio: 0.80,
                required_participants: 7,
            },
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SystemUpgrade => "system_upgrade",
            Self::ResourceAllocation => "resource_allocation",
            Self::AgentCertification => "agent_certification",
            Self::PolicyChange => "policy_change",
            Self::EmergencyAction => "emergency_action",
        }
    }
}

/// Proposal lifecycle. Terminal states never revert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    Active,
    Approved,
    Rejected,
    Expired,
}

impl ProposalStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Active)
    }
}

/// A single weighted vote. Re-votes from the same agent overwrite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vote {
    pub approve: bool,
    pub weight: f64,
    pub cast_at: DateTime<Utc>,
}

/// Outcome of evaluating a proposal after a vote lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
    /// Threshold met with enough participants
    Approved,
    /// Twice the required participants voted without reaching the threshold
    Rejected,
    /// Still collecting votes
    Undecided,
}

/// A governance vote in progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: Uuid,
    pub proposal_type: ProposalType,
    /// Free-form description of the decision being made
    pub subject: String,
    pub status: ProposalStatus,
    /// Voter agent id -> vote (last write wins)
    pub votes: HashMap<Uuid, Vote>,
    /// Hard deadline; no vote is accepted after this instant
    pub deadline: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
}

impl Proposal {
    pub fn new(proposal_type: ProposalType, subject: impl Into<String>, deadline: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            proposal_type,
            subject: subject.into(),
            status: ProposalStatus::Active,
            votes: HashMap::new(),
            deadline,
            created_at: Utc::now(),
            decided_at: None,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.deadline
    }

    /// Weighted consensus ratio: approve weight over total weight.
    pub fn consensus_ratio(&self) -> f64 {
        let total: f64 = self.votes.values().map(|v| v.weight).sum();
        if total <= 0.0 {
            return 0.0;
        }
        let approve: f64 = self
            .votes
            .values()
            .filter(|v| v.approve)
            .map(|v| v.weight)
            .sum();
        approve / total
    }

    pub fn participants(&self) -> usize {
        self.votes.len()
    }

    /// Evaluate the policy against the current tally.
    ///
    /// The rejection rule (2x required participants without reaching the
    /// threshold) is preserved from the source system; see DESIGN.md.
    pub fn evaluate(&self) -> VoteOutcome {
        let policy = self.proposal_type.policy();
        let ratio = self.consensus_ratio();
        let participants = self.participants();

        if ratio >= policy.required_ratio && participants >= policy.required_participants {
            VoteOutcome::Approved
        } else if participants >= 2 * policy.required_participants {
            VoteOutcome::Rejected
        } else {
            VoteOutcome::Undecided
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn proposal(proposal_type: ProposalType) -> Proposal {
        Proposal::new(
            proposal_type,
            "certify agent",
            Utc::now() + Duration::hours(1),
        )
    }

    fn cast(p: &mut Proposal, approve: bool, weight: f64) {
        p.votes.insert(
            Uuid::new_v4(),
            Vote {
                approve,
                weight,
                cast_at: Utc::now(),
            },
        );
    }

    #[test]
    fn test_policy_table() {
        let p = ProposalType::SystemUpgrade.policy();
        assert_eq!(p.required_ratio, 0.75);
        assert_eq!(p.required_participants, 5);

        let p = ProposalType::ResourceAllocation.policy();
        assert_eq!(p.required_ratio, 0.60);
        assert_eq!(p.required_participants, 3);
    }

    #[test]
    fn test_approval_at_threshold() {
        // 4 approve + 1 reject at uniform weight: ratio 0.8 >= 0.75, 5 voters
        let mut p = proposal(ProposalType::SystemUpgrade);
        for _ in 0..4 {
            cast(&mut p, true, 1.0);
        }
        cast(&mut p, false, 1.0);

        assert!((p.consensus_ratio() - 0.8).abs() < f64::EPSILON);
        assert_eq!(p.evaluate(), VoteOutcome::Approved);
    }

    #[test]
    fn test_undecided_below_double_participants() {
        // Ratio 0.5 with 5 participants: below threshold, below 2x participants
        let mut p = proposal(ProposalType::SystemUpgrade);
        for i in 0..5 {
            cast(&mut p, i % 2 == 0, 1.0);
        }
        assert_eq!(p.evaluate(), VoteOutcome::Undecided);
    }

    #[test]
    fn test_rejection_at_double_participants() {
        let mut p = proposal(ProposalType::SystemUpgrade);
        for i in 0..10 {
            cast(&mut p, i % 2 == 0, 1.0);
        }
        assert_eq!(p.evaluate(), VoteOutcome::Rejected);
    }

    #[test]
    fn test_weighted_ratio() {
        let mut p = proposal(ProposalType::ResourceAllocation);
        cast(&mut p, true, 2.0);
        cast(&mut p, false, 1.0);
        cast(&mut p, false, 1.0);
        assert!((p.consensus_ratio() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_proposal_ratio_is_zero() {
        let p = proposal(ProposalType::PolicyChange);
        assert_eq!(p.consensus_ratio(), 0.0);
        assert_eq!(p.evaluate(), VoteOutcome::Undecided);
    }

    #[test]
    fn test_expiry() {
        let mut p = proposal(ProposalType::PolicyChange);
        p.deadline = Utc::now() - Duration::seconds(1);
        assert!(p.is_expired(Utc::now()));
    }
}
