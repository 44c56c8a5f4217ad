//! Consensus engine.
//!
//! Runs weighted-vote governance proposals independent of task flow.
//! Vote weight is bounded so no single actor carries more than ~2.0:
//! `1.0 + reputation/100 * 0.5 + min(stake/divisor, 0.5)`.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::domain::error::{CoordinationError, Result};
use crate::domain::models::{
    Agent, ConsensusConfig, Proposal, ProposalStatus, ProposalType, Vote, VoteOutcome,
};
use crate::services::capability_registry::CapabilityRegistry;

/// Governance proposals and their weighted votes.
pub struct ConsensusEngine {
    registry: Arc<CapabilityRegistry>,
    proposals: RwLock<HashMap<Uuid, Proposal>>,
    config: ConsensusConfig,
}

impl ConsensusEngine {
    pub fn new(registry: Arc<CapabilityRegistry>, config: ConsensusConfig) -> Self {
        Self {
            registry,
            proposals: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// Open a proposal. Without an explicit deadline the configured
    /// default lifetime applies.
    #[instrument(skip(self, subject))]
    pub async fn create_proposal(
        &self,
        proposal_type: ProposalType,
        subject: impl Into<String>,
        deadline: Option<DateTime<Utc>>,
    ) -> Uuid {
        let deadline = deadline.unwrap_or_else(|| {
            Utc::now() + Duration::seconds(self.config.default_timeout_secs as i64)
        });
        let proposal = Proposal::new(proposal_type, subject, deadline);
        let id = proposal.id;
        self.proposals.write().await.insert(id, proposal);
        info!(proposal_id = %id, kind = proposal_type.as_str(), "Proposal created");
        id
    }

    /// Cast or replace a vote and evaluate the proposal.
    ///
    /// A second vote from the same agent overwrites its prior vote rather
    /// than duplicating weight. Votes against expired proposals are
    /// refused and flip the proposal to Expired.
    #[instrument(skip(self), err)]
    pub async fn vote(
        &self,
        proposal_id: Uuid,
        agent_id: Uuid,
        approve: bool,
    ) -> Result<ProposalStatus> {
        let agent = self
            .registry
            .get(agent_id)
            .await
            .ok_or(CoordinationError::AgentNotFound(agent_id))?;
        let weight = self.vote_weight(&agent);

        let mut proposals = self.proposals.write().await;
        let proposal = proposals
            .get_mut(&proposal_id)
            .ok_or(CoordinationError::ProposalNotFound(proposal_id))?;

        if proposal.status.is_terminal() {
            return Err(CoordinationError::ProposalClosed(proposal_id));
        }
        if proposal.is_expired(Utc::now()) {
            proposal.status = ProposalStatus::Expired;
            proposal.decided_at = Some(Utc::now());
            warn!(proposal_id = %proposal_id, "Vote refused: proposal expired");
            return Err(CoordinationError::ProposalExpired(proposal_id));
        }

        proposal.votes.insert(
            agent_id,
            Vote {
                approve,
                weight,
                cast_at: Utc::now(),
            },
        );

        match proposal.evaluate() {
            VoteOutcome::Approved => {
                proposal.status = ProposalStatus::Approved;
                proposal.decided_at = Some(Utc::now());
                info!(proposal_id = %proposal_id, "Proposal approved");
            }
            VoteOutcome::Rejected => {
                proposal.status = ProposalStatus::Rejected;
                proposal.decided_at = Some(Utc::now());
                info!(proposal_id = %proposal_id, "Proposal rejected");
            }
            VoteOutcome::Undecided => {}
        }
        Ok(proposal.status)
    }

    /// Bounded vote weight for an agent.
    pub fn vote_weight(&self, agent: &Agent) -> f64 {
        1.0 + agent.reputation / 100.0 * 0.5 + (agent.stake / self.config.stake_divisor).min(0.5)
    }

    /// Expire every Active proposal whose deadline has passed.
    pub async fn expire_overdue(&self) -> Vec<Uuid> {
        let now = Utc::now();
        let mut proposals = self.proposals.write().await;
        let mut expired = Vec::new();
        for proposal in proposals.values_mut() {
            if proposal.status == ProposalStatus::Active && proposal.is_expired(now) {
                proposal.status = ProposalStatus::Expired;
                proposal.decided_at = Some(now);
                expired.push(proposal.id);
            }
        }
        if !expired.is_empty() {
            info!(count = expired.len(), "Proposals expired");
        }
        expired
    }

    pub async fn get(&self, proposal_id: Uuid) -> Option<Proposal> {
        self.proposals.read().await.get(&proposal_id).cloned()
    }
}
