//! Agent domain model.
//!
//! Agents are worker entities with declared capabilities, a security
//! clearance, a resource footprint, and a reputation maintained by the
//! performance tracker.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Reputation bounds enforced after every update.
pub const REPUTATION_MIN: f64 = 0.0;
pub const REPUTATION_MAX: f64 = 100.0;
/// Neutral starting reputation for newly registered agents.
pub const REPUTATION_DEFAULT: f64 = 50.0;

/// Enumerated capability tags.
///
/// Capabilities are matched by exact tag intersection with task
/// requirements; compliance tags are capabilities a task may demand as a
/// hard filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    DataAnalysis,
    CodeGeneration,
    NaturalLanguage,
    Planning,
    Research,
    ModelTraining,
    QuantumOptimization,
    SecurityAudit,
    Encryption,
    GdprCompliance,
    HipaaCompliance,
    SoxCompliance,
    AuditTrail,
    Monitoring,
    Integration,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DataAnalysis => "data_analysis",
            Self::CodeGeneration => "code_generation",
            Self::NaturalLanguage => "natural_language",
            Self::Planning => "planning",
            Self::Research => "research",
            Self::ModelTraining => "model_training",
            Self::QuantumOptimization => "quantum_optimization",
            Self::SecurityAudit => "security_audit",
            Self::Encryption => "encryption",
            Self::GdprCompliance => "gdpr_compliance",
            Self::HipaaCompliance => "hipaa_compliance",
            Self::SoxCompliance => "sox_compliance",
            Self::AuditTrail => "audit_trail",
            Self::Monitoring => "monitoring",
            Self::Integration => "integration",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Security clearance levels, ordered from least to most privileged.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum ClearanceLevel {
    #[default]
    Public,
    Confidential,
    Secret,
    TopSecret,
}

impl fmt::Display for ClearanceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Public => "public",
            Self::Confidential => "confidential",
            Self::Secret => "secret",
            Self::TopSecret => "top_secret",
        };
        f.write_str(s)
    }
}

impl FromStr for ClearanceLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "public" => Ok(Self::Public),
            "confidential" => Ok(Self::Confidential),
            "secret" => Ok(Self::Secret),
            "top_secret" | "topsecret" => Ok(Self::TopSecret),
            _ => Err(anyhow::anyhow!("Invalid clearance level: {s}")),
        }
    }
}

/// Named numeric resource requirements (e.g. "cpu_cores" -> 2.0).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceFootprint {
    pub requirements: HashMap<String, f64>,
}

impl ResourceFootprint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, resource: impl Into<String>, amount: f64) -> Self {
        self.requirements.insert(resource.into(), amount);
        self
    }

    pub fn get(&self, resource: &str) -> f64 {
        self.requirements.get(resource).copied().unwrap_or(0.0)
    }

    /// Accumulate another footprint into this one.
    pub fn add(&mut self, other: &ResourceFootprint) {
        for (resource, amount) in &other.requirements {
            *self.requirements.entry(resource.clone()).or_insert(0.0) += amount;
        }
    }

    /// Whether every requirement in `self` fits within `pool`.
    pub fn fits_within(&self, pool: &ResourceFootprint) -> bool {
        self.requirements
            .iter()
            .all(|(resource, amount)| *amount <= pool.get(resource))
    }
}

/// A worker entity in the coordination engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    /// Unique agent identifier
    pub id: Uuid,
    /// Human-readable name
    pub name: String,
    /// Declared capability tags
    pub capabilities: HashSet<Capability>,
    /// Task types this agent specializes in
    pub specializations: HashSet<String>,
    /// Security clearance level
    pub clearance: ClearanceLevel,
    /// Resource footprint per concurrently held task
    pub footprint: ResourceFootprint,
    /// Count of active (assigned or running) tasks
    pub current_load: u32,
    /// Maximum tasks held concurrently
    pub max_load: u32,
    /// Reputation, clamped to [0, 100]
    pub reputation: f64,
    /// Stake contributing to consensus vote weight
    pub stake: f64,
    /// Registration timestamp
    pub registered_at: DateTime<Utc>,
}

impl Agent {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            capabilities: HashSet::new(),
            specializations: HashSet::new(),
            clearance: ClearanceLevel::Public,
            footprint: ResourceFootprint::new(),
            current_load: 0,
            max_load: 5,
            reputation: REPUTATION_DEFAULT,
            stake: 0.0,
            registered_at: Utc::now(),
        }
    }

    pub fn with_capability(mut self, capability: Capability) -> Self {
        self.capabilities.insert(capability);
        self
    }

    pub fn with_specialization(mut self, task_type: impl Into<String>) -> Self {
        self.specializations.insert(task_type.into());
        self
    }

    pub fn with_clearance(mut self, clearance: ClearanceLevel) -> Self {
        self.clearance = clearance;
        self
    }

    pub fn with_footprint(mut self, footprint: ResourceFootprint) -> Self {
        self.footprint = footprint;
        self
    }

    pub fn with_max_load(mut self, max_load: u32) -> Self {
        self.max_load = max_load;
        self
    }

    pub fn with_stake(mut self, stake: f64) -> Self {
        self.stake = stake;
        self
    }

    pub fn has_capacity(&self) -> bool {
        self.current_load < self.max_load
    }

    /// Apply a reputation delta, clamping the result to [0, 100].
    pub fn adjust_reputation(&mut self, delta: f64) {
        self.reputation = (self.reputation + delta).clamp(REPUTATION_MIN, REPUTATION_MAX);
    }
}
