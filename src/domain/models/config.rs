//! Engine configuration model.
//!
//! Every numeric knob of the engine lives here with serde defaults so a
//! partial YAML file or environment overrides merge cleanly.

use serde::{Deserialize, Serialize};

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub scheduler: SchedulerConfig,
    pub selection: SelectionConfig,
    pub consensus: ConsensusConfig,
    pub rewards: RewardConfig,
    pub performance: PerformanceConfig,
    pub logging: LoggingConfig,
}

/// Scheduler priority and retry tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Urgency bonus added per minute of task age (starvation avoidance)
    pub urgency_bonus_per_minute: f64,
    /// Cap on the total urgency bonus
    pub urgency_bonus_cap: f64,
    /// Execution timeout applied by the dispatcher
    pub execution_timeout_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            urgency_bonus_per_minute: 0.05,
            urgency_bonus_cap: 3.0,
            execution_timeout_secs: 300,
        }
    }
}

/// Agent selection thresholds and score weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Reputation floor every candidate must meet
    pub min_reputation: f64,
    /// Business value above which the raised floor applies
    pub high_value_threshold: f64,
    /// Raised reputation floor for high-value tasks
    pub high_value_min_reputation: f64,
    pub capability_weight: f64,
    pub specialization_bonus: f64,
    pub reputation_weight: f64,
    pub load_weight: f64,
    /// Ceiling on the impact multiplier applied to the final score
    pub max_impact_multiplier: f64,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            min_reputation: 40.0,
            high_value_threshold: 5.0,
            high_value_min_reputation: 80.0,
            capability_weight: 0.4,
            specialization_bonus: 0.35,
            reputation_weight: 0.2,
            load_weight: 0.2,
            max_impact_multiplier: 1.5,
        }
    }
}

/// Consensus timing. The per-type approval policy table is fixed in
/// `ProposalType::policy`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsensusConfig {
    /// Default proposal lifetime when the caller does not set a deadline
    pub default_timeout_secs: u64,
    /// Divisor bounding the stake contribution to vote weight
    pub stake_divisor: f64,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            default_timeout_secs: 3600,
            stake_divisor: 10_000.0,
        }
    }
}

/// Weights over the nine performance sub-scores. Must sum to 1.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub success_rate: f64,
    pub quality: f64,
    pub security_compliance: f64,
    pub efficiency: f64,
    pub uptime: f64,
    pub cost_efficiency: f64,
    pub user_satisfaction: f64,
    pub innovation: f64,
    pub coordination: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            success_rate: 0.20,
            quality: 0.15,
            security_compliance: 0.15,
            efficiency: 0.10,
            uptime: 0.10,
            cost_efficiency: 0.10,
            user_satisfaction: 0.08,
            innovation: 0.07,
            coordination: 0.05,
        }
    }
}

impl ScoreWeights {
    pub fn sum(&self) -> f64 {
        self.success_rate
            + self.quality
            + self.security_compliance
            + self.efficiency
            + self.uptime
            + self.cost_efficiency
            + self.user_satisfaction
            + self.innovation
            + self.coordination
    }
}

/// Reward math tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardConfig {
    pub score_weights: ScoreWeights,
    /// Bonus multiplier step for composite scores above 0.90
    pub bonus_step_high: f64,
    /// Bonus multiplier step for composite scores above 0.95
    pub bonus_step_elite: f64,
    /// Flat bonus for quantum-capable agents
    pub quantum_bonus: f64,
    /// Flat bonus for enterprise-security-compliant agents
    pub security_bonus: f64,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            score_weights: ScoreWeights::default(),
            bonus_step_high: 1.25,
            bonus_step_elite: 1.5,
            quantum_bonus: 25.0,
            security_bonus: 15.0,
        }
    }
}

/// Performance history retention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    /// Ring buffer capacity for recent outcomes per agent
    pub history_window: usize,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self { history_window: 50 }
    }
}

/// Logging output settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// One of: trace, debug, info, warn, error
    pub level: String,
    /// One of: json, pretty
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
