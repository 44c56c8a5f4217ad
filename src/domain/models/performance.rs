//! Performance history domain model.
//!
//! Per-agent outcome history is kept in a bounded ring buffer; snapshots
//! expose the sub-scores the reward allocator consumes.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Outcome of one task execution, reported by the external executor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TaskOutcome {
    pub success: bool,
    /// Output quality in [0, 1]
    pub quality: f64,
    /// Wall-clock execution latency in seconds
    pub latency_secs: u64,
}

impl TaskOutcome {
    pub fn success(quality: f64, latency_secs: u64) -> Self {
        Self {
            success: true,
            quality,
            latency_secs,
        }
    }

    pub fn failure(latency_secs: u64) -> Self {
        Self {
            success: false,
            quality: 0.0,
            latency_secs,
        }
    }
}

/// One recorded outcome in an agent's history window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutcomeRecord {
    pub task_id: Uuid,
    pub success: bool,
    pub quality: f64,
    /// Latency relative to the task estimate, mapped into [0, 1]
    pub timeliness: f64,
    pub recorded_at: DateTime<Utc>,
}

/// Auxiliary sub-scores reported by external monitoring, in [0, 1].
///
/// These are not derived from task outcomes; collaborators push them and
/// the reward allocator folds them into the composite score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AuxMetrics {
    pub security_compliance: f64,
    pub uptime: f64,
    pub cost_efficiency: f64,
    pub user_satisfaction: f64,
    pub innovation: f64,
}

impl Default for AuxMetrics {
    fn default() -> Self {
        Self {
            security_compliance: 0.75,
            uptime: 0.75,
            cost_efficiency: 0.75,
            user_satisfaction: 0.75,
            innovation: 0.75,
        }
    }
}

/// Rolling performance state for one agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentPerformance {
    pub agent_id: Uuid,
    /// Lifetime counters
    pub total_recorded: u64,
    pub total_succeeded: u64,
    /// Tasks with dependencies completed successfully (coordination signal)
    pub coordinated_succeeded: u64,
    pub coordinated_recorded: u64,
    /// Bounded window of recent outcomes
    recent: VecDeque<OutcomeRecord>,
    capacity: usize,
    pub aux: AuxMetrics,
}

impl AgentPerformance {
    pub fn new(agent_id: Uuid, capacity: usize) -> Self {
        Self {
            agent_id,
            total_recorded: 0,
            total_succeeded: 0,
            coordinated_succeeded: 0,
            coordinated_recorded: 0,
            recent: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
            aux: AuxMetrics::default(),
        }
    }

    /// Record an outcome, evicting the oldest entry once at capacity.
    pub fn push(&mut self, record: OutcomeRecord, coordinated: bool) {
        self.total_recorded += 1;
        if record.success {
            self.total_succeeded += 1;
        }
        if coordinated {
            self.coordinated_recorded += 1;
            if record.success {
                self.coordinated_succeeded += 1;
            }
        }
        if self.recent.len() == self.capacity {
            self.recent.pop_front();
        }
        self.recent.push_back(record);
    }

    /// Lifetime success ratio; neutral 0.5 before any outcome lands.
    pub fn success_rate(&self) -> f64 {
        if self.total_recorded == 0 {
            return 0.5;
        }
        self.total_succeeded as f64 / self.total_recorded as f64
    }

    /// Mean quality over the recent window.
    pub fn window_quality(&self) -> f64 {
        if self.recent.is_empty() {
            return 0.5;
        }
        self.recent.iter().map(|r| r.quality).sum::<f64>() / self.recent.len() as f64
    }

    /// Mean timeliness over the recent window.
    pub fn window_timeliness(&self) -> f64 {
        if self.recent.is_empty() {
            return 0.5;
        }
        self.recent.iter().map(|r| r.timeliness).sum::<f64>() / self.recent.len() as f64
    }

    /// Success ratio on dependency-bearing tasks; neutral when unseen.
    pub fn coordination_rate(&self) -> f64 {
        if self.coordinated_recorded == 0 {
            return 0.5;
        }
        self.coordinated_succeeded as f64 / self.coordinated_recorded as f64
    }

    pub fn window_len(&self) -> usize {
        self.recent.len()
    }
}

/// Point-in-time view of an agent's sub-scores, all in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSnapshot {
    pub agent_id: Uuid,
    pub success_rate: f64,
    pub quality: f64,
    pub security_compliance: f64,
    /// Timeliness of recent executions
    pub efficiency: f64,
    pub uptime: f64,
    pub cost_efficiency: f64,
    pub user_satisfaction: f64,
    pub innovation: f64,
    pub coordination: f64,
    pub tasks_recorded: u64,
}

impl PerformanceSnapshot {
    pub fn from_performance(perf: &AgentPerformance) -> Self {
        Self {
            agent_id: perf.agent_id,
            success_rate: perf.success_rate(),
            quality: perf.window_quality(),
            security_compliance: perf.aux.security_compliance,
            efficiency: perf.window_timeliness(),
            uptime: perf.aux.uptime,
            cost_efficiency: perf.aux.cost_efficiency,
            user_satisfaction: perf.aux.user_satisfaction,
            innovation: perf.aux.innovation,
            coordination: perf.coordination_rate(),
            tasks_recorded: perf.total_recorded,
        }
    }
}
