//! Per-agent probe statistics.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use agenttrust_types::AgentId;

use crate::probe::ProbeCategory;

/// Pass/fail counts within one probe category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryStats {
    pub passed: u64,
    pub failed: u64,
}

/// Aggregate probe results for one agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentProbeStats {
    pub agent_id: AgentId,
    pub total_probes: u64,
    pub probes_passed: u64,
    pub probes_failed: u64,
    /// Failures since the last pass
    pub consecutive_failures: u64,
    pub last_probe_at: Option<DateTime<Utc>>,
    pub by_category: HashMap<ProbeCategory, CategoryStats>,
}

impl AgentProbeStats {
    pub fn new(agent_id: AgentId) -> Self {
        Self {
            agent_id,
            total_probes: 0,
            probes_passed: 0,
            probes_failed: 0,
            consecutive_failures: 0,
            last_probe_at: None,
            by_category: HashMap::new(),
        }
    }

    /// Fold one probe outcome into the aggregates.
    pub fn record(&mut self, category: ProbeCategory, passed: bool, at: DateTime<Utc>) {
        self.total_probes += 1;
        self.last_probe_at = Some(at);
        let entry = self.by_category.entry(category).or_default();
        if passed {
            self.probes_passed += 1;
            self.consecutive_failures = 0;
            entry.passed += 1;
        } else {
            self.probes_failed += 1;
            self.consecutive_failures += 1;
            entry.failed += 1;
        }
    }

    /// Fraction of probes passed, 0.0 when none have run.
    pub fn pass_rate(&self) -> f64 {
        if self.total_probes == 0 {
            return 0.0;
        }
        self.probes_passed as f64 / self.total_probes as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_updates_aggregates() {
        let mut stats = AgentProbeStats::new(AgentId::new("a"));
        let now = Utc::now();

        stats.record(ProbeCategory::Factual, true, now);
        stats.record(ProbeCategory::Factual, false, now);
        stats.record(ProbeCategory::Logical, false, now);

        assert_eq!(stats.total_probes, 3);
        assert_eq!(stats.probes_passed, 1);
        assert_eq!(stats.probes_failed, 2);
        assert_eq!(stats.consecutive_failures, 2);
        assert!((stats.pass_rate() - 1.0 / 3.0).abs() < 1e-9);

        let factual = stats.by_category[&ProbeCategory::Factual];
        assert_eq!(factual.passed, 1);
        assert_eq!(factual.failed, 1);
    }

    #[test]
    fn test_pass_resets_consecutive_failures() {
        let mut stats = AgentProbeStats::new(AgentId::new("a"));
        let now = Utc::now();
        stats.record(ProbeCategory::Factual, false, now);
        stats.record(ProbeCategory::Factual, false, now);
        assert_eq!(stats.consecutive_failures, 2);

        stats.record(ProbeCategory::Factual, true, now);
        assert_eq!(stats.consecutive_failures, 0);
    }

    #[test]
    fn test_empty_stats_pass_rate() {
        let stats = AgentProbeStats::new(AgentId::new("a"));
        assert_eq!(stats.pass_rate(), 0.0);
        assert!(stats.last_probe_at.is_none());
    }
}
