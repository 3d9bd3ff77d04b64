//! Aggregate upstream health.

use std::collections::BTreeMap;

use pathmind_common::entities::{SourceHealth, SourceStatus};
use serde::{Deserialize, Serialize};

/// Source whose outage takes the whole service down.
pub const PRIMARY_SOURCE: &str = "chembl";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Down,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub checks: BTreeMap<String, SourceHealth>,
    pub cache_hit_rate: f64,
}

impl HealthReport {
    pub fn from_checks(checks: BTreeMap<String, SourceHealth>, cache_hit_rate: f64) -> Self {
        Self { status: overall_status(&checks), checks, cache_hit_rate }
    }
}

/// Primary down → down; any other source down → degraded.
pub fn overall_status(checks: &BTreeMap<String, SourceHealth>) -> HealthStatus {
    let is_down = |h: &SourceHealth| h.status == SourceStatus::Down;
    if checks.get(PRIMARY_SOURCE).is_some_and(is_down) {
        HealthStatus::Down
    } else if checks.values().any(is_down) {
        HealthStatus::Degraded
    } else {
        HealthStatus::Healthy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(status: SourceStatus) -> SourceHealth {
        SourceHealth { status, latency_ms: 5, error: None }
    }

    #[test]
    fn test_overall_status() {
        let mut checks = BTreeMap::new();
        checks.insert("chembl".to_string(), check(SourceStatus::Up));
        checks.insert("reactome".to_string(), check(SourceStatus::Up));
        assert_eq!(overall_status(&checks), HealthStatus::Healthy);

        checks.insert("reactome".to_string(), check(SourceStatus::Down));
        assert_eq!(overall_status(&checks), HealthStatus::Degraded);

        checks.insert("chembl".to_string(), check(SourceStatus::Down));
        assert_eq!(overall_status(&checks), HealthStatus::Down);
    }
}
