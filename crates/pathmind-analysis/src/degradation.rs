//! Accumulation of non-fatal source failures.
//!
//! Every stage that talks to a non-primary source funnels its failures
//! through a [`DegradationTracker`]. Each distinct failure becomes one
//! user-facing message; duplicates collapse.

use std::collections::BTreeSet;

use pathmind_common::entities::{AnalysisFlags, TargetHit};
use pathmind_common::SourceError;
use tracing::warn;

/// Targets below this count mark the result as thin.
const LIMITED_TARGET_COUNT: usize = 3;
/// Total assays below this count mark the result as thin.
const LIMITED_ASSAY_TOTAL: usize = 10;
const HIGH_VARIABILITY_IQR: f64 = 1.0;
const HIGH_VARIABILITY_MIN_ASSAYS: usize = 3;

/// A non-fatal loss of data quality during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Degradation {
    StructureUnavailable,
    MechanismUnavailable,
    TargetDetailsUnavailable,
    AccessionSourceDegraded,
    PathwaySourceUnavailable,
    LimitedPathwayCoverage,
    TargetsTruncated { shown: usize },
}

impl Degradation {
    pub fn message(&self) -> String {
        match self {
            Degradation::StructureUnavailable => "Drug structure image unavailable.".to_string(),
            Degradation::MechanismUnavailable => {
                "Drug mechanism data unavailable. Direction information may be missing.".to_string()
            }
            Degradation::TargetDetailsUnavailable => {
                "Target annotations unavailable. Showing ChEMBL target identifiers only.".to_string()
            }
            Degradation::AccessionSourceDegraded => "Some target annotations may be incomplete.".to_string(),
            Degradation::PathwaySourceUnavailable => {
                "Pathway data temporarily unavailable. Showing target binding data only.".to_string()
            }
            Degradation::LimitedPathwayCoverage => {
                "Some targets have limited pathway mapping coverage.".to_string()
            }
            Degradation::TargetsTruncated { shown } => {
                format!("Showing top {shown} targets by potency for performance.")
            }
        }
    }

    /// Whether this degradation means some targets lost pathway mapping.
    fn affects_mapping(&self) -> bool {
        matches!(
            self,
            Degradation::AccessionSourceDegraded
                | Degradation::PathwaySourceUnavailable
                | Degradation::LimitedPathwayCoverage
        )
    }
}

/// Per-run accumulator. Not shared between runs.
#[derive(Debug, Default)]
pub struct DegradationTracker {
    messages: BTreeSet<String>,
    partial_mapping: bool,
}

impl DegradationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, degradation: Degradation) {
        let message = degradation.message();
        if self.messages.insert(message.clone()) {
            warn!(%message, "Analysis degraded");
        }
        if degradation.affects_mapping() {
            self.partial_mapping = true;
        }
    }

    /// Turns a failed best-effort call into `None`, recording `degradation`.
    pub fn absorb<T>(&mut self, result: Result<T, SourceError>, degradation: Degradation) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(error = %e, "Non-fatal source failure");
                self.record(degradation);
                None
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Structured flags for the final target list.
    pub fn flags(&self, targets: &[TargetHit]) -> AnalysisFlags {
        let total_assays: usize = targets.iter().map(|t| t.assay_count).sum();
        AnalysisFlags {
            direction_unknown: targets.iter().any(TargetHit::is_direction_unknown),
            limited_data: targets.len() < LIMITED_TARGET_COUNT || total_assays < LIMITED_ASSAY_TOTAL,
            partial_mapping: self.partial_mapping,
            high_variability: targets
                .iter()
                .any(|t| t.pchembl_iqr >= HIGH_VARIABILITY_IQR && t.assay_count >= HIGH_VARIABILITY_MIN_ASSAYS),
        }
    }

    /// Sorted, de-duplicated messages.
    pub fn into_messages(self) -> Vec<String> {
        self.messages.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pathmind_test_utils::fixtures::target_hit;

    #[test]
    fn test_messages_deduplicate_and_sort() {
        let mut tracker = DegradationTracker::new();
        tracker.record(Degradation::PathwaySourceUnavailable);
        tracker.record(Degradation::MechanismUnavailable);
        tracker.record(Degradation::PathwaySourceUnavailable);
        let messages = tracker.into_messages();
        assert_eq!(messages.len(), 2);
        assert!(messages[0].starts_with("Drug mechanism"));
    }

    #[test]
    fn test_absorb_passes_values_through() {
        let mut tracker = DegradationTracker::new();
        assert_eq!(tracker.absorb(Ok::<_, SourceError>(3), Degradation::StructureUnavailable), Some(3));
        assert!(tracker.is_empty());

        let failed: Result<u8, _> = Err(SourceError::Status { source_name: "pubchem".into(), status: 503 });
        assert_eq!(tracker.absorb(failed, Degradation::StructureUnavailable), None);
        assert_eq!(tracker.into_messages(), vec!["Drug structure image unavailable."]);
    }

    #[test]
    fn test_enrichment_failures_do_not_flag_mapping() {
        let mut tracker = DegradationTracker::new();
        tracker.record(Degradation::MechanismUnavailable);
        tracker.record(Degradation::TargetsTruncated { shown: 50 });
        assert!(!tracker.flags(&[]).partial_mapping);

        tracker.record(Degradation::AccessionSourceDegraded);
        assert!(tracker.flags(&[]).partial_mapping);
    }

    #[test]
    fn test_flags_from_targets() {
        let tracker = DegradationTracker::new();
        let mut noisy = target_hit("CHEMBL1", 7.0);
        noisy.assay_count = 6;
        noisy.pchembl_iqr = 1.2;
        noisy.action_type = "INHIBITOR".into();
        let mut other = target_hit("CHEMBL2", 6.0);
        other.action_type = "INHIBITOR".into();
        other.assay_count = 2;
        other.pchembl_iqr = 3.0;

        let flags = tracker.flags(&[noisy.clone(), other.clone()]);
        assert!(flags.high_variability);
        assert!(flags.limited_data);
        assert!(!flags.direction_unknown);

        let mut third = target_hit("CHEMBL3", 5.5);
        third.assay_count = 2;
        let flags = tracker.flags(&[noisy, other, third]);
        // 6 + 2 + 2 assays reach the threshold.
        assert!(!flags.limited_data);
        assert!(flags.direction_unknown);
    }
}
