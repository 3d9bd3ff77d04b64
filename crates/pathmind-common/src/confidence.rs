/// Confidence tier policy for aggregated targets.
/// All three thresholds must hold together for a tier to apply.

use crate::entities::ConfidenceTier;

/// Bucket a target by assay count, median potency and external confidence.
/// A missing confidence score counts as 0 here; callers that want the
/// "assume reasonably confident" default apply it before calling.
pub fn confidence_tier(assay_count: usize, median_pchembl: f64, confidence_score: Option<u8>) -> ConfidenceTier {
    let score = confidence_score.unwrap_or(0);
    if assay_count >= 5 && median_pchembl >= 6.0 && score >= 9 {
        ConfidenceTier::High
    } else if assay_count >= 2 && median_pchembl >= 5.0 && score >= 8 {
        ConfidenceTier::Medium
    } else {
        ConfidenceTier::Low
    }
}

/// Three informational tags, one per input, evaluated independently.
pub fn confidence_reasons(assay_count: usize, median_pchembl: f64, confidence_score: Option<u8>) -> Vec<String> {
    let score = confidence_score.unwrap_or(0);

    let count_reason = if assay_count >= 5 {
        "assay_count>=5"
    } else if assay_count >= 2 {
        "assay_count>=2"
    } else {
        "assay_count<2"
    };

    let median_reason = if median_pchembl >= 6.0 {
        "median_pchembl>=6.0"
    } else if median_pchembl >= 5.0 {
        "median_pchembl>=5.0"
    } else {
        "median_pchembl<5.0"
    };

    let score_reason = if score >= 9 {
        "target_confidence>=9"
    } else if score >= 8 {
        "target_confidence>=8"
    } else {
        "target_confidence<8"
    };

    vec![count_reason.to_string(), median_reason.to_string(), score_reason.to_string()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_thresholds() {
        assert_eq!(confidence_tier(5, 6.2, Some(9)), ConfidenceTier::High);
        assert_eq!(confidence_tier(2, 5.1, Some(8)), ConfidenceTier::Medium);
        assert_eq!(confidence_tier(1, 4.9, Some(7)), ConfidenceTier::Low);
    }

    #[test]
    fn test_tier_requires_all_three() {
        // High potency and many assays but a weak target assignment.
        assert_eq!(confidence_tier(12, 8.5, Some(7)), ConfidenceTier::Low);
        assert_eq!(confidence_tier(5, 6.0, Some(8)), ConfidenceTier::Medium);
        assert_eq!(confidence_tier(5, 6.0, None), ConfidenceTier::Low);
    }

    #[test]
    fn test_tier_monotonic() {
        let tiers = [
            confidence_tier(1, 4.0, Some(5)),
            confidence_tier(2, 5.0, Some(8)),
            confidence_tier(5, 6.0, Some(9)),
            confidence_tier(20, 9.0, Some(10)),
        ];
        assert!(tiers.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_reasons_always_three() {
        assert_eq!(
            confidence_reasons(5, 6.2, Some(9)),
            vec!["assay_count>=5", "median_pchembl>=6.0", "target_confidence>=9"]
        );
        assert_eq!(
            confidence_reasons(1, 4.9, None),
            vec!["assay_count<2", "median_pchembl<5.0", "target_confidence<8"]
        );
        assert_eq!(confidence_reasons(3, 5.5, Some(8)).len(), 3);
    }
}
