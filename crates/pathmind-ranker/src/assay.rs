//! Assay filtering and per-target potency aggregation.

use std::collections::{BTreeMap, HashMap};

use pathmind_common::confidence::{confidence_reasons, confidence_tier};
use pathmind_common::entities::{
    BioactivityRecord, ConfidenceTier, MappingStatus, TargetDetail, TargetHit, DEFAULT_TARGET_CONFIDENCE,
    MAX_ASSAY_IDS, UNKNOWN_ACTION,
};
use pathmind_common::AnalysisParams;
use tracing::debug;

use crate::stats::assay_spread;

const HUMAN: &str = "Homo sapiens";

/// Binding and functional assays.
const ACCEPTED_ASSAY_TYPES: [&str; 2] = ["B", "F"];

/// Whether a raw record is usable at the given potency threshold.
///
/// Assay-level organism is frequently missing, so an absent organism passes
/// here; non-human targets are removed later using the target annotation.
pub fn admits(record: &BioactivityRecord, pchembl_threshold: f64) -> bool {
    let organism_ok = record.organism.as_deref().map_or(true, |o| o == HUMAN);
    let validity_ok = record.data_validity_comment.as_deref().map_or(true, str::is_empty);
    let type_ok = record.assay_type.as_deref().is_some_and(|t| ACCEPTED_ASSAY_TYPES.contains(&t));

    record.relation.as_deref() == Some("=")
        && type_ok
        && organism_ok
        && validity_ok
        && record.pchembl.is_some_and(|v| v >= pchembl_threshold)
}

#[derive(Debug, Clone, PartialEq)]
pub struct TargetAggregation {
    pub hits: Vec<TargetHit>,
    /// More targets passed the filters than `max_targets` allowed.
    pub truncated: bool,
}

#[derive(Default)]
struct Bucket<'a> {
    values: Vec<f64>,
    assay_ids: Vec<String>,
    detail: Option<&'a TargetDetail>,
}

/// Groups admitted records by target and derives one [`TargetHit`] per target.
///
/// Hits are sorted by median potency (descending, ties by target id) and cut
/// to `max_targets`. Mapping fields start as `Unmapped` with no notes; the
/// mapping pass fills them in.
pub fn aggregate_targets(
    records: &[BioactivityRecord],
    details: &HashMap<String, TargetDetail>,
    actions_by_symbol: &BTreeMap<String, String>,
    params: &AnalysisParams,
    max_targets: usize,
) -> TargetAggregation {
    let mut buckets: BTreeMap<&str, Bucket<'_>> = BTreeMap::new();

    for record in records {
        if !admits(record, params.pchembl_threshold) {
            continue;
        }
        let (Some(target_id), Some(value)) = (record.target_id.as_deref(), record.pchembl) else {
            continue;
        };
        let detail = details.get(target_id);
        let non_human = detail
            .and_then(|d| d.organism.as_deref())
            .is_some_and(|o| !o.is_empty() && o != HUMAN);
        if non_human {
            continue;
        }

        let bucket = buckets.entry(target_id).or_default();
        bucket.detail = detail;
        bucket.values.push(value);
        if let Some(assay_id) = record.assay_id.as_deref() {
            if bucket.assay_ids.len() < MAX_ASSAY_IDS {
                bucket.assay_ids.push(assay_id.to_string());
            }
        }
    }

    let mut hits: Vec<TargetHit> = buckets
        .into_iter()
        .filter_map(|(target_id, bucket)| build_hit(target_id, bucket, actions_by_symbol, params))
        .collect();

    hits.sort_by(|a, b| {
        b.median_pchembl
            .total_cmp(&a.median_pchembl)
            .then_with(|| a.target_chembl_id.cmp(&b.target_chembl_id))
    });

    let truncated = hits.len() > max_targets;
    if truncated {
        debug!(kept = max_targets, dropped = hits.len() - max_targets, "Truncating target list");
        hits.truncate(max_targets);
    }

    TargetAggregation { hits, truncated }
}

fn build_hit(
    target_id: &str,
    bucket: Bucket<'_>,
    actions_by_symbol: &BTreeMap<String, String>,
    params: &AnalysisParams,
) -> Option<TargetHit> {
    let assay_count = bucket.values.len();
    if assay_count < params.min_assays {
        return None;
    }

    let detail = bucket.detail.cloned().unwrap_or_default();
    let confidence_score = Some(detail.confidence_score.unwrap_or(DEFAULT_TARGET_CONFIDENCE));
    let spread = assay_spread(&bucket.values);
    let tier = confidence_tier(assay_count, spread.median, confidence_score);
    if tier == ConfidenceTier::Low && !params.include_low_confidence {
        return None;
    }

    let target_name = detail
        .target_name
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| target_id.to_string());
    let action_type = action_for(detail.gene_symbol.as_deref(), &target_name, actions_by_symbol);

    Some(TargetHit {
        target_chembl_id: target_id.to_string(),
        target_name,
        gene_symbol: detail.gene_symbol,
        uniprot_id: detail.uniprot_id,
        action_type,
        median_pchembl: spread.median,
        assay_count,
        confidence_score,
        confidence_tier: tier,
        low_confidence: tier == ConfidenceTier::Low,
        source_assay_ids: bucket.assay_ids,
        pchembl_min: spread.min,
        pchembl_max: spread.max,
        pchembl_iqr: spread.iqr,
        confidence_reasons: confidence_reasons(assay_count, spread.median, confidence_score),
        mapping_status: MappingStatus::Unmapped,
        mapping_notes: Vec::new(),
    })
}

/// Looks up the action type by gene symbol, or by the first word of the
/// target name when no symbol is known.
fn action_for(gene_symbol: Option<&str>, target_name: &str, actions_by_symbol: &BTreeMap<String, String>) -> String {
    let symbol = gene_symbol
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| target_name.split(' ').next().unwrap_or(target_name))
        .to_uppercase();
    actions_by_symbol
        .get(&symbol)
        .cloned()
        .unwrap_or_else(|| UNKNOWN_ACTION.to_string())
}
