//! Pathway impact scoring and child-over-parent deduplication.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use pathmind_common::entities::{PathwayAssociation, PathwayScore, TargetHit};

use crate::stats::{median, round6};

/// `(targets hit / pathway size) * median potency`, rounded to 6 places.
/// Zero when nothing contributes or the size is not positive.
pub fn pathway_impact_score(target_values: &[f64], pathway_size: i64) -> f64 {
    if target_values.is_empty() || pathway_size <= 0 {
        return 0.0;
    }
    let coverage = target_values.len() as f64 / pathway_size as f64;
    round6(coverage * median(target_values))
}

/// Drops every pathway that another scored pathway lists as an ancestor.
pub fn dedupe_child_over_parent(pathways: Vec<PathwayScore>) -> Vec<PathwayScore> {
    let ancestors: BTreeSet<String> = pathways.iter().flat_map(|p| p.ancestor_ids.iter().cloned()).collect();
    pathways.into_iter().filter(|p| !ancestors.contains(&p.pathway_id)).collect()
}

struct Bucket<'a> {
    pathway: &'a PathwayAssociation,
    targets: BTreeMap<&'a str, f64>,
}

/// Aggregates target potencies per pathway and returns the top `top_n`
/// scored pathways.
///
/// Umbrella pathways (depth ≤ 1) are skipped. A target contributes at most
/// once per pathway. Output is sorted by score descending, ties by pathway id.
pub fn score_pathways(
    hits: &[TargetHit],
    pathways_by_target: &HashMap<String, Vec<PathwayAssociation>>,
    top_n: usize,
) -> Vec<PathwayScore> {
    let mut buckets: BTreeMap<&str, Bucket<'_>> = BTreeMap::new();

    // Iterating hits keeps bucket metadata independent of map order.
    for hit in hits {
        let Some(pathways) = pathways_by_target.get(&hit.target_chembl_id) else {
            continue;
        };
        for pathway in pathways.iter().filter(|p| p.depth > 1) {
            let bucket = buckets
                .entry(pathway.pathway_id.as_str())
                .or_insert_with(|| Bucket { pathway, targets: BTreeMap::new() });
            bucket.targets.insert(hit.target_chembl_id.as_str(), hit.median_pchembl);
        }
    }

    let scored: Vec<PathwayScore> = buckets
        .into_values()
        .map(|bucket| {
            let size = bucket.pathway.size.max(1);
            let values: Vec<f64> = bucket.targets.values().copied().collect();
            let target_ids: Vec<String> = bucket.targets.keys().map(|id| id.to_string()).collect();
            PathwayScore {
                pathway_id: bucket.pathway.pathway_id.clone(),
                pathway_name: bucket.pathway.pathway_name.clone(),
                depth: bucket.pathway.depth,
                size,
                targets_hit: target_ids.len(),
                median_pchembl: median(&values),
                score: pathway_impact_score(&values, i64::from(size)),
                url: bucket.pathway.url.clone(),
                ancestor_ids: bucket.pathway.ancestor_ids.clone(),
                coverage_ratio: round6(target_ids.len() as f64 / f64::from(size)),
                target_ids,
            }
        })
        .collect();

    let mut deduped = dedupe_child_over_parent(scored);
    deduped.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.pathway_id.cmp(&b.pathway_id)));
    deduped.truncate(top_n);
    deduped
}
