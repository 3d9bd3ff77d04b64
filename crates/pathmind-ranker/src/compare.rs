//! Similarity between two completed analyses.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use pathmind_common::entities::PathwayScore;
use serde::{Deserialize, Serialize};

use crate::stats::round6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathwayComparisonRow {
    pub pathway_id: String,
    pub pathway_name: String,
    pub score_a: Option<f64>,
    pub score_b: Option<f64>,
    pub delta: Option<f64>,
    pub shared: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompareMetrics {
    pub target_jaccard: f64,
    pub pathway_cosine_similarity: f64,
    pub shared_pathway_count: usize,
    pub unique_pathway_count_a: usize,
    pub unique_pathway_count_b: usize,
}

/// Full outer join of two pathway lists by id, largest absolute delta first.
///
/// Rows without a delta sort as if it were 0. Equal keys keep first-seen
/// order: pathways of `a`, then those only in `b`.
pub fn compare_rows(pathways_a: &[PathwayScore], pathways_b: &[PathwayScore]) -> Vec<PathwayComparisonRow> {
    let mut order: Vec<&str> = Vec::new();
    let mut joined: BTreeMap<&str, (Option<&PathwayScore>, Option<&PathwayScore>)> = BTreeMap::new();

    for p in pathways_a {
        let slot = joined.entry(p.pathway_id.as_str()).or_insert_with(|| {
            order.push(p.pathway_id.as_str());
            (None, None)
        });
        slot.0 = Some(p);
    }
    for p in pathways_b {
        let slot = joined.entry(p.pathway_id.as_str()).or_insert_with(|| {
            order.push(p.pathway_id.as_str());
            (None, None)
        });
        slot.1 = Some(p);
    }

    let mut rows: Vec<PathwayComparisonRow> = order
        .into_iter()
        .filter_map(|id| {
            let (a, b) = joined.get(id).copied()?;
            let name = a.or(b)?.pathway_name.clone();
            let score_a = a.map(|p| p.score);
            let score_b = b.map(|p| p.score);
            let delta = score_a.zip(score_b).map(|(x, y)| round6(x - y));
            Some(PathwayComparisonRow {
                pathway_id: id.to_string(),
                pathway_name: name,
                score_a,
                score_b,
                delta,
                shared: a.is_some() && b.is_some(),
            })
        })
        .collect();

    // sort_by is stable
    rows.sort_by(|x, y| {
        let dx = x.delta.unwrap_or(0.0).abs();
        let dy = y.delta.unwrap_or(0.0).abs();
        dy.total_cmp(&dx)
    });
    rows
}

/// Jaccard over target ids and cosine over pathway score vectors.
pub fn compare_metrics(
    targets_a: &[String],
    targets_b: &[String],
    pathways_a: &BTreeMap<String, f64>,
    pathways_b: &BTreeMap<String, f64>,
) -> CompareMetrics {
    let set_a: HashSet<&String> = targets_a.iter().collect();
    let set_b: HashSet<&String> = targets_b.iter().collect();
    let union = set_a.union(&set_b).count();
    let intersection = set_a.intersection(&set_b).count();
    let target_jaccard = if union == 0 { 0.0 } else { intersection as f64 / union as f64 };

    let all_ids: BTreeSet<&String> = pathways_a.keys().chain(pathways_b.keys()).collect();
    let (mut dot, mut norm_a, mut norm_b) = (0.0_f64, 0.0_f64, 0.0_f64);
    for id in &all_ids {
        let a = pathways_a.get(*id).copied().unwrap_or(0.0);
        let b = pathways_b.get(*id).copied().unwrap_or(0.0);
        dot += a * b;
        norm_a += a * a;
        norm_b += b * b;
    }
    let (norm_a, norm_b) = (norm_a.sqrt(), norm_b.sqrt());
    let cosine = if norm_a == 0.0 || norm_b == 0.0 { 0.0 } else { dot / (norm_a * norm_b) };

    let shared = pathways_a.keys().filter(|id| pathways_b.contains_key(*id)).count();

    CompareMetrics {
        target_jaccard: round6(target_jaccard),
        pathway_cosine_similarity: round6(cosine),
        shared_pathway_count: shared,
        unique_pathway_count_a: pathways_a.len() - shared,
        unique_pathway_count_b: pathways_b.len() - shared,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn scored(id: &str, score: f64) -> PathwayScore {
        PathwayScore {
            pathway_id: id.into(),
            pathway_name: format!("Pathway {id}"),
            depth: 3,
            size: 50,
            targets_hit: 1,
            median_pchembl: 7.0,
            score,
            target_ids: vec![],
            url: String::new(),
            ancestor_ids: vec![],
            coverage_ratio: 0.02,
        }
    }

    fn ids(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn vector(items: &[(&str, f64)]) -> BTreeMap<String, f64> {
        items.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_identical_analyses() {
        let targets = ids(&["CHEMBL1", "CHEMBL2"]);
        let pathways = vector(&[("R-1", 0.14), ("R-2", 0.3)]);
        let metrics = compare_metrics(&targets, &targets, &pathways, &pathways);
        assert_eq!(metrics.target_jaccard, 1.0);
        assert_eq!(metrics.pathway_cosine_similarity, 1.0);
        assert_eq!(metrics.shared_pathway_count, 2);
        assert_eq!(metrics.unique_pathway_count_a, 0);
    }

    #[test]
    fn test_disjoint_analyses() {
        let metrics = compare_metrics(
            &ids(&["CHEMBL1"]),
            &ids(&["CHEMBL9"]),
            &vector(&[("R-1", 0.5)]),
            &vector(&[("R-9", 0.5)]),
        );
        assert_eq!(metrics.target_jaccard, 0.0);
        assert_eq!(metrics.pathway_cosine_similarity, 0.0);
        assert_eq!(metrics.unique_pathway_count_a, 1);
        assert_eq!(metrics.unique_pathway_count_b, 1);
    }

    #[test]
    fn test_empty_inputs() {
        let metrics = compare_metrics(&[], &[], &BTreeMap::new(), &BTreeMap::new());
        assert_eq!(metrics.target_jaccard, 0.0);
        assert_eq!(metrics.pathway_cosine_similarity, 0.0);
    }

    #[test]
    fn test_partial_overlap() {
        let metrics = compare_metrics(
            &ids(&["A", "B", "C"]),
            &ids(&["B", "C", "D"]),
            &vector(&[("R-1", 1.0)]),
            &vector(&[("R-1", 1.0), ("R-2", 1.0)]),
        );
        assert_eq!(metrics.target_jaccard, 0.5);
        // 1 / (1 * sqrt(2))
        assert_eq!(metrics.pathway_cosine_similarity, 0.707107);
    }

    #[test]
    fn test_rows_outer_join_and_order() {
        let a = vec![scored("R-1", 0.5), scored("R-2", 0.1), scored("R-3", 0.2)];
        let b = vec![scored("R-2", 0.4), scored("R-4", 0.9), scored("R-1", 0.5)];
        let rows = compare_rows(&a, &b);
        let order: Vec<_> = rows.iter().map(|r| r.pathway_id.as_str()).collect();
        // R-2 has |delta| 0.3; the rest sort as 0 in first-seen order.
        assert_eq!(order, vec!["R-2", "R-1", "R-3", "R-4"]);

        assert_eq!(rows[0].delta, Some(-0.3));
        assert!(rows[0].shared);
        assert_eq!(rows[1].delta, Some(0.0));
        assert_eq!(rows[2].score_b, None);
        assert_eq!(rows[2].delta, None);
        assert!(!rows[3].shared);
        assert_eq!(rows[3].score_a, None);
        assert_eq!(rows[3].pathway_name, "Pathway R-4");
    }
}
