//! pathmind-ranker — pure scoring for drug → target → pathway analysis.
//!
//! Nothing in this crate performs I/O. Given the same inputs every function
//! returns the same output, independent of the order upstream data arrived in.

pub mod stats;
pub mod assay;
pub mod pathway;
pub mod compare;

pub use assay::{admits, aggregate_targets, TargetAggregation};
pub use compare::{compare_metrics, compare_rows, CompareMetrics, PathwayComparisonRow};
pub use pathway::{dedupe_child_over_parent, pathway_impact_score, score_pathways};
