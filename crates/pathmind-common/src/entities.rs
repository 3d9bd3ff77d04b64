/// Core value types passed between the analysis stages.
/// Upstream JSON is decoded into these at the source boundary; nothing
/// downstream handles untyped maps.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::params::AnalysisParams;

/// Confidence score assumed for a target when the detail source reports none.
/// Absence is treated as "reasonably confident", not as zero.
pub const DEFAULT_TARGET_CONFIDENCE: u8 = 8;

/// Maximum number of source assay ids retained per target.
pub const MAX_ASSAY_IDS: usize = 50;

/// Maximum number of synonyms carried on a resolved identity.
pub const MAX_SYNONYMS: usize = 10;

pub const ATTRIBUTION: &str = "Data sources: ChEMBL (CC BY-SA 3.0), Reactome (CC0), \
UniProt (CC BY 4.0), OpenTargets (Open Access), PubChem (Public Domain).";

/// Upstream sources tracked in the version snapshot.
pub const VERSIONED_SOURCES: [&str; 5] = ["chembl", "reactome", "uniprot", "opentargets", "pubchem"];

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchReason {
    ChemblParentMatch,
    PubchemInchikeyMatch,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompoundIdentity {
    pub query: String,
    pub display_name: String,
    /// Parent-level ChEMBL id; stable across salts and forms.
    pub chembl_parent_id: String,
    /// InChIKey, or the parent id when no structure hash is known.
    pub canonical_inchikey: String,
    pub pubchem_cid: Option<u64>,
    pub structure_smiles: Option<String>,
    #[serde(default)]
    pub synonyms: Vec<String>,
    pub clinical_phase: Option<u8>,
    pub mechanism_of_action: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionCandidate {
    pub chembl_parent_id: String,
    pub display_name: String,
    pub canonical_inchikey: Option<String>,
    pub match_score: f64,
    pub match_reasons: Vec<MatchReason>,
}

/// Candidate compound as returned by the bioactivity source, before
/// cross-checking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompoundCandidate {
    pub chembl_parent_id: String,
    pub display_name: String,
    pub canonical_inchikey: Option<String>,
    pub structure_smiles: Option<String>,
    #[serde(default)]
    pub synonyms: Vec<String>,
    pub match_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrugSuggestion {
    pub display_name: String,
    pub chembl_id: String,
}

// ---------------------------------------------------------------------------
// Bioactivity
// ---------------------------------------------------------------------------

/// One raw activity measurement. Every field is optional because the
/// upstream frequently omits them; filtering happens in the ranker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BioactivityRecord {
    #[serde(default, alias = "target_chembl_id")]
    pub target_id: Option<String>,
    #[serde(default, alias = "pchembl_value", deserialize_with = "de_potency")]
    pub pchembl: Option<f64>,
    #[serde(default, alias = "standard_relation")]
    pub relation: Option<String>,
    #[serde(default)]
    pub assay_type: Option<String>,
    #[serde(default, alias = "target_organism")]
    pub organism: Option<String>,
    #[serde(default)]
    pub data_validity_comment: Option<String>,
    #[serde(default, alias = "assay_chembl_id")]
    pub assay_id: Option<String>,
}

/// pChEMBL values show up both as JSON strings and numbers.
fn de_potency<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetDetail {
    pub target_name: Option<String>,
    pub gene_symbol: Option<String>,
    pub uniprot_id: Option<String>,
    pub confidence_score: Option<u8>,
    pub organism: Option<String>,
}

// ---------------------------------------------------------------------------
// Targets
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceTier {
    Low,
    Medium,
    High,
}

impl ConfidenceTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceTier::High => "high",
            ConfidenceTier::Medium => "medium",
            ConfidenceTier::Low => "low",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MappingStatus {
    Mapped,
    Partial,
    Unmapped,
}

/// Provenance of a target's accession and pathway mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingNote {
    ChemblTargetAccession,
    UniprotChemblAccession,
    UniprotXrefLookup,
    UniprotGeneSymbol,
    UnmappedTarget,
    PathwayCacheHit,
    ReactomeLiveLookup,
    ReactomeUnavailable,
}

pub const UNKNOWN_ACTION: &str = "UNKNOWN";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetHit {
    pub target_chembl_id: String,
    pub target_name: String,
    pub gene_symbol: Option<String>,
    pub uniprot_id: Option<String>,
    pub action_type: String,
    pub median_pchembl: f64,
    pub assay_count: usize,
    pub confidence_score: Option<u8>,
    pub confidence_tier: ConfidenceTier,
    pub low_confidence: bool,
    pub source_assay_ids: Vec<String>,
    pub pchembl_min: f64,
    pub pchembl_max: f64,
    pub pchembl_iqr: f64,
    pub confidence_reasons: Vec<String>,
    pub mapping_status: MappingStatus,
    #[serde(default)]
    pub mapping_notes: Vec<MappingNote>,
}

impl TargetHit {
    /// Second materialized pass: returns the hit with its mapping outcome.
    pub fn with_mapping(
        self,
        uniprot_id: Option<String>,
        mapping_status: MappingStatus,
        mapping_notes: Vec<MappingNote>,
    ) -> Self {
        Self { uniprot_id, mapping_status, mapping_notes, ..self }
    }

    pub fn is_direction_unknown(&self) -> bool {
        self.action_type.eq_ignore_ascii_case(UNKNOWN_ACTION)
    }
}

// ---------------------------------------------------------------------------
// Pathways
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathwayAssociation {
    pub pathway_id: String,
    pub pathway_name: String,
    /// 1 = top-level umbrella pathway.
    pub depth: u32,
    pub size: u32,
    #[serde(default)]
    pub ancestor_ids: Vec<String>,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathwayScore {
    pub pathway_id: String,
    pub pathway_name: String,
    pub depth: u32,
    pub size: u32,
    pub targets_hit: usize,
    pub median_pchembl: f64,
    pub score: f64,
    pub target_ids: Vec<String>,
    pub url: String,
    pub ancestor_ids: Vec<String>,
    pub coverage_ratio: f64,
}

// ---------------------------------------------------------------------------
// Graph
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Drug,
    Target,
    Pathway,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    DrugTarget,
    TargetPathway,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub label: String,
    pub kind: NodeKind,
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub kind: EdgeKind,
    pub weight: f64,
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssociationGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

// ---------------------------------------------------------------------------
// Result
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisFlags {
    pub direction_unknown: bool,
    pub limited_data: bool,
    pub partial_mapping: bool,
    pub high_variability: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportManifest {
    pub layout_engine: String,
    pub layout_seed: u64,
    pub attribution_text: String,
    pub parameter_snapshot: AnalysisParams,
}

impl ExportManifest {
    pub fn for_params(params: &AnalysisParams) -> Self {
        Self {
            layout_engine: "dagre".to_string(),
            layout_seed: 42,
            attribution_text: ATTRIBUTION.to_string(),
            parameter_snapshot: params.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub drug_name: String,
    pub canonical_drug_id: String,
    pub params: AnalysisParams,
    pub resolution: CompoundIdentity,
    pub targets: Vec<TargetHit>,
    pub pathways: Vec<PathwayScore>,
    pub graph: AssociationGraph,
    pub source_versions: BTreeMap<String, String>,
    pub version_snapshot: BTreeMap<String, String>,
    pub flags: AnalysisFlags,
    pub export_manifest: ExportManifest,
    pub degraded_messages: Vec<String>,
    pub attribution: String,
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceStatus {
    Up,
    Down,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceHealth {
    pub status: SourceStatus,
    pub latency_ms: u64,
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pchembl_accepts_string_and_number() {
        let raw = serde_json::json!([
            {"target_chembl_id": "CHEMBL203", "pchembl_value": "7.25", "standard_relation": "="},
            {"target_chembl_id": "CHEMBL203", "pchembl_value": 6.5},
            {"target_chembl_id": "CHEMBL203", "pchembl_value": null},
            {"target_chembl_id": "CHEMBL203", "pchembl_value": "n/a"}
        ]);
        let records: Vec<BioactivityRecord> = serde_json::from_value(raw).unwrap();
        assert_eq!(records[0].pchembl, Some(7.25));
        assert_eq!(records[0].relation.as_deref(), Some("="));
        assert_eq!(records[1].pchembl, Some(6.5));
        assert_eq!(records[2].pchembl, None);
        assert_eq!(records[3].pchembl, None);
    }

    #[test]
    fn test_enum_wire_names() {
        assert_eq!(serde_json::to_string(&ConfidenceTier::High).unwrap(), "\"high\"");
        assert_eq!(serde_json::to_string(&MappingStatus::Unmapped).unwrap(), "\"unmapped\"");
        assert_eq!(
            serde_json::to_string(&MatchReason::PubchemInchikeyMatch).unwrap(),
            "\"pubchem_inchikey_match\""
        );
        assert_eq!(
            serde_json::to_string(&MappingNote::ReactomeUnavailable).unwrap(),
            "\"reactome_unavailable\""
        );
    }

    #[test]
    fn test_with_mapping_keeps_aggregation_fields() {
        let hit = TargetHit {
            target_chembl_id: "CHEMBL203".into(),
            target_name: "EGFR".into(),
            gene_symbol: Some("EGFR".into()),
            uniprot_id: None,
            action_type: UNKNOWN_ACTION.into(),
            median_pchembl: 7.0,
            assay_count: 3,
            confidence_score: Some(9),
            confidence_tier: ConfidenceTier::Medium,
            low_confidence: false,
            source_assay_ids: vec!["A1".into()],
            pchembl_min: 6.0,
            pchembl_max: 8.0,
            pchembl_iqr: 1.0,
            confidence_reasons: vec![],
            mapping_status: MappingStatus::Unmapped,
            mapping_notes: vec![],
        };
        let mapped = hit.clone().with_mapping(
            Some("P00533".into()),
            MappingStatus::Mapped,
            vec![MappingNote::UniprotGeneSymbol],
        );
        assert_eq!(mapped.uniprot_id.as_deref(), Some("P00533"));
        assert_eq!(mapped.median_pchembl, hit.median_pchembl);
        assert_eq!(mapped.source_assay_ids, hit.source_assay_ids);
        assert!(mapped.is_direction_unknown());
    }
}
