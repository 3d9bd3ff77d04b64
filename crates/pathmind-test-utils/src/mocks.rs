//! Mock upstream sources.
//!
//! Each mock answers from in-memory tables and can be switched into an
//! outage with `failing()`, in which case every call returns HTTP 503.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use pathmind_common::entities::{
    BioactivityRecord, CompoundCandidate, DrugSuggestion, PathwayAssociation, SourceHealth, SourceStatus,
    TargetDetail,
};
use pathmind_common::SourceError;
use pathmind_sources::{
    AccessionSource, BioactivitySource, DrugMechanismInfo, MechanismSource, PathwaySource, SourceProbe,
    StructureMatch, StructureSource,
};

fn outage(source_name: &str) -> SourceError {
    SourceError::Status { source_name: source_name.to_string(), status: 503 }
}

fn health(failing: bool, source_name: &str) -> SourceHealth {
    if failing {
        SourceHealth { status: SourceStatus::Down, latency_ms: 0, error: Some(outage(source_name).to_string()) }
    } else {
        SourceHealth { status: SourceStatus::Up, latency_ms: 1, error: None }
    }
}

// ── Bioactivity ─────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MockBioactivitySource {
    candidates: Vec<CompoundCandidate>,
    activities: Vec<BioactivityRecord>,
    details: HashMap<String, TargetDetail>,
    failing: bool,
    failing_activities: bool,
    failing_details: bool,
    resolve_calls: AtomicUsize,
    activity_calls: AtomicUsize,
}

impl MockBioactivitySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_candidate(mut self, candidate: CompoundCandidate) -> Self {
        self.candidates.push(candidate);
        self
    }

    pub fn with_activities(mut self, records: impl IntoIterator<Item = BioactivityRecord>) -> Self {
        self.activities.extend(records);
        self
    }

    pub fn with_target_detail(mut self, target_id: &str, detail: TargetDetail) -> Self {
        self.details.insert(target_id.to_string(), detail);
        self
    }

    /// Every call fails.
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    /// Resolution works, activity retrieval fails.
    pub fn failing_activities(mut self) -> Self {
        self.failing_activities = true;
        self
    }

    pub fn failing_target_details(mut self) -> Self {
        self.failing_details = true;
        self
    }

    pub fn resolve_calls(&self) -> usize {
        self.resolve_calls.load(Ordering::SeqCst)
    }

    pub fn activity_calls(&self) -> usize {
        self.activity_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceProbe for MockBioactivitySource {
    fn source_name(&self) -> &str {
        "chembl"
    }

    async fn ping(&self) -> SourceHealth {
        health(self.failing, "chembl")
    }
}

#[async_trait]
impl BioactivitySource for MockBioactivitySource {
    async fn suggest(&self, query: &str) -> Result<Vec<DrugSuggestion>, SourceError> {
        if self.failing {
            return Err(outage("chembl"));
        }
        let needle = query.to_lowercase();
        Ok(self
            .candidates
            .iter()
            .filter(|c| c.display_name.to_lowercase().contains(&needle))
            .map(|c| DrugSuggestion { display_name: c.display_name.clone(), chembl_id: c.chembl_parent_id.clone() })
            .collect())
    }

    async fn resolve_candidates(&self, _query: &str, limit: usize) -> Result<Vec<CompoundCandidate>, SourceError> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing {
            return Err(outage("chembl"));
        }
        Ok(self.candidates.iter().take(limit).cloned().collect())
    }

    async fn fetch_activities(&self, _chembl_parent_id: &str) -> Result<Vec<BioactivityRecord>, SourceError> {
        self.activity_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing || self.failing_activities {
            return Err(outage("chembl"));
        }
        Ok(self.activities.clone())
    }

    async fn fetch_target_details(
        &self,
        target_ids: &[String],
    ) -> Result<HashMap<String, TargetDetail>, SourceError> {
        if self.failing || self.failing_details {
            return Err(outage("chembl"));
        }
        Ok(target_ids
            .iter()
            .filter_map(|id| self.details.get(id).map(|d| (id.clone(), d.clone())))
            .collect())
    }

    async fn release_version(&self) -> Result<String, SourceError> {
        if self.failing {
            return Err(outage("chembl"));
        }
        Ok("ChEMBL_35".to_string())
    }
}

// ── Structure ───────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MockStructureSource {
    matches: Vec<StructureMatch>,
    failing: bool,
}

impl MockStructureSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_match(mut self, cid: u64, inchikey: &str) -> Self {
        self.matches.push(StructureMatch {
            pubchem_cid: cid,
            canonical_inchikey: Some(inchikey.to_string()),
            structure_smiles: Some("C".to_string()),
        });
        self
    }

    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }
}

#[async_trait]
impl SourceProbe for MockStructureSource {
    fn source_name(&self) -> &str {
        "pubchem"
    }

    async fn ping(&self) -> SourceHealth {
        health(self.failing, "pubchem")
    }
}

#[async_trait]
impl StructureSource for MockStructureSource {
    async fn resolve_candidates(&self, _query: &str, limit: usize) -> Result<Vec<StructureMatch>, SourceError> {
        if self.failing {
            return Err(outage("pubchem"));
        }
        Ok(self.matches.iter().take(limit).cloned().collect())
    }
}

// ── Mechanism ───────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MockMechanismSource {
    info: DrugMechanismInfo,
    failing: bool,
}

impl MockMechanismSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_action(mut self, gene_symbol: &str, action_type: &str) -> Self {
        self.info.actions_by_symbol.insert(gene_symbol.to_uppercase(), action_type.to_uppercase());
        self
    }

    pub fn with_phase(mut self, phase: u8) -> Self {
        self.info.clinical_phase = Some(phase);
        self
    }

    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }
}

#[async_trait]
impl SourceProbe for MockMechanismSource {
    fn source_name(&self) -> &str {
        "opentargets"
    }

    async fn ping(&self) -> SourceHealth {
        health(self.failing, "opentargets")
    }
}

#[async_trait]
impl MechanismSource for MockMechanismSource {
    async fn fetch_drug_info(&self, _chembl_id: &str) -> Result<DrugMechanismInfo, SourceError> {
        if self.failing {
            return Err(outage("opentargets"));
        }
        Ok(self.info.clone())
    }
}

// ── Accession ───────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MockAccessionSource {
    by_chembl: HashMap<String, String>,
    by_xref: HashMap<String, String>,
    by_symbol: HashMap<String, String>,
    failing: bool,
    calls: AtomicUsize,
}

impl MockAccessionSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chembl_accession(mut self, target_id: &str, accession: &str) -> Self {
        self.by_chembl.insert(target_id.to_string(), accession.to_string());
        self
    }

    pub fn with_xref(mut self, target_id: &str, accession: &str) -> Self {
        self.by_xref.insert(target_id.to_string(), accession.to_string());
        self
    }

    pub fn with_gene_symbol(mut self, symbol: &str, accession: &str) -> Self {
        self.by_symbol.insert(symbol.to_string(), accession.to_string());
        self
    }

    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn lookup(&self, table: &HashMap<String, String>, key: &str) -> Result<Option<String>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing {
            return Err(outage("uniprot"));
        }
        Ok(table.get(key).cloned())
    }
}

#[async_trait]
impl SourceProbe for MockAccessionSource {
    fn source_name(&self) -> &str {
        "uniprot"
    }

    async fn ping(&self) -> SourceHealth {
        health(self.failing, "uniprot")
    }
}

#[async_trait]
impl AccessionSource for MockAccessionSource {
    async fn map_by_chembl_accession(&self, target_chembl_id: &str) -> Result<Option<String>, SourceError> {
        self.lookup(&self.by_chembl, target_chembl_id)
    }

    async fn map_by_xref(&self, target_chembl_id: &str) -> Result<Option<String>, SourceError> {
        self.lookup(&self.by_xref, target_chembl_id)
    }

    async fn map_by_gene_symbol(&self, gene_symbol: &str) -> Result<Option<String>, SourceError> {
        self.lookup(&self.by_symbol, gene_symbol)
    }
}

// ── Pathways ────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MockPathwaySource {
    by_accession: HashMap<String, Vec<PathwayAssociation>>,
    failing_accessions: HashSet<String>,
    failing: bool,
    calls: AtomicUsize,
}

impl MockPathwaySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pathways(mut self, accession: &str, pathways: Vec<PathwayAssociation>) -> Self {
        self.by_accession.insert(accession.to_string(), pathways);
        self
    }

    /// Lookups for this accession fail; others still succeed.
    pub fn failing_for(mut self, accession: &str) -> Self {
        self.failing_accessions.insert(accession.to_string());
        self
    }

    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceProbe for MockPathwaySource {
    fn source_name(&self) -> &str {
        "reactome"
    }

    async fn ping(&self) -> SourceHealth {
        health(self.failing, "reactome")
    }
}

#[async_trait]
impl PathwaySource for MockPathwaySource {
    async fn pathways_for_accession(&self, accession: &str) -> Result<Vec<PathwayAssociation>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing || self.failing_accessions.contains(accession) {
            return Err(outage("reactome"));
        }
        Ok(self.by_accession.get(accession).cloned().unwrap_or_default())
    }

    async fn release_version(&self) -> Result<String, SourceError> {
        if self.failing {
            return Err(outage("reactome"));
        }
        Ok("91".to_string())
    }
}
