//! Upstream data source interfaces and their HTTP clients.
//!
//! The analysis core only sees the traits below. Concrete clients for ChEMBL,
//! PubChem, OpenTargets, UniProt and Reactome live in [`sources`] and share
//! the retry and circuit-breaker behaviour in [`resilience`].

pub mod resilience;
pub mod sources;

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use pathmind_common::entities::{
    BioactivityRecord, CompoundCandidate, DrugSuggestion, PathwayAssociation, SourceHealth, TargetDetail,
};
use pathmind_common::SourceError;
use serde::{Deserialize, Serialize};

pub use resilience::{CircuitBreaker, CircuitState, ResilientClient, RetryPolicy};
pub use sources::{
    chembl::ChemblClient, opentargets::OpenTargetsClient, pubchem::PubChemClient, reactome::ReactomeClient,
    uniprot::UniProtClient,
};

/// Structure-level match from the secondary identity source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureMatch {
    pub pubchem_cid: u64,
    pub canonical_inchikey: Option<String>,
    pub structure_smiles: Option<String>,
}

/// Mechanism-of-action summary for a compound.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DrugMechanismInfo {
    /// Action type keyed by upper-cased gene symbol.
    pub actions_by_symbol: BTreeMap<String, String>,
    pub clinical_phase: Option<u8>,
    pub mechanism_of_action: Option<String>,
}

/// Health probing shared by every source.
#[async_trait]
pub trait SourceProbe: Send + Sync {
    fn source_name(&self) -> &str;

    /// Never fails; an unreachable source reports `down`.
    async fn ping(&self) -> SourceHealth;
}

/// Primary bioactivity source. Its failure is fatal for an analysis run.
#[async_trait]
pub trait BioactivitySource: SourceProbe {
    async fn suggest(&self, query: &str) -> Result<Vec<DrugSuggestion>, SourceError>;

    /// Parent-level candidates in source relevance order, deduplicated by parent id.
    async fn resolve_candidates(&self, query: &str, limit: usize) -> Result<Vec<CompoundCandidate>, SourceError>;

    async fn fetch_activities(&self, chembl_parent_id: &str) -> Result<Vec<BioactivityRecord>, SourceError>;

    async fn fetch_target_details(
        &self,
        target_ids: &[String],
    ) -> Result<HashMap<String, TargetDetail>, SourceError>;

    async fn release_version(&self) -> Result<String, SourceError>;
}

/// Secondary structure-matching source, used to cross-check identities.
#[async_trait]
pub trait StructureSource: SourceProbe {
    async fn resolve_candidates(&self, query: &str, limit: usize) -> Result<Vec<StructureMatch>, SourceError>;
}

#[async_trait]
pub trait MechanismSource: SourceProbe {
    async fn fetch_drug_info(&self, chembl_id: &str) -> Result<DrugMechanismInfo, SourceError>;
}

/// Identifier mapping from ChEMBL targets to protein accessions.
/// Each lookup returns at most one accession.
#[async_trait]
pub trait AccessionSource: SourceProbe {
    async fn map_by_chembl_accession(&self, target_chembl_id: &str) -> Result<Option<String>, SourceError>;

    /// Cross-reference lookup restricted to human entries.
    async fn map_by_xref(&self, target_chembl_id: &str) -> Result<Option<String>, SourceError>;

    async fn map_by_gene_symbol(&self, gene_symbol: &str) -> Result<Option<String>, SourceError>;
}

#[async_trait]
pub trait PathwaySource: SourceProbe {
    async fn pathways_for_accession(&self, accession: &str) -> Result<Vec<PathwayAssociation>, SourceError>;

    async fn release_version(&self) -> Result<String, SourceError>;
}
