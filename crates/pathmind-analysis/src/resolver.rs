//! Drug identity resolution.
//!
//! ChEMBL supplies parent-level candidates; PubChem is consulted for an
//! InChIKey cross-check. Only a ChEMBL failure is fatal here.

use std::collections::HashSet;
use std::sync::Arc;

use pathmind_common::entities::{
    CompoundCandidate, CompoundIdentity, MatchReason, ResolutionCandidate, MAX_SYNONYMS,
};
use pathmind_common::{PathmindError, Result};
use pathmind_sources::{BioactivitySource, StructureMatch, StructureSource};
use tracing::{debug, info, instrument, warn};

/// Outcome of a successful resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub identity: CompoundIdentity,
    pub candidates: Vec<ResolutionCandidate>,
    /// False when the structure source failed during this resolution.
    pub structure_available: bool,
}

pub struct IdentityResolver {
    bioactivity: Arc<dyn BioactivitySource>,
    structure: Arc<dyn StructureSource>,
    candidate_limit: usize,
    structure_limit: usize,
}

impl IdentityResolver {
    pub fn new(
        bioactivity: Arc<dyn BioactivitySource>,
        structure: Arc<dyn StructureSource>,
        candidate_limit: usize,
        structure_limit: usize,
    ) -> Self {
        Self { bioactivity, structure, candidate_limit, structure_limit }
    }

    #[instrument(skip(self))]
    pub async fn resolve(&self, query: &str, choice: Option<&str>) -> Result<Resolution> {
        let raw = self
            .bioactivity
            .resolve_candidates(query, self.candidate_limit)
            .await
            .map_err(|e| PathmindError::FatalUpstream(format!("ChEMBL is temporarily unavailable: {e}")))?;
        let ranked = rank_candidates(raw, self.candidate_limit);
        if ranked.is_empty() {
            return Err(PathmindError::NotFound(query.to_string()));
        }

        let (structures, structure_available) = match self.structure.resolve_candidates(query, self.structure_limit).await {
            Ok(matches) => (matches, true),
            Err(e) => {
                warn!(error = %e, "Structure cross-check unavailable");
                (Vec::new(), false)
            }
        };
        let pubchem_keys: HashSet<&str> =
            structures.iter().filter_map(|m| m.canonical_inchikey.as_deref()).collect();

        let candidates: Vec<ResolutionCandidate> = ranked
            .iter()
            .map(|c| {
                let mut match_reasons = vec![MatchReason::ChemblParentMatch];
                if c.canonical_inchikey.as_deref().is_some_and(|k| pubchem_keys.contains(k)) {
                    match_reasons.push(MatchReason::PubchemInchikeyMatch);
                }
                ResolutionCandidate {
                    chembl_parent_id: c.chembl_parent_id.clone(),
                    display_name: c.display_name.clone(),
                    canonical_inchikey: c.canonical_inchikey.clone(),
                    match_score: c.match_score,
                    match_reasons,
                }
            })
            .collect();

        let selected = match choice {
            Some(choice) => ranked.iter().find(|c| c.chembl_parent_id == choice).ok_or_else(|| {
                PathmindError::InvalidChoice { query: query.to_string(), choice: choice.to_string() }
            })?,
            None if ranked.len() == 1 => &ranked[0],
            None => {
                debug!(count = ranked.len(), "Ambiguous drug query");
                return Err(PathmindError::Ambiguous { query: query.to_string(), candidates });
            }
        };

        let identity = build_identity(query, selected, &structures);
        info!(chembl_id = %identity.chembl_parent_id, "Resolved drug identity");
        Ok(Resolution { identity, candidates, structure_available })
    }
}

/// First-seen wins per parent id; scores decay with rank.
fn rank_candidates(raw: Vec<CompoundCandidate>, limit: usize) -> Vec<CompoundCandidate> {
    let mut seen = HashSet::new();
    raw.into_iter()
        .filter(|c| !c.chembl_parent_id.is_empty() && seen.insert(c.chembl_parent_id.clone()))
        .take(limit)
        .enumerate()
        .map(|(rank, c)| CompoundCandidate { match_score: rank_score(rank), ..c })
        .collect()
}

fn rank_score(rank: usize) -> f64 {
    (1.0 - rank as f64 * 0.1).max(0.0)
}

fn build_identity(query: &str, selected: &CompoundCandidate, structures: &[StructureMatch]) -> CompoundIdentity {
    let matching = match selected.canonical_inchikey.as_deref() {
        Some(key) => structures.iter().find(|m| m.canonical_inchikey.as_deref() == Some(key)),
        None => structures.first(),
    };
    let canonical_inchikey = selected
        .canonical_inchikey
        .clone()
        .or_else(|| matching.and_then(|m| m.canonical_inchikey.clone()))
        .unwrap_or_else(|| selected.chembl_parent_id.clone());

    CompoundIdentity {
        query: query.to_string(),
        display_name: selected.display_name.clone(),
        chembl_parent_id: selected.chembl_parent_id.clone(),
        canonical_inchikey,
        pubchem_cid: matching.map(|m| m.pubchem_cid),
        structure_smiles: selected
            .structure_smiles
            .clone()
            .or_else(|| matching.and_then(|m| m.structure_smiles.clone())),
        synonyms: selected.synonyms.iter().take(MAX_SYNONYMS).cloned().collect(),
        clinical_phase: None,
        mechanism_of_action: None,
    }
}
