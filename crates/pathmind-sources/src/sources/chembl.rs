//! ChEMBL API client.
//!
//! ChEMBL is the primary source for the pipeline: compound identity,
//! bioactivity measurements and target annotations all come from here.
//!
//! API docs: https://chembl.gitbook.io/chembl-interface-documentation/web-resources/chembl-api
//! Endpoint: https://www.ebi.ac.uk/chembl/api/data

use std::collections::HashMap;

use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use pathmind_common::entities::{
    BioactivityRecord, CompoundCandidate, DrugSuggestion, SourceHealth, TargetDetail, MAX_SYNONYMS,
};
use pathmind_common::SourceError;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::resilience::{probe, ResilientClient};
use crate::{BioactivitySource, SourceProbe};

pub const SOURCE_NAME: &str = "chembl";

const ACTIVITY_PAGE_SIZE: usize = 1000;
const MAX_ACTIVITY_RECORDS: usize = 5000;
const ACTIVITY_TYPES: &str = "IC50,EC50,Ki,Kd";
const SUGGESTION_LIMIT: usize = 10;
const TARGET_FETCH_CONCURRENCY: usize = 4;

pub struct ChemblClient {
    http: ResilientClient,
    base_url: String,
}

impl ChemblClient {
    pub fn new(http: ResilientClient, base_url: &str) -> Self {
        Self { http, base_url: base_url.trim_end_matches('/').to_string() }
    }

    #[instrument(skip(self))]
    async fn fetch_molecule(&self, chembl_id: &str) -> Result<Value, SourceError> {
        let url = format!("{}/molecule/{}.json", self.base_url, chembl_id);
        self.http.get_json(&url, &[]).await
    }

    #[instrument(skip(self))]
    async fn fetch_target(&self, target_id: &str) -> Result<TargetDetail, SourceError> {
        let url = format!("{}/target/{}.json", self.base_url, target_id);
        let json = self.http.get_json(&url, &[]).await?;
        Ok(parse_target_detail(target_id, &json))
    }
}

#[async_trait]
impl SourceProbe for ChemblClient {
    fn source_name(&self) -> &str {
        SOURCE_NAME
    }

    async fn ping(&self) -> SourceHealth {
        let url = format!("{}/status.json", self.base_url);
        probe(self.http.get_json(&url, &[])).await
    }
}

#[async_trait]
impl BioactivitySource for ChemblClient {
    #[instrument(skip(self))]
    async fn suggest(&self, query: &str) -> Result<Vec<DrugSuggestion>, SourceError> {
        let url = format!("{}/molecule/search.json", self.base_url);
        let json = self
            .http
            .get_json(&url, &[("q", query.to_string()), ("limit", SUGGESTION_LIMIT.to_string())])
            .await?;
        Ok(parse_suggestions(&json))
    }

    #[instrument(skip(self))]
    async fn resolve_candidates(&self, query: &str, limit: usize) -> Result<Vec<CompoundCandidate>, SourceError> {
        let url = format!("{}/molecule/search.json", self.base_url);
        let json = self
            .http
            .get_json(&url, &[("q", query.to_string()), ("limit", limit.to_string())])
            .await?;

        let parents = parse_parent_ids(&json);
        debug!(query, parents = parents.len(), "ChEMBL search returned parent molecules");

        let mut candidates = Vec::with_capacity(parents.len());
        for (rank, parent_id) in parents.iter().enumerate() {
            let details = self.fetch_molecule(parent_id).await?;
            candidates.push(parse_candidate(parent_id, &details, rank));
        }
        Ok(candidates)
    }

    #[instrument(skip(self))]
    async fn fetch_activities(&self, chembl_parent_id: &str) -> Result<Vec<BioactivityRecord>, SourceError> {
        let url = format!("{}/activity.json", self.base_url);
        let mut records = Vec::new();
        let mut offset = 0;

        loop {
            let json = self
                .http
                .get_json(
                    &url,
                    &[
                        ("molecule_chembl_id", chembl_parent_id.to_string()),
                        ("standard_type__in", ACTIVITY_TYPES.to_string()),
                        ("limit", ACTIVITY_PAGE_SIZE.to_string()),
                        ("offset", offset.to_string()),
                    ],
                )
                .await?;
            let page = parse_activities(&json)?;
            let page_len = page.len();
            records.extend(page);

            offset += ACTIVITY_PAGE_SIZE;
            if page_len < ACTIVITY_PAGE_SIZE || offset >= MAX_ACTIVITY_RECORDS {
                break;
            }
        }

        debug!(compound = chembl_parent_id, count = records.len(), "Fetched ChEMBL activities");
        Ok(records)
    }

    #[instrument(skip(self, target_ids), fields(targets = target_ids.len()))]
    async fn fetch_target_details(
        &self,
        target_ids: &[String],
    ) -> Result<HashMap<String, TargetDetail>, SourceError> {
        stream::iter(target_ids.iter().cloned())
            .map(|id| async move { self.fetch_target(&id).await.map(|detail| (id, detail)) })
            .buffer_unordered(TARGET_FETCH_CONCURRENCY)
            .try_collect()
            .await
    }

    async fn release_version(&self) -> Result<String, SourceError> {
        let url = format!("{}/status.json", self.base_url);
        let json = self.http.get_json(&url, &[]).await?;
        Ok(json["chembl_db_version"].as_str().unwrap_or("unknown").to_string())
    }
}

// ── Response parsing ────────────────────────────────────────────────────────

pub fn parse_suggestions(json: &Value) -> Vec<DrugSuggestion> {
    molecules(json)
        .filter_map(|m| {
            let chembl_id = m["molecule_chembl_id"].as_str()?;
            Some(DrugSuggestion {
                display_name: m["pref_name"].as_str().unwrap_or(chembl_id).to_string(),
                chembl_id: chembl_id.to_string(),
            })
        })
        .collect()
}

/// Parent ids in search order, first occurrence wins.
pub fn parse_parent_ids(json: &Value) -> Vec<String> {
    let mut parents: Vec<String> = Vec::new();
    for molecule in molecules(json) {
        let parent = molecule["molecule_hierarchy"]["parent_chembl_id"]
            .as_str()
            .or_else(|| molecule["molecule_chembl_id"].as_str());
        if let Some(parent) = parent {
            if !parents.iter().any(|p| p == parent) {
                parents.push(parent.to_string());
            }
        }
    }
    parents
}

pub fn parse_candidate(parent_id: &str, details: &Value, rank: usize) -> CompoundCandidate {
    let synonyms = details["molecule_synonyms"]
        .as_array()
        .map(|names| {
            names
                .iter()
                .filter_map(|n| n["molecule_synonym"].as_str())
                .filter(|s| !s.is_empty())
                .take(MAX_SYNONYMS)
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();

    CompoundCandidate {
        chembl_parent_id: parent_id.to_string(),
        display_name: details["pref_name"].as_str().unwrap_or(parent_id).to_string(),
        canonical_inchikey: details["molecule_structures"]["standard_inchi_key"].as_str().map(String::from),
        structure_smiles: details["molecule_structures"]["canonical_smiles"].as_str().map(String::from),
        synonyms,
        match_score: (1.0 - rank as f64 * 0.1).max(0.0),
    }
}

pub fn parse_activities(json: &Value) -> Result<Vec<BioactivityRecord>, SourceError> {
    match json.get("activities") {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(activities) => serde_json::from_value(activities.clone())
            .map_err(|e| SourceError::decode(SOURCE_NAME, e.to_string())),
    }
}

pub fn parse_target_detail(target_id: &str, json: &Value) -> TargetDetail {
    let component = &json["target_components"][0];

    let gene_symbol = component["target_component_synonyms"].as_array().and_then(|synonyms| {
        synonyms
            .iter()
            .find(|s| {
                let kind = s["syn_type"].as_str().unwrap_or("").to_uppercase();
                kind == "GENE_SYMBOL" || kind == "GENE SYMBOL"
            })
            .and_then(|s| s["component_synonym"].as_str())
            .map(String::from)
    });

    let target_type = json["target_type"].as_str().unwrap_or("").to_lowercase();
    let confidence_score = match target_type.as_str() {
        "" => None,
        "single protein" => Some(9),
        _ => Some(8),
    };

    TargetDetail {
        target_name: Some(json["pref_name"].as_str().unwrap_or(target_id).to_string()),
        gene_symbol,
        uniprot_id: component["accession"].as_str().map(String::from),
        confidence_score,
        organism: json["organism"].as_str().map(String::from),
    }
}

fn molecules(json: &Value) -> impl Iterator<Item = &Value> {
    json["molecules"].as_array().into_iter().flatten()
}
