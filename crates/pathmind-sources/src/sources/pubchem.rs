//! PubChem PUG REST client.
//!
//! Used only to cross-check ChEMBL identities by InChIKey. Name lookups that
//! PubChem does not know answer 404, which is reported as "no matches".

use async_trait::async_trait;
use pathmind_common::entities::SourceHealth;
use pathmind_common::SourceError;
use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

use crate::resilience::{probe, ResilientClient};
use crate::{SourceProbe, StructureMatch, StructureSource};

pub const SOURCE_NAME: &str = "pubchem";

pub struct PubChemClient {
    http: ResilientClient,
    base_url: String,
}

impl PubChemClient {
    pub fn new(http: ResilientClient, base_url: &str) -> Self {
        Self { http, base_url: base_url.trim_end_matches('/').to_string() }
    }

    /// Appends path segments, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Result<String, SourceError> {
        let mut url = Url::parse(&self.base_url).map_err(|e| SourceError::request(SOURCE_NAME, e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| SourceError::request(SOURCE_NAME, "base URL cannot carry a path"))?
            .extend(segments);
        Ok(url.to_string())
    }

    #[instrument(skip(self))]
    async fn resolve_cid(&self, cid: u64) -> Result<Option<StructureMatch>, SourceError> {
        let url = self.endpoint(&["compound", "cid", &cid.to_string(), "property", "CanonicalSMILES,InChIKey", "JSON"])?;
        let json = self.http.get_json(&url, &[]).await?;
        Ok(parse_properties(cid, &json))
    }
}

#[async_trait]
impl SourceProbe for PubChemClient {
    fn source_name(&self) -> &str {
        SOURCE_NAME
    }

    async fn ping(&self) -> SourceHealth {
        match self.endpoint(&["compound", "name", "ibuprofen", "cids", "JSON"]) {
            Ok(url) => probe(self.http.get_json(&url, &[])).await,
            Err(e) => probe(async { Err::<(), _>(e) }).await,
        }
    }
}

#[async_trait]
impl StructureSource for PubChemClient {
    #[instrument(skip(self))]
    async fn resolve_candidates(&self, query: &str, limit: usize) -> Result<Vec<StructureMatch>, SourceError> {
        let url = self.endpoint(&["compound", "name", query, "cids", "JSON"])?;
        let json = match self.http.get_json(&url, &[]).await {
            Ok(json) => json,
            Err(SourceError::Status { status: 404, .. }) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let cids = parse_cids(&json, limit);
        debug!(query, cids = cids.len(), "PubChem name lookup");

        let mut matches = Vec::with_capacity(cids.len());
        for cid in cids {
            if let Some(found) = self.resolve_cid(cid).await? {
                matches.push(found);
            }
        }
        Ok(matches)
    }
}

// ── Response parsing ────────────────────────────────────────────────────────

pub fn parse_cids(json: &Value, limit: usize) -> Vec<u64> {
    json["IdentifierList"]["CID"]
        .as_array()
        .map(|cids| cids.iter().filter_map(Value::as_u64).take(limit).collect())
        .unwrap_or_default()
}

pub fn parse_properties(cid: u64, json: &Value) -> Option<StructureMatch> {
    let first = json["PropertyTable"]["Properties"].as_array()?.first()?;
    Some(StructureMatch {
        pubchem_cid: cid,
        canonical_inchikey: first["InChIKey"].as_str().map(String::from),
        structure_smiles: first["CanonicalSMILES"]
            .as_str()
            .or_else(|| first["ConnectivitySMILES"].as_str())
            .map(String::from),
    })
}
