//! Reactome ContentService client.
//!
//! The UniProt mapping endpoint does not report pathway size or parents, so
//! those fall back to defaults unless the payload happens to carry them.

use async_trait::async_trait;
use pathmind_common::entities::{PathwayAssociation, SourceHealth};
use pathmind_common::SourceError;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::resilience::{probe, ResilientClient};
use crate::{PathwaySource, SourceProbe};

pub const SOURCE_NAME: &str = "reactome";

const DEFAULT_DEPTH: u32 = 3;
const DEFAULT_PATHWAY_SIZE: u32 = 50;

pub struct ReactomeClient {
    http: ResilientClient,
    base_url: String,
}

impl ReactomeClient {
    pub fn new(http: ResilientClient, base_url: &str) -> Self {
        Self { http, base_url: base_url.trim_end_matches('/').to_string() }
    }
}

#[async_trait]
impl SourceProbe for ReactomeClient {
    fn source_name(&self) -> &str {
        SOURCE_NAME
    }

    async fn ping(&self) -> SourceHealth {
        let url = format!("{}/data/query/R-HSA-162582", self.base_url);
        probe(self.http.get_json(&url, &[])).await
    }
}

#[async_trait]
impl PathwaySource for ReactomeClient {
    #[instrument(skip(self))]
    async fn pathways_for_accession(&self, accession: &str) -> Result<Vec<PathwayAssociation>, SourceError> {
        let url = format!("{}/data/mapping/UniProt/{}/pathways", self.base_url, accession);
        let json = match self.http.get_json(&url, &[]).await {
            Ok(json) => json,
            // Unknown accession.
            Err(SourceError::Status { status: 404, .. }) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        let pathways = parse_pathways(&json);
        debug!(accession, count = pathways.len(), "Reactome pathways");
        Ok(pathways)
    }

    async fn release_version(&self) -> Result<String, SourceError> {
        let url = format!("{}/data/database/version", self.base_url);
        let text = self.http.get_text(&url).await?;
        let version = text.trim();
        Ok(if version.is_empty() { "unknown".to_string() } else { version.to_string() })
    }
}

/// Non-array payloads (error objects) yield no pathways.
pub fn parse_pathways(json: &Value) -> Vec<PathwayAssociation> {
    let Some(items) = json.as_array() else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|pathway| {
            let pathway_id = match (&pathway["stId"], &pathway["dbId"]) {
                (Value::String(st_id), _) if !st_id.is_empty() => st_id.clone(),
                (_, Value::Number(db_id)) => db_id.to_string(),
                (_, Value::String(db_id)) if !db_id.is_empty() => db_id.clone(),
                _ => return None,
            };
            let depth = positive_u32(&pathway["maxDepth"])
                .or_else(|| positive_u32(&pathway["level"]))
                .unwrap_or(DEFAULT_DEPTH);
            let size = positive_u32(&pathway["entitiesSize"])
                .or_else(|| positive_u32(&pathway["entitiesCount"]))
                .unwrap_or(DEFAULT_PATHWAY_SIZE);
            let ancestor_ids = pathway["parents"]
                .as_array()
                .map(|parents| parents.iter().filter_map(|p| p["stId"].as_str()).map(String::from).collect())
                .unwrap_or_default();

            Some(PathwayAssociation {
                pathway_name: pathway["displayName"].as_str().unwrap_or(&pathway_id).to_string(),
                url: format!("https://reactome.org/content/detail/{}", pathway_id),
                pathway_id,
                depth,
                size,
                ancestor_ids,
            })
        })
        .collect()
}

fn positive_u32(value: &Value) -> Option<u32> {
    value.as_u64().filter(|v| *v > 0).and_then(|v| u32::try_from(v).ok())
}
