//! UniProt REST client for ChEMBL target → UniProt accession mapping.

use async_trait::async_trait;
use pathmind_common::entities::SourceHealth;
use pathmind_common::SourceError;
use serde_json::Value;
use tracing::instrument;

use crate::resilience::{probe, ResilientClient};
use crate::{AccessionSource, SourceProbe};

pub const SOURCE_NAME: &str = "uniprot";

const HUMAN_TAXON: &str = "9606";

pub struct UniProtClient {
    http: ResilientClient,
    base_url: String,
}

impl UniProtClient {
    pub fn new(http: ResilientClient, base_url: &str) -> Self {
        Self { http, base_url: base_url.trim_end_matches('/').to_string() }
    }

    /// First accession matching a UniProtKB query, if any.
    #[instrument(skip(self))]
    async fn search_first(&self, query: String) -> Result<Option<String>, SourceError> {
        let url = format!("{}/uniprotkb/search", self.base_url);
        let json = self
            .http
            .get_json(
                &url,
                &[
                    ("query", query),
                    ("fields", "accession".to_string()),
                    ("size", "1".to_string()),
                    ("format", "json".to_string()),
                ],
            )
            .await?;
        Ok(parse_first_accession(&json))
    }
}

#[async_trait]
impl SourceProbe for UniProtClient {
    fn source_name(&self) -> &str {
        SOURCE_NAME
    }

    async fn ping(&self) -> SourceHealth {
        let url = format!("{}/uniprotkb/P00533.json", self.base_url);
        probe(self.http.get_json(&url, &[])).await
    }
}

#[async_trait]
impl AccessionSource for UniProtClient {
    async fn map_by_chembl_accession(&self, target_chembl_id: &str) -> Result<Option<String>, SourceError> {
        self.search_first(format!("xref:ChEMBL-{}", target_chembl_id)).await
    }

    async fn map_by_xref(&self, target_chembl_id: &str) -> Result<Option<String>, SourceError> {
        self.search_first(format!("xref:ChEMBL:{} AND organism_id:{}", target_chembl_id, HUMAN_TAXON))
            .await
    }

    async fn map_by_gene_symbol(&self, gene_symbol: &str) -> Result<Option<String>, SourceError> {
        self.search_first(format!("gene:{} AND organism_id:{}", gene_symbol, HUMAN_TAXON)).await
    }
}

pub fn parse_first_accession(json: &Value) -> Option<String> {
    json["results"][0]["primaryAccession"].as_str().map(String::from)
}
