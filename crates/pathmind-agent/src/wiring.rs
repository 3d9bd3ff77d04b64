//! Composition root: builds concrete clients once per process.

use std::sync::Arc;

use anyhow::Result;
use pathmind_analysis::{AnalysisService, JsonFileRepository, Sources};
use pathmind_config::Config;
use pathmind_sources::{
    ChemblClient, OpenTargetsClient, PubChemClient, ReactomeClient, ResilientClient, UniProtClient,
};
use tracing::info;

pub fn build_sources(config: &Config) -> Result<Sources> {
    let s = &config.sources;
    let client = |name: &str, base_url: &str| ResilientClient::from_config(name, base_url, s);

    Ok(Sources {
        bioactivity: Arc::new(ChemblClient::new(client("chembl", &s.chembl_base_url)?, &s.chembl_base_url)),
        structure: Arc::new(PubChemClient::new(client("pubchem", &s.pubchem_base_url)?, &s.pubchem_base_url)),
        mechanism: Arc::new(OpenTargetsClient::new(client("opentargets", &s.opentargets_url)?, &s.opentargets_url)),
        accessions: Arc::new(UniProtClient::new(client("uniprot", &s.uniprot_base_url)?, &s.uniprot_base_url)),
        pathways: Arc::new(ReactomeClient::new(client("reactome", &s.reactome_base_url)?, &s.reactome_base_url)),
    })
}

pub async fn build_service(config: &Config) -> Result<AnalysisService> {
    let sources = build_sources(config)?;
    // One store serves results, identities, versions and pathway memberships,
    // so `show` can read what an earlier `analyze` wrote.
    let repository = Arc::new(JsonFileRepository::open(&config.storage.path).await?);
    info!(
        store = %repository.path().display(),
        timeout_secs = config.sources.http_timeout_secs,
        max_retries = config.sources.max_retries,
        "Upstream clients ready"
    );
    Ok(AnalysisService::new(sources, repository.clone(), repository, config))
}
