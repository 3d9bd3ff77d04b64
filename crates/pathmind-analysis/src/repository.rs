//! Persistence collaborators.
//!
//! The analysis core only needs a handful of operations: store and fetch
//! completed results, cache resolved identities, remember upstream release
//! versions and keep accession → pathway memberships. [`InMemoryRepository`]
//! implements all of them; writes are last-writer-wins.

use std::collections::{BTreeMap, HashMap};

use anyhow::Result;
use async_trait::async_trait;
use pathmind_common::entities::{AnalysisResult, CompoundIdentity, PathwayAssociation};
use tokio::sync::RwLock;
use uuid::Uuid;

#[async_trait]
pub trait AnalysisRepository: Send + Sync {
    async fn store_analysis(&self, result: &AnalysisResult) -> Result<()>;

    async fn get_analysis(&self, id: Uuid) -> Result<Option<AnalysisResult>>;

    /// `key` is the normalized query, with the resolution choice appended.
    async fn cache_identity(&self, key: &str, identity: &CompoundIdentity) -> Result<()>;

    async fn cached_identity(&self, key: &str) -> Result<Option<CompoundIdentity>>;

    async fn upsert_source_version(&self, source: &str, version: &str) -> Result<()>;

    async fn source_versions(&self) -> Result<BTreeMap<String, String>>;
}

/// Local accession → pathway membership store, consulted before the live
/// pathway source.
#[async_trait]
pub trait PathwayStore: Send + Sync {
    async fn pathways_for(&self, accession: &str) -> Result<Vec<PathwayAssociation>>;

    /// Replaces the stored set for `accession`.
    async fn upsert_pathways(&self, accession: &str, pathways: &[PathwayAssociation]) -> Result<()>;
}

#[derive(Default)]
pub struct InMemoryRepository {
    analyses: RwLock<HashMap<Uuid, AnalysisResult>>,
    identities: RwLock<HashMap<String, CompoundIdentity>>,
    versions: RwLock<BTreeMap<String, String>>,
    pathways: RwLock<HashMap<String, Vec<PathwayAssociation>>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn analysis_count(&self) -> usize {
        self.analyses.read().await.len()
    }
}

#[async_trait]
impl AnalysisRepository for InMemoryRepository {
    async fn store_analysis(&self, result: &AnalysisResult) -> Result<()> {
        self.analyses.write().await.insert(result.id, result.clone());
        Ok(())
    }

    async fn get_analysis(&self, id: Uuid) -> Result<Option<AnalysisResult>> {
        Ok(self.analyses.read().await.get(&id).cloned())
    }

    async fn cache_identity(&self, key: &str, identity: &CompoundIdentity) -> Result<()> {
        self.identities.write().await.insert(key.to_string(), identity.clone());
        Ok(())
    }

    async fn cached_identity(&self, key: &str) -> Result<Option<CompoundIdentity>> {
        Ok(self.identities.read().await.get(key).cloned())
    }

    async fn upsert_source_version(&self, source: &str, version: &str) -> Result<()> {
        self.versions.write().await.insert(source.to_string(), version.to_string());
        Ok(())
    }

    async fn source_versions(&self) -> Result<BTreeMap<String, String>> {
        Ok(self.versions.read().await.clone())
    }
}

#[async_trait]
impl PathwayStore for InMemoryRepository {
    async fn pathways_for(&self, accession: &str) -> Result<Vec<PathwayAssociation>> {
        Ok(self.pathways.read().await.get(accession).cloned().unwrap_or_default())
    }

    async fn upsert_pathways(&self, accession: &str, pathways: &[PathwayAssociation]) -> Result<()> {
        self.pathways.write().await.insert(accession.to_string(), pathways.to_vec());
        Ok(())
    }
}
