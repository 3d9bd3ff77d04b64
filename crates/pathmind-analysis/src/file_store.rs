//! JSON-file persistence for the `pathmind` binary.
//!
//! The whole store is one JSON document, loaded on open and rewritten after
//! every mutation (write to `<path>.tmp`, then rename over the original).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use pathmind_common::entities::{AnalysisResult, CompoundIdentity, PathwayAssociation};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::repository::{AnalysisRepository, PathwayStore};

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreState {
    #[serde(default)]
    analyses: BTreeMap<String, AnalysisResult>,
    #[serde(default)]
    identities: BTreeMap<String, CompoundIdentity>,
    #[serde(default)]
    versions: BTreeMap<String, String>,
    #[serde(default)]
    pathways: BTreeMap<String, Vec<PathwayAssociation>>,
}

/// File-backed [`AnalysisRepository`] and [`PathwayStore`].
///
/// Writers hold the lock across the file rewrite, so concurrent writes
/// within a process are serialized.
pub struct JsonFileRepository {
    path: PathBuf,
    state: RwLock<StoreState>,
}

impl JsonFileRepository {
    /// Opens the store at `path`. A missing file starts an empty store.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let state = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => serde_json::from_str(&raw)
                .with_context(|| format!("failed to parse store {}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "store not found, starting empty");
                StoreState::default()
            }
            Err(e) => return Err(e).with_context(|| format!("failed to read store {}", path.display())),
        };
        Ok(Self { path, state: RwLock::new(state) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn analysis_count(&self) -> usize {
        self.state.read().await.analyses.len()
    }

    async fn persist(&self, state: &StoreState) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_vec_pretty(state)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &json)
            .await
            .with_context(|| format!("failed to write {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("failed to replace {}", self.path.display()))?;
        Ok(())
    }
}

#[async_trait]
impl AnalysisRepository for JsonFileRepository {
    async fn store_analysis(&self, result: &AnalysisResult) -> Result<()> {
        let mut state = self.state.write().await;
        state.analyses.insert(result.id.to_string(), result.clone());
        self.persist(&state).await
    }

    async fn get_analysis(&self, id: Uuid) -> Result<Option<AnalysisResult>> {
        Ok(self.state.read().await.analyses.get(&id.to_string()).cloned())
    }

    async fn cache_identity(&self, key: &str, identity: &CompoundIdentity) -> Result<()> {
        let mut state = self.state.write().await;
        state.identities.insert(key.to_string(), identity.clone());
        self.persist(&state).await
    }

    async fn cached_identity(&self, key: &str) -> Result<Option<CompoundIdentity>> {
        Ok(self.state.read().await.identities.get(key).cloned())
    }

    async fn upsert_source_version(&self, source: &str, version: &str) -> Result<()> {
        let mut state = self.state.write().await;
        state.versions.insert(source.to_string(), version.to_string());
        self.persist(&state).await
    }

    async fn source_versions(&self) -> Result<BTreeMap<String, String>> {
        Ok(self.state.read().await.versions.clone())
    }
}

#[async_trait]
impl PathwayStore for JsonFileRepository {
    async fn pathways_for(&self, accession: &str) -> Result<Vec<PathwayAssociation>> {
        Ok(self.state.read().await.pathways.get(accession).cloned().unwrap_or_default())
    }

    async fn upsert_pathways(&self, accession: &str, pathways: &[PathwayAssociation]) -> Result<()> {
        let mut state = self.state.write().await;
        state.pathways.insert(accession.to_string(), pathways.to_vec());
        self.persist(&state).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pathmind_test_utils::fixtures::pathway;
    use tempfile::TempDir;
    use tokio_test::assert_ok;

    #[tokio::test]
    async fn test_missing_file_opens_empty() {
        let dir = TempDir::new().unwrap();
        let repo = JsonFileRepository::open(dir.path().join("store.json")).await.unwrap();
        assert_eq!(repo.analysis_count().await, 0);
        assert!(repo.source_versions().await.unwrap().is_empty());
        assert!(!repo.path().exists());
    }

    #[tokio::test]
    async fn test_writes_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("store.json");

        let repo = JsonFileRepository::open(&path).await.unwrap();
        assert_ok!(repo.upsert_source_version("reactome", "91").await);
        assert_ok!(repo.upsert_pathways("P00533", &[pathway("R-HSA-2", 4, 10, &[])]).await);
        drop(repo);

        let reopened = JsonFileRepository::open(&path).await.unwrap();
        let versions = reopened.source_versions().await.unwrap();
        assert_eq!(versions.get("reactome").map(String::as_str), Some("91"));
        let stored = reopened.pathways_for("P00533").await.unwrap();
        assert_eq!(stored[0].pathway_id, "R-HSA-2");
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(JsonFileRepository::open(&path).await.is_err());
    }
}
