//! In-process result caches.
//!
//! Two `moka` caches: completed results keyed by a request fingerprint (long
//! TTL), and results keyed by analysis id for runs that were not persisted
//! (short TTL).

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use moka::future::Cache;
use pathmind_common::entities::AnalysisResult;
use pathmind_config::CacheConfig;
use serde::Serialize;
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// SHA-256 hex digest of the request's JSON form.
pub fn request_fingerprint<T: Serialize>(request: &T) -> Result<String, serde_json::Error> {
    let encoded = serde_json::to_vec(request)?;
    let mut hasher = Sha256::new();
    hasher.update(&encoded);
    Ok(format!("{:x}", hasher.finalize()))
}

pub struct AnalysisCache {
    by_request: Cache<String, AnalysisResult>,
    by_id: Cache<Uuid, AnalysisResult>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl AnalysisCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            by_request: Cache::builder()
                .max_capacity(config.max_entries)
                .time_to_live(Duration::from_secs(config.analysis_ttl_secs))
                .build(),
            by_id: Cache::builder()
                .max_capacity(config.max_entries)
                .time_to_live(Duration::from_secs(config.short_ttl_secs))
                .build(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub async fn get_by_request(&self, fingerprint: &str) -> Option<AnalysisResult> {
        let found = self.by_request.get(fingerprint).await;
        let counter = if found.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    pub async fn put_by_request(&self, fingerprint: String, result: AnalysisResult) {
        self.by_request.insert(fingerprint, result).await;
    }

    pub async fn get_by_id(&self, id: Uuid) -> Option<AnalysisResult> {
        self.by_id.get(&id).await
    }

    pub async fn put_by_id(&self, result: AnalysisResult) {
        self.by_id.insert(result.id, result).await;
    }

    /// Fraction of request lookups answered from cache, 0 before any lookup.
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed);
        let total = hits + self.misses.load(Ordering::Relaxed);
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fingerprint_is_stable_hex() {
        let a = request_fingerprint(&json!({"drug_name": "imatinib"})).unwrap();
        let b = request_fingerprint(&json!({"drug_name": "imatinib"})).unwrap();
        let c = request_fingerprint(&json!({"drug_name": "gefitinib"})).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }

    #[tokio::test]
    async fn test_hit_rate_counts_request_lookups() {
        let cache = AnalysisCache::new(&CacheConfig::default());
        assert_eq!(cache.hit_rate(), 0.0);
        assert!(cache.get_by_request("missing").await.is_none());
        assert_eq!(cache.hit_rate(), 0.0);
    }
}
