//! Configuration loading for Pathmind.
//! Reads pathmind.toml from the current directory or the path in PATHMIND_CONFIG,
//! then applies PATHMIND_* environment overrides.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {message}")]
    Read { path: String, message: String },

    #[error("failed to parse config file {path}: {message}")]
    Parse { path: String, message: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

// ── Upstream sources ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourcesConfig {
    #[serde(default = "default_chembl_url")]
    pub chembl_base_url: String,
    #[serde(default = "default_pubchem_url")]
    pub pubchem_base_url: String,
    #[serde(default = "default_uniprot_url")]
    pub uniprot_base_url: String,
    #[serde(default = "default_reactome_url")]
    pub reactome_base_url: String,
    #[serde(default = "default_opentargets_url")]
    pub opentargets_url: String,
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
    #[serde(default = "default_max_backoff")]
    pub max_backoff_ms: u64,
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    #[serde(default = "default_recovery_timeout")]
    pub recovery_timeout_secs: u64,
}

fn default_chembl_url()      -> String { "https://www.ebi.ac.uk/chembl/api/data".to_string() }
fn default_pubchem_url()     -> String { "https://pubchem.ncbi.nlm.nih.gov/rest/pug".to_string() }
fn default_uniprot_url()     -> String { "https://rest.uniprot.org".to_string() }
fn default_reactome_url()    -> String { "https://reactome.org/ContentService".to_string() }
fn default_opentargets_url() -> String { "https://api.platform.opentargets.org/api/v4/graphql".to_string() }
fn default_http_timeout()    -> u64 { 15 }
fn default_max_retries()     -> u32 { 2 }
fn default_initial_backoff() -> u64 { 1_000 }
fn default_backoff_multiplier() -> f64 { 3.0 }
fn default_max_backoff()     -> u64 { 10_000 }
fn default_failure_threshold() -> u32 { 5 }
fn default_recovery_timeout() -> u64 { 60 }

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            chembl_base_url: default_chembl_url(),
            pubchem_base_url: default_pubchem_url(),
            uniprot_base_url: default_uniprot_url(),
            reactome_base_url: default_reactome_url(),
            opentargets_url: default_opentargets_url(),
            http_timeout_secs: default_http_timeout(),
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff(),
            backoff_multiplier: default_backoff_multiplier(),
            max_backoff_ms: default_max_backoff(),
            failure_threshold: default_failure_threshold(),
            recovery_timeout_secs: default_recovery_timeout(),
        }
    }
}

impl SourcesConfig {
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn recovery_timeout(&self) -> Duration {
        Duration::from_secs(self.recovery_timeout_secs)
    }
}

// ── Analysis ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_max_targets")]
    pub max_targets: usize,
    #[serde(default = "default_candidate_limit")]
    pub candidate_limit: usize,
    #[serde(default = "default_structure_candidate_limit")]
    pub structure_candidate_limit: usize,
    #[serde(default = "default_mapping_concurrency")]
    pub mapping_concurrency: usize,
}

fn default_max_targets()       -> usize { 50 }
fn default_candidate_limit()   -> usize { 8 }
fn default_structure_candidate_limit() -> usize { 5 }
fn default_mapping_concurrency() -> usize { 8 }

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_targets: default_max_targets(),
            candidate_limit: default_candidate_limit(),
            structure_candidate_limit: default_structure_candidate_limit(),
            mapping_concurrency: default_mapping_concurrency(),
        }
    }
}

// ── Caching ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_analysis_ttl")]
    pub analysis_ttl_secs: u64,
    #[serde(default = "default_short_ttl")]
    pub short_ttl_secs: u64,
    #[serde(default = "default_max_entries")]
    pub max_entries: u64,
}

fn default_analysis_ttl() -> u64 { 86_400 }
fn default_short_ttl()    -> u64 { 3_600 }
fn default_max_entries()  -> u64 { 1_024 }

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            analysis_ttl_secs: default_analysis_ttl(),
            short_ttl_secs: default_short_ttl(),
            max_entries: default_max_entries(),
        }
    }
}

// ── Storage ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// JSON file holding stored analyses, identities, versions and pathway
    /// memberships between runs.
    #[serde(default = "default_store_path")]
    pub path: String,
}

fn default_store_path() -> String { "data/pathmind-store.json".to_string() }

impl Default for StorageConfig {
    fn default() -> Self {
        Self { path: default_store_path() }
    }
}

// ── Logging ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_log_filter() -> String { "pathmind=info,info".to_string() }

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { filter: default_log_filter() }
    }
}


impl Config {
    /// Load configuration from pathmind.toml.
    /// Checks PATHMIND_CONFIG first, then the current directory. A missing
    /// file is not an error; defaults are used.
    pub fn load() -> Result<Self, ConfigError> {
        // A missing .env is normal.
        let _ = dotenvy::dotenv();

        let path = std::env::var("PATHMIND_CONFIG").unwrap_or_else(|_| "pathmind.toml".to_string());

        let mut config = if Path::new(&path).exists() {
            Self::from_path(&path)?
        } else {
            tracing::debug!(path = %path, "config file not found, using defaults");
            Config::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_string(),
            message: e.to_string(),
        })?;
        Self::from_toml(&content).map_err(|e| match e {
            ConfigError::Parse { message, .. } => ConfigError::Parse { path: path.to_string(), message },
            other => other,
        })
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: "<inline>".to_string(),
            message: e.to_string(),
        })
    }

    /// Applies PATHMIND_* overrides using `lookup` to read variables.
    /// Unparseable numeric values are ignored with a warning.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let urls: [(&str, &mut String); 5] = [
            ("PATHMIND_CHEMBL_URL", &mut self.sources.chembl_base_url),
            ("PATHMIND_PUBCHEM_URL", &mut self.sources.pubchem_base_url),
            ("PATHMIND_UNIPROT_URL", &mut self.sources.uniprot_base_url),
            ("PATHMIND_REACTOME_URL", &mut self.sources.reactome_base_url),
            ("PATHMIND_OPENTARGETS_URL", &mut self.sources.opentargets_url),
        ];
        for (key, slot) in urls {
            if let Some(value) = lookup(key) {
                *slot = value;
            }
        }

        if let Some(raw) = lookup("PATHMIND_HTTP_TIMEOUT_SECS") {
            match raw.parse() {
                Ok(secs) => self.sources.http_timeout_secs = secs,
                Err(_) => tracing::warn!(value = %raw, "ignoring invalid PATHMIND_HTTP_TIMEOUT_SECS"),
            }
        }

        if let Some(path) = lookup("PATHMIND_STORE_PATH") {
            self.storage.path = path;
        }

        if let Some(filter) = lookup("PATHMIND_LOG") {
            self.logging.filter = filter;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sources.http_timeout_secs == 0 {
            return Err(ConfigError::Invalid("sources.http_timeout_secs must be > 0".into()));
        }
        if self.sources.backoff_multiplier <= 0.0 {
            return Err(ConfigError::Invalid("sources.backoff_multiplier must be > 0".into()));
        }
        if self.sources.failure_threshold == 0 {
            return Err(ConfigError::Invalid("sources.failure_threshold must be > 0".into()));
        }
        if self.analysis.mapping_concurrency == 0 {
            return Err(ConfigError::Invalid("analysis.mapping_concurrency must be > 0".into()));
        }
        if self.analysis.max_targets == 0 || self.analysis.candidate_limit == 0 {
            return Err(ConfigError::Invalid(
                "analysis.max_targets and analysis.candidate_limit must be > 0".into(),
            ));
        }
        if self.storage.path.trim().is_empty() {
            return Err(ConfigError::Invalid("storage.path must not be empty".into()));
        }
        Ok(())
    }
}
