//! Analysis orchestration.
//!
//! [`AnalysisService`] is the single entry point used by the binary: it owns
//! the resolver, the mapper and the caches, and receives every upstream
//! source as a trait object from the composition root.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use chrono::Utc;
use pathmind_common::entities::{
    AnalysisResult, DrugSuggestion, ExportManifest, MappingStatus, MatchReason, ResolutionCandidate, ATTRIBUTION,
    VERSIONED_SOURCES,
};
use pathmind_common::{AnalysisParams, PathmindError, Result};
use pathmind_config::{AnalysisConfig, Config};
use pathmind_ranker::{
    admits, aggregate_targets, compare_metrics, compare_rows, score_pathways, CompareMetrics, PathwayComparisonRow,
};
use pathmind_sources::{AccessionSource, BioactivitySource, MechanismSource, PathwaySource, StructureSource};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::cache::{request_fingerprint, AnalysisCache};
use crate::degradation::{Degradation, DegradationTracker};
use crate::graph::build_graph;
use crate::health::HealthReport;
use crate::mapper::TargetMapper;
use crate::repository::{AnalysisRepository, PathwayStore};
use crate::resolver::{IdentityResolver, Resolution};

const UNKNOWN_VERSION: &str = "unknown";
const MIN_SUGGEST_CHARS: usize = 2;

/// Upstream collaborators, wired once per process.
#[derive(Clone)]
pub struct Sources {
    pub bioactivity: Arc<dyn BioactivitySource>,
    pub structure: Arc<dyn StructureSource>,
    pub mechanism: Arc<dyn MechanismSource>,
    pub accessions: Arc<dyn AccessionSource>,
    pub pathways: Arc<dyn PathwaySource>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub drug_name: String,
    #[serde(default)]
    pub params: AnalysisParams,
    #[serde(default)]
    pub resolution_choice: Option<String>,
    /// Keep the result out of the repository and the identity cache.
    #[serde(default)]
    pub do_not_log: bool,
}

impl AnalysisRequest {
    pub fn new(drug_name: impl Into<String>) -> Self {
        Self {
            drug_name: drug_name.into(),
            params: AnalysisParams::default(),
            resolution_choice: None,
            do_not_log: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompareResult {
    pub analysis_a: AnalysisResult,
    pub analysis_b: AnalysisResult,
    pub rows: Vec<PathwayComparisonRow>,
    pub metrics: CompareMetrics,
}

pub struct AnalysisService {
    sources: Sources,
    resolver: IdentityResolver,
    mapper: TargetMapper,
    repository: Arc<dyn AnalysisRepository>,
    cache: AnalysisCache,
    config: AnalysisConfig,
}

impl AnalysisService {
    pub fn new(
        sources: Sources,
        repository: Arc<dyn AnalysisRepository>,
        pathway_store: Arc<dyn PathwayStore>,
        config: &Config,
    ) -> Self {
        let resolver = IdentityResolver::new(
            sources.bioactivity.clone(),
            sources.structure.clone(),
            config.analysis.candidate_limit,
            config.analysis.structure_candidate_limit,
        );
        let mapper = TargetMapper::new(sources.accessions.clone(), sources.pathways.clone(), pathway_store);
        Self {
            sources,
            resolver,
            mapper,
            repository,
            cache: AnalysisCache::new(&config.cache),
            config: config.analysis.clone(),
        }
    }

    // ── Resolution ──────────────────────────────────────────────────────────

    pub async fn suggest(&self, query: &str) -> Result<Vec<DrugSuggestion>> {
        let query = query.trim();
        if query.chars().count() < MIN_SUGGEST_CHARS {
            return Ok(Vec::new());
        }
        self.sources
            .bioactivity
            .suggest(query)
            .await
            .map_err(|e| PathmindError::FatalUpstream(format!("ChEMBL is temporarily unavailable: {e}")))
    }

    pub async fn resolve(&self, query: &str, choice: Option<&str>) -> Result<Resolution> {
        self.resolve_cached(query, choice, true).await
    }

    async fn resolve_cached(&self, query: &str, choice: Option<&str>, remember: bool) -> Result<Resolution> {
        let key = identity_cache_key(query, choice);
        match self.repository.cached_identity(&key).await {
            Ok(Some(identity)) => {
                debug!(%key, "Identity cache hit");
                let candidates = vec![ResolutionCandidate {
                    chembl_parent_id: identity.chembl_parent_id.clone(),
                    display_name: identity.display_name.clone(),
                    canonical_inchikey: Some(identity.canonical_inchikey.clone()),
                    match_score: 1.0,
                    match_reasons: vec![MatchReason::ChemblParentMatch],
                }];
                return Ok(Resolution { identity, candidates, structure_available: true });
            }
            Ok(None) => {}
            Err(e) => warn!(%key, error = %e, "Identity cache read failed"),
        }

        let resolution = self.resolver.resolve(query, choice).await?;
        if remember {
            if let Err(e) = self.repository.cache_identity(&key, &resolution.identity).await {
                warn!(%key, error = %e, "Identity cache write failed");
            }
        }
        Ok(resolution)
    }

    // ── Analysis ────────────────────────────────────────────────────────────

    pub async fn run_analysis(
        &self,
        drug_name: &str,
        params: &AnalysisParams,
        choice: Option<&str>,
    ) -> Result<AnalysisResult> {
        self.execute(drug_name, params, choice, true).await
    }

    #[instrument(skip(self, params))]
    async fn execute(
        &self,
        drug_name: &str,
        params: &AnalysisParams,
        choice: Option<&str>,
        remember: bool,
    ) -> Result<AnalysisResult> {
        params.validate()?;
        let created_at = Utc::now();
        let mut tracker = DegradationTracker::new();

        let resolution = self.resolve_cached(drug_name, choice, remember).await?;
        if !resolution.structure_available {
            tracker.record(Degradation::StructureUnavailable);
        }
        let mut identity = resolution.identity;
        let parent_id = identity.chembl_parent_id.clone();

        let activities = self
            .sources
            .bioactivity
            .fetch_activities(&parent_id)
            .await
            .map_err(|e| PathmindError::FatalUpstream(format!("ChEMBL is temporarily unavailable: {e}")))?;
        if activities.is_empty() {
            return Err(PathmindError::FatalUpstream("No ChEMBL activity records found for this drug.".into()));
        }
        if !activities.iter().any(|r| admits(r, params.pchembl_threshold)) {
            return Err(PathmindError::FatalUpstream(
                "No ChEMBL activity records pass the assay filters for this drug.".into(),
            ));
        }
        info!(chembl_id = %parent_id, records = activities.len(), "Fetched activities");

        let mechanism_result = self.sources.mechanism.fetch_drug_info(&parent_id).await;
        let mechanism = tracker.absorb(mechanism_result, Degradation::MechanismUnavailable).unwrap_or_default();
        identity.clinical_phase = mechanism.clinical_phase;
        identity.mechanism_of_action = mechanism.mechanism_of_action.clone();

        let target_ids: Vec<String> = activities
            .iter()
            .filter_map(|r| r.target_id.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let details_result = self.sources.bioactivity.fetch_target_details(&target_ids).await;
        let details = tracker.absorb(details_result, Degradation::TargetDetailsUnavailable).unwrap_or_default();

        let aggregation =
            aggregate_targets(&activities, &details, &mechanism.actions_by_symbol, params, self.config.max_targets);
        if aggregation.truncated {
            tracker.record(Degradation::TargetsTruncated { shown: self.config.max_targets });
        }

        let mapped = self.mapper.map_all(aggregation.hits, self.config.mapping_concurrency).await;
        if mapped.iter().any(|m| m.accession_source_degraded) {
            tracker.record(Degradation::AccessionSourceDegraded);
        }
        if mapped.iter().any(|m| m.pathway_source_down) {
            tracker.record(Degradation::PathwaySourceUnavailable);
        } else if mapped
            .iter()
            .any(|m| matches!(m.hit.mapping_status, MappingStatus::Partial | MappingStatus::Unmapped))
        {
            tracker.record(Degradation::LimitedPathwayCoverage);
        }

        let mut targets = Vec::with_capacity(mapped.len());
        let mut pathways_by_target = HashMap::with_capacity(mapped.len());
        for m in mapped {
            pathways_by_target.insert(m.hit.target_chembl_id.clone(), m.pathways);
            targets.push(m.hit);
        }
        let pathways = score_pathways(&targets, &pathways_by_target, params.top_pathways);
        let graph = build_graph(&identity, &targets, &pathways);
        let versions = self.version_snapshot().await;
        let flags = tracker.flags(&targets);

        info!(targets = targets.len(), pathways = pathways.len(), "Analysis complete");
        Ok(AnalysisResult {
            id: Uuid::new_v4(),
            created_at,
            drug_name: drug_name.to_string(),
            canonical_drug_id: parent_id,
            params: params.clone(),
            resolution: identity,
            targets,
            pathways,
            graph,
            source_versions: versions.clone(),
            version_snapshot: versions,
            flags,
            export_manifest: ExportManifest::for_params(params),
            degraded_messages: tracker.into_messages(),
            attribution: ATTRIBUTION.to_string(),
        })
    }

    /// Runs a request, answering from the request cache when allowed.
    #[instrument(skip(self, request), fields(drug = %request.drug_name, do_not_log = request.do_not_log))]
    pub async fn submit(&self, request: &AnalysisRequest) -> Result<AnalysisResult> {
        let fingerprint = request_fingerprint(request)?;
        if !request.do_not_log {
            if let Some(cached) = self.cache.get_by_request(&fingerprint).await {
                debug!(id = %cached.id, "Request cache hit");
                return Ok(cached);
            }
        }

        let remember = !request.do_not_log;
        let result = self
            .execute(&request.drug_name, &request.params, request.resolution_choice.as_deref(), remember)
            .await?;

        if remember {
            self.repository
                .store_analysis(&result)
                .await
                .map_err(|e| PathmindError::Repository(e.to_string()))?;
            self.cache.put_by_request(fingerprint, result.clone()).await;
        } else {
            self.cache.put_by_id(result.clone()).await;
        }
        Ok(result)
    }

    pub async fn get_analysis(&self, id: Uuid) -> Result<AnalysisResult> {
        match self.repository.get_analysis(id).await {
            Ok(Some(result)) => return Ok(result),
            Ok(None) => {}
            Err(e) => warn!(%id, error = %e, "Repository read failed"),
        }
        self.cache
            .get_by_id(id)
            .await
            .ok_or_else(|| PathmindError::NotFound(format!("analysis {id}")))
    }

    pub async fn compare(&self, drug_a: &str, drug_b: &str, params: &AnalysisParams) -> Result<CompareResult> {
        let (analysis_a, analysis_b) =
            tokio::try_join!(self.run_analysis(drug_a, params, None), self.run_analysis(drug_b, params, None))?;
        Ok(compare_results(analysis_a, analysis_b))
    }

    // ── Versions & health ───────────────────────────────────────────────────

    /// Every versioned source at "unknown", overlaid with stored versions.
    async fn version_snapshot(&self) -> BTreeMap<String, String> {
        let mut versions: BTreeMap<String, String> =
            VERSIONED_SOURCES.iter().map(|s| (s.to_string(), UNKNOWN_VERSION.to_string())).collect();
        match self.repository.source_versions().await {
            Ok(stored) => versions.extend(stored),
            Err(e) => warn!(error = %e, "Source versions unavailable"),
        }
        versions
    }

    /// Fetches current release versions and stores them. Returns what was stored.
    pub async fn refresh_source_versions(&self) -> BTreeMap<String, String> {
        let (chembl, reactome) =
            tokio::join!(self.sources.bioactivity.release_version(), self.sources.pathways.release_version());
        let mut refreshed = BTreeMap::new();
        for (source, fetched) in [("chembl", chembl), ("reactome", reactome)] {
            let version = match fetched {
                Ok(v) => v,
                Err(e) => {
                    warn!(source, error = %e, "Release version refresh failed");
                    continue;
                }
            };
            match self.repository.upsert_source_version(source, &version).await {
                Ok(()) => {
                    refreshed.insert(source.to_string(), version);
                }
                Err(e) => warn!(source, error = %e, "Release version store failed"),
            }
        }
        refreshed
    }

    pub async fn health(&self) -> HealthReport {
        let s = &self.sources;
        let (chembl, pubchem, opentargets, uniprot, reactome) = tokio::join!(
            s.bioactivity.ping(),
            s.structure.ping(),
            s.mechanism.ping(),
            s.accessions.ping(),
            s.pathways.ping(),
        );
        let checks = BTreeMap::from([
            (s.bioactivity.source_name().to_string(), chembl),
            (s.structure.source_name().to_string(), pubchem),
            (s.mechanism.source_name().to_string(), opentargets),
            (s.accessions.source_name().to_string(), uniprot),
            (s.pathways.source_name().to_string(), reactome),
        ]);
        HealthReport::from_checks(checks, self.cache.hit_rate())
    }
}

/// Pathway rows and similarity metrics for two completed analyses.
pub fn compare_results(analysis_a: AnalysisResult, analysis_b: AnalysisResult) -> CompareResult {
    let target_ids = |r: &AnalysisResult| r.targets.iter().map(|t| t.target_chembl_id.clone()).collect::<Vec<_>>();
    let score_vector = |r: &AnalysisResult| {
        r.pathways
            .iter()
            .map(|p| (p.pathway_id.clone(), p.score))
            .collect::<BTreeMap<_, _>>()
    };

    let rows = compare_rows(&analysis_a.pathways, &analysis_b.pathways);
    let metrics = compare_metrics(
        &target_ids(&analysis_a),
        &target_ids(&analysis_b),
        &score_vector(&analysis_a),
        &score_vector(&analysis_b),
    );
    CompareResult { analysis_a, analysis_b, rows, metrics }
}

/// Trimmed, lower-cased, inner whitespace collapsed; `#choice` appended.
pub fn identity_cache_key(query: &str, choice: Option<&str>) -> String {
    let normalized = query.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
    match choice {
        Some(choice) => format!("{normalized}#{choice}"),
        None => normalized,
    }
}
