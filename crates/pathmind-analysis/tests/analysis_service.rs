mod common;

use std::sync::Arc;

use common::{harness, HarnessBuilder};
use pathmind_analysis::{AnalysisRequest, JsonFileRepository};
use pathmind_common::entities::{AnalysisResult, MappingNote, MappingStatus};
use pathmind_common::{AnalysisParams, ErrorKind};
use pathmind_test_utils::fixtures::{activity, candidate, pathway};
use pathmind_test_utils::mocks::{
    MockAccessionSource, MockBioactivitySource, MockMechanismSource, MockPathwaySource, MockStructureSource,
};
use pretty_assertions::assert_eq;

fn defaults() -> AnalysisParams {
    AnalysisParams::default()
}

// ── Happy path ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_clean_run_has_no_degradation() {
    let h = harness();
    let result = h.service.run_analysis("imatinib", &defaults(), None).await.unwrap();

    assert_eq!(result.canonical_drug_id, "CHEMBL941");
    assert_eq!(result.resolution.pubchem_cid, Some(5291));
    assert_eq!(result.resolution.clinical_phase, Some(4));
    assert!(result.degraded_messages.is_empty(), "{:?}", result.degraded_messages);

    let ids: Vec<_> = result.targets.iter().map(|t| t.target_chembl_id.as_str()).collect();
    assert_eq!(ids, vec!["CHEMBL1862", "CHEMBL203"]);
    assert_eq!(result.targets[0].median_pchembl, 8.0);
    assert_eq!(result.targets[0].action_type, "INHIBITOR");
    assert!(result.targets.iter().all(|t| t.mapping_status == MappingStatus::Mapped));

    let pathway_ids: Vec<_> = result.pathways.iter().map(|p| p.pathway_id.as_str()).collect();
    assert_eq!(pathway_ids, vec!["R-HSA-1", "R-HSA-2"]);
    assert_eq!(result.pathways[0].targets_hit, 2);

    assert!(!result.flags.partial_mapping);
    assert!(!result.flags.direction_unknown);
    // Two targets are below the thin-data threshold; that is a flag, not a message.
    assert!(result.flags.limited_data);

    assert_eq!(result.export_manifest.layout_engine, "dagre");
    assert_eq!(result.export_manifest.layout_seed, 42);
    assert_eq!(result.source_versions.get("chembl").map(String::as_str), Some("unknown"));
    assert_eq!(result.source_versions, result.version_snapshot);
    // drug + 2 targets + 2 pathways; 2 drug edges + 3 target-pathway edges
    assert_eq!(result.graph.nodes.len(), 5);
    assert_eq!(result.graph.edges.len(), 5);
}

#[tokio::test]
async fn test_result_round_trips_through_json() {
    let h = harness();
    let result = h.service.run_analysis("imatinib", &defaults(), None).await.unwrap();
    let encoded = serde_json::to_string(&result).unwrap();
    let decoded: AnalysisResult = serde_json::from_str(&encoded).unwrap();
    assert_eq!(decoded, result);
}

#[tokio::test]
async fn test_aggregation_ignores_fetch_order() {
    let reversed = common::with_kinase_details(
        MockBioactivitySource::new()
            .with_candidate(candidate("CHEMBL941", "IMATINIB", Some(common::IMATINIB_KEY)))
            .with_activities([
                activity("CHEMBL203", 6.9),
                activity("CHEMBL1862", 7.9),
                activity("CHEMBL203", 6.5),
                activity("CHEMBL1862", 8.2),
                activity("CHEMBL1862", 8.0),
            ]),
    );
    let forward = harness().service.run_analysis("imatinib", &defaults(), None).await.unwrap();
    let shuffled = HarnessBuilder { bioactivity: reversed, ..Default::default() }
        .build()
        .service
        .run_analysis("imatinib", &defaults(), None)
        .await
        .unwrap();

    let medians = |r: &AnalysisResult| {
        r.targets.iter().map(|t| (t.target_chembl_id.clone(), t.median_pchembl)).collect::<Vec<_>>()
    };
    let scores = |r: &AnalysisResult| r.pathways.iter().map(|p| (p.pathway_id.clone(), p.score)).collect::<Vec<_>>();
    assert_eq!(medians(&forward), medians(&shuffled));
    assert_eq!(scores(&forward), scores(&shuffled));
    assert_eq!(scores(&forward).len(), 2);
}

// ── Failure handling ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_primary_outage_is_fatal() {
    let h = HarnessBuilder { bioactivity: common::imatinib_bioactivity().failing_activities(), ..Default::default() }
        .build();
    let err = h.service.run_analysis("imatinib", &defaults(), None).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::FatalUpstream);
    assert!(!err.is_request_error());
}

#[tokio::test]
async fn test_no_activity_records_is_fatal() {
    let bare = MockBioactivitySource::new().with_candidate(candidate("CHEMBL941", "IMATINIB", None));
    let h = HarnessBuilder { bioactivity: bare, ..Default::default() }.build();
    let err = h.service.run_analysis("imatinib", &defaults(), None).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::FatalUpstream);
}

#[tokio::test]
async fn test_no_record_passing_filters_is_fatal() {
    let weak = MockBioactivitySource::new()
        .with_candidate(candidate("CHEMBL941", "IMATINIB", None))
        .with_activities([activity("CHEMBL1862", 4.5), activity("CHEMBL203", 4.9)]);
    let h = HarnessBuilder { bioactivity: weak, ..Default::default() }.build();
    let err = h.service.run_analysis("imatinib", &defaults(), None).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::FatalUpstream);
    assert!(err.to_string().contains("pass the assay filters"), "{err}");
}

#[tokio::test]
async fn test_partial_pathway_outage_degrades() {
    let h = HarnessBuilder { pathways: common::kinase_pathways().failing_for("P00533"), ..Default::default() }
        .build();
    let result = h.service.run_analysis("imatinib", &defaults(), None).await.unwrap();

    let egfr = result.targets.iter().find(|t| t.target_chembl_id == "CHEMBL203").unwrap();
    assert_eq!(egfr.mapping_status, MappingStatus::Partial);
    assert!(egfr.mapping_notes.contains(&MappingNote::ReactomeUnavailable));
    let abl = result.targets.iter().find(|t| t.target_chembl_id == "CHEMBL1862").unwrap();
    assert_eq!(abl.mapping_status, MappingStatus::Mapped);

    assert!(result.flags.partial_mapping);
    assert_eq!(
        result.degraded_messages,
        vec!["Pathway data temporarily unavailable. Showing target binding data only."]
    );
    let pathway_ids: Vec<_> = result.pathways.iter().map(|p| p.pathway_id.as_str()).collect();
    assert_eq!(pathway_ids, vec!["R-HSA-1"]);
}

#[tokio::test]
async fn test_enrichment_outages_are_absorbed() {
    let h = HarnessBuilder {
        structure: MockStructureSource::new().failing(),
        mechanism: MockMechanismSource::new().failing(),
        ..Default::default()
    }
    .build();
    let result = h.service.run_analysis("imatinib", &defaults(), None).await.unwrap();

    assert_eq!(
        result.degraded_messages,
        vec![
            "Drug mechanism data unavailable. Direction information may be missing.",
            "Drug structure image unavailable.",
        ]
    );
    assert!(result.flags.direction_unknown);
    assert!(!result.flags.partial_mapping);
    assert_eq!(result.resolution.clinical_phase, None);
}

#[tokio::test]
async fn test_target_details_outage_degrades() {
    let bioactivity = common::imatinib_bioactivity().failing_target_details();
    let h = HarnessBuilder { bioactivity, ..Default::default() }.build();
    let result = h.service.run_analysis("imatinib", &defaults(), None).await.unwrap();

    assert_eq!(result.targets.len(), 2);
    for target in &result.targets {
        assert_eq!(target.target_name, target.target_chembl_id);
        assert_eq!(target.mapping_status, MappingStatus::Unmapped);
    }
    assert!(result.pathways.is_empty());
    assert!(result.flags.partial_mapping);
    assert_eq!(
        result.degraded_messages,
        vec![
            "Some targets have limited pathway mapping coverage.",
            "Target annotations unavailable. Showing ChEMBL target identifiers only.",
        ]
    );
}

#[tokio::test]
async fn test_unmapped_target_flags_partial_mapping() {
    let orphan =
        common::imatinib_bioactivity().with_activities([activity("CHEMBL9999", 7.0), activity("CHEMBL9999", 7.1)]);
    let h = HarnessBuilder { bioactivity: orphan, ..Default::default() }.build();
    let result = h.service.run_analysis("imatinib", &defaults(), None).await.unwrap();

    let unmapped = result.targets.iter().find(|t| t.target_chembl_id == "CHEMBL9999").unwrap();
    assert_eq!(unmapped.mapping_status, MappingStatus::Unmapped);
    assert_eq!(unmapped.mapping_notes, vec![MappingNote::UnmappedTarget]);
    assert!(result.flags.partial_mapping);
    assert_eq!(result.degraded_messages, vec!["Some targets have limited pathway mapping coverage."]);

    let pathway_ids: Vec<_> = result.pathways.iter().map(|p| p.pathway_id.as_str()).collect();
    assert_eq!(pathway_ids, vec!["R-HSA-1", "R-HSA-2"]);
}

#[tokio::test]
async fn test_accession_outage_degrades_targets_without_accession() {
    let orphan =
        common::imatinib_bioactivity().with_activities([activity("CHEMBL9999", 7.0), activity("CHEMBL9999", 7.1)]);
    let h = HarnessBuilder {
        bioactivity: orphan,
        accessions: MockAccessionSource::new().failing(),
        ..Default::default()
    }
    .build();
    let result = h.service.run_analysis("imatinib", &defaults(), None).await.unwrap();

    let unmapped = result.targets.iter().find(|t| t.target_chembl_id == "CHEMBL9999").unwrap();
    assert_eq!(unmapped.mapping_status, MappingStatus::Unmapped);
    // Targets with a known accession never consult the accession source.
    let abl = result.targets.iter().find(|t| t.target_chembl_id == "CHEMBL1862").unwrap();
    assert_eq!(abl.mapping_status, MappingStatus::Mapped);

    assert!(result.flags.partial_mapping);
    assert_eq!(
        result.degraded_messages,
        vec![
            "Some target annotations may be incomplete.",
            "Some targets have limited pathway mapping coverage.",
        ]
    );
}

#[tokio::test]
async fn test_empty_pathway_lookup_reports_limited_coverage() {
    let abl_only = MockPathwaySource::new().with_pathways("P00519", vec![pathway("R-HSA-1", 3, 20, &[])]);
    let h = HarnessBuilder { pathways: abl_only, ..Default::default() }.build();
    let result = h.service.run_analysis("imatinib", &defaults(), None).await.unwrap();

    let egfr = result.targets.iter().find(|t| t.target_chembl_id == "CHEMBL203").unwrap();
    assert_eq!(egfr.mapping_status, MappingStatus::Partial);
    assert!(egfr.mapping_notes.contains(&MappingNote::ReactomeLiveLookup));
    assert!(result.flags.partial_mapping);
    assert_eq!(result.degraded_messages, vec!["Some targets have limited pathway mapping coverage."]);
}

#[tokio::test]
async fn test_target_list_truncation_is_reported() {
    let mut builder = HarnessBuilder::default();
    builder.config.analysis.max_targets = 1;
    let result = builder.build().service.run_analysis("imatinib", &defaults(), None).await.unwrap();

    assert_eq!(result.targets.len(), 1);
    assert_eq!(result.targets[0].target_chembl_id, "CHEMBL1862");
    assert!(result
        .degraded_messages
        .contains(&"Showing top 1 targets by potency for performance.".to_string()));
}

#[tokio::test]
async fn test_invalid_params_rejected_before_upstream() {
    let h = harness();
    let params = AnalysisParams { pchembl_threshold: 3.0, ..AnalysisParams::default() };
    let err = h.service.run_analysis("imatinib", &params, None).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Invalid);
    assert_eq!(h.bioactivity.resolve_calls(), 0);
}

// ── Resolution ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_ambiguous_then_explicit_choice() {
    let two = common::imatinib_bioactivity().with_candidate(candidate("CHEMBL1421", "DASATINIB", None));
    let h = HarnessBuilder { bioactivity: two, ..Default::default() }.build();

    let err = h.service.run_analysis("tinib", &defaults(), None).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Ambiguous);
    assert_eq!(err.candidates().len(), 2);

    let result = h.service.run_analysis("tinib", &defaults(), Some("CHEMBL941")).await.unwrap();
    assert_eq!(result.canonical_drug_id, "CHEMBL941");

    let err = h.service.run_analysis("tinib", &defaults(), Some("CHEMBL0")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidChoice);
}

#[tokio::test]
async fn test_identity_cache_skips_upstream_resolution() {
    let h = harness();
    h.service.resolve("Imatinib", None).await.unwrap();
    let again = h.service.resolve("  imatinib ", None).await.unwrap();
    assert_eq!(again.identity.chembl_parent_id, "CHEMBL941");
    assert_eq!(h.bioactivity.resolve_calls(), 1);
}

#[tokio::test]
async fn test_short_suggest_query_is_empty() {
    let h = harness();
    assert!(h.service.suggest(" i ").await.unwrap().is_empty());
    let suggestions = h.service.suggest("imat").await.unwrap();
    assert_eq!(suggestions[0].chembl_id, "CHEMBL941");
}

// ── Submission & retrieval ──────────────────────────────────────────────────

#[tokio::test]
async fn test_submit_persists_and_caches() {
    let h = harness();
    let request = AnalysisRequest::new("imatinib");
    let first = h.service.submit(&request).await.unwrap();
    let second = h.service.submit(&request).await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(h.bioactivity.activity_calls(), 1);
    assert_eq!(h.repository.analysis_count().await, 1);
    assert_eq!(h.service.get_analysis(first.id).await.unwrap(), first);
}

#[tokio::test]
async fn test_do_not_log_keeps_result_out_of_repository() {
    let h = harness();
    let request = AnalysisRequest { do_not_log: true, ..AnalysisRequest::new("imatinib") };
    let result = h.service.submit(&request).await.unwrap();

    assert_eq!(h.repository.analysis_count().await, 0);
    assert_eq!(h.service.get_analysis(result.id).await.unwrap().id, result.id);

    // Neither the request cache nor the identity cache was written.
    h.service.submit(&request).await.unwrap();
    assert_eq!(h.bioactivity.activity_calls(), 2);
    assert_eq!(h.bioactivity.resolve_calls(), 2);
}

#[tokio::test]
async fn test_file_store_shares_results_between_services() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("store.json");

    let writer = HarnessBuilder::default().service_on(Arc::new(JsonFileRepository::open(&path).await.unwrap()));
    let stored = writer.submit(&AnalysisRequest::new("imatinib")).await.unwrap();
    drop(writer);

    // A later process sees the result and the cached identity without ChEMBL.
    let reader = HarnessBuilder { bioactivity: MockBioactivitySource::new().failing(), ..Default::default() }
        .service_on(Arc::new(JsonFileRepository::open(&path).await.unwrap()));
    assert_eq!(reader.get_analysis(stored.id).await.unwrap(), stored);
    let resolution = reader.resolve("imatinib", None).await.unwrap();
    assert_eq!(resolution.identity.chembl_parent_id, "CHEMBL941");
}

#[tokio::test]
async fn test_unknown_analysis_is_not_found() {
    let h = harness();
    let err = h.service.get_analysis(uuid::Uuid::new_v4()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

// ── Versions ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_refreshed_versions_appear_in_snapshot() {
    let h = harness();
    let refreshed = h.service.refresh_source_versions().await;
    assert_eq!(refreshed.len(), 2);

    let result = h.service.run_analysis("imatinib", &defaults(), None).await.unwrap();
    assert_eq!(result.version_snapshot.get("chembl").map(String::as_str), Some("ChEMBL_35"));
    assert_eq!(result.version_snapshot.get("reactome").map(String::as_str), Some("91"));
    assert_eq!(result.version_snapshot.get("uniprot").map(String::as_str), Some("unknown"));
}

#[tokio::test]
async fn test_refresh_skips_failing_sources() {
    let h = HarnessBuilder { pathways: MockPathwaySource::new().failing(), ..Default::default() }.build();
    let refreshed = h.service.refresh_source_versions().await;
    assert_eq!(refreshed.keys().collect::<Vec<_>>(), vec!["chembl"]);
}
