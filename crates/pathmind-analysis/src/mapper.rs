//! Target → accession → pathway mapping.
//!
//! Mapping is a second pass over the aggregated hits: each [`TargetHit`] is
//! consumed and returned with its accession, status and notes filled in.
//! Source outages are reported on [`MappedTarget`] and never fail the pass.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use pathmind_common::entities::{MappingNote, MappingStatus, PathwayAssociation, TargetHit};
use pathmind_common::SourceError;
use pathmind_sources::{AccessionSource, PathwaySource};
use tracing::{debug, instrument, warn};

use crate::repository::PathwayStore;

#[derive(Debug, Clone, PartialEq)]
pub struct MappedTarget {
    pub hit: TargetHit,
    /// Empty for unmapped targets and failed lookups.
    pub pathways: Vec<PathwayAssociation>,
    /// The accession source failed at least once for this target.
    pub accession_source_degraded: bool,
    /// The live pathway lookup failed for this target.
    pub pathway_source_down: bool,
}

pub struct TargetMapper {
    accessions: Arc<dyn AccessionSource>,
    pathways: Arc<dyn PathwaySource>,
    store: Arc<dyn PathwayStore>,
}

impl TargetMapper {
    pub fn new(
        accessions: Arc<dyn AccessionSource>,
        pathways: Arc<dyn PathwaySource>,
        store: Arc<dyn PathwayStore>,
    ) -> Self {
        Self { accessions, pathways, store }
    }

    /// Maps every hit with at most `concurrency` targets in flight.
    /// Output order matches input order.
    pub async fn map_all(&self, hits: Vec<TargetHit>, concurrency: usize) -> Vec<MappedTarget> {
        stream::iter(hits)
            .map(|hit| self.map_target(hit))
            .buffered(concurrency.max(1))
            .collect()
            .await
    }

    #[instrument(skip(self, hit), fields(target = %hit.target_chembl_id))]
    pub async fn map_target(&self, hit: TargetHit) -> MappedTarget {
        let mut notes = Vec::new();
        let mut accession_source_degraded = false;

        let Some(accession) = self.resolve_accession(&hit, &mut notes, &mut accession_source_degraded).await else {
            notes.push(MappingNote::UnmappedTarget);
            debug!("No accession for target");
            return MappedTarget {
                hit: hit.with_mapping(None, MappingStatus::Unmapped, notes),
                pathways: Vec::new(),
                accession_source_degraded,
                pathway_source_down: false,
            };
        };

        let (pathways, status, pathway_source_down) = self.lookup_pathways(&accession, &mut notes).await;
        MappedTarget {
            hit: hit.with_mapping(Some(accession), status, notes),
            pathways,
            accession_source_degraded,
            pathway_source_down,
        }
    }

    /// Fallback chain; the first step that yields an accession wins.
    async fn resolve_accession(
        &self,
        hit: &TargetHit,
        notes: &mut Vec<MappingNote>,
        degraded: &mut bool,
    ) -> Option<String> {
        if let Some(known) = hit.uniprot_id.as_deref().filter(|a| !a.is_empty()) {
            notes.push(MappingNote::ChemblTargetAccession);
            return Some(known.to_string());
        }

        let target_id = hit.target_chembl_id.as_str();
        let by_accession = self.accessions.map_by_chembl_accession(target_id).await;
        if let Some(found) = take_lookup(by_accession, degraded) {
            notes.push(MappingNote::UniprotChemblAccession);
            return Some(found);
        }

        let by_xref = self.accessions.map_by_xref(target_id).await;
        if let Some(found) = take_lookup(by_xref, degraded) {
            notes.push(MappingNote::UniprotXrefLookup);
            return Some(found);
        }

        let symbol = hit.gene_symbol.as_deref().filter(|s| !s.is_empty())?;
        let by_symbol = self.accessions.map_by_gene_symbol(symbol).await;
        let found = take_lookup(by_symbol, degraded)?;
        notes.push(MappingNote::UniprotGeneSymbol);
        Some(found)
    }

    /// Local store first, then the live source with write-back.
    async fn lookup_pathways(
        &self,
        accession: &str,
        notes: &mut Vec<MappingNote>,
    ) -> (Vec<PathwayAssociation>, MappingStatus, bool) {
        match self.store.pathways_for(accession).await {
            Ok(cached) if !cached.is_empty() => {
                debug!(accession, count = cached.len(), "Pathway store hit");
                notes.push(MappingNote::PathwayCacheHit);
                return (cached, MappingStatus::Mapped, false);
            }
            Ok(_) => {}
            Err(e) => warn!(accession, error = %e, "Pathway store read failed"),
        }

        match self.pathways.pathways_for_accession(accession).await {
            Ok(live) if live.is_empty() => {
                notes.push(MappingNote::ReactomeLiveLookup);
                (live, MappingStatus::Partial, false)
            }
            Ok(live) => {
                notes.push(MappingNote::ReactomeLiveLookup);
                if let Err(e) = self.store.upsert_pathways(accession, &live).await {
                    warn!(accession, error = %e, "Pathway store write failed");
                }
                (live, MappingStatus::Mapped, false)
            }
            Err(e) => {
                warn!(accession, error = %e, "Pathway source unavailable");
                notes.push(MappingNote::ReactomeUnavailable);
                (Vec::new(), MappingStatus::Partial, true)
            }
        }
    }
}

fn take_lookup(result: Result<Option<String>, SourceError>, degraded: &mut bool) -> Option<String> {
    match result {
        Ok(found) => found.filter(|a| !a.is_empty()),
        Err(e) => {
            warn!(error = %e, "Accession lookup failed");
            *degraded = true;
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryRepository;
    use pathmind_test_utils::fixtures::{pathway, target_hit};
    use pathmind_test_utils::mocks::{MockAccessionSource, MockPathwaySource};
    use pretty_assertions::assert_eq;

    fn mapper(
        accessions: MockAccessionSource,
        pathways: MockPathwaySource,
    ) -> (TargetMapper, Arc<InMemoryRepository>) {
        let store = Arc::new(InMemoryRepository::new());
        let mapper = TargetMapper::new(Arc::new(accessions), Arc::new(pathways), store.clone());
        (mapper, store)
    }

    #[tokio::test]
    async fn test_known_accession_live_lookup_writes_back() {
        let mut hit = target_hit("CHEMBL203", 8.0);
        hit.uniprot_id = Some("P00533".into());
        let (mapper, store) = mapper(
            MockAccessionSource::new(),
            MockPathwaySource::new().with_pathways("P00533", vec![pathway("R-HSA-177929", 3, 40, &[])]),
        );

        let mapped = mapper.map_target(hit).await;
        assert_eq!(mapped.hit.mapping_status, MappingStatus::Mapped);
        assert_eq!(
            mapped.hit.mapping_notes,
            vec![MappingNote::ChemblTargetAccession, MappingNote::ReactomeLiveLookup]
        );
        assert_eq!(store.pathways_for("P00533").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_store_hit_skips_live_source() {
        let mut hit = target_hit("CHEMBL203", 8.0);
        hit.uniprot_id = Some("P00533".into());
        let pathways = Arc::new(MockPathwaySource::new().failing());
        let store = Arc::new(InMemoryRepository::new());
        store.upsert_pathways("P00533", &[pathway("R-HSA-1", 3, 10, &[])]).await.unwrap();
        let mapper = TargetMapper::new(Arc::new(MockAccessionSource::new()), pathways.clone(), store);

        let mapped = mapper.map_target(hit).await;
        assert_eq!(mapped.hit.mapping_notes[1], MappingNote::PathwayCacheHit);
        assert!(!mapped.pathway_source_down);
        assert_eq!(pathways.calls(), 0);
    }

    #[tokio::test]
    async fn test_chain_continues_after_outage() {
        let mut hit = target_hit("CHEMBL1824", 7.0);
        hit.gene_symbol = Some("ERBB2".into());
        let (mapper, _) = mapper(MockAccessionSource::new().failing(), MockPathwaySource::new());

        let mapped = mapper.map_target(hit).await;
        assert!(mapped.accession_source_degraded);
        assert_eq!(mapped.hit.mapping_status, MappingStatus::Unmapped);
        assert_eq!(mapped.hit.mapping_notes, vec![MappingNote::UnmappedTarget]);
    }

    #[tokio::test]
    async fn test_fallback_order() {
        let accessions = MockAccessionSource::new()
            .with_xref("CHEMBL2", "Q00002")
            .with_gene_symbol("ABL1", "P00519");
        let mut by_symbol = target_hit("CHEMBL3", 7.0);
        by_symbol.gene_symbol = Some("ABL1".into());
        let (mapper, _) = mapper(accessions, MockPathwaySource::new());

        let mapped = mapper.map_all(vec![target_hit("CHEMBL2", 8.0), by_symbol], 2).await;
        assert_eq!(mapped[0].hit.uniprot_id.as_deref(), Some("Q00002"));
        assert_eq!(mapped[0].hit.mapping_notes[0], MappingNote::UniprotXrefLookup);
        assert_eq!(mapped[1].hit.uniprot_id.as_deref(), Some("P00519"));
        assert_eq!(mapped[1].hit.mapping_notes[0], MappingNote::UniprotGeneSymbol);
        // Live lookup found nothing for either accession.
        assert_eq!(mapped[1].hit.mapping_status, MappingStatus::Partial);
    }

    #[tokio::test]
    async fn test_pathway_outage_marks_partial() {
        let mut hit = target_hit("CHEMBL203", 8.0);
        hit.uniprot_id = Some("P00533".into());
        let (mapper, _) = mapper(MockAccessionSource::new(), MockPathwaySource::new().failing_for("P00533"));

        let mapped = mapper.map_target(hit).await;
        assert!(mapped.pathway_source_down);
        assert!(mapped.pathways.is_empty());
        assert_eq!(mapped.hit.mapping_status, MappingStatus::Partial);
        assert_eq!(mapped.hit.mapping_notes.last(), Some(&MappingNote::ReactomeUnavailable));
    }
}
