#![allow(dead_code)]

//! Shared harness for service-level tests.

use std::sync::Arc;

use pathmind_analysis::{AnalysisRepository, AnalysisService, InMemoryRepository, PathwayStore, Sources};
use pathmind_config::Config;
use pathmind_test_utils::fixtures::{activity, candidate, pathway, target_detail};
use pathmind_test_utils::mocks::{
    MockAccessionSource, MockBioactivitySource, MockMechanismSource, MockPathwaySource, MockStructureSource,
};

pub const IMATINIB_KEY: &str = "KTUFNOKKBVMGRW-UHFFFAOYSA-N";

/// Imatinib with two human kinase targets, both with known accessions.
pub fn imatinib_bioactivity() -> MockBioactivitySource {
    with_kinase_details(
        MockBioactivitySource::new()
            .with_candidate(candidate("CHEMBL941", "IMATINIB", Some(IMATINIB_KEY)))
            .with_activities([
                activity("CHEMBL1862", 8.0),
                activity("CHEMBL1862", 8.2),
                activity("CHEMBL1862", 7.9),
                activity("CHEMBL203", 6.5),
                activity("CHEMBL203", 6.9),
            ]),
    )
}

/// ABL1 and EGFR annotations for CHEMBL1862 and CHEMBL203.
pub fn with_kinase_details(source: MockBioactivitySource) -> MockBioactivitySource {
    source
        .with_target_detail("CHEMBL1862", target_detail("Tyrosine-protein kinase ABL1", "ABL1", "P00519", Some(9)))
        .with_target_detail(
            "CHEMBL203",
            target_detail("Epidermal growth factor receptor erbB1", "EGFR", "P00533", Some(9)),
        )
}

pub fn kinase_pathways() -> MockPathwaySource {
    MockPathwaySource::new()
        .with_pathways("P00519", vec![pathway("R-HSA-1", 3, 20, &[])])
        .with_pathways("P00533", vec![pathway("R-HSA-1", 3, 20, &[]), pathway("R-HSA-2", 4, 10, &[])])
}

pub struct Harness {
    pub bioactivity: Arc<MockBioactivitySource>,
    pub pathways: Arc<MockPathwaySource>,
    pub repository: Arc<InMemoryRepository>,
    pub service: AnalysisService,
}

pub struct HarnessBuilder {
    pub bioactivity: MockBioactivitySource,
    pub structure: MockStructureSource,
    pub mechanism: MockMechanismSource,
    pub accessions: MockAccessionSource,
    pub pathways: MockPathwaySource,
    pub config: Config,
}

impl Default for HarnessBuilder {
    fn default() -> Self {
        Self {
            bioactivity: imatinib_bioactivity(),
            structure: MockStructureSource::new().with_match(5291, IMATINIB_KEY),
            mechanism: MockMechanismSource::new()
                .with_action("ABL1", "INHIBITOR")
                .with_action("EGFR", "INHIBITOR")
                .with_phase(4),
            accessions: MockAccessionSource::new(),
            pathways: kinase_pathways(),
            config: Config::default(),
        }
    }
}

impl HarnessBuilder {
    pub fn build(self) -> Harness {
        let repository = Arc::new(InMemoryRepository::new());
        let (bioactivity, pathways, service) = self.assemble(repository.clone());
        Harness { bioactivity, pathways, repository, service }
    }

    /// A service over `repository` instead of a fresh in-memory store.
    pub fn service_on<R>(self, repository: Arc<R>) -> AnalysisService
    where
        R: AnalysisRepository + PathwayStore + 'static,
    {
        self.assemble(repository).2
    }

    fn assemble<R>(self, repository: Arc<R>) -> (Arc<MockBioactivitySource>, Arc<MockPathwaySource>, AnalysisService)
    where
        R: AnalysisRepository + PathwayStore + 'static,
    {
        let bioactivity = Arc::new(self.bioactivity);
        let pathways = Arc::new(self.pathways);
        let sources = Sources {
            bioactivity: bioactivity.clone(),
            structure: Arc::new(self.structure),
            mechanism: Arc::new(self.mechanism),
            accessions: Arc::new(self.accessions),
            pathways: pathways.clone(),
        };
        let service = AnalysisService::new(sources, repository.clone(), repository, &self.config);
        (bioactivity, pathways, service)
    }
}

pub fn harness() -> Harness {
    HarnessBuilder::default().build()
}
