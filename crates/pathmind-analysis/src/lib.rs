//! pathmind-analysis — drug → target → pathway analysis orchestration.
//!
//! Stages, in order: identity resolution ([`resolver`]), assay aggregation
//! (`pathmind-ranker`), target-to-pathway mapping ([`mapper`]) and pathway
//! scoring, with non-fatal source failures collected by [`degradation`].
//! [`service::AnalysisService`] wires them together.

pub mod cache;
pub mod degradation;
pub mod file_store;
pub mod graph;
pub mod health;
pub mod mapper;
pub mod repository;
pub mod resolver;
pub mod service;

pub use file_store::JsonFileRepository;
pub use repository::{AnalysisRepository, InMemoryRepository, PathwayStore};
pub use service::{AnalysisRequest, AnalysisService, CompareResult, Sources};
