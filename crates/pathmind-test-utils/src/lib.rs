//! In-memory doubles for the upstream sources and record fixtures.

pub mod fixtures;
pub mod mocks;

pub use mocks::{
    MockAccessionSource, MockBioactivitySource, MockMechanismSource, MockPathwaySource, MockStructureSource,
};
