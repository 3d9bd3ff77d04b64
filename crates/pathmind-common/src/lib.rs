//! pathmind-common — Shared types, errors, and policies used across all Pathmind crates.

pub mod error;
pub mod entities;
pub mod confidence;
pub mod params;
pub mod sandbox;

// Re-export commonly used types
pub use error::{ErrorKind, PathmindError, Result, SourceError};
pub use params::AnalysisParams;
