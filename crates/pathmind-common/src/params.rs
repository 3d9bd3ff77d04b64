use serde::{Deserialize, Serialize};

use crate::error::{PathmindError, Result};

fn default_pchembl_threshold() -> f64 { 5.0 }
fn default_min_assays() -> usize { 2 }
fn default_top_pathways() -> usize { 20 }

/// User-tunable knobs for a single analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisParams {
    #[serde(default = "default_pchembl_threshold")]
    pub pchembl_threshold: f64,
    #[serde(default = "default_min_assays")]
    pub min_assays: usize,
    #[serde(default)]
    pub include_low_confidence: bool,
    #[serde(default = "default_top_pathways")]
    pub top_pathways: usize,
}

impl Default for AnalysisParams {
    fn default() -> Self {
        Self {
            pchembl_threshold: default_pchembl_threshold(),
            min_assays: default_min_assays(),
            include_low_confidence: false,
            top_pathways: default_top_pathways(),
        }
    }
}

impl AnalysisParams {
    pub fn validate(&self) -> Result<()> {
        if !(4.0..=10.0).contains(&self.pchembl_threshold) {
            return Err(PathmindError::InvalidParams(format!(
                "pchembl_threshold must be within 4.0..=10.0, got {}",
                self.pchembl_threshold
            )));
        }
        if !(1..=20).contains(&self.min_assays) {
            return Err(PathmindError::InvalidParams(format!(
                "min_assays must be within 1..=20, got {}",
                self.min_assays
            )));
        }
        if !(1..=100).contains(&self.top_pathways) {
            return Err(PathmindError::InvalidParams(format!(
                "top_pathways must be within 1..=100, got {}",
                self.top_pathways
            )));
        }
        Ok(())
    }
}
