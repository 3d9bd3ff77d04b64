//! Command-line interface definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use pathmind_common::AnalysisParams;
use uuid::Uuid;

#[derive(Parser)]
#[command(
    name = "pathmind",
    version,
    about = "Drug → target → pathway association analysis",
    long_about = "Resolves a drug name against ChEMBL, aggregates its bioactivity by target,\n\
                  maps targets to Reactome pathways and scores pathway impact.\n\
                  Results are printed as JSON."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Path to pathmind.toml (default: $PATHMIND_CONFIG or ./pathmind.toml).
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run a full analysis for one drug.
    Analyze(AnalyzeArgs),

    /// Resolve a drug name to a ChEMBL parent compound.
    Resolve {
        query: String,
        /// ChEMBL parent id to pick when the name is ambiguous.
        #[arg(long)]
        choice: Option<String>,
    },

    /// Autocomplete drug names.
    Suggest { query: String },

    /// Analyze two drugs and compare their pathway profiles.
    Compare {
        drug_a: String,
        drug_b: String,
        #[command(flatten)]
        params: ParamArgs,
    },

    /// Fetch a stored analysis by id.
    Show { id: Uuid },

    /// Ping every upstream source.
    Health,

    /// Refresh stored upstream release versions.
    RefreshVersions,
}

#[derive(Args)]
pub struct AnalyzeArgs {
    pub drug: String,

    /// ChEMBL parent id to pick when the name is ambiguous.
    #[arg(long)]
    pub choice: Option<String>,

    #[command(flatten)]
    pub params: ParamArgs,

    /// Do not persist the result or the resolved identity.
    #[arg(long)]
    pub do_not_log: bool,
}

#[derive(Args)]
pub struct ParamArgs {
    /// Minimum pChEMBL value for an activity to count (4.0–10.0).
    #[arg(long, default_value_t = 5.0)]
    pub pchembl_threshold: f64,

    /// Minimum admitted assays per target (1–20).
    #[arg(long, default_value_t = 2)]
    pub min_assays: usize,

    /// Keep low-confidence targets.
    #[arg(long)]
    pub include_low_confidence: bool,

    /// Number of pathways to report (1–100).
    #[arg(long, default_value_t = 20)]
    pub top_pathways: usize,
}

impl ParamArgs {
    pub fn to_params(&self) -> AnalysisParams {
        AnalysisParams {
            pchembl_threshold: self.pchembl_threshold,
            min_assays: self.min_assays,
            include_low_confidence: self.include_low_confidence,
            top_pathways: self.top_pathways,
        }
    }
}
