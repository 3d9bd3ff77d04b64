//! Pathmind: drug → target → pathway association analysis.
//! Entry point for the `pathmind` binary.

mod cli;
mod wiring;

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use pathmind_common::{ErrorKind, PathmindError};
use pathmind_config::Config;
use serde::Serialize;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command};

fn load_config(cli: &Cli) -> Result<Config> {
    let Some(path) = cli.config.as_deref() else {
        return Ok(Config::load()?);
    };
    let path = path.to_str().context("config path is not valid UTF-8")?;
    let mut config = Config::from_path(path)?;
    config.apply_overrides(|key| std::env::var(key).ok());
    config.validate()?;
    Ok(config)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Request errors exit with 2, upstream outages with 3.
fn exit_code(err: &PathmindError) -> ExitCode {
    match err.kind() {
        ErrorKind::FatalUpstream => ExitCode::from(3),
        ErrorKind::Internal => ExitCode::FAILURE,
        _ => ExitCode::from(2),
    }
}

async fn run(cli: Cli, config: Config) -> Result<ExitCode> {
    let service = wiring::build_service(&config).await?;

    let outcome = match cli.command {
        Command::Analyze(args) => {
            let request = pathmind_analysis::AnalysisRequest {
                drug_name: args.drug,
                params: args.params.to_params(),
                resolution_choice: args.choice,
                do_not_log: args.do_not_log,
            };
            service.submit(&request).await.map(|r| print_json(&r))
        }
        Command::Resolve { query, choice } => service
            .resolve(&query, choice.as_deref())
            .await
            .map(|r| print_json(&serde_json::json!({ "resolution": r.identity, "candidates": r.candidates }))),
        Command::Suggest { query } => service.suggest(&query).await.map(|s| print_json(&s)),
        Command::Compare { drug_a, drug_b, params } => {
            service.compare(&drug_a, &drug_b, &params.to_params()).await.map(|c| print_json(&c))
        }
        Command::Show { id } => service.get_analysis(id).await.map(|r| print_json(&r)),
        Command::Health => Ok(print_json(&service.health().await)),
        Command::RefreshVersions => Ok(print_json(&service.refresh_source_versions().await)),
    };

    match outcome {
        Ok(printed) => {
            printed?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            if let PathmindError::Ambiguous { candidates, .. } = &err {
                warn!("{err}");
                print_json(&serde_json::json!({ "error": err.to_string(), "candidates": candidates }))?;
            } else {
                error!(kind = ?err.kind(), "{err}");
            }
            Ok(exit_code(&err))
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    // Initialise structured logging on stderr; stdout carries JSON output.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.filter)),
        )
        .init();

    info!("Pathmind {}", env!("CARGO_PKG_VERSION"));
    run(cli, config).await
}
