//! grape - deterministic multi-strategy grep over a code tree
//!
//! Produces a bounded snapshot of the searchable surface, a reproducible
//! search plan, ordered results, an auditable probe ledger and a single
//! next-step suggestion.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use grape::cli::{commands, Cli};
use grape::config::Config;
use grape::core::find_repo_root;
use grape::error::{GrapeError, EXIT_RUNTIME, EXIT_USAGE};

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e:#}");
            return ExitCode::from(EXIT_USAGE);
        }
    };
    init_logging(&cli, &config);

    let base = match base_dir() {
        Ok(base) => base,
        Err(e) => {
            eprintln!("error: {e:#}");
            return ExitCode::from(EXIT_RUNTIME);
        }
    };

    match commands::dispatch(&cli, &config, &base) {
        Ok(code) => ExitCode::from(code),
        Err(e) => report(&e),
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    match &cli.config {
        Some(path) => Config::load_from(path),
        None => Ok(Config::load()),
    }
}

/// Logs always go to stderr; stdout carries the event stream
fn init_logging(cli: &Cli, config: &Config) {
    let filter = if cli.verbose {
        EnvFilter::new("grape=debug")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("grape={}", config.general.log_level)))
    };

    let registry = tracing_subscriber::registry().with(filter);
    if config.general.json_logs {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .compact()
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

/// Repository root containing the invocation directory, else that directory
fn base_dir() -> Result<PathBuf> {
    let cwd = std::env::current_dir().context("Failed to read the current directory")?;
    Ok(find_repo_root(&cwd).unwrap_or(cwd))
}

fn report(error: &GrapeError) -> ExitCode {
    for line in error.diagnostics() {
        eprintln!("{line}");
    }
    ExitCode::from(error.exit_code())
}
