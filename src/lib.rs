// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod logging;
pub mod report;
pub mod task;
pub mod types;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::{config_path_in, load_and_validate};
use crate::engine::{AggregatedResult, ExecutionEngine};
use crate::errors::{ForgetMeError, Result};
use crate::task::{DiscovererRegistry, SystemEnvironment};
use crate::types::SubjectIdentifier;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - the subject identity (with a fresh pseudonym)
/// - config loading (`<home>/config.toml`) against the built-in readers
/// - the execution engine
/// - report printing
pub async fn run(args: CliArgs) -> Result<()> {
    let subject = SubjectIdentifier::new(
        args.user.as_str(),
        args.user_domain.as_str(),
        args.tenant_domain.as_str(),
    );
    let registry = DiscovererRegistry::with_builtins();
    let engine = build_engine(&args.home, subject, &registry)?;

    if args.dry_run {
        print_dry_run(&engine)?;
        return Ok(());
    }

    let result = engine.execute().await?;
    print!("{}", report::render(&result));
    Ok(())
}

/// Load `<home>/config.toml` and run every lane for `subject`.
///
/// Library counterpart of [`run`] for callers that bring their own readers.
pub async fn process(
    home: impl AsRef<Path>,
    subject: SubjectIdentifier,
    registry: &DiscovererRegistry,
) -> Result<AggregatedResult> {
    build_engine(home, subject, registry)?.execute().await
}

/// Resolve `home`, load its config and build an engine for `subject`.
pub fn build_engine(
    home: impl AsRef<Path>,
    subject: SubjectIdentifier,
    registry: &DiscovererRegistry,
) -> Result<ExecutionEngine> {
    validate_subject(&subject)?;
    let home = resolve_home(home)?;
    let config = load_and_validate(config_path_in(&home), &home, registry)?;
    info!(home = ?home, lanes = ?config.lanes(), "loaded configuration");

    Ok(ExecutionEngine::new(
        Arc::new(subject),
        SystemEnvironment::new(&home),
        Arc::new(config),
    ))
}

/// An empty username would match everywhere: every log line and every file.
fn validate_subject(subject: &SubjectIdentifier) -> Result<()> {
    if subject.username().trim().is_empty() {
        return Err(ForgetMeError::ConfigError(
            "username must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// Absolute, canonical form of the home directory.
fn resolve_home(home: impl AsRef<Path>) -> Result<PathBuf> {
    let home = home.as_ref();
    std::fs::canonicalize(home).map_err(|e| {
        ForgetMeError::ConfigError(format!(
            "could not load config from directory {:?}: {e}",
            home
        ))
    })
}

fn print_dry_run(engine: &ExecutionEngine) -> Result<()> {
    let plans = engine.plan()?;

    println!("forget-me dry-run:");
    for plan in &plans {
        println!("  lane {}", plan.lane);
        if !plan.settings.values().is_empty() {
            println!("    settings: {:?}", plan.settings.values());
        }
        if plan.tasks.is_empty() {
            println!("    (no tasks)");
        }
        for (idx, task) in plan.tasks.iter().enumerate() {
            println!("    {}. {}", idx + 1, task.describe());
        }
    }

    debug!("dry-run complete (no execution)");
    Ok(())
}
