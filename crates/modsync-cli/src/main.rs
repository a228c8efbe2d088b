//! modsync - automation account module synchronizer
//!
//! Usage:
//!   modsync sync --manifest modsync.toml   # Reconcile and import
//!   modsync plan --manifest modsync.toml   # Show decisions only
//!   modsync repo list                      # Show registered repositories

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use console::style;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use modsync_core::config::{SyncManifest, apply_env_overrides, parse_manifest};
use modsync_core::context::AppContext;
use modsync_core::orchestration::{FailurePolicy, SyncReport, SyncRunner, TargetOutcome};
use modsync_core::poll::{CancelToken, ThreadSleeper};
use modsync_core::reconcile::Action;
use modsync_core::repository::{InMemoryRepositoryStore, RepositoryStore};
use modsync_core::types::TerminalState;

#[derive(Parser)]
#[command(name = "modsync")]
#[command(about = "Automation account module synchronizer", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile every deployment target and import where needed
    Sync(SyncArgs),

    /// Show what sync would do without importing or removing anything
    Plan(PlanArgs),

    /// Manage registered package repositories
    Repo(RepoArgs),
}

#[derive(Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// Machine-readable JSON
    Json,
}

#[derive(Args)]
struct ManifestArgs {
    /// Deployment manifest
    #[arg(long, short, default_value = "modsync.toml")]
    manifest: PathBuf,

    /// Output format
    #[arg(short = 'o', long, default_value = "table")]
    format: OutputFormat,

    /// Register repositories for this run only instead of in repositories.toml
    #[arg(long)]
    ephemeral_repositories: bool,
}

#[derive(Args)]
struct SyncArgs {
    #[command(flatten)]
    manifest: ManifestArgs,

    /// Keep going with the next target after a failure
    #[arg(long)]
    continue_on_error: bool,

    /// Treat an import that ends in state Failed as an error
    #[arg(long)]
    fail_on_failed_import: bool,

    /// Seconds between import status checks
    #[arg(long, value_name = "SECS")]
    poll_interval: Option<u64>,

    /// Give up waiting for an import after this many seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,
}

#[derive(Args)]
struct PlanArgs {
    #[command(flatten)]
    manifest: ManifestArgs,
}

#[derive(Args)]
struct RepoArgs {
    #[command(subcommand)]
    command: RepoSubcommand,
}

#[derive(Subcommand)]
enum RepoSubcommand {
    /// List registered repositories
    List {
        /// Output format
        #[arg(short = 'o', long, default_value = "table")]
        format: OutputFormat,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "modsync=debug,info"
    } else {
        "modsync=info,warn"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let clean = run_cli(cli.command)?;
    if !clean {
        std::process::exit(1);
    }
    Ok(())
}

/// Returns false when the run finished but some target did not end well.
fn run_cli(command: Commands) -> Result<bool> {
    match command {
        Commands::Sync(args) => run_sync(args),
        Commands::Plan(args) => run_plan(args),
        Commands::Repo(args) => match args.command {
            RepoSubcommand::List { format } => {
                run_repo_list(format)?;
                Ok(true)
            }
        },
    }
}

fn load_manifest(path: &Path) -> Result<SyncManifest> {
    let mut manifest = parse_manifest(path)?;
    apply_env_overrides(&mut manifest);
    tracing::info!(
        manifest = %path.display(),
        deployments = manifest.deployments.len(),
        "Loaded manifest"
    );
    Ok(manifest)
}

fn run_sync(args: SyncArgs) -> Result<bool> {
    let mut manifest = load_manifest(&args.manifest.manifest)?;
    if args.continue_on_error {
        manifest.service.failure_policy = FailurePolicy::Continue;
    }
    if args.fail_on_failed_import {
        manifest.service.fail_on_failed_import = true;
    }
    if let Some(interval) = args.poll_interval {
        if interval == 0 {
            anyhow::bail!("--poll-interval must be greater than zero");
        }
        manifest.service.poll_interval_secs = interval;
    }
    if let Some(timeout) = args.timeout {
        manifest.service.poll_timeout_secs = Some(timeout);
    }

    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || {
        handler_token.cancel();
    })
    .context("Failed to set Ctrl+C handler")?;

    let report = execute(&manifest, &args.manifest, false, cancel)?;
    print_report(&report, args.manifest.format, false)?;
    Ok(report.is_clean())
}

fn run_plan(args: PlanArgs) -> Result<bool> {
    let manifest = load_manifest(&args.manifest.manifest)?;
    let report = execute(&manifest, &args.manifest, true, CancelToken::new())?;
    print_report(&report, args.manifest.format, true)?;
    Ok(report.failures.is_empty())
}

fn execute(
    manifest: &SyncManifest,
    args: &ManifestArgs,
    dry_run: bool,
    cancel: CancelToken,
) -> Result<SyncReport> {
    let ctx = AppContext::from_env(manifest.service.clone())?;
    let gallery = ctx.gallery_client();
    let service = ctx.arm_client()?;
    let sleeper = ThreadSleeper;

    let mut options = manifest.sync_options();
    options.dry_run = dry_run;

    let file_store;
    let memory_store;
    let store: &dyn RepositoryStore = if args.ephemeral_repositories {
        memory_store = InMemoryRepositoryStore::new();
        &memory_store
    } else {
        file_store = ctx.repository_store();
        &file_store
    };

    let mut runner =
        SyncRunner::new(store, &gallery, &service, &sleeper, options).with_cancel_token(cancel);
    let report = runner.run(&manifest.deployments)?;
    Ok(report)
}

fn print_report(report: &SyncReport, format: OutputFormat, dry_run: bool) -> Result<()> {
    match format {
        OutputFormat::Table => print_table(report, dry_run),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
    }
    Ok(())
}

fn print_table(report: &SyncReport, dry_run: bool) {
    if report.outcomes.is_empty() && report.failures.is_empty() {
        println!("Nothing to reconcile.");
        return;
    }

    for outcome in &report.outcomes {
        println!("{}", format_outcome(outcome, dry_run));
    }
    for failure in &report.failures {
        println!(
            "{} {} / {}: {}",
            style("✗").red(),
            failure.deployment,
            failure.account,
            failure.error
        );
    }

    let verb = if dry_run { "would import" } else { "imported" };
    println!();
    println!(
        "{} {}, {} replaced, {} skipped, {} failed",
        report.count(Action::Import),
        verb,
        report.count(Action::ForceReplace),
        report.count(Action::Skip),
        report.failures.len() + report.failed_imports().count()
    );
}

fn format_outcome(outcome: &TargetOutcome, dry_run: bool) -> String {
    let previous = outcome
        .previous_version
        .as_ref()
        .map(|v| v.to_string())
        .unwrap_or_else(|| "none".to_string());
    let marker = match (outcome.action, outcome.terminal) {
        (_, Some(TerminalState::Failed)) => style("✗").red(),
        (Action::Skip, _) => style("•").dim(),
        _ if dry_run => style("→").cyan(),
        _ => style("✓").green(),
    };
    let result = match outcome.terminal {
        Some(state) => format!(" ({state})"),
        None => String::new(),
    };

    format!(
        "{} {} / {}: {} {} -> {} [{}]{}",
        marker,
        outcome.deployment,
        outcome.account,
        outcome.module,
        previous,
        outcome.source_version,
        outcome.action,
        result
    )
}

fn run_repo_list(format: OutputFormat) -> Result<()> {
    let store = modsync_core::repository::FileRepositoryStore::from_default_location()?;
    let repositories = store.list()?;

    match format {
        OutputFormat::Table => {
            if repositories.is_empty() {
                println!("No repositories registered ({}).", store.path().display());
                return Ok(());
            }
            for repo in &repositories {
                println!("{}  {}", style(&repo.name).bold(), repo.source_location);
            }
        }
        OutputFormat::Json => {
            let output: Vec<_> = repositories
                .iter()
                .map(|repo| {
                    serde_json::json!({
                        "name": repo.name,
                        "source_location": repo.source_location,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
