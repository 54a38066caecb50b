mod aggregate;
mod cli;
mod collector;
mod error;
mod logging;
#[cfg(test)]
mod mock;
mod models;
mod output;
mod registry;
mod scheduler;

use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::ProgressBar;
use regex::Regex;
use tracing::{debug, info};

use aggregate::Inventory;
use cli::Cli;
use error::AppError;
use output::{emit_report, print_banner, progress_bar};
use registry::{EcrRegistry, RegistryApi};
use scheduler::Scheduler;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let filter = cli.name_filter()?;
    if !cli.no_banner {
        print_banner();
    }

    let registry = EcrRegistry::from_env(cli.region.clone(), cli.profile.clone())
        .await
        .map_err(AppError::from)?;
    info!(region = registry.region(), "using ECR");

    let scheduler = Scheduler::new(cli.concurrency()).with_timeout(cli.timeout());
    let inventory = build_inventory(&registry, filter.as_ref(), scheduler, true).await?;

    emit_report(&inventory, &cli.report_options())
}

/// Resolve the account, list and filter repositories, then collect them all.
///
/// An empty listing still yields an (empty) inventory so the report files are rewritten.
async fn build_inventory<R: RegistryApi + ?Sized>(
    registry: &R,
    filter: Option<&Regex>,
    scheduler: Scheduler,
    show_progress: bool,
) -> Result<Inventory> {
    let account_id = registry
        .get_account_id()
        .await
        .map_err(AppError::from)
        .context("Failed to resolve AWS account id")?;
    debug!(%account_id, "resolved caller identity");

    let mut names = registry
        .list_repository_names()
        .await
        .map_err(AppError::from)?;
    if let Some(re) = filter {
        names.retain(|name| re.is_match(name));
        debug!(pattern = re.as_str(), kept = names.len(), "applied repository filter");
    }
    if names.is_empty() {
        println!("No repositories found.");
    } else {
        println!("\nFetching repos metrics, statistics and tags:");
    }

    let progress = if show_progress && !names.is_empty() {
        progress_bar(names.len())
    } else {
        ProgressBar::hidden()
    };
    debug!(
        repositories = names.len(),
        concurrency = scheduler.concurrency(),
        "starting collection"
    );

    let inventory = scheduler
        .run(registry, &account_id, names, &progress)
        .await;
    Ok(inventory)
}
