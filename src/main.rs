use anyhow::Result;
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use mdsync::{CliOverrides, Config, FetchStrategy, SyncEngine, SyncSummary};

#[derive(Parser)]
#[command(name = "mdsync")]
#[command(about = "Incrementally sync Markdown documentation from GitHub repositories")]
#[command(version)]
struct Cli {
    /// Bearer token for API calls (falls back to GITHUB_TOKEN)
    #[arg(long)]
    access_token: Option<String>,

    /// Repository to sync, as owner/name or https://github.com/owner/name (repeatable)
    #[arg(long = "repo", value_name = "REPO", value_delimiter = ',')]
    repos: Vec<String>,

    /// Root output directory [default: docs]
    #[arg(long)]
    output: Option<String>,

    /// Change record location [default: history.json]
    #[arg(long)]
    history: Option<String>,

    /// Paths to skip, as repo:path1,path2 (repeatable)
    #[arg(long = "ignore", value_name = "REPO:PATHS")]
    ignore: Vec<String>,

    /// File suffix to sync [default: .md]
    #[arg(long)]
    extension: Option<String>,

    /// How file content is retrieved [default: blob]
    #[arg(long, value_enum)]
    fetch_strategy: Option<FetchStrategy>,

    /// API base URL [default: https://api.github.com]
    #[arg(long)]
    api_url: Option<String>,

    /// Remove record entries for files that no longer exist upstream
    #[arg(long)]
    prune_stale: bool,

    /// Show what would be downloaded without writing anything
    #[arg(long)]
    dry_run: bool,

    /// Configuration file path (defaults to XDG config location)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            access_token: self.access_token.clone(),
            repos: self.repos.clone(),
            output: self.output.clone(),
            history: self.history.clone(),
            ignore: self.ignore.clone(),
            extension: self.extension.clone(),
            fetch_strategy: self.fetch_strategy,
            api_url: self.api_url.clone(),
            prune_stale: self.prune_stale,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose)?;
    info!("Starting mdsync v{}", env!("CARGO_PKG_VERSION"));

    let mut config = load_config(cli.config.clone())?.with_overrides(cli.overrides());
    config.expand_paths()?;

    if config.repos.is_empty() {
        warn!("No repositories configured; pass --repo owner/name");
    }

    let engine = SyncEngine::new(config)?.dry_run(cli.dry_run);
    let summary = engine.run_sync().await;

    print_summary(&summary, &engine.config().output_dir(), cli.dry_run);

    Ok(())
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    Ok(())
}

/// Load configuration from specified path or default location
fn load_config(config_path: Option<PathBuf>) -> Result<Config> {
    match config_path {
        Some(path) => Config::load(&path),
        None => Config::load_or_default(),
    }
}

fn print_summary(summary: &SyncSummary, output_dir: &Path, dry_run: bool) {
    if dry_run {
        println!("\n🔍 Dry run - nothing was written");
        for report in &summary.reports {
            for path in &report.would_fetch {
                println!("   📥 {}: {}", report.repo, path);
            }
        }
    } else {
        println!("\n🎉 Synchronization Complete!");
    }

    println!("   📁 Output: {}", output_dir.display());
    println!("   📊 Repositories: {}", summary.total_repositories);
    println!("   📥 Downloaded files: {}", summary.fetched_files);
    println!("   ✅ Up-to-date files: {}", summary.up_to_date_files);
    println!("   🚫 Ignored files: {}", summary.excluded_files);
    println!("   ❌ Failed files: {}", summary.failed_files);
    println!("   ⚠️  Repositories not listed: {}", summary.failed_listings);
    println!("   ⏱️  Duration: {:.2}s", summary.duration.as_secs_f64());

    let failures: Vec<_> = summary
        .reports
        .iter()
        .filter(|report| report.listing_error.is_some() || !report.failed.is_empty())
        .collect();

    if !failures.is_empty() {
        println!("\n🔍 Failures (retried on next run):");
        for report in failures {
            if let Some(error) = &report.listing_error {
                println!("   ❌ {}: {}", report.repo, error);
            }
            for (path, error) in &report.failed {
                println!("   ❌ {}/{}: {}", report.repo, path, error);
            }
        }
    }

    for report in summary.reports.iter().filter(|report| report.truncated) {
        println!("   ⚠️  {}: listing truncated upstream, some files were not synced", report.repo);
    }
}
