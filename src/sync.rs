//! Sync Engine - Orchestrates documentation synchronization
//!
//! Repositories are processed one at a time, and the files of a repository in
//! listing order. For each repository the engine lists the remote tree, loads the
//! change record, decides per candidate file whether to fetch it, writes fetched
//! files under the output directory and finally saves the updated record.
//!
//! Failures stay local: a failed file is marked in the record and the loop moves
//! on; a failed listing skips the repository without touching its record.

use anyhow::Result;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::decision::{decide, Decision};
use crate::exclusion::ExclusionConfig;
use crate::github::GitHubClient;
use crate::materialize::materialize;
use crate::record::{ChangeRecord, RecordStore, StalePolicy};
use crate::remote::{RemoteSource, TreeEntry};
use crate::repo::RepoId;
use crate::Config;

/// What happened to one repository during a run
#[derive(Debug, Clone)]
pub struct RepoReport {
    pub repo: RepoId,
    /// Set when the tree listing failed and the repository was skipped
    pub listing_error: Option<String>,
    /// Local files written this run
    pub fetched: Vec<PathBuf>,
    /// Paths that would have been fetched (dry run only)
    pub would_fetch: Vec<String>,
    pub up_to_date: usize,
    pub excluded: usize,
    /// Paths whose fetch or write failed, with the error
    pub failed: Vec<(String, String)>,
    /// Record entries removed by the prune policy
    pub pruned: usize,
    /// The listing was cut short upstream, so some files were not seen
    pub truncated: bool,
    pub record_saved: bool,
}

impl RepoReport {
    fn new(repo: RepoId) -> Self {
        Self {
            repo,
            listing_error: None,
            fetched: Vec::new(),
            would_fetch: Vec::new(),
            up_to_date: 0,
            excluded: 0,
            failed: Vec::new(),
            pruned: 0,
            truncated: false,
            record_saved: false,
        }
    }
}

/// Results from a complete sync operation
#[derive(Debug, Clone)]
pub struct SyncSummary {
    pub total_repositories: usize,
    pub fetched_files: usize,
    pub up_to_date_files: usize,
    pub excluded_files: usize,
    pub failed_files: usize,
    pub failed_listings: usize,
    pub duration: Duration,
    pub reports: Vec<RepoReport>,
}

/// The main sync engine that orchestrates documentation synchronization
pub struct SyncEngine {
    config: Arc<Config>,
    source: Box<dyn RemoteSource>,
    exclusions: ExclusionConfig,
    records: RecordStore,
    dry_run: bool,
}

impl SyncEngine {
    /// Create a sync engine backed by the GitHub API
    pub fn new(config: Config) -> Result<Self> {
        let client = GitHubClient::new(&config)?;
        Ok(Self::with_source(config, Box::new(client)))
    }

    /// Create a sync engine with an explicit remote source
    pub fn with_source(config: Config, source: Box<dyn RemoteSource>) -> Self {
        let exclusions = config.exclusions();
        debug!("Ignore entries configured for {} repositories", exclusions.len());
        let records = RecordStore::new(config.history_path());

        Self {
            config: Arc::new(config),
            source,
            exclusions,
            records,
            dry_run: false,
        }
    }

    /// Compute decisions without fetching, writing or saving anything
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Sync every configured repository in order
    pub async fn run_sync(&self) -> SyncSummary {
        let start_time = Instant::now();
        let repositories = self.config.repositories();

        info!(
            "Starting synchronization of {} repositories from {}",
            repositories.len(),
            self.source.provider_name()
        );

        let mut reports = Vec::with_capacity(repositories.len());
        for repo in &repositories {
            reports.push(self.sync_repository(repo).await);
        }

        let summary = compile_summary(reports, start_time.elapsed());

        info!(
            "Sync completed in {:.2}s: {} fetched, {} up to date, {} excluded, {} failed",
            summary.duration.as_secs_f64(),
            summary.fetched_files,
            summary.up_to_date_files,
            summary.excluded_files,
            summary.failed_files
        );

        summary
    }

    /// Run one repository pass: list, decide, fetch, save
    pub async fn sync_repository(&self, repo: &RepoId) -> RepoReport {
        let mut report = RepoReport::new(repo.clone());

        info!("Syncing repository: {}", repo);

        let listing = match self.source.list_tree(repo).await {
            Ok(listing) => listing,
            Err(e) => {
                error!("Skipping {}: {:#}", repo, e);
                report.listing_error = Some(format!("{:#}", e));
                return report;
            }
        };

        if listing.truncated {
            warn!("Tree listing for {} was truncated; some files were not seen", repo);
            report.truncated = true;
        }

        let mut history = self.records.load();
        let mut record = history.record(repo);

        let candidates: Vec<&TreeEntry> = listing
            .entries
            .iter()
            .filter(|entry| entry.is_candidate(&self.config.extension))
            .collect();

        debug!(
            "{} of {} objects in {} are candidates",
            candidates.len(),
            listing.entries.len(),
            repo
        );

        for entry in &candidates {
            self.process_entry(repo, entry, &mut record, &mut report).await;
        }

        if self.dry_run {
            return report;
        }

        if self.config.stale_policy() == StalePolicy::Prune {
            let live: HashSet<&str> = candidates.iter().map(|entry| entry.path.as_str()).collect();
            let pruned = record.prune(&live);
            for path in &pruned {
                debug!("Pruned record entry for {}", path);
            }
            report.pruned = pruned.len();
        }

        let pending = record.iter().filter(|(_, entry)| entry.is_failed()).count();
        if pending > 0 {
            debug!("{} entries in {} will be retried next run", pending, repo);
        }

        history.set_record(repo, record);
        match self.records.save(&history) {
            Ok(()) => report.record_saved = true,
            Err(e) => error!("Failed to save change record for {}: {:#}", repo, e),
        }

        report
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Decide on one candidate and act on the decision
    async fn process_entry(
        &self,
        repo: &RepoId,
        entry: &TreeEntry,
        record: &mut ChangeRecord,
        report: &mut RepoReport,
    ) {
        let decision = decide(
            &self.exclusions,
            repo,
            &entry.path,
            &entry.content_id,
            record,
        );

        match decision {
            Decision::SkipExcluded => {
                info!("Ignoring file: {}", entry.path);
                report.excluded += 1;
            }
            Decision::SkipCurrent => {
                info!("Skipping file: {} (already up to date)", entry.path);
                report.up_to_date += 1;
            }
            Decision::Fetch(reason) if self.dry_run => {
                info!("Would download file: {} ({:?})", entry.path, reason);
                report.would_fetch.push(entry.path.clone());
            }
            Decision::Fetch(reason) => {
                info!("Downloading file: {} ({:?})", entry.path, reason);

                match self.fetch_and_materialize(repo, entry).await {
                    Ok(written) => {
                        info!("File downloaded: {}", written.display());
                        record.mark_synced(entry.path.as_str(), entry.content_id.as_str());
                        report.fetched.push(written);
                    }
                    Err(e) => {
                        error!("Failed to sync {} from {}: {:#}", entry.path, repo, e);
                        record.mark_failed(entry.path.as_str());
                        report.failed.push((entry.path.clone(), format!("{:#}", e)));
                    }
                }
            }
        }
    }

    async fn fetch_and_materialize(&self, repo: &RepoId, entry: &TreeEntry) -> Result<PathBuf> {
        let content = self.source.fetch(entry).await?;

        if content.is_empty() {
            warn!("{} in {} is empty", entry.path, repo);
        }

        materialize(&self.config.output_dir(), repo, &entry.path, &content).await
    }
}

/// Compile sync summary from per-repository reports
fn compile_summary(reports: Vec<RepoReport>, duration: Duration) -> SyncSummary {
    let mut summary = SyncSummary {
        total_repositories: reports.len(),
        fetched_files: 0,
        up_to_date_files: 0,
        excluded_files: 0,
        failed_files: 0,
        failed_listings: 0,
        duration,
        reports: Vec::new(),
    };

    for report in &reports {
        summary.fetched_files += report.fetched.len();
        summary.up_to_date_files += report.up_to_date;
        summary.excluded_files += report.excluded;
        summary.failed_files += report.failed.len();
        if report.listing_error.is_some() {
            summary.failed_listings += 1;
        }
    }

    summary.reports = reports;
    summary
}
