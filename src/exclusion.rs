//! Per-repository path exclusions
//!
//! Built once from `repo:path1,path2,...` entries and consulted before any change
//! detection. Matching is exact: no globbing, no prefix matching, no trimming.

use std::collections::{HashMap, HashSet};
use tracing::{debug, error, warn};

use crate::repo::{strip_host_prefix, RepoId};

/// Excluded paths keyed by repository
#[derive(Debug, Clone, Default)]
pub struct ExclusionConfig {
    excluded: HashMap<RepoId, HashSet<String>>,
}

impl ExclusionConfig {
    /// Parse raw `repo:path1,path2,...` entries.
    ///
    /// Malformed entries are logged and skipped; the remaining entries are still
    /// parsed. A later entry for the same repository replaces an earlier one.
    pub fn parse<S: AsRef<str>>(entries: &[S]) -> Self {
        let mut excluded = HashMap::new();

        for entry in entries {
            let entry = entry.as_ref();

            // A URL-form repository carries its own colon after the scheme
            let Some((repo, paths)) = strip_host_prefix(entry).split_once(':') else {
                error!("Invalid ignore entry (expected repo:path1,path2): {}", entry);
                continue;
            };

            let repo = match RepoId::parse(repo) {
                Ok(repo) => repo,
                Err(e) => {
                    error!("Invalid ignore entry {}: {}", entry, e);
                    continue;
                }
            };

            let paths: HashSet<String> = paths.split(',').map(str::to_string).collect();
            debug!("Excluding {} path(s) in {}", paths.len(), repo);

            if excluded.insert(repo.clone(), paths).is_some() {
                warn!("Multiple ignore entries for {}, keeping the last one", repo);
            }
        }

        Self { excluded }
    }

    /// Whether `path` is configured as excluded for `repo`
    pub fn is_excluded(&self, repo: &RepoId, path: &str) -> bool {
        self.excluded
            .get(repo)
            .is_some_and(|paths| paths.contains(path))
    }

    /// Number of repositories with at least one exclusion entry
    pub fn len(&self) -> usize {
        self.excluded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.excluded.is_empty()
    }
}
