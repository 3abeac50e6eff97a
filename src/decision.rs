//! Sync decisions
//!
//! For each candidate file the engine decides whether a local copy must be
//! fetched. Exclusion is checked first and wins over staleness; after that a path
//! is fetched when it is unknown, failed last time, or its content identifier
//! changed.

use crate::exclusion::ExclusionConfig;
use crate::record::{ChangeRecord, RecordEntry};
use crate::repo::RepoId;

/// Why a file is being fetched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchReason {
    /// Path has no record entry
    New,
    /// Last attempt for this path failed
    Retry,
    /// Recorded content identifier differs from the remote one
    Changed,
}

/// Outcome of the decision for one candidate file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Fetch(FetchReason),
    /// Recorded identifier matches the remote one
    SkipCurrent,
    /// Path is configured as excluded for its repository
    SkipExcluded,
}

impl Decision {
    pub fn is_fetch(&self) -> bool {
        matches!(self, Decision::Fetch(_))
    }
}

/// Full decision for `path` in `repo`, including the exclusion check
pub fn decide(
    exclusions: &ExclusionConfig,
    repo: &RepoId,
    path: &str,
    content_id: &str,
    record: &ChangeRecord,
) -> Decision {
    if exclusions.is_excluded(repo, path) {
        return Decision::SkipExcluded;
    }

    decide_change(path, content_id, record)
}

/// Change detection alone: compare `content_id` against the recorded status
pub fn decide_change(path: &str, content_id: &str, record: &ChangeRecord) -> Decision {
    match record.get(path) {
        None => Decision::Fetch(FetchReason::New),
        Some(RecordEntry::Failed) => Decision::Fetch(FetchReason::Retry),
        Some(RecordEntry::Synced(recorded)) if recorded != content_id => {
            Decision::Fetch(FetchReason::Changed)
        }
        Some(RecordEntry::Synced(_)) => Decision::SkipCurrent,
    }
}
