//! Change record persistence
//!
//! A change record maps each repository-relative path to the outcome of its last
//! synchronization: the content identifier that was written, or a failure marker
//! that forces a re-fetch on the next run.
//!
//! All records live in the one history file, keyed by repository:
//!
//! ```json
//! {
//!     "repositories": {
//!         "owner/project": {
//!             "files": {
//!                 "README.md": "4b825dc642cb6eb9a060e54bf8d69288fbee4904",
//!                 "docs/broken.md": null
//!             }
//!         }
//!     }
//! }
//! ```
//!
//! Failures are stored as `null`, so no content identifier can ever be mistaken
//! for the failure marker. Older history files hold a single top-level `files`
//! map shared by every repository and use the string `"ERROR"` for failures; both
//! are still read, and a repository with no entry of its own starts from that map.

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, HashSet};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::repo::RepoId;

/// String marker used for failures by older record files
const LEGACY_ERROR_MARKER: &str = "ERROR";

/// What happens to entries for paths that are no longer listed upstream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StalePolicy {
    /// Keep them; they are never consulted again unless the path reappears
    #[default]
    Retain,
    /// Remove them after a successful listing
    Prune,
}

/// Status of one path in the change record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordEntry {
    /// Last attempt succeeded and wrote content with this identifier
    Synced(String),
    /// Last attempt failed
    Failed,
}

impl RecordEntry {
    pub fn content_id(&self) -> Option<&str> {
        match self {
            RecordEntry::Synced(id) => Some(id),
            RecordEntry::Failed => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, RecordEntry::Failed)
    }
}

impl Serialize for RecordEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            RecordEntry::Synced(id) => serializer.serialize_str(id),
            RecordEntry::Failed => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for RecordEntry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Ok(match Option::<String>::deserialize(deserializer)? {
            None => RecordEntry::Failed,
            Some(id) if id == LEGACY_ERROR_MARKER => RecordEntry::Failed,
            Some(id) => RecordEntry::Synced(id),
        })
    }
}

/// In-memory change record for one repository
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    #[serde(default)]
    files: BTreeMap<String, RecordEntry>,
}

impl ChangeRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &str) -> Option<&RecordEntry> {
        self.files.get(path)
    }

    /// Record a successful write of `content_id` at `path`
    pub fn mark_synced(&mut self, path: impl Into<String>, content_id: impl Into<String>) {
        self.files
            .insert(path.into(), RecordEntry::Synced(content_id.into()));
    }

    /// Record a failed attempt at `path`
    pub fn mark_failed(&mut self, path: impl Into<String>) {
        self.files.insert(path.into(), RecordEntry::Failed);
    }

    /// Drop every entry whose path is not in `live`, returning the removed paths
    pub fn prune(&mut self, live: &HashSet<&str>) -> Vec<String> {
        let stale: Vec<String> = self
            .files
            .keys()
            .filter(|path| !live.contains(path.as_str()))
            .cloned()
            .collect();

        for path in &stale {
            self.files.remove(path);
        }

        stale
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RecordEntry)> {
        self.files.iter().map(|(path, entry)| (path.as_str(), entry))
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Contents of the history file: one change record per repository
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFile {
    /// Unscoped map written by older versions
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    files: BTreeMap<String, RecordEntry>,
    #[serde(default)]
    repositories: BTreeMap<String, ChangeRecord>,
}

impl RecordFile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record for `repo`, seeded from the unscoped map if it has none yet
    pub fn record(&self, repo: &RepoId) -> ChangeRecord {
        if let Some(record) = self.repositories.get(repo.as_str()) {
            return record.clone();
        }

        if !self.files.is_empty() {
            debug!(
                "Seeding record for {} from {} unscoped entries",
                repo,
                self.files.len()
            );
        }

        ChangeRecord {
            files: self.files.clone(),
        }
    }

    /// Replace the record stored for `repo`
    pub fn set_record(&mut self, repo: &RepoId, record: ChangeRecord) {
        self.repositories.insert(repo.as_str().to_string(), record);
    }

    /// Whether `repo` has a record of its own
    pub fn contains(&self, repo: &RepoId) -> bool {
        self.repositories.contains_key(repo.as_str())
    }

    /// Number of repositories with a record of their own
    pub fn len(&self) -> usize {
        self.repositories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.repositories.is_empty() && self.files.is_empty()
    }
}

/// Reads and writes the history file at a fixed location
#[derive(Debug, Clone)]
pub struct RecordStore {
    locator: PathBuf,
}

impl RecordStore {
    pub fn new(locator: impl Into<PathBuf>) -> Self {
        Self {
            locator: locator.into(),
        }
    }

    pub fn locator(&self) -> &Path {
        &self.locator
    }

    /// Load the history file, falling back to an empty one.
    ///
    /// A missing file is the normal first-run case. Unreadable or corrupt files
    /// are reported as warnings and never fail the run.
    pub fn load(&self) -> RecordFile {
        match self.try_load() {
            Ok(history) => {
                debug!(
                    "Loaded records for {} repositories from {}",
                    history.len(),
                    self.locator.display()
                );
                history
            }
            Err(e) => {
                let not_found = e
                    .downcast_ref::<std::io::Error>()
                    .is_some_and(|io| io.kind() == ErrorKind::NotFound);

                if not_found {
                    info!(
                        "No change record at {}, starting fresh",
                        self.locator.display()
                    );
                } else {
                    warn!("{:#}; starting with an empty record", e);
                }

                RecordFile::new()
            }
        }
    }

    /// Load the history file, surfacing I/O and parse errors
    pub fn try_load(&self) -> Result<RecordFile> {
        let content = std::fs::read_to_string(&self.locator)
            .with_context(|| format!("Failed to read change record: {}", self.locator.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse change record: {}", self.locator.display()))
    }

    /// Overwrite the history file with `history`.
    ///
    /// The whole file is written to a sibling temporary file and renamed into
    /// place, so readers never observe a partial write.
    pub fn save(&self, history: &RecordFile) -> Result<()> {
        if let Some(parent) = self.locator.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create record directory: {}", parent.display())
                })?;
            }
        }

        let mut content = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut content, formatter);
        history
            .serialize(&mut serializer)
            .context("Failed to serialize change record")?;
        content.push(b'\n');

        let mut temp_name = self.locator.as_os_str().to_owned();
        temp_name.push(".tmp");
        let temp_path = PathBuf::from(temp_name);

        std::fs::write(&temp_path, &content)
            .with_context(|| format!("Failed to write change record: {}", temp_path.display()))?;

        std::fs::rename(&temp_path, &self.locator).with_context(|| {
            format!("Failed to replace change record: {}", self.locator.display())
        })?;

        debug!(
            "Saved records for {} repositories to {}",
            history.len(),
            self.locator.display()
        );
        Ok(())
    }
}
