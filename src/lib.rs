//! mdsync - Incremental Markdown documentation sync from GitHub repositories
//!
//! mdsync copies the Markdown files of one or more remote repositories into a
//! local directory tree. A per-repository change record remembers the content
//! identifier of every file it wrote, so repeated runs only fetch what changed
//! and retry what failed.
//!
//! ## Modules
//!
//! - [`config`]: Configuration loading and CLI overrides
//! - [`repo`]: Repository identifier normalization
//! - [`exclusion`]: Per-repository excluded paths
//! - [`record`]: Change record and its on-disk store
//! - [`decision`]: Fetch / skip decisions
//! - [`remote`]: Provider abstraction and tree entries
//! - [`github`]: GitHub API implementation
//! - [`materialize`]: Writing files into the output tree
//! - [`sync`]: The sync engine

pub mod config;
pub mod decision;
pub mod exclusion;
pub mod github;
pub mod materialize;
pub mod record;
pub mod remote;
pub mod repo;
pub mod sync;

pub use config::{CliOverrides, Config};
pub use decision::{decide, Decision, FetchReason};
pub use exclusion::ExclusionConfig;
pub use github::GitHubClient;
pub use record::{ChangeRecord, RecordEntry, RecordFile, RecordStore, StalePolicy};
pub use remote::{FetchStrategy, ObjectKind, RemoteSource, TreeEntry, TreeListing};
pub use repo::RepoId;
pub use sync::{RepoReport, SyncEngine, SyncSummary};
