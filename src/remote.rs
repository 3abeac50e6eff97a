//! Remote repository abstraction
//!
//! The sync engine only needs two things from a hosting provider: a recursive
//! file listing of a repository, and the content of one listed file. Providers
//! implement [`RemoteSource`]; GitHub is the only one today.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::repo::RepoId;

/// Kind of object in a tree listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    /// Regular file
    Blob,
    /// Directory
    Tree,
    /// Submodule reference
    Commit,
    /// Blob holding a symbolic link target rather than file content
    #[serde(skip)]
    Symlink,
    #[serde(other)]
    Other,
}

/// One object from a recursive repository listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    /// Repository-relative path, `/`-separated
    pub path: String,
    pub kind: ObjectKind,
    /// Opaque identifier that changes iff the content changes
    pub content_id: String,
    /// Where the content can be retrieved; absent for objects without content
    pub locator: Option<String>,
}

impl TreeEntry {
    /// Whether this entry is a regular file whose path ends with `extension`.
    ///
    /// The suffix match is case-sensitive.
    pub fn is_candidate(&self, extension: &str) -> bool {
        self.kind == ObjectKind::Blob && self.path.ends_with(extension)
    }
}

/// Result of listing a repository
#[derive(Debug, Clone, Default)]
pub struct TreeListing {
    pub entries: Vec<TreeEntry>,
    /// Provider cut the listing short
    pub truncated: bool,
}

/// How file content is retrieved from the provider
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum FetchStrategy {
    /// API object carrying base64-encoded content
    #[default]
    Blob,
    /// Raw content stream
    Raw,
}

/// A hosting provider the engine can list and fetch from
#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// Provider name for logging
    fn provider_name(&self) -> &'static str;

    /// List every object of `repo` at the default branch.
    ///
    /// Fails as a whole; no partial listing is returned on error.
    async fn list_tree(&self, repo: &RepoId) -> Result<TreeListing>;

    /// Retrieve the exact bytes of one listed file
    async fn fetch(&self, entry: &TreeEntry) -> Result<Vec<u8>>;
}
