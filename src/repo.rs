//! Repository identifiers
//!
//! A repository is addressed as `owner/name`. Users may pass either that form or a
//! full GitHub URL; both normalize to the same identifier, which then keys the API
//! requests, the exclusion configuration and the output directory.

use anyhow::{anyhow, Result};
use std::fmt;
use std::str::FromStr;

/// Host prefixes stripped from user input, longest first
const HOST_PREFIXES: &[&str] = &[
    "https://github.com/",
    "http://github.com/",
    "github.com/",
];

/// Remove a leading GitHub host URL, if present
pub fn strip_host_prefix(input: &str) -> &str {
    HOST_PREFIXES
        .iter()
        .find_map(|prefix| input.strip_prefix(prefix))
        .unwrap_or(input)
}

/// Normalized `owner/name` repository identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RepoId(String);

impl RepoId {
    /// Normalize a repository identifier or URL.
    ///
    /// Strips a known host prefix, a trailing `/` and a trailing `.git`.
    pub fn parse(input: &str) -> Result<Self> {
        let id = strip_host_prefix(input.trim()).trim_end_matches('/');
        let id = id.strip_suffix(".git").unwrap_or(id);

        if id.is_empty() {
            return Err(anyhow!("Empty repository identifier: {:?}", input));
        }

        Ok(Self(id.to_string()))
    }

    /// Identifier as used in API routes (`owner/name`)
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Repository name without its owner; names the output subdirectory
    pub fn basename(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }
}

impl FromStr for RepoId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RepoId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
