//! Writing fetched files into the output tree
//!
//! Files land at `<output root>/<repository name>/<repository-relative path>`.
//! The owner part of the repository identifier is dropped.

use anyhow::{anyhow, Context, Result};
use std::path::{Component, Path, PathBuf};
use tracing::debug;

use crate::repo::RepoId;

/// Local destination for `path` of `repo` under `output_root`.
///
/// Rejects paths that are empty, absolute, or step outside the repository
/// directory.
pub fn output_path(output_root: &Path, repo: &RepoId, path: &str) -> Result<PathBuf> {
    let relative = Path::new(path);

    if path.is_empty()
        || relative
            .components()
            .any(|component| !matches!(component, Component::Normal(_)))
    {
        return Err(anyhow!("Refusing to write unsafe path: {:?}", path));
    }

    Ok(output_root.join(repo.basename()).join(relative))
}

/// Write `content` for `path` of `repo`, creating directories as needed and
/// replacing any existing file. Returns the written location.
pub async fn materialize(
    output_root: &Path,
    repo: &RepoId,
    path: &str,
    content: &[u8],
) -> Result<PathBuf> {
    let target = output_path(output_root, repo, path)?;

    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    tokio::fs::write(&target, content)
        .await
        .with_context(|| format!("Failed to save file: {}", target.display()))?;

    debug!("Wrote {} bytes to {}", content.len(), target.display());
    Ok(target)
}
