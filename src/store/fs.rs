use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use crate::store::{BlockStore, WalkStep};

/// Filesystem-backed block archive store.
///
/// Object names are file names relative to the root directory, visited in
/// ascending lexical order to match the listing order of a bucket store.
#[derive(Debug)]
pub struct FsBlockStore {
    root: PathBuf,
}

impl FsBlockStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            anyhow::bail!("Block store directory not found: {}", root.display());
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Object names are '/'-joined paths relative to the root, so shard
    /// stores laid out as `shards-<size>/<file>` list like a bucket would.
    fn sorted_names(&self, prefix: &str) -> Result<Vec<String>> {
        let mut names = Vec::new();
        self.collect_names(&self.root, "", prefix, &mut names)?;
        names.sort();
        Ok(names)
    }

    fn collect_names(
        &self,
        dir: &Path,
        relative: &str,
        prefix: &str,
        names: &mut Vec<String>,
    ) -> Result<()> {
        let entries = fs::read_dir(dir)
            .with_context(|| format!("Failed to list block store at {}", dir.display()))?;

        for entry in entries {
            let entry = entry.context("Failed to read store directory entry")?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let object_name = if relative.is_empty() {
                name
            } else {
                format!("{relative}/{name}")
            };

            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                // Only descend where the subtree can still match the prefix.
                let subtree = format!("{object_name}/");
                if subtree.starts_with(prefix) || prefix.starts_with(&subtree) {
                    self.collect_names(&entry.path(), &object_name, prefix, names)?;
                }
            } else if file_type.is_file() && object_name.starts_with(prefix) {
                names.push(object_name);
            }
        }
        Ok(())
    }
}

impl BlockStore for FsBlockStore {
    fn walk(
        &self,
        prefix: &str,
        start_after: &str,
        visit: &mut dyn FnMut(&str) -> WalkStep,
    ) -> Result<()> {
        let names = self.sorted_names(prefix)?;
        debug!(count = names.len(), prefix, "walking block store listing");

        for name in &names {
            if !start_after.is_empty() && name.as_str() <= start_after {
                continue;
            }
            if visit(name) == WalkStep::Stop {
                break;
            }
        }
        Ok(())
    }
}
