pub mod fs;

use anyhow::Result;

/// Whether a walk visitor wants more entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkStep {
    Continue,
    /// Halt iteration without error (the dstore `StopIteration` contract).
    Stop,
}

/// A block-archive file store: an ordered listing of object names.
///
/// Implementations must visit names in ascending lexical order; hole scans
/// depend on it.
pub trait BlockStore: Send + Sync + std::fmt::Debug {
    /// Visit every object name under `prefix`, strictly after `start_after`
    /// when non-empty. A `WalkStep::Stop` from the visitor halts the walk
    /// without error.
    fn walk(
        &self,
        prefix: &str,
        start_after: &str,
        visit: &mut dyn FnMut(&str) -> WalkStep,
    ) -> Result<()>;

    /// Materialize up to `limit` object names under `prefix`, in order.
    fn list(&self, prefix: &str, limit: usize) -> Result<Vec<String>> {
        let mut names = Vec::new();
        self.walk(prefix, "", &mut |name| {
            names.push(name.to_string());
            if names.len() >= limit {
                WalkStep::Stop
            } else {
                WalkStep::Continue
            }
        })?;
        Ok(names)
    }
}
