//! Known-publishers state file.
//!
//! The [`StateStore`] reads a flat, line-delimited set of publisher
//! identifiers used by the worker for dedupe/resume across runs.
//!
//! **Access rules:**
//! - The host reads the file once at startup via [`StateStore::load`].
//! - A missing file is the first-run condition and yields an empty set.
//! - The host never writes the file during a run; [`StateStore::save`] exists
//!   for tooling that seeds or rewrites the state explicitly.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use igniter_shared::{IgniterError, KnownPublishers, Result};
use tracing::{debug, error, info};

/// Handle to the known-publishers file.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the set. Absence is not an error; any other failure is fatal.
    pub async fn load(&self) -> Result<KnownPublishers> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => {
                let set = parse(&content);
                info!(path = %self.path.display(), count = set.len(), "loaded known publishers");
                Ok(set)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "known publishers file not found, starting empty");
                Ok(KnownPublishers::new())
            }
            Err(e) => {
                error!(path = %self.path.display(), error = %e, "failed to read known publishers");
                Err(IgniterError::persistence(&self.path, e))
            }
        }
    }

    /// Write the set, one identifier per line, in load order.
    pub async fn save(&self, set: &KnownPublishers) -> Result<()> {
        tokio::fs::write(&self.path, render(set))
            .await
            .map_err(|e| IgniterError::persistence(&self.path, e))?;
        debug!(path = %self.path.display(), count = set.len(), "saved known publishers");
        Ok(())
    }
}

/// Load the set stored at `path`.
pub async fn load(path: impl Into<PathBuf>) -> Result<KnownPublishers> {
    StateStore::new(path).load().await
}

/// Parse file contents: each non-empty line is one identifier.
pub fn parse(content: &str) -> KnownPublishers {
    content
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter(|line| !line.is_empty())
        .collect()
}

fn render(set: &KnownPublishers) -> String {
    let mut out = String::new();
    for id in set.iter() {
        out.push_str(id);
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("igniter-{name}-{}", Uuid::now_v7()))
    }

    #[test]
    fn parse_collapses_duplicates_and_trailing_newline() {
        let set = parse("a\nb\nb\nc\n");
        assert_eq!(set.len(), 3);
        assert_eq!(set, ["a", "b", "c"].into_iter().collect());
    }

    #[test]
    fn parse_handles_crlf_and_blank_lines() {
        let set = parse("x\r\n\r\ny\n\n");
        assert_eq!(set.iter().collect::<Vec<_>>(), vec!["x", "y"]);
    }

    #[tokio::test]
    async fn missing_file_is_empty_set() {
        let set = load(temp_path("absent")).await.unwrap();
        assert!(set.is_empty());
    }

    #[tokio::test]
    async fn load_reads_file() {
        let path = temp_path("known");
        std::fs::write(&path, "a\nb\nb\nc\n").unwrap();

        let set = StateStore::new(&path).load().await.unwrap();
        assert_eq!(set.iter().collect::<Vec<_>>(), vec!["a", "b", "c"]);

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn unreadable_path_is_persistence_error() {
        // A directory cannot be read as a text file.
        let dir = temp_path("dir");
        std::fs::create_dir_all(&dir).unwrap();

        let err = StateStore::new(&dir).load().await.unwrap_err();
        assert!(matches!(err, IgniterError::Persistence { .. }));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn save_then_load_preserves_order() {
        let path = temp_path("saved");
        let store = StateStore::new(&path);
        let set: KnownPublishers = ["z", "y", "x"].into_iter().collect();

        store.save(&set).await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "z\ny\nx\n");
        assert_eq!(store.load().await.unwrap(), set);

        let _ = std::fs::remove_file(&path);
    }
}
