//! Archive sinks for compressed context and research reports.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::error::EngineError;

/// External store for archived content.
///
/// Paths are relative, `/`-separated identifiers. A write replaces any
/// previous content at the same path as a whole.
#[async_trait]
pub trait ArchiveSink: Send + Sync {
    /// Stores `content` at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Archive`] if the content could not be stored.
    async fn write(&self, path: &str, content: &str) -> Result<(), EngineError>;

    /// Reads the content at `path`, or `None` if nothing was written there.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Archive`] on I/O failures.
    async fn read(&self, path: &str) -> Result<Option<String>, EngineError>;
}

/// Archive kept in memory for the lifetime of the value.
#[derive(Debug, Default)]
pub struct MemoryArchive {
    files: Mutex<HashMap<String, String>>,
}

impl MemoryArchive {
    /// Creates an empty archive.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored paths.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Returns `true` if nothing has been written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ArchiveSink for MemoryArchive {
    async fn write(&self, path: &str, content: &str) -> Result<(), EngineError> {
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.to_string(), content.to_string());
        Ok(())
    }

    async fn read(&self, path: &str) -> Result<Option<String>, EngineError> {
        Ok(self
            .files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .cloned())
    }
}

/// Archive rooted at a filesystem directory.
///
/// Writes go to a temporary sibling file that is renamed into place, so a
/// reader never observes a partially written archive.
#[derive(Debug, Clone)]
pub struct FsArchive {
    root: PathBuf,
}

impl FsArchive {
    /// Creates an archive under `root`. The directory is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, EngineError> {
        let relative = Path::new(path);
        let safe = !path.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(EngineError::Archive {
                path: path.to_string(),
                message: "archive paths must be relative and must not contain '..'".to_string(),
            });
        }
        Ok(self.root.join(relative))
    }
}

fn io_error(path: &str, e: &std::io::Error) -> EngineError {
    EngineError::Archive {
        path: path.to_string(),
        message: e.to_string(),
    }
}

#[async_trait]
impl ArchiveSink for FsArchive {
    async fn write(&self, path: &str, content: &str) -> Result<(), EngineError> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error(path, &e))?;
        }

        let mut tmp = target.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, content)
            .await
            .map_err(|e| io_error(path, &e))?;
        tokio::fs::rename(&tmp, &target)
            .await
            .map_err(|e| io_error(path, &e))
    }

    async fn read(&self, path: &str) -> Result<Option<String>, EngineError> {
        let target = self.resolve(path)?;
        match tokio::fs::read_to_string(&target).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(path, &e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_archive_roundtrip() {
        let archive = MemoryArchive::new();
        assert!(archive.is_empty());
        archive
            .write("a/b.json", "[]")
            .await
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(
            archive.read("a/b.json").await.ok().flatten().as_deref(),
            Some("[]")
        );
        assert_eq!(archive.read("missing").await.ok().flatten(), None);
    }

    #[tokio::test]
    async fn test_fs_archive_writes_nested_paths() {
        let dir = tempfile::tempdir().unwrap_or_else(|_| unreachable!());
        let archive = FsArchive::new(dir.path());
        archive
            .write("research/t1/report.md", "# Report")
            .await
            .unwrap_or_else(|_| unreachable!());

        let on_disk = std::fs::read_to_string(dir.path().join("research/t1/report.md"))
            .unwrap_or_default();
        assert_eq!(on_disk, "# Report");
        assert!(!dir.path().join("research/t1/report.md.tmp").exists());
        assert_eq!(
            archive.read("research/t1/report.md").await.ok().flatten().as_deref(),
            Some("# Report")
        );
    }

    #[tokio::test]
    async fn test_fs_archive_rejects_escaping_paths() {
        let dir = tempfile::tempdir().unwrap_or_else(|_| unreachable!());
        let archive = FsArchive::new(dir.path());
        assert!(archive.write("../escape.txt", "x").await.is_err());
        assert!(archive.write("/etc/passwd", "x").await.is_err());
        assert!(archive.read("").await.is_err());
    }

    #[tokio::test]
    async fn test_fs_archive_missing_file_reads_none() {
        let dir = tempfile::tempdir().unwrap_or_else(|_| unreachable!());
        let archive = FsArchive::new(dir.path());
        assert_eq!(archive.read("nope.json").await.ok().flatten(), None);
    }
}
