use std::path::{Path, PathBuf};

use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

use crate::app::{ArchiveError, Result};
use crate::config::WriteMode;

/// Persists rendered documents as `<dir>/<post_id>.md`.
#[derive(Debug, Clone)]
pub struct DocumentWriter {
    dir: PathBuf,
    mode: WriteMode,
}

impl DocumentWriter {
    pub fn new(dir: impl Into<PathBuf>, mode: WriteMode) -> Self {
        Self {
            dir: dir.into(),
            mode,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, post_id: i64) -> PathBuf {
        self.dir.join(format!("{}.md", post_id))
    }

    pub async fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir).await?;
        Ok(())
    }

    /// In append mode repeated writes for one post accumulate.
    pub async fn write(&self, post_id: i64, text: &str) -> Result<()> {
        let result = match self.mode {
            WriteMode::Append => self.append(post_id, text).await,
            WriteMode::Replace => self.replace(post_id, text).await,
        };
        result.map_err(|source| ArchiveError::Write { post_id, source })
    }

    async fn append(&self, post_id: i64, text: &str) -> std::io::Result<()> {
        // Dropping the handle closes it on every path
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path_for(post_id))
            .await?;
        file.write_all(text.as_bytes()).await?;
        file.flush().await
    }

    async fn replace(&self, post_id: i64, text: &str) -> std::io::Result<()> {
        let target = self.path_for(post_id);
        let staging = target.with_extension("md.tmp");
        if let Err(e) = stage(&staging, text).await {
            let _ = fs::remove_file(&staging).await;
            return Err(e);
        }
        fs::rename(&staging, &target).await
    }
}

async fn stage(path: &Path, text: &str) -> std::io::Result<()> {
    let mut file = fs::File::create(path).await?;
    file.write_all(text.as_bytes()).await?;
    file.flush().await?;
    file.sync_all().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_append_creates_then_accumulates() {
        let dir = tempfile::tempdir().unwrap();
        let writer = DocumentWriter::new(dir.path(), WriteMode::Append);

        writer.write(7, "one\n").await.unwrap();
        writer.write(7, "two\n").await.unwrap();

        let content = std::fs::read_to_string(dir.path().join("7.md")).unwrap();
        assert_eq!(content, "one\ntwo\n");
    }

    #[tokio::test]
    async fn test_replace_overwrites_without_leftovers() {
        let dir = tempfile::tempdir().unwrap();
        let writer = DocumentWriter::new(dir.path(), WriteMode::Replace);

        writer.write(7, "draft").await.unwrap();
        writer.write(7, "final").await.unwrap();

        assert_eq!(
            std::fs::read_to_string(writer.path_for(7)).unwrap(),
            "final"
        );
        assert!(!dir.path().join("7.md.tmp").exists());
    }

    #[tokio::test]
    async fn test_ensure_dir_creates_nested_path() {
        let dir = tempfile::tempdir().unwrap();
        let writer = DocumentWriter::new(dir.path().join("out").join("posts"), WriteMode::Append);
        writer.ensure_dir().await.unwrap();
        writer.write(1, "x").await.unwrap();
        assert!(writer.dir().join("1.md").exists());
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_failed_staging_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let writer = DocumentWriter::new(dir.path(), WriteMode::Replace);
        let staging = dir.path().join("3.md.tmp");

        // Writes to /dev/full always fail with ENOSPC
        std::os::unix::fs::symlink("/dev/full", &staging).unwrap();
        let err = writer.write(3, "text").await.unwrap_err();

        assert!(matches!(err, ArchiveError::Write { post_id: 3, .. }));
        assert!(std::fs::symlink_metadata(&staging).is_err());
        assert!(!writer.path_for(3).exists());
    }

    #[tokio::test]
    async fn test_storage_failure_names_post() {
        let dir = tempfile::tempdir().unwrap();
        let writer = DocumentWriter::new(dir.path().join("missing"), WriteMode::Append);

        let err = writer.write(9, "x").await.unwrap_err();
        assert!(matches!(err, ArchiveError::Write { post_id: 9, .. }));
        assert!(err.to_string().contains("post 9"));
    }
}
