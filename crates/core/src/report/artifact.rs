use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tokio::fs;

/// Errors from storing or loading report artifacts.
#[derive(Debug, Error)]
pub enum ArtifactError {
    /// Ticket identifier cannot be used as a file name.
    #[error("Invalid artifact name: {0}")]
    InvalidName(String),

    #[error("Failed to create directory: {path}")]
    DirectoryCreationFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write artifact: {path}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read artifact: {path}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Durable home for rendered reports.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Store the artifact of a ticket, replacing any previous one, and return
    /// the handle to record on the report.
    async fn store(
        &self,
        ticket_id: &str,
        extension: &str,
        bytes: &[u8],
    ) -> Result<String, ArtifactError>;

    /// Load an artifact by handle. `None` if it no longer exists.
    async fn load(&self, handle: &str) -> Result<Option<Vec<u8>>, ArtifactError>;
}

/// Stores artifacts as `<dir>/<ticket_id>.<ext>`.
///
/// Writes go to a temporary file in the same directory and are renamed into
/// place, so a reader never sees a half-written report.
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    dir: PathBuf,
}

impl FsArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file_name(ticket_id: &str, extension: &str) -> Result<String, ArtifactError> {
        let valid = |s: &str| {
            !s.is_empty()
                && s
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        };
        if !valid(ticket_id) {
            return Err(ArtifactError::InvalidName(ticket_id.to_string()));
        }
        if !valid(extension) {
            return Err(ArtifactError::InvalidName(extension.to_string()));
        }
        Ok(format!("{}.{}", ticket_id, extension))
    }
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn store(
        &self,
        ticket_id: &str,
        extension: &str,
        bytes: &[u8],
    ) -> Result<String, ArtifactError> {
        let destination = self.dir.join(Self::file_name(ticket_id, extension)?);

        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| ArtifactError::DirectoryCreationFailed {
                path: self.dir.clone(),
                source: e,
            })?;

        let temp = self
            .dir
            .join(format!(".{}.{}.tmp", ticket_id, uuid::Uuid::new_v4()));

        if let Err(e) = fs::write(&temp, bytes).await {
            let _ = fs::remove_file(&temp).await;
            return Err(ArtifactError::WriteFailed {
                path: temp,
                source: e,
            });
        }

        if let Err(e) = fs::rename(&temp, &destination).await {
            let _ = fs::remove_file(&temp).await;
            return Err(ArtifactError::WriteFailed {
                path: destination,
                source: e,
            });
        }

        tracing::debug!(path = %destination.display(), bytes = bytes.len(), "Stored artifact");
        Ok(destination.to_string_lossy().into_owned())
    }

    async fn load(&self, handle: &str) -> Result<Option<Vec<u8>>, ArtifactError> {
        match fs::read(handle).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ArtifactError::ReadFailed {
                path: PathBuf::from(handle),
                source: e,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_store_and_load() {
        let temp = TempDir::new().unwrap();
        let store = FsArtifactStore::new(temp.path().join("relatorios"));

        let handle = store.store("RAC0001", "txt", b"first").await.unwrap();
        assert!(handle.ends_with("RAC0001.txt"));
        assert_eq!(store.load(&handle).await.unwrap(), Some(b"first".to_vec()));
    }

    #[tokio::test]
    async fn test_store_overwrites_same_ticket() {
        let temp = TempDir::new().unwrap();
        let store = FsArtifactStore::new(temp.path());

        let first = store.store("RAC0001", "txt", b"first").await.unwrap();
        let second = store.store("RAC0001", "txt", b"second").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(store.load(&second).await.unwrap(), Some(b"second".to_vec()));

        // No temporary files left behind.
        let entries = std::fs::read_dir(temp.path()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[tokio::test]
    async fn test_load_missing_is_none() {
        let temp = TempDir::new().unwrap();
        let store = FsArtifactStore::new(temp.path());
        let missing = temp.path().join("RAC9999.txt");

        assert_eq!(store.load(&missing.to_string_lossy()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_rejects_path_like_names() {
        let temp = TempDir::new().unwrap();
        let store = FsArtifactStore::new(temp.path());

        assert!(matches!(
            store.store("../RAC0001", "txt", b"x").await,
            Err(ArtifactError::InvalidName(_))
        ));
        assert!(matches!(
            store.store("RAC0001", "", b"x").await,
            Err(ArtifactError::InvalidName(_))
        ));
    }
}
