//! In-memory artifact store for testing.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::report::{ArtifactError, ArtifactStore};

/// Artifact store backed by a map. Handles look like `memory://RAC0001.txt`.
#[derive(Debug, Default)]
pub struct MemoryArtifactStore {
    artifacts: Arc<RwLock<HashMap<String, Vec<u8>>>>,
    fail_store: Arc<RwLock<bool>>,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `store` call fail.
    pub async fn set_fail_store(&self, fail: bool) {
        *self.fail_store.write().await = fail;
    }

    /// Drop an artifact, as if it had been deleted from disk.
    pub async fn remove(&self, handle: &str) -> bool {
        self.artifacts.write().await.remove(handle).is_some()
    }

    pub async fn len(&self) -> usize {
        self.artifacts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.artifacts.read().await.is_empty()
    }
}

#[async_trait]
impl ArtifactStore for MemoryArtifactStore {
    async fn store(
        &self,
        ticket_id: &str,
        extension: &str,
        bytes: &[u8],
    ) -> Result<String, ArtifactError> {
        if *self.fail_store.read().await {
            return Err(ArtifactError::WriteFailed {
                path: format!("memory://{}.{}", ticket_id, extension).into(),
                source: std::io::Error::new(std::io::ErrorKind::Other, "mock storage failure"),
            });
        }

        let handle = format!("memory://{}.{}", ticket_id, extension);
        self.artifacts
            .write()
            .await
            .insert(handle.clone(), bytes.to_vec());
        Ok(handle)
    }

    async fn load(&self, handle: &str) -> Result<Option<Vec<u8>>, ArtifactError> {
        Ok(self.artifacts.read().await.get(handle).cloned())
    }
}
