//! Filesystem-backed document storage.
//!
//! Serves source documents from a directory tree; storage paths are
//! interpreted relative to the store root.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::error::StoreError;
use crate::traits::{DocumentStore, StoreResult};

/// Document store rooted at a local directory.
pub struct FsDocumentStore {
    root: PathBuf,
}

impl FsDocumentStore {
    /// Create a store rooted at `root`. The directory must already exist.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn document_path(&self, storage_path: &str) -> PathBuf {
        self.root.join(storage_path)
    }
}

#[async_trait]
impl DocumentStore for FsDocumentStore {
    async fn download(&self, storage_path: &str) -> StoreResult<Vec<u8>> {
        let path = self.document_path(storage_path);
        debug!(path = %path.display(), "reading source document");
        tokio::fs::read(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StoreError::DocumentNotFound(storage_path.to_string())
            } else {
                StoreError::Io(e)
            }
        })
    }
}
