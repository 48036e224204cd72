pub mod file;
pub mod memory;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use diun_tracker_lib::UpdateMap;
use thiserror::Error;

use super::config::{StorageBackend, StorageConfig};

pub use self::file::FileStore;
pub use self::memory::MemoryStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("update document {} does not exist", .path.display())]
    NotFound { path: PathBuf },

    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to encode update document: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Whole-document storage for the update map. Every save replaces the
/// previous document; there is no partial update.
#[async_trait]
pub trait UpdateStore: Send + Sync {
    /// Create an empty document if none exists yet.
    async fn init(&self) -> Result<(), StoreError>;

    async fn load(&self) -> Result<UpdateMap, StoreError>;

    async fn save(&self, updates: &UpdateMap) -> Result<(), StoreError>;

    /// Where the document lives, for log lines.
    fn describe(&self) -> String;
}

/// Build the backend selected in the configuration.
pub fn open_store(config: &StorageConfig) -> Arc<dyn UpdateStore> {
    match config.backend {
        StorageBackend::File => Arc::new(FileStore::new(&config.path)),
        StorageBackend::Memory => Arc::new(MemoryStore::new()),
    }
}
