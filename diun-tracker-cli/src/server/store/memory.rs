use async_trait::async_trait;
use diun_tracker_lib::UpdateMap;
use tokio::sync::RwLock;

use super::{StoreError, UpdateStore};

/// In-process update storage backed by a `RwLock<UpdateMap>`. Lost on exit.
pub struct MemoryStore {
    data: RwLock<UpdateMap>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            data: RwLock::new(UpdateMap::new()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UpdateStore for MemoryStore {
    async fn init(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn load(&self) -> Result<UpdateMap, StoreError> {
        Ok(self.data.read().await.clone())
    }

    async fn save(&self, updates: &UpdateMap) -> Result<(), StoreError> {
        *self.data.write().await = updates.clone();
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
