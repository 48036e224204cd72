use std::sync::Arc;

use diun_tracker_lib::{Clock, UpdateMap};
use tokio::sync::Mutex;
use tracing::warn;

use super::store::{StoreError, UpdateStore};

/// Shared application state for the HTTP server.
pub struct AppState {
    /// Backend holding the update document.
    pub store: Arc<dyn UpdateStore>,
    /// Source of `detected_at` stamps.
    pub clock: Arc<dyn Clock>,
    /// Held across a webhook's load-modify-save so concurrent notifications
    /// cannot overwrite each other. Readers do not take it.
    pub write_lock: Mutex<()>,
}

impl AppState {
    pub fn new(store: Arc<dyn UpdateStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            write_lock: Mutex::new(()),
        }
    }

    /// Load the current map. A document that vanished after startup reads as
    /// empty; the next webhook save recreates it.
    pub async fn load_updates(&self) -> Result<UpdateMap, StoreError> {
        match self.store.load().await {
            Err(StoreError::NotFound { path }) => {
                warn!(path = %path.display(), "update document missing, treating as empty");
                Ok(UpdateMap::new())
            }
            other => other,
        }
    }
}
