use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use diun_tracker_lib::UpdateMap;
use tracing::info;

use super::{StoreError, UpdateStore};

/// Update map persisted as one pretty-printed JSON document.
///
/// Saves go through a sibling `.tmp` file that is renamed over the target,
/// so readers see either the old or the new document.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "updates.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl UpdateStore for FileStore {
    async fn init(&self) -> Result<(), StoreError> {
        let exists = tokio::fs::try_exists(&self.path)
            .await
            .map_err(|source| StoreError::Read {
                path: self.path.clone(),
                source,
            })?;
        if exists {
            return Ok(());
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| StoreError::Write {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }
        info!(path = %self.path.display(), "creating empty update document");
        self.save(&UpdateMap::new()).await
    }

    async fn load(&self) -> Result<UpdateMap, StoreError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NotFound {
                    path: self.path.clone(),
                })
            }
            Err(source) => {
                return Err(StoreError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        serde_json::from_slice(&bytes).map_err(|source| StoreError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    async fn save(&self, updates: &UpdateMap) -> Result<(), StoreError> {
        let body = serde_json::to_vec_pretty(updates)?;
        let temp = self.temp_path();

        tokio::fs::write(&temp, &body)
            .await
            .map_err(|source| StoreError::Write {
                path: temp.clone(),
                source,
            })?;
        tokio::fs::rename(&temp, &self.path)
            .await
            .map_err(|source| StoreError::Write {
                path: self.path.clone(),
                source,
            })
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use diun_tracker_lib::record_update;
    use serde_json::{json, Value};

    fn sample_updates() -> UpdateMap {
        let mut updates = UpdateMap::new();
        for (image, at) in [("repo/a:1", 1_700_000_000_000_i64), ("repo/b:2", 1_700_000_000_500)] {
            let Value::Object(payload) = json!({
                "image": image,
                "status": "update",
                "metadata": {"ctn_names": "web"}
            }) else {
                unreachable!()
            };
            record_update(&mut updates, &payload, at);
        }
        updates
    }

    #[tokio::test]
    async fn test_init_creates_empty_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("updates.json");
        let store = FileStore::new(&path);

        store.init().await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.trim(), "{}");
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_init_keeps_existing_document() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("updates.json"));
        store.save(&sample_updates()).await.unwrap();

        store.init().await.unwrap();

        assert_eq!(store.load().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("updates.json"));
        let updates = sample_updates();

        store.save(&updates).await.unwrap();

        assert_eq!(store.load().await.unwrap(), updates);
        assert!(!dir.path().join("updates.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_save_writes_indented_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("updates.json");
        let store = FileStore::new(&path);
        store.save(&sample_updates()).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("\n  \"repo/a:1\": {"));
        let doc: Value = serde_json::from_str(&content).unwrap();
        assert_eq!(doc["repo/b:2"]["detected_at"], json!(1_700_000_000_500_i64));
    }

    #[tokio::test]
    async fn test_load_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("missing.json"));
        assert!(matches!(
            store.load().await,
            Err(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_load_malformed_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("updates.json");
        std::fs::write(&path, "{\"a\": ").unwrap();
        let store = FileStore::new(&path);

        let err = store.load().await.unwrap_err();
        assert!(matches!(err, StoreError::Parse { .. }));
        assert!(err.to_string().contains("updates.json"));
    }

    #[tokio::test]
    async fn test_save_into_missing_directory_is_write_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("absent").join("updates.json"));
        assert!(matches!(
            store.save(&UpdateMap::new()).await,
            Err(StoreError::Write { .. })
        ));
    }
}
