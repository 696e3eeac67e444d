use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::storage::{SeenItemId, SeenItemStore, Storage};

/// Seen items kept as a JSON array, rewritten in full on every save.
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

// Older files stored an object keyed by signature with price/timestamp
// values. Only the keys matter now.
#[derive(Deserialize)]
#[serde(untagged)]
enum SeenFile {
    List(Vec<SeenItemId>),
    Legacy(Map<String, Value>),
}

fn parse_snapshot(content: &str) -> Result<Vec<SeenItemId>> {
    let parsed: SeenFile = serde_json::from_str(content).context("Invalid seen items JSON")?;
    Ok(match parsed {
        SeenFile::List(ids) => ids,
        SeenFile::Legacy(map) => map.into_iter().map(|(id, _)| id).collect(),
    })
}

#[async_trait]
impl Storage for JsonFileStorage {
    async fn load(&self, capacity: usize) -> SeenItemStore {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No seen items file at {}, starting fresh", self.path.display());
                return SeenItemStore::new(capacity);
            }
            Err(e) => {
                warn!(
                    "Could not read {}: {}. Starting with empty seen items.",
                    self.path.display(),
                    e
                );
                return SeenItemStore::new(capacity);
            }
        };

        match parse_snapshot(&content) {
            Ok(ids) => {
                let store = SeenItemStore::load(ids, capacity);
                info!("Loaded {} seen items from {}", store.len(), self.path.display());
                store
            }
            Err(e) => {
                warn!(
                    "{:#} in {}. Starting with empty seen items.",
                    e,
                    self.path.display()
                );
                SeenItemStore::new(capacity)
            }
        }
    }

    async fn save(&self, store: &SeenItemStore) -> Result<()> {
        let body = serde_json::to_string_pretty(&store.snapshot())?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let result = async {
            tokio::fs::write(&tmp, body.as_bytes())
                .await
                .with_context(|| format!("Failed to write {}", tmp.display()))?;
            tokio::fs::rename(&tmp, &self.path)
                .await
                .with_context(|| format!("Failed to replace {}", self.path.display()))
        }
        .await;

        match &result {
            Ok(()) => info!("Saved {} seen items to {}", store.len(), self.path.display()),
            Err(e) => error!("Failed to save seen items: {:#}", e),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;
    use tokio_test::{assert_err, assert_ok};

    #[tokio::test]
    async fn missing_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let storage = JsonFileStorage::new(dir.path().join("seen_items.json"));

        let store = storage.load(10).await;
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn corrupt_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("seen_items.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = JsonFileStorage::new(&path).load(10).await;
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn wrong_shape_loads_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("seen_items.json");
        std::fs::write(&path, "[1, 2, 3]").unwrap();

        let store = JsonFileStorage::new(&path).load(10).await;
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let dir = TempDir::new().unwrap();
        let storage = JsonFileStorage::new(dir.path().join("seen_items.json"));

        let mut store = SeenItemStore::new(10);
        for id in ["a1", "b2", "c3"] {
            store.record(id.to_string());
        }
        assert_ok!(storage.save(&store).await);

        let restored = storage.load(10).await;
        assert_eq!(restored.snapshot(), store.snapshot());
        assert!(!dir.path().join("seen_items.json.tmp").exists());
    }

    #[tokio::test]
    async fn load_clamps_to_capacity() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("seen_items.json");
        std::fs::write(&path, r#"["a", "b", "c", "d"]"#).unwrap();

        let store = JsonFileStorage::new(&path).load(2).await;
        assert_eq!(store.snapshot(), vec!["c".to_string(), "d".to_string()]);
    }

    #[tokio::test]
    async fn reads_legacy_object_format() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("seen_items.json");
        std::fs::write(
            &path,
            r#"{
                "f00d": {"price": 9800, "timestamp": "2024-05-01 10:00:00"},
                "beef": {"price": 12000, "timestamp": "2024-05-01 10:05:00"}
            }"#,
        )
        .unwrap();

        let store = JsonFileStorage::new(&path).load(10).await;
        assert_eq!(store.snapshot(), vec!["f00d".to_string(), "beef".to_string()]);
    }

    #[tokio::test]
    async fn save_into_missing_directory_fails() {
        let dir = TempDir::new().unwrap();
        let storage = JsonFileStorage::new(dir.path().join("nope").join("seen_items.json"));

        assert_err!(storage.save(&SeenItemStore::new(1)).await);
    }
}
