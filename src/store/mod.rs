//! Saved export configurations
//!
//! Users keep named [`ExportConfig`]s per data type and reuse them. The
//! [`ConfigStore`] trait is the persistence seam; [`MemoryStore`] keeps
//! everything in process and [`JsonFileStore`] persists to one JSON file:
//!
//! ```text
//! {
//!   "transactions": [ { "id": "...", "name": "Monthly close", ... } ],
//!   "report_summary": [ ... ]
//! }
//! ```

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::debug;
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::model::ExportConfig;

/// A named export configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SavedConfig {
    pub id: Uuid,
    pub name: String,
    pub config: ExportConfig,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
}

impl SavedConfig {
    fn new(name: &str, config: ExportConfig) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            config,
            created_at: Utc::now(),
            last_used_at: None,
        }
    }
}

/// Order for listings: most recently used first, never used last
fn sort_for_listing(configs: &mut [SavedConfig]) {
    configs.sort_by(|a, b| {
        b.last_used_at
            .cmp(&a.last_used_at)
            .then_with(|| b.created_at.cmp(&a.created_at))
            .then_with(|| a.name.cmp(&b.name))
    });
}

fn not_found(data_type: &str, id: Uuid) -> StoreError {
    StoreError::NotFound {
        data_type: data_type.to_string(),
        id: id.to_string(),
    }
}

/// Persistence for saved export configurations
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Save a configuration under `name`
    ///
    /// # Returns
    /// * `Result<SavedConfig>` - The stored entry with its new id
    async fn save(&self, data_type: &str, name: &str, config: ExportConfig) -> Result<SavedConfig>;

    /// Saved configurations for a data type, most recently used first
    async fn list(&self, data_type: &str) -> Result<Vec<SavedConfig>>;

    /// Remove a configuration
    ///
    /// # Errors
    /// Returns `StoreError::NotFound` if no entry has this id.
    async fn delete(&self, data_type: &str, id: Uuid) -> Result<()>;

    /// Stamp a configuration as used now
    ///
    /// # Errors
    /// Returns `StoreError::NotFound` if no entry has this id.
    async fn touch_last_used(&self, data_type: &str, id: Uuid) -> Result<SavedConfig>;
}

/// In-process store
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Vec<SavedConfig>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConfigStore for MemoryStore {
    async fn save(&self, data_type: &str, name: &str, config: ExportConfig) -> Result<SavedConfig> {
        let saved = SavedConfig::new(name, config);
        self.entries
            .write()
            .await
            .entry(data_type.to_string())
            .or_default()
            .push(saved.clone());
        Ok(saved)
    }

    async fn list(&self, data_type: &str) -> Result<Vec<SavedConfig>> {
        let mut configs = self
            .entries
            .read()
            .await
            .get(data_type)
            .cloned()
            .unwrap_or_default();
        sort_for_listing(&mut configs);
        Ok(configs)
    }

    async fn delete(&self, data_type: &str, id: Uuid) -> Result<()> {
        let mut entries = self.entries.write().await;
        let configs = entries
            .get_mut(data_type)
            .ok_or_else(|| not_found(data_type, id))?;
        let before = configs.len();
        configs.retain(|c| c.id != id);
        if configs.len() == before {
            return Err(not_found(data_type, id).into());
        }
        Ok(())
    }

    async fn touch_last_used(&self, data_type: &str, id: Uuid) -> Result<SavedConfig> {
        let mut entries = self.entries.write().await;
        let entry = entries
            .get_mut(data_type)
            .and_then(|configs| configs.iter_mut().find(|c| c.id == id))
            .ok_or_else(|| not_found(data_type, id))?;
        entry.last_used_at = Some(Utc::now());
        Ok(entry.clone())
    }
}

type StoreFile = BTreeMap<String, Vec<SavedConfig>>;

/// Store backed by a single JSON file
///
/// Every operation reads the file, applies the change and writes it back
/// through a temporary file, serialized by an async lock.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> Result<StoreFile> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(StoreFile::new()),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                StoreError::Backend(format!("{}: {e}", self.path.display())).into()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(StoreFile::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, data: &StoreFile) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut bytes = serde_json::to_vec_pretty(data)?;
        bytes.push(b'\n');

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        debug!("Wrote saved configurations to {}", self.path.display());
        Ok(())
    }
}

#[async_trait]
impl ConfigStore for JsonFileStore {
    async fn save(&self, data_type: &str, name: &str, config: ExportConfig) -> Result<SavedConfig> {
        let _guard = self.lock.lock().await;
        let mut data = self.read().await?;
        let saved = SavedConfig::new(name, config);
        data.entry(data_type.to_string())
            .or_default()
            .push(saved.clone());
        self.write(&data).await?;
        Ok(saved)
    }

    async fn list(&self, data_type: &str) -> Result<Vec<SavedConfig>> {
        let _guard = self.lock.lock().await;
        let mut configs = self.read().await?.remove(data_type).unwrap_or_default();
        sort_for_listing(&mut configs);
        Ok(configs)
    }

    async fn delete(&self, data_type: &str, id: Uuid) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut data = self.read().await?;
        let configs = data
            .get_mut(data_type)
            .ok_or_else(|| not_found(data_type, id))?;
        let before = configs.len();
        configs.retain(|c| c.id != id);
        if configs.len() == before {
            return Err(not_found(data_type, id).into());
        }
        if configs.is_empty() {
            data.remove(data_type);
        }
        self.write(&data).await
    }

    async fn touch_last_used(&self, data_type: &str, id: Uuid) -> Result<SavedConfig> {
        let _guard = self.lock.lock().await;
        let mut data = self.read().await?;
        let entry = data
            .get_mut(data_type)
            .and_then(|configs| configs.iter_mut().find(|c| c.id == id))
            .ok_or_else(|| not_found(data_type, id))?;
        entry.last_used_at = Some(Utc::now());
        let touched = entry.clone();
        self.write(&data).await?;
        Ok(touched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExportError;
    use crate::model::ExportFormat;

    fn config() -> ExportConfig {
        ExportConfig::new(ExportFormat::Text, vec!["id".into(), "amount".into()])
    }

    async fn exercise(store: &dyn ConfigStore) {
        let first = store.save("transactions", "Monthly close", config()).await.unwrap();
        let second = store.save("transactions", "Errors only", config()).await.unwrap();
        store.save("report_summary", "Quarter", config()).await.unwrap();

        let listed = store.list("transactions").await.unwrap();
        assert_eq!(listed.len(), 2);
        assert!(store.list("unknown").await.unwrap().is_empty());

        let touched = store.touch_last_used("transactions", first.id).await.unwrap();
        assert!(touched.last_used_at.is_some());
        let listed = store.list("transactions").await.unwrap();
        assert_eq!(listed[0].id, first.id);

        store.delete("transactions", second.id).await.unwrap();
        let listed = store.list("transactions").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "Monthly close");

        match store.delete("transactions", second.id).await {
            Err(ExportError::Store(StoreError::NotFound { .. })) => {}
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(store.touch_last_used("report_summary", first.id).await.is_err());
    }

    #[tokio::test]
    async fn test_memory_store_crud() {
        exercise(&MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn test_json_file_store_crud() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("nested/saved.json"));
        exercise(&store).await;
        assert!(store.path().exists());
    }

    #[tokio::test]
    async fn test_json_file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("saved.json");

        let saved = JsonFileStore::new(&path)
            .save("transactions", "Daily", config())
            .await
            .unwrap();

        let reopened = JsonFileStore::new(&path);
        let listed = reopened.list("transactions").await.unwrap();
        assert_eq!(listed, vec![saved]);
    }

    #[tokio::test]
    async fn test_json_file_store_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("saved.json");
        tokio::fs::write(&path, b"{not json").await.unwrap();

        match JsonFileStore::new(&path).list("transactions").await {
            Err(ExportError::Store(StoreError::Backend(_))) => {}
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
