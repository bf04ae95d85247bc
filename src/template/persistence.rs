//! Persistence port for the template collection and its adapters.
//!
//! The store only ever talks to [`TemplateRepository`]; the JSON file adapter is
//! what the service uses, the in-memory one backs tests and throwaway setups.

use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::template::model::ProfileTemplate;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("failed to read template file: {0}")]
    Read(#[source] std::io::Error),
    #[error("failed to write template file: {0}")]
    Write(#[source] std::io::Error),
    #[error("template record is corrupt: {0}")]
    Corrupt(#[source] serde_json::Error),
    #[error("failed to serialize templates: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("persistence task failed: {0}")]
    Task(String),
}

/// What gets written to the durable slot.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct TemplateCollection {
    #[serde(default)]
    pub active_template_id: Option<String>,
    pub templates: Vec<ProfileTemplate>,
}

/// Older records hold the bare template array.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredRecord {
    Collection(TemplateCollection),
    Templates(Vec<ProfileTemplate>),
}

impl TemplateCollection {
    pub fn from_json(bytes: &[u8]) -> Result<Self, PersistenceError> {
        let record: StoredRecord = serde_json::from_slice(bytes).map_err(PersistenceError::Corrupt)?;
        Ok(match record {
            StoredRecord::Collection(collection) => collection,
            StoredRecord::Templates(templates) => TemplateCollection {
                active_template_id: None,
                templates,
            },
        })
    }
}

#[async_trait]
pub trait TemplateRepository: Send + Sync {
    /// `Ok(None)` when nothing has been stored yet.
    async fn load(&self) -> Result<Option<TemplateCollection>, PersistenceError>;
    async fn save(&self, collection: &TemplateCollection) -> Result<(), PersistenceError>;
}

/// Stores the collection as one JSON document on disk.
pub struct JsonFileRepository {
    path: PathBuf,
}

impl JsonFileRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl TemplateRepository for JsonFileRepository {
    async fn load(&self) -> Result<Option<TemplateCollection>, PersistenceError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => TemplateCollection::from_json(&bytes).map(Some),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(PersistenceError::Read(e)),
        }
    }

    async fn save(&self, collection: &TemplateCollection) -> Result<(), PersistenceError> {
        let json = serde_json::to_vec_pretty(collection).map_err(PersistenceError::Serialize)?;
        let path = self.path.clone();

        tokio::task::spawn_blocking(move || write_atomically(&path, &json))
            .await
            .map_err(|e| PersistenceError::Task(e.to_string()))?
    }
}

// Readers never observe a half-written file: write a sibling temp file, then rename.
fn write_atomically(path: &Path, data: &[u8]) -> Result<(), PersistenceError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir).map_err(PersistenceError::Write)?;

    let mut temp = tempfile::NamedTempFile::new_in(&dir).map_err(PersistenceError::Write)?;
    temp.write_all(data).map_err(PersistenceError::Write)?;
    temp.persist(path)
        .map_err(|e| PersistenceError::Write(e.error))?;
    Ok(())
}

/// Keeps the last saved collection in memory.
#[derive(Default)]
pub struct MemoryRepository {
    slot: Mutex<Option<TemplateCollection>>,
    saves: Mutex<usize>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_collection(collection: TemplateCollection) -> Self {
        Self {
            slot: Mutex::new(Some(collection)),
            saves: Mutex::new(0),
        }
    }

    pub fn stored(&self) -> Option<TemplateCollection> {
        self.slot.lock().clone()
    }

    pub fn save_count(&self) -> usize {
        *self.saves.lock()
    }
}

#[async_trait]
impl TemplateRepository for MemoryRepository {
    async fn load(&self) -> Result<Option<TemplateCollection>, PersistenceError> {
        Ok(self.slot.lock().clone())
    }

    async fn save(&self, collection: &TemplateCollection) -> Result<(), PersistenceError> {
        *self.slot.lock() = Some(collection.clone());
        *self.saves.lock() += 1;
        Ok(())
    }
}
