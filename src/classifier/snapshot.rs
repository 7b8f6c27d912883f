//! Model persistence.
//!
//! The snapshot is an explicit serializable type holding only what a model
//! needs to be reconstructed: the four vocabulary sets, the MLP parameters,
//! and the training selectors. No live object state is serialized, and no
//! cross-version schema guarantee is made.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::mlp::MlpClassifier;
use super::trained::TrainedModel;
use crate::error::{Result, TracksiftError};
use crate::models::Language;
use crate::vocab::{Vocabulary, VersionVocabulary};

#[derive(Debug, Serialize, Deserialize)]
pub struct ModelSnapshot {
    pub language: Option<Language>,
    pub service: Option<String>,
    pub only_new_tokens: Vec<String>,
    pub only_old_tokens: Vec<String>,
    pub only_new_versions: Vec<String>,
    pub only_old_versions: Vec<String>,
    pub mlp: Option<MlpClassifier>,
    pub trained_at: DateTime<Utc>,
}

impl ModelSnapshot {
    /// Capture a model into its exportable form. Sets are sorted so equal
    /// models produce equal bytes.
    pub fn capture(
        model: &TrainedModel,
        language: Option<Language>,
        service: Option<&str>,
    ) -> Self {
        let sorted = |set: &rustc_hash::FxHashSet<String>| {
            let mut items: Vec<String> = set.iter().cloned().collect();
            items.sort();
            items
        };
        Self {
            language,
            service: service.map(str::to_string),
            only_new_tokens: sorted(&model.vocabulary().only_new),
            only_old_tokens: sorted(&model.vocabulary().only_old),
            only_new_versions: sorted(&model.versions().only_new),
            only_old_versions: sorted(&model.versions().only_old),
            mlp: model.mlp().cloned(),
            trained_at: Utc::now(),
        }
    }

    /// Rebuild the model this snapshot was captured from.
    pub fn restore(self) -> (TrainedModel, Option<Language>, Option<String>) {
        let vocabulary = Vocabulary {
            only_new: self.only_new_tokens.into_iter().collect(),
            only_old: self.only_old_tokens.into_iter().collect(),
        };
        let versions = VersionVocabulary {
            only_new: self.only_new_versions.into_iter().collect(),
            only_old: self.only_old_versions.into_iter().collect(),
        };
        let mut model = TrainedModel::new(vocabulary, versions);
        if let Some(mlp) = self.mlp {
            model = model.with_mlp(mlp);
        }
        (model, self.language, self.service)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| TracksiftError::Snapshot(format!("unreadable snapshot: {}", e)))
    }
}

/// Opaque byte-blob storage, keyed by name. Used only for whole-model
/// snapshots.
pub trait BlobStore {
    fn put(&self, name: &str, bytes: &[u8]) -> Result<()>;
    fn get(&self, name: &str) -> Result<Vec<u8>>;
}

/// Blob store over a local directory.
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl BlobStore for FsBlobStore {
    fn put(&self, name: &str, bytes: &[u8]) -> Result<()> {
        std::fs::create_dir_all(&self.root)?;
        std::fs::write(self.root.join(name), bytes)?;
        Ok(())
    }

    fn get(&self, name: &str) -> Result<Vec<u8>> {
        let path = self.root.join(name);
        std::fs::read(&path)
            .map_err(|e| TracksiftError::BlobStore(format!("{}: {}", path.display(), e)))
    }
}

/// Write a snapshot to a file path.
pub fn save_snapshot(snapshot: &ModelSnapshot, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, snapshot.to_bytes()?)?;
    Ok(())
}

/// Read a snapshot from a file path.
pub fn load_snapshot(path: &Path) -> Result<ModelSnapshot> {
    let bytes = std::fs::read(path)?;
    ModelSnapshot::from_bytes(&bytes)
}
