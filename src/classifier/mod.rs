//! Track classification: the public API over the trained model.
//!
//! [`TrackClassifier`] trains (or loads) a model for a (language, service)
//! selector and answers whether a piece of text reads as track 1 content.
//! Training time dominates, so pretrained models can be snapshotted to a
//! file or a blob store and reloaded.

mod crossval;
mod features;
mod mlp;
mod snapshot;
mod trained;
mod train;

pub use crossval::{cross_val_score, CandidateFamily, Example};
pub use features::{FeatureVector, MatchedEvidence};
pub use mlp::{MlpClassifier, MlpPrediction};
pub use snapshot::{load_snapshot, save_snapshot, BlobStore, FsBlobStore, ModelSnapshot};
pub use trained::{TrainedModel, Verdict, VERSION_EVIDENCE_WEIGHT};
pub use train::train_model;

use std::path::{Path, PathBuf};

use crate::config::Settings;
use crate::corpus::{ArchiveClient, HttpArchiveClient, HttpReleaseIndex, ReleaseIndex};
use crate::error::Result;
use crate::models::Language;
use crate::tokenize::{FsSurfaceProvider, SurfaceProvider};
use crate::vocab::{BundledDictionary, Dictionary};

/// The external collaborators training depends on, injected so tests (and
/// alternative deployments) can swap any of them out.
pub struct Collaborators {
    pub releases: Box<dyn ReleaseIndex>,
    pub archives: Box<dyn ArchiveClient>,
    pub surfaces: Box<dyn SurfaceProvider>,
    pub dictionary: Box<dyn Dictionary>,
}

impl Collaborators {
    /// The production wiring: HTTP release index and archives, filesystem
    /// surface listings, bundled dictionary.
    pub fn over_http(settings: &Settings) -> Self {
        Self {
            releases: Box::new(HttpReleaseIndex::new(settings)),
            archives: Box::new(HttpArchiveClient::new()),
            surfaces: Box::new(FsSurfaceProvider::new(settings.surface_listing_dir.clone())),
            dictionary: Box::new(BundledDictionary),
        }
    }
}

/// A classifier trained (or loaded) for one (language, service) selector.
/// `None` selectors are wildcards.
pub struct TrackClassifier {
    language: Option<Language>,
    service: Option<String>,
    model: TrainedModel,
}

impl TrackClassifier {
    /// Train with the production collaborators.
    pub fn train(
        language: Option<Language>,
        service: Option<&str>,
        settings: &Settings,
    ) -> Result<Self> {
        Self::train_with(language, service, settings, &Collaborators::over_http(settings))
    }

    /// Train with explicit collaborators.
    pub fn train_with(
        language: Option<Language>,
        service: Option<&str>,
        settings: &Settings,
        collaborators: &Collaborators,
    ) -> Result<Self> {
        let model = train_model(language, service, settings, collaborators)?;
        Ok(Self {
            language,
            service: service.map(str::to_string),
            model,
        })
    }

    /// Classify text as track 1 content.
    pub fn is_track1(&self, text: &str) -> bool {
        self.model.classify(text)
    }

    /// Classify with the full feature breakdown and the secondary
    /// classifier's opinion alongside the result.
    pub fn is_track1_verbose(&self, text: &str, extra_logging: bool) -> Verdict {
        self.model.classify_verbose(text, extra_logging)
    }

    pub fn language(&self) -> Option<Language> {
        self.language
    }

    pub fn service(&self) -> Option<&str> {
        self.service.as_deref()
    }

    pub fn model(&self) -> &TrainedModel {
        &self.model
    }

    /// Default snapshot name for this classifier's selectors.
    pub fn default_snapshot_name(&self) -> String {
        format!(
            "tracksift_{}_{}.model",
            self.language.map(|l| l.id()).unwrap_or("all"),
            self.service.as_deref().unwrap_or("all")
        )
    }

    /// Save to a file; with `None`, a selector-derived name in the current
    /// directory. Returns the path written.
    pub fn save(&self, path: Option<&Path>) -> Result<PathBuf> {
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(self.default_snapshot_name()));
        let snapshot = ModelSnapshot::capture(&self.model, self.language, self.service.as_deref());
        save_snapshot(&snapshot, &path)?;
        Ok(path)
    }

    /// Load from a file written by [`save`](Self::save).
    pub fn load(path: &Path) -> Result<Self> {
        Ok(Self::from_snapshot(load_snapshot(path)?))
    }

    /// Save to a blob store; with `None`, a selector-derived blob name.
    /// Returns the name written.
    pub fn save_to_store(&self, store: &dyn BlobStore, name: Option<&str>) -> Result<String> {
        let name = name
            .map(str::to_string)
            .unwrap_or_else(|| self.default_snapshot_name());
        let snapshot = ModelSnapshot::capture(&self.model, self.language, self.service.as_deref());
        store.put(&name, &snapshot.to_bytes()?)?;
        Ok(name)
    }

    /// Load from a blob store.
    pub fn load_from_store(store: &dyn BlobStore, name: &str) -> Result<Self> {
        Ok(Self::from_snapshot(ModelSnapshot::from_bytes(
            &store.get(name)?,
        )?))
    }

    /// Rebuild a classifier from a captured snapshot.
    pub fn from_snapshot(snapshot: ModelSnapshot) -> Self {
        let (model, language, service) = snapshot.restore();
        Self {
            language,
            service,
            model,
        }
    }
}
