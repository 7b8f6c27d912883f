//! Runtime configuration.
//!
//! All tunable paths and endpoints live in an explicit [`Settings`] struct
//! that is passed into the fetcher and the training orchestrator at
//! construction. There is no process-global mutable state; CLI flags and the
//! optional user config file are merged into one `Settings` value up front.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Default endpoint serving the per-language release index CSVs.
pub const DEFAULT_RELEASE_INDEX_BASE: &str =
    "https://raw.githubusercontent.com/Azure/azure-sdk/master/_data/releases/latest";

/// Default location of the source archives (per-repository GitHub org).
pub const DEFAULT_ARCHIVE_BASE: &str = "https://github.com/Azure";

/// Explicit configuration for corpus fetching and training.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Where trimmed-corpus and raw-archive cache files are written.
    pub cache_dir: PathBuf,

    /// Root of the manually-curated supplemental corpus tree
    /// (`<root>/<language>/<service>/<track1|track2>/<file>`).
    pub supplemental_corpus_dir: PathBuf,

    /// Directory holding pre-generated API-surface listings
    /// (`<language>_<package>_<version>.json`).
    pub surface_listing_dir: PathBuf,

    /// When set, package/version archives that could not be fetched are
    /// appended here as TSV for later triage.
    pub missing_training_ledger: Option<PathBuf>,

    /// Also cache raw downloaded archives, below the trimmed-corpus cache.
    pub cache_raw_archives: bool,

    /// Base URL of the release index CSVs.
    pub release_index_base: String,

    /// Base URL of the archive host.
    pub archive_base: String,
}

impl Default for Settings {
    fn default() -> Self {
        let cache_dir = dirs::cache_dir()
            .map(|d| d.join("tracksift"))
            .unwrap_or_else(|| PathBuf::from("."));
        Self {
            cache_dir,
            supplemental_corpus_dir: PathBuf::from("./supplemental_corpus"),
            surface_listing_dir: PathBuf::from("./api_surfaces"),
            missing_training_ledger: None,
            cache_raw_archives: false,
            release_index_base: DEFAULT_RELEASE_INDEX_BASE.to_string(),
            archive_base: DEFAULT_ARCHIVE_BASE.to_string(),
        }
    }
}

impl Settings {
    /// Load defaults, then overlay the user config file when present.
    pub fn load() -> Result<Self> {
        let mut settings = Settings::default();
        if let Some(path) = UserConfig::path().filter(|p| p.exists()) {
            let content = std::fs::read_to_string(&path)?;
            let user: UserConfig = toml::from_str(&content)
                .map_err(|e| anyhow::anyhow!("invalid config file {}: {}", path.display(), e))?;
            settings.merge_user(user);
        }
        Ok(settings)
    }

    fn merge_user(&mut self, user: UserConfig) {
        if let Some(dir) = user.cache_dir {
            self.cache_dir = dir;
        }
        if let Some(dir) = user.supplemental_corpus_dir {
            self.supplemental_corpus_dir = dir;
        }
        if let Some(dir) = user.surface_listing_dir {
            self.surface_listing_dir = dir;
        }
        if let Some(base) = user.release_index_base {
            self.release_index_base = base;
        }
        if let Some(base) = user.archive_base {
            self.archive_base = base;
        }
    }
}

/// Optional user-level overrides, read from
/// `~/.config/tracksift/config.toml`.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct UserConfig {
    pub cache_dir: Option<PathBuf>,
    pub supplemental_corpus_dir: Option<PathBuf>,
    pub surface_listing_dir: Option<PathBuf>,
    pub release_index_base: Option<String>,
    pub archive_base: Option<String>,
}

impl UserConfig {
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("tracksift").join("config.toml"))
    }
}
