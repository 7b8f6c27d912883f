//! Shared data model: languages, generations, and release metadata.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TracksiftError;

/// One package/version's filtered, decoded public-usage files, keyed by
/// archive entry path.
pub type Corpus = BTreeMap<String, String>;

/// A language ecosystem covered by the release index.
///
/// Adding a language means extending this enum *and* its `repo()` mapping;
/// the compiler keeps the two in parity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Dotnet,
    Python,
    Java,
    Js,
}

impl Language {
    pub const ALL: [Language; 4] = [
        Language::Dotnet,
        Language::Python,
        Language::Java,
        Language::Js,
    ];

    /// Identifier used in release-index file names and API-surface listings.
    pub fn id(&self) -> &'static str {
        match self {
            Language::Dotnet => "dotnet",
            Language::Python => "python",
            Language::Java => "java",
            Language::Js => "js",
        }
    }

    /// Source repository holding this ecosystem's packages.
    pub fn repo(&self) -> &'static str {
        match self {
            Language::Dotnet => "azure-sdk-for-net",
            Language::Python => "azure-sdk-for-python",
            Language::Java => "azure-sdk-for-java",
            Language::Js => "azure-sdk-for-js",
        }
    }

    /// Markdown fence tag used for this language in documentation.
    pub fn fence_tag(&self) -> &'static str {
        match self {
            Language::Dotnet => "csharp",
            Language::Python => "python",
            Language::Java => "java",
            Language::Js => "js",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Language {
    type Err = TracksiftError;

    /// The one lookup that must fail loudly: continuing with a silently
    /// defaulted ecosystem would mistrain the model.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dotnet" | "net" | "csharp" => Ok(Language::Dotnet),
            "python" => Ok(Language::Python),
            "java" => Ok(Language::Java),
            "js" | "javascript" | "ts" | "typescript" => Ok(Language::Js),
            other => Err(TracksiftError::UnknownLanguage(other.to_string())),
        }
    }
}

/// Which design lineage a package or document belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Generation {
    /// Legacy lineage.
    Track1,
    /// Current lineage.
    Track2,
}

impl Generation {
    pub fn from_new_flag(is_new: bool) -> Self {
        if is_new {
            Generation::Track2
        } else {
            Generation::Track1
        }
    }

    /// Directory name used by the supplemental corpus tree.
    pub fn dir_name(&self) -> &'static str {
        match self {
            Generation::Track1 => "track1",
            Generation::Track2 => "track2",
        }
    }

    pub fn from_dir_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "track1" | "t1" => Some(Generation::Track1),
            "track2" | "t2" => Some(Generation::Track2),
            _ => None,
        }
    }

    pub fn is_track1(&self) -> bool {
        matches!(self, Generation::Track1)
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// One package's release metadata within a language ecosystem.
///
/// Fetched fresh per run from the release index; immutable once retrieved.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReleaseRecord {
    pub package: String,
    pub version_ga: String,
    pub version_preview: String,
    /// Either a bare package directory name or a full repository URI for
    /// packages hosted outside the standard tree.
    pub repo_path: String,
    pub is_new_generation: bool,
    pub service: String,
    /// Java-specific coordinate, used when addressing Maven artifacts.
    pub group_id: Option<String>,
}

impl ReleaseRecord {
    pub fn generation(&self) -> Generation {
        Generation::from_new_flag(self.is_new_generation)
    }

    /// GA version when present, otherwise the preview version.
    pub fn effective_version(&self) -> Option<&str> {
        if !self.version_ga.is_empty() {
            Some(&self.version_ga)
        } else if !self.version_preview.is_empty() {
            Some(&self.version_preview)
        } else {
            None
        }
    }

    /// RepoPath interpreted as a custom repository link, when it is one.
    pub fn custom_repo_uri(&self) -> Option<&str> {
        if self.repo_path.starts_with("http") {
            Some(&self.repo_path)
        } else {
            None
        }
    }

    /// The identifiers that mark this release in prose: the package name and
    /// the dash-stripped prefix of each version string.
    pub fn version_identifiers(&self) -> Vec<String> {
        let mut ids = vec![self.package.clone()];
        for version in [&self.version_ga, &self.version_preview] {
            if !version.is_empty() {
                if let Some(prefix) = version.split('-').next() {
                    ids.push(prefix.to_string());
                }
            }
        }
        ids
    }
}

/// Release records grouped by service name.
pub type ServiceReleases = BTreeMap<String, Vec<ReleaseRecord>>;
