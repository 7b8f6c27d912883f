//! Library error taxonomy.
//!
//! Only construction-time failures surface to callers: an unknown language
//! selector, an unreachable release index, or a broken model snapshot.
//! Per-package fetch and decode failures are recovered where they happen and
//! degrade to an empty corpus.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TracksiftError {
    #[error("unknown language '{0}' (expected one of: dotnet, python, java, js)")]
    UnknownLanguage(String),

    #[error("release index request failed: {0}")]
    ReleaseIndex(String),

    #[error("malformed release index: {0}")]
    MalformedReleaseIndex(String),

    #[error("archive request failed: {0}")]
    ArchiveFetch(String),

    #[error("model snapshot error: {0}")]
    Snapshot(String),

    #[error("blob store error: {0}")]
    BlobStore(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TracksiftError>;
