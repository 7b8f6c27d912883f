//! Archive retrieval collaborator.
//!
//! The fetcher only ever sees `Option<Vec<u8>>`: bytes, or a not-found
//! sentinel. Everything else (transport errors) is an `Err` that callers
//! recover from locally.

use std::time::Duration;

use crate::error::{Result, TracksiftError};

/// Fetches raw archive bytes for a URI. `Ok(None)` means not-found.
pub trait ArchiveClient: Send + Sync {
    fn fetch(&self, uri: &str) -> Result<Option<Vec<u8>>>;
}

pub(crate) fn make_agent() -> ureq::Agent {
    ureq::config::Config::builder()
        .http_status_as_error(false) // We handle status codes ourselves
        .timeout_global(Some(Duration::from_secs(120))) // Source archives can be large
        .build()
        .new_agent()
}

/// Blocking HTTP implementation over ureq.
pub struct HttpArchiveClient {
    agent: ureq::Agent,
}

impl HttpArchiveClient {
    pub fn new() -> Self {
        Self {
            agent: make_agent(),
        }
    }
}

impl Default for HttpArchiveClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchiveClient for HttpArchiveClient {
    fn fetch(&self, uri: &str) -> Result<Option<Vec<u8>>> {
        let response = self
            .agent
            .get(uri)
            .call()
            .map_err(|e| TracksiftError::ArchiveFetch(e.to_string()))?;

        let status = response.status().as_u16();
        if status == 404 {
            return Ok(None);
        }
        if status >= 400 {
            return Err(TracksiftError::ArchiveFetch(format!(
                "{} returned status {}",
                uri, status
            )));
        }

        let bytes = response
            .into_body()
            .read_to_vec()
            .map_err(|e| TracksiftError::ArchiveFetch(e.to_string()))?;

        // Some hosts answer 200 with a plain-text not-found body.
        if bytes == b"404: Not Found" {
            return Ok(None);
        }

        Ok(Some(bytes))
    }
}
