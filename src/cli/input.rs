//! Input resolution for `--input-is-path`: a local file, a directory tree,
//! or a repository link / archive URI.

use std::io::{Cursor, Read};
use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::corpus::{parse_repo_link, ArchiveClient, HttpArchiveClient};

/// What the positional argument resolved to.
pub enum ResolvedInput {
    /// A single block of text.
    Single(String),
    /// Many (path, text) documents.
    Batch(Vec<(String, String)>),
}

pub fn resolve_input(text: &str, input_is_path: bool) -> Result<ResolvedInput> {
    if !input_is_path {
        return Ok(ResolvedInput::Single(text.to_string()));
    }

    let path = Path::new(text);
    if path.is_file() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        return Ok(ResolvedInput::Single(content));
    }
    if path.is_dir() {
        return Ok(ResolvedInput::Batch(read_directory(path)));
    }
    if text.contains("github") {
        return fetch_repository(text).map(ResolvedInput::Batch);
    }
    bail!(
        "input path is of no known type (local file, directory, or repository link/zip): {}",
        text
    );
}

/// Every readable file under the directory, honoring ignore files.
fn read_directory(root: &Path) -> Vec<(String, String)> {
    let mut documents = Vec::new();
    for entry in ignore::WalkBuilder::new(root).hidden(false).build().flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        match std::fs::read_to_string(path) {
            Ok(content) => documents.push((path.display().to_string(), content)),
            Err(e) => tracing::warn!("skipping unreadable input file {}: {}", path.display(), e),
        }
    }
    documents
}

/// Fetch a repository link (or a direct zip URI) and return its decoded
/// files, filtered to the link's subpath.
fn fetch_repository(link: &str) -> Result<Vec<(String, String)>> {
    let (zip_uri, subpath) = if link.ends_with(".zip") {
        (link.to_string(), String::new())
    } else {
        parse_repo_link(link)?
    };
    tracing::info!("fetching input archive {}", zip_uri);

    let client = HttpArchiveClient::new();
    let mut bytes = client.fetch(&zip_uri)?;
    if bytes.is_none() && zip_uri.contains("master.zip") {
        bytes = client.fetch(&zip_uri.replace("master.zip", "main.zip"))?;
    }
    let Some(bytes) = bytes else {
        bail!("no archive at {}", zip_uri);
    };

    let mut archive =
        zip::ZipArchive::new(Cursor::new(bytes)).context("unreadable input archive")?;
    let mut documents = Vec::new();
    for index in 0..archive.len() {
        let mut entry = match archive.by_index(index) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("unreadable archive entry {}: {}", index, e);
                continue;
            }
        };
        if entry.is_dir() {
            continue;
        }
        let name = entry.name().to_string();
        if !name.contains(&subpath) {
            continue;
        }
        let mut raw = Vec::new();
        if let Err(e) = entry.read_to_end(&mut raw) {
            tracing::warn!("unable to read input file {}: {}", name, e);
            continue;
        }
        let text = match String::from_utf8(raw) {
            Ok(text) => text,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        };
        documents.push((name, text));
    }
    Ok(documents)
}
