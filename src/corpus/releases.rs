//! Release-metadata collaborator: per-language release index CSVs parsed
//! into [`ReleaseRecord`]s grouped by service.

use crate::config::Settings;
use crate::error::{Result, TracksiftError};
use crate::models::{Language, ReleaseRecord, ServiceReleases};

use super::client::make_agent;

/// Read-only view of the release index. No side effects.
pub trait ReleaseIndex {
    fn releases_for(&self, language: Language) -> Result<ServiceReleases>;
}

/// Fetches `<base>/<language>-packages.csv` over HTTP.
pub struct HttpReleaseIndex {
    agent: ureq::Agent,
    base: String,
}

impl HttpReleaseIndex {
    pub fn new(settings: &Settings) -> Self {
        Self {
            agent: make_agent(),
            base: settings.release_index_base.clone(),
        }
    }
}

impl ReleaseIndex for HttpReleaseIndex {
    fn releases_for(&self, language: Language) -> Result<ServiceReleases> {
        let url = format!("{}/{}-packages.csv", self.base, language.id());
        tracing::info!("fetching release index {}", url);

        let response = self
            .agent
            .get(&url)
            .call()
            .map_err(|e| TracksiftError::ReleaseIndex(e.to_string()))?;

        let status = response.status().as_u16();
        if status >= 400 {
            return Err(TracksiftError::ReleaseIndex(format!(
                "{} returned status {}",
                url, status
            )));
        }

        let body = response
            .into_body()
            .read_to_string()
            .map_err(|e| TracksiftError::ReleaseIndex(e.to_string()))?;

        parse_release_csv(&body)
    }
}

/// Parse a header-mapped release CSV into records grouped by service.
///
/// Quoted fields (with `""` escapes) are handled; rows shorter than the
/// header are padded with empty fields rather than rejected.
pub fn parse_release_csv(text: &str) -> Result<ServiceReleases> {
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());
    let header_line = lines
        .next()
        .ok_or_else(|| TracksiftError::MalformedReleaseIndex("empty index".into()))?;
    let header = split_csv_line(header_line);

    let column = |name: &str| header.iter().position(|h| h == name);
    let required = |name: &str| {
        column(name).ok_or_else(|| {
            TracksiftError::MalformedReleaseIndex(format!("missing column '{}'", name))
        })
    };

    let package_col = required("Package")?;
    let service_col = required("ServiceName")?;
    let new_col = required("New")?;
    let version_ga_col = column("VersionGA");
    let version_preview_col = column("VersionPreview");
    let repo_path_col = column("RepoPath");
    let group_id_col = column("GroupId");

    let field = |row: &[String], col: Option<usize>| -> String {
        col.and_then(|i| row.get(i)).cloned().unwrap_or_default()
    };

    let mut info = ServiceReleases::new();
    for line in lines {
        let row = split_csv_line(line);
        let service = field(&row, Some(service_col));
        if service.is_empty() {
            continue;
        }
        let group_id = field(&row, group_id_col);
        let record = ReleaseRecord {
            package: field(&row, Some(package_col)),
            version_ga: field(&row, version_ga_col),
            version_preview: field(&row, version_preview_col),
            repo_path: field(&row, repo_path_col),
            is_new_generation: field(&row, Some(new_col)).eq_ignore_ascii_case("true"),
            service: service.clone(),
            group_id: if group_id.is_empty() {
                None
            } else {
                Some(group_id)
            },
        };
        info.entry(service).or_default().push(record);
    }
    Ok(info)
}

fn split_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    current.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' => in_quotes = true,
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    fields.push(current);
    fields
}
