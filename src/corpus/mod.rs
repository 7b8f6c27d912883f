//! Corpus fetching: resolve a (repo, package, version) triple to a source
//! archive, download it, and filter it down to the files a user of the
//! package would actually read — samples, examples, tests, and READMEs.
//!
//! Every failure in here degrades to an empty corpus for that one package.
//! A single unfetchable release must never abort a training run.

mod client;
mod releases;

pub use client::{ArchiveClient, HttpArchiveClient};
pub use releases::{parse_release_csv, HttpReleaseIndex, ReleaseIndex};

use std::io::{Cursor, Read};
use std::path::PathBuf;

use crate::config::Settings;
use crate::error::{Result, TracksiftError};
use crate::models::Corpus;

/// File extensions considered part of the public-usage corpus.
const ACCEPTED_EXTENSIONS: [&str; 9] = [
    "cs", "py", "ipynb", "java", "js", "ts", "md", "txt", "yaml",
];

/// Path fragments that mark a file as representative public-usage content.
const USAGE_MARKERS: [&str; 5] = ["/samples/", "/examples/", "/tests/", "/test/", "README"];

/// Fetches and filters per-package corpora, with a trimmed-corpus cache on
/// top and an optional raw-archive cache below it.
pub struct CorpusFetcher<'a> {
    settings: &'a Settings,
    client: &'a dyn ArchiveClient,
}

impl<'a> CorpusFetcher<'a> {
    pub fn new(settings: &'a Settings, client: &'a dyn ArchiveClient) -> Self {
        Self { settings, client }
    }

    /// Fetch the public-usage corpus for one package version.
    ///
    /// Never fails: a null package/version, an unreachable or missing
    /// archive, or an unreadable entry all shrink the result instead of
    /// erroring.
    pub fn fetch(
        &self,
        repo: &str,
        package: &str,
        version: &str,
        custom_repo_uri: Option<&str>,
    ) -> Corpus {
        if package.is_empty() || version.is_empty() {
            tracing::warn!(
                "cannot fetch corpus for null package ({}) / version ({}) in {}",
                package,
                version,
                repo
            );
            return Corpus::new();
        }

        if let Some(cached) = self.read_trimmed_cache(repo, package, version) {
            tracing::info!("trimmed-cache hit for {} {} {}", repo, package, version);
            return cached;
        }

        let (uri, subpath) = self.locate(repo, package, version, custom_repo_uri);
        tracing::info!("fetching {} {} {} from {}", repo, package, version, uri);

        let corpus = match self.download(&uri) {
            Ok(Some(bytes)) => filter_archive(&bytes, package, subpath.as_deref()),
            Ok(None) => {
                tracing::warn!(
                    "no archive at {} (repo: {} package: {} version: {})",
                    uri,
                    repo,
                    package,
                    version
                );
                self.record_missing(&uri, repo, package, version);
                Corpus::new()
            }
            Err(e) => {
                tracing::warn!("archive fetch failed for {}: {}", uri, e);
                Corpus::new()
            }
        };

        self.write_trimmed_cache(repo, package, version, &corpus);
        corpus
    }

    /// Resolve the archive URI and the subpath filter to apply inside it.
    fn locate(
        &self,
        repo: &str,
        package: &str,
        version: &str,
        custom_repo_uri: Option<&str>,
    ) -> (String, Option<String>) {
        let canonical = format!(
            "{}/{}/archive/{}_{}.zip",
            self.settings.archive_base, repo, package, version
        );

        // Some index rows carry a literal NA where a link would be.
        let custom = custom_repo_uri.filter(|uri| *uri != "NA");
        if let Some(uri) = custom {
            tracing::info!("using custom repository link: {}", uri);
            match parse_repo_link(uri) {
                Ok((zip_uri, subpath)) => return (zip_uri, Some(subpath)),
                Err(e) => {
                    tracing::warn!("could not parse custom repository link {}: {}", uri, e);
                }
            }
        }
        (canonical, None)
    }

    /// Download archive bytes, consulting the raw cache first when enabled
    /// and retrying `master.zip` as `main.zip` on not-found.
    fn download(&self, uri: &str) -> Result<Option<Vec<u8>>> {
        let raw_cache = self
            .settings
            .cache_raw_archives
            .then(|| self.raw_cache_path(uri));
        if let Some(path) = &raw_cache {
            if let Ok(bytes) = std::fs::read(path) {
                tracing::info!("raw-cache hit for {}", uri);
                return Ok(Some(bytes));
            }
        }

        let mut fetched = self.client.fetch(uri)?;
        if fetched.is_none() && uri.contains("master.zip") {
            // GitHub repositories renamed their default branch; retry once.
            let alternate = uri.replace("master.zip", "main.zip");
            tracing::info!("retrying with default-branch fallback: {}", alternate);
            fetched = self.client.fetch(&alternate)?;
        }

        if let (Some(path), Some(bytes)) = (&raw_cache, &fetched) {
            if let Some(parent) = path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            if let Err(e) = std::fs::write(path, bytes) {
                tracing::warn!("could not write raw cache {}: {}", path.display(), e);
            }
        }
        Ok(fetched)
    }

    fn trimmed_cache_path(&self, repo: &str, package: &str, version: &str) -> PathBuf {
        self.settings.cache_dir.join(format!(
            "trimmed_corpus_{}_{}_{}.json",
            repo,
            sanitize_key(package),
            sanitize_key(version)
        ))
    }

    fn raw_cache_path(&self, uri: &str) -> PathBuf {
        self.settings
            .cache_dir
            .join(format!("raw_archive_{}.zip", sanitize_key(uri)))
    }

    fn read_trimmed_cache(&self, repo: &str, package: &str, version: &str) -> Option<Corpus> {
        let path = self.trimmed_cache_path(repo, package, version);
        let content = std::fs::read_to_string(path).ok()?;
        serde_json::from_str(&content).ok()
    }

    fn write_trimmed_cache(&self, repo: &str, package: &str, version: &str, corpus: &Corpus) {
        let path = self.trimmed_cache_path(repo, package, version);
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        match serde_json::to_string(corpus) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&path, json) {
                    tracing::warn!("could not write trimmed cache {}: {}", path.display(), e);
                }
            }
            Err(e) => tracing::warn!("could not serialize corpus for cache: {}", e),
        }
    }

    /// Append an unfetchable package to the missing-training ledger.
    fn record_missing(&self, uri: &str, repo: &str, package: &str, version: &str) {
        let Some(ledger) = &self.settings.missing_training_ledger else {
            return;
        };
        let line = format!(
            "{}\t{}\t{}\t{}\t{}\n",
            uri,
            repo,
            package,
            version,
            chrono::Utc::now().to_rfc3339()
        );
        let result = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(ledger)
            .and_then(|mut f| std::io::Write::write_all(&mut f, line.as_bytes()));
        if let Err(e) = result {
            tracing::warn!("could not append to ledger {}: {}", ledger.display(), e);
        }
    }
}

/// Parse a repository web link into (archive zip URI, subpath filter).
///
/// Archive hosts cannot serve a zip of a subfolder, so a `/tree/<tag>/<sub>`
/// link becomes the whole-tree zip for `<tag>` plus a filter for `<sub>`.
pub fn parse_repo_link(uri: &str) -> Result<(String, String)> {
    if !uri.starts_with("http") {
        return Err(TracksiftError::ArchiveFetch(format!(
            "not a repository link: {}",
            uri
        )));
    }

    if let Some((base, rest)) = uri.split_once("/tree/releases/") {
        let (tag, subpath) = rest.split_once('/').unwrap_or((rest, ""));
        Ok((
            format!("{}/archive/releases/{}.zip", base, tag),
            subpath.to_string(),
        ))
    } else if let Some((base, rest)) = uri.split_once("/tree/") {
        let (tag, subpath) = rest.split_once('/').unwrap_or((rest, ""));
        Ok((format!("{}/archive/{}.zip", base, tag), subpath.to_string()))
    } else {
        // A link to the repository root.
        Ok((
            format!("{}/archive/master.zip", uri.trim_end_matches('/')),
            String::new(),
        ))
    }
}

/// Filter archive entries down to the public-usage corpus and decode them.
fn filter_archive(bytes: &[u8], package: &str, subpath: Option<&str>) -> Corpus {
    let mut corpus = Corpus::new();
    let mut archive = match zip::ZipArchive::new(Cursor::new(bytes)) {
        Ok(archive) => archive,
        Err(e) => {
            tracing::warn!("unreadable archive for {}: {}", package, e);
            return corpus;
        }
    };

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
        if !is_relevant_entry(&name, package, subpath) {
            continue;
        }

        let mut raw = Vec::new();
        if let Err(e) = entry.read_to_end(&mut raw) {
            tracing::warn!("unable to read corpus file {}: {}", name, e);
            continue;
        }
        let text = match String::from_utf8(raw) {
            Ok(text) => text,
            // Escape-based fallback for files with stray non-UTF-8 bytes.
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        };
        corpus.insert(name, text);
    }
    corpus
}

/// Entry filter: accepted extension, under the package (or custom subpath)
/// tree, and inside a samples/examples/tests directory or a README.
fn is_relevant_entry(name: &str, package: &str, subpath: Option<&str>) -> bool {
    if !has_accepted_extension(name) {
        return false;
    }
    let under_tree = match subpath {
        // An empty subpath means the whole archive is in scope.
        Some(sub) => name.contains(sub),
        None => name
            .rsplit_once("/sdk/")
            .is_some_and(|(_, tail)| tail.contains(package)),
    };
    under_tree && USAGE_MARKERS.iter().any(|marker| name.contains(marker))
}

fn has_accepted_extension(name: &str) -> bool {
    let basename = name.rsplit('/').next().unwrap_or(name);
    match basename.rsplit_once('.') {
        Some((_, ext)) => ACCEPTED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()),
        None => false,
    }
}

fn sanitize_key(part: &str) -> String {
    part.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    /// In-memory archive client for tests.
    pub(crate) struct MockArchive {
        archives: HashMap<String, Vec<u8>>,
    }

    impl MockArchive {
        pub(crate) fn new() -> Self {
            Self {
                archives: HashMap::new(),
            }
        }

        pub(crate) fn with(mut self, uri: &str, bytes: Vec<u8>) -> Self {
            self.archives.insert(uri.to_string(), bytes);
            self
        }
    }

    impl ArchiveClient for MockArchive {
        fn fetch(&self, uri: &str) -> Result<Option<Vec<u8>>> {
            Ok(self.archives.get(uri).cloned())
        }
    }

    pub(crate) fn make_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default();
        for (name, body) in entries {
            writer.start_file(name.to_string(), options).unwrap();
            writer.write_all(body).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    fn test_settings(dir: &std::path::Path) -> Settings {
        Settings {
            cache_dir: dir.to_path_buf(),
            archive_base: "https://github.example/org".to_string(),
            ..Settings::default()
        }
    }

    #[test]
    fn test_parse_repo_link_release_tag() {
        let (uri, sub) = parse_repo_link(
            "https://github.example/acme/storage/tree/releases/4.0.0/Acme.Storage.Samples",
        )
        .unwrap();
        assert_eq!(uri, "https://github.example/acme/storage/archive/releases/4.0.0.zip");
        assert_eq!(sub, "Acme.Storage.Samples");
    }

    #[test]
    fn test_parse_repo_link_plain_tag_without_subpath() {
        let (uri, sub) = parse_repo_link("https://github.example/acme/storage/tree/v12").unwrap();
        assert_eq!(uri, "https://github.example/acme/storage/archive/v12.zip");
        assert_eq!(sub, "");
    }

    #[test]
    fn test_parse_repo_link_repo_root() {
        let (uri, sub) = parse_repo_link("https://github.example/acme/storage").unwrap();
        assert_eq!(uri, "https://github.example/acme/storage/archive/master.zip");
        assert_eq!(sub, "");
    }

    #[test]
    fn test_parse_repo_link_rejects_non_links() {
        assert!(parse_repo_link("NA-ish garbage").is_err());
    }

    #[test]
    fn test_entry_filter() {
        // In scope: accepted extension, under the package's sdk tree, in a
        // usage directory.
        assert!(is_relevant_entry(
            "repo-1.0/sdk/hubs/messaging-hubs/samples/send.py",
            "messaging-hubs",
            None
        ));
        assert!(is_relevant_entry(
            "repo-1.0/sdk/hubs/messaging-hubs/README.md",
            "messaging-hubs",
            None
        ));
        // Implementation code is not usage content.
        assert!(!is_relevant_entry(
            "repo-1.0/sdk/hubs/messaging-hubs/src/client.py",
            "messaging-hubs",
            None
        ));
        // Wrong package.
        assert!(!is_relevant_entry(
            "repo-1.0/sdk/storage/blob/samples/upload.py",
            "messaging-hubs",
            None
        ));
        // Unaccepted extension.
        assert!(!is_relevant_entry(
            "repo-1.0/sdk/hubs/messaging-hubs/samples/image.png",
            "messaging-hubs",
            None
        ));
        // Custom subpath overrides the sdk-tree rule; empty means everything.
        assert!(is_relevant_entry(
            "storage-4.0/Acme.Storage.Samples/tests/smoke.cs",
            "unrelated",
            Some("Acme.Storage.Samples")
        ));
        assert!(is_relevant_entry(
            "anything-0.1/samples/quickstart.md",
            "unrelated",
            Some("")
        ));
    }

    #[test]
    fn test_fetch_filters_and_decodes() {
        let tmp = tempfile::tempdir().unwrap();
        let zip_bytes = make_zip(&[
            (
                "repo-5.2.0/sdk/hubs/messaging-hubs/samples/send.py",
                b"producer.send_batch(batch)".as_slice(),
            ),
            (
                "repo-5.2.0/sdk/hubs/messaging-hubs/src/internal.py",
                b"def _private(): pass".as_slice(),
            ),
            (
                "repo-5.2.0/sdk/hubs/messaging-hubs/samples/notes.bin",
                b"\x00\x01\x02".as_slice(),
            ),
        ]);
        let client = MockArchive::new().with(
            "https://github.example/org/repo/archive/messaging-hubs_5.2.0.zip",
            zip_bytes,
        );
        let settings = test_settings(tmp.path());
        let fetcher = CorpusFetcher::new(&settings, &client);

        let corpus = fetcher.fetch("repo", "messaging-hubs", "5.2.0", None);
        assert_eq!(corpus.len(), 1);
        assert!(corpus
            .values()
            .next()
            .unwrap()
            .contains("send_batch"));

        // Second fetch is served from the trimmed cache even without the
        // archive available.
        let empty_client = MockArchive::new();
        let cached_fetcher = CorpusFetcher::new(&settings, &empty_client);
        let cached = cached_fetcher.fetch("repo", "messaging-hubs", "5.2.0", None);
        assert_eq!(cached, corpus);
    }

    #[test]
    fn test_lossy_decode_keeps_mostly_text_entries() {
        let zip_bytes = make_zip(&[(
            "repo-1.0/sdk/x/pkg/samples/readme.txt",
            b"almost text \xff here".as_slice(),
        )]);
        let tmp = tempfile::tempdir().unwrap();
        let client = MockArchive::new().with(
            "https://github.example/org/repo/archive/pkg_1.0.zip",
            zip_bytes,
        );
        let settings = test_settings(tmp.path());
        let corpus = CorpusFetcher::new(&settings, &client).fetch("repo", "pkg", "1.0", None);
        assert_eq!(corpus.len(), 1);
        assert!(corpus.values().next().unwrap().contains("almost text"));
    }

    #[test]
    fn test_not_found_archive_yields_empty_corpus_and_ledger_entry() {
        let tmp = tempfile::tempdir().unwrap();
        let ledger = tmp.path().join("missing.tsv");
        let settings = Settings {
            cache_dir: tmp.path().join("cache"),
            archive_base: "https://github.example/org".to_string(),
            missing_training_ledger: Some(ledger.clone()),
            ..Settings::default()
        };
        let client = MockArchive::new();
        let corpus = CorpusFetcher::new(&settings, &client).fetch("repo", "gone", "0.1.0", None);

        assert!(corpus.is_empty());
        let logged = std::fs::read_to_string(&ledger).unwrap();
        assert!(logged.contains("gone\t0.1.0"));
    }

    #[test]
    fn test_default_branch_fallback() {
        let zip_bytes = make_zip(&[(
            "storage-main/Acme.Storage/samples/quick.cs",
            b"var client = new StorageClient();".as_slice(),
        )]);
        let tmp = tempfile::tempdir().unwrap();
        // Only the main.zip variant exists; master.zip is not found.
        let client = MockArchive::new().with(
            "https://github.example/acme/storage/archive/main.zip",
            zip_bytes,
        );
        let settings = test_settings(tmp.path());
        let fetcher = CorpusFetcher::new(&settings, &client);

        let corpus = fetcher.fetch(
            "repo",
            "Acme.Storage",
            "4.0.0",
            Some("https://github.example/acme/storage"),
        );
        assert_eq!(corpus.len(), 1);
    }

    #[test]
    fn test_malformed_custom_link_falls_back_to_canonical() {
        let zip_bytes = make_zip(&[(
            "repo-2.0/sdk/x/pkg/tests/test_client.py",
            b"client = PkgClient()".as_slice(),
        )]);
        let tmp = tempfile::tempdir().unwrap();
        let client = MockArchive::new().with(
            "https://github.example/org/repo/archive/pkg_2.0.zip",
            zip_bytes,
        );
        let settings = test_settings(tmp.path());
        let fetcher = CorpusFetcher::new(&settings, &client);

        let corpus = fetcher.fetch("repo", "pkg", "2.0", Some("not a link at all"));
        assert_eq!(corpus.len(), 1);
    }
}
