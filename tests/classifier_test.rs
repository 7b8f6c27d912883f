//! End-to-end training and classification over stub collaborators.
//!
//! These tests exercise the whole pipeline — release metadata, corpus
//! fetching and filtering, vocabulary construction, secondary-classifier
//! fitting, persistence, and batch classification — without any network.

use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

use tracksift::classifier::{Collaborators, TrackClassifier};
use tracksift::config::Settings;
use tracksift::corpus::{ArchiveClient, ReleaseIndex};
use tracksift::models::{Language, ReleaseRecord, ServiceReleases};
use tracksift::pipeline::classify_batch;
use tracksift::tokenize::{FsSurfaceProvider, NoSurfaces};
use tracksift::vocab::BundledDictionary;

const ARCHIVE_BASE: &str = "https://github.example/org";

struct StubReleaseIndex {
    releases: ServiceReleases,
}

impl ReleaseIndex for StubReleaseIndex {
    fn releases_for(&self, language: Language) -> tracksift::Result<ServiceReleases> {
        if language == Language::Python {
            Ok(self.releases.clone())
        } else {
            Ok(ServiceReleases::new())
        }
    }
}

struct StubArchive {
    archives: HashMap<String, Vec<u8>>,
}

impl ArchiveClient for StubArchive {
    fn fetch(&self, uri: &str) -> tracksift::Result<Option<Vec<u8>>> {
        Ok(self.archives.get(uri).cloned())
    }
}

fn record(package: &str, version: &str, is_new: bool) -> ReleaseRecord {
    ReleaseRecord {
        package: package.to_string(),
        version_ga: version.to_string(),
        version_preview: String::new(),
        repo_path: package.to_string(),
        is_new_generation: is_new,
        service: "Event Hubs".to_string(),
        group_id: None,
    }
}

fn make_zip(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default();
    for (name, body) in entries {
        writer.start_file(name.to_string(), options).unwrap();
        writer.write_all(body.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

fn canonical_uri(package: &str, version: &str) -> String {
    format!(
        "{}/{}/archive/{}_{}.zip",
        ARCHIVE_BASE,
        Language::Python.repo(),
        package,
        version
    )
}

const NEW_SAMPLE: &str = "\
from messaging.hubs import HubProducerClient

producer = HubProducerClient.from_connection_string(conn_str)
batch = producer.create_batch()
producer.send_batch(batch)
";

const OLD_SAMPLE: &str = "\
from messaging import HubClient

hub = HubClient.from_iot_connection(conn_str)
sender = hub.add_sender()
sender.send_event(event_payload)
";

/// Stub collaborators over one new and one old package, plus an old package
/// whose archive does not exist anywhere.
fn stub_collaborators() -> Collaborators {
    let releases = StubReleaseIndex {
        releases: ServiceReleases::from([(
            "Event Hubs".to_string(),
            vec![
                record("messaging-hubs", "5.2.0", true),
                record("legacy-hubs", "1.4.3", false),
                record("ghost-hubs", "0.9.0", false),
            ],
        )]),
    };

    let new_zip = make_zip(&[(
        "azure-sdk-for-python-main/sdk/hubs/messaging-hubs/samples/send.py",
        NEW_SAMPLE,
    )]);
    let old_zip = make_zip(&[(
        "azure-sdk-for-python-main/sdk/hubs/legacy-hubs/samples/send.py",
        OLD_SAMPLE,
    )]);
    let archives = StubArchive {
        archives: HashMap::from([
            (canonical_uri("messaging-hubs", "5.2.0"), new_zip),
            (canonical_uri("legacy-hubs", "1.4.3"), old_zip),
            // ghost-hubs intentionally absent
        ]),
    };

    Collaborators {
        releases: Box::new(releases),
        archives: Box::new(archives),
        surfaces: Box::new(NoSurfaces),
        dictionary: Box::new(BundledDictionary),
    }
}

fn test_settings(dir: &Path) -> Settings {
    Settings {
        cache_dir: dir.join("cache"),
        supplemental_corpus_dir: dir.join("supplemental"),
        surface_listing_dir: dir.join("surfaces"),
        missing_training_ledger: Some(dir.join("missing.tsv")),
        archive_base: ARCHIVE_BASE.to_string(),
        ..Settings::default()
    }
}

fn train(dir: &Path) -> TrackClassifier {
    TrackClassifier::train_with(
        Some(Language::Python),
        Some("Event Hubs"),
        &test_settings(dir),
        &stub_collaborators(),
    )
    .expect("training over stub collaborators succeeds")
}

#[test]
fn test_end_to_end_classification() {
    let tmp = tempfile::tempdir().unwrap();
    let classifier = train(tmp.path());

    // Old-generation API usage reads as track 1.
    assert!(classifier.is_track1("hub = HubClient.from_iot_connection(cs)"));
    // New-generation API usage does not.
    assert!(!classifier.is_track1("producer = HubProducerClient.from_connection_string(cs)"));
    // Version identifiers alone are enough evidence.
    assert!(classifier.is_track1("pip install legacy-hubs==1.4.3"));
    assert!(!classifier.is_track1("pip install messaging-hubs==5.2.0"));
}

#[test]
fn test_empty_and_unrelated_text() {
    let tmp = tempfile::tempdir().unwrap();
    let classifier = train(tmp.path());

    assert!(!classifier.is_track1(""));

    let verdict = classifier.is_track1_verbose("", false);
    assert!(!verdict.is_track1);
    assert_eq!(verdict.new_token_count, 0);
    assert_eq!(verdict.old_token_count, 0);
    assert_eq!(verdict.new_token_ratio, 0.0);
    assert_eq!(verdict.old_token_ratio, 0.0);
    assert_eq!(verdict.new_version_count, 0);
    assert_eq!(verdict.old_version_count, 0);

    assert!(!classifier.is_track1("the weather is lovely today"));
}

#[test]
fn test_verbose_reports_secondary_classifier() {
    let tmp = tempfile::tempdir().unwrap();
    let classifier = train(tmp.path());

    let verdict = classifier.is_track1_verbose("sender.send_event(event_payload)", false);
    assert!(verdict.is_track1);
    // Training saw documents, so the MLP was fitted and reports both a
    // verdict and log-probabilities.
    assert!(verdict.mlp_is_track1.is_some());
    let log_proba = verdict.mlp_log_proba.expect("fitted mlp");
    assert!((log_proba[0].exp() + log_proba[1].exp() - 1.0).abs() < 1e-6);
}

#[test]
fn test_missing_archive_degrades_to_empty_corpus() {
    let tmp = tempfile::tempdir().unwrap();
    // Training succeeded even though ghost-hubs has no archive, and the
    // other packages' vocabulary is intact.
    let classifier = train(tmp.path());
    assert!(classifier.is_track1("hub = HubClient.from_iot_connection(cs)"));

    // The unfetchable package was recorded for triage.
    let ledger = std::fs::read_to_string(tmp.path().join("missing.tsv")).unwrap();
    assert!(ledger.contains("ghost-hubs\t0.9.0"));
    assert!(!ledger.contains("legacy-hubs\t1.4.3"));
}

#[test]
fn test_save_load_round_trip_classifies_identically() {
    let tmp = tempfile::tempdir().unwrap();
    let classifier = train(tmp.path());

    let path = classifier.save(Some(&tmp.path().join("eh.model"))).unwrap();
    let loaded = TrackClassifier::load(&path).unwrap();
    assert_eq!(loaded.language(), Some(Language::Python));
    assert_eq!(loaded.service(), Some("Event Hubs"));

    let samples = [
        "hub = HubClient.from_iot_connection(cs)",
        "producer = HubProducerClient.from_connection_string(cs)",
        "pip install legacy-hubs==1.4.3",
        "",
        "nothing relevant here",
    ];
    for text in samples {
        assert_eq!(
            classifier.is_track1(text),
            loaded.is_track1(text),
            "diverged on {:?}",
            text
        );
    }
}

#[test]
fn test_batch_classification_matches_sequential() {
    let tmp = tempfile::tempdir().unwrap();
    let classifier = train(tmp.path());

    let documents: Vec<(String, String)> = (0..17)
        .map(|i| {
            let text = match i % 3 {
                0 => "hub = HubClient.from_iot_connection(cs)",
                1 => "producer = HubProducerClient.from_connection_string(cs)",
                _ => "unrelated prose",
            };
            (format!("doc-{}", i), text.to_string())
        })
        .collect();

    let mut sequential: Vec<(String, bool)> =
        classify_batch(&classifier, documents.clone(), 1, false)
            .into_iter()
            .map(|(path, result)| (path, result.is_track1))
            .collect();
    let mut parallel: Vec<(String, bool)> = classify_batch(&classifier, documents, 4, false)
        .into_iter()
        .map(|(path, result)| (path, result.is_track1))
        .collect();

    sequential.sort();
    parallel.sort();
    assert_eq!(sequential, parallel);
}

#[test]
fn test_surface_listing_preferred_over_corpus_tokens() {
    let tmp = tempfile::tempdir().unwrap();
    let surfaces_dir = tmp.path().join("surfaces");
    std::fs::create_dir_all(&surfaces_dir).unwrap();
    std::fs::write(
        surfaces_dir.join("python_messaging-hubs_5.2.0.json"),
        r#"{
            "Tokens": [
                {"Kind": 6, "Value": "HubProducerClient"},
                {"Kind": 7, "Value": "schedule_batch_dispatch"}
            ]
        }"#,
    )
    .unwrap();

    let mut collaborators = stub_collaborators();
    collaborators.surfaces = Box::new(FsSurfaceProvider::new(surfaces_dir));

    let classifier = TrackClassifier::train_with(
        Some(Language::Python),
        Some("Event Hubs"),
        &test_settings(tmp.path()),
        &collaborators,
    )
    .unwrap();

    // The listing's symbol discriminates even though it never appears in the
    // fetched corpus text.
    assert!(!classifier.is_track1("client.schedule_batch_dispatch(batch)"));
    // Free-text tokens from the corpus (like send_batch) were not mined for
    // this package because the listing took precedence.
    let verdict = classifier.is_track1_verbose("producer.send_batch(batch)", false);
    assert_eq!(verdict.new_token_count, 0);
}

#[test]
fn test_training_with_supplemental_corpus() {
    let tmp = tempfile::tempdir().unwrap();
    let supplemental = tmp.path().join("supplemental/python/Event Hubs");
    std::fs::create_dir_all(supplemental.join("track1")).unwrap();
    std::fs::create_dir_all(supplemental.join("track2")).unwrap();
    std::fs::write(
        supplemental.join("track1/real_world.txt"),
        "hub = HubClient.from_iot_connection(cs)\nsender.send_event(x)\n",
    )
    .unwrap();
    std::fs::write(
        supplemental.join("track2/real_world.txt"),
        "producer = HubProducerClient.from_connection_string(cs)\n",
    )
    .unwrap();

    let classifier = TrackClassifier::train_with(
        Some(Language::Python),
        Some("Event Hubs"),
        &test_settings(tmp.path()),
        &stub_collaborators(),
    )
    .unwrap();

    assert!(classifier.is_track1("sender.send_event(x)"));
    assert!(!classifier.is_track1("producer.create_batch()"));
}
