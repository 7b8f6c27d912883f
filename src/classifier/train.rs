//! Training orchestrator: drives release-metadata selection, corpus
//! fetching, vocabulary construction, and secondary-classifier fitting end
//! to end for one (language, service) selector.

use indicatif::ProgressBar;
use rustc_hash::FxHashSet;

use super::crossval::{cross_val_score, Example, DIAGNOSTIC_FAMILIES};
use super::mlp::MlpClassifier;
use super::trained::TrainedModel;
use super::Collaborators;
use crate::config::Settings;
use crate::corpus::CorpusFetcher;
use crate::error::Result;
use crate::models::{Corpus, Generation, Language, ReleaseRecord};
use crate::tokenize::{surface_token_set, tokenize_text};
use crate::vocab::{build_token_vocabulary, build_version_vocabulary};

/// Seed for MLP initialization and fold shuffling; fixed so repeated runs
/// over the same corpus produce the same model.
const TRAIN_SEED: u64 = 17;

const CV_FOLDS: usize = 10;
const FINAL_HIDDEN_SIZE: usize = 32;
const FINAL_EPOCHS: usize = 300;
const FINAL_LEARNING_RATE: f64 = 0.05;

/// Train a model for the given selectors. `None` is a wildcard: all known
/// languages, or every service the release index lists for a language.
///
/// A package whose archive cannot be fetched contributes an empty corpus
/// and the run continues; only an unreachable release index aborts.
pub fn train_model(
    language: Option<Language>,
    service: Option<&str>,
    settings: &Settings,
    collaborators: &Collaborators,
) -> Result<TrainedModel> {
    let mut new_metadata: Vec<(ReleaseRecord, Language)> = Vec::new();
    let mut old_metadata: Vec<(ReleaseRecord, Language)> = Vec::new();

    let languages: Vec<Language> = match language {
        Some(lang) => vec![lang],
        None => Language::ALL.to_vec(),
    };
    for lang in languages {
        let release_info = collaborators.releases.releases_for(lang)?;
        let services: Vec<&str> = match service {
            Some(name) => {
                if release_info.contains_key(name) {
                    vec![name]
                } else {
                    tracing::warn!("no service '{}' in the {} release index", name, lang);
                    Vec::new()
                }
            }
            None => release_info.keys().map(String::as_str).collect(),
        };
        for name in services {
            for record in &release_info[name] {
                if record.is_new_generation {
                    new_metadata.push((record.clone(), lang));
                } else {
                    old_metadata.push((record.clone(), lang));
                }
            }
        }
    }

    let fetcher = CorpusFetcher::new(settings, collaborators.archives.as_ref());
    let progress = ProgressBar::new((new_metadata.len() + old_metadata.len()) as u64);
    let new_side = collect_side(&new_metadata, &fetcher, collaborators, &progress);
    let old_side = collect_side(&old_metadata, &fetcher, collaborators, &progress);
    progress.finish_and_clear();

    let dictionary = collaborators.dictionary.as_ref();
    let vocabulary = build_token_vocabulary(&new_side.tokens, &old_side.tokens, dictionary);
    let versions = build_version_vocabulary(&new_side.versions, &old_side.versions, dictionary);
    tracing::info!(
        "vocabulary: {} new-only / {} old-only tokens, {} / {} version identifiers",
        vocabulary.only_new.len(),
        vocabulary.only_old.len(),
        versions.only_new.len(),
        versions.only_old.len()
    );
    let model = TrainedModel::new(vocabulary, versions);

    // The corpora themselves become the labeled training set, supplemented
    // with real-world/ambiguous examples from the local tree.
    let mut examples: Vec<Example> = Vec::new();
    for (corpus, generation) in [
        (&new_side.corpus, Generation::Track2),
        (&old_side.corpus, Generation::Track1),
    ] {
        for text in corpus.values() {
            examples.push((model.feature_vector(text).to_array(), generation));
        }
    }
    for (text, generation) in load_supplemental_corpus(settings, language, service) {
        examples.push((model.feature_vector(&text).to_array(), generation));
    }

    tracing::info!("beginning secondary-classifier training on {} documents", examples.len());
    for family in DIAGNOSTIC_FAMILIES {
        match cross_val_score(family, &examples, CV_FOLDS, TRAIN_SEED) {
            Some((mean, std)) => tracing::info!(
                "{} accuracy: {:.2} (+/- {:.2}) n={:.2}",
                family,
                mean,
                std * 2.0,
                examples.len() as f64 / CV_FOLDS as f64
            ),
            None => tracing::info!("{}: too few documents to cross-validate", family),
        }
    }

    if examples.is_empty() {
        tracing::warn!("no training documents; leaving the secondary classifier unfitted");
        return Ok(model);
    }
    let mut mlp = MlpClassifier::new(FINAL_HIDDEN_SIZE, TRAIN_SEED);
    let loss = mlp.fit(&examples, FINAL_EPOCHS, FINAL_LEARNING_RATE, TRAIN_SEED);
    tracing::info!("fitted final mlp (loss {:.4})", loss);

    Ok(model.with_mlp(mlp))
}

/// One generation side's aggregated fetch results.
struct SideAggregate {
    corpus: Corpus,
    tokens: FxHashSet<String>,
    versions: FxHashSet<String>,
}

fn collect_side(
    metadata: &[(ReleaseRecord, Language)],
    fetcher: &CorpusFetcher,
    collaborators: &Collaborators,
    progress: &ProgressBar,
) -> SideAggregate {
    let mut aggregate = SideAggregate {
        corpus: Corpus::new(),
        tokens: FxHashSet::default(),
        versions: FxHashSet::default(),
    };

    for (record, language) in metadata {
        progress.set_message(record.package.clone());
        let version = record.effective_version().unwrap_or("");
        let corpus = fetcher.fetch(
            language.repo(),
            &record.package,
            version,
            record.custom_repo_uri(),
        );

        // A surface listing gives precise, pre-labeled symbols; free-text
        // tokenization of the corpus is the fallback.
        let surface_tokens = collaborators
            .surfaces
            .surface_for(*language, &record.package, version)
            .map(|surface| surface_token_set(&surface));
        match surface_tokens {
            Some(tokens) if !tokens.is_empty() => aggregate.tokens.extend(tokens),
            _ => {
                let joined = corpus.values().cloned().collect::<Vec<_>>().join("\n");
                aggregate.tokens.extend(tokenize_text(&joined));
            }
        }

        aggregate.versions.extend(record.version_identifiers());
        aggregate.corpus.extend(corpus);
        progress.inc(1);
    }
    aggregate
}

/// Read the manually-curated supplemental corpus:
/// `<root>/<language>/<service>/<track1|track2>/<file>`, filtered to the
/// active selectors.
fn load_supplemental_corpus(
    settings: &Settings,
    language_filter: Option<Language>,
    service_filter: Option<&str>,
) -> Vec<(String, Generation)> {
    let mut documents = Vec::new();
    let root = &settings.supplemental_corpus_dir;
    let Ok(language_dirs) = std::fs::read_dir(root) else {
        return documents;
    };

    for language_dir in language_dirs.flatten() {
        let language_name = language_dir.file_name();
        let Ok(language) = language_name.to_string_lossy().parse::<Language>() else {
            continue;
        };
        if language_filter.is_some_and(|filter| filter != language) {
            continue;
        }
        let Ok(service_dirs) = std::fs::read_dir(language_dir.path()) else {
            continue;
        };
        for service_dir in service_dirs.flatten() {
            let service_name = service_dir.file_name().to_string_lossy().into_owned();
            if service_filter.is_some_and(|filter| filter != service_name) {
                continue;
            }
            let Ok(tier_dirs) = std::fs::read_dir(service_dir.path()) else {
                continue;
            };
            for tier_dir in tier_dirs.flatten() {
                let Some(generation) =
                    Generation::from_dir_name(&tier_dir.file_name().to_string_lossy())
                else {
                    continue;
                };
                let Ok(files) = std::fs::read_dir(tier_dir.path()) else {
                    continue;
                };
                for file in files.flatten() {
                    match std::fs::read_to_string(file.path()) {
                        Ok(text) => {
                            tracing::info!(
                                "incorporating supplemental corpus file: {}",
                                file.path().display()
                            );
                            documents.push((text, generation));
                        }
                        Err(e) => {
                            tracing::warn!(
                                "unreadable supplemental corpus file {}: {}",
                                file.path().display(),
                                e
                            );
                        }
                    }
                }
            }
        }
    }
    documents
}
