//! Batch classification pipeline.
//!
//! Classifying a repository's worth of documents is embarrassingly parallel:
//! the trained model is read-only, so the batch is split into contiguous
//! near-equal chunks, one worker thread per chunk, with (path, result) pairs
//! flowing back over a channel. The receiver blocks until every sender hangs
//! up and the workers are joined explicitly — no polling.

use crossbeam_channel::unbounded;

use crate::classifier::{TrackClassifier, Verdict};

/// One document's classification outcome.
#[derive(Debug, Clone)]
pub struct DocumentResult {
    pub is_track1: bool,
    /// Present when the batch ran in verbose mode.
    pub verdict: Option<Verdict>,
}

/// Classify a batch of (path, text) documents.
///
/// With `workers <= 1` the batch runs inline on the calling thread. Results
/// arrive in completion order, not input order; every input path appears
/// exactly once.
pub fn classify_batch(
    classifier: &TrackClassifier,
    documents: Vec<(String, String)>,
    workers: usize,
    verbose: bool,
) -> Vec<(String, DocumentResult)> {
    if workers <= 1 || documents.len() <= 1 {
        return documents
            .into_iter()
            .map(|(path, text)| {
                let result = classify_one(classifier, &text, verbose);
                (path, result)
            })
            .collect();
    }

    let total = documents.len();
    let chunk_size = total.div_ceil(workers);
    let chunks: Vec<Vec<(String, String)>> = documents
        .chunks(chunk_size)
        .map(|chunk| chunk.to_vec())
        .collect();

    let (sender, receiver) = unbounded();
    let mut results = Vec::with_capacity(total);

    std::thread::scope(|scope| {
        let mut handles = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            let sender = sender.clone();
            handles.push(scope.spawn(move || {
                for (path, text) in chunk {
                    let result = classify_one(classifier, &text, verbose);
                    // The parent holds the receiver for the whole scope, so
                    // a send can only fail if it panicked; nothing to do
                    // about that here.
                    let _ = sender.send((path, result));
                }
            }));
        }
        // Drop the spare sender so the channel closes once workers finish.
        drop(sender);

        for received in receiver.iter() {
            results.push(received);
        }
        for handle in handles {
            let _ = handle.join();
        }
    });

    results
}

fn classify_one(classifier: &TrackClassifier, text: &str, verbose: bool) -> DocumentResult {
    if verbose {
        let verdict = classifier.is_track1_verbose(text, false);
        DocumentResult {
            is_track1: verdict.is_track1,
            verdict: Some(verdict),
        }
    } else {
        DocumentResult {
            is_track1: classifier.is_track1(text),
            verdict: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::TrainedModel;
    use crate::vocab::{Vocabulary, VersionVocabulary};
    use rustc_hash::FxHashSet;
    use std::collections::BTreeMap;

    fn set(items: &[&str]) -> FxHashSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn classifier() -> TrackClassifier {
        let model = TrainedModel::new(
            Vocabulary {
                only_new: set(&["FooClientV2"]),
                only_old: set(&["FooClientLegacy"]),
            },
            VersionVocabulary::default(),
        );
        // A snapshot round-trip gives a TrackClassifier without
        // network-backed training.
        let snapshot = crate::classifier::ModelSnapshot::capture(&model, None, None);
        TrackClassifier::from_snapshot(snapshot)
    }

    fn sample_documents(n: usize) -> Vec<(String, String)> {
        (0..n)
            .map(|i| {
                let text = if i % 3 == 0 {
                    "client = FooClientLegacy()".to_string()
                } else {
                    "client = FooClientV2()".to_string()
                };
                (format!("doc-{}", i), text)
            })
            .collect()
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let classifier = classifier();
        let documents = sample_documents(23);

        let sequential: BTreeMap<String, bool> =
            classify_batch(&classifier, documents.clone(), 1, false)
                .into_iter()
                .map(|(path, result)| (path, result.is_track1))
                .collect();
        let parallel: BTreeMap<String, bool> = classify_batch(&classifier, documents, 4, false)
            .into_iter()
            .map(|(path, result)| (path, result.is_track1))
            .collect();

        assert_eq!(sequential.len(), 23);
        assert_eq!(sequential, parallel);
    }

    #[test]
    fn test_verbose_batch_carries_verdicts() {
        let classifier = classifier();
        let results = classify_batch(&classifier, sample_documents(6), 2, true);
        assert_eq!(results.len(), 6);
        for (_, result) in &results {
            let verdict = result.verdict.as_ref().expect("verbose mode keeps verdicts");
            assert_eq!(verdict.is_track1, result.is_track1);
        }
    }

    #[test]
    fn test_more_workers_than_documents() {
        let classifier = classifier();
        let results = classify_batch(&classifier, sample_documents(2), 16, false);
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_empty_batch() {
        let classifier = classifier();
        assert!(classify_batch(&classifier, Vec::new(), 4, false).is_empty());
    }
}
