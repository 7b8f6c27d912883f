//! The trained model: vocabularies plus an optional fitted MLP, and the two
//! decision functions over them.

use serde::Serialize;

use super::features::FeatureVector;
use super::mlp::MlpClassifier;
use crate::vocab::{Vocabulary, VersionVocabulary};

/// How strongly a matched version identifier counts relative to a matched
/// vocabulary token. Empirically chosen; tune together with the rule below.
pub const VERSION_EVIDENCE_WEIGHT: f64 = 2.0;

/// Verbose classification record.
#[derive(Debug, Clone, Serialize)]
pub struct Verdict {
    /// The rule-based decision. This is the result callers act on.
    pub is_track1: bool,
    /// The fitted MLP's decision, when a fitted MLP exists.
    pub mlp_is_track1: Option<bool>,
    /// `[ln p(track1), ln p(track2)]` from the fitted MLP.
    pub mlp_log_proba: Option<[f64; 2]>,
    pub new_token_count: usize,
    pub old_token_count: usize,
    pub new_token_ratio: f64,
    pub old_token_ratio: f64,
    pub new_version_count: usize,
    pub old_version_count: usize,
}

/// Vocabularies and the optional secondary classifier produced by training.
///
/// Only ever observed fully populated: the orchestrator builds it in one
/// pass and nothing mutates it afterwards, so classification needs no
/// locking.
#[derive(Debug, Clone)]
pub struct TrainedModel {
    vocabulary: Vocabulary,
    versions: VersionVocabulary,
    mlp: Option<MlpClassifier>,
}

impl TrainedModel {
    pub fn new(vocabulary: Vocabulary, versions: VersionVocabulary) -> Self {
        Self {
            vocabulary,
            versions,
            mlp: None,
        }
    }

    pub fn with_mlp(mut self, mlp: MlpClassifier) -> Self {
        self.mlp = Some(mlp);
        self
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn versions(&self) -> &VersionVocabulary {
        &self.versions
    }

    pub fn mlp(&self) -> Option<&MlpClassifier> {
        self.mlp.as_ref()
    }

    pub fn feature_vector(&self, text: &str) -> FeatureVector {
        FeatureVector::extract(text, &self.vocabulary, &self.versions)
    }

    /// Rule-based decision: does this text read as track 1?
    ///
    /// Available as soon as a vocabulary exists; the MLP is never required.
    pub fn classify(&self, text: &str) -> bool {
        rule_decision(&self.feature_vector(text))
    }

    /// Rule-based decision plus the MLP's opinion and the full feature
    /// breakdown. With `extra_logging`, the matched token and version sets
    /// are also emitted through tracing.
    pub fn classify_verbose(&self, text: &str, extra_logging: bool) -> Verdict {
        let (vector, evidence) =
            FeatureVector::extract_with_evidence(text, &self.vocabulary, &self.versions);
        if extra_logging {
            tracing::info!(
                "matched new_versions: {:?} old_versions: {:?} new_tokens: {:?} old_tokens: {:?}",
                evidence.new_versions,
                evidence.old_versions,
                evidence.new_tokens,
                evidence.old_tokens
            );
        }

        let mlp_verdict = self.mlp.as_ref().map(|mlp| {
            let prediction = mlp.predict(&vector);
            // The MLP has never seen an all-zero vector in training, so its
            // opinion on one is noise; require some evidence before trusting
            // it.
            (
                prediction.is_track1 && !vector.is_zero(),
                mlp.predict_log_proba(&vector),
            )
        });

        Verdict {
            is_track1: rule_decision(&vector),
            mlp_is_track1: mlp_verdict.map(|(result, _)| result),
            mlp_log_proba: mlp_verdict.map(|(_, log_proba)| log_proba),
            new_token_count: vector.new_token_count as usize,
            old_token_count: vector.old_token_count as usize,
            new_token_ratio: vector.new_token_ratio,
            old_token_ratio: vector.old_token_ratio,
            new_version_count: vector.new_version_count as usize,
            old_version_count: vector.old_version_count as usize,
        }
    }
}

/// The human-comprehensible decision criterion: each side's token ratio plus
/// an up-weighted version-identifier bonus, track 1 iff the old side's score
/// is strictly greater.
///
/// The `max(…, 1)` clamps guard the degenerate empty-vocabulary cases, and
/// make a tie (including the all-zero vector) come out as "not track 1".
fn rule_decision(v: &FeatureVector) -> bool {
    side_score(v.new_token_ratio, v.new_token_count, v.new_version_count)
        < side_score(v.old_token_ratio, v.old_token_count, v.old_version_count)
}

fn side_score(ratio: f64, token_count: f64, version_count: f64) -> f64 {
    ratio + (ratio / token_count.max(1.0)).max(1.0) * version_count * VERSION_EVIDENCE_WEIGHT
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Generation;
    use rustc_hash::FxHashSet;

    fn set(items: &[&str]) -> FxHashSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn synthetic_model() -> TrainedModel {
        TrainedModel::new(
            Vocabulary {
                only_new: set(&["FooClientV2"]),
                only_old: set(&["FooClientLegacy"]),
            },
            VersionVocabulary::default(),
        )
    }

    #[test]
    fn test_old_token_classifies_as_track1() {
        let model = synthetic_model();
        assert!(model.classify("let c = FooClientLegacy();"));
    }

    #[test]
    fn test_new_token_classifies_as_track2() {
        let model = synthetic_model();
        assert!(!model.classify("let c = FooClientV2();"));
    }

    #[test]
    fn test_empty_text_is_not_track1() {
        let model = synthetic_model();
        assert!(!model.classify(""));

        let verdict = model.classify_verbose("", false);
        assert!(!verdict.is_track1);
        assert_eq!(verdict.new_token_count, 0);
        assert_eq!(verdict.old_token_count, 0);
        assert_eq!(verdict.new_token_ratio, 0.0);
        assert_eq!(verdict.old_token_ratio, 0.0);
        assert_eq!(verdict.new_version_count, 0);
        assert_eq!(verdict.old_version_count, 0);
        // No MLP fitted, so no MLP sub-fields.
        assert!(verdict.mlp_is_track1.is_none());
        assert!(verdict.mlp_log_proba.is_none());
    }

    #[test]
    fn test_version_evidence_outweighs_single_token() {
        let model = TrainedModel::new(
            Vocabulary {
                only_new: set(&["NewClient"]),
                only_old: set(&["OldClient"]),
            },
            VersionVocabulary {
                only_new: set(&[]),
                only_old: set(&["1.4.3"]),
            },
        );
        // One new token versus an old version identifier: the weighted
        // version bonus wins.
        assert!(model.classify("NewClient pinned at 1.4.3"));
    }

    #[test]
    fn test_verbose_reports_mlp_when_fitted() {
        let data = vec![
            ([0.0, 1.0, 0.0, 1.0, 0.0, 0.0], Generation::Track1),
            ([1.0, 0.0, 1.0, 0.0, 0.0, 0.0], Generation::Track2),
            ([0.0, 1.0, 0.0, 1.0, 0.0, 1.0], Generation::Track1),
            ([1.0, 0.0, 1.0, 0.0, 1.0, 0.0], Generation::Track2),
        ];
        let mut mlp = MlpClassifier::new(8, 7);
        mlp.fit(&data, 200, 0.1, 7);
        let model = synthetic_model().with_mlp(mlp);

        let verdict = model.classify_verbose("FooClientLegacy in use", false);
        assert!(verdict.is_track1);
        assert!(verdict.mlp_is_track1.is_some());
        let log_proba = verdict.mlp_log_proba.unwrap();
        assert!((log_proba[0].exp() + log_proba[1].exp() - 1.0).abs() < 1e-6);

        // The zero vector never gets a positive MLP verdict.
        let empty = model.classify_verbose("", false);
        assert_eq!(empty.mlp_is_track1, Some(false));
    }
}
