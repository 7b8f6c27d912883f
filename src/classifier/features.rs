//! Feature extraction: map arbitrary text to a fixed 6-component vector
//! against a vocabulary pair.

use serde::{Deserialize, Serialize};

use crate::tokenize::tokenize_text;
use crate::vocab::{Vocabulary, VersionVocabulary};

/// The matched evidence behind a feature vector, kept separately so verbose
/// classification can report (and log) exactly which tokens fired.
#[derive(Debug, Clone, Default)]
pub struct MatchedEvidence {
    pub new_tokens: Vec<String>,
    pub old_tokens: Vec<String>,
    pub new_versions: Vec<String>,
    pub old_versions: Vec<String>,
}

/// Fixed-length numeric representation of one document.
///
/// Both ratios are normalized by the size of the only-new vocabulary. That
/// shared denominator is load-bearing: the decision thresholds were tuned
/// against it, so changing it means re-tuning the rule as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FeatureVector {
    pub new_token_count: f64,
    pub old_token_count: f64,
    pub new_token_ratio: f64,
    pub old_token_ratio: f64,
    pub new_version_count: f64,
    pub old_version_count: f64,
}

impl FeatureVector {
    /// Extract the feature vector for `text`. Pure; empty input simply
    /// produces the zero vector.
    pub fn extract(text: &str, vocabulary: &Vocabulary, versions: &VersionVocabulary) -> Self {
        Self::from_evidence(&find_evidence(text, vocabulary, versions), vocabulary)
    }

    /// Extract along with the matched token sets.
    pub fn extract_with_evidence(
        text: &str,
        vocabulary: &Vocabulary,
        versions: &VersionVocabulary,
    ) -> (Self, MatchedEvidence) {
        let evidence = find_evidence(text, vocabulary, versions);
        let vector = Self::from_evidence(&evidence, vocabulary);
        (vector, evidence)
    }

    fn from_evidence(evidence: &MatchedEvidence, vocabulary: &Vocabulary) -> Self {
        let new_count = evidence.new_tokens.len() as f64;
        let old_count = evidence.old_tokens.len() as f64;
        let denominator = (vocabulary.only_new.len() as f64).max(1.0);
        Self {
            new_token_count: new_count,
            old_token_count: old_count,
            new_token_ratio: new_count / denominator,
            old_token_ratio: old_count / denominator,
            new_version_count: evidence.new_versions.len() as f64,
            old_version_count: evidence.old_versions.len() as f64,
        }
    }

    pub fn from_array(values: [f64; 6]) -> Self {
        Self {
            new_token_count: values[0],
            old_token_count: values[1],
            new_token_ratio: values[2],
            old_token_ratio: values[3],
            new_version_count: values[4],
            old_version_count: values[5],
        }
    }

    pub fn to_array(self) -> [f64; 6] {
        [
            self.new_token_count,
            self.old_token_count,
            self.new_token_ratio,
            self.old_token_ratio,
            self.new_version_count,
            self.old_version_count,
        ]
    }

    pub fn is_zero(&self) -> bool {
        self.to_array().iter().all(|&v| v == 0.0)
    }
}

fn find_evidence(
    text: &str,
    vocabulary: &Vocabulary,
    versions: &VersionVocabulary,
) -> MatchedEvidence {
    let tokens = tokenize_text(text);
    let mut new_tokens: Vec<String> = vocabulary
        .only_new
        .iter()
        .filter(|t| tokens.contains(*t))
        .cloned()
        .collect();
    let mut old_tokens: Vec<String> = vocabulary
        .only_old
        .iter()
        .filter(|t| tokens.contains(*t))
        .cloned()
        .collect();
    // Version strings rarely tokenize cleanly, so they are matched as raw
    // substrings instead.
    let mut new_versions: Vec<String> = versions
        .only_new
        .iter()
        .filter(|v| text.contains(v.as_str()))
        .cloned()
        .collect();
    let mut old_versions: Vec<String> = versions
        .only_old
        .iter()
        .filter(|v| text.contains(v.as_str()))
        .cloned()
        .collect();
    new_tokens.sort();
    old_tokens.sort();
    new_versions.sort();
    old_versions.sort();
    MatchedEvidence {
        new_tokens,
        old_tokens,
        new_versions,
        old_versions,
    }
}
