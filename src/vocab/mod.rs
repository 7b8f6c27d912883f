//! Discriminating-vocabulary construction.
//!
//! Tokens seen in both generations carry no signal, and ordinary English
//! words match prose unrelated to the SDK generation, so both are stripped.
//! What remains is a pair of disjoint sets per side that actually tells the
//! two lineages apart.

use rustc_hash::FxHashSet;
use std::sync::OnceLock;

/// Whether a string is a recognized natural-language word. Used only during
/// vocabulary filtering.
pub trait Dictionary {
    fn is_word(&self, word: &str) -> bool;
}

/// Dictionary backed by a bundled common-English word list. Lookup is
/// case-insensitive.
pub struct BundledDictionary;

fn bundled_words() -> &'static FxHashSet<&'static str> {
    static WORDS: OnceLock<FxHashSet<&'static str>> = OnceLock::new();
    WORDS.get_or_init(|| {
        include_str!("words.txt")
            .lines()
            .map(str::trim)
            .filter(|w| !w.is_empty())
            .collect()
    })
}

impl Dictionary for BundledDictionary {
    fn is_word(&self, word: &str) -> bool {
        bundled_words().contains(word.to_ascii_lowercase().as_str())
    }
}

/// Disjoint token sets discriminating the new generation from the old.
#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    pub only_new: FxHashSet<String>,
    pub only_old: FxHashSet<String>,
}

/// Disjoint version-identifier sets (package names and version prefixes).
#[derive(Debug, Clone, Default)]
pub struct VersionVocabulary {
    pub only_new: FxHashSet<String>,
    pub only_old: FxHashSet<String>,
}

/// Set-difference the two sides' tokens, dropping the intersection, tokens
/// with no ASCII letter, and dictionary words.
pub fn build_token_vocabulary(
    new_tokens: &FxHashSet<String>,
    old_tokens: &FxHashSet<String>,
    dictionary: &dyn Dictionary,
) -> Vocabulary {
    Vocabulary {
        only_new: difference_side(new_tokens, old_tokens, |t| {
            !has_ascii_letter(t) || dictionary.is_word(t)
        }),
        only_old: difference_side(old_tokens, new_tokens, |t| {
            !has_ascii_letter(t) || dictionary.is_word(t)
        }),
    }
}

/// Version identifiers are differenced the same way, but letterless entries
/// (bare version numbers) are kept; only blank entries and dictionary words
/// are dropped.
pub fn build_version_vocabulary(
    new_versions: &FxHashSet<String>,
    old_versions: &FxHashSet<String>,
    dictionary: &dyn Dictionary,
) -> VersionVocabulary {
    VersionVocabulary {
        only_new: difference_side(new_versions, old_versions, |t| {
            t.trim().is_empty() || dictionary.is_word(t)
        }),
        only_old: difference_side(old_versions, new_versions, |t| {
            t.trim().is_empty() || dictionary.is_word(t)
        }),
    }
}

fn difference_side(
    ours: &FxHashSet<String>,
    theirs: &FxHashSet<String>,
    mut is_noise: impl FnMut(&str) -> bool,
) -> FxHashSet<String> {
    ours.iter()
        .filter(|t| !theirs.contains(*t) && !is_noise(t))
        .cloned()
        .collect()
}

fn has_ascii_letter(token: &str) -> bool {
    token.chars().any(|c| c.is_ascii_alphabetic())
}
