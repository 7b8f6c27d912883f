//! Tokenization: free-text word/punct splitting, structured API-surface
//! extraction, and markdown code-fence extraction.
//!
//! Downstream only ever looks at set membership, so every tokenizer here
//! returns de-duplicated sets and order is irrelevant.

mod fences;
mod surface;

pub use fences::extract_code_fences;
pub use surface::{
    ApiSurface, FsSurfaceProvider, NavigationNode, NavigationTags, NoSurfaces, SurfaceProvider,
    SurfaceToken, TokenKind, surface_token_set, tokenize_surface,
};

use rustc_hash::FxHashSet;

/// Split text into a set of tokens: maximal runs of word characters
/// (alphanumerics and `_`) and maximal runs of non-whitespace punctuation
/// each form one token.
///
/// Empty input yields an empty set. The punctuation runs look like noise but
/// are kept here on purpose; the vocabulary builder strips letterless tokens
/// later, and other callers may want them.
pub fn tokenize_text(text: &str) -> FxHashSet<String> {
    let mut tokens = FxHashSet::default();
    let mut current = String::new();
    let mut current_is_word = false;

    for ch in text.chars() {
        if ch.is_whitespace() {
            if !current.is_empty() {
                tokens.insert(std::mem::take(&mut current));
            }
            continue;
        }
        let is_word = ch.is_alphanumeric() || ch == '_';
        if !current.is_empty() && is_word != current_is_word {
            tokens.insert(std::mem::take(&mut current));
        }
        current.push(ch);
        current_is_word = is_word;
    }
    if !current.is_empty() {
        tokens.insert(current);
    }
    tokens
}
