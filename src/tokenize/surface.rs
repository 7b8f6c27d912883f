//! Structured extraction from pre-generated API-surface listings.
//!
//! A surface listing is a machine-readable description of one package
//! version's public symbols: a navigation tree of declarations plus a flat
//! stream of kind-coded tokens. When a listing exists it is strictly
//! preferred over free-text tokenization, because it yields precise,
//! pre-labeled symbol names instead of noisy full-text tokens.

use std::path::PathBuf;

use rustc_hash::{FxHashMap, FxHashSet};
use serde::Deserialize;

use crate::models::Language;

/// Kind code attached to each token in the surface stream.
///
/// Only four kinds carry discriminative signal; the rest are structural or
/// cosmetic. Unknown codes are ignored rather than guessed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// Parameter, module, or enum-member name nested under a declaration.
    ChildToken,
    Null,
    Whitespace,
    Punctuation,
    Keyword,
    /// Fully-qualified root reference for a declaration. Too verbose to use
    /// as a token; its pieces show up under the other kinds anyway.
    Definition,
    Type,
    /// Method or property name.
    Property,
    Constant,
    /// Comments, numerals, and placeholder strings.
    Comment,
}

impl TokenKind {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(TokenKind::ChildToken),
            1 => Some(TokenKind::Null),
            2 => Some(TokenKind::Whitespace),
            3 => Some(TokenKind::Punctuation),
            4 => Some(TokenKind::Keyword),
            5 => Some(TokenKind::Definition),
            6 => Some(TokenKind::Type),
            7 => Some(TokenKind::Property),
            8 => Some(TokenKind::Constant),
            9 => Some(TokenKind::Comment),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TokenKind::ChildToken => "child_token",
            TokenKind::Null => "null",
            TokenKind::Whitespace => "whitespace",
            TokenKind::Punctuation => "punctuation",
            TokenKind::Keyword => "keyword",
            TokenKind::Definition => "definition",
            TokenKind::Type => "type",
            TokenKind::Property => "property",
            TokenKind::Constant => "constant",
            TokenKind::Comment => "comment",
        }
    }

    /// The allow-list: kinds whose values name public API symbols.
    pub fn carries_signal(&self) -> bool {
        matches!(
            self,
            TokenKind::ChildToken | TokenKind::Type | TokenKind::Property | TokenKind::Constant
        )
    }
}

/// Parsed API-surface listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiSurface {
    #[serde(rename = "Navigation", default)]
    pub navigation: Option<NavigationNode>,
    #[serde(rename = "Tokens", default)]
    pub tokens: Vec<SurfaceToken>,
}

/// One node of the navigation tree (a declaration and its children).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NavigationNode {
    #[serde(rename = "Text", default)]
    pub text: String,
    #[serde(rename = "Tags", default)]
    pub tags: NavigationTags,
    #[serde(rename = "ChildItems", default)]
    pub child_items: Vec<NavigationNode>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NavigationTags {
    #[serde(rename = "TypeKind", default)]
    pub type_kind: Option<String>,
}

/// One kind-coded token from the flat surface stream.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SurfaceToken {
    #[serde(rename = "Kind")]
    pub kind: u8,
    #[serde(rename = "Value", default)]
    pub value: Option<String>,
    #[serde(rename = "DefinitionId", default)]
    pub definition_id: Option<String>,
    #[serde(rename = "NavigateToId", default)]
    pub navigate_to_id: Option<String>,
}

/// Extract the discriminating tokens of a surface listing, grouped by
/// category: navigation entries under their `TypeKind` tag, stream tokens
/// under their kind name. Only allow-listed kinds are taken from the stream,
/// and only trimmed, non-empty values are kept.
pub fn tokenize_surface(surface: &ApiSurface) -> FxHashMap<String, FxHashSet<String>> {
    let mut found: FxHashMap<String, FxHashSet<String>> = FxHashMap::default();

    if let Some(root) = &surface.navigation {
        ingest_navigation(root, &mut found);
    }

    for token in &surface.tokens {
        let Some(kind) = TokenKind::from_code(token.kind) else {
            continue;
        };
        if !kind.carries_signal() {
            continue;
        }
        if let Some(value) = token.value.as_deref() {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                found
                    .entry(kind.name().to_string())
                    .or_default()
                    .insert(trimmed.to_string());
            }
        }
    }

    found
}

fn ingest_navigation(node: &NavigationNode, found: &mut FxHashMap<String, FxHashSet<String>>) {
    let category = node.tags.type_kind.as_deref().unwrap_or("untagged");
    let trimmed = node.text.trim();
    if !trimmed.is_empty() {
        found
            .entry(category.to_string())
            .or_default()
            .insert(trimmed.to_string());
    }
    for child in &node.child_items {
        ingest_navigation(child, found);
    }
}

/// All categories of [`tokenize_surface`] flattened into one set, which is
/// what vocabulary building consumes.
pub fn surface_token_set(surface: &ApiSurface) -> FxHashSet<String> {
    tokenize_surface(surface)
        .into_values()
        .flatten()
        .collect()
}

/// Source of pre-generated surface listings. Returning `None` means
/// "unavailable"; callers fall back to free-text tokenization.
pub trait SurfaceProvider {
    fn surface_for(&self, language: Language, package: &str, version: &str) -> Option<ApiSurface>;
}

/// Reads listings from a directory, one file per package version, named
/// `<language>_<package>_<version>.json`.
pub struct FsSurfaceProvider {
    root: PathBuf,
}

impl FsSurfaceProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn listing_path(&self, language: Language, package: &str, version: &str) -> PathBuf {
        self.root
            .join(format!("{}_{}_{}.json", language.id(), package, version))
    }
}

impl SurfaceProvider for FsSurfaceProvider {
    fn surface_for(&self, language: Language, package: &str, version: &str) -> Option<ApiSurface> {
        let path = self.listing_path(language, package, version);
        let content = std::fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&content) {
            Ok(surface) => {
                tracing::info!("found surface listing for {} {} {}", language, package, version);
                Some(surface)
            }
            Err(e) => {
                tracing::warn!("unreadable surface listing {}: {}", path.display(), e);
                None
            }
        }
    }
}

/// A provider with no listings at all; useful when surfaces are not wanted.
pub struct NoSurfaces;

impl SurfaceProvider for NoSurfaces {
    fn surface_for(&self, _: Language, _: &str, _: &str) -> Option<ApiSurface> {
        None
    }
}
