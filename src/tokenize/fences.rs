//! Markdown code-fence extraction.
//!
//! Documentation files mix prose with fenced code blocks; when asked to, the
//! CLI classifies only the fenced code. Blocks tagged with a known language
//! fence come out labeled, untagged blocks come out unlabeled, and duplicate
//! block bodies are reported once.

use regex::Regex;
use rustc_hash::FxHashSet;
use std::sync::OnceLock;

use crate::models::Language;

fn fence_open_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(```+|~~~+)\s*([A-Za-z0-9#+._-]*)").unwrap())
}

/// Extract fenced blocks, labeled per known ecosystem first, then untagged
/// blocks, de-duplicated by body.
pub fn extract_code_fences(text: &str) -> Vec<(String, Option<Language>)> {
    let mut seen: FxHashSet<String> = FxHashSet::default();
    let mut blocks = Vec::new();

    for language in Language::ALL {
        for body in fenced_blocks(text, Some(language.fence_tag())) {
            if seen.insert(body.clone()) {
                blocks.push((body, Some(language)));
            }
        }
    }
    for body in fenced_blocks(text, None) {
        if seen.insert(body.clone()) {
            blocks.push((body, None));
        }
    }
    blocks
}

/// Bodies of fenced blocks, optionally restricted to one fence tag.
fn fenced_blocks(text: &str, syntax_filter: Option<&str>) -> Vec<String> {
    let mut bodies = Vec::new();
    let mut current: Option<Vec<&str>> = None;
    let mut keep_current = false;

    for line in text.lines() {
        let trimmed = line.trim_start();
        match &mut current {
            None => {
                if let Some(caps) = fence_open_re().captures(trimmed) {
                    let tag = caps.get(2).map(|m| m.as_str()).unwrap_or("");
                    keep_current = match syntax_filter {
                        Some(filter) => tag.eq_ignore_ascii_case(filter),
                        None => true,
                    };
                    current = Some(Vec::new());
                }
            }
            Some(body) => {
                if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
                    if keep_current && !body.is_empty() {
                        bodies.push(body.join("\n"));
                    }
                    current = None;
                } else {
                    body.push(line);
                }
            }
        }
    }
    // An unterminated fence is dropped rather than guessed at.
    bodies
}
