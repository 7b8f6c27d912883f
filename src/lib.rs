//! Tracksift - corpus-mined SDK generation classifier
//!
//! Classifies source-code and documentation snippets as legacy (track 1) or
//! modern (track 2) client-library content. Instead of hand-authored rules,
//! it mines historical package releases for the vocabulary that actually
//! discriminates the two generations, builds a small feature vector per
//! document, and decides with a tuned rule (plus an optional secondary MLP
//! for diagnostics).

pub mod classifier;
pub mod cli;
pub mod config;
pub mod corpus;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod tokenize;
pub mod vocab;

pub use classifier::{Collaborators, TrackClassifier, Verdict};
pub use config::Settings;
pub use error::{Result, TracksiftError};
pub use models::{Corpus, Generation, Language, ReleaseRecord};
