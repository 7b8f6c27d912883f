//! CLI surface: argument definitions, input resolution, and the run loop.

mod input;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use console::style;

use crate::classifier::{FsBlobStore, TrackClassifier};
use crate::config::Settings;
use crate::models::Language;
use crate::pipeline::classify_batch;
use crate::tokenize::extract_code_fences;

use input::{resolve_input, ResolvedInput};

/// Parse and validate workers count (1-64)
fn parse_workers(s: &str) -> Result<usize, String> {
    let n: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;
    if n == 0 {
        Err("workers must be at least 1".to_string())
    } else if n > 64 {
        Err("workers cannot exceed 64".to_string())
    } else {
        Ok(n)
    }
}

/// Predict whether a document contains track 1 content.
///
/// If no existing model is loaded, a new model is trained from the release
/// index before classifying.
#[derive(Parser, Debug)]
#[command(name = "tracksift")]
#[command(
    version,
    about = "Classify text as legacy (track 1) or modern (track 2) SDK content",
    after_help = "\
Examples:
  tracksift 'client = EventHubClient(...)' --language python
  tracksift ./snippet.py --input-is-path --verbose
  tracksift ./docs --input-is-path --workers 8
  tracksift 'text' --language python --service 'Event Hubs' --save-to-file eh.model
  tracksift 'text' --load-from-file eh.model

The exit code is the number of documents classified as track 1."
)]
pub struct Cli {
    /// The text to classify (or a file, directory, or repository link with
    /// --input-is-path)
    pub text: String,

    /// Tailor classification to one language (dotnet, python, java, js).
    /// Unspecified means all languages.
    #[arg(long)]
    pub language: Option<String>,

    /// Tailor classification to one service, by release-index name
    /// (e.g. "Event Hubs"). Unspecified means all services.
    #[arg(long)]
    pub service: Option<String>,

    /// Produce verbose results: text features alongside each prediction
    #[arg(long)]
    pub verbose: bool,

    /// Log level (error, warn, info, debug, trace); RUST_LOG overrides
    #[arg(long, default_value = "warn", value_parser = ["error", "warn", "info", "debug", "trace"])]
    pub log_level: String,

    /// Load a pretrained model from a file instead of training
    #[arg(long, value_name = "PATH")]
    pub load_from_file: Option<PathBuf>,

    /// Save the model used in this run to a file
    #[arg(long, value_name = "PATH")]
    pub save_to_file: Option<PathBuf>,

    /// Directory used as the model blob store for --load-from-store /
    /// --save-to-store
    #[arg(long, env = "TRACKSIFT_MODEL_STORE", value_name = "DIR")]
    pub model_store: Option<PathBuf>,

    /// Load a pretrained model by name from the model store
    #[arg(long, value_name = "NAME")]
    pub load_from_store: Option<String>,

    /// Save the model used in this run to the model store under a name
    #[arg(long, value_name = "NAME")]
    pub save_to_store: Option<String>,

    /// Treat the text argument as a path: a local file, a directory, or a
    /// repository link/zip
    #[arg(long)]
    pub input_is_path: bool,

    /// Where training-corpus cache files are stored
    #[arg(long, value_name = "DIR")]
    pub cache_path: Option<PathBuf>,

    /// Root of the supplemental corpus tree used to augment training
    #[arg(long, value_name = "DIR")]
    pub supplemental_corpus_path: Option<PathBuf>,

    /// Append packages missing from unsupervised training to this TSV file
    #[arg(long, value_name = "PATH")]
    pub log_missing_training: Option<PathBuf>,

    /// Worker threads for classifying many files (1-64). Only worth it for
    /// large batches.
    #[arg(long, default_value = "1", value_parser = parse_workers)]
    pub workers: usize,

    /// Classify only fenced code blocks; falls back to the whole document
    /// when none exist
    #[arg(long)]
    pub obey_code_fences: bool,
}

/// Run the CLI; the returned value becomes the process exit code (the count
/// of track 1 classifications).
pub fn run(cli: Cli) -> Result<i32> {
    let mut settings = Settings::load()?;
    if let Some(dir) = &cli.cache_path {
        settings.cache_dir = dir.clone();
    }
    if let Some(dir) = &cli.supplemental_corpus_path {
        settings.supplemental_corpus_dir = dir.clone();
    }
    if let Some(ledger) = &cli.log_missing_training {
        // Truncate and write headers for this run.
        std::fs::write(ledger, "package_zip_uri\trepo\tpackage\tversion\tlogged_at\n")
            .with_context(|| format!("cannot write ledger {}", ledger.display()))?;
        settings.missing_training_ledger = Some(ledger.clone());
    }

    let store = cli.model_store.clone().map(FsBlobStore::new);

    let classifier = if let Some(path) = &cli.load_from_file {
        TrackClassifier::load(path)
            .with_context(|| format!("cannot load model from {}", path.display()))?
    } else if let Some(name) = &cli.load_from_store {
        let store = store
            .as_ref()
            .context("--load-from-store requires --model-store (or TRACKSIFT_MODEL_STORE)")?;
        TrackClassifier::load_from_store(store, name)
            .with_context(|| format!("cannot load model '{}' from store", name))?
    } else {
        let language = cli
            .language
            .as_deref()
            .map(str::parse::<Language>)
            .transpose()?;
        eprintln!(
            "{} training model for language={} service={}",
            style("tracksift").cyan().bold(),
            language.map(|l| l.id()).unwrap_or("all"),
            cli.service.as_deref().unwrap_or("all")
        );
        TrackClassifier::train(language, cli.service.as_deref(), &settings)?
    };

    let resolved = resolve_input(&cli.text, cli.input_is_path)?;
    let track1_count = match resolved {
        ResolvedInput::Single(text) => {
            let text = apply_fences(text, cli.obey_code_fences);
            classify_single(&classifier, &text, &cli)?
        }
        ResolvedInput::Batch(documents) => {
            let documents = documents
                .into_iter()
                .map(|(path, text)| (path, apply_fences(text, cli.obey_code_fences)))
                .collect();
            classify_many(&classifier, documents, &cli)?
        }
    };

    if let Some(path) = &cli.save_to_file {
        let written = classifier.save(Some(path))?;
        eprintln!("model saved to {}", written.display());
    }
    if let Some(name) = &cli.save_to_store {
        let store = store
            .as_ref()
            .context("--save-to-store requires --model-store (or TRACKSIFT_MODEL_STORE)")?;
        let written = classifier.save_to_store(store, Some(name))?;
        eprintln!("model saved to store as '{}'", written);
    }

    Ok(track1_count)
}

/// When fence mode is on, classify only the fenced code; a document with no
/// fences is classified whole.
fn apply_fences(text: String, obey: bool) -> String {
    if !obey {
        return text;
    }
    let blocks = extract_code_fences(&text);
    if blocks.is_empty() {
        text
    } else {
        blocks
            .into_iter()
            .map(|(body, _)| body)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn classify_single(classifier: &TrackClassifier, text: &str, cli: &Cli) -> Result<i32> {
    if cli.verbose {
        let verdict = classifier.is_track1_verbose(text, cli.log_level == "debug");
        println!("{}", serde_json::to_string_pretty(&verdict)?);
        print_summary(verdict.is_track1 as i32, 1);
        Ok(verdict.is_track1 as i32)
    } else {
        let is_track1 = classifier.is_track1(text);
        println!("{}", styled_bool(is_track1));
        print_summary(is_track1 as i32, 1);
        Ok(is_track1 as i32)
    }
}

fn classify_many(
    classifier: &TrackClassifier,
    documents: Vec<(String, String)>,
    cli: &Cli,
) -> Result<i32> {
    let total = documents.len();
    let results = classify_batch(classifier, documents, cli.workers, cli.verbose);

    let mut track1_count = 0;
    for (path, result) in &results {
        if result.is_track1 {
            track1_count += 1;
        }
        match &result.verdict {
            Some(verdict) => println!("{}: {}", path, serde_json::to_string(verdict)?),
            None => println!("{}: {}", path, styled_bool(result.is_track1)),
        }
    }
    print_summary(track1_count, total);
    Ok(track1_count)
}

fn styled_bool(is_track1: bool) -> console::StyledObject<&'static str> {
    if is_track1 {
        style("track1").red()
    } else {
        style("track2").green()
    }
}

fn print_summary(track1_documents: i32, total_documents: usize) {
    eprintln!(
        "\nSummary: {} of {} document(s) classified as track 1",
        track1_documents, total_documents
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_workers_bounds() {
        assert!(parse_workers("0").is_err());
        assert!(parse_workers("65").is_err());
        assert!(parse_workers("garbage").is_err());
        assert_eq!(parse_workers("8").unwrap(), 8);
    }

    #[test]
    fn test_cli_parses_minimal_invocation() {
        let cli = Cli::parse_from(["tracksift", "some text"]);
        assert_eq!(cli.text, "some text");
        assert!(!cli.verbose);
        assert_eq!(cli.workers, 1);
    }

    #[test]
    fn test_apply_fences_falls_back_to_whole_text() {
        let plain = apply_fences("no fences here".to_string(), true);
        assert_eq!(plain, "no fences here");

        let fenced = apply_fences("pre\n```python\nx = 1\n```\npost".to_string(), true);
        assert_eq!(fenced, "x = 1");
    }
}
