//! Held-out cross-validation across candidate classifier families.
//!
//! Diagnostic only: the scores are logged so a maintainer can see how the
//! families compare on the current corpus, but the final model is always the
//! fixed MLP family regardless of what wins here.

use std::fmt;

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use super::mlp::{MlpClassifier, INPUT_SIZE};
use crate::models::Generation;

/// A labeled training example.
pub type Example = ([f64; INPUT_SIZE], Generation);

/// Classifier families compared during diagnostics.
#[derive(Debug, Clone, Copy)]
pub enum CandidateFamily {
    /// k-nearest-neighbors; weakest on this feature shape but has useful
    /// extrapolative properties worth tracking.
    Knn { k: usize },
    Mlp { hidden: usize },
}

impl fmt::Display for CandidateFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CandidateFamily::Knn { k } => write!(f, "knn(k={})", k),
            CandidateFamily::Mlp { hidden } => write!(f, "mlp(hidden={})", hidden),
        }
    }
}

/// The families scored by the orchestrator's diagnostic pass.
pub const DIAGNOSTIC_FAMILIES: [CandidateFamily; 3] = [
    CandidateFamily::Knn { k: 5 },
    CandidateFamily::Mlp { hidden: 16 },
    CandidateFamily::Mlp { hidden: 32 },
];

/// k-fold cross-validated accuracy: returns (mean, std) over the folds, or
/// `None` when there are too few examples to fold.
pub fn cross_val_score(
    family: CandidateFamily,
    data: &[Example],
    folds: usize,
    seed: u64,
) -> Option<(f64, f64)> {
    let folds = folds.min(data.len());
    if folds < 2 {
        return None;
    }

    let mut shuffled: Vec<Example> = data.to_vec();
    shuffled.shuffle(&mut ChaCha8Rng::seed_from_u64(seed));

    let mut scores = Vec::with_capacity(folds);
    let fold_size = shuffled.len().div_ceil(folds);
    for fold in 0..folds {
        let start = fold * fold_size;
        let end = (start + fold_size).min(shuffled.len());
        if start >= end {
            continue;
        }
        let held_out = &shuffled[start..end];
        let train: Vec<Example> = shuffled[..start]
            .iter()
            .chain(&shuffled[end..])
            .copied()
            .collect();
        if train.is_empty() {
            continue;
        }
        scores.push(fit_and_score(family, &train, held_out, seed));
    }

    if scores.is_empty() {
        return None;
    }
    let mean = scores.iter().sum::<f64>() / scores.len() as f64;
    let variance =
        scores.iter().map(|s| (s - mean) * (s - mean)).sum::<f64>() / scores.len() as f64;
    Some((mean, variance.sqrt()))
}

fn fit_and_score(family: CandidateFamily, train: &[Example], test: &[Example], seed: u64) -> f64 {
    let predict: Box<dyn Fn(&[f64; INPUT_SIZE]) -> Generation> = match family {
        CandidateFamily::Knn { k } => {
            let knn = KnnClassifier::fit(k, train);
            Box::new(move |input| knn.predict(input))
        }
        CandidateFamily::Mlp { hidden } => {
            let mut mlp = MlpClassifier::new(hidden, seed);
            mlp.fit(train, 200, 0.05, seed);
            Box::new(move |input| {
                if mlp
                    .predict(&super::features::FeatureVector::from_array(*input))
                    .is_track1
                {
                    Generation::Track1
                } else {
                    Generation::Track2
                }
            })
        }
    };

    let correct = test
        .iter()
        .filter(|(input, label)| predict(input) == *label)
        .count();
    correct as f64 / test.len() as f64
}

/// Minimal k-nearest-neighbors classifier (euclidean, majority vote).
struct KnnClassifier {
    k: usize,
    points: Vec<Example>,
}

impl KnnClassifier {
    fn fit(k: usize, train: &[Example]) -> Self {
        Self {
            k: k.max(1),
            points: train.to_vec(),
        }
    }

    fn predict(&self, input: &[f64; INPUT_SIZE]) -> Generation {
        let mut by_distance: Vec<(f64, Generation)> = self
            .points
            .iter()
            .map(|(point, label)| (squared_distance(point, input), *label))
            .collect();
        by_distance.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        let track1_votes = by_distance
            .iter()
            .take(self.k)
            .filter(|(_, label)| label.is_track1())
            .count();
        if track1_votes * 2 > self.k.min(by_distance.len()) {
            Generation::Track1
        } else {
            Generation::Track2
        }
    }
}

fn squared_distance(a: &[f64; INPUT_SIZE], b: &[f64; INPUT_SIZE]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum()
}
