//! Secondary statistical classifier: a small 2-layer MLP over feature
//! vectors, implemented in pure Rust.
//!
//! Architecture: 6 inputs → Linear(hidden) → ReLU → Linear(2) → Softmax.
//! Output index 0 is track 1, index 1 is track 2.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use super::features::FeatureVector;
use crate::models::Generation;

/// Number of feature-vector components the classifier consumes.
pub const INPUT_SIZE: usize = 6;

/// MLP prediction for one document.
#[derive(Debug, Clone, Copy)]
pub struct MlpPrediction {
    pub track1_probability: f64,
    pub track2_probability: f64,
    pub is_track1: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MlpClassifier {
    /// First layer weights [hidden_size x input_size]
    w1: Vec<Vec<f64>>,
    /// First layer bias [hidden_size]
    b1: Vec<f64>,
    /// Second layer weights [2 x hidden_size]
    w2: Vec<Vec<f64>>,
    /// Second layer bias [2]
    b2: Vec<f64>,
    hidden_size: usize,
}

impl MlpClassifier {
    /// Create a classifier with seeded Xavier-style random weights.
    pub fn new(hidden_size: usize, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let scale1 = (2.0 / INPUT_SIZE as f64).sqrt();
        let scale2 = (2.0 / hidden_size as f64).sqrt();

        let w1 = (0..hidden_size)
            .map(|_| {
                (0..INPUT_SIZE)
                    .map(|_| rng.random_range(-scale1..scale1))
                    .collect()
            })
            .collect();
        let w2 = (0..2)
            .map(|_| {
                (0..hidden_size)
                    .map(|_| rng.random_range(-scale2..scale2))
                    .collect()
            })
            .collect();

        Self {
            w1,
            b1: vec![0.0; hidden_size],
            w2,
            b2: vec![0.0; 2],
            hidden_size,
        }
    }

    fn forward(&self, input: &[f64; INPUT_SIZE]) -> ([f64; 2], Vec<f64>) {
        let mut hidden = vec![0.0f64; self.hidden_size];
        for (i, h) in hidden.iter_mut().enumerate() {
            let mut sum = self.b1[i];
            for (j, &x) in input.iter().enumerate() {
                sum += self.w1[i][j] * x;
            }
            *h = sum.max(0.0); // ReLU
        }

        let mut logits = [0.0f64; 2];
        for (i, logit) in logits.iter_mut().enumerate() {
            let mut sum = self.b2[i];
            for (j, &h) in hidden.iter().enumerate() {
                sum += self.w2[i][j] * h;
            }
            *logit = sum;
        }

        // Stable softmax
        let max_logit = logits[0].max(logits[1]);
        let exp0 = (logits[0] - max_logit).exp();
        let exp1 = (logits[1] - max_logit).exp();
        let sum = exp0 + exp1;
        ([exp0 / sum, exp1 / sum], hidden)
    }

    pub fn predict(&self, vector: &FeatureVector) -> MlpPrediction {
        let (probs, _) = self.forward(&vector.to_array());
        MlpPrediction {
            track1_probability: probs[0],
            track2_probability: probs[1],
            is_track1: probs[0] >= 0.5,
        }
    }

    /// Log-probabilities as `[ln p(track1), ln p(track2)]`.
    pub fn predict_log_proba(&self, vector: &FeatureVector) -> [f64; 2] {
        let (probs, _) = self.forward(&vector.to_array());
        [probs[0].max(f64::MIN_POSITIVE).ln(), probs[1].max(f64::MIN_POSITIVE).ln()]
    }

    /// One SGD pass over the batch; returns the mean cross-entropy loss.
    pub fn train_step(
        &mut self,
        batch: &[([f64; INPUT_SIZE], Generation)],
        learning_rate: f64,
    ) -> f64 {
        let mut total_loss = 0.0;

        for (input, label) in batch {
            let (probs, hidden) = self.forward(input);
            let target = if label.is_track1() { 0 } else { 1 };
            total_loss += -probs[target].max(f64::MIN_POSITIVE).ln();

            // Gradient of softmax + cross-entropy.
            let mut d_logits = probs;
            d_logits[target] -= 1.0;

            for i in 0..2 {
                self.b2[i] -= learning_rate * d_logits[i];
                for j in 0..self.hidden_size {
                    self.w2[i][j] -= learning_rate * d_logits[i] * hidden[j];
                }
            }

            let mut d_hidden = vec![0.0f64; self.hidden_size];
            for (j, d) in d_hidden.iter_mut().enumerate() {
                for i in 0..2 {
                    *d += d_logits[i] * self.w2[i][j];
                }
                if hidden[j] <= 0.0 {
                    *d = 0.0; // ReLU gradient
                }
            }

            for i in 0..self.hidden_size {
                self.b1[i] -= learning_rate * d_hidden[i];
                for (j, &x) in input.iter().enumerate() {
                    self.w1[i][j] -= learning_rate * d_hidden[i] * x;
                }
            }
        }

        if batch.is_empty() {
            0.0
        } else {
            total_loss / batch.len() as f64
        }
    }

    /// Fit on the full training set for a fixed number of epochs, shuffling
    /// with a seeded RNG each epoch. Returns the final mean loss.
    pub fn fit(
        &mut self,
        data: &[([f64; INPUT_SIZE], Generation)],
        epochs: usize,
        learning_rate: f64,
        seed: u64,
    ) -> f64 {
        use rand::seq::SliceRandom;

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut order: Vec<&([f64; INPUT_SIZE], Generation)> = data.iter().collect();
        let mut last_loss = 0.0;
        for _ in 0..epochs {
            order.shuffle(&mut rng);
            let shuffled: Vec<([f64; INPUT_SIZE], Generation)> =
                order.iter().map(|&&item| item).collect();
            last_loss = self.train_step(&shuffled, learning_rate);
        }
        last_loss
    }
}
