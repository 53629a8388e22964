// ============================================================
// Layer 4 — Train/Test Splitter
// ============================================================
// Partitions dataset INDICES (no sample is copied) into a train
// and a test split, and owns the sampling policy of each split.
//
// The shuffle runs over original samples only. An augmented sample
// is a near-duplicate of its source, so it always follows that
// source:
//
//   source in train → augmented copy in train
//   source in test  → augmented copy dropped (or kept in test when
//                     `eval_augmented` is set)
//
// This keeps paraphrases of a test caption out of training.
//
// Uses Fisher-Yates shuffle via rand::seq::SliceRandom.

use rand::{seq::SliceRandom, Rng};
use rand::distributions::WeightedError;

use crate::data::sampler::WeightedSampler;
use crate::domain::class::{MemeClass, NUM_CLASSES};
use crate::domain::sample::Sample;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test:  Vec<usize>,
}

/// Shuffle the originals and move `floor(n × test_fraction)` of them to test.
pub fn split_indices<R: Rng + ?Sized>(
    samples:        &[Sample],
    test_fraction:  f64,
    eval_augmented: bool,
    rng:            &mut R,
) -> SplitIndices {
    let mut originals: Vec<usize> = samples
        .iter()
        .enumerate()
        .filter(|(_, s)| !s.is_augmented())
        .map(|(i, _)| i)
        .collect();

    originals.shuffle(rng);

    let n_test = ((originals.len() as f64) * test_fraction).floor() as usize;
    let n_test = n_test.min(originals.len());

    let mut in_test = vec![false; samples.len()];
    for &i in &originals[..n_test] {
        in_test[i] = true;
    }

    let mut train: Vec<usize> = originals[n_test..].to_vec();
    let mut test:  Vec<usize> = originals[..n_test].to_vec();
    let mut dropped = 0usize;

    for (i, s) in samples.iter().enumerate() {
        if !s.is_augmented() {
            continue;
        }
        let group = s.group(i);
        match (in_test.get(group).copied().unwrap_or(false), eval_augmented) {
            (false, _)    => train.push(i),
            (true, true)  => test.push(i),
            (true, false) => dropped += 1,
        }
    }

    train.sort_unstable();
    test.sort_unstable();

    tracing::debug!(
        "Dataset split: {} training, {} test, {} augmented test copies dropped",
        train.len(),
        test.len(),
        dropped,
    );

    SplitIndices { train, test }
}

/// A split plus the sampling policy of each side.
///
/// Training always draws a class-balanced sample with replacement.
/// Evaluation walks the test indices in order unless `balanced_eval`.
#[derive(Debug, Clone)]
pub struct SplitHandle {
    indices:       SplitIndices,
    train_sampler: WeightedSampler,
    test_sampler:  Option<WeightedSampler>,
}

impl SplitHandle {
    pub fn new(
        indices:       SplitIndices,
        labels:        &[MemeClass],
        balanced_eval: bool,
    ) -> Result<Self, WeightedError> {
        let train_sampler = WeightedSampler::balanced(labels, indices.train.clone(), NUM_CLASSES)?;
        let test_sampler = if balanced_eval {
            Some(WeightedSampler::balanced(labels, indices.test.clone(), NUM_CLASSES)?)
        } else {
            None
        };
        Ok(Self { indices, train_sampler, test_sampler })
    }

    pub fn train(&self) -> &[usize] {
        &self.indices.train
    }

    pub fn test(&self) -> &[usize] {
        &self.indices.test
    }

    /// Dataset indices for one training epoch.
    pub fn train_epoch<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<usize> {
        self.train_sampler.draw(rng)
    }

    /// Dataset indices for one evaluation pass.
    pub fn test_pass<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<usize> {
        match &self.test_sampler {
            Some(sampler) => sampler.draw(rng),
            None => self.indices.test.clone(),
        }
    }
}
