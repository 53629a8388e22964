use burn::data::dataset::Dataset;

use crate::domain::class::{MemeClass, NUM_CLASSES};
use crate::domain::sample::Sample;

/// All samples of one run, in construction order.
///
/// Built once by the `DatasetBuilder` and read-only afterwards.
/// Token sequences are already padded to a common width.
#[derive(Debug, Clone, Default)]
pub struct MemeDataset {
    samples: Vec<Sample>,
}

impl MemeDataset {
    pub fn new(samples: Vec<Sample>) -> Self {
        Self { samples }
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn labels(&self) -> Vec<MemeClass> {
        self.samples.iter().map(|s| s.label).collect()
    }

    pub fn augmented_count(&self) -> usize {
        self.samples.iter().filter(|s| s.is_augmented()).count()
    }

    pub fn class_counts(&self) -> [usize; NUM_CLASSES] {
        let mut counts = [0usize; NUM_CLASSES];
        for s in &self.samples {
            counts[s.label.index()] += 1;
        }
        counts
    }
}

impl Dataset<Sample> for MemeDataset {
    fn get(&self, index: usize) -> Option<Sample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}
