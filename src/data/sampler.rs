// ============================================================
// Layer 4 — Balanced Sampler
// ============================================================
// Counters class imbalance by drawing WITH replacement, where every
// index is weighted by the inverse frequency of its class inside
// the split:
//
//   weight(i) = N / count(class(i))      N = indices in the split
//
// Each present class then carries the same total mass N, so one
// epoch of N draws sees every class roughly equally often.

use rand::{
    distributions::{Distribution, WeightedError, WeightedIndex},
    Rng,
};

use crate::domain::class::MemeClass;

/// One weight per entry of `indices`, in the same order.
///
/// `labels` is indexed by dataset position; `indices` selects the split.
pub fn balanced_weights(labels: &[MemeClass], indices: &[usize], num_classes: usize) -> Vec<f64> {
    let mut counts = vec![0usize; num_classes];
    for &i in indices {
        counts[labels[i].index()] += 1;
    }

    let n = indices.len() as f64;
    let per_class: Vec<f64> = counts
        .iter()
        .map(|&c| if c == 0 { 0.0 } else { n / c as f64 })
        .collect();

    tracing::debug!("Class counts {:?} → weights {:?}", counts, per_class);

    indices.iter().map(|&i| per_class[labels[i].index()]).collect()
}

/// Weighted-with-replacement sampler over a fixed set of dataset indices.
#[derive(Debug, Clone)]
pub struct WeightedSampler {
    indices: Vec<usize>,
    dist:    Option<WeightedIndex<f64>>,
}

impl WeightedSampler {
    pub fn new(indices: Vec<usize>, weights: &[f64]) -> Result<Self, WeightedError> {
        let dist = if indices.is_empty() {
            None
        } else {
            Some(WeightedIndex::new(weights)?)
        };
        Ok(Self { indices, dist })
    }

    /// Shorthand for a sampler with inverse-frequency weights.
    pub fn balanced(
        labels:      &[MemeClass],
        indices:     Vec<usize>,
        num_classes: usize,
    ) -> Result<Self, WeightedError> {
        let weights = balanced_weights(labels, &indices, num_classes);
        Self::new(indices, &weights)
    }

    /// Draw as many dataset indices as the split holds.
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<usize> {
        match &self.dist {
            Some(dist) => (0..self.indices.len())
                .map(|_| self.indices[dist.sample(rng)])
                .collect(),
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::class::NUM_CLASSES;
    use rand::{rngs::StdRng, SeedableRng};

    fn skewed() -> Vec<MemeClass> {
        let mut labels = vec![MemeClass::Meme; 80];
        labels.extend(vec![MemeClass::NoMeme; 15]);
        labels.extend(vec![MemeClass::Sticker; 5]);
        labels
    }

    #[test]
    fn test_class_mass_is_flattened() {
        let labels = skewed();
        let indices: Vec<usize> = (0..labels.len()).collect();
        let weights = balanced_weights(&labels, &indices, NUM_CLASSES);

        let mut mass = [0.0f64; NUM_CLASSES];
        for (&i, w) in indices.iter().zip(&weights) {
            mass[labels[i].index()] += w;
        }
        assert!((mass[0] - mass[1]).abs() < 1e-9);
        assert!((mass[1] - mass[2]).abs() < 1e-9);
        assert!(weights.iter().all(|&w| w > 0.0));
    }

    #[test]
    fn test_weights_only_cover_the_split() {
        let labels = skewed();
        // Only Meme and Sticker rows in this split.
        let indices: Vec<usize> = (70..80).chain(95..100).collect();
        let weights = balanced_weights(&labels, &indices, NUM_CLASSES);

        assert_eq!(weights.len(), indices.len());
        assert!((weights[0] - 15.0 / 10.0).abs() < 1e-9);
        assert!((weights[14] - 15.0 / 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_draw_is_roughly_balanced() {
        let labels = skewed();
        let sampler = WeightedSampler::balanced(&labels, (0..100).collect(), NUM_CLASSES).unwrap();
        let mut rng = StdRng::seed_from_u64(11);

        let mut seen = [0usize; NUM_CLASSES];
        for _ in 0..50 {
            let draw = sampler.draw(&mut rng);
            assert_eq!(draw.len(), 100);
            for i in draw {
                seen[labels[i].index()] += 1;
            }
        }
        // 5000 draws, expected ~1667 per class.
        for count in seen {
            assert!((1300..2050).contains(&count), "unbalanced draw: {seen:?}");
        }
    }

    #[test]
    fn test_empty_split_draws_nothing() {
        let sampler = WeightedSampler::balanced(&skewed(), Vec::new(), NUM_CLASSES).unwrap();
        assert!(sampler.draw(&mut StdRng::seed_from_u64(0)).is_empty());
    }
}
