// ============================================================
// Layer 5 — Evaluation Metrics
// ============================================================
// Confusion matrix and per-class precision / recall / F1 over
// the predictions of one evaluation pass.
//
//   rows    = true class
//   columns = predicted class
//
// Classes never seen and never predicted report 0.0 everywhere
// instead of NaN.

use std::fmt::Write as _;

use serde::Serialize;

use crate::domain::class::{MemeClass, NUM_CLASSES};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfusionMatrix {
    counts: [[usize; NUM_CLASSES]; NUM_CLASSES],
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassMetrics {
    pub class:     MemeClass,
    pub precision: f64,
    pub recall:    f64,
    pub f1:        f64,
    pub support:   usize,
}

impl ConfusionMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count (true, predicted) class index pairs. Out-of-range indices are ignored.
    pub fn add_pairs(&mut self, labels: &[usize], predictions: &[usize]) {
        for (&t, &p) in labels.iter().zip(predictions) {
            if t < NUM_CLASSES && p < NUM_CLASSES {
                self.counts[t][p] += 1;
            }
        }
    }

    pub fn count(&self, truth: MemeClass, predicted: MemeClass) -> usize {
        self.counts[truth.index()][predicted.index()]
    }

    pub fn total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }

    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        let hits: usize = (0..NUM_CLASSES).map(|c| self.counts[c][c]).sum();
        hits as f64 / total as f64
    }

    pub fn class_report(&self) -> Vec<ClassMetrics> {
        MemeClass::ALL
            .iter()
            .map(|&class| {
                let c = class.index();
                let tp = self.counts[c][c] as f64;
                let support: usize = self.counts[c].iter().sum();
                let predicted: usize = (0..NUM_CLASSES).map(|r| self.counts[r][c]).sum();

                let precision = ratio(tp, predicted as f64);
                let recall    = ratio(tp, support as f64);
                let f1        = ratio(2.0 * precision * recall, precision + recall);

                ClassMetrics { class, precision, recall, f1, support }
            })
            .collect()
    }

    /// Plain-text table suitable for a log line.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = write!(out, "{:>10}", "true\\pred");
        for class in MemeClass::ALL {
            let _ = write!(out, " {:>8}", class.name());
        }
        for truth in MemeClass::ALL {
            let _ = write!(out, "\n{:>10}", truth.name());
            for predicted in MemeClass::ALL {
                let _ = write!(out, " {:>8}", self.count(truth, predicted));
            }
        }
        out
    }

    pub fn log(&self) {
        tracing::info!("Confusion matrix:\n{}", self.render());
    }
}

/// Log precision / recall / F1 per class.
pub fn log_class_report(report: &[ClassMetrics]) {
    for m in report {
        tracing::info!(
            "{:>8}: precision={:.3} recall={:.3} f1={:.3} support={}",
            m.class.name(), m.precision, m.recall, m.f1, m.support,
        );
    }
}

fn ratio(num: f64, den: f64) -> f64 {
    if den == 0.0 { 0.0 } else { num / den }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(labels: &[usize], predictions: &[usize]) -> ConfusionMatrix {
        let mut m = ConfusionMatrix::new();
        m.add_pairs(labels, predictions);
        m
    }

    #[test]
    fn test_accuracy_and_counts() {
        let m = matrix(&[0, 0, 1, 2, 2], &[0, 1, 1, 2, 0]);
        assert_eq!(m.total(), 5);
        assert!((m.accuracy() - 0.6).abs() < 1e-9);
        assert_eq!(m.count(MemeClass::Meme, MemeClass::NoMeme), 1);
        assert_eq!(m.count(MemeClass::Sticker, MemeClass::Meme), 1);
    }

    #[test]
    fn test_class_report() {
        let m = matrix(&[0, 0, 1, 2, 2], &[0, 1, 1, 2, 0]);
        let report = m.class_report();

        // Meme: tp=1, predicted 2 times, 2 true.
        assert!((report[0].precision - 0.5).abs() < 1e-9);
        assert!((report[0].recall - 0.5).abs() < 1e-9);
        // No Meme: tp=1, predicted 2 times, 1 true.
        assert!((report[1].recall - 1.0).abs() < 1e-9);
        assert!((report[1].f1 - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(report[2].support, 2);
    }

    #[test]
    fn test_empty_matrix_has_no_nan() {
        let m = ConfusionMatrix::new();
        assert_eq!(m.accuracy(), 0.0);
        assert!(m.class_report().iter().all(|r| r.f1 == 0.0 && r.precision == 0.0));
    }

    #[test]
    fn test_render_has_one_row_per_class() {
        let m = matrix(&[2], &[2]);
        let text = m.render();
        assert_eq!(text.lines().count(), NUM_CLASSES + 1);
        assert!(text.contains("Sticker"));
    }
}
