// ============================================================
// Layer 2 — InspectUseCase
// ============================================================
// Runs dataset construction only (no model, no GPU) and reports
// what happened to every corpus row, plus the class balance of
// what was admitted. Handy for checking a corpus before a long run.

use anyhow::Result;
use serde::Serialize;

use crate::application::train_use_case::{prepare_data, TrainConfig};
use crate::data::builder::BuildReport;
use crate::domain::{
    class::{MemeClass, NUM_CLASSES},
    modality::Modality,
};

#[derive(Debug, Clone, Serialize)]
pub struct DatasetSummary {
    pub modality:     String,
    pub report:       BuildReport,
    pub samples:      usize,
    pub augmented:    usize,
    pub class_counts: [usize; NUM_CLASSES],
}

impl DatasetSummary {
    /// (class, count) pairs in class-index order.
    pub fn classes(&self) -> impl Iterator<Item = (MemeClass, usize)> + '_ {
        MemeClass::ALL.iter().copied().zip(self.class_counts.iter().copied())
    }
}

pub struct InspectUseCase {
    config: TrainConfig,
}

impl InspectUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<DatasetSummary> {
        let modality: Modality = self.config.validate()?;
        let data = prepare_data(&self.config, modality)?;

        Ok(DatasetSummary {
            modality:     modality.to_string(),
            samples:      data.dataset.samples().len(),
            augmented:    data.dataset.augmented_count(),
            class_counts: data.dataset.class_counts(),
            report:       data.report,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::corpus::image_path;
    use std::path::Path;

    /// Three records: one meme, one sticker (code 4), one ambiguous.
    fn write_corpus(dir: &Path) -> TrainConfig {
        let images = dir.join("images");
        for (label, id) in [("Meme", 1u64), ("Dudoso", 2), ("Sticker", 3)] {
            let path = image_path(&images, label, id);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            image::RgbImage::from_pixel(8, 8, image::Rgb([120, 30, 200])).save(&path).unwrap();
        }

        let corpus = serde_json::json!({
            "vocab": { "hola": 2, "mundo": 3 },
            "images": {
                "img_ids": [1, 2, 3],
                "texts":   [[2, 3], [2], [3]],
                "targets": [1, 5, 4]
            },
            "targets_names": { "1": "Meme", "2": "No Meme", "3": "Sticker", "4": "Sticker", "5": "Dudoso" }
        });
        let corpus_path = dir.join("corpus.json");
        std::fs::write(&corpus_path, corpus.to_string()).unwrap();

        TrainConfig {
            corpus_path: corpus_path.display().to_string(),
            image_root:  images.display().to_string(),
            ..TrainConfig::default()
        }
    }

    #[test]
    fn test_summary_counts_classes_and_skips() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = write_corpus(dir.path());

        let summary = InspectUseCase::new(cfg).execute().unwrap();

        assert_eq!(summary.modality, "image");
        assert_eq!(summary.samples, 2);
        assert_eq!(summary.report.skipped_ambiguous, 1);
        assert_eq!(summary.report.admitted + summary.report.skipped(), summary.report.records);
        let counts: Vec<(MemeClass, usize)> = summary.classes().collect();
        assert_eq!(counts[0], (MemeClass::Meme, 1));
        assert_eq!(counts[2], (MemeClass::Sticker, 1));
    }

    #[test]
    fn test_invalid_flags_fail_before_loading() {
        let cfg = TrainConfig { include_text: true, only_text: true, corpus_path: "/nope.json".into(), ..TrainConfig::default() };
        let err = InspectUseCase::new(cfg).execute().unwrap_err();
        assert!(err.to_string().contains("contradictory"));
    }
}
