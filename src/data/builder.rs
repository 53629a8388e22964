// ============================================================
// Layer 4 — Dataset Builder
// ============================================================
// One linear pass over the corpus record that produces the
// in-memory dataset plus a report of everything it left out.
//
// Per corpus row:
//   1. Resolve the human label name of the raw target
//        unknown target name / unmappable code   → skipped_invalid_label
//        ambiguous name (when filtering)         → skipped_ambiguous
//   2. Resolve <image_root>/<Label>/img_<id:07>.jpg
//        file absent                             → skipped_missing_file
//   3. Decode + resize + normalise the image (image runs only)
//        undecodable                             → skipped_undecodable
//   4. Rebuild the caption text from the vocabulary (O(1) per id)
//   5. BERT word-piece encoding of that text (BERT runs only)
//   6. Remap the raw target to a MemeClass and append the sample
//   7. Optionally try one back-translation augmentation
//
// After the scan every token sequence is right-padded with the pad
// id to the longest one seen.

use std::fs;

use rand::{rngs::StdRng, SeedableRng};
use serde::Serialize;

use crate::data::augment::{AugmentConfig, AugmentOutcome, AugmentSkip, Augmenter};
use crate::data::batcher::pad_to;
use crate::data::dataset::MemeDataset;
use crate::data::error::{DatasetError, DatasetResult};
use crate::data::transforms;
use crate::domain::class::MemeClass;
use crate::domain::corpus::{image_path, CorpusRecord};
use crate::domain::sample::{Sample, SampleOrigin};
use crate::domain::traits::{SubwordEncoder, Translator};
use crate::domain::vocab::Vocabulary;

pub const DEFAULT_AMBIGUOUS_LABEL: &str = "Dudoso";

#[derive(Debug, Clone)]
pub struct BuilderConfig {
    /// Directory holding one sub-directory per label name.
    pub image_root:       std::path::PathBuf,
    pub filter_ambiguous: bool,
    pub ambiguous_label:  String,
    pub emit_image:       bool,
    pub emit_bert:        bool,
    pub augment:          bool,
    /// Collapse raw target 4 into the Meme class.
    pub meme_only:        bool,
    /// Delete images that exist but fail to decode.
    pub purge_corrupt:    bool,
    pub seed:             u64,
    pub augment_config:   AugmentConfig,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            image_root:       ".".into(),
            filter_ambiguous: true,
            ambiguous_label:  DEFAULT_AMBIGUOUS_LABEL.to_string(),
            emit_image:       true,
            emit_bert:        false,
            augment:          false,
            meme_only:        false,
            purge_corrupt:    false,
            seed:             42,
            augment_config:   AugmentConfig::default(),
        }
    }
}

/// What the construction pass did with every corpus row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    pub records:                usize,
    pub admitted:               usize,
    pub skipped_ambiguous:      usize,
    pub skipped_missing_file:   usize,
    pub skipped_invalid_label:  usize,
    pub skipped_undecodable:    usize,
    pub purged_files:           usize,
    pub augmented:              usize,
    pub augment_skipped_short:  usize,
    pub augment_skipped_same:   usize,
    pub augment_failed:         usize,
    pub text_width:             usize,
}

impl BuildReport {
    pub fn skipped(&self) -> usize {
        self.skipped_ambiguous
            + self.skipped_missing_file
            + self.skipped_invalid_label
            + self.skipped_undecodable
    }

    pub fn log(&self) {
        tracing::info!(
            "Dataset built: {} admitted of {} records (+{} augmented), text width {}",
            self.admitted, self.records, self.augmented, self.text_width,
        );
        tracing::info!(
            "Skipped {}: {} ambiguous, {} missing file, {} invalid label, {} undecodable ({} purged)",
            self.skipped(),
            self.skipped_ambiguous,
            self.skipped_missing_file,
            self.skipped_invalid_label,
            self.skipped_undecodable,
            self.purged_files,
        );
        if self.augmented + self.augment_skipped_short + self.augment_skipped_same + self.augment_failed > 0 {
            tracing::info!(
                "Augmentation: {} emitted, {} too short, {} unchanged, {} failed",
                self.augmented, self.augment_skipped_short, self.augment_skipped_same, self.augment_failed,
            );
        }
    }
}

pub struct DatasetBuilder<'a> {
    config:     BuilderConfig,
    vocab:      &'a Vocabulary,
    bert:       Option<&'a dyn SubwordEncoder>,
    translator: Option<&'a dyn Translator>,
}

impl<'a> DatasetBuilder<'a> {
    pub fn new(config: BuilderConfig, vocab: &'a Vocabulary) -> Self {
        Self { config, vocab, bert: None, translator: None }
    }

    pub fn with_bert(mut self, encoder: &'a dyn SubwordEncoder) -> Self {
        self.bert = Some(encoder);
        self
    }

    pub fn with_translator(mut self, translator: &'a dyn Translator) -> Self {
        self.translator = Some(translator);
        self
    }

    pub fn build(&self, corpus: &CorpusRecord) -> DatasetResult<(MemeDataset, BuildReport)> {
        let cfg = &self.config;

        let bert = match (cfg.emit_bert, self.bert) {
            (true, None) => {
                return Err(DatasetError::Tokenizer(
                    "BERT encoding requested but no word-piece encoder was given".into(),
                ))
            }
            (true, Some(enc)) => Some(enc),
            (false, _) => None,
        };
        let augmenter = match (cfg.augment, self.translator) {
            (true, None) => {
                return Err(DatasetError::Tokenizer(
                    "augmentation requested but no translator was given".into(),
                ))
            }
            (true, Some(t)) => Some(Augmenter::new(t, self.vocab, cfg.augment_config.clone())),
            (false, _) => None,
        };

        let mut rng     = StdRng::seed_from_u64(cfg.seed);
        let mut report  = BuildReport::default();
        let mut samples = Vec::new();

        for (row, entry) in corpus.entries().enumerate() {
            report.records += 1;

            // ── Label resolution ────────────────────────────────────────────
            let Some(label_name) = corpus.label_name(entry.target) else {
                report.skipped_invalid_label += 1;
                continue;
            };
            if cfg.filter_ambiguous && label_name == cfg.ambiguous_label {
                report.skipped_ambiguous += 1;
                continue;
            }
            let Some(label) = MemeClass::from_raw(entry.target, cfg.meme_only) else {
                tracing::debug!("Row {}: target {} has no class", row, entry.target);
                report.skipped_invalid_label += 1;
                continue;
            };

            // ── Image file ──────────────────────────────────────────────────
            let path = image_path(&cfg.image_root, label_name, entry.image_id);
            if !path.exists() {
                report.skipped_missing_file += 1;
                continue;
            }

            let decoded = if cfg.emit_image {
                match transforms::load_rgb(&path) {
                    Ok(img) => Some(img),
                    Err(e) => {
                        tracing::warn!("Row {}: {}", row, e);
                        report.skipped_undecodable += 1;
                        if cfg.purge_corrupt {
                            match fs::remove_file(&path) {
                                Ok(()) => report.purged_files += 1,
                                Err(e) => tracing::warn!("Cannot delete '{}': {}", path.display(), e),
                            }
                        }
                        continue;
                    }
                }
            } else {
                None
            };

            // ── Text ────────────────────────────────────────────────────────
            let text = self.vocab.decode(entry.token_ids)?;
            let bert_encoding = match bert {
                Some(enc) => Some(
                    enc.encode(&text)
                        .map_err(|e| DatasetError::Tokenizer(format!("{e:#}")))?,
                ),
                None => None,
            };

            let index = samples.len();
            samples.push(Sample {
                image:    decoded.as_ref().map(transforms::to_tensor),
                tokens:   entry.token_ids.to_vec(),
                text_len: entry.token_ids.len(),
                bert:     bert_encoding,
                label,
                origin:   SampleOrigin::Original { record: row },
            });
            report.admitted += 1;

            // ── Augmentation ────────────────────────────────────────────────
            let Some(augmenter) = &augmenter else { continue };

            match augmenter.augment(decoded.as_ref(), &text, entry.token_ids, &mut rng) {
                AugmentOutcome::Emitted { image, tokens } => {
                    let bert_encoding = match bert {
                        Some(enc) => match self.vocab.decode(&tokens).map_err(anyhow::Error::from)
                            .and_then(|t| enc.encode(&t))
                        {
                            Ok(encoding) => Some(encoding),
                            Err(e) => {
                                tracing::warn!("Row {}: augmented text not encodable: {:#}", row, e);
                                report.augment_failed += 1;
                                continue;
                            }
                        },
                        None => None,
                    };
                    samples.push(Sample {
                        image,
                        text_len: tokens.len(),
                        tokens,
                        bert: bert_encoding,
                        label,
                        origin: SampleOrigin::Augmented { source: index },
                    });
                    report.augmented += 1;
                }
                AugmentOutcome::Skipped(AugmentSkip::TooShort { .. }) => report.augment_skipped_short += 1,
                AugmentOutcome::Skipped(AugmentSkip::Unchanged)       => report.augment_skipped_same += 1,
                AugmentOutcome::Skipped(AugmentSkip::Failed(_))       => report.augment_failed += 1,
            }
        }

        // ── Corpus-wide padding ─────────────────────────────────────────────
        let width = samples.iter().map(|s| s.text_len).max().unwrap_or(0);
        let pad = self.vocab.pad_id();
        for s in &mut samples {
            pad_to(&mut s.tokens, width, pad);
        }
        report.text_width = width;

        report.log();
        Ok((MemeDataset::new(samples), report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::corpus::CorpusImages;
    use crate::domain::sample::{BertEncoding, BERT_MAX_LEN, IMAGE_LEN};
    use crate::domain::vocab::PAD_ID;
    use anyhow::Result;
    use burn::data::dataset::Dataset;
    use std::collections::HashMap;
    use std::path::Path;

    struct WordCountEncoder;

    impl SubwordEncoder for WordCountEncoder {
        fn encode(&self, text: &str) -> Result<BertEncoding> {
            let words = text.split_whitespace().count().min(BERT_MAX_LEN - 2);
            let mut ids = vec![101];
            ids.extend((0..words).map(|i| 1000 + i as u32));
            ids.push(102);
            let mut mask = vec![1; ids.len()];
            ids.resize(BERT_MAX_LEN, 0);
            mask.resize(BERT_MAX_LEN, 0);
            Ok(BertEncoding { ids, mask })
        }
    }

    struct ReversingTranslator;

    impl Translator for ReversingTranslator {
        fn translate(&self, text: &str, _source: &str, _target: &str) -> Result<String> {
            Ok(text.split_whitespace().rev().collect::<Vec<_>>().join(" "))
        }
    }

    /// Tacks on a word no vocabulary knows.
    struct SuffixTranslator;

    impl Translator for SuffixTranslator {
        fn translate(&self, text: &str, _source: &str, _target: &str) -> Result<String> {
            Ok(format!("{text} zzzunknown"))
        }
    }

    struct DownTranslator;

    impl Translator for DownTranslator {
        fn translate(&self, _text: &str, _source: &str, _target: &str) -> Result<String> {
            anyhow::bail!("connection refused")
        }
    }

    fn write_image(root: &Path, label: &str, id: u64) {
        let dir = root.join(label);
        fs::create_dir_all(&dir).unwrap();
        let img = image::RgbImage::from_fn(40, 30, |x, y| image::Rgb([x as u8, y as u8, 90]));
        img.save(image_path(root, label, id)).unwrap();
    }

    fn vocab() -> Vocabulary {
        Vocabulary::from_entries([("hola", 5), ("mundo", 7), ("gato", 8), ("negro", 9), ("come", 10)]).unwrap()
    }

    fn names() -> HashMap<String, String> {
        HashMap::from([
            ("1".to_string(), "Meme".to_string()),
            ("2".to_string(), "No Meme".to_string()),
            ("4".to_string(), "Sticker".to_string()),
            ("5".to_string(), "Dudoso".to_string()),
        ])
    }

    /// 10 rows: 2 ambiguous, 1 missing image, 7 valid.
    fn ten_record_corpus(root: &Path) -> CorpusRecord {
        let rows: Vec<(u64, Vec<u32>, i64)> = vec![
            (1, vec![5, 7], 1),
            (2, vec![8, 9, 10], 2),
            (3, vec![], 4),
            (4, vec![5], 5),
            (5, vec![7, 8], 1),
            (6, vec![9], 5),
            (7, vec![10, 5, 7, 8], 2),
            (8, vec![5, 5, 5], 4),
            (9, vec![8], 1),
            (10, vec![7], 2),
        ];
        let names = names();
        for (id, _, target) in &rows {
            let label = &names[&target.to_string()];
            if *id != 9 && label != "Dudoso" {
                write_image(root, label, *id);
            }
        }
        CorpusRecord {
            vocab: HashMap::new(),
            images: CorpusImages {
                img_ids: rows.iter().map(|r| r.0).collect(),
                texts:   rows.iter().map(|r| r.1.clone()).collect(),
                targets: rows.iter().map(|r| r.2).collect(),
            },
            targets_names: names,
        }
    }

    fn config(root: &Path) -> BuilderConfig {
        BuilderConfig { image_root: root.to_path_buf(), ..BuilderConfig::default() }
    }

    #[test]
    fn test_ten_record_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let corpus = ten_record_corpus(dir.path());
        let v = vocab();

        let (dataset, report) = DatasetBuilder::new(config(dir.path()), &v).build(&corpus).unwrap();

        assert_eq!(dataset.len(), 7);
        assert_eq!(report.admitted, 7);
        assert_eq!(report.skipped_ambiguous, 2);
        assert_eq!(report.skipped_missing_file, 1);
        assert_eq!(report.admitted + report.skipped(), report.records);

        for s in dataset.samples() {
            assert!(s.label.index() <= 2);
            assert_eq!(s.image.as_ref().map(Vec::len), Some(IMAGE_LEN));
            assert_eq!(s.tokens.len(), 4);
            assert!(s.tokens[s.text_len..].iter().all(|&t| t == PAD_ID));
        }
        let origins: Vec<usize> = dataset
            .samples()
            .iter()
            .map(|s| match s.origin {
                SampleOrigin::Original { record } => record,
                SampleOrigin::Augmented { .. } => usize::MAX,
            })
            .collect();
        assert_eq!(origins, vec![0, 1, 2, 4, 6, 7, 9]);
    }

    #[test]
    fn test_code_four_follows_meme_only_mode() {
        let dir = tempfile::tempdir().unwrap();
        let corpus = ten_record_corpus(dir.path());
        let v = vocab();

        let (normal, _) = DatasetBuilder::new(config(dir.path()), &v).build(&corpus).unwrap();
        assert_eq!(normal.samples()[2].label, MemeClass::Sticker);

        let cfg = BuilderConfig { meme_only: true, ..config(dir.path()) };
        let (collapsed, _) = DatasetBuilder::new(cfg, &v).build(&corpus).unwrap();
        assert_eq!(collapsed.samples()[2].label, MemeClass::Meme);
        assert!(collapsed.labels().iter().all(|&l| l != MemeClass::Sticker));
    }

    #[test]
    fn test_ambiguous_rows_admitted_without_filter_are_still_labelled() {
        let dir = tempfile::tempdir().unwrap();
        let corpus = ten_record_corpus(dir.path());
        let v = vocab();

        let cfg = BuilderConfig { filter_ambiguous: false, ..config(dir.path()) };
        let (dataset, report) = DatasetBuilder::new(cfg, &v).build(&corpus).unwrap();

        // Code 5 has no class, so the rows are still left out, but counted differently.
        assert_eq!(dataset.len(), 7);
        assert_eq!(report.skipped_ambiguous, 0);
        assert_eq!(report.skipped_invalid_label, 2);
    }

    #[test]
    fn test_bert_encodings_align_with_samples() {
        let dir = tempfile::tempdir().unwrap();
        let corpus = ten_record_corpus(dir.path());
        let v = vocab();
        let enc = WordCountEncoder;

        let cfg = BuilderConfig { emit_bert: true, emit_image: false, ..config(dir.path()) };
        let (dataset, _) = DatasetBuilder::new(cfg, &v).with_bert(&enc).build(&corpus).unwrap();

        for s in dataset.samples() {
            let bert = s.bert.as_ref().unwrap();
            assert_eq!(bert.ids.len(), BERT_MAX_LEN);
            assert_eq!(bert.mask.iter().filter(|&&m| m == 1).count(), s.text_len + 2);
            assert!(s.image.is_none());
        }
    }

    #[test]
    fn test_bert_without_encoder_is_an_error() {
        let v = vocab();
        let cfg = BuilderConfig { emit_bert: true, ..BuilderConfig::default() };
        let err = DatasetBuilder::new(cfg, &v).build(&CorpusRecord::default());
        assert!(matches!(err, Err(DatasetError::Tokenizer(_))));
    }

    #[test]
    fn test_augmentation_appends_linked_samples() {
        let dir = tempfile::tempdir().unwrap();
        let corpus = ten_record_corpus(dir.path());
        let v = vocab();
        let t = ReversingTranslator;

        let cfg = BuilderConfig { augment: true, ..config(dir.path()) };
        let (dataset, report) = DatasetBuilder::new(cfg, &v).with_translator(&t).build(&corpus).unwrap();

        // Images 2 (3 words) and 7 (4 words) paraphrase; image 3 has no text
        // and only its picture changes; image 8 ("hola hola hola") reverses to itself.
        assert_eq!(report.augmented, 3);
        assert_eq!(report.augment_skipped_same, 1);
        assert_eq!(report.augment_skipped_short, 3);
        assert_eq!(dataset.len(), 10);
        assert_eq!(dataset.augmented_count(), 3);

        for (i, s) in dataset.samples().iter().enumerate() {
            if let SampleOrigin::Augmented { source } = s.origin {
                assert!(source < i);
                assert_eq!(dataset.samples()[source].label, s.label);
                assert_eq!(s.image.as_ref().map(Vec::len), Some(IMAGE_LEN));
            }
        }
        let reversed = &dataset.samples()[2];
        assert_eq!(&reversed.tokens[..3], &[10, 9, 8]);
    }

    #[test]
    fn test_corrupt_image_is_skipped_and_optionally_purged() {
        let dir = tempfile::tempdir().unwrap();
        let corpus = ten_record_corpus(dir.path());
        let broken = image_path(dir.path(), "Meme", 1);
        fs::write(&broken, b"garbage").unwrap();
        let v = vocab();

        let (dataset, report) = DatasetBuilder::new(config(dir.path()), &v).build(&corpus).unwrap();
        assert_eq!(dataset.len(), 6);
        assert_eq!(report.skipped_undecodable, 1);
        assert!(broken.exists());

        let cfg = BuilderConfig { purge_corrupt: true, ..config(dir.path()) };
        let (_, report) = DatasetBuilder::new(cfg, &v).build(&corpus).unwrap();
        assert_eq!(report.purged_files, 1);
        assert!(!broken.exists());
    }

    #[test]
    fn test_text_only_augmentation_never_duplicates_its_source() {
        let dir = tempfile::tempdir().unwrap();
        let corpus = ten_record_corpus(dir.path());
        let v = vocab();
        let t = SuffixTranslator;

        let cfg = BuilderConfig { augment: true, emit_image: false, ..config(dir.path()) };
        let (dataset, report) = DatasetBuilder::new(cfg, &v).with_translator(&t).build(&corpus).unwrap();

        // Rows 2, 7 and 8 only gain an unknown word; row 3 has neither text nor image.
        assert_eq!(report.augmented, 0);
        assert_eq!(report.augment_skipped_same, 4);
        assert_eq!(report.augment_skipped_short, 3);
        assert_eq!(dataset.len(), 7);
        assert_eq!(dataset.augmented_count(), 0);
    }

    #[test]
    fn test_failing_translator_leaves_base_samples_intact() {
        let dir = tempfile::tempdir().unwrap();
        let corpus = ten_record_corpus(dir.path());
        let v = vocab();
        let t = DownTranslator;

        let (plain, _) = DatasetBuilder::new(config(dir.path()), &v).build(&corpus).unwrap();

        let cfg = BuilderConfig { augment: true, ..config(dir.path()) };
        let (dataset, report) = DatasetBuilder::new(cfg, &v).with_translator(&t).build(&corpus).unwrap();

        // Rows 2, 7 and 8 reach the translator; row 3 has no text and only its picture varies.
        assert_eq!(report.augment_failed, 3);
        assert_eq!(report.augmented, 1);
        assert_eq!(report.admitted, plain.len());

        let originals: Vec<&Sample> = dataset
            .samples()
            .iter()
            .filter(|s| matches!(s.origin, SampleOrigin::Original { .. }))
            .collect();
        assert_eq!(originals.len(), plain.len());
        for (kept, base) in originals.iter().zip(plain.samples()) {
            assert_eq!(kept.origin, base.origin);
            assert_eq!(kept.label, base.label);
            assert_eq!(kept.tokens, base.tokens);
            assert_eq!(kept.text_len, base.text_len);
            assert_eq!(kept.image, base.image);
        }
    }
}
