// ============================================================
// Layer 4 — Back-Translation Augmentation
// ============================================================
// Given a sample that was just admitted to the dataset, try to
// synthesise ONE extra sample with the same label:
//
//   text  → clean → translate to pivot language
//                   (if that came back unchanged, translate pivot → return language)
//         → if still identical to the cleaned original: give up
//         → re-tokenize against the shared vocabulary
//   image → one random crop op + one random flip op → normalise
//
// Texts with 1–2 words are never augmented. Empty texts are: they
// keep an empty token sequence and only the image changes.
//
// Every failure (translation service, tokenization) is logged and
// reported as a skip; the base sample is never touched.

use anyhow::Result;
use image::RgbImage;
use rand::Rng;

use crate::data::preprocessor::TextNormalizer;
use crate::data::transforms::AugmentPlan;
use crate::domain::traits::Translator;
use crate::domain::vocab::Vocabulary;

/// Word-count floor for non-empty texts.
pub const MIN_AUGMENT_WORDS: usize = 3;

#[derive(Debug, Clone)]
pub struct AugmentConfig {
    /// Language the text is first translated into.
    pub pivot_lang:  String,
    /// Language used for the second hop when the first one was a no-op.
    pub return_lang: String,
}

impl Default for AugmentConfig {
    fn default() -> Self {
        Self {
            pivot_lang:  "es".to_string(),
            return_lang: "en".to_string(),
        }
    }
}

/// Why no synthetic sample was produced.
#[derive(Debug, Clone, PartialEq)]
pub enum AugmentSkip {
    TooShort { words: usize },
    Unchanged,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum AugmentOutcome {
    Emitted {
        image:  Option<Vec<f32>>,
        tokens: Vec<u32>,
    },
    Skipped(AugmentSkip),
}

pub struct Augmenter<'a> {
    translator: &'a dyn Translator,
    vocab:      &'a Vocabulary,
    normalizer: TextNormalizer,
    config:     AugmentConfig,
}

impl<'a> Augmenter<'a> {
    pub fn new(translator: &'a dyn Translator, vocab: &'a Vocabulary, config: AugmentConfig) -> Self {
        Self { translator, vocab, normalizer: TextNormalizer::new(), config }
    }

    /// Attempt one augmentation of `(image, text)`, where `source` holds
    /// the token ids the original sample carries.
    pub fn augment<R: Rng + ?Sized>(
        &self,
        image:  Option<&RgbImage>,
        text:   &str,
        source: &[u32],
        rng:    &mut R,
    ) -> AugmentOutcome {
        let cleaned = self.normalizer.clean(text);
        let words = cleaned.split_whitespace().count();
        if words > 0 && words < MIN_AUGMENT_WORDS {
            return AugmentOutcome::Skipped(AugmentSkip::TooShort { words });
        }
        // Nothing to vary: no words to translate and no image to jitter.
        if words == 0 && image.is_none() {
            return AugmentOutcome::Skipped(AugmentSkip::Unchanged);
        }

        let tokens = match self.paraphrase(&cleaned, source) {
            Ok(Some(tokens)) => tokens,
            Ok(None) => return AugmentOutcome::Skipped(AugmentSkip::Unchanged),
            Err(e) => {
                tracing::warn!("Augmentation dropped for '{}': {:#}", text, e);
                return AugmentOutcome::Skipped(AugmentSkip::Failed(e.to_string()));
            }
        };

        let image = image.map(|img| AugmentPlan::random(rng).apply(img, rng));
        AugmentOutcome::Emitted { image, tokens }
    }

    /// `Ok(None)` when translation produced nothing new, either as text
    /// or once re-tokenized against the vocabulary.
    fn paraphrase(&self, cleaned: &str, source: &[u32]) -> Result<Option<Vec<u32>>> {
        if cleaned.is_empty() {
            return Ok(Some(Vec::new()));
        }

        let AugmentConfig { pivot_lang, return_lang } = &self.config;

        let mut translated = self.translator.translate(cleaned, "auto", pivot_lang)?;
        if translated == cleaned {
            translated = self.translator.translate(&translated, pivot_lang, return_lang)?;
        }

        let translated = self.normalizer.clean(&translated);
        if translated == cleaned {
            return Ok(None);
        }

        let tokens = self.vocab.tokenize(&translated);
        if tokens == source {
            tracing::debug!("Paraphrase '{}' adds only unknown words", translated);
            return Ok(None);
        }

        tracing::debug!("Paraphrased '{}' → '{}'", cleaned, translated);
        Ok(Some(tokens))
    }
}
