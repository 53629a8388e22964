// ============================================================
// Layer 6 — BERT Tokenizer
// ============================================================
// Loads a HuggingFace `tokenizer.json` (e.g. the one shipped with
// bert-base-multilingual-cased) and configures it for the fixed
// 16-token encoding the BERT branch expects:
//
//   [CLS] w1 w2 ... [SEP] [PAD] [PAD] ...     (exactly 16 ids)
//   1     1  1  ... 1     0     0     ...     (attention mask)
//
// Longer texts are truncated so that [SEP] still fits.

use anyhow::{anyhow, Result};
use std::path::Path;
use tokenizers::{
    PaddingDirection, PaddingParams, PaddingStrategy, Tokenizer, TruncationParams,
};

use crate::domain::sample::{BertEncoding, BERT_MAX_LEN};
use crate::domain::traits::SubwordEncoder;

pub struct BertTokenizer {
    inner: Tokenizer,
}

impl BertTokenizer {
    pub fn from_file(path: &Path) -> Result<Self> {
        let mut inner = Tokenizer::from_file(path)
            .map_err(|e| anyhow!("Cannot load tokenizer from '{}': {}", path.display(), e))?;

        let pad_token = "[PAD]".to_string();
        let pad_id = inner.token_to_id(&pad_token).unwrap_or(0);

        inner.with_padding(Some(PaddingParams {
            strategy:  PaddingStrategy::Fixed(BERT_MAX_LEN),
            direction: PaddingDirection::Right,
            pad_id,
            pad_token,
            ..Default::default()
        }));
        inner
            .with_truncation(Some(TruncationParams {
                max_length: BERT_MAX_LEN,
                ..Default::default()
            }))
            .map_err(|e| anyhow!("Cannot configure truncation: {e}"))?;

        tracing::info!(
            "Loaded BERT tokenizer '{}' ({} entries)",
            path.display(),
            inner.get_vocab_size(true),
        );
        Ok(Self { inner })
    }

    /// Embedding rows the BERT branch needs.
    pub fn vocab_size(&self) -> usize {
        self.inner.get_vocab_size(true)
    }
}

impl SubwordEncoder for BertTokenizer {
    fn encode(&self, text: &str) -> Result<BertEncoding> {
        let enc = self
            .inner
            .encode(text, true)
            .map_err(|e| anyhow!("Cannot encode '{text}': {e}"))?;
        Ok(BertEncoding {
            ids:  enc.get_ids().to_vec(),
            mask: enc.get_attention_mask().to_vec(),
        })
    }
}
