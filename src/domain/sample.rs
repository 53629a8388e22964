// ============================================================
// Layer 3 — Sample
// ============================================================
// One training example after dataset construction:
//
//   image: 3×56×56 normalised pixels, CHW order (absent in text-only runs)
//   tokens: vocabulary ids, padded once the whole corpus has been scanned
//   bert: fixed-length word-piece ids + attention mask (BERT runs only)
//   label: one of the three meme classes
//   origin: corpus row it came from, or the sample it was augmented from

use serde::{Deserialize, Serialize};

use crate::domain::class::MemeClass;

pub const IMAGE_SIZE: usize = 56;
pub const IMAGE_CHANNELS: usize = 3;
pub const IMAGE_LEN: usize = IMAGE_CHANNELS * IMAGE_SIZE * IMAGE_SIZE;
pub const BERT_MAX_LEN: usize = 16;

/// Word-piece encoding of a sample's text, special tokens included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BertEncoding {
    pub ids:  Vec<u32>,
    pub mask: Vec<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampleOrigin {
    /// Built from corpus row `record`.
    Original { record: usize },
    /// Synthesised from the sample at dataset index `source`.
    Augmented { source: usize },
}

#[derive(Debug, Clone)]
pub struct Sample {
    pub image:    Option<Vec<f32>>,
    pub tokens:   Vec<u32>,
    /// Token count before corpus-wide padding.
    pub text_len: usize,
    pub bert:     Option<BertEncoding>,
    pub label:    MemeClass,
    pub origin:   SampleOrigin,
}

impl Sample {
    pub fn is_augmented(&self) -> bool {
        matches!(self.origin, SampleOrigin::Augmented { .. })
    }

    /// Dataset index of the original this sample belongs to.
    pub fn group(&self, own_index: usize) -> usize {
        match self.origin {
            SampleOrigin::Original { .. } => own_index,
            SampleOrigin::Augmented { source } => source,
        }
    }
}
