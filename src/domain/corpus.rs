// ============================================================
// Layer 3 — Corpus Record
// ============================================================
// The raw, read-only input of a training run. It arrives as JSON:
//
//   {
//     "vocab":         { "hello": 4, "world": 5, ... },
//     "images": {
//       "img_ids":     [17, 18, ...],
//       "texts":       [[4, 5], [], ...],     ← pre-tokenized ids
//       "targets":     [1, 4, ...]
//     },
//     "targets_names": { "1": "Meme", "2": "No Meme", "3": "Sticker", "4": "Dudoso" }
//   }
//
// The three `images` columns are parallel: entry i of each one
// describes the same logical record.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Parallel columns describing every labelled image.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorpusImages {
    pub img_ids: Vec<u64>,
    pub texts:   Vec<Vec<u32>>,
    pub targets: Vec<i64>,
}

/// The full corpus record as produced upstream.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorpusRecord {
    pub vocab:         HashMap<String, u32>,
    pub images:        CorpusImages,
    pub targets_names: HashMap<String, String>,
}

/// One row of the corpus, borrowed from the parallel columns.
#[derive(Debug, Clone, Copy)]
pub struct CorpusEntry<'a> {
    pub image_id:  u64,
    pub token_ids: &'a [u32],
    pub target:    i64,
}

impl CorpusRecord {
    /// Number of rows, or `None` when the parallel columns disagree.
    pub fn aligned_len(&self) -> Option<usize> {
        let n = self.images.img_ids.len();
        (self.images.texts.len() == n && self.images.targets.len() == n).then_some(n)
    }

    /// Iterate rows in order. Stops at the shortest column.
    pub fn entries(&self) -> impl Iterator<Item = CorpusEntry<'_>> {
        self.images
            .img_ids
            .iter()
            .zip(&self.images.texts)
            .zip(&self.images.targets)
            .map(|((&image_id, texts), &target)| CorpusEntry {
                image_id,
                token_ids: texts,
                target,
            })
    }

    /// Human label for a raw target code.
    pub fn label_name(&self, target: i64) -> Option<&str> {
        self.targets_names.get(&target.to_string()).map(String::as_str)
    }
}

/// `<root>/<LabelName>/img_<7-digit zero-padded id>.jpg`
pub fn image_path(root: &Path, label_name: &str, image_id: u64) -> PathBuf {
    root.join(label_name).join(format!("img_{image_id:07}.jpg"))
}
