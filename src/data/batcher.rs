// ============================================================
// Layer 4 — Meme Batcher
// ============================================================
// Implements Burn's Batcher trait to convert a Vec<Sample> into
// tensors for one forward pass.
//
//   images  [N, 3, 56, 56]  stacked as-is (present when every sample has one)
//   tokens  [N, L]          right-padded with the pad id, L = longest
//                           text in THIS batch (at least 1)
//   bert    [N, 16] ids + [N, 16] mask (present when every sample has one)
//   labels  [N]
//
// Samples arrive padded to the corpus-wide width. Only their real
// `text_len` tokens are taken before re-padding, so short batches
// stay narrow and real tokens are never cut.

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::domain::sample::{Sample, BERT_MAX_LEN, IMAGE_CHANNELS, IMAGE_SIZE};
use crate::domain::vocab::PAD_ID;

/// Right-pad `seq` with `pad` up to `width`. Never shortens.
pub fn pad_to(seq: &mut Vec<u32>, width: usize, pad: u32) {
    if seq.len() < width {
        seq.resize(width, pad);
    }
}

/// Pad every sequence to the longest one; an all-empty set pads to width 1.
pub fn pad_sequences(seqs: &[&[u32]], pad: u32) -> (Vec<Vec<u32>>, usize) {
    let width = seqs.iter().map(|s| s.len()).max().unwrap_or(0).max(1);
    let padded = seqs
        .iter()
        .map(|s| {
            let mut v = s.to_vec();
            pad_to(&mut v, width, pad);
            v
        })
        .collect();
    (padded, width)
}

// ─── MemeBatch ────────────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct MemeBatch<B: Backend> {
    pub images:    Option<Tensor<B, 4>>,
    pub tokens:    Tensor<B, 2, Int>,
    pub bert_ids:  Option<Tensor<B, 2, Int>>,
    pub bert_mask: Option<Tensor<B, 2, Int>>,
    pub labels:    Tensor<B, 1, Int>,
}

// ─── MemeBatcher ──────────────────────────────────────────────────────────────
#[derive(Clone, Debug)]
pub struct MemeBatcher<B: Backend> {
    pub device: B::Device,
    pub pad_id: u32,
}

impl<B: Backend> MemeBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device, pad_id: PAD_ID }
    }

    fn int_matrix(&self, flat: Vec<i32>, rows: usize, cols: usize) -> Tensor<B, 2, Int> {
        Tensor::<B, 1, Int>::from_ints(flat.as_slice(), &self.device).reshape([rows, cols])
    }
}

impl<B: Backend> Batcher<Sample, MemeBatch<B>> for MemeBatcher<B> {
    fn batch(&self, items: Vec<Sample>) -> MemeBatch<B> {
        let batch_size = items.len();

        // ── Tokens ────────────────────────────────────────────────────────────
        let texts: Vec<&[u32]> = items
            .iter()
            .map(|s| &s.tokens[..s.text_len.min(s.tokens.len())])
            .collect();
        let (padded, width) = pad_sequences(&texts, self.pad_id);
        let token_flat: Vec<i32> = padded.iter().flatten().map(|&t| t as i32).collect();
        let tokens = self.int_matrix(token_flat, batch_size, width);

        // ── Images ────────────────────────────────────────────────────────────
        let images = if batch_size > 0 && items.iter().all(|s| s.image.is_some()) {
            let flat: Vec<f32> = items
                .iter()
                .filter_map(|s| s.image.as_deref())
                .flatten()
                .copied()
                .collect();
            Some(
                Tensor::<B, 1>::from_floats(flat.as_slice(), &self.device)
                    .reshape([batch_size, IMAGE_CHANNELS, IMAGE_SIZE, IMAGE_SIZE]),
            )
        } else {
            None
        };

        // ── BERT encodings ────────────────────────────────────────────────────
        let (bert_ids, bert_mask) = if batch_size > 0 && items.iter().all(|s| s.bert.is_some()) {
            let encodings: Vec<_> = items.iter().filter_map(|s| s.bert.as_ref()).collect();
            let ids: Vec<i32> = encodings
                .iter()
                .flat_map(|e| e.ids.iter().map(|&x| x as i32))
                .collect();
            let mask: Vec<i32> = encodings
                .iter()
                .flat_map(|e| e.mask.iter().map(|&x| x as i32))
                .collect();
            (
                Some(self.int_matrix(ids, batch_size, BERT_MAX_LEN)),
                Some(self.int_matrix(mask, batch_size, BERT_MAX_LEN)),
            )
        } else {
            (None, None)
        };

        // ── Labels ────────────────────────────────────────────────────────────
        let labels: Vec<i32> = items.iter().map(|s| s.label.index() as i32).collect();
        let labels = Tensor::<B, 1, Int>::from_ints(labels.as_slice(), &self.device);

        MemeBatch { images, tokens, bert_ids, bert_mask, labels }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::class::MemeClass;
    use crate::domain::sample::{BertEncoding, SampleOrigin, IMAGE_LEN};
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn sample(tokens: Vec<u32>, text_len: usize, label: MemeClass) -> Sample {
        Sample {
            image: Some(vec![0.5; IMAGE_LEN]),
            tokens,
            text_len,
            bert: None,
            label,
            origin: SampleOrigin::Original { record: 0 },
        }
    }

    #[test]
    fn test_pad_sequences_to_longest() {
        let a = [4u32, 5, 6];
        let b = [7u32];
        let (padded, width) = pad_sequences(&[&a[..], &b[..]], PAD_ID);
        assert_eq!(width, 3);
        assert_eq!(padded[0], vec![4, 5, 6]);
        assert_eq!(padded[1], vec![7, PAD_ID, PAD_ID]);
    }

    #[test]
    fn test_all_empty_pads_to_one() {
        let empty: &[u32] = &[];
        let (padded, width) = pad_sequences(&[empty, empty], PAD_ID);
        assert_eq!(width, 1);
        assert_eq!(padded, vec![vec![PAD_ID], vec![PAD_ID]]);
    }

    #[test]
    fn test_pad_to_never_truncates() {
        let mut v = vec![3, 4, 5];
        pad_to(&mut v, 2, PAD_ID);
        assert_eq!(v, vec![3, 4, 5]);
    }

    #[test]
    fn test_batch_uses_batch_max_not_corpus_width() {
        let device = Default::default();
        let batcher = MemeBatcher::<TestBackend>::new(device);

        // Corpus width 6, but the longest text here has 2 tokens.
        let items = vec![
            sample(vec![9, 8, 1, 1, 1, 1], 2, MemeClass::Meme),
            sample(vec![7, 1, 1, 1, 1, 1], 1, MemeClass::Sticker),
        ];
        let batch = batcher.batch(items);

        assert_eq!(batch.tokens.dims(), [2, 2]);
        let tokens: Vec<i64> = batch.tokens.into_data().iter::<i64>().collect();
        assert_eq!(tokens, vec![9, 8, 7, PAD_ID as i64]);

        let labels: Vec<i64> = batch.labels.into_data().iter::<i64>().collect();
        assert_eq!(labels, vec![0, 2]);
        assert_eq!(batch.images.map(|t| t.dims()), Some([2, 3, 56, 56]));
        assert!(batch.bert_ids.is_none());
    }

    #[test]
    fn test_bert_tensors_are_stacked() {
        let device = Default::default();
        let batcher = MemeBatcher::<TestBackend>::new(device);

        let mut s = sample(vec![], 0, MemeClass::NoMeme);
        s.image = None;
        s.bert = Some(BertEncoding { ids: vec![2; BERT_MAX_LEN], mask: vec![1; BERT_MAX_LEN] });
        let batch = batcher.batch(vec![s.clone(), s]);

        assert_eq!(batch.bert_ids.map(|t| t.dims()), Some([2, BERT_MAX_LEN]));
        assert_eq!(batch.bert_mask.map(|t| t.dims()), Some([2, BERT_MAX_LEN]));
        assert!(batch.images.is_none());
        assert_eq!(batch.tokens.dims(), [2, 1]);
    }
}
