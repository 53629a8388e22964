// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// This layer handles everything from the raw corpus record
// all the way to tensor batches.
//
// The pipeline flows in this order:
//
//   corpus.json + <root>/<Label>/img_<id>.jpg
//       │
//       ▼
//   CorpusLoader      → parses the record, checks column alignment
//       │
//       ▼
//   DatasetBuilder    → filters rows, decodes images, rebuilds text,
//       │               BERT-encodes, remaps labels, pads tokens
//       │   └─ Augmenter   → back-translation + random crop/flip
//       ▼
//   MemeDataset       → implements Burn's Dataset trait
//       │
//       ▼
//   split_indices     → group-aware train/test partition
//       │
//       ▼
//   SplitHandle       → balanced weighted draws per epoch
//       │
//       ▼
//   MemeBatcher       → pads tokens per batch, stacks tensors

/// Reads the corpus record JSON
pub mod loader;

/// Cleans caption text before translation and re-tokenization
pub mod preprocessor;

/// Image decoding, normalisation and random geometric transforms
pub mod transforms;

/// Back-translation augmentation of a single sample
pub mod augment;

/// Builds the in-memory dataset and its build report
pub mod builder;

/// Implements Burn's Dataset trait for meme samples
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;

/// Group-aware train/test split and per-split sampling policy
pub mod splitter;

/// Inverse-frequency weights and weighted-with-replacement draws
pub mod sampler;

/// Typed errors of this layer
pub mod error;
