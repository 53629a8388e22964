// ============================================================
// Layer 3 — Collaborator Traits
// ============================================================
// Services the pipeline consumes but does not implement itself.
// Concrete versions live in Layer 6 (infra); tests swap in stubs.
//
//   Translator: machine translation used for back-translation
//   SubwordEncoder: fixed-length word-piece encoding for BERT inputs
//   ScalarSink: receives named scalars tagged with a step index

use anyhow::Result;

use crate::domain::sample::BertEncoding;

pub trait Translator {
    /// Translate `text` from `source` to `target`.
    /// `source` may be `"auto"` to let the service detect it.
    fn translate(&self, text: &str, source: &str, target: &str) -> Result<String>;
}

pub trait SubwordEncoder {
    /// Encode with special tokens, padded/truncated to a fixed length.
    fn encode(&self, text: &str) -> Result<BertEncoding>;
}

pub trait ScalarSink {
    fn add_scalar(&mut self, tag: &str, value: f64, step: usize) -> Result<()>;
}
