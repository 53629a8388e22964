// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Pure Rust types that describe the meme classification problem.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O or network calls
//   - Only plain structs, enums, traits and their errors
//
// What lives here:
//   corpus.rs   — the raw labelled corpus record (vocab, images, target names)
//   vocab.rs    — token ↔ id mapping with the reserved pad symbol
//   class.rs    — the three meme classes and the raw-target remap rule
//   modality.rs — which inputs (image / token ids / BERT ids) a run feeds the model
//   sample.rs   — one dataset sample and where it came from
//   traits.rs   — collaborators injected from the outside (translator, encoder, sink)
//   error.rs    — errors raised by the types above

pub mod class;
pub mod corpus;
pub mod error;
pub mod modality;
pub mod sample;
pub mod traits;
pub mod vocab;
