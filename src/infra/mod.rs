// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Concrete collaborators and persistence that the upper layers
// use but that belong to none of them:
//
//   checkpoint.rs      — full-precision model weights (.mpk),
//                        progress.json for resuming, and the run
//                        configuration as train_config.json
//
//   metrics.rs         — per-tick metrics history, metrics.csv
//                        and the CSV scalar telemetry sink
//
//   tokenizer_store.rs — HuggingFace tokenizer configured for the
//                        fixed 16-token BERT encoding
//
//   translator.rs      — HTTP machine translation used by the
//                        back-translation augmentation
//
//   graph.rs           — Graphviz export of the model branches
//
//   samples.rs         — denormalised evaluation image dumps
//
// Reference: Burn Book §5 (Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Training metrics history, CSV logger and scalar sink
pub mod metrics;

/// BERT word-piece tokenizer loading
pub mod tokenizer_store;

/// LibreTranslate-style HTTP translator
pub mod translator;

/// DOT export of the classifier graph
pub mod graph;

/// Evaluation image dumps
pub mod samples;
