// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// Model architecture, training loop and evaluation metrics.
// The data layer only hands over collated MemeBatch tensors;
// everything that builds or updates parameters lives here.
//
// What's in this layer:
//
//   model.rs      The multimodal classifier
//                 • ImageCnn     two conv blocks + MLP on 56×56 RGB
//                 • TextEncoder  embedding + max-pool over positions
//                 • BertEncoder  small masked transformer, [CLS] pooling
//                 • fusion head  concat of active branches → 3 logits
//
//   trainer.rs    The training orchestrator
//                 Balanced batches, Adam steps, periodic evaluation,
//                 corrupt-image policy, per-epoch checkpoints
//
//   evaluator.rs  Confusion matrix, accuracy, per-class
//                 precision / recall / F1
//
//   error.rs      TrainError
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            Devlin et al. (2019) BERT

/// Multimodal classifier and its branches
pub mod model;

/// Training loop with evaluation ticks and checkpointing
pub mod trainer;

/// Confusion matrix and per-class metrics
pub mod evaluator;

pub mod error;
