// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Wires the lower layers together for one user-facing goal:
// training a classifier, or checking what a corpus yields.
//
// Nothing here computes tensors, parses files or prints; it
// validates the run configuration, hands each layer its part
// and returns a summary for the CLI to display.
//
// Reference: Clean Architecture pattern

/// corpus → dataset → split → trainer → checkpoints
pub mod train_use_case;

/// corpus → dataset → build report
pub mod inspect_use_case;
