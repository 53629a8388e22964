// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All business logic is delegated to Layer 2 (application).
//
// Two commands are supported:
//   1. `train`   — builds the dataset and trains a classifier
//   2. `inspect` — builds the dataset and prints what was kept
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, InspectArgs, TrainArgs};

#[derive(Parser, Debug)]
#[command(
    name = "meme-classifier",
    version = "0.1.0",
    about = "Train image / text / BERT meme classifiers on a labelled corpus."
)]
pub struct Cli {
    /// The subcommand to run (train or inspect)
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)   => run_train(args),
            Commands::Inspect(args) => run_inspect(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Starting training on corpus: {}", args.data.corpus);
    let checkpoint_dir = args.checkpoint_dir.clone();

    let summary = TrainUseCase::new(args.into()).execute()?;

    println!("Training complete. Checkpoints in '{checkpoint_dir}'.");
    println!(
        "  steps: {}  evaluations: {}  skipped batches: {}  restarts: {}",
        summary.steps, summary.ticks, summary.skipped_batches, summary.restarts,
    );
    if let Some(last) = summary.last {
        println!(
            "  last evaluation: train_loss={:.4} test_loss={:.4} test_acc={:.1}%",
            last.train_loss, last.test_loss, last.test_acc * 100.0,
        );
    }
    Ok(())
}

fn run_inspect(args: InspectArgs) -> Result<()> {
    use crate::application::inspect_use_case::InspectUseCase;

    let summary = InspectUseCase::new(args.into()).execute()?;
    let r = &summary.report;

    println!("Modality: {}", summary.modality);
    println!("Records:  {}", r.records);
    println!("Admitted: {}  (+{} augmented, {} samples total)", r.admitted, summary.augmented, summary.samples);
    println!(
        "Skipped:  {} ({} ambiguous, {} missing file, {} invalid label, {} undecodable, {} purged)",
        r.skipped(), r.skipped_ambiguous, r.skipped_missing_file, r.skipped_invalid_label, r.skipped_undecodable, r.purged_files,
    );
    println!(
        "Augmentation: {} too short, {} unchanged, {} failed",
        r.augment_skipped_short, r.augment_skipped_same, r.augment_failed,
    );
    println!("Text width: {}", r.text_width);
    println!("\nClass distribution:");
    for (class, count) in summary.classes() {
        println!("  {:<8} {}", class.name(), count);
    }
    Ok(())
}
