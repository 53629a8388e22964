// ============================================================
// Layer 6 — Metrics
// ============================================================
// Everything the training loop records about itself:
//
//   TickMetrics    — one evaluation tick (epoch, step, losses, accuracy)
//   MetricsHistory — all ticks of the current run, persisted inside
//                    progress.json so a resumed run keeps its curves
//   MetricsLogger  — appends one CSV row per tick to metrics.csv
//   CsvScalarSink  — a ScalarSink writing `tag,step,value` rows to
//                    scalars.csv, the on-disk telemetry stream
//
// Example metrics.csv:
//   epoch,step,train_loss,test_loss,test_acc
//   1,50,1.081200,1.042300,0.412000
//   1,100,0.990100,0.984300,0.475000

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};
use serde::{Deserialize, Serialize};

use crate::domain::traits::ScalarSink;

/// Metrics of one evaluation tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickMetrics {
    pub epoch: usize,

    /// Global training step the tick happened after
    pub step: usize,

    /// Mean training loss over the steps since the previous tick
    pub train_loss: f64,

    /// Mean cross-entropy over the test batches
    pub test_loss: f64,

    /// Fraction of test samples classified correctly, in [0.0, 1.0]
    pub test_acc: f64,
}

impl TickMetrics {
    pub fn new(epoch: usize, step: usize, train_loss: f64, test_loss: f64, test_acc: f64) -> Self {
        Self { epoch, step, train_loss, test_loss, test_acc }
    }
}

/// Loss curves of the current run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsHistory {
    ticks: Vec<TickMetrics>,
}

impl MetricsHistory {
    pub fn push(&mut self, tick: TickMetrics) {
        self.ticks.push(tick);
    }

    pub fn clear(&mut self) {
        self.ticks.clear();
    }

    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }

    pub fn ticks(&self) -> &[TickMetrics] {
        &self.ticks
    }

    pub fn last(&self) -> Option<&TickMetrics> {
        self.ticks.last()
    }

    pub fn train_losses(&self) -> Vec<f64> {
        self.ticks.iter().map(|t| t.train_loss).collect()
    }

    pub fn test_losses(&self) -> Vec<f64> {
        self.ticks.iter().map(|t| t.test_loss).collect()
    }
}

/// Logs tick metrics to a CSV file for later analysis.
pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Writes the CSV header if the file doesn't exist yet.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create metrics directory '{}'", dir.display()))?;

        let csv_path = dir.join("metrics.csv");

        // Appending across runs keeps resumed runs in one file
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)?;
            writeln!(f, "epoch,step,train_loss,test_loss,test_acc")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    /// Append one tick as a new row.
    pub fn log(&self, m: &TickMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;

        writeln!(
            f,
            "{},{},{:.6},{:.6},{:.6}",
            m.epoch, m.step, m.train_loss, m.test_loss, m.test_acc,
        )?;

        tracing::debug!(
            "Logged tick at step {}: train_loss={:.4}, test_loss={:.4}",
            m.step,
            m.train_loss,
            m.test_loss,
        );
        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}

/// Scalar telemetry written as `tag,step,value` rows.
pub struct CsvScalarSink {
    path: PathBuf,
}

impl CsvScalarSink {
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        let path = dir.join("scalars.csv");
        if !path.exists() {
            fs::write(&path, "tag,step,value\n")
                .with_context(|| format!("Cannot create '{}'", path.display()))?;
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ScalarSink for CsvScalarSink {
    fn add_scalar(&mut self, tag: &str, value: f64, step: usize) -> Result<()> {
        let mut f = OpenOptions::new().append(true).open(&self.path)?;
        writeln!(f, "{tag},{step},{value:.6}")?;
        Ok(())
    }
}
