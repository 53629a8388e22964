// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores model weights using Burn's named MessagePack
// recorder at full precision, plus the progress a resumed run needs.
// Reloaded weights are bit-identical to the saved ones.
//
// What gets saved:
//   1. Model weights (.mpk file)      — all learned parameters
//   2. progress.json                  — last finished epoch, global
//                                       step and the metrics history
//   3. train_config.json              — the run configuration
//
// File naming convention:
//   checkpoints/
//     model_epoch_1.mpk      ← weights after epoch 1
//     model_epoch_2.mpk      ← weights after epoch 2
//     ...
//     progress.json
//     train_config.json
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{Context, Result};
use std::{fs, path::{Path, PathBuf}};
use burn::{
    module::Module,
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkFileRecorder, Recorder},
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::infra::metrics::MetricsHistory;

/// Where a run stopped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    /// Last fully finished epoch (1-based, 0 = none)
    pub epoch:   usize,
    pub step:    usize,
    pub history: MetricsHistory,
}

/// Manages saving and loading of model checkpoints.
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Creates the directory if it doesn't already exist.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create checkpoint directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn model_path(&self, epoch: usize) -> PathBuf {
        self.dir.join(format!("model_epoch_{epoch}"))
    }

    /// Write {dir}/model_epoch_{epoch}.mpk and progress.json.
    pub fn save_epoch<B: Backend, M: Module<B>>(&self, model: &M, progress: &Progress) -> Result<()> {
        save_model(model, &self.model_path(progress.epoch))?;
        self.save_progress(progress)?;
        tracing::debug!("Saved checkpoint: epoch {}", progress.epoch);
        Ok(())
    }

    /// Load the weights of the epoch recorded in progress.json.
    pub fn load_model<B: Backend, M: Module<B>>(&self, model: M, device: &B::Device) -> Result<(M, Progress)> {
        let progress = self.load_progress()?;
        let path = self.model_path(progress.epoch);

        tracing::info!("Loading checkpoint from epoch {}", progress.epoch);

        let record = recorder()
            .load(path.clone(), device)
            .with_context(|| format!("Cannot load checkpoint '{}'", path.display()))?;

        Ok((model.load_record(record), progress))
    }

    pub fn save_progress(&self, progress: &Progress) -> Result<()> {
        self.write_json("progress.json", progress)
    }

    pub fn load_progress(&self) -> Result<Progress> {
        self.read_json("progress.json")
            .context("No progress.json found. Has this run finished an epoch yet?")
    }

    /// Save the run configuration to train_config.json.
    pub fn save_config<C: Serialize>(&self, cfg: &C) -> Result<()> {
        self.write_json("train_config.json", cfg)
    }

    fn write_json<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<()> {
        let path = self.dir.join(name);
        let json = serde_json::to_string_pretty(value)?;
        fs::write(&path, json).with_context(|| format!("Cannot write '{}'", path.display()))?;
        tracing::debug!("Saved '{}'", path.display());
        Ok(())
    }

    fn read_json<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        let path = self.dir.join(name);
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read '{}'", path.display()))?;
        serde_json::from_str(&json).with_context(|| format!("Malformed '{}'", path.display()))
    }
}

fn recorder() -> NamedMpkFileRecorder<FullPrecisionSettings> {
    NamedMpkFileRecorder::default()
}

/// Serialise model parameters to `path` (the recorder adds the extension).
pub fn save_model<B: Backend, M: Module<B>>(model: &M, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Cannot create '{}'", parent.display()))?;
    }
    recorder()
        .record(model.clone().into_record(), path.to_path_buf())
        .with_context(|| format!("Failed to save model to '{}'", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::metrics::TickMetrics;
    use burn::backend::NdArray;
    use burn::nn::{Linear, LinearConfig};

    type TestBackend = NdArray;

    #[test]
    fn test_progress_round_trip_keeps_history() {
        let dir = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path()).unwrap();

        let mut history = MetricsHistory::default();
        history.push(TickMetrics::new(1, 8, 1.0, 1.1, 0.4));
        let progress = Progress { epoch: 1, step: 8, history };

        ckpt.save_progress(&progress).unwrap();
        assert_eq!(ckpt.load_progress().unwrap(), progress);
    }

    #[test]
    fn test_missing_progress_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path()).unwrap();
        assert!(ckpt.load_progress().is_err());
    }

    #[test]
    fn test_model_weights_reload() {
        let dir = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path()).unwrap();
        let device = Default::default();

        let model: Linear<TestBackend> = LinearConfig::new(4, 3).init(&device);
        let progress = Progress { epoch: 2, ..Progress::default() };
        ckpt.save_epoch(&model, &progress).unwrap();

        let fresh: Linear<TestBackend> = LinearConfig::new(4, 3).init(&device);
        let (loaded, p) = ckpt.load_model(fresh, &device).unwrap();
        assert_eq!(p.epoch, 2);
        let a: Vec<f32> = model.weight.val().into_data().iter::<f32>().collect();
        let b: Vec<f32> = loaded.weight.val().into_data().iter::<f32>().collect();
        assert_eq!(a, b);
        assert!(dir.path().join("model_epoch_2.mpk").exists());
    }

    #[test]
    fn test_save_model_reports_unusable_parent() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"not a directory").unwrap();
        let model: Linear<TestBackend> = LinearConfig::new(2, 2).init(&Default::default());

        let err = save_model(&model, &blocker.join("nested").join("model")).unwrap_err();
        assert!(format!("{err:#}").contains("Cannot create"));
    }
}
