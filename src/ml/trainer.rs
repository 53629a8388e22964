// ============================================================
// Layer 5 — Training Orchestrator
// ============================================================
// Epoch/step loop over a balanced draw of the training split with
// periodic evaluation on the test split.
//
// Per step:
//   collate → pick modality tensors → forward → cross-entropy
//   → backward → optimiser step → accumulate running loss
//
// Every `eval_every` steps:
//   model.valid() (no autodiff, dropout off) → full test pass
//   → loss / accuracy / confusion matrix → history, CSV, sink,
//   optional image dumps → running loss reset
//
// Corrupt images surface as TrainError::ImageDecode from the
// model call. What happens next depends on DecodePolicy:
//   Skip     log, count, delete only if `purge_corrupt`, carry on
//   Restart  delete the file, clear the history, start again from
//            epoch 1 with the current weights (bounded by
//            `max_restarts`)
//
// MemeClassifier reads pixels the DatasetBuilder already decoded,
// so it never raises ImageDecode. DecodePolicy and restarts only
// come into play for injected ClassifierForward models that decode
// lazily inside `classify`.
//
// After each epoch the weights and progress.json are written when
// a CheckpointManager is attached, so a run can be resumed.
//
// Key Burn insight:
//   - Training uses B (an AutodiffBackend) for gradients
//   - model.valid() returns the module on B::InnerBackend
//   - Evaluation batcher must also use B::InnerBackend
//   - argmax(1) returns [batch,1] so we flatten before reading
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use std::{fmt, fs, path::{Path, PathBuf}, str::FromStr};

use burn::{
    data::{dataloader::batcher::Batcher, dataset::Dataset},
    module::{AutodiffModule, Module},
    nn::loss::CrossEntropyLossConfig,
    optim::{GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::data::{
    batcher::{MemeBatch, MemeBatcher},
    dataset::MemeDataset,
    splitter::SplitHandle,
};
use crate::domain::{sample::Sample, traits::ScalarSink};
use crate::infra::{
    checkpoint::{self, CheckpointManager, Progress},
    graph,
    metrics::{MetricsHistory, MetricsLogger, TickMetrics},
    samples,
};
use crate::ml::{
    error::TrainError,
    evaluator::{log_class_report, ConfusionMatrix},
    model::{ClassifierForward, ModalInput},
};

// ─── Configuration ────────────────────────────────────────────────────────────

/// What to do when a batch hits an undecodable image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecodePolicy {
    #[default]
    Skip,
    Restart,
}

impl FromStr for DecodePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "skip"    => Ok(Self::Skip),
            "restart" => Ok(Self::Restart),
            other     => Err(format!("unknown decode policy '{other}' (expected skip or restart)")),
        }
    }
}

impl fmt::Display for DecodePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Skip    => "skip",
            Self::Restart => "restart",
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainerConfig {
    pub epochs:           usize,
    pub learning_rate:    f64,
    pub batch_size:       usize,
    /// Evaluate every this many training steps.
    pub eval_every:       usize,
    pub decode_policy:    DecodePolicy,
    /// Delete undecodable images under the Skip policy as well.
    pub purge_corrupt:    bool,
    pub max_restarts:     usize,
    pub show_matrix:      bool,
    pub show_metrics:     bool,
    pub image_dump_dir:   Option<PathBuf>,
    pub image_dump_limit: usize,
    pub seed:             u64,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            epochs:           10,
            learning_rate:    1e-3,
            batch_size:       64,
            eval_every:       50,
            decode_policy:    DecodePolicy::Skip,
            purge_corrupt:    false,
            max_restarts:     3,
            show_matrix:      false,
            show_metrics:     false,
            image_dump_dir:   None,
            image_dump_limit: 16,
            seed:             42,
        }
    }
}

/// Outcome of `Trainer::fit`.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainSummary {
    pub steps:           usize,
    pub ticks:           usize,
    pub skipped_batches: usize,
    pub restarts:        usize,
    pub last:            Option<TickMetrics>,
}

// ─── Trainer ──────────────────────────────────────────────────────────────────

pub struct Trainer<B, M, O>
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + ClassifierForward<B>,
    O: Optimizer<M, B>,
{
    config:          TrainerConfig,
    model:           M,
    optim:           O,
    device:          B::Device,
    rng:             StdRng,
    history:         MetricsHistory,
    sink:            Option<Box<dyn ScalarSink>>,
    csv:             Option<MetricsLogger>,
    checkpoints:     Option<CheckpointManager>,
    start_epoch:     usize,
    step:            usize,
    running_loss:    f64,
    running_steps:   usize,
    skipped_batches: usize,
    restarts:        usize,
}

impl<B, M, O> Trainer<B, M, O>
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + ClassifierForward<B>,
    M::InnerModule: ClassifierForward<B::InnerBackend>,
    O: Optimizer<M, B>,
{
    pub fn new(model: M, optim: O, config: TrainerConfig, device: B::Device) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self {
            config,
            model,
            optim,
            device,
            rng,
            history:         MetricsHistory::default(),
            sink:            None,
            csv:             None,
            checkpoints:     None,
            start_epoch:     1,
            step:            0,
            running_loss:    0.0,
            running_steps:   0,
            skipped_batches: 0,
            restarts:        0,
        }
    }

    pub fn with_sink(mut self, sink: Box<dyn ScalarSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn with_metrics_log(mut self, logger: MetricsLogger) -> Self {
        self.csv = Some(logger);
        self
    }

    pub fn with_checkpoints(mut self, manager: CheckpointManager) -> Self {
        self.checkpoints = Some(manager);
        self
    }

    /// Continue after the epoch recorded in `progress`, keeping its history.
    pub fn resume(&mut self, progress: Progress) {
        tracing::info!(
            "Resuming after epoch {} (step {}, {} ticks of history)",
            progress.epoch, progress.step, progress.history.len(),
        );
        self.start_epoch = progress.epoch + 1;
        self.step        = progress.step;
        self.history     = progress.history;
    }

    pub fn history(&self) -> &MetricsHistory {
        &self.history
    }

    /// Write the current parameters at full precision.
    pub fn save_model(&self, path: &Path) -> Result<(), TrainError> {
        checkpoint::save_model::<B, M>(&self.model, path)
            .map_err(|e| TrainError::Checkpoint(format!("{e:#}")))
    }

    /// Write a Graphviz description of the model branches.
    pub fn export_graph(&self, path: &Path) -> Result<(), TrainError> {
        graph::write_dot(path, self.model.modality(), &self.model.branches())
            .map_err(|e| TrainError::Checkpoint(format!("{e:#}")))
    }

    // ─── Main loop ────────────────────────────────────────────────────────────

    pub fn fit(&mut self, dataset: &MemeDataset, split: &SplitHandle) -> Result<TrainSummary, TrainError> {
        if split.train().is_empty() {
            return Err(TrainError::EmptySplit("train"));
        }
        if split.test().is_empty() {
            return Err(TrainError::EmptySplit("test"));
        }
        self.log_summary(split);

        loop {
            match self.run_epochs(dataset, split) {
                Ok(()) => break,
                Err(TrainError::ImageDecode { path, reason })
                    if self.config.decode_policy == DecodePolicy::Restart =>
                {
                    self.restart(&path, &reason)?;
                }
                Err(e) => return Err(e),
            }
        }

        tracing::info!(
            "Training complete: {} steps, {} ticks, {} skipped batches, {} restarts",
            self.step, self.history.len(), self.skipped_batches, self.restarts,
        );
        tracing::debug!(
            "Loss curves: train={:?} test={:?}",
            self.history.train_losses(), self.history.test_losses(),
        );
        Ok(TrainSummary {
            steps:           self.step,
            ticks:           self.history.len(),
            skipped_batches: self.skipped_batches,
            restarts:        self.restarts,
            last:            self.history.last().cloned(),
        })
    }

    fn run_epochs(&mut self, dataset: &MemeDataset, split: &SplitHandle) -> Result<(), TrainError> {
        let batcher = MemeBatcher::<B>::new(self.device.clone());

        for epoch in self.start_epoch..=self.config.epochs {
            let order = split.train_epoch(&mut self.rng);
            let mut epoch_loss  = 0.0f64;
            let mut epoch_steps = 0usize;

            for chunk in order.chunks(self.config.batch_size) {
                let batch = batcher.batch(gather(dataset, chunk));

                match self.train_step(batch) {
                    Ok(loss) => {
                        self.running_loss  += loss;
                        self.running_steps += 1;
                        epoch_loss  += loss;
                        epoch_steps += 1;
                    }
                    Err(TrainError::ImageDecode { path, reason })
                        if self.config.decode_policy == DecodePolicy::Skip =>
                    {
                        self.skip_batch(&path, &reason);
                    }
                    Err(e) => return Err(e),
                }

                self.step += 1;
                if self.step % self.config.eval_every == 0 {
                    self.evaluate(epoch, dataset, split)?;
                }
            }

            let avg = if epoch_steps > 0 { epoch_loss / epoch_steps as f64 } else { f64::NAN };
            tracing::info!(
                "Epoch {:>3}/{} | train_loss={:.4} | steps={}",
                epoch, self.config.epochs, avg, self.step,
            );

            self.start_epoch = epoch + 1;
            self.save_checkpoint(epoch)?;
        }
        Ok(())
    }

    fn train_step(&mut self, batch: MemeBatch<B>) -> Result<f64, TrainError> {
        let input  = ModalInput::from_batch(&batch, self.model.modality())?;
        let logits = self.model.classify(input)?;

        let ce   = CrossEntropyLossConfig::new().init(&logits.device());
        let loss = ce.forward(logits, batch.labels);
        let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();

        // Backward pass + optimiser update
        let grads = GradientsParams::from_grads(loss.backward(), &self.model);
        self.model = self.optim.step(self.config.learning_rate, self.model.clone(), grads);

        Ok(loss_val)
    }

    // ─── Evaluation tick ──────────────────────────────────────────────────────

    fn evaluate(&mut self, epoch: usize, dataset: &MemeDataset, split: &SplitHandle) -> Result<TickMetrics, TrainError> {
        // model.valid() → same module on B::InnerBackend, dropout disabled
        let model    = self.model.valid();
        let modality = model.modality();
        let batcher  = MemeBatcher::<B::InnerBackend>::new(self.device.clone());

        let mut loss_sum = 0.0f64;
        let mut batches  = 0usize;
        let mut matrix   = ConfusionMatrix::new();
        let mut dump: Option<(Vec<f32>, Vec<usize>, Vec<usize>)> = None;

        let order = split.test_pass(&mut self.rng);
        for chunk in order.chunks(self.config.batch_size) {
            let batch  = batcher.batch(gather(dataset, chunk));
            let input  = ModalInput::from_batch(&batch, modality)?;
            let images = input.image().cloned();

            let logits = match model.classify(input) {
                Ok(logits) => logits,
                Err(TrainError::ImageDecode { path, reason })
                    if self.config.decode_policy == DecodePolicy::Skip =>
                {
                    self.skip_batch(&path, &reason);
                    continue;
                }
                Err(e) => return Err(e),
            };

            let ce = CrossEntropyLossConfig::new().init(&logits.device());
            loss_sum += ce
                .forward(logits.clone(), batch.labels.clone())
                .into_scalar()
                .elem::<f64>();
            batches += 1;

            let preds  = to_indices(logits.argmax(1).flatten::<1>(0, 1));
            let labels = to_indices(batch.labels);
            matrix.add_pairs(&labels, &preds);

            if dump.is_none() && self.config.image_dump_dir.is_some() {
                if let Some(images) = images {
                    let flat: Vec<f32> = images.into_data().iter::<f32>().collect();
                    dump = Some((flat, labels, preds));
                }
            }
        }

        let test_loss  = if batches > 0 { loss_sum / batches as f64 } else { f64::NAN };
        let train_loss = if self.running_steps > 0 {
            self.running_loss / self.running_steps as f64
        } else {
            f64::NAN
        };
        let tick = TickMetrics::new(epoch, self.step, train_loss, test_loss, matrix.accuracy());
        self.reset_running();

        tracing::info!(
            "Epoch {:>3} step {:>6} | train_loss={:.4} | test_loss={:.4} | test_acc={:.1}%",
            epoch, self.step, tick.train_loss, tick.test_loss, tick.test_acc * 100.0,
        );
        if self.config.show_matrix {
            matrix.log();
        }
        if self.config.show_metrics {
            log_class_report(&matrix.class_report());
        }

        self.publish(&tick)?;

        if let (Some(dir), Some((images, labels, preds))) = (&self.config.image_dump_dir, dump) {
            samples::dump_predictions(dir, self.history.len(), &images, &labels, &preds, self.config.image_dump_limit)
                .map_err(|e| TrainError::Sink(format!("{e:#}")))?;
        }

        self.history.push(tick.clone());
        Ok(tick)
    }

    fn publish(&mut self, tick: &TickMetrics) -> Result<(), TrainError> {
        if let Some(sink) = self.sink.as_mut() {
            let scalars = [
                ("Loss/train", tick.train_loss),
                ("Loss/test",  tick.test_loss),
                ("Acc/test",   tick.test_acc),
            ];
            for (tag, value) in scalars {
                sink.add_scalar(tag, value, tick.step)
                    .map_err(|e| TrainError::Sink(format!("{e:#}")))?;
            }
        }
        if let Some(csv) = &self.csv {
            csv.log(tick).map_err(|e| TrainError::Sink(format!("{e:#}")))?;
        }
        Ok(())
    }

    // ─── Helpers ──────────────────────────────────────────────────────────────

    fn skip_batch(&mut self, path: &Path, reason: &str) {
        self.skipped_batches += 1;
        tracing::warn!("Skipping batch: cannot decode '{}': {}", path.display(), reason);
        if self.config.purge_corrupt {
            remove_corrupt(path);
        }
    }

    /// Delete the file that broke the run and reset to a fresh run
    /// state: empty history, step 0, epoch 1. Weights are kept.
    fn restart(&mut self, path: &Path, reason: &str) -> Result<(), TrainError> {
        if self.restarts >= self.config.max_restarts {
            return Err(TrainError::RestartLimit { restarts: self.restarts });
        }
        self.restarts += 1;
        tracing::warn!(
            "Cannot decode '{}' ({}); deleting it and restarting from epoch 1 (restart {}/{})",
            path.display(), reason, self.restarts, self.config.max_restarts,
        );
        remove_corrupt(path);

        self.history.clear();
        self.start_epoch = 1;
        self.step        = 0;
        self.reset_running();
        Ok(())
    }

    fn reset_running(&mut self) {
        self.running_loss  = 0.0;
        self.running_steps = 0;
    }

    fn save_checkpoint(&self, epoch: usize) -> Result<(), TrainError> {
        let Some(manager) = &self.checkpoints else {
            return Ok(());
        };
        let progress = Progress { epoch, step: self.step, history: self.history.clone() };
        manager
            .save_epoch::<B, M>(&self.model, &progress)
            .map_err(|e| TrainError::Checkpoint(format!("{e:#}")))
    }

    fn log_summary(&self, split: &SplitHandle) {
        let c = &self.config;
        tracing::info!(
            "Training summary: modality={}, parameters={}, criterion=CrossEntropy, epochs={}, lr={}, batch_size={}",
            self.model.modality(), self.model.num_params(), c.epochs, c.learning_rate, c.batch_size,
        );
        tracing::info!(
            "Train split {} samples, test split {} samples, eval every {} steps, decode policy {}",
            split.train().len(), split.test().len(), c.eval_every, c.decode_policy,
        );
    }
}

fn gather(dataset: &MemeDataset, indices: &[usize]) -> Vec<Sample> {
    indices.iter().filter_map(|&i| dataset.get(i)).collect()
}

fn to_indices<B: Backend>(t: Tensor<B, 1, Int>) -> Vec<usize> {
    t.into_data().iter::<i64>().map(|v| v.max(0) as usize).collect()
}

fn remove_corrupt(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => tracing::warn!("Deleted corrupt image '{}'", path.display()),
        Err(e) => tracing::warn!("Cannot delete '{}': {}", path.display(), e),
    }
}
