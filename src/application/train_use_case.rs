// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Validate the configuration (Layer 3 - domain)
//   Step 2: Load the corpus record     (Layer 4 - data)
//   Step 3: Build the vocabulary       (Layer 3 - domain)
//   Step 4: Load collaborators         (Layer 6 - infra)
//   Step 5: Build the dataset          (Layer 4 - data)
//   Step 6: Split train/test           (Layer 4 - data)
//   Step 7: Save configs               (Layer 6 - infra)
//   Step 8: Build or resume the model  (Layer 5 - ml)
//   Step 9: Run the training loop      (Layer 5 - ml)
//
// Steps 2–5 are shared with the `inspect` command through
// `prepare_data`.
//
// Reference: Rust Book §13 (Iterators and Closures)
//            Burn Book §5 (Training)

use anyhow::{Context, Result};
use burn::{config::Config, optim::AdamConfig};
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::{path::{Path, PathBuf}, time::Duration};

use crate::data::{
    augment::AugmentConfig,
    builder::{BuildReport, BuilderConfig, DatasetBuilder, DEFAULT_AMBIGUOUS_LABEL},
    dataset::MemeDataset,
    loader::CorpusLoader,
    splitter::{split_indices, SplitHandle},
};
use crate::domain::{error::ConfigError, modality::Modality, vocab::Vocabulary};
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::{CsvScalarSink, MetricsLogger},
    tokenizer_store::BertTokenizer,
    translator::HttpTranslator,
};
use crate::ml::{
    model::{MemeClassifier, MemeClassifierConfig},
    trainer::{DecodePolicy, TrainSummary, Trainer, TrainerConfig},
};

type MyBackend = burn::backend::Autodiff<burn::backend::Wgpu>;

// ─── Training Configuration ──────────────────────────────────────────────────
// Everything a run needs, from corpus location to model width.
// Saved as train_config.json next to the checkpoints so a run can
// be inspected or resumed with the same settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    // Inputs / outputs
    pub corpus_path:    String,
    pub image_root:     String,
    pub checkpoint_dir: String,
    pub graph_path:     Option<String>,
    pub image_dump_dir: Option<String>,
    pub resume:         bool,

    // Modality flags
    pub include_image:  bool,
    pub include_text:   bool,
    pub only_text:      bool,
    pub bert:           bool,
    pub bert_tokenizer: Option<String>,

    // Dataset construction
    pub filter_ambiguous: bool,
    pub ambiguous_label:  String,
    pub meme_only:        bool,
    pub purge_corrupt:    bool,
    pub augment:          bool,
    pub translator_url:   Option<String>,
    pub translator_key:   Option<String>,
    pub translator_timeout_secs: u64,
    pub pivot_lang:       String,
    pub return_lang:      String,

    // Split / sampling
    pub test_fraction:  f64,
    pub eval_augmented: bool,
    pub balanced_eval:  bool,

    // Training loop
    pub batch_size:     usize,
    pub epochs:         usize,
    pub lr:             f64,
    pub eval_every:     usize,
    pub decode_policy:  DecodePolicy,
    pub max_restarts:   usize,
    pub show_matrix:    bool,
    pub show_metrics:   bool,
    pub seed:           u64,

    // Model
    pub image_features: usize,
    pub text_features:  usize,
    pub embed_dim:      usize,
    pub d_model:        usize,
    pub num_heads:      usize,
    pub num_layers:     usize,
    pub d_ff:           usize,
    pub dropout:        f64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            corpus_path:    "data/corpus.json".to_string(),
            image_root:     "data/images".to_string(),
            checkpoint_dir: "checkpoints".to_string(),
            graph_path:     None,
            image_dump_dir: None,
            resume:         false,

            include_image:  true,
            include_text:   false,
            only_text:      false,
            bert:           false,
            bert_tokenizer: None,

            filter_ambiguous: true,
            ambiguous_label:  DEFAULT_AMBIGUOUS_LABEL.to_string(),
            meme_only:        false,
            purge_corrupt:    false,
            augment:          false,
            translator_url:   None,
            translator_key:   None,
            translator_timeout_secs: 10,
            pivot_lang:       "es".to_string(),
            return_lang:      "en".to_string(),

            test_fraction:  0.2,
            eval_augmented: false,
            balanced_eval:  false,

            batch_size:     64,
            epochs:         10,
            lr:             1e-3,
            eval_every:     50,
            decode_policy:  DecodePolicy::Skip,
            max_restarts:   3,
            show_matrix:    false,
            show_metrics:   false,
            seed:           42,

            image_features: 64,
            text_features:  64,
            embed_dim:      64,
            d_model:        64,
            num_heads:      4,
            num_layers:     2,
            d_ff:           128,
            dropout:        0.2,
        }
    }
}

impl TrainConfig {
    /// Input combination selected by the modality flags.
    pub fn modality(&self) -> Result<Modality, ConfigError> {
        Modality::from_flags(self.include_text, self.only_text, self.bert, self.include_image)
    }

    /// Reject contradictory or unusable settings before any work starts.
    pub fn validate(&self) -> Result<Modality, ConfigError> {
        let modality = self.modality()?;

        if !(0.0..1.0).contains(&self.test_fraction) {
            return Err(ConfigError::InvalidFraction { name: "test_fraction", value: self.test_fraction });
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(ConfigError::InvalidFraction { name: "dropout", value: self.dropout });
        }
        for (name, value) in [
            ("batch_size", self.batch_size),
            ("epochs", self.epochs),
            ("eval_every", self.eval_every),
        ] {
            if value == 0 {
                return Err(ConfigError::Zero(name));
            }
        }
        if modality.uses_bert() && self.bert_tokenizer.is_none() {
            return Err(ConfigError::MissingBertTokenizer(modality.to_string()));
        }
        if self.augment && self.translator_url.is_none() {
            return Err(ConfigError::MissingTranslator);
        }
        Ok(modality)
    }

    fn builder_config(&self, modality: Modality) -> BuilderConfig {
        BuilderConfig {
            image_root:       PathBuf::from(&self.image_root),
            filter_ambiguous: self.filter_ambiguous,
            ambiguous_label:  self.ambiguous_label.clone(),
            emit_image:       modality.uses_image(),
            emit_bert:        modality.uses_bert(),
            augment:          self.augment,
            meme_only:        self.meme_only,
            purge_corrupt:    self.purge_corrupt,
            seed:             self.seed,
            augment_config:   AugmentConfig {
                pivot_lang:  self.pivot_lang.clone(),
                return_lang: self.return_lang.clone(),
            },
        }
    }

    fn trainer_config(&self) -> TrainerConfig {
        TrainerConfig {
            epochs:           self.epochs,
            learning_rate:    self.lr,
            batch_size:       self.batch_size,
            eval_every:       self.eval_every,
            decode_policy:    self.decode_policy,
            purge_corrupt:    self.purge_corrupt,
            max_restarts:     self.max_restarts,
            show_matrix:      self.show_matrix,
            show_metrics:     self.show_metrics,
            image_dump_dir:   self.image_dump_dir.as_ref().map(PathBuf::from),
            seed:             self.seed,
            ..TrainerConfig::default()
        }
    }

    fn model_config(&self, modality: Modality, data: &PreparedData) -> MemeClassifierConfig {
        let cfg = MemeClassifierConfig::new(modality, data.vocab_bound)
            .with_image_features(self.image_features)
            .with_text_features(self.text_features)
            .with_embed_dim(self.embed_dim)
            .with_d_model(self.d_model)
            .with_num_heads(self.num_heads)
            .with_num_layers(self.num_layers)
            .with_d_ff(self.d_ff)
            .with_dropout(self.dropout);
        match data.bert_vocab_size {
            Some(size) => cfg.with_bert_vocab_size(size),
            None       => cfg,
        }
    }
}

// ─── Shared dataset preparation ──────────────────────────────────────────────

/// Dataset plus what the model needs to know about it.
pub struct PreparedData {
    pub dataset:         MemeDataset,
    pub report:          BuildReport,
    /// Embedding rows for the corpus vocabulary.
    pub vocab_bound:     usize,
    pub bert_vocab_size: Option<usize>,
}

/// Steps 2–5: corpus → vocabulary → collaborators → dataset.
pub fn prepare_data(cfg: &TrainConfig, modality: Modality) -> Result<PreparedData> {
    // ── Step 2: Load the corpus record ───────────────────────────────────────
    let corpus = CorpusLoader::new(&cfg.corpus_path)
        .load()
        .with_context(|| format!("Cannot load corpus '{}'", cfg.corpus_path))?;

    // ── Step 3: Vocabulary with <pad> reserved ───────────────────────────────
    let vocab = Vocabulary::from_entries(corpus.vocab.iter().map(|(t, &id)| (t.clone(), id)))
        .context("Corpus vocabulary is invalid")?;
    tracing::info!("Vocabulary: {} entries, id bound {}", vocab.len(), vocab.id_bound());

    // ── Step 4: BERT tokenizer and translator, only when needed ──────────────
    let bert = match (&cfg.bert_tokenizer, modality.uses_bert()) {
        (Some(path), true) => Some(BertTokenizer::from_file(Path::new(path))?),
        _                  => None,
    };
    let translator = match (&cfg.translator_url, cfg.augment) {
        (Some(url), true) => Some(HttpTranslator::new(
            url,
            cfg.translator_key.clone(),
            Duration::from_secs(cfg.translator_timeout_secs),
        )?),
        _ => None,
    };

    // ── Step 5: Build the dataset ────────────────────────────────────────────
    let mut builder = DatasetBuilder::new(cfg.builder_config(modality), &vocab);
    if let Some(bert) = &bert {
        builder = builder.with_bert(bert);
    }
    if let Some(translator) = &translator {
        tracing::info!("Back-translation through '{}'", translator.endpoint());
        builder = builder.with_translator(translator);
    }
    let (dataset, report) = builder.build(&corpus).context("Dataset construction failed")?;

    Ok(PreparedData {
        dataset,
        report,
        vocab_bound:     vocab.id_bound(),
        bert_vocab_size: bert.as_ref().map(BertTokenizer::vocab_size),
    })
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
// Owns the config and runs the full training pipeline.
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Execute the full training pipeline end to end
    pub fn execute(&self) -> Result<TrainSummary> {
        let cfg = &self.config;

        // ── Step 1: Validate flags before touching the disk ──────────────────
        let modality = cfg.validate()?;
        tracing::info!("Modality: {}", modality);

        // ── Steps 2–5 ────────────────────────────────────────────────────────
        let data = prepare_data(cfg, modality)?;

        // ── Step 6: Group-aware train/test split ─────────────────────────────
        let mut rng = StdRng::seed_from_u64(cfg.seed);
        let indices = split_indices(data.dataset.samples(), cfg.test_fraction, cfg.eval_augmented, &mut rng);
        tracing::info!("Split: {} train, {} test", indices.train.len(), indices.test.len());
        let split = SplitHandle::new(indices, &data.dataset.labels(), cfg.balanced_eval)
            .context("Cannot build the balanced sampler")?;

        // ── Step 7: Persist configs next to the checkpoints ──────────────────
        let ckpt_manager = CheckpointManager::new(&cfg.checkpoint_dir)?;
        ckpt_manager.save_config(cfg)?;

        let model_cfg = cfg.model_config(modality, &data);
        let model_cfg_path = ckpt_manager.dir().join("model_config.json");
        model_cfg
            .save(&model_cfg_path)
            .with_context(|| format!("Cannot write '{}'", model_cfg_path.display()))?;

        // ── Step 8: Fresh model, or the last finished epoch ──────────────────
        let device = burn::backend::wgpu::WgpuDevice::default();
        tracing::info!("Using WGPU device: {:?}", device);

        let model: MemeClassifier<MyBackend> = model_cfg.init(&device);
        let (model, progress) = if cfg.resume {
            let (model, progress) = ckpt_manager
                .load_model::<MyBackend, _>(model, &device)
                .context("Cannot resume training")?;
            (model, Some(progress))
        } else {
            (model, None)
        };

        tracing::info!("Optimizer: Adam (lr={})", cfg.lr);
        let optim = AdamConfig::new().init();

        // ── Step 9: Train ────────────────────────────────────────────────────
        let mut trainer = Trainer::<MyBackend, _, _>::new(model, optim, cfg.trainer_config(), device)
            .with_sink(Box::new(CsvScalarSink::new(&cfg.checkpoint_dir)?))
            .with_metrics_log(MetricsLogger::new(&cfg.checkpoint_dir)?)
            .with_checkpoints(ckpt_manager);
        if let Some(progress) = progress {
            trainer.resume(progress);
        }

        let summary = trainer.fit(&data.dataset, &split)?;

        let final_path = Path::new(&cfg.checkpoint_dir).join("model_final");
        trainer.save_model(&final_path)?;
        tracing::info!("Final model saved to '{}'", final_path.display());

        if let Some(graph) = &cfg.graph_path {
            trainer.export_graph(Path::new(graph))?;
        }

        Ok(summary)
    }
}
