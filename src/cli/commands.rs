// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands, `train` and `inspect`, and all
// their configurable flags. Both share the dataset flags through
// a flattened `DataArgs`.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};

use crate::application::train_use_case::TrainConfig;
use crate::ml::trainer::DecodePolicy;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build the dataset and train a classifier
    Train(TrainArgs),

    /// Build the dataset only and report what was admitted or skipped
    Inspect(InspectArgs),
}

/// Corpus location, modality flags and dataset construction options.
#[derive(Args, Debug, Clone)]
pub struct DataArgs {
    /// JSON corpus record (vocab, images.{img_ids,texts,targets}, targets_names)
    #[arg(long, default_value = "data/corpus.json")]
    pub corpus: String,

    /// Root directory holding <LabelName>/img_<id>.jpg files
    #[arg(long, default_value = "data/images")]
    pub image_root: String,

    /// Feed images to the model
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub include_image: bool,

    /// Add the token-id text branch next to the image branch
    #[arg(long)]
    pub include_text: bool,

    /// Token-id text only; turns the image branch off
    #[arg(long)]
    pub only_text: bool,

    /// Use the BERT-style encoder for text
    #[arg(long)]
    pub bert: bool,

    /// HuggingFace tokenizer.json for the BERT encoding
    #[arg(long)]
    pub bert_tokenizer: Option<String>,

    /// Keep records whose label is the ambiguous one
    #[arg(long)]
    pub keep_ambiguous: bool,

    /// Name of the ambiguous label in targets_names
    #[arg(long, default_value = "Dudoso")]
    pub ambiguous_label: String,

    /// Treat code 4 as Meme instead of Sticker
    #[arg(long)]
    pub meme_only: bool,

    /// Delete images that exist but cannot be decoded
    #[arg(long)]
    pub purge_corrupt: bool,

    /// Add one back-translated copy per eligible sample
    #[arg(long)]
    pub augment: bool,

    /// Base URL of a LibreTranslate-compatible service
    #[arg(long)]
    pub translator_url: Option<String>,

    /// API key for the translation service
    #[arg(long)]
    pub translator_key: Option<String>,

    /// Language of the first translation hop
    #[arg(long, default_value = "es")]
    pub pivot_lang: String,

    /// Language of the second hop when the first one changed nothing
    #[arg(long, default_value = "en")]
    pub return_lang: String,

    /// Seed for augmentation, split and sampling
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

/// All arguments for the `train` command.
#[derive(Args, Debug)]
pub struct TrainArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Directory for checkpoints, metrics.csv and scalars.csv
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Continue from the last epoch saved in --checkpoint-dir
    #[arg(long)]
    pub resume: bool,

    /// Fraction of original samples held out for testing
    #[arg(long, default_value_t = 0.2)]
    pub test_fraction: f64,

    /// Keep augmented copies of test samples in the test split
    #[arg(long)]
    pub eval_augmented: bool,

    /// Draw evaluation batches with class-balanced weights
    #[arg(long)]
    pub balanced_eval: bool,

    #[arg(long, default_value_t = 64)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 10)]
    pub epochs: usize,

    /// Adam learning rate
    #[arg(long, default_value_t = 1e-3)]
    pub lr: f64,

    /// Evaluate on the test split every N training steps
    #[arg(long, default_value_t = 50)]
    pub eval_every: usize,

    /// What to do with a batch whose image cannot be decoded: skip or restart
    #[arg(long, default_value = "skip")]
    pub decode_policy: DecodePolicy,

    /// Upper bound on restarts under --decode-policy restart
    #[arg(long, default_value_t = 3)]
    pub max_restarts: usize,

    /// Log the confusion matrix at every evaluation
    #[arg(long)]
    pub show_matrix: bool,

    /// Log per-class precision / recall / F1 at every evaluation
    #[arg(long)]
    pub show_metrics: bool,

    /// Save denormalised evaluation images named with true/predicted class
    #[arg(long)]
    pub image_dump_dir: Option<String>,

    /// Write a Graphviz description of the model here after training
    #[arg(long)]
    pub graph: Option<String>,

    #[arg(long, default_value_t = 64)]
    pub image_features: usize,

    #[arg(long, default_value_t = 64)]
    pub text_features: usize,

    /// Width of the token-id embedding
    #[arg(long, default_value_t = 64)]
    pub embed_dim: usize,

    /// Hidden size of the BERT-style encoder (divisible by --num-heads)
    #[arg(long, default_value_t = 64)]
    pub d_model: usize,

    #[arg(long, default_value_t = 4)]
    pub num_heads: usize,

    #[arg(long, default_value_t = 2)]
    pub num_layers: usize,

    #[arg(long, default_value_t = 128)]
    pub d_ff: usize,

    #[arg(long, default_value_t = 0.2)]
    pub dropout: f64,
}

/// All arguments for the `inspect` command
#[derive(Args, Debug)]
pub struct InspectArgs {
    #[command(flatten)]
    pub data: DataArgs,
}

impl DataArgs {
    /// Fill the dataset half of a TrainConfig.
    fn apply(self, cfg: TrainConfig) -> TrainConfig {
        TrainConfig {
            corpus_path:      self.corpus,
            image_root:       self.image_root,
            include_image:    self.include_image && !self.only_text,
            include_text:     self.include_text,
            only_text:        self.only_text,
            bert:             self.bert,
            bert_tokenizer:   self.bert_tokenizer,
            filter_ambiguous: !self.keep_ambiguous,
            ambiguous_label:  self.ambiguous_label,
            meme_only:        self.meme_only,
            purge_corrupt:    self.purge_corrupt,
            augment:          self.augment,
            translator_url:   self.translator_url,
            translator_key:   self.translator_key,
            pivot_lang:       self.pivot_lang,
            return_lang:      self.return_lang,
            seed:             self.seed,
            ..cfg
        }
    }
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// This is the boundary between Layer 1 and Layer 2:
/// the application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        let cfg = TrainConfig {
            checkpoint_dir: a.checkpoint_dir,
            resume:         a.resume,
            test_fraction:  a.test_fraction,
            eval_augmented: a.eval_augmented,
            balanced_eval:  a.balanced_eval,
            batch_size:     a.batch_size,
            epochs:         a.epochs,
            lr:             a.lr,
            eval_every:     a.eval_every,
            decode_policy:  a.decode_policy,
            max_restarts:   a.max_restarts,
            show_matrix:    a.show_matrix,
            show_metrics:   a.show_metrics,
            image_dump_dir: a.image_dump_dir,
            graph_path:     a.graph,
            image_features: a.image_features,
            text_features:  a.text_features,
            embed_dim:      a.embed_dim,
            d_model:        a.d_model,
            num_heads:      a.num_heads,
            num_layers:     a.num_layers,
            d_ff:           a.d_ff,
            dropout:        a.dropout,
            ..TrainConfig::default()
        };
        a.data.apply(cfg)
    }
}

impl From<InspectArgs> for TrainConfig {
    fn from(a: InspectArgs) -> Self {
        a.data.apply(TrainConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    fn parse(args: &[&str]) -> Commands {
        Cli::try_parse_from(args).unwrap().command
    }

    #[test]
    fn test_train_flags_reach_the_config() {
        let Commands::Train(args) = parse(&[
            "meme-classifier", "train",
            "--include-text", "--keep-ambiguous",
            "--decode-policy", "restart",
            "--eval-every", "5",
        ]) else {
            panic!("expected train");
        };
        let cfg = TrainConfig::from(args);

        assert!(cfg.include_text);
        assert!(!cfg.filter_ambiguous);
        assert_eq!(cfg.decode_policy, DecodePolicy::Restart);
        assert_eq!(cfg.eval_every, 5);
        assert_eq!(cfg.modality().unwrap().to_string(), "image+text");
    }

    #[test]
    fn test_only_text_switches_image_off() {
        let Commands::Inspect(args) = parse(&["meme-classifier", "inspect", "--only-text"]) else {
            panic!("expected inspect");
        };
        let cfg = TrainConfig::from(args);
        assert!(!cfg.include_image);
        assert_eq!(cfg.modality().unwrap().to_string(), "text");

        let Commands::Inspect(args) = parse(&[
            "meme-classifier", "inspect", "--only-text", "--include-image", "false",
        ]) else {
            panic!("expected inspect");
        };
        assert_eq!(TrainConfig::from(args).modality().unwrap().to_string(), "text");
    }

    #[test]
    fn test_only_text_with_include_text_is_still_contradictory() {
        let Commands::Inspect(args) = parse(&[
            "meme-classifier", "inspect", "--only-text", "--include-text",
        ]) else {
            panic!("expected inspect");
        };
        assert!(TrainConfig::from(args).modality().is_err());
    }

    #[test]
    fn test_unknown_decode_policy_is_refused() {
        assert!(Cli::try_parse_from(["meme-classifier", "train", "--decode-policy", "retry"]).is_err());
    }
}
