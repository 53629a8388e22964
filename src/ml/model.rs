// ============================================================
// Layer 5 — Meme Classifier Model
// ============================================================
// Late-fusion classifier. Each enabled modality has its own
// branch producing a feature vector; the vectors are
// concatenated and a single linear head scores the 3 classes.
//
//   image  [B,3,56,56] ─► ImageCnn ─────┐
//   tokens [B,L]       ─► TextEncoder ──┼─► concat ─► Linear ─► [B,3]
//   bert   [B,16]+mask ─► BertEncoder ──┘
//
// Which branches exist is fixed by the Modality at init time.
// A call whose input lacks a branch's tensor is refused with
// TrainError::MissingModality instead of panicking.

use burn::{
    module::Ignored,
    nn::{
        attention::{MhaInput, MultiHeadAttention, MultiHeadAttentionConfig},
        conv::{Conv2d, Conv2dConfig},
        pool::{MaxPool2d, MaxPool2dConfig},
        Dropout, DropoutConfig,
        Embedding, EmbeddingConfig,
        LayerNorm, LayerNormConfig,
        Linear, LinearConfig,
        PaddingConfig2d,
    },
    prelude::*,
    tensor::activation::{gelu, relu},
};

use crate::data::batcher::MemeBatch;
use crate::domain::class::NUM_CLASSES;
use crate::domain::modality::Modality;
use crate::domain::sample::{BERT_MAX_LEN, IMAGE_SIZE};
use crate::ml::error::TrainError;

// Spatial size after the two 2×2 pools.
const CNN_OUT_SIDE: usize = IMAGE_SIZE / 4;
const CNN_OUT_CHANNELS: usize = 20;
const CNN_FLAT: usize = CNN_OUT_CHANNELS * CNN_OUT_SIDE * CNN_OUT_SIDE;

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
// internally; do NOT add them again or you get conflicting impls.
#[derive(Config, Debug)]
pub struct MemeClassifierConfig {
    pub modality:   Modality,
    /// Embedding rows for the word vocabulary (max id + 1).
    pub vocab_size: usize,
    #[config(default = 512)]
    pub image_hidden:    usize,
    #[config(default = 64)]
    pub image_features:  usize,
    #[config(default = 64)]
    pub embed_dim:       usize,
    #[config(default = 64)]
    pub text_features:   usize,
    #[config(default = 30522)]
    pub bert_vocab_size: usize,
    #[config(default = 64)]
    pub d_model:         usize,
    #[config(default = 4)]
    pub num_heads:       usize,
    #[config(default = 2)]
    pub num_layers:      usize,
    #[config(default = 128)]
    pub d_ff:            usize,
    #[config(default = 0.2)]
    pub dropout:         f64,
}

impl MemeClassifierConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> MemeClassifier<B> {
        let modality = self.modality;

        let image = modality.uses_image().then(|| self.build_cnn(device));
        let text  = modality.uses_tokens().then(|| self.build_text(device));
        let bert  = modality.uses_bert().then(|| self.build_bert(device));

        let fused = image.as_ref().map_or(0, |_| self.image_features)
            + if text.is_some() || bert.is_some() { self.text_features } else { 0 };
        let head = LinearConfig::new(fused, NUM_CLASSES).init(device);

        MemeClassifier { image, text, bert, head, modality: Ignored(modality) }
    }

    fn build_cnn<B: Backend>(&self, device: &B::Device) -> ImageCnn<B> {
        let conv = |c_in, c_out| {
            Conv2dConfig::new([c_in, c_out], [3, 3])
                .with_padding(PaddingConfig2d::Explicit(1, 1))
                .init(device)
        };
        ImageCnn {
            conv1:   conv(3, 10),
            conv2:   conv(10, CNN_OUT_CHANNELS),
            pool:    MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init(),
            fc1:     LinearConfig::new(CNN_FLAT, self.image_hidden).init(device),
            fc2:     LinearConfig::new(self.image_hidden, self.image_features).init(device),
            dropout: DropoutConfig::new(self.dropout).init(),
        }
    }

    fn build_text<B: Backend>(&self, device: &B::Device) -> TextEncoder<B> {
        TextEncoder {
            embedding: EmbeddingConfig::new(self.vocab_size, self.embed_dim).init(device),
            proj:      LinearConfig::new(self.embed_dim, self.text_features).init(device),
        }
    }

    fn build_bert<B: Backend>(&self, device: &B::Device) -> BertEncoder<B> {
        let token_embedding    = EmbeddingConfig::new(self.bert_vocab_size, self.d_model).init(device);
        let position_embedding = EmbeddingConfig::new(BERT_MAX_LEN, self.d_model).init(device);
        let layers: Vec<EncoderBlock<B>> = (0..self.num_layers)
            .map(|_| self.build_encoder_block(device))
            .collect();
        let final_norm = LayerNormConfig::new(self.d_model).init(device);
        let proj       = LinearConfig::new(self.d_model, self.text_features).init(device);
        let dropout    = DropoutConfig::new(self.dropout).init();
        BertEncoder { token_embedding, position_embedding, layers, final_norm, proj, dropout }
    }

    fn build_encoder_block<B: Backend>(&self, device: &B::Device) -> EncoderBlock<B> {
        let self_attn   = MultiHeadAttentionConfig::new(self.d_model, self.num_heads)
            .with_dropout(self.dropout)
            .init(device);
        let ffn_linear1 = LinearConfig::new(self.d_model, self.d_ff).init(device);
        let ffn_linear2 = LinearConfig::new(self.d_ff, self.d_model).init(device);
        let norm1   = LayerNormConfig::new(self.d_model).init(device);
        let norm2   = LayerNormConfig::new(self.d_model).init(device);
        let dropout = DropoutConfig::new(self.dropout).init();
        EncoderBlock { self_attn, ffn_linear1, ffn_linear2, norm1, norm2, dropout }
    }
}

// ─── Image branch ─────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct ImageCnn<B: Backend> {
    pub conv1:   Conv2d<B>,
    pub conv2:   Conv2d<B>,
    pub pool:    MaxPool2d,
    pub fc1:     Linear<B>,
    pub fc2:     Linear<B>,
    pub dropout: Dropout,
}

impl<B: Backend> ImageCnn<B> {
    /// [batch, 3, 56, 56] → [batch, image_features]
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let [batch_size, _, _, _] = images.dims();

        let x = relu(self.pool.forward(self.conv1.forward(images)));
        let x = relu(self.pool.forward(self.dropout.forward(self.conv2.forward(x))));
        let x = x.reshape([batch_size, CNN_FLAT]);

        let x = self.dropout.forward(relu(self.fc1.forward(x)));
        self.fc2.forward(x)
    }
}

// ─── Token-id text branch ─────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct TextEncoder<B: Backend> {
    pub embedding: Embedding<B>,
    pub proj:      Linear<B>,
}

impl<B: Backend> TextEncoder<B> {
    /// [batch, seq_len] → [batch, text_features], max-pooled over time.
    pub fn forward(&self, tokens: Tensor<B, 2, Int>) -> Tensor<B, 2> {
        let [batch_size, _] = tokens.dims();
        let emb = self.embedding.forward(tokens); // [batch, seq_len, embed_dim]
        let [_, _, embed_dim] = emb.dims();
        let pooled = emb.max_dim(1).reshape([batch_size, embed_dim]);
        self.proj.forward(pooled)
    }
}

// ─── BERT-style text branch ───────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct EncoderBlock<B: Backend> {
    pub self_attn:   MultiHeadAttention<B>,
    pub ffn_linear1: Linear<B>,
    pub ffn_linear2: Linear<B>,
    pub norm1:       LayerNorm<B>,
    pub norm2:       LayerNorm<B>,
    pub dropout:     Dropout,
}

impl<B: Backend> EncoderBlock<B> {
    /// `pad_mask` is true on padding positions.
    pub fn forward(&self, x: Tensor<B, 3>, pad_mask: Tensor<B, 2, Bool>) -> Tensor<B, 3> {
        let attn_output = self
            .self_attn
            .forward(MhaInput::self_attn(x.clone()).mask_pad(pad_mask))
            .context;
        let x = self.norm1.forward(x + self.dropout.forward(attn_output));
        let ffn_out = self.ffn_linear2.forward(gelu(self.ffn_linear1.forward(x.clone())));
        self.norm2.forward(x + self.dropout.forward(ffn_out))
    }
}

#[derive(Module, Debug)]
pub struct BertEncoder<B: Backend> {
    pub token_embedding:    Embedding<B>,
    pub position_embedding: Embedding<B>,
    pub layers:             Vec<EncoderBlock<B>>,
    pub final_norm:         LayerNorm<B>,
    pub proj:               Linear<B>,
    pub dropout:            Dropout,
}

impl<B: Backend> BertEncoder<B> {
    /// ids, mask: [batch, 16] → [batch, text_features] from the [CLS] position.
    pub fn forward(&self, ids: Tensor<B, 2, Int>, mask: Tensor<B, 2, Int>) -> Tensor<B, 2> {
        let [batch_size, seq_len] = ids.dims();

        let tok_emb = self.token_embedding.forward(ids);
        let positions = Tensor::<B, 1, Int>::arange(0..seq_len as i64, &tok_emb.device())
            .unsqueeze::<2>()
            .expand([batch_size, seq_len]);
        let pos_emb = self.position_embedding.forward(positions);

        let pad_mask = mask.equal_elem(0);
        let mut x = self.dropout.forward(tok_emb + pos_emb);
        for layer in &self.layers {
            x = layer.forward(x, pad_mask.clone());
        }
        let x = self.final_norm.forward(x); // [batch, seq_len, d_model]
        let [_, _, d_model] = x.dims();

        let cls = x.slice([0..batch_size, 0..1, 0..d_model]).reshape([batch_size, d_model]);
        self.proj.forward(self.dropout.forward(cls))
    }
}

// ─── Model input ──────────────────────────────────────────────────────────────
/// The ordered tensor subset a modality feeds to the model.
#[derive(Debug, Clone)]
pub enum ModalInput<B: Backend> {
    Image(Tensor<B, 4>),
    Text(Tensor<B, 2, Int>),
    ImageText { image: Tensor<B, 4>, tokens: Tensor<B, 2, Int> },
    Bert { ids: Tensor<B, 2, Int>, mask: Tensor<B, 2, Int> },
    ImageBert { image: Tensor<B, 4>, ids: Tensor<B, 2, Int>, mask: Tensor<B, 2, Int> },
}

struct Parts<B: Backend> {
    image:  Option<Tensor<B, 4>>,
    tokens: Option<Tensor<B, 2, Int>>,
    bert:   Option<(Tensor<B, 2, Int>, Tensor<B, 2, Int>)>,
}

impl<B: Backend> ModalInput<B> {
    /// Pick the tensors `modality` needs out of a collated batch.
    pub fn from_batch(batch: &MemeBatch<B>, modality: Modality) -> Result<Self, TrainError> {
        let missing = |what| TrainError::MissingModality { modality, missing: what };
        let image = || batch.images.clone().ok_or_else(|| missing("image"));
        let bert = || match (&batch.bert_ids, &batch.bert_mask) {
            (Some(ids), Some(mask)) => Ok((ids.clone(), mask.clone())),
            _ => Err(missing("BERT encoding")),
        };

        Ok(match modality {
            Modality::Image     => Self::Image(image()?),
            Modality::Text      => Self::Text(batch.tokens.clone()),
            Modality::ImageText => Self::ImageText { image: image()?, tokens: batch.tokens.clone() },
            Modality::Bert => {
                let (ids, mask) = bert()?;
                Self::Bert { ids, mask }
            }
            Modality::ImageBert => {
                let (ids, mask) = bert()?;
                Self::ImageBert { image: image()?, ids, mask }
            }
        })
    }

    /// Image batch, when this input carries one.
    pub fn image(&self) -> Option<&Tensor<B, 4>> {
        match self {
            Self::Image(image)
            | Self::ImageText { image, .. }
            | Self::ImageBert { image, .. } => Some(image),
            _ => None,
        }
    }

    fn into_parts(self) -> Parts<B> {
        match self {
            Self::Image(image) => Parts { image: Some(image), tokens: None, bert: None },
            Self::Text(tokens) => Parts { image: None, tokens: Some(tokens), bert: None },
            Self::ImageText { image, tokens } => Parts { image: Some(image), tokens: Some(tokens), bert: None },
            Self::Bert { ids, mask } => Parts { image: None, tokens: None, bert: Some((ids, mask)) },
            Self::ImageBert { image, ids, mask } => {
                Parts { image: Some(image), tokens: None, bert: Some((ids, mask)) }
            }
        }
    }
}

// ─── Model call contract ──────────────────────────────────────────────────────
/// One branch of a classifier, as reported for graph export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchSummary {
    pub name:     &'static str,
    pub params:   usize,
    pub features: usize,
}

/// What the training loop needs from any model it drives.
pub trait ClassifierForward<B: Backend> {
    fn modality(&self) -> Modality;

    /// Per-class scores, shape [batch, NUM_CLASSES].
    fn classify(&self, input: ModalInput<B>) -> Result<Tensor<B, 2>, TrainError>;

    /// Branches in fusion order followed by the head.
    fn branches(&self) -> Vec<BranchSummary> {
        Vec::new()
    }
}

// ─── MemeClassifier ───────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct MemeClassifier<B: Backend> {
    pub image:    Option<ImageCnn<B>>,
    pub text:     Option<TextEncoder<B>>,
    pub bert:     Option<BertEncoder<B>>,
    pub head:     Linear<B>,
    pub modality: Ignored<Modality>,
}

impl<B: Backend> MemeClassifier<B> {
    fn missing(&self, what: &'static str) -> TrainError {
        TrainError::MissingModality { modality: self.modality.0, missing: what }
    }
}

impl<B: Backend> ClassifierForward<B> for MemeClassifier<B> {
    fn modality(&self) -> Modality {
        self.modality.0
    }

    fn classify(&self, input: ModalInput<B>) -> Result<Tensor<B, 2>, TrainError> {
        let parts = input.into_parts();
        let mut features = Vec::with_capacity(2);

        if let Some(cnn) = &self.image {
            let images = parts.image.ok_or_else(|| self.missing("image"))?;
            features.push(cnn.forward(images));
        }
        if let Some(text) = &self.text {
            let tokens = parts.tokens.ok_or_else(|| self.missing("token-id"))?;
            features.push(text.forward(tokens));
        }
        if let Some(bert) = &self.bert {
            let (ids, mask) = parts.bert.ok_or_else(|| self.missing("BERT encoding"))?;
            features.push(bert.forward(ids, mask));
        }
        if features.is_empty() {
            return Err(self.missing("any"));
        }

        Ok(self.head.forward(Tensor::cat(features, 1)))
    }

    fn branches(&self) -> Vec<BranchSummary> {
        let mut out = Vec::new();
        if let Some(cnn) = &self.image {
            out.push(BranchSummary { name: "ImageCnn", params: cnn.num_params(), features: cnn.fc2.weight.val().dims()[1] });
        }
        if let Some(text) = &self.text {
            out.push(BranchSummary { name: "TextEncoder", params: text.num_params(), features: text.proj.weight.val().dims()[1] });
        }
        if let Some(bert) = &self.bert {
            out.push(BranchSummary { name: "BertEncoder", params: bert.num_params(), features: bert.proj.weight.val().dims()[1] });
        }
        out.push(BranchSummary { name: "Head", params: self.head.num_params(), features: NUM_CLASSES });
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn config(modality: Modality) -> MemeClassifierConfig {
        MemeClassifierConfig::new(modality, 20)
            .with_image_hidden(32)
            .with_image_features(8)
            .with_embed_dim(8)
            .with_text_features(8)
            .with_bert_vocab_size(50)
            .with_d_model(16)
            .with_num_heads(2)
            .with_num_layers(1)
            .with_d_ff(32)
    }

    fn images(batch: usize) -> Tensor<TestBackend, 4> {
        Tensor::zeros([batch, 3, IMAGE_SIZE, IMAGE_SIZE], &Default::default())
    }

    fn tokens(batch: usize, len: usize) -> Tensor<TestBackend, 2, Int> {
        Tensor::<TestBackend, 1, Int>::arange(0..(batch * len) as i64, &Default::default())
            .remainder_scalar(20)
            .reshape([batch, len])
    }

    #[test]
    fn test_image_only_scores_three_classes() {
        let model = config(Modality::Image).init::<TestBackend>(&Default::default());
        let out = model.classify(ModalInput::Image(images(2))).unwrap();
        assert_eq!(out.dims(), [2, NUM_CLASSES]);
        assert!(model.text.is_none() && model.bert.is_none());
    }

    #[test]
    fn test_image_text_fusion() {
        let model = config(Modality::ImageText).init::<TestBackend>(&Default::default());
        let input = ModalInput::ImageText { image: images(3), tokens: tokens(3, 5) };
        assert_eq!(model.classify(input).unwrap().dims(), [3, NUM_CLASSES]);
    }

    #[test]
    fn test_bert_branch_respects_mask_shape() {
        let model = config(Modality::ImageBert).init::<TestBackend>(&Default::default());
        let mask = Tensor::<TestBackend, 2, Int>::ones([2, BERT_MAX_LEN], &Default::default());
        let input = ModalInput::ImageBert { image: images(2), ids: tokens(2, BERT_MAX_LEN), mask };
        assert_eq!(model.classify(input).unwrap().dims(), [2, NUM_CLASSES]);
    }

    #[test]
    fn test_mismatched_input_is_refused() {
        let model = config(Modality::ImageText).init::<TestBackend>(&Default::default());
        let err = model.classify(ModalInput::Text(tokens(1, 3))).unwrap_err();
        assert!(matches!(err, TrainError::MissingModality { missing: "image", .. }));
    }

    #[test]
    fn test_branch_summary_lists_active_branches() {
        let model = config(Modality::Text).init::<TestBackend>(&Default::default());
        let names: Vec<_> = model.branches().iter().map(|b| b.name).collect();
        assert_eq!(names, vec!["TextEncoder", "Head"]);
        assert!(model.branches().iter().all(|b| b.params > 0));
    }
}
