use thiserror::Error;

/// Errors raised while building a [`Vocabulary`](super::vocab::Vocabulary).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VocabError {
    #[error("token '{token}' collides with reserved id {id} ('<pad>')")]
    ReservedIdCollision { token: String, id: u32 },

    #[error("tokens '{first}' and '{second}' share id {id}")]
    DuplicateId { id: u32, first: String, second: String },

    #[error("id {0} is not in the vocabulary")]
    UnknownId(u32),
}

/// Configuration contradictions caught at construction time.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("contradictory modality flags: {0}")]
    ContradictoryModality(String),

    #[error("{name} must be in [0, 1), got {value}")]
    InvalidFraction { name: &'static str, value: f64 },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("modality {0} needs a BERT tokenizer file (--bert-tokenizer)")]
    MissingBertTokenizer(String),

    #[error("augmentation needs a translation endpoint (--translator-url)")]
    MissingTranslator,
}
