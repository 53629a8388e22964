use std::path::PathBuf;

use thiserror::Error;

use crate::domain::error::VocabError;

pub type DatasetResult<T> = Result<T, DatasetError>;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("json parse error at {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("corpus columns are not aligned: {img_ids} ids, {texts} texts, {targets} targets")]
    MisalignedColumns {
        img_ids: usize,
        texts:   usize,
        targets: usize,
    },

    #[error("vocabulary error: {0}")]
    Vocab(#[from] VocabError),

    #[error("tokenizer error: {0}")]
    Tokenizer(String),

    #[error("image decode error at {path}: {source}")]
    ImageDecode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}
