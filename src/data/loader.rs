// ============================================================
// Layer 4 — Corpus Loader
// ============================================================
// Reads the labelled corpus record from a JSON file and checks
// that its parallel columns line up before anything else runs.
//
// The images themselves are NOT read here. The dataset builder
// resolves and decodes them row by row.

use std::{fs, path::PathBuf};

use crate::data::error::{DatasetError, DatasetResult};
use crate::domain::corpus::CorpusRecord;

/// Loads a `CorpusRecord` from disk.
pub struct CorpusLoader {
    /// Path to the corpus JSON file
    path: PathBuf,
}

impl CorpusLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Parse the corpus file and validate column alignment.
    pub fn load(&self) -> DatasetResult<CorpusRecord> {
        let bytes = fs::read(&self.path).map_err(|source| DatasetError::Io {
            path: self.path.clone(),
            source,
        })?;

        let record: CorpusRecord =
            serde_json::from_slice(&bytes).map_err(|source| DatasetError::Json {
                path: self.path.clone(),
                source,
            })?;

        if record.aligned_len().is_none() {
            return Err(DatasetError::MisalignedColumns {
                img_ids: record.images.img_ids.len(),
                texts:   record.images.texts.len(),
                targets: record.images.targets.len(),
            });
        }

        tracing::info!(
            "Loaded corpus '{}': {} records, {} vocabulary entries, {} target names",
            self.path.display(),
            record.images.img_ids.len(),
            record.vocab.len(),
            record.targets_names.len(),
        );
        Ok(record)
    }
}
