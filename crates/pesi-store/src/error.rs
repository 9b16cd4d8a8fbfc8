use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt checkpoint partition {path}: {source}")]
    CorruptPartition {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("checkpoint partition {path} belongs to district {found}, expected {expected}")]
    PartitionMismatch {
        path: PathBuf,
        expected: String,
        found: String,
    },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl StoreError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
