use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid date: {0}")]
    InvalidDate(String),

    #[error("failed to load district registry {path}: {reason}")]
    RegistryLoad { path: PathBuf, reason: String },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl CoreError {
    pub(crate) fn registry(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::RegistryLoad {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
