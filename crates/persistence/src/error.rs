use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the stores and backends.
///
/// The synchronization layer never rolls the view back on these: a failed
/// write is logged and the optimistic state stays.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Invalid document path: {0:?}")]
    InvalidPath(String),

    #[error("Failed to {action} {}: {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl PersistenceError {
    pub(crate) fn io(
        action: &'static str,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        PersistenceError::Io {
            action,
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, PersistenceError>;
