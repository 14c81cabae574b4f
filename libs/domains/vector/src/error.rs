use core_config::ConfigError;
use thiserror::Error;

/// Errors surfaced by stores, embedding providers and the retriever.
///
/// Looking up or deleting an id that is not stored is never an error.
#[derive(Debug, Error)]
pub enum VectorError {
    /// Length or dimensionality mismatch, or an input the backend cannot accept
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Backing file or remote service cannot be reached or initialised
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// A persisted row that cannot be retained at all
    #[error("Malformed record at {location}: {reason}")]
    MalformedRecord { location: String, reason: String },

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type VectorResult<T> = Result<T, VectorError>;

impl VectorError {
    /// True for failures worth retrying with backoff.
    pub fn is_transient(&self) -> bool {
        matches!(self, VectorError::StoreUnavailable(_))
    }
}

impl From<qdrant_client::QdrantError> for VectorError {
    fn from(err: qdrant_client::QdrantError) -> Self {
        VectorError::StoreUnavailable(format!("Qdrant: {}", err))
    }
}

impl From<std::io::Error> for VectorError {
    fn from(err: std::io::Error) -> Self {
        VectorError::StoreUnavailable(err.to_string())
    }
}

impl From<csv::Error> for VectorError {
    fn from(err: csv::Error) -> Self {
        let location = err
            .position()
            .map(|pos| format!("line {}", pos.line()))
            .unwrap_or_else(|| "unknown position".to_string());

        match err.kind() {
            csv::ErrorKind::Io(_) => VectorError::StoreUnavailable(err.to_string()),
            _ => VectorError::MalformedRecord {
                location,
                reason: err.to_string(),
            },
        }
    }
}

impl From<tempfile::PersistError> for VectorError {
    fn from(err: tempfile::PersistError) -> Self {
        VectorError::StoreUnavailable(format!("Failed to replace store file: {}", err.error))
    }
}

impl From<reqwest::Error> for VectorError {
    fn from(err: reqwest::Error) -> Self {
        VectorError::Embedding(err.to_string())
    }
}

impl From<serde_json::Error> for VectorError {
    fn from(err: serde_json::Error) -> Self {
        VectorError::Internal(format!("JSON error: {}", err))
    }
}

impl From<tokio::task::JoinError> for VectorError {
    fn from(err: tokio::task::JoinError) -> Self {
        VectorError::Internal(format!("Blocking task failed: {}", err))
    }
}

impl From<ConfigError> for VectorError {
    fn from(err: ConfigError) -> Self {
        VectorError::Config(err.to_string())
    }
}
