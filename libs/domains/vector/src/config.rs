use std::path::PathBuf;
use std::sync::Arc;

use core_config::{ConfigError, FromEnv, env_or_default};
use tracing::info;

use crate::error::VectorResult;
use crate::file::FileVectorStore;
use crate::models::StoreBackend;
use crate::qdrant::{QdrantConfig, QdrantVectorStore};
use crate::store::VectorStore;

pub const DEFAULT_FILE_PATH: &str = "data/vectors.csv";
pub const DEFAULT_COLLECTION: &str = "documents";

/// Which store to open, with its connection settings
#[derive(Clone, Debug, PartialEq)]
pub enum BackendConfig {
    File { path: PathBuf },
    Qdrant(QdrantConfig),
}

impl BackendConfig {
    pub fn backend(&self) -> StoreBackend {
        match self {
            BackendConfig::File { .. } => StoreBackend::File,
            BackendConfig::Qdrant(_) => StoreBackend::Qdrant,
        }
    }

    /// Opens the configured store. The collection is not set up yet.
    pub async fn connect(&self) -> VectorResult<Arc<dyn VectorStore>> {
        let store: Arc<dyn VectorStore> = match self {
            BackendConfig::File { path } => Arc::new(FileVectorStore::open(path).await?),
            BackendConfig::Qdrant(config) => Arc::new(QdrantVectorStore::new(config.clone())?),
        };
        info!(backend = store.backend().as_str(), "Vector store opened");
        Ok(store)
    }
}

impl FromEnv for BackendConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let raw = env_or_default("VECTOR_BACKEND", StoreBackend::File.as_str());
        let backend = raw
            .parse::<StoreBackend>()
            .map_err(|_| ConfigError::UnsupportedValue {
                key: "VECTOR_BACKEND".to_string(),
                value: raw.clone(),
                expected: "file, qdrant".to_string(),
            })?;

        Ok(match backend {
            StoreBackend::File => BackendConfig::File {
                path: PathBuf::from(env_or_default("VECTOR_FILE_PATH", DEFAULT_FILE_PATH)),
            },
            StoreBackend::Qdrant => BackendConfig::Qdrant(QdrantConfig::from_env()?),
        })
    }
}

/// Retriever settings: the collection name and the backing store
#[derive(Clone, Debug, PartialEq)]
pub struct RetrieverConfig {
    pub collection_name: String,
    pub backend: BackendConfig,
}

impl RetrieverConfig {
    pub fn new(collection_name: impl Into<String>, backend: BackendConfig) -> Self {
        Self {
            collection_name: collection_name.into(),
            backend,
        }
    }
}

impl FromEnv for RetrieverConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            collection_name: env_or_default("VECTOR_COLLECTION", DEFAULT_COLLECTION),
            backend: BackendConfig::from_env()?,
        })
    }
}
