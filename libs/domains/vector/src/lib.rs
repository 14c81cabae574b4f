//! Vector Domain Library
//!
//! Similarity search over embedded documents with interchangeable storage
//! backends: a local CSV file or a Qdrant collection.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │    Retriever    │  ← text in, scored records out
//! └────────┬────────┘
//!          │
//! ┌────────▼────────┐     ┌──────────────────┐
//! │   VectorStore   │     │ EmbeddingProvider│
//! │     (trait)     │     │     (trait)      │
//! └────────┬────────┘     └────────┬─────────┘
//!          │                       │
//! ┌────────▼────────┐     ┌────────▼─────────┐
//! │ FileVectorStore │     │  OpenAIProvider  │
//! │QdrantVectorStore│     └──────────────────┘
//! └─────────────────┘
//! ```
//!
//! # Features
//!
//! - **Two backends**: a single CSV file rewritten atomically, or a remote Qdrant collection
//! - **Vector Operations**: setup, upsert, search, get, delete, list, count
//! - **Cosine similarity**: identical ranking semantics across backends
//! - **Embedding Generation**: OpenAI embeddings with exponential-backoff retry
//!
//! # Usage
//!
//! ```rust,no_run
//! use domain_vector::{OpenAIProvider, Retriever, RetrieverConfig, Payload};
//! use core_config::FromEnv;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = RetrieverConfig::from_env()?;
//! let store = config.backend.connect().await?;
//! let embedder = Arc::new(OpenAIProvider::from_env()?);
//!
//! let retriever = Retriever::new(&config.collection_name, store, embedder).await?;
//! retriever.add_document("Invoices are due in 30 days", Payload::new()).await?;
//!
//! for hit in retriever.retrieve("payment terms", 3).await? {
//!     println!("{:.3} {}", hit.score, hit.content().unwrap_or_default());
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod embedding;
pub mod error;
pub mod file;
pub mod models;
pub mod qdrant;
pub mod retriever;
pub mod similarity;
pub mod store;

// Re-export commonly used types
pub use config::{BackendConfig, RetrieverConfig};
pub use embedding::{EmbeddingProvider, OpenAIConfig, OpenAIProvider, RetryPolicy};
pub use error::{VectorError, VectorResult};
pub use file::FileVectorStore;
pub use models::{
    CONTENT_KEY, CollectionInfo, DistanceMetric, EmbeddingModel, NewVector, Payload,
    ScoredRecord, StoreBackend, VectorRecord,
};
pub use qdrant::{QdrantConfig, QdrantVectorStore};
pub use retriever::Retriever;
pub use similarity::cosine_similarity;
pub use store::VectorStore;
