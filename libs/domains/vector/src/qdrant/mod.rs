mod client;
mod config;
mod convert;

pub use client::QdrantVectorStore;
pub use config::{DEFAULT_QDRANT_URL, DEFAULT_TIMEOUT_SECS, QdrantConfig};
