use async_trait::async_trait;

use crate::error::VectorResult;
use crate::models::EmbeddingModel;

/// Turns text into fixed-length vectors
///
/// Implementations own their retry policy; errors reaching the caller are final.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Model producing the vectors
    fn model(&self) -> EmbeddingModel;

    /// Length of every vector this provider returns
    fn dimension(&self) -> usize {
        self.model().dimension() as usize
    }

    /// One vector per input, in input order
    async fn embed_texts(&self, texts: &[String]) -> VectorResult<Vec<Vec<f32>>>;

    /// Vector for a search query
    async fn embed_query(&self, query: &str) -> VectorResult<Vec<f32>>;
}
