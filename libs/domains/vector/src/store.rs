use async_trait::async_trait;

use crate::error::{VectorError, VectorResult};
use crate::models::{CollectionInfo, NewVector, Payload, ScoredRecord, StoreBackend, VectorRecord};

/// Storage contract shared by every vector backend
///
/// Implementations own one collection at a time, chosen by `setup`.
/// Ids are unique within the collection and inserting an existing id replaces
/// the stored record. Deleting or fetching an unknown id is a no-op.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Backend serving this store
    fn backend(&self) -> StoreBackend;

    /// Create the collection if absent, or verify an existing one.
    ///
    /// Idempotent. A dimension that disagrees with an existing collection is
    /// an `InvalidArgument`.
    async fn setup(
        &self,
        collection_name: &str,
        vector_size: usize,
    ) -> VectorResult<CollectionInfo>;

    /// Insert or replace records, returning their ids in input order.
    ///
    /// Records are durable and searchable once this returns.
    async fn upsert(&self, records: Vec<NewVector>) -> VectorResult<Vec<String>>;

    /// Insert vectors with generated ids.
    async fn add_vectors(
        &self,
        vectors: Vec<Vec<f32>>,
        payloads: Vec<Payload>,
    ) -> VectorResult<Vec<String>> {
        if vectors.len() != payloads.len() {
            return Err(VectorError::InvalidArgument(format!(
                "vectors and payloads must have the same length ({} != {})",
                vectors.len(),
                payloads.len()
            )));
        }

        let records = vectors
            .into_iter()
            .zip(payloads)
            .map(|(values, payload)| NewVector::new(values).with_payload(payload))
            .collect();

        self.upsert(records).await
    }

    /// At most `top_k` records by descending cosine similarity.
    async fn search(&self, query: Vec<f32>, top_k: usize) -> VectorResult<Vec<ScoredRecord>>;

    /// Fetch one record by id.
    async fn get(&self, id: &str) -> VectorResult<Option<VectorRecord>>;

    /// Remove records by id, returning how many were removed (or submitted,
    /// for backends that cannot tell).
    async fn delete(&self, ids: Vec<String>) -> VectorResult<usize>;

    async fn list_all(&self) -> VectorResult<Vec<VectorRecord>>;

    async fn count(&self) -> VectorResult<usize>;
}

/// Checks that every vector is non-empty, finite and `expected` long.
///
/// With no expected dimension the first vector sets it. Returns the dimension
/// the batch agrees on, or `None` for an empty batch.
pub(crate) fn check_dimensions<'a, I>(
    vectors: I,
    expected: Option<usize>,
) -> VectorResult<Option<usize>>
where
    I: IntoIterator<Item = &'a [f32]>,
{
    let mut dimension = expected;

    for (position, vector) in vectors.into_iter().enumerate() {
        if vector.is_empty() {
            return Err(VectorError::InvalidArgument(format!(
                "vector at position {} is empty",
                position
            )));
        }
        if let Some(index) = vector.iter().position(|v| !v.is_finite()) {
            return Err(VectorError::InvalidArgument(format!(
                "vector at position {} has a non-finite component at index {}",
                position, index
            )));
        }

        match dimension {
            Some(dim) if dim != vector.len() => {
                return Err(VectorError::InvalidArgument(format!(
                    "vector at position {} has dimension {}, expected {}",
                    position,
                    vector.len(),
                    dim
                )));
            }
            Some(_) => {}
            None => dimension = Some(vector.len()),
        }
    }

    Ok(dimension)
}

/// Checks a query vector against the collection dimension.
pub(crate) fn check_query(query: &[f32], expected: Option<usize>) -> VectorResult<()> {
    if query.is_empty() {
        return Err(VectorError::InvalidArgument("query vector is empty".to_string()));
    }
    if query.iter().any(|v| !v.is_finite()) {
        return Err(VectorError::InvalidArgument(
            "query vector has non-finite components".to_string(),
        ));
    }

    match expected {
        Some(dim) if dim != query.len() => Err(VectorError::InvalidArgument(format!(
            "query vector has dimension {}, collection expects {}",
            query.len(),
            dim
        ))),
        _ => Ok(()),
    }
}
