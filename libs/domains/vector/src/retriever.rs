use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::embedding::EmbeddingProvider;
use crate::error::{VectorError, VectorResult};
use crate::models::{CONTENT_KEY, CollectionInfo, NewVector, Payload, ScoredRecord};
use crate::store::VectorStore;

/// Embeds text and hands the vectors to a [`VectorStore`]
///
/// Holds no data of its own. Construction sets the store's collection up with
/// the embedder's dimension, so stored and query vectors always agree in
/// length. Store and embedding errors are returned unchanged.
pub struct Retriever {
    collection_name: String,
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    collection: CollectionInfo,
}

impl Retriever {
    #[instrument(skip(store, embedder), fields(backend = store.backend().as_str()))]
    pub async fn new(
        collection_name: &str,
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> VectorResult<Self> {
        let collection = store.setup(collection_name, embedder.dimension()).await?;

        info!(
            collection = collection_name,
            dimension = collection.dimension,
            points = collection.points_count,
            created = collection.created,
            "Retriever ready"
        );

        Ok(Self {
            collection_name: collection_name.to_string(),
            store,
            embedder,
            collection,
        })
    }

    pub fn collection_name(&self) -> &str {
        &self.collection_name
    }

    /// Collection state observed at construction
    pub fn collection(&self) -> &CollectionInfo {
        &self.collection
    }

    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    /// Embeds `text` and stores it under a generated id.
    ///
    /// `text` is recorded as the payload's `content` unless the payload
    /// already has one.
    pub async fn add_document(&self, text: &str, payload: Payload) -> VectorResult<Vec<String>> {
        self.add(None, text, payload).await
    }

    /// Like [`Retriever::add_document`] but replaces any record stored under `id`.
    pub async fn add_document_with_id(
        &self,
        id: &str,
        text: &str,
        payload: Payload,
    ) -> VectorResult<Vec<String>> {
        self.add(Some(id.to_string()), text, payload).await
    }

    #[instrument(skip(self, text, payload), fields(collection = %self.collection_name, chars = text.len()))]
    async fn add(
        &self,
        id: Option<String>,
        text: &str,
        payload: Payload,
    ) -> VectorResult<Vec<String>> {
        let vectors = self.embedder.embed_texts(&[text.to_string()]).await?;
        let values = vectors
            .into_iter()
            .next()
            .ok_or_else(|| VectorError::Embedding("No embedding returned".to_string()))?;
        self.check_dimension(&values)?;

        let record = NewVector {
            id,
            values,
            payload: with_content(payload, text),
        };

        let ids = self.store.upsert(vec![record]).await?;
        debug!(?ids, "Document stored");
        Ok(ids)
    }

    /// Embeds and stores several documents in one embedding call and one
    /// store call.
    #[instrument(skip_all, fields(collection = %self.collection_name, count = texts.len()))]
    pub async fn add_documents(
        &self,
        texts: Vec<String>,
        payloads: Vec<Payload>,
    ) -> VectorResult<Vec<String>> {
        if texts.len() != payloads.len() {
            return Err(VectorError::InvalidArgument(format!(
                "texts and payloads must have the same length ({} != {})",
                texts.len(),
                payloads.len()
            )));
        }
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let vectors = self.embedder.embed_texts(&texts).await?;
        if vectors.len() != texts.len() {
            return Err(VectorError::Embedding(format!(
                "expected {} embeddings, received {}",
                texts.len(),
                vectors.len()
            )));
        }

        let records = vectors
            .into_iter()
            .zip(texts.iter().zip(payloads))
            .map(|(values, (text, payload))| {
                self.check_dimension(&values)?;
                Ok(NewVector::new(values).with_payload(with_content(payload, text)))
            })
            .collect::<VectorResult<Vec<_>>>()?;

        self.store.upsert(records).await
    }

    /// Embeds `query` and returns at most `top_k` records, best first.
    #[instrument(skip(self, query), fields(collection = %self.collection_name))]
    pub async fn retrieve(&self, query: &str, top_k: usize) -> VectorResult<Vec<ScoredRecord>> {
        let vector = self.embedder.embed_query(query).await?;
        self.check_dimension(&vector)?;

        let results = self.store.search(vector, top_k).await?;
        debug!(hits = results.len(), "Retrieved");
        Ok(results)
    }

    fn check_dimension(&self, vector: &[f32]) -> VectorResult<()> {
        let expected = self.embedder.dimension();
        if vector.len() != expected {
            return Err(VectorError::InvalidArgument(format!(
                "embedding has dimension {}, embedder declares {}",
                vector.len(),
                expected
            )));
        }
        Ok(())
    }
}

fn with_content(mut payload: Payload, text: &str) -> Payload {
    payload
        .entry(CONTENT_KEY)
        .or_insert_with(|| Value::String(text.to_string()));
    payload
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::MockEmbeddingProvider;
    use crate::file::FileVectorStore;
    use crate::models::{EmbeddingModel, StoreBackend};
    use crate::store::MockVectorStore;
    use mockall::predicate::eq;
    use serde_json::json;

    fn embedder_3d() -> MockEmbeddingProvider {
        let mut embedder = MockEmbeddingProvider::new();
        embedder.expect_model().return_const(EmbeddingModel::Custom(3));
        embedder.expect_dimension().return_const(3usize);
        embedder
    }

    fn collection(created: bool) -> CollectionInfo {
        CollectionInfo {
            name: "documents".to_string(),
            dimension: 3,
            distance: Default::default(),
            points_count: 0,
            created,
        }
    }

    fn store_expecting_setup() -> MockVectorStore {
        let mut store = MockVectorStore::new();
        store.expect_backend().return_const(StoreBackend::File);
        store
            .expect_setup()
            .with(eq("documents"), eq(3usize))
            .times(1)
            .returning(|_, _| Ok(collection(true)));
        store
    }

    #[tokio::test]
    async fn test_new_sets_up_with_embedder_dimension() {
        let retriever = Retriever::new(
            "documents",
            Arc::new(store_expecting_setup()),
            Arc::new(embedder_3d()),
        )
        .await
        .unwrap();

        assert_eq!(retriever.collection_name(), "documents");
        assert!(retriever.collection().created);
    }

    #[tokio::test]
    async fn test_setup_failure_aborts_construction() {
        let mut store = MockVectorStore::new();
        store.expect_backend().return_const(StoreBackend::Qdrant);
        store
            .expect_setup()
            .returning(|_, _| Err(VectorError::StoreUnavailable("connection refused".into())));

        let result = Retriever::new("documents", Arc::new(store), Arc::new(embedder_3d())).await;
        assert!(matches!(result, Err(VectorError::StoreUnavailable(_))));
    }

    #[tokio::test]
    async fn test_add_document_records_content() {
        let mut embedder = embedder_3d();
        embedder
            .expect_embed_texts()
            .withf(|texts| texts.len() == 1 && texts[0] == "hello world")
            .returning(|_| Ok(vec![vec![0.1, 0.2, 0.3]]));

        let mut store = store_expecting_setup();
        store
            .expect_upsert()
            .withf(|records| {
                records.len() == 1
                    && records[0].id.is_none()
                    && records[0].values == vec![0.1, 0.2, 0.3]
                    && records[0].payload.get("content") == Some(&json!("hello world"))
                    && records[0].payload.get("source") == Some(&json!("test"))
            })
            .times(1)
            .returning(|_| Ok(vec!["generated".to_string()]));

        let retriever = Retriever::new("documents", Arc::new(store), Arc::new(embedder))
            .await
            .unwrap();

        let mut payload = Payload::new();
        payload.insert("source".to_string(), json!("test"));
        let ids = retriever.add_document("hello world", payload).await.unwrap();
        assert_eq!(ids, ["generated"]);
    }

    #[tokio::test]
    async fn test_add_document_keeps_existing_content() {
        let mut embedder = embedder_3d();
        embedder
            .expect_embed_texts()
            .returning(|_| Ok(vec![vec![0.1, 0.2, 0.3]]));

        let mut store = store_expecting_setup();
        store
            .expect_upsert()
            .withf(|records| records[0].payload.get("content") == Some(&json!("summary")))
            .returning(|_| Ok(vec!["id".to_string()]));

        let retriever = Retriever::new("documents", Arc::new(store), Arc::new(embedder))
            .await
            .unwrap();

        let mut payload = Payload::new();
        payload.insert("content".to_string(), json!("summary"));
        retriever.add_document("full text", payload).await.unwrap();
    }

    #[tokio::test]
    async fn test_embedding_errors_pass_through() {
        let mut embedder = embedder_3d();
        embedder
            .expect_embed_query()
            .returning(|_| Err(VectorError::Embedding("rate limited".to_string())));

        let mut store = store_expecting_setup();
        store.expect_search().never();

        let retriever = Retriever::new("documents", Arc::new(store), Arc::new(embedder))
            .await
            .unwrap();

        let err = retriever.retrieve("anything", 5).await.unwrap_err();
        assert!(matches!(err, VectorError::Embedding(ref msg) if msg == "rate limited"));
    }

    #[tokio::test]
    async fn test_wrong_embedding_dimension_never_reaches_store() {
        let mut embedder = embedder_3d();
        embedder
            .expect_embed_query()
            .returning(|_| Ok(vec![0.1, 0.2]));

        let mut store = store_expecting_setup();
        store.expect_search().never();

        let retriever = Retriever::new("documents", Arc::new(store), Arc::new(embedder))
            .await
            .unwrap();

        let err = retriever.retrieve("anything", 5).await.unwrap_err();
        assert!(matches!(err, VectorError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_retrieve_returns_store_results_unchanged() {
        let mut embedder = embedder_3d();
        embedder
            .expect_embed_query()
            .with(eq("receipts"))
            .returning(|_| Ok(vec![1.0, 0.0, 0.0]));

        let hit = ScoredRecord::new("a".to_string(), 0.75, Payload::new(), None);
        let expected = vec![hit.clone()];

        let mut store = store_expecting_setup();
        store
            .expect_search()
            .with(eq(vec![1.0f32, 0.0, 0.0]), eq(2usize))
            .times(1)
            .returning(move |_, _| Ok(vec![hit.clone()]));

        let retriever = Retriever::new("documents", Arc::new(store), Arc::new(embedder))
            .await
            .unwrap();

        assert_eq!(retriever.retrieve("receipts", 2).await.unwrap(), expected);
    }

    #[tokio::test]
    async fn test_add_documents_length_mismatch() {
        let mut embedder = embedder_3d();
        embedder.expect_embed_texts().never();

        let mut store = store_expecting_setup();
        store.expect_upsert().never();

        let retriever = Retriever::new("documents", Arc::new(store), Arc::new(embedder))
            .await
            .unwrap();

        let err = retriever
            .add_documents(vec!["a".to_string(), "b".to_string()], vec![Payload::new()])
            .await
            .unwrap_err();
        assert!(matches!(err, VectorError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_end_to_end_with_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileVectorStore::open(dir.path().join("vectors.csv"))
            .await
            .unwrap();

        let mut embedder = embedder_3d();
        embedder.expect_embed_texts().returning(|texts| {
            Ok(texts
                .iter()
                .map(|t| match t.as_str() {
                    "apples" => vec![1.0, 0.0, 0.0],
                    "bananas" => vec![0.0, 1.0, 0.0],
                    _ => vec![0.0, 0.0, 1.0],
                })
                .collect())
        });
        embedder
            .expect_embed_query()
            .returning(|_| Ok(vec![0.9, 0.1, 0.0]));

        let retriever = Retriever::new("documents", Arc::new(store), Arc::new(embedder))
            .await
            .unwrap();

        retriever
            .add_documents(
                vec!["apples".to_string(), "bananas".to_string(), "cherries".to_string()],
                vec![Payload::new(), Payload::new(), Payload::new()],
            )
            .await
            .unwrap();

        let hits = retriever.retrieve("fruit", 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].content(), Some("apples"));
        assert_eq!(hits[1].content(), Some("bananas"));
        assert!(hits[0].score >= hits[1].score);
        assert_eq!(retriever.store().count().await.unwrap(), 3);
    }
}
