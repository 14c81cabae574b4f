//! End-to-end tests for the Retriever over the file store
//!
//! A deterministic in-process embedder stands in for the remote model so these
//! tests verify:
//! - Setup wires the embedder's dimension into the store
//! - Documents are ranked by meaning, not insertion order
//! - Ingested documents survive a restart

use std::sync::Arc;

use async_trait::async_trait;
use domain_vector::*;
use serde_json::json;
use test_utils::{TestStoreDir, assertions::*};

/// Bag-of-words embedder over a fixed vocabulary
struct VocabularyEmbedder {
    vocabulary: Vec<&'static str>,
}

impl VocabularyEmbedder {
    fn new() -> Self {
        Self {
            vocabulary: vec!["invoice", "payment", "holiday", "beach", "server", "outage"],
        }
    }

    fn embed(&self, text: &str) -> Vec<f32> {
        let lower = text.to_lowercase();
        self.vocabulary
            .iter()
            .map(|word| lower.matches(word).count() as f32)
            .collect()
    }
}

#[async_trait]
impl EmbeddingProvider for VocabularyEmbedder {
    fn model(&self) -> EmbeddingModel {
        EmbeddingModel::Custom(self.vocabulary.len() as u32)
    }

    async fn embed_texts(&self, texts: &[String]) -> VectorResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed(t)).collect())
    }

    async fn embed_query(&self, query: &str) -> VectorResult<Vec<f32>> {
        Ok(self.embed(query))
    }
}

async fn retriever(dir: &TestStoreDir) -> Retriever {
    let store = FileVectorStore::open(dir.csv_path("documents")).await.unwrap();
    Retriever::new("documents", Arc::new(store), Arc::new(VocabularyEmbedder::new()))
        .await
        .unwrap()
}

// ============================================================================
// Retriever Tests
// ============================================================================

#[tokio::test]
async fn test_setup_uses_embedder_dimension() {
    let dir = TestStoreDir::new();
    let retriever = retriever(&dir).await;

    assert_eq!(retriever.collection().dimension, 6);
    assert!(retriever.collection().created);
    assert!(dir.csv_path("documents").exists());
}

#[tokio::test]
async fn test_retrieve_ranks_relevant_documents_first() {
    let dir = TestStoreDir::new();
    let retriever = retriever(&dir).await;

    retriever
        .add_documents(
            vec![
                "Beach holiday in August".to_string(),
                "Invoice overdue, payment reminder".to_string(),
                "Server outage postmortem".to_string(),
            ],
            vec![Payload::new(), Payload::new(), Payload::new()],
        )
        .await
        .unwrap();

    let hits = retriever.retrieve("when is the invoice payment due", 2).await.unwrap();

    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].content(), Some("Invoice overdue, payment reminder"));
    assert_approx_eq(hits[0].score, 1.0, 1e-6, "matching document");
    let scores: Vec<f32> = hits.iter().map(|h| h.score).collect();
    assert_non_increasing(&scores, "retriever scores");
}

#[tokio::test]
async fn test_add_document_with_id_replaces_previous_text() {
    let dir = TestStoreDir::new();
    let retriever = retriever(&dir).await;

    let mut payload = Payload::new();
    payload.insert("author".to_string(), json!("ops"));

    retriever
        .add_document_with_id("runbook", "server outage", payload.clone())
        .await
        .unwrap();
    let ids = retriever
        .add_document_with_id("runbook", "beach holiday", payload)
        .await
        .unwrap();

    assert_eq!(ids, ["runbook"]);
    assert_eq!(retriever.store().count().await.unwrap(), 1);

    let record = assert_some(retriever.store().get("runbook").await.unwrap(), "runbook");
    assert_eq!(record.content(), Some("beach holiday"));
    assert_eq!(record.payload.get("author"), Some(&json!("ops")));
}

#[tokio::test]
async fn test_documents_survive_restart() {
    let dir = TestStoreDir::new();

    let id = {
        let retriever = retriever(&dir).await;
        let ids = retriever
            .add_document("Payment received for invoice 42", Payload::new())
            .await
            .unwrap();
        ids[0].clone()
    };

    let retriever = retriever(&dir).await;
    assert!(!retriever.collection().created);
    assert_eq!(retriever.collection().points_count, 1);

    let hits = retriever.retrieve("invoice", 5).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, id);
}

#[tokio::test]
async fn test_store_with_other_dimension_is_rejected() {
    let dir = TestStoreDir::new();
    let store = FileVectorStore::open(dir.csv_path("documents")).await.unwrap();
    store.setup("documents", 3).await.unwrap();

    let result = Retriever::new(
        "documents",
        Arc::new(store),
        Arc::new(VocabularyEmbedder::new()),
    )
    .await;

    assert!(matches!(result, Err(VectorError::InvalidArgument(_))));
}
