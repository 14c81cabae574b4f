//! Command execution
//!
//! Every command opens the configured store and sets the collection up with
//! the embedding model's dimension. `add` and `query` go through a
//! [`Retriever`]; the rest talk to the store directly.

use std::sync::Arc;

use clap::Parser;
use core_config::Environment;
use domain_vector::{
    EmbeddingProvider, OpenAIConfig, OpenAIProvider, Payload, Retriever, RetrieverConfig,
    VectorError, VectorResult, VectorStore,
};
use eyre::{Report, Result, WrapErr};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::cli::{Cli, Commands};

/// Parse arguments, run one command and print its JSON result
///
/// # Errors
///
/// Returns an error if:
/// - Store or embedding configuration is invalid
/// - The store cannot be opened or set up
/// - Embedding or the store operation fails
pub async fn run() -> Result<()> {
    core_config::tracing::install_color_eyre();
    let environment = Environment::from_env();
    core_config::tracing::init_tracing(&environment);

    let cli = Cli::parse();
    let config = cli
        .retriever_config()
        .wrap_err("Failed to load vector store configuration")?;
    let (model, dimensions) =
        OpenAIConfig::model_from_env().wrap_err("Failed to resolve embedding model")?;
    let dimension = dimensions.unwrap_or_else(|| model.dimension()) as usize;

    info!(
        backend = config.backend.backend().as_str(),
        collection = %config.collection_name,
        model = model.model_name(),
        dimension,
        "Running command"
    );

    let output = execute(cli.command, &config, dimension, || {
        let provider: Arc<dyn EmbeddingProvider> = Arc::new(OpenAIProvider::from_env()?);
        Ok(provider)
    })
    .await
    .map_err(with_retry_hint)?;

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Runs `command` against the configured store
///
/// `embedder` is only called for commands that embed text.
pub async fn execute<F>(
    command: Commands,
    config: &RetrieverConfig,
    dimension: usize,
    embedder: F,
) -> Result<Value>
where
    F: FnOnce() -> VectorResult<Arc<dyn EmbeddingProvider>>,
{
    let store = config
        .backend
        .connect()
        .await
        .wrap_err("Failed to open vector store")?;

    match command {
        Commands::Add { text, id, meta } => {
            let retriever = retriever(config, store, embedder).await?;
            let payload: Payload = meta.into_iter().collect();

            let ids = match id {
                Some(id) => retriever.add_document_with_id(&id, &text, payload).await,
                None => retriever.add_document(&text, payload).await,
            }
            .wrap_err("Failed to add document")?;

            Ok(json!({ "ids": ids }))
        }
        Commands::Query { text, top_k } => {
            let retriever = retriever(config, store, embedder).await?;
            let hits = retriever
                .retrieve(&text, top_k)
                .await
                .wrap_err("Failed to query documents")?;

            Ok(Value::Array(
                hits.into_iter()
                    .map(|hit| json!({ "id": hit.id, "score": hit.score, "payload": hit.payload }))
                    .collect(),
            ))
        }
        Commands::Get { id } => {
            setup(config, store.as_ref(), dimension).await?;
            let record = store.get(&id).await.wrap_err("Failed to read record")?;
            Ok(serde_json::to_value(record)?)
        }
        Commands::Delete { ids } => {
            setup(config, store.as_ref(), dimension).await?;
            let requested = ids.len();
            let deleted = store.delete(ids).await.wrap_err("Failed to delete records")?;
            Ok(json!({ "requested": requested, "deleted": deleted }))
        }
        Commands::List => {
            setup(config, store.as_ref(), dimension).await?;
            let records = store.list_all().await.wrap_err("Failed to list records")?;
            Ok(serde_json::to_value(records)?)
        }
        Commands::Count => {
            setup(config, store.as_ref(), dimension).await?;
            let count = store.count().await.wrap_err("Failed to count records")?;
            Ok(json!({ "count": count }))
        }
    }
}

/// Marks failures caused by a transient store error as worth retrying
fn with_retry_hint(err: Report) -> Report {
    let transient = err
        .chain()
        .filter_map(|cause| cause.downcast_ref::<VectorError>())
        .any(VectorError::is_transient);

    if transient {
        warn!(error = %err, "Store temporarily unavailable");
        err.wrap_err("Vector store is temporarily unavailable, the command can be retried")
    } else {
        err
    }
}

async fn retriever<F>(
    config: &RetrieverConfig,
    store: Arc<dyn VectorStore>,
    embedder: F,
) -> Result<Retriever>
where
    F: FnOnce() -> VectorResult<Arc<dyn EmbeddingProvider>>,
{
    let embedder = embedder().wrap_err("Failed to configure embedding provider")?;
    Retriever::new(&config.collection_name, store, embedder)
        .await
        .wrap_err_with(|| format!("Failed to set up collection '{}'", config.collection_name))
}

async fn setup(config: &RetrieverConfig, store: &dyn VectorStore, dimension: usize) -> Result<()> {
    let info = store
        .setup(&config.collection_name, dimension)
        .await
        .wrap_err_with(|| format!("Failed to set up collection '{}'", config.collection_name))?;
    debug!(points = info.points_count, created = info.created, "Collection ready");
    Ok(())
}
