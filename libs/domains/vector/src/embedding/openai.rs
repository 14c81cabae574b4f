use std::time::Duration;

use async_trait::async_trait;
use backoff::backoff::Backoff;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use core_config::{ConfigError, FromEnv, env_optional, env_or_default, env_parse, env_required};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument, warn};

use super::EmbeddingProvider;
use crate::error::{VectorError, VectorResult};
use crate::models::EmbeddingModel;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Exponential backoff around each embeddings request
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub initial_interval: Duration,
    pub max_interval: Duration,
    pub multiplier: f64,
    /// Total attempts, including the first
    pub max_attempts: u32,
}

impl RetryPolicy {
    /// Single attempt, no retries
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.initial_interval)
            .with_max_interval(self.max_interval)
            .with_multiplier(self.multiplier)
            .with_randomization_factor(0.0)
            .with_max_elapsed_time(None)
            .build()
    }
}

impl Default for RetryPolicy {
    /// 4s doubling up to 10s, five attempts in total
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_secs(4),
            max_interval: Duration::from_secs(10),
            multiplier: 2.0,
            max_attempts: 5,
        }
    }
}

/// Per-request timeout when `OPENAI_TIMEOUT_SECS` is unset
pub const DEFAULT_OPENAI_TIMEOUT_SECS: u64 = 30;

/// OpenAI embedding provider configuration
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: EmbeddingModel,
    /// Shortened output length sent as `dimensions`; `None` keeps the native size
    pub dimensions: Option<u32>,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl OpenAIConfig {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            model: EmbeddingModel::default(),
            dimensions: None,
            timeout: Duration::from_secs(DEFAULT_OPENAI_TIMEOUT_SECS),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    pub fn with_model(mut self, model: EmbeddingModel) -> Self {
        self.model = model;
        self
    }

    pub fn with_dimensions(mut self, dimensions: u32) -> Self {
        self.dimensions = Some(dimensions);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Length of the vectors this configuration produces
    pub fn dimension(&self) -> u32 {
        self.dimensions.unwrap_or_else(|| self.model.dimension())
    }

    /// Resolves `OPENAI_EMBEDDING_MODEL` and `OPENAI_EMBEDDING_DIMENSIONS`
    /// without requiring an API key.
    ///
    /// The second value is the `dimensions` parameter to send, `None` when
    /// the model's native size was requested.
    pub fn model_from_env() -> Result<(EmbeddingModel, Option<u32>), ConfigError> {
        let name = env_or_default("OPENAI_EMBEDDING_MODEL", "text-embedding-3-small");
        let model = EmbeddingModel::from_name(&name).ok_or_else(|| ConfigError::UnsupportedValue {
            key: "OPENAI_EMBEDDING_MODEL".to_string(),
            value: name.clone(),
            expected: "text-embedding-3-small, text-embedding-3-large, text-embedding-ada-002"
                .to_string(),
        })?;

        let dimensions = match env_optional("OPENAI_EMBEDDING_DIMENSIONS") {
            Some(_) => Some(env_parse::<u32>("OPENAI_EMBEDDING_DIMENSIONS", 0)?),
            None => None,
        };

        Ok((model, requested_dimensions(model, dimensions)?))
    }
}

/// Validates a requested output length against what `model` can produce
fn requested_dimensions(
    model: EmbeddingModel,
    dimensions: Option<u32>,
) -> Result<Option<u32>, ConfigError> {
    let native = model.dimension();
    match dimensions {
        None => Ok(None),
        Some(dim) if dim == native => Ok(None),
        Some(dim) if !model.supports_dimensions() => Err(ConfigError::UnsupportedValue {
            key: "OPENAI_EMBEDDING_DIMENSIONS".to_string(),
            value: dim.to_string(),
            expected: format!("unset or {} for {}", native, model.model_name()),
        }),
        Some(dim) if dim == 0 || dim > native => Err(ConfigError::UnsupportedValue {
            key: "OPENAI_EMBEDDING_DIMENSIONS".to_string(),
            value: dim.to_string(),
            expected: format!("1..={} for {}", native, model.model_name()),
        }),
        Some(dim) => Ok(Some(dim)),
    }
}

impl FromEnv for OpenAIConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let api_key = env_required("OPENAI_API_KEY")?;
        let base_url = env_or_default("OPENAI_BASE_URL", DEFAULT_OPENAI_BASE_URL);
        let timeout_secs = env_parse("OPENAI_TIMEOUT_SECS", DEFAULT_OPENAI_TIMEOUT_SECS)?;
        let (model, dimensions) = Self::model_from_env()?;

        let mut config = Self::new(api_key)
            .with_base_url(base_url)
            .with_model(model)
            .with_timeout(Duration::from_secs(timeout_secs));
        config.dimensions = dimensions;
        Ok(config)
    }
}

/// OpenAI embeddings provider
pub struct OpenAIProvider {
    client: Client,
    config: OpenAIConfig,
}

impl OpenAIProvider {
    /// Builds the HTTP client with the configured request timeout.
    pub fn new(config: OpenAIConfig) -> VectorResult<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    pub fn from_env() -> VectorResult<Self> {
        Self::new(OpenAIConfig::from_env()?)
    }

    /// Sends one request, retrying transient failures with backoff.
    async fn call_api(&self, texts: &[String]) -> VectorResult<Vec<Vec<f32>>> {
        let mut backoff = self.config.retry.backoff();
        let mut attempts = 0;

        loop {
            attempts += 1;
            debug!(attempt = attempts, inputs = texts.len(), "Calling embeddings API");

            match self.make_request(texts).await {
                Ok(vectors) => return Ok(vectors),
                Err(failure) if !failure.transient => return Err(failure.error),
                Err(failure) => {
                    if attempts >= self.config.retry.max_attempts {
                        error!(error = %failure.error, attempts, "Max retries exceeded");
                        return Err(failure.error);
                    }

                    match backoff.next_backoff() {
                        Some(duration) => {
                            warn!(
                                error = %failure.error,
                                retry_in_ms = duration.as_millis(),
                                "Embeddings request failed, retrying"
                            );
                            tokio::time::sleep(duration).await;
                        }
                        None => {
                            error!(error = %failure.error, "Backoff exhausted");
                            return Err(failure.error);
                        }
                    }
                }
            }
        }
    }

    async fn make_request(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RequestFailure> {
        let model = self.config.model;
        let request = EmbeddingRequest {
            model: model.model_name(),
            input: texts,
            dimensions: self.config.dimensions,
        };

        let response = self
            .client
            .post(format!("{}/embeddings", self.config.base_url.trim_end_matches('/')))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| RequestFailure {
                transient: e.is_timeout() || e.is_connect(),
                error: e.into(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(RequestFailure {
                transient: status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error(),
                error: VectorError::Embedding(format!(
                    "OpenAI API error ({}): {}",
                    status, error_text
                )),
            });
        }

        let body: EmbeddingResponse = response.json().await.map_err(RequestFailure::fatal)?;

        // Sort by index to maintain order
        let mut data = body.data;
        data.sort_by_key(|d| d.index);

        if data.len() != texts.len() {
            return Err(RequestFailure::fatal(VectorError::Embedding(format!(
                "expected {} embeddings, received {}",
                texts.len(),
                data.len()
            ))));
        }

        let expected = self.config.dimension() as usize;
        if let Some(bad) = data.iter().find(|d| d.embedding.len() != expected) {
            return Err(RequestFailure::fatal(VectorError::InvalidArgument(format!(
                "model {} returned a {}-dimensional vector, expected {}",
                model.model_name(),
                bad.embedding.len(),
                expected
            ))));
        }

        if let Some(usage) = body.usage {
            debug!(total_tokens = usage.total_tokens, "Embeddings received");
        }

        Ok(data.into_iter().map(|d| d.embedding).collect())
    }
}

struct RequestFailure {
    transient: bool,
    error: VectorError,
}

impl RequestFailure {
    fn fatal(error: impl Into<VectorError>) -> Self {
        Self {
            transient: false,
            error: error.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
    #[serde(default)]
    usage: Option<EmbeddingUsage>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

#[derive(Debug, Deserialize)]
struct EmbeddingUsage {
    total_tokens: u32,
}

#[async_trait]
impl EmbeddingProvider for OpenAIProvider {
    fn model(&self) -> EmbeddingModel {
        self.config.model
    }

    fn dimension(&self) -> usize {
        self.config.dimension() as usize
    }

    #[instrument(skip_all, fields(inputs = texts.len(), model = self.config.model.model_name()))]
    async fn embed_texts(&self, texts: &[String]) -> VectorResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        self.call_api(texts).await
    }

    async fn embed_query(&self, query: &str) -> VectorResult<Vec<f32>> {
        let results = self.embed_texts(&[query.to_string()]).await?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| VectorError::Embedding("No embedding returned".to_string()))
    }
}
