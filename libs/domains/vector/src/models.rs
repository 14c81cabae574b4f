use serde::{Deserialize, Serialize};

/// Free-form metadata attached to a record
pub type Payload = serde_json::Map<String, serde_json::Value>;

/// Payload key holding the source text of a record
pub const CONTENT_KEY: &str = "content";

/// A stored vector with its payload
///
/// `vector` is `None` only for persisted rows whose vector could not be
/// parsed. Such records stay listable but never appear in search results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    pub vector: Option<Vec<f32>>,
    #[serde(default)]
    pub payload: Payload,
}

impl VectorRecord {
    pub fn new(id: impl Into<String>, vector: Vec<f32>) -> Self {
        Self {
            id: id.into(),
            vector: Some(vector),
            payload: Payload::new(),
        }
    }

    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }

    /// The `content` payload field, if it is a string
    pub fn content(&self) -> Option<&str> {
        self.payload.get(CONTENT_KEY).and_then(|v| v.as_str())
    }

    pub fn is_malformed(&self) -> bool {
        self.vector.is_none()
    }
}

/// Insert request; the store generates an id when `id` is `None`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewVector {
    pub id: Option<String>,
    pub values: Vec<f32>,
    #[serde(default)]
    pub payload: Payload,
}

impl NewVector {
    pub fn new(values: Vec<f32>) -> Self {
        Self {
            id: None,
            values,
            payload: Payload::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }
}

/// Search hit, ordered by descending `score`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredRecord {
    pub id: String,
    pub score: f32,
    pub payload: Payload,
    pub vector: Option<Vec<f32>>,
}

impl ScoredRecord {
    pub fn new(id: String, score: f32, payload: Payload, vector: Option<Vec<f32>>) -> Self {
        Self {
            id,
            score,
            payload,
            vector,
        }
    }

    pub fn content(&self) -> Option<&str> {
        self.payload.get(CONTENT_KEY).and_then(|v| v.as_str())
    }
}

/// Distance metric for similarity calculations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DistanceMetric {
    #[default]
    Cosine,
}

/// Which backend serves a store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    File,
    Qdrant,
}

impl StoreBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreBackend::File => "file",
            StoreBackend::Qdrant => "qdrant",
        }
    }
}

impl std::str::FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" | "csv" => Ok(StoreBackend::File),
            "qdrant" => Ok(StoreBackend::Qdrant),
            other => Err(format!("unknown backend '{}'", other)),
        }
    }
}

/// Collection state reported by `setup`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionInfo {
    pub name: String,
    pub dimension: usize,
    pub distance: DistanceMetric,
    pub points_count: u64,
    /// False when `setup` found the collection already present
    pub created: bool,
}

/// Embedding model selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EmbeddingModel {
    /// OpenAI text-embedding-3-small (1536 dimensions)
    #[default]
    TextEmbedding3Small,
    /// OpenAI text-embedding-3-large (3072 dimensions)
    TextEmbedding3Large,
    /// OpenAI text-embedding-ada-002 (1536 dimensions, legacy)
    TextEmbeddingAda002,
    /// Embedder outside the OpenAI catalogue with a fixed dimension
    Custom(u32),
}

impl EmbeddingModel {
    /// Native output length
    pub fn dimension(&self) -> u32 {
        match self {
            EmbeddingModel::TextEmbedding3Small => 1536,
            EmbeddingModel::TextEmbedding3Large => 3072,
            EmbeddingModel::TextEmbeddingAda002 => 1536,
            EmbeddingModel::Custom(dim) => *dim,
        }
    }

    pub fn model_name(&self) -> &str {
        match self {
            EmbeddingModel::TextEmbedding3Small => "text-embedding-3-small",
            EmbeddingModel::TextEmbedding3Large => "text-embedding-3-large",
            EmbeddingModel::TextEmbeddingAda002 => "text-embedding-ada-002",
            EmbeddingModel::Custom(_) => "custom",
        }
    }

    /// Whether the API accepts a `dimensions` parameter for this model
    pub fn supports_dimensions(&self) -> bool {
        matches!(
            self,
            EmbeddingModel::TextEmbedding3Small | EmbeddingModel::TextEmbedding3Large
        )
    }

    /// Resolves an OpenAI model name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim() {
            "text-embedding-3-small" => Some(EmbeddingModel::TextEmbedding3Small),
            "text-embedding-3-large" => Some(EmbeddingModel::TextEmbedding3Large),
            "text-embedding-ada-002" => Some(EmbeddingModel::TextEmbeddingAda002),
            _ => None,
        }
    }
}
