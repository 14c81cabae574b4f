use std::time::Duration;

use async_trait::async_trait;
use qdrant_client::Qdrant;
use qdrant_client::qdrant::{
    CountPointsBuilder, CreateCollectionBuilder, DeletePointsBuilder, Distance, GetPointsBuilder,
    PointId, PointStruct, ScrollPointsBuilder, SearchPointsBuilder, UpsertPointsBuilder,
    VectorParamsBuilder,
};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::QdrantConfig;
use super::convert::{
    canonical_id, configured_dimension, from_point_id, payload_to_qdrant, qdrant_to_payload,
    to_point_id, vector_from_output,
};
use crate::error::{VectorError, VectorResult};
use crate::models::{
    CollectionInfo, DistanceMetric, NewVector, ScoredRecord, StoreBackend, VectorRecord,
};
use crate::store::{VectorStore, check_dimensions, check_query};

const SCROLL_PAGE_SIZE: u32 = 256;

#[derive(Debug, Clone)]
struct ActiveCollection {
    name: String,
    dimension: usize,
}

/// Qdrant-backed [`VectorStore`]
///
/// Similarity and ranking are done by the service (cosine, configured when the
/// collection is created). Writes use `wait=true` so they are visible to the
/// next search.
pub struct QdrantVectorStore {
    client: Qdrant,
    collection: RwLock<Option<ActiveCollection>>,
}

impl QdrantVectorStore {
    pub fn new(config: QdrantConfig) -> VectorResult<Self> {
        let mut builder = Qdrant::from_url(&config.url);

        if let Some(api_key) = config.api_key {
            builder = builder.api_key(api_key);
        }

        builder = builder.timeout(Duration::from_secs(config.timeout_secs));

        let client = builder.build().map_err(|e| {
            VectorError::StoreUnavailable(format!("Failed to build Qdrant client: {}", e))
        })?;

        Ok(Self::from_client(client))
    }

    pub fn from_client(client: Qdrant) -> Self {
        Self {
            client,
            collection: RwLock::new(None),
        }
    }

    /// Name of the collection chosen by `setup`
    pub async fn collection_name(&self) -> Option<String> {
        self.collection.read().await.as_ref().map(|c| c.name.clone())
    }

    async fn active(&self) -> VectorResult<ActiveCollection> {
        self.collection.read().await.clone().ok_or_else(|| {
            VectorError::StoreUnavailable("collection not set up".to_string())
        })
    }

    async fn existing_dimension(&self, name: &str) -> VectorResult<Option<usize>> {
        let info = self.client.collection_info(name).await?;
        Ok(info.result.as_ref().and_then(configured_dimension))
    }

    async fn points_count(&self, name: &str) -> VectorResult<u64> {
        let response = self
            .client
            .count(CountPointsBuilder::new(name).exact(true))
            .await?;
        Ok(response.result.map(|r| r.count).unwrap_or_default())
    }
}

#[async_trait]
impl VectorStore for QdrantVectorStore {
    fn backend(&self) -> StoreBackend {
        StoreBackend::Qdrant
    }

    #[instrument(skip(self))]
    async fn setup(
        &self,
        collection_name: &str,
        vector_size: usize,
    ) -> VectorResult<CollectionInfo> {
        if vector_size == 0 {
            return Err(VectorError::InvalidArgument(
                "vector size must be greater than zero".to_string(),
            ));
        }

        let mut created = false;

        if self.client.collection_exists(collection_name).await? {
            info!(collection = collection_name, "Collection already exists");
        } else {
            let builder = CreateCollectionBuilder::new(collection_name).vectors_config(
                VectorParamsBuilder::new(vector_size as u64, Distance::Cosine),
            );

            match self.client.create_collection(builder).await {
                Ok(response) if response.result => {
                    created = true;
                    info!(collection = collection_name, vector_size, "Collection created");
                }
                Ok(_) => {
                    return Err(VectorError::StoreUnavailable(format!(
                        "Qdrant rejected creation of collection '{}'",
                        collection_name
                    )));
                }
                // lost a creation race with another client
                Err(e) if e.to_string().contains("already exists") => {
                    debug!(collection = collection_name, "Collection created concurrently");
                }
                Err(e) => return Err(e.into()),
            }
        }

        if let Some(existing) = self.existing_dimension(collection_name).await? {
            if existing != vector_size {
                return Err(VectorError::InvalidArgument(format!(
                    "collection '{}' holds {}-dimensional vectors, requested {}",
                    collection_name, existing, vector_size
                )));
            }
        }

        let points_count = self.points_count(collection_name).await?;

        *self.collection.write().await = Some(ActiveCollection {
            name: collection_name.to_string(),
            dimension: vector_size,
        });

        Ok(CollectionInfo {
            name: collection_name.to_string(),
            dimension: vector_size,
            distance: DistanceMetric::Cosine,
            points_count,
            created,
        })
    }

    #[instrument(skip_all, fields(count = records.len()))]
    async fn upsert(&self, records: Vec<NewVector>) -> VectorResult<Vec<String>> {
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let collection = self.active().await?;
        check_dimensions(
            records.iter().map(|r| r.values.as_slice()),
            Some(collection.dimension),
        )?;

        let mut ids = Vec::with_capacity(records.len());
        let mut points = Vec::with_capacity(records.len());

        for record in records {
            let id = match record.id {
                Some(id) => canonical_id(&id)?,
                None => Uuid::new_v4().to_string(),
            };

            points.push(PointStruct::new(
                to_point_id(&id)?,
                record.values,
                payload_to_qdrant(record.payload),
            ));
            ids.push(id);
        }

        let response = self
            .client
            .upsert_points(UpsertPointsBuilder::new(&collection.name, points).wait(true))
            .await?;

        debug!(
            collection = %collection.name,
            status = ?response.result.map(|r| r.status),
            "Upserted points"
        );

        Ok(ids)
    }

    #[instrument(skip(self, query), fields(dimension = query.len()))]
    async fn search(&self, query: Vec<f32>, top_k: usize) -> VectorResult<Vec<ScoredRecord>> {
        let collection = self.active().await?;
        check_query(&query, Some(collection.dimension))?;

        if top_k == 0 {
            return Ok(Vec::new());
        }

        let builder = SearchPointsBuilder::new(&collection.name, query, top_k as u64)
            .with_payload(true)
            .with_vectors(true);

        let response = self.client.search_points(builder).await?;

        response
            .result
            .into_iter()
            .map(|point| {
                let id = point
                    .id
                    .as_ref()
                    .map(from_point_id)
                    .transpose()?
                    .ok_or_else(|| VectorError::Internal("Missing point ID".to_string()))?;

                let vector = vector_from_output(&point.vectors);

                Ok(ScoredRecord::new(
                    id,
                    point.score,
                    qdrant_to_payload(point.payload),
                    vector,
                ))
            })
            .collect()
    }

    async fn get(&self, id: &str) -> VectorResult<Option<VectorRecord>> {
        let collection = self.active().await?;

        // ids outside Qdrant's id space cannot be stored
        let Ok(point_id) = to_point_id(id) else {
            return Ok(None);
        };

        let builder = GetPointsBuilder::new(&collection.name, vec![point_id])
            .with_payload(true)
            .with_vectors(true);

        let response = self.client.get_points(builder).await?;

        response
            .result
            .into_iter()
            .next()
            .map(|point| {
                let id = point
                    .id
                    .as_ref()
                    .map(from_point_id)
                    .transpose()?
                    .ok_or_else(|| VectorError::Internal("Missing point ID".to_string()))?;

                Ok(VectorRecord {
                    id,
                    vector: vector_from_output(&point.vectors),
                    payload: qdrant_to_payload(point.payload),
                })
            })
            .transpose()
    }

    #[instrument(skip_all, fields(count = ids.len()))]
    async fn delete(&self, ids: Vec<String>) -> VectorResult<usize> {
        let collection = self.active().await?;

        let point_ids: Vec<PointId> = ids
            .iter()
            .filter_map(|id| match to_point_id(id) {
                Ok(point_id) => Some(point_id),
                Err(_) => {
                    warn!(id = %id, "Skipping id outside Qdrant's id space");
                    None
                }
            })
            .collect();

        if point_ids.is_empty() {
            return Ok(0);
        }

        let count = point_ids.len();
        let builder = DeletePointsBuilder::new(&collection.name)
            .points(point_ids)
            .wait(true);

        self.client.delete_points(builder).await?;

        debug!(collection = %collection.name, count, "Deleted points");
        Ok(count)
    }

    async fn list_all(&self) -> VectorResult<Vec<VectorRecord>> {
        let collection = self.active().await?;

        let mut records = Vec::new();
        let mut offset: Option<PointId> = None;

        loop {
            let mut builder = ScrollPointsBuilder::new(&collection.name)
                .limit(SCROLL_PAGE_SIZE)
                .with_payload(true)
                .with_vectors(true);
            if let Some(next) = offset.take() {
                builder = builder.offset(next);
            }

            let page = self.client.scroll(builder).await?;

            for point in page.result {
                let id = point
                    .id
                    .as_ref()
                    .map(from_point_id)
                    .transpose()?
                    .ok_or_else(|| VectorError::Internal("Missing point ID".to_string()))?;

                records.push(VectorRecord {
                    id,
                    vector: vector_from_output(&point.vectors),
                    payload: qdrant_to_payload(point.payload),
                });
            }

            match page.next_page_offset {
                Some(next) => offset = Some(next),
                None => break,
            }
        }

        Ok(records)
    }

    async fn count(&self) -> VectorResult<usize> {
        let collection = self.active().await?;
        Ok(self.points_count(&collection.name).await? as usize)
    }
}
