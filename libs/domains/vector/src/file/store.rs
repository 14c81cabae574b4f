use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::format;
use crate::error::{VectorError, VectorResult};
use crate::models::{
    CollectionInfo, DistanceMetric, NewVector, ScoredRecord, StoreBackend, VectorRecord,
};
use crate::similarity::cosine_similarity;
use crate::store::{VectorStore, check_dimensions, check_query};

/// Records in first-insertion order with an id index
#[derive(Debug, Clone, Default)]
struct RecordTable {
    rows: Vec<VectorRecord>,
    index: HashMap<String, usize>,
}

impl RecordTable {
    fn from_rows(rows: Vec<VectorRecord>) -> Self {
        let mut table = Self::default();
        for row in rows {
            table.upsert(row);
        }
        table
    }

    /// Replaces in place when the id exists, so the original position is kept.
    fn upsert(&mut self, record: VectorRecord) {
        match self.index.get(&record.id) {
            Some(&pos) => self.rows[pos] = record,
            None => {
                self.index.insert(record.id.clone(), self.rows.len());
                self.rows.push(record);
            }
        }
    }

    fn remove(&mut self, ids: &[String]) -> usize {
        let doomed: HashSet<&str> = ids
            .iter()
            .map(String::as_str)
            .filter(|id| self.index.contains_key(*id))
            .collect();

        if doomed.is_empty() {
            return 0;
        }

        self.rows.retain(|r| !doomed.contains(r.id.as_str()));
        self.index = self
            .rows
            .iter()
            .enumerate()
            .map(|(pos, r)| (r.id.clone(), pos))
            .collect();

        doomed.len()
    }

    fn get(&self, id: &str) -> Option<&VectorRecord> {
        self.index.get(id).map(|&pos| &self.rows[pos])
    }

    fn len(&self) -> usize {
        self.rows.len()
    }
}

#[derive(Debug)]
struct FileState {
    table: RecordTable,
    collection: Option<String>,
    dimension: Option<usize>,
}

/// CSV-backed [`VectorStore`]
///
/// The whole collection lives in memory and is mirrored to one CSV file.
/// Mutations are applied to a copy of the table, written out, and only then
/// made visible, so a failed write leaves both memory and disk unchanged.
#[derive(Debug)]
pub struct FileVectorStore {
    path: PathBuf,
    state: RwLock<FileState>,
}

impl FileVectorStore {
    /// Opens the store at `path`, loading existing rows.
    ///
    /// The file does not need to exist yet; `setup` creates it.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub async fn open(path: impl AsRef<Path>) -> VectorResult<Self> {
        let path = path.as_ref().to_path_buf();

        if path.extension().and_then(|e| e.to_str()) != Some("csv") {
            return Err(VectorError::InvalidArgument(format!(
                "store file must be a .csv file: {}",
                path.display()
            )));
        }

        let rows = if tokio::fs::try_exists(&path).await? {
            let read_path = path.clone();
            tokio::task::spawn_blocking(move || format::read_records(&read_path)).await??
        } else {
            Vec::new()
        };

        let mut table = RecordTable::from_rows(rows);
        let dimension = demote_inconsistent(&mut table);
        let malformed = table.rows.iter().filter(|r| r.is_malformed()).count();

        info!(
            records = table.len(),
            malformed,
            dimension = ?dimension,
            "Opened file vector store"
        );

        Ok(Self {
            path,
            state: RwLock::new(FileState {
                table,
                collection: None,
                dimension,
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Collection name recorded by the last `setup`
    pub async fn collection_name(&self) -> Option<String> {
        self.state.read().await.collection.clone()
    }

    pub async fn dimension(&self) -> Option<usize> {
        self.state.read().await.dimension
    }

    /// Ids of records kept without a usable vector
    pub async fn malformed_ids(&self) -> Vec<String> {
        let state = self.state.read().await;
        state
            .table
            .rows
            .iter()
            .filter(|r| r.is_malformed())
            .map(|r| r.id.clone())
            .collect()
    }

    /// Writes `table` to disk on the blocking pool and hands it back.
    async fn persist(&self, table: RecordTable) -> VectorResult<RecordTable> {
        let path = self.path.clone();
        let table = tokio::task::spawn_blocking(move || {
            format::write_records(&path, &table.rows).map(|_| table)
        })
        .await??;

        debug!(records = table.len(), "Rewrote store file");
        Ok(table)
    }
}

/// Infers the collection dimension from the first usable vector and turns
/// vectors of any other length into malformed records.
fn demote_inconsistent(table: &mut RecordTable) -> Option<usize> {
    let dimension = table
        .rows
        .iter()
        .find_map(|r| r.vector.as_ref().map(Vec::len))?;

    for record in table.rows.iter_mut() {
        if record.vector.as_ref().is_some_and(|v| v.len() != dimension) {
            warn!(
                id = %record.id,
                expected = dimension,
                "Keeping record with inconsistent dimension as malformed"
            );
            record.vector = None;
        }
    }

    Some(dimension)
}

#[async_trait]
impl VectorStore for FileVectorStore {
    fn backend(&self) -> StoreBackend {
        StoreBackend::File
    }

    #[instrument(skip(self), fields(path = %self.path.display()))]
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

        let mut state = self.state.write().await;

        if let Some(existing) = state.dimension {
            if existing != vector_size {
                return Err(VectorError::InvalidArgument(format!(
                    "collection '{}' holds {}-dimensional vectors, requested {}",
                    collection_name, existing, vector_size
                )));
            }
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                VectorError::StoreUnavailable(format!(
                    "cannot create directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let created = !tokio::fs::try_exists(&self.path).await?;
        if created {
            state.table = self.persist(state.table.clone()).await?;
            info!(collection = collection_name, "Created store file");
        }

        state.collection = Some(collection_name.to_string());
        state.dimension = Some(vector_size);

        Ok(CollectionInfo {
            name: collection_name.to_string(),
            dimension: vector_size,
            distance: DistanceMetric::Cosine,
            points_count: state.table.len() as u64,
            created,
        })
    }

    #[instrument(skip_all, fields(count = records.len()))]
    async fn upsert(&self, records: Vec<NewVector>) -> VectorResult<Vec<String>> {
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let mut state = self.state.write().await;
        let dimension = check_dimensions(
            records.iter().map(|r| r.values.as_slice()),
            state.dimension,
        )?;

        let mut table = state.table.clone();
        let mut ids = Vec::with_capacity(records.len());

        for record in records {
            let id = match record.id {
                Some(id) if !id.trim().is_empty() => id,
                Some(_) => {
                    return Err(VectorError::InvalidArgument(
                        "record id must not be blank".to_string(),
                    ));
                }
                None => Uuid::new_v4().to_string(),
            };

            table.upsert(VectorRecord {
                id: id.clone(),
                vector: Some(record.values),
                payload: record.payload,
            });
            ids.push(id);
        }

        state.table = self.persist(table).await?;
        state.dimension = dimension;

        debug!(total = state.table.len(), "Upserted records");
        Ok(ids)
    }

    #[instrument(skip(self, query), fields(dimension = query.len()))]
    async fn search(&self, query: Vec<f32>, top_k: usize) -> VectorResult<Vec<ScoredRecord>> {
        let state = self.state.read().await;
        check_query(&query, state.dimension)?;

        if top_k == 0 {
            return Ok(Vec::new());
        }

        let mut results: Vec<ScoredRecord> = state
            .table
            .rows
            .iter()
            .filter_map(|record| {
                let vector = record.vector.as_ref().filter(|v| v.len() == query.len())?;
                Some(ScoredRecord::new(
                    record.id.clone(),
                    cosine_similarity(&query, vector),
                    record.payload.clone(),
                    Some(vector.clone()),
                ))
            })
            .collect();

        // stable: equal scores keep insertion order
        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results.truncate(top_k);

        debug!(hits = results.len(), scanned = state.table.len(), "Search complete");
        Ok(results)
    }

    async fn get(&self, id: &str) -> VectorResult<Option<VectorRecord>> {
        Ok(self.state.read().await.table.get(id).cloned())
    }

    #[instrument(skip_all, fields(count = ids.len()))]
    async fn delete(&self, ids: Vec<String>) -> VectorResult<usize> {
        let mut state = self.state.write().await;

        let mut table = state.table.clone();
        let removed = table.remove(&ids);
        if removed == 0 {
            return Ok(0);
        }

        state.table = self.persist(table).await?;

        debug!(removed, total = state.table.len(), "Deleted records");
        Ok(removed)
    }

    async fn list_all(&self) -> VectorResult<Vec<VectorRecord>> {
        Ok(self.state.read().await.table.rows.clone())
    }

    async fn count(&self) -> VectorResult<usize> {
        Ok(self.state.read().await.table.len())
    }
}
