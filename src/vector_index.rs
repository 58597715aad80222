//! Similarity index contract plus a process-local implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use ndarray::ArrayView1;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::document::{IndexRecord, ScoredRecord};
use crate::error::{RagError, RagResult};

pub const DEFAULT_TOP_K: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Cosine,
    Euclidean,
    DotProduct,
}

#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Creates the index if absent. An existing index is left untouched,
    /// whatever its configuration.
    async fn ensure_index(&self, name: &str, dimension: usize, metric: Metric) -> RagResult<()>;

    async fn upsert(&self, name: &str, records: Vec<IndexRecord>) -> RagResult<()>;

    /// Up to `k` records, most similar first.
    async fn query(&self, name: &str, vector: &[f32], k: usize) -> RagResult<Vec<ScoredRecord>>;
}

struct MemoryCollection {
    dimension: usize,
    metric: Metric,
    records: HashMap<String, IndexRecord>,
}

/// Exact-search index kept in memory. Useful as a stand-in for the hosted
/// index in tests and dry runs.
#[derive(Default)]
pub struct InMemoryIndex {
    collections: RwLock<HashMap<String, MemoryCollection>>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self, name: &str) -> usize {
        self.collections
            .read()
            .await
            .get(name)
            .map_or(0, |c| c.records.len())
    }

    pub async fn config(&self, name: &str) -> Option<(usize, Metric)> {
        self.collections
            .read()
            .await
            .get(name)
            .map(|c| (c.dimension, c.metric))
    }
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    async fn ensure_index(&self, name: &str, dimension: usize, metric: Metric) -> RagResult<()> {
        let mut collections = self.collections.write().await;
        if collections.contains_key(name) {
            info!(index = name, "index already exists; skipping creation");
            return Ok(());
        }
        collections.insert(
            name.to_string(),
            MemoryCollection {
                dimension,
                metric,
                records: HashMap::new(),
            },
        );
        info!(index = name, dimension, ?metric, "created index");
        Ok(())
    }

    async fn upsert(&self, name: &str, records: Vec<IndexRecord>) -> RagResult<()> {
        let mut collections = self.collections.write().await;
        let collection = collections
            .get_mut(name)
            .ok_or_else(|| RagError::Index(format!("index '{name}' does not exist")))?;

        if let Some(bad) = records
            .iter()
            .find(|r| r.vector.len() != collection.dimension)
        {
            return Err(RagError::DimensionMismatch {
                expected: collection.dimension,
                actual: bad.vector.len(),
            });
        }
        debug!(index = name, count = records.len(), "upserting records");
        for record in records {
            collection.records.insert(record.id.clone(), record);
        }
        Ok(())
    }

    async fn query(&self, name: &str, vector: &[f32], k: usize) -> RagResult<Vec<ScoredRecord>> {
        if k == 0 {
            return Err(RagError::InvalidInput("k must be positive".into()));
        }
        let collections = self.collections.read().await;
        let collection = collections
            .get(name)
            .ok_or_else(|| RagError::Index(format!("index '{name}' does not exist")))?;
        if vector.len() != collection.dimension {
            return Err(RagError::DimensionMismatch {
                expected: collection.dimension,
                actual: vector.len(),
            });
        }

        let query = ArrayView1::from(vector);
        let mut scored: Vec<ScoredRecord> = collection
            .records
            .values()
            .map(|record| ScoredRecord {
                id: record.id.clone(),
                score: similarity(
                    collection.metric,
                    query,
                    ArrayView1::from(record.vector.as_slice()),
                ),
                metadata: record.metadata.clone(),
            })
            .collect();
        scored.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
        scored.truncate(k);
        Ok(scored)
    }
}

/// Higher is closer for every metric; euclidean distance is negated.
fn similarity(metric: Metric, a: ArrayView1<f32>, b: ArrayView1<f32>) -> f32 {
    match metric {
        Metric::DotProduct => a.dot(&b),
        Metric::Cosine => {
            let norm = a.dot(&a).sqrt() * b.dot(&b).sqrt();
            if norm == 0.0 {
                0.0
            } else {
                a.dot(&b) / norm
            }
        }
        Metric::Euclidean => {
            let diff = &a - &b;
            -diff.dot(&diff).sqrt()
        }
    }
}
