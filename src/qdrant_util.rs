//! Qdrant-backed [`VectorIndex`].

use async_trait::async_trait;
use qdrant_client::qdrant::point_id::PointIdOptions;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::{
    CreateCollectionBuilder, Distance, PointId, PointStruct, ScalarQuantizationBuilder,
    ScoredPoint, SearchParamsBuilder, SearchPointsBuilder, UpsertPointsBuilder,
    VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant};
use tracing::{debug, info, warn};

use crate::document::{IndexRecord, RecordMetadata, ScoredRecord};
use crate::error::{RagError, RagResult};
use crate::vector_index::{Metric, VectorIndex};

pub struct QdrantIndex {
    client: Qdrant,
    batch_size: usize,
}

impl QdrantIndex {
    pub fn connect(url: &str, api_key: &str, batch_size: usize) -> RagResult<Self> {
        info!(url, "initializing Qdrant client");
        let client = Qdrant::from_url(url).api_key(api_key).build()?;
        Ok(Self::new(client, batch_size))
    }

    pub fn new(client: Qdrant, batch_size: usize) -> Self {
        Self {
            client,
            batch_size: batch_size.max(1),
        }
    }

    pub async fn collection_exists(&self, collection_name: &str) -> RagResult<bool> {
        Ok(self.client.collection_exists(collection_name).await?)
    }
}

#[async_trait]
impl VectorIndex for QdrantIndex {
    async fn ensure_index(&self, name: &str, dimension: usize, metric: Metric) -> RagResult<()> {
        if self.collection_exists(name).await? {
            info!(
                collection = name,
                "collection already exists in Qdrant; do not create"
            );
            return Ok(());
        }
        self.client
            .create_collection(
                CreateCollectionBuilder::new(name)
                    .vectors_config(VectorParamsBuilder::new(dimension as u64, distance(metric)))
                    .quantization_config(ScalarQuantizationBuilder::default()),
            )
            .await?;
        info!(collection = name, dimension, ?metric, "created collection in Qdrant");
        Ok(())
    }

    async fn upsert(&self, name: &str, records: Vec<IndexRecord>) -> RagResult<()> {
        let total = records.len();
        for (batch_no, batch) in records.chunks(self.batch_size).enumerate() {
            let points = batch
                .iter()
                .map(to_point)
                .collect::<RagResult<Vec<PointStruct>>>()?;
            self.client
                .upsert_points(UpsertPointsBuilder::new(name, points).wait(true))
                .await?;
            debug!(collection = name, batch = batch_no, size = batch.len(), "upserted batch");
        }
        info!(collection = name, total, "stored records in Qdrant");
        Ok(())
    }

    async fn query(&self, name: &str, vector: &[f32], k: usize) -> RagResult<Vec<ScoredRecord>> {
        if k == 0 {
            return Err(RagError::InvalidInput("k must be positive".into()));
        }
        let search_result = self
            .client
            .search_points(
                SearchPointsBuilder::new(name, vector.to_vec(), k as u64)
                    .with_payload(true)
                    .params(SearchParamsBuilder::default().exact(true)),
            )
            .await?;
        search_result.result.into_iter().map(from_scored_point).collect()
    }
}

fn distance(metric: Metric) -> Distance {
    match metric {
        Metric::Cosine => Distance::Cosine,
        Metric::Euclidean => Distance::Euclid,
        Metric::DotProduct => Distance::Dot,
    }
}

fn to_point(record: &IndexRecord) -> RagResult<PointStruct> {
    let payload = serde_json::to_value(&record.metadata)
        .map_err(|e| RagError::Index(format!("failed to encode payload: {e}")))?;
    let payload = Payload::try_from(payload)?;
    Ok(PointStruct::new(
        record.id.clone(),
        record.vector.clone(),
        payload,
    ))
}

fn from_scored_point(point: ScoredPoint) -> RagResult<ScoredRecord> {
    let id = point.id.as_ref().map(point_id_string).unwrap_or_default();
    let field = |key: &str| point.payload.get(key).and_then(|v| v.kind.as_ref());
    let int_field = |key: &str| match field(key) {
        Some(Kind::IntegerValue(n)) => usize::try_from(*n).ok(),
        _ => None,
    };

    let text = match field("text") {
        Some(Kind::StringValue(s)) => s.clone(),
        _ => {
            return Err(RagError::Index(format!(
                "point '{id}' has no text in its payload"
            )))
        }
    };
    let source_path = match field("source_path") {
        Some(Kind::StringValue(s)) => s.clone(),
        _ => {
            warn!(point = %id, "payload is missing source_path");
            String::new()
        }
    };
    let chunk_index = int_field("chunk_index").unwrap_or_else(|| {
        warn!(point = %id, "payload is missing chunk_index");
        0
    });

    let metadata = RecordMetadata {
        text,
        source_path,
        chunk_index,
        start_offset: int_field("start_offset").unwrap_or_default(),
    };
    Ok(ScoredRecord {
        id,
        score: point.score,
        metadata,
    })
}

fn point_id_string(id: &PointId) -> String {
    match &id.point_id_options {
        Some(PointIdOptions::Uuid(uuid)) => uuid.clone(),
        Some(PointIdOptions::Num(num)) => num.to_string(),
        None => String::new(),
    }
}
