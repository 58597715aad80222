//! Offline ingestion: load, split, embed, upsert.
//!
//! Stages run strictly in order and the first failure aborts the run. A
//! failed run is restarted from the beginning; nothing is resumed.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::Settings;
use crate::document::{Chunk, IndexRecord};
use crate::embedding::{check_shape, Embedder};
use crate::error::RagError;
use crate::loader::DocumentLoader;
use crate::splitter::Chunker;
use crate::vector_index::{Metric, VectorIndex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Stage {
    Load,
    Split,
    EmbedProviderInit,
    IndexEnsure,
    Upsert,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Load => "LOAD",
            Stage::Split => "SPLIT",
            Stage::EmbedProviderInit => "EMBED-PROVIDER-INIT",
            Stage::IndexEnsure => "INDEX-ENSURE",
            Stage::Upsert => "UPSERT",
            Stage::Done => "DONE",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
#[error("ingestion failed at stage {stage}: {source}")]
pub struct PipelineError {
    pub stage: Stage,
    #[source]
    pub source: RagError,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub documents: usize,
    pub chunks: usize,
    pub records: usize,
}

#[derive(Debug, Clone)]
pub struct IngestParams {
    pub data_dir: PathBuf,
    pub index_name: String,
    pub dimension: usize,
    pub metric: Metric,
    pub batch_size: usize,
}

impl From<&Settings> for IngestParams {
    fn from(settings: &Settings) -> Self {
        Self {
            data_dir: settings.data_dir.clone(),
            index_name: settings.index_name.clone(),
            dimension: settings.embedding.dimension,
            metric: Metric::Cosine,
            batch_size: settings.upsert_batch_size,
        }
    }
}

pub struct IngestionPipeline {
    loader: Arc<dyn DocumentLoader>,
    chunker: Arc<dyn Chunker>,
    index: Arc<dyn VectorIndex>,
    params: IngestParams,
}

impl IngestionPipeline {
    pub fn new(
        loader: Arc<dyn DocumentLoader>,
        chunker: Arc<dyn Chunker>,
        index: Arc<dyn VectorIndex>,
        params: IngestParams,
    ) -> Self {
        Self {
            loader,
            chunker,
            index,
            params,
        }
    }

    /// Runs every stage. `init_embedder` is invoked once, after splitting.
    pub async fn run<F>(&self, init_embedder: F) -> Result<IngestReport, PipelineError>
    where
        F: FnOnce() -> Result<Arc<dyn Embedder>, RagError>,
    {
        let params = &self.params;

        info!(stage = %Stage::Load, dir = %params.data_dir.display(), "loading PDF files");
        let documents = stage(Stage::Load, self.loader.load(&params.data_dir))?;

        info!(stage = %Stage::Split, documents = documents.len(), "splitting documents");
        let chunks = stage(Stage::Split, self.chunker.split(&documents))?;

        info!(stage = %Stage::EmbedProviderInit, "initializing embeddings model");
        let embedder = stage(Stage::EmbedProviderInit, init_embedder())?;
        if embedder.dimension() != params.dimension {
            return stage(
                Stage::EmbedProviderInit,
                Err(RagError::DimensionMismatch {
                    expected: params.dimension,
                    actual: embedder.dimension(),
                }),
            );
        }

        info!(stage = %Stage::IndexEnsure, index = %params.index_name, "ensuring index");
        stage(
            Stage::IndexEnsure,
            self.index
                .ensure_index(&params.index_name, params.dimension, params.metric)
                .await,
        )?;

        info!(stage = %Stage::Upsert, chunks = chunks.len(), "storing chunks in vector index");
        let records = stage(
            Stage::Upsert,
            self.embed_and_upsert(embedder.as_ref(), &chunks).await,
        )?;

        let report = IngestReport {
            documents: documents.len(),
            chunks: chunks.len(),
            records,
        };
        if report.records == 0 {
            warn!(stage = %Stage::Done, "ingestion finished with an empty corpus");
        }
        info!(stage = %Stage::Done, ?report, "documents successfully stored");
        Ok(report)
    }

    async fn embed_and_upsert(
        &self,
        embedder: &dyn Embedder,
        chunks: &[Chunk],
    ) -> Result<usize, RagError> {
        let mut stored = 0;
        for batch in chunks.chunks(self.params.batch_size.max(1)) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let vectors = embedder.embed(&texts)?;
            check_shape(&vectors, batch.len(), self.params.dimension)?;

            let records: Vec<IndexRecord> = batch
                .iter()
                .zip(vectors)
                .map(|(chunk, vector)| IndexRecord::from_chunk(chunk, vector))
                .collect();
            self.index.upsert(&self.params.index_name, records).await?;
            stored += batch.len();
        }
        Ok(stored)
    }
}

fn stage<T>(stage: Stage, result: Result<T, RagError>) -> Result<T, PipelineError> {
    result.map_err(|source| {
        error!(stage = %stage, error = %source, "ingestion stage failed");
        PipelineError { stage, source }
    })
}
