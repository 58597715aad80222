//! Data carried through the ingestion pipeline and stored in the index.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub type EmbeddingVector = Vec<f32>;

/// Raw text extracted from one source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub source_path: PathBuf,
    pub text: String,
}

impl Document {
    pub fn new(source_path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        Self {
            source_path: source_path.into(),
            text: text.into(),
        }
    }
}

/// A bounded window of a document's text, the unit of retrieval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub text: String,
    pub source_path: PathBuf,
    pub chunk_index: usize,
    /// Byte offset of `text` within the source document.
    pub start_offset: usize,
}

impl Chunk {
    pub fn end_offset(&self) -> usize {
        self.start_offset + self.text.len()
    }
}

/// Payload stored next to each vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordMetadata {
    pub text: String,
    pub source_path: String,
    pub chunk_index: usize,
    #[serde(default)]
    pub start_offset: usize,
}

impl From<&Chunk> for RecordMetadata {
    fn from(chunk: &Chunk) -> Self {
        Self {
            text: chunk.text.clone(),
            source_path: chunk.source_path.display().to_string(),
            chunk_index: chunk.chunk_index,
            start_offset: chunk.start_offset,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexRecord {
    pub id: String,
    pub vector: EmbeddingVector,
    pub metadata: RecordMetadata,
}

impl IndexRecord {
    /// Builds a record with a freshly generated id.
    pub fn from_chunk(chunk: &Chunk, vector: EmbeddingVector) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            vector,
            metadata: RecordMetadata::from(chunk),
        }
    }
}

/// A record returned by a similarity query; higher `score` is closer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredRecord {
    pub id: String,
    pub score: f32,
    pub metadata: RecordMetadata,
}
