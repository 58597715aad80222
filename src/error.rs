use std::path::PathBuf;

use thiserror::Error;

pub type RagResult<T> = Result<T, RagError>;

#[derive(Debug, Error)]
pub enum RagError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to extract text from {}: {message}", path.display())]
    Pdf { path: PathBuf, message: String },

    #[error("chunking failed: {0}")]
    Chunking(String),

    #[error("embedding model failed to initialize: {0}")]
    EmbeddingInit(String),

    #[error("embedding failed: {0}")]
    Embedding(String),

    #[error("vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("vector index error: {0}")]
    Index(String),

    #[error("language model error: {0}")]
    Llm(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl RagError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RagError::Io {
            path: path.into(),
            source,
        }
    }

    /// True for failures caused by the caller rather than a collaborator.
    pub fn is_client_error(&self) -> bool {
        matches!(self, RagError::InvalidInput(_) | RagError::Config(_))
    }
}

impl From<qdrant_client::QdrantError> for RagError {
    fn from(err: qdrant_client::QdrantError) -> Self {
        RagError::Index(err.to_string())
    }
}

impl From<reqwest::Error> for RagError {
    fn from(err: reqwest::Error) -> Self {
        RagError::Llm(err.to_string())
    }
}
