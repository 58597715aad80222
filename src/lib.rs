//! Retrieval-augmented question answering over a directory of PDFs.
//!
//! Ingestion ([`pipeline`]) loads PDFs, splits them into overlapping chunks,
//! embeds the chunks and stores them in a vector index. Answering
//! ([`answer`]) embeds a question, retrieves the closest chunks and asks a
//! language model to answer from them.

pub mod all_minilm_l6_v2;
pub mod answer;
pub mod config;
pub mod document;
pub mod embedding;
pub mod embedding_model_factory;
pub mod error;
pub mod llm;
pub mod loader;
pub mod pipeline;
pub mod prompt;
pub mod qdrant_util;
pub mod server;
pub mod session;
pub mod splitter;
pub mod tokenizer_factory;
pub mod vector_index;
pub mod vector_mean;

pub use answer::{Answer, AnswerOptions, AnswerService};
pub use config::{Settings, SettingsArgs};
pub use document::{Chunk, Document, EmbeddingVector, IndexRecord, RecordMetadata, ScoredRecord};
pub use embedding::{Embedder, FastEmbedder};
pub use error::{RagError, RagResult};
pub use llm::{CompletionRequest, LanguageModel, OllamaClient};
pub use loader::{DocumentLoader, PdfDirectoryLoader};
pub use pipeline::{IngestParams, IngestReport, IngestionPipeline, PipelineError, Stage};
pub use prompt::ChatMode;
pub use qdrant_util::QdrantIndex;
pub use session::{ChatSession, ChatTurn, Role};
pub use splitter::{Chunker, RecursiveChunker};
pub use vector_index::{InMemoryIndex, Metric, VectorIndex};
