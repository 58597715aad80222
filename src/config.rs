//! Runtime settings.
//!
//! Every setting is a command-line flag with an environment fallback, so a
//! `.env` file loaded at startup configures the whole process.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, ValueEnum};

use crate::all_minilm_l6_v2::{MODEL_NAME, VECTOR_SIZE};
use crate::error::{RagError, RagResult};
use crate::prompt::ChatMode;
use crate::vector_index::DEFAULT_TOP_K;

pub const DEFAULT_INDEX_NAME: &str = "medicalchatbot";
pub const DEFAULT_TEMPERATURE: f32 = 0.4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ChunkUnit {
    Chars,
    Tokens,
}

#[derive(Debug, Clone, Args)]
pub struct SettingsArgs {
    /// Directory scanned for *.pdf files
    #[arg(long, env = "RAG_DATA_DIR", default_value = "data/")]
    pub data_dir: PathBuf,

    /// Name of the vector index shared by ingestion and querying
    #[arg(long, env = "RAG_INDEX_NAME", default_value = DEFAULT_INDEX_NAME)]
    pub index_name: String,

    /// Qdrant gRPC endpoint
    #[arg(long, env = "QDRANT_URL", default_value = "http://localhost:6334")]
    pub qdrant_url: String,

    /// API key for the vector index service
    #[arg(long, env = "QDRANT_API_KEY", hide_env_values = true)]
    pub qdrant_api_key: Option<String>,

    /// Sentence-embedding model name
    #[arg(long, env = "RAG_EMBEDDING_MODEL", default_value = MODEL_NAME)]
    pub embedding_model: String,

    /// Load the embedding model from this directory instead of downloading it
    #[arg(long, env = "RAG_MODEL_DIR")]
    pub model_dir: Option<PathBuf>,

    /// Where downloaded models are cached
    #[arg(long, env = "RAG_MODEL_CACHE_DIR", default_value = ".fastembed_cache")]
    pub model_cache_dir: PathBuf,

    #[arg(long, env = "RAG_CHUNK_SIZE", default_value_t = 500)]
    pub chunk_size: usize,

    #[arg(long, env = "RAG_CHUNK_OVERLAP", default_value_t = 50)]
    pub chunk_overlap: usize,

    /// Unit chunk size and overlap are measured in
    #[arg(long, env = "RAG_CHUNK_UNIT", value_enum, default_value_t = ChunkUnit::Chars)]
    pub chunk_unit: ChunkUnit,

    /// tokenizer.json used when --chunk-unit=tokens
    #[arg(long, env = "RAG_TOKENIZER_PATH")]
    pub tokenizer_path: Option<PathBuf>,

    #[arg(long, env = "RAG_UPSERT_BATCH_SIZE", default_value_t = 64)]
    pub upsert_batch_size: usize,

    /// Number of chunks retrieved per question
    #[arg(long, env = "RAG_TOP_K", default_value_t = DEFAULT_TOP_K)]
    pub top_k: usize,

    #[arg(long, env = "OLLAMA_URL", default_value = "http://localhost:11434")]
    pub ollama_url: String,

    #[arg(long, env = "RAG_LLM_MODEL", default_value = "llama3.2")]
    pub llm_model: String,

    /// Sampling temperature, 0.0 to 1.0
    #[arg(long, env = "RAG_TEMPERATURE", default_value_t = DEFAULT_TEMPERATURE)]
    pub temperature: f32,

    #[arg(long, env = "RAG_CHAT_MODE", value_enum, default_value_t = ChatMode::Concise)]
    pub chat_mode: ChatMode,

    #[arg(long, env = "RAG_LISTEN_ADDR", default_value = "0.0.0.0:3000")]
    pub listen_addr: SocketAddr,
}

#[derive(Debug, Clone)]
pub struct ChunkSettings {
    pub size: usize,
    pub overlap: usize,
    pub unit: ChunkUnit,
    pub tokenizer_path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct EmbeddingSettings {
    pub model_name: String,
    pub model_dir: Option<PathBuf>,
    pub cache_dir: PathBuf,
    pub dimension: usize,
}

#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub mode: ChatMode,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub index_name: String,
    pub qdrant_url: String,
    pub qdrant_api_key: String,
    pub embedding: EmbeddingSettings,
    pub chunking: ChunkSettings,
    pub upsert_batch_size: usize,
    pub top_k: usize,
    pub llm: LlmSettings,
    pub listen_addr: SocketAddr,
}

impl TryFrom<SettingsArgs> for Settings {
    type Error = RagError;

    fn try_from(args: SettingsArgs) -> RagResult<Self> {
        let qdrant_api_key = args
            .qdrant_api_key
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                RagError::Config("QDRANT_API_KEY not found in environment variables".into())
            })?;

        let settings = Settings {
            data_dir: args.data_dir,
            index_name: args.index_name,
            qdrant_url: args.qdrant_url,
            qdrant_api_key,
            embedding: EmbeddingSettings {
                model_name: args.embedding_model,
                model_dir: args.model_dir,
                cache_dir: args.model_cache_dir,
                dimension: VECTOR_SIZE as usize,
            },
            chunking: ChunkSettings {
                size: args.chunk_size,
                overlap: args.chunk_overlap,
                unit: args.chunk_unit,
                tokenizer_path: args.tokenizer_path,
            },
            upsert_batch_size: args.upsert_batch_size,
            top_k: args.top_k,
            llm: LlmSettings {
                base_url: args.ollama_url,
                model: args.llm_model,
                temperature: args.temperature,
                mode: args.chat_mode,
            },
            listen_addr: args.listen_addr,
        };
        settings.validate()?;
        Ok(settings)
    }
}

impl Settings {
    pub fn validate(&self) -> RagResult<()> {
        if self.index_name.trim().is_empty() {
            return Err(RagError::Config("index name must not be empty".into()));
        }
        validate_chunking(self.chunking.size, self.chunking.overlap).map_err(as_config)?;
        if self.chunking.unit == ChunkUnit::Tokens && self.chunking.tokenizer_path.is_none() {
            return Err(RagError::Config(
                "token-based chunking requires RAG_TOKENIZER_PATH".into(),
            ));
        }
        if self.upsert_batch_size == 0 {
            return Err(RagError::Config("upsert batch size must be positive".into()));
        }
        if self.top_k == 0 {
            return Err(RagError::Config("top-k must be positive".into()));
        }
        validate_temperature(self.llm.temperature).map_err(as_config)?;
        Ok(())
    }
}

fn as_config(err: RagError) -> RagError {
    match err {
        RagError::InvalidInput(message) => RagError::Config(message),
        other => other,
    }
}

pub fn validate_chunking(size: usize, overlap: usize) -> RagResult<()> {
    if size == 0 || overlap == 0 {
        return Err(RagError::InvalidInput(format!(
            "chunk size and overlap must be positive (size={size}, overlap={overlap})"
        )));
    }
    if overlap >= size {
        return Err(RagError::InvalidInput(format!(
            "chunk overlap {overlap} must be smaller than chunk size {size}"
        )));
    }
    Ok(())
}

pub fn validate_temperature(temperature: f32) -> RagResult<()> {
    if !(0.0..=1.0).contains(&temperature) {
        return Err(RagError::InvalidInput(format!(
            "temperature {temperature} is outside 0.0..=1.0"
        )));
    }
    Ok(())
}
