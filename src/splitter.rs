//! Recursive, boundary-aware chunking of documents.
//!
//! `text_splitter` descends through paragraph, line, sentence, word and
//! character boundaries until a piece fits the capacity, then merges pieces
//! back up to the capacity. Overlap is taken from the tail of the previous
//! chunk. Chunks are not trimmed, so each one is an exact slice of its
//! source document starting at `start_offset`.

use text_splitter::{ChunkConfig, ChunkSizer, TextSplitter};
use tokenizers::tokenizer::Tokenizer;
use tracing::{info, warn};

use crate::config::{validate_chunking, ChunkSettings, ChunkUnit};
use crate::document::{Chunk, Document};
use crate::error::{RagError, RagResult};
use crate::tokenizer_factory;

pub trait Chunker: Send + Sync {
    fn split(&self, documents: &[Document]) -> RagResult<Vec<Chunk>>;
}

#[derive(Clone)]
enum Sizer {
    Characters,
    Tokens(Box<Tokenizer>),
}

#[derive(Clone)]
pub struct RecursiveChunker {
    chunk_size: usize,
    chunk_overlap: usize,
    sizer: Sizer,
}

impl std::fmt::Debug for RecursiveChunker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let unit = match self.sizer {
            Sizer::Characters => "chars",
            Sizer::Tokens(_) => "tokens",
        };
        f.debug_struct("RecursiveChunker")
            .field("chunk_size", &self.chunk_size)
            .field("chunk_overlap", &self.chunk_overlap)
            .field("unit", &unit)
            .finish()
    }
}

impl RecursiveChunker {
    /// Character-measured chunker. Requires `0 < chunk_overlap < chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> RagResult<Self> {
        validate_chunking(chunk_size, chunk_overlap)?;
        Ok(Self {
            chunk_size,
            chunk_overlap,
            sizer: Sizer::Characters,
        })
    }

    /// Chunker measuring size and overlap in tokens of `tokenizer`.
    pub fn with_tokenizer(
        chunk_size: usize,
        chunk_overlap: usize,
        tokenizer: Tokenizer,
    ) -> RagResult<Self> {
        validate_chunking(chunk_size, chunk_overlap)?;
        Ok(Self {
            chunk_size,
            chunk_overlap,
            sizer: Sizer::Tokens(Box::new(tokenizer)),
        })
    }

    pub fn from_settings(settings: &ChunkSettings) -> RagResult<Self> {
        match (settings.unit, &settings.tokenizer_path) {
            (ChunkUnit::Chars, _) => Self::new(settings.size, settings.overlap),
            (ChunkUnit::Tokens, Some(path)) => {
                let tokenizer = tokenizer_factory::get_tokenizer(path)?;
                Self::with_tokenizer(settings.size, settings.overlap, tokenizer)
            }
            (ChunkUnit::Tokens, None) => Err(RagError::Config(
                "token-based chunking requires a tokenizer path".into(),
            )),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Splits one text into `(byte_offset, slice)` windows.
    pub fn split_text<'t>(&self, text: &'t str) -> RagResult<Vec<(usize, &'t str)>> {
        match &self.sizer {
            Sizer::Characters => split_with(text, self.config_for(text_splitter::Characters)?),
            Sizer::Tokens(tokenizer) => {
                split_with(text, self.config_for(tokenizer.as_ref().clone())?)
            }
        }
    }

    fn config_for<S: ChunkSizer>(&self, sizer: S) -> RagResult<ChunkConfig<S>> {
        Ok(ChunkConfig::new(self.chunk_size)
            .with_overlap(self.chunk_overlap)
            .map_err(|e| RagError::Chunking(e.to_string()))?
            .with_trim(false)
            .with_sizer(sizer))
    }
}

fn split_with<S: ChunkSizer>(text: &str, config: ChunkConfig<S>) -> RagResult<Vec<(usize, &str)>> {
    let splitter = TextSplitter::new(config);
    Ok(splitter.chunk_indices(text).collect())
}

impl Chunker for RecursiveChunker {
    fn split(&self, documents: &[Document]) -> RagResult<Vec<Chunk>> {
        if documents.is_empty() {
            warn!("no extracted data to split");
            return Ok(Vec::new());
        }

        let mut chunks = Vec::new();
        for document in documents {
            let pieces = self.split_text(&document.text)?;
            chunks.extend(
                pieces
                    .into_iter()
                    .enumerate()
                    .map(|(chunk_index, (start_offset, text))| Chunk {
                        text: text.to_string(),
                        source_path: document.source_path.clone(),
                        chunk_index,
                        start_offset,
                    }),
            );
        }

        if chunks.is_empty() {
            warn!(documents = documents.len(), "documents produced no chunks");
        } else {
            info!(count = chunks.len(), "successfully split text into chunks");
        }
        Ok(chunks)
    }
}
