pub const MODEL_NAME: &str = "sentence-transformers/all-MiniLM-L6-v2";
pub const VECTOR_SIZE: u64 = 384; // all-MiniLM-L6-v2 embedding Size: 384 dimensions
pub const MAX_TOKENS_PER_CHUNK: usize = 256; // all-MiniLM-L6-v2 embedding model max tokens limit
pub const CHARS_PER_TOKEN: usize = 4; // rough estimate for English text

/// Longest query, in characters, embedded as a single window.
pub const MAX_QUERY_CHARS: usize = MAX_TOKENS_PER_CHUNK * CHARS_PER_TOKEN;
