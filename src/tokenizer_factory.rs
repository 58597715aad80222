use std::path::Path;

use tokenizers::tokenizer::Tokenizer;

use crate::error::{RagError, RagResult};

/// Loads a HuggingFace `tokenizer.json`.
pub fn get_tokenizer(path: &Path) -> RagResult<Tokenizer> {
    Tokenizer::from_file(path).map_err(|e| {
        RagError::Config(format!(
            "failed to load tokenizer from {}: {e}",
            path.display()
        ))
    })
}
