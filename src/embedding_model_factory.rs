use std::path::Path;

use fastembed::{
    read_file_to_bytes, EmbeddingModel, InitOptions, InitOptionsUserDefined, Pooling,
    TextEmbedding, TokenizerFiles, UserDefinedEmbeddingModel,
};
use tracing::info;

use crate::config::EmbeddingSettings;
use crate::error::{RagError, RagResult};

/// Loads the embedding model described by `settings`, either from a local
/// directory or from the model registry (cached under `cache_dir`).
pub fn get_model(settings: &EmbeddingSettings) -> RagResult<TextEmbedding> {
    match &settings.model_dir {
        Some(dir) => load_user_defined(dir),
        None => load_registry_model(settings),
    }
}

fn load_registry_model(settings: &EmbeddingSettings) -> RagResult<TextEmbedding> {
    let model = resolve_model(&settings.model_name)?;
    info!(
        model = %settings.model_name,
        cache_dir = %settings.cache_dir.display(),
        "downloading embeddings model"
    );

    let options = InitOptions::new(model)
        .with_cache_dir(settings.cache_dir.clone())
        .with_show_download_progress(false);
    TextEmbedding::try_new(options).map_err(|e| RagError::EmbeddingInit(e.to_string()))
}

/// Loads `onnx/model.onnx` and the tokenizer files from a model directory.
fn load_user_defined(base_path: &Path) -> RagResult<TextEmbedding> {
    info!(dir = %base_path.display(), "loading embeddings model from disk");
    let read = |relative: &str| {
        let path = base_path.join(relative);
        read_file_to_bytes(&path).map_err(|e| {
            RagError::EmbeddingInit(format!("failed to read {}: {e}", path.display()))
        })
    };

    let onnx_bytes = read("onnx/model.onnx")?;
    let tokenizer_files = TokenizerFiles {
        tokenizer_file: read("tokenizer.json")?,
        config_file: read("config.json")?,
        special_tokens_map_file: read("special_tokens_map.json")?,
        tokenizer_config_file: read("tokenizer_config.json")?,
    };

    let user_model =
        UserDefinedEmbeddingModel::new(onnx_bytes, tokenizer_files).with_pooling(Pooling::Mean);

    TextEmbedding::try_new_from_user_defined(user_model, InitOptionsUserDefined::default())
        .map_err(|e| RagError::EmbeddingInit(e.to_string()))
}

/// Maps a model name such as `sentence-transformers/all-MiniLM-L6-v2` to a
/// supported registry model.
pub fn resolve_model(name: &str) -> RagResult<EmbeddingModel> {
    let short = name.rsplit('/').next().unwrap_or(name);
    // The registry also carries a quantized build under the same short name.
    if short.eq_ignore_ascii_case("all-MiniLM-L6-v2") {
        return Ok(EmbeddingModel::AllMiniLML6V2);
    }

    let supported = TextEmbedding::list_supported_models();
    let exact = supported
        .iter()
        .find(|info| info.model_code.eq_ignore_ascii_case(name));
    let by_short_name = || {
        supported.iter().find(|info| {
            info.model_code
                .rsplit('/')
                .next()
                .is_some_and(|code| code.eq_ignore_ascii_case(short))
        })
    };

    exact
        .or_else(by_short_name)
        .map(|info| info.model.clone())
        .ok_or_else(|| RagError::EmbeddingInit(format!("unsupported embedding model '{name}'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_the_sentence_transformers_name() {
        let model = resolve_model("sentence-transformers/all-MiniLM-L6-v2").unwrap();
        assert_eq!(model, EmbeddingModel::AllMiniLML6V2);
    }

    #[test]
    fn unknown_model_fails_initialization() {
        let err = resolve_model("acme/not-a-model").unwrap_err();
        assert!(matches!(err, RagError::EmbeddingInit(_)));
    }

    #[test]
    fn missing_model_dir_fails_initialization() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_user_defined(dir.path()).err().unwrap();
        assert!(matches!(err, RagError::EmbeddingInit(_)));
    }
}
