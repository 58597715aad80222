//! Text-to-vector conversion.

use fastembed::TextEmbedding;
use tracing::info;

use crate::all_minilm_l6_v2::MAX_QUERY_CHARS;
use crate::config::EmbeddingSettings;
use crate::document::EmbeddingVector;
use crate::embedding_model_factory;
use crate::error::{RagError, RagResult};
use crate::splitter::RecursiveChunker;
use crate::vector_mean;

pub trait Embedder: Send + Sync {
    /// One vector per input, in input order.
    fn embed(&self, texts: &[String]) -> RagResult<Vec<EmbeddingVector>>;

    fn dimension(&self) -> usize;
}

/// Sentence-embedding model held for the life of the process.
pub struct FastEmbedder {
    model: TextEmbedding,
    dimension: usize,
}

impl FastEmbedder {
    /// Loads the model and checks that it produces `settings.dimension`
    /// sized vectors.
    pub fn new(settings: &EmbeddingSettings) -> RagResult<Self> {
        let model = embedding_model_factory::get_model(settings)?;
        let probe = model
            .embed(vec!["dimension probe"], None)
            .map_err(|e| RagError::EmbeddingInit(e.to_string()))?;
        let actual = probe.first().map(Vec::len).unwrap_or_default();
        if actual != settings.dimension {
            return Err(RagError::EmbeddingInit(format!(
                "model '{}' produces {actual}-dimensional vectors, index expects {}",
                settings.model_name, settings.dimension
            )));
        }
        info!(
            model = %settings.model_name,
            dimension = actual,
            "successfully loaded embeddings model"
        );
        Ok(Self {
            model,
            dimension: actual,
        })
    }
}

impl Embedder for FastEmbedder {
    fn embed(&self, texts: &[String]) -> RagResult<Vec<EmbeddingVector>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let embeddings = self
            .model
            .embed(texts.to_vec(), None)
            .map_err(|e| RagError::Embedding(e.to_string()))?;
        check_shape(&embeddings, texts.len(), self.dimension)?;
        Ok(embeddings)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Verifies an embedding batch has one vector per input and the expected
/// dimension.
pub fn check_shape(
    embeddings: &[EmbeddingVector],
    expected_len: usize,
    dimension: usize,
) -> RagResult<()> {
    if embeddings.len() != expected_len {
        return Err(RagError::Embedding(format!(
            "expected {expected_len} embeddings, got {}",
            embeddings.len()
        )));
    }
    if let Some(bad) = embeddings.iter().find(|e| e.len() != dimension) {
        return Err(RagError::DimensionMismatch {
            expected: dimension,
            actual: bad.len(),
        });
    }
    Ok(())
}

/// Embeds a question. Text longer than the model window is split into
/// windows whose vectors are averaged, weighted by window length.
pub fn embed_query(embedder: &dyn Embedder, text: &str) -> RagResult<EmbeddingVector> {
    if text.chars().count() <= MAX_QUERY_CHARS {
        return embedder
            .embed(&[text.to_string()])?
            .pop()
            .ok_or_else(|| RagError::Embedding("embedder returned no vector".into()));
    }

    let chunker = RecursiveChunker::new(MAX_QUERY_CHARS, MAX_QUERY_CHARS / 10)?;
    let windows: Vec<String> = chunker
        .split_text(text)?
        .into_iter()
        .map(|(_, window)| window.to_string())
        .collect();
    let weights: Vec<f32> = windows.iter().map(|w| w.len() as f32).collect();
    let embeddings = embedder.embed(&windows)?;
    vector_mean::mean(embeddings, weights)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Encodes text length in the first component and counts calls.
    struct LengthEmbedder {
        calls: AtomicUsize,
    }

    impl Embedder for LengthEmbedder {
        fn embed(&self, texts: &[String]) -> RagResult<Vec<EmbeddingVector>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(texts.iter().map(|t| vec![t.len() as f32, 1.0]).collect())
        }

        fn dimension(&self) -> usize {
            2
        }
    }

    #[test]
    fn short_query_is_embedded_directly() {
        let embedder = LengthEmbedder {
            calls: AtomicUsize::new(0),
        };
        let v = embed_query(&embedder, "what is anemia?").unwrap();
        assert_eq!(v, vec![15.0, 1.0]);
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn long_query_is_averaged_over_windows() {
        let embedder = LengthEmbedder {
            calls: AtomicUsize::new(0),
        };
        let question = "symptom ".repeat(MAX_QUERY_CHARS / 4);
        let v = embed_query(&embedder, &question).unwrap();
        assert_eq!(v.len(), 2);
        assert!((v[1] - 1.0).abs() < 1e-6);
        assert!(v[0] <= MAX_QUERY_CHARS as f32);
    }

    #[test]
    fn shape_check_catches_wrong_dimension() {
        let err = check_shape(&[vec![0.0; 3]], 1, 384).unwrap_err();
        assert!(matches!(
            err,
            RagError::DimensionMismatch {
                expected: 384,
                actual: 3
            }
        ));
        assert!(check_shape(&[], 1, 384).is_err());
    }

    #[test]
    #[ignore = "downloads the all-MiniLM-L6-v2 model"]
    fn same_text_embeds_identically() {
        let settings = EmbeddingSettings {
            model_name: crate::all_minilm_l6_v2::MODEL_NAME.into(),
            model_dir: None,
            cache_dir: ".fastembed_cache".into(),
            dimension: 384,
        };
        let embedder = FastEmbedder::new(&settings).unwrap();
        let text = vec!["Aspirin reduces fever.".to_string()];
        let a = embedder.embed(&text).unwrap();
        let b = embedder.embed(&text).unwrap();
        assert_eq!(a, b);
        assert_eq!(a[0].len(), 384);
    }
}
