use ndarray::{Array, Array2, Axis};
use ndarray_stats::SummaryStatisticsExt;

use crate::error::{RagError, RagResult};

/// Weighted mean of equally sized embeddings, e.g. one vector per window of
/// a long query weighted by window length.
pub fn mean(embeddings: Vec<Vec<f32>>, weights: Vec<f32>) -> RagResult<Vec<f32>> {
    let num_embeddings = embeddings.len();
    let embedding_dim = embeddings
        .first()
        .map(Vec::len)
        .ok_or_else(|| RagError::Embedding("cannot average zero embeddings".into()))?;
    if weights.len() != num_embeddings {
        return Err(RagError::Embedding(format!(
            "{} weights for {} embeddings",
            weights.len(),
            num_embeddings
        )));
    }
    if let Some(bad) = embeddings.iter().find(|e| e.len() != embedding_dim) {
        return Err(RagError::DimensionMismatch {
            expected: embedding_dim,
            actual: bad.len(),
        });
    }

    let flat_embeddings: Vec<f32> = embeddings.into_iter().flatten().collect();
    let array = Array2::from_shape_vec((num_embeddings, embedding_dim), flat_embeddings)
        .map_err(|e| RagError::Embedding(e.to_string()))?;

    let weights = Array::from_vec(weights);
    let mean_embedding = array
        .weighted_mean_axis(Axis(0), &weights)
        .map_err(|e| RagError::Embedding(format!("error computing mean: {e}")))?;

    let (v, _) = mean_embedding.into_raw_vec_and_offset();
    Ok(v)
}
