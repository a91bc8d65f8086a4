//! Embedding-based similarity and coherence.

use anyhow::{ensure, Result};

use crate::traits::Embedder;

/// Cosine similarity of two vectors, computed in f64.
///
/// Returns 0.0 when either vector has zero norm or the dimensions disagree.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (x as f64, y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

async fn embed_exact(embedder: &dyn Embedder, texts: &[String]) -> Result<Vec<Vec<f32>>> {
    let vectors = embedder.embed(texts).await?;
    ensure!(
        vectors.len() == texts.len(),
        "{} returned {} embeddings for {} inputs",
        embedder.name(),
        vectors.len(),
        texts.len()
    );
    Ok(vectors)
}

/// Semantic similarity of two texts, in [-1, 1].
pub async fn similarity(embedder: &dyn Embedder, a: &str, b: &str) -> Result<f64> {
    let vectors = embed_exact(embedder, &[a.to_string(), b.to_string()]).await?;
    Ok(cosine_similarity(&vectors[0], &vectors[1]))
}

/// Local coherence: mean similarity of consecutive sentences, each pair
/// clamped to [0, 1]. Fewer than two sentences are vacuously coherent.
pub async fn coherence(embedder: &dyn Embedder, sentences: &[String]) -> Result<f64> {
    if sentences.len() < 2 {
        return Ok(1.0);
    }
    let vectors = embed_exact(embedder, sentences).await?;
    let pairs: Vec<f64> = vectors
        .windows(2)
        .map(|w| cosine_similarity(&w[0], &w[1]).clamp(0.0, 1.0))
        .collect();
    Ok(pairs.iter().sum::<f64>() / pairs.len() as f64)
}
