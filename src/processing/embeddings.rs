//! Embedding providers: text in, unit-normalized fixed-dimension vectors out

use crate::config::{EmbeddingBackend, EmbeddingConfig};
use crate::error::{Result, SkillFitError};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// The embedding model as the matching core sees it.
///
/// Implementations must return vectors of exactly `dimension()` entries with
/// unit L2 norm, so inner product equals cosine similarity downstream.
pub trait EmbeddingProvider: Send + Sync {
    fn dimension(&self) -> usize;

    fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    fn encode_single(&self, text: &str) -> Result<Vec<f32>> {
        self.encode_batch(&[text.to_string()])?
            .pop()
            .ok_or_else(|| SkillFitError::Embedding("Provider returned no vector".to_string()))
    }
}

/// Build the provider selected in the configuration
pub fn provider_from_config(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    match config.backend {
        EmbeddingBackend::Hashing => Ok(Arc::new(HashingEmbedder::new(config.dimension))),
        #[cfg(feature = "model2vec")]
        EmbeddingBackend::Model2Vec => Ok(Arc::new(Model2VecEmbedder::from_pretrained(
            &config.model,
            config.batch_size,
        )?)),
        #[cfg(not(feature = "model2vec"))]
        EmbeddingBackend::Model2Vec => Err(SkillFitError::Configuration(
            "Model2Vec backend requires building with the `model2vec` feature".to_string(),
        )),
    }
}

/// Scale a vector to unit length in place. Zero vectors are left untouched.
pub fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in vector.iter_mut() {
            *x /= norm;
        }
    }
}

/// Inner product of two equal-length vectors
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Deterministic offline embedder based on signed feature hashing.
///
/// Features are the lower-cased whole string plus padded character n-grams,
/// so case variants collapse to the same vector and near spellings share most
/// of their mass. Empty input maps to the zero vector.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimension: usize,
    ngram_sizes: Vec<usize>,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
            ngram_sizes: vec![2, 3, 4],
        }
    }

    fn embed(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        let normalized = text.trim().to_lowercase();
        if normalized.is_empty() {
            return vector;
        }

        // Whole-string feature weighs as much as all n-grams of one size
        self.accumulate(&mut vector, &format!("w:{}", normalized), 2.0);

        let padded: Vec<char> = format!("<{}>", normalized).chars().collect();
        for &n in &self.ngram_sizes {
            if padded.len() < n {
                continue;
            }
            for window in padded.windows(n) {
                let gram: String = window.iter().collect();
                self.accumulate(&mut vector, &format!("{}:{}", n, gram), 1.0);
            }
        }

        l2_normalize(&mut vector);
        vector
    }

    fn accumulate(&self, vector: &mut [f32], feature: &str, weight: f32) {
        let mut hasher = DefaultHasher::new();
        feature.hash(&mut hasher);
        let hash = hasher.finish();

        let bucket = (hash % self.dimension as u64) as usize;
        let sign = if (hash >> 63) & 1 == 0 { 1.0 } else { -1.0 };
        vector[bucket] += sign * weight;
    }
}

impl EmbeddingProvider for HashingEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed(t)).collect())
    }
}

/// Model2Vec static embeddings, loaded from a local folder or the HF hub
#[cfg(feature = "model2vec")]
pub struct Model2VecEmbedder {
    model: model2vec_rs::model::StaticModel,
    dimension: usize,
    batch_size: usize,
}

#[cfg(feature = "model2vec")]
use anyhow::Context;

#[cfg(feature = "model2vec")]
impl Model2VecEmbedder {
    pub fn from_pretrained(repo_or_path: &str, batch_size: usize) -> Result<Self> {
        let start_time = std::time::Instant::now();
        log::info!("Loading Model2Vec embedding model from: {}", repo_or_path);

        let model = model2vec_rs::model::StaticModel::from_pretrained(
            repo_or_path,
            None,       // token
            Some(true), // normalize
            None,       // subfolder
        )
        .with_context(|| format!("Failed to load model from {}", repo_or_path))?;

        let dimension = model.encode_single("dimension check").len();
        if dimension == 0 {
            return Err(SkillFitError::Embedding(
                "Model produced empty embeddings".to_string(),
            ));
        }

        log::info!(
            "Model loaded in {:.2?} (dim={})",
            start_time.elapsed(),
            dimension
        );

        Ok(Self {
            model,
            dimension,
            batch_size: batch_size.max(1),
        })
    }
}

#[cfg(feature = "model2vec")]
impl EmbeddingProvider for Model2VecEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            for mut embedding in self.model.encode(batch) {
                if embedding.len() != self.dimension {
                    return Err(SkillFitError::DimensionMismatch {
                        expected: self.dimension,
                        actual: embedding.len(),
                    });
                }
                l2_normalize(&mut embedding);
                results.push(embedding);
            }
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(v: &[f32]) -> f32 {
        v.iter().map(|x| x * x).sum::<f32>().sqrt()
    }

    #[test]
    fn test_hashing_embedder_is_unit_norm() {
        let embedder = HashingEmbedder::new(64);
        let vectors = embedder
            .encode_batch(&["Python".to_string(), "Machine Learning".to_string()])
            .unwrap();

        assert_eq!(vectors.len(), 2);
        for v in &vectors {
            assert_eq!(v.len(), 64);
            assert!((norm(v) - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_hashing_embedder_case_insensitive_and_deterministic() {
        let embedder = HashingEmbedder::new(128);
        let a = embedder.encode_single("Kubernetes").unwrap();
        let b = embedder.encode_single("  kubernetes ").unwrap();
        let c = HashingEmbedder::new(128).encode_single("KUBERNETES").unwrap();

        assert!((dot(&a, &b) - 1.0).abs() < 1e-5);
        assert_eq!(a, c);
    }

    #[test]
    fn test_near_spelling_scores_higher_than_unrelated() {
        let embedder = HashingEmbedder::new(384);
        let base = embedder.encode_single("javascript").unwrap();
        let typo = embedder.encode_single("javascrpt").unwrap();
        let other = embedder.encode_single("photoshop").unwrap();

        assert!(dot(&base, &typo) > dot(&base, &other));
    }

    #[test]
    fn test_empty_text_is_zero_vector() {
        let embedder = HashingEmbedder::new(16);
        let v = embedder.encode_single("   ").unwrap();
        assert!(v.iter().all(|x| *x == 0.0));
    }

    #[test]
    fn test_l2_normalize() {
        let mut v = vec![3.0, 4.0];
        l2_normalize(&mut v);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);

        let mut zero = vec![0.0, 0.0];
        l2_normalize(&mut zero);
        assert_eq!(zero, vec![0.0, 0.0]);
    }

    #[test]
    fn test_provider_from_config_hashing() {
        let config = crate::config::Config::default();
        let provider = provider_from_config(&config.embedding).unwrap();
        assert_eq!(provider.dimension(), config.embedding.dimension);
    }
}
