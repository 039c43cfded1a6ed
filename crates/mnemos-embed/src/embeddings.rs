//! The [`Embedder`] contract and the providers that need no network.
//!
//! # Implementations
//!
//! - [`UnavailableEmbedder`]: the explicit "no provider" implementation
//! - [`MockEmbedder`]: deterministic bag-of-words vectors for tests and offline use
//! - [`OpenAiEmbedder`](crate::OpenAiEmbedder): OpenAI-compatible embeddings API

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{EmbedError, Result};
use crate::openai::{OpenAiEmbedder, OpenAiEmbedderConfig};

// ─────────────────────────────────────────────────────────────────────────────
// Embedder Trait
// ─────────────────────────────────────────────────────────────────────────────

/// Trait for generating text embeddings.
///
/// Callers must treat [`EmbedError::Unavailable`] as a normal outcome and
/// degrade instead of failing.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts in a batch.
    ///
    /// Default implementation calls `embed` for each text sequentially.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// Similarity of two vectors in `[0, 1]`.
    ///
    /// Defaults to cosine similarity with negative values clamped to zero.
    fn similarity(&self, a: &[f32], b: &[f32]) -> f32 {
        cosine_similarity(a, b).clamp(0.0, 1.0)
    }

    /// Get the dimensionality of embeddings produced by this embedder.
    fn dimensions(&self) -> usize;

    /// Get the name of this embedder.
    fn name(&self) -> &str;

    /// Whether calls to `embed` can succeed at all.
    fn is_available(&self) -> bool {
        true
    }
}

/// A shared embedder that can be used across threads.
pub type SharedEmbedder = Arc<dyn Embedder>;

// ─────────────────────────────────────────────────────────────────────────────
// Unavailable Embedder
// ─────────────────────────────────────────────────────────────────────────────

/// Stand-in used when no embedding provider is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableEmbedder;

#[async_trait]
impl Embedder for UnavailableEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(EmbedError::Unavailable(
            "no embedding provider configured".to_string(),
        ))
    }

    fn dimensions(&self) -> usize {
        0
    }

    fn name(&self) -> &str {
        "unavailable"
    }

    fn is_available(&self) -> bool {
        false
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Mock Embedder
// ─────────────────────────────────────────────────────────────────────────────

/// A deterministic embedder based on feature hashing.
///
/// Each lowercase word is hashed into one bucket with a hash-derived sign, so
/// texts that share words get a positive cosine similarity. Useful for
/// exercising semantic linking without a model.
#[derive(Debug, Clone)]
pub struct MockEmbedder {
    dimensions: usize,
}

impl MockEmbedder {
    /// Create a new mock embedder with the specified dimensions.
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    fn vector(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0f32; self.dimensions];
        let lowered = text.to_lowercase();
        for word in lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let hash = simple_hash(word);
            let bucket = (hash % self.dimensions as u64) as usize;
            let sign = if (hash >> 32) & 1 == 0 { 1.0 } else { -1.0 };
            embedding[bucket] += sign;
        }

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut embedding {
                *x /= norm;
            }
        }
        embedding
    }
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.vector(text))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// djb2 string hash.
fn simple_hash(s: &str) -> u64 {
    let mut hash: u64 = 5381;
    for byte in s.bytes() {
        hash = hash.wrapping_mul(33).wrapping_add(byte as u64);
    }
    hash
}

// ─────────────────────────────────────────────────────────────────────────────
// Embedder Factory
// ─────────────────────────────────────────────────────────────────────────────

/// Provider-agnostic description of the embedder to build.
///
/// The binary fills this from its config so this crate does not depend on
/// the config crate.
#[derive(Debug, Clone, Default)]
pub struct EmbedderSpec {
    /// Provider name: "none", "mock", or "openai".
    pub provider: String,
    /// OpenAI API key (required for "openai" provider).
    pub openai_api_key: Option<String>,
    /// OpenAI model name.
    pub openai_model: Option<String>,
    /// OpenAI base URL override.
    pub openai_base_url: Option<String>,
    /// Requested dimensions (for providers that support it).
    pub dimensions: Option<usize>,
}

/// Build a [`SharedEmbedder`] from a spec.
pub fn build_embedder(spec: &EmbedderSpec) -> Result<SharedEmbedder> {
    match spec.provider.as_str() {
        "" | "none" => Ok(Arc::new(UnavailableEmbedder)),
        "mock" => Ok(Arc::new(MockEmbedder::new(spec.dimensions.unwrap_or(256)))),
        "openai" => {
            let api_key = spec.openai_api_key.as_deref().ok_or_else(|| {
                EmbedError::Config(
                    "OpenAI embedding provider requires an API key. \
                     Set OPENAI_API_KEY or configure [embedding.openai] api_key."
                        .to_string(),
                )
            })?;
            let mut config = OpenAiEmbedderConfig::new(api_key);
            if let Some(ref model) = spec.openai_model {
                config = config.with_model(model);
            }
            if let Some(ref base_url) = spec.openai_base_url {
                config = config.with_base_url(base_url);
            }
            if let Some(dimensions) = spec.dimensions {
                config = config.with_dimensions(dimensions);
            }
            Ok(Arc::new(OpenAiEmbedder::new(config)?))
        }
        other => Err(EmbedError::Config(format!(
            "Unknown embedding provider '{}'. Valid: none, mock, openai",
            other
        ))),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Utility Functions
// ─────────────────────────────────────────────────────────────────────────────

/// Calculate cosine similarity between two embeddings.
///
/// Mismatched lengths and zero vectors give `0.0`.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a > 0.0 && norm_b > 0.0 {
        dot / (norm_a * norm_b)
    } else {
        0.0
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_embedder() {
        let embedder = MockEmbedder::default();
        assert_eq!(embedder.dimensions(), 256);
        assert_eq!(embedder.name(), "mock");

        let embedding = embedder.embed("hello world").await.unwrap();
        assert_eq!(embedding.len(), 256);

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 0.001);
    }

    #[tokio::test]
    async fn test_mock_embedder_deterministic() {
        let embedder = MockEmbedder::new(128);
        let a = embedder.embed("test text").await.unwrap();
        let b = embedder.embed("test text").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_mock_embedder_shared_words_are_similar() {
        let embedder = MockEmbedder::new(1024);
        let a = embedder
            .embed("Python function to calculate fibonacci")
            .await
            .unwrap();
        let b = embedder
            .embed("Function that computes fibonacci numbers in Python")
            .await
            .unwrap();
        let c = embedder.embed("quarterly tax paperwork").await.unwrap();

        let related = embedder.similarity(&a, &b);
        let unrelated = embedder.similarity(&a, &c);
        assert!(related > 0.3, "related similarity was {related}");
        assert!(related > unrelated);
    }

    #[tokio::test]
    async fn test_mock_embedder_empty_text() {
        let embedder = MockEmbedder::new(16);
        let v = embedder.embed("").await.unwrap();
        assert!(v.iter().all(|x| *x == 0.0));
    }

    #[tokio::test]
    async fn test_unavailable_embedder() {
        let embedder = UnavailableEmbedder;
        assert!(!embedder.is_available());
        let err = embedder.embed("anything").await.unwrap_err();
        assert!(err.is_unavailable());
    }

    #[tokio::test]
    async fn test_embed_batch_default() {
        let embedder = MockEmbedder::new(32);
        let batch = embedder.embed_batch(&["one", "two"]).await.unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0], embedder.embed("one").await.unwrap());
    }

    #[test]
    fn test_similarity_clamped() {
        let embedder = MockEmbedder::new(2);
        assert_eq!(embedder.similarity(&[1.0, 0.0], &[-1.0, 0.0]), 0.0);
        assert!((embedder.similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
        assert_eq!(cosine_similarity(&a, &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[0.0, 0.0]), 0.0);
    }

    #[test]
    fn test_build_embedder() {
        let none = build_embedder(&EmbedderSpec::default()).unwrap();
        assert!(!none.is_available());

        let mock = build_embedder(&EmbedderSpec {
            provider: "mock".to_string(),
            dimensions: Some(64),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(mock.dimensions(), 64);

        let missing_key = build_embedder(&EmbedderSpec {
            provider: "openai".to_string(),
            ..Default::default()
        });
        assert!(matches!(missing_key, Err(EmbedError::Config(_))));

        let unknown = build_embedder(&EmbedderSpec {
            provider: "onnx".to_string(),
            ..Default::default()
        });
        assert!(matches!(unknown, Err(EmbedError::Config(_))));
    }
}
