//! Embedding providers for the mnemos memory engine.
//!
//! The engine only needs two things from a provider: a vector for a piece of
//! text, and a similarity score in `[0, 1]` between two vectors. Every
//! provider implements [`Embedder`]; when nothing is configured the engine is
//! handed an [`UnavailableEmbedder`] and skips semantic linking and search.
//!
//! ```rust
//! use mnemos_embed::{Embedder, MockEmbedder};
//!
//! let embedder = MockEmbedder::new(64);
//! assert!(embedder.is_available());
//! assert_eq!(embedder.similarity(&[1.0, 0.0], &[1.0, 0.0]), 1.0);
//! ```

pub mod embeddings;
pub mod error;
pub mod openai;

pub use embeddings::{
    build_embedder, cosine_similarity, Embedder, EmbedderSpec, MockEmbedder, SharedEmbedder,
    UnavailableEmbedder,
};
pub use error::{EmbedError, Result};
pub use openai::{OpenAiEmbedder, OpenAiEmbedderConfig};
