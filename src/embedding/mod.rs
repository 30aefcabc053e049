//! Embedding provider with bounded per-text memoization.
//!
//! - `Embedder`: seam for the remote embedding call
//! - `OpenRouterEmbedder`: reqwest-backed client for the embeddings API
//! - `CachedEmbedder`: LRU memoization for the save path

mod cache;
mod provider;

pub use cache::CachedEmbedder;
pub use provider::{Embedder, OpenRouterEmbedder};
