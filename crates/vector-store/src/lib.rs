//! # Repowiki Vector Store
//!
//! Embedding capability and vector clustering for the content-based
//! strategy.
//!
//! ## Architecture
//!
//! ```text
//! synopsis[]
//!     │
//!     ├──> EmbeddingCapability (OpenAI / stub)
//!     │      └─> Vec<f32>[dim]
//!     │
//!     └──> KMeans (K = clamp(N/5, 2, 8))
//!            └─> assignment[i] ∈ 0..K, centroids[K]
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use repowiki_vector_store::{EmbeddingCapability, KMeans, KSelection, StubEmbedder};
//!
//! #[tokio::main]
//! async fn main() -> repowiki_vector_store::Result<()> {
//!     let embedder = StubEmbedder::default();
//!     let mut vectors = Vec::new();
//!     for text in ["Parses CLI flags", "Stores wiki pages", "Talks to GitHub"] {
//!         vectors.push(embedder.embed(text).await?);
//!     }
//!
//!     let clustering = KMeans::default().cluster_adaptive(&vectors, &KSelection::default())?;
//!     println!("{} clusters", clustering.k());
//!     Ok(())
//! }
//! ```

mod embeddings;
mod error;
mod kmeans;
mod openai;
mod types;

pub use embeddings::{
    ensure_uniform_dimension, normalize, EmbeddingCapability, EmbeddingMode, StubEmbedder,
};
pub use error::{Result, VectorStoreError};
pub use kmeans::{KMeans, KSelection};
pub use openai::{OpenAiEmbedder, OpenAiEmbedderConfig};
pub use types::{Cluster, Clustering};
