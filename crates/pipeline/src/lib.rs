//! # Repowiki Pipeline
//!
//! Turns a repository URL into a stored wiki page whose subsystems
//! partition the repository's documentable files.
//!
//! ## Pipeline
//!
//! ```text
//! repo URL ──> RepoId ──> ContentSource
//!     │
//!     ├──> paths:   tree ─> filter ─> bucket by top-level segment ─> label_from_paths
//!     │
//!     ├──> content: snapshot ─> filter ─> select_important (> 50 files)
//!     │               ─> synopsize (≤ 10 in flight) ─> embed (≤ 10 in flight)
//!     │               ─> k-means ─> label_from_cluster (one per cluster)
//!     │
//!     └──> WikiStore::upsert_page (once, at the end of a successful run)
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use repowiki_pipeline::{ContentSource, MemoryStore, PipelineConfig, WikiGenerator};
//! use repowiki_generation::{OpenAiChat, OpenAiChatConfig};
//! use repowiki_vector_store::StubEmbedder;
//! use std::sync::Arc;
//!
//! async fn run(source: Arc<dyn ContentSource>) -> anyhow::Result<()> {
//!     let chat = OpenAiChat::new(OpenAiChatConfig {
//!         api_key: std::env::var("OPENAI_API_KEY")?,
//!         ..Default::default()
//!     })?;
//!     let generator = WikiGenerator::new(
//!         Arc::new(chat),
//!         Arc::new(StubEmbedder::default()),
//!         source,
//!         Arc::new(MemoryStore::new()),
//!         PipelineConfig::default(),
//!     )?;
//!
//!     let id = generator
//!         .generate_from_content("https://github.com/rust-lang/log")
//!         .await?;
//!     println!("wiki page {id}");
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod limits;
mod orchestrator;
mod source;
mod stats;
mod store;

pub use config::PipelineConfig;
pub use error::{ErrorKind, GenerateError, PipelineError, Result};
pub use limits::bounded_map;
pub use orchestrator::{Strategy, SubsystemDetail, WikiGenerator};
pub use source::{blob_paths, ContentSource, EntryKind, TreeEntry};
pub use stats::RunStats;
pub use store::{JsonFileStore, MemoryStore, SubsystemLookup, WikiStore};
