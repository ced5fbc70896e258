//! # Repowiki Generation
//!
//! Everything that talks to a language model: the [`TextGeneration`]
//! capability, the fixed prompts, and the validation that turns untrusted
//! model output into typed, checked values.
//!
//! ## Architecture
//!
//! ```text
//! FileRecord[] ──> select_important ──> subset (known paths only, ≤ cap)
//!      │
//!      ├──> synopsize ──> synopsis per file
//!      │
//!      ├──> label_from_paths(buckets, readme) ──> partition::enforce ──> Subsystem[]
//!      │
//!      └──> label_from_cluster(members) ──> ClusterLabel | fallback_label
//!
//! README ──> summarize_readme ──> short_summary
//! Subsystem files ──> summarize_subsystem ──> markdown (+ mermaid)
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use repowiki_generation::{label_from_paths, LabelerOptions, OpenAiChat, OpenAiChatConfig};
//! use repowiki_protocol::group_by_top_level;
//!
//! #[tokio::main]
//! async fn main() -> repowiki_generation::Result<()> {
//!     let chat = OpenAiChat::new(OpenAiChatConfig {
//!         api_key: std::env::var("OPENAI_API_KEY").unwrap_or_default(),
//!         ..Default::default()
//!     })?;
//!
//!     let buckets = group_by_top_level(["src/main.rs", "src/cli.rs", "docs/guide.md"]);
//!     let subsystems =
//!         label_from_paths(&chat, &buckets, "A CLI tool.", &LabelerOptions::default()).await;
//!     for subsystem in subsystems {
//!         println!("{}: {:?}", subsystem.title, subsystem.files);
//!     }
//!     Ok(())
//! }
//! ```

mod capability;
mod error;
mod importance;
mod labeler;
mod openai;
mod parse;
pub mod partition;
pub mod prompts;
mod summary;
mod synopsis;

pub use capability::{GenerationRequest, GenerationResponse, TextGeneration};
pub use error::{GenerationError, Result};
pub use importance::{select_important, ImportanceOptions};
pub use labeler::{
    fallback_label, label_from_cluster, label_from_paths, ClusterLabel, ClusterLabelFallback,
    ClusterMember, LabelerOptions,
};
pub use openai::{OpenAiChat, OpenAiChatConfig};
pub use parse::parse_json;
pub use partition::{OrphanPolicy, PartitionReport, PartitionRules};
pub use summary::{short_summary, summarize_readme, summarize_subsystem, SourceFile};
pub use synopsis::{synopsize, SynopsisOptions};
