//! # Repowiki Protocol
//!
//! Data model shared by every stage of the wiki pipeline, plus the pure
//! path rules that run before any external call.
//!
//! ## Contents
//!
//! - [`FileRecord`]: one repository file flowing through a single run
//! - [`Subsystem`]: a named group of file paths, the unit of the final partition
//! - [`WikiPageDraft`] / [`WikiPage`]: what crosses into persistent storage
//! - [`path_filters`]: the build-artifact / lockfile / binary denylist
//! - [`buckets`]: grouping by top-level path segment
//! - [`RepoId`]: repository URL validation

pub mod buckets;
pub mod path_filters;
mod repo;
mod types;

pub use buckets::{buckets_to_json, group_by_top_level, PathBucket};
pub use path_filters::{filter_files, filter_paths, path_allowed};
pub use repo::{RepoId, RepoUrlError};
pub use types::{
    FileRecord, StoredFile, StoredSubsystem, Subsystem, SubsystemId, WikiPage, WikiPageDraft,
    WikiPageId,
};

use serde::Serialize;

pub fn serialize_json<T: Serialize>(value: &T) -> serde_json::Result<String> {
    serde_json::to_string(value)
}

pub fn serialize_json_pretty<T: Serialize>(value: &T) -> serde_json::Result<String> {
    serde_json::to_string_pretty(value)
}
