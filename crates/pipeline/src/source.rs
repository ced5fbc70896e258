use crate::error::Result;
use async_trait::async_trait;
use repowiki_protocol::{FileRecord, RepoId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Blob,
    Tree,
}

/// One node of a recursive repository tree listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    pub path: String,
    pub kind: EntryKind,
}

impl TreeEntry {
    pub fn blob(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: EntryKind::Blob,
        }
    }

    pub fn tree(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: EntryKind::Tree,
        }
    }
}

/// File paths (blobs only) of a tree listing, in listing order.
pub fn blob_paths(entries: Vec<TreeEntry>) -> Vec<String> {
    entries
        .into_iter()
        .filter(|entry| entry.kind == EntryKind::Blob)
        .map(|entry| entry.path)
        .collect()
}

/// Remote repository host.
///
/// A repository that does not exist is `PipelineError::NotFound`; a single
/// missing file is `Ok(None)`.
#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn default_branch(&self, repo: &RepoId) -> Result<String>;

    async fn tree(&self, repo: &RepoId, branch: &str) -> Result<Vec<TreeEntry>>;

    async fn file_content(&self, repo: &RepoId, path: &str) -> Result<Option<String>>;

    async fn readme(&self, repo: &RepoId) -> Result<Option<String>>;

    /// Every decoded text file of the branch, paths relative to the
    /// repository root.
    async fn snapshot(&self, repo: &RepoId, branch: &str) -> Result<Vec<FileRecord>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn blob_paths_skip_directories() {
        let entries = vec![
            TreeEntry::tree("src"),
            TreeEntry::blob("src/main.rs"),
            TreeEntry::blob("Cargo.toml"),
        ];
        assert_eq!(blob_paths(entries), vec!["src/main.rs", "Cargo.toml"]);
    }
}
