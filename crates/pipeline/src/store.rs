//! Wiki page persistence.
//!
//! A page owns its subsystems and file records. Regenerating a page keeps
//! its id and replaces everything it owns in one step.

use crate::error::{PipelineError, Result};
use async_trait::async_trait;
use repowiki_protocol::{
    StoredSubsystem, SubsystemId, WikiPage, WikiPageDraft, WikiPageId,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

/// A subsystem together with the repository its page documents.
#[derive(Debug, Clone, PartialEq)]
pub struct SubsystemLookup {
    pub subsystem: StoredSubsystem,
    pub repo_url: String,
}

#[async_trait]
pub trait WikiStore: Send + Sync {
    async fn find_page_by_repo_url(&self, repo_url: &str) -> Result<Option<WikiPage>>;

    async fn create_page(&self, draft: WikiPageDraft) -> Result<WikiPageId>;

    /// Overwrites the page fields and swaps all subsystems and files for the
    /// draft's. Subsystems get fresh ids.
    async fn replace_page(&self, id: WikiPageId, draft: WikiPageDraft) -> Result<()>;

    async fn find_subsystem(&self, id: SubsystemId) -> Result<Option<SubsystemLookup>>;

    async fn update_subsystem_summary(&self, id: SubsystemId, summary: &str) -> Result<()>;

    /// Creates the page for `draft.repo_url`, or replaces the existing one.
    async fn upsert_page(&self, draft: WikiPageDraft) -> Result<WikiPageId> {
        match self.find_page_by_repo_url(&draft.repo_url).await? {
            Some(page) => {
                self.replace_page(page.id, draft).await?;
                Ok(page.id)
            }
            None => self.create_page(draft).await,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoreDocument {
    last_page_id: WikiPageId,
    last_subsystem_id: SubsystemId,
    pages: Vec<WikiPage>,
}

impl StoreDocument {
    fn find_page(&self, repo_url: &str) -> Option<&WikiPage> {
        self.pages.iter().find(|page| page.repo_url == repo_url)
    }

    fn materialize(&mut self, id: WikiPageId, draft: WikiPageDraft) -> WikiPage {
        let subsystems = draft
            .subsystems
            .into_iter()
            .map(|subsystem| {
                self.last_subsystem_id += 1;
                StoredSubsystem {
                    id: self.last_subsystem_id,
                    page_id: id,
                    subsystem,
                }
            })
            .collect();
        WikiPage {
            id,
            repo_url: draft.repo_url,
            branch: draft.branch,
            title: draft.title,
            summary: draft.summary,
            short_summary: draft.short_summary,
            subsystems,
            files: draft.files,
        }
    }

    fn create(&mut self, draft: WikiPageDraft) -> Result<WikiPageId> {
        if self.find_page(&draft.repo_url).is_some() {
            return Err(PipelineError::StoreError(format!(
                "a page for {} already exists",
                draft.repo_url
            )));
        }
        self.last_page_id += 1;
        let id = self.last_page_id;
        let page = self.materialize(id, draft);
        self.pages.push(page);
        Ok(id)
    }

    fn upsert(&mut self, draft: WikiPageDraft) -> Result<WikiPageId> {
        match self.find_page(&draft.repo_url).map(|page| page.id) {
            Some(id) => self.replace(id, draft).map(|()| id),
            None => self.create(draft),
        }
    }

    fn replace(&mut self, id: WikiPageId, draft: WikiPageDraft) -> Result<()> {
        let position = self
            .pages
            .iter()
            .position(|page| page.id == id)
            .ok_or_else(|| PipelineError::NotFound(format!("wiki page {id}")))?;
        let page = self.materialize(id, draft);
        self.pages[position] = page;
        Ok(())
    }

    fn find_subsystem(&self, id: SubsystemId) -> Option<SubsystemLookup> {
        self.pages.iter().find_map(|page| {
            page.subsystems
                .iter()
                .find(|stored| stored.id == id)
                .map(|stored| SubsystemLookup {
                    subsystem: stored.clone(),
                    repo_url: page.repo_url.clone(),
                })
        })
    }

    fn update_summary(&mut self, id: SubsystemId, summary: &str) -> Result<()> {
        let stored = self
            .pages
            .iter_mut()
            .flat_map(|page| page.subsystems.iter_mut())
            .find(|stored| stored.id == id)
            .ok_or_else(|| PipelineError::NotFound(format!("subsystem {id}")))?;
        stored.subsystem.summary = Some(summary.to_string());
        Ok(())
    }
}

/// Process-local store, lost on exit.
#[derive(Debug, Default)]
pub struct MemoryStore {
    document: RwLock<StoreDocument>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn page_count(&self) -> usize {
        self.document.read().await.pages.len()
    }
}

#[async_trait]
impl WikiStore for MemoryStore {
    async fn find_page_by_repo_url(&self, repo_url: &str) -> Result<Option<WikiPage>> {
        Ok(self.document.read().await.find_page(repo_url).cloned())
    }

    async fn create_page(&self, draft: WikiPageDraft) -> Result<WikiPageId> {
        self.document.write().await.create(draft)
    }

    async fn replace_page(&self, id: WikiPageId, draft: WikiPageDraft) -> Result<()> {
        self.document.write().await.replace(id, draft)
    }

    async fn upsert_page(&self, draft: WikiPageDraft) -> Result<WikiPageId> {
        self.document.write().await.upsert(draft)
    }

    async fn find_subsystem(&self, id: SubsystemId) -> Result<Option<SubsystemLookup>> {
        Ok(self.document.read().await.find_subsystem(id))
    }

    async fn update_subsystem_summary(&self, id: SubsystemId, summary: &str) -> Result<()> {
        self.document.write().await.update_summary(id, summary)
    }
}

/// Whole-document JSON file. Every mutation rewrites the file through a
/// temp file and a rename, so readers never see a partial document.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    document: Arc<RwLock<StoreDocument>>,
}

impl JsonFileStore {
    /// Opens `path`, starting empty when the file does not exist yet.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let document = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => StoreDocument::default(),
            Err(err) => return Err(err.into()),
        };
        log::debug!("Opened wiki store at {}", path.display());
        Ok(Self {
            path,
            document: Arc::new(RwLock::new(document)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Applies `change` to a copy, persists it, then publishes it. A failed
    /// write leaves both disk and memory untouched.
    ///
    /// Persist and publish run in their own task while holding the write
    /// lock, so dropping the caller (run timeout) cannot split disk from
    /// memory.
    async fn mutate<T: Send + 'static>(
        &self,
        change: impl FnOnce(&mut StoreDocument) -> Result<T> + Send + 'static,
    ) -> Result<T> {
        let mut guard = Arc::clone(&self.document).write_owned().await;
        let mut next = guard.clone();
        let value = change(&mut next)?;
        let path = self.path.clone();
        tokio::spawn(async move {
            persist(&path, &next).await?;
            *guard = next;
            Ok(value)
        })
        .await
        .map_err(|err| PipelineError::StoreError(format!("store write task failed: {err}")))?
    }
}

async fn persist(path: &Path, document: &StoreDocument) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    let json = serde_json::to_vec_pretty(document)?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, json).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

#[async_trait]
impl WikiStore for JsonFileStore {
    async fn find_page_by_repo_url(&self, repo_url: &str) -> Result<Option<WikiPage>> {
        Ok(self.document.read().await.find_page(repo_url).cloned())
    }

    async fn create_page(&self, draft: WikiPageDraft) -> Result<WikiPageId> {
        self.mutate(move |document| document.create(draft)).await
    }

    async fn replace_page(&self, id: WikiPageId, draft: WikiPageDraft) -> Result<()> {
        self.mutate(move |document| document.replace(id, draft)).await
    }

    async fn upsert_page(&self, draft: WikiPageDraft) -> Result<WikiPageId> {
        self.mutate(move |document| document.upsert(draft)).await
    }

    async fn find_subsystem(&self, id: SubsystemId) -> Result<Option<SubsystemLookup>> {
        Ok(self.document.read().await.find_subsystem(id))
    }

    async fn update_subsystem_summary(&self, id: SubsystemId, summary: &str) -> Result<()> {
        let summary = summary.to_string();
        self.mutate(move |document| document.update_summary(id, &summary))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use repowiki_protocol::{StoredFile, Subsystem};
    use tempfile::TempDir;

    fn draft(url: &str, titles: &[&str]) -> WikiPageDraft {
        WikiPageDraft {
            repo_url: url.to_string(),
            branch: "main".to_string(),
            title: "acme/widgets".to_string(),
            summary: "Widgets.".to_string(),
            short_summary: "Widgets".to_string(),
            subsystems: titles
                .iter()
                .map(|t| Subsystem::new(*t, "", vec![format!("{t}.rs")]))
                .collect(),
            files: vec![StoredFile {
                path: "a.rs".to_string(),
                synopsis: "A.".to_string(),
                embedding: None,
            }],
        }
    }

    #[tokio::test]
    async fn upsert_keeps_page_id_and_replaces_children() {
        let store = MemoryStore::new();
        let url = "https://github.com/acme/widgets";

        let first = store.upsert_page(draft(url, &["Core", "Cli"])).await.unwrap();
        let mut second_draft = draft(url, &["Storage"]);
        second_draft.files.clear();
        let second = store.upsert_page(second_draft).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(store.page_count().await, 1);
        let page = store.find_page_by_repo_url(url).await.unwrap().unwrap();
        let titles: Vec<&str> = page.subsystems.iter().map(|s| s.subsystem.title.as_str()).collect();
        assert_eq!(titles, vec!["Storage"]);
        assert!(page.files.is_empty());
        // Replaced subsystems are gone for good.
        assert!(store.find_subsystem(1).await.unwrap().is_none());
        assert_eq!(page.subsystems[0].id, 3);
    }

    #[tokio::test]
    async fn summary_update_targets_one_subsystem() {
        let store = MemoryStore::new();
        store
            .create_page(draft("https://github.com/acme/widgets", &["Core", "Cli"]))
            .await
            .unwrap();

        store.update_subsystem_summary(2, "# Cli").await.unwrap();
        let lookup = store.find_subsystem(2).await.unwrap().unwrap();
        assert_eq!(lookup.subsystem.subsystem.summary.as_deref(), Some("# Cli"));
        assert_eq!(lookup.repo_url, "https://github.com/acme/widgets");

        let missing = store.update_subsystem_summary(99, "x").await;
        assert!(matches!(missing, Err(PipelineError::NotFound(_))));
    }

    #[tokio::test]
    async fn json_store_survives_reopen() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("nested").join("wiki.json");
        let url = "https://github.com/acme/widgets";

        let store = JsonFileStore::open(&path).await.expect("open");
        let id = store.create_page(draft(url, &["Core"])).await.expect("create");
        store.update_subsystem_summary(1, "deep").await.expect("update");
        drop(store);

        let reopened = JsonFileStore::open(&path).await.expect("reopen");
        let page = reopened
            .find_page_by_repo_url(url)
            .await
            .expect("find")
            .expect("page");
        assert_eq!(page.id, id);
        assert_eq!(page.subsystems[0].subsystem.summary.as_deref(), Some("deep"));

        let next = reopened
            .create_page(draft("https://github.com/acme/gadgets", &["Io"]))
            .await
            .expect("create second");
        assert_eq!(next, id + 1);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn concurrent_upserts_of_one_repo_share_a_page() {
        let url = "https://github.com/acme/widgets";
        let memory = MemoryStore::new();
        let temp = TempDir::new().expect("tempdir");
        let file = JsonFileStore::open(temp.path().join("wiki.json"))
            .await
            .expect("open");

        let stores: [&dyn WikiStore; 2] = [&memory, &file];
        for store in stores {
            let ids = futures::future::join_all(
                (0..8).map(|_| store.upsert_page(draft(url, &["Core"]))),
            )
            .await
            .into_iter()
            .collect::<Result<Vec<_>>>()
            .expect("every upsert succeeds");
            assert!(ids.iter().all(|id| *id == ids[0]));
        }
        assert_eq!(memory.page_count().await, 1);
    }

    #[tokio::test]
    async fn cancelled_write_still_lands_on_disk_and_in_memory() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("wiki.json");
        let url = "https://github.com/acme/widgets";
        let store = JsonFileStore::open(&path).await.expect("open");

        let _ = tokio::time::timeout(
            std::time::Duration::ZERO,
            store.create_page(draft(url, &["Core"])),
        )
        .await;

        // The read lock waits for the detached commit to release the write lock.
        let in_memory = store.find_page_by_repo_url(url).await.expect("find");
        let on_disk = JsonFileStore::open(&path)
            .await
            .expect("reopen")
            .find_page_by_repo_url(url)
            .await
            .expect("find");
        assert!(in_memory.is_some());
        assert_eq!(in_memory, on_disk);
    }

    #[tokio::test]
    async fn duplicate_create_is_refused() {
        let store = MemoryStore::new();
        let url = "https://github.com/acme/widgets";
        store.create_page(draft(url, &[])).await.unwrap();
        assert!(store.create_page(draft(url, &[])).await.is_err());
    }
}
