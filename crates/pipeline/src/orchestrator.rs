use crate::config::PipelineConfig;
use crate::error::{GenerateError, PipelineError, Result};
use crate::limits::bounded_map;
use crate::source::{blob_paths, ContentSource};
use crate::stats::RunStats;
use crate::store::WikiStore;
use futures::future::join_all;
use repowiki_generation::{
    fallback_label, label_from_cluster, label_from_paths, select_important, short_summary,
    summarize_readme, summarize_subsystem, synopsize, ClusterLabelFallback, ClusterMember,
    SourceFile, TextGeneration,
};
use repowiki_protocol::{
    filter_files, filter_paths, group_by_top_level, FileRecord, RepoId, StoredFile, Subsystem,
    SubsystemId, WikiPageDraft, WikiPageId,
};
use repowiki_vector_store::{ensure_uniform_dimension, EmbeddingCapability, KMeans};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

/// Which clustering pipeline a run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Group by top-level path segment, label in one request
    #[default]
    Paths,
    /// Synopsis, embedding, k-means, one label per cluster
    Content,
}

impl Strategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Paths => "paths",
            Self::Content => "content",
        }
    }
}

/// Result of a subsystem deep dive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubsystemDetail {
    pub subsystem_id: SubsystemId,
    pub summary: String,
    pub files_processed: usize,
    pub total_files: usize,
}

/// Drives both pipelines end to end.
///
/// All external capabilities are injected; one instance is shared by every
/// request of the process.
#[derive(Clone)]
pub struct WikiGenerator {
    generator: Arc<dyn TextGeneration>,
    embedder: Arc<dyn EmbeddingCapability>,
    source: Arc<dyn ContentSource>,
    store: Arc<dyn WikiStore>,
    config: PipelineConfig,
    kmeans: KMeans,
}

impl WikiGenerator {
    pub fn new(
        generator: Arc<dyn TextGeneration>,
        embedder: Arc<dyn EmbeddingCapability>,
        source: Arc<dyn ContentSource>,
        store: Arc<dyn WikiStore>,
        config: PipelineConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            generator,
            embedder,
            source,
            store,
            config,
            kmeans: KMeans::default(),
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub async fn generate(
        &self,
        repo_url: &str,
        strategy: Strategy,
    ) -> std::result::Result<WikiPageId, GenerateError> {
        match strategy {
            Strategy::Paths => self.generate_from_paths(repo_url).await,
            Strategy::Content => self.generate_from_content(repo_url).await,
        }
    }

    /// Structural strategy: filter, bucket by top-level segment, label once.
    pub async fn generate_from_paths(
        &self,
        repo_url: &str,
    ) -> std::result::Result<WikiPageId, GenerateError> {
        let repo = RepoId::parse(repo_url).map_err(PipelineError::from)?;
        Ok(self.within_budget(self.run_paths(repo)).await?)
    }

    /// Content strategy: filter, select, synopsize, embed, cluster, label.
    pub async fn generate_from_content(
        &self,
        repo_url: &str,
    ) -> std::result::Result<WikiPageId, GenerateError> {
        let repo = RepoId::parse(repo_url).map_err(PipelineError::from)?;
        Ok(self.within_budget(self.run_content(repo)).await?)
    }

    /// Markdown deep dive for one stored subsystem; persisted on success.
    pub async fn generate_subsystem_detail(
        &self,
        subsystem_id: SubsystemId,
    ) -> std::result::Result<SubsystemDetail, GenerateError> {
        Ok(self.within_budget(self.run_detail(subsystem_id)).await?)
    }

    async fn within_budget<T>(&self, run: impl Future<Output = Result<T>>) -> Result<T> {
        match self.config.run_timeout() {
            Some(budget) => tokio::time::timeout(budget, run)
                .await
                .map_err(|_| PipelineError::Timeout(budget))?,
            None => run.await,
        }
    }

    async fn run_paths(&self, repo: RepoId) -> Result<WikiPageId> {
        let started = Instant::now();
        let mut stats = RunStats::new();
        log::info!("Generating wiki for {repo} (paths)");

        let branch = self.source.default_branch(&repo).await?;
        let listed = blob_paths(self.source.tree(&repo, &branch).await?);
        stats.files_listed = listed.len();
        let paths = filter_paths(listed);
        stats.files_kept = paths.len();
        if paths.is_empty() {
            return Err(PipelineError::NoValidFiles(format!(
                "no documentable files in {repo}"
            )));
        }
        stats.files_selected = paths.len();

        let (summary, short) = self.narrate(&repo).await;
        let buckets = group_by_top_level(&paths);
        log::info!("Labeling {} paths in {} buckets", paths.len(), buckets.len());
        let subsystems = label_from_paths(
            self.generator.as_ref(),
            &buckets,
            &summary,
            &self.config.labeler(),
        )
        .await;
        stats.subsystems = subsystems.len();

        let draft = WikiPageDraft {
            repo_url: repo.canonical_url(),
            branch,
            title: repo.title(),
            summary,
            short_summary: short,
            subsystems,
            files: Vec::new(),
        };
        let id = self.store.upsert_page(draft).await?;

        stats.time_ms = started.elapsed().as_millis() as u64;
        log::info!("Wiki page {id} for {repo}: {stats}");
        Ok(id)
    }

    async fn run_content(&self, repo: RepoId) -> Result<WikiPageId> {
        let started = Instant::now();
        let mut stats = RunStats::new();
        log::info!("Generating wiki for {repo} (content)");

        let branch = self.source.default_branch(&repo).await?;
        let snapshot = self.source.snapshot(&repo, &branch).await?;
        stats.files_listed = snapshot.len();
        let mut files = filter_files(snapshot);
        stats.files_kept = files.len();
        if files.is_empty() {
            return Err(PipelineError::NoValidFiles(format!(
                "no documentable files in {repo}"
            )));
        }

        let importance = self.config.importance();
        if importance.applies_to(files.len()) {
            files = select_important(self.generator.as_ref(), files, &importance).await?;
        }
        stats.files_selected = files.len();

        let (summary, short) = self.narrate(&repo).await;

        stats.synopses_failed = self.synopsize_all(&mut files).await;
        self.embed_all(&mut files).await?;

        let subsystems = self.cluster_and_label(&files, &mut stats).await?;
        stats.subsystems = subsystems.len();

        let stored_files = files
            .into_iter()
            .map(|file| StoredFile {
                path: file.path,
                synopsis: file.synopsis.unwrap_or_default(),
                embedding: file.embedding,
            })
            .collect();
        let draft = WikiPageDraft {
            repo_url: repo.canonical_url(),
            branch,
            title: repo.title(),
            summary,
            short_summary: short,
            subsystems,
            files: stored_files,
        };
        let id = self.store.upsert_page(draft).await?;

        stats.time_ms = started.elapsed().as_millis() as u64;
        log::info!("Wiki page {id} for {repo}: {stats}");
        Ok(id)
    }

    /// README summary and its short form. Both degrade to empty strings.
    async fn narrate(&self, repo: &RepoId) -> (String, String) {
        let readme = match self.source.readme(repo).await {
            Ok(Some(readme)) => readme,
            Ok(None) => {
                log::info!("{repo} has no README");
                return (String::new(), String::new());
            }
            Err(err) => {
                log::warn!("Could not fetch README for {repo}: {err}");
                return (String::new(), String::new());
            }
        };

        let temperature = self.config.temperature;
        let summary = summarize_readme(self.generator.as_ref(), &readme, temperature)
            .await
            .unwrap_or_else(|err| {
                log::warn!("README summary failed for {repo}: {err}");
                String::new()
            });
        let short = short_summary(self.generator.as_ref(), &summary, temperature)
            .await
            .unwrap_or_else(|err| {
                log::warn!("Short summary failed for {repo}: {err}");
                String::new()
            });
        (summary, short)
    }

    /// Fills `synopsis` for every file; failures stay `None`. Returns the
    /// failure count.
    async fn synopsize_all(&self, files: &mut [FileRecord]) -> usize {
        let generator = self.generator.as_ref();
        let options = self.config.synopsis();
        let options = &options;
        let contents: Vec<&str> = files.iter().map(|f| f.content.as_str()).collect();

        log::info!("Synopsizing {} files", contents.len());
        let results = bounded_map(contents, self.config.concurrency, move |_, content| {
            synopsize(generator, content, options)
        })
        .await;

        let mut failed = 0;
        for (file, result) in files.iter_mut().zip(results) {
            match result {
                Ok(text) if !text.trim().is_empty() => file.synopsis = Some(text),
                Ok(_) => {
                    failed += 1;
                    log::warn!("Empty synopsis for {}; excluded from clustering", file.path);
                }
                Err(err) => {
                    failed += 1;
                    log::warn!("Synopsis failed for {}: {err}; excluded from clustering", file.path);
                }
            }
        }
        failed
    }

    /// Embeds every synopsized file. Any failure aborts the run.
    async fn embed_all(&self, files: &mut [FileRecord]) -> Result<()> {
        let embedder = self.embedder.as_ref();
        let targets: Vec<(usize, &str)> = files
            .iter()
            .enumerate()
            .filter(|(_, file)| file.has_synopsis())
            .filter_map(|(index, file)| file.synopsis.as_deref().map(|s| (index, s)))
            .collect();

        log::info!("Embedding {} synopses", targets.len());
        let results = bounded_map(targets, self.config.concurrency, move |_, (index, text)| {
            async move { (index, embedder.embed(text).await) }
        })
        .await;

        let mut vectors = Vec::with_capacity(results.len());
        for (index, result) in results {
            vectors.push((index, result?));
        }
        ensure_uniform_dimension(
            vectors.iter().map(|(_, vector)| vector.as_slice()),
            self.embedder.dimension(),
        )?;
        for (index, vector) in vectors {
            if let Some(file) = files.get_mut(index) {
                file.embedding = Some(vector);
            }
        }
        Ok(())
    }

    async fn cluster_and_label(
        &self,
        files: &[FileRecord],
        stats: &mut RunStats,
    ) -> Result<Vec<Subsystem>> {
        let embedded: Vec<usize> = files
            .iter()
            .enumerate()
            .filter(|(_, file)| file.embedding.is_some())
            .map(|(index, _)| index)
            .collect();
        if embedded.is_empty() {
            return Err(PipelineError::NoValidFiles(
                "no file produced a usable synopsis".to_string(),
            ));
        }

        let vectors: Vec<Vec<f32>> = embedded
            .iter()
            .filter_map(|&index| files[index].embedding.clone())
            .collect();
        let clustering = self
            .kmeans
            .cluster_adaptive(&vectors, &self.config.k_selection())?;
        let clusters: Vec<Vec<usize>> = clustering
            .group(embedded)?
            .into_iter()
            .filter(|cluster| !cluster.is_empty())
            .map(|cluster| cluster.members)
            .collect();
        stats.clusters = clusters.len();
        log::info!(
            "Clustered {} files into {} groups (sizes {:?})",
            vectors.len(),
            clusters.len(),
            clustering.sizes()
        );

        let member_lists: Vec<Vec<ClusterMember<'_>>> = clusters
            .iter()
            .map(|members| {
                members
                    .iter()
                    .map(|&index| ClusterMember {
                        path: &files[index].path,
                        synopsis: files[index].synopsis.as_deref().unwrap_or_default(),
                    })
                    .collect()
            })
            .collect();

        let generator = self.generator.as_ref();
        let temperature = self.config.temperature;
        let labels = join_all(
            member_lists
                .iter()
                .map(|members| label_from_cluster(generator, members, temperature)),
        )
        .await;

        let mut subsystems = Vec::with_capacity(clusters.len());
        for (members, label) in member_lists.iter().zip(labels) {
            let paths: Vec<String> = members.iter().map(|m| m.path.to_string()).collect();
            let label = match (label, self.config.cluster_label_fallback) {
                (Some(label), _) => label,
                (None, ClusterLabelFallback::PathPrefix) => {
                    stats.labels_failed += 1;
                    let label = fallback_label(&paths);
                    log::warn!(
                        "Cluster of {} files unlabeled; using path title '{}'",
                        paths.len(),
                        label.title
                    );
                    label
                }
                (None, ClusterLabelFallback::Drop) => {
                    stats.labels_failed += 1;
                    log::warn!("Dropping unlabeled cluster of {} files", paths.len());
                    continue;
                }
            };
            subsystems.push(Subsystem::new(label.title, label.short_summary, paths));
        }
        Ok(subsystems)
    }

    async fn run_detail(&self, subsystem_id: SubsystemId) -> Result<SubsystemDetail> {
        let lookup = self
            .store
            .find_subsystem(subsystem_id)
            .await?
            .ok_or_else(|| PipelineError::NotFound(format!("subsystem {subsystem_id}")))?;
        let repo = RepoId::parse(&lookup.repo_url).map_err(|_| {
            PipelineError::NotFound(format!("repository of subsystem {subsystem_id}"))
        })?;
        let subsystem = lookup.subsystem.subsystem;
        let total_files = subsystem.files.len();
        log::info!(
            "Deep dive into '{}' ({total_files} files) of {repo}",
            subsystem.title
        );

        let source = self.source.as_ref();
        let repo_ref = &repo;
        let fetched = bounded_map(
            subsystem.files.clone(),
            self.config.concurrency,
            move |_, path| async move {
                let content = source.file_content(repo_ref, &path).await;
                (path, content)
            },
        )
        .await;

        let mut files = Vec::with_capacity(fetched.len());
        for (path, content) in fetched {
            match content {
                Ok(Some(content)) if !content.trim().is_empty() => {
                    files.push(SourceFile { path, content })
                }
                Ok(_) => log::debug!("Skipping missing or empty file {path}"),
                Err(err) => log::warn!("Could not fetch {path}: {err}"),
            }
        }
        if files.is_empty() {
            return Err(PipelineError::NoValidFiles(format!(
                "none of the {total_files} files of subsystem {subsystem_id} could be read"
            )));
        }

        let summary = summarize_subsystem(
            self.generator.as_ref(),
            &subsystem.title,
            &files,
            self.config.temperature,
        )
        .await?;
        self.store
            .update_subsystem_summary(subsystem_id, &summary)
            .await?;

        Ok(SubsystemDetail {
            subsystem_id,
            summary,
            files_processed: files.len(),
            total_files,
        })
    }
}
