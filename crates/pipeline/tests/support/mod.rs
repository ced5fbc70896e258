#![allow(dead_code)]

use async_trait::async_trait;
use repowiki_generation::{
    prompts, GenerationError, GenerationRequest, GenerationResponse, TextGeneration,
};
use repowiki_pipeline::{
    ContentSource, MemoryStore, PipelineConfig, PipelineError, TreeEntry, WikiGenerator,
};
use repowiki_protocol::{FileRecord, RepoId};
use repowiki_vector_store::{EmbeddingCapability, VectorStoreError};
use serde::Deserialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const REPO_URL: &str = "https://github.com/acme/widgets";

/// Answers each prompt kind with something shaped like a real model reply.
///
/// - synopsis: echoes the file content (content starting with `FAIL` fails it)
/// - importance: the first `important` paths of the list
/// - path labels: one subsystem per bucket, or `path_answer` verbatim
/// - cluster labels: "Group <n>" from the first member's synopsis
#[derive(Default)]
pub struct ScriptedGenerator {
    pub important: usize,
    pub path_answer: Option<String>,
    pub fail_cluster_labels: bool,
    pub synopsis_calls: AtomicUsize,
    pub requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedGenerator {
    pub fn prompts_seen(&self, system_prompt: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.system_prompt == system_prompt)
            .count()
    }
}

#[derive(Deserialize)]
struct Member {
    synopsis: String,
}

#[async_trait]
impl TextGeneration for ScriptedGenerator {
    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> repowiki_generation::Result<GenerationResponse> {
        self.requests.lock().unwrap().push(request.clone());
        let prompt = request.system_prompt.as_str();
        let content = request.user_content.as_str();

        let text = if prompt == prompts::README_SUMMARY {
            "Widgets is a toolkit for widgets.".to_string()
        } else if prompt == prompts::SHORT_SUMMARY {
            "Widget toolkit".to_string()
        } else if prompt == prompts::file_synopsis(100) {
            self.synopsis_calls.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            if content.starts_with("FAIL") {
                return Err(GenerationError::ApiError("context length exceeded".into()));
            }
            content.to_string()
        } else if prompt == prompts::important_files(50) {
            let paths: Vec<String> = serde_json::from_str(content).unwrap();
            serde_json::to_string(&paths[..self.important.min(paths.len())]).unwrap()
        } else if prompt == prompts::path_subsystems(3, 8) {
            match &self.path_answer {
                Some(answer) => answer.clone(),
                None => echo_buckets(content),
            }
        } else if prompt == prompts::CLUSTER_SUBSYSTEM {
            if self.fail_cluster_labels {
                return Err(GenerationError::ApiError("rate limited".into()));
            }
            let members: Vec<Member> = serde_json::from_str(content).unwrap();
            let group = group_of(&members[0].synopsis).unwrap_or(99);
            format!(r#"{{"title": "Group {group}", "shortSummary": "Files of group {group}"}}"#)
        } else if prompt == prompts::SUBSYSTEM_DEEP_DIVE {
            "## Overview\n\n```mermaid\ngraph TD\n```".to_string()
        } else {
            return Err(GenerationError::Other(format!("unexpected prompt: {prompt}")));
        };
        Ok(GenerationResponse { text })
    }
}

fn echo_buckets(content: &str) -> String {
    let json = content.split("Files:\n").nth(1).unwrap();
    let buckets: serde_json::Map<String, serde_json::Value> = serde_json::from_str(json).unwrap();
    let subsystems: Vec<serde_json::Value> = buckets
        .into_iter()
        .map(|(segment, files)| {
            serde_json::json!({
                "title": segment,
                "shortSummary": format!("Everything under {segment}"),
                "files": files,
            })
        })
        .collect();
    serde_json::to_string(&subsystems).unwrap()
}

/// `group-<n>` marker inside a synopsis.
fn group_of(text: &str) -> Option<usize> {
    let rest = text.split("group-").nth(1)?;
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

/// Places each `group-<n>` synopsis near `(10 n, 0)`; `EMBED_FAIL` fails.
#[derive(Default)]
pub struct GroupEmbedder {
    pub calls: AtomicUsize,
}

#[async_trait]
impl EmbeddingCapability for GroupEmbedder {
    async fn embed(&self, text: &str) -> repowiki_vector_store::Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if text.contains("EMBED_FAIL") {
            return Err(VectorStoreError::EmbeddingError("upstream 500".into()));
        }
        if text.contains("EMBED_SHORT") {
            return Ok(vec![1.0]);
        }
        let group = group_of(text).unwrap_or(0) as f32;
        let jitter = (text.len() % 7) as f32 * 0.01;
        Ok(vec![group * 10.0 + jitter, jitter])
    }

    fn dimension(&self) -> Option<usize> {
        Some(2)
    }
}

/// In-memory repository host.
#[derive(Default)]
pub struct FakeHost {
    pub files: Vec<(String, String)>,
    pub readme: Option<String>,
    pub branch_delay: Option<Duration>,
    pub calls: AtomicUsize,
}

impl FakeHost {
    pub fn with_files<P: Into<String>, C: Into<String>>(files: Vec<(P, C)>) -> Self {
        Self {
            files: files
                .into_iter()
                .map(|(p, c)| (p.into(), c.into()))
                .collect(),
            readme: Some("# Widgets\nA toolkit.".to_string()),
            ..Default::default()
        }
    }
}

#[async_trait]
impl ContentSource for FakeHost {
    async fn default_branch(&self, _repo: &RepoId) -> repowiki_pipeline::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.branch_delay {
            tokio::time::sleep(delay).await;
        }
        Ok("main".to_string())
    }

    async fn tree(&self, _repo: &RepoId, branch: &str) -> repowiki_pipeline::Result<Vec<TreeEntry>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if branch != "main" {
            return Err(PipelineError::NotFound(format!("branch {branch}")));
        }
        let mut entries = vec![TreeEntry::tree("src")];
        entries.extend(self.files.iter().map(|(path, _)| TreeEntry::blob(path.clone())));
        Ok(entries)
    }

    async fn file_content(
        &self,
        _repo: &RepoId,
        path: &str,
    ) -> repowiki_pipeline::Result<Option<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if path.contains("unreachable") {
            return Err(PipelineError::SourceError("connection reset".into()));
        }
        Ok(self
            .files
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, content)| content.clone()))
    }

    async fn readme(&self, _repo: &RepoId) -> repowiki_pipeline::Result<Option<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.readme.clone())
    }

    async fn snapshot(
        &self,
        _repo: &RepoId,
        _branch: &str,
    ) -> repowiki_pipeline::Result<Vec<FileRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .files
            .iter()
            .map(|(path, content)| FileRecord::new(path.clone(), content.clone()))
            .collect())
    }
}

pub struct Harness {
    pub generator: Arc<ScriptedGenerator>,
    pub embedder: Arc<GroupEmbedder>,
    pub host: Arc<FakeHost>,
    pub store: Arc<MemoryStore>,
    pub wiki: WikiGenerator,
}

pub fn harness(host: FakeHost, generator: ScriptedGenerator, config: PipelineConfig) -> Harness {
    let generator = Arc::new(generator);
    let embedder = Arc::new(GroupEmbedder::default());
    let host = Arc::new(host);
    let store = Arc::new(MemoryStore::new());
    let wiki = WikiGenerator::new(
        generator.clone(),
        embedder.clone(),
        host.clone(),
        store.clone(),
        config,
    )
    .expect("valid config");
    Harness {
        generator,
        embedder,
        host,
        store,
        wiki,
    }
}

/// `count` files spread round-robin over `groups` content groups.
pub fn grouped_files(count: usize, groups: usize) -> Vec<(String, String)> {
    (0..count)
        .map(|i| {
            (
                format!("src/file_{i:02}.ts"),
                format!("export const f{i} = 1; // group-{}", i % groups),
            )
        })
        .collect()
}
