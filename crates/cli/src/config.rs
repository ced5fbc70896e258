use anyhow::{Context as AnyhowContext, Result};
use repowiki_pipeline::PipelineConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "repowiki.toml";

/// Everything the binary needs, from `repowiki.toml` plus environment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub pipeline: PipelineConfig,
    pub openai: OpenAiSection,
    pub github: GitHubSection,
    pub store: StoreSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiSection {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub embedding_model: String,
    /// `openai` or `stub`
    pub embedding_mode: String,
    pub timeout_secs: u64,
    pub max_retries: usize,
}

impl Default for OpenAiSection {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            embedding_mode: "openai".to_string(),
            timeout_secs: 120,
            max_retries: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GitHubSection {
    pub token: Option<String>,
    pub api_base: String,
    pub timeout_secs: u64,
}

impl Default for GitHubSection {
    fn default() -> Self {
        Self {
            token: None,
            api_base: "https://api.github.com".to_string(),
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    pub path: PathBuf,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            path: PathBuf::from(".repowiki/wiki.json"),
        }
    }
}

impl AppConfig {
    /// Reads `explicit` (must exist) or `repowiki.toml` in the working
    /// directory (optional), then applies environment overrides.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };
        config.apply_env(|name| std::env::var(name).ok());
        config
            .pipeline
            .validate()
            .context("Invalid [pipeline] configuration")?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Environment wins over the file. Empty values are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(key) = var("OPENAI_API_KEY") {
            self.openai.api_key = Some(key);
        }
        if let Some(url) = var("OPENAI_BASE_URL") {
            self.openai.base_url = url;
        }
        if let Some(model) = var("OPENAI_MODEL") {
            self.openai.model = model;
        }
        if let Some(model) = var("OPENAI_EMBEDDING_MODEL") {
            self.openai.embedding_model = model;
        }
        if let Some(mode) = var("REPOWIKI_EMBEDDING_MODE") {
            self.openai.embedding_mode = mode;
        }
        if let Some(token) = var("GITHUB_TOKEN") {
            self.github.token = Some(token);
        }
        if let Some(path) = var("REPOWIKI_STORE") {
            self.store.path = PathBuf::from(path);
        }
    }
}
