use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepoUrlError {
    #[error("Repository URL is empty")]
    Empty,

    #[error("Invalid GitHub URL: {0}")]
    NotGitHub(String),

    #[error("GitHub URL is missing owner or repository: {0}")]
    MissingSegments(String),
}

/// `owner/repo` pair parsed from a GitHub URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoId {
    pub owner: String,
    pub repo: String,
}

impl RepoId {
    /// Accepts `https://github.com/<owner>/<repo>` with an optional `.git`
    /// suffix and any trailing path (`/tree/main/src`, query strings).
    pub fn parse(url: &str) -> Result<Self, RepoUrlError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(RepoUrlError::Empty);
        }

        let without_scheme = url
            .strip_prefix("https://")
            .or_else(|| url.strip_prefix("http://"))
            .ok_or_else(|| RepoUrlError::NotGitHub(url.to_string()))?;
        let without_scheme = without_scheme
            .strip_prefix("www.")
            .unwrap_or(without_scheme);
        let rest = without_scheme
            .strip_prefix("github.com/")
            .ok_or_else(|| RepoUrlError::NotGitHub(url.to_string()))?;

        let rest = rest.split(['?', '#']).next().unwrap_or_default();
        let mut segments = rest.split('/').filter(|s| !s.is_empty());
        let owner = segments.next().unwrap_or_default();
        let repo = segments.next().unwrap_or_default();
        let repo = repo.strip_suffix(".git").unwrap_or(repo);

        if owner.is_empty() || repo.is_empty() {
            return Err(RepoUrlError::MissingSegments(url.to_string()));
        }

        Ok(Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
        })
    }

    /// Page title used for the wiki.
    pub fn title(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }

    /// Normalized URL; wiki pages are keyed on it so `.git` and deep links
    /// resolve to the same page.
    pub fn canonical_url(&self) -> String {
        format!("https://github.com/{}/{}", self.owner, self.repo)
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}
