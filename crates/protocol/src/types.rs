use serde::{Deserialize, Serialize};

pub type WikiPageId = u64;
pub type SubsystemId = u64;

/// A repository file as seen by one pipeline run.
///
/// `synopsis` and `embedding` are filled in by later stages; the record is
/// discarded at the end of the run (only [`StoredFile`] is persisted).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FileRecord {
    pub path: String,
    pub content: String,
    pub synopsis: Option<String>,
    pub embedding: Option<Vec<f32>>,
}

impl FileRecord {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
            synopsis: None,
            embedding: None,
        }
    }

    /// Record for a path whose content has not been fetched (structural strategy).
    pub fn path_only(path: impl Into<String>) -> Self {
        Self::new(path, String::new())
    }

    /// True when the synopsis stage produced usable text for this file.
    pub fn has_synopsis(&self) -> bool {
        self.synopsis
            .as_deref()
            .is_some_and(|s| !s.trim().is_empty())
    }
}

/// A named group of repository paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subsystem {
    pub title: String,
    pub short_summary: String,
    /// Deep-dive summary, filled in later by a separate request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub files: Vec<String>,
}

impl Subsystem {
    pub fn new(
        title: impl Into<String>,
        short_summary: impl Into<String>,
        files: Vec<String>,
    ) -> Self {
        Self {
            title: title.into(),
            short_summary: short_summary.into(),
            summary: None,
            files,
        }
    }
}

/// Per-file output of the content strategy that is persisted with the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredFile {
    pub path: String,
    pub synopsis: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

/// Everything a successful run writes to the store in one go.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WikiPageDraft {
    pub repo_url: String,
    pub branch: String,
    pub title: String,
    pub summary: String,
    pub short_summary: String,
    pub subsystems: Vec<Subsystem>,
    #[serde(default)]
    pub files: Vec<StoredFile>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredSubsystem {
    pub id: SubsystemId,
    pub page_id: WikiPageId,
    #[serde(flatten)]
    pub subsystem: Subsystem,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WikiPage {
    pub id: WikiPageId,
    pub repo_url: String,
    pub branch: String,
    pub title: String,
    pub summary: String,
    pub short_summary: String,
    pub subsystems: Vec<StoredSubsystem>,
    #[serde(default)]
    pub files: Vec<StoredFile>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subsystem_uses_camel_case_on_the_wire() {
        let subsystem = Subsystem::new("Auth", "Login flows", vec!["src/auth.rs".into()]);
        let json = serde_json::to_value(&subsystem).unwrap();
        assert_eq!(json["shortSummary"], "Login flows");
        assert!(json.get("summary").is_none());
    }

    #[test]
    fn blank_synopsis_is_not_usable() {
        let mut record = FileRecord::new("a.rs", "fn main() {}");
        assert!(!record.has_synopsis());
        record.synopsis = Some("   ".into());
        assert!(!record.has_synopsis());
        record.synopsis = Some("Entry point.".into());
        assert!(record.has_synopsis());
    }
}
