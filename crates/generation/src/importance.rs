use crate::capability::{GenerationRequest, TextGeneration};
use crate::error::{GenerationError, Result};
use crate::parse::parse_json;
use crate::prompts;
use repowiki_protocol::FileRecord;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy)]
pub struct ImportanceOptions {
    /// Selection only runs above this many files
    pub threshold: usize,
    /// Upper bound on the returned subset
    pub cap: usize,
    pub temperature: f32,
}

impl Default for ImportanceOptions {
    fn default() -> Self {
        Self {
            threshold: 50,
            cap: 50,
            temperature: 0.2,
        }
    }
}

impl ImportanceOptions {
    pub fn applies_to(&self, file_count: usize) -> bool {
        file_count > self.threshold
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SelectedPaths {
    List(Vec<String>),
    Wrapped { files: Vec<String> },
}

/// Asks the model for the most informative subset of `files`, sending paths
/// only.
///
/// The answer is re-validated: unknown paths are dropped, case-insensitive
/// matches are mapped back to the original record, duplicates collapse and
/// the result is truncated to `cap`. An empty result is an error.
pub async fn select_important(
    generator: &dyn TextGeneration,
    files: Vec<FileRecord>,
    options: &ImportanceOptions,
) -> Result<Vec<FileRecord>> {
    let paths: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();
    let user_content = serde_json::to_string(&paths)
        .map_err(|err| GenerationError::Other(err.to_string()))?;
    let request = GenerationRequest::new(
        prompts::important_files(options.cap),
        user_content,
        options.temperature,
    );

    let response = generator.generate(request).await?;
    let selected = match parse_json::<SelectedPaths>(&response.text) {
        Ok(SelectedPaths::List(paths)) | Ok(SelectedPaths::Wrapped { files: paths }) => paths,
        Err(err) => {
            log::warn!("Importance selection output was not a path list: {err}");
            Vec::new()
        }
    };

    let requested = selected.len();
    let kept = retain_selected(files, &selected, options.cap);
    if kept.is_empty() {
        return Err(GenerationError::NoValidFiles(format!(
            "importance selection returned no known paths ({requested} returned)"
        )));
    }
    if kept.len() < requested {
        log::warn!(
            "Importance selection: kept {} of {} returned paths",
            kept.len(),
            requested
        );
    }
    log::info!("Selected {} important files", kept.len());
    Ok(kept)
}

/// Maps model-returned paths back onto `files`, in the model's order.
fn retain_selected(files: Vec<FileRecord>, selected: &[String], cap: usize) -> Vec<FileRecord> {
    let mut exact: HashMap<&str, usize> = HashMap::with_capacity(files.len());
    let mut by_lower: HashMap<String, usize> = HashMap::with_capacity(files.len());
    for (index, file) in files.iter().enumerate() {
        exact.entry(file.path.as_str()).or_insert(index);
        by_lower.entry(file.path.to_lowercase()).or_insert(index);
    }

    let mut seen = HashSet::new();
    let mut order = Vec::new();
    for path in selected {
        let path = path.trim();
        let found = exact
            .get(path)
            .or_else(|| by_lower.get(&path.to_lowercase()));
        match found {
            Some(&index) => {
                if seen.insert(index) {
                    order.push(index);
                }
            }
            None => log::debug!("Dropping unknown path from importance selection: {path}"),
        }
        if order.len() >= cap {
            break;
        }
    }

    let mut slots: Vec<Option<FileRecord>> = files.into_iter().map(Some).collect();
    order
        .into_iter()
        .filter_map(|index| slots[index].take())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn exact_path_wins_over_case_folded_twin() {
        let files = vec![
            FileRecord::new("docs/API.md", "upper"),
            FileRecord::new("docs/api.md", "lower"),
        ];

        let kept = retain_selected(files.clone(), &["docs/api.md".to_string()], 10);
        assert_eq!(kept, vec![FileRecord::new("docs/api.md", "lower")]);

        let kept = retain_selected(files, &["DOCS/Api.MD".to_string()], 10);
        assert_eq!(kept, vec![FileRecord::new("docs/API.md", "upper")]);
    }

    #[test]
    fn retains_known_paths_case_insensitively() {
        let files = vec![
            FileRecord::new("src/Main.rs", "fn main() {}"),
            FileRecord::new("src/lib.rs", "pub mod x;"),
        ];
        let selected = vec![
            "SRC/MAIN.RS".to_string(),
            "src/invented.rs".to_string(),
            "src/main.rs".to_string(),
        ];
        let kept = retain_selected(files, &selected, 10);
        assert_eq!(kept, vec![FileRecord::new("src/Main.rs", "fn main() {}")]);
    }

    #[test]
    fn truncates_to_cap() {
        let files: Vec<FileRecord> = (0..5)
            .map(|i| FileRecord::new(format!("f{i}.rs"), ""))
            .collect();
        let selected: Vec<String> = (0..5).map(|i| format!("f{i}.rs")).collect();
        let kept = retain_selected(files, &selected, 3);
        assert_eq!(kept.len(), 3);
        assert_eq!(kept[2].path, "f2.rs");
    }
}
