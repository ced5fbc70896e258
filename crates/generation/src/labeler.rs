//! Subsystem naming, for both clustering strategies.
//!
//! Labeler failures never abort a run: a bad answer degrades to an empty
//! list (paths) or to the configured fallback (clusters).

use crate::capability::{GenerationRequest, TextGeneration};
use crate::parse::{parse_json, OneOrMany};
use crate::partition::{self, OrphanPolicy, PartitionRules};
use crate::prompts;
use repowiki_protocol::{buckets_to_json, PathBucket, Subsystem};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct LabelerOptions {
    pub min_subsystems: usize,
    pub max_subsystems: usize,
    pub orphan_policy: OrphanPolicy,
    pub catch_all_title: String,
    pub temperature: f32,
}

impl Default for LabelerOptions {
    fn default() -> Self {
        Self {
            min_subsystems: 3,
            max_subsystems: 8,
            orphan_policy: OrphanPolicy::CatchAll,
            catch_all_title: "Other".to_string(),
            temperature: 0.2,
        }
    }
}

/// What happens to a cluster whose labeling request fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterLabelFallback {
    /// The cluster is left out of the result
    Drop,
    /// The cluster is named after its members' common path
    #[default]
    PathPrefix,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterLabel {
    pub title: String,
    #[serde(alias = "short_summary", alias = "summary")]
    pub short_summary: String,
}

/// One cluster member as shown to the cluster labeler.
#[derive(Debug, Clone, Serialize)]
pub struct ClusterMember<'a> {
    pub path: &'a str,
    pub synopsis: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSubsystem {
    title: String,
    #[serde(default, alias = "short_summary", alias = "summary")]
    short_summary: String,
    #[serde(default)]
    files: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawSubsystems {
    List(Vec<RawSubsystem>),
    Wrapped { subsystems: Vec<RawSubsystem> },
}

/// Names subsystems from path buckets plus the README summary.
///
/// The answer is repaired into a partition of the bucketed paths; a failed
/// request, unparseable output or a rejected partition yields an empty list.
pub async fn label_from_paths(
    generator: &dyn TextGeneration,
    buckets: &[PathBucket],
    readme_summary: &str,
    options: &LabelerOptions,
) -> Vec<Subsystem> {
    let inputs: Vec<String> = buckets.iter().flat_map(|b| b.paths.clone()).collect();
    if inputs.is_empty() {
        return Vec::new();
    }

    let user_content = format!(
        "README summary:\n{}\n\nFiles:\n{}",
        readme_summary.trim(),
        buckets_to_json(buckets)
    );
    let request = GenerationRequest::new(
        prompts::path_subsystems(options.min_subsystems, options.max_subsystems),
        user_content,
        options.temperature,
    );

    let raw = match generator.generate(request).await {
        Ok(response) => response.text,
        Err(err) => {
            log::warn!("Path labeling request failed: {err}");
            return Vec::new();
        }
    };
    let parsed = match parse_json::<RawSubsystems>(&raw) {
        Ok(RawSubsystems::List(items)) | Ok(RawSubsystems::Wrapped { subsystems: items }) => items,
        Err(err) => {
            log::warn!("Path labeling output was not a subsystem list: {err}");
            return Vec::new();
        }
    };

    let candidates: Vec<Subsystem> = parsed
        .into_iter()
        .filter(|raw| !raw.title.trim().is_empty())
        .map(|raw| Subsystem::new(raw.title.trim(), raw.short_summary.trim(), raw.files))
        .collect();

    let rules = PartitionRules {
        max_subsystems: options.max_subsystems,
        policy: options.orphan_policy,
        catch_all_title: &options.catch_all_title,
    };
    match partition::enforce(&inputs, candidates, &rules) {
        Ok((subsystems, report)) => {
            if !report.is_clean() {
                log::warn!(
                    "Path labeling repaired: {} invented, {} duplicate, {} unassigned paths, {} subsystems folded",
                    report.invented.len(),
                    report.duplicates.len(),
                    report.orphans.len(),
                    report.folded_subsystems
                );
            }
            if subsystems.len() < options.min_subsystems {
                log::debug!(
                    "Path labeling produced {} subsystems (fewer than {})",
                    subsystems.len(),
                    options.min_subsystems
                );
            }
            subsystems
        }
        Err(report) => {
            log::warn!(
                "Path labeling rejected: {} invented, {} duplicate, {} unassigned paths",
                report.invented.len(),
                report.duplicates.len(),
                report.orphans.len()
            );
            Vec::new()
        }
    }
}

/// Names one cluster from its members' synopses. `None` means the request
/// failed or the answer was unusable.
pub async fn label_from_cluster(
    generator: &dyn TextGeneration,
    members: &[ClusterMember<'_>],
    temperature: f32,
) -> Option<ClusterLabel> {
    let user_content = match serde_json::to_string(members) {
        Ok(json) => json,
        Err(err) => {
            log::warn!("Could not encode cluster members: {err}");
            return None;
        }
    };
    let request = GenerationRequest::new(prompts::CLUSTER_SUBSYSTEM, user_content, temperature);

    let raw = match generator.generate(request).await {
        Ok(response) => response.text,
        Err(err) => {
            log::warn!("Cluster labeling request failed: {err}");
            return None;
        }
    };
    let label = match parse_json::<OneOrMany<ClusterLabel>>(&raw) {
        Ok(labels) => labels.into_vec().into_iter().next(),
        Err(err) => {
            log::warn!("Cluster labeling output was not a label: {err}");
            None
        }
    }?;

    let title = label.title.trim();
    if title.is_empty() {
        log::warn!("Cluster labeling returned an empty title");
        return None;
    }
    Some(ClusterLabel {
        title: title.to_string(),
        short_summary: label.short_summary.trim().to_string(),
    })
}

/// Label derived from paths alone: the longest common directory, or else
/// the most frequent top-level segment.
pub fn fallback_label<S: AsRef<str>>(paths: &[S]) -> ClusterLabel {
    let prefix = common_directory(paths);
    if !prefix.is_empty() {
        return ClusterLabel {
            title: prefix.clone(),
            short_summary: format!("{} related files under {prefix}/", paths.len()),
        };
    }

    match dominant_segment(paths) {
        Some(segment) => ClusterLabel {
            title: segment.clone(),
            short_summary: format!("{} related files, mostly under {segment}", paths.len()),
        },
        None => ClusterLabel {
            title: "Miscellaneous".to_string(),
            short_summary: format!("{} related files", paths.len()),
        },
    }
}

fn common_directory<S: AsRef<str>>(paths: &[S]) -> String {
    let mut iter = paths.iter().map(|p| directory_segments(p.as_ref()));
    let Some(mut common) = iter.next() else {
        return String::new();
    };
    for segments in iter {
        let shared = common
            .iter()
            .zip(&segments)
            .take_while(|(a, b)| a == b)
            .count();
        common.truncate(shared);
        if common.is_empty() {
            break;
        }
    }
    common.join("/")
}

fn directory_segments(path: &str) -> Vec<&str> {
    let mut segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    segments.pop();
    segments
}

fn dominant_segment<S: AsRef<str>>(paths: &[S]) -> Option<String> {
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for (order, path) in paths.iter().enumerate() {
        let top = path.as_ref().split('/').next().unwrap_or_default();
        if top.is_empty() {
            continue;
        }
        let entry = counts.entry(top).or_insert((0, order));
        entry.0 += 1;
    }
    counts
        .into_iter()
        .max_by(|a, b| a.1 .0.cmp(&b.1 .0).then(b.1 .1.cmp(&a.1 .1)))
        .map(|(segment, _)| segment.to_string())
}
