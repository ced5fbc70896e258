//! Full-partition enforcement for labeler output: every input path ends up
//! in exactly one subsystem, or the violation is reported per [`OrphanPolicy`].

use repowiki_protocol::Subsystem;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// What to do with input paths the labeler left out (or that had to be
/// removed while repairing its answer).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrphanPolicy {
    /// Any violation discards the whole answer
    Reject,
    /// Invented and duplicate paths are removed, omissions stay omitted
    DropAndWarn,
    /// Like `DropAndWarn`, then omissions go to one extra subsystem
    #[default]
    CatchAll,
}

#[derive(Debug, Clone)]
pub struct PartitionRules<'a> {
    pub max_subsystems: usize,
    pub policy: OrphanPolicy,
    pub catch_all_title: &'a str,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartitionReport {
    /// Returned paths that were never part of the input
    pub invented: Vec<String>,
    /// Paths returned more than once (only the first placement is kept)
    pub duplicates: Vec<String>,
    /// Input paths missing from the repaired answer
    pub orphans: Vec<String>,
    /// Subsystems dissolved because the answer exceeded the count bound
    pub folded_subsystems: usize,
}

impl PartitionReport {
    pub fn is_clean(&self) -> bool {
        self.invented.is_empty()
            && self.duplicates.is_empty()
            && self.orphans.is_empty()
            && self.folded_subsystems == 0
    }
}

/// Repairs `subsystems` so their files partition `inputs`.
///
/// Returned paths are matched exactly first, then case-insensitively, and
/// rewritten to the input spelling. On `Reject` any violation yields
/// `Err(report)`.
pub fn enforce(
    inputs: &[String],
    subsystems: Vec<Subsystem>,
    rules: &PartitionRules<'_>,
) -> Result<(Vec<Subsystem>, PartitionReport), PartitionReport> {
    let mut exact: HashMap<&str, usize> = HashMap::with_capacity(inputs.len());
    let mut folded: HashMap<String, usize> = HashMap::with_capacity(inputs.len());
    for (index, path) in inputs.iter().enumerate() {
        exact.entry(path.as_str()).or_insert(index);
        folded.entry(path.to_lowercase()).or_insert(index);
    }

    let mut report = PartitionReport::default();
    let mut owner: Vec<Option<usize>> = vec![None; inputs.len()];
    let mut repaired: Vec<Subsystem> = Vec::with_capacity(subsystems.len());

    for subsystem in subsystems {
        let slot = repaired.len();
        let mut files = Vec::with_capacity(subsystem.files.len());
        for path in &subsystem.files {
            let trimmed = path.trim();
            let index = exact
                .get(trimmed)
                .or_else(|| folded.get(&trimmed.to_lowercase()))
                .copied();
            match index {
                None => report.invented.push(path.clone()),
                Some(index) if owner[index].is_some() => report.duplicates.push(path.clone()),
                Some(index) => {
                    owner[index] = Some(slot);
                    files.push(inputs[index].clone());
                }
            }
        }
        if files.is_empty() {
            continue;
        }
        repaired.push(Subsystem { files, ..subsystem });
    }

    let mut kept = fold_smallest(repaired, rules.max_subsystems, &mut report);
    let mut orphans = orphans_of(inputs, &kept);

    if rules.policy == OrphanPolicy::CatchAll
        && !orphans.is_empty()
        && kept.len() >= rules.max_subsystems.max(1)
    {
        kept = fold_smallest(kept, rules.max_subsystems.max(1) - 1, &mut report);
        orphans = orphans_of(inputs, &kept);
    }
    report.orphans = orphans.clone();

    match rules.policy {
        OrphanPolicy::Reject if !report.is_clean() => return Err(report),
        OrphanPolicy::CatchAll if !orphans.is_empty() => kept.push(Subsystem::new(
            rules.catch_all_title,
            "Files not assigned to a more specific subsystem",
            orphans,
        )),
        _ => {}
    }

    Ok((kept, report))
}

/// Keeps the `limit` largest subsystems (original order preserved); the
/// rest are dissolved.
fn fold_smallest(
    subsystems: Vec<Subsystem>,
    limit: usize,
    report: &mut PartitionReport,
) -> Vec<Subsystem> {
    if subsystems.len() <= limit {
        return subsystems;
    }

    let mut by_size: Vec<usize> = (0..subsystems.len()).collect();
    by_size.sort_by(|a, b| subsystems[*b].files.len().cmp(&subsystems[*a].files.len()));
    let mut keep = vec![false; subsystems.len()];
    for &index in by_size.iter().take(limit) {
        keep[index] = true;
    }

    report.folded_subsystems += subsystems.len() - limit;
    subsystems
        .into_iter()
        .zip(keep)
        .filter_map(|(subsystem, keep)| keep.then_some(subsystem))
        .collect()
}

fn orphans_of(inputs: &[String], subsystems: &[Subsystem]) -> Vec<String> {
    let placed: std::collections::HashSet<&str> = subsystems
        .iter()
        .flat_map(|s| s.files.iter().map(String::as_str))
        .collect();
    let mut seen = std::collections::HashSet::new();
    inputs
        .iter()
        .filter(|path| !placed.contains(path.as_str()) && seen.insert(path.as_str()))
        .cloned()
        .collect()
}
