use crate::error::{PipelineError, Result};
use repowiki_generation::{
    ClusterLabelFallback, ImportanceOptions, LabelerOptions, OrphanPolicy, SynopsisOptions,
};
use repowiki_vector_store::KSelection;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const MAX_CONCURRENCY: usize = 64;

/// Tunables for one pipeline run. Every field has a default, so a partial
/// `[pipeline]` table is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// In-flight ceiling for synopsis, embedding and content fetches
    pub concurrency: usize,
    pub importance_threshold: usize,
    pub importance_cap: usize,
    pub files_per_cluster: usize,
    pub min_clusters: usize,
    pub max_clusters: usize,
    pub min_subsystems: usize,
    pub max_subsystems: usize,
    pub temperature: f32,
    pub synopsis_max_words: usize,
    pub synopsis_max_input_chars: usize,
    pub orphan_policy: OrphanPolicy,
    pub cluster_label_fallback: ClusterLabelFallback,
    pub catch_all_title: String,
    /// Wall-clock budget for a whole run; `0` or absent disables it
    pub run_timeout_secs: Option<u64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            concurrency: 10,
            importance_threshold: 50,
            importance_cap: 50,
            files_per_cluster: 5,
            min_clusters: 2,
            max_clusters: 8,
            min_subsystems: 3,
            max_subsystems: 8,
            temperature: 0.2,
            synopsis_max_words: 100,
            synopsis_max_input_chars: 60_000,
            orphan_policy: OrphanPolicy::CatchAll,
            cluster_label_fallback: ClusterLabelFallback::PathPrefix,
            catch_all_title: "Other".to_string(),
            run_timeout_secs: Some(300),
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 || self.concurrency > MAX_CONCURRENCY {
            return Err(PipelineError::InvalidInput(format!(
                "concurrency must be between 1 and {MAX_CONCURRENCY} (got {})",
                self.concurrency
            )));
        }
        if self.files_per_cluster == 0 {
            return Err(PipelineError::InvalidInput(
                "files_per_cluster must be positive".to_string(),
            ));
        }
        if self.min_clusters > self.max_clusters {
            return Err(PipelineError::InvalidInput(format!(
                "min_clusters ({}) exceeds max_clusters ({})",
                self.min_clusters, self.max_clusters
            )));
        }
        if self.max_subsystems == 0 || self.min_subsystems > self.max_subsystems {
            return Err(PipelineError::InvalidInput(format!(
                "subsystem bounds {}..={} are invalid",
                self.min_subsystems, self.max_subsystems
            )));
        }
        if self.importance_cap == 0 {
            return Err(PipelineError::InvalidInput(
                "importance_cap must be positive".to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(PipelineError::InvalidInput(format!(
                "temperature must be within 0.0..=2.0 (got {})",
                self.temperature
            )));
        }
        if self.catch_all_title.trim().is_empty() {
            return Err(PipelineError::InvalidInput(
                "catch_all_title must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn run_timeout(&self) -> Option<Duration> {
        self.run_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    pub fn importance(&self) -> ImportanceOptions {
        ImportanceOptions {
            threshold: self.importance_threshold,
            cap: self.importance_cap,
            temperature: self.temperature,
        }
    }

    pub fn synopsis(&self) -> SynopsisOptions {
        SynopsisOptions {
            max_words: self.synopsis_max_words,
            max_input_chars: self.synopsis_max_input_chars,
            temperature: self.temperature,
        }
    }

    pub fn labeler(&self) -> LabelerOptions {
        LabelerOptions {
            min_subsystems: self.min_subsystems,
            max_subsystems: self.max_subsystems,
            orphan_policy: self.orphan_policy,
            catch_all_title: self.catch_all_title.clone(),
            temperature: self.temperature,
        }
    }

    pub fn k_selection(&self) -> KSelection {
        KSelection {
            files_per_cluster: self.files_per_cluster,
            min_clusters: self.min_clusters,
            max_clusters: self.max_clusters,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn partial_table_keeps_defaults() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"concurrency": 4, "orphan_policy": "reject"}"#).unwrap();
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.orphan_policy, OrphanPolicy::Reject);
        assert_eq!(config.max_clusters, 8);
        assert_eq!(config.run_timeout(), Some(Duration::from_secs(300)));
        config.validate().unwrap();
    }

    #[test]
    fn zero_timeout_disables_the_budget() {
        let config = PipelineConfig {
            run_timeout_secs: Some(0),
            ..Default::default()
        };
        assert_eq!(config.run_timeout(), None);
    }

    #[test]
    fn rejects_inverted_bounds_and_zero_concurrency() {
        let config = PipelineConfig {
            min_clusters: 9,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = PipelineConfig {
            concurrency: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
