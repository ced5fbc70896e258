use serde::{Deserialize, Serialize};
use std::fmt;

/// Counters for one pipeline run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    /// Files listed by the content source
    pub files_listed: usize,

    /// Files left after the denylist
    pub files_kept: usize,

    /// Files that entered synopsis (after importance selection)
    pub files_selected: usize,

    /// Files whose synopsis failed and were left out of clustering
    pub synopses_failed: usize,

    /// Number of clusters produced by k-means
    pub clusters: usize,

    /// Clusters whose label request failed
    pub labels_failed: usize,

    /// Subsystems written to the page
    pub subsystems: usize,

    /// Time taken in milliseconds
    pub time_ms: u64,
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} listed, {} kept, {} selected, {} synopsis failures, {} clusters ({} unlabeled), {} subsystems in {} ms",
            self.files_listed,
            self.files_kept,
            self.files_selected,
            self.synopses_failed,
            self.clusters,
            self.labels_failed,
            self.subsystems,
            self.time_ms
        )
    }
}
