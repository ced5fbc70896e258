use serde::Serialize;

/// Paths sharing the same first segment (`src`, `prisma`, `README.md`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathBucket {
    pub top_level_segment: String,
    pub paths: Vec<String>,
}

/// Groups paths by their first segment.
///
/// Buckets appear in order of first occurrence and keep the input order of
/// their paths. Root-level files form a bucket named after themselves.
pub fn group_by_top_level<S: AsRef<str>>(paths: impl IntoIterator<Item = S>) -> Vec<PathBucket> {
    let mut buckets: Vec<PathBucket> = Vec::new();
    for path in paths {
        let path = path.as_ref();
        let top = path.split('/').next().unwrap_or(path);
        match buckets.iter_mut().find(|b| b.top_level_segment == top) {
            Some(bucket) => bucket.paths.push(path.to_string()),
            None => buckets.push(PathBucket {
                top_level_segment: top.to_string(),
                paths: vec![path.to_string()],
            }),
        }
    }
    buckets
}

/// JSON object `{ segment: [paths...] }` as handed to the path labeler.
pub fn buckets_to_json(buckets: &[PathBucket]) -> serde_json::Value {
    let map: serde_json::Map<String, serde_json::Value> = buckets
        .iter()
        .map(|bucket| {
            (
                bucket.top_level_segment.clone(),
                serde_json::Value::from(bucket.paths.clone()),
            )
        })
        .collect();
    serde_json::Value::Object(map)
}
