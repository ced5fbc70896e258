//! K-means partitioning of embedding vectors.
//!
//! Initialization is deterministic farthest-first seeding (k-means++ without
//! the sampling), so a given input always yields the same partition.

use crate::error::{Result, VectorStoreError};
use crate::types::Clustering;
use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};

/// Adaptive choice of K from the dataset size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KSelection {
    /// Roughly one cluster per this many vectors
    pub files_per_cluster: usize,
    pub min_clusters: usize,
    pub max_clusters: usize,
}

impl Default for KSelection {
    fn default() -> Self {
        Self {
            files_per_cluster: 5,
            min_clusters: 2,
            max_clusters: 8,
        }
    }
}

impl KSelection {
    /// `clamp(floor(n / files_per_cluster), min, max)`, never above `n`.
    /// `None` below two vectors: there is nothing to partition.
    pub fn choose(&self, n: usize) -> Option<usize> {
        if n < 2 {
            return None;
        }
        let min = self.min_clusters.max(1);
        let max = self.max_clusters.max(min);
        let k = (n / self.files_per_cluster.max(1)).clamp(min, max);
        Some(k.min(n))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct KMeans {
    pub max_iterations: usize,
}

impl Default for KMeans {
    fn default() -> Self {
        Self {
            max_iterations: 100,
        }
    }
}

impl KMeans {
    /// Partitions `vectors` with K picked by `selection`.
    ///
    /// Fewer than two vectors skip clustering and come back as one implicit
    /// cluster; zero vectors is an error.
    pub fn cluster_adaptive(
        &self,
        vectors: &[Vec<f32>],
        selection: &KSelection,
    ) -> Result<Clustering> {
        if vectors.is_empty() {
            return Err(VectorStoreError::EmptyInput);
        }
        match selection.choose(vectors.len()) {
            Some(k) => self.cluster(vectors, k),
            None => {
                log::debug!("Skipping k-means for {} vector(s)", vectors.len());
                Ok(Clustering::single(vectors))
            }
        }
    }

    /// Partitions `vectors` into exactly `k` clusters (Euclidean distance,
    /// ties to the lowest cluster index).
    pub fn cluster(&self, vectors: &[Vec<f32>], k: usize) -> Result<Clustering> {
        let data = to_matrix(vectors)?;
        let n = data.nrows();
        if k == 0 || k > n {
            return Err(VectorStoreError::ClusteringError(format!(
                "k={k} must be within 1..={n}"
            )));
        }

        let mut centroids = seed_centroids(&data, k);
        let mut assignment = vec![usize::MAX; n];

        let mut iterations = 0;
        while iterations < self.max_iterations.max(1) {
            iterations += 1;
            let changed = assign(&data, &centroids, &mut assignment);
            let counts = recompute(&data, &assignment, &mut centroids);
            let reseeded = reseed_empty(&data, &assignment, &counts, &mut centroids);
            if !changed && !reseeded {
                break;
            }
        }

        // Final pass so the reported assignment matches the reported centroids.
        assign(&data, &centroids, &mut assignment);
        recompute(&data, &assignment, &mut centroids);

        log::debug!(
            "k-means converged: n={n}, k={k}, iterations={iterations}"
        );

        Ok(Clustering {
            assignment,
            centroids: centroids.outer_iter().map(|row| row.to_vec()).collect(),
        })
    }
}

fn to_matrix(vectors: &[Vec<f32>]) -> Result<Array2<f32>> {
    let Some(first) = vectors.first() else {
        return Err(VectorStoreError::EmptyInput);
    };
    let dim = first.len();
    if dim == 0 {
        return Err(VectorStoreError::ClusteringError(
            "embeddings have zero dimensions".to_string(),
        ));
    }

    let mut flat = Vec::with_capacity(vectors.len() * dim);
    for vector in vectors {
        if vector.len() != dim {
            return Err(VectorStoreError::InvalidDimension {
                expected: dim,
                actual: vector.len(),
            });
        }
        flat.extend_from_slice(vector);
    }

    Array2::from_shape_vec((vectors.len(), dim), flat)
        .map_err(|err| VectorStoreError::ClusteringError(err.to_string()))
}

fn squared_distance(a: ArrayView1<f32>, b: ArrayView1<f32>) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

fn nearest(point: ArrayView1<f32>, centroids: &Array2<f32>) -> (usize, f32) {
    let mut best = (0, f32::INFINITY);
    for (index, centroid) in centroids.outer_iter().enumerate() {
        let distance = squared_distance(point, centroid);
        if distance < best.1 {
            best = (index, distance);
        }
    }
    best
}

/// First centroid is row 0; each next one is the row farthest from every
/// centroid chosen so far (lowest row wins ties). Exact duplicates fall back
/// to the next unused row.
fn seed_centroids(data: &Array2<f32>, k: usize) -> Array2<f32> {
    let n = data.nrows();
    let mut chosen = vec![0usize];
    let mut min_dist: Vec<f32> = (0..n)
        .map(|i| squared_distance(data.row(i), data.row(0)))
        .collect();

    while chosen.len() < k {
        let mut next = None;
        let mut farthest = 0.0f32;
        for (i, &distance) in min_dist.iter().enumerate() {
            if distance > farthest {
                farthest = distance;
                next = Some(i);
            }
        }
        let next = next
            .or_else(|| (0..n).find(|i| !chosen.contains(i)))
            .unwrap_or(0);
        chosen.push(next);
        for (i, slot) in min_dist.iter_mut().enumerate() {
            let distance = squared_distance(data.row(i), data.row(next));
            if distance < *slot {
                *slot = distance;
            }
        }
    }

    let mut centroids = Array2::zeros((k, data.ncols()));
    for (slot, &row) in chosen.iter().enumerate() {
        centroids.row_mut(slot).assign(&data.row(row));
    }
    centroids
}

fn assign(data: &Array2<f32>, centroids: &Array2<f32>, assignment: &mut [usize]) -> bool {
    let mut changed = false;
    for (i, slot) in assignment.iter_mut().enumerate() {
        let (best, _) = nearest(data.row(i), centroids);
        if *slot != best {
            *slot = best;
            changed = true;
        }
    }
    changed
}

/// Moves each centroid to the mean of its members. Empty clusters keep their
/// previous centroid.
fn recompute(data: &Array2<f32>, assignment: &[usize], centroids: &mut Array2<f32>) -> Vec<usize> {
    let k = centroids.nrows();
    let mut sums = Array2::<f32>::zeros((k, data.ncols()));
    let mut counts = vec![0usize; k];
    for (i, &cluster) in assignment.iter().enumerate() {
        sums.row_mut(cluster).scaled_add(1.0, &data.row(i));
        counts[cluster] += 1;
    }
    for (cluster, &count) in counts.iter().enumerate() {
        if count > 0 {
            let mean = &sums.row(cluster) / count as f32;
            centroids.row_mut(cluster).assign(&mean);
        }
    }
    counts
}

/// Re-seeds each empty cluster at the member lying farthest from its own
/// centroid, taken from a cluster that can spare it.
fn reseed_empty(
    data: &Array2<f32>,
    assignment: &[usize],
    counts: &[usize],
    centroids: &mut Array2<f32>,
) -> bool {
    let mut reseeded = false;
    let mut taken: Vec<usize> = Vec::new();
    for (cluster, &count) in counts.iter().enumerate() {
        if count > 0 {
            continue;
        }
        let mut candidate = None;
        let mut farthest = 0.0f32;
        for (i, &owner) in assignment.iter().enumerate() {
            if counts[owner] < 2 || taken.contains(&i) {
                continue;
            }
            let distance = squared_distance(data.row(i), centroids.row(owner));
            if distance > farthest {
                farthest = distance;
                candidate = Some(i);
            }
        }
        if let Some(i) = candidate {
            centroids.row_mut(cluster).assign(&data.row(i));
            taken.push(i);
            reseeded = true;
        }
    }
    reseeded
}
