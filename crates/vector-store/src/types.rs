use crate::error::{Result, VectorStoreError};
use serde::{Deserialize, Serialize};

/// Output of the clusterer: `assignment[i]` is the cluster index of input
/// vector `i`, always in `0..centroids.len()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clustering {
    pub assignment: Vec<usize>,
    pub centroids: Vec<Vec<f32>>,
}

impl Clustering {
    /// One implicit cluster holding every input (used below two vectors).
    pub fn single(vectors: &[Vec<f32>]) -> Self {
        let centroid = vectors.first().cloned().unwrap_or_default();
        Self {
            assignment: vec![0; vectors.len()],
            centroids: vec![centroid],
        }
    }

    pub fn k(&self) -> usize {
        self.centroids.len()
    }

    /// Member count per cluster index.
    pub fn sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.k()];
        for &cluster in &self.assignment {
            if let Some(size) = sizes.get_mut(cluster) {
                *size += 1;
            }
        }
        sizes
    }

    /// Moves index-aligned `items` into their clusters, keeping input order
    /// inside each cluster. Empty clusters are kept so indices stay stable.
    pub fn group<T>(&self, items: Vec<T>) -> Result<Vec<Cluster<T>>> {
        if items.len() != self.assignment.len() {
            return Err(VectorStoreError::ClusteringError(format!(
                "{} items for {} assignments",
                items.len(),
                self.assignment.len()
            )));
        }

        let mut clusters: Vec<Cluster<T>> = self
            .centroids
            .iter()
            .map(|centroid| Cluster {
                centroid: centroid.clone(),
                members: Vec::new(),
            })
            .collect();

        for (item, &index) in items.into_iter().zip(&self.assignment) {
            let cluster = clusters.get_mut(index).ok_or_else(|| {
                VectorStoreError::ClusteringError(format!(
                    "assignment {index} outside 0..{}",
                    self.centroids.len()
                ))
            })?;
            cluster.members.push(item);
        }

        Ok(clusters)
    }
}

/// Transient group of members sharing a centroid.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster<T> {
    pub centroid: Vec<f32>,
    pub members: Vec<T>,
}

impl<T> Cluster<T> {
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn group_keeps_input_order_per_cluster() {
        let clustering = Clustering {
            assignment: vec![1, 0, 1, 1],
            centroids: vec![vec![0.0], vec![1.0]],
        };
        let clusters = clustering.group(vec!["a", "b", "c", "d"]).unwrap();
        assert_eq!(clusters[0].members, vec!["b"]);
        assert_eq!(clusters[1].members, vec!["a", "c", "d"]);
        assert_eq!(clustering.sizes(), vec![1, 3]);
    }

    #[test]
    fn group_rejects_misaligned_items() {
        let clustering = Clustering::single(&[vec![1.0], vec![2.0]]);
        assert!(clustering.group(vec![1]).is_err());
    }
}
