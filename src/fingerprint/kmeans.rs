// K-means clustering for section embeddings.
//
// A single mean vector blurs sections that cover several distinct themes
// (a "TOOLS" section with both CLI utilities and design apps). Clustering
// each section into k centroids gives the matcher several targets per
// section instead of one.
//
// Initialization is k-means++ (each new seed drawn with probability
// proportional to its squared distance from the nearest existing seed),
// driven by a seeded StdRng so fingerprints are reproducible run to run.
// Lloyd iterations on squared Euclidean distance follow.

use anyhow::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use super::vector::squared_euclidean;

/// Seed used when none is configured.
pub const DEFAULT_SEED: u64 = 42;

/// K-means parameters.
#[derive(Debug, Clone)]
pub struct KMeans {
    pub k: usize,
    pub max_iterations: usize,
    /// Stop once the summed squared centroid shift falls to this value
    pub tolerance: f64,
    pub seed: u64,
}

/// Fitted centroids plus the final assignment of every input point.
#[derive(Debug, Clone)]
pub struct KMeansResult {
    pub centroids: Vec<Vec<f64>>,
    pub assignments: Vec<usize>,
    pub iterations: usize,
}

impl KMeansResult {
    /// Number of points assigned to each centroid.
    pub fn member_counts(&self) -> Vec<usize> {
        let mut counts = vec![0; self.centroids.len()];
        for &a in &self.assignments {
            counts[a] += 1;
        }
        counts
    }
}

impl KMeans {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            max_iterations: 300,
            tolerance: 1e-4,
            seed: DEFAULT_SEED,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Cluster `points` into `self.k` groups.
    ///
    /// Requires 1 <= k <= points.len() and equal-length points.
    pub fn fit(&self, points: &[Vec<f64>]) -> Result<KMeansResult> {
        let n = points.len();
        if self.k == 0 {
            anyhow::bail!("k-means needs k >= 1");
        }
        if self.k > n {
            anyhow::bail!("k-means needs at least k={} points, got {}", self.k, n);
        }
        let dim = points[0].len();
        if let Some(bad) = points.iter().position(|p| p.len() != dim) {
            anyhow::bail!(
                "Point {} has dimension {}, expected {}",
                bad,
                points[bad].len(),
                dim
            );
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut centroids = init_plus_plus(points, self.k, &mut rng);
        let mut assignments = vec![usize::MAX; n];
        let mut iterations = 0;

        while iterations < self.max_iterations {
            iterations += 1;
            let changed = assign(points, &centroids, &mut assignments);
            let updated = recompute(points, &mut assignments, &centroids);
            let shift: f64 = centroids
                .iter()
                .zip(&updated)
                .map(|(old, new)| squared_euclidean(old, new))
                .sum();
            centroids = updated;

            if !changed || shift <= self.tolerance {
                break;
            }
        }

        // Final assignment so every point agrees with the returned centroids
        assign(points, &centroids, &mut assignments);

        debug!(n, k = self.k, iterations, "k-means converged");

        Ok(KMeansResult {
            centroids,
            assignments,
            iterations,
        })
    }
}

/// k-means++ seeding.
fn init_plus_plus(points: &[Vec<f64>], k: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    let n = points.len();
    let mut centroids = Vec::with_capacity(k);
    centroids.push(points[rng.random_range(0..n)].clone());

    let mut nearest: Vec<f64> = points
        .iter()
        .map(|p| squared_euclidean(p, &centroids[0]))
        .collect();

    while centroids.len() < k {
        let total: f64 = nearest.iter().sum();
        let idx = if total <= 0.0 {
            // Every point coincides with a seed already
            rng.random_range(0..n)
        } else {
            let mut target = rng.random::<f64>() * total;
            let mut chosen = n - 1;
            for (i, d) in nearest.iter().enumerate() {
                if target < *d {
                    chosen = i;
                    break;
                }
                target -= d;
            }
            chosen
        };

        let seed = points[idx].clone();
        for (d, p) in nearest.iter_mut().zip(points) {
            *d = d.min(squared_euclidean(p, &seed));
        }
        centroids.push(seed);
    }

    centroids
}

/// Assign each point to its nearest centroid (lowest index on ties).
/// Returns whether any assignment changed.
fn assign(points: &[Vec<f64>], centroids: &[Vec<f64>], assignments: &mut [usize]) -> bool {
    let mut changed = false;
    for (p, slot) in points.iter().zip(assignments.iter_mut()) {
        let mut best = 0;
        let mut best_dist = f64::INFINITY;
        for (c, centroid) in centroids.iter().enumerate() {
            let d = squared_euclidean(p, centroid);
            if d < best_dist {
                best_dist = d;
                best = c;
            }
        }
        if *slot != best {
            *slot = best;
            changed = true;
        }
    }
    changed
}

/// Mean of each cluster's members. An empty cluster steals the point
/// farthest from its own centroid (from a cluster that can spare one).
fn recompute(
    points: &[Vec<f64>],
    assignments: &mut [usize],
    previous: &[Vec<f64>],
) -> Vec<Vec<f64>> {
    let k = previous.len();
    let dim = points[0].len();
    let mut sums = vec![vec![0.0_f64; dim]; k];
    let mut counts = vec![0usize; k];

    for (p, &a) in points.iter().zip(assignments.iter()) {
        counts[a] += 1;
        for (s, x) in sums[a].iter_mut().zip(p) {
            *s += x;
        }
    }

    for c in 0..k {
        if counts[c] > 0 {
            continue;
        }
        let donor = (0..points.len())
            .filter(|&i| counts[assignments[i]] > 1)
            .max_by(|&i, &j| {
                let di = squared_euclidean(&points[i], &previous[assignments[i]]);
                let dj = squared_euclidean(&points[j], &previous[assignments[j]]);
                di.total_cmp(&dj)
            });
        if let Some(i) = donor {
            let from = assignments[i];
            counts[from] -= 1;
            for (s, x) in sums[from].iter_mut().zip(&points[i]) {
                *s -= x;
            }
            assignments[i] = c;
            counts[c] = 1;
            sums[c] = points[i].clone();
        }
    }

    sums.into_iter()
        .zip(counts)
        .enumerate()
        .map(|(c, (sum, count))| {
            if count == 0 {
                previous[c].clone()
            } else {
                sum.into_iter().map(|s| s / count as f64).collect()
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blobs() -> Vec<Vec<f64>> {
        vec![
            vec![0.0, 0.0],
            vec![0.1, 0.0],
            vec![0.0, 0.1],
            vec![10.0, 10.0],
            vec![10.1, 10.0],
            vec![10.0, 10.1],
        ]
    }

    #[test]
    fn test_separates_two_blobs() {
        let result = KMeans::new(2).fit(&blobs()).unwrap();
        let a = result.assignments[0];
        assert!(result.assignments[..3].iter().all(|&x| x == a));
        assert!(result.assignments[3..].iter().all(|&x| x != a));
        assert_eq!(result.member_counts(), vec![3, 3]);
    }

    #[test]
    fn test_deterministic_for_seed() {
        let first = KMeans::new(2).with_seed(7).fit(&blobs()).unwrap();
        let second = KMeans::new(2).with_seed(7).fit(&blobs()).unwrap();
        assert_eq!(first.centroids, second.centroids);
        assert_eq!(first.assignments, second.assignments);
    }

    #[test]
    fn test_k_equals_n_gives_each_point_its_own_cluster() {
        let points = vec![vec![0.0], vec![5.0], vec![9.0]];
        let result = KMeans::new(3).fit(&points).unwrap();
        assert_eq!(result.member_counts(), vec![1, 1, 1]);
    }

    #[test]
    fn test_duplicate_points_do_not_leave_empty_clusters_unfilled() {
        let points = vec![vec![1.0, 1.0]; 4];
        let result = KMeans::new(2).fit(&points).unwrap();
        assert_eq!(result.centroids.len(), 2);
        assert_eq!(result.member_counts().iter().sum::<usize>(), 4);
    }

    #[test]
    fn test_rejects_bad_k() {
        assert!(KMeans::new(0).fit(&blobs()).is_err());
        assert!(KMeans::new(7).fit(&blobs()).is_err());
    }

    #[test]
    fn test_rejects_mismatched_dims() {
        let points = vec![vec![0.0, 0.0], vec![1.0]];
        assert!(KMeans::new(1).fit(&points).is_err());
    }
}
