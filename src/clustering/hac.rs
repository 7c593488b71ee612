// Hierarchical agglomerative clustering with Ward linkage.
//
// The pairwise distance matrix under the chosen metric is itself treated as
// the observation matrix: each row is one observation and Ward's criterion
// runs on Euclidean distances between those rows. Merges are found with the
// nearest-neighbor chain algorithm, then ordered by distance (ties keep the
// order the chain found them in) and numbered like a standard linkage
// matrix: leaves are 0..n, the merge at position i creates cluster n + i.
//
// Tree height counts an absent child as height 1, so a lone leaf has height
// 2. Without an explicit cut height, every integer height in
// [2, tree_height + 1) is tried and the best silhouette wins.

use ndarray::Array2;
use serde::Serialize;
use tracing::debug;

use super::distance::{pairwise_distances, DistanceMetric};
use super::sweep::{sweep_select, CancelFlag, SweepPoint};
use crate::error::{PipelineError, Result};

/// One row of the linkage matrix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Merge {
    pub left: usize,
    pub right: usize,
    pub distance: f64,
    /// Number of leaves under the new cluster
    pub size: usize,
}

#[derive(Debug, Clone)]
pub struct HacOutcome {
    pub labels: Vec<usize>,
    pub height: f64,
    /// Empty when the height was given explicitly
    pub sweep: Vec<SweepPoint<f64>>,
}

/// Ward linkage over the rows of `observations`.
pub fn ward_linkage(observations: &Array2<f64>) -> Vec<Merge> {
    let n = observations.nrows();
    if n < 2 {
        return Vec::new();
    }

    // Working distances between current clusters, indexed by a
    // representative leaf. A merge of x into y keeps y.
    let mut dist = pairwise_distances(observations, DistanceMetric::Euclidean);
    let mut size = vec![1usize; n];
    let mut active = vec![true; n];
    let mut chain: Vec<usize> = Vec::with_capacity(n);
    // (x, y, distance) in discovery order, as representative leaves
    let mut raw: Vec<(usize, usize, f64)> = Vec::with_capacity(n - 1);

    for _ in 0..n - 1 {
        if chain.is_empty() {
            if let Some(first) = active.iter().position(|&a| a) {
                chain.push(first);
            }
        }

        let (x, y, d) = loop {
            let x = chain[chain.len() - 1];
            let (mut y, mut best) = if chain.len() >= 2 {
                let prev = chain[chain.len() - 2];
                (prev, dist[[x, prev]])
            } else {
                (usize::MAX, f64::INFINITY)
            };

            for i in 0..n {
                if active[i] && i != x && dist[[x, i]] < best {
                    best = dist[[x, i]];
                    y = i;
                }
            }

            if chain.len() >= 2 && y == chain[chain.len() - 2] {
                chain.truncate(chain.len() - 2);
                break (x, y, best);
            }
            chain.push(y);
        };

        let (x, y) = if x < y { (x, y) } else { (y, x) };
        let (nx, ny) = (size[x] as f64, size[y] as f64);

        for i in 0..n {
            if !active[i] || i == x || i == y {
                continue;
            }
            let ni = size[i] as f64;
            let updated = (((ni + nx) * dist[[i, x]].powi(2) + (ni + ny) * dist[[i, y]].powi(2)
                - ni * d * d)
                / (ni + nx + ny))
                .max(0.0)
                .sqrt();
            dist[[i, y]] = updated;
            dist[[y, i]] = updated;
        }

        active[x] = false;
        size[y] += size[x];
        raw.push((x, y, d));
    }

    raw.sort_by(|a, b| a.2.total_cmp(&b.2));
    label_merges(n, &raw)
}

/// Translate representative-leaf merges into linkage cluster ids.
fn label_merges(n: usize, raw: &[(usize, usize, f64)]) -> Vec<Merge> {
    let mut uf = UnionFind::new(2 * n - 1);
    // Current linkage id of the cluster each union-find root belongs to
    let mut cluster_of: Vec<usize> = (0..2 * n - 1).collect();
    let mut sizes = vec![1usize; 2 * n - 1];

    raw.iter()
        .enumerate()
        .map(|(step, &(x, y, distance))| {
            let a = cluster_of[uf.find(x)];
            let b = cluster_of[uf.find(y)];
            let id = n + step;
            let size = sizes[a] + sizes[b];
            sizes[id] = size;

            let root = uf.union(x, y);
            cluster_of[root] = id;

            Merge {
                left: a.min(b),
                right: a.max(b),
                distance,
                size,
            }
        })
        .collect()
}

/// Height of the merge tree; an absent child counts as 1, a leaf is 2.
pub fn tree_height(merges: &[Merge], n_leaves: usize) -> usize {
    if n_leaves == 0 {
        return 1;
    }
    let mut heights = vec![2usize; n_leaves + merges.len()];
    for (step, merge) in merges.iter().enumerate() {
        heights[n_leaves + step] = 1 + heights[merge.left].max(heights[merge.right]);
    }
    heights.last().copied().unwrap_or(2)
}

/// Flat labels after applying every merge with distance at or below
/// `height`. Labels are numbered by first appearance in input order.
pub fn cut_tree(merges: &[Merge], n_leaves: usize, height: f64) -> Vec<usize> {
    let mut uf = UnionFind::new(n_leaves + merges.len());
    for (step, merge) in merges.iter().enumerate() {
        if merge.distance > height {
            break;
        }
        let id = n_leaves + step;
        uf.union(merge.left, id);
        uf.union(merge.right, id);
    }

    let mut label_of_root: Vec<Option<usize>> = vec![None; n_leaves + merges.len()];
    let mut next = 0;
    (0..n_leaves)
        .map(|leaf| {
            let root = uf.find(leaf);
            *label_of_root[root].get_or_insert_with(|| {
                next += 1;
                next - 1
            })
        })
        .collect()
}

/// Candidate cut heights for the automatic search.
pub fn height_candidates(tree_height: usize) -> Vec<f64> {
    (2..tree_height + 1).map(|h| h as f64).collect()
}

/// Cluster with Ward-linkage HAC, sweeping the cut height when none is given.
pub fn cluster_hac(
    data: &Array2<f64>,
    metric: DistanceMetric,
    height: Option<f64>,
    cancel: &CancelFlag,
) -> Result<HacOutcome> {
    let n = data.nrows();
    if n == 0 {
        return Err(PipelineError::InsufficientData {
            needed: 1,
            found: 0,
        });
    }

    let distances = pairwise_distances(data, metric);
    let merges = ward_linkage(&distances);
    let tree_height = tree_height(&merges, n);
    debug!(%metric, vectors = n, tree_height, "Built Ward linkage");

    if let Some(height) = height {
        if !height.is_finite() || height < 0.0 {
            return Err(PipelineError::invalid("height", height.to_string()));
        }
        return Ok(HacOutcome {
            labels: cut_tree(&merges, n, height),
            height,
            sweep: Vec::new(),
        });
    }

    let result = sweep_select(data, height_candidates(tree_height), cancel, "HAC", |h| {
        Ok(Some(cut_tree(&merges, n, h)))
    })?;

    Ok(HacOutcome {
        labels: result.labels,
        height: result.best,
        sweep: result.points,
    })
}

struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    /// Join the sets of `a` and `b`, returning the new root.
    fn union(&mut self, a: usize, b: usize) -> usize {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra != rb {
            self.parent[ra] = rb;
        }
        rb
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn test_single_leaf_height_is_two() {
        assert_eq!(tree_height(&[], 1), 2);
    }

    #[test]
    fn test_tree_height_balanced_and_chain() {
        // ((0,1),(2,3)) -> leaves 2, pairs 3, root 4
        let balanced = vec![
            Merge { left: 0, right: 1, distance: 1.0, size: 2 },
            Merge { left: 2, right: 3, distance: 1.0, size: 2 },
            Merge { left: 4, right: 5, distance: 2.0, size: 4 },
        ];
        assert_eq!(tree_height(&balanced, 4), 4);

        // (((0,1),2),3) -> 5
        let chain = vec![
            Merge { left: 0, right: 1, distance: 1.0, size: 2 },
            Merge { left: 2, right: 4, distance: 2.0, size: 3 },
            Merge { left: 3, right: 5, distance: 3.0, size: 4 },
        ];
        assert_eq!(tree_height(&chain, 4), 5);
    }

    #[test]
    fn test_ward_on_points() {
        // Observations on a line: 0, 1, 5. Ward distance for singletons is
        // the Euclidean distance, so (0,1) merges first at 1.0. Then
        // d(2, {0,1}) = sqrt((2*25 + 2*16 - 1) / 3) = sqrt(27).
        let obs = array![[0.0], [1.0], [5.0]];
        let merges = ward_linkage(&obs);

        assert_eq!(merges.len(), 2);
        assert_eq!((merges[0].left, merges[0].right), (0, 1));
        assert!((merges[0].distance - 1.0).abs() < 1e-12);
        assert_eq!((merges[1].left, merges[1].right), (2, 3));
        assert!((merges[1].distance - 27.0_f64.sqrt()).abs() < 1e-12);
        assert_eq!(merges[1].size, 3);
    }

    #[test]
    fn test_linkage_sorted_by_distance() {
        let obs = array![[0.0], [0.5], [10.0], [10.1], [30.0]];
        let merges = ward_linkage(&obs);
        assert_eq!(merges.len(), 4);
        for pair in merges.windows(2) {
            assert!(pair[0].distance <= pair[1].distance);
        }
        assert_eq!(merges.last().map(|m| m.size), Some(5));
    }

    #[test]
    fn test_cut_tree_labels() {
        let obs = array![[0.0], [1.0], [5.0]];
        let merges = ward_linkage(&obs);

        assert_eq!(cut_tree(&merges, 3, 0.5), vec![0, 1, 2]);
        // Merge at exactly the cut height is applied
        assert_eq!(cut_tree(&merges, 3, 1.0), vec![0, 0, 1]);
        assert_eq!(cut_tree(&merges, 3, 100.0), vec![0, 0, 0]);
    }

    #[test]
    fn test_cut_labels_first_appearance() {
        let obs = array![[5.0], [0.0], [1.0]];
        let merges = ward_linkage(&obs);
        assert_eq!(cut_tree(&merges, 3, 1.0), vec![0, 1, 1]);
    }

    #[test]
    fn test_height_candidates() {
        assert_eq!(height_candidates(2), vec![2.0]);
        assert_eq!(height_candidates(4), vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_explicit_height() {
        let data = array![[0.0, 0.0], [0.0, 0.1], [9.0, 9.0], [9.0, 9.1]];
        let outcome =
            cluster_hac(&data, DistanceMetric::Euclidean, Some(1.0), &CancelFlag::new()).unwrap();
        assert_eq!(outcome.labels, vec![0, 0, 1, 1]);
        assert!(outcome.sweep.is_empty());
    }

    #[test]
    fn test_sweep_height_in_range() {
        let data = array![
            [0.0, 0.0],
            [0.0, 0.2],
            [6.0, 6.0],
            [6.0, 6.2],
            [12.0, 0.0],
            [12.0, 0.2],
        ];
        let distances = pairwise_distances(&data, DistanceMetric::Euclidean);
        let merges = ward_linkage(&distances);
        let height = tree_height(&merges, 6);

        let outcome =
            cluster_hac(&data, DistanceMetric::Euclidean, None, &CancelFlag::new()).unwrap();
        assert!(outcome.height >= 2.0 && outcome.height < (height + 1) as f64);

        let best = outcome
            .sweep
            .iter()
            .filter_map(|p| p.score)
            .fold(f64::NEG_INFINITY, f64::max);
        let first = outcome
            .sweep
            .iter()
            .find(|p| p.score == Some(best))
            .map(|p| p.parameter);
        assert_eq!(first, Some(outcome.height));
    }

    #[test]
    fn test_negative_height_rejected() {
        let data = array![[0.0], [1.0]];
        assert!(cluster_hac(&data, DistanceMetric::Euclidean, Some(-1.0), &CancelFlag::new()).is_err());
    }
}
