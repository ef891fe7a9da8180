//! Ward-linkage agglomerative clustering and flat cuts of the tree
//!
//! Cluster ids follow the usual linkage-matrix convention: leaves are
//! `0..n` and the cluster formed by merge `i` is `n + i`.

use crate::common::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashSet;

/// One row of the linkage table
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Merge {
    /// Smaller cluster id
    pub left: usize,
    /// Larger cluster id
    pub right: usize,
    /// Ward distance between the two clusters
    pub height: f64,
    /// Number of leaves under the merged cluster
    pub size: usize,
}

/// Full binary merge tree over `n_leaves` rows
#[derive(Debug, Clone, PartialEq)]
pub struct Dendrogram {
    n_leaves: usize,
    merges: Vec<Merge>,
}

impl Dendrogram {
    pub fn n_leaves(&self) -> usize {
        self.n_leaves
    }

    pub fn merges(&self) -> &[Merge] {
        &self.merges
    }

    /// Cut the tree into exactly `k` flat clusters by applying the
    /// first `n - k` merges. Groups are labelled `1..=k` in the order
    /// of their smallest member.
    pub fn cut(&self, k: usize) -> Result<Vec<usize>> {
        let n = self.n_leaves;
        if k == 0 {
            return Err(LupinError::InvalidClusterCount);
        }
        if k > n {
            return Err(LupinError::TooManyClusters {
                requested: k,
                distinct: n,
            });
        }

        // any leaf under cluster id -> union-find over leaves
        let mut leaf_of = (0..n).collect::<Vec<_>>();
        leaf_of.reserve(self.merges.len());
        let mut uf = UnionFind::new(n);

        for m in &self.merges[..(n - k)] {
            let a = leaf_of[m.left];
            uf.union(a, leaf_of[m.right]);
            leaf_of.push(a);
        }

        let mut root_label = vec![0usize; n];
        let mut next = 0;
        let mut labels = Vec::with_capacity(n);
        for i in 0..n {
            let r = uf.find(i);
            if root_label[r] == 0 {
                next += 1;
                root_label[r] = next;
            }
            labels.push(root_label[r]);
        }
        debug_assert_eq!(next, k);
        Ok(labels)
    }

    /// Leaves from left to right, visiting the smaller child id first
    pub fn leaf_order(&self) -> Vec<usize> {
        let n = self.n_leaves;
        if n == 0 {
            return vec![];
        }
        let mut order = Vec::with_capacity(n);
        let mut stack = vec![n + self.merges.len() - 1];
        while let Some(c) = stack.pop() {
            if c < n {
                order.push(c);
            } else {
                let m = &self.merges[c - n];
                stack.push(m.right);
                stack.push(m.left);
            }
        }
        order
    }

    /// `left right height size` lines
    pub fn to_lines(&self, sep: &str) -> Vec<Box<str>> {
        std::iter::once(["left", "right", "height", "size"].join(sep).into_boxed_str())
            .chain(self.merges.iter().map(|m| {
                format!(
                    "{}{}{}{}{}{}{}",
                    m.left, sep, m.right, sep, m.height, sep, m.size
                )
                .into_boxed_str()
            }))
            .collect()
    }
}

/// Union-Find (disjoint set) with path halving and union by rank.
struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    #[inline]
    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    #[inline]
    fn union(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return;
        }
        let (big, small) = if self.rank[ra] >= self.rank[rb] {
            (ra, rb)
        } else {
            (rb, ra)
        };
        self.parent[small] = big;
        if self.rank[big] == self.rank[small] {
            self.rank[big] += 1;
        }
    }
}

/// Upper-triangular pairwise storage
struct Condensed {
    n: usize,
    data: Vec<f64>,
}

impl Condensed {
    #[inline]
    fn index(&self, i: usize, j: usize) -> usize {
        let (i, j) = if i < j { (i, j) } else { (j, i) };
        self.n * i - i * (i + 1) / 2 + j - i - 1
    }

    #[inline]
    fn get(&self, i: usize, j: usize) -> f64 {
        self.data[self.index(i, j)]
    }

    #[inline]
    fn set(&mut self, i: usize, j: usize, v: f64) {
        let k = self.index(i, j);
        self.data[k] = v;
    }
}

fn squared_euclidean_rows(mat: &Mat) -> Condensed {
    let n = mat.nrows();
    let mut data = Vec::with_capacity(n * n.saturating_sub(1) / 2);
    for i in 0..n {
        for j in (i + 1)..n {
            let d: f64 = mat
                .row(i)
                .iter()
                .zip(mat.row(j).iter())
                .map(|(a, b)| (a - b) * (a - b))
                .sum();
            data.push(d);
        }
    }
    Condensed { n, data }
}

fn new_progress_bar(len: u64, template: &str) -> ProgressBar {
    let pb = ProgressBar::new(len);
    pb.set_style(ProgressStyle::with_template(template).unwrap_or_else(|_| ProgressStyle::default_bar()));
    pb
}

/// Agglomerative clustering of the rows of `mat` with Ward's
/// minimum-variance criterion on Euclidean distance.
///
/// Distances are kept squared and updated by the Lance-Williams
/// formula; merge heights are reported as their square roots. Among
/// equally cheap merges the pair with the lexicographically smallest
/// `(smaller id, larger id)` goes first.
pub fn ward_linkage(mat: &Mat) -> Result<Dendrogram> {
    let n = mat.nrows();
    if n == 0 {
        return Err(LupinError::ShapeMismatch("no rows to cluster".into()));
    }
    if mat.iter().any(|x| !x.is_finite()) {
        return Err(LupinError::NonFinite("clustering input".into()));
    }

    let mut dist = squared_euclidean_rows(mat);

    // slot -> current cluster
    let mut active = vec![true; n];
    let mut id: Vec<usize> = (0..n).collect();
    let mut size = vec![1usize; n];

    // nearest active neighbour of each slot, ties to the smaller id
    let nearest = |s: usize, active: &[bool], id: &[usize], dist: &Condensed| {
        let mut best: Option<(f64, usize)> = None;
        for t in (0..n).filter(|&t| t != s && active[t]) {
            let d = dist.get(s, t);
            best = match best {
                Some((bd, bt)) if bd < d || (bd == d && id[bt] < id[t]) => Some((bd, bt)),
                _ => Some((d, t)),
            };
        }
        best
    };

    let mut nn = vec![usize::MAX; n];
    let mut nn_dist = vec![f64::INFINITY; n];
    for s in 0..n {
        if let Some((d, t)) = nearest(s, &active, &id, &dist) {
            nn[s] = t;
            nn_dist[s] = d;
        }
    }

    let mut merges = Vec::with_capacity(n - 1);
    let pb = new_progress_bar((n - 1) as u64, "Ward linkage {bar:40} {pos}/{len} merges ({eta})");

    for step in 0..(n - 1) {
        // cheapest pair over all slots
        let mut best: Option<(f64, usize, usize, usize)> = None;
        for a in (0..n).filter(|&a| active[a]) {
            let b = nn[a];
            let key = (nn_dist[a], id[a].min(id[b]), id[a].max(id[b]));
            let better = match best {
                None => true,
                Some((d, lo, hi, _)) => {
                    key.0 < d || (key.0 == d && (key.1, key.2) < (lo, hi))
                }
            };
            if better {
                best = Some((key.0, key.1, key.2, a));
            }
        }

        let (d_st, lo, hi, a) = best.ok_or_else(|| {
            LupinError::ShapeMismatch("linkage ran out of clusters".into())
        })?;
        let b = nn[a];
        let (s, t) = (a.min(b), a.max(b));
        let (n_s, n_t) = (size[s] as f64, size[t] as f64);

        merges.push(Merge {
            left: lo,
            right: hi,
            height: d_st.max(0.0).sqrt(),
            size: size[s] + size[t],
        });

        active[t] = false;
        for k in (0..n).filter(|&k| active[k] && k != s) {
            let n_k = size[k] as f64;
            let d = ((n_k + n_s) * dist.get(k, s) + (n_k + n_t) * dist.get(k, t) - n_k * d_st)
                / (n_k + n_s + n_t);
            dist.set(k, s, d);
        }
        size[s] += size[t];
        id[s] = n + step;

        for k in (0..n).filter(|&k| active[k]) {
            if k == s || nn[k] == s || nn[k] == t {
                match nearest(k, &active, &id, &dist) {
                    Some((d, j)) => {
                        nn[k] = j;
                        nn_dist[k] = d;
                    }
                    None => {
                        nn[k] = usize::MAX;
                        nn_dist[k] = f64::INFINITY;
                    }
                }
            } else if dist.get(k, s) < nn_dist[k] {
                // Ward is reducible; this only catches rounding
                nn[k] = s;
                nn_dist[k] = dist.get(k, s);
            }
        }

        pb.inc(1);
    }
    pb.finish_and_clear();

    Ok(Dendrogram {
        n_leaves: n,
        merges,
    })
}

/// Number of distinct rows, counting exact duplicates once
pub fn count_distinct_rows(mat: &Mat) -> usize {
    let rows: HashSet<Vec<u64>> = mat
        .row_iter()
        .map(|r| r.iter().map(|&x| (x + 0.0).to_bits()).collect())
        .collect();
    rows.len()
}

/// Flat cluster assignment, labels `1..=num_clusters`
#[derive(Debug, Clone, PartialEq)]
pub struct FlatClusters {
    pub labels: Vec<usize>,
    pub num_clusters: usize,
}

impl FlatClusters {
    /// Sample count per cluster, indexed by `label - 1`
    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut counts = vec![0; self.num_clusters];
        for &label in &self.labels {
            counts[label - 1] += 1;
        }
        counts
    }

    /// Cluster assignment histogram as ASCII, showing up to
    /// `max_show` largest clusters sorted by size (descending).
    pub fn histogram_ascii(&self, max_width: usize, max_show: usize) -> String {
        let sizes = self.cluster_sizes();

        let mut ranked: Vec<(usize, usize)> = sizes
            .iter()
            .enumerate()
            .map(|(i, &s)| (i + 1, s))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

        let n_total = ranked.len();
        let n_show = max_show.min(n_total);
        let max_size = ranked.first().map(|&(_, s)| s).unwrap_or(1).max(1);
        let n_cells = self.labels.len().max(1) as f64;

        let mut lines = Vec::new();
        lines.push(format!(
            "Cluster assignments ({} cells, {} clusters):",
            self.labels.len(),
            n_total
        ));
        lines.push(String::new());

        for &(cluster_id, size) in ranked.iter().take(n_show) {
            let pct = 100.0 * size as f64 / n_cells;
            let bar_len = ((size as f64 / max_size as f64) * max_width as f64) as usize;
            let bar = "█".repeat(bar_len.max(1));

            lines.push(format!(
                "  Cluster {:3}  {:>6} cells ({:>5.1}%)  {}",
                cluster_id, size, pct, bar
            ));
        }

        if n_total > n_show {
            let hidden_cells: usize = ranked[n_show..].iter().map(|&(_, s)| s).sum();
            lines.push(format!(
                "  ... and {} more clusters ({} cells, {:.1}%)",
                n_total - n_show,
                hidden_cells,
                100.0 * hidden_cells as f64 / n_cells
            ));
        }

        lines.join("\n")
    }
}

/// Ward clustering of the rows, cut to exactly `k` clusters
pub fn hierarchical_clustering(
    mat: &Mat,
    k: usize,
    observer: &mut dyn StageObserver,
) -> Result<(FlatClusters, Dendrogram)> {
    if k == 0 {
        return Err(LupinError::InvalidClusterCount);
    }

    let distinct = count_distinct_rows(mat);
    if k > distinct {
        return Err(LupinError::TooManyClusters {
            requested: k,
            distinct,
        });
    }

    observer.message(&format!(
        "Ward linkage: {} samples x {} features, k={}",
        mat.nrows(),
        mat.ncols(),
        k
    ));

    let tree = ward_linkage(mat)?;
    let labels = tree.cut(k)?;
    let clusters = FlatClusters {
        labels,
        num_clusters: k,
    };
    observer.clusters(&clusters.cluster_sizes());

    Ok((clusters, tree))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::CollectObserver;
    use approx::assert_abs_diff_eq;

    fn points(xy: &[(f64, f64)]) -> Mat {
        Mat::from_fn(xy.len(), 2, |i, j| if j == 0 { xy[i].0 } else { xy[i].1 })
    }

    #[test]
    fn ward_heights_match_known_values() -> anyhow::Result<()> {
        // 1-d points 0, 1, 5
        let x = Mat::from_column_slice(3, 1, &[0.0, 1.0, 5.0]);
        let tree = ward_linkage(&x)?;
        let m = tree.merges();
        assert_eq!((m[0].left, m[0].right, m[0].size), (0, 1, 2));
        assert_abs_diff_eq!(m[0].height, 1.0, epsilon = 1e-12);
        // sqrt(2 * n1 n2 / (n1 + n2)) * |c1 - c2| = sqrt(4/3) * 4.5
        assert_eq!((m[1].left, m[1].right, m[1].size), (2, 3, 3));
        assert_abs_diff_eq!(m[1].height, (4.0f64 / 3.0).sqrt() * 4.5, epsilon = 1e-9);
        Ok(())
    }

    #[test]
    fn cut_separates_obvious_groups() -> anyhow::Result<()> {
        let x = points(&[(0., 0.), (10., 10.), (0.1, 0.), (10., 10.2), (0., 0.2), (20., 0.)]);
        let mut obs = CollectObserver::default();
        let (flat, tree) = hierarchical_clustering(&x, 3, &mut obs)?;
        let l = &flat.labels;
        assert_eq!(l[0], l[2]);
        assert_eq!(l[0], l[4]);
        assert_eq!(l[1], l[3]);
        assert_ne!(l[0], l[1]);
        assert_ne!(l[5], l[0]);
        assert_ne!(l[5], l[1]);
        // labelled by smallest member
        assert_eq!((l[0], l[1], l[5]), (1, 2, 3));
        assert_eq!(flat.cluster_sizes(), vec![3, 2, 1]);
        assert_eq!(obs.cluster_sizes, vec![vec![3, 2, 1]]);
        assert_eq!(tree.merges().len(), 5);
        Ok(())
    }

    #[test]
    fn heights_are_monotone() -> anyhow::Result<()> {
        let x = Mat::from_fn(30, 4, |i, j| ((i * 7 + j * 13) % 11) as f64 + 0.1 * i as f64);
        let tree = ward_linkage(&x)?;
        for w in tree.merges().windows(2) {
            assert!(w[0].height <= w[1].height + 1e-9);
        }
        assert_eq!(tree.merges().last().unwrap().size, 30);
        Ok(())
    }

    #[test]
    fn ties_break_by_merge_order() -> anyhow::Result<()> {
        // square: all four sides equal
        let x = points(&[(0., 0.), (1., 0.), (0., 1.), (1., 1.)]);
        let tree = ward_linkage(&x)?;
        assert_eq!((tree.merges()[0].left, tree.merges()[0].right), (0, 1));
        assert_eq!((tree.merges()[1].left, tree.merges()[1].right), (2, 3));
        assert_eq!(tree.cut(2)?, vec![1, 1, 2, 2]);
        Ok(())
    }

    #[test]
    fn every_cut_gives_exactly_k_groups() -> anyhow::Result<()> {
        let x = Mat::from_fn(12, 3, |i, j| ((i * 31 + j * 17) % 13) as f64);
        let tree = ward_linkage(&x)?;
        for k in 1..=12 {
            let labels = tree.cut(k)?;
            let distinct: HashSet<usize> = labels.iter().copied().collect();
            assert_eq!(distinct.len(), k);
            assert!(labels.iter().all(|&l| (1..=k).contains(&l)));
        }
        Ok(())
    }

    #[test]
    fn too_many_clusters_for_duplicates() {
        let x = points(&[(1., 1.), (1., 1.), (2., 2.)]);
        assert_eq!(count_distinct_rows(&x), 2);
        let r = hierarchical_clustering(&x, 3, &mut CollectObserver::default());
        assert!(matches!(
            r,
            Err(LupinError::TooManyClusters {
                requested: 3,
                distinct: 2
            })
        ));
        let r = hierarchical_clustering(&x, 0, &mut CollectObserver::default());
        assert!(matches!(r, Err(LupinError::InvalidClusterCount)));
    }

    #[test]
    fn leaf_order_visits_every_leaf_once() -> anyhow::Result<()> {
        let x = Mat::from_column_slice(4, 1, &[0.0, 10.0, 0.5, 10.5]);
        let tree = ward_linkage(&x)?;
        assert_eq!(tree.leaf_order(), vec![0, 2, 1, 3]);

        let single = ward_linkage(&Mat::from_element(1, 2, 3.0))?;
        assert!(single.merges().is_empty());
        assert_eq!(single.leaf_order(), vec![0]);
        assert_eq!(single.cut(1)?, vec![1]);
        Ok(())
    }

    #[test]
    fn histogram_lists_largest_first() {
        let flat = FlatClusters {
            labels: vec![2, 2, 1, 2, 3],
            num_clusters: 3,
        };
        let h = flat.histogram_ascii(10, 2);
        let lines: Vec<&str> = h.lines().collect();
        assert!(lines[0].contains("5 cells, 3 clusters"));
        assert!(lines[2].contains("Cluster   2"));
        assert!(lines.last().unwrap().contains("1 more clusters"));
    }
}
