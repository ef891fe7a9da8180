//! Cluster-level connectivity to a curated set of target cell types

use crate::common::*;
use crate::feature_block::FeatureBlock;
use matrix_util::membership::partition_by_membership;

/// Clusters × targets; each column sums to one
#[derive(Debug, Clone)]
pub struct ClusterTargetTable {
    /// Distinct cluster labels, ascending
    pub clusters: Vec<usize>,
    pub targets: Vec<Box<str>>,
    /// Raw synapse sums before normalization
    pub totals: Mat,
    /// Fraction of each target's input coming from each cluster
    pub fractions: Mat,
}

impl ClusterTargetTable {
    pub fn cluster_names(&self) -> Vec<Box<str>> {
        self.clusters
            .iter()
            .map(|c| c.to_string().into_boxed_str())
            .collect()
    }
}

/// Sum connectivity to each target within each cluster, then divide
/// each target column by its total.
///
/// * `connectivity` - raw (unnormalized) connectivity block
/// * `labels` - one cluster label per sample
/// * `targets` - target cell types, must all be connectivity columns
pub fn aggregate_by_cluster<S: AsRef<str>>(
    connectivity: &FeatureBlock,
    labels: &[usize],
    targets: &[S],
) -> Result<ClusterTargetTable> {
    if labels.len() != connectivity.nrows() {
        return Err(LupinError::ShapeMismatch(format!(
            "{} cluster labels for {} samples",
            labels.len(),
            connectivity.nrows()
        )));
    }

    let target_cols = connectivity.resolve_columns(targets)?;
    let groups = partition_by_membership(labels);
    let x = connectivity.mat();

    let mut totals = Mat::zeros(groups.len(), target_cols.len());
    for (r, members) in groups.values().enumerate() {
        for (c, &j) in target_cols.iter().enumerate() {
            totals[(r, c)] = members.iter().map(|&i| x[(i, j)]).sum();
        }
    }

    let mut fractions = totals.clone();
    for (c, name) in targets.iter().enumerate() {
        let tot = totals.column(c).sum();
        if tot <= 0.0 || !tot.is_finite() {
            return Err(LupinError::ZeroTargetTotal {
                target: name.as_ref().into(),
            });
        }
        fractions.column_mut(c).unscale_mut(tot);
    }

    info!(
        "aggregated connectivity of {} clusters to {} target types",
        groups.len(),
        target_cols.len()
    );

    Ok(ClusterTargetTable {
        clusters: groups.into_keys().collect(),
        targets: targets.iter().map(|x| Box::from(x.as_ref())).collect(),
        totals,
        fractions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature_block::BlockKind;
    use approx::assert_abs_diff_eq;

    fn connectivity() -> FeatureBlock {
        let samples = (0..5).map(|i| format!("{}", i).into()).collect();
        let cols = vec!["Tm5".into(), "LC4".into(), "LC6".into()];
        #[rustfmt::skip]
        let x = Mat::from_row_slice(5, 3, &[
            1., 2., 0.,
            0., 6., 1.,
            5., 0., 3.,
            2., 2., 0.,
            0., 0., 4.,
        ]);
        FeatureBlock::new(BlockKind::Connectivity, samples, cols, x).unwrap()
    }

    #[test]
    fn columns_sum_to_one() -> anyhow::Result<()> {
        // labels need not be contiguous
        let labels = vec![7, 2, 7, 2, 9];
        let t = aggregate_by_cluster(&connectivity(), &labels, &["LC6", "LC4"])?;
        assert_eq!(t.clusters, vec![2, 7, 9]);
        assert_eq!(t.targets, vec![Box::<str>::from("LC6"), Box::<str>::from("LC4")]);

        // LC6: cluster 2 -> 1, cluster 7 -> 3, cluster 9 -> 4
        assert_eq!(t.totals.column(0).iter().copied().collect::<Vec<_>>(), vec![1., 3., 4.]);
        for c in 0..2 {
            assert_abs_diff_eq!(t.fractions.column(c).sum(), 1.0, epsilon = 1e-12);
        }
        assert_abs_diff_eq!(t.fractions[(0, 1)], 0.8, epsilon = 1e-12);
        Ok(())
    }

    #[test]
    fn singleton_clusters_are_valid() -> anyhow::Result<()> {
        let labels = vec![1, 2, 3, 4, 5];
        let t = aggregate_by_cluster(&connectivity(), &labels, &["LC4"])?;
        assert_eq!(t.fractions.nrows(), 5);
        assert_abs_diff_eq!(t.fractions[(1, 0)], 0.6, epsilon = 1e-12);
        Ok(())
    }

    #[test]
    fn missing_target_is_named() {
        let r = aggregate_by_cluster(&connectivity(), &[1, 1, 2, 2, 2], &["LC4", "LC10"]);
        match r {
            Err(LupinError::MissingTargets { missing }) => {
                assert_eq!(missing, vec![Box::<str>::from("LC10")])
            }
            other => panic!("unexpected {:?}", other.map(|t| t.clusters)),
        }
    }

    #[test]
    fn zero_total_target_is_an_error() {
        let mut b = connectivity().mat().clone();
        b.column_mut(1).fill(0.0);
        let block = connectivity().with_mat(b).unwrap();
        let r = aggregate_by_cluster(&block, &[1, 1, 2, 2, 2], &["LC6", "LC4"]);
        assert!(matches!(r, Err(LupinError::ZeroTargetTotal { target }) if &*target == "LC4"));
    }
}
