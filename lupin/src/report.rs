//! Per-cluster summary of the most prominent connectivity features

use crate::common::*;
use crate::feature_block::FeatureBlock;
use matrix_util::membership::partition_by_membership;

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ReportRecord {
    pub cluster: usize,
    /// 0-based rank within the cluster
    pub rank: usize,
    pub feature: Box<str>,
    pub mean: f64,
}

/// Column means of the rows in each cluster, clusters ascending
pub fn cluster_means(x: &Mat, labels: &[usize]) -> Result<(Vec<usize>, Mat)> {
    if labels.len() != x.nrows() {
        return Err(LupinError::ShapeMismatch(format!(
            "{} cluster labels for {} rows",
            labels.len(),
            x.nrows()
        )));
    }
    let groups = partition_by_membership(labels);
    let mut means = Mat::zeros(groups.len(), x.ncols());
    for (r, members) in groups.values().enumerate() {
        let sub = x.select_rows(members.iter());
        means.row_mut(r).copy_from(&sub.column_means().transpose());
    }
    Ok((groups.into_keys().collect(), means))
}

/// Indices of the `n` largest values, descending; ties keep column order
pub fn top_indices(values: &[f64], n: usize) -> Vec<usize> {
    let mut idx: Vec<usize> = (0..values.len()).collect();
    idx.sort_by(|&a, &b| values[b].total_cmp(&values[a]).then(a.cmp(&b)));
    idx.truncate(n);
    idx
}

/// For each cluster, rank the connectivity columns by their mean over
/// the cluster's samples and keep the top `top_n`
pub fn report_top_targets(
    connectivity: &FeatureBlock,
    labels: &[usize],
    top_n: usize,
    observer: &mut dyn StageObserver,
) -> Result<Vec<ReportRecord>> {
    let (clusters, means) = cluster_means(connectivity.mat(), labels)?;

    let mut records = Vec::with_capacity(clusters.len() * top_n);
    for (r, &cluster) in clusters.iter().enumerate() {
        let row: Vec<f64> = means.row(r).iter().copied().collect();
        for (rank, j) in top_indices(&row, top_n).into_iter().enumerate() {
            let rec = ReportRecord {
                cluster,
                rank,
                feature: connectivity.columns()[j].clone(),
                mean: row[j],
            };
            observer.report(&rec);
            records.push(rec);
        }
    }
    Ok(records)
}
