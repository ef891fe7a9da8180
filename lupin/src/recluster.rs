//! Grouping the target cell types by where their input comes from

use crate::aggregate::ClusterTargetTable;
use crate::common::*;
use crate::hclust::{ward_linkage, Dendrogram};

/// Ward tree over target types and its display order
#[derive(Debug, Clone)]
pub struct TargetOrdering {
    pub tree: Dendrogram,
    /// Target column indices from left to right in the tree
    pub leaf_order: Vec<usize>,
}

impl TargetOrdering {
    pub fn ordered_targets(&self, table: &ClusterTargetTable) -> Vec<Box<str>> {
        self.leaf_order
            .iter()
            .map(|&j| table.targets[j].clone())
            .collect()
    }

    /// Cluster fractions with the target columns permuted into leaf order
    pub fn ordered_fractions(&self, table: &ClusterTargetTable) -> Mat {
        table.fractions.select_columns(self.leaf_order.iter())
    }
}

/// Cluster the target types (rows of the transposed fraction table)
/// with the same Ward linkage as the samples. The tree is not cut.
pub fn recluster_targets(table: &ClusterTargetTable) -> Result<TargetOrdering> {
    let tree = ward_linkage(&table.fractions.transpose())?;
    let leaf_order = tree.leaf_order();
    debug!("target leaf order: {:?}", leaf_order);
    Ok(TargetOrdering { tree, leaf_order })
}
