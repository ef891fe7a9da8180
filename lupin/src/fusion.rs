//! Column-wise concatenation of normalized feature blocks

use crate::common::*;
use crate::feature_block::{BlockKind, FeatureBlock};

/// Where a fused column came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FusedColumn {
    pub block: BlockKind,
    pub name: Box<str>,
    /// Column index within the source block
    pub source_index: usize,
}

/// Samples × (all block columns)
#[derive(Debug, Clone)]
pub struct FusedMatrix {
    pub mat: Mat,
    pub columns: Vec<FusedColumn>,
}

/// Concatenate blocks left to right. Row counts must match.
pub fn fuse_blocks(blocks: &[&FeatureBlock]) -> Result<FusedMatrix> {
    let nrows = blocks.first().map(|b| b.nrows()).unwrap_or(0);

    if let Some(b) = blocks.iter().find(|b| b.nrows() != nrows) {
        return Err(LupinError::ShapeMismatch(format!(
            "{} block has {} rows, expected {}",
            b.kind(),
            b.nrows(),
            nrows
        )));
    }

    let ncols: usize = blocks.iter().map(|b| b.ncols()).sum();
    let mut mat = Mat::zeros(nrows, ncols);
    let mut columns = Vec::with_capacity(ncols);

    let mut offset = 0;
    for b in blocks {
        mat.columns_mut(offset, b.ncols()).copy_from(b.mat());
        columns.extend(b.columns().iter().enumerate().map(|(j, name)| FusedColumn {
            block: b.kind(),
            name: name.clone(),
            source_index: j,
        }));
        offset += b.ncols();
    }

    debug!("fused {} blocks into {} x {}", blocks.len(), nrows, ncols);

    Ok(FusedMatrix { mat, columns })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(kind: BlockKind, nrow: usize, ncol: usize, base: f64) -> FeatureBlock {
        let samples = (0..nrow).map(|i| format!("{}", i).into()).collect();
        let cols = (0..ncol).map(|j| format!("{}{}", kind, j).into()).collect();
        FeatureBlock::new(kind, samples, cols, Mat::from_fn(nrow, ncol, |i, j| base + (i * 10 + j) as f64))
            .unwrap()
    }

    #[test]
    fn shapes_add_up_and_columns_are_traceable() -> anyhow::Result<()> {
        let con = block(BlockKind::Connectivity, 4, 2, 0.0);
        let dep = block(BlockKind::Depth, 4, 5, 100.0);
        let spr = block(BlockKind::Spread, 4, 3, 1000.0);

        let fused = fuse_blocks(&[&con, &dep, &spr])?;
        assert_eq!(fused.mat.shape(), (4, 10));
        let depth_cols: Vec<usize> = (0..10)
            .filter(|&j| fused.columns[j].block == BlockKind::Depth)
            .collect();
        assert_eq!(depth_cols, vec![2, 3, 4, 5, 6]);

        let j = 8;
        assert_eq!(&*fused.columns[j].name, "spread1");
        assert_eq!(fused.columns[j].source_index, 1);
        assert_eq!(fused.mat[(3, j)], spr.mat()[(3, 1)]);
        assert_eq!(fused.mat[(2, 0)], con.mat()[(2, 0)]);
        Ok(())
    }

    #[test]
    fn differing_row_counts_fail() {
        let con = block(BlockKind::Connectivity, 4, 2, 0.0);
        let dep = block(BlockKind::Depth, 3, 2, 0.0);
        assert!(matches!(
            fuse_blocks(&[&con, &dep]),
            Err(LupinError::ShapeMismatch(_))
        ));
    }
}
