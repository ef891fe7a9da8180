//! Feature blocks with a fixed column schema, and the aligned set of
//! the three blocks that describe the same sample list

use crate::common::*;
use std::collections::HashMap;
use std::fmt;

/// Which data source a block came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    Connectivity,
    Depth,
    Spread,
}

impl BlockKind {
    pub const ALL: [BlockKind; 3] = [BlockKind::Connectivity, BlockKind::Depth, BlockKind::Spread];

    /// Name used in table file names and messages
    pub fn name(&self) -> &'static str {
        match self {
            BlockKind::Connectivity => "connectivity",
            BlockKind::Depth => "depth",
            BlockKind::Spread => "spread",
        }
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Number of principal axes in the spread block
pub const NUM_SPREAD_AXES: usize = 3;

/// A samples × features table. Column names are fixed at
/// construction and resolved through an index, never by scanning.
#[derive(Debug, Clone)]
pub struct FeatureBlock {
    kind: BlockKind,
    samples: Vec<Box<str>>,
    columns: Vec<Box<str>>,
    column_index: HashMap<Box<str>, usize>,
    mat: Mat,
}

impl FeatureBlock {
    pub fn new(
        kind: BlockKind,
        samples: Vec<Box<str>>,
        columns: Vec<Box<str>>,
        mat: Mat,
    ) -> Result<Self> {
        if samples.len() != mat.nrows() || columns.len() != mat.ncols() {
            return Err(LupinError::ShapeMismatch(format!(
                "{} block: {} samples and {} columns for a {} x {} matrix",
                kind,
                samples.len(),
                columns.len(),
                mat.nrows(),
                mat.ncols()
            )));
        }

        if kind == BlockKind::Spread && columns.len() != NUM_SPREAD_AXES {
            return Err(LupinError::ShapeMismatch(format!(
                "spread block must have {} columns, found {}",
                NUM_SPREAD_AXES,
                columns.len()
            )));
        }

        let mut column_index = HashMap::with_capacity(columns.len());
        for (j, c) in columns.iter().enumerate() {
            if column_index.insert(c.clone(), j).is_some() {
                return Err(LupinError::ShapeMismatch(format!(
                    "{} block has duplicate column {}",
                    kind, c
                )));
            }
        }

        Ok(Self {
            kind,
            samples,
            columns,
            column_index,
            mat,
        })
    }

    pub fn from_table(kind: BlockKind, table: MatWithNames<Mat>) -> Result<Self> {
        Self::new(kind, table.rows, table.cols, table.mat)
    }

    pub fn kind(&self) -> BlockKind {
        self.kind
    }

    pub fn samples(&self) -> &[Box<str>] {
        &self.samples
    }

    pub fn columns(&self) -> &[Box<str>] {
        &self.columns
    }

    pub fn mat(&self) -> &Mat {
        &self.mat
    }

    pub fn nrows(&self) -> usize {
        self.mat.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.mat.ncols()
    }

    pub fn column_of(&self, name: &str) -> Option<usize> {
        self.column_index.get(name).copied()
    }

    /// Column indices of `names` in the given order; fails naming
    /// every missing column
    pub fn resolve_columns<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<usize>> {
        let mut found = Vec::with_capacity(names.len());
        let mut missing = vec![];
        for name in names {
            match self.column_of(name.as_ref()) {
                Some(j) => found.push(j),
                None => missing.push(Box::from(name.as_ref())),
            }
        }
        if missing.is_empty() {
            Ok(found)
        } else {
            Err(LupinError::MissingTargets { missing })
        }
    }

    /// Same samples and columns with a different matrix
    pub fn with_mat(&self, mat: Mat) -> Result<Self> {
        Self::new(self.kind, self.samples.clone(), self.columns.clone(), mat)
    }
}

/// Extract the provenance tag, the part of an origin name from the
/// first `marker` onwards
///
/// e.g. `connectivity_typenullbodyidlist_ub1000_lb50.csv` ->
/// `bodyidlist_ub1000_lb50.csv`
pub fn provenance_tag(origin: &str, marker: &str) -> Result<Box<str>> {
    origin
        .find(marker)
        .map(|pos| Box::from(&origin[pos..]))
        .ok_or_else(|| {
            LupinError::Consistency(format!(
                "no provenance marker `{}` in table name {}",
                marker, origin
            ))
        })
}

/// The three blocks, checked to describe the same ordered samples
#[derive(Debug, Clone)]
pub struct FeatureTables {
    pub connectivity: FeatureBlock,
    pub depth: FeatureBlock,
    pub spread: FeatureBlock,
    /// Shared provenance tag
    pub provenance: Box<str>,
    /// Origin name of the depth table, used to name outputs
    pub depth_origin: Box<str>,
}

/// A block together with the name of the table it was read from
#[derive(Debug, Clone)]
pub struct SourcedBlock {
    pub origin: Box<str>,
    pub block: FeatureBlock,
}

impl FeatureTables {
    /// Check provenance tags and sample order before anything is
    /// computed
    pub fn aligned(
        connectivity: SourcedBlock,
        depth: SourcedBlock,
        spread: SourcedBlock,
        marker: &str,
    ) -> Result<Self> {
        let con_tag = provenance_tag(&connectivity.origin, marker)?;
        let dep_tag = provenance_tag(&depth.origin, marker)?;
        let spr_tag = provenance_tag(&spread.origin, marker)?;

        if con_tag != dep_tag || dep_tag != spr_tag {
            return Err(LupinError::Consistency(format!(
                "connectivity and morphology matrices are based on different sets of cells \
                 ({} vs. {} vs. {})",
                con_tag, dep_tag, spr_tag
            )));
        }

        for other in [&depth.block, &spread.block] {
            if other.samples() != connectivity.block.samples() {
                return Err(LupinError::Consistency(format!(
                    "{} table lists different samples (or order) than the connectivity table",
                    other.kind()
                )));
            }
        }

        info!("Connectivity matrix: {}", connectivity.origin);
        info!("Morphology matrix: {}", depth.origin);

        Ok(Self {
            connectivity: connectivity.block,
            depth: depth.block,
            spread: spread.block,
            provenance: con_tag,
            depth_origin: depth.origin,
        })
    }

    pub fn samples(&self) -> &[Box<str>] {
        self.connectivity.samples()
    }

    pub fn block(&self, kind: BlockKind) -> &FeatureBlock {
        match kind {
            BlockKind::Connectivity => &self.connectivity,
            BlockKind::Depth => &self.depth,
            BlockKind::Spread => &self.spread,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: usize) -> Vec<Box<str>> {
        (0..n).map(|i| format!("{}", 1000 + i).into_boxed_str()).collect()
    }

    fn block(kind: BlockKind, samples: Vec<Box<str>>, ncol: usize) -> FeatureBlock {
        let n = samples.len();
        let cols = (0..ncol).map(|j| format!("c{}", j).into_boxed_str()).collect();
        FeatureBlock::new(kind, samples, cols, Mat::from_fn(n, ncol, |i, j| (i + j) as f64)).unwrap()
    }

    fn sourced(origin: &str, block: FeatureBlock) -> SourcedBlock {
        SourcedBlock {
            origin: origin.into(),
            block,
        }
    }

    #[test]
    fn provenance_tag_from_marker() {
        let tag = provenance_tag("connectivity_typenullbodyidlist_ub1000_lb50.csv", "bodyidlist");
        assert_eq!(&*tag.unwrap(), "bodyidlist_ub1000_lb50.csv");
        assert!(provenance_tag("depth_LT1.csv", "bodyidlist").is_err());
    }

    #[test]
    fn resolve_columns_reports_all_missing() {
        let b = block(BlockKind::Connectivity, ids(3), 2);
        assert_eq!(b.resolve_columns(&["c1", "c0"]).unwrap(), vec![1, 0]);
        match b.resolve_columns(&["c0", "LC4", "LC6"]) {
            Err(LupinError::MissingTargets { missing }) => {
                assert_eq!(missing, vec![Box::<str>::from("LC4"), Box::<str>::from("LC6")]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn spread_needs_three_axes() {
        let cols = vec!["SD1".into(), "SD2".into()];
        let r = FeatureBlock::new(BlockKind::Spread, ids(2), cols, Mat::zeros(2, 2));
        assert!(matches!(r, Err(LupinError::ShapeMismatch(_))));
    }

    #[test]
    fn mismatched_provenance_aborts() {
        let r = FeatureTables::aligned(
            sourced("connectivity_bodyidlist_a.csv", block(BlockKind::Connectivity, ids(3), 2)),
            sourced("depth_LT1_bodyidlist_b.csv", block(BlockKind::Depth, ids(3), 2)),
            sourced("spread_LT1_bodyidlist_b.csv", block(BlockKind::Spread, ids(3), 3)),
            "bodyidlist",
        );
        assert!(matches!(r, Err(LupinError::Consistency(_))));
    }

    #[test]
    fn reordered_samples_abort() {
        let mut shuffled = ids(3);
        shuffled.swap(0, 2);
        let r = FeatureTables::aligned(
            sourced("connectivity_bodyidlist_a.csv", block(BlockKind::Connectivity, ids(3), 2)),
            sourced("depth_LT1_bodyidlist_a.csv", block(BlockKind::Depth, shuffled, 2)),
            sourced("spread_LT1_bodyidlist_a.csv", block(BlockKind::Spread, ids(3), 3)),
            "bodyidlist",
        );
        assert!(matches!(r, Err(LupinError::Consistency(_))));
    }

    #[test]
    fn aligned_tables_share_a_tag() {
        let t = FeatureTables::aligned(
            sourced("connectivity_bodyidlist_a.csv", block(BlockKind::Connectivity, ids(3), 2)),
            sourced("depth_LT1_bodyidlist_a.csv", block(BlockKind::Depth, ids(3), 2)),
            sourced("spread_LT1_bodyidlist_a.csv", block(BlockKind::Spread, ids(3), 3)),
            "bodyidlist",
        )
        .unwrap();
        assert_eq!(&*t.provenance, "bodyidlist_a.csv");
        assert_eq!(t.samples().len(), 3);
    }
}
