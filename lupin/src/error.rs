//! Failure modes of the clustering pipeline
//!
//! Every stage either succeeds as a whole or returns one of these;
//! nothing is written to disk after a failure.

use crate::feature_block::BlockKind;

pub type Result<T> = std::result::Result<T, LupinError>;

#[derive(thiserror::Error, Debug)]
pub enum LupinError {
    /// Input tables were derived from different sample lists
    #[error("inconsistent inputs: {0}")]
    Consistency(String),

    #[error("{block} block has zero total dispersion (every column is constant)")]
    ZeroDispersion { block: BlockKind },

    #[error("target cell type {target} receives zero total connectivity")]
    ZeroTargetTotal { target: Box<str> },

    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("target cell type(s) not found in connectivity columns: {}", join_names(.missing))]
    MissingTargets { missing: Vec<Box<str>> },

    #[error("requested {requested} clusters, but only {distinct} distinct samples are available")]
    TooManyClusters { requested: usize, distinct: usize },

    #[error("number of clusters must be > 0")]
    InvalidClusterCount,

    #[error("{block} block has {nrows} row(s); need at least 2")]
    TooFewRows { block: BlockKind, nrows: usize },

    #[error("{block} block has no feature columns")]
    EmptyBlock { block: BlockKind },

    #[error("non-finite value in {0}")]
    NonFinite(String),

    #[error("failed to resolve table: {0}")]
    Source(String),

    #[error(transparent)]
    Io(#[from] anyhow::Error),
}

fn join_names(names: &[Box<str>]) -> String {
    names
        .iter()
        .map(|x| &**x)
        .collect::<Vec<_>>()
        .join(", ")
}
