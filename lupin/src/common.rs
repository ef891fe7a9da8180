#![allow(unused)]

pub use matrix_util::common_io as io;
pub use matrix_util::traits::{ColumnStatOps, IoOps, MatWithNames};

pub use clap::{Args, Parser, Subcommand};

pub use log::{debug, info, warn};

pub use crate::error::{LupinError, Result};
pub use crate::observer::StageObserver;

pub type Mat = nalgebra::DMatrix<f64>;

pub const DEFAULT_NUM_CLUSTERS: usize = 40;
pub const DEFAULT_TOP_N: usize = 5;
pub const DEFAULT_N_SHOW: usize = 30;
pub const DEFAULT_TRUST_WEIGHTS: [f64; 3] = [5.0, 3.0, 1.0];
pub const DEFAULT_PROVENANCE_MARKER: &str = "bodyidlist";

/// Classical lobula columnar (LC) and lobula plate-lobula columnar
/// (LPLC) types used for the downstream analysis
pub const DEFAULT_TARGET_TYPES: [&str; 21] = [
    "LC4", "LC6", "LC9", "LC10", "LC11", "LC12", "LC13", "LC14", "LC15", "LC16", "LC17", "LC18",
    "LC20", "LC21", "LC22", "LC24", "LC25", "LC26", "LPLC1", "LPLC2", "LPLC4",
];
