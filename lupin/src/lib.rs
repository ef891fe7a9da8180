pub mod aggregate;
pub mod common;
pub mod error;
pub mod feature_block;
pub mod fusion;
pub mod hclust;
pub mod normalize;
pub mod observer;
pub mod pipeline;
pub mod recluster;
pub mod report;
pub mod run_cluster;
pub mod table_source;
