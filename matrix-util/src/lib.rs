pub mod common_io; // reading and writing (gzipped) text files
pub mod dmatrix_io; // named table io for `DMatrix`
pub mod dmatrix_stat; // column statistics for `DMatrix`
pub mod membership; // grouping elements by membership
pub mod traits; // traits shared across matrix types
