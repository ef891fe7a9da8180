use crate::common_io::Delimiter;

/// A matrix along with its row and column names
#[derive(Debug, Clone, PartialEq)]
pub struct MatWithNames<M> {
    pub rows: Vec<Box<str>>,
    pub cols: Vec<Box<str>>,
    pub mat: M,
}

/// Read and write matrices from and to files
pub trait IoOps {
    type Scalar;
    type Mat;

    /// Read a delimited table with a header line. The column
    /// `row_name_index` holds row names; every column after
    /// `data_start` is parsed as a number.
    ///
    /// * `file` - file name (gzipped or not)
    /// * `delim` - delimiter
    /// * `row_name_index` - which column holds the row names
    /// * `data_start` - index of the first numeric column
    fn read_data(
        file: &str,
        delim: impl Into<Delimiter>,
        row_name_index: usize,
        data_start: usize,
    ) -> anyhow::Result<MatWithNames<Self::Mat>>;

    fn read_file_delim(
        file: &str,
        delim: impl Into<Delimiter>,
        skip: Option<usize>,
    ) -> anyhow::Result<Self::Mat>;

    fn write_file_delim(&self, file: &str, delim: &str) -> anyhow::Result<()>;

    fn to_tsv(&self, tsv_file: &str) -> anyhow::Result<()> {
        self.write_file_delim(tsv_file, "\t")
    }

    /// Write with a header line and row names in the first column
    ///
    /// * `file` - output file name
    /// * `row_names` - one per row
    /// * `column_names` - one per column
    /// * `corner` - header cell above the row names
    fn write_data_delim(
        &self,
        file: &str,
        row_names: &[Box<str>],
        column_names: &[Box<str>],
        corner: &str,
        delim: &str,
    ) -> anyhow::Result<()>;
}

/// Column-wise summary statistics
pub trait ColumnStatOps {
    type Scalar;
    type DVec;

    fn column_sums(&self) -> Self::DVec;

    fn column_means(&self) -> Self::DVec;

    /// Population variance (divide by `n`) of each column
    fn column_variances(&self) -> Self::DVec;

    /// Sum of column variances
    fn total_dispersion(&self) -> Self::Scalar;
}
