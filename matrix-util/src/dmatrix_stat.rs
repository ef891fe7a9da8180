use crate::traits::ColumnStatOps;
use nalgebra::{DMatrix, DVector};

impl ColumnStatOps for DMatrix<f64> {
    type Scalar = f64;
    type DVec = DVector<f64>;

    fn column_sums(&self) -> Self::DVec {
        DVector::from_iterator(self.ncols(), self.column_iter().map(|c| c.sum()))
    }

    fn column_means(&self) -> Self::DVec {
        let n = self.nrows();
        if n == 0 {
            return DVector::zeros(self.ncols());
        }
        self.column_sums() / n as f64
    }

    fn column_variances(&self) -> Self::DVec {
        let n = self.nrows();
        if n == 0 {
            return DVector::zeros(self.ncols());
        }
        // two-pass to avoid cancellation on large counts
        DVector::from_iterator(
            self.ncols(),
            self.column_iter().map(|c| {
                let mu = c.mean();
                c.iter().map(|&x| (x - mu) * (x - mu)).sum::<f64>() / n as f64
            }),
        )
    }

    fn total_dispersion(&self) -> f64 {
        self.column_variances().sum()
    }
}
