//! Joint principal-component projection.
//!
//! The two waveform sets are embedded with a single basis fit on their
//! union, so the J3 statistic compares them in a shared space.

use nalgebra::{DMatrix, DVector};

use crate::error::{HeldUnitError, HeldUnitResult};

/// A fitted projection: union mean plus the top-k eigenvectors of the
/// union covariance, as columns.
pub(crate) struct PcaBasis {
    mean: DVector<f64>,
    components: DMatrix<f64>,
}

fn matrix_from_rows(rows: &[Vec<f64>], d: usize) -> DMatrix<f64> {
    DMatrix::from_fn(rows.len(), d, |i, j| rows[i][j])
}

/// Fit a k-dimensional basis on the union of two row sets.
pub(crate) fn fit_joint(a: &[Vec<f64>], b: &[Vec<f64>], k: usize) -> HeldUnitResult<PcaBasis> {
    let d = a.first().or_else(|| b.first()).map_or(0, Vec::len);
    let n = a.len() + b.len();
    if d < k {
        return Err(HeldUnitError::degenerate(format!(
            "{d} time samples cannot support a {k}-dimensional embedding"
        )));
    }
    if n < 2 {
        return Err(HeldUnitError::degenerate(
            "principal-component fit needs at least 2 spikes in the union",
        ));
    }

    let mut union = DMatrix::zeros(n, d);
    union.view_mut((0, 0), (a.len(), d)).copy_from(&matrix_from_rows(a, d));
    union.view_mut((a.len(), 0), (b.len(), d)).copy_from(&matrix_from_rows(b, d));

    let mean = union.row_mean().transpose();
    for mut row in union.row_iter_mut() {
        row -= mean.transpose();
    }

    let cov = (union.transpose() * &union) / (n as f64 - 1.0);
    let eig = cov.symmetric_eigen();

    // Eigenpairs come back unsorted; take the k largest.
    let mut order: Vec<usize> = (0..d).collect();
    order.sort_by(|&i, &j| {
        eig.eigenvalues[j]
            .partial_cmp(&eig.eigenvalues[i])
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let components = DMatrix::from_fn(d, k, |i, c| eig.eigenvectors[(i, order[c])]);

    Ok(PcaBasis { mean, components })
}

impl PcaBasis {
    /// Project a row set into the fitted space. Rows must have the same
    /// sample count the basis was fit on.
    pub(crate) fn project(&self, rows: &[Vec<f64>]) -> DMatrix<f64> {
        let d = self.mean.len();
        let mut x = matrix_from_rows(rows, d);
        for mut row in x.row_iter_mut() {
            row -= self.mean.transpose();
        }
        x * &self.components
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_component_captures_dominant_axis() {
        // Points spread along the first coordinate only.
        let a: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64, 0.0, 0.0]).collect();
        let b: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64 + 0.5, 0.0, 0.0]).collect();
        let basis = fit_joint(&a, &b, 1).unwrap();
        let proj = basis.project(&a);
        assert_eq!(proj.ncols(), 1);
        // Spacing along the dominant axis is preserved up to sign.
        let step = proj[(1, 0)] - proj[(0, 0)];
        assert!((step.abs() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_projection_preserves_pairwise_distances_full_rank() {
        let a = vec![vec![1.0, 2.0], vec![3.0, 1.0], vec![0.0, 0.5]];
        let b = vec![vec![2.0, 2.0], vec![1.0, 0.0]];
        let basis = fit_joint(&a, &b, 2).unwrap();
        let pa = basis.project(&a);

        let orig = ((a[0][0] - a[1][0]).powi(2) + (a[0][1] - a[1][1]).powi(2)).sqrt();
        let proj = ((pa[(0, 0)] - pa[(1, 0)]).powi(2) + (pa[(0, 1)] - pa[(1, 1)]).powi(2)).sqrt();
        assert!((orig - proj).abs() < 1e-9);
    }

    #[test]
    fn test_too_few_dimensions_rejected() {
        let a = vec![vec![1.0, 2.0]; 5];
        let b = vec![vec![0.0, 1.0]; 5];
        assert!(fit_joint(&a, &b, 3).is_err());
    }
}
