//! Least squares solver and straight-line fits.
//!
//! The conditioner removes a linear trend over sample position before
//! smoothing. That is a two-column least squares problem:
//!
//! ```text
//! minimize Σ (y_i - (β0 + β1 i))^2
//! ```
//!
//! Implementation choices:
//! - We solve with SVD so a tall design matrix (more rows than columns) is fine.
//!   (Nalgebra's `QR::solve` is intended for square systems and will panic for
//!   non-square matrices.)

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-10, 1e-8, 1e-6] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Fit `y ≈ intercept + slope * x` and return `(intercept, slope)`.
///
/// Needs at least two distinct `x` values.
pub fn fit_line(x: &[f64], y: &[f64]) -> Option<(f64, f64)> {
    let n = x.len();
    if n < 2 || y.len() != n {
        return None;
    }

    let mut design = DMatrix::<f64>::zeros(n, 2);
    for (i, &xi) in x.iter().enumerate() {
        design[(i, 0)] = 1.0;
        design[(i, 1)] = xi;
    }
    let rhs = DVector::from_column_slice(y);

    let beta = solve_least_squares(&design, &rhs)?;
    Some((beta[0], beta[1]))
}
