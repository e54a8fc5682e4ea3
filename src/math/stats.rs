//! Small statistics helpers: median and Pearson correlation with its p-value.

use statrs::function::beta::checked_beta_reg;

use crate::domain::Correlation;
use crate::error::AgeModelError;

/// Median of a slice (sorts in place). `None` for an empty slice.
pub fn median_mut(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        Some(values[mid])
    } else {
        Some((values[mid - 1] + values[mid]) / 2.0)
    }
}

/// Pearson correlation with a two-sided p-value.
///
/// Fails with `InsufficientAnchors` below two pairs. When either input has zero
/// variance the coefficient is undefined and both `r` and `p_value` are NaN.
pub fn pearson(x: &[f64], y: &[f64]) -> Result<Correlation, AgeModelError> {
    if x.len() != y.len() {
        return Err(AgeModelError::invalid(format!(
            "correlation inputs differ in length ({} vs {})",
            x.len(),
            y.len()
        )));
    }
    let n = x.len();
    if n < 2 {
        return Err(AgeModelError::InsufficientAnchors { found: n });
    }

    let nf = n as f64;
    let x_bar = x.iter().sum::<f64>() / nf;
    let y_bar = y.iter().sum::<f64>() / nf;

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (&xi, &yi) in x.iter().zip(y) {
        let dx = xi - x_bar;
        let dy = yi - y_bar;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }

    if sxx <= 0.0 || syy <= 0.0 {
        return Ok(Correlation {
            r: f64::NAN,
            p_value: f64::NAN,
            n,
        });
    }

    let r = (sxy / (sxx.sqrt() * syy.sqrt())).clamp(-1.0, 1.0);
    Ok(Correlation {
        r,
        p_value: correlation_p_value(r, n),
        n,
    })
}

/// Two-sided p-value of `r` under `H0: ρ = 0` with `n` pairs.
///
/// Uses `t = r √((n-2)/(1-r²))` with `n-2` degrees of freedom, whose two-sided
/// tail probability reduces to `I_{1-r²}((n-2)/2, 1/2)`.
pub fn correlation_p_value(r: f64, n: usize) -> f64 {
    if n <= 2 {
        return 1.0;
    }
    let x = 1.0 - r * r;
    if x <= 0.0 {
        return 0.0;
    }
    let df = (n - 2) as f64;
    checked_beta_reg(df / 2.0, 0.5, x.min(1.0)).map_or(f64::NAN, |p| p.clamp(0.0, 1.0))
}
