//! Signal conditioning: linear detrend and Gaussian smoothing.
//!
//! Smoothing suppresses sample-to-sample noise so that extremum detection
//! picks seasonal turning points rather than noise spikes.
//!
//! Boundary handling: the input is extended by half-sample symmetric
//! reflection (`d c b a | a b c d | d c b a`), so a constant series stays
//! constant and a symmetric series stays symmetric.

use crate::domain::{ConditionOptions, Series, SmoothedSeries};
use crate::error::AgeModelError;
use crate::math::fit_line;

/// Kernel half-width in units of sigma.
const TRUNCATE: f64 = 4.0;

/// Detrend (optionally) and smooth a series.
pub fn condition(series: &Series, opts: &ConditionOptions) -> Result<SmoothedSeries, AgeModelError> {
    if opts.detrend {
        let detrended = detrend(series)?;
        smooth(&detrended, opts.sigma)
    } else {
        smooth(series, opts.sigma)
    }
}

/// Gaussian-weighted moving average of `series` values; `sigma` is in samples.
///
/// `sigma = 0` returns the input unchanged.
pub fn smooth(series: &Series, sigma: f64) -> Result<SmoothedSeries, AgeModelError> {
    let values = gaussian_filter(series.values(), sigma)?;
    Ok(SmoothedSeries::from_series(series.with_values(values)?))
}

/// Gaussian filter over a raw slice.
///
/// Fails with `InvalidInput` for an empty slice or a negative/non-finite sigma.
pub fn gaussian_filter(values: &[f64], sigma: f64) -> Result<Vec<f64>, AgeModelError> {
    if values.is_empty() {
        return Err(AgeModelError::invalid("cannot smooth an empty series"));
    }
    if !(sigma.is_finite() && sigma >= 0.0) {
        return Err(AgeModelError::invalid(format!(
            "smoothing width must be finite and >= 0, got {sigma}"
        )));
    }
    if sigma == 0.0 {
        return Ok(values.to_vec());
    }

    let n = values.len();
    let period = 2 * n;
    let radius = (TRUNCATE * sigma + 0.5).floor();
    if radius == 0.0 {
        return Ok(values.to_vec());
    }

    if 2.0 * radius + 1.0 <= period as f64 {
        let radius = radius as usize;
        let kernel = gaussian_kernel(sigma, radius);
        let out = (0..n)
            .map(|i| {
                kernel
                    .iter()
                    .enumerate()
                    .map(|(k, &w)| w * values[reflect_index(i as isize + k as isize - radius as isize, n)])
                    .sum()
            })
            .collect();
        return Ok(out);
    }

    // Kernel wider than one reflection period: every offset lands on one of
    // `2n` reflected positions, so convolve with the folded weights instead.
    let weights = folded_kernel(sigma, radius, period);
    let out = (0..n)
        .map(|i| {
            weights
                .iter()
                .enumerate()
                .map(|(m, &w)| w * values[reflect_index((i + m) as isize, n)])
                .sum()
        })
        .collect();
    Ok(out)
}

/// Largest radius whose weights are folded term by term.
const MAX_FOLD_RADIUS: f64 = (1u64 << 22) as f64;

/// Normalised Gaussian weights of length `2r + 1`.
fn gaussian_kernel(sigma: f64, radius: usize) -> Vec<f64> {
    let denom = 2.0 * sigma * sigma;
    let r = radius as isize;
    let mut weights: Vec<f64> = (-r..=r)
        .map(|k| {
            let k = k as f64;
            (-(k * k) / denom).exp()
        })
        .collect();
    normalize(&mut weights);
    weights
}

/// Kernel weights summed per offset modulo `period`, normalised.
///
/// Bin `m` holds the weight of every offset `k ≡ m (mod period)`.
fn folded_kernel(sigma: f64, radius: f64, period: usize) -> Vec<f64> {
    let mut bins = if radius <= MAX_FOLD_RADIUS {
        fold_truncated(sigma, radius as i64, period)
    } else {
        fold_periodic(sigma, period)
    };
    normalize(&mut bins);
    bins
}

fn fold_truncated(sigma: f64, radius: i64, period: usize) -> Vec<f64> {
    let denom = 2.0 * sigma * sigma;
    let mut bins = vec![0.0; period];
    for k in -radius..=radius {
        let kf = k as f64;
        bins[k.rem_euclid(period as i64) as usize] += (-(kf * kf) / denom).exp();
    }
    bins
}

/// Folded weights of the untruncated Gaussian via Poisson summation
/// (unnormalised): `1 + 2 Σ_q exp(-2π²σ²q²/P²) cos(2πqm/P)`.
///
/// Used once the truncated kernel is too wide to fold term by term.
fn fold_periodic(sigma: f64, period: usize) -> Vec<f64> {
    use std::f64::consts::{PI, TAU};

    let p = period as f64;
    let mut bins = vec![1.0; period];
    let mut q = 1.0_f64;
    loop {
        let damp = (-2.0 * PI * PI * sigma * sigma * q * q / (p * p)).exp();
        if damp < 1e-17 {
            break;
        }
        for (m, bin) in bins.iter_mut().enumerate() {
            *bin += 2.0 * damp * (TAU * q * m as f64 / p).cos();
        }
        q += 1.0;
    }
    bins
}

fn normalize(weights: &mut [f64]) {
    let total: f64 = weights.iter().sum();
    for w in weights {
        *w /= total;
    }
}

/// Map an out-of-range position into `0..n` by half-sample reflection.
fn reflect_index(j: isize, n: usize) -> usize {
    let n = n as isize;
    let period = 2 * n;
    let j = j.rem_euclid(period);
    let j = if j >= n { period - 1 - j } else { j };
    j as usize
}

/// Remove the least-squares straight line (over sample position) from the values.
pub fn detrend(series: &Series) -> Result<Series, AgeModelError> {
    let values = series.values();
    if values.len() < 2 {
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        return series.with_values(values.iter().map(|v| v - mean).collect());
    }

    let positions: Vec<f64> = (0..values.len()).map(|i| i as f64).collect();
    let (intercept, slope) = fit_line(&positions, values)
        .ok_or_else(|| AgeModelError::invalid("linear detrend failed to converge"))?;

    let residuals = values
        .iter()
        .zip(&positions)
        .map(|(&v, &i)| v - (intercept + slope * i))
        .collect();
    series.with_values(residuals)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(values: &[f64]) -> Series {
        let index = (0..values.len()).map(|i| i as f64).collect();
        Series::new(index, values.to_vec()).unwrap()
    }

    #[test]
    fn zero_sigma_is_identity() {
        let s = series(&[1.0, -2.0, 3.5, 0.25, 9.0]);
        let out = smooth(&s, 0.0).unwrap();
        assert_eq!(out.values(), s.values());
    }

    #[test]
    fn constant_input_stays_constant_and_symmetric() {
        let s = series(&[4.0; 9]);
        let out = smooth(&s, 2.0).unwrap();
        let v = out.values();
        for x in v {
            assert!((x - 4.0).abs() < 1e-12, "got {x}");
        }
        for i in 0..v.len() {
            assert_eq!(v[i], v[v.len() - 1 - i]);
        }
    }

    #[test]
    fn symmetric_input_gives_symmetric_output() {
        let s = series(&[0.0, 1.0, 4.0, 9.0, 4.0, 1.0, 0.0]);
        let v = smooth(&s, 1.5).unwrap().values().to_vec();
        for i in 0..v.len() {
            assert!((v[i] - v[v.len() - 1 - i]).abs() < 1e-12);
        }
        // Smoothing lowers the peak and lifts the shoulders.
        assert!(v[3] < 9.0);
        assert!(v[0] > 0.0);
    }

    #[test]
    fn smoothing_preserves_mean_of_interior_spike() {
        let mut values = vec![0.0; 41];
        values[20] = 1.0;
        let out = gaussian_filter(&values, 2.0).unwrap();
        let total: f64 = out.iter().sum();
        assert!((total - 1.0).abs() < 1e-12);
        assert!(out[20] > out[19] && out[19] > out[18]);
    }

    #[test]
    fn single_sample_is_well_defined() {
        let out = gaussian_filter(&[3.0], 5.0).unwrap();
        assert!((out[0] - 3.0).abs() < 1e-12);
    }

    #[test]
    fn huge_sigma_tends_to_the_reflected_mean() {
        let out = gaussian_filter(&[1.0, 2.0, 3.0], 1e15).unwrap();
        assert_eq!(out.len(), 3);
        for v in out {
            assert!((v - 2.0).abs() < 1e-9, "got {v}");
        }
    }

    #[test]
    fn tiny_sigma_is_identity() {
        let values = [1.0, -2.0, 3.5];
        assert_eq!(gaussian_filter(&values, 1e-200).unwrap(), values.to_vec());
    }

    #[test]
    fn wide_kernel_matches_direct_reflection() {
        // radius 12 over 5 samples: offsets wrap the reflection period several times.
        let values = [2.0, -1.0, 4.0, 0.5, 3.0];
        let sigma = 3.0;
        let out = gaussian_filter(&values, sigma).unwrap();

        for (i, &got) in out.iter().enumerate() {
            let mut num = 0.0;
            let mut den = 0.0;
            for k in -12isize..=12 {
                let w = (-((k * k) as f64) / (2.0 * sigma * sigma)).exp();
                num += w * values[reflect_index(i as isize + k, values.len())];
                den += w;
            }
            assert!((got - num / den).abs() < 1e-12, "i={i}: {got} vs {}", num / den);
        }
    }

    #[test]
    fn periodic_fold_agrees_with_truncated_fold() {
        let mut truncated = fold_truncated(3.0, 12, 10);
        let mut periodic = fold_periodic(3.0, 10);
        normalize(&mut truncated);
        normalize(&mut periodic);
        for (a, b) in truncated.iter().zip(&periodic) {
            assert!((a - b).abs() < 2e-4, "{a} vs {b}");
        }
    }

    #[test]
    fn rejects_empty_and_negative_sigma() {
        assert!(matches!(gaussian_filter(&[], 1.0), Err(AgeModelError::InvalidInput(_))));
        assert!(gaussian_filter(&[1.0, 2.0], -1.0).is_err());
        assert!(gaussian_filter(&[1.0, 2.0], f64::NAN).is_err());
    }

    #[test]
    fn reflect_index_mirrors_edges() {
        // d c b a | a b c d | d c b a
        assert_eq!(reflect_index(-1, 4), 0);
        assert_eq!(reflect_index(-2, 4), 1);
        assert_eq!(reflect_index(4, 4), 3);
        assert_eq!(reflect_index(5, 4), 2);
        assert_eq!(reflect_index(9, 4), 1);
    }

    #[test]
    fn detrend_removes_linear_trend() {
        let values: Vec<f64> = (0..24)
            .map(|i| 2.0 + 0.5 * i as f64 + (std::f64::consts::TAU * i as f64 / 12.0).sin())
            .collect();
        let out = detrend(&series(&values)).unwrap();
        let (_, slope) = fit_line(
            &(0..24).map(|i| i as f64).collect::<Vec<_>>(),
            out.values(),
        )
        .unwrap();
        assert!(slope.abs() < 1e-9, "residual slope {slope}");
        let mean = out.values().iter().sum::<f64>() / 24.0;
        assert!(mean.abs() < 1e-9);
    }

    #[test]
    fn condition_applies_detrend_before_smoothing() {
        let values: Vec<f64> = (0..12).map(|i| 3.0 * i as f64).collect();
        let opts = ConditionOptions {
            sigma: 0.0,
            detrend: true,
        };
        let out = condition(&series(&values), &opts).unwrap();
        assert!(out.values().iter().all(|v| v.abs() < 1e-9));
    }
}
