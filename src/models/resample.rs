//! Resampling a depth series onto an even time grid.
//!
//! Steps:
//! 1. map every depth to an age with the age model
//! 2. sort `(age, value)` pairs by age
//! 3. pick the grid step: supplied, or the median spacing of the mapped ages
//! 4. build the half-open grid `[start, max_age)` and interpolate linearly
//!
//! Grid points outside the mapped age range take the nearest end value.

use log::warn;
use serde::{Deserialize, Serialize};

use crate::domain::{ResampleGrid, Series};
use crate::error::AgeModelError;
use crate::math::median_mut;
use crate::models::AgeModel;

/// Upper bound on grid length, to catch absurdly small steps early.
const MAX_GRID_POINTS: usize = 10_000_000;

/// A proxy series on a uniform age grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResampledSeries {
    pub ages: Vec<f64>,
    pub values: Vec<f64>,
    pub step: f64,
    /// `true` when the step came from the data rather than configuration.
    pub step_derived: bool,
}

impl ResampledSeries {
    pub fn len(&self) -> usize {
        self.ages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ages.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.ages.iter().copied().zip(self.values.iter().copied())
    }
}

/// Resample `depth_series` onto an even age grid using `age_model`.
///
/// Fails with `EmptySeries` below two samples and with `InvalidInput` when
/// the step is not positive.
pub fn resample(
    depth_series: &Series,
    age_model: &AgeModel,
    grid: &ResampleGrid,
) -> Result<ResampledSeries, AgeModelError> {
    if depth_series.len() < 2 {
        return Err(AgeModelError::EmptySeries {
            len: depth_series.len(),
        });
    }

    let mut pairs: Vec<(f64, f64)> = depth_series
        .iter()
        .map(|(depth, value)| (age_model.evaluate(depth), value))
        .collect();
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

    let ages: Vec<f64> = pairs.iter().map(|p| p.0).collect();
    let values: Vec<f64> = pairs.iter().map(|p| p.1).collect();

    let (step, step_derived) = match grid.step {
        Some(step) => (step, false),
        None => (median_spacing(&ages), true),
    };
    if !(step.is_finite() && step > 0.0) {
        return Err(AgeModelError::invalid(format!(
            "time step must be finite and > 0, got {step}{}",
            if step_derived { " (derived from median age spacing)" } else { "" }
        )));
    }

    let min_age = ages[0];
    let max_age = ages[ages.len() - 1];
    let start = grid.start.unwrap_or(min_age);
    if !start.is_finite() {
        return Err(AgeModelError::invalid("grid start must be finite"));
    }

    let count = grid_len(start, max_age, step)?;
    if count == 0 {
        warn!("Grid start {start} is not below the oldest mapped age {max_age}; resampled series is empty.");
    }

    let grid_ages: Vec<f64> = (0..count).map(|i| start + i as f64 * step).collect();
    let grid_values = grid_ages.iter().map(|&t| interp(t, &ages, &values)).collect();

    Ok(ResampledSeries {
        ages: grid_ages,
        values: grid_values,
        step,
        step_derived,
    })
}

/// Median of consecutive differences of sorted ages.
fn median_spacing(sorted_ages: &[f64]) -> f64 {
    let mut diffs: Vec<f64> = sorted_ages.windows(2).map(|w| w[1] - w[0]).collect();
    median_mut(&mut diffs).unwrap_or(f64::NAN)
}

/// Number of points in the half-open range `[start, stop)` at `step`.
fn grid_len(start: f64, stop: f64, step: f64) -> Result<usize, AgeModelError> {
    let span = stop - start;
    if span <= 0.0 {
        return Ok(0);
    }
    let count = (span / step).ceil();
    if count > MAX_GRID_POINTS as f64 {
        return Err(AgeModelError::invalid(format!(
            "time step {step} over a span of {span} would produce {count} grid points (limit {MAX_GRID_POINTS})"
        )));
    }
    Ok(count as usize)
}

/// Piecewise-linear interpolation on sorted `xs`; clamps outside the range.
fn interp(t: f64, xs: &[f64], ys: &[f64]) -> f64 {
    let last = xs.len() - 1;
    if t <= xs[0] {
        return ys[0];
    }
    if t >= xs[last] {
        return ys[last];
    }
    // First index with xs[hi] > t; 1 <= hi <= last here.
    let hi = xs.partition_point(|&x| x <= t);
    let lo = hi - 1;
    let (x0, x1) = (xs[lo], xs[hi]);
    ys[lo] + (t - x0) * (ys[hi] - ys[lo]) / (x1 - x0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear_model(years_per_mm: f64) -> AgeModel {
        AgeModel::from_pairs(vec![(0.0, 0.0), (1.0, years_per_mm)]).unwrap()
    }

    fn monthly_series(n: usize) -> Series {
        let depths = (0..n).map(|i| i as f64).collect();
        let values = (0..n)
            .map(|i| (std::f64::consts::TAU * i as f64 / 12.0).sin())
            .collect();
        Series::new(depths, values).unwrap()
    }

    #[test]
    fn derived_step_is_median_spacing() {
        let out = resample(&monthly_series(25), &linear_model(1.0 / 12.0), &ResampleGrid::default()).unwrap();
        assert!(out.step_derived);
        assert!((out.step - 1.0 / 12.0).abs() < 1e-12);
    }

    #[test]
    fn grid_size_matches_span_over_step() {
        let series = Series::new(
            vec![0.0, 1.0, 2.0, 3.5, 4.0, 7.0, 7.5, 9.0],
            vec![1.0, 2.0, 1.5, 0.0, -1.0, 2.0, 3.0, 1.0],
        )
        .unwrap();
        let out = resample(&series, &linear_model(0.5), &ResampleGrid::default()).unwrap();
        let span = 9.0 * 0.5;
        let expected = span / out.step;
        assert!((out.len() as f64 - expected).abs() <= 1.0, "{} vs {expected}", out.len());
        assert_eq!(out.ages[0], 0.0);
        assert!(*out.ages.last().unwrap() < 4.5);
    }

    #[test]
    fn half_open_grid_excludes_stop() {
        let series = Series::new(vec![0.0, 1.0, 2.0], vec![0.0, 10.0, 20.0]).unwrap();
        let grid = ResampleGrid {
            step: Some(0.5),
            start: None,
        };
        let out = resample(&series, &linear_model(1.0), &grid).unwrap();
        assert_eq!(out.ages, vec![0.0, 0.5, 1.0, 1.5]);
        assert_eq!(out.values, vec![0.0, 5.0, 10.0, 15.0]);
        assert!(!out.step_derived);
    }

    #[test]
    fn reversed_age_model_is_sorted_before_interpolation() {
        // Age decreases with depth: values must still come out age-ordered.
        let model = AgeModel::from_pairs(vec![(0.0, 10.0), (10.0, 0.0)]).unwrap();
        let series = Series::new(vec![0.0, 5.0, 10.0], vec![1.0, 2.0, 3.0]).unwrap();
        let grid = ResampleGrid {
            step: Some(5.0),
            start: None,
        };
        let out = resample(&series, &model, &grid).unwrap();
        assert_eq!(out.ages, vec![0.0, 5.0]);
        assert_eq!(out.values, vec![3.0, 2.0]);
    }

    #[test]
    fn explicit_start_shifts_grid_and_clamps() {
        let series = Series::new(vec![0.0, 1.0, 2.0], vec![0.0, 10.0, 20.0]).unwrap();
        let grid = ResampleGrid {
            step: Some(1.0),
            start: Some(-1.0),
        };
        let out = resample(&series, &linear_model(1.0), &grid).unwrap();
        assert_eq!(out.ages, vec![-1.0, 0.0, 1.0]);
        assert_eq!(out.values, vec![0.0, 0.0, 10.0]);
    }

    #[test]
    fn single_sample_is_empty_series_error() {
        let series = Series::new(vec![0.0], vec![1.0]).unwrap();
        assert_eq!(
            resample(&series, &linear_model(1.0), &ResampleGrid::default()),
            Err(AgeModelError::EmptySeries { len: 1 })
        );
    }

    #[test]
    fn non_positive_step_is_invalid() {
        let series = monthly_series(5);
        for step in [0.0, -1.0, f64::NAN] {
            let grid = ResampleGrid {
                step: Some(step),
                start: None,
            };
            assert!(matches!(
                resample(&series, &linear_model(1.0), &grid),
                Err(AgeModelError::InvalidInput(_))
            ));
        }
    }

    #[test]
    fn flat_age_model_cannot_derive_step() {
        let model = AgeModel::from_pairs(vec![(0.0, 3.0), (1.0, 3.0)]).unwrap();
        assert!(matches!(
            resample(&monthly_series(5), &model, &ResampleGrid::default()),
            Err(AgeModelError::InvalidInput(_))
        ));
    }

    #[test]
    fn interp_matches_knots_and_midpoints() {
        let xs = [0.0, 1.0, 1.0, 3.0];
        let ys = [0.0, 2.0, 4.0, 8.0];
        assert_eq!(interp(0.5, &xs, &ys), 1.0);
        assert_eq!(interp(2.0, &xs, &ys), 6.0);
        assert_eq!(interp(-3.0, &xs, &ys), 0.0);
        assert_eq!(interp(9.0, &xs, &ys), 8.0);
    }
}
