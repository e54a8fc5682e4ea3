//! Local extremum detection with a minimum-separation constraint.
//!
//! Rules:
//! - a position is a maximum when its value is strictly greater than both
//!   immediate neighbours (plateaus and end points never qualify)
//! - when candidates are closer than `min_spacing` samples, the higher one wins;
//!   equal heights resolve to the earliest position
//! - the output is ordered by position, which is the order matching relies on

use crate::domain::{ExtremumSet, SmoothedSeries};
use crate::error::AgeModelError;

/// Local maxima of a smoothed series, at least `min_spacing` samples apart.
pub fn find_maxima(series: &SmoothedSeries, min_spacing: usize) -> Result<ExtremumSet, AgeModelError> {
    find_peaks(series.values(), min_spacing)
}

/// Local minima of a smoothed series: maxima of the negated values.
pub fn find_minima(series: &SmoothedSeries, min_spacing: usize) -> Result<ExtremumSet, AgeModelError> {
    let negated: Vec<f64> = series.values().iter().map(|v| -v).collect();
    find_peaks(&negated, min_spacing)
}

/// Peak detection over a raw slice.
pub fn find_peaks(values: &[f64], min_spacing: usize) -> Result<ExtremumSet, AgeModelError> {
    if min_spacing == 0 {
        return Err(AgeModelError::invalid("minimum extremum spacing must be at least 1 sample"));
    }

    let candidates = local_maxima(values);
    if min_spacing == 1 || candidates.len() < 2 {
        return Ok(ExtremumSet::from_sorted(candidates));
    }

    // Visit candidates from highest to lowest. The sort is stable, so equal
    // heights are visited in position order and the earliest one suppresses
    // its later neighbours.
    let mut priority: Vec<usize> = (0..candidates.len()).collect();
    priority.sort_by(|&a, &b| values[candidates[b]].total_cmp(&values[candidates[a]]));

    let mut keep = vec![true; candidates.len()];
    for &c in &priority {
        if !keep[c] {
            continue;
        }
        let pos = candidates[c];

        for k in (0..c).rev() {
            if pos - candidates[k] >= min_spacing {
                break;
            }
            keep[k] = false;
        }
        for k in (c + 1)..candidates.len() {
            if candidates[k] - pos >= min_spacing {
                break;
            }
            keep[k] = false;
        }
    }

    let kept = candidates
        .into_iter()
        .zip(keep)
        .filter_map(|(pos, k)| k.then_some(pos))
        .collect();
    Ok(ExtremumSet::from_sorted(kept))
}

/// Positions strictly above both neighbours.
fn local_maxima(values: &[f64]) -> Vec<usize> {
    if values.len() < 3 {
        return Vec::new();
    }
    (1..values.len() - 1)
        .filter(|&i| values[i] > values[i - 1] && values[i] > values[i + 1])
        .collect()
}
