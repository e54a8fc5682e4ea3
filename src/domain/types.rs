//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - passed between pipeline stages in-memory
//! - exported to CSV/JSON
//! - reloaded later for plotting

use std::path::PathBuf;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::AgeModelError;

/// An ordered `(index, value)` sequence with strictly increasing, finite indices.
///
/// The index is depth (mm) for proxy series and years-before-present for
/// reference series. A `Series` is never empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    index: Vec<f64>,
    values: Vec<f64>,
}

impl Series {
    /// Build a series from already-sorted columns.
    ///
    /// Fails with `InvalidInput` when the columns are empty, differ in length,
    /// contain non-finite numbers, or the index is not strictly increasing.
    pub fn new(index: Vec<f64>, values: Vec<f64>) -> Result<Self, AgeModelError> {
        if index.is_empty() {
            return Err(AgeModelError::invalid("series is empty"));
        }
        if index.len() != values.len() {
            return Err(AgeModelError::invalid(format!(
                "index has {} entries but values has {}",
                index.len(),
                values.len()
            )));
        }
        if let Some(pos) = index.iter().chain(values.iter()).position(|v| !v.is_finite()) {
            let pos = pos % index.len();
            return Err(AgeModelError::invalid(format!("non-finite entry at position {pos}")));
        }
        if let Some(pos) = index.windows(2).position(|w| w[1] <= w[0]) {
            return Err(AgeModelError::invalid(format!(
                "index is not strictly increasing at position {}",
                pos + 1
            )));
        }
        Ok(Self { index, values })
    }

    /// Build a series from unordered pairs, applying the sort-and-dedupe step.
    ///
    /// Also returns how many repeated-index pairs were dropped.
    pub fn from_unsorted(mut pairs: Vec<(f64, f64)>) -> Result<(Self, usize), AgeModelError> {
        let dropped = sort_dedup_by_index(&mut pairs);
        let (index, values) = pairs.into_iter().unzip();
        Ok((Self::new(index, values)?, dropped))
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Always `false`; present for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn index(&self) -> &[f64] {
        &self.index
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// `(index, value)` at `position`, if in range.
    pub fn get(&self, position: usize) -> Option<(f64, f64)> {
        Some((*self.index.get(position)?, *self.values.get(position)?))
    }

    pub fn iter(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.index.iter().copied().zip(self.values.iter().copied())
    }

    /// Same index, replacement values. Lengths must match.
    pub(crate) fn with_values(&self, values: Vec<f64>) -> Result<Self, AgeModelError> {
        Self::new(self.index.clone(), values)
    }
}

/// Stable sort by index, keeping the first-seen entry for repeated indices.
///
/// Returns how many duplicate entries were dropped.
pub fn sort_dedup_by_index(pairs: &mut Vec<(f64, f64)>) -> usize {
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
    let before = pairs.len();
    pairs.dedup_by(|later, earlier| later.0 == earlier.0);
    before - pairs.len()
}

/// A series produced by the signal conditioner.
///
/// Same length and index domain as its source; only the values differ.
#[derive(Debug, Clone, PartialEq)]
pub struct SmoothedSeries(Series);

impl SmoothedSeries {
    pub(crate) fn from_series(series: Series) -> Self {
        Self(series)
    }

    pub fn values(&self) -> &[f64] {
        self.0.values()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Strictly increasing sample positions of local extrema within one series.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtremumSet {
    positions: Vec<usize>,
}

impl ExtremumSet {
    /// Wrap positions that are already strictly increasing.
    pub(crate) fn from_sorted(positions: Vec<usize>) -> Self {
        debug_assert!(positions.windows(2).all(|w| w[0] < w[1]));
        Self { positions }
    }

    /// Union of two sets, ordered by position.
    ///
    /// A position can't be both a strict maximum and a strict minimum, so the
    /// union of a maxima set and a minima set never loses entries.
    pub fn merge(&self, other: &ExtremumSet) -> ExtremumSet {
        let mut positions: Vec<usize> = self.positions.iter().chain(other.positions.iter()).copied().collect();
        positions.sort_unstable();
        positions.dedup();
        ExtremumSet { positions }
    }

    pub fn positions(&self) -> &[usize] {
        &self.positions
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// One matched extremum pair: a proxy depth asserted to share a date with a reference age.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnchorPair {
    pub depth: f64,
    pub age: f64,
    /// Raw proxy value at the matched depth.
    pub proxy_value: f64,
    /// Raw reference value at the matched age.
    pub reference_value: f64,
}

/// Anchors in detection order (not depth order).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TiePointSet {
    pub anchors: Vec<AnchorPair>,
}

impl TiePointSet {
    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }
}

/// Pearson correlation between anchor proxy values and anchor reference values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Correlation {
    pub r: f64,
    /// Two-sided p-value for the null hypothesis `r = 0`.
    pub p_value: f64,
    pub n: usize,
}

impl Correlation {
    pub fn is_defined(&self) -> bool {
        self.r.is_finite() && self.p_value.is_finite()
    }
}

/// One row of the age-model-annotated proxy series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedSample {
    pub depth: f64,
    pub value: f64,
    pub age: f64,
}

/// How extrema from the two series are combined before rank matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum MatchPolicy {
    /// Reference maxima (warm peaks) pair with proxy minima (isotope troughs).
    PeakTrough,
    /// All maxima and minima of each series, ordered by position.
    Extrema,
}

impl MatchPolicy {
    pub fn display_name(self) -> &'static str {
        match self {
            MatchPolicy::PeakTrough => "reference peaks -> proxy troughs",
            MatchPolicy::Extrema => "all extrema in position order",
        }
    }
}

/// Signal conditioning options applied to both series before extremum detection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConditionOptions {
    /// Gaussian kernel width in samples. `0` disables smoothing.
    pub sigma: f64,
    /// Remove a least-squares linear trend before smoothing.
    pub detrend: bool,
}

impl Default for ConditionOptions {
    fn default() -> Self {
        Self {
            sigma: 2.0,
            detrend: false,
        }
    }
}

/// Output time grid. Unset fields are derived from the data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ResampleGrid {
    pub step: Option<f64>,
    pub start: Option<f64>,
}

/// Everything the algorithmic core needs for one run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlignParams {
    pub condition: ConditionOptions,
    /// Minimum separation between proxy extrema, in samples.
    pub proxy_spacing: usize,
    /// Minimum separation between reference extrema, in samples.
    pub reference_spacing: usize,
    pub policy: MatchPolicy,
    pub grid: ResampleGrid,
}

impl Default for AlignParams {
    fn default() -> Self {
        Self {
            condition: ConditionOptions::default(),
            proxy_spacing: 6,
            reference_spacing: 10,
            policy: MatchPolicy::PeakTrough,
            grid: ResampleGrid::default(),
        }
    }
}

/// Column names for one input table. `None` means "resolve from known aliases".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnSelection {
    pub index: Option<String>,
    pub value: Option<String>,
}

/// A full `coral build` configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus environment and defaults).
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub proxy_path: PathBuf,
    pub reference_path: PathBuf,
    pub proxy_columns: ColumnSelection,
    pub reference_columns: ColumnSelection,
    pub params: AlignParams,

    /// Directory receiving every exported table. Never implied.
    pub output_dir: PathBuf,
    pub write_summary: bool,

    pub plot: bool,
    pub plot_width: usize,
    pub plot_height: usize,
}

/// Synthetic dataset generation settings.
#[derive(Debug, Clone)]
pub struct SimulateConfig {
    pub years: usize,
    /// Most recent month of the record (first day of month).
    pub end_month: chrono::NaiveDate,
    pub start_temp: f64,
    /// Warming over the record, °C per year.
    pub warming_trend: f64,
    pub seasonal_amplitude: f64,
    pub sst_noise: f64,
    pub baseline_d18o: f64,
    /// Isotope temperature sensitivity, ‰ per °C (negative: warmer is lighter).
    pub temp_coeff: f64,
    pub d18o_noise: f64,
    pub seed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn series_rejects_empty_and_unsorted() {
        assert!(matches!(Series::new(vec![], vec![]), Err(AgeModelError::InvalidInput(_))));
        assert!(Series::new(vec![0.0, 0.0], vec![1.0, 2.0]).is_err());
        assert!(Series::new(vec![1.0, 0.0], vec![1.0, 2.0]).is_err());
        assert!(Series::new(vec![0.0, 1.0], vec![1.0]).is_err());
        assert!(Series::new(vec![0.0, 1.0], vec![1.0, f64::NAN]).is_err());
    }

    #[test]
    fn from_unsorted_sorts_and_keeps_first_duplicate() {
        let (s, dropped) = Series::from_unsorted(vec![(2.0, 20.0), (0.0, 0.0), (2.0, 99.0), (1.0, 10.0)]).unwrap();
        assert_eq!(dropped, 1);
        assert_eq!(s.index(), &[0.0, 1.0, 2.0]);
        assert_eq!(s.values(), &[0.0, 10.0, 20.0]);
    }

    #[test]
    fn sort_dedup_reports_dropped_count() {
        let mut pairs = vec![(1.0, 1.0), (1.0, 2.0), (1.0, 3.0), (0.5, 0.0)];
        assert_eq!(sort_dedup_by_index(&mut pairs), 2);
        assert_eq!(pairs, vec![(0.5, 0.0), (1.0, 1.0)]);
    }

    #[test]
    fn merge_orders_positions() {
        let a = ExtremumSet::from_sorted(vec![3, 15]);
        let b = ExtremumSet::from_sorted(vec![9]);
        assert_eq!(a.merge(&b).positions(), &[3, 9, 15]);
    }
}
