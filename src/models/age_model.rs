//! Piecewise-linear depth → age model.
//!
//! Anchors arrive in detection order, so they are sorted by depth before the
//! interpolation table is built. Outside the anchor range the nearest segment
//! is extended (no clamping).

use serde::{Deserialize, Serialize};

use crate::domain::{AnchorPair, AnnotatedSample, Series, TiePointSet};
use crate::error::AgeModelError;

/// Interpolation table of `(depth, age)` knots with strictly increasing depths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgeModel {
    depths: Vec<f64>,
    ages: Vec<f64>,
}

/// One linear piece of an age model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub depth_from: f64,
    pub depth_to: f64,
    /// Years per mm; negative when age decreases with depth.
    pub slope: f64,
}

impl Segment {
    /// Growth rate in mm per year, if the segment spans any time.
    pub fn growth_rate(&self) -> Option<f64> {
        (self.slope != 0.0).then(|| 1.0 / self.slope)
    }
}

/// Build an age model from matched tie points.
pub fn build(tie_points: &TiePointSet) -> Result<AgeModel, AgeModelError> {
    AgeModel::from_anchors(&tie_points.anchors)
}

impl AgeModel {
    /// Sort anchors by depth (stable) and validate the resulting table.
    ///
    /// Fails with `InsufficientAnchors` below two anchors and with
    /// `DegenerateAgeModel` when two anchors share a depth.
    pub fn from_anchors(anchors: &[AnchorPair]) -> Result<Self, AgeModelError> {
        Self::from_pairs(anchors.iter().map(|a| (a.depth, a.age)).collect())
    }

    pub fn from_pairs(mut pairs: Vec<(f64, f64)>) -> Result<Self, AgeModelError> {
        if pairs.len() < 2 {
            return Err(AgeModelError::InsufficientAnchors { found: pairs.len() });
        }
        if pairs.iter().any(|(d, a)| !d.is_finite() || !a.is_finite()) {
            return Err(AgeModelError::invalid("anchor depths and ages must be finite"));
        }

        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
        if let Some(w) = pairs.windows(2).find(|w| w[0].0 == w[1].0) {
            return Err(AgeModelError::DegenerateAgeModel { depth: w[0].0 });
        }

        let (depths, ages) = pairs.into_iter().unzip();
        Ok(Self { depths, ages })
    }

    /// Age at `depth`.
    ///
    /// Exact at anchor depths; linear between anchors; extrapolated with the
    /// first/last segment's slope outside the anchor range.
    pub fn evaluate(&self, depth: f64) -> f64 {
        let n = self.depths.len();
        match self.depths.binary_search_by(|d| d.total_cmp(&depth)) {
            Ok(i) => self.ages[i],
            Err(insert_at) => {
                let hi = insert_at.clamp(1, n - 1);
                let lo = hi - 1;
                let (d0, d1) = (self.depths[lo], self.depths[hi]);
                let (a0, a1) = (self.ages[lo], self.ages[hi]);
                a0 + (depth - d0) * (a1 - a0) / (d1 - d0)
            }
        }
    }

    /// Apply the model to every depth of a proxy series.
    pub fn annotate(&self, series: &Series) -> Vec<AnnotatedSample> {
        series
            .iter()
            .map(|(depth, value)| AnnotatedSample {
                depth,
                value,
                age: self.evaluate(depth),
            })
            .collect()
    }

    /// Whether age never decreases with depth across the anchors.
    ///
    /// Non-monotonic models are accepted but make the time grid lossy.
    pub fn is_monotonic(&self) -> bool {
        self.ages.windows(2).all(|w| w[1] >= w[0])
    }

    pub fn segments(&self) -> Vec<Segment> {
        self.depths
            .windows(2)
            .zip(self.ages.windows(2))
            .map(|(d, a)| Segment {
                depth_from: d[0],
                depth_to: d[1],
                slope: (a[1] - a[0]) / (d[1] - d[0]),
            })
            .collect()
    }

    pub fn depths(&self) -> &[f64] {
        &self.depths
    }

    pub fn ages(&self) -> &[f64] {
        &self.ages
    }

    pub fn len(&self) -> usize {
        self.depths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.depths.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anchor(depth: f64, age: f64) -> AnchorPair {
        AnchorPair {
            depth,
            age,
            proxy_value: 0.0,
            reference_value: 0.0,
        }
    }

    fn tie_points(pairs: &[(f64, f64)]) -> TiePointSet {
        TiePointSet {
            anchors: pairs.iter().map(|&(d, a)| anchor(d, a)).collect(),
        }
    }

    #[test]
    fn evaluate_is_exact_at_every_anchor() {
        let pairs = [(0.3, 0.1), (11.7, 1.0 / 3.0), (24.1, 2.05), (36.9, 2.9), (48.2, 4.07)];
        let model = build(&tie_points(&pairs)).unwrap();
        for (d, a) in pairs {
            assert_eq!(model.evaluate(d), a);
        }
    }

    #[test]
    fn reverse_order_builds_identical_model() {
        let forward = [(0.0, 0.0), (12.0, 1.0), (25.0, 2.0), (36.0, 3.0)];
        let mut reversed = forward;
        reversed.reverse();
        let a = build(&tie_points(&forward)).unwrap();
        let b = build(&tie_points(&reversed)).unwrap();
        assert_eq!(a, b);
        assert_eq!(b.depths(), &[0.0, 12.0, 25.0, 36.0]);
    }

    #[test]
    fn interpolates_and_extrapolates_linearly() {
        let model = build(&tie_points(&[(10.0, 1.0), (20.0, 2.0), (40.0, 6.0)])).unwrap();
        assert!((model.evaluate(15.0) - 1.5).abs() < 1e-12);
        assert!((model.evaluate(30.0) - 4.0).abs() < 1e-12);
        // Below the first anchor: slope of the first segment (0.1 yr/mm).
        assert!((model.evaluate(0.0) - 0.0).abs() < 1e-12);
        // Above the last anchor: slope of the last segment (0.2 yr/mm).
        assert!((model.evaluate(50.0) - 8.0).abs() < 1e-12);
    }

    #[test]
    fn one_anchor_is_insufficient() {
        assert_eq!(
            build(&tie_points(&[(1.0, 1.0)])),
            Err(AgeModelError::InsufficientAnchors { found: 1 })
        );
        assert_eq!(
            build(&TiePointSet::default()),
            Err(AgeModelError::InsufficientAnchors { found: 0 })
        );
    }

    #[test]
    fn duplicate_depth_is_degenerate() {
        assert_eq!(
            build(&tie_points(&[(5.0, 1.0), (5.0, 2.0)])),
            Err(AgeModelError::DegenerateAgeModel { depth: 5.0 })
        );
    }

    #[test]
    fn monotonicity_and_growth_rates() {
        let model = build(&tie_points(&[(0.0, 0.0), (12.0, 1.0), (30.0, 2.5)])).unwrap();
        assert!(model.is_monotonic());
        let rates: Vec<f64> = model.segments().iter().filter_map(Segment::growth_rate).collect();
        assert!((rates[0] - 12.0).abs() < 1e-9);
        assert!((rates[1] - 12.0).abs() < 1e-9);

        let folded = build(&tie_points(&[(0.0, 0.0), (12.0, 2.0), (24.0, 1.0)])).unwrap();
        assert!(!folded.is_monotonic());
    }

    #[test]
    fn annotate_adds_age_column() {
        let model = build(&tie_points(&[(0.0, 0.0), (12.0, 1.0)])).unwrap();
        let series = Series::new(vec![0.0, 6.0, 12.0], vec![-5.0, -6.0, -5.5]).unwrap();
        let rows = model.annotate(&series);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1].value, -6.0);
        assert!((rows[1].age - 0.5).abs() < 1e-12);
    }
}
