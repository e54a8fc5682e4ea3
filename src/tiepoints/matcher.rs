//! Rank-order tie-point matching.
//!
//! The k-th proxy extremum is paired with the k-th reference extremum. This
//! assumes both records contain the same sequence of seasonal events starting
//! from the same cycle; nothing checks that phase correspondence, so a missed
//! or spurious extremum near the start shifts every later pair.

use log::debug;

use crate::domain::{AnchorPair, Correlation, ExtremumSet, MatchPolicy, Series, SmoothedSeries, TiePointSet};
use crate::error::AgeModelError;
use crate::math::pearson;
use crate::signal::{find_maxima, find_minima};

/// Pair extrema by detection rank, truncating to the shorter set.
///
/// Either set being empty yields an empty `TiePointSet`, which is not an error here.
pub fn match_extrema(
    depth_series: &Series,
    depth_extrema: &ExtremumSet,
    age_series: &Series,
    age_extrema: &ExtremumSet,
) -> Result<TiePointSet, AgeModelError> {
    ensure_in_range(depth_extrema, depth_series.len(), "proxy")?;
    ensure_in_range(age_extrema, age_series.len(), "reference")?;

    let anchors = depth_extrema
        .positions()
        .iter()
        .zip(age_extrema.positions())
        .filter_map(|(&dp, &ap)| {
            let (depth, proxy_value) = depth_series.get(dp)?;
            let (age, reference_value) = age_series.get(ap)?;
            Some(AnchorPair {
                depth,
                age,
                proxy_value,
                reference_value,
            })
        })
        .collect::<Vec<_>>();

    let discarded = depth_extrema.len().max(age_extrema.len()) - anchors.len();
    if discarded > 0 {
        debug!(
            "Matched {} tie points; discarded {discarded} unmatched extrema ({} proxy, {} reference).",
            anchors.len(),
            depth_extrema.len(),
            age_extrema.len()
        );
    }

    Ok(TiePointSet { anchors })
}

/// Pearson correlation between the proxy and reference values at the anchors.
///
/// Reported only; it never changes which anchors are used.
pub fn correlation(tie_points: &TiePointSet) -> Result<Correlation, AgeModelError> {
    let proxy: Vec<f64> = tie_points.anchors.iter().map(|a| a.proxy_value).collect();
    let reference: Vec<f64> = tie_points.anchors.iter().map(|a| a.reference_value).collect();
    pearson(&proxy, &reference)
}

/// Extrema of each series selected for matching under `policy`.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedExtrema {
    pub proxy: ExtremumSet,
    pub reference: ExtremumSet,
}

/// Detect and combine extrema of both conditioned series.
///
/// The proxy is expected to vary inversely with the reference, so under
/// `PeakTrough` reference maxima pair with proxy minima.
pub fn select_extrema(
    proxy: &SmoothedSeries,
    proxy_spacing: usize,
    reference: &SmoothedSeries,
    reference_spacing: usize,
    policy: MatchPolicy,
) -> Result<SelectedExtrema, AgeModelError> {
    let proxy_troughs = find_minima(proxy, proxy_spacing)?;
    let reference_peaks = find_maxima(reference, reference_spacing)?;

    match policy {
        MatchPolicy::PeakTrough => Ok(SelectedExtrema {
            proxy: proxy_troughs,
            reference: reference_peaks,
        }),
        MatchPolicy::Extrema => {
            let proxy_peaks = find_maxima(proxy, proxy_spacing)?;
            let reference_troughs = find_minima(reference, reference_spacing)?;
            Ok(SelectedExtrema {
                proxy: proxy_troughs.merge(&proxy_peaks),
                reference: reference_peaks.merge(&reference_troughs),
            })
        }
    }
}

fn ensure_in_range(extrema: &ExtremumSet, len: usize, label: &str) -> Result<(), AgeModelError> {
    match extrema.positions().last() {
        Some(&last) if last >= len => Err(AgeModelError::invalid(format!(
            "{label} extremum position {last} is outside a series of length {len}"
        ))),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::smooth;

    fn indexed(values: &[f64]) -> Series {
        let index = (0..values.len()).map(|i| i as f64).collect();
        Series::new(index, values.to_vec()).unwrap()
    }

    #[test]
    fn tie_point_count_is_min_of_both_sets() {
        let depth = indexed(&[0.0; 20]);
        let age = Series::new((0..20).map(|i| 100.0 + i as f64).collect(), vec![1.0; 20]).unwrap();
        let d = ExtremumSet::from_sorted(vec![2, 7, 12, 17]);
        let a = ExtremumSet::from_sorted(vec![4, 9]);

        let tp = match_extrema(&depth, &d, &age, &a).unwrap();
        assert_eq!(tp.len(), 2);
        assert_eq!(tp.anchors[0].depth, 2.0);
        assert_eq!(tp.anchors[0].age, 104.0);
        assert_eq!(tp.anchors[1].depth, 7.0);
        assert_eq!(tp.anchors[1].age, 109.0);
    }

    #[test]
    fn empty_extrema_give_empty_tie_points() {
        let s = indexed(&[1.0, 2.0, 3.0]);
        let tp = match_extrema(&s, &ExtremumSet::default(), &s, &ExtremumSet::from_sorted(vec![1])).unwrap();
        assert!(tp.is_empty());
    }

    #[test]
    fn out_of_range_positions_are_invalid() {
        let s = indexed(&[1.0, 2.0, 3.0]);
        let bad = ExtremumSet::from_sorted(vec![1, 3]);
        let err = match_extrema(&s, &bad, &s, &ExtremumSet::from_sorted(vec![1])).unwrap_err();
        assert!(matches!(err, AgeModelError::InvalidInput(_)));
    }

    #[test]
    fn anchors_carry_raw_values() {
        let depth = indexed(&[5.0, 4.0, 3.0, 4.0, 5.0]);
        let age = indexed(&[20.0, 21.0, 22.0, 21.0, 20.0]);
        let tp = match_extrema(
            &depth,
            &ExtremumSet::from_sorted(vec![2]),
            &age,
            &ExtremumSet::from_sorted(vec![2]),
        )
        .unwrap();
        assert_eq!(tp.anchors[0].proxy_value, 3.0);
        assert_eq!(tp.anchors[0].reference_value, 22.0);
    }

    #[test]
    fn correlation_requires_two_anchors() {
        let tp = TiePointSet {
            anchors: vec![AnchorPair {
                depth: 1.0,
                age: 1.0,
                proxy_value: -5.0,
                reference_value: 28.0,
            }],
        };
        assert_eq!(correlation(&tp), Err(AgeModelError::InsufficientAnchors { found: 1 }));
    }

    #[test]
    fn correlation_detects_inverse_relationship() {
        let anchors = (0..6)
            .map(|i| {
                let sst = 27.0 + i as f64 * 0.3;
                AnchorPair {
                    depth: i as f64,
                    age: i as f64,
                    proxy_value: -5.0 - 0.23 * sst,
                    reference_value: sst,
                }
            })
            .collect();
        let c = correlation(&TiePointSet { anchors }).unwrap();
        assert!(c.r < -0.999);
        assert!(c.p_value < 1e-6);
    }

    #[test]
    fn policies_select_expected_extrema_for_one_cycle() {
        let tau = std::f64::consts::TAU;
        let proxy: Vec<f64> = (0..12).map(|i| (tau * i as f64 / 12.0).sin()).collect();
        let reference: Vec<f64> = proxy.iter().map(|v| -v).collect();
        let p = smooth(&indexed(&proxy), 0.0).unwrap();
        let r = smooth(&indexed(&reference), 0.0).unwrap();

        let pt = select_extrema(&p, 3, &r, 3, MatchPolicy::PeakTrough).unwrap();
        assert_eq!(pt.proxy.positions(), &[9]);
        assert_eq!(pt.reference.positions(), &[9]);

        let all = select_extrema(&p, 3, &r, 3, MatchPolicy::Extrema).unwrap();
        assert_eq!(all.proxy.positions(), &[3, 9]);
        assert_eq!(all.reference.positions(), &[3, 9]);
    }
}
