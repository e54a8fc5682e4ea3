//! Shared age-model pipeline used by the `build` and `sweep` commands.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! condition -> detect extrema -> match -> build age model -> resample
//!
//! Each run is a pure function of its inputs; the sweep runner maps it over a
//! parameter grid in parallel.

use log::{debug, info, warn};
use rayon::prelude::*;

use crate::domain::{AlignParams, AnnotatedSample, Correlation, RunConfig, Series, SmoothedSeries, TiePointSet};
use crate::error::{AgeModelError, AppError};
use crate::io::ingest::{IngestedSeries, SeriesRole, load_series};
use crate::models::{AgeModel, ResampledSeries, build, resample};
use crate::signal::condition;
use crate::tiepoints::{SelectedExtrema, correlation, match_extrema, select_extrema};

/// All computed outputs of a single age-model run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub proxy_smoothed: SmoothedSeries,
    pub reference_smoothed: SmoothedSeries,
    pub extrema: SelectedExtrema,
    pub tie_points: TiePointSet,
    /// `None` only when the coefficient is undefined (zero-variance anchors).
    pub correlation: Option<Correlation>,
    pub age_model: AgeModel,
    pub annotated: Vec<AnnotatedSample>,
    pub resampled: ResampledSeries,
}

/// Inputs as loaded from disk plus the computed outputs.
#[derive(Debug, Clone)]
pub struct BuildRun {
    pub proxy: IngestedSeries,
    pub reference: IngestedSeries,
    pub output: RunOutput,
}

/// Load both tables and execute the pipeline.
pub fn run_build(config: &RunConfig) -> Result<BuildRun, AppError> {
    let proxy = load_series(&config.proxy_path, SeriesRole::Proxy, &config.proxy_columns)?;
    let reference = load_series(&config.reference_path, SeriesRole::Reference, &config.reference_columns)?;

    let output = run_with_series(&proxy.series, &reference.series, &config.params)?;
    Ok(BuildRun {
        proxy,
        reference,
        output,
    })
}

/// Execute the pipeline on in-memory series.
pub fn run_with_series(proxy: &Series, reference: &Series, params: &AlignParams) -> Result<RunOutput, AgeModelError> {
    // 1) Condition both signals identically.
    let proxy_smoothed = condition(proxy, &params.condition)?;
    let reference_smoothed = condition(reference, &params.condition)?;

    // 2) Detect and combine extrema.
    let extrema = select_extrema(
        &proxy_smoothed,
        params.proxy_spacing,
        &reference_smoothed,
        params.reference_spacing,
        params.policy,
    )?;
    debug!(
        "Extrema ({}): proxy={:?} reference={:?}",
        params.policy.display_name(),
        extrema.proxy.positions(),
        extrema.reference.positions()
    );

    // 3) Match by rank.
    let tie_points = match_extrema(proxy, &extrema.proxy, reference, &extrema.reference)?;
    info!(
        "Found {} proxy and {} reference extrema; matched {} tie points.",
        extrema.proxy.len(),
        extrema.reference.len(),
        tie_points.len()
    );

    // 4) Diagnostic correlation. Fewer than two anchors fails here with the
    // same error `build` would raise.
    let corr = correlation(&tie_points)?;
    let correlation = if corr.is_defined() {
        info!("Tie-point correlation: r = {:.2}, p = {:.3e} (n = {})", corr.r, corr.p_value, corr.n);
        Some(corr)
    } else {
        warn!("Tie-point correlation is undefined (constant values at anchors).");
        None
    };

    // 5) Age model.
    let age_model = build(&tie_points)?;
    if !age_model.is_monotonic() {
        warn!("Age model is not monotonic in depth; the even time grid will fold some samples together.");
    }
    let annotated = age_model.annotate(proxy);

    // 6) Even time grid.
    let resampled = resample(proxy, &age_model, &params.grid)?;
    info!(
        "Resampled {} samples onto {} grid points (step = {:.4}{}).",
        proxy.len(),
        resampled.len(),
        resampled.step,
        if resampled.step_derived { ", derived" } else { "" }
    );

    Ok(RunOutput {
        proxy_smoothed,
        reference_smoothed,
        extrema,
        tie_points,
        correlation,
        age_model,
        annotated,
        resampled,
    })
}

/// One combination of the sensitivity sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepRow {
    pub sigma: f64,
    pub proxy_spacing: usize,
    pub reference_spacing: usize,
    pub outcome: Result<SweepOutcome, AgeModelError>,
}

/// Summary of a successful sweep run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepOutcome {
    pub tie_points: usize,
    pub correlation: Option<Correlation>,
    pub monotonic: bool,
    pub grid_points: usize,
}

/// Run the pipeline for every `sigma × proxy_spacing × reference_spacing`
/// combination. Rows come back in grid order regardless of scheduling.
pub fn run_sweep(
    proxy: &Series,
    reference: &Series,
    base: &AlignParams,
    sigmas: &[f64],
    proxy_spacings: &[usize],
    reference_spacings: &[usize],
) -> Vec<SweepRow> {
    let mut grid = Vec::with_capacity(sigmas.len() * proxy_spacings.len() * reference_spacings.len());
    for &sigma in sigmas {
        for &proxy_spacing in proxy_spacings {
            for &reference_spacing in reference_spacings {
                grid.push((sigma, proxy_spacing, reference_spacing));
            }
        }
    }

    grid.into_par_iter()
        .map(|(sigma, proxy_spacing, reference_spacing)| {
            let mut params = *base;
            params.condition.sigma = sigma;
            params.proxy_spacing = proxy_spacing;
            params.reference_spacing = reference_spacing;

            let outcome = run_with_series(proxy, reference, &params).map(|out| SweepOutcome {
                tie_points: out.tie_points.len(),
                correlation: out.correlation,
                monotonic: out.age_model.is_monotonic(),
                grid_points: out.resampled.len(),
            });
            SweepRow {
                sigma,
                proxy_spacing,
                reference_spacing,
                outcome,
            }
        })
        .collect()
}
