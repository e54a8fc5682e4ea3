//! Read/write run summary JSON files.
//!
//! The summary is the portable record of one `coral build` run:
//! - parameters the pipeline ran with
//! - the matched tie points and their correlation
//! - the age model knots plus derived growth rates
//! - resampling grid details
//!
//! `coral plot --summary` reloads it to redraw the age model without re-running.

use std::fs::File;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{AlignParams, Correlation, TiePointSet};
use crate::error::AppError;
use crate::models::{AgeModel, ResampledSeries};

pub const SUMMARY_FILE: &str = "run_summary.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub tool: String,
    pub generated_at: DateTime<Utc>,
    pub inputs: SummaryInputs,
    pub params: AlignParams,
    pub tie_points: TiePointSet,
    /// Absent when the coefficient is undefined.
    pub correlation: Option<Correlation>,
    pub age_model: AgeModel,
    pub monotonic: bool,
    pub segments: Vec<SegmentSummary>,
    pub resample: ResampleSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryInputs {
    pub proxy_path: PathBuf,
    pub reference_path: PathBuf,
    pub proxy_rows: usize,
    pub reference_rows: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmentSummary {
    pub depth_from: f64,
    pub depth_to: f64,
    pub years_per_mm: f64,
    /// `None` for a segment with no elapsed time.
    pub mm_per_year: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResampleSummary {
    pub step: f64,
    pub step_derived: bool,
    pub points: usize,
    pub first_age: Option<f64>,
    pub last_age: Option<f64>,
}

impl RunSummary {
    pub fn new(
        inputs: SummaryInputs,
        params: AlignParams,
        tie_points: &TiePointSet,
        correlation: Option<Correlation>,
        age_model: &AgeModel,
        resampled: &ResampledSeries,
        generated_at: DateTime<Utc>,
    ) -> Self {
        let segments = age_model
            .segments()
            .iter()
            .map(|s| SegmentSummary {
                depth_from: s.depth_from,
                depth_to: s.depth_to,
                years_per_mm: s.slope,
                mm_per_year: s.growth_rate(),
            })
            .collect();

        Self {
            tool: "coral".to_string(),
            generated_at,
            inputs,
            params,
            tie_points: tie_points.clone(),
            correlation,
            age_model: age_model.clone(),
            monotonic: age_model.is_monotonic(),
            segments,
            resample: ResampleSummary {
                step: resampled.step,
                step_derived: resampled.step_derived,
                points: resampled.len(),
                first_age: resampled.ages.first().copied(),
                last_age: resampled.ages.last().copied(),
            },
        }
    }
}

/// Write a run summary JSON file.
pub fn write_run_summary(path: &Path, summary: &RunSummary) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create summary JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, summary)
        .map_err(|e| AppError::new(2, format!("Failed to write summary JSON: {e}")))?;
    Ok(())
}

/// Read a run summary JSON file, re-validating the age model table.
pub fn read_run_summary(path: &Path) -> Result<RunSummary, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open summary JSON '{}': {e}", path.display())))?;
    let summary: RunSummary =
        serde_json::from_reader(file).map_err(|e| AppError::new(2, format!("Invalid summary JSON: {e}")))?;
    validate(summary)
}

fn validate(mut summary: RunSummary) -> Result<RunSummary, AppError> {
    let pairs = summary
        .age_model
        .depths()
        .iter()
        .copied()
        .zip(summary.age_model.ages().iter().copied())
        .collect::<Vec<_>>();
    if pairs.len() != summary.age_model.depths().len().max(summary.age_model.ages().len()) {
        return Err(AppError::new(2, "Invalid summary JSON: age model depths and ages differ in length."));
    }
    summary.age_model = AgeModel::from_pairs(pairs)
        .map_err(|e| AppError::new(2, format!("Invalid summary JSON: {e}")))?;
    Ok(summary)
}
