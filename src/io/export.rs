//! Export run results to CSV.
//!
//! The exports are meant to be easy to consume in spreadsheets or downstream
//! scripts. Every file lands in the caller-supplied output directory.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use log::warn;

use crate::domain::{AnnotatedSample, Series, TiePointSet};
use crate::error::AppError;
use crate::models::ResampledSeries;

pub const TIE_POINTS_FILE: &str = "tie_points.csv";
pub const ANNOTATED_FILE: &str = "annotated_proxy.csv";
pub const RESAMPLED_FILE: &str = "resampled_proxy.csv";

/// Paths of the files written by [`write_run_tables`].
#[derive(Debug, Clone)]
pub struct ExportPaths {
    pub tie_points: PathBuf,
    pub annotated: PathBuf,
    pub resampled: PathBuf,
}

/// Create `output_dir` if needed.
pub fn ensure_output_dir(output_dir: &Path) -> Result<(), AppError> {
    fs::create_dir_all(output_dir).map_err(|e| {
        AppError::new(
            2,
            format!("Failed to create output directory '{}': {e}", output_dir.display()),
        )
    })
}

/// Write the tie-point, annotated, and resampled tables into `output_dir`.
///
/// The tables are staged under hidden `.partial` names and only renamed into
/// place once all three are written, so a write failure leaves any previous
/// set untouched. A failure during the final renames can still leave a mix.
pub fn write_run_tables(
    output_dir: &Path,
    tie_points: &TiePointSet,
    annotated: &[AnnotatedSample],
    resampled: &ResampledSeries,
) -> Result<ExportPaths, AppError> {
    ensure_output_dir(output_dir)?;
    let paths = ExportPaths {
        tie_points: output_dir.join(TIE_POINTS_FILE),
        annotated: output_dir.join(ANNOTATED_FILE),
        resampled: output_dir.join(RESAMPLED_FILE),
    };
    let staged = [
        staging_path(output_dir, TIE_POINTS_FILE),
        staging_path(output_dir, ANNOTATED_FILE),
        staging_path(output_dir, RESAMPLED_FILE),
    ];

    let written = with_file(&staged[0], |w| write_tie_points(w, tie_points))
        .and_then(|_| with_file(&staged[1], |w| write_annotated(w, annotated)))
        .and_then(|_| with_file(&staged[2], |w| write_resampled(w, resampled)));
    if let Err(err) = written {
        discard(&staged);
        return Err(err);
    }

    for (from, to) in staged.iter().zip([&paths.tie_points, &paths.annotated, &paths.resampled]) {
        if let Err(e) = fs::rename(from, to) {
            discard(&staged);
            return Err(AppError::new(2, format!("Failed to move '{}' into place: {e}", to.display())));
        }
    }
    Ok(paths)
}

fn staging_path(output_dir: &Path, file_name: &str) -> PathBuf {
    output_dir.join(format!(".{file_name}.partial"))
}

fn discard(staged: &[PathBuf]) {
    for path in staged {
        if path.exists() && fs::remove_file(path).is_err() {
            warn!("Could not remove staged file '{}'.", path.display());
        }
    }
}

/// Anchors in detection order.
pub fn write_tie_points<W: Write>(w: &mut W, tie_points: &TiePointSet) -> std::io::Result<()> {
    writeln!(w, "depth_mm,age_yr_bp,proxy_value,reference_value")?;
    for a in &tie_points.anchors {
        writeln!(w, "{},{},{},{}", a.depth, a.age, a.proxy_value, a.reference_value)?;
    }
    Ok(())
}

pub fn write_annotated<W: Write>(w: &mut W, rows: &[AnnotatedSample]) -> std::io::Result<()> {
    writeln!(w, "depth_mm,proxy_value,age_yr_bp")?;
    for r in rows {
        writeln!(w, "{},{},{:.6}", r.depth, r.value, r.age)?;
    }
    Ok(())
}

pub fn write_resampled<W: Write>(w: &mut W, resampled: &ResampledSeries) -> std::io::Result<()> {
    writeln!(w, "age_yr_bp,proxy_value")?;
    for (age, value) in resampled.iter() {
        writeln!(w, "{age:.6},{value:.6}")?;
    }
    Ok(())
}

/// Two-column table with the given headers, e.g. a simulated input series.
pub fn write_series<W: Write>(w: &mut W, index_header: &str, value_header: &str, series: &Series) -> std::io::Result<()> {
    writeln!(w, "{index_header},{value_header}")?;
    for (index, value) in series.iter() {
        writeln!(w, "{index},{value:.6}")?;
    }
    Ok(())
}

/// Create `path` and hand a buffered writer to `body`, mapping failures to exit code 2.
pub fn with_file<F>(path: &Path, body: F) -> Result<(), AppError>
where
    F: FnOnce(&mut BufWriter<File>) -> std::io::Result<()>,
{
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create '{}': {e}", path.display())))?;
    let mut w = BufWriter::new(file);
    body(&mut w)
        .and_then(|_| w.flush())
        .map_err(|e| AppError::new(2, format!("Failed to write '{}': {e}", path.display())))
}
