//! Formatted terminal output for build and sweep runs.
//!
//! We keep formatting code in one place so:
//! - the numerical code stays clean and testable
//! - output changes are localized

use crate::app::pipeline::{BuildRun, SweepRow};
use crate::domain::{AlignParams, Correlation, TiePointSet};
use crate::io::ingest::IngestedSeries;
use crate::models::AgeModel;

/// Format the full run summary (inputs + tie points + age model + grid).
pub fn format_run_summary(run: &BuildRun, params: &AlignParams) -> String {
    let output = &run.output;
    let mut out = String::new();

    out.push_str("=== coral - depth/age model ===\n");
    out.push_str(&format_input("Proxy", &run.proxy));
    out.push_str(&format_input("Reference", &run.reference));
    out.push_str(&format!(
        "Params: sigma={} detrend={} proxy_spacing={} reference_spacing={} policy={}\n",
        params.condition.sigma,
        params.condition.detrend,
        params.proxy_spacing,
        params.reference_spacing,
        params.policy.display_name(),
    ));
    out.push_str(&format!(
        "Extrema: proxy={} reference={} -> tie points={}\n",
        output.extrema.proxy.len(),
        output.extrema.reference.len(),
        output.tie_points.len()
    ));
    out.push_str(&format!("Correlation: {}\n", fmt_correlation(output.correlation)));

    out.push_str("\nTie points:\n");
    out.push_str(&format_tie_points(&output.tie_points));

    out.push_str("\nAge model:\n");
    out.push_str(&format_segments(&output.age_model));
    out.push_str(&format!(
        "Monotonic: {}\n",
        if output.age_model.is_monotonic() { "yes" } else { "no (grid folds some samples)" }
    ));

    out.push_str(&format!(
        "\nResampled: n={} step={:.6}yr ({})",
        output.resampled.len(),
        output.resampled.step,
        if output.resampled.step_derived { "median spacing" } else { "fixed" }
    ));
    if let (Some(first), Some(last)) = (output.resampled.ages.first(), output.resampled.ages.last()) {
        out.push_str(&format!(" | age=[{first:.3}, {last:.3}]"));
    }
    out.push_str("\n\n");

    out
}

fn format_input(label: &str, input: &IngestedSeries) -> String {
    let index = input.series.index();
    let mut line = format!(
        "{label}: {} vs {} | rows={} used={} | index=[{:.3}, {:.3}]",
        input.index_column,
        input.value_column,
        input.rows_read,
        input.rows_used,
        index[0],
        index[index.len() - 1],
    );
    if !input.row_errors.is_empty() {
        line.push_str(&format!(" | skipped={}", input.row_errors.len()));
    }
    if input.duplicates_dropped > 0 {
        line.push_str(&format!(" | duplicates={}", input.duplicates_dropped));
    }
    line.push('\n');
    line
}

/// Tie points in detection order.
pub fn format_tie_points(tie_points: &TiePointSet) -> String {
    let mut out = String::new();
    push_row(
        &mut out,
        format!("{:>4} {:>10} {:>10} {:>12} {:>12}", "#", "depth_mm", "age_yr", "proxy", "reference"),
    );
    push_row(&mut out, format!("{:-<4} {:-<10} {:-<10} {:-<12} {:-<12}", "", "", "", "", ""));
    for (i, a) in tie_points.anchors.iter().enumerate() {
        push_row(
            &mut out,
            format!(
                "{:>4} {:>10.3} {:>10.4} {:>12.4} {:>12.4}",
                i + 1,
                a.depth,
                a.age,
                a.proxy_value,
                a.reference_value
            ),
        );
    }
    out
}

/// Linear segments with slope and growth rate.
pub fn format_segments(model: &AgeModel) -> String {
    let mut out = String::new();
    push_row(
        &mut out,
        format!("{:>10} {:>10} {:>12} {:>12}", "from_mm", "to_mm", "yr_per_mm", "mm_per_yr"),
    );
    push_row(&mut out, format!("{:-<10} {:-<10} {:-<12} {:-<12}", "", "", "", ""));
    for s in model.segments() {
        let rate = s.growth_rate().map(|r| format!("{r:.3}")).unwrap_or_else(|| "-".to_string());
        push_row(
            &mut out,
            format!("{:>10.3} {:>10.3} {:>12.5} {:>12}", s.depth_from, s.depth_to, s.slope, rate),
        );
    }
    out
}

/// Sensitivity sweep table, one line per parameter combination.
pub fn format_sweep(rows: &[SweepRow]) -> String {
    let mut out = String::new();
    push_row(
        &mut out,
        format!(
            "{:>6} {:>8} {:>8} {:>6} {:>8} {:>10} {:>5} {:>6}  {}",
            "sigma", "proxy_sp", "ref_sp", "ties", "r", "p", "mono", "grid", "note"
        ),
    );
    push_row(
        &mut out,
        format!(
            "{:-<6} {:-<8} {:-<8} {:-<6} {:-<8} {:-<10} {:-<5} {:-<6}  {:-<4}",
            "", "", "", "", "", "", "", "", ""
        ),
    );
    for row in rows {
        let line = match &row.outcome {
            Ok(o) => {
                let (r, p) = match o.correlation {
                    Some(c) => (format!("{:.3}", c.r), format!("{:.2e}", c.p_value)),
                    None => ("-".to_string(), "-".to_string()),
                };
                format!(
                    "{:>6} {:>8} {:>8} {:>6} {:>8} {:>10} {:>5} {:>6}",
                    row.sigma,
                    row.proxy_spacing,
                    row.reference_spacing,
                    o.tie_points,
                    r,
                    p,
                    if o.monotonic { "yes" } else { "no" },
                    o.grid_points
                )
            }
            Err(e) => format!(
                "{:>6} {:>8} {:>8} {:>6} {:>8} {:>10} {:>5} {:>6}  {e}",
                row.sigma, row.proxy_spacing, row.reference_spacing, "-", "-", "-", "-", "-"
            ),
        };
        push_row(&mut out, line);
    }
    out
}

fn fmt_correlation(c: Option<Correlation>) -> String {
    match c {
        Some(c) => format!("r={:.3} p={:.3e} (n={})", c.r, c.p_value, c.n),
        None => "undefined (constant values at anchors)".to_string(),
    }
}

fn push_row(out: &mut String, row: String) {
    out.push_str(row.trim_end());
    out.push('\n');
}
