//! ASCII plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - tie points: `o`
//! - age model / resampled series: `-` line

use crate::domain::AnchorPair;
use crate::io::summary::RunSummary;
use crate::models::{AgeModel, ResampledSeries};

/// Axis labels and units for the header line.
struct Axes {
    title: &'static str,
    x_label: &'static str,
    x_unit: &'static str,
    y_label: &'static str,
    y_unit: &'static str,
}

const AGE_MODEL_AXES: Axes = Axes {
    title: "Age model",
    x_label: "depth",
    x_unit: "mm",
    y_label: "age",
    y_unit: "yr",
};

const RESAMPLED_AXES: Axes = Axes {
    title: "Resampled proxy",
    x_label: "age",
    x_unit: "yr",
    y_label: "value",
    y_unit: "",
};

/// Render the depth → age curve with its anchors overlaid.
pub fn render_age_model_plot(model: &AgeModel, anchors: &[AnchorPair], width: usize, height: usize) -> String {
    let (d_min, d_max) = depth_range(model, anchors).unwrap_or((0.0, 1.0));
    let curve = sample_model(model, d_min, d_max, width.max(2));
    let points: Vec<(f64, f64)> = anchors.iter().map(|a| (a.depth, a.age)).collect();
    render_plot(&points, &curve, d_min, d_max, width, height, &AGE_MODEL_AXES)
}

/// Render the age model stored in a saved run summary.
pub fn render_summary_plot(summary: &RunSummary, width: usize, height: usize) -> String {
    render_age_model_plot(&summary.age_model, &summary.tie_points.anchors, width, height)
}

/// Render the proxy series on its even time grid.
pub fn render_resampled_plot(resampled: &ResampledSeries, width: usize, height: usize) -> String {
    let curve: Vec<(f64, f64)> = resampled.iter().collect();
    let (a_min, a_max) = x_range(&curve).unwrap_or((0.0, 1.0));
    render_plot(&[], &curve, a_min, a_max, width, height, &RESAMPLED_AXES)
}

fn render_plot(
    points: &[(f64, f64)],
    curve: &[(f64, f64)],
    x_min: f64,
    x_max: f64,
    width: usize,
    height: usize,
    axes: &Axes,
) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let (y_min, y_max) = y_range(points, curve).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    // Curve first so points overlay it.
    draw_curve(&mut grid, curve, x_min, x_max, y_min, y_max);

    for &(x, y) in points {
        let col = map_x(x, x_min, x_max, width);
        let row = map_y(y, y_min, y_max, height);
        grid[row][col] = 'o';
    }

    let mut out = String::new();
    out.push_str(&format!(
        "{}: {}=[{x_min:.3}, {x_max:.3}]{} | {}=[{y_min:.2}, {y_max:.2}]{}\n",
        axes.title,
        axes.x_label,
        unit_suffix(axes.x_unit),
        axes.y_label,
        unit_suffix(axes.y_unit),
    ));

    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }

    out
}

fn unit_suffix(unit: &str) -> String {
    if unit.is_empty() { String::new() } else { format!(" {unit}") }
}

fn depth_range(model: &AgeModel, anchors: &[AnchorPair]) -> Option<(f64, f64)> {
    let depths = model.depths().iter().copied().chain(anchors.iter().map(|a| a.depth));
    span(depths)
}

fn x_range(curve: &[(f64, f64)]) -> Option<(f64, f64)> {
    span(curve.iter().map(|&(x, _)| x))
}

fn y_range(points: &[(f64, f64)], curve: &[(f64, f64)]) -> Option<(f64, f64)> {
    span(points.iter().chain(curve.iter()).map(|&(_, y)| y))
}

/// `(min, max)` of finite values, if the span is non-empty.
fn span(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for v in values {
        min = min.min(v);
        max = max.max(v);
    }
    if min.is_finite() && max.is_finite() && max > min {
        Some((min, max))
    } else {
        None
    }
}

fn sample_model(model: &AgeModel, d_min: f64, d_max: f64, n: usize) -> Vec<(f64, f64)> {
    let n = n.max(2);
    (0..n)
        .map(|i| {
            let u = i as f64 / (n as f64 - 1.0);
            let d = d_min + u * (d_max - d_min);
            (d, model.evaluate(d))
        })
        .collect()
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(x: f64, x_min: f64, x_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((x - x_min) / (x_max - x_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // Largest value on row 0.
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_curve(grid: &mut [Vec<char>], curve: &[(f64, f64)], x_min: f64, x_max: f64, y_min: f64, y_max: f64) {
    if curve.len() < 2 {
        return;
    }
    let height = grid.len();
    let width = grid[0].len();

    let mut prev = None;
    for &(x, y) in curve {
        let col = map_x(x, x_min, x_max, width);
        let row = map_y(y, y_min, y_max, height);
        if let Some((c0, r0)) = prev {
            draw_line(grid, c0, r0, col, row, '-');
        } else {
            grid[row][col] = '-';
        }
        prev = Some((col, row));
    }
}

/// Integer line drawing (Bresenham).
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}
