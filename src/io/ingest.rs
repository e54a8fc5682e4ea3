//! CSV/TSV ingest and normalization.
//!
//! This module turns a two-column measurement table (proxy by depth, or
//! reference by age) into a clean `Series` that is safe to align.
//!
//! Design goals:
//! - **Known header aliases** with explicit overrides (clear errors + exit code 2)
//! - **Row-level validation** (skip bad rows, but report what happened)
//! - **Deterministic ordering** (stable sort by index, first duplicate wins)
//! - **Separation of concerns**: no signal processing here

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use csv::StringRecord;
use log::warn;

use crate::domain::{ColumnSelection, Series};
use crate::error::AppError;

/// Which of the two pipeline inputs a table holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesRole {
    /// Isotope record indexed by depth along the growth axis.
    Proxy,
    /// Instrumental temperature record indexed by years before present.
    Reference,
}

impl SeriesRole {
    pub fn label(self) -> &'static str {
        match self {
            SeriesRole::Proxy => "proxy",
            SeriesRole::Reference => "reference",
        }
    }

    /// Accepted index headers, already normalized, in preference order.
    fn index_aliases(self) -> &'static [&'static str] {
        match self {
            SeriesRole::Proxy => &["depth (mm)", "depth_mm", "depth"],
            SeriesRole::Reference => &["years ago", "age_yr_bp", "years_ago", "age"],
        }
    }

    fn value_aliases(self) -> &'static [&'static str] {
        match self {
            SeriesRole::Proxy => &["d18o (per mil)", "d18o", "proxy_value", "value"],
            SeriesRole::Reference => &["sst (°c)", "sst", "reference_value", "value"],
        }
    }
}

/// A row-level error encountered during ingest.
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Ingest output: the cleaned series plus bookkeeping for the report.
#[derive(Debug, Clone)]
pub struct IngestedSeries {
    pub series: Series,
    /// Header names as they appear in the file.
    pub index_column: String,
    pub value_column: String,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
    pub rows_used: usize,
    pub duplicates_dropped: usize,
}

/// Load one table from disk. The delimiter (comma or tab) is detected from the header line.
pub fn load_series(path: &Path, role: SeriesRole, columns: &ColumnSelection) -> Result<IngestedSeries, AppError> {
    let text = fs::read_to_string(path).map_err(|e| {
        AppError::new(
            2,
            format!("Failed to open {} table '{}': {e}", role.label(), path.display()),
        )
    })?;
    parse_series(&text, role, columns).map_err(|e| AppError::new(e.exit_code(), format!("{}: {e}", path.display())))
}

/// Parse table text into a series.
pub fn parse_series(text: &str, role: SeriesRole, columns: &ColumnSelection) -> Result<IngestedSeries, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(detect_delimiter(text))
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read {} headers: {e}", role.label())))?
        .clone();
    let header_map = build_header_map(&headers);

    let index_idx = resolve_column(&header_map, &headers, columns.index.as_deref(), role.index_aliases(), role, "index")?;
    let value_idx = resolve_column(&header_map, &headers, columns.value.as_deref(), role.value_aliases(), role, "value")?;

    let mut pairs = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // +2: records start after the header and lines are 1-based.
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    message: format!("parse error: {e}"),
                });
                continue;
            }
        };

        match parse_row(&record, index_idx, value_idx) {
            Ok(pair) => pairs.push(pair),
            Err(message) => row_errors.push(RowError { line, message }),
        }
    }

    if pairs.is_empty() {
        return Err(AppError::new(
            3,
            format!("No valid {} rows ({rows_read} read, {} rejected).", role.label(), row_errors.len()),
        ));
    }

    let (series, duplicates_dropped) = Series::from_unsorted(pairs)?;
    if duplicates_dropped > 0 {
        warn!(
            "Dropped {duplicates_dropped} {} row(s) with a repeated index; kept the first occurrence.",
            role.label()
        );
    }
    if !row_errors.is_empty() {
        warn!("Skipped {} invalid {} row(s).", row_errors.len(), role.label());
    }

    let rows_used = series.len();

    Ok(IngestedSeries {
        series,
        index_column: headers.get(index_idx).unwrap_or_default().trim_start_matches('\u{feff}').to_string(),
        value_column: headers.get(value_idx).unwrap_or_default().to_string(),
        row_errors,
        rows_read,
        rows_used,
        duplicates_dropped,
    })
}

/// Tab when the header line has more tabs than commas, otherwise comma.
fn detect_delimiter(text: &str) -> u8 {
    let header = text.lines().next().unwrap_or_default();
    let tabs = header.matches('\t').count();
    let commas = header.matches(',').count();
    if tabs > commas { b'\t' } else { b',' }
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    let mut map = HashMap::new();
    for (idx, name) in headers.iter().enumerate() {
        // First occurrence wins for repeated headers.
        map.entry(normalize_header_name(name)).or_insert(idx);
    }
    map
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports often carry a UTF-8 BOM on the first header.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_lowercase()
}

fn resolve_column(
    header_map: &HashMap<String, usize>,
    headers: &StringRecord,
    requested: Option<&str>,
    aliases: &[&str],
    role: SeriesRole,
    what: &str,
) -> Result<usize, AppError> {
    if let Some(name) = requested {
        return header_map.get(&normalize_header_name(name)).copied().ok_or_else(|| {
            AppError::new(
                2,
                format!(
                    "Requested {} {what} column `{name}` not found (available: {}).",
                    role.label(),
                    list_headers(headers)
                ),
            )
        });
    }

    aliases
        .iter()
        .find_map(|alias| header_map.get(*alias).copied())
        .ok_or_else(|| {
            AppError::new(
                2,
                format!(
                    "Missing {} {what} column: expected one of {} (available: {}).",
                    role.label(),
                    aliases.iter().map(|a| format!("`{a}`")).collect::<Vec<_>>().join(", "),
                    list_headers(headers)
                ),
            )
        })
}

fn list_headers(headers: &StringRecord) -> String {
    headers
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}'))
        .collect::<Vec<_>>()
        .join(", ")
}

fn parse_row(record: &StringRecord, index_idx: usize, value_idx: usize) -> Result<(f64, f64), String> {
    let index = parse_cell(record, index_idx, "index")?;
    let value = parse_cell(record, value_idx, "value")?;
    Ok((index, value))
}

fn parse_cell(record: &StringRecord, idx: usize, what: &str) -> Result<f64, String> {
    let raw = record
        .get(idx)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("missing {what}"))?;
    let v = raw
        .parse::<f64>()
        .map_err(|_| format!("invalid {what} '{raw}'"))?;
    if v.is_finite() { Ok(v) } else { Err(format!("non-finite {what} '{raw}'")) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_canonical_headers_with_bom() {
        let text = "\u{feff}Depth (mm),d18o (per mil)\n0,-5.1\n1,-5.3\n2,-5.2\n";
        let out = parse_series(text, SeriesRole::Proxy, &ColumnSelection::default()).unwrap();
        assert_eq!(out.series.index(), &[0.0, 1.0, 2.0]);
        assert_eq!(out.series.values(), &[-5.1, -5.3, -5.2]);
        assert_eq!(out.index_column, "Depth (mm)");
        assert_eq!(out.rows_used, 3);
    }

    #[test]
    fn detects_tab_delimiter_and_reference_aliases() {
        let text = "Years Ago\tSST (°C)\n0.5\t28.1\n0.0\t27.9\n";
        let out = parse_series(text, SeriesRole::Reference, &ColumnSelection::default()).unwrap();
        assert_eq!(out.series.index(), &[0.0, 0.5]);
        assert_eq!(out.series.values(), &[27.9, 28.1]);
    }

    #[test]
    fn explicit_columns_override_aliases() {
        let text = "pos,depth,iso\n0,9,1.0\n1,8,2.0\n";
        let columns = ColumnSelection {
            index: Some("POS".to_string()),
            value: Some("iso".to_string()),
        };
        let out = parse_series(text, SeriesRole::Proxy, &columns).unwrap();
        assert_eq!(out.series.index(), &[0.0, 1.0]);
        assert_eq!(out.series.values(), &[1.0, 2.0]);
    }

    #[test]
    fn bad_rows_are_reported_and_skipped() {
        let text = "depth,d18o\n0,-5\nx,-5\n2,\n3,NaN\n4,-4\n";
        let out = parse_series(text, SeriesRole::Proxy, &ColumnSelection::default()).unwrap();
        assert_eq!(out.rows_read, 5);
        assert_eq!(out.rows_used, 2);
        let lines: Vec<usize> = out.row_errors.iter().map(|e| e.line).collect();
        assert_eq!(lines, vec![3, 4, 5]);
    }

    #[test]
    fn duplicates_keep_first_occurrence() {
        let text = "depth,d18o\n2,-1\n1,-2\n2,-3\n";
        let out = parse_series(text, SeriesRole::Proxy, &ColumnSelection::default()).unwrap();
        assert_eq!(out.duplicates_dropped, 1);
        assert_eq!(out.series.values(), &[-2.0, -1.0]);
    }

    #[test]
    fn missing_column_is_exit_code_2() {
        let text = "foo,bar\n1,2\n";
        let err = parse_series(text, SeriesRole::Reference, &ColumnSelection::default()).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("foo, bar"));
    }

    #[test]
    fn no_usable_rows_is_exit_code_3() {
        let text = "age,sst\nabc,1\n";
        let err = parse_series(text, SeriesRole::Reference, &ColumnSelection::default()).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }
}
