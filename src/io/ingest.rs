//! TOA CSV ingest.
//!
//! Turns a CSV of arrival times into `Toa`s that are safe to segment.
//!
//! Design goals:
//! - **Strict schema** for the two required columns (clear errors + exit code 2)
//! - **Row-level validation** (skip bad rows, but report what happened)
//! - **Deterministic behavior**: rows keep their file order

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;
use tracing::{info, warn};

use crate::domain::Toa;
use crate::error::DmxError;

const MJD_COLUMNS: &[&str] = &["mjd", "time", "toa"];
const FREQ_COLUMNS: &[&str] = &["freq", "freq_mhz", "frequency"];

/// A row-level error encountered during ingest.
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Ingest output: parsed TOAs plus what was skipped.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestedToas {
    pub toas: Vec<Toa>,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

/// Load TOAs from a CSV file with `mjd` and `freq` columns.
pub fn load_toas(path: &Path) -> Result<IngestedToas, DmxError> {
    let file = File::open(path)
        .map_err(|e| DmxError::io(format!("Failed to open TOA CSV '{}': {e}", path.display())))?;
    let ingested = read_toas(file)?;
    info!(
        path = %path.display(),
        rows = ingested.rows_read,
        toas = ingested.toas.len(),
        "loaded TOAs"
    );
    Ok(ingested)
}

/// Parse TOAs from any CSV reader.
pub fn read_toas<R: Read>(reader: R) -> Result<IngestedToas, DmxError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| DmxError::parse(format!("Failed to read CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);

    let mjd_col = find_column(&header_map, MJD_COLUMNS)?;
    let freq_col = find_column(&header_map, FREQ_COLUMNS)?;

    let mut toas = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        rows_read += 1;
        // Comment lines are skipped by the reader, so prefer its own position.
        let fallback_line = idx + 2;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                let line = e
                    .position()
                    .map(|p| p.line() as usize)
                    .unwrap_or(fallback_line);
                row_errors.push(RowError {
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };
        let line = record
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(fallback_line);

        match parse_row(&record, mjd_col, freq_col) {
            Ok(toa) => toas.push(toa),
            Err(message) => row_errors.push(RowError { line, message }),
        }
    }

    if !row_errors.is_empty() {
        warn!(skipped = row_errors.len(), "skipped malformed TOA rows");
    }

    Ok(IngestedToas {
        toas,
        row_errors,
        rows_read,
    })
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports sometimes prefix the first header with a UTF-8 BOM.
    name.trim().trim_start_matches('\u{feff}').to_ascii_lowercase()
}

fn find_column(header_map: &HashMap<String, usize>, aliases: &[&str]) -> Result<usize, DmxError> {
    aliases
        .iter()
        .find_map(|a| header_map.get(*a).copied())
        .ok_or_else(|| {
            DmxError::parse(format!(
                "Missing required column (one of: {}).",
                aliases.join(", ")
            ))
        })
}

fn parse_row(record: &StringRecord, mjd_col: usize, freq_col: usize) -> Result<Toa, String> {
    let mjd = parse_f64(record, mjd_col, "mjd")?;
    let freq = parse_f64(record, freq_col, "freq")?;
    if freq <= 0.0 {
        return Err(format!("freq must be > 0, got {freq}"));
    }
    Ok(Toa::new(mjd, freq))
}

fn parse_f64(record: &StringRecord, col: usize, label: &str) -> Result<f64, String> {
    let raw = record
        .get(col)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("missing {label}"))?;
    let value: f64 = raw
        .parse()
        .map_err(|_| format!("invalid {label} '{raw}'"))?;
    if !value.is_finite() {
        return Err(format!("non-finite {label} '{raw}'"));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_aliased_headers_with_bom() {
        let csv = "\u{feff}Time,Frequency,site\n55000.1,1400.0,gbt\n55000.2,430,ao\n";
        let out = read_toas(csv.as_bytes()).unwrap();
        assert_eq!(out.toas, vec![Toa::new(55000.1, 1400.0), Toa::new(55000.2, 430.0)]);
        assert_eq!(out.rows_read, 2);
        assert!(out.row_errors.is_empty());
    }

    #[test]
    fn bad_rows_are_reported_not_fatal() {
        let csv = "mjd,freq\n55000.0,1400\nabc,1400\n55001.0,\n55002.0,-5\n# comment\n55003.0,820\n";
        let out = read_toas(csv.as_bytes()).unwrap();
        assert_eq!(out.toas.len(), 2);
        assert_eq!(out.row_errors.len(), 3);
        assert_eq!(out.row_errors[0].line, 3);
        assert!(out.row_errors[0].message.contains("invalid mjd"));
    }

    #[test]
    fn row_errors_report_file_lines_past_comments() {
        let csv = "mjd,freq\n# first comment\n# second comment\n55000.0,1400\nbad,1400\n";
        let out = read_toas(csv.as_bytes()).unwrap();
        assert_eq!(out.toas.len(), 1);
        assert_eq!(out.row_errors.len(), 1);
        assert_eq!(out.row_errors[0].line, 5);
    }

    #[test]
    fn missing_column_is_fatal() {
        let err = read_toas("mjd,site\n1,gbt\n".as_bytes()).unwrap_err();
        assert!(matches!(err, DmxError::Parse(_)));
        assert_eq!(err.exit_code(), 2);
    }
}
