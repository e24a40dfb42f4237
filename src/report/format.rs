//! Formatted terminal output.
//!
//! Formatting code lives in one place so:
//! - the segmentation/summary code stays clean and testable
//! - output changes are localized

use chrono::{Duration, NaiveDate, NaiveDateTime};

use crate::domain::Segmentation;
use crate::math::LabeledMatrix;
use crate::summary::DmxSummary;

use super::BinStats;

/// Render `dmxstats` output, one line per bin.
pub fn format_dmxstats(stats: &[BinStats]) -> String {
    let mut out = String::new();
    for s in stats {
        out.push_str(&s.line());
        out.push('\n');
    }
    out
}

/// The accepted bins, one summary line each.
pub fn format_bin_table(segmentation: &Segmentation) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "=== DMX bins ({}) ===\n",
        segmentation.strategy.display_name()
    ));
    out.push_str(&format!(
        "{} out of {} TOAs are in a DMX bin\n",
        segmentation.assigned_count(),
        segmentation.mask.len()
    ));
    for bin in &segmentation.bins {
        out.push_str(&bin.sum_line());
        out.push('\n');
    }
    out
}

/// Dates that could not be used, per band, plus discarded window times.
pub fn format_unusable(segmentation: &Segmentation) -> String {
    let mut out = String::new();
    out.push_str("Remove high-frequency data from these days:\n");
    for t in &segmentation.unusable_high {
        out.push_str(&format!("{t:8.2}\n"));
    }
    out.push_str("\nRemove low-frequency data from these days:\n");
    for t in &segmentation.unusable_low {
        out.push_str(&format!("{t:8.2}\n"));
    }
    if !segmentation.discarded.is_empty() {
        out.push_str("\nDiscarded (single-band window) TOA times:\n");
        for t in &segmentation.discarded {
            out.push_str(&format!("{t:8.2}\n"));
        }
    }
    out
}

/// Par-file lines declaring the bins.
pub fn format_parfile_lines(segmentation: &Segmentation, max_diff: f64) -> String {
    let mut out = String::new();
    out.push_str("Enter the following in your parfile\n");
    out.push_str("-------------------------------------\n");
    out.push_str(&format!("DMX         {max_diff:.2}\n"));

    let mut prev_max = f64::NEG_INFINITY;
    for (i, ((r1, r2), bin)) in segmentation
        .boundaries()
        .into_iter()
        .zip(&segmentation.bins)
        .enumerate()
    {
        out.push_str(&format!("DMX_{:04}      0.0       1\n", i + 1));
        out.push_str(&format!("DMXR1_{:04}      {r1:10.4}\n", i + 1));
        out.push_str(&format!("DMXR2_{:04}      {r2:10.4}\n", i + 1));
        if bin.min < prev_max {
            out.push_str(&format!(
                "WARNING: DMX_{:04} starts before the previous bin ends\n",
                i + 1
            ));
        }
        prev_max = bin.max;
    }
    out
}

/// Lower triangle of a labeled covariance.
pub fn format_covariance(cov: &LabeledMatrix) -> String {
    let width = cov.labels().iter().map(String::len).max().unwrap_or(0).max(10);
    let mut out = String::new();

    out.push_str(&format!("{:width$}", ""));
    for label in cov.labels() {
        out.push_str(&format!(" {label:>width$}"));
    }
    out.push('\n');

    let m = cov.matrix();
    for (r, label) in cov.labels().iter().enumerate() {
        out.push_str(&format!("{label:width$}"));
        for c in 0..=r {
            out.push_str(&format!(" {:>width$}", fmt_exp(m[(r, c)], 3, false)));
        }
        out.push('\n');
    }
    out
}

/// Human-readable version of a [`DmxSummary`].
pub fn format_summary(summary: &DmxSummary) -> String {
    let mut out = String::new();
    out.push_str("=== dmxparse ===\n");
    out.push_str(&format!(
        "Mean DMX value: {} {}\n",
        fmt_exp(summary.mean_dmx, 6, true),
        summary.value_unit
    ));
    out.push_str(&format!(
        "Uncertainty in average DM: {} {}\n",
        fmt_exp(summary.avg_dm_err, 5, false),
        summary.value_unit
    ));
    if let Some((offset, err)) = summary.weighted_offset() {
        out.push_str(&format!(
            "Weighted mean offset: {} +/- {}\n",
            fmt_exp(offset, 3, true),
            fmt_exp(err, 3, false)
        ));
    }
    out.push('\n');

    out.push_str(&format!(
        "{:<10} {:>12} {:>12} {:>15} {:>10}\n",
        "Bin", "Epoch", "Date", "DMX - mean", "Error"
    ));
    for k in 0..summary.len() {
        let date = mjd_to_date(summary.dmxeps[k])
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "-".to_string());
        let err = summary.dmx_verrs[k]
            .map(|e| fmt_exp(e, 3, false))
            .unwrap_or_else(|| "frozen".to_string());
        out.push_str(&format!(
            "{:<10} {:>12.4} {:>12} {:>15} {:>10}\n",
            summary.bins[k],
            summary.dmxeps[k],
            date,
            fmt_exp(summary.dmxs[k], 5, true),
            err
        ));
    }
    out
}

/// Calendar date-time for a Modified Julian Date (MJD 0 = 1858-11-17 00:00).
pub fn mjd_to_date(mjd: f64) -> Option<NaiveDateTime> {
    if !mjd.is_finite() || mjd.abs() > 1.0e7 {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1858, 11, 17)?.and_hms_opt(0, 0, 0)?;
    let ms = (mjd * 86_400_000.0).round() as i64;
    epoch.checked_add_signed(Duration::try_milliseconds(ms)?)
}

/// C-style scientific notation: `fmt_exp(2.5e-3, 6, true) == "+2.500000e-03"`.
///
/// The exponent always carries a sign and at least two digits. Non-finite
/// values print as `nan`/`inf`.
pub fn fmt_exp(x: f64, precision: usize, plus: bool) -> String {
    let sign = if x.is_sign_negative() && !x.is_nan() {
        "-"
    } else if plus {
        "+"
    } else {
        ""
    };
    if x.is_nan() {
        return format!("{sign}nan");
    }
    if x.is_infinite() {
        return format!("{sign}inf");
    }

    let raw = format!("{:.*e}", precision, x.abs());
    let Some((mantissa, exp)) = raw.split_once('e') else {
        return raw;
    };
    let exp: i32 = exp.parse().unwrap_or(0);
    let exp_sign = if exp < 0 { '-' } else { '+' };
    format!("{sign}{mantissa}e{exp_sign}{:02}", exp.abs())
}
