//! Plain-text exports.
//!
//! - `dmxparse.out`: the fixed-format DMX summary table
//! - TOA CSV: the same `mjd,freq` layout `ingest` reads

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::domain::Toa;
use crate::error::DmxError;
use crate::report::fmt_exp;
use crate::summary::DmxSummary;

/// Render the summary in the `dmxparse.out` layout.
pub fn format_dmxparse_out(summary: &DmxSummary) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "# Mean DMX value = {} \n",
        fmt_exp(summary.mean_dmx, 6, true)
    ));
    out.push_str(&format!(
        "# Uncertainty in average DM = {} \n",
        fmt_exp(summary.avg_dm_err, 5, false)
    ));
    out.push_str("# Columns: DMXEP DMX_value DMX_var_err DMXR1 DMXR2 DMX_bin \n");

    for k in 0..summary.len() {
        let err = summary.dmx_verrs[k].unwrap_or(f64::NAN);
        out.push_str(&format!(
            "{:.4} {} {} {:.4} {:.4} {} \n",
            summary.dmxeps[k],
            fmt_exp(summary.dmxs[k], 7, true),
            fmt_exp(err, 3, false),
            summary.r1s[k],
            summary.r2s[k],
            summary.bins[k],
        ));
    }
    out
}

/// Write the summary to `path` in the `dmxparse.out` layout.
pub fn write_dmxparse_out(path: &Path, summary: &DmxSummary) -> Result<(), DmxError> {
    let mut file = File::create(path)
        .map_err(|e| DmxError::io(format!("Failed to create '{}': {e}", path.display())))?;
    file.write_all(format_dmxparse_out(summary).as_bytes())
        .map_err(|e| DmxError::io(format!("Failed to write '{}': {e}", path.display())))?;
    Ok(())
}

/// Write TOAs as `mjd,freq` CSV.
pub fn write_toas_csv(path: &Path, toas: &[Toa]) -> Result<(), DmxError> {
    let file = File::create(path)
        .map_err(|e| DmxError::io(format!("Failed to create TOA CSV '{}': {e}", path.display())))?;
    let mut writer = BufWriter::new(file);

    writeln!(writer, "mjd,freq")
        .map_err(|e| DmxError::io(format!("Failed to write TOA CSV header: {e}")))?;
    for t in toas {
        writeln!(writer, "{:.10},{:.4}", t.mjd, t.freq_mhz)
            .map_err(|e| DmxError::io(format!("Failed to write TOA CSV row: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| DmxError::io(format!("Failed to flush TOA CSV: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::ingest::load_toas;

    fn summary() -> DmxSummary {
        DmxSummary {
            dmxs: vec![-1.5e-4, 1.5e-4],
            dmx_verrs: vec![Some(2.0e-5), None],
            dmxeps: vec![50005.0, 50035.0],
            r1s: vec![50000.0, 50030.0],
            r2s: vec![50010.0, 50040.0],
            bins: vec!["DMX_0001".into(), "DMX_0002".into()],
            mean_dmx: 2.5e-3,
            avg_dm_err: 1.0e-5,
            value_unit: "pc cm^-3".into(),
            epoch_unit: "d".into(),
        }
    }

    #[test]
    fn dmxparse_out_layout() {
        let text = format_dmxparse_out(&summary());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], "# Mean DMX value = +2.500000e-03 ");
        assert_eq!(lines[1], "# Uncertainty in average DM = 1.00000e-05 ");
        assert_eq!(
            lines[3],
            "50005.0000 -1.5000000e-04 2.000e-05 50000.0000 50010.0000 DMX_0001 "
        );
        assert_eq!(
            lines[4],
            "50035.0000 +1.5000000e-04 nan 50030.0000 50040.0000 DMX_0002 "
        );
    }

    #[test]
    fn toa_csv_round_trips_through_ingest() {
        let toas = vec![Toa::new(55000.125, 1400.0), Toa::new(55000.25, 430.0)];
        let path = std::env::temp_dir().join(format!("dmx_toas_{}.csv", std::process::id()));
        write_toas_csv(&path, &toas).unwrap();
        let back = load_toas(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(back.toas, toas);
    }
}
