//! Reporting utilities: per-bin TOA statistics (`dmxstats`) and formatted
//! terminal output.

use crate::domain::Toa;
use crate::error::DmxError;
use crate::model::{ParameterStore, dmx_epochs};

pub mod format;

pub use format::*;

/// TOA coverage of one installed DMX bin.
#[derive(Debug, Clone, PartialEq)]
pub struct BinStats {
    pub index: usize,
    pub ntoas: usize,
    /// Days between the first and last TOA in the bin.
    pub span: f64,
    pub freq_min: f64,
    pub freq_max: f64,
}

impl BinStats {
    pub fn line(&self) -> String {
        format!(
            "DMX_{:04}: NTOAS={:5}, MJDSpan={:14.4}, FreqSpan={:8.3}-{:8.3}",
            self.index, self.ntoas, self.span, self.freq_min, self.freq_max
        )
    }
}

/// Count the TOAs strictly inside each bin's `(DMXR1, DMXR2)` range.
///
/// Bins are visited in index order; an empty bin reports zeros.
pub fn dmxstats<M: ParameterStore + ?Sized>(model: &M, toas: &[Toa]) -> Result<Vec<BinStats>, DmxError> {
    let mut out = Vec::new();
    for epoch in dmx_epochs(model) {
        let r1 = range_value(model, &epoch.r1_name())?;
        let r2 = range_value(model, &epoch.r2_name())?;

        let inside: Vec<&Toa> = toas.iter().filter(|t| t.mjd > r1 && t.mjd < r2).collect();
        let stats = if inside.is_empty() {
            BinStats {
                index: epoch.index,
                ntoas: 0,
                span: 0.0,
                freq_min: 0.0,
                freq_max: 0.0,
            }
        } else {
            let (t_lo, t_hi) = extent(inside.iter().map(|t| t.mjd));
            let (f_lo, f_hi) = extent(inside.iter().map(|t| t.freq_mhz));
            BinStats {
                index: epoch.index,
                ntoas: inside.len(),
                span: t_hi - t_lo,
                freq_min: f_lo,
                freq_max: f_hi,
            }
        };
        out.push(stats);
    }
    Ok(out)
}

fn range_value<M: ParameterStore + ?Sized>(model: &M, name: &str) -> Result<f64, DmxError> {
    model
        .param(name)
        .map(|p| p.value)
        .ok_or_else(|| DmxError::consistency(format!("Missing DMX range parameter {name}.")))
}

fn extent(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)))
}
