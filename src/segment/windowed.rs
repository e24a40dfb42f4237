//! Fixed-width sequential binning.
//!
//! Walk the time-sorted TOAs with a cursor. Each window starts at the first TOA
//! after the cursor and spans `binwidth` days; a window becomes a bin only if
//! it holds TOAs on both sides of the divide frequency. The cursor always moves
//! to the last TOA of the window, so windows are disjoint and cover every TOA.

use tracing::debug;

use crate::domain::{Bin, SegmentConfig, Segmentation, Strategy, Toa, WINDOW_EPSILON_DAYS};
use crate::error::DmxError;
use crate::segment::{Segmenter, log_assignment};

#[derive(Debug, Clone, PartialEq)]
pub struct Windowed {
    pub divide_freq: f64,
    pub binwidth: f64,
}

impl Windowed {
    pub fn new(divide_freq: f64, binwidth: f64) -> Self {
        Self {
            divide_freq,
            binwidth,
        }
    }

    pub fn from_config(config: &SegmentConfig) -> Self {
        Self::new(config.divide_freq, config.binwidth)
    }
}

impl Segmenter for Windowed {
    fn strategy(&self) -> Strategy {
        Strategy::Windowed
    }

    fn segment(&self, toas: &[Toa]) -> Result<Segmentation, DmxError> {
        if !(self.binwidth.is_finite() && self.binwidth > 0.0) {
            return Err(DmxError::configuration(format!(
                "Invalid binwidth: {} (must be finite and > 0).",
                self.binwidth
            )));
        }

        let mut out = Segmentation::empty(Strategy::Windowed, 0.0);
        if toas.is_empty() {
            return Ok(out);
        }

        let mut sorted: Vec<Toa> = toas.iter().copied().filter(Toa::is_finite).collect();
        sorted.sort_by(|a, b| a.mjd.total_cmp(&b.mjd));

        let mut bins = Vec::new();
        if let Some(first) = sorted.first() {
            let mut prev_end = first.mjd - WINDOW_EPSILON_DAYS;
            let mut cursor = 0usize;

            loop {
                while cursor < sorted.len() && sorted[cursor].mjd <= prev_end {
                    cursor += 1;
                }
                if cursor == sorted.len() {
                    break;
                }

                let stop = sorted[cursor].mjd + self.binwidth;
                let end = cursor + sorted[cursor..].partition_point(|t| t.mjd <= stop);
                let batch = &sorted[cursor..end];

                let (low, high): (Vec<&Toa>, Vec<&Toa>) =
                    batch.iter().partition(|t| t.freq_mhz < self.divide_freq);

                if !low.is_empty() && !high.is_empty() {
                    let bin = Bin::new(
                        low.iter().map(|t| t.mjd).collect(),
                        high.iter().map(|t| t.mjd).collect(),
                        0.0,
                    );
                    debug!(min = bin.min, max = bin.max, n = batch.len(), "new DMX bin");
                    bins.push(bin);
                } else {
                    debug!(start = sorted[cursor].mjd, n = batch.len(), "discarding single-band window");
                    out.discarded.extend(batch.iter().map(|t| t.mjd));
                }

                prev_end = batch.iter().map(|t| t.mjd).fold(prev_end, f64::max);
                cursor = end;
            }
        }

        out.mask = toas
            .iter()
            .map(|t| bins.iter().any(|b| b.contains(t.mjd)))
            .collect();
        out.bins = bins;

        log_assignment(&out);
        Ok(out)
    }
}
