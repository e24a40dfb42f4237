//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during segmentation
//! - exported to JSON/CSV
//! - handed to an external fitter and read back afterwards

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::DmxError;

/// Pad (days) applied on both sides of a nearest-neighbor bin's extent.
pub const LEGACY_PAD_DAYS: f64 = 0.001;

/// Resolution (days) used to collapse near-duplicate TOA dates before pairing.
pub const TIME_ROUNDING_DAYS: f64 = 0.1;

/// Offset (days) subtracted from the first TOA to seed the windowed cursor.
pub const WINDOW_EPSILON_DAYS: f64 = 0.001;

/// A single time-of-arrival observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Toa {
    /// Arrival time as a Modified Julian Date (days).
    pub mjd: f64,
    /// Observing frequency (MHz).
    pub freq_mhz: f64,
}

impl Toa {
    pub fn new(mjd: f64, freq_mhz: f64) -> Self {
        Self { mjd, freq_mhz }
    }

    pub fn is_finite(&self) -> bool {
        self.mjd.is_finite() && self.freq_mhz.is_finite()
    }
}

/// Which bin-construction algorithm to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Pair each low-band date with nearby high-band dates, then rescue orphans.
    Nearest,
    /// Fixed-width sequential windows over the sorted TOAs.
    Windowed,
}

impl Strategy {
    pub fn display_name(self) -> &'static str {
        match self {
            Strategy::Nearest => "nearest-neighbor",
            Strategy::Windowed => "windowed",
        }
    }
}

/// One DMX time segment.
///
/// `min`/`max` are derived from the member times widened by `pad`; call
/// [`Bin::recompute_extent`] after mutating either time list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bin {
    pub low_times: Vec<f64>,
    pub high_times: Vec<f64>,
    pub min: f64,
    pub max: f64,
    pub pad: f64,
}

impl Bin {
    pub fn new(low_times: Vec<f64>, high_times: Vec<f64>, pad: f64) -> Self {
        let mut bin = Self {
            low_times,
            high_times,
            min: f64::NAN,
            max: f64::NAN,
            pad,
        };
        bin.recompute_extent();
        bin
    }

    /// Reset `min`/`max` from the current member times.
    ///
    /// A bin with no member times gets a NaN extent.
    pub fn recompute_extent(&mut self) {
        let times = self.low_times.iter().chain(self.high_times.iter());
        let (lo, hi) = times.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &t| {
            (lo.min(t), hi.max(t))
        });
        if lo.is_finite() && hi.is_finite() {
            self.min = lo - self.pad;
            self.max = hi + self.pad;
        } else {
            self.min = f64::NAN;
            self.max = f64::NAN;
        }
    }

    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    pub fn has_both_bands(&self) -> bool {
        !self.low_times.is_empty() && !self.high_times.is_empty()
    }

    /// `min - offset < t < max + offset`
    pub fn contains_padded(&self, t: f64, offset: f64) -> bool {
        t > self.min - offset && t < self.max + offset
    }

    /// `min <= t <= max`
    pub fn contains(&self, t: f64) -> bool {
        t >= self.min && t <= self.max
    }

    /// One-line summary: extent, span, and member counts per band.
    pub fn sum_line(&self) -> String {
        format!(
            "{:8.2}-{:8.2} ({:8.2}): NLO={:5} NHI={:5}",
            self.min,
            self.max,
            self.span(),
            self.low_times.len(),
            self.high_times.len()
        )
    }
}

/// Settings for a segmentation run.
///
/// Not every field applies to every strategy: `max_diff`/`offset` drive the
/// nearest-neighbor algorithm, `binwidth` drives the windowed one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentConfig {
    pub strategy: Strategy,
    /// TOAs below this frequency (MHz) are low band.
    pub divide_freq: f64,
    /// Maximum low/high pairing distance (days).
    pub max_diff: f64,
    /// Padding (days) added to each nearest-neighbor bin when masking and installing.
    pub offset: f64,
    /// Window width (days) for the windowed strategy.
    pub binwidth: f64,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::Windowed,
            divide_freq: 1000.0,
            max_diff: 15.0,
            offset: 0.01,
            binwidth: 15.0,
        }
    }
}

impl SegmentConfig {
    pub fn validate(&self) -> Result<(), DmxError> {
        if !self.divide_freq.is_finite() {
            return Err(DmxError::configuration(format!(
                "Invalid divide frequency: {} (must be finite).",
                self.divide_freq
            )));
        }
        match self.strategy {
            Strategy::Nearest => {
                if !(self.max_diff.is_finite() && self.max_diff > 0.0) {
                    return Err(DmxError::configuration(format!(
                        "Invalid max_diff: {} (must be finite and > 0).",
                        self.max_diff
                    )));
                }
                if !(self.offset.is_finite() && self.offset >= 0.0) {
                    return Err(DmxError::configuration(format!(
                        "Invalid offset: {} (must be finite and >= 0).",
                        self.offset
                    )));
                }
            }
            Strategy::Windowed => {
                if !(self.binwidth.is_finite() && self.binwidth > 0.0) {
                    return Err(DmxError::configuration(format!(
                        "Invalid binwidth: {} (must be finite and > 0).",
                        self.binwidth
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Output of a segmentation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segmentation {
    pub strategy: Strategy,
    /// Accepted bins, in creation order.
    pub bins: Vec<Bin>,
    /// `mask[i]` is true iff input TOA `i` falls inside an accepted bin.
    pub mask: Vec<bool>,
    /// Low-band dates that could neither be paired nor rescued.
    pub unusable_low: Vec<f64>,
    /// High-band dates never claimed by a low-band date.
    pub unusable_high: Vec<f64>,
    /// TOA times from windows lacking one of the two bands.
    pub discarded: Vec<f64>,
    /// Padding applied to each bin's extent when masking and installing.
    pub offset: f64,
}

impl Segmentation {
    pub fn empty(strategy: Strategy, offset: f64) -> Self {
        Self {
            strategy,
            bins: Vec::new(),
            mask: Vec::new(),
            unusable_low: Vec::new(),
            unusable_high: Vec::new(),
            discarded: Vec::new(),
            offset,
        }
    }

    /// `(range_start, range_end)` per bin, as installed on a model.
    pub fn boundaries(&self) -> Vec<(f64, f64)> {
        self.bins
            .iter()
            .map(|b| (b.min - self.offset, b.max + self.offset))
            .collect()
    }

    pub fn assigned_count(&self) -> usize {
        self.mask.iter().filter(|&&m| m).count()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }
}
