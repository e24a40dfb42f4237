//! Nearest-neighbor bin construction with orphan rescue.
//!
//! Given de-duplicated low- and high-band dates:
//!
//! 1. each low-band date claims the high-band dates within `max_diff` that are
//!    strictly closer to it than to its neighboring low-band dates
//! 2. a low-band date that claims something starts a new bin; otherwise it is
//!    an orphan
//! 3. each orphan joins the closest existing bin whose both edges lie within
//!    `max_diff`, if any
//!
//! Orphans that cannot join a bin and high-band dates nobody claimed are
//! dropped: a lone band cannot constrain a DM offset on its own.

use tracing::{debug, info};

use crate::domain::{
    Bin, LEGACY_PAD_DAYS, SegmentConfig, Segmentation, Strategy, TIME_ROUNDING_DAYS, Toa,
};
use crate::error::DmxError;
use crate::segment::{Segmenter, log_assignment};

#[derive(Debug, Clone, PartialEq)]
pub struct NearestNeighbor {
    pub divide_freq: f64,
    pub max_diff: f64,
    pub offset: f64,
}

impl NearestNeighbor {
    pub fn new(divide_freq: f64, max_diff: f64, offset: f64) -> Self {
        Self {
            divide_freq,
            max_diff,
            offset,
        }
    }

    pub fn from_config(config: &SegmentConfig) -> Self {
        Self::new(config.divide_freq, config.max_diff, config.offset)
    }
}

impl Segmenter for NearestNeighbor {
    fn strategy(&self) -> Strategy {
        Strategy::Nearest
    }

    fn segment(&self, toas: &[Toa]) -> Result<Segmentation, DmxError> {
        if !(self.max_diff.is_finite() && self.max_diff > 0.0) {
            return Err(DmxError::configuration(format!(
                "Invalid max_diff: {} (must be finite and > 0).",
                self.max_diff
            )));
        }

        let mut out = Segmentation::empty(Strategy::Nearest, self.offset);
        if toas.is_empty() {
            return Ok(out);
        }

        let lo = unique_rounded(toas.iter().filter(|t| t.freq_mhz < self.divide_freq));
        let hi = unique_rounded(toas.iter().filter(|t| t.freq_mhz > self.divide_freq));
        info!(
            "There are {} dates with freqs > {} MHz and {} dates with freqs < {} MHz",
            hi.len(),
            self.divide_freq,
            lo.len(),
            self.divide_freq
        );

        let (mut bins, claimed, orphans) = pair_dates(&lo, &hi, self.max_diff);
        out.unusable_low = rescue_orphans(&mut bins, &orphans, self.max_diff);
        out.unusable_high = hi
            .iter()
            .zip(claimed.iter())
            .filter(|&(_, &c)| !c)
            .map(|(&t, _)| t)
            .collect();

        out.mask = toas
            .iter()
            .map(|t| bins.iter().any(|b| b.contains_padded(t.mjd, self.offset)))
            .collect();
        out.bins = bins;

        log_assignment(&out);
        Ok(out)
    }
}

/// First pass: build one bin per low-band date that claims at least one
/// high-band date. Returns the bins, a claimed flag per high-band date, and the
/// orphaned low-band dates (ascending).
fn pair_dates(lo: &[f64], hi: &[f64], max_diff: f64) -> (Vec<Bin>, Vec<bool>, Vec<f64>) {
    let mut bins = Vec::new();
    let mut claimed = vec![false; hi.len()];
    let mut orphans = Vec::new();

    for (ii, &t_lo) in lo.iter().enumerate() {
        let start = hi.partition_point(|&h| t_lo - h >= max_diff);
        let end = hi.partition_point(|&h| h - t_lo < max_diff);

        let prev = ii.checked_sub(1).map(|p| lo[p]);
        let next = lo.get(ii + 1).copied();

        let survivors: Vec<usize> = (start..end.max(start))
            .filter(|&j| {
                let d = (hi[j] - t_lo).abs();
                d < max_diff
                    && prev.is_none_or(|p| d < (hi[j] - p).abs())
                    && next.is_none_or(|n| d < (hi[j] - n).abs())
            })
            .collect();

        if survivors.is_empty() {
            orphans.push(t_lo);
            continue;
        }

        for &j in &survivors {
            claimed[j] = true;
        }
        let bin = Bin::new(
            vec![t_lo],
            survivors.iter().map(|&j| hi[j]).collect(),
            LEGACY_PAD_DAYS,
        );
        debug!(lo = t_lo, n_hi = bin.high_times.len(), "new DMX bin");
        bins.push(bin);
    }

    (bins, claimed, orphans)
}

/// Second pass: attach orphans to the nearest bin whose edges are both within
/// `max_diff`. Ties go to the earliest bin. Returns the orphans left over.
fn rescue_orphans(bins: &mut [Bin], orphans: &[f64], max_diff: f64) -> Vec<f64> {
    let mut unsaved = Vec::new();

    for &orphan in orphans {
        let mut best = 2.0 * max_diff;
        let mut target = None;
        for (ii, bin) in bins.iter().enumerate() {
            let d_min = (orphan - bin.min).abs();
            let d_max = (orphan - bin.max).abs();
            if d_min < max_diff && d_max < max_diff {
                let d = d_min.min(d_max);
                if d < best {
                    best = d;
                    target = Some(ii);
                }
            }
        }

        match target {
            Some(ii) => {
                let bin = &mut bins[ii];
                let pos = bin.low_times.partition_point(|&t| t < orphan);
                bin.low_times.insert(pos, orphan);
                bin.recompute_extent();
                debug!(orphan, bin = ii + 1, "rescued low-frequency date");
            }
            None => unsaved.push(orphan),
        }
    }

    unsaved
}

/// Round dates to [`TIME_ROUNDING_DAYS`] (ties to even) and keep unique values.
fn unique_rounded<'a>(toas: impl Iterator<Item = &'a Toa>) -> Vec<f64> {
    let scale = 1.0 / TIME_ROUNDING_DAYS;
    let mut out: Vec<f64> = toas
        .filter(|t| t.is_finite())
        .map(|t| (t.mjd * scale).round_ties_even() / scale)
        .collect();
    out.sort_by(f64::total_cmp);
    out.dedup();
    out
}
