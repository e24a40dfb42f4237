//! Synthetic dual-band observing campaigns.
//!
//! Each session observes a low band and, a short gap later, a high band. Some
//! sessions lose one band entirely, which is what produces unusable dates for
//! the segmenters to report.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::Toa;
use crate::error::DmxError;

/// Receiver center frequencies (MHz) used for generated TOAs.
const LOW_BAND_FREQS: [f64; 2] = [430.0, 820.0];
const HIGH_BAND_FREQS: [f64; 2] = [1400.0, 2100.0];

/// Frequency scatter (MHz) across channels within one receiver.
const CHANNEL_SPREAD_MHZ: f64 = 25.0;

#[derive(Debug, Clone, PartialEq)]
pub struct CampaignConfig {
    pub sessions: usize,
    /// Days between consecutive sessions.
    pub cadence: f64,
    pub start_mjd: f64,
    /// Maximum days between the low- and high-band visits of one session.
    pub band_gap: f64,
    /// TOAs per band per session.
    pub toas_per_band: usize,
    /// Standard deviation (days) of the session start jitter.
    pub jitter: f64,
    /// Probability that a session loses one of its two bands.
    pub drop_prob: f64,
    pub seed: u64,
}

impl Default for CampaignConfig {
    fn default() -> Self {
        Self {
            sessions: 24,
            cadence: 30.0,
            start_mjd: 55000.0,
            band_gap: 3.0,
            toas_per_band: 4,
            jitter: 1.0,
            drop_prob: 0.1,
            seed: 42,
        }
    }
}

/// Generate a campaign's TOAs, sorted by time.
pub fn generate_campaign(config: &CampaignConfig) -> Result<Vec<Toa>, DmxError> {
    if config.sessions == 0 || config.toas_per_band == 0 {
        return Err(DmxError::configuration("Sessions and TOAs per band must be > 0."));
    }
    if !(config.cadence.is_finite() && config.cadence > 0.0) {
        return Err(DmxError::configuration("Cadence must be finite and > 0."));
    }
    if !(config.band_gap.is_finite() && config.band_gap >= 0.0)
        || !(config.jitter.is_finite() && config.jitter >= 0.0)
    {
        return Err(DmxError::configuration("Band gap and jitter must be finite and >= 0."));
    }
    if !(0.0..1.0).contains(&config.drop_prob) {
        return Err(DmxError::configuration("Drop probability must be in [0, 1)."));
    }
    if !config.start_mjd.is_finite() {
        return Err(DmxError::configuration("Start MJD must be finite."));
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let jitter = Normal::new(0.0, config.jitter)
        .map_err(|e| DmxError::configuration(format!("Jitter distribution error: {e}")))?;
    let channel = Normal::new(0.0, CHANNEL_SPREAD_MHZ)
        .map_err(|e| DmxError::configuration(format!("Channel distribution error: {e}")))?;

    let mut toas = Vec::with_capacity(config.sessions * config.toas_per_band * 2);
    for s in 0..config.sessions {
        let start = config.start_mjd + s as f64 * config.cadence + jitter.sample(&mut rng);

        let (keep_low, keep_high) = if rng.gen_bool(config.drop_prob) {
            // Lose exactly one band.
            if rng.gen_bool(0.5) { (true, false) } else { (false, true) }
        } else {
            (true, true)
        };

        if keep_low {
            let freq = LOW_BAND_FREQS[rng.gen_range(0..LOW_BAND_FREQS.len())];
            push_visit(&mut toas, &mut rng, &channel, start, freq, config.toas_per_band);
        }
        if keep_high {
            let visit = start + rng.gen_range(0.0..=config.band_gap);
            let freq = HIGH_BAND_FREQS[rng.gen_range(0..HIGH_BAND_FREQS.len())];
            push_visit(&mut toas, &mut rng, &channel, visit, freq, config.toas_per_band);
        }
    }

    toas.sort_by(|a, b| a.mjd.total_cmp(&b.mjd));
    Ok(toas)
}

/// One receiver visit: `n` TOAs a few minutes apart.
fn push_visit(
    toas: &mut Vec<Toa>,
    rng: &mut StdRng,
    channel: &Normal<f64>,
    start: f64,
    center_freq: f64,
    n: usize,
) {
    const TOA_SPACING_DAYS: f64 = 5.0 / 1440.0;
    for i in 0..n {
        let freq = (center_freq + channel.sample(rng)).max(1.0);
        toas.push(Toa::new(start + i as f64 * TOA_SPACING_DAYS, freq));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_campaign() {
        let config = CampaignConfig::default();
        let a = generate_campaign(&config).unwrap();
        let b = generate_campaign(&config).unwrap();
        assert_eq!(a, b);

        let other = generate_campaign(&CampaignConfig { seed: 7, ..config }).unwrap();
        assert_ne!(a, other);
    }

    #[test]
    fn no_drops_gives_both_bands_every_session() {
        let config = CampaignConfig {
            sessions: 10,
            drop_prob: 0.0,
            ..CampaignConfig::default()
        };
        let toas = generate_campaign(&config).unwrap();
        assert_eq!(toas.len(), 10 * config.toas_per_band * 2);
        assert!(toas.windows(2).all(|w| w[0].mjd <= w[1].mjd));

        let low = toas.iter().filter(|t| t.freq_mhz < 1000.0).count();
        assert_eq!(low, 10 * config.toas_per_band);
    }

    #[test]
    fn rejects_bad_settings() {
        let bad = CampaignConfig {
            drop_prob: 1.0,
            ..CampaignConfig::default()
        };
        assert!(generate_campaign(&bad).is_err());
        let bad = CampaignConfig {
            sessions: 0,
            ..CampaignConfig::default()
        };
        assert!(generate_campaign(&bad).is_err());
    }
}
