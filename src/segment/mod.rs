//! DMX bin construction.
//!
//! Responsibilities:
//!
//! - split TOAs into low/high frequency bands
//! - group them into bins that contain both bands (two interchangeable strategies)
//! - report which TOAs landed in a bin and which dates were unusable

use tracing::{debug, info};

use crate::domain::{SegmentConfig, Segmentation, Strategy, Toa};
use crate::error::DmxError;

pub mod nearest;
pub mod windowed;

pub use nearest::*;
pub use windowed::*;

/// A bin-construction algorithm.
///
/// Implementations must return a mask aligned 1:1 with `toas` (input order),
/// and must never emit a bin missing either band.
pub trait Segmenter {
    fn strategy(&self) -> Strategy;

    fn segment(&self, toas: &[Toa]) -> Result<Segmentation, DmxError>;
}

/// Run the strategy selected in `config`.
pub fn segment(toas: &[Toa], config: &SegmentConfig) -> Result<Segmentation, DmxError> {
    config.validate()?;
    let segmenter: Box<dyn Segmenter> = match config.strategy {
        Strategy::Nearest => Box::new(NearestNeighbor::from_config(config)),
        Strategy::Windowed => Box::new(Windowed::from_config(config)),
    };
    debug!(strategy = segmenter.strategy().display_name(), toas = toas.len(), "segmenting");
    segmenter.segment(toas)
}

fn log_assignment(segmentation: &Segmentation) {
    info!(
        strategy = segmentation.strategy.display_name(),
        bins = segmentation.bins.len(),
        "{} out of {} TOAs are in a DMX bin",
        segmentation.assigned_count(),
        segmentation.mask.len()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_rejects_invalid_config() {
        let config = SegmentConfig {
            strategy: Strategy::Nearest,
            max_diff: f64::NAN,
            ..SegmentConfig::default()
        };
        let toas = [Toa::new(1.0, 500.0)];
        assert!(matches!(segment(&toas, &config), Err(DmxError::Configuration(_))));
    }

    #[test]
    fn dispatch_tags_strategy() {
        let toas = [Toa::new(1.0, 500.0), Toa::new(1.3, 1500.0)];
        for strategy in [Strategy::Nearest, Strategy::Windowed] {
            let config = SegmentConfig {
                strategy,
                ..SegmentConfig::default()
            };
            let seg = segment(&toas, &config).unwrap();
            assert_eq!(seg.strategy, strategy);
            assert_eq!(seg.bins.len(), 1);
            assert_eq!(seg.mask, vec![true, true]);
        }
    }

    #[test]
    fn segmenters_report_their_strategy() {
        let config = SegmentConfig::default();
        assert_eq!(NearestNeighbor::from_config(&config).strategy(), Strategy::Nearest);
        assert_eq!(Windowed::from_config(&config).strategy(), Strategy::Windowed);
    }

    #[test]
    fn empty_input_yields_no_bins() {
        for strategy in [Strategy::Nearest, Strategy::Windowed] {
            let config = SegmentConfig {
                strategy,
                ..SegmentConfig::default()
            };
            let seg = segment(&[], &config).unwrap();
            assert!(seg.is_empty());
            assert!(seg.mask.is_empty());
        }
    }
}
