//! Shared "binning pipeline" logic.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! TOAs -> segmentation -> fresh model with the bins installed
//!
//! The CLI can then focus on presentation.

use rayon::prelude::*;

use crate::domain::{SegmentConfig, Segmentation, Toa};
use crate::error::DmxError;
use crate::model::{DmxModel, install_bins};
use crate::segment::segment;

/// All computed outputs of a single binning run.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub segmentation: Segmentation,
    pub model: DmxModel,
}

/// Segment `toas` and install the bins on a fresh model.
pub fn run_segmentation(toas: &[Toa], config: &SegmentConfig) -> Result<PipelineOutput, DmxError> {
    let segmentation = segment(toas, config)?;
    let mut model = DmxModel::new();
    install_bins(&mut model, &segmentation)?;
    Ok(PipelineOutput {
        segmentation,
        model,
    })
}

/// Run independent pipelines in parallel, one per dataset.
///
/// Results keep the order of `datasets`.
pub fn run_many(datasets: &[Vec<Toa>], config: &SegmentConfig) -> Vec<Result<PipelineOutput, DmxError>> {
    datasets
        .par_iter()
        .map(|toas| run_segmentation(toas, config))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Strategy;
    use crate::model::ParameterStore;

    fn pair(t: f64) -> [Toa; 2] {
        [Toa::new(t, 500.0), Toa::new(t + 0.05, 1500.0)]
    }

    #[test]
    fn installs_one_slot_per_bin() {
        let toas: Vec<Toa> = [0.0, 30.0, 60.0].into_iter().flat_map(pair).collect();
        let config = SegmentConfig {
            binwidth: 5.0,
            ..SegmentConfig::default()
        };
        let out = run_segmentation(&toas, &config).unwrap();
        assert_eq!(out.segmentation.bins.len(), 3);
        assert!(out.model.param("DMX_0003").is_some());
        assert!(out.model.param("DMX_0004").is_none());
        assert!(out.segmentation.mask.iter().all(|&m| m));
    }

    #[test]
    fn run_many_matches_sequential_runs() {
        let a: Vec<Toa> = [0.0, 30.0].into_iter().flat_map(pair).collect();
        let b: Vec<Toa> = vec![Toa::new(0.0, 500.0)];
        let config = SegmentConfig {
            strategy: Strategy::Nearest,
            ..SegmentConfig::default()
        };

        let results = run_many(&[a.clone(), b.clone()], &config);
        assert_eq!(results.len(), 2);
        let first = results[0].as_ref().unwrap();
        assert_eq!(
            first.segmentation,
            run_segmentation(&a, &config).unwrap().segmentation
        );
        let second = results[1].as_ref().unwrap();
        assert!(second.segmentation.bins.is_empty());
        assert_eq!(second.segmentation.mask, vec![false]);
    }
}
