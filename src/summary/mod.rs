//! Post-fit DMX summary (`dmxparse`).
//!
//! Given a fitted model, report each bin's offset relative to the mean over all
//! bins, with uncertainties corrected for that mean subtraction:
//!
//! - `mean = Σ DMX_i / N` over every bin (frozen or not)
//! - with a covariance `C` over the `n` fit bins:
//!   `σ_mean = sqrt(ΣC) / n` and `σ_i = sqrt((M C Mᵀ)_ii)`, `M = I - J/n`
//! - without one: `σ_i` is the raw fit uncertainty and `σ_mean` their mean
//!
//! Frozen bins have no row in `C`; their corrected uncertainty is `None`.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::DmxError;
use crate::io::export::write_dmxparse_out;
use crate::math::{CovarianceProvider, demeaned_covariance, mean, mean_present, weighted_mean};
use crate::model::{DmxEpoch, ParameterStore, dmx_epochs};

/// Fixed output name used by [`dmxparse`] when saving.
pub const DMXPARSE_OUT: &str = "dmxparse.out";

/// Mean-subtracted DMX values and their corrected uncertainties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DmxSummary {
    /// Bin values minus `mean_dmx`.
    pub dmxs: Vec<f64>,
    /// Corrected uncertainties; `None` for bins that were not fit.
    pub dmx_verrs: Vec<Option<f64>>,
    /// Bin center epochs, `(r1 + r2) / 2`.
    pub dmxeps: Vec<f64>,
    pub r1s: Vec<f64>,
    pub r2s: Vec<f64>,
    /// Parameter names (`DMX_0001`, ...).
    pub bins: Vec<String>,
    pub mean_dmx: f64,
    pub avg_dm_err: f64,
    /// Unit of the values and uncertainties.
    pub value_unit: String,
    /// Unit of the epochs and boundaries.
    pub epoch_unit: String,
}

impl DmxSummary {
    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// Inverse-variance weighted mean of the mean-subtracted values over the
    /// bins that have a positive corrected uncertainty.
    pub fn weighted_offset(&self) -> Option<(f64, f64)> {
        let (values, weights): (Vec<f64>, Vec<f64>) = self
            .dmxs
            .iter()
            .zip(&self.dmx_verrs)
            .filter_map(|(&v, e)| match e {
                Some(e) if e.is_finite() && *e > 0.0 => Some((v, 1.0 / (e * e))),
                _ => None,
            })
            .unzip();
        weighted_mean(&values, &weights)
    }
}

/// Summarize the DMX bins on `model`, optionally writing `dmxparse.out` to
/// the working directory.
pub fn dmxparse<M: ParameterStore + ?Sized>(
    model: &M,
    covariance: Option<&dyn CovarianceProvider>,
    save: bool,
) -> Result<DmxSummary, DmxError> {
    let summary = summarize(model, covariance)?;
    if save {
        write_dmxparse_out(Path::new(DMXPARSE_OUT), &summary)?;
    }
    Ok(summary)
}

/// Same as [`dmxparse`] with `save`, but writing to an explicit path.
pub fn dmxparse_to<M: ParameterStore + ?Sized>(
    model: &M,
    covariance: Option<&dyn CovarianceProvider>,
    path: &Path,
) -> Result<DmxSummary, DmxError> {
    let summary = summarize(model, covariance)?;
    write_dmxparse_out(path, &summary)?;
    Ok(summary)
}

struct BinRecord {
    epoch: DmxEpoch,
    value: f64,
    frozen: bool,
    uncertainty: Option<f64>,
    r1: f64,
    r2: f64,
}

/// Compute the summary without touching the filesystem.
pub fn summarize<M: ParameterStore + ?Sized>(
    model: &M,
    covariance: Option<&dyn CovarianceProvider>,
) -> Result<DmxSummary, DmxError> {
    let epochs = dmx_epochs(model);
    if epochs.is_empty() {
        return Err(DmxError::configuration("No DMX values in model!"));
    }

    let records = epochs
        .into_iter()
        .map(|epoch| collect_record(model, epoch))
        .collect::<Result<Vec<_>, _>>()?;

    let values: Vec<f64> = records.iter().map(|r| r.value).collect();
    let raw_errs: Vec<Option<f64>> = records.iter().map(|r| r.uncertainty).collect();
    let mean_dmx = mean(&values).unwrap_or(f64::NAN);

    // fit_to_full[k] = position in `records` of the k-th fit bin.
    let fit_to_full: Vec<usize> = records
        .iter()
        .enumerate()
        .filter(|(_, r)| !r.frozen)
        .map(|(i, _)| i)
        .collect();
    if fit_to_full.len() < records.len() {
        warn!("Some DMX bins were not fit for, masking these bins for computation.");
    }

    let (avg_dm_err, dmx_verrs) = match covariance {
        Some(provider) => corrected_errors(&records, &fit_to_full, provider)?,
        None => {
            warn!("Fitter does not have covariance matrix, returning values from model");
            (mean_present(&raw_errs).unwrap_or(f64::NAN), raw_errs.clone())
        }
    };

    if values.len() != raw_errs.len() || values.len() != dmx_verrs.len() {
        return Err(DmxError::consistency("Number of DMX entries do not match!"));
    }

    let value_unit = model
        .param(&records[0].epoch.value_name())
        .map(|p| p.unit.clone())
        .unwrap_or_default();
    let epoch_unit = model
        .param(&records[0].epoch.r1_name())
        .map(|p| p.unit.clone())
        .unwrap_or_default();

    Ok(DmxSummary {
        dmxs: values.iter().map(|v| v - mean_dmx).collect(),
        dmx_verrs,
        dmxeps: records.iter().map(|r| (r.r1 + r.r2) / 2.0).collect(),
        r1s: records.iter().map(|r| r.r1).collect(),
        r2s: records.iter().map(|r| r.r2).collect(),
        bins: records.iter().map(|r| r.epoch.value_name()).collect(),
        mean_dmx,
        avg_dm_err,
        value_unit,
        epoch_unit,
    })
}

fn collect_record<M: ParameterStore + ?Sized>(model: &M, epoch: DmxEpoch) -> Result<BinRecord, DmxError> {
    let missing = |name: String| DmxError::consistency(format!("Model is missing {name}."));

    let value = model
        .param(&epoch.value_name())
        .ok_or_else(|| missing(epoch.value_name()))?;
    let r1 = model.param(&epoch.r1_name()).ok_or_else(|| missing(epoch.r1_name()))?;
    let r2 = model.param(&epoch.r2_name()).ok_or_else(|| missing(epoch.r2_name()))?;

    Ok(BinRecord {
        value: value.value,
        frozen: value.frozen,
        uncertainty: value.uncertainty,
        r1: r1.value,
        r2: r2.value,
        epoch,
    })
}

/// Mean-subtraction corrected uncertainties from the fit covariance.
fn corrected_errors(
    records: &[BinRecord],
    fit_to_full: &[usize],
    provider: &dyn CovarianceProvider,
) -> Result<(f64, Vec<Option<f64>>), DmxError> {
    let mut names: Vec<String> = fit_to_full
        .iter()
        .map(|&i| records[i].epoch.value_name())
        .collect();
    names.sort();

    let Some(cov) = provider.label_matrix(&names) else {
        warn!("Fitter does not have covariance matrix, returning values from model");
        let raw: Vec<Option<f64>> = records.iter().map(|r| r.uncertainty).collect();
        return Ok((mean_present(&raw).unwrap_or(f64::NAN), raw));
    };

    if cov.labels() != names.as_slice() {
        let missing: Vec<&String> = names.iter().filter(|n| cov.index_of(n).is_none()).collect();
        return Err(DmxError::consistency(format!(
            "Covariance matrix is missing fit DMX parameters: {missing:?}"
        )));
    }

    let n = names.len();
    let mut out = vec![None; records.len()];
    if n == 0 {
        warn!("No DMX bins were fit; corrected uncertainties are undefined.");
        return Ok((f64::NAN, out));
    }

    let avg_dm_err = cov.total().sqrt() / n as f64;
    let corrected = demeaned_covariance(cov.matrix());

    for &full in fit_to_full {
        let row = cov.index_of(&records[full].epoch.value_name()).ok_or_else(|| {
            DmxError::consistency(format!(
                "Covariance matrix has no row for {}.",
                records[full].epoch.value_name()
            ))
        })?;
        out[full] = Some(corrected[(row, row)].sqrt());
    }

    Ok((avg_dm_err, out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::LabeledMatrix;
    use crate::model::{
        DMX_RANGE_UNIT, DMX_VALUE_UNIT, DmxModel, Parameter, dmx_name, dmxr1_name, dmxr2_name,
    };
    use nalgebra::DMatrix;

    fn fitted_model(values: &[f64], errs: &[f64], frozen: &[bool]) -> DmxModel {
        let mut params = Vec::new();
        for (i, (&v, (&e, &f))) in values.iter().zip(errs.iter().zip(frozen)).enumerate() {
            let idx = i + 1;
            let mut p = Parameter::new(dmx_name(idx), v, DMX_VALUE_UNIT, f);
            p.uncertainty = if f { None } else { Some(e) };
            params.push(p);
            let start = 50000.0 + 30.0 * i as f64;
            params.push(Parameter::new(dmxr1_name(idx), start, DMX_RANGE_UNIT, true));
            params.push(Parameter::new(dmxr2_name(idx), start + 10.0, DMX_RANGE_UNIT, true));
        }
        DmxModel::from_params(params).unwrap()
    }

    fn diag_cov(names: &[String], v: f64) -> LabeledMatrix {
        let n = names.len();
        LabeledMatrix::new(names.to_vec(), DMatrix::from_diagonal_element(n, n, v)).unwrap()
    }

    #[test]
    fn no_covariance_subtracts_mean_and_keeps_raw_errors() {
        let model = fitted_model(&[1.0, 2.0, 3.0, 4.0], &[0.1, 0.2, 0.3, 0.4], &[false; 4]);
        let s = summarize(&model, None).unwrap();
        assert_eq!(s.mean_dmx, 2.5);
        assert_eq!(s.dmxs, vec![-1.5, -0.5, 0.5, 1.5]);
        assert_eq!(s.dmx_verrs, vec![Some(0.1), Some(0.2), Some(0.3), Some(0.4)]);
        assert!((s.avg_dm_err - 0.25).abs() < 1e-12);
        assert_eq!(s.bins[0], "DMX_0001");
        assert_eq!(s.dmxeps[1], 50035.0);
        assert_eq!(s.value_unit, DMX_VALUE_UNIT);
        assert_eq!(s.epoch_unit, DMX_RANGE_UNIT);
    }

    #[test]
    fn empty_model_is_a_configuration_error() {
        let model = DmxModel::default();
        let err = summarize(&model, None).unwrap_err();
        assert_eq!(err, DmxError::configuration("No DMX values in model!"));
    }

    #[test]
    fn diagonal_covariance_correction() {
        let n = 5;
        let v = 4.0e-6;
        let model = fitted_model(&[0.1, 0.2, 0.3, 0.4, 0.5], &[2e-3; 5], &[false; 5]);
        let names: Vec<String> = (1..=n).map(dmx_name).collect();
        let cov = diag_cov(&names, v);

        let s = summarize(&model, Some(&cov)).unwrap();
        let expected = (v * (1.0 - 1.0 / n as f64)).sqrt();
        for e in &s.dmx_verrs {
            assert!((e.unwrap() - expected).abs() < 1e-15);
        }
        assert!((s.avg_dm_err - (n as f64 * v).sqrt() / n as f64).abs() < 1e-15);
        assert!(s.dmxs.iter().sum::<f64>().abs() < 1e-12);
    }

    #[test]
    fn correlated_covariance_uses_full_projection() {
        // Perfectly correlated pair: the difference from the mean has zero variance.
        let model = fitted_model(&[1.0, 3.0], &[1.0, 1.0], &[false, false]);
        let names = vec![dmx_name(1), dmx_name(2)];
        let cov = LabeledMatrix::from_rows(names, &[vec![1.0, 1.0], vec![1.0, 1.0]]).unwrap();
        let s = summarize(&model, Some(&cov)).unwrap();
        for e in &s.dmx_verrs {
            assert!(e.unwrap().abs() < 1e-12);
        }
        assert!((s.avg_dm_err - 1.0).abs() < 1e-12);
    }

    #[test]
    fn frozen_bins_get_placeholders() {
        let model = fitted_model(&[1.0, 2.0, 3.0, 6.0], &[0.1; 4], &[false, true, false, false]);
        let names = vec![dmx_name(1), dmx_name(3), dmx_name(4)];
        let cov = diag_cov(&names, 0.09);

        let s = summarize(&model, Some(&cov)).unwrap();
        assert_eq!(s.mean_dmx, 3.0);
        assert_eq!(s.dmx_verrs.len(), 4);
        assert!(s.dmx_verrs[1].is_none());
        let expected = (0.09f64 * (2.0 / 3.0)).sqrt();
        for i in [0, 2, 3] {
            assert!((s.dmx_verrs[i].unwrap() - expected).abs() < 1e-12);
        }
        assert!((s.avg_dm_err - (0.27f64).sqrt() / 3.0).abs() < 1e-12);
    }

    #[test]
    fn covariance_is_addressed_by_label() {
        // Extra parameters and a shuffled layout must not change the result.
        let model = fitted_model(&[1.0, 2.0], &[0.1, 0.1], &[false, false]);
        let cov = LabeledMatrix::from_rows(
            vec!["DMX_0002".into(), "F0".into(), "DMX_0001".into()],
            &[
                vec![4.0, 0.3, 0.0],
                vec![0.3, 7.0, 0.2],
                vec![0.0, 0.2, 1.0],
            ],
        )
        .unwrap();
        let s = summarize(&model, Some(&cov)).unwrap();
        // M C Mᵀ diagonal for C = diag(1, 4), n = 2: (1 + 4) / 4 each.
        assert!((s.dmx_verrs[0].unwrap() - 1.25f64.sqrt()).abs() < 1e-12);
        assert!((s.dmx_verrs[1].unwrap() - 1.25f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn covariance_missing_a_fit_bin_is_fatal() {
        let model = fitted_model(&[1.0, 2.0], &[0.1, 0.1], &[false, false]);
        let cov = diag_cov(&[dmx_name(1)], 1.0);
        assert!(matches!(summarize(&model, Some(&cov)), Err(DmxError::Consistency(_))));
    }

    #[test]
    fn summary_is_idempotent() {
        let model = fitted_model(&[0.5, -0.2, 0.9], &[0.1, 0.2, 0.3], &[false, false, true]);
        let cov = diag_cov(&[dmx_name(1), dmx_name(2)], 0.04);
        let a = summarize(&model, Some(&cov)).unwrap();
        let b = summarize(&model, Some(&cov)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn dmxparse_to_writes_file() {
        let model = fitted_model(&[1.0, 2.0], &[0.1, 0.1], &[false, false]);
        let path = std::env::temp_dir().join(format!("dmxparse_to_{}.out", std::process::id()));
        let s = dmxparse_to(&model, None, &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(text.lines().count(), 3 + s.len());
        assert!(text.starts_with("# Mean DMX value = +1.500000e+00"));
    }

    #[test]
    fn weighted_offset_skips_unfit_bins() {
        let model = fitted_model(&[1.0, 2.0, 3.0], &[1.0, 1.0, 1.0], &[false, true, false]);
        let s = summarize(&model, None).unwrap();
        let (m, _) = s.weighted_offset().unwrap();
        assert!(m.abs() < 1e-12);
    }
}
