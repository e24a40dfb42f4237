//! Read/write fitted-model JSON files.
//!
//! A fit file is the hand-off point with the external fitter:
//! - every model parameter (value, uncertainty, frozen flag, unit)
//! - optionally the fit covariance, labeled by parameter name
//!
//! The `dmx bins --export-model` command writes one with the freshly installed
//! bins; the fitter fills in values, uncertainties, and the covariance.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::DmxError;
use crate::math::LabeledMatrix;
use crate::model::{DmxModel, Parameter};

/// Row-major covariance with one label per row/column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CovarianceBlock {
    pub labels: Vec<String>,
    pub matrix: Vec<Vec<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitFile {
    pub tool: String,
    pub parameters: Vec<Parameter>,
    #[serde(default)]
    pub covariance: Option<CovarianceBlock>,
}

impl FitFile {
    pub fn from_model(model: &DmxModel, covariance: Option<&LabeledMatrix>) -> Self {
        Self {
            tool: "dmx".to_string(),
            parameters: model.params().cloned().collect(),
            covariance: covariance.map(|c| CovarianceBlock {
                labels: c.labels().to_vec(),
                matrix: c.to_rows(),
            }),
        }
    }

    pub fn model(&self) -> Result<DmxModel, DmxError> {
        DmxModel::from_params(self.parameters.iter().cloned())
    }

    pub fn covariance(&self) -> Result<Option<LabeledMatrix>, DmxError> {
        self.covariance
            .as_ref()
            .map(|c| LabeledMatrix::from_rows(c.labels.clone(), &c.matrix))
            .transpose()
    }
}

/// Write a fit file.
pub fn write_fit_json(path: &Path, fit: &FitFile) -> Result<(), DmxError> {
    let file = File::create(path)
        .map_err(|e| DmxError::io(format!("Failed to create fit JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(BufWriter::new(file), fit)
        .map_err(|e| DmxError::io(format!("Failed to write fit JSON: {e}")))?;
    Ok(())
}

/// Read a fit file.
pub fn read_fit_json(path: &Path) -> Result<FitFile, DmxError> {
    let file = File::open(path)
        .map_err(|e| DmxError::io(format!("Failed to open fit JSON '{}': {e}", path.display())))?;
    let fit: FitFile = serde_json::from_reader(file)
        .map_err(|e| DmxError::parse(format!("Invalid fit JSON: {e}")))?;
    Ok(fit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ParameterStore;

    #[test]
    fn parses_minimal_fit_json() {
        let json = r#"{
            "tool": "external",
            "parameters": [
                {"name": "DMX_0001", "value": 0.001, "uncertainty": 0.0002, "unit": "pc cm^-3"},
                {"name": "DMXR1_0001", "value": 50000.0, "frozen": true, "unit": "d"},
                {"name": "DMXR2_0001", "value": 50010.0, "frozen": true, "unit": "d"}
            ],
            "covariance": {"labels": ["DMX_0001"], "matrix": [[4e-8]]}
        }"#;
        let fit: FitFile = serde_json::from_str(json).unwrap();
        let model = fit.model().unwrap();
        let dmx = model.param("DMX_0001").unwrap();
        assert_eq!(dmx.uncertainty, Some(0.0002));
        assert!(!dmx.frozen);

        let cov = fit.covariance().unwrap().unwrap();
        assert_eq!(cov.get("DMX_0001", "DMX_0001"), Some(4e-8));
    }

    #[test]
    fn covariance_is_optional() {
        let json = r#"{"tool": "x", "parameters": []}"#;
        let fit: FitFile = serde_json::from_str(json).unwrap();
        assert!(fit.covariance().unwrap().is_none());
    }

    #[test]
    fn write_then_read() {
        let model = DmxModel::new();
        let mut fixed = model.clone();
        for name in ["DMXR1_0001", "DMXR2_0001"] {
            fixed.param_mut(name).unwrap().value = 50000.0;
        }
        let fit = FitFile::from_model(&fixed, None);
        let path = std::env::temp_dir().join(format!("dmx_fit_{}.json", std::process::id()));
        write_fit_json(&path, &fit).unwrap();
        let back = read_fit_json(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(back, fit);
    }
}
