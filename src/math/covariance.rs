//! Label-addressed covariance matrices.
//!
//! Fit covariances are indexed by parameter name, never by raw position: once
//! frozen bins are dropped from the fit, the `k`-th row no longer corresponds
//! to bin `k`.
//!
//! Mean subtraction is the linear map
//!
//! ```text
//! M = I - J/n        (J = all-ones)
//! ```
//!
//! so the covariance of the mean-subtracted estimates is `M C Mᵀ`.

use nalgebra::DMatrix;

use crate::error::DmxError;

/// A square matrix with one label per row/column.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledMatrix {
    labels: Vec<String>,
    matrix: DMatrix<f64>,
}

impl LabeledMatrix {
    pub fn new(labels: Vec<String>, matrix: DMatrix<f64>) -> Result<Self, DmxError> {
        if !matrix.is_square() {
            return Err(DmxError::consistency(format!(
                "Covariance matrix must be square, got {}x{}.",
                matrix.nrows(),
                matrix.ncols()
            )));
        }
        if labels.len() != matrix.nrows() {
            return Err(DmxError::consistency(format!(
                "Covariance matrix has {} rows but {} labels.",
                matrix.nrows(),
                labels.len()
            )));
        }
        for (i, label) in labels.iter().enumerate() {
            if labels[..i].contains(label) {
                return Err(DmxError::consistency(format!(
                    "Duplicate covariance label {label}."
                )));
            }
        }
        Ok(Self { labels, matrix })
    }

    /// Build from row-major nested vectors (the JSON layout).
    pub fn from_rows(labels: Vec<String>, rows: &[Vec<f64>]) -> Result<Self, DmxError> {
        let n = rows.len();
        if rows.iter().any(|r| r.len() != n) {
            return Err(DmxError::consistency("Covariance rows must all have one entry per label."));
        }
        let flat: Vec<f64> = rows.iter().flatten().copied().collect();
        Self::new(labels, DMatrix::from_row_slice(n, n, &flat))
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == label)
    }

    pub fn get(&self, row: &str, col: &str) -> Option<f64> {
        Some(self.matrix[(self.index_of(row)?, self.index_of(col)?)])
    }

    /// Restrict to `names`, in the order given. Names not present are skipped.
    pub fn sub_matrix(&self, names: &[String]) -> LabeledMatrix {
        let picked: Vec<(String, usize)> = names
            .iter()
            .filter_map(|n| self.index_of(n).map(|i| (n.clone(), i)))
            .collect();
        let k = picked.len();
        let matrix = DMatrix::from_fn(k, k, |r, c| self.matrix[(picked[r].1, picked[c].1)]);
        LabeledMatrix {
            labels: picked.into_iter().map(|(n, _)| n).collect(),
            matrix,
        }
    }

    /// Sum of every entry (the variance of the sum of the estimates).
    pub fn total(&self) -> f64 {
        self.matrix.sum()
    }

    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        self.matrix
            .row_iter()
            .map(|r| r.iter().copied().collect())
            .collect()
    }
}

/// Source of a fit covariance, addressed by parameter name.
pub trait CovarianceProvider {
    /// Sub-matrix for `names`; the returned labels are the names actually
    /// present, in the requested order. `None` means no covariance exists.
    fn label_matrix(&self, names: &[String]) -> Option<LabeledMatrix>;
}

impl CovarianceProvider for LabeledMatrix {
    fn label_matrix(&self, names: &[String]) -> Option<LabeledMatrix> {
        Some(self.sub_matrix(names))
    }
}

/// `I - J/n`.
pub fn demean_projector(n: usize) -> DMatrix<f64> {
    if n == 0 {
        return DMatrix::zeros(0, 0);
    }
    let inv_n = 1.0 / n as f64;
    DMatrix::from_fn(n, n, |r, c| if r == c { 1.0 - inv_n } else { -inv_n })
}

/// Covariance of mean-subtracted estimates: `M C Mᵀ`.
pub fn demeaned_covariance(cov: &DMatrix<f64>) -> DMatrix<f64> {
    let m = demean_projector(cov.nrows());
    &m * cov * m.transpose()
}
