//! Small descriptive statistics over `f64` slices.

/// Arithmetic mean; `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Mean of the present entries; `None` if every entry is missing.
pub fn mean_present(values: &[Option<f64>]) -> Option<f64> {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    mean(&present)
}

/// Weighted mean of `values`.
///
/// With `weights = 1/σ²` the returned error is `1/sqrt(Σw)`. Returns `None`
/// when the weights do not sum to a positive finite value or the lengths differ.
pub fn weighted_mean(values: &[f64], weights: &[f64]) -> Option<(f64, f64)> {
    if values.len() != weights.len() || values.is_empty() {
        return None;
    }
    let wtot: f64 = weights.iter().sum();
    if !(wtot.is_finite() && wtot > 0.0) {
        return None;
    }
    let wmean = values.iter().zip(weights).map(|(x, w)| x * w).sum::<f64>() / wtot;
    Some((wmean, 1.0 / wtot.sqrt()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_of_empty_is_none() {
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[1.0, 2.0, 3.0, 4.0]), Some(2.5));
    }

    #[test]
    fn mean_present_skips_missing() {
        assert_eq!(mean_present(&[Some(1.0), None, Some(3.0)]), Some(2.0));
        assert_eq!(mean_present(&[None, None]), None);
    }

    #[test]
    fn weighted_mean_with_inverse_variance_weights() {
        // Two measurements with sigma = 1 and sigma = 2.
        let (m, e) = weighted_mean(&[10.0, 20.0], &[1.0, 0.25]).unwrap();
        assert!((m - 12.0).abs() < 1e-12);
        assert!((e - 1.0 / 1.25f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn weighted_mean_rejects_degenerate_weights() {
        assert!(weighted_mean(&[1.0], &[0.0]).is_none());
        assert!(weighted_mean(&[1.0, 2.0], &[1.0]).is_none());
        assert!(weighted_mean(&[], &[]).is_none());
    }
}
