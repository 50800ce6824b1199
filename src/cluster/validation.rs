//! Validation helpers for clustering and mixture algorithms.

use crate::cluster::error::{MixtureError, MixtureResult};
use crate::cluster::traits::emgm::EmgmOptions;
use numr::dtype::DType;
use numr::error::{Error, Result};

/// Validate point set dtype (must be F32 or F64).
pub fn validate_cluster_dtype(dtype: DType, op: &'static str) -> Result<()> {
    match dtype {
        DType::F32 | DType::F64 => Ok(()),
        _ => Err(Error::UnsupportedDType { dtype, op }),
    }
}

/// Validate that data is 2D [n, d].
pub fn validate_data_2d(shape: &[usize], op: &'static str) -> Result<()> {
    if shape.len() != 2 {
        return Err(Error::InvalidArgument {
            arg: "data",
            reason: format!("{op} requires 2D data [n, d], got {}-D", shape.len()),
        });
    }
    if shape[0] == 0 {
        return Err(Error::InvalidArgument {
            arg: "data",
            reason: format!("{op} requires at least 1 data point"),
        });
    }
    Ok(())
}

/// Validate n_clusters parameter.
pub fn validate_n_clusters(n_clusters: usize, n_points: usize, op: &'static str) -> Result<()> {
    if n_clusters == 0 {
        return Err(Error::InvalidArgument {
            arg: "n_clusters",
            reason: format!("{op} requires n_clusters > 0"),
        });
    }
    if n_clusters > n_points {
        return Err(Error::InvalidArgument {
            arg: "n_clusters",
            reason: format!("{op}: n_clusters={n_clusters} exceeds number of points {n_points}"),
        });
    }
    Ok(())
}

/// Validate column-major sample matrix [d, n] and return (d, n).
pub fn validate_samples(shape: &[usize], op: &str) -> MixtureResult<(usize, usize)> {
    if shape.len() != 2 {
        return Err(MixtureError::invalid(
            "data",
            format!("{op} requires 2D samples [d, n], got {}-D", shape.len()),
        ));
    }
    if shape[0] == 0 || shape[1] == 0 {
        return Err(MixtureError::invalid(
            "data",
            format!("{op} requires at least one dimension and one sample, got {shape:?}"),
        ));
    }
    Ok((shape[0], shape[1]))
}

/// Validate sample weights: length n, finite, non-negative, positive sum.
pub fn validate_weights(shape: &[usize], values: &[f64], n: usize, op: &str) -> MixtureResult<()> {
    if shape != [n] {
        return Err(MixtureError::ShapeMismatch {
            expected: vec![n],
            actual: shape.to_vec(),
            context: format!("{op} weights"),
        });
    }
    if let Some(bad) = values.iter().find(|w| !w.is_finite() || **w < 0.0) {
        return Err(MixtureError::invalid(
            "weights",
            format!("{op} requires finite non-negative weights, got {bad}"),
        ));
    }
    let total: f64 = values.iter().sum();
    if total <= 0.0 {
        return Err(MixtureError::invalid(
            "weights",
            format!("{op} requires weights with a positive sum"),
        ));
    }
    Ok(())
}

/// Validate responsibility matrix shape [n, k].
pub fn validate_responsibilities(shape: &[usize], n: usize, k: usize, op: &str) -> MixtureResult<()> {
    if shape != [n, k] {
        return Err(MixtureError::ShapeMismatch {
            expected: vec![n, k],
            actual: shape.to_vec(),
            context: format!("{op} responsibilities"),
        });
    }
    Ok(())
}

/// Validate EM options against the number of samples.
pub fn validate_emgm_options(options: &EmgmOptions, n_points: usize) -> MixtureResult<()> {
    if options.n_components == 0 {
        return Err(MixtureError::invalid(
            "n_components",
            "emgm requires n_components > 0",
        ));
    }
    if options.n_components > n_points {
        return Err(MixtureError::invalid(
            "n_components",
            format!(
                "emgm: n_components={} exceeds number of samples {}",
                options.n_components, n_points
            ),
        ));
    }
    if options.max_iter == 0 {
        return Err(MixtureError::invalid("max_iter", "emgm requires max_iter > 0"));
    }
    if options.init_iter == 0 {
        return Err(MixtureError::invalid("init_iter", "emgm requires init_iter > 0"));
    }
    if !options.tol.is_finite() || options.tol < 0.0 {
        return Err(MixtureError::invalid(
            "tol",
            format!("emgm requires finite tol >= 0, got {}", options.tol),
        ));
    }
    if !options.reg_covar.is_finite() || options.reg_covar < 0.0 {
        return Err(MixtureError::invalid(
            "reg_covar",
            format!("emgm requires finite reg_covar >= 0, got {}", options.reg_covar),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_cluster_dtype() {
        assert!(validate_cluster_dtype(DType::F32, "test").is_ok());
        assert!(validate_cluster_dtype(DType::F64, "test").is_ok());
        assert!(validate_cluster_dtype(DType::I32, "test").is_err());
    }

    #[test]
    fn test_validate_data_2d() {
        assert!(validate_data_2d(&[10, 3], "test").is_ok());
        assert!(validate_data_2d(&[10], "test").is_err());
        assert!(validate_data_2d(&[0, 3], "test").is_err());
    }

    #[test]
    fn test_validate_n_clusters() {
        assert!(validate_n_clusters(3, 100, "test").is_ok());
        assert!(validate_n_clusters(0, 100, "test").is_err());
        assert!(validate_n_clusters(101, 100, "test").is_err());
    }

    #[test]
    fn test_validate_samples() {
        assert_eq!(validate_samples(&[2, 50], "test").unwrap(), (2, 50));
        assert!(validate_samples(&[50], "test").is_err());
        assert!(validate_samples(&[2, 0], "test").is_err());
    }

    #[test]
    fn test_validate_weights() {
        assert!(validate_weights(&[3], &[1.0, 0.0, 2.0], 3, "test").is_ok());
        assert!(matches!(
            validate_weights(&[2], &[1.0, 1.0], 3, "test"),
            Err(MixtureError::ShapeMismatch { .. })
        ));
        assert!(validate_weights(&[3], &[1.0, -1.0, 2.0], 3, "test").is_err());
        assert!(validate_weights(&[3], &[1.0, f64::NAN, 2.0], 3, "test").is_err());
        assert!(validate_weights(&[2], &[0.0, 0.0], 2, "test").is_err());
    }

    #[test]
    fn test_validate_emgm_options() {
        let options = EmgmOptions {
            n_components: 2,
            ..Default::default()
        };
        assert!(validate_emgm_options(&options, 10).is_ok());
        assert!(validate_emgm_options(&options, 1).is_err());

        let zero = EmgmOptions {
            n_components: 0,
            ..Default::default()
        };
        assert!(validate_emgm_options(&zero, 10).is_err());

        let bad_tol = EmgmOptions {
            n_components: 2,
            tol: -1.0,
            ..Default::default()
        };
        assert!(validate_emgm_options(&bad_tol, 10).is_err());

        let no_iter = EmgmOptions {
            n_components: 2,
            max_iter: 0,
            ..Default::default()
        };
        assert!(validate_emgm_options(&no_iter, 10).is_err());
    }
}
