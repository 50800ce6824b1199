//! Host-side helpers for small dense blocks.
//!
//! Covariances are d x d, so they are factored on the host after a single
//! transfer. Everything sized by the number of samples stays on device.

use crate::cluster::error::{MixtureError, MixtureResult};
use numr::dtype::DType;
use numr::error::Error;
use numr::runtime::Runtime;
use numr::tensor::Tensor;

/// Copy a floating-point tensor to the host as `f64`.
pub fn to_f64_vec<R: Runtime>(tensor: &Tensor<R>, op: &'static str) -> MixtureResult<Vec<f64>> {
    let tensor = tensor.contiguous();
    match tensor.dtype() {
        DType::F64 => {
            let values: Vec<f64> = tensor.to_vec();
            Ok(values)
        }
        DType::F32 => {
            let values: Vec<f32> = tensor.to_vec();
            Ok(values.into_iter().map(f64::from).collect())
        }
        dtype => Err(Error::UnsupportedDType { dtype, op }.into()),
    }
}

/// Build a tensor of `dtype` from host `f64` values.
pub fn from_f64_slice<R: Runtime>(
    values: &[f64],
    shape: &[usize],
    dtype: DType,
    device: &R::Device,
    op: &'static str,
) -> MixtureResult<Tensor<R>> {
    match dtype {
        DType::F64 => Ok(Tensor::<R>::from_slice(values, shape, device)),
        DType::F32 => {
            let narrowed: Vec<f32> = values.iter().map(|&v| v as f32).collect();
            Ok(Tensor::<R>::from_slice(&narrowed, shape, device))
        }
        dtype => Err(Error::UnsupportedDType { dtype, op }.into()),
    }
}

/// Cholesky factorization `A = L L^T` of a row-major d x d matrix.
///
/// Only the lower triangle of `a` is read. Returns row-major `L` with zeros
/// above the diagonal. A non-positive or non-finite pivot is an error.
pub fn cholesky_lower(a: &[f64], d: usize, context: &str) -> MixtureResult<Vec<f64>> {
    debug_assert_eq!(a.len(), d * d);
    let mut l = vec![0.0; d * d];

    for j in 0..d {
        let mut pivot = a[j * d + j];
        for p in 0..j {
            pivot -= l[j * d + p] * l[j * d + p];
        }
        if !pivot.is_finite() || pivot <= 0.0 {
            return Err(MixtureError::NotPositiveDefinite {
                context: context.to_string(),
                pivot: j,
                value: pivot,
            });
        }
        let diag = pivot.sqrt();
        l[j * d + j] = diag;

        for i in (j + 1)..d {
            let mut s = a[i * d + j];
            for p in 0..j {
                s -= l[i * d + p] * l[j * d + p];
            }
            l[i * d + j] = s / diag;
        }
    }

    Ok(l)
}

/// `2 * sum(log(diag(L)))`, the log-determinant of `L L^T`.
pub fn cholesky_log_det(l: &[f64], d: usize) -> f64 {
    2.0 * (0..d).map(|i| l[i * d + i].ln()).sum::<f64>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cholesky_known_factor() {
        // [[4, 2], [2, 3]] = L L^T with L = [[2, 0], [1, sqrt(2)]]
        let a = [4.0, 2.0, 2.0, 3.0];
        let l = cholesky_lower(&a, 2, "test").unwrap();
        assert!((l[0] - 2.0).abs() < 1e-12);
        assert_eq!(l[1], 0.0);
        assert!((l[2] - 1.0).abs() < 1e-12);
        assert!((l[3] - 2.0_f64.sqrt()).abs() < 1e-12);

        let log_det = cholesky_log_det(&l, 2);
        assert!((log_det - 8.0_f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn test_cholesky_rejects_indefinite() {
        let a = [1.0, 2.0, 2.0, 1.0];
        match cholesky_lower(&a, 2, "test") {
            Err(MixtureError::NotPositiveDefinite { pivot, .. }) => assert_eq!(pivot, 1),
            other => panic!("expected NotPositiveDefinite, got {:?}", other),
        }
    }

    #[test]
    fn test_cholesky_rejects_nan() {
        let a = [f64::NAN, 0.0, 0.0, 1.0];
        assert!(matches!(
            cholesky_lower(&a, 2, "test"),
            Err(MixtureError::NotPositiveDefinite { pivot: 0, .. })
        ));
    }
}
