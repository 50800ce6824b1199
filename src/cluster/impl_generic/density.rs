//! Generic log-density primitives: multivariate normal log-pdf and log-sum-exp.

use super::helpers::{cholesky_log_det, cholesky_lower, from_f64_slice, to_f64_vec};
use crate::cluster::error::{MixtureError, MixtureResult};
use crate::cluster::validation::{validate_cluster_dtype, validate_samples};
use numr::algorithm::linalg::LinearAlgebraAlgorithms;
use numr::ops::{
    CompareOps, ConditionalOps, LinalgOps, MatmulOps, ReduceOps, ScalarOps, ShapeOps, TensorOps,
    UnaryOps, UtilityOps,
};
use numr::runtime::{Runtime, RuntimeClient};
use numr::tensor::Tensor;

/// Trait bounds needed for the density primitives.
pub trait DensityClient<R: Runtime>:
    TensorOps<R>
    + ScalarOps<R>
    + ReduceOps<R>
    + UnaryOps<R>
    + CompareOps<R>
    + ConditionalOps<R>
    + MatmulOps<R>
    + LinalgOps<R>
    + LinearAlgebraAlgorithms<R>
    + ShapeOps<R>
    + UtilityOps<R>
    + RuntimeClient<R>
{
}

impl<R, C> DensityClient<R> for C
where
    R: Runtime,
    C: TensorOps<R>
        + ScalarOps<R>
        + ReduceOps<R>
        + UnaryOps<R>
        + CompareOps<R>
        + ConditionalOps<R>
        + MatmulOps<R>
        + LinalgOps<R>
        + LinearAlgebraAlgorithms<R>
        + ShapeOps<R>
        + UtilityOps<R>
        + RuntimeClient<R>,
{
}

/// Log-density of N(mean, covariance) at every column of `data` [d, n].
pub fn log_gauss_pdf_impl<R, C>(
    client: &C,
    data: &Tensor<R>,
    mean: &Tensor<R>,
    covariance: &Tensor<R>,
) -> MixtureResult<Tensor<R>>
where
    R: Runtime,
    C: DensityClient<R>,
{
    validate_cluster_dtype(data.dtype(), "log_gauss_pdf")?;
    let (d, _) = validate_samples(data.shape(), "log_gauss_pdf")?;
    if mean.shape() != [d] {
        return Err(MixtureError::ShapeMismatch {
            expected: vec![d],
            actual: mean.shape().to_vec(),
            context: "log_gauss_pdf mean".to_string(),
        });
    }
    if covariance.shape() != [d, d] {
        return Err(MixtureError::ShapeMismatch {
            expected: vec![d, d],
            actual: covariance.shape().to_vec(),
            context: "log_gauss_pdf covariance".to_string(),
        });
    }

    log_gauss_pdf_unchecked(client, data, mean, covariance, "log_gauss_pdf")
}

/// Log-density without shape validation. `context` names the caller in errors.
pub(crate) fn log_gauss_pdf_unchecked<R, C>(
    client: &C,
    data: &Tensor<R>,
    mean: &Tensor<R>,
    covariance: &Tensor<R>,
    context: &str,
) -> MixtureResult<Tensor<R>>
where
    R: Runtime,
    C: DensityClient<R>,
{
    let d = data.shape()[0];
    let n = data.shape()[1];
    let dtype = data.dtype();
    let device = data.device();

    // x - mu, mean broadcast across columns
    let mean_cols = mean.unsqueeze(1)?.broadcast_to(&[d, n])?;
    let centered = client.sub(data, &mean_cols)?; // [d, n]

    // Sigma = L L^T, factored on the host so NaN pivots are rejected
    let cov_host = to_f64_vec(covariance, "log_gauss_pdf")?;
    let lower = cholesky_lower(&cov_host, d, context)?;
    let log_det = cholesky_log_det(&lower, d);
    let lower_factor = from_f64_slice::<R>(&lower, &[d, d], dtype, device, "log_gauss_pdf")?;

    // Whitened coordinates [d, n]: L q = x - mu, forward substitution
    let whitened =
        LinearAlgebraAlgorithms::solve_triangular_lower(client, &lower_factor, &centered, false)?;
    let quad = client.sum(&client.mul(&whitened, &whitened)?, &[0], false)?; // [n]

    let norm = d as f64 * (2.0 * std::f64::consts::PI).ln() + log_det;
    let shifted = client.add_scalar(&quad, norm)?;
    Ok(client.mul_scalar(&shifted, -0.5)?)
}

/// `log(sum(exp(x)))` along `dim`, dropping `dim`.
pub fn logsumexp_impl<R, C>(client: &C, x: &Tensor<R>, dim: usize) -> MixtureResult<Tensor<R>>
where
    R: Runtime,
    C: DensityClient<R>,
{
    validate_cluster_dtype(x.dtype(), "logsumexp")?;
    let ndim = x.shape().len();
    if dim >= ndim {
        return Err(MixtureError::invalid(
            "dim",
            format!("logsumexp: dim {} out of range for {}-D input", dim, ndim),
        ));
    }

    let (_, lse) = softmax_and_logsumexp(client, x, dim)?;
    Ok(lse)
}

/// Normalized `exp(x)` along `dim` (same shape as `x`) and the log-sum-exp
/// with `dim` dropped, both from one max-shifted exponentiation.
///
/// Slices sum to 1 by construction. `dim` must be in range.
pub(crate) fn softmax_and_logsumexp<R, C>(
    client: &C,
    x: &Tensor<R>,
    dim: usize,
) -> MixtureResult<(Tensor<R>, Tensor<R>)>
where
    R: Runtime,
    C: DensityClient<R>,
{
    let shape = x.shape().to_vec();

    let max = client.max(x, &[dim], true)?; // keepdim
    let shifted = client.sub(x, &max.broadcast_to(&shape)?)?;
    let exp_shifted = client.exp(&shifted)?;
    let sum_exp = client.sum(&exp_shifted, &[dim], true)?;

    let softmax = client.div(&exp_shifted, &sum_exp.broadcast_to(&shape)?)?;
    let lse = client.add(&client.log(&sum_exp)?, &max)?;

    // An infinite max gives inf - inf = NaN above; such slices take the max.
    let inf = Tensor::<R>::full_scalar(max.shape(), x.dtype(), f64::INFINITY, x.device());
    let infinite_max = client.eq(&client.abs(&max)?, &inf)?;
    let lse = client.where_cond(&infinite_max, &max, &lse)?;

    Ok((softmax, lse.squeeze(Some(dim as isize))))
}
