//! Generic weighted Gaussian mixture fitting via soft EM.
//!
//! K-Means labels seed the responsibilities, then the loop alternates
//! M-step and E-step until the relative change of the weighted
//! log-likelihood drops below `tol` or `max_iter` is reached.

use super::density::{DensityClient, log_gauss_pdf_unchecked, softmax_and_logsumexp};
use super::helpers::to_f64_vec;
use super::kmeans::{KMeansClient, kmeans_impl};
use crate::cluster::error::{MixtureError, MixtureResult};
use crate::cluster::traits::emgm::{
    EmgmModel, EmgmOptions, EmptyComponentPolicy, ExpectationResult, FitStatus, MixtureParams,
};
use crate::cluster::traits::kmeans::{KMeansInit, KMeansOptions};
use crate::cluster::validation::{
    validate_cluster_dtype, validate_emgm_options, validate_responsibilities, validate_samples,
    validate_weights,
};
use numr::dtype::DType;
use numr::ops::LinalgOps;
use numr::runtime::Runtime;
use numr::tensor::Tensor;

/// Trait bounds needed for EM mixture fitting.
pub trait EmgmClient<R: Runtime>: KMeansClient<R> + DensityClient<R> {}

impl<R, C> EmgmClient<R> for C
where
    R: Runtime,
    C: KMeansClient<R> + DensityClient<R>,
{
}

/// Fit a mixture starting from K-Means responsibilities.
pub fn emgm_fit_impl<R, C>(
    client: &C,
    data: &Tensor<R>,
    weights: &Tensor<R>,
    options: &EmgmOptions,
) -> MixtureResult<EmgmModel<R>>
where
    R: Runtime,
    C: EmgmClient<R>,
{
    let weight_total = validate_fit_inputs(data, weights, options, "emgm_fit")?;
    let resp = initial_responsibilities(client, data, options)?;
    run_em(client, data, weights, resp, options, weight_total)
}

/// Fit a mixture starting from caller-supplied responsibilities [n, k].
pub fn emgm_fit_from_impl<R, C>(
    client: &C,
    data: &Tensor<R>,
    weights: &Tensor<R>,
    responsibilities: &Tensor<R>,
    options: &EmgmOptions,
) -> MixtureResult<EmgmModel<R>>
where
    R: Runtime,
    C: EmgmClient<R>,
{
    let weight_total = validate_fit_inputs(data, weights, options, "emgm_fit_from")?;
    let n = data.shape()[1];
    validate_responsibilities(
        responsibilities.shape(),
        n,
        options.n_components,
        "emgm_fit_from",
    )?;
    if responsibilities.dtype() != data.dtype() {
        return Err(MixtureError::invalid(
            "responsibilities",
            format!(
                "emgm_fit_from: responsibilities dtype {:?} differs from data dtype {:?}",
                responsibilities.dtype(),
                data.dtype()
            ),
        ));
    }
    run_em(
        client,
        data,
        weights,
        responsibilities.clone(),
        options,
        weight_total,
    )
}

/// One-hot responsibilities [n, k] from K-Means labels.
pub fn emgm_initialize_impl<R, C>(
    client: &C,
    data: &Tensor<R>,
    options: &EmgmOptions,
) -> MixtureResult<Tensor<R>>
where
    R: Runtime,
    C: EmgmClient<R>,
{
    validate_cluster_dtype(data.dtype(), "emgm_initialize")?;
    let (_, n) = validate_samples(data.shape(), "emgm_initialize")?;
    validate_emgm_options(options, n)?;
    initial_responsibilities(client, data, options)
}

/// E-step with full input validation.
pub fn emgm_expectation_impl<R, C>(
    client: &C,
    data: &Tensor<R>,
    weights: &Tensor<R>,
    params: &MixtureParams<R>,
) -> MixtureResult<ExpectationResult<R>>
where
    R: Runtime,
    C: EmgmClient<R>,
{
    validate_cluster_dtype(data.dtype(), "emgm_expectation")?;
    let (d, n) = validate_samples(data.shape(), "emgm_expectation")?;
    let weight_total = checked_weight_total(weights, n, "emgm_expectation")?;
    validate_params(params, d, "emgm_expectation")?;
    expectation_step(client, data, weights, params, weight_total)
}

/// M-step with full input validation.
pub fn emgm_maximization_impl<R, C>(
    client: &C,
    data: &Tensor<R>,
    weights: &Tensor<R>,
    responsibilities: &Tensor<R>,
    options: &EmgmOptions,
) -> MixtureResult<MixtureParams<R>>
where
    R: Runtime,
    C: EmgmClient<R>,
{
    validate_cluster_dtype(data.dtype(), "emgm_maximization")?;
    let (_, n) = validate_samples(data.shape(), "emgm_maximization")?;
    validate_emgm_options(options, n)?;
    let weight_total = checked_weight_total(weights, n, "emgm_maximization")?;
    validate_responsibilities(
        responsibilities.shape(),
        n,
        options.n_components,
        "emgm_maximization",
    )?;
    maximization_step(client, data, weights, responsibilities, options, weight_total)
}

/// Most likely component for each column of `data`.
pub fn emgm_predict_impl<R, C>(
    client: &C,
    model: &EmgmModel<R>,
    data: &Tensor<R>,
) -> MixtureResult<Tensor<R>>
where
    R: Runtime,
    C: EmgmClient<R>,
{
    let resp = emgm_predict_proba_impl(client, model, data)?;
    Ok(client.argmax(&resp, 1, false)?)
}

/// Component probabilities [m, k] for new data [d, m].
pub fn emgm_predict_proba_impl<R, C>(
    client: &C,
    model: &EmgmModel<R>,
    data: &Tensor<R>,
) -> MixtureResult<Tensor<R>>
where
    R: Runtime,
    C: EmgmClient<R>,
{
    Ok(unit_weight_expectation(client, model, data, "emgm_predict_proba")?.responsibilities)
}

/// Per-sample log-evidence [m] for new data [d, m].
pub fn emgm_score_impl<R, C>(
    client: &C,
    model: &EmgmModel<R>,
    data: &Tensor<R>,
) -> MixtureResult<Tensor<R>>
where
    R: Runtime,
    C: EmgmClient<R>,
{
    Ok(unit_weight_expectation(client, model, data, "emgm_score")?.log_evidence)
}

fn unit_weight_expectation<R, C>(
    client: &C,
    model: &EmgmModel<R>,
    data: &Tensor<R>,
    op: &'static str,
) -> MixtureResult<ExpectationResult<R>>
where
    R: Runtime,
    C: EmgmClient<R>,
{
    validate_cluster_dtype(data.dtype(), op)?;
    let (d, m) = validate_samples(data.shape(), op)?;
    validate_params(&model.params, d, op)?;
    let ones = Tensor::<R>::ones(&[m], data.dtype(), data.device());
    expectation_step(client, data, &ones, &model.params, m as f64)
}

/// Shared validation for the fit entry points. Returns `sum(weights)`.
fn validate_fit_inputs<R: Runtime>(
    data: &Tensor<R>,
    weights: &Tensor<R>,
    options: &EmgmOptions,
    op: &'static str,
) -> MixtureResult<f64> {
    validate_cluster_dtype(data.dtype(), op)?;
    let (_, n) = validate_samples(data.shape(), op)?;
    validate_emgm_options(options, n)?;
    checked_weight_total(weights, n, op)
}

fn checked_weight_total<R: Runtime>(
    weights: &Tensor<R>,
    n: usize,
    op: &'static str,
) -> MixtureResult<f64> {
    let values = to_f64_vec(weights, op)?;
    validate_weights(weights.shape(), &values, n, op)?;
    Ok(values.iter().sum())
}

fn validate_params<R: Runtime>(
    params: &MixtureParams<R>,
    d: usize,
    op: &'static str,
) -> MixtureResult<()> {
    let k = params.weights.shape().first().copied().unwrap_or(0);
    let checks: [(&Tensor<R>, Vec<usize>, &str); 3] = [
        (&params.weights, vec![k], "mixing weights"),
        (&params.means, vec![d, k], "means"),
        (&params.covariances, vec![k, d, d], "covariances"),
    ];
    for (tensor, expected, what) in checks {
        if k == 0 || tensor.shape() != expected.as_slice() {
            return Err(MixtureError::ShapeMismatch {
                expected,
                actual: tensor.shape().to_vec(),
                context: format!("{op} {what}"),
            });
        }
    }
    Ok(())
}

/// K-Means on the points [n, d], then one-hot labels [n, k].
fn initial_responsibilities<R, C>(
    client: &C,
    data: &Tensor<R>,
    options: &EmgmOptions,
) -> MixtureResult<Tensor<R>>
where
    R: Runtime,
    C: EmgmClient<R>,
{
    let k = options.n_components;
    let points = data.transpose(0, 1)?.contiguous(); // [n, d]

    // Fixed pass budget, single start
    let km_opts = KMeansOptions {
        n_clusters: k,
        max_iter: options.init_iter,
        tol: 0.0,
        n_init: 1,
        init: KMeansInit::KMeansPlusPlus,
        seed: options.seed,
    };
    let km = kmeans_impl(client, &points, &km_opts)?;
    one_hot(client, &km.labels, k, data.dtype())
}

/// Dense indicator matrix [n, k] from I64 labels [n].
fn one_hot<R, C>(client: &C, labels: &Tensor<R>, k: usize, dtype: DType) -> MixtureResult<Tensor<R>>
where
    R: Runtime,
    C: EmgmClient<R>,
{
    let n = labels.shape()[0];
    let device = labels.device();

    let label_cols = client
        .cast(labels, dtype)?
        .unsqueeze(1)?
        .broadcast_to(&[n, k])?;
    let component_ids = client
        .arange(0.0, k as f64, 1.0, dtype)?
        .unsqueeze(0)?
        .broadcast_to(&[n, k])?;
    let hit = client.eq(&label_cols, &component_ids)?;

    let ones = Tensor::<R>::ones(&[n, k], dtype, device);
    let zeros = Tensor::<R>::zeros(&[n, k], dtype, device);
    Ok(client.where_cond(&hit, &ones, &zeros)?)
}

/// The EM loop proper.
fn run_em<R, C>(
    client: &C,
    data: &Tensor<R>,
    weights: &Tensor<R>,
    initial: Tensor<R>,
    options: &EmgmOptions,
    weight_total: f64,
) -> MixtureResult<EmgmModel<R>>
where
    R: Runtime,
    C: EmgmClient<R>,
{
    let mut resp = initial;
    let mut prev_llh = f64::NEG_INFINITY;
    let mut status = FitStatus::Exhausted {
        max_iter: options.max_iter,
    };
    let mut latest: Option<(MixtureParams<R>, f64)> = None;
    let mut n_iter = 0;

    for t in 1..=options.max_iter {
        let params = maximization_step(client, data, weights, &resp, options, weight_total)?;
        let expectation = expectation_step(client, data, weights, &params, weight_total)?;
        let llh = expectation.log_likelihood;
        resp = expectation.responsibilities;
        n_iter = t;

        tracing::debug!(iteration = t, log_likelihood = llh, "EM iteration");

        let converged = t > 1 && (llh - prev_llh).abs() < options.tol * llh.abs();
        latest = Some((params, llh));
        if converged {
            status = FitStatus::Converged { steps: t };
            break;
        }
        prev_llh = llh;
    }

    let (params, log_likelihood) = latest
        .ok_or_else(|| MixtureError::invalid("max_iter", "emgm requires max_iter > 0"))?;

    match status {
        FitStatus::Converged { steps } => {
            tracing::info!(steps, log_likelihood, "EM converged in {} steps", steps);
        }
        FitStatus::Exhausted { max_iter } => {
            tracing::info!(
                max_iter,
                log_likelihood,
                "EM not converged in {} steps",
                max_iter
            );
        }
    }

    Ok(EmgmModel {
        params,
        status,
        n_iter,
        log_likelihood,
    })
}

/// E-step: log responsibilities per component, normalized by the log-evidence.
fn expectation_step<R, C>(
    client: &C,
    data: &Tensor<R>,
    weights: &Tensor<R>,
    params: &MixtureParams<R>,
    weight_total: f64,
) -> MixtureResult<ExpectationResult<R>>
where
    R: Runtime,
    C: EmgmClient<R>,
{
    let d = data.shape()[0];
    let n = data.shape()[1];
    let k = params.n_components();

    // log N(x_i; mu_j, Sigma_j), one column per component
    let mut log_pdf_cols = Vec::with_capacity(k);
    for j in 0..k {
        let mean_j = params.means.narrow(1, j, 1)?.contiguous().reshape(&[d])?;
        let cov_j = params
            .covariances
            .narrow(0, j, 1)?
            .contiguous()
            .reshape(&[d, d])?;
        let context = format!("emgm component {j}");
        let log_pdf_j = log_gauss_pdf_unchecked(client, data, &mean_j, &cov_j, &context)?;
        log_pdf_cols.push(log_pdf_j.unsqueeze(1)?); // [n, 1]
    }
    let refs: Vec<&Tensor<R>> = log_pdf_cols.iter().collect();
    let log_pdf = client.cat(&refs, 1)?; // [n, k]

    // + log(pi_j), row broadcast
    let log_pi = client.log(&params.weights)?.unsqueeze(0)?.broadcast_to(&[n, k])?;
    let log_joint = client.add(&log_pdf, &log_pi)?;

    // R = softmax over components; T = per-sample log-evidence [n]
    let (responsibilities, log_evidence) = softmax_and_logsumexp(client, &log_joint, 1)?;

    let weighted = client.mul(weights, &log_evidence)?;
    let weighted_sum = to_f64_vec(&client.sum(&weighted, &[0], false)?, "emgm_expectation")?;
    let log_likelihood = weighted_sum.first().copied().unwrap_or(f64::NAN) / weight_total;

    Ok(ExpectationResult {
        responsibilities,
        log_evidence,
        log_likelihood,
    })
}

/// M-step: weighted centroids, scatter matrices and mixing weights.
fn maximization_step<R, C>(
    client: &C,
    data: &Tensor<R>,
    weights: &Tensor<R>,
    resp: &Tensor<R>,
    options: &EmgmOptions,
    weight_total: f64,
) -> MixtureResult<MixtureParams<R>>
where
    R: Runtime,
    C: EmgmClient<R>,
{
    let d = data.shape()[0];
    let n = data.shape()[1];
    let k = resp.shape()[1];
    let dtype = data.dtype();
    let device = data.device();

    // R' = R * w, weights broadcast across components
    let weight_cols = weights.unsqueeze(1)?.broadcast_to(&[n, k])?;
    let weighted_resp = client.mul(resp, &weight_cols)?; // [n, k]

    // Effective mass and mixing weights
    let nk = client.sum(&weighted_resp, &[0], false)?; // [k]
    let nk_host = to_f64_vec(&nk, "emgm_maximization")?;
    let mixing = client.div_scalar(&nk, weight_total)?;

    // mu = X R' / nk
    let weighted_sum = client.matmul(data, &weighted_resp)?; // [d, k]
    let means = client.div(&weighted_sum, &nk.unsqueeze(0)?.broadcast_to(&[d, k])?)?;

    let sqrt_resp = client.sqrt(&weighted_resp)?;
    let reg_eye = client.mul_scalar(
        &LinalgOps::diagflat(client, &Tensor::<R>::ones(&[d], dtype, device))?,
        options.reg_covar,
    )?;

    let empty: Vec<usize> = nk_host
        .iter()
        .enumerate()
        .filter(|(_, mass)| **mass == 0.0)
        .map(|(j, _)| j)
        .collect();
    if !empty.is_empty() {
        tracing::warn!(
            components = ?empty,
            policy = ?options.empty_component,
            "Mixture components with zero effective mass"
        );
    }

    let pooled = match options.empty_component {
        EmptyComponentPolicy::Inert if !empty.is_empty() => Some(pooled_moments(
            client,
            data,
            weights,
            weight_total,
            &reg_eye,
        )?),
        _ => None,
    };

    let mut mean_cols = Vec::with_capacity(k);
    let mut cov_slices = Vec::with_capacity(k);
    for (j, &mass) in nk_host.iter().enumerate() {
        if let Some((pooled_mean, pooled_cov)) = pooled.as_ref().filter(|_| mass == 0.0) {
            mean_cols.push(pooled_mean.clone());
            cov_slices.push(pooled_cov.unsqueeze(0)?);
            continue;
        }

        let mean_j = means.narrow(1, j, 1)?.contiguous(); // [d, 1]
        let sqrt_j = sqrt_resp.narrow(1, j, 1)?.contiguous().reshape(&[1, n])?;
        let cov_j = scatter_matrix(client, data, &mean_j, &sqrt_j, mass)?;
        let cov_j = client.add(&cov_j, &reg_eye)?;
        mean_cols.push(mean_j);
        cov_slices.push(cov_j.unsqueeze(0)?);
    }

    let mean_refs: Vec<&Tensor<R>> = mean_cols.iter().collect();
    let cov_refs: Vec<&Tensor<R>> = cov_slices.iter().collect();

    Ok(MixtureParams {
        means: client.cat(&mean_refs, 1)?,
        covariances: client.cat(&cov_refs, 0)?,
        weights: mixing,
    })
}

/// `(Xo Xo^T) / mass` with `Xo = (X - center) * sqrt_w`.
///
/// `center` is [d, 1], `sqrt_w` is [1, n].
fn scatter_matrix<R, C>(
    client: &C,
    data: &Tensor<R>,
    center: &Tensor<R>,
    sqrt_w: &Tensor<R>,
    mass: f64,
) -> MixtureResult<Tensor<R>>
where
    R: Runtime,
    C: EmgmClient<R>,
{
    let d = data.shape()[0];
    let n = data.shape()[1];
    let centered = client.sub(data, &center.broadcast_to(&[d, n])?)?;
    let scaled = client.mul(&centered, &sqrt_w.broadcast_to(&[d, n])?)?;
    let outer = client.matmul(&scaled, &scaled.transpose(0, 1)?)?; // [d, d]
    Ok(client.div_scalar(&outer, mass)?)
}

/// Weighted mean [d, 1] and regularized covariance [d, d] of all samples.
fn pooled_moments<R, C>(
    client: &C,
    data: &Tensor<R>,
    weights: &Tensor<R>,
    weight_total: f64,
    reg_eye: &Tensor<R>,
) -> MixtureResult<(Tensor<R>, Tensor<R>)>
where
    R: Runtime,
    C: EmgmClient<R>,
{
    let n = data.shape()[1];
    let normalized = client.div_scalar(weights, weight_total)?; // [n]
    let mean = client.matmul(data, &normalized.unsqueeze(1)?)?; // [d, 1]
    let sqrt_w = client.sqrt(&normalized)?.reshape(&[1, n])?;
    let cov = scatter_matrix(client, data, &mean, &sqrt_w, 1.0)?;
    Ok((mean, client.add(&cov, reg_eye)?))
}
