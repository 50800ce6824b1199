//! Weighted Gaussian mixture fitting by Expectation-Maximization.
//!
//! Samples are stored column-wise: data is [d, n], means are [d, k],
//! covariances are [k, d, d] and responsibilities are [n, k].

use crate::cluster::error::MixtureResult;
use numr::runtime::Runtime;
use numr::tensor::Tensor;

/// What the M-step does with a component whose effective mass is zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmptyComponentPolicy {
    /// Divide by zero mass as-is. The component mean and covariance become
    /// NaN and the next density evaluation fails with `NotPositiveDefinite`.
    #[default]
    Propagate,
    /// Give the component zero weight and the pooled mean and covariance.
    /// It keeps zero responsibility and the fit continues with k components.
    Inert,
}

/// Options for EM fitting of a Gaussian mixture.
#[derive(Debug, Clone)]
pub struct EmgmOptions {
    /// Number of mixture components k.
    pub n_components: usize,
    /// Iteration cap for the EM loop.
    pub max_iter: usize,
    /// Relative tolerance on the change of the weighted log-likelihood.
    pub tol: f64,
    /// Value added to every covariance diagonal.
    pub reg_covar: f64,
    /// Number of K-Means passes used for the initial responsibilities.
    pub init_iter: usize,
    /// Seed for the K-Means initialization. `None` uses the runtime RNG.
    pub seed: Option<u64>,
    /// Handling of zero-mass components in the M-step.
    pub empty_component: EmptyComponentPolicy,
}

impl Default for EmgmOptions {
    fn default() -> Self {
        Self {
            n_components: 1,
            max_iter: 500,
            tol: 1e-5,
            reg_covar: 1e-6,
            init_iter: 10,
            seed: None,
            empty_component: EmptyComponentPolicy::Propagate,
        }
    }
}

/// Terminal state of an EM fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitStatus {
    /// The relative log-likelihood change fell below `tol` after `steps` iterations.
    Converged { steps: usize },
    /// `max_iter` iterations ran without meeting the tolerance.
    Exhausted { max_iter: usize },
}

impl FitStatus {
    /// Whether the fit met the tolerance.
    pub fn is_converged(&self) -> bool {
        matches!(self, Self::Converged { .. })
    }
}

/// Gaussian mixture parameters.
#[derive(Debug, Clone)]
pub struct MixtureParams<R: Runtime> {
    /// Component means [d, k].
    pub means: Tensor<R>,
    /// Component covariances [k, d, d].
    pub covariances: Tensor<R>,
    /// Mixing weights [k] (sum = 1).
    pub weights: Tensor<R>,
}

impl<R: Runtime> MixtureParams<R> {
    /// Number of components.
    pub fn n_components(&self) -> usize {
        self.weights.shape()[0]
    }

    /// Sample dimensionality.
    pub fn dim(&self) -> usize {
        self.means.shape()[0]
    }
}

/// Output of an E-step.
#[derive(Debug, Clone)]
pub struct ExpectationResult<R: Runtime> {
    /// Posterior responsibilities [n, k]; each row sums to 1.
    pub responsibilities: Tensor<R>,
    /// Per-sample log-evidence [n].
    pub log_evidence: Tensor<R>,
    /// Weighted average log-likelihood `sum(w * log_evidence) / sum(w)`.
    pub log_likelihood: f64,
}

/// Fitted Gaussian mixture.
#[derive(Debug, Clone)]
pub struct EmgmModel<R: Runtime> {
    /// Parameters from the last M-step.
    pub params: MixtureParams<R>,
    /// How the EM loop ended.
    pub status: FitStatus,
    /// Number of EM iterations run.
    pub n_iter: usize,
    /// Weighted average log-likelihood of the last E-step.
    pub log_likelihood: f64,
}

/// EM algorithms for weighted Gaussian mixtures.
pub trait EmgmAlgorithms<R: Runtime> {
    /// Fit a k-component mixture to `data` [d, n] with sample `weights` [n],
    /// starting from K-Means responsibilities.
    ///
    /// The outcome is returned in [`EmgmModel::status`] and emitted as one
    /// `tracing::info!` event ("EM converged in N steps" / "EM not converged
    /// in N steps"). Nothing is printed unless the caller installs a
    /// `tracing` subscriber.
    fn emgm_fit(
        &self,
        data: &Tensor<R>,
        weights: &Tensor<R>,
        options: &EmgmOptions,
    ) -> MixtureResult<EmgmModel<R>>;

    /// Fit starting from caller-supplied responsibilities [n, k].
    fn emgm_fit_from(
        &self,
        data: &Tensor<R>,
        weights: &Tensor<R>,
        responsibilities: &Tensor<R>,
        options: &EmgmOptions,
    ) -> MixtureResult<EmgmModel<R>>;

    /// One-hot responsibilities [n, k] from K-Means labels.
    fn emgm_initialize(&self, data: &Tensor<R>, options: &EmgmOptions)
    -> MixtureResult<Tensor<R>>;

    /// E-step: responsibilities and weighted log-likelihood.
    fn emgm_expectation(
        &self,
        data: &Tensor<R>,
        weights: &Tensor<R>,
        params: &MixtureParams<R>,
    ) -> MixtureResult<ExpectationResult<R>>;

    /// M-step: means, covariances and mixing weights from responsibilities.
    ///
    /// `responsibilities` must be [n, `options.n_components`].
    fn emgm_maximization(
        &self,
        data: &Tensor<R>,
        weights: &Tensor<R>,
        responsibilities: &Tensor<R>,
        options: &EmgmOptions,
    ) -> MixtureResult<MixtureParams<R>>;

    /// Most likely component for each column of `data` [d, m]. Returns [m] I64.
    fn emgm_predict(&self, model: &EmgmModel<R>, data: &Tensor<R>) -> MixtureResult<Tensor<R>>;

    /// Component probabilities [m, k].
    fn emgm_predict_proba(
        &self,
        model: &EmgmModel<R>,
        data: &Tensor<R>,
    ) -> MixtureResult<Tensor<R>>;

    /// Per-sample log-evidence [m].
    fn emgm_score(&self, model: &EmgmModel<R>, data: &Tensor<R>) -> MixtureResult<Tensor<R>>;
}
