//! Log-space density primitives used by mixture models.

use crate::cluster::error::MixtureResult;
use numr::runtime::Runtime;
use numr::tensor::Tensor;

/// Numerically stable log-density helpers.
pub trait MixtureDensityAlgorithms<R: Runtime> {
    /// Log-density of a multivariate normal at every column of `data`.
    ///
    /// `data` is [d, n], `mean` is [d], `covariance` is [d, d] and must be
    /// positive-definite. Returns [n].
    fn log_gauss_pdf(
        &self,
        data: &Tensor<R>,
        mean: &Tensor<R>,
        covariance: &Tensor<R>,
    ) -> MixtureResult<Tensor<R>>;

    /// `log(sum(exp(x)))` along `dim`, with `dim` removed from the output.
    ///
    /// Slices whose maximum is infinite return that maximum, so an all `-inf`
    /// slice yields `-inf` rather than NaN.
    fn logsumexp(&self, x: &Tensor<R>, dim: usize) -> MixtureResult<Tensor<R>>;
}
