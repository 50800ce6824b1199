//! CUDA implementation of the mixture density primitives.

use crate::cluster::error::MixtureResult;
use crate::cluster::impl_generic::{log_gauss_pdf_impl, logsumexp_impl};
use crate::cluster::traits::density::MixtureDensityAlgorithms;
use numr::runtime::cuda::{CudaClient, CudaRuntime};
use numr::tensor::Tensor;

impl MixtureDensityAlgorithms<CudaRuntime> for CudaClient {
    fn log_gauss_pdf(
        &self,
        data: &Tensor<CudaRuntime>,
        mean: &Tensor<CudaRuntime>,
        covariance: &Tensor<CudaRuntime>,
    ) -> MixtureResult<Tensor<CudaRuntime>> {
        log_gauss_pdf_impl(self, data, mean, covariance)
    }

    fn logsumexp(
        &self,
        x: &Tensor<CudaRuntime>,
        dim: usize,
    ) -> MixtureResult<Tensor<CudaRuntime>> {
        logsumexp_impl(self, x, dim)
    }
}
