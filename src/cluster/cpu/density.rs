//! CPU implementation of the mixture density primitives.

use crate::cluster::error::MixtureResult;
use crate::cluster::impl_generic::{log_gauss_pdf_impl, logsumexp_impl};
use crate::cluster::traits::density::MixtureDensityAlgorithms;
use numr::runtime::cpu::{CpuClient, CpuRuntime};
use numr::tensor::Tensor;

impl MixtureDensityAlgorithms<CpuRuntime> for CpuClient {
    fn log_gauss_pdf(
        &self,
        data: &Tensor<CpuRuntime>,
        mean: &Tensor<CpuRuntime>,
        covariance: &Tensor<CpuRuntime>,
    ) -> MixtureResult<Tensor<CpuRuntime>> {
        log_gauss_pdf_impl(self, data, mean, covariance)
    }

    fn logsumexp(&self, x: &Tensor<CpuRuntime>, dim: usize) -> MixtureResult<Tensor<CpuRuntime>> {
        logsumexp_impl(self, x, dim)
    }
}
