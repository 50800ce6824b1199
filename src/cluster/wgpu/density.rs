//! WebGPU implementation of the mixture density primitives.

use crate::cluster::error::MixtureResult;
use crate::cluster::impl_generic::{log_gauss_pdf_impl, logsumexp_impl};
use crate::cluster::traits::density::MixtureDensityAlgorithms;
use numr::runtime::wgpu::{WgpuClient, WgpuRuntime};
use numr::tensor::Tensor;

impl MixtureDensityAlgorithms<WgpuRuntime> for WgpuClient {
    fn log_gauss_pdf(
        &self,
        data: &Tensor<WgpuRuntime>,
        mean: &Tensor<WgpuRuntime>,
        covariance: &Tensor<WgpuRuntime>,
    ) -> MixtureResult<Tensor<WgpuRuntime>> {
        log_gauss_pdf_impl(self, data, mean, covariance)
    }

    fn logsumexp(
        &self,
        x: &Tensor<WgpuRuntime>,
        dim: usize,
    ) -> MixtureResult<Tensor<WgpuRuntime>> {
        logsumexp_impl(self, x, dim)
    }
}
