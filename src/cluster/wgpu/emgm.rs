//! WebGPU implementation of weighted Gaussian mixture EM.

use crate::cluster::error::MixtureResult;
use crate::cluster::impl_generic::{
    emgm_expectation_impl, emgm_fit_from_impl, emgm_fit_impl, emgm_initialize_impl,
    emgm_maximization_impl, emgm_predict_impl, emgm_predict_proba_impl, emgm_score_impl,
};
use crate::cluster::traits::emgm::{
    EmgmAlgorithms, EmgmModel, EmgmOptions, ExpectationResult, MixtureParams,
};
use numr::runtime::wgpu::{WgpuClient, WgpuRuntime};
use numr::tensor::Tensor;

impl EmgmAlgorithms<WgpuRuntime> for WgpuClient {
    fn emgm_fit(
        &self,
        data: &Tensor<WgpuRuntime>,
        weights: &Tensor<WgpuRuntime>,
        options: &EmgmOptions,
    ) -> MixtureResult<EmgmModel<WgpuRuntime>> {
        emgm_fit_impl(self, data, weights, options)
    }

    fn emgm_fit_from(
        &self,
        data: &Tensor<WgpuRuntime>,
        weights: &Tensor<WgpuRuntime>,
        responsibilities: &Tensor<WgpuRuntime>,
        options: &EmgmOptions,
    ) -> MixtureResult<EmgmModel<WgpuRuntime>> {
        emgm_fit_from_impl(self, data, weights, responsibilities, options)
    }

    fn emgm_initialize(
        &self,
        data: &Tensor<WgpuRuntime>,
        options: &EmgmOptions,
    ) -> MixtureResult<Tensor<WgpuRuntime>> {
        emgm_initialize_impl(self, data, options)
    }

    fn emgm_expectation(
        &self,
        data: &Tensor<WgpuRuntime>,
        weights: &Tensor<WgpuRuntime>,
        params: &MixtureParams<WgpuRuntime>,
    ) -> MixtureResult<ExpectationResult<WgpuRuntime>> {
        emgm_expectation_impl(self, data, weights, params)
    }

    fn emgm_maximization(
        &self,
        data: &Tensor<WgpuRuntime>,
        weights: &Tensor<WgpuRuntime>,
        responsibilities: &Tensor<WgpuRuntime>,
        options: &EmgmOptions,
    ) -> MixtureResult<MixtureParams<WgpuRuntime>> {
        emgm_maximization_impl(self, data, weights, responsibilities, options)
    }

    fn emgm_predict(
        &self,
        model: &EmgmModel<WgpuRuntime>,
        data: &Tensor<WgpuRuntime>,
    ) -> MixtureResult<Tensor<WgpuRuntime>> {
        emgm_predict_impl(self, model, data)
    }

    fn emgm_predict_proba(
        &self,
        model: &EmgmModel<WgpuRuntime>,
        data: &Tensor<WgpuRuntime>,
    ) -> MixtureResult<Tensor<WgpuRuntime>> {
        emgm_predict_proba_impl(self, model, data)
    }

    fn emgm_score(
        &self,
        model: &EmgmModel<WgpuRuntime>,
        data: &Tensor<WgpuRuntime>,
    ) -> MixtureResult<Tensor<WgpuRuntime>> {
        emgm_score_impl(self, model, data)
    }
}
