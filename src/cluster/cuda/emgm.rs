//! CUDA implementation of weighted Gaussian mixture EM.

use crate::cluster::error::MixtureResult;
use crate::cluster::impl_generic::{
    emgm_expectation_impl, emgm_fit_from_impl, emgm_fit_impl, emgm_initialize_impl,
    emgm_maximization_impl, emgm_predict_impl, emgm_predict_proba_impl, emgm_score_impl,
};
use crate::cluster::traits::emgm::{
    EmgmAlgorithms, EmgmModel, EmgmOptions, ExpectationResult, MixtureParams,
};
use numr::runtime::cuda::{CudaClient, CudaRuntime};
use numr::tensor::Tensor;

impl EmgmAlgorithms<CudaRuntime> for CudaClient {
    fn emgm_fit(
        &self,
        data: &Tensor<CudaRuntime>,
        weights: &Tensor<CudaRuntime>,
        options: &EmgmOptions,
    ) -> MixtureResult<EmgmModel<CudaRuntime>> {
        emgm_fit_impl(self, data, weights, options)
    }

    fn emgm_fit_from(
        &self,
        data: &Tensor<CudaRuntime>,
        weights: &Tensor<CudaRuntime>,
        responsibilities: &Tensor<CudaRuntime>,
        options: &EmgmOptions,
    ) -> MixtureResult<EmgmModel<CudaRuntime>> {
        emgm_fit_from_impl(self, data, weights, responsibilities, options)
    }

    fn emgm_initialize(
        &self,
        data: &Tensor<CudaRuntime>,
        options: &EmgmOptions,
    ) -> MixtureResult<Tensor<CudaRuntime>> {
        emgm_initialize_impl(self, data, options)
    }

    fn emgm_expectation(
        &self,
        data: &Tensor<CudaRuntime>,
        weights: &Tensor<CudaRuntime>,
        params: &MixtureParams<CudaRuntime>,
    ) -> MixtureResult<ExpectationResult<CudaRuntime>> {
        emgm_expectation_impl(self, data, weights, params)
    }

    fn emgm_maximization(
        &self,
        data: &Tensor<CudaRuntime>,
        weights: &Tensor<CudaRuntime>,
        responsibilities: &Tensor<CudaRuntime>,
        options: &EmgmOptions,
    ) -> MixtureResult<MixtureParams<CudaRuntime>> {
        emgm_maximization_impl(self, data, weights, responsibilities, options)
    }

    fn emgm_predict(
        &self,
        model: &EmgmModel<CudaRuntime>,
        data: &Tensor<CudaRuntime>,
    ) -> MixtureResult<Tensor<CudaRuntime>> {
        emgm_predict_impl(self, model, data)
    }

    fn emgm_predict_proba(
        &self,
        model: &EmgmModel<CudaRuntime>,
        data: &Tensor<CudaRuntime>,
    ) -> MixtureResult<Tensor<CudaRuntime>> {
        emgm_predict_proba_impl(self, model, data)
    }

    fn emgm_score(
        &self,
        model: &EmgmModel<CudaRuntime>,
        data: &Tensor<CudaRuntime>,
    ) -> MixtureResult<Tensor<CudaRuntime>> {
        emgm_score_impl(self, model, data)
    }
}
