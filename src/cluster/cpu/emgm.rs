//! CPU implementation of weighted Gaussian mixture EM.

use crate::cluster::error::MixtureResult;
use crate::cluster::impl_generic::{
    emgm_expectation_impl, emgm_fit_from_impl, emgm_fit_impl, emgm_initialize_impl,
    emgm_maximization_impl, emgm_predict_impl, emgm_predict_proba_impl, emgm_score_impl,
};
use crate::cluster::traits::emgm::{
    EmgmAlgorithms, EmgmModel, EmgmOptions, ExpectationResult, MixtureParams,
};
use numr::runtime::cpu::{CpuClient, CpuRuntime};
use numr::tensor::Tensor;

impl EmgmAlgorithms<CpuRuntime> for CpuClient {
    fn emgm_fit(
        &self,
        data: &Tensor<CpuRuntime>,
        weights: &Tensor<CpuRuntime>,
        options: &EmgmOptions,
    ) -> MixtureResult<EmgmModel<CpuRuntime>> {
        emgm_fit_impl(self, data, weights, options)
    }

    fn emgm_fit_from(
        &self,
        data: &Tensor<CpuRuntime>,
        weights: &Tensor<CpuRuntime>,
        responsibilities: &Tensor<CpuRuntime>,
        options: &EmgmOptions,
    ) -> MixtureResult<EmgmModel<CpuRuntime>> {
        emgm_fit_from_impl(self, data, weights, responsibilities, options)
    }

    fn emgm_initialize(
        &self,
        data: &Tensor<CpuRuntime>,
        options: &EmgmOptions,
    ) -> MixtureResult<Tensor<CpuRuntime>> {
        emgm_initialize_impl(self, data, options)
    }

    fn emgm_expectation(
        &self,
        data: &Tensor<CpuRuntime>,
        weights: &Tensor<CpuRuntime>,
        params: &MixtureParams<CpuRuntime>,
    ) -> MixtureResult<ExpectationResult<CpuRuntime>> {
        emgm_expectation_impl(self, data, weights, params)
    }

    fn emgm_maximization(
        &self,
        data: &Tensor<CpuRuntime>,
        weights: &Tensor<CpuRuntime>,
        responsibilities: &Tensor<CpuRuntime>,
        options: &EmgmOptions,
    ) -> MixtureResult<MixtureParams<CpuRuntime>> {
        emgm_maximization_impl(self, data, weights, responsibilities, options)
    }

    fn emgm_predict(
        &self,
        model: &EmgmModel<CpuRuntime>,
        data: &Tensor<CpuRuntime>,
    ) -> MixtureResult<Tensor<CpuRuntime>> {
        emgm_predict_impl(self, model, data)
    }

    fn emgm_predict_proba(
        &self,
        model: &EmgmModel<CpuRuntime>,
        data: &Tensor<CpuRuntime>,
    ) -> MixtureResult<Tensor<CpuRuntime>> {
        emgm_predict_proba_impl(self, model, data)
    }

    fn emgm_score(
        &self,
        model: &EmgmModel<CpuRuntime>,
        data: &Tensor<CpuRuntime>,
    ) -> MixtureResult<Tensor<CpuRuntime>> {
        emgm_score_impl(self, model, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::error::MixtureError;
    use crate::cluster::impl_generic::helpers::cholesky_lower;
    use crate::cluster::traits::emgm::{EmptyComponentPolicy, FitStatus};
    use numr::runtime::cpu::CpuDevice;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rand_distr::{Distribution, Normal};

    const N_PER_CLUSTER: usize = 100;

    fn setup() -> (CpuClient, CpuDevice) {
        let device = CpuDevice::new();
        let client = CpuClient::new(device.clone());
        (client, device)
    }

    /// Two unit-variance 2-D blobs at (0, 0) and (10, 10), as [2, 200].
    fn two_clusters(device: &CpuDevice, seed: u64) -> Tensor<CpuRuntime> {
        let mut rng = StdRng::seed_from_u64(seed);
        let normal = Normal::new(0.0, 1.0).unwrap();
        let mut xs = Vec::with_capacity(2 * N_PER_CLUSTER);
        let mut ys = Vec::with_capacity(2 * N_PER_CLUSTER);
        for center in [0.0, 10.0] {
            for _ in 0..N_PER_CLUSTER {
                xs.push(center + normal.sample(&mut rng));
                ys.push(center + normal.sample(&mut rng));
            }
        }
        xs.extend(ys);
        Tensor::<CpuRuntime>::from_slice(&xs, &[2, 2 * N_PER_CLUSTER], device)
    }

    fn unit_weights(device: &CpuDevice, n: usize) -> Tensor<CpuRuntime> {
        Tensor::<CpuRuntime>::from_slice(&vec![1.0; n], &[n], device)
    }

    /// Responsibilities that put each blob in its own column, leaving the rest empty.
    fn blob_responsibilities(device: &CpuDevice, k: usize) -> Tensor<CpuRuntime> {
        let n = 2 * N_PER_CLUSTER;
        let mut values = vec![0.0; n * k];
        for i in 0..n {
            let j = if i < N_PER_CLUSTER { 0 } else { 1 };
            values[i * k + j] = 1.0;
        }
        Tensor::<CpuRuntime>::from_slice(&values, &[n, k], device)
    }

    fn assert_rows_sum_to_one(resp: &Tensor<CpuRuntime>) {
        let k = resp.shape()[1];
        let values: Vec<f64> = resp.to_vec();
        for (i, row) in values.chunks(k).enumerate() {
            let row_sum: f64 = row.iter().sum();
            assert!((row_sum - 1.0).abs() < 1e-12, "row {} sum = {}", i, row_sum);
        }
    }

    #[test]
    fn test_emgm_recovers_two_clusters() {
        let (client, device) = setup();
        let data = two_clusters(&device, 7);
        let weights = unit_weights(&device, 2 * N_PER_CLUSTER);

        let options = EmgmOptions {
            n_components: 2,
            seed: Some(1),
            ..Default::default()
        };

        let model = client.emgm_fit(&data, &weights, &options).unwrap();
        match model.status {
            FitStatus::Converged { steps } => assert!(steps < 100, "took {} steps", steps),
            FitStatus::Exhausted { .. } => panic!("fit did not converge"),
        }
        assert_eq!(model.params.means.shape(), &[2, 2]);
        assert_eq!(model.params.covariances.shape(), &[2, 2, 2]);
        assert_eq!(model.params.weights.shape(), &[2]);

        // means are [d, k]: x coords in row 0, y coords in row 1
        let means: Vec<f64> = model.params.means.to_vec();
        let (lo, hi) = if means[0] < means[1] { (0, 1) } else { (1, 0) };
        assert!(means[lo].abs() < 0.5 && means[2 + lo].abs() < 0.5);
        assert!((means[hi] - 10.0).abs() < 0.5 && (means[2 + hi] - 10.0).abs() < 0.5);

        let pi: Vec<f64> = model.params.weights.to_vec();
        for p in &pi {
            assert!((p - 0.5).abs() < 0.1);
        }
        assert!(model.log_likelihood.is_finite());
    }

    #[test]
    fn test_expectation_rows_sum_to_one() {
        let (client, device) = setup();
        let data = two_clusters(&device, 3);
        let weights = unit_weights(&device, 2 * N_PER_CLUSTER);

        let options = EmgmOptions {
            n_components: 2,
            seed: Some(2),
            max_iter: 3,
            ..Default::default()
        };
        let model = client.emgm_fit(&data, &weights, &options).unwrap();

        let e = client
            .emgm_expectation(&data, &weights, &model.params)
            .unwrap();
        assert_eq!(e.responsibilities.shape(), &[2 * N_PER_CLUSTER, 2]);
        assert_eq!(e.log_evidence.shape(), &[2 * N_PER_CLUSTER]);
        assert_rows_sum_to_one(&e.responsibilities);
        assert!(e.log_likelihood.is_finite());
    }

    #[test]
    fn test_expectation_overlapping_components_is_soft() {
        let (client, device) = setup();

        // 1-D, two heavily overlapping components
        let xs = [-2.0, -1.5, -1.0, -0.5, 0.0, 0.5, 1.0, 1.5, 2.0];
        let ws = [1.0, 0.5, 2.0, 1.0, 3.0, 1.0, 0.25, 1.0, 1.5];
        let n = xs.len();
        let data = Tensor::<CpuRuntime>::from_slice(&xs, &[1, n], &device);
        let weights = Tensor::<CpuRuntime>::from_slice(&ws, &[n], &device);

        let (mu, var, pi) = ([0.0, 0.5], [1.0, 2.0], [0.4, 0.6]);
        let params = MixtureParams {
            means: Tensor::<CpuRuntime>::from_slice(&mu, &[1, 2], &device),
            covariances: Tensor::<CpuRuntime>::from_slice(&var, &[2, 1, 1], &device),
            weights: Tensor::<CpuRuntime>::from_slice(&pi, &[2], &device),
        };

        let e = client.emgm_expectation(&data, &weights, &params).unwrap();
        assert_rows_sum_to_one(&e.responsibilities);

        let resp: Vec<f64> = e.responsibilities.to_vec();
        for (i, &x) in xs.iter().enumerate() {
            let joint: Vec<f64> = (0..2)
                .map(|j| {
                    let z: f64 = (x - mu[j]) * (x - mu[j]) / var[j];
                    pi[j] * (-0.5 * z).exp() / (2.0 * std::f64::consts::PI * var[j]).sqrt()
                })
                .collect();
            let total = joint[0] + joint[1];
            for j in 0..2 {
                let r = resp[i * 2 + j];
                assert!(r > 0.05 && r < 0.95, "R[{}, {}] = {} is not soft", i, j, r);
                assert!((r - joint[j] / total).abs() < 1e-4);
            }
        }
    }

    #[test]
    fn test_expectation_single_component_at_mean() {
        let (client, device) = setup();

        let data = Tensor::<CpuRuntime>::from_slice(&[3.0, 3.0, -1.0, -1.0], &[2, 2], &device);
        let weights = Tensor::<CpuRuntime>::from_slice(&[2.0, 5.0], &[2], &device);
        let params = MixtureParams {
            means: Tensor::<CpuRuntime>::from_slice(&[3.0, -1.0], &[2, 1], &device),
            covariances: Tensor::<CpuRuntime>::from_slice(
                &[1.0, 0.0, 0.0, 1.0],
                &[1, 2, 2],
                &device,
            ),
            weights: Tensor::<CpuRuntime>::from_slice(&[1.0], &[1], &device),
        };

        let e = client.emgm_expectation(&data, &weights, &params).unwrap();
        let expected = -(2.0 * std::f64::consts::PI).ln();
        assert!((e.log_likelihood - expected).abs() < 1e-12);
        let resp: Vec<f64> = e.responsibilities.to_vec();
        assert_eq!(resp, vec![1.0, 1.0]);
    }

    #[test]
    fn test_maximization_weights_and_covariances() {
        let (client, device) = setup();
        let data = two_clusters(&device, 5);
        let weights = unit_weights(&device, 2 * N_PER_CLUSTER);

        let options = EmgmOptions {
            n_components: 2,
            seed: Some(9),
            ..Default::default()
        };
        let resp = client.emgm_initialize(&data, &options).unwrap();
        let params = client
            .emgm_maximization(&data, &weights, &resp, &options)
            .unwrap();

        let pi: Vec<f64> = params.weights.to_vec();
        let total: f64 = pi.iter().sum();
        assert!((total - 1.0).abs() < 1e-12);

        let d = 2;
        let cov: Vec<f64> = params.covariances.to_vec();
        for j in 0..2 {
            let block = &cov[j * d * d..(j + 1) * d * d];
            assert!((block[1] - block[2]).abs() < 1e-12, "component {} not symmetric", j);
            assert!(cholesky_lower(block, d, "test").is_ok());
        }
    }

    #[test]
    fn test_maximization_known_moments() {
        let (client, device) = setup();

        // 1-D, points 0 and 2 in component 0, point 10 in component 1
        let data = Tensor::<CpuRuntime>::from_slice(&[0.0, 2.0, 10.0], &[1, 3], &device);
        let weights = Tensor::<CpuRuntime>::from_slice(&[1.0, 1.0, 2.0], &[3], &device);
        let resp = Tensor::<CpuRuntime>::from_slice(
            &[1.0, 0.0, 1.0, 0.0, 0.0, 1.0],
            &[3, 2],
            &device,
        );
        let options = EmgmOptions {
            n_components: 2,
            ..Default::default()
        };

        let params = client
            .emgm_maximization(&data, &weights, &resp, &options)
            .unwrap();
        let means: Vec<f64> = params.means.to_vec();
        let cov: Vec<f64> = params.covariances.to_vec();
        let pi: Vec<f64> = params.weights.to_vec();

        assert!((means[0] - 1.0).abs() < 1e-12);
        assert!((means[1] - 10.0).abs() < 1e-12);
        assert!((cov[0] - (1.0 + 1e-6)).abs() < 1e-12);
        assert!((cov[1] - 1e-6).abs() < 1e-15);
        assert!((pi[0] - 0.5).abs() < 1e-12);
        assert!((pi[1] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_maximization_rejects_component_count_mismatch() {
        let (client, device) = setup();
        let data = two_clusters(&device, 5);
        let weights = unit_weights(&device, 2 * N_PER_CLUSTER);
        let resp = blob_responsibilities(&device, 3);

        let options = EmgmOptions {
            n_components: 2,
            ..Default::default()
        };
        assert!(matches!(
            client.emgm_maximization(&data, &weights, &resp, &options),
            Err(MixtureError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_initialize_is_one_hot() {
        let (client, device) = setup();
        let data = two_clusters(&device, 11);

        let options = EmgmOptions {
            n_components: 3,
            seed: Some(4),
            ..Default::default()
        };
        let resp = client.emgm_initialize(&data, &options).unwrap();
        assert_eq!(resp.shape(), &[2 * N_PER_CLUSTER, 3]);

        let values: Vec<f64> = resp.to_vec();
        for row in values.chunks(3) {
            assert_eq!(row.iter().filter(|&&v| v == 1.0).count(), 1);
            assert_eq!(row.iter().filter(|&&v| v == 0.0).count(), 2);
        }
    }

    #[test]
    fn test_fit_is_deterministic_with_seed() {
        let (client, device) = setup();
        let data = two_clusters(&device, 21);
        let weights = unit_weights(&device, 2 * N_PER_CLUSTER);

        let options = EmgmOptions {
            n_components: 2,
            seed: Some(123),
            ..Default::default()
        };

        let a = client.emgm_fit(&data, &weights, &options).unwrap();
        let b = client.emgm_fit(&data, &weights, &options).unwrap();

        let ma: Vec<f64> = a.params.means.to_vec();
        let mb: Vec<f64> = b.params.means.to_vec();
        let ca: Vec<f64> = a.params.covariances.to_vec();
        let cb: Vec<f64> = b.params.covariances.to_vec();
        let pa: Vec<f64> = a.params.weights.to_vec();
        let pb: Vec<f64> = b.params.weights.to_vec();
        assert_eq!(ma, mb);
        assert_eq!(ca, cb);
        assert_eq!(pa, pb);
        assert_eq!(a.status, b.status);
    }

    #[test]
    fn test_more_components_than_clusters() {
        let (client, device) = setup();
        let data = two_clusters(&device, 13);
        let weights = unit_weights(&device, 2 * N_PER_CLUSTER);

        let options = EmgmOptions {
            n_components: 4,
            seed: Some(8),
            ..Default::default()
        };

        // With this seed every K-Means cluster is populated, so no component starts empty
        let init: Vec<f64> = client.emgm_initialize(&data, &options).unwrap().to_vec();
        let mut counts = [0usize; 4];
        for row in init.chunks(4) {
            for (j, &v) in row.iter().enumerate() {
                if v == 1.0 {
                    counts[j] += 1;
                }
            }
        }
        assert!(counts.iter().all(|&c| c > 0), "init column counts {:?}", counts);

        // Extra components split the blobs and the fit converges
        let model = client.emgm_fit(&data, &weights, &options).unwrap();
        assert!(model.status.is_converged(), "status {:?}", model.status);

        let pi: Vec<f64> = model.params.weights.to_vec();
        assert_eq!(pi.len(), 4);
        assert!((pi.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!(pi.iter().all(|&p| p > 0.0));

        let e = client
            .emgm_expectation(&data, &weights, &model.params)
            .unwrap();
        assert_rows_sum_to_one(&e.responsibilities);
    }

    #[test]
    fn test_empty_component_propagates_nan() {
        let (client, device) = setup();
        let data = two_clusters(&device, 17);
        let weights = unit_weights(&device, 2 * N_PER_CLUSTER);
        let resp = blob_responsibilities(&device, 3);

        let options = EmgmOptions {
            n_components: 3,
            ..Default::default()
        };

        let params = client
            .emgm_maximization(&data, &weights, &resp, &options)
            .unwrap();
        let means: Vec<f64> = params.means.to_vec();
        let pi: Vec<f64> = params.weights.to_vec();
        assert!(means[2].is_nan() && means[5].is_nan());
        assert_eq!(pi[2], 0.0);
        assert!((pi.iter().sum::<f64>() - 1.0).abs() < 1e-12);

        // The NaN covariance cannot be factored in the following E-step
        let err = client
            .emgm_fit_from(&data, &weights, &resp, &options)
            .unwrap_err();
        assert!(matches!(err, MixtureError::NotPositiveDefinite { .. }));
    }

    #[test]
    fn test_empty_component_inert_policy() {
        let (client, device) = setup();
        let data = two_clusters(&device, 17);
        let weights = unit_weights(&device, 2 * N_PER_CLUSTER);
        let resp = blob_responsibilities(&device, 3);

        let options = EmgmOptions {
            n_components: 3,
            empty_component: EmptyComponentPolicy::Inert,
            ..Default::default()
        };

        let model = client
            .emgm_fit_from(&data, &weights, &resp, &options)
            .unwrap();
        assert!(model.status.is_converged());

        let pi: Vec<f64> = model.params.weights.to_vec();
        assert_eq!(pi[2], 0.0);
        assert!((pi.iter().sum::<f64>() - 1.0).abs() < 1e-9);

        let means: Vec<f64> = model.params.means.to_vec();
        assert!(means.iter().all(|m| m.is_finite()));
        // Inert component sits at the pooled mean, halfway between the blobs
        assert!((means[2] - 5.0).abs() < 0.5 && (means[5] - 5.0).abs() < 0.5);
    }

    #[test]
    fn test_iteration_cap_reports_exhausted() {
        let (client, device) = setup();
        let data = two_clusters(&device, 19);
        let weights = unit_weights(&device, 2 * N_PER_CLUSTER);

        // A single component is stationary after one step; tol = 0 never passes.
        let options = EmgmOptions {
            n_components: 1,
            tol: 0.0,
            seed: Some(6),
            ..Default::default()
        };

        let model = client.emgm_fit(&data, &weights, &options).unwrap();
        assert_eq!(model.status, FitStatus::Exhausted { max_iter: 500 });
        assert_eq!(model.n_iter, 500);

        let pi: Vec<f64> = model.params.weights.to_vec();
        assert!((pi[0] - 1.0).abs() < 1e-12);
        let means: Vec<f64> = model.params.means.to_vec();
        assert!((means[0] - 5.0).abs() < 0.5 && (means[1] - 5.0).abs() < 0.5);
    }

    #[test]
    fn test_sample_weights_shift_the_fit() {
        let (client, device) = setup();
        let data = two_clusters(&device, 23);

        // Only the blob at (10, 10) carries weight
        let mut w = vec![0.0; 2 * N_PER_CLUSTER];
        w[N_PER_CLUSTER..].fill(1.0);
        let weights = Tensor::<CpuRuntime>::from_slice(&w, &[2 * N_PER_CLUSTER], &device);

        let options = EmgmOptions {
            n_components: 1,
            seed: Some(2),
            ..Default::default()
        };

        let model = client.emgm_fit(&data, &weights, &options).unwrap();
        let means: Vec<f64> = model.params.means.to_vec();
        assert!((means[0] - 10.0).abs() < 0.5 && (means[1] - 10.0).abs() < 0.5);
    }

    #[test]
    fn test_predict_proba_and_score() {
        let (client, device) = setup();
        let data = two_clusters(&device, 29);
        let weights = unit_weights(&device, 2 * N_PER_CLUSTER);

        let options = EmgmOptions {
            n_components: 2,
            seed: Some(10),
            ..Default::default()
        };
        let model = client.emgm_fit(&data, &weights, &options).unwrap();

        let query = Tensor::<CpuRuntime>::from_slice(&[0.2, 9.8, -0.1, 10.3], &[2, 2], &device);

        let proba = client.emgm_predict_proba(&model, &query).unwrap();
        assert_eq!(proba.shape(), &[2, 2]);
        assert_rows_sum_to_one(&proba);

        let labels: Vec<i64> = client.emgm_predict(&model, &query).unwrap().to_vec();
        assert_ne!(labels[0], labels[1]);

        let score: Vec<f64> = client.emgm_score(&model, &query).unwrap().to_vec();
        assert_eq!(score.len(), 2);
        assert!(score.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn test_fit_validates_inputs() {
        let (client, device) = setup();
        let data = two_clusters(&device, 31);

        let short_weights = unit_weights(&device, 10);
        let options = EmgmOptions {
            n_components: 2,
            ..Default::default()
        };
        assert!(matches!(
            client.emgm_fit(&data, &short_weights, &options),
            Err(MixtureError::ShapeMismatch { .. })
        ));

        let weights = unit_weights(&device, 2 * N_PER_CLUSTER);
        let too_many = EmgmOptions {
            n_components: 2 * N_PER_CLUSTER + 1,
            ..Default::default()
        };
        assert!(matches!(
            client.emgm_fit(&data, &weights, &too_many),
            Err(MixtureError::InvalidParameter { .. })
        ));

        let bad_resp = blob_responsibilities(&device, 3);
        assert!(matches!(
            client.emgm_fit_from(&data, &weights, &bad_resp, &options),
            Err(MixtureError::ShapeMismatch { .. })
        ));
    }
}
