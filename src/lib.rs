//! emgm - Weighted Gaussian Mixture Models fitted by Expectation-Maximization
//!
//! emgm fits a k-component multivariate normal mixture with full covariances to
//! weighted samples. Initial responsibilities come from K-Means labels; the fit then
//! alternates M-step and E-step until the relative change of the weighted
//! log-likelihood drops below a tolerance or the iteration cap is reached.
//! Built on numr's tensor primitives, it works across all backends (CPU, CUDA, WebGPU).
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                       emgm                               │
//! │   (EM driver, E-step, M-step, log-pdf, K-Means init)    │
//! └──────────────────────────┬──────────────────────────────┘
//!                            │ uses
//! ┌──────────────────────────▼──────────────────────────────┐
//! │                       numr                               │
//! │     (tensors, reductions, matmul, solve, distances)     │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! Each algorithm is split into three layers:
//!
//! - `traits/` - the public algorithm trait, options and result types
//! - `impl_generic/` - one implementation generic over `R: Runtime`
//! - `cpu/`, `cuda/`, `wgpu/` - backend clients delegating to the generic code
//!
//! # Data Layout
//!
//! Samples are stored column-wise:
//!
//! | Tensor | Shape |
//! |--------|-------|
//! | data | `[d, n]` |
//! | sample weights | `[n]` |
//! | responsibilities | `[n, k]` |
//! | means | `[d, k]` |
//! | covariances | `[k, d, d]` |
//! | mixing weights | `[k]` |
//!
//! # Feature Flags
//!
//! | Feature | Description | Dependencies |
//! |---------|-------------|--------------|
//! | `cuda`  | Enable CUDA GPU acceleration | CUDA 12.x, numr/cuda |
//! | `wgpu`  | Enable WebGPU cross-platform GPU | numr/wgpu |
//!
//! ## Backend Limitations
//!
//! - **WebGPU**: Only supports F32 precision (no F64)
//! - Covariance factorization runs on the host, one `[d, d]` transfer per component
//!
//! # Example
//!
//! ```ignore
//! use emgm::{EmgmAlgorithms, EmgmOptions};
//! use numr::runtime::cpu::{CpuClient, CpuDevice};
//! use numr::tensor::Tensor;
//!
//! let device = CpuDevice::new();
//! let client = CpuClient::new(device.clone());
//!
//! // Six 2-D samples, stored as [d, n]
//! let data = Tensor::from_slice(
//!     &[0.0, 0.1, -0.2, 5.0, 5.1, 4.9, 0.0, 0.2, 0.1, 5.0, 4.8, 5.2],
//!     &[2, 6],
//!     &device,
//! );
//! let weights = Tensor::from_slice(&[1.0; 6], &[6], &device);
//!
//! let options = EmgmOptions { n_components: 2, seed: Some(0), ..Default::default() };
//! let model = client.emgm_fit(&data, &weights, &options)?;
//! println!("{:?} after {} iterations", model.status, model.n_iter);
//! ```

pub mod cluster;

pub use cluster::{
    EmgmAlgorithms, EmgmModel, EmgmOptions, EmptyComponentPolicy, ExpectationResult, FitStatus,
    KMeansAlgorithms, KMeansInit, KMeansOptions, KMeansResult, MixtureDensityAlgorithms,
    MixtureError, MixtureParams, MixtureResult,
};

// Re-export numr types that users will commonly need
pub use numr::dtype::DType;
pub use numr::error::{Error, Result};
pub use numr::runtime::{Runtime, RuntimeClient};
pub use numr::tensor::Tensor;
