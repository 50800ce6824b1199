//! Clustering and Gaussian mixture models.
//!
//! Provides K-Means and weighted Gaussian mixture fitting by soft EM
//! with full backend support (CPU, CUDA, WebGPU).

mod cpu;
pub mod error;
pub mod impl_generic;
pub mod traits;
mod validation;

#[cfg(feature = "cuda")]
mod cuda;
#[cfg(feature = "wgpu")]
mod wgpu;

pub use error::{MixtureError, MixtureResult};
pub use traits::density::MixtureDensityAlgorithms;
pub use traits::emgm::{
    EmgmAlgorithms, EmgmModel, EmgmOptions, EmptyComponentPolicy, ExpectationResult, FitStatus,
    MixtureParams,
};
pub use traits::kmeans::{KMeansAlgorithms, KMeansInit, KMeansOptions, KMeansResult};
pub use validation::*;
