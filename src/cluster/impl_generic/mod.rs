//! Generic clustering and mixture-model implementations.

pub mod density;
pub mod emgm;
pub mod helpers;
pub mod kmeans;

pub use density::{DensityClient, log_gauss_pdf_impl, logsumexp_impl};
pub use emgm::{
    EmgmClient, emgm_expectation_impl, emgm_fit_from_impl, emgm_fit_impl, emgm_initialize_impl,
    emgm_maximization_impl, emgm_predict_impl, emgm_predict_proba_impl, emgm_score_impl,
};
pub use kmeans::{KMeansClient, kmeans_impl, kmeans_predict_impl};
