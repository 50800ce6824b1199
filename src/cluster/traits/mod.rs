//! Clustering and mixture-model algorithm traits.

pub mod density;
pub mod emgm;
pub mod kmeans;
