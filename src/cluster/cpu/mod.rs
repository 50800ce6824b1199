//! CPU implementations of clustering and mixture algorithms.

mod density;
mod emgm;
mod kmeans;
