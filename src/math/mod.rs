//! Mathematical utilities: label-addressed covariances and simple statistics.

pub mod covariance;
pub mod stats;

pub use covariance::*;
pub use stats::*;
