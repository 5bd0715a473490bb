//! Statistical operations: focal mean and region histograms

mod focal;
mod histogram;

pub use focal::focal_mean;
pub use histogram::{region_histogram, Histogram, HistogramParams};
