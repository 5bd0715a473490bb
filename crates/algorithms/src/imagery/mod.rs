//! Imagery algorithms: spectral indices

mod indices;

pub use indices::{ndbi, ndvi, ndwi, normalized_difference};
