//! Classification: Otsu thresholding and binarization

mod otsu;

pub use otsu::{binarize, otsu_threshold, otsu_threshold_for};
