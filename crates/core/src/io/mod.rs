//! Raster I/O

mod native;

pub use native::{read_geotiff, write_geotiff};
