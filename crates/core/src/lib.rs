//! # Compositar Core
//!
//! Core types and I/O for the compositar annual compositing engine.
//!
//! This crate provides:
//! - `Raster<T>`: generic georeferenced raster grid
//! - `BandStack`: fixed-schema multi-band stack with the `-9999` sentinel
//! - `Scene`: one satellite acquisition (DN bands + QA grid + metadata)
//! - `Region`: study-area pixel mask rasterized from vector geometry
//! - Native GeoTIFF exchange

pub mod error;
pub mod io;
pub mod raster;
pub mod region;
pub mod scene;

pub use error::{Error, Result};
pub use raster::{BandStack, GeoTransform, Raster, RasterElement, LANDSAT_SR_BANDS, SENTINEL};
pub use region::Region;
pub use scene::Scene;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::raster::{
        BandStack, GeoTransform, Raster, RasterElement, LANDSAT_SR_BANDS, SENTINEL,
    };
    pub use crate::region::Region;
    pub use crate::scene::Scene;
}
