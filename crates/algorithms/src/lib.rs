//! # Compositar Algorithms
//!
//! The annual composite synthesis engine:
//!
//! - **masking**: QA bit-flag cloud/shadow masking
//! - **validation**: physical reflectance range validation with the sentinel
//! - **composite**: the fallback cascade and gap connectivity analysis
//! - **imagery**: normalized-difference spectral indices
//! - **statistics**: focal mean and region histograms
//! - **classification**: Otsu thresholding and binarization
//! - **diagnostics**: per-band missing-data bookkeeping
//! - **pipeline**: the sequential year-by-year driver

pub mod classification;
pub mod composite;
pub mod diagnostics;
pub mod imagery;
pub mod masking;
pub mod pipeline;
pub mod statistics;
pub mod validation;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::classification::{binarize, otsu_threshold, otsu_threshold_for};
    pub use crate::composite::{
        build_annual_composite, AnnualComposite, CascadeParams, Connectivity,
    };
    pub use crate::diagnostics::{band_diagnostics, BandDiagnostics};
    pub use crate::imagery::{ndbi, ndvi, ndwi, normalized_difference};
    pub use crate::masking::{usable_mask, QaPixel};
    pub use crate::pipeline::{run_pipeline, ExportSink, PipelineParams, SceneSource, YearSummary};
    pub use crate::statistics::{focal_mean, region_histogram, Histogram, HistogramParams};
    pub use crate::validation::{validate_reflectance, BandValidity};
    pub use compositar_core::prelude::*;
}
