//! Yearly pipeline driver
//!
//! Iterates years in order, threading the previous year's finished composite
//! into the next year's cascade, and per year derives the spectral indices,
//! the Otsu classification of NDBI, and the missing-data diagnostics. Years
//! never run concurrently: year Y depends on the finished composite of Y-1.

use serde::Serialize;
use tracing::{info, info_span, warn};

use compositar_core::raster::{BandStack, Raster};
use compositar_core::{Error, Region, Result, Scene};

use crate::classification::{binarize, otsu_threshold_for};
use crate::composite::{build_annual_composite, CascadeParams};
use crate::diagnostics::{any_missing_mask, band_diagnostics, BandDiagnostics};
use crate::imagery::{ndbi, ndvi, ndwi};
use crate::statistics::HistogramParams;
use crate::validation::BandValidity;

/// Raster source collaborator: delivers the filtered scenes of one year
pub trait SceneSource {
    fn scenes_for_year(&self, year: i32) -> Result<Vec<Scene>>;
}

/// Export sink collaborator: receives each year's products
pub trait ExportSink {
    /// The finished multi-band composite for a year
    fn export_composite(&mut self, year: i32, composite: &BandStack) -> Result<()>;

    /// A derived spectral index raster ("NDVI", "NDWI", "NDBI") for a year
    fn export_index(&mut self, year: i32, name: &str, index: &Raster<f64>) -> Result<()>;

    /// The NDBI classification threshold and binary raster for a year
    fn export_classification(
        &mut self,
        year: i32,
        threshold: f64,
        classified: &Raster<u8>,
    ) -> Result<()>;
}

/// Driver configuration
#[derive(Debug, Clone)]
pub struct PipelineParams {
    pub start_year: i32,
    pub end_year: i32,
    pub cascade: CascadeParams,
    pub histogram: HistogramParams,
}

impl Default for PipelineParams {
    fn default() -> Self {
        Self {
            start_year: 2013,
            end_year: 2024,
            cascade: CascadeParams::default(),
            histogram: HistogramParams::default(),
        }
    }
}

/// Per-year outcome of a pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct YearSummary {
    pub year: i32,
    /// Otsu threshold of NDBI; absent when the histogram was degenerate
    pub threshold: Option<f64>,
    pub diagnostics: Vec<BandDiagnostics>,
    /// In-region pixels missing in at least one band
    pub missing_any_count: usize,
    pub validity: Vec<BandValidity>,
}

/// Run the pipeline over the configured year range.
///
/// Left fold over the years: the finished composite of year Y becomes the
/// prior of year Y+1. A leading year with no scenes and no prior is logged
/// and skipped; later recoverable conditions (degenerate Otsu histogram)
/// downgrade that year's outputs instead of aborting the run.
pub fn run_pipeline<S, E>(
    source: &S,
    region: &Region,
    sink: &mut E,
    params: &PipelineParams,
) -> Result<Vec<YearSummary>>
where
    S: SceneSource,
    E: ExportSink,
{
    if params.end_year < params.start_year {
        return Err(Error::InvalidParameter {
            name: "end_year",
            value: params.end_year.to_string(),
            reason: format!("must not precede start year {}", params.start_year),
        });
    }

    let mut previous: Option<BandStack> = None;
    let mut summaries = Vec::new();

    for year in params.start_year..=params.end_year {
        let span = info_span!("year", year);
        let _guard = span.enter();

        let scenes = source.scenes_for_year(year)?;
        info!(scene_count = scenes.len(), "processing year");

        let annual = match build_annual_composite(
            year,
            &scenes,
            previous.as_ref(),
            region,
            &params.cascade,
        ) {
            Ok(annual) => annual,
            Err(Error::EmptyYear(_)) => {
                warn!("no scenes and no prior composite, skipping year");
                continue;
            }
            Err(e) => return Err(e),
        };

        let diagnostics = band_diagnostics(year, &annual.bands, region);
        let missing_any_count = any_missing_mask(&annual.bands, region)
            .iter()
            .filter(|&&m| m)
            .count();

        // Derived indices; NDVI and NDWI accompany the built-up proxy that
        // drives the classification
        let vegetation = ndvi(&annual.bands)?;
        let water = ndwi(&annual.bands)?;
        let built_up = ndbi(&annual.bands)?;
        sink.export_index(year, "NDVI", &vegetation)?;
        sink.export_index(year, "NDWI", &water)?;
        sink.export_index(year, "NDBI", &built_up)?;

        let threshold = match otsu_threshold_for(&built_up, region, &params.histogram) {
            Ok(t) => {
                info!(threshold = t, "NDBI Otsu threshold");
                let classified = binarize(&built_up, t);
                sink.export_classification(year, t, &classified)?;
                Some(t)
            }
            Err(e) => {
                warn!(error = %e, "no usable NDBI threshold for year");
                None
            }
        };

        sink.export_composite(year, &annual.bands)?;

        summaries.push(YearSummary {
            year,
            threshold,
            diagnostics,
            missing_any_count,
            validity: annual.validity,
        });

        previous = Some(annual.bands);
    }

    Ok(summaries)
}
