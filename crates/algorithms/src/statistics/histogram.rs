//! Region-bounded histograms with a fixed computation budget
//!
//! Histograms drive Otsu thresholding. The aggregation is exact while the
//! region's valid-pixel count stays within `max_pixels`; beyond that the
//! values are strided down to the budget and the result is flagged
//! approximate. That downgrade is a deliberate accuracy/cost trade-off,
//! not an error.

use compositar_core::raster::{Raster, RasterElement};
use compositar_core::{Error, Region, Result};
use tracing::debug;

/// Parameters for histogram construction
#[derive(Debug, Clone)]
pub struct HistogramParams {
    /// Number of bins
    pub bins: usize,
    /// Maximum number of pixels aggregated exactly
    pub max_pixels: usize,
}

impl Default for HistogramParams {
    fn default() -> Self {
        Self {
            bins: 255,
            max_pixels: 100_000_000,
        }
    }
}

/// Histogram of a band over a region: per-bin counts and bucket means
#[derive(Debug, Clone)]
pub struct Histogram {
    /// Per-bin counts
    pub counts: Vec<u64>,
    /// Per-bin bucket means (bin centers)
    pub means: Vec<f64>,
    /// Whether the computation budget forced sampled aggregation
    pub approximate: bool,
}

impl Histogram {
    /// Total count across all bins
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }
}

/// Build a histogram of a band's valid values within a region.
///
/// Bins span [min, max] of the aggregated values. When the valid-pixel count
/// exceeds `params.max_pixels`, values are taken with a deterministic stride
/// so at most the budget contributes, and the histogram is flagged
/// approximate.
pub fn region_histogram(
    raster: &Raster<f64>,
    region: &Region,
    params: &HistogramParams,
) -> Result<Histogram> {
    if params.bins == 0 {
        return Err(Error::InvalidParameter {
            name: "bins",
            value: "0".to_string(),
            reason: "histogram needs at least one bin".to_string(),
        });
    }

    let (rows, cols) = raster.shape();
    if region.shape() != (rows, cols) {
        let (ar, ac) = region.shape();
        return Err(Error::SizeMismatch {
            er: rows,
            ec: cols,
            ar,
            ac,
        });
    }

    let nodata = raster.nodata();
    let mut values: Vec<f64> = Vec::new();
    for row in 0..rows {
        for col in 0..cols {
            if !region.contains(row, col) {
                continue;
            }
            let v = unsafe { raster.get_unchecked(row, col) };
            if v.is_finite() && !v.is_nodata(nodata) {
                values.push(v);
            }
        }
    }

    if values.is_empty() {
        return Err(Error::Algorithm(
            "no valid pixels in region for histogram".to_string(),
        ));
    }

    let approximate = values.len() > params.max_pixels;
    if approximate {
        let stride = values.len().div_ceil(params.max_pixels);
        debug!(
            valid_pixels = values.len(),
            budget = params.max_pixels,
            stride,
            "histogram budget exceeded, downgrading to strided aggregation"
        );
        values = values.into_iter().step_by(stride).collect();
    }

    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for &v in &values {
        min = min.min(v);
        max = max.max(v);
    }

    let n = params.bins;
    let width = (max - min) / n as f64;
    let mut counts = vec![0u64; n];
    for &v in &values {
        let idx = if width > 0.0 {
            (((v - min) / width) as usize).min(n - 1)
        } else {
            0
        };
        counts[idx] += 1;
    }

    let means = (0..n)
        .map(|i| min + (i as f64 + 0.5) * width)
        .collect();

    Ok(Histogram {
        counts,
        means,
        approximate,
    })
}
