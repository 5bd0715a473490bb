//! Annual composite fallback cascade
//!
//! Builds one year's cloud-free composite by folding candidate rasters in a
//! strict order: temporal median, best single scene, previous year's
//! composite, then focal-mean interpolation of small gaps. Each step only
//! touches pixels still invalid after the previous step, so the invalid set
//! shrinks monotonically.

use ndarray::Array2;
use rayon::prelude::*;

use compositar_core::raster::{BandStack, Raster, SENTINEL};
use compositar_core::{Error, Region, Result, Scene};

use crate::composite::gaps::{small_gap_mask, Connectivity};
use crate::masking::{apply_usable_mask, usable_mask};
use crate::statistics::focal_mean;
use crate::validation::{is_valid_reflectance, validate_reflectance, BandValidity};

/// Landsat Collection 2 Level 2 DN-to-reflectance scale factor
pub const REFLECTANCE_SCALE: f64 = 0.0000275;
/// Landsat Collection 2 Level 2 DN-to-reflectance offset
pub const REFLECTANCE_OFFSET: f64 = -0.2;

/// Tuning knobs of the fallback cascade
#[derive(Debug, Clone)]
pub struct CascadeParams {
    /// Largest gap component (in pixels) eligible for spatial interpolation
    pub small_gap_max: usize,
    /// Focal-mean window radius for small-gap filling
    pub fill_radius: usize,
    /// Adjacency used for gap component labeling
    pub connectivity: Connectivity,
}

impl Default for CascadeParams {
    fn default() -> Self {
        Self {
            small_gap_max: 100,
            fill_radius: 2,
            connectivity: Connectivity::Eight,
        }
    }
}

/// One year's finished composite plus its validity statistics
#[derive(Debug, Clone)]
pub struct AnnualComposite {
    pub year: i32,
    pub bands: BandStack,
    pub validity: Vec<BandValidity>,
}

/// Convert a scene's raw DN bands to cloud-masked reflectance.
///
/// QA-masked pixels become NaN; remaining values are scaled with the
/// Collection 2 factors. Range validation happens later.
pub fn masked_reflectance(scene: &Scene) -> Result<BandStack> {
    let mask = usable_mask(&scene.qa);
    let masked = apply_usable_mask(&scene.bands, &mask)?;
    masked.map_bands(|_, band| {
        let (rows, cols) = band.shape();
        let data: Vec<f64> = band
            .data()
            .iter()
            .map(|&v| v * REFLECTANCE_SCALE + REFLECTANCE_OFFSET)
            .collect();
        let mut output = band.with_same_meta::<f64>(rows, cols);
        output.set_nodata(Some(f64::NAN));
        *output.data_mut() = Array2::from_shape_vec((rows, cols), data)
            .map_err(|e| Error::Other(e.to_string()))?;
        Ok(output)
    })
}

/// Per-band pixel-wise median across scenes, ignoring NaN.
///
/// A pixel observed by no scene stays NaN. All stacks must share one schema.
pub fn temporal_median(stacks: &[BandStack]) -> Result<BandStack> {
    let first = stacks
        .first()
        .ok_or_else(|| Error::Algorithm("temporal median of zero scenes".to_string()))?;
    for other in &stacks[1..] {
        first.check_compatible(other)?;
    }

    first.map_bands(|name, band| {
        let (rows, cols) = band.shape();
        let sources: Vec<&Raster<f64>> = stacks
            .iter()
            .map(|s| s.band(name))
            .collect::<Result<_>>()?;

        let data: Vec<f64> = (0..rows)
            .into_par_iter()
            .flat_map(|row| {
                let mut row_data = vec![f64::NAN; cols];
                let mut values: Vec<f64> = Vec::with_capacity(sources.len());
                for (col, out) in row_data.iter_mut().enumerate() {
                    values.clear();
                    for src in &sources {
                        let v = unsafe { src.get_unchecked(row, col) };
                        if !v.is_nan() {
                            values.push(v);
                        }
                    }
                    if values.is_empty() {
                        continue;
                    }
                    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
                    let mid = values.len() / 2;
                    *out = if values.len() % 2 == 0 {
                        (values[mid - 1] + values[mid]) / 2.0
                    } else {
                        values[mid]
                    };
                }
                row_data
            })
            .collect();

        let mut output = band.with_same_meta::<f64>(rows, cols);
        output.set_nodata(Some(f64::NAN));
        *output.data_mut() = Array2::from_shape_vec((rows, cols), data)
            .map_err(|e| Error::Other(e.to_string()))?;
        Ok(output)
    })
}

/// Replace still-invalid pixels of `target` with valid pixels of `candidate`.
///
/// A candidate pixel is taken only when it lies in [0, 1], so feeding a
/// previous composite through here re-validates it implicitly. Valid target
/// pixels are never touched.
fn fill_where_invalid(target: &mut BandStack, candidate: &BandStack) -> Result<()> {
    target.check_compatible(candidate)?;

    let names: Vec<String> = target.names().to_vec();
    for name in &names {
        let replacement = candidate.band(name)?;
        let band = target.band_mut(name)?;
        let (rows, cols) = band.shape();
        for row in 0..rows {
            for col in 0..cols {
                let current = unsafe { band.get_unchecked(row, col) };
                if is_valid_reflectance(current) {
                    continue;
                }
                let fresh = unsafe { replacement.get_unchecked(row, col) };
                if is_valid_reflectance(fresh) {
                    band.set(row, col, fresh)?;
                }
            }
        }
    }
    Ok(())
}

/// Gap mask of a validated band: in-region pixels without a valid value
fn gap_mask(band: &Raster<f64>, region: &Region) -> Array2<bool> {
    let (rows, cols) = band.shape();
    let mut mask = Array2::from_elem((rows, cols), false);
    for row in 0..rows {
        for col in 0..cols {
            let v = unsafe { band.get_unchecked(row, col) };
            if region.contains(row, col) && !is_valid_reflectance(v) {
                mask[(row, col)] = true;
            }
        }
    }
    mask
}

/// Step 4: focal-mean interpolation restricted to small gap components.
///
/// The gap mask comes from the first schema band; eligible pixels in every
/// band are filled from the focal mean of that band's currently valid
/// pixels. Gap pixels with no valid neighbor remain sentinel.
fn fill_small_gaps(
    composite: &mut BandStack,
    region: &Region,
    params: &CascadeParams,
) -> Result<()> {
    let gaps = gap_mask(composite.first(), region);
    let small = small_gap_mask(&gaps, params.connectivity, params.small_gap_max);
    if !small.iter().any(|&m| m) {
        return Ok(());
    }

    let names: Vec<String> = composite.names().to_vec();
    for name in &names {
        let band = composite.band(name)?;
        let (rows, cols) = band.shape();

        // Interpolation source: valid reflectance only
        let mut source = band.with_same_meta::<f64>(rows, cols);
        source.set_nodata(Some(f64::NAN));
        *source.data_mut() = band.data().mapv(|v| {
            if is_valid_reflectance(v) {
                v
            } else {
                f64::NAN
            }
        });

        let smoothed = focal_mean(&source, params.fill_radius)?;

        let band = composite.band_mut(name)?;
        for row in 0..rows {
            for col in 0..cols {
                if !small[(row, col)] {
                    continue;
                }
                let current = unsafe { band.get_unchecked(row, col) };
                if is_valid_reflectance(current) {
                    continue;
                }
                let fill = unsafe { smoothed.get_unchecked(row, col) };
                if is_valid_reflectance(fill) {
                    band.set(row, col, fill)?;
                }
            }
        }
    }
    Ok(())
}

/// Build the annual composite for one year through the full cascade.
///
/// `previous` is the finished composite of the preceding year, absent for
/// the first processed year (step 3 is then skipped). A year with no scenes
/// starts from an all-sentinel candidate and relies on the remaining steps.
pub fn build_annual_composite(
    year: i32,
    scenes: &[Scene],
    previous: Option<&BandStack>,
    region: &Region,
    params: &CascadeParams,
) -> Result<AnnualComposite> {
    // Step 1: temporal median of all cloud-masked scenes
    let mut composite = if scenes.is_empty() {
        let template = previous.ok_or(Error::EmptyYear(year))?;
        BandStack::filled_like(template, SENTINEL)
    } else {
        let masked: Vec<BandStack> = scenes
            .iter()
            .map(masked_reflectance)
            .collect::<Result<_>>()?;
        let median = temporal_median(&masked)?;
        let (validated, _) = validate_reflectance(&median, region)?;
        validated
    };

    // Step 2: best single scene by cloud-cover metadata
    if !scenes.is_empty() {
        let best = scenes
            .iter()
            .min_by(|a, b| {
                a.cloud_cover
                    .partial_cmp(&b.cloud_cover)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .expect("non-empty scene list");
        let best_bands = masked_reflectance(best)?;
        let (best_valid, _) = validate_reflectance(&best_bands, region)?;
        fill_where_invalid(&mut composite, &best_valid)?;
    }

    // Step 3: previous year's composite, re-validated pixel by pixel
    if let Some(prev) = previous {
        fill_where_invalid(&mut composite, prev)?;
    }

    // Step 4: spatial interpolation of small gaps only
    fill_small_gaps(&mut composite, region, params)?;

    // Step 5: final validation clamps the result to [0, 1] or sentinel
    let (bands, validity) = validate_reflectance(&composite, region)?;

    Ok(AnnualComposite {
        year,
        bands,
        validity,
    })
}
