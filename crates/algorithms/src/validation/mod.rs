//! Reflectance validation
//!
//! A reflectance pixel is valid iff its value lies in [0, 1] inclusive.
//! Everything else (NaN from masking, prior sentinels, out-of-range values,
//! pixels outside the study region) becomes the sentinel. Validating an
//! already-validated stack is a no-op.

use ndarray::Array2;
use rayon::prelude::*;
use serde::Serialize;

use compositar_core::raster::{BandStack, SENTINEL};
use compositar_core::{Region, Result};

/// Physical reflectance range, inclusive
pub const VALID_MIN: f64 = 0.0;
pub const VALID_MAX: f64 = 1.0;

/// Whether a value is a valid reflectance
#[inline]
pub fn is_valid_reflectance(value: f64) -> bool {
    (VALID_MIN..=VALID_MAX).contains(&value)
}

/// Per-band validity statistic attached to a validated stack
#[derive(Debug, Clone, Serialize)]
pub struct BandValidity {
    pub band: String,
    /// Fraction of region pixels holding a valid reflectance
    pub valid_fraction: f64,
}

/// Validate a band stack against the physical reflectance range.
///
/// Returns the validated stack (valid pixels unchanged, invalid pixels set
/// to [`SENTINEL`], nodata recorded as the sentinel) together with the
/// per-band valid fraction over the region.
pub fn validate_reflectance(
    stack: &BandStack,
    region: &Region,
) -> Result<(BandStack, Vec<BandValidity>)> {
    let mut validity = Vec::with_capacity(stack.num_bands());
    let region_pixels = region.pixel_count();

    let validated = stack.map_bands(|name, band| {
        let (rows, cols) = band.shape();

        let rows_out: Vec<(Vec<f64>, usize)> = (0..rows)
            .into_par_iter()
            .map(|row| {
                let mut row_data = vec![SENTINEL; cols];
                let mut valid_in_region = 0usize;
                for (col, out) in row_data.iter_mut().enumerate() {
                    let v = unsafe { band.get_unchecked(row, col) };
                    if region.contains(row, col) && is_valid_reflectance(v) {
                        *out = v;
                        valid_in_region += 1;
                    }
                }
                (row_data, valid_in_region)
            })
            .collect();

        let mut data = Vec::with_capacity(rows * cols);
        let mut valid_count = 0usize;
        for (row_data, n) in rows_out {
            data.extend(row_data);
            valid_count += n;
        }

        validity.push(BandValidity {
            band: name.to_string(),
            valid_fraction: if region_pixels > 0 {
                valid_count as f64 / region_pixels as f64
            } else {
                0.0
            },
        });

        let mut output = band.with_same_meta::<f64>(rows, cols);
        output.set_nodata(Some(SENTINEL));
        *output.data_mut() = Array2::from_shape_vec((rows, cols), data)
            .map_err(|e| compositar_core::Error::Other(e.to_string()))?;
        Ok(output)
    })?;

    Ok((validated, validity))
}

#[cfg(test)]
mod tests {
    use super::*;
    use compositar_core::raster::Raster;

    fn stack_from(values: Vec<f64>, rows: usize, cols: usize) -> BandStack {
        let band = Raster::from_vec(values, rows, cols).unwrap();
        BandStack::new(vec!["SR_B1".to_string()], vec![band]).unwrap()
    }

    #[test]
    fn test_out_of_range_becomes_sentinel() {
        let stack = stack_from(vec![0.5, 1.5, -0.1, f64::NAN], 2, 2);
        let region = Region::full(2, 2);

        let (validated, _) = validate_reflectance(&stack, &region).unwrap();
        let band = validated.band("SR_B1").unwrap();
        assert_eq!(band.get(0, 0).unwrap(), 0.5);
        assert_eq!(band.get(0, 1).unwrap(), SENTINEL);
        assert_eq!(band.get(1, 0).unwrap(), SENTINEL);
        assert_eq!(band.get(1, 1).unwrap(), SENTINEL);
    }

    #[test]
    fn test_range_boundaries_inclusive() {
        let stack = stack_from(vec![0.0, 1.0, 0.5, 0.9999], 2, 2);
        let region = Region::full(2, 2);

        let (validated, validity) = validate_reflectance(&stack, &region).unwrap();
        let band = validated.band("SR_B1").unwrap();
        assert_eq!(band.get(0, 0).unwrap(), 0.0);
        assert_eq!(band.get(0, 1).unwrap(), 1.0);
        assert_eq!(validity[0].valid_fraction, 1.0);
    }

    #[test]
    fn test_idempotent() {
        let stack = stack_from(vec![0.5, 2.0, SENTINEL, 0.1], 2, 2);
        let region = Region::full(2, 2);

        let (once, stats_once) = validate_reflectance(&stack, &region).unwrap();
        let (twice, stats_twice) = validate_reflectance(&once, &region).unwrap();

        for (name, band) in once.iter() {
            let again = twice.band(name).unwrap();
            for row in 0..2 {
                for col in 0..2 {
                    assert_eq!(band.get(row, col).unwrap(), again.get(row, col).unwrap());
                }
            }
        }
        assert_eq!(stats_once[0].valid_fraction, stats_twice[0].valid_fraction);
    }

    #[test]
    fn test_outside_region_is_sentinel() {
        let stack = stack_from(vec![0.5; 4], 2, 2);
        let mut mask = ndarray::Array2::from_elem((2, 2), true);
        mask[(1, 1)] = false;
        let region = Region::from_mask(mask);

        let (validated, validity) = validate_reflectance(&stack, &region).unwrap();
        let band = validated.band("SR_B1").unwrap();
        assert_eq!(band.get(0, 0).unwrap(), 0.5);
        assert_eq!(band.get(1, 1).unwrap(), SENTINEL);
        // 3 of 3 region pixels valid
        assert_eq!(validity[0].valid_fraction, 1.0);
    }

    #[test]
    fn test_valid_fraction() {
        let stack = stack_from(vec![0.5, 2.0, 0.2, -1.0], 2, 2);
        let region = Region::full(2, 2);

        let (_, validity) = validate_reflectance(&stack, &region).unwrap();
        assert_eq!(validity[0].valid_fraction, 0.5);
    }
}
