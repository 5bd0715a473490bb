//! Spectral indices derived from annual composites
//!
//! Normalized differences between Landsat surface reflectance bands.
//! Sentinel/nodata pixels and zero-sum denominators produce NaN.

use ndarray::Array2;
use rayon::prelude::*;

use compositar_core::raster::{BandStack, Raster, RasterElement};
use compositar_core::{Error, Result};

/// Compute the normalized difference between two bands:
///
/// `(band_a - band_b) / (band_a + band_b)`
///
/// Result is in the range [-1, 1]. Pixels where either band is nodata, or
/// where the sum is (near) zero, are set to NaN.
pub fn normalized_difference(band_a: &Raster<f64>, band_b: &Raster<f64>) -> Result<Raster<f64>> {
    check_dimensions(band_a, band_b)?;

    let (rows, cols) = band_a.shape();
    let nodata_a = band_a.nodata();
    let nodata_b = band_b.nodata();

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                let a = unsafe { band_a.get_unchecked(row, col) };
                let b = unsafe { band_b.get_unchecked(row, col) };

                if a.is_nodata(nodata_a) || b.is_nodata(nodata_b) {
                    continue;
                }

                let sum = a + b;
                if sum.abs() < 1e-10 {
                    continue; // Avoid division by zero
                }

                *out = (a - b) / sum;
            }
            row_data
        })
        .collect();

    let mut output = band_a.with_same_meta::<f64>(rows, cols);
    output.set_nodata(Some(f64::NAN));
    *output.data_mut() =
        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;
    Ok(output)
}

/// Normalized Difference Vegetation Index
///
/// `NDVI = (NIR - Red) / (NIR + Red)` — Landsat 8: (SR_B5, SR_B4)
pub fn ndvi(composite: &BandStack) -> Result<Raster<f64>> {
    normalized_difference(composite.band("SR_B5")?, composite.band("SR_B4")?)
}

/// Normalized Difference Water Index (McFeeters)
///
/// `NDWI = (Green - NIR) / (Green + NIR)` — Landsat 8: (SR_B3, SR_B5)
pub fn ndwi(composite: &BandStack) -> Result<Raster<f64>> {
    normalized_difference(composite.band("SR_B3")?, composite.band("SR_B5")?)
}

/// Normalized Difference Built-up Index
///
/// `NDBI = (SWIR1 - NIR) / (SWIR1 + NIR)` — Landsat 8: (SR_B6, SR_B5)
pub fn ndbi(composite: &BandStack) -> Result<Raster<f64>> {
    normalized_difference(composite.band("SR_B6")?, composite.band("SR_B5")?)
}

fn check_dimensions(a: &Raster<f64>, b: &Raster<f64>) -> Result<()> {
    if a.shape() != b.shape() {
        return Err(Error::SizeMismatch {
            er: a.rows(),
            ec: a.cols(),
            ar: b.rows(),
            ac: b.cols(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use compositar_core::SENTINEL;

    fn make_band(rows: usize, cols: usize, value: f64) -> Raster<f64> {
        Raster::filled(rows, cols, value)
    }

    #[test]
    fn test_normalized_difference_basic() {
        let a = make_band(5, 5, 0.8);
        let b = make_band(5, 5, 0.2);

        let result = normalized_difference(&a, &b).unwrap();
        let val = result.get(2, 2).unwrap();

        // (0.8 - 0.2) / (0.8 + 0.2) = 0.6
        assert!((val - 0.6).abs() < 1e-10, "Expected 0.6, got {}", val);
    }

    #[test]
    fn test_sentinel_nodata_propagates_as_nan() {
        let mut a = make_band(3, 3, 0.5);
        a.set_nodata(Some(SENTINEL));
        a.set(1, 1, SENTINEL).unwrap();
        let b = make_band(3, 3, 0.1);

        let result = normalized_difference(&a, &b).unwrap();
        assert!(result.get(1, 1).unwrap().is_nan());
        assert!(!result.get(0, 0).unwrap().is_nan());
    }

    #[test]
    fn test_zero_sum_is_nan() {
        let a = make_band(3, 3, 0.0);
        let b = make_band(3, 3, 0.0);

        let result = normalized_difference(&a, &b).unwrap();
        assert!(result.get(1, 1).unwrap().is_nan());
    }

    #[test]
    fn test_dimension_mismatch() {
        let a = make_band(5, 5, 1.0);
        let b = make_band(5, 10, 1.0);
        assert!(normalized_difference(&a, &b).is_err());
    }

    #[test]
    fn test_index_band_selection() {
        let names: Vec<String> = compositar_core::LANDSAT_SR_BANDS
            .iter()
            .map(|s| s.to_string())
            .collect();
        // SR_B1..SR_B7 filled with 0.1..0.7
        let bands = (1..=7)
            .map(|i| make_band(3, 3, i as f64 / 10.0))
            .collect();
        let stack = BandStack::new(names, bands).unwrap();

        // NDVI = (0.5 - 0.4) / (0.5 + 0.4)
        let v = ndvi(&stack).unwrap().get(1, 1).unwrap();
        assert!((v - (0.1 / 0.9)).abs() < 1e-10);

        // NDWI = (0.3 - 0.5) / (0.3 + 0.5) < 0
        let w = ndwi(&stack).unwrap().get(1, 1).unwrap();
        assert!(w < 0.0);

        // NDBI = (0.6 - 0.5) / (0.6 + 0.5) > 0
        let b = ndbi(&stack).unwrap().get(1, 1).unwrap();
        assert!(b > 0.0);
    }
}
