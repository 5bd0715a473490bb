//! Focal (moving window) mean
//!
//! Square-window local mean over valid cells, used as the fill value for
//! small composite gaps.

use ndarray::Array2;
use rayon::prelude::*;

use compositar_core::raster::{Raster, RasterElement};
use compositar_core::{Error, Result};

/// Compute the focal mean of a raster.
///
/// Window size is `2 * radius + 1` square. Nodata/NaN cells do not
/// contribute; a cell with no valid neighbor at all becomes NaN.
pub fn focal_mean(raster: &Raster<f64>, radius: usize) -> Result<Raster<f64>> {
    if radius == 0 {
        return Err(Error::InvalidParameter {
            name: "radius",
            value: "0".to_string(),
            reason: "focal radius must be > 0".to_string(),
        });
    }

    let (rows, cols) = raster.shape();
    let nodata = raster.nodata();
    let r = radius as isize;

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                let mut sum = 0.0;
                let mut count = 0usize;

                for dr in -r..=r {
                    for dc in -r..=r {
                        let nr = row as isize + dr;
                        let nc = col as isize + dc;
                        if nr < 0 || nc < 0 || nr >= rows as isize || nc >= cols as isize {
                            continue;
                        }
                        let v = unsafe { raster.get_unchecked(nr as usize, nc as usize) };
                        if v.is_nodata(nodata) {
                            continue;
                        }
                        sum += v;
                        count += 1;
                    }
                }

                if count > 0 {
                    *out = sum / count as f64;
                }
            }
            row_data
        })
        .collect();

    let mut output = raster.with_same_meta::<f64>(rows, cols);
    output.set_nodata(Some(f64::NAN));
    *output.data_mut() =
        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;
    Ok(output)
}
