//! Otsu histogram thresholding
//!
//! Selects the split maximizing between-class variance. Splits that leave a
//! zero-count side have an undefined class mean and are excluded from
//! candidacy; the first maximum encountered wins ties, so the lowest
//! qualifying split index is always returned.

use ndarray::Array2;
use rayon::prelude::*;

use compositar_core::raster::{Raster, RasterElement};
use compositar_core::{Error, Region, Result};

use crate::statistics::{region_histogram, Histogram, HistogramParams};

/// Compute the Otsu threshold from a histogram.
///
/// For each split index `i` in `[1, n-1]` scores
/// `w0 * w1 * (mu0 - mu1)^2` and returns the bucket mean at the best split.
/// Fails if every split is degenerate (all mass in a single bin).
pub fn otsu_threshold(hist: &Histogram) -> Result<f64> {
    let n = hist.counts.len();
    if n < 2 {
        return Err(Error::Algorithm(
            "Otsu needs at least two histogram bins".to_string(),
        ));
    }

    let total: u64 = hist.total();
    if total == 0 {
        return Err(Error::Algorithm("empty histogram".to_string()));
    }
    let total_f = total as f64;
    let weighted_total: f64 = hist
        .counts
        .iter()
        .zip(&hist.means)
        .map(|(&c, &m)| c as f64 * m)
        .sum();

    let mut best_score = f64::NEG_INFINITY;
    let mut best_split: Option<usize> = None;

    let mut count_below = 0u64;
    let mut weighted_below = 0.0;

    for i in 1..n {
        count_below += hist.counts[i - 1];
        weighted_below += hist.counts[i - 1] as f64 * hist.means[i - 1];

        let count_above = total - count_below;
        // A zero-count side has an undefined mean (0/0); the split is not a
        // candidate rather than a NaN that would poison the max.
        if count_below == 0 || count_above == 0 {
            continue;
        }

        let w0 = count_below as f64 / total_f;
        let w1 = count_above as f64 / total_f;
        let mu0 = weighted_below / count_below as f64;
        let mu1 = (weighted_total - weighted_below) / count_above as f64;

        let score = w0 * w1 * (mu0 - mu1) * (mu0 - mu1);
        // Strictly greater: ties keep the lowest qualifying index
        if score > best_score {
            best_score = score;
            best_split = Some(i);
        }
    }

    match best_split {
        Some(i) => Ok(hist.means[i]),
        None => Err(Error::Algorithm(
            "degenerate histogram: no valid Otsu split".to_string(),
        )),
    }
}

/// Build a region histogram for a band and compute its Otsu threshold
pub fn otsu_threshold_for(
    raster: &Raster<f64>,
    region: &Region,
    params: &HistogramParams,
) -> Result<f64> {
    let hist = region_histogram(raster, region, params)?;
    otsu_threshold(&hist)
}

/// Binarize a band against a threshold: `value > threshold` becomes 1,
/// everything else (including nodata/NaN) becomes 0.
pub fn binarize(raster: &Raster<f64>, threshold: f64) -> Raster<u8> {
    let (rows, cols) = raster.shape();
    let nodata = raster.nodata();

    let data: Vec<u8> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![0u8; cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                let v = unsafe { raster.get_unchecked(row, col) };
                if !v.is_nodata(nodata) && v > threshold {
                    *out = 1;
                }
            }
            row_data
        })
        .collect();

    let mut output = raster.with_same_meta::<u8>(rows, cols);
    *output.data_mut() =
        Array2::from_shape_vec((rows, cols), data).expect("binarized shape matches source");
    output
}
