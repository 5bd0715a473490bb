//! Per-band missing-data diagnostics

use ndarray::Array2;
use serde::Serialize;
use tracing::info;

use compositar_core::raster::{BandStack, SENTINEL};
use compositar_core::Region;

/// Missing-data record for one (year, band) pair
#[derive(Debug, Clone, Serialize)]
pub struct BandDiagnostics {
    pub year: i32,
    pub band: String,
    pub missing_count: usize,
    pub total_count: usize,
    pub missing_percent: f64,
}

/// Count sentinel pixels per band over the region.
///
/// One record per schema band, also emitted as a `tracing` event.
pub fn band_diagnostics(year: i32, composite: &BandStack, region: &Region) -> Vec<BandDiagnostics> {
    let total_count = region.pixel_count();
    let mut records = Vec::with_capacity(composite.num_bands());

    for (name, band) in composite.iter() {
        let (rows, cols) = band.shape();
        let mut missing_count = 0usize;
        for row in 0..rows {
            for col in 0..cols {
                if !region.contains(row, col) {
                    continue;
                }
                if unsafe { band.get_unchecked(row, col) } == SENTINEL {
                    missing_count += 1;
                }
            }
        }

        let missing_percent = if total_count > 0 {
            missing_count as f64 / total_count as f64 * 100.0
        } else {
            0.0
        };

        info!(
            year,
            band = name,
            missing_count,
            total_count,
            missing_percent,
            "composite band diagnostics"
        );

        records.push(BandDiagnostics {
            year,
            band: name.to_string(),
            missing_count,
            total_count,
            missing_percent,
        });
    }

    records
}

/// Union mask: in-region pixels where any band is missing
pub fn any_missing_mask(composite: &BandStack, region: &Region) -> Array2<bool> {
    let (rows, cols) = composite.shape();
    let mut mask = Array2::from_elem((rows, cols), false);

    for (_, band) in composite.iter() {
        for row in 0..rows {
            for col in 0..cols {
                if region.contains(row, col)
                    && unsafe { band.get_unchecked(row, col) } == SENTINEL
                {
                    mask[(row, col)] = true;
                }
            }
        }
    }

    mask
}

#[cfg(test)]
mod tests {
    use super::*;
    use compositar_core::raster::Raster;

    fn two_band_stack() -> BandStack {
        let mut b1 = Raster::filled(4, 4, 0.5);
        b1.set(0, 0, SENTINEL).unwrap();
        b1.set(0, 1, SENTINEL).unwrap();
        let mut b2 = Raster::filled(4, 4, 0.3);
        b2.set(3, 3, SENTINEL).unwrap();
        BandStack::new(
            vec!["SR_B1".to_string(), "SR_B2".to_string()],
            vec![b1, b2],
        )
        .unwrap()
    }

    #[test]
    fn test_band_diagnostics_counts() {
        let stack = two_band_stack();
        let region = Region::full(4, 4);
        let records = band_diagnostics(2020, &stack, &region);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].band, "SR_B1");
        assert_eq!(records[0].missing_count, 2);
        assert_eq!(records[0].total_count, 16);
        assert!((records[0].missing_percent - 12.5).abs() < 1e-10);
        assert_eq!(records[1].missing_count, 1);
    }

    #[test]
    fn test_diagnostics_respect_region() {
        let stack = two_band_stack();
        let mut mask = Array2::from_elem((4, 4), true);
        mask[(0, 0)] = false; // Exclude one missing pixel
        let region = Region::from_mask(mask);

        let records = band_diagnostics(2020, &stack, &region);
        assert_eq!(records[0].missing_count, 1);
        assert_eq!(records[0].total_count, 15);
    }

    #[test]
    fn test_any_missing_union() {
        let stack = two_band_stack();
        let region = Region::full(4, 4);
        let mask = any_missing_mask(&stack, &region);

        assert!(mask[(0, 0)]);
        assert!(mask[(0, 1)]);
        assert!(mask[(3, 3)]);
        assert!(!mask[(1, 1)]);
        assert_eq!(mask.iter().filter(|&&m| m).count(), 3);
    }
}
