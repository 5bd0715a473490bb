//! Cloud and shadow masking from packed QA bit flags
//!
//! Landsat Collection 2 QA_PIXEL layout: single-bit flags for fill (bit 0),
//! dilated cloud (1), cirrus (2), cloud (3), cloud shadow (4) and snow (5),
//! plus 2-bit confidence fields for cloud (bits 8-9) and cloud shadow
//! (bits 10-11).

use ndarray::Array2;
use rayon::prelude::*;

use compositar_core::raster::{BandStack, Raster};

const FILL_BIT: u16 = 0;
const DILATED_CLOUD_BIT: u16 = 1;
const CIRRUS_BIT: u16 = 2;
const CLOUD_BIT: u16 = 3;
const CLOUD_SHADOW_BIT: u16 = 4;
const SNOW_BIT: u16 = 5;
const CLOUD_CONFIDENCE_OFFSET: u16 = 8;
const SHADOW_CONFIDENCE_OFFSET: u16 = 10;

/// Confidence values below this are accepted (none/low)
const MAX_ACCEPTED_CONFIDENCE: u8 = 2;

/// Typed accessor over one packed QA_PIXEL value.
///
/// Extractions never mutate the word; each call reads a named bit or field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QaPixel(pub u16);

impl QaPixel {
    fn flag(self, bit: u16) -> bool {
        (self.0 >> bit) & 1 == 1
    }

    fn field2(self, offset: u16) -> u8 {
        ((self.0 >> offset) & 0b11) as u8
    }

    /// Fill (no observation) flag
    pub fn fill(self) -> bool {
        self.flag(FILL_BIT)
    }

    /// Dilated cloud flag
    pub fn dilated_cloud(self) -> bool {
        self.flag(DILATED_CLOUD_BIT)
    }

    /// Cirrus flag
    pub fn cirrus(self) -> bool {
        self.flag(CIRRUS_BIT)
    }

    /// Cloud flag
    pub fn cloud(self) -> bool {
        self.flag(CLOUD_BIT)
    }

    /// Cloud shadow flag
    pub fn cloud_shadow(self) -> bool {
        self.flag(CLOUD_SHADOW_BIT)
    }

    /// Snow flag
    pub fn snow(self) -> bool {
        self.flag(SNOW_BIT)
    }

    /// Cloud confidence field (0-3)
    pub fn cloud_confidence(self) -> u8 {
        self.field2(CLOUD_CONFIDENCE_OFFSET)
    }

    /// Cloud shadow confidence field (0-3)
    pub fn shadow_confidence(self) -> u8 {
        self.field2(SHADOW_CONFIDENCE_OFFSET)
    }

    /// Whether the pixel is usable: every flag clear and both confidence
    /// fields below medium.
    ///
    /// An all-zero QA word is usable by construction; absence of bits means
    /// clear.
    pub fn is_usable(self) -> bool {
        !self.fill()
            && !self.dilated_cloud()
            && !self.cirrus()
            && !self.cloud()
            && !self.cloud_shadow()
            && !self.snow()
            && self.cloud_confidence() < MAX_ACCEPTED_CONFIDENCE
            && self.shadow_confidence() < MAX_ACCEPTED_CONFIDENCE
    }
}

/// Build the usable-pixel mask for a QA grid.
///
/// Pure function of the QA values; `true` marks a usable pixel.
pub fn usable_mask(qa: &Raster<u16>) -> Array2<bool> {
    let (rows, cols) = qa.shape();

    let data: Vec<bool> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![false; cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                let v = unsafe { qa.get_unchecked(row, col) };
                *out = QaPixel(v).is_usable();
            }
            row_data
        })
        .collect();

    Array2::from_shape_vec((rows, cols), data).expect("mask shape matches source grid")
}

/// Apply a usable-pixel mask to a band stack: masked-out pixels become NaN.
///
/// NaN (not the sentinel) marks "masked" at this stage; the reflectance
/// validator later converts anything outside [0, 1] to the sentinel.
pub fn apply_usable_mask(bands: &BandStack, mask: &Array2<bool>) -> compositar_core::Result<BandStack> {
    bands.map_bands(|_, band| {
        let (rows, cols) = band.shape();
        let data: Vec<f64> = (0..rows)
            .into_par_iter()
            .flat_map(|row| {
                let mut row_data = vec![f64::NAN; cols];
                for (col, out) in row_data.iter_mut().enumerate() {
                    if mask[(row, col)] {
                        *out = unsafe { band.get_unchecked(row, col) };
                    }
                }
                row_data
            })
            .collect();

        let mut output = band.with_same_meta::<f64>(rows, cols);
        output.set_nodata(Some(f64::NAN));
        *output.data_mut() = Array2::from_shape_vec((rows, cols), data)
            .map_err(|e| compositar_core::Error::Other(e.to_string()))?;
        Ok(output)
    })
}
