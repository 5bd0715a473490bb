//! A single satellite acquisition

use crate::error::Result;
use crate::raster::{BandStack, Raster};

/// One time-stamped multispectral acquisition over the study grid.
///
/// Bands hold raw digital numbers as delivered by the raster source; the
/// compositing engine applies QA masking and reflectance scaling itself.
#[derive(Debug, Clone)]
pub struct Scene {
    /// Scene identifier (e.g. product ID or file stem)
    pub id: String,
    /// Acquisition year
    pub year: i32,
    /// Scene-level cloud cover metadata, percent [0, 100]
    pub cloud_cover: f64,
    /// Raw DN bands on the common grid
    pub bands: BandStack,
    /// Packed QA_PIXEL bit-flag grid
    pub qa: Raster<u16>,
}

impl Scene {
    /// Create a scene, checking that the QA grid matches the band shape
    pub fn new(
        id: impl Into<String>,
        year: i32,
        cloud_cover: f64,
        bands: BandStack,
        qa: Raster<u16>,
    ) -> Result<Self> {
        let (rows, cols) = bands.shape();
        let (qr, qc) = qa.shape();
        if (rows, cols) != (qr, qc) {
            return Err(crate::error::Error::SizeMismatch {
                er: rows,
                ec: cols,
                ar: qr,
                ac: qc,
            });
        }
        Ok(Self {
            id: id.into(),
            year,
            cloud_cover,
            bands,
            qa,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qa_shape_checked() {
        let bands = BandStack::new(
            vec!["SR_B1".to_string()],
            vec![Raster::filled(4, 4, 0.0)],
        )
        .unwrap();
        let qa = Raster::<u16>::new(4, 5);
        assert!(Scene::new("s1", 2020, 10.0, bands, qa).is_err());
    }
}
