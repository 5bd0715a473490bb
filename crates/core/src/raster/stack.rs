//! Multi-band raster stack with a fixed, validated band schema

use crate::error::{Error, Result};
use crate::raster::Raster;

/// Reserved value marking "no valid reflectance" in a float grid.
///
/// Lies outside the physical reflectance range [0, 1], so a range test
/// doubles as a validity test.
pub const SENTINEL: f64 = -9999.0;

/// Landsat 8 Collection 2 Level 2 surface reflectance bands
pub const LANDSAT_SR_BANDS: [&str; 7] = [
    "SR_B1", "SR_B2", "SR_B3", "SR_B4", "SR_B5", "SR_B6", "SR_B7",
];

/// An ordered mapping from band name to a 2D grid on a common geographic grid.
///
/// The band set is fixed at construction and validated: all bands must share
/// one shape, and lookups against names outside the schema fail. Band order
/// is preserved; the first schema band is the reference band for gap
/// detection.
#[derive(Debug, Clone)]
pub struct BandStack {
    names: Vec<String>,
    bands: Vec<Raster<f64>>,
}

impl BandStack {
    /// Create a stack from parallel name/raster lists.
    ///
    /// Fails if the lists differ in length, the schema is empty, or any
    /// band's shape differs from the first band's.
    pub fn new(names: Vec<String>, bands: Vec<Raster<f64>>) -> Result<Self> {
        if names.is_empty() {
            return Err(Error::BandSchemaMismatch {
                expected: 1,
                actual: 0,
            });
        }
        if names.len() != bands.len() {
            return Err(Error::BandSchemaMismatch {
                expected: names.len(),
                actual: bands.len(),
            });
        }

        let (rows, cols) = bands[0].shape();
        for band in &bands[1..] {
            let (ar, ac) = band.shape();
            if (ar, ac) != (rows, cols) {
                return Err(Error::SizeMismatch {
                    er: rows,
                    ec: cols,
                    ar,
                    ac,
                });
            }
        }

        Ok(Self { names, bands })
    }

    /// Create a stack with the Landsat 8 surface reflectance schema
    pub fn landsat_sr(bands: Vec<Raster<f64>>) -> Result<Self> {
        Self::new(
            LANDSAT_SR_BANDS.iter().map(|s| s.to_string()).collect(),
            bands,
        )
    }

    /// Create a stack with the same schema and shape as `template`,
    /// every pixel set to `value`
    pub fn filled_like(template: &BandStack, value: f64) -> Self {
        Self {
            names: template.names.clone(),
            bands: template.bands.iter().map(|b| b.like(value)).collect(),
        }
    }

    /// Band names, in schema order
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Number of bands
    pub fn num_bands(&self) -> usize {
        self.bands.len()
    }

    /// Shape shared by all bands, as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.bands[0].shape()
    }

    /// The first schema band (reference band for gap detection)
    pub fn first(&self) -> &Raster<f64> {
        &self.bands[0]
    }

    /// Look up a band by name
    pub fn band(&self, name: &str) -> Result<&Raster<f64>> {
        self.index_of(name).map(|i| &self.bands[i])
    }

    /// Look up a band mutably by name
    pub fn band_mut(&mut self, name: &str) -> Result<&mut Raster<f64>> {
        let i = self.index_of(name)?;
        Ok(&mut self.bands[i])
    }

    /// Iterate over (name, band) pairs in schema order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Raster<f64>)> {
        self.names
            .iter()
            .map(|n| n.as_str())
            .zip(self.bands.iter())
    }

    /// Iterate over (name, band) pairs with mutable band access
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut Raster<f64>)> {
        self.names
            .iter()
            .map(|n| n.as_str())
            .zip(self.bands.iter_mut())
    }

    /// Apply a fallible transform to every band, keeping the schema
    pub fn map_bands<F>(&self, mut f: F) -> Result<BandStack>
    where
        F: FnMut(&str, &Raster<f64>) -> Result<Raster<f64>>,
    {
        let mut bands = Vec::with_capacity(self.bands.len());
        for (name, band) in self.iter() {
            bands.push(f(name, band)?);
        }
        BandStack::new(self.names.clone(), bands)
    }

    /// Whether `other` carries exactly this stack's schema, in order
    pub fn schema_matches(&self, other: &BandStack) -> bool {
        self.names == other.names
    }

    /// Ensure `other` has the same schema and shape as this stack
    pub fn check_compatible(&self, other: &BandStack) -> Result<()> {
        if !self.schema_matches(other) {
            return Err(Error::BandSchemaMismatch {
                expected: self.num_bands(),
                actual: other.num_bands(),
            });
        }
        let (er, ec) = self.shape();
        let (ar, ac) = other.shape();
        if (er, ec) != (ar, ac) {
            return Err(Error::SizeMismatch { er, ec, ar, ac });
        }
        Ok(())
    }

    fn index_of(&self, name: &str) -> Result<usize> {
        self.names
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| Error::UnknownBand(name.to_string()))
    }
}
