//! Study region as a pixel mask on the common grid

use geo::Contains;
use geo_types::{Coord, Polygon, Rect};
use ndarray::Array2;

use crate::raster::GeoTransform;

/// Study-area mask aligned to the common raster grid.
///
/// Built once from vector geometry by testing pixel centers for containment;
/// all region-bounded aggregations (diagnostics, histograms, validity
/// fractions) consult this mask.
#[derive(Debug, Clone)]
pub struct Region {
    mask: Array2<bool>,
}

impl Region {
    /// Region covering the full grid
    pub fn full(rows: usize, cols: usize) -> Self {
        Self {
            mask: Array2::from_elem((rows, cols), true),
        }
    }

    /// Region from an arbitrary boolean mask
    pub fn from_mask(mask: Array2<bool>) -> Self {
        Self { mask }
    }

    /// Rasterize a polygon onto a grid by pixel-center containment
    pub fn from_polygon(
        polygon: &Polygon<f64>,
        transform: &GeoTransform,
        rows: usize,
        cols: usize,
    ) -> Self {
        let mut mask = Array2::from_elem((rows, cols), false);
        for row in 0..rows {
            for col in 0..cols {
                let (x, y) = transform.pixel_to_geo(col, row);
                if polygon.contains(&Coord { x, y }) {
                    mask[(row, col)] = true;
                }
            }
        }
        Self { mask }
    }

    /// Rasterize a rectangular bounding box onto a grid
    pub fn from_bounds(
        min_x: f64,
        min_y: f64,
        max_x: f64,
        max_y: f64,
        transform: &GeoTransform,
        rows: usize,
        cols: usize,
    ) -> Self {
        let rect = Rect::new(
            Coord { x: min_x, y: min_y },
            Coord { x: max_x, y: max_y },
        );
        Self::from_polygon(&rect.to_polygon(), transform, rows, cols)
    }

    /// Whether the pixel at (row, col) lies inside the region.
    ///
    /// Out-of-bounds coordinates are outside by definition.
    pub fn contains(&self, row: usize, col: usize) -> bool {
        self.mask.get((row, col)).copied().unwrap_or(false)
    }

    /// The underlying boolean mask
    pub fn mask(&self) -> &Array2<bool> {
        &self.mask
    }

    /// Number of pixels inside the region
    pub fn pixel_count(&self) -> usize {
        self.mask.iter().filter(|&&m| m).count()
    }

    /// Mask dimensions as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.mask.dim()
    }
}
