//! Grid projection: CRS, affine pixel transform and raster extent.

use crate::{BoundingBox, CrsCode};
use serde::{Deserialize, Serialize};

/// A north-up raster grid in a projected or geographic CRS.
///
/// The transform follows the `[x_scale, x_shear, x_origin, y_shear, y_scale,
/// y_origin]` ordering, with the origin at the upper-left corner of the
/// upper-left pixel and a negative `y_scale`, e.g. `[30, 0, 591285, 0, -30,
/// 4256115]` for a Landsat scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "GridProjectionRepr")]
pub struct GridProjection {
    pub crs: CrsCode,
    pub transform: [f64; 6],
    /// Number of columns
    pub width: usize,
    /// Number of rows
    pub height: usize,
}

/// Unchecked serialized form; grids read from scene and asset documents go
/// through [`GridProjection::from_transform`].
#[derive(Deserialize)]
struct GridProjectionRepr {
    crs: CrsCode,
    transform: [f64; 6],
    width: usize,
    height: usize,
}

impl TryFrom<GridProjectionRepr> for GridProjection {
    type Error = GridError;

    fn try_from(repr: GridProjectionRepr) -> Result<Self, Self::Error> {
        GridProjection::from_transform(repr.crs, repr.transform, repr.width, repr.height)
    }
}

impl GridProjection {
    /// Create a north-up grid from its upper-left corner and square cell size.
    pub fn new(
        crs: CrsCode,
        cell_size: f64,
        upper_left_x: f64,
        upper_left_y: f64,
        width: usize,
        height: usize,
    ) -> Self {
        Self {
            crs,
            transform: [cell_size, 0.0, upper_left_x, 0.0, -cell_size, upper_left_y],
            width,
            height,
        }
    }

    /// Create a grid from an explicit transform, rejecting rotated or
    /// degenerate transforms.
    pub fn from_transform(
        crs: CrsCode,
        transform: [f64; 6],
        width: usize,
        height: usize,
    ) -> Result<Self, GridError> {
        if transform[1] != 0.0 || transform[3] != 0.0 {
            return Err(GridError::RotatedTransform(transform));
        }
        if transform[0] <= 0.0 || transform[4] >= 0.0 {
            return Err(GridError::InvalidCellSize(transform[0], transform[4]));
        }
        Ok(Self {
            crs,
            transform,
            width,
            height,
        })
    }

    /// Pixel width in map units.
    pub fn x_res(&self) -> f64 {
        self.transform[0]
    }

    /// Pixel height in map units (positive).
    pub fn y_res(&self) -> f64 {
        -self.transform[4]
    }

    /// Mean of the x and y pixel size, used to convert map-unit kernel
    /// radii into pixels.
    pub fn cell_size(&self) -> f64 {
        (self.x_res() + self.y_res()) / 2.0
    }

    /// Extent of the grid in map units.
    pub fn extent(&self) -> BoundingBox {
        let min_x = self.transform[2];
        let max_y = self.transform[5];
        BoundingBox::new(
            min_x,
            max_y - self.height as f64 * self.y_res(),
            min_x + self.width as f64 * self.x_res(),
            max_y,
        )
    }

    /// Map coordinates of a pixel center.
    pub fn cell_center(&self, col: usize, row: usize) -> (f64, f64) {
        (
            self.transform[2] + (col as f64 + 0.5) * self.x_res(),
            self.transform[5] - (row as f64 + 0.5) * self.y_res(),
        )
    }

    /// Pixel containing a map coordinate, if it lies inside the grid.
    pub fn coords_to_cell(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        let col_f = ((x - self.transform[2]) / self.x_res()).floor();
        let row_f = ((self.transform[5] - y) / self.y_res()).floor();

        if col_f < 0.0 || row_f < 0.0 {
            return None;
        }
        let (col, row) = (col_f as usize, row_f as usize);
        if col >= self.width || row >= self.height {
            return None;
        }
        Some((col, row))
    }

    /// Row-major flat index.
    #[inline]
    pub fn flat_index(&self, col: usize, row: usize) -> usize {
        row * self.width + col
    }

    /// Total number of pixels.
    pub fn len(&self) -> usize {
        self.width * self.height
    }

    /// Check if grid is empty.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Build the coarse grid that covers this grid, with cells of
    /// `cell_size` on a lattice snapped to `(origin_x, origin_y)`.
    ///
    /// Scenes sharing a CRS get coarse cells that line up exactly.
    pub fn snapped(&self, cell_size: f64, origin_x: f64, origin_y: f64) -> GridProjection {
        let snapped = self.extent().snap_outward(cell_size, origin_x, origin_y);
        let width = (snapped.width() / cell_size).round() as usize;
        let height = (snapped.height() / cell_size).round() as usize;
        GridProjection::new(self.crs, cell_size, snapped.min_x, snapped.max_y, width, height)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GridError {
    #[error("rotated transforms are not supported: {0:?}")]
    RotatedTransform([f64; 6]),

    #[error("invalid cell size: x={0}, y={1}")]
    InvalidCellSize(f64, f64),
}
