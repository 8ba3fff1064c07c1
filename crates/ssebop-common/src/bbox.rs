//! Bounding box types and operations.

use serde::{Deserialize, Serialize};

/// A projected bounding box in the map units of its CRS.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    /// Create a new bounding box from corner coordinates.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Width of the bounding box in coordinate units.
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Height of the bounding box in coordinate units.
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Expand the box outward onto a lattice of `cell_size` spacing that
    /// passes through `(origin_x, origin_y)`.
    ///
    /// The min corner is floored and the max corner is ceiled, so the
    /// snapped box always contains the original one. Coordinates are rounded
    /// to 8 decimals to keep lattice edges stable across scenes.
    pub fn snap_outward(&self, cell_size: f64, origin_x: f64, origin_y: f64) -> BoundingBox {
        let floor_to = |v: f64, origin: f64| {
            round8(((v - origin) / cell_size).floor() * cell_size + origin)
        };
        let ceil_to = |v: f64, origin: f64| {
            round8(((v - origin) / cell_size).ceil() * cell_size + origin)
        };

        BoundingBox {
            min_x: floor_to(self.min_x, origin_x),
            min_y: floor_to(self.min_y, origin_y),
            max_x: ceil_to(self.max_x, origin_x),
            max_y: ceil_to(self.max_y, origin_y),
        }
    }
}

fn round8(v: f64) -> f64 {
    (v * 1e8).round() / 1e8
}
