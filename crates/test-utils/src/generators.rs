//! Test data generators for synthetic Landsat scenes.
//!
//! These generators create predictable, verifiable test data patterns
//! that can be used across the test suite. All grids are row-major with
//! row 0 at the top.

use ssebop_common::{CrsCode, GridProjection};

/// Landsat pixel size in meters.
pub const LANDSAT_CELL_SIZE: f64 = 30.0;

/// Upper-left corner of generated scenes. Both coordinates sit on the
/// 15 m offset of the Landsat pixel lattice.
pub const SCENE_ORIGIN: (f64, f64) = (500_025.0, 4_200_015.0);

/// Creates a test grid with predictable values.
///
/// Each cell value is calculated as: `col * 1000 + row`
///
/// # Example
///
/// ```
/// use test_utils::create_test_grid;
///
/// let grid = create_test_grid(10, 5);
/// assert_eq!(grid.len(), 50);
/// assert_eq!(grid[1], 1000.0); // col=1, row=0
/// assert_eq!(grid[10], 1.0);   // col=0, row=1
/// ```
pub fn create_test_grid(width: usize, height: usize) -> Vec<f32> {
    (0..height)
        .flat_map(|row| (0..width).map(move |col| (col * 1000 + row) as f32))
        .collect()
}

/// A 30 m UTM zone 11N grid with its upper-left corner at [`SCENE_ORIGIN`].
pub fn landsat_grid(width: usize, height: usize) -> GridProjection {
    GridProjection::new(
        CrsCode::UtmNorth(11),
        LANDSAT_CELL_SIZE,
        SCENE_ORIGIN.0,
        SCENE_ORIGIN.1,
        width,
        height,
    )
}

/// Creates a grid filled with a constant value.
pub fn create_constant_grid(width: usize, height: usize, value: f32) -> Vec<f32> {
    vec![value; width * height]
}

/// Creates an NDVI grid with a rectangular field of `field` NDVI on a
/// `background` of lower NDVI.
///
/// `cols` and `rows` are half-open pixel ranges of the field.
pub fn create_ndvi_field(
    width: usize,
    height: usize,
    background: f32,
    field: f32,
    cols: std::ops::Range<usize>,
    rows: std::ops::Range<usize>,
) -> Vec<f32> {
    let mut data = vec![background; width * height];
    for row in rows.start..rows.end.min(height) {
        for col in cols.start..cols.end.min(width) {
            data[row * width + col] = field;
        }
    }
    data
}

/// Creates an LST grid (K) warming linearly from `west` to `east`.
pub fn create_lst_gradient(width: usize, height: usize, west: f32, east: f32) -> Vec<f32> {
    let step = if width > 1 {
        (east - west) / (width - 1) as f32
    } else {
        0.0
    };
    (0..height)
        .flat_map(|_| (0..width).map(move |col| west + step * col as f32))
        .collect()
}

/// Creates a grid with NaN values at specified positions.
///
/// `nan_positions` are (col, row) pairs; every other pixel is `value`.
pub fn create_grid_with_nans(
    width: usize,
    height: usize,
    value: f32,
    nan_positions: &[(usize, usize)],
) -> Vec<f32> {
    let mut data = vec![value; width * height];
    for &(col, row) in nan_positions {
        if col < width && row < height {
            data[row * width + col] = f32::NAN;
        }
    }
    data
}
