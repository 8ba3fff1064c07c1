//! Coordinate reference system transformations.
//!
//! Implements the projections of [`CrsCode`] from scratch: geographic
//! WGS84, UTM (transverse Mercator on WGS84) and CONUS Albers Equal Area
//! (EPSG:5070, GRS80). Every projection converts through geographic
//! latitude/longitude in degrees.

pub mod albers;
pub mod transform;
pub mod utm;

pub use albers::AlbersEqualArea;
pub use transform::{CrsTransform, Projection};
pub use utm::TransverseMercator;

pub use ssebop_common::CrsCode;
