//! Point transforms between any two supported CRS codes.

use ssebop_common::CrsCode;

use crate::albers::AlbersEqualArea;
use crate::utm::TransverseMercator;

/// The projection behind a [`CrsCode`].
#[derive(Debug, Clone)]
pub enum Projection {
    /// Longitude/latitude degrees; map `x` is longitude.
    Geographic,
    Albers(AlbersEqualArea),
    Utm(TransverseMercator),
}

impl Projection {
    pub fn for_crs(crs: CrsCode) -> Self {
        match crs {
            CrsCode::Epsg4326 => Projection::Geographic,
            CrsCode::Epsg5070 => Projection::Albers(AlbersEqualArea::conus()),
            CrsCode::UtmNorth(zone) => Projection::Utm(TransverseMercator::utm(zone, false)),
            CrsCode::UtmSouth(zone) => Projection::Utm(TransverseMercator::utm(zone, true)),
        }
    }

    /// Map coordinates to `(lat, lon)` degrees.
    pub fn to_geo(&self, x: f64, y: f64) -> (f64, f64) {
        match self {
            Projection::Geographic => (y, x),
            Projection::Albers(p) => p.xy_to_geo(x, y),
            Projection::Utm(p) => p.xy_to_geo(x, y),
        }
    }

    /// `(lat, lon)` degrees to map coordinates.
    pub fn from_geo(&self, lat: f64, lon: f64) -> (f64, f64) {
        match self {
            Projection::Geographic => (lon, lat),
            Projection::Albers(p) => p.geo_to_xy(lat, lon),
            Projection::Utm(p) => p.geo_to_xy(lat, lon),
        }
    }
}

/// Transforms map coordinates from one CRS into another.
#[derive(Debug, Clone)]
pub struct CrsTransform {
    from: Projection,
    to: Projection,
    identity: bool,
}

impl CrsTransform {
    pub fn new(from: CrsCode, to: CrsCode) -> Self {
        Self {
            from: Projection::for_crs(from),
            to: Projection::for_crs(to),
            identity: from == to,
        }
    }

    /// Transform one point. Returns `None` when the point has no finite
    /// image in the target CRS (e.g. beyond the poles).
    pub fn apply(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        if self.identity {
            return Some((x, y));
        }
        let (lat, lon) = self.from.to_geo(x, y);
        if !lat.is_finite() || !lon.is_finite() || lat.abs() > 90.0 {
            return None;
        }
        let (tx, ty) = self.to.from_geo(lat, lon);
        (tx.is_finite() && ty.is_finite()).then_some((tx, ty))
    }
}
