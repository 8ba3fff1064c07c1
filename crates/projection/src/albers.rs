//! Albers Equal Area Conic on an ellipsoid.
//!
//! Used for the CONUS Albers grid (EPSG:5070, NAD83/GRS80) that many
//! gridded climate products are published on.

use std::f64::consts::PI;

/// GRS80 semi-major axis (meters)
pub const GRS80_A: f64 = 6_378_137.0;
/// GRS80 flattening
pub const GRS80_F: f64 = 1.0 / 298.257_222_101;

const MAX_ITERATIONS: usize = 15;
const TOLERANCE: f64 = 1e-12;

/// Albers Equal Area parameters.
#[derive(Debug, Clone)]
pub struct AlbersEqualArea {
    /// Central meridian in radians
    pub lon0: f64,
    pub false_easting: f64,
    pub false_northing: f64,
    a: f64,
    e: f64,
    e2: f64,
    /// Cone constant
    n: f64,
    c: f64,
    /// Rho at the latitude of origin
    rho0: f64,
}

impl AlbersEqualArea {
    /// Projection from standard parallels and origin, all in degrees.
    pub fn new(
        lat0_deg: f64,
        lon0_deg: f64,
        latin1_deg: f64,
        latin2_deg: f64,
        false_easting: f64,
        false_northing: f64,
    ) -> Self {
        let a = GRS80_A;
        let e2 = GRS80_F * (2.0 - GRS80_F);
        let e = e2.sqrt();

        let m = |lat: f64| lat.cos() / (1.0 - e2 * lat.sin().powi(2)).sqrt();
        let (lat1, lat2) = (latin1_deg.to_radians(), latin2_deg.to_radians());
        let (m1, m2) = (m(lat1), m(lat2));
        let (q1, q2) = (q(lat1, e, e2), q(lat2, e, e2));

        let n = if (lat1 - lat2).abs() < 1e-10 {
            lat1.sin()
        } else {
            (m1 * m1 - m2 * m2) / (q2 - q1)
        };
        let c = m1 * m1 + n * q1;
        let rho0 = a * (c - n * q(lat0_deg.to_radians(), e, e2)).sqrt() / n;

        Self {
            lon0: lon0_deg.to_radians(),
            false_easting,
            false_northing,
            a,
            e,
            e2,
            n,
            c,
            rho0,
        }
    }

    /// NAD83 / Conus Albers (EPSG:5070).
    pub fn conus() -> Self {
        Self::new(23.0, -96.0, 29.5, 45.5, 0.0, 0.0)
    }

    /// Geographic (degrees) to projected meters.
    pub fn geo_to_xy(&self, lat_deg: f64, lon_deg: f64) -> (f64, f64) {
        let lat = lat_deg.to_radians();
        let mut dlon = lon_deg.to_radians() - self.lon0;
        while dlon > PI {
            dlon -= 2.0 * PI;
        }
        while dlon < -PI {
            dlon += 2.0 * PI;
        }

        let rho = self.a * (self.c - self.n * q(lat, self.e, self.e2)).sqrt() / self.n;
        let theta = self.n * dlon;
        (
            self.false_easting + rho * theta.sin(),
            self.false_northing + self.rho0 - rho * theta.cos(),
        )
    }

    /// Projected meters to geographic `(lat, lon)` in degrees.
    pub fn xy_to_geo(&self, x: f64, y: f64) -> (f64, f64) {
        let x = x - self.false_easting;
        let dy = self.rho0 - (y - self.false_northing);

        let rho = (x * x + dy * dy).sqrt();
        let theta = if self.n < 0.0 {
            (-x).atan2(-dy)
        } else {
            x.atan2(dy)
        };
        let q_target = (self.c - (rho * self.n / self.a).powi(2)) / self.n;

        // Iterate for latitude from its authalic estimate
        let mut lat = (q_target / 2.0).clamp(-1.0, 1.0).asin();
        for _ in 0..MAX_ITERATIONS {
            let (sin_lat, cos_lat) = lat.sin_cos();
            let w = 1.0 - self.e2 * sin_lat * sin_lat;
            let delta = w * w / (2.0 * cos_lat)
                * (q_target / (1.0 - self.e2) - sin_lat / w
                    + (1.0 / (2.0 * self.e)) * ((1.0 - self.e * sin_lat) / (1.0 + self.e * sin_lat)).ln());
            lat += delta;
            if delta.abs() < TOLERANCE {
                break;
            }
        }

        let lon = self.lon0 + theta / self.n;
        (lat.to_degrees(), lon.to_degrees())
    }
}

/// Authalic `q` function.
fn q(lat: f64, e: f64, e2: f64) -> f64 {
    let s = lat.sin();
    (1.0 - e2) * (s / (1.0 - e2 * s * s) - (1.0 / (2.0 * e)) * ((1.0 - e * s) / (1.0 + e * s)).ln())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_maps_to_zero() {
        let proj = AlbersEqualArea::conus();
        let (x, y) = proj.geo_to_xy(23.0, -96.0);
        assert!(x.abs() < 1e-6, "x should be 0, got {}", x);
        assert!(y.abs() < 1e-6, "y should be 0, got {}", y);
    }

    #[test]
    fn test_roundtrip_across_conus() {
        let proj = AlbersEqualArea::conus();
        for &(lat, lon) in &[(37.95, -117.0), (45.0, -70.0), (30.0, -100.0), (48.5, -123.0)] {
            let (x, y) = proj.geo_to_xy(lat, lon);
            let (lat2, lon2) = proj.xy_to_geo(x, y);
            assert!((lat - lat2).abs() < 1e-9, "lat roundtrip failed: {} vs {}", lat, lat2);
            assert!((lon - lon2).abs() < 1e-9, "lon roundtrip failed: {} vs {}", lon, lon2);
        }
    }

    #[test]
    fn test_west_is_negative_x() {
        let proj = AlbersEqualArea::conus();
        let (x, y) = proj.geo_to_xy(37.95, -117.0);
        assert!(x < -1_500_000.0 && x > -2_500_000.0, "unexpected x {}", x);
        assert!(y > 1_000_000.0 && y < 2_500_000.0, "unexpected y {}", y);
    }
}
