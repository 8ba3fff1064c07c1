//! Universal Transverse Mercator on the WGS84 ellipsoid.
//!
//! Series expansions after Snyder, "Map Projections: A Working Manual"
//! (USGS PP 1395), accurate to well under a meter inside a zone and
//! usable a few degrees beyond its edges.

use std::f64::consts::PI;

/// WGS84 semi-major axis (meters)
pub const WGS84_A: f64 = 6_378_137.0;
/// WGS84 flattening
pub const WGS84_F: f64 = 1.0 / 298.257_223_563;

const K0: f64 = 0.9996;
const FALSE_EASTING: f64 = 500_000.0;
const FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

/// Transverse Mercator parameters for one UTM zone.
#[derive(Debug, Clone)]
pub struct TransverseMercator {
    /// Central meridian in radians
    pub lon0: f64,
    pub false_northing: f64,
    a: f64,
    e2: f64,
    ep2: f64,
}

impl TransverseMercator {
    /// UTM zone 1-60, northern or southern hemisphere.
    pub fn utm(zone: u8, south: bool) -> Self {
        let f = WGS84_F;
        let e2 = f * (2.0 - f);
        Self {
            lon0: ((zone as f64) * 6.0 - 183.0).to_radians(),
            false_northing: if south { FALSE_NORTHING_SOUTH } else { 0.0 },
            a: WGS84_A,
            e2,
            ep2: e2 / (1.0 - e2),
        }
    }

    /// Meridian arc length from the equator to `lat` (radians).
    fn meridian_arc(&self, lat: f64) -> f64 {
        let e2 = self.e2;
        let e4 = e2 * e2;
        let e6 = e4 * e2;
        self.a
            * ((1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * lat
                - (3.0 * e2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * lat).sin()
                + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * lat).sin()
                - (35.0 * e6 / 3072.0) * (6.0 * lat).sin())
    }

    /// Geographic (degrees) to easting/northing (meters).
    pub fn geo_to_xy(&self, lat_deg: f64, lon_deg: f64) -> (f64, f64) {
        let lat = lat_deg.to_radians();
        let mut dlon = lon_deg.to_radians() - self.lon0;
        while dlon > PI {
            dlon -= 2.0 * PI;
        }
        while dlon < -PI {
            dlon += 2.0 * PI;
        }

        let (sin_lat, cos_lat) = lat.sin_cos();
        let n = self.a / (1.0 - self.e2 * sin_lat * sin_lat).sqrt();
        let t = lat.tan().powi(2);
        let c = self.ep2 * cos_lat * cos_lat;
        let a = cos_lat * dlon;
        let m = self.meridian_arc(lat);

        let x = FALSE_EASTING
            + K0 * n
                * (a + (1.0 - t + c) * a.powi(3) / 6.0
                    + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * self.ep2) * a.powi(5) / 120.0);
        let y = self.false_northing
            + K0 * (m + n * lat.tan()
                * (a * a / 2.0
                    + (5.0 - t + 9.0 * c + 4.0 * c * c) * a.powi(4) / 24.0
                    + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * self.ep2) * a.powi(6) / 720.0));
        (x, y)
    }

    /// Easting/northing (meters) to geographic `(lat, lon)` in degrees.
    pub fn xy_to_geo(&self, x: f64, y: f64) -> (f64, f64) {
        let e2 = self.e2;
        let e4 = e2 * e2;
        let e6 = e4 * e2;
        let e1 = (1.0 - (1.0 - e2).sqrt()) / (1.0 + (1.0 - e2).sqrt());

        let m = (y - self.false_northing) / K0;
        let mu = m / (self.a * (1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0));

        // Footpoint latitude
        let lat1 = mu
            + (3.0 * e1 / 2.0 - 27.0 * e1.powi(3) / 32.0) * (2.0 * mu).sin()
            + (21.0 * e1 * e1 / 16.0 - 55.0 * e1.powi(4) / 32.0) * (4.0 * mu).sin()
            + (151.0 * e1.powi(3) / 96.0) * (6.0 * mu).sin()
            + (1097.0 * e1.powi(4) / 512.0) * (8.0 * mu).sin();

        let (sin1, cos1) = lat1.sin_cos();
        let c1 = self.ep2 * cos1 * cos1;
        let t1 = lat1.tan().powi(2);
        let w = 1.0 - e2 * sin1 * sin1;
        let n1 = self.a / w.sqrt();
        let r1 = self.a * (1.0 - e2) / w.powf(1.5);
        let d = (x - FALSE_EASTING) / (n1 * K0);

        let lat = lat1
            - (n1 * lat1.tan() / r1)
                * (d * d / 2.0
                    - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * self.ep2) * d.powi(4) / 24.0
                    + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1 - 252.0 * self.ep2 - 3.0 * c1 * c1)
                        * d.powi(6)
                        / 720.0);
        let lon = self.lon0
            + (d - (1.0 + 2.0 * t1 + c1) * d.powi(3) / 6.0
                + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * self.ep2 + 24.0 * t1 * t1)
                    * d.powi(5)
                    / 120.0)
                / cos1;

        (lat.to_degrees(), lon.to_degrees())
    }
}
