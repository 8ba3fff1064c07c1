//! Common test fixtures for scenes, tiles and Tmax sources.

/// Landsat scene IDs.
pub mod scenes {
    /// Landsat 8, path 44 row 33, 16 July 2017.
    pub const LC08_JULY: &str = "LC08_044033_20170716";

    /// Landsat 8, path 44 row 33, one pass later.
    pub const LC08_AUGUST: &str = "LC08_044033_20170801";

    /// Landsat 7 on the same tile.
    pub const LE07_JULY: &str = "LE07_044033_20170708";

    /// A collection-prefixed ID.
    pub const LC08_WITH_COLLECTION: &str = "LANDSAT/LC08/C02/T1_L2/LC08_044033_20170716";
}

/// WRS2 tiles as (path, row).
pub mod tiles {
    pub const P044R033: (u16, u16) = (44, 33);
    pub const P043R033: (u16, u16) = (43, 33);
}

/// Tmax source names.
pub mod tmax {
    /// Accepted by every Tcorr source family.
    pub const DAYMET_MEDIAN_V2: &str = "DAYMET_MEDIAN_V2";

    /// Accepted by scene-statistic sources only.
    pub const GRIDMET_MEDIAN_V1: &str = "GRIDMET_MEDIAN_V1";

    /// A Tmax climatology asset path.
    pub const DAYMET_CLIMO: &str = "projects/usgs-ssebop/tmax/daymet_v4_mean_1981_2010";
}

/// Tcorr values seen in precomputed collections.
pub mod tcorr {
    pub const SCENE: f64 = 0.9812;
    pub const MONTHLY: f64 = 0.9786;
    pub const ANNUAL: f64 = 0.9750;
    pub const DEFAULT: f64 = 0.978;
}
