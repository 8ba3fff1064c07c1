//! Coordinate Reference System codes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// CRS codes used by Landsat scenes and the Tcorr products.
///
/// Serialized as the `EPSG:xxxx` string form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CrsCode {
    /// WGS84 Geographic (lat/lon in degrees)
    Epsg4326,
    /// CONUS Albers Equal Area (meters)
    Epsg5070,
    /// WGS84 / UTM northern hemisphere zone (EPSG:326xx)
    UtmNorth(u8),
    /// WGS84 / UTM southern hemisphere zone (EPSG:327xx)
    UtmSouth(u8),
}

impl CrsCode {
    /// Parse an `EPSG:xxxx` string (case-insensitive).
    pub fn parse(s: &str) -> Result<Self, CrsParseError> {
        let normalized = s.trim().to_uppercase();
        let code = normalized
            .strip_prefix("EPSG:")
            .and_then(|c| c.parse::<u32>().ok())
            .ok_or_else(|| CrsParseError::UnsupportedCrs(s.to_string()))?;

        match code {
            4326 => Ok(CrsCode::Epsg4326),
            5070 => Ok(CrsCode::Epsg5070),
            32601..=32660 => Ok(CrsCode::UtmNorth((code - 32600) as u8)),
            32701..=32760 => Ok(CrsCode::UtmSouth((code - 32700) as u8)),
            _ => Err(CrsParseError::UnsupportedCrs(s.to_string())),
        }
    }

    /// Numeric EPSG code.
    pub fn epsg(&self) -> u32 {
        match self {
            CrsCode::Epsg4326 => 4326,
            CrsCode::Epsg5070 => 5070,
            CrsCode::UtmNorth(zone) => 32600 + *zone as u32,
            CrsCode::UtmSouth(zone) => 32700 + *zone as u32,
        }
    }

    /// Check if this is a geographic (lat/lon) CRS.
    pub fn is_geographic(&self) -> bool {
        matches!(self, CrsCode::Epsg4326)
    }
}

impl fmt::Display for CrsCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg())
    }
}

impl TryFrom<String> for CrsCode {
    type Error = CrsParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        CrsCode::parse(&value)
    }
}

impl From<CrsCode> for String {
    fn from(code: CrsCode) -> Self {
        code.to_string()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CrsParseError {
    #[error("Unsupported CRS: {0}")]
    UnsupportedCrs(String),
}
