//! Landsat scene identity: WRS2 tile and scene ID parsing.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// WRS2 path/row tile, formatted as `p044r033`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Wrs2Tile {
    pub path: u16,
    pub row: u16,
}

impl Wrs2Tile {
    pub fn new(path: u16, row: u16) -> Self {
        Self { path, row }
    }

    /// Parse the compact `PPPRRR` form used inside scene IDs.
    fn from_compact(s: &str) -> Result<Self, SceneIdParseError> {
        if s.len() != 6 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(SceneIdParseError::InvalidTile(s.to_string()));
        }
        let path = s[..3]
            .parse()
            .map_err(|_| SceneIdParseError::InvalidTile(s.to_string()))?;
        let row = s[3..]
            .parse()
            .map_err(|_| SceneIdParseError::InvalidTile(s.to_string()))?;
        Ok(Self { path, row })
    }
}

impl fmt::Display for Wrs2Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{:03}r{:03}", self.path, self.row)
    }
}

impl FromStr for Wrs2Tile {
    type Err = SceneIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || SceneIdParseError::InvalidTile(s.to_string());
        let rest = s.strip_prefix('p').ok_or_else(invalid)?;
        let (path, row) = rest.split_once('r').ok_or_else(invalid)?;
        if path.len() != 3 || row.len() != 3 {
            return Err(invalid());
        }
        Ok(Self {
            path: path.parse().map_err(|_| invalid())?,
            row: row.parse().map_err(|_| invalid())?,
        })
    }
}

impl TryFrom<String> for Wrs2Tile {
    type Error = SceneIdParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Wrs2Tile> for String {
    fn from(tile: Wrs2Tile) -> Self {
        tile.to_string()
    }
}

/// A Landsat scene ID in the `LC08_044033_20170716` form.
///
/// Full collection paths like `LANDSAT/LC08/C02/T1_L2/LC08_044033_20170716`
/// are accepted; only the last path component is parsed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SceneId {
    /// Spacecraft/sensor prefix, e.g. `LC08`
    pub spacecraft: String,
    pub wrs2: Wrs2Tile,
    pub date: NaiveDate,
}

impl SceneId {
    pub fn new(spacecraft: impl Into<String>, wrs2: Wrs2Tile, date: NaiveDate) -> Self {
        Self {
            spacecraft: spacecraft.into(),
            wrs2,
            date,
        }
    }
}

impl fmt::Display for SceneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{:03}{:03}_{}",
            self.spacecraft,
            self.wrs2.path,
            self.wrs2.row,
            self.date.format("%Y%m%d")
        )
    }
}

impl FromStr for SceneId {
    type Err = SceneIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = s.rsplit('/').next().unwrap_or(s);
        let mut parts = id.split('_');
        let (Some(spacecraft), Some(tile), Some(date), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(SceneIdParseError::InvalidFormat(s.to_string()));
        };

        if spacecraft.len() != 4 || !spacecraft.starts_with('L') {
            return Err(SceneIdParseError::InvalidFormat(s.to_string()));
        }
        let wrs2 = Wrs2Tile::from_compact(tile)?;
        let date = NaiveDate::parse_from_str(date, "%Y%m%d")
            .map_err(|_| SceneIdParseError::InvalidDate(date.to_string()))?;

        Ok(Self {
            spacecraft: spacecraft.to_string(),
            wrs2,
            date,
        })
    }
}

impl TryFrom<String> for SceneId {
    type Error = SceneIdParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SceneId> for String {
    fn from(id: SceneId) -> Self {
        id.to_string()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SceneIdParseError {
    #[error("Invalid scene ID: {0}")]
    InvalidFormat(String),

    #[error("Invalid WRS2 tile: {0}")]
    InvalidTile(String),

    #[error("Invalid scene date: {0}")]
    InvalidDate(String),
}
