//! Tcorr source specifiers and the Tmax compatibility rule.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, TcorrError};

/// Tmax sources with precomputed scene statistics: the live daily
/// products and the named median climatologies.
pub const SCENE_TMAX_SOURCES: [&str; 10] = [
    "CIMIS",
    "DAYMET",
    "GRIDMET",
    "TOPOWX",
    "CIMIS_MEDIAN_V1",
    "DAYMET_MEDIAN_V0",
    "DAYMET_MEDIAN_V1",
    "DAYMET_MEDIAN_V2",
    "GRIDMET_MEDIAN_V1",
    "TOPOWX_MEDIAN_V0",
];

/// Named Tmax climatologies with gridded Tcorr collections.
pub const GRIDDED_TMAX_SOURCES: [&str; 1] = ["DAYMET_MEDIAN_V2"];

/// Where a Tcorr value comes from. Parsed once from the configured string.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TcorrSourceKind {
    /// A user-supplied constant.
    Constant(f64),
    /// Scene-wide cold percentile, falling back to climatologies.
    Dynamic,
    /// Gridded cold+hot composite.
    Gridded,
    /// Gridded cold-only composite.
    GriddedCold,
    /// Precomputed scene value, falling back to climatologies.
    Scene,
    /// Precomputed gridded scene image, falling back to the gridded monthly
    /// composite.
    SceneGridded,
    SceneDaily,
    SceneMonthly,
    SceneAnnual,
    SceneDefault,
}

impl TcorrSourceKind {
    /// Sources computed from a fresh scene or precomputed scene statistics.
    pub fn uses_scene_statistics(&self) -> bool {
        matches!(
            self,
            Self::Dynamic
                | Self::Scene
                | Self::SceneDaily
                | Self::SceneMonthly
                | Self::SceneAnnual
                | Self::SceneDefault
        )
    }

    /// Sources backed by gridded composites.
    pub fn is_gridded(&self) -> bool {
        matches!(self, Self::Gridded | Self::GriddedCold | Self::SceneGridded)
    }

    /// Fail unless `tmax_source` can be combined with this source.
    pub fn check_tmax_source(&self, tmax_source: &str) -> Result<()> {
        let name = tmax_source.trim();
        let upper = name.to_uppercase();
        let compatible = if self.uses_scene_statistics() {
            SCENE_TMAX_SOURCES.contains(&upper.as_str()) || is_tmax_climatology_path(name)
        } else if self.is_gridded() {
            GRIDDED_TMAX_SOURCES.contains(&upper.as_str()) || is_tmax_climatology_path(name)
        } else {
            true
        };

        if compatible {
            Ok(())
        } else {
            Err(TcorrError::incompatible(self.to_string(), name))
        }
    }
}

impl FromStr for TcorrSourceKind {
    type Err = TcorrError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if let Ok(value) = trimmed.parse::<f64>() {
            if value.is_finite() {
                return Ok(Self::Constant(value));
            }
        }
        match trimmed.to_uppercase().as_str() {
            "DYNAMIC" => Ok(Self::Dynamic),
            "GRIDDED" => Ok(Self::Gridded),
            "GRIDDED_COLD" => Ok(Self::GriddedCold),
            "SCENE" => Ok(Self::Scene),
            "SCENE_GRIDDED" => Ok(Self::SceneGridded),
            "SCENE_DAILY" => Ok(Self::SceneDaily),
            "SCENE_MONTHLY" => Ok(Self::SceneMonthly),
            "SCENE_ANNUAL" => Ok(Self::SceneAnnual),
            "SCENE_DEFAULT" => Ok(Self::SceneDefault),
            _ => Err(TcorrError::UnsupportedSource(s.to_string())),
        }
    }
}

impl TryFrom<String> for TcorrSourceKind {
    type Error = TcorrError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<TcorrSourceKind> for String {
    fn from(kind: TcorrSourceKind) -> Self {
        kind.to_string()
    }
}

impl fmt::Display for TcorrSourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Constant(v) => return write!(f, "{}", v),
            Self::Dynamic => "DYNAMIC",
            Self::Gridded => "GRIDDED",
            Self::GriddedCold => "GRIDDED_COLD",
            Self::Scene => "SCENE",
            Self::SceneGridded => "SCENE_GRIDDED",
            Self::SceneDaily => "SCENE_DAILY",
            Self::SceneMonthly => "SCENE_MONTHLY",
            Self::SceneAnnual => "SCENE_ANNUAL",
            Self::SceneDefault => "SCENE_DEFAULT",
        };
        f.write_str(name)
    }
}

/// Matches `projects/<...>/tmax/<name>_(mean|median)_<yyyy>_<yyyy>[_suffix]`.
pub fn is_tmax_climatology_path(source: &str) -> bool {
    let Some(rest) = source.strip_prefix("projects/") else {
        return false;
    };
    let Some((prefix, name)) = rest.rsplit_once("/tmax/") else {
        return false;
    };
    if prefix.is_empty() || name.is_empty() || name.contains('/') {
        return false;
    }

    let parts: Vec<&str> = name.split('_').collect();
    parts.windows(3).enumerate().any(|(i, w)| {
        i > 0
            && (w[0] == "mean" || w[0] == "median")
            && is_year(w[1])
            && is_year(w[2])
            && parts[i + 3..].iter().all(|s| is_word(s))
            && parts[..i].iter().all(|s| is_word(s))
    })
}

fn is_year(s: &str) -> bool {
    s.len() == 4 && s.bytes().all(|b| b.is_ascii_digit())
}

fn is_word(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_alphanumeric())
}
