//! Tcorr values, provenance indices and stored assets.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use ssebop_common::Wrs2Tile;
use std::collections::BTreeMap;
use std::fmt;

use crate::raster::Raster;

/// Provenance of a Tcorr value, stored as the `tcorr_index` property.
///
/// Lower indices are preferred when several candidates are available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum TcorrIndex {
    /// Gridded cold+hot composite, or a `DYNAMIC` scene value.
    Gridded = 0,
    GriddedCold = 1,
    GriddedHot = 2,
    Scene = 3,
    Month = 4,
    Season = 5,
    Annual = 6,
    Default = 7,
    /// User-supplied constant.
    User = 8,
    NoData = 9,
}

impl TcorrIndex {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Gridded => "GRIDDED",
            Self::GriddedCold => "GRIDDED_COLD",
            Self::GriddedHot => "GRIDDED_HOT",
            Self::Scene => "SCENE",
            Self::Month => "MONTH",
            Self::Season => "SEASON",
            Self::Annual => "ANNUAL",
            Self::Default => "DEFAULT",
            Self::User => "USER",
            Self::NoData => "NODATA",
        }
    }
}

impl TryFrom<u8> for TcorrIndex {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Ok(match code {
            0 => Self::Gridded,
            1 => Self::GriddedCold,
            2 => Self::GriddedHot,
            3 => Self::Scene,
            4 => Self::Month,
            5 => Self::Season,
            6 => Self::Annual,
            7 => Self::Default,
            8 => Self::User,
            9 => Self::NoData,
            other => return Err(format!("tcorr_index out of range: {}", other)),
        })
    }
}

impl From<TcorrIndex> for u8 {
    fn from(index: TcorrIndex) -> Self {
        index.code()
    }
}

impl fmt::Display for TcorrIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.code(), self.name())
    }
}

/// A Tcorr value: a scalar, a raster, or nothing at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TcorrValue {
    Constant(f64),
    Image(Raster),
    Empty,
}

impl TcorrValue {
    pub fn as_constant(&self) -> Option<f64> {
        match self {
            Self::Constant(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_image(&self) -> Option<&Raster> {
        match self {
            Self::Image(r) => Some(r),
            _ => None,
        }
    }

    /// True for `Empty` and for fully masked images.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Constant(_) => false,
            Self::Image(r) => r.is_fully_masked(),
            Self::Empty => true,
        }
    }
}

/// A resolved Tcorr value tagged with its provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TcorrResult {
    pub value: TcorrValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<Raster>,
    pub index: TcorrIndex,
    /// Number of coarse cold cells with fine support, for gridded results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coarse_count: Option<u32>,
}

impl TcorrResult {
    pub fn constant(value: f64, index: TcorrIndex) -> Self {
        Self {
            value: TcorrValue::Constant(value),
            quality: None,
            index,
            coarse_count: None,
        }
    }

    /// The nodata result used when no source has a value.
    pub fn nodata() -> Self {
        Self {
            value: TcorrValue::Empty,
            quality: None,
            index: TcorrIndex::NoData,
            coarse_count: None,
        }
    }
}

/// Metadata stored with each Tcorr asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetProperties {
    pub tcorr_index: TcorrIndex,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tcorr_coarse_count: Option<u32>,

    #[serde(
        rename = "system:time_start",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub time_start: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wrs2_tile: Option<Wrs2Tile>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tmax_source: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tmax_version: Option<String>,

    /// Number of scenes averaged into a climatology.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tcorr_scene_count: Option<u32>,

    /// Any other properties, carried through untouched.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl AssetProperties {
    pub fn new(tcorr_index: TcorrIndex) -> Self {
        Self {
            tcorr_index,
            tcorr_coarse_count: None,
            time_start: None,
            date: None,
            month: None,
            wrs2_tile: None,
            tmax_source: None,
            tmax_version: None,
            tcorr_scene_count: None,
            extra: BTreeMap::new(),
        }
    }

    /// Calendar month, from `month` or else from `date`.
    pub fn effective_month(&self) -> Option<u32> {
        self.month.or_else(|| self.date.map(|d| d.month()))
    }
}

/// A stored Tcorr image or scalar with its properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TcorrAsset {
    pub id: String,
    pub properties: AssetProperties,
    pub value: TcorrValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<Raster>,
    /// Per-pixel scene count, for climatology assets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<Raster>,
}

impl TcorrAsset {
    pub fn index(&self) -> TcorrIndex {
        self.properties.tcorr_index
    }

    pub fn into_result(self) -> TcorrResult {
        TcorrResult {
            value: self.value,
            quality: self.quality,
            index: self.properties.tcorr_index,
            coarse_count: self.properties.tcorr_coarse_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_serializes_as_number() {
        assert_eq!(serde_json::to_string(&TcorrIndex::Month).unwrap(), "4");
        let index: TcorrIndex = serde_json::from_str("9").unwrap();
        assert_eq!(index, TcorrIndex::NoData);
        assert!(serde_json::from_str::<TcorrIndex>("10").is_err());
    }

    #[test]
    fn test_index_ordering_prefers_lower_codes() {
        let mut indices = vec![TcorrIndex::NoData, TcorrIndex::Default, TcorrIndex::Month];
        indices.sort();
        assert_eq!(indices[0], TcorrIndex::Month);
    }

    #[test]
    fn test_asset_json_format() {
        let json = r#"{
            "id": "p044r033_month07",
            "properties": {
                "tcorr_index": 4,
                "month": 7,
                "wrs2_tile": "p044r033",
                "system:time_start": 1500163200000,
                "model_name": "SSEBOP"
            },
            "value": {"constant": 0.978}
        }"#;
        let asset: TcorrAsset = serde_json::from_str(json).unwrap();
        assert_eq!(asset.index(), TcorrIndex::Month);
        assert_eq!(asset.properties.wrs2_tile, Some(Wrs2Tile::new(44, 33)));
        assert_eq!(asset.properties.time_start, Some(1_500_163_200_000));
        assert_eq!(asset.properties.extra["model_name"], "SSEBOP");
        assert_eq!(asset.value.as_constant(), Some(0.978));

        let out = serde_json::to_value(&asset).unwrap();
        assert_eq!(out["properties"]["system:time_start"], 1_500_163_200_000i64);
        assert_eq!(out["value"]["constant"], 0.978);
    }

    #[test]
    fn test_effective_month() {
        let mut props = AssetProperties::new(TcorrIndex::Scene);
        assert_eq!(props.effective_month(), None);
        props.date = NaiveDate::from_ymd_opt(2017, 7, 16);
        assert_eq!(props.effective_month(), Some(7));
        props.month = Some(8);
        assert_eq!(props.effective_month(), Some(8));
    }
}
