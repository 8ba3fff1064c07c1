//! Precomputed Tcorr asset collections.

mod filesystem;
mod memory;

pub use filesystem::FilesystemCatalog;
pub use memory::MemoryCatalog;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ssebop_common::{DateRange, Wrs2Tile};
use std::fmt;
use std::str::FromStr;

use crate::error::Result;
use crate::types::{AssetProperties, TcorrAsset};

/// The asset collections a catalog holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionKind {
    /// Per-scene Tcorr statistics.
    Scene,
    /// Monthly climatology per WRS2 tile.
    Monthly,
    /// Annual climatology per WRS2 tile.
    Annual,
    /// Default value per Tmax source.
    Default,
    /// Nodata template.
    NoData,
    /// Gridded Tcorr images per scene.
    GriddedScene,
    /// Monthly gridded Tcorr composites per WRS2 tile.
    GriddedMonthly,
}

impl CollectionKind {
    pub const ALL: [CollectionKind; 7] = [
        Self::Scene,
        Self::Monthly,
        Self::Annual,
        Self::Default,
        Self::NoData,
        Self::GriddedScene,
        Self::GriddedMonthly,
    ];

    /// Directory or key name of the collection.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scene => "scene",
            Self::Monthly => "monthly",
            Self::Annual => "annual",
            Self::Default => "default",
            Self::NoData => "nodata",
            Self::GriddedScene => "gridded_scene",
            Self::GriddedMonthly => "gridded_monthly",
        }
    }
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CollectionKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown collection: {}", s))
    }
}

/// Property filter for catalog queries. Unset fields match everything; a
/// set field only matches assets that carry the property.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssetFilter {
    pub date: Option<DateRange>,
    pub wrs2_tile: Option<Wrs2Tile>,
    pub month: Option<u32>,
    /// Compared case-insensitively.
    pub tmax_source: Option<String>,
}

impl AssetFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assets dated on `date`.
    pub fn on_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(DateRange::day(date));
        self
    }

    pub fn with_tile(mut self, tile: Wrs2Tile) -> Self {
        self.wrs2_tile = Some(tile);
        self
    }

    pub fn with_month(mut self, month: u32) -> Self {
        self.month = Some(month);
        self
    }

    /// Assets computed from this Tmax source.
    pub fn with_tmax_source(mut self, tmax_source: impl Into<String>) -> Self {
        self.tmax_source = Some(tmax_source.into());
        self
    }

    pub fn matches(&self, properties: &AssetProperties) -> bool {
        if let Some(range) = &self.date {
            match asset_date(properties) {
                Some(date) if range.contains(date) => {}
                _ => return false,
            }
        }
        if let Some(tile) = &self.wrs2_tile {
            if properties.wrs2_tile.as_ref() != Some(tile) {
                return false;
            }
        }
        if let Some(month) = self.month {
            if properties.effective_month() != Some(month) {
                return false;
            }
        }
        if let Some(tmax) = &self.tmax_source {
            match &properties.tmax_source {
                Some(source) if source.eq_ignore_ascii_case(tmax) => {}
                _ => return false,
            }
        }
        true
    }
}

/// Asset date from `date`, or else from `system:time_start`.
fn asset_date(properties: &AssetProperties) -> Option<NaiveDate> {
    properties.date.or_else(|| {
        properties
            .time_start
            .and_then(chrono::DateTime::from_timestamp_millis)
            .map(|dt| dt.date_naive())
    })
}

/// A store of Tcorr asset collections.
///
/// Query results are ordered by asset ID.
#[async_trait]
pub trait AssetCatalog: Send + Sync {
    /// Assets in `collection` matching `filter`.
    async fn query(&self, collection: CollectionKind, filter: &AssetFilter) -> Result<Vec<TcorrAsset>>;

    /// Insert or replace an asset.
    async fn put(&self, collection: CollectionKind, asset: TcorrAsset) -> Result<()>;

    /// Whether an asset with this ID exists.
    async fn exists(&self, collection: CollectionKind, id: &str) -> Result<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TcorrIndex;
    use ssebop_common::time_start_millis;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_collection_names() {
        for kind in CollectionKind::ALL {
            assert_eq!(kind.as_str().parse::<CollectionKind>().unwrap(), kind);
        }
        assert!("weekly".parse::<CollectionKind>().is_err());
    }

    #[test]
    fn test_filter_by_date_and_tile() {
        let mut props = AssetProperties::new(TcorrIndex::Scene);
        props.time_start = Some(time_start_millis(date(2017, 7, 16)));
        props.wrs2_tile = Some(Wrs2Tile::new(44, 33));

        let filter = AssetFilter::new()
            .on_date(date(2017, 7, 16))
            .with_tile(Wrs2Tile::new(44, 33));
        assert!(filter.matches(&props));
        assert!(!AssetFilter::new().on_date(date(2017, 7, 17)).matches(&props));
        assert!(!AssetFilter::new().with_tile(Wrs2Tile::new(44, 34)).matches(&props));
        assert!(AssetFilter::new().matches(&props));
    }

    #[test]
    fn test_filter_requires_property() {
        let props = AssetProperties::new(TcorrIndex::Default);
        assert!(!AssetFilter::new().with_month(7).matches(&props));
        assert!(!AssetFilter::new().with_tile(Wrs2Tile::new(1, 1)).matches(&props));
        assert!(!AssetFilter::new().with_tmax_source("DAYMET_MEDIAN_V2").matches(&props));
    }

    #[test]
    fn test_filter_by_tmax_source() {
        let mut props = AssetProperties::new(TcorrIndex::Default);
        props.tmax_source = Some("DAYMET_MEDIAN_V2".into());
        assert!(AssetFilter::new().with_tmax_source("DAYMET_MEDIAN_V2").matches(&props));
        assert!(AssetFilter::new().with_tmax_source("daymet_median_v2").matches(&props));
        assert!(!AssetFilter::new().with_tmax_source("GRIDMET_MEDIAN_V1").matches(&props));
    }
}
