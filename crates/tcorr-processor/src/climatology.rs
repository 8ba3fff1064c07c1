//! Monthly gridded Tcorr composites.
//!
//! A composite is the per-pixel mean of the cold-only gridded scene
//! results for one WRS2 tile and calendar month, over every available
//! year or a chosen subset of years.

use chrono::Datelike;
use ssebop_common::Wrs2Tile;
use tracing::{debug, info};

use crate::catalog::{AssetFilter, CollectionKind};
use crate::config::TcorrConfig;
use crate::error::{Result, TcorrError};
use crate::evaluate::Evaluator;
use crate::raster::Raster;
use crate::types::{AssetProperties, TcorrAsset, TcorrIndex, TcorrValue};

/// Asset ID of a monthly composite, e.g. `p044r033_month07`.
pub fn monthly_asset_id(tile: Wrs2Tile, month: u32) -> String {
    format!("{}_month{:02}", tile, month)
}

/// Builds monthly composites from gridded scene results.
#[derive(Debug, Clone)]
pub struct MonthlyClimatologyBuilder {
    min_scene_count: u32,
    years: Option<Vec<i32>>,
    tmax_source: Option<String>,
}

impl MonthlyClimatologyBuilder {
    pub fn new(config: &TcorrConfig) -> Self {
        Self {
            min_scene_count: config.min_scene_count.max(1),
            years: None,
            tmax_source: None,
        }
    }

    /// Only use scenes from these years.
    pub fn with_years(mut self, years: Vec<i32>) -> Self {
        self.years = Some(years);
        self
    }

    /// Only use scenes computed from this Tmax source.
    pub fn with_tmax_source(mut self, tmax_source: impl Into<String>) -> Self {
        self.tmax_source = Some(tmax_source.into());
        self
    }

    /// Whether a scene result contributes to the composite for `tile` and
    /// `month`.
    pub fn accepts(&self, asset: &TcorrAsset, tile: Wrs2Tile, month: u32) -> bool {
        let props = &asset.properties;
        if props.tcorr_index != TcorrIndex::GriddedCold
            || props.tcorr_coarse_count.unwrap_or(0) == 0
            || props.wrs2_tile != Some(tile)
            || props.effective_month() != Some(month)
        {
            return false;
        }
        if let Some(tmax) = &self.tmax_source {
            match &props.tmax_source {
                Some(source) if source.eq_ignore_ascii_case(tmax) => {}
                _ => return false,
            }
        }
        match (&self.years, props.date) {
            (None, _) => true,
            (Some(years), Some(date)) => years.contains(&date.year()),
            (Some(_), None) => false,
        }
    }

    /// Composite the accepted scenes. Returns `None` when no scene
    /// qualifies.
    pub fn build(&self, tile: Wrs2Tile, month: u32, scenes: &[TcorrAsset]) -> Result<Option<TcorrAsset>> {
        let images: Vec<(&TcorrAsset, &Raster)> = scenes
            .iter()
            .filter(|asset| self.accepts(asset, tile, month))
            .filter_map(|asset| asset.value.as_image().map(|image| (asset, image)))
            .collect();

        let Some((first_asset, first)) = images.first().copied() else {
            debug!(tile = %tile, month, "No scenes for monthly composite");
            return Ok(None);
        };

        let n = first.grid().len();
        let mut sum = vec![0.0f64; n];
        let mut count = vec![0u32; n];
        for (asset, image) in &images {
            first.ensure_same_grid(image).map_err(|_| {
                TcorrError::grid_mismatch(format!(
                    "{} is not on the grid of {}",
                    asset.id, first_asset.id
                ))
            })?;
            for i in 0..n {
                if let Some(v) = image.value(i) {
                    sum[i] += v as f64;
                    count[i] += 1;
                }
            }
        }

        let mean_data = sum
            .iter()
            .zip(&count)
            .map(|(&s, &c)| if c > 0 { (s / c as f64) as f32 } else { 0.0 })
            .collect();
        let mean_mask = count.iter().map(|&c| c >= self.min_scene_count).collect();
        let mean = Raster::new(first.grid().clone(), mean_data, mean_mask)?;

        let count_data = count.iter().map(|&c| c as f32).collect();
        let count_mask = count.iter().map(|&c| c > 0).collect();
        let count = Raster::new(first.grid().clone(), count_data, count_mask)?;

        let mut properties = AssetProperties::new(TcorrIndex::Month);
        properties.month = Some(month);
        properties.wrs2_tile = Some(tile);
        properties.tcorr_scene_count = Some(images.len() as u32);
        properties.tmax_source = first_asset.properties.tmax_source.clone();
        properties.tmax_version = first_asset.properties.tmax_version.clone();

        info!(
            tile = %tile,
            month,
            scenes = images.len(),
            pixels = mean.valid_count(),
            "Built monthly composite"
        );

        Ok(Some(TcorrAsset {
            id: monthly_asset_id(tile, month),
            properties,
            value: TcorrValue::Image(mean),
            quality: None,
            count: Some(count),
        }))
    }

    /// Query the gridded scene collection and composite it.
    pub async fn compose(&self, evaluator: &Evaluator, tile: Wrs2Tile, month: u32) -> Result<Option<TcorrAsset>> {
        let mut filter = AssetFilter::new().with_tile(tile).with_month(month);
        if let Some(tmax) = &self.tmax_source {
            filter = filter.with_tmax_source(tmax.as_str());
        }
        let scenes = evaluator.query(CollectionKind::GriddedScene, &filter).await?;
        self.build(tile, month, &scenes)
    }
}
