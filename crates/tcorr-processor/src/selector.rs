//! Tcorr source resolution.
//!
//! Every source resolves to a [`TcorrResult`]. Missing data never fails:
//! a source without a value falls through its fallbacks down to the
//! nodata result (`tcorr_index` 9).

use chrono::Datelike;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::blend::{BlendOutput, GridBlender};
use crate::catalog::{AssetCatalog, AssetFilter, CollectionKind};
use crate::coarse::CoarseAggregator;
use crate::config::TcorrConfig;
use crate::error::{Result, TcorrError};
use crate::evaluate::{Evaluator, RetryPolicy};
use crate::fallback::{substitute, ClimatologyFallback};
use crate::ratio::{SceneImage, TemperatureRatioExtractor};
use crate::source::TcorrSourceKind;
use crate::stats::percentile;
use crate::types::{TcorrIndex, TcorrResult};

/// Scene-wide cold ratio statistic used by `DYNAMIC`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DynamicStatistic {
    pub value: Option<f32>,
    pub count: usize,
}

/// Resolves Tcorr for scenes from one configured Tmax source.
#[derive(Clone)]
pub struct TcorrSelector {
    evaluator: Evaluator,
    config: TcorrConfig,
    tmax_source: String,
    extractor: TemperatureRatioExtractor,
    aggregator: CoarseAggregator,
    blender: GridBlender,
    fallback: ClimatologyFallback,
}

impl TcorrSelector {
    pub fn new(
        catalog: Arc<dyn AssetCatalog>,
        config: TcorrConfig,
        tmax_source: impl Into<String>,
    ) -> Result<Self> {
        config.validate().map_err(TcorrError::ConfigError)?;

        let evaluator = Evaluator::new(catalog, RetryPolicy::from_config(&config));
        let tmax_source = tmax_source.into();
        Ok(Self {
            extractor: TemperatureRatioExtractor::new(config.reflectance_type),
            aggregator: CoarseAggregator::new(&config),
            blender: GridBlender::new(),
            fallback: ClimatologyFallback::new(evaluator.clone(), tmax_source.clone()),
            evaluator,
            config,
            tmax_source,
        })
    }

    pub fn config(&self) -> &TcorrConfig {
        &self.config
    }

    pub fn tmax_source(&self) -> &str {
        &self.tmax_source
    }

    /// Parse `source` and resolve it.
    pub async fn resolve_str(&self, source: &str, scene: &SceneImage) -> Result<TcorrResult> {
        let kind: TcorrSourceKind = source.parse()?;
        self.resolve(kind, scene).await
    }

    /// Resolve Tcorr for a scene.
    pub async fn resolve(&self, source: TcorrSourceKind, scene: &SceneImage) -> Result<TcorrResult> {
        source.check_tmax_source(&self.tmax_source)?;

        let result = match source {
            TcorrSourceKind::Constant(value) => TcorrResult::constant(value, TcorrIndex::User),
            TcorrSourceKind::Dynamic => self.resolve_dynamic(scene).await?,
            TcorrSourceKind::Gridded => self.resolve_gridded(scene, false).await?,
            TcorrSourceKind::GriddedCold => self.resolve_gridded(scene, true).await?,
            TcorrSourceKind::Scene => {
                let filter = self.scene_filter(scene);
                let scene_value = self.evaluator.first(CollectionKind::Scene, &filter).await?;
                self.merge_with_climatologies(scene, scene_value.map(|a| a.into_result()))
                    .await?
            }
            TcorrSourceKind::SceneGridded => self.resolve_scene_gridded(scene).await?,
            TcorrSourceKind::SceneDaily => {
                self.single_collection(CollectionKind::Scene, &self.scene_filter(scene))
                    .await?
            }
            TcorrSourceKind::SceneMonthly => {
                self.single_collection(CollectionKind::Monthly, &self.monthly_filter(scene))
                    .await?
            }
            TcorrSourceKind::SceneAnnual => {
                self.single_collection(CollectionKind::Annual, &self.annual_filter(scene))
                    .await?
            }
            TcorrSourceKind::SceneDefault => {
                self.single_collection(CollectionKind::Default, &self.source_filter())
                    .await?
            }
        };

        info!(
            scene = %scene.scene_id,
            source = %source,
            tmax_source = %self.tmax_source,
            tcorr_index = result.index.code(),
            "Resolved Tcorr"
        );
        Ok(result)
    }

    /// Scene-wide percentile and count of the fine cold ratios.
    pub fn dynamic_statistic(&self, scene: &SceneImage) -> Result<DynamicStatistic> {
        let cold = self.extractor.cold(scene)?;
        let values = cold.raster.valid_values();
        Ok(DynamicStatistic {
            value: percentile(&values, self.config.dynamic_percentile),
            count: values.len(),
        })
    }

    /// Run the gridded pipeline without the climatology fallback.
    pub fn blend(&self, scene: &SceneImage, cold_only: bool) -> Result<BlendOutput> {
        let cold = self.aggregator.aggregate(&self.extractor.cold(scene)?)?;
        debug!(
            scene = %scene.scene_id,
            cells = cold.valid_cells(),
            samples = cold.total_samples(),
            "Aggregated cold candidates"
        );
        if cold_only {
            return self.blender.blend_cold(&cold);
        }

        let hot = self.aggregator.aggregate(&self.extractor.hot(scene)?)?;
        debug!(
            scene = %scene.scene_id,
            cells = hot.valid_cells(),
            samples = hot.total_samples(),
            "Aggregated hot candidates"
        );
        self.blender.blend_cold_hot(&cold, &hot)
    }

    async fn resolve_dynamic(&self, scene: &SceneImage) -> Result<TcorrResult> {
        let stat = self.dynamic_statistic(scene)?;
        debug!(
            scene = %scene.scene_id,
            value = ?stat.value,
            count = stat.count,
            threshold = self.config.dynamic_count_threshold,
            "Scene-wide cold statistic"
        );

        match stat.value {
            // Nothing in the catalogs ranks below index 0.
            Some(value) if stat.count >= self.config.dynamic_count_threshold as usize => {
                Ok(TcorrResult::constant(value as f64, TcorrIndex::Gridded))
            }
            _ => self.merge_with_climatologies(scene, None).await,
        }
    }

    async fn resolve_gridded(&self, scene: &SceneImage, cold_only: bool) -> Result<TcorrResult> {
        // The rayon pixel loops must not hold an async worker.
        let selector = self.clone();
        let owned = scene.clone();
        let output =
            tokio::task::spawn_blocking(move || selector.blend(&owned, cold_only)).await??;
        if self.config.fill_climatology {
            self.fallback.apply(output, &scene.scene_id).await
        } else {
            Ok(substitute(output, None))
        }
    }

    async fn resolve_scene_gridded(&self, scene: &SceneImage) -> Result<TcorrResult> {
        let chain = [
            (CollectionKind::GriddedScene, self.scene_filter(scene)),
            (CollectionKind::GriddedMonthly, self.monthly_filter(scene)),
            (CollectionKind::NoData, AssetFilter::new()),
        ];
        for (collection, filter) in &chain {
            if let Some(asset) = self.evaluator.first(*collection, filter).await? {
                if *collection != CollectionKind::GriddedScene {
                    debug!(scene = %scene.scene_id, collection = %collection, "Gridded scene fallback");
                }
                return Ok(asset.into_result());
            }
        }
        warn!(scene = %scene.scene_id, "No gridded Tcorr and no nodata template");
        Ok(TcorrResult::nodata())
    }

    /// Merge a scene value with the month, annual, default and nodata
    /// candidates and keep the one with the lowest index.
    async fn merge_with_climatologies(
        &self,
        scene: &SceneImage,
        scene_value: Option<TcorrResult>,
    ) -> Result<TcorrResult> {
        let monthly_filter = self.monthly_filter(scene);
        let annual_filter = self.annual_filter(scene);
        let default_filter = self.source_filter();
        let none = AssetFilter::new();
        let (monthly, annual, default, nodata) = futures::try_join!(
            self.evaluator.first(CollectionKind::Monthly, &monthly_filter),
            self.evaluator.first(CollectionKind::Annual, &annual_filter),
            self.evaluator.first(CollectionKind::Default, &default_filter),
            self.evaluator.first(CollectionKind::NoData, &none),
        )?;

        let mut candidates: Vec<TcorrResult> = scene_value
            .into_iter()
            .chain(
                [monthly, annual, default, nodata]
                    .into_iter()
                    .flatten()
                    .map(|asset| asset.into_result()),
            )
            .collect();
        candidates.sort_by_key(|c| c.index);

        Ok(candidates.into_iter().next().unwrap_or_else(|| {
            warn!(scene = %scene.scene_id, "No Tcorr candidates and no nodata template");
            TcorrResult::nodata()
        }))
    }

    async fn single_collection(&self, collection: CollectionKind, filter: &AssetFilter) -> Result<TcorrResult> {
        if let Some(asset) = self.evaluator.first(collection, filter).await? {
            return Ok(asset.into_result());
        }
        let nodata = self.evaluator.first(CollectionKind::NoData, &AssetFilter::new()).await?;
        Ok(nodata
            .map(|asset| asset.into_result())
            .unwrap_or_else(TcorrResult::nodata))
    }

    /// Every collection except the nodata template is per Tmax source.
    fn source_filter(&self) -> AssetFilter {
        AssetFilter::new().with_tmax_source(self.tmax_source.as_str())
    }

    fn scene_filter(&self, scene: &SceneImage) -> AssetFilter {
        self.source_filter()
            .on_date(scene.scene_id.date)
            .with_tile(scene.scene_id.wrs2)
    }

    fn monthly_filter(&self, scene: &SceneImage) -> AssetFilter {
        self.source_filter()
            .with_tile(scene.scene_id.wrs2)
            .with_month(scene.scene_id.date.month())
    }

    fn annual_filter(&self, scene: &SceneImage) -> AssetFilter {
        self.source_filter().with_tile(scene.scene_id.wrs2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MemoryCatalog;
    use crate::raster::Raster;
    use crate::ratio::{LST_BAND, NDVI_BAND, TMAX_BAND};
    use crate::types::{AssetProperties, TcorrAsset, TcorrValue};
    use ssebop_common::{CrsCode, GridProjection, Wrs2Tile};
    use test_utils::assert_approx_eq;

    fn scene(ndvi: f32, size: usize) -> SceneImage {
        let grid = GridProjection::new(CrsCode::UtmNorth(11), 30.0, 15.0, 15.0 + 30.0 * size as f64, size, size);
        SceneImage::new("LC08_044033_20170716".parse().unwrap())
            .with_band(LST_BAND, Raster::filled(grid.clone(), 300.0))
            .with_band(NDVI_BAND, Raster::filled(grid.clone(), ndvi))
            .with_band(TMAX_BAND, Raster::filled(grid, 306.0))
    }

    fn constant_asset(id: &str, index: TcorrIndex, value: f64) -> TcorrAsset {
        let mut properties = AssetProperties::new(index);
        properties.wrs2_tile = Some(Wrs2Tile::new(44, 33));
        properties.month = Some(7);
        properties.tmax_source = Some("DAYMET_MEDIAN_V2".into());
        TcorrAsset {
            id: id.into(),
            properties,
            value: TcorrValue::Constant(value),
            quality: None,
            count: None,
        }
    }

    fn selector(catalog: MemoryCatalog, config: TcorrConfig) -> TcorrSelector {
        TcorrSelector::new(Arc::new(catalog), config, "DAYMET_MEDIAN_V2").unwrap()
    }

    #[tokio::test]
    async fn test_dynamic_uses_scene_value_above_threshold() {
        let config = TcorrConfig {
            dynamic_count_threshold: 50,
            ..TcorrConfig::default()
        };
        let result = selector(MemoryCatalog::new(), config)
            .resolve(TcorrSourceKind::Dynamic, &scene(0.8, 10))
            .await
            .unwrap();
        assert_eq!(result.index, TcorrIndex::Gridded);
        assert_approx_eq!(result.value.as_constant().unwrap(), 300.0 / 306.0, 1e-5);
    }

    #[tokio::test]
    async fn test_dynamic_falls_back_below_threshold() {
        let catalog = MemoryCatalog::with_assets([
            (CollectionKind::Annual, constant_asset("p044r033", TcorrIndex::Annual, 0.97)),
            (CollectionKind::Default, constant_asset("default", TcorrIndex::Default, 0.978)),
        ]);
        let result = selector(catalog, TcorrConfig::default())
            .resolve(TcorrSourceKind::Dynamic, &scene(0.8, 10))
            .await
            .unwrap();
        assert_eq!(result.index, TcorrIndex::Annual);
        assert_eq!(result.value.as_constant(), Some(0.97));
    }

    #[tokio::test]
    async fn test_lookups_match_tmax_source() {
        let mut gridmet = constant_asset("a_gridmet", TcorrIndex::Default, 0.5);
        gridmet.properties.tmax_source = Some("GRIDMET_MEDIAN_V1".into());
        let catalog = MemoryCatalog::with_assets([
            (CollectionKind::Default, gridmet),
            (CollectionKind::Default, constant_asset("b_daymet", TcorrIndex::Default, 0.978)),
        ]);
        let selector = selector(catalog, TcorrConfig::default());

        let result = selector
            .resolve(TcorrSourceKind::SceneDefault, &scene(0.8, 4))
            .await
            .unwrap();
        assert_eq!(result.value.as_constant(), Some(0.978));

        let result = selector
            .resolve(TcorrSourceKind::Scene, &scene(0.8, 4))
            .await
            .unwrap();
        assert_eq!(result.index, TcorrIndex::Default);
        assert_eq!(result.value.as_constant(), Some(0.978));
    }

    #[tokio::test]
    async fn test_nothing_anywhere_is_nodata() {
        let result = selector(MemoryCatalog::new(), TcorrConfig::default())
            .resolve(TcorrSourceKind::SceneAnnual, &scene(0.8, 4))
            .await
            .unwrap();
        assert_eq!(result, TcorrResult::nodata());
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let config = TcorrConfig {
            retry_attempts: 0,
            ..TcorrConfig::default()
        };
        let result = TcorrSelector::new(Arc::new(MemoryCatalog::new()), config, "DAYMET_MEDIAN_V2");
        assert!(matches!(result, Err(TcorrError::ConfigError(_))));
    }
}
