//! End-to-end Tcorr resolution against an in-memory catalog.

use std::sync::Arc;

use chrono::NaiveDate;
use ssebop_common::{time_start_millis, Wrs2Tile};
use tcorr_processor::ratio::{DT_BAND, LST_BAND, NDVI_BAND, TMAX_BAND};
use tcorr_processor::{
    AssetProperties, CollectionKind, MemoryCatalog, Raster, SceneImage, TcorrAsset, TcorrConfig,
    TcorrError, TcorrIndex, TcorrSelector, TcorrSourceKind, TcorrValue,
};
use test_utils::{assert_approx_eq, fixtures, landsat_grid};

const SIZE: usize = 20;

fn scene(ndvi: f32) -> SceneImage {
    let grid = landsat_grid(SIZE, SIZE);
    SceneImage::new(fixtures::scenes::LC08_JULY.parse().unwrap())
        .with_band(LST_BAND, Raster::filled(grid.clone(), 300.0))
        .with_band(NDVI_BAND, Raster::filled(grid.clone(), ndvi))
        .with_band(TMAX_BAND, Raster::filled(grid.clone(), 306.0))
        .with_band(DT_BAND, Raster::filled(grid, 12.0))
}

fn tile() -> Wrs2Tile {
    let (path, row) = fixtures::tiles::P044R033;
    Wrs2Tile::new(path, row)
}

fn constant(id: &str, index: TcorrIndex, value: f64) -> TcorrAsset {
    let mut properties = AssetProperties::new(index);
    properties.wrs2_tile = Some(tile());
    properties.month = Some(7);
    properties.tmax_source = Some(fixtures::tmax::DAYMET_MEDIAN_V2.into());
    TcorrAsset {
        id: id.into(),
        properties,
        value: TcorrValue::Constant(value),
        quality: None,
        count: None,
    }
}

fn scene_value(value: f64) -> TcorrAsset {
    let date = NaiveDate::from_ymd_opt(2017, 7, 16).unwrap();
    let mut asset = constant(fixtures::scenes::LC08_JULY, TcorrIndex::Scene, value);
    asset.properties.month = None;
    asset.properties.time_start = Some(time_start_millis(date));
    asset
}

fn monthly_composite(value: f32) -> TcorrAsset {
    let mut asset = constant("p044r033_month07", TcorrIndex::Month, 0.0);
    asset.value = TcorrValue::Image(Raster::filled(landsat_grid(SIZE, SIZE), value));
    asset
}

fn selector(catalog: MemoryCatalog, tmax_source: &str) -> TcorrSelector {
    TcorrSelector::new(Arc::new(catalog), TcorrConfig::default(), tmax_source).unwrap()
}

#[tokio::test]
async fn test_constant_source() {
    let result = selector(MemoryCatalog::new(), fixtures::tmax::GRIDMET_MEDIAN_V1)
        .resolve_str("0.9850", &scene(0.8))
        .await
        .unwrap();
    assert_eq!(result.index, TcorrIndex::User);
    assert_eq!(result.value.as_constant(), Some(0.985));
}

#[tokio::test]
async fn test_scene_with_only_monthly_entry() {
    let catalog = MemoryCatalog::with_assets([(
        CollectionKind::Monthly,
        constant("p044r033_07", TcorrIndex::Month, fixtures::tcorr::MONTHLY),
    )]);
    let result = selector(catalog, fixtures::tmax::DAYMET_MEDIAN_V2)
        .resolve(TcorrSourceKind::Scene, &scene(0.8))
        .await
        .unwrap();
    assert_eq!(result.index, TcorrIndex::Month);
    assert_eq!(result.value.as_constant(), Some(fixtures::tcorr::MONTHLY));
}

#[tokio::test]
async fn test_scene_prefers_scene_value() {
    let catalog = MemoryCatalog::with_assets([
        (CollectionKind::Scene, scene_value(fixtures::tcorr::SCENE)),
        (
            CollectionKind::Monthly,
            constant("p044r033_07", TcorrIndex::Month, fixtures::tcorr::MONTHLY),
        ),
        (
            CollectionKind::Default,
            constant("default", TcorrIndex::Default, fixtures::tcorr::DEFAULT),
        ),
    ]);
    let result = selector(catalog, fixtures::tmax::DAYMET_MEDIAN_V2)
        .resolve(TcorrSourceKind::Scene, &scene(0.8))
        .await
        .unwrap();
    assert_eq!(result.index, TcorrIndex::Scene);
    assert_eq!(result.value.as_constant(), Some(fixtures::tcorr::SCENE));
}

#[tokio::test]
async fn test_scene_daily_ignores_climatologies() {
    let catalog = MemoryCatalog::with_assets([(
        CollectionKind::Monthly,
        constant("p044r033_07", TcorrIndex::Month, fixtures::tcorr::MONTHLY),
    )]);
    let result = selector(catalog, fixtures::tmax::DAYMET_MEDIAN_V2)
        .resolve_str("SCENE_DAILY", &scene(0.8))
        .await
        .unwrap();
    assert_eq!(result.index, TcorrIndex::NoData);
    assert!(result.value.is_empty());
}

#[tokio::test]
async fn test_gridded_cold_with_support() {
    let result = selector(MemoryCatalog::new(), fixtures::tmax::DAYMET_MEDIAN_V2)
        .resolve(TcorrSourceKind::GriddedCold, &scene(0.8))
        .await
        .unwrap();
    assert_eq!(result.index, TcorrIndex::GriddedCold);
    assert_eq!(result.coarse_count, Some(1));

    let image = result.value.as_image().unwrap();
    assert!(image.valid_count() > 0);
    for v in image.valid_values() {
        assert_approx_eq!(v, 300.0 / 306.0, 1e-4);
    }
}

#[tokio::test]
async fn test_gridded_without_cold_pixels_and_no_composite() {
    let result = selector(MemoryCatalog::new(), fixtures::tmax::DAYMET_MEDIAN_V2)
        .resolve(TcorrSourceKind::GriddedCold, &scene(0.3))
        .await
        .unwrap();
    assert_eq!(result.index, TcorrIndex::NoData);
    assert_eq!(result.coarse_count, Some(0));
    assert!(result.value.is_empty());
}

#[tokio::test]
async fn test_gridded_without_cold_pixels_uses_monthly_composite() {
    let mut composite = monthly_composite(0.975);
    composite.properties.tmax_source = Some(fixtures::tmax::DAYMET_CLIMO.into());
    let catalog = MemoryCatalog::with_assets([(CollectionKind::GriddedMonthly, composite)]);
    let result = selector(catalog, fixtures::tmax::DAYMET_CLIMO)
        .resolve(TcorrSourceKind::GriddedCold, &scene(0.3))
        .await
        .unwrap();

    assert_eq!(result.index, TcorrIndex::Month);
    assert_eq!(result.coarse_count, None);
    assert_eq!(result.value.as_image().unwrap().get(0, 0), Some(0.975));
    let quality = result.quality.unwrap();
    assert_eq!(quality.valid_count(), SIZE * SIZE);
    assert!(quality.valid_values().iter().all(|&q| q == 0.0));
}

#[tokio::test]
async fn test_composite_from_other_tmax_source_is_ignored() {
    let mut composite = monthly_composite(0.975);
    composite.properties.tmax_source = Some(fixtures::tmax::GRIDMET_MEDIAN_V1.into());
    let catalog = MemoryCatalog::with_assets([(CollectionKind::GriddedMonthly, composite)]);
    let result = selector(catalog, fixtures::tmax::DAYMET_MEDIAN_V2)
        .resolve(TcorrSourceKind::GriddedCold, &scene(0.3))
        .await
        .unwrap();
    assert_eq!(result.index, TcorrIndex::NoData);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn test_gridded_resolution_on_multi_thread_runtime() {
    let selector = selector(MemoryCatalog::new(), fixtures::tmax::DAYMET_MEDIAN_V2);
    let scene = scene(0.8);
    let expected = selector.blend(&scene, false).unwrap();

    let result = selector.resolve(TcorrSourceKind::Gridded, &scene).await.unwrap();
    assert_eq!(result.index, expected.index);
    assert_eq!(result.coarse_count, Some(expected.coarse_count));
    let image = result.value.as_image().unwrap();
    assert!(image.valid_count() > 0);
    assert_eq!(image.valid_values(), expected.value.valid_values());
}

#[tokio::test]
async fn test_fill_climatology_disabled() {
    let catalog = MemoryCatalog::with_assets([(CollectionKind::GriddedMonthly, monthly_composite(0.975))]);
    let config = TcorrConfig {
        fill_climatology: false,
        ..TcorrConfig::default()
    };
    let selector = TcorrSelector::new(Arc::new(catalog), config, fixtures::tmax::DAYMET_MEDIAN_V2).unwrap();
    let result = selector
        .resolve(TcorrSourceKind::GriddedCold, &scene(0.3))
        .await
        .unwrap();
    assert_eq!(result.index, TcorrIndex::NoData);
}

#[tokio::test]
async fn test_cold_hot_blend_needs_cold_cells() {
    // Bare ground everywhere: hot cells exist but no cold cells
    let selector = selector(MemoryCatalog::new(), fixtures::tmax::DAYMET_MEDIAN_V2);
    let output = selector.blend(&scene(0.2), false).unwrap();
    assert_eq!(output.coarse_count, 0);
    assert_eq!(output.index, TcorrIndex::NoData);
    assert!(output.value.is_fully_masked());
}

#[tokio::test]
async fn test_scene_gridded_falls_back_to_monthly_composite() {
    let catalog = MemoryCatalog::with_assets([(CollectionKind::GriddedMonthly, monthly_composite(0.97))]);
    let result = selector(catalog, fixtures::tmax::DAYMET_MEDIAN_V2)
        .resolve(TcorrSourceKind::SceneGridded, &scene(0.8))
        .await
        .unwrap();
    assert_eq!(result.index, TcorrIndex::Month);

    let result = selector(MemoryCatalog::new(), fixtures::tmax::DAYMET_MEDIAN_V2)
        .resolve(TcorrSourceKind::SceneGridded, &scene(0.8))
        .await
        .unwrap();
    assert_eq!(result.index, TcorrIndex::NoData);
}

#[tokio::test]
async fn test_incompatible_tmax_source() {
    let result = selector(MemoryCatalog::new(), fixtures::tmax::GRIDMET_MEDIAN_V1)
        .resolve(TcorrSourceKind::Gridded, &scene(0.8))
        .await;
    assert!(matches!(result, Err(TcorrError::IncompatibleSource { .. })));
}

#[tokio::test]
async fn test_unsupported_source() {
    let result = selector(MemoryCatalog::new(), fixtures::tmax::DAYMET_MEDIAN_V2)
        .resolve_str("WEEKLY", &scene(0.8))
        .await;
    assert!(matches!(result, Err(TcorrError::UnsupportedSource(_))));
}

#[tokio::test]
async fn test_missing_band_is_fatal() {
    let mut scene = scene(0.8);
    scene.bands.remove(NDVI_BAND);
    let result = selector(MemoryCatalog::new(), fixtures::tmax::DAYMET_MEDIAN_V2)
        .resolve(TcorrSourceKind::GriddedCold, &scene)
        .await;
    assert!(matches!(result, Err(TcorrError::MissingBand(_))));
}
