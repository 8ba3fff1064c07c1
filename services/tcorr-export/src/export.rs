//! Per-scene Tcorr export.

use anyhow::{Context, Result};
use chrono::Datelike;
use futures::stream::{self, StreamExt};
use serde_json::json;
use ssebop_common::{time_start_millis, SceneId};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use tcorr_processor::{
    AssetCatalog, AssetProperties, CollectionKind, SceneImage, TcorrAsset, TcorrResult,
    TcorrSelector, TcorrSourceKind,
};

use crate::config::ExportConfig;

pub const MODEL_NAME: &str = "SSEBOP";
pub const TOOL_NAME: &str = env!("CARGO_PKG_NAME");
pub const TOOL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// What happened to one scene.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    Written,
    /// Output already present and overwrite is off.
    Exists,
    /// Outside the date window or on a skipped tile.
    Filtered,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub written: usize,
    pub existing: usize,
    pub filtered: usize,
    pub failed: usize,
}

/// Resolves Tcorr for scene input files and writes the results to the
/// catalog.
pub struct Exporter {
    selector: TcorrSelector,
    catalog: Arc<dyn AssetCatalog>,
    config: ExportConfig,
}

impl Exporter {
    pub fn new(catalog: Arc<dyn AssetCatalog>, config: ExportConfig) -> Result<Self> {
        config.validate()?;
        let selector = TcorrSelector::new(
            catalog.clone(),
            config.model.clone(),
            config.tmax_source.clone(),
        )?;
        Ok(Self {
            selector,
            catalog,
            config,
        })
    }

    /// Gridded sources are written to the gridded scene collection, all
    /// others to the scene collection.
    pub fn output_collection(&self) -> CollectionKind {
        if self.config.tcorr_source.is_gridded() {
            CollectionKind::GriddedScene
        } else {
            CollectionKind::Scene
        }
    }

    /// Export every scene file, `max_concurrent` at a time.
    pub async fn run(&self, paths: Vec<PathBuf>) -> ExportSummary {
        info!(
            scenes = paths.len(),
            source = %self.config.tcorr_source,
            tmax_source = %self.config.tmax_source,
            collection = %self.output_collection(),
            "Starting export"
        );

        let results: Vec<Result<ExportOutcome>> = stream::iter(paths)
            .map(|path| async move {
                let outcome = self.export_file(&path).await;
                if let Err(e) = &outcome {
                    error!(file = %path.display(), error = %format!("{:#}", e), "Export failed");
                }
                outcome
            })
            .buffer_unordered(self.config.max_concurrent)
            .collect()
            .await;

        let mut summary = ExportSummary::default();
        for result in results {
            match result {
                Ok(ExportOutcome::Written) => summary.written += 1,
                Ok(ExportOutcome::Exists) => summary.existing += 1,
                Ok(ExportOutcome::Filtered) => summary.filtered += 1,
                Err(_) => summary.failed += 1,
            }
        }

        info!(
            written = summary.written,
            existing = summary.existing,
            filtered = summary.filtered,
            failed = summary.failed,
            "Export complete"
        );
        summary
    }

    async fn export_file(&self, path: &Path) -> Result<ExportOutcome> {
        let scene = load_scene(path).await?;
        self.export_scene(&scene).await
    }

    /// Resolve and write one scene.
    pub async fn export_scene(&self, scene: &SceneImage) -> Result<ExportOutcome> {
        let id = scene.scene_id.to_string();
        if !self.config.wants(&scene.scene_id) {
            debug!(scene = %id, "Scene filtered out");
            return Ok(ExportOutcome::Filtered);
        }

        let collection = self.output_collection();
        if !self.config.overwrite && self.catalog.exists(collection, &id).await? {
            debug!(scene = %id, "Output exists, skipping");
            return Ok(ExportOutcome::Exists);
        }

        let result = self
            .selector
            .resolve(self.config.tcorr_source, scene)
            .await
            .with_context(|| format!("Failed to resolve Tcorr for {}", id))?;
        if result.value.is_empty() {
            warn!(scene = %id, tcorr_index = result.index.code(), "Writing empty Tcorr");
        }

        let asset = build_asset(
            &scene.scene_id,
            result,
            self.config.tcorr_source,
            &self.config.tmax_source,
        );
        self.catalog
            .put(collection, asset)
            .await
            .with_context(|| format!("Failed to write {}", id))?;
        info!(scene = %id, collection = %collection, "Exported scene");
        Ok(ExportOutcome::Written)
    }
}

/// The stored asset for a scene result, with the export properties.
pub fn build_asset(
    scene: &SceneId,
    result: TcorrResult,
    source: TcorrSourceKind,
    tmax_source: &str,
) -> TcorrAsset {
    let date = scene.date;
    let mut properties = AssetProperties::new(result.index);
    properties.tcorr_coarse_count = result.coarse_count;
    properties.time_start = Some(time_start_millis(date));
    properties.date = Some(date);
    properties.month = Some(date.month());
    properties.wrs2_tile = Some(scene.wrs2);
    properties.tmax_source = Some(tmax_source.to_string());

    let extra = [
        ("doy", json!(date.ordinal())),
        ("year", json!(date.year())),
        ("scene_id", json!(scene.to_string())),
        ("wrs2_path", json!(scene.wrs2.path)),
        ("wrs2_row", json!(scene.wrs2.row)),
        ("coll_id", json!(format!("LANDSAT/{}/C02/T1_L2", scene.spacecraft))),
        ("model_name", json!(MODEL_NAME)),
        ("tool_name", json!(TOOL_NAME)),
        ("tool_version", json!(TOOL_VERSION)),
        ("tcorr_source", json!(source.to_string())),
    ];
    properties
        .extra
        .extend(extra.into_iter().map(|(k, v)| (k.to_string(), v)));

    TcorrAsset {
        id: scene.to_string(),
        properties,
        value: result.value,
        quality: result.quality,
        count: None,
    }
}

/// Read a scene input document.
pub async fn load_scene(path: &Path) -> Result<SceneImage> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read scene file: {}", path.display()))?;
    serde_json::from_slice(&bytes)
        .with_context(|| format!("Failed to parse scene file: {}", path.display()))
}

/// Scene input files in `dir`, sorted by name.
pub async fn list_scene_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .with_context(|| format!("Failed to read scenes directory: {}", dir.display()))?;

    let mut paths = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "json") {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}
