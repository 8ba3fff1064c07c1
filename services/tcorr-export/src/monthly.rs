//! Monthly gridded composite export.

use anyhow::{Context, Result};
use ssebop_common::Wrs2Tile;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info};

use tcorr_processor::{
    monthly_asset_id, AssetCatalog, AssetFilter, CollectionKind, Evaluator,
    MonthlyClimatologyBuilder, RetryPolicy,
};

use crate::config::ExportConfig;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MonthlySummary {
    pub written: usize,
    pub existing: usize,
    /// Tile and month combinations without any usable scene.
    pub empty: usize,
}

/// Builds monthly composites from the gridded scene collection.
pub struct MonthlyExporter {
    catalog: Arc<dyn AssetCatalog>,
    evaluator: Evaluator,
    builder: MonthlyClimatologyBuilder,
    config: ExportConfig,
}

impl MonthlyExporter {
    pub fn new(catalog: Arc<dyn AssetCatalog>, config: ExportConfig, years: Option<Vec<i32>>) -> Self {
        let evaluator = Evaluator::new(catalog.clone(), RetryPolicy::from_config(&config.model));
        let mut builder =
            MonthlyClimatologyBuilder::new(&config.model).with_tmax_source(config.tmax_source.as_str());
        if let Some(years) = years {
            builder = builder.with_years(years);
        }
        Self {
            catalog,
            evaluator,
            builder,
            config,
        }
    }

    /// Tiles present in the gridded scene collection.
    pub async fn discover_tiles(&self) -> Result<Vec<Wrs2Tile>> {
        let scenes = self
            .evaluator
            .query(CollectionKind::GriddedScene, &AssetFilter::new())
            .await?;
        let tiles: BTreeSet<Wrs2Tile> = scenes
            .iter()
            .filter_map(|asset| asset.properties.wrs2_tile)
            .collect();
        Ok(tiles.into_iter().collect())
    }

    /// Build and store composites for every tile and month. An empty
    /// `tiles` list means every tile with gridded scenes.
    pub async fn run(&self, tiles: Vec<Wrs2Tile>, months: &[u32]) -> Result<MonthlySummary> {
        let tiles = if tiles.is_empty() {
            self.discover_tiles().await?
        } else {
            tiles
        };

        let mut summary = MonthlySummary::default();
        for tile in tiles {
            if self.config.wrs2_skip.contains(&tile) {
                debug!(tile = %tile, "Tile skipped");
                continue;
            }
            for &month in months {
                let id = monthly_asset_id(tile, month);
                if !self.config.overwrite
                    && self.catalog.exists(CollectionKind::GriddedMonthly, &id).await?
                {
                    debug!(asset = %id, "Composite exists, skipping");
                    summary.existing += 1;
                    continue;
                }

                match self.builder.compose(&self.evaluator, tile, month).await? {
                    Some(asset) => {
                        self.catalog
                            .put(CollectionKind::GriddedMonthly, asset)
                            .await
                            .with_context(|| format!("Failed to write {}", id))?;
                        summary.written += 1;
                    }
                    None => summary.empty += 1,
                }
            }
        }

        info!(
            written = summary.written,
            existing = summary.existing,
            empty = summary.empty,
            "Monthly composites complete"
        );
        Ok(summary)
    }
}

/// Parse a month list such as `6,7,8` or `5-9`.
pub fn parse_months(s: &str) -> Result<Vec<u32>> {
    let mut months = BTreeSet::new();
    for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (start, end) = match part.split_once('-') {
            Some((a, b)) => (a.trim().parse::<u32>()?, b.trim().parse::<u32>()?),
            None => {
                let m = part.parse::<u32>()?;
                (m, m)
            }
        };
        anyhow::ensure!(
            (1..=12).contains(&start) && (1..=12).contains(&end) && start <= end,
            "Invalid month range: {}",
            part
        );
        months.extend(start..=end);
    }
    anyhow::ensure!(!months.is_empty(), "No months given");
    Ok(months.into_iter().collect())
}
