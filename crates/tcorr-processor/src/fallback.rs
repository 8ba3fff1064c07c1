//! Monthly climatology substitution for scenes without cold support.

use chrono::Datelike;
use ssebop_common::SceneId;
use tracing::{debug, warn};

use crate::blend::BlendOutput;
use crate::catalog::{AssetFilter, CollectionKind};
use crate::error::Result;
use crate::evaluate::Evaluator;
use crate::types::{TcorrAsset, TcorrIndex, TcorrResult, TcorrValue};

/// Replaces an unsupported gridded result with the monthly gridded
/// composite for the scene's tile, month and Tmax source.
#[derive(Clone)]
pub struct ClimatologyFallback {
    evaluator: Evaluator,
    tmax_source: String,
}

impl ClimatologyFallback {
    pub fn new(evaluator: Evaluator, tmax_source: impl Into<String>) -> Self {
        Self {
            evaluator,
            tmax_source: tmax_source.into(),
        }
    }

    /// Apply the fallback to a blended scene result.
    ///
    /// Results with coarse cold support pass through untouched and the
    /// catalog is not queried.
    pub async fn apply(&self, output: BlendOutput, scene: &SceneId) -> Result<TcorrResult> {
        if output.coarse_count > 0 {
            return Ok(substitute(output, None));
        }

        let filter = AssetFilter::new()
            .with_tile(scene.wrs2)
            .with_month(scene.date.month())
            .with_tmax_source(self.tmax_source.as_str());
        let composite = self
            .evaluator
            .first(CollectionKind::GriddedMonthly, &filter)
            .await?;

        match &composite {
            Some(asset) => debug!(scene = %scene, asset = %asset.id, "Substituting monthly composite"),
            None => warn!(scene = %scene, "No coarse cold cells and no monthly composite"),
        }
        Ok(substitute(output, composite))
    }
}

/// Combine a blended result with an optional monthly composite.
///
/// The composite is only used when the blend had no coarse cold cells.
/// Its quality is zeroed over its own mask.
pub fn substitute(output: BlendOutput, composite: Option<TcorrAsset>) -> TcorrResult {
    let blended = TcorrResult {
        value: TcorrValue::Image(output.value),
        quality: Some(output.quality),
        index: output.index,
        coarse_count: Some(output.coarse_count),
    };
    if output.coarse_count > 0 {
        return blended;
    }

    let Some(asset) = composite else {
        return blended;
    };
    let quality = match &asset.value {
        TcorrValue::Image(image) => Some(image.map(|_| 0.0)),
        _ => None,
    };
    TcorrResult {
        value: asset.value,
        quality,
        index: TcorrIndex::Month,
        coarse_count: None,
    }
}
