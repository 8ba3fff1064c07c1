//! Gap-filled Tcorr composites from coarse cold (and hot) cells.
//!
//! The blend runs in five passes:
//!
//! ```text
//! coarse cold ──► square focal means at several radii (masked cells
//!   (+ hot)        excluded, then unmasked to 0)
//!      │
//!      ├─► cold+hot only: priority mosaic of the first positive value
//!      │   in [cold, cold RN1..RN5, hot, hot RN2], which then becomes
//!      │   the base for the RN2/RN4/RN16 layers
//!      │
//!      ├─► coverage score: number of layers with a positive value
//!      │
//!      ├─► weighted blend of the widest `score` layers, one masked
//!      │   partial per score tier, combined first-non-null
//!      │
//!      └─► final radius-1 focal mean
//! ```
//!
//! The quality band packs `score + 10 * hot_score + 100 * cold_score`, where
//! the hot and cold scores count the hot and cold layers that had data.
//! They are diagnostics only and never change the weights.

use tracing::debug;

use crate::coarse::CoarseRaster;
use crate::error::{Result, TcorrError};
use crate::raster::{focal_mean, Kernel, Raster};
use crate::types::TcorrIndex;

/// Smoothing radii (coarse cells) of the cold-only blend layers.
pub const COLD_RADII: [usize; 4] = [2, 4, 16, 64];

/// Radius of the cold-only diagnostic layer.
pub const COLD_DIAGNOSTIC_RADIUS: usize = 5;

/// Cold smoothing radii feeding the cold+hot priority mosaic.
pub const MOSAIC_COLD_RADII: [usize; 5] = [1, 2, 3, 4, 5];

/// Hot smoothing radius feeding the cold+hot priority mosaic.
pub const MOSAIC_HOT_RADIUS: usize = 2;

/// Smoothing radii of the cold+hot blend layers.
pub const COLD_HOT_RADII: [usize; 3] = [2, 4, 16];

/// Cold-only weights by coverage score (`tiers[score - 1]`), applied to the
/// widest `score` layers of `[coarse, RN2, RN4, RN16, RN64]`.
pub const COLD_WEIGHT_TIERS: [&[f32]; 5] = [
    &[1.0],
    &[0.67, 0.33],
    &[0.5, 0.33, 0.17],
    &[0.4, 0.3, 0.2, 0.1],
    &[0.4, 0.3, 0.2, 0.075, 0.025],
];

/// Cold+hot weights by coverage score, applied to the widest `score` layers
/// of `[mosaic, RN2, RN4, RN16]`.
pub const COLD_HOT_WEIGHT_TIERS: [&[f32]; 4] = [
    &[1.0],
    &[0.67, 0.33],
    &[0.5, 0.33, 0.17],
    &[0.4, 0.3, 0.2, 0.1],
];

/// Output of a blend.
#[derive(Debug, Clone, PartialEq)]
pub struct BlendOutput {
    /// Final Tcorr raster. Fully masked when `index` is `NoData`.
    pub value: Raster,
    /// Packed coverage and diagnostic scores.
    pub quality: Raster,
    /// Number of blend layers with data, per pixel.
    pub coverage: Raster,
    pub index: TcorrIndex,
    /// Coarse cold cells with fine support (`tcorr_coarse_count`).
    pub coarse_count: u32,
}

/// Builds gridded Tcorr composites.
#[derive(Debug, Clone, Copy, Default)]
pub struct GridBlender;

impl GridBlender {
    pub fn new() -> Self {
        Self
    }

    /// Cold-only composite, tagged `GriddedCold`.
    pub fn blend_cold(&self, cold: &CoarseRaster) -> Result<BlendOutput> {
        let coarse_count = cold.valid_cells();

        let mut layers = vec![cold.value.unmask(0.0)];
        layers.extend(COLD_RADII.iter().map(|&r| smooth(&cold.value, r)));

        let coverage = coverage_score(&layers)?;
        let cold_score = smooth(&cold.value, COLD_DIAGNOSTIC_RADIUS).indicator();
        let hot_score = Raster::filled(cold.grid().clone(), 0.0);

        let blended = blend_by_tier(&layers, &coverage, &COLD_WEIGHT_TIERS)?;
        let value = focal_mean(&blended, &Kernel::square(1));
        let quality = pack_quality(&coverage, &hot_score, &cold_score)?;

        Ok(finish(
            value,
            quality,
            coverage,
            coarse_count,
            TcorrIndex::GriddedCold,
        ))
    }

    /// Cold+hot composite, tagged `Gridded`. Hot cells only fill gaps that
    /// no cold layer reaches.
    pub fn blend_cold_hot(&self, cold: &CoarseRaster, hot: &CoarseRaster) -> Result<BlendOutput> {
        cold.value.ensure_same_grid(&hot.value)?;
        let coarse_count = cold.valid_cells();

        let cold_layers: Vec<Raster> = MOSAIC_COLD_RADII
            .iter()
            .map(|&r| smooth(&cold.value, r))
            .collect();
        let hot_layer = smooth(&hot.value, MOSAIC_HOT_RADIUS);

        let mut priority = vec![cold.value.clone()];
        priority.extend(cold_layers.iter().map(Raster::selfmask));
        priority.push(hot.value.clone());
        priority.push(hot_layer.selfmask());
        let mosaic = Raster::first_non_null(&priority.iter().collect::<Vec<_>>())?;

        let mut layers = vec![mosaic.unmask(0.0)];
        layers.extend(COLD_HOT_RADII.iter().map(|&r| smooth(&mosaic, r)));
        let coverage = coverage_score(&layers)?;

        let mut cold_sources = vec![cold.value.clone()];
        cold_sources.extend(cold_layers);
        let cold_score = coverage_score(&cold_sources)?;
        let hot_score = coverage_score(&[hot.value.clone(), hot_layer])?;

        let blended = blend_by_tier(&layers, &coverage, &COLD_HOT_WEIGHT_TIERS)?;
        let value = focal_mean(&blended, &Kernel::circle(1));
        let quality = pack_quality(&coverage, &hot_score, &cold_score)?;

        Ok(finish(
            value,
            quality,
            coverage,
            coarse_count,
            TcorrIndex::Gridded,
        ))
    }
}

/// Square focal mean, unmasked to 0 where nothing contributed.
fn smooth(raster: &Raster, radius: usize) -> Raster {
    focal_mean(raster, &Kernel::square(radius)).unmask(0.0)
}

/// Per-pixel count of layers with a positive value.
fn coverage_score(layers: &[Raster]) -> Result<Raster> {
    let mut layers = layers.iter();
    let Some(first) = layers.next() else {
        return Err(TcorrError::invalid_raster(
            "coverage score needs at least one layer",
        ));
    };
    let mut score = first.indicator();
    for layer in layers {
        score = score.zip_with(&layer.indicator(), |a, b| a + b)?;
    }
    Ok(score)
}

/// Weighted blend where pixels with coverage `k` use `tiers[k - 1]` over the
/// last `k` layers. Pixels with no coverage are masked.
pub(crate) fn blend_by_tier(layers: &[Raster], coverage: &Raster, tiers: &[&[f32]]) -> Result<Raster> {
    let n = layers.len();
    let mut partials = Vec::with_capacity(tiers.len());
    for (i, weights) in tiers.iter().enumerate() {
        let k = i + 1;
        let selected: Vec<&Raster> = layers[n - k..].iter().collect();
        let partial = Raster::weighted_sum(&selected, weights)?;
        let in_tier: Vec<bool> = coverage.data().iter().map(|&s| s as usize == k).collect();
        partials.push(partial.update_mask(&in_tier)?);
    }
    Raster::first_non_null(&partials.iter().collect::<Vec<_>>())
}

fn pack_quality(coverage: &Raster, hot_score: &Raster, cold_score: &Raster) -> Result<Raster> {
    coverage
        .zip_with(hot_score, |total, hot| total + 10.0 * hot)?
        .zip_with(cold_score, |acc, cold| acc + 100.0 * cold)
}

fn finish(
    value: Raster,
    quality: Raster,
    coverage: Raster,
    coarse_count: u32,
    index: TcorrIndex,
) -> BlendOutput {
    if coarse_count == 0 {
        debug!("No coarse cold cells, blend result is nodata");
        return BlendOutput {
            value: Raster::masked(value.grid().clone()),
            quality,
            coverage,
            index: TcorrIndex::NoData,
            coarse_count,
        };
    }
    debug!(
        index = %index,
        coarse_count,
        pixels = value.valid_count(),
        "Blended gridded Tcorr"
    );
    BlendOutput {
        value,
        quality,
        coverage,
        index,
        coarse_count,
    }
}
