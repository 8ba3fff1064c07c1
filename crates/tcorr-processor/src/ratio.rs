//! Cold and hot temperature ratio candidates.
//!
//! Cold: `lst / tmax` over dense vegetation. Hot: `(lst - dt) / tmax` over
//! bare ground. Vegetation density is judged from a smoothed NDVI and the
//! neighborhood NDVI minimum, both on the scene's native grid.

use serde::{Deserialize, Serialize};
use ssebop_common::SceneId;
use std::collections::BTreeMap;
use tracing::debug;

use crate::coarse::CandidateKind;
use crate::config::ReflectanceType;
use crate::error::{Result, TcorrError};
use crate::raster::{focal_mean, focal_min, resample_nearest, Kernel, KernelShape, Raster};

/// Land surface temperature band name (K).
pub const LST_BAND: &str = "lst";
/// NDVI band name.
pub const NDVI_BAND: &str = "ndvi";
/// Maximum air temperature band name (K).
pub const TMAX_BAND: &str = "tmax";
/// Temperature difference band name (K).
pub const DT_BAND: &str = "dt";

/// Cold candidates must be warmer than this (K).
pub const COLD_LST_MIN: f32 = 270.0;
/// Radius of the circular NDVI smoothing kernel in map units.
pub const NDVI_SMOOTH_RADIUS: f64 = 90.0;
/// Radius of the square NDVI minimum kernel in map units.
pub const NDVI_MIN_RADIUS: f64 = 60.0;

/// A scene's input bands, keyed by band name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneImage {
    pub scene_id: SceneId,
    #[serde(default)]
    pub bands: BTreeMap<String, Raster>,
}

impl SceneImage {
    pub fn new(scene_id: SceneId) -> Self {
        Self {
            scene_id,
            bands: BTreeMap::new(),
        }
    }

    pub fn with_band(mut self, name: impl Into<String>, raster: Raster) -> Self {
        self.bands.insert(name.into(), raster);
        self
    }

    pub fn band(&self, name: &str) -> Result<&Raster> {
        self.bands
            .get(name)
            .ok_or_else(|| TcorrError::missing_band(name))
    }
}

/// A fine-resolution ratio raster, valid only at candidate pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateRatio {
    pub kind: CandidateKind,
    pub raster: Raster,
}

/// Inputs shared by both candidate kinds, aligned to the LST grid.
struct AlignedInputs {
    lst: Raster,
    tmax: Raster,
    smoothed_ndvi: Raster,
    min_ndvi: Raster,
}

/// Extracts cold and hot ratio candidates from a scene.
#[derive(Debug, Clone, Copy)]
pub struct TemperatureRatioExtractor {
    reflectance: ReflectanceType,
}

impl TemperatureRatioExtractor {
    pub fn new(reflectance: ReflectanceType) -> Self {
        Self { reflectance }
    }

    /// Cold candidate ratio `lst / tmax`.
    pub fn cold(&self, scene: &SceneImage) -> Result<CandidateRatio> {
        let inputs = self.align(scene)?;
        let threshold = self.reflectance.cold_ndvi_threshold();

        let n = inputs.lst.grid().len();
        let mut data = vec![0.0f32; n];
        let mut mask = vec![false; n];
        for i in 0..n {
            let (Some(lst), Some(tmax), Some(smoothed), Some(min)) = (
                inputs.lst.value(i),
                inputs.tmax.value(i),
                inputs.smoothed_ndvi.value(i),
                inputs.min_ndvi.value(i),
            ) else {
                continue;
            };
            if tmax <= 0.0 || lst <= COLD_LST_MIN || smoothed < threshold || min < threshold {
                continue;
            }
            data[i] = lst / tmax;
            mask[i] = true;
        }

        let raster = Raster::new(inputs.lst.grid().clone(), data, mask)?;
        debug!(
            scene = %scene.scene_id,
            reflectance = %self.reflectance,
            pixels = raster.valid_count(),
            "Extracted cold candidates"
        );
        Ok(CandidateRatio {
            kind: CandidateKind::Cold,
            raster,
        })
    }

    /// Hot candidate ratio `(lst - dt) / tmax`.
    pub fn hot(&self, scene: &SceneImage) -> Result<CandidateRatio> {
        let inputs = self.align(scene)?;
        let dt = align_to(scene.band(DT_BAND)?, &inputs.lst)?;
        let threshold = self.reflectance.hot_ndvi_threshold();
        let is_bare = |ndvi: f32| ndvi > 0.0 && ndvi <= threshold;

        let n = inputs.lst.grid().len();
        let mut data = vec![0.0f32; n];
        let mut mask = vec![false; n];
        for i in 0..n {
            let (Some(lst), Some(tmax), Some(dt), Some(smoothed), Some(min)) = (
                inputs.lst.value(i),
                inputs.tmax.value(i),
                dt.value(i),
                inputs.smoothed_ndvi.value(i),
                inputs.min_ndvi.value(i),
            ) else {
                continue;
            };
            if tmax <= 0.0 || !is_bare(smoothed) || !is_bare(min) {
                continue;
            }
            data[i] = (lst - dt) / tmax;
            mask[i] = true;
        }

        let raster = Raster::new(inputs.lst.grid().clone(), data, mask)?;
        debug!(
            scene = %scene.scene_id,
            reflectance = %self.reflectance,
            pixels = raster.valid_count(),
            "Extracted hot candidates"
        );
        Ok(CandidateRatio {
            kind: CandidateKind::Hot,
            raster,
        })
    }

    fn align(&self, scene: &SceneImage) -> Result<AlignedInputs> {
        let lst = scene.band(LST_BAND)?.clone();
        if lst.grid().crs.is_geographic() {
            return Err(TcorrError::invalid_raster(format!(
                "lst must be on a projected grid, got {}",
                lst.grid().crs
            )));
        }
        let tmax = align_to(scene.band(TMAX_BAND)?, &lst)?;
        let ndvi = align_to(scene.band(NDVI_BAND)?, &lst)?;

        let cell_size = lst.grid().cell_size();
        let smooth = Kernel::from_map_units(KernelShape::Circle, NDVI_SMOOTH_RADIUS, cell_size);
        let neighborhood = Kernel::from_map_units(KernelShape::Square, NDVI_MIN_RADIUS, cell_size);

        Ok(AlignedInputs {
            smoothed_ndvi: focal_mean(&ndvi, &smooth),
            min_ndvi: focal_min(&ndvi, &neighborhood),
            lst,
            tmax,
        })
    }
}

/// Resample `band` onto the grid of `reference` if needed.
pub(crate) fn align_to(band: &Raster, reference: &Raster) -> Result<Raster> {
    resample_nearest(band, reference.grid())
}
