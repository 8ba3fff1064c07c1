//! ET fraction from a resolved Tcorr.

use crate::error::Result;
use crate::raster::{resample_nearest, Raster};
use crate::ratio::{align_to, SceneImage, DT_BAND, LST_BAND, TMAX_BAND};
use crate::types::{TcorrResult, TcorrValue};

/// ET fractions at or above this are masked.
pub const ETF_MASK_THRESHOLD: f32 = 1.3;
/// ET fractions are clamped to this maximum.
pub const ETF_MAX: f32 = 1.05;

/// `etf = (tmax * tcorr + dt - lst) / dt`, on the scene's LST grid.
///
/// Image Tcorr values are resampled nearest-neighbor to the LST grid. An
/// empty Tcorr gives a fully masked result.
pub fn et_fraction(scene: &SceneImage, tcorr: &TcorrResult) -> Result<Raster> {
    let lst = scene.band(LST_BAND)?;
    let tmax = align_to(scene.band(TMAX_BAND)?, lst)?;
    let dt = align_to(scene.band(DT_BAND)?, lst)?;

    let tcorr = match &tcorr.value {
        TcorrValue::Constant(v) => Raster::filled(lst.grid().clone(), *v as f32),
        TcorrValue::Image(image) => resample_nearest(image, lst.grid())?,
        TcorrValue::Empty => Raster::masked(lst.grid().clone()),
    };

    let cold_temperature = tmax.zip_with(&tcorr, |t, c| t * c)?;
    let numerator = cold_temperature
        .zip_with(&dt, |tc, d| tc + d)?
        .zip_with(lst, |v, l| v - l)?;
    let etf = numerator
        .zip_with(&dt.mask_where_not(|d| d > 0.0), |n, d| n / d)?
        .mask_where_not(|v| v.is_finite() && v < ETF_MASK_THRESHOLD);
    Ok(etf.map(|v| v.clamp(0.0, ETF_MAX)))
}
