//! Masked single-band rasters and the pixel operations used by the
//! Tcorr pipeline.
//!
//! A [`Raster`] is immutable: every operation returns a new raster. Masked
//! pixels never take part in reductions, and their stored value is not
//! meaningful.

pub mod focal;
pub mod resample;

pub use focal::{focal_mean, focal_min, Kernel, KernelShape};
pub use resample::resample_nearest;

use serde::{Deserialize, Serialize};
use ssebop_common::GridProjection;

use crate::error::{Result, TcorrError};

/// A single-band `f32` raster with a per-pixel validity mask.
///
/// `data` and `mask` are row-major with `grid.width * grid.height`
/// entries. `mask[i] == true` means pixel `i` is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RasterRepr")]
pub struct Raster {
    grid: GridProjection,
    data: Vec<f32>,
    mask: Vec<bool>,
}

/// Unchecked serialized form, validated on the way in.
#[derive(Deserialize)]
struct RasterRepr {
    grid: GridProjection,
    data: Vec<f32>,
    mask: Vec<bool>,
}

impl TryFrom<RasterRepr> for Raster {
    type Error = TcorrError;

    fn try_from(repr: RasterRepr) -> Result<Self> {
        Raster::new(repr.grid, repr.data, repr.mask)
    }
}

impl Raster {
    /// Create a raster from values and an explicit validity mask.
    pub fn new(grid: GridProjection, data: Vec<f32>, mask: Vec<bool>) -> Result<Self> {
        let expected = grid.len();
        if data.len() != expected || mask.len() != expected {
            return Err(TcorrError::invalid_raster(format!(
                "expected {} pixels for a {}x{} grid, got {} values and {} mask entries",
                expected,
                grid.width,
                grid.height,
                data.len(),
                mask.len()
            )));
        }
        Ok(Self { grid, data, mask })
    }

    /// Create a raster from values, treating NaN as masked.
    pub fn from_values(grid: GridProjection, data: Vec<f32>) -> Result<Self> {
        let mask = data.iter().map(|v| !v.is_nan()).collect();
        Self::new(grid, data, mask)
    }

    /// A fully valid raster with a constant value.
    pub fn filled(grid: GridProjection, value: f32) -> Self {
        let n = grid.len();
        Self {
            grid,
            data: vec![value; n],
            mask: vec![true; n],
        }
    }

    /// A fully masked raster.
    pub fn masked(grid: GridProjection) -> Self {
        let n = grid.len();
        Self {
            grid,
            data: vec![0.0; n],
            mask: vec![false; n],
        }
    }

    pub fn grid(&self) -> &GridProjection {
        &self.grid
    }

    pub fn width(&self) -> usize {
        self.grid.width
    }

    pub fn height(&self) -> usize {
        self.grid.height
    }

    /// Raw values, including those under the mask.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn mask(&self) -> &[bool] {
        &self.mask
    }

    /// Value at a flat index, or `None` if masked.
    #[inline]
    pub fn value(&self, idx: usize) -> Option<f32> {
        if self.mask[idx] {
            Some(self.data[idx])
        } else {
            None
        }
    }

    /// Value at a pixel, or `None` if masked or out of bounds.
    pub fn get(&self, col: usize, row: usize) -> Option<f32> {
        if col >= self.grid.width || row >= self.grid.height {
            return None;
        }
        self.value(self.grid.flat_index(col, row))
    }

    /// Number of valid pixels.
    pub fn valid_count(&self) -> usize {
        self.mask.iter().filter(|&&m| m).count()
    }

    pub fn is_fully_masked(&self) -> bool {
        !self.mask.iter().any(|&m| m)
    }

    /// All valid values in row-major order.
    pub fn valid_values(&self) -> Vec<f32> {
        self.data
            .iter()
            .zip(&self.mask)
            .filter(|(_, &m)| m)
            .map(|(&v, _)| v)
            .collect()
    }

    /// Fail unless `other` is on the same grid.
    pub fn ensure_same_grid(&self, other: &Raster) -> Result<()> {
        if self.grid != other.grid {
            return Err(TcorrError::grid_mismatch(format!(
                "{} {}x{} {:?} vs {} {}x{} {:?}",
                self.grid.crs,
                self.grid.width,
                self.grid.height,
                self.grid.transform,
                other.grid.crs,
                other.grid.width,
                other.grid.height,
                other.grid.transform
            )));
        }
        Ok(())
    }

    /// Apply `f` to every valid value. The mask is unchanged.
    pub fn map<F>(&self, f: F) -> Raster
    where
        F: Fn(f32) -> f32,
    {
        let data = self
            .data
            .iter()
            .zip(&self.mask)
            .map(|(&v, &m)| if m { f(v) } else { 0.0 })
            .collect();
        Raster {
            grid: self.grid.clone(),
            data,
            mask: self.mask.clone(),
        }
    }

    /// Combine two rasters pixel by pixel. The result is valid only where
    /// both inputs are valid.
    pub fn zip_with<F>(&self, other: &Raster, f: F) -> Result<Raster>
    where
        F: Fn(f32, f32) -> f32,
    {
        self.ensure_same_grid(other)?;
        let mut data = vec![0.0; self.data.len()];
        let mut mask = vec![false; self.data.len()];
        for i in 0..self.data.len() {
            if self.mask[i] && other.mask[i] {
                data[i] = f(self.data[i], other.data[i]);
                mask[i] = true;
            }
        }
        Ok(Raster {
            grid: self.grid.clone(),
            data,
            mask,
        })
    }

    /// Mask every pixel where `keep` is false. Already-masked pixels stay
    /// masked.
    pub fn update_mask(&self, keep: &[bool]) -> Result<Raster> {
        if keep.len() != self.mask.len() {
            return Err(TcorrError::invalid_raster(format!(
                "mask has {} entries, raster has {}",
                keep.len(),
                self.mask.len()
            )));
        }
        let mask = self.mask.iter().zip(keep).map(|(&m, &k)| m && k).collect();
        Ok(Raster {
            grid: self.grid.clone(),
            data: self.data.clone(),
            mask,
        })
    }

    /// Mask pixels whose value does not satisfy `pred`.
    pub fn mask_where_not<F>(&self, pred: F) -> Raster
    where
        F: Fn(f32) -> bool,
    {
        let mask = self
            .data
            .iter()
            .zip(&self.mask)
            .map(|(&v, &m)| m && pred(v))
            .collect();
        Raster {
            grid: self.grid.clone(),
            data: self.data.clone(),
            mask,
        }
    }

    /// Make every pixel valid, replacing masked values with `fill`.
    pub fn unmask(&self, fill: f32) -> Raster {
        let data = self
            .data
            .iter()
            .zip(&self.mask)
            .map(|(&v, &m)| if m { v } else { fill })
            .collect();
        Raster {
            grid: self.grid.clone(),
            data,
            mask: vec![true; self.mask.len()],
        }
    }

    /// Mask pixels that are not strictly positive.
    pub fn selfmask(&self) -> Raster {
        self.mask_where_not(|v| v > 0.0)
    }

    /// `1` where the pixel is valid and positive, `0` elsewhere. Fully valid.
    pub fn indicator(&self) -> Raster {
        let data = self
            .data
            .iter()
            .zip(&self.mask)
            .map(|(&v, &m)| if m && v > 0.0 { 1.0 } else { 0.0 })
            .collect();
        Raster {
            grid: self.grid.clone(),
            data,
            mask: vec![true; self.mask.len()],
        }
    }

    /// Per pixel, the first valid value from `layers` in order.
    pub fn first_non_null(layers: &[&Raster]) -> Result<Raster> {
        let first = layers
            .first()
            .ok_or_else(|| TcorrError::invalid_raster("first_non_null needs at least one layer"))?;
        for layer in &layers[1..] {
            first.ensure_same_grid(layer)?;
        }

        let n = first.data.len();
        let mut data = vec![0.0; n];
        let mut mask = vec![false; n];
        for i in 0..n {
            if let Some(v) = layers.iter().find_map(|l| l.value(i)) {
                data[i] = v;
                mask[i] = true;
            }
        }
        Ok(Raster {
            grid: first.grid.clone(),
            data,
            mask,
        })
    }

    /// Sum of `weights[i] * layers[i]`. Valid where every layer is valid.
    pub fn weighted_sum(layers: &[&Raster], weights: &[f32]) -> Result<Raster> {
        if layers.is_empty() || layers.len() != weights.len() {
            return Err(TcorrError::invalid_raster(format!(
                "{} layers for {} weights",
                layers.len(),
                weights.len()
            )));
        }
        let mut acc = layers[0].map(|v| v * weights[0]);
        for (layer, &w) in layers.iter().zip(weights).skip(1) {
            acc = acc.zip_with(layer, |a, b| a + b * w)?;
        }
        Ok(acc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ssebop_common::CrsCode;

    fn grid(w: usize, h: usize) -> GridProjection {
        GridProjection::new(CrsCode::UtmNorth(11), 30.0, 0.0, 0.0, w, h)
    }

    #[test]
    fn test_new_rejects_wrong_length() {
        assert!(Raster::new(grid(2, 2), vec![0.0; 3], vec![true; 4]).is_err());
        assert!(Raster::new(grid(2, 2), vec![0.0; 4], vec![true; 3]).is_err());
    }

    #[test]
    fn test_from_values_masks_nan() {
        let r = Raster::from_values(grid(3, 1), vec![1.0, f32::NAN, 3.0]).unwrap();
        assert_eq!(r.valid_count(), 2);
        assert_eq!(r.get(1, 0), None);
        assert_eq!(r.valid_values(), vec![1.0, 3.0]);
    }

    #[test]
    fn test_unmask_and_selfmask() {
        let r = Raster::from_values(grid(3, 1), vec![f32::NAN, 0.0, 2.0]).unwrap();
        let filled = r.unmask(0.0);
        assert_eq!(filled.valid_count(), 3);
        assert_eq!(filled.data(), &[0.0, 0.0, 2.0]);

        let positive = filled.selfmask();
        assert_eq!(positive.mask(), &[false, false, true]);
    }

    #[test]
    fn test_indicator() {
        let r = Raster::from_values(grid(4, 1), vec![f32::NAN, 0.0, -1.0, 0.5]).unwrap();
        assert_eq!(r.indicator().data(), &[0.0, 0.0, 0.0, 1.0]);
        assert!(r.indicator().mask().iter().all(|&m| m));
    }

    #[test]
    fn test_first_non_null_priority() {
        let a = Raster::from_values(grid(3, 1), vec![1.0, f32::NAN, f32::NAN]).unwrap();
        let b = Raster::from_values(grid(3, 1), vec![9.0, 2.0, f32::NAN]).unwrap();
        let out = Raster::first_non_null(&[&a, &b]).unwrap();
        assert_eq!(out.get(0, 0), Some(1.0));
        assert_eq!(out.get(1, 0), Some(2.0));
        assert_eq!(out.get(2, 0), None);
    }

    #[test]
    fn test_zip_with_grid_mismatch() {
        let a = Raster::filled(grid(2, 2), 1.0);
        let b = Raster::filled(grid(3, 2), 1.0);
        assert!(matches!(
            a.zip_with(&b, |x, y| x + y),
            Err(TcorrError::GridMismatch(_))
        ));
    }

    #[test]
    fn test_weighted_sum() {
        let a = Raster::filled(grid(2, 1), 1.0);
        let b = Raster::from_values(grid(2, 1), vec![3.0, f32::NAN]).unwrap();
        let out = Raster::weighted_sum(&[&a, &b], &[0.25, 0.75]).unwrap();
        assert_eq!(out.get(0, 0), Some(2.5));
        assert_eq!(out.get(1, 0), None);
    }

    #[test]
    fn test_serde_validates_length() {
        let r = Raster::filled(grid(2, 1), 1.5);
        let json = serde_json::to_string(&r).unwrap();
        let back: Raster = serde_json::from_str(&json).unwrap();
        assert_eq!(back, r);

        let bad = json.replace("[1.5,1.5]", "[1.5]");
        assert!(serde_json::from_str::<Raster>(&bad).is_err());
    }
}
