//! Neighborhood (focal) reductions over square and circular kernels.
//!
//! Masked input pixels are excluded from the neighborhood rather than
//! counted as zero. A pixel with no valid neighbor comes out masked.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::Raster;

/// Kernel footprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KernelShape {
    /// `(2r + 1)²` pixels.
    Square,
    /// Pixels whose center lies within `r` pixels of the center pixel.
    Circle,
}

/// A neighborhood kernel with a radius in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Kernel {
    pub shape: KernelShape,
    pub radius: usize,
}

impl Kernel {
    pub fn square(radius: usize) -> Self {
        Self {
            shape: KernelShape::Square,
            radius,
        }
    }

    pub fn circle(radius: usize) -> Self {
        Self {
            shape: KernelShape::Circle,
            radius,
        }
    }

    /// Kernel with a radius given in map units, e.g. 90 m on a 30 m grid
    /// is a 3 pixel radius.
    pub fn from_map_units(shape: KernelShape, radius: f64, cell_size: f64) -> Self {
        let pixels = (radius / cell_size).round().max(0.0) as usize;
        Self {
            shape,
            radius: pixels,
        }
    }

    /// Pixel offsets `(dx, dy)` covered by the kernel, row-major.
    pub fn offsets(&self) -> Vec<(isize, isize)> {
        let r = self.radius as isize;
        let r2 = r * r;
        let mut offsets = Vec::with_capacity(((2 * r + 1) * (2 * r + 1)) as usize);
        for dy in -r..=r {
            for dx in -r..=r {
                if self.shape == KernelShape::Circle && dx * dx + dy * dy > r2 {
                    continue;
                }
                offsets.push((dx, dy));
            }
        }
        offsets
    }
}

/// Mean of the valid pixels under the kernel.
pub fn focal_mean(raster: &Raster, kernel: &Kernel) -> Raster {
    focal_reduce(raster, kernel, |window| {
        if window.is_empty() {
            return None;
        }
        let sum: f64 = window.iter().map(|&v| v as f64).sum();
        Some((sum / window.len() as f64) as f32)
    })
}

/// Minimum of the valid pixels under the kernel.
pub fn focal_min(raster: &Raster, kernel: &Kernel) -> Raster {
    focal_reduce(raster, kernel, |window| {
        window.iter().copied().reduce(f32::min)
    })
}

/// Apply `reduce` to the valid values under the kernel at every pixel.
///
/// Rows are processed in parallel; each pixel's window is gathered in
/// kernel order, so results do not depend on the thread count.
fn focal_reduce<F>(raster: &Raster, kernel: &Kernel, reduce: F) -> Raster
where
    F: Fn(&[f32]) -> Option<f32> + Sync,
{
    let width = raster.width();
    let height = raster.height();
    if width == 0 || height == 0 {
        return raster.clone();
    }

    let offsets = kernel.offsets();
    let src = raster.data();
    let src_mask = raster.mask();

    let mut data = vec![0.0f32; width * height];
    let mut mask = vec![false; width * height];

    data.par_chunks_mut(width)
        .zip(mask.par_chunks_mut(width))
        .enumerate()
        .for_each(|(row, (data_row, mask_row))| {
            let mut window = Vec::with_capacity(offsets.len());
            for col in 0..width {
                window.clear();
                for &(dx, dy) in &offsets {
                    let c = col as isize + dx;
                    let r = row as isize + dy;
                    if c < 0 || r < 0 || c >= width as isize || r >= height as isize {
                        continue;
                    }
                    let idx = r as usize * width + c as usize;
                    if src_mask[idx] {
                        window.push(src[idx]);
                    }
                }
                if let Some(v) = reduce(&window) {
                    data_row[col] = v;
                    mask_row[col] = true;
                }
            }
        });

    Raster {
        grid: raster.grid().clone(),
        data,
        mask,
    }
}
