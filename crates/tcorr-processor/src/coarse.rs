//! Percentile aggregation of fine candidate ratios onto the coarse grid.
//!
//! Each coarse cell keeps a percentile of the valid fine values whose pixel
//! centers fall inside it, plus the number of those values. Cells with no
//! samples stay masked; they are never zero-filled here.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use ssebop_common::GridProjection;
use tracing::debug;

use crate::config::TcorrConfig;
use crate::error::Result;
use crate::ratio::CandidateRatio;
use crate::raster::Raster;
use crate::stats::percentile_of_sorted;

/// Which end of the temperature ratio distribution a candidate samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidateKind {
    /// Fully vegetated, well-watered pixels.
    Cold,
    /// Bare, dry pixels.
    Hot,
}

/// One coarse cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoarseCell {
    pub value: Option<f32>,
    /// Number of valid fine pixels behind `value`.
    pub count: u32,
}

/// The `{value, count}` bands of a coarse aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct CoarseRaster {
    pub kind: CandidateKind,
    pub value: Raster,
    pub count: Vec<u32>,
}

impl CoarseRaster {
    pub fn grid(&self) -> &GridProjection {
        self.value.grid()
    }

    pub fn cell(&self, col: usize, row: usize) -> Option<CoarseCell> {
        let grid = self.value.grid();
        if col >= grid.width || row >= grid.height {
            return None;
        }
        let idx = grid.flat_index(col, row);
        Some(CoarseCell {
            value: self.value.value(idx),
            count: self.count[idx],
        })
    }

    /// Number of coarse cells with at least one fine sample. For cold
    /// candidates this is the `tcorr_coarse_count` property.
    pub fn valid_cells(&self) -> u32 {
        self.count.iter().filter(|&&c| c > 0).count() as u32
    }

    /// Total number of fine samples across all cells.
    pub fn total_samples(&self) -> u64 {
        self.count.iter().map(|&c| c as u64).sum()
    }
}

/// Reduces fine ratios to coarse cells snapped to a fixed lattice.
#[derive(Debug, Clone)]
pub struct CoarseAggregator {
    cell_size: f64,
    origin: (f64, f64),
    cold_percentile: f64,
    hot_percentile: f64,
}

impl CoarseAggregator {
    pub fn new(config: &TcorrConfig) -> Self {
        Self {
            cell_size: config.coarse_cell_size,
            origin: config.coarse_origin,
            cold_percentile: config.cold_percentile,
            hot_percentile: config.hot_percentile,
        }
    }

    /// Percentile used for a candidate kind.
    pub fn percentile_for(&self, kind: CandidateKind) -> f64 {
        match kind {
            CandidateKind::Cold => self.cold_percentile,
            CandidateKind::Hot => self.hot_percentile,
        }
    }

    /// The coarse grid covering `fine`, expanded outward to the lattice.
    pub fn coarse_grid(&self, fine: &GridProjection) -> GridProjection {
        fine.snapped(self.cell_size, self.origin.0, self.origin.1)
    }

    /// Aggregate a fine candidate ratio raster.
    pub fn aggregate(&self, candidate: &CandidateRatio) -> Result<CoarseRaster> {
        let fine = &candidate.raster;
        let fine_grid = fine.grid();
        let coarse_grid = self.coarse_grid(fine_grid);

        let mut buckets: Vec<Vec<f32>> = vec![Vec::new(); coarse_grid.len()];
        for row in 0..fine_grid.height {
            for col in 0..fine_grid.width {
                let Some(v) = fine.value(fine_grid.flat_index(col, row)) else {
                    continue;
                };
                let (x, y) = fine_grid.cell_center(col, row);
                if let Some((c, r)) = coarse_grid.coords_to_cell(x, y) {
                    buckets[coarse_grid.flat_index(c, r)].push(v);
                }
            }
        }

        let p = self.percentile_for(candidate.kind);
        let cells: Vec<(Option<f32>, u32)> = buckets
            .into_par_iter()
            .map(|mut samples| {
                if samples.is_empty() {
                    return (None, 0);
                }
                samples.sort_unstable_by(|a, b| a.total_cmp(b));
                (Some(percentile_of_sorted(&samples, p)), samples.len() as u32)
            })
            .collect();

        let mut data = Vec::with_capacity(cells.len());
        let mut mask = Vec::with_capacity(cells.len());
        let mut count = Vec::with_capacity(cells.len());
        for (value, n) in cells {
            data.push(value.unwrap_or(0.0));
            mask.push(value.is_some());
            count.push(n);
        }

        let value = Raster::new(coarse_grid, data, mask)?;
        let coarse = CoarseRaster {
            kind: candidate.kind,
            value,
            count,
        };
        debug!(
            kind = ?candidate.kind,
            percentile = p,
            cells = coarse.valid_cells(),
            samples = coarse.total_samples(),
            "Aggregated candidate ratio to coarse grid"
        );
        Ok(coarse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ssebop_common::CrsCode;
    use test_utils::assert_approx_eq;

    fn fine_grid(w: usize, h: usize) -> GridProjection {
        // Upper-left on the lattice so that 4x4 fine pixels fill one coarse cell
        GridProjection::new(CrsCode::UtmNorth(11), 30.0, 15.0, 135.0, w, h)
    }

    fn aggregator() -> CoarseAggregator {
        CoarseAggregator::new(&TcorrConfig {
            coarse_cell_size: 120.0,
            ..TcorrConfig::default()
        })
    }

    #[test]
    fn test_aggregate_percentile_and_count() {
        // 8x4 fine grid: left coarse cell values 1..=16, right cell all masked
        let mut values = vec![f32::NAN; 32];
        let mut n = 1.0;
        for row in 0..4 {
            for col in 0..4 {
                values[row * 8 + col] = n;
                n += 1.0;
            }
        }
        let raster = Raster::from_values(fine_grid(8, 4), values).unwrap();
        let candidate = CandidateRatio {
            kind: CandidateKind::Hot,
            raster,
        };

        let coarse = aggregator().aggregate(&candidate).unwrap();
        assert_eq!(coarse.grid().width, 2);
        assert_eq!(coarse.grid().height, 1);

        let left = coarse.cell(0, 0).unwrap();
        assert_eq!(left.count, 16);
        // 70th percentile of 1..=16: rank 10.5 -> 11.5
        assert_approx_eq!(left.value.unwrap(), 11.5, 1e-5);

        let right = coarse.cell(1, 0).unwrap();
        assert_eq!(right.count, 0);
        assert_eq!(right.value, None);
        assert_eq!(coarse.valid_cells(), 1);
    }

    #[test]
    fn test_aggregate_is_deterministic() {
        let values: Vec<f32> = (0..64).map(|i| ((i * 37) % 64) as f32 / 64.0).collect();
        let candidate = CandidateRatio {
            kind: CandidateKind::Cold,
            raster: Raster::from_values(fine_grid(8, 8), values).unwrap(),
        };
        let a = aggregator().aggregate(&candidate).unwrap();
        let b = aggregator().aggregate(&candidate).unwrap();
        assert_eq!(a, b);
        let bits = |r: &CoarseRaster| r.value.data().iter().map(|v| v.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(&a), bits(&b));
    }

    #[test]
    fn test_coarse_grid_snaps_outward() {
        let agg = CoarseAggregator::new(&TcorrConfig::default());
        let fine = GridProjection::new(CrsCode::UtmNorth(11), 30.0, 591285.0, 4256115.0, 7751, 7671);
        let coarse = agg.coarse_grid(&fine);
        assert_eq!(coarse.transform[2], 590015.0);
        assert_eq!(coarse.transform[5], 4260015.0);
    }
}
