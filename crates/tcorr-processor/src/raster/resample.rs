//! Nearest-neighbor resampling and reprojection onto a target grid.

use projection::CrsTransform;
use rayon::prelude::*;
use ssebop_common::GridProjection;
use tracing::debug;

use super::Raster;
use crate::error::Result;

/// Resample `raster` onto `target` by nearest neighbor.
///
/// Each target pixel center is back-projected into the source CRS and
/// takes the source pixel containing it. Target pixels outside the source
/// extent, or over masked source pixels, are masked. Returns the input
/// unchanged if the grids already match.
pub fn resample_nearest(raster: &Raster, target: &GridProjection) -> Result<Raster> {
    if raster.grid() == target {
        return Ok(raster.clone());
    }
    let transform = CrsTransform::new(target.crs, raster.grid().crs);
    if raster.grid().crs != target.crs {
        debug!(
            from = %raster.grid().crs,
            to = %target.crs,
            width = target.width,
            height = target.height,
            "Reprojecting raster"
        );
    }

    let width = target.width;
    let mut data = vec![0.0f32; target.len()];
    let mut mask = vec![false; target.len()];
    if target.is_empty() {
        return Raster::new(target.clone(), data, mask);
    }

    let source = raster.grid();
    data.par_chunks_mut(width)
        .zip(mask.par_chunks_mut(width))
        .enumerate()
        .for_each(|(row, (data_row, mask_row))| {
            for col in 0..width {
                let (x, y) = target.cell_center(col, row);
                let Some((sx, sy)) = transform.apply(x, y) else {
                    continue;
                };
                if let Some((src_col, src_row)) = source.coords_to_cell(sx, sy) {
                    if let Some(v) = raster.value(source.flat_index(src_col, src_row)) {
                        data_row[col] = v;
                        mask_row[col] = true;
                    }
                }
            }
        });

    Raster::new(target.clone(), data, mask)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ssebop_common::CrsCode;
    use test_utils::create_test_grid;

    #[test]
    fn test_resample_coarse_to_fine() {
        // 2x2 grid of 60 m cells onto a 4x4 grid of 30 m cells
        let coarse_grid = GridProjection::new(CrsCode::UtmNorth(11), 60.0, 0.0, 120.0, 2, 2);
        let coarse = Raster::from_values(coarse_grid, create_test_grid(2, 2)).unwrap();
        let fine_grid = GridProjection::new(CrsCode::UtmNorth(11), 30.0, 0.0, 120.0, 4, 4);

        let fine = resample_nearest(&coarse, &fine_grid).unwrap();
        assert_eq!(fine.get(0, 0), Some(0.0));
        assert_eq!(fine.get(1, 1), Some(0.0));
        assert_eq!(fine.get(2, 0), Some(1000.0));
        assert_eq!(fine.get(3, 3), Some(1001.0));
        assert_eq!(fine.get(0, 3), Some(1.0));
    }

    #[test]
    fn test_resample_outside_extent_is_masked() {
        let source_grid = GridProjection::new(CrsCode::UtmNorth(11), 30.0, 0.0, 30.0, 1, 1);
        let source = Raster::filled(source_grid, 5.0);
        let target_grid = GridProjection::new(CrsCode::UtmNorth(11), 30.0, 0.0, 30.0, 2, 1);

        let out = resample_nearest(&source, &target_grid).unwrap();
        assert_eq!(out.get(0, 0), Some(5.0));
        assert_eq!(out.get(1, 0), None);
    }

    #[test]
    fn test_reproject_geographic_onto_utm() {
        // 0.5 degree cells over lon -118..-116, lat 37..39; west of the
        // zone 11 central meridian (-117) is 1, east is 2
        let geo_grid = GridProjection::new(CrsCode::Epsg4326, 0.5, -118.0, 39.0, 4, 4);
        let geo = Raster::from_values(geo_grid, [1.0f32, 1.0, 2.0, 2.0].repeat(4)).unwrap();

        // Four 30 m columns straddling easting 500000
        let utm_grid = GridProjection::new(CrsCode::UtmNorth(11), 30.0, 499940.0, 4200030.0, 4, 2);
        let out = resample_nearest(&geo, &utm_grid).unwrap();

        assert_eq!(out.valid_count(), 8);
        for row in 0..2 {
            assert_eq!(out.get(0, row), Some(1.0));
            assert_eq!(out.get(1, row), Some(1.0));
            assert_eq!(out.get(2, row), Some(2.0));
            assert_eq!(out.get(3, row), Some(2.0));
        }
    }

    #[test]
    fn test_reproject_outside_source_is_masked() {
        let geo_grid = GridProjection::new(CrsCode::Epsg4326, 0.5, -118.0, 39.0, 4, 4);
        let geo = Raster::filled(geo_grid, 306.0);
        // Zone 11 grid near the equator, far south of the source
        let utm_grid = GridProjection::new(CrsCode::UtmNorth(11), 30.0, 500000.0, 30.0, 2, 1);
        let out = resample_nearest(&geo, &utm_grid).unwrap();
        assert!(out.is_fully_masked());
    }

    #[test]
    fn test_reproject_between_utm_zones() {
        // Zone 11 and zone 12 meet at -114; a grid on the zone 11 side
        // keeps its value after moving into zone 12 coordinates
        let z11 = GridProjection::new(CrsCode::UtmNorth(11), 1000.0, 700000.0, 4210000.0, 20, 20);
        let source = Raster::filled(z11, 0.97);
        let transform = CrsTransform::new(CrsCode::UtmNorth(11), CrsCode::UtmNorth(12));
        let (x, y) = transform.apply(710000.0, 4200000.0).unwrap();
        let z12 = GridProjection::new(CrsCode::UtmNorth(12), 30.0, x - 15.0, y + 15.0, 1, 1);

        let out = resample_nearest(&source, &z12).unwrap();
        assert_eq!(out.get(0, 0), Some(0.97));
    }
}
