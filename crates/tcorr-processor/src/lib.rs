//! Gridded Tcorr compositing for the SSEBop ET model.
//!
//! Tcorr is the ratio between the cold-reference land surface temperature
//! and the daily maximum air temperature. This crate derives it per scene
//! from cold (well-watered, densely vegetated) pixels, spreads it across
//! the scene with a multi-scale neighborhood blend, and falls back to
//! precomputed climatologies when a scene has no usable pixels.
//!
//! # Architecture
//!
//! ```text
//! SceneImage {lst, ndvi, tmax, dt}
//!      │
//!      ▼
//! TemperatureRatioExtractor ──► cold / hot ratio at native resolution
//!      │
//!      ▼
//! CoarseAggregator ──► 5 km percentile cells (cold 2.5th, hot 70th)
//!      │
//!      ▼
//! GridBlender ──► {tcorr, quality}, tcorr_index 0 / 1 / 9
//!      │
//!      ├─► coarse_count > 0: done
//!      │
//!      └─► coarse_count == 0: ClimatologyFallback
//!               │
//!               └─► monthly composite for tile + month, tcorr_index 4
//! ```
//!
//! [`TcorrSelector`] ties the pipeline to the other Tcorr sources
//! (constants, scene statistics and precomputed climatologies), all read
//! through an [`AssetCatalog`].
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use tcorr_processor::{FilesystemCatalog, TcorrConfig, TcorrSelector};
//!
//! let catalog = Arc::new(FilesystemCatalog::new("/data/tcorr"));
//! let selector = TcorrSelector::new(catalog, TcorrConfig::from_env(), "DAYMET_MEDIAN_V2")?;
//!
//! let result = selector.resolve_str("GRIDDED_COLD", &scene).await?;
//! println!("tcorr_index = {}", result.index);
//! ```

pub mod blend;
pub mod catalog;
pub mod climatology;
pub mod coarse;
pub mod config;
pub mod error;
pub mod etf;
pub mod evaluate;
pub mod fallback;
pub mod raster;
pub mod ratio;
pub mod selector;
pub mod source;
pub mod stats;
pub mod types;

// Re-export commonly used types at crate root
pub use blend::{BlendOutput, GridBlender};
pub use catalog::{AssetCatalog, AssetFilter, CollectionKind, FilesystemCatalog, MemoryCatalog};
pub use climatology::{monthly_asset_id, MonthlyClimatologyBuilder};
pub use coarse::{CandidateKind, CoarseAggregator, CoarseCell, CoarseRaster};
pub use config::{ReflectanceType, TcorrConfig};
pub use error::{Result, TcorrError};
pub use etf::et_fraction;
pub use evaluate::{Evaluator, RetryPolicy};
pub use fallback::ClimatologyFallback;
pub use raster::{Kernel, KernelShape, Raster};
pub use ratio::{CandidateRatio, SceneImage, TemperatureRatioExtractor};
pub use selector::{DynamicStatistic, TcorrSelector};
pub use source::{is_tmax_climatology_path, TcorrSourceKind};
pub use types::{AssetProperties, TcorrAsset, TcorrIndex, TcorrResult, TcorrValue};
