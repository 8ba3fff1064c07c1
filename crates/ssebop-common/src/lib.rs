//! Common types shared across the SSEBop Tcorr crates.

pub mod bbox;
pub mod crs;
pub mod grid;
pub mod scene;
pub mod time;

pub use bbox::BoundingBox;
pub use crs::{CrsCode, CrsParseError};
pub use grid::{GridError, GridProjection};
pub use scene::{SceneId, SceneIdParseError, Wrs2Tile};
pub use time::{parse_date, time_start_millis, DateRange, TimeParseError};
