//! Error types returned by the fallible passes of the pipeline.
//!
//! Filters and the distance field never fail (see [`crate::filters`] and
//! [`crate::distance_field`]) so they return `()`. Region builders can fail
//! fatally; everything else (overlap diagnostics, contour-walk cap hits) is
//! logged via `tracing` rather than surfaced as an `Err`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegionError {
    #[error("failed to allocate {requested} bytes of scratch space")]
    OutOfMemory { requested: usize },

    #[error("region id overflowed 0xFFFF while building regions; coarsen min_region_area or merge_region_area")]
    RegionIdOverflow,
}

pub type Result<T> = std::result::Result<T, RegionError>;
