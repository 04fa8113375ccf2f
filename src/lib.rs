//! Heightfield walkability filters, a chamfer distance field, and three
//! region-partitioning algorithms for a navigation-mesh voxel pipeline.
//!
//! The pipeline, in order:
//!
//! 1. Rasterize solid geometry into a [`heightfield::Heightfield`] (out of
//!    scope here — callers build this however they produce solid spans).
//! 2. Run the walkability filters in [`filters`] in their documented order.
//! 3. Pack the filtered heightfield into a [`compact::CompactHeightfield`]
//!    with [`compact::build_compact_heightfield`].
//! 4. Build the chamfer distance field with
//!    [`distance_field::build_distance_field`].
//! 5. Partition into regions with one of [`regions::watershed`],
//!    [`regions::monotone`], or [`regions::layer`].
//!
//! Triangle rasterization, contour tracing, polygon mesh construction, tile
//! assembly, and multithreading are all out of scope for this crate.

pub mod compact;
pub mod config;
pub mod distance_field;
pub mod error;
pub mod filters;
pub mod grid;
pub mod heightfield;
pub mod regions;

pub use compact::{build_compact_heightfield, CompactHeightfield};
pub use config::RegionConfig;
pub use error::{RegionError, Result};
pub use heightfield::Heightfield;
