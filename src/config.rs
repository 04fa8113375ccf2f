//! Voxel-space configuration shared by the filters, compaction, and region
//! builders. Grounded in the teacher's `NavMeshSettings` builder pattern,
//! trimmed to only the parameters this crate's passes actually read (no
//! world-space or tile-geometry fields, since rasterization and tile
//! assembly are out of scope here).

/// Parameters governing walkability filters, compaction, and region building.
///
/// Built with `RegionConfig::default()` and the `with_*` methods, mirroring
/// how the teacher crate's `NavMeshSettings` is assembled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionConfig {
    /// Minimum floor-to-ceiling clearance, in voxels, for a span to be walkable.
    pub walkable_height: u16,
    /// Maximum step height, in voxels, an agent can climb.
    pub walkable_climb: u16,
    /// Width, in voxels, of the non-navigable border frame painted around a tile.
    pub border_size: u16,
    /// Regions smaller than this span count are dropped unless border-connected.
    pub min_region_area: u16,
    /// Regions up to this span count are merged into a neighbor when possible.
    pub merge_region_area: u16,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            walkable_height: 2,
            walkable_climb: 1,
            border_size: 0,
            min_region_area: 8,
            merge_region_area: 20,
        }
    }
}

impl RegionConfig {
    pub fn with_walkable_height(mut self, walkable_height: u16) -> Self {
        self.walkable_height = walkable_height;
        self
    }

    pub fn with_walkable_climb(mut self, walkable_climb: u16) -> Self {
        self.walkable_climb = walkable_climb;
        self
    }

    pub fn with_border_size(mut self, border_size: u16) -> Self {
        self.border_size = border_size;
        self
    }

    pub fn with_region_area(mut self, min_region_area: u16, merge_region_area: u16) -> Self {
        self.min_region_area = min_region_area;
        self.merge_region_area = merge_region_area;
        self
    }
}
