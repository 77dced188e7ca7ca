/// Scene culling configuration and per-frame statistics.

use crate::error::{Error, Result};
use crate::math::AABB;
use glam::Vec3;

/// Maximum number of directional lights a scenario may render
pub const MAX_DIRECTIONAL_LIGHTS: usize = 8;

/// Deepest octree the index will pre-allocate.
///
/// Every node exists up front: depth 6 is about 300k nodes per partition,
/// each scenario holding two partitions. One more level multiplies that by 8.
pub const MAX_OCTREE_DEPTH: u32 = 6;

/// Spatial index implementation used for both scenario partitions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IndexKind {
    /// Dynamic AABB tree. Leaves are fattened by `margin` so small moves
    /// don't restructure the tree.
    DynamicBvh { margin: f32 },
    /// Pre-allocated static octree covering `world_bounds`.
    Octree { world_bounds: AABB, max_depth: u32 },
}

/// Scene culling configuration
#[derive(Debug, Clone)]
pub struct CullConfig {
    /// Index used for the geometry and volume partitions
    pub index_kind: IndexKind,
    /// Lights, decals and reflection probes pair directly with geometry
    pub pair_volumes_to_mesh: bool,
    /// Entries per page of the paged result buffers
    pub page_size: usize,
    /// Cull positional shadow faces on the rayon thread pool
    pub threaded_cull: bool,
    /// Directional lights considered per frame (at most `MAX_DIRECTIONAL_LIGHTS`)
    pub max_directional_lights: usize,
    /// How far cascade volumes extend back toward the light
    pub directional_shadow_caster_extent: f32,
    /// Near plane of reflection probe face cameras
    pub probe_znear: f32,
}

impl Default for CullConfig {
    fn default() -> Self {
        Self {
            index_kind: IndexKind::DynamicBvh { margin: 0.1 },
            pair_volumes_to_mesh: true,
            page_size: 256,
            threaded_cull: false,
            max_directional_lights: MAX_DIRECTIONAL_LIGHTS,
            directional_shadow_caster_extent: 500.0,
            probe_znear: 0.01,
        }
    }
}

impl CullConfig {
    /// Octree preset covering `[-extent, extent]^3`.
    pub fn with_octree(extent: f32, max_depth: u32) -> Self {
        Self {
            index_kind: IndexKind::Octree {
                world_bounds: AABB { min: Vec3::splat(-extent), max: Vec3::splat(extent) },
                max_depth,
            },
            ..Self::default()
        }
    }

    /// Check every field, returning the first rejected value.
    pub fn validate(&self) -> Result<()> {
        match self.index_kind {
            IndexKind::DynamicBvh { margin } => {
                if !(margin >= 0.0) {
                    return Err(Error::InvalidConfig(format!(
                        "BVH margin must be >= 0 (got {})", margin
                    )));
                }
            }
            IndexKind::Octree { world_bounds, max_depth } => {
                if max_depth > MAX_OCTREE_DEPTH {
                    return Err(Error::InvalidConfig(format!(
                        "octree depth {} exceeds {}", max_depth, MAX_OCTREE_DEPTH
                    )));
                }
                if world_bounds.has_no_volume() {
                    return Err(Error::InvalidConfig(format!(
                        "octree bounds {:?} have no volume", world_bounds
                    )));
                }
            }
        }
        if self.page_size == 0 {
            return Err(Error::InvalidConfig("page_size must be > 0".to_string()));
        }
        if self.max_directional_lights > MAX_DIRECTIONAL_LIGHTS {
            return Err(Error::InvalidConfig(format!(
                "max_directional_lights {} exceeds {}",
                self.max_directional_lights, MAX_DIRECTIONAL_LIGHTS
            )));
        }
        if !(self.directional_shadow_caster_extent >= 0.0) {
            return Err(Error::InvalidConfig(
                "directional_shadow_caster_extent must be >= 0".to_string(),
            ));
        }
        if !(self.probe_znear > 0.0) {
            return Err(Error::InvalidConfig("probe_znear must be > 0".to_string()));
        }
        Ok(())
    }
}

/// Per-frame counters, reset when a frame starts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CullStats {
    /// Instances drained from the dirty list
    pub dirty_processed: u32,
    /// Index entries created
    pub index_inserts: u32,
    /// Index entries moved (bounds changed)
    pub index_updates: u32,
    /// Index entries removed
    pub index_removes: u32,
    pub pairs_created: u32,
    pub pairs_removed: u32,
    /// Geometry instances in the camera list
    pub visible_geometry: u32,
    /// Shadow caster entries across every shadow target
    pub shadow_casters: u32,
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
