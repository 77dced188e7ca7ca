/// Spatial acceleration structures for scenario queries.
///
/// A SceneIndex indexes instances by their world-space AABB for
/// visibility culling and broad-phase pairing. Every scenario owns two
/// of them: one for geometry, one for volumes (lights, probes, decals).
///
/// The index is only mutated during the dirty pass. Culling and pairing
/// read it through `&self`, so it can be shared across cull workers.

mod dynamic_bvh;
mod octree_scene_index;

pub use dynamic_bvh::DynamicBvh;
pub use octree_scene_index::OctreeSceneIndex;

use glam::{Vec3, Vec4};
use crate::camera::{Frustum, FrustumTest};
use crate::config::IndexKind;
use crate::math::AABB;
use crate::scene::InstanceKey;

/// Handle of one entry inside a `SceneIndex`.
///
/// Only meaningful for the index that returned it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IndexId(pub(crate) u32);

impl IndexId {
    pub fn raw(self) -> u32 {
        self.0
    }
}

/// Region of a spatial query.
#[derive(Debug, Clone, Copy)]
pub enum IndexQuery<'a> {
    Aabb(AABB),
    /// Segment from `from` to `to` (a ray clipped to a length)
    Segment { from: Vec3, to: Vec3 },
    /// Convex volume given as inward-facing planes
    Convex(&'a [Vec4]),
    Frustum(&'a Frustum),
}

impl IndexQuery<'_> {
    /// Conservative overlap test of the region against a box.
    pub fn overlaps(&self, aabb: &AABB) -> bool {
        match self {
            IndexQuery::Aabb(region) => region.intersects(aabb),
            IndexQuery::Segment { from, to } => aabb.intersects_segment(*from, *to),
            IndexQuery::Convex(planes) => aabb.intersects_convex(planes),
            IndexQuery::Frustum(frustum) => frustum.intersects_aabb(aabb),
        }
    }

    /// 3-way classification of a box, used to skip tests for fully
    /// enclosed subtrees. Only frustum queries ever report `Inside`.
    pub fn classify(&self, aabb: &AABB) -> FrustumTest {
        match self {
            IndexQuery::Frustum(frustum) => frustum.classify_aabb(aabb),
            _ if self.overlaps(aabb) => FrustumTest::Partial,
            _ => FrustumTest::Outside,
        }
    }
}

/// Trait for spatial indexing of scenario instances.
pub trait SceneIndex: Send + Sync {
    /// Insert an instance with its world-space AABB.
    fn insert(&mut self, instance: InstanceKey, world_aabb: &AABB) -> IndexId;

    /// Remove an entry. Unknown ids are ignored.
    fn remove(&mut self, id: IndexId);

    /// Update an entry's world-space AABB.
    ///
    /// Returns `true` when the entry had to move inside the structure,
    /// `false` when the new bounds still fit its current node.
    fn update(&mut self, id: IndexId, world_aabb: &AABB) -> bool;

    /// Visit every instance whose bounds overlap the query region.
    ///
    /// Conservative: may visit extra instances, never misses one.
    fn query(&self, query: &IndexQuery<'_>, visitor: &mut dyn FnMut(InstanceKey));

    /// Exact bounds stored for an entry.
    fn bounds(&self, id: IndexId) -> Option<AABB>;

    /// Number of live entries.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove all entries from the index.
    fn clear(&mut self);
}

/// Build an empty index of the configured kind.
pub fn create_index(kind: &IndexKind) -> Box<dyn SceneIndex> {
    match *kind {
        IndexKind::DynamicBvh { margin } => Box::new(DynamicBvh::new(margin)),
        IndexKind::Octree { world_bounds, max_depth } => {
            Box::new(OctreeSceneIndex::new(world_bounds, max_depth))
        }
    }
}

#[cfg(test)]
#[path = "index_tests.rs"]
mod tests;
