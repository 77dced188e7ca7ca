/// OctreeSceneIndex: static octree spatial index.
///
/// Uses single-node placement: each entry is stored in exactly one node,
/// the deepest node whose AABB fully contains it. If the entry straddles a
/// child boundary, it stays in the parent.
///
/// Benefits:
/// - No duplication → no HashSet needed for query results
/// - O(depth) insert, O(1) remove through the entry table
/// - Updates that stay in the same node only rewrite the stored bounds
///
/// The tree structure is pre-allocated at construction time with a fixed
/// `max_depth`. All 8^d nodes exist regardless of occupancy. Entries that
/// leave the world bounds go to an overflow list tested on every query.

use glam::Vec3;
use crate::camera::FrustumTest;
use crate::math::AABB;
use crate::scene::InstanceKey;
use crate::utils::SlotArena;
use super::{IndexId, IndexQuery, SceneIndex};

/// Index of the root node in the flat node array.
const ROOT: usize = 0;

/// Where an entry currently lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placement {
    Node(usize),
    Overflow,
}

struct OctreeNode {
    /// World-space AABB of this node
    aabb: AABB,
    /// Index of the first child in the flat array (0 = no children / leaf)
    first_child: usize,
    /// Entries that don't fit in any child
    entries: Vec<u32>,
}

struct OctreeEntry {
    instance: InstanceKey,
    aabb: AABB,
    placement: Placement,
}

pub struct OctreeSceneIndex {
    /// Flat array of all octree nodes (pre-allocated, depth-first)
    nodes: Vec<OctreeNode>,
    /// Maximum depth of the tree (root = depth 0)
    max_depth: u32,
    /// Entry table addressed by `IndexId`
    entries: SlotArena<OctreeEntry>,
    /// Entries outside the world bounds
    overflow: Vec<u32>,
    /// subtree_sizes[d] = total node count for a subtree of depth d.
    subtree_sizes: Vec<usize>,
}

impl OctreeSceneIndex {
    /// Create a new static octree with the given world bounds and depth.
    ///
    /// Total nodes = (8^(d+1) - 1) / 7. Typical depths: 4–6.
    pub fn new(world_aabb: AABB, max_depth: u32) -> Self {
        let total_nodes = Self::total_node_count(max_depth);
        let mut nodes = Vec::with_capacity(total_nodes);
        Self::build_recursive(&mut nodes, &world_aabb, 0, max_depth);
        debug_assert_eq!(nodes.len(), total_nodes);

        let subtree_sizes: Vec<usize> = (0..=max_depth).map(Self::total_node_count).collect();

        Self {
            nodes,
            max_depth,
            entries: SlotArena::new(),
            overflow: Vec::new(),
            subtree_sizes,
        }
    }

    /// Total number of nodes for a given depth: (8^(d+1) - 1) / 7
    fn total_node_count(max_depth: u32) -> usize {
        let mut count = 0usize;
        let mut level_count = 1usize;
        for _ in 0..=max_depth {
            count += level_count;
            level_count *= 8;
        }
        count
    }

    fn build_recursive(nodes: &mut Vec<OctreeNode>, aabb: &AABB, depth: u32, max_depth: u32) {
        let node_index = nodes.len();
        nodes.push(OctreeNode { aabb: *aabb, first_child: 0, entries: Vec::new() });

        if depth >= max_depth {
            return;
        }

        let center = aabb.center();
        nodes[node_index].first_child = nodes.len();
        for octant in 0..8u8 {
            let child_aabb = Self::octant_aabb(aabb, &center, octant);
            Self::build_recursive(nodes, &child_aabb, depth + 1, max_depth);
        }
    }

    /// AABB of octant 0–7 (bit0 = X, bit1 = Y, bit2 = Z; 0 = low, 1 = high).
    fn octant_aabb(parent: &AABB, center: &Vec3, octant: u8) -> AABB {
        AABB {
            min: Vec3::new(
                if octant & 1 == 0 { parent.min.x } else { center.x },
                if octant & 2 == 0 { parent.min.y } else { center.y },
                if octant & 4 == 0 { parent.min.z } else { center.z },
            ),
            max: Vec3::new(
                if octant & 1 == 0 { center.x } else { parent.max.x },
                if octant & 2 == 0 { center.y } else { parent.max.y },
                if octant & 4 == 0 { center.z } else { parent.max.z },
            ),
        }
    }

    fn point_octant(center: &Vec3, point: &Vec3) -> u8 {
        ((point.x >= center.x) as u8)
            | (((point.y >= center.y) as u8) << 1)
            | (((point.z >= center.z) as u8) << 2)
    }

    fn subtree_offset(&self, octant: u8, remaining_depth: u32) -> usize {
        octant as usize * self.subtree_sizes[remaining_depth as usize]
    }

    /// Deepest node that fully contains `aabb`, or overflow.
    ///
    /// If both corners fall into the same octant the box fits in that child;
    /// otherwise it straddles a boundary and stays in the current node.
    fn find_placement(&self, aabb: &AABB) -> Placement {
        if !self.nodes[ROOT].aabb.contains(aabb) {
            return Placement::Overflow;
        }

        let mut node_idx = ROOT;
        let mut depth = 0;
        loop {
            let first_child = self.nodes[node_idx].first_child;
            if depth >= self.max_depth || first_child == 0 {
                return Placement::Node(node_idx);
            }

            let center = self.nodes[node_idx].aabb.center();
            let min_oct = Self::point_octant(&center, &aabb.min);
            let max_oct = Self::point_octant(&center, &aabb.max);
            if min_oct != max_oct {
                return Placement::Node(node_idx);
            }

            node_idx = first_child + self.subtree_offset(min_oct, self.max_depth - depth - 1);
            depth += 1;
        }
    }

    fn bucket_mut(&mut self, placement: Placement) -> &mut Vec<u32> {
        match placement {
            Placement::Node(idx) => &mut self.nodes[idx].entries,
            Placement::Overflow => &mut self.overflow,
        }
    }

    fn unlink(&mut self, slot: u32, placement: Placement) {
        let bucket = self.bucket_mut(placement);
        if let Some(pos) = bucket.iter().position(|&s| s == slot) {
            bucket.swap_remove(pos);
        }
    }

    fn visit_bucket(&self, bucket: &[u32], query: &IndexQuery<'_>, test: bool, visitor: &mut dyn FnMut(InstanceKey)) {
        for &slot in bucket {
            if let Some(entry) = self.entries.get(slot) {
                if !test || query.overlaps(&entry.aabb) {
                    visitor(entry.instance);
                }
            }
        }
    }

    /// 3-way classification at each node:
    /// - `Outside` → skip entire subtree
    /// - `Inside` → collect the subtree without further testing
    /// - `Partial` → test entries individually, recurse into children
    fn query_recursive(
        &self,
        node_idx: usize,
        query: &IndexQuery<'_>,
        classification: FrustumTest,
        depth: u32,
        visitor: &mut dyn FnMut(InstanceKey),
    ) {
        let node = &self.nodes[node_idx];
        if classification == FrustumTest::Outside {
            return;
        }

        let inside = classification == FrustumTest::Inside;
        self.visit_bucket(&node.entries, query, !inside, visitor);

        if depth >= self.max_depth || node.first_child == 0 {
            return;
        }
        for octant in 0..8u8 {
            let child_idx = node.first_child + self.subtree_offset(octant, self.max_depth - depth - 1);
            let child_class = if inside {
                FrustumTest::Inside
            } else {
                query.classify(&self.nodes[child_idx].aabb)
            };
            self.query_recursive(child_idx, query, child_class, depth + 1, visitor);
        }
    }

    /// Node an entry is stored in (`None` for overflow or unknown ids).
    pub fn node_of(&self, id: IndexId) -> Option<usize> {
        match self.entries.get(id.0)?.placement {
            Placement::Node(idx) => Some(idx),
            Placement::Overflow => None,
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

impl SceneIndex for OctreeSceneIndex {
    fn insert(&mut self, instance: InstanceKey, world_aabb: &AABB) -> IndexId {
        let placement = self.find_placement(world_aabb);
        let slot = self.entries.insert(OctreeEntry { instance, aabb: *world_aabb, placement });
        self.bucket_mut(placement).push(slot);
        IndexId(slot)
    }

    fn remove(&mut self, id: IndexId) {
        let Some(entry) = self.entries.remove(id.0) else {
            return;
        };
        self.unlink(id.0, entry.placement);
    }

    fn update(&mut self, id: IndexId, world_aabb: &AABB) -> bool {
        let target = self.find_placement(world_aabb);
        let Some(entry) = self.entries.get_mut(id.0) else {
            return false;
        };

        entry.aabb = *world_aabb;
        if entry.placement == target {
            return false;
        }

        let old = entry.placement;
        entry.placement = target;
        self.unlink(id.0, old);
        self.bucket_mut(target).push(id.0);
        true
    }

    fn query(&self, query: &IndexQuery<'_>, visitor: &mut dyn FnMut(InstanceKey)) {
        self.visit_bucket(&self.overflow, query, true, visitor);
        let root_class = query.classify(&self.nodes[ROOT].aabb);
        self.query_recursive(ROOT, query, root_class, 0, visitor);
    }

    fn bounds(&self, id: IndexId) -> Option<AABB> {
        self.entries.get(id.0).map(|entry| entry.aabb)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn clear(&mut self) {
        for node in &mut self.nodes {
            node.entries.clear();
        }
        self.overflow.clear();
        self.entries.clear();
    }
}

#[cfg(test)]
#[path = "octree_scene_index_tests.rs"]
mod tests;
