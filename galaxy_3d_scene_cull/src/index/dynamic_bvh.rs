/// DynamicBvh: incremental AABB tree for moving objects.
///
/// Every entry is a leaf holding a "fat" AABB (the exact bounds grown by
/// `margin`). As long as the exact bounds stay inside the fat box, an update
/// only rewrites the stored bounds: the tree is untouched. When they escape,
/// the leaf is removed and reinserted.
///
/// Insertion walks down from the root choosing the child whose enlarged
/// surface area costs least, pairs the new leaf with the chosen sibling under
/// a fresh internal node, and refits every ancestor.
///
/// Nodes live in a `SlotArena` addressed by `u32`; freed nodes are recycled. A leaf's node index is its `IndexId`, so ids of
/// surviving entries never change when others are added or removed.

use crate::math::AABB;
use crate::scene::InstanceKey;
use crate::utils::SlotArena;
use super::{IndexId, IndexQuery, SceneIndex};

const NULL: u32 = u32::MAX;

#[derive(Debug, Clone)]
struct BvhNode {
    /// Fat bounds for leaves, union of children for internal nodes
    aabb: AABB,
    /// Exact bounds (leaves only)
    exact: AABB,
    parent: u32,
    children: [u32; 2],
    /// `Some` for live leaves
    instance: Option<InstanceKey>,
}

impl BvhNode {
    fn empty() -> Self {
        Self {
            aabb: AABB::default(),
            exact: AABB::default(),
            parent: NULL,
            children: [NULL, NULL],
            instance: None,
        }
    }

    fn is_leaf(&self) -> bool {
        self.children[0] == NULL
    }
}

pub struct DynamicBvh {
    nodes: SlotArena<BvhNode>,
    root: u32,
    margin: f32,
    leaf_count: usize,
}

impl DynamicBvh {
    pub fn new(margin: f32) -> Self {
        Self {
            nodes: SlotArena::new(),
            root: NULL,
            margin: margin.max(0.0),
            leaf_count: 0,
        }
    }

    pub fn margin(&self) -> f32 {
        self.margin
    }

    /// Height of the tree (0 when empty, 1 for a single leaf).
    pub fn height(&self) -> usize {
        fn depth(nodes: &SlotArena<BvhNode>, idx: u32) -> usize {
            if idx == NULL {
                return 0;
            }
            let node = &nodes[idx];
            if node.is_leaf() {
                1
            } else {
                1 + depth(nodes, node.children[0]).max(depth(nodes, node.children[1]))
            }
        }
        depth(&self.nodes, self.root)
    }

    /// Number of allocated nodes (leaves + internal).
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn alloc_node(&mut self) -> u32 {
        self.nodes.insert(BvhNode::empty())
    }

    fn free_node(&mut self, idx: u32) {
        self.nodes.remove(idx);
    }

    /// Node of a live leaf; internal nodes and freed slots are rejected.
    fn live_leaf(&self, id: IndexId) -> Option<u32> {
        self.nodes.get(id.0).filter(|node| node.instance.is_some()).map(|_| id.0)
    }

    /// Cheapest sibling for a new leaf (surface area heuristic descent).
    fn find_sibling(&self, leaf_aabb: &AABB) -> u32 {
        let mut index = self.root;
        while !self.nodes[index].is_leaf() {
            let node = &self.nodes[index];
            let area = node.aabb.surface_area();
            let combined_area = node.aabb.merge(leaf_aabb).surface_area();

            // Cost of making a new parent for this node and the new leaf
            let cost = 2.0 * combined_area;
            // Minimum cost of pushing the leaf further down the tree
            let inheritance_cost = 2.0 * (combined_area - area);

            let child_cost = |child: u32| {
                let child_node = &self.nodes[child];
                let merged = leaf_aabb.merge(&child_node.aabb).surface_area();
                if child_node.is_leaf() {
                    merged + inheritance_cost
                } else {
                    merged - child_node.aabb.surface_area() + inheritance_cost
                }
            };

            let [c0, c1] = node.children;
            let cost0 = child_cost(c0);
            let cost1 = child_cost(c1);

            if cost < cost0 && cost < cost1 {
                break;
            }
            index = if cost0 < cost1 { c0 } else { c1 };
        }
        index
    }

    fn insert_leaf(&mut self, leaf: u32) {
        if self.root == NULL {
            self.root = leaf;
            self.nodes[leaf].parent = NULL;
            return;
        }

        let leaf_aabb = self.nodes[leaf].aabb;
        let sibling = self.find_sibling(&leaf_aabb);
        let old_parent = self.nodes[sibling].parent;

        let new_parent = self.alloc_node();
        {
            let merged = leaf_aabb.merge(&self.nodes[sibling].aabb);
            let node = &mut self.nodes[new_parent];
            node.parent = old_parent;
            node.aabb = merged;
            node.children = [sibling, leaf];
        }

        if old_parent == NULL {
            self.root = new_parent;
        } else {
            let parent = &mut self.nodes[old_parent];
            if parent.children[0] == sibling {
                parent.children[0] = new_parent;
            } else {
                parent.children[1] = new_parent;
            }
        }
        self.nodes[sibling].parent = new_parent;
        self.nodes[leaf].parent = new_parent;

        self.refit(old_parent);
    }

    fn remove_leaf(&mut self, leaf: u32) {
        if leaf == self.root {
            self.root = NULL;
            return;
        }

        let parent = self.nodes[leaf].parent;
        let grand_parent = self.nodes[parent].parent;
        let [c0, c1] = self.nodes[parent].children;
        let sibling = if c0 == leaf { c1 } else { c0 };

        if grand_parent == NULL {
            self.root = sibling;
            self.nodes[sibling].parent = NULL;
        } else {
            let gp = &mut self.nodes[grand_parent];
            if gp.children[0] == parent {
                gp.children[0] = sibling;
            } else {
                gp.children[1] = sibling;
            }
            self.nodes[sibling].parent = grand_parent;
        }
        self.free_node(parent);
        self.refit(grand_parent);
    }

    /// Recompute internal bounds from `index` up to the root.
    fn refit(&mut self, mut index: u32) {
        while index != NULL {
            let [c0, c1] = self.nodes[index].children;
            let merged = self.nodes[c0].aabb.merge(&self.nodes[c1].aabb);
            let node = &mut self.nodes[index];
            node.aabb = merged;
            index = node.parent;
        }
    }

    /// Structural self-check used by tests: parent links are consistent and
    /// every internal node encloses its children.
    #[cfg(test)]
    pub(crate) fn check_structure(&self) {
        if self.root == NULL {
            assert_eq!(self.leaf_count, 0);
            return;
        }
        assert_eq!(self.nodes[self.root].parent, NULL);
        let mut stack = vec![self.root];
        let mut leaves = 0;
        while let Some(idx) = stack.pop() {
            let node = &self.nodes[idx];
            if node.is_leaf() {
                assert!(node.instance.is_some(), "leaf {} has no instance", idx);
                assert!(node.aabb.contains(&node.exact));
                leaves += 1;
                continue;
            }
            for &child in &node.children {
                assert_eq!(self.nodes[child].parent, idx);
                assert!(node.aabb.contains(&self.nodes[child].aabb));
                stack.push(child);
            }
        }
        assert_eq!(leaves, self.leaf_count);
        assert_eq!(self.node_count(), 2 * leaves - 1);
    }
}

impl SceneIndex for DynamicBvh {
    fn insert(&mut self, instance: InstanceKey, world_aabb: &AABB) -> IndexId {
        let leaf = self.alloc_node();
        {
            let node = &mut self.nodes[leaf];
            node.aabb = world_aabb.grown(self.margin);
            node.exact = *world_aabb;
            node.instance = Some(instance);
        }
        self.insert_leaf(leaf);
        self.leaf_count += 1;
        IndexId(leaf)
    }

    fn remove(&mut self, id: IndexId) {
        let Some(leaf) = self.live_leaf(id) else {
            return;
        };
        self.remove_leaf(leaf);
        self.free_node(leaf);
        self.leaf_count -= 1;
    }

    fn update(&mut self, id: IndexId, world_aabb: &AABB) -> bool {
        let Some(leaf) = self.live_leaf(id) else {
            return false;
        };

        self.nodes[leaf].exact = *world_aabb;
        if self.nodes[leaf].aabb.contains(world_aabb) {
            return false;
        }

        self.remove_leaf(leaf);
        self.nodes[leaf].aabb = world_aabb.grown(self.margin);
        self.insert_leaf(leaf);
        true
    }

    fn query(&self, query: &IndexQuery<'_>, visitor: &mut dyn FnMut(InstanceKey)) {
        if self.root == NULL {
            return;
        }

        let mut stack = Vec::with_capacity(64);
        stack.push(self.root);
        while let Some(idx) = stack.pop() {
            let node = &self.nodes[idx];
            if !query.overlaps(&node.aabb) {
                continue;
            }
            if node.is_leaf() {
                if let Some(instance) = node.instance {
                    if query.overlaps(&node.exact) {
                        visitor(instance);
                    }
                }
            } else {
                stack.extend_from_slice(&node.children);
            }
        }
    }

    fn bounds(&self, id: IndexId) -> Option<AABB> {
        self.live_leaf(id).map(|leaf| self.nodes[leaf].exact)
    }

    fn len(&self) -> usize {
        self.leaf_count
    }

    fn clear(&mut self) {
        self.nodes.clear();
        self.root = NULL;
        self.leaf_count = 0;
    }
}

#[cfg(test)]
#[path = "dynamic_bvh_tests.rs"]
mod tests;
