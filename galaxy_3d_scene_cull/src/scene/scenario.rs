/// Scenario: a named spatial world.
///
/// Holds two spatial indexes (geometry and volumes) plus two parallel,
/// compacted arrays describing every attached instance: its world bounds in
/// culling-friendly form and a lean metadata record. The culler scans these
/// arrays linearly; removal swaps the last entry into the freed slot.

use std::collections::BTreeSet;
use crate::config::IndexKind;
use crate::index::{create_index, SceneIndex};
use crate::math::InstanceBounds;
use super::instance::{InstanceFlags, InstanceType, VisibilityRange};
use super::{InstanceKey, ResourceHandle};

/// Partition for meshes, multimeshes and particles.
pub const INDEXER_GEOMETRY: usize = 0;
/// Partition for lights, probes, decals, lightmaps and particle colliders.
pub const INDEXER_VOLUMES: usize = 1;

/// Debug draw mode forwarded to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DebugMode {
    #[default]
    Disabled,
    Wireframe,
    Overdraw,
    Shadeless,
}

/// Lean per-instance metadata, parallel to `Scenario::instance_aabbs`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InstanceData {
    pub flags: InstanceFlags,
    pub layer_mask: u32,
    pub base_type: InstanceType,
    pub instance: InstanceKey,
    pub visibility_range: Option<VisibilityRange>,
}

pub struct Scenario {
    name: String,
    pub(crate) indexers: [Box<dyn SceneIndex>; 2],
    /// Every instance assigned to this scenario, attached or not
    pub(crate) instances: BTreeSet<InstanceKey>,
    pub(crate) instance_aabbs: Vec<InstanceBounds>,
    pub(crate) instance_data: Vec<InstanceData>,
    /// Visible directional lights (unbounded, never indexed)
    pub(crate) directional_lights: Vec<InstanceKey>,
    pub(crate) environment: Option<ResourceHandle>,
    pub(crate) fallback_environment: Option<ResourceHandle>,
    pub(crate) camera_effects: Option<ResourceHandle>,
    pub(crate) shadow_atlas: Option<ResourceHandle>,
    pub(crate) reflection_atlas_size: u32,
    pub(crate) reflection_atlas_subdiv: u32,
    pub(crate) debug_mode: DebugMode,
}

impl Scenario {
    pub(crate) fn new(name: String, index_kind: &IndexKind) -> Self {
        Self {
            name,
            indexers: [create_index(index_kind), create_index(index_kind)],
            instances: BTreeSet::new(),
            instance_aabbs: Vec::new(),
            instance_data: Vec::new(),
            directional_lights: Vec::new(),
            environment: None,
            fallback_environment: None,
            camera_effects: None,
            shadow_atlas: None,
            reflection_atlas_size: 256,
            reflection_atlas_subdiv: 8,
            debug_mode: DebugMode::Disabled,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn environment(&self) -> Option<ResourceHandle> {
        self.environment
    }

    pub fn fallback_environment(&self) -> Option<ResourceHandle> {
        self.fallback_environment
    }

    pub fn camera_effects(&self) -> Option<ResourceHandle> {
        self.camera_effects
    }

    pub fn shadow_atlas(&self) -> Option<ResourceHandle> {
        self.shadow_atlas
    }

    /// (atlas size, subdivisions)
    pub fn reflection_atlas(&self) -> (u32, u32) {
        (self.reflection_atlas_size, self.reflection_atlas_subdiv)
    }

    pub fn debug_mode(&self) -> DebugMode {
        self.debug_mode
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    pub fn contains(&self, instance: InstanceKey) -> bool {
        self.instances.contains(&instance)
    }

    /// Number of entries in the parallel arrays.
    pub fn attached_count(&self) -> usize {
        self.instance_data.len()
    }

    pub fn instance_aabbs(&self) -> &[InstanceBounds] {
        &self.instance_aabbs
    }

    pub fn instance_data(&self) -> &[InstanceData] {
        &self.instance_data
    }

    pub fn directional_lights(&self) -> &[InstanceKey] {
        &self.directional_lights
    }

    pub fn indexer(&self, partition: usize) -> &dyn SceneIndex {
        self.indexers[partition].as_ref()
    }

    pub fn indexer_for(base_type: InstanceType) -> usize {
        if base_type.is_geometry() { INDEXER_GEOMETRY } else { INDEXER_VOLUMES }
    }

    /// Append an entry to the parallel arrays and return its slot.
    pub(crate) fn push_entry(&mut self, bounds: InstanceBounds, data: InstanceData) -> usize {
        self.instance_aabbs.push(bounds);
        self.instance_data.push(data);
        self.instance_data.len() - 1
    }

    /// Remove the entry at `index` by swapping the last one into its slot.
    ///
    /// Returns the instance that moved into `index`, whose `array_index`
    /// the caller must rewrite.
    pub(crate) fn swap_remove_entry(&mut self, index: usize) -> Option<InstanceKey> {
        debug_assert!(index < self.instance_data.len());
        if index >= self.instance_data.len() {
            return None;
        }
        self.instance_aabbs.swap_remove(index);
        self.instance_data.swap_remove(index);
        self.instance_data.get(index).map(|data| data.instance)
    }

    pub(crate) fn add_directional_light(&mut self, light: InstanceKey) {
        if !self.directional_lights.contains(&light) {
            self.directional_lights.push(light);
        }
    }

    pub(crate) fn remove_directional_light(&mut self, light: InstanceKey) {
        self.directional_lights.retain(|&l| l != light);
    }
}

#[cfg(test)]
#[path = "scenario_tests.rs"]
mod tests;
