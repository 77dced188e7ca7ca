/// Dirty-update pass.
///
/// Drains the dirty list once per frame (and before spatial queries). For
/// every queued instance: re-read the base if needed, recompute the world
/// bounds, insert/update/remove its index entry and array slot, re-run
/// pairing when the bounds moved, then notify the storage of the
/// dependency. Only this pass mutates indexes and arrays.

use std::sync::Arc;
use crate::math::InstanceBounds;
use super::instance::{InstanceFlags, InstancePayload};
use super::scenario::{InstanceData, Scenario};
use super::scene_cull::{refresh_payload, SceneCull};
use super::InstanceKey;

impl SceneCull {
    /// Process every queued instance. Running it twice in a row does
    /// nothing the second time.
    pub fn update_dirty_instances(&mut self) {
        while !self.dirty_instances.is_empty() {
            let dirty = std::mem::take(&mut self.dirty_instances);
            for instance in dirty {
                self.update_dirty_instance(instance);
            }
        }
    }

    fn update_dirty_instance(&mut self, instance: InstanceKey) {
        let Some(inst) = self.instances.get_mut(instance) else {
            return;
        };
        if !inst.queued {
            return;
        }
        let update_aabb = inst.update_aabb;
        let update_dependencies = inst.update_dependencies;
        inst.queued = false;
        inst.update_aabb = false;
        inst.update_dependencies = false;
        self.stats.dirty_processed += 1;

        if update_aabb || update_dependencies {
            self.refresh_base_info(instance, update_dependencies);
        }

        self.update_instance(instance);

        if update_dependencies {
            let Some(inst) = self.instances.get(instance) else {
                return;
            };
            if inst.scenario.is_some() {
                if let Some(base) = inst.base {
                    let storage = Arc::clone(&self.storage);
                    storage.base_update_dependency(base, instance);
                }
                self.update_lightmap_capture(instance);
            }
        }
    }

    /// Re-read bounds (and parameters when `parameters`) from the storage.
    fn refresh_base_info(&mut self, instance: InstanceKey, parameters: bool) {
        let Some(base) = self.instances.get(instance).and_then(|i| i.base) else {
            return;
        };
        let Some(info) = self.storage.base_info(base) else {
            return;
        };
        let Some(inst) = self.instances.get_mut(instance) else {
            return;
        };
        inst.base_aabb = info.aabb;
        if parameters {
            let was_directional = inst.is_directional_light();
            refresh_payload(&mut inst.payload, &info);
            if was_directional != inst.is_directional_light() {
                // Switching between bounded and unbounded drops the old pairs
                self.detach_instance(instance);
                self.sync_directional_membership(instance);
            }
            self.refresh_array_entry(instance);
        }
    }

    /// Bring the index entry, array slot and pairs in line with the
    /// instance's current state.
    pub(crate) fn update_instance(&mut self, instance: InstanceKey) {
        let Some(inst) = self.instances.get(instance) else {
            return;
        };
        let Some(scenario_key) = inst.scenario else {
            return;
        };

        let local = inst.local_aabb();
        if !inst.visible || inst.base_type.pair_bit().is_empty() {
            self.detach_instance(instance);
            return;
        }
        if inst.is_directional_light() {
            self.remove_from_partition(instance);
            self.pair_instance(instance);
            return;
        }
        let Some(local) = local else {
            self.detach_instance(instance);
            return;
        };

        let world = local.transformed(&inst.transform);
        let partition = Scenario::indexer_for(inst.base_type);
        let Some(scenario) = self.scenarios.get_mut(scenario_key) else {
            return;
        };
        let Some(inst) = self.instances.get_mut(instance) else {
            return;
        };

        let moved = match (inst.index_id, inst.array_index) {
            (Some(id), Some(slot)) => {
                let moved = world != inst.world_aabb;
                if moved {
                    scenario.indexers[partition].update(id, &world);
                    if let Some(bounds) = scenario.instance_aabbs.get_mut(slot) {
                        *bounds = InstanceBounds::from_aabb(&world);
                    }
                    self.stats.index_updates += 1;
                }
                moved
            }
            _ => {
                let id = scenario.indexers[partition].insert(instance, &world);
                let mut flags = inst.settings_flags();
                match inst.payload {
                    InstancePayload::Geometry(_) => flags |= InstanceFlags::GEOM_DIRTY,
                    InstancePayload::ReflectionProbe(_) => flags |= InstanceFlags::REFLECTION_PROBE_DIRTY,
                    _ => {}
                }
                let slot = scenario.push_entry(
                    InstanceBounds::from_aabb(&world),
                    InstanceData {
                        flags,
                        layer_mask: inst.layer_mask,
                        base_type: inst.base_type,
                        instance,
                        visibility_range: inst.visibility_range.is_enabled().then_some(inst.visibility_range),
                    },
                );
                inst.index_id = Some(id);
                inst.array_index = Some(slot);
                self.stats.index_inserts += 1;
                true
            }
        };
        inst.world_aabb = world;

        if !moved {
            self.refresh_array_entry(instance);
            return;
        }

        // Moved shadow casters and moved lights invalidate shadow maps
        let mut caster_moved = false;
        let mut probe_moved = false;
        match &mut inst.payload {
            InstancePayload::Geometry(geom) => caster_moved = geom.can_cast_shadows,
            InstancePayload::Light(light) => light.shadow_dirty = true,
            InstancePayload::ReflectionProbe(_) => probe_moved = true,
            _ => {}
        }
        if probe_moved {
            self.mark_array_flags(instance, InstanceFlags::REFLECTION_PROBE_DIRTY);
        }
        if caster_moved {
            self.mark_paired_shadows_dirty(instance);
        }

        self.refresh_array_entry(instance);
        self.pair_instance(instance);
        self.update_lightmap_capture(instance);
    }
}

#[cfg(test)]
#[path = "updater_tests.rs"]
mod tests;
