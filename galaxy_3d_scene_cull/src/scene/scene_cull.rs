/// SceneCull: registry of cameras, scenarios and instances.
///
/// Every mutation only records state and queues the instance on the dirty
/// list; indexing, pairing and culling happen later in the dirty pass and
/// the render calls. Invalid handles are logged and ignored (mutators return
/// `false`).

use std::collections::VecDeque;
use std::sync::Arc;
use glam::{Mat4, Vec2};
use rustc_hash::FxHashMap;
use slotmap::SlotMap;
use crate::camera::Camera;
use crate::config::{CullConfig, CullStats};
use crate::error::{Error, Result};
use crate::math::AABB;
use crate::utils::PagedArrayPool;
use crate::{engine_debug, engine_warn};
use super::instance::{
    DecalData, GeometryData, GeometryFlag, GiProbeData, Instance, InstanceFlags,
    InstancePayload, InstanceType, LightData, LightmapData, ParticlesCollisionData,
    ReflectionProbeData, ShadowCastingSetting, VisibilityRange,
};
use super::scenario::{DebugMode, Scenario};
use super::storage::{BaseInfo, GeometryStorage};
use super::{CameraKey, InstanceKey, ObjectId, ResourceHandle, ScenarioKey};

pub(crate) const SOURCE: &str = "galaxy3d::SceneCull";

pub struct SceneCull {
    pub(crate) config: CullConfig,
    pub(crate) storage: Arc<dyn GeometryStorage>,
    pub(crate) scenarios: SlotMap<ScenarioKey, Scenario>,
    scenario_names: FxHashMap<String, ScenarioKey>,
    pub(crate) instances: SlotMap<InstanceKey, Instance>,
    pub(crate) cameras: SlotMap<CameraKey, Camera>,
    /// Instances waiting for the dirty pass (each at most once)
    pub(crate) dirty_instances: Vec<InstanceKey>,
    /// Pairing epoch, incremented once per sweep
    pub(crate) pair_pass: u64,
    pub(crate) reflection_probe_queue: VecDeque<InstanceKey>,
    pub(crate) gi_probe_queue: Vec<InstanceKey>,
    pub(crate) page_pool: Arc<PagedArrayPool<InstanceKey>>,
    pub(crate) stats: CullStats,
}

impl SceneCull {
    /// Create an empty registry.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` if `config` fails validation.
    pub fn new(config: CullConfig, storage: Arc<dyn GeometryStorage>) -> Result<Self> {
        config.validate()?;
        let page_pool = Arc::new(PagedArrayPool::new(config.page_size));
        engine_debug!(SOURCE, "Created with {:?}", config.index_kind);
        Ok(Self {
            config,
            storage,
            scenarios: SlotMap::with_key(),
            scenario_names: FxHashMap::default(),
            instances: SlotMap::with_key(),
            cameras: SlotMap::with_key(),
            dirty_instances: Vec::new(),
            pair_pass: 0,
            reflection_probe_queue: VecDeque::new(),
            gi_probe_queue: Vec::new(),
            page_pool,
            stats: CullStats::default(),
        })
    }

    pub fn config(&self) -> &CullConfig {
        &self.config
    }

    /// Counters of the last frame (reset by `render_camera`).
    pub fn stats(&self) -> CullStats {
        self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = CullStats::default();
    }

    pub fn dirty_count(&self) -> usize {
        self.dirty_instances.len()
    }

    // ===== CAMERA API =====

    pub fn camera_create(&mut self) -> CameraKey {
        self.cameras.insert(Camera::new())
    }

    pub fn camera(&self, camera: CameraKey) -> Option<&Camera> {
        self.cameras.get(camera)
    }

    pub fn is_camera(&self, camera: CameraKey) -> bool {
        self.cameras.contains_key(camera)
    }

    pub fn camera_free(&mut self, camera: CameraKey) -> bool {
        self.cameras.remove(camera).is_some()
    }

    fn with_camera(&mut self, camera: CameraKey, apply: impl FnOnce(&mut Camera)) -> bool {
        match self.cameras.get_mut(camera) {
            Some(cam) => {
                apply(cam);
                true
            }
            None => {
                engine_warn!(SOURCE, "Unknown camera {:?}", camera);
                false
            }
        }
    }

    pub fn camera_set_perspective(&mut self, camera: CameraKey, fov_degrees: f32, znear: f32, zfar: f32) -> bool {
        self.with_camera(camera, |c| c.set_perspective(fov_degrees, znear, zfar))
    }

    pub fn camera_set_orthogonal(&mut self, camera: CameraKey, size: f32, znear: f32, zfar: f32) -> bool {
        self.with_camera(camera, |c| c.set_orthogonal(size, znear, zfar))
    }

    pub fn camera_set_frustum(&mut self, camera: CameraKey, size: f32, offset: Vec2, znear: f32, zfar: f32) -> bool {
        self.with_camera(camera, |c| c.set_frustum(size, offset, znear, zfar))
    }

    pub fn camera_set_transform(&mut self, camera: CameraKey, transform: Mat4) -> bool {
        self.with_camera(camera, |c| c.set_transform(transform))
    }

    pub fn camera_set_cull_mask(&mut self, camera: CameraKey, layers: u32) -> bool {
        self.with_camera(camera, |c| c.set_visible_layers(layers))
    }

    pub fn camera_set_environment(&mut self, camera: CameraKey, environment: Option<ResourceHandle>) -> bool {
        self.with_camera(camera, |c| c.set_environment(environment))
    }

    pub fn camera_set_camera_effects(&mut self, camera: CameraKey, effects: Option<ResourceHandle>) -> bool {
        self.with_camera(camera, |c| c.set_effects(effects))
    }

    pub fn camera_set_use_vertical_aspect(&mut self, camera: CameraKey, enable: bool) -> bool {
        self.with_camera(camera, |c| c.set_use_vertical_aspect(enable))
    }

    // ===== SCENARIO API =====

    /// Create a named scenario.
    ///
    /// # Errors
    ///
    /// Returns `Error::AlreadyExists` if a scenario with that name exists.
    pub fn scenario_create(&mut self, name: &str) -> Result<ScenarioKey> {
        if self.scenario_names.contains_key(name) {
            return Err(Error::AlreadyExists(format!("scenario '{}'", name)));
        }
        let key = self.scenarios.insert(Scenario::new(name.to_string(), &self.config.index_kind));
        self.scenario_names.insert(name.to_string(), key);
        engine_debug!(SOURCE, "Scenario '{}' created", name);
        Ok(key)
    }

    pub fn scenario(&self, scenario: ScenarioKey) -> Option<&Scenario> {
        self.scenarios.get(scenario)
    }

    pub fn scenario_by_name(&self, name: &str) -> Option<ScenarioKey> {
        self.scenario_names.get(name).copied()
    }

    pub fn is_scenario(&self, scenario: ScenarioKey) -> bool {
        self.scenarios.contains_key(scenario)
    }

    pub fn scenario_count(&self) -> usize {
        self.scenarios.len()
    }

    /// Destroy a scenario, detaching every instance it owns first.
    pub fn scenario_free(&mut self, scenario: ScenarioKey) -> bool {
        let Some(owned) = self.scenarios.get(scenario).map(|s| s.instances.iter().copied().collect::<Vec<_>>()) else {
            engine_warn!(SOURCE, "scenario_free: unknown scenario {:?}", scenario);
            return false;
        };
        for instance in owned {
            self.instance_set_scenario(instance, None);
        }
        if let Some(removed) = self.scenarios.remove(scenario) {
            self.scenario_names.remove(removed.name());
            engine_debug!(SOURCE, "Scenario '{}' freed", removed.name());
        }
        true
    }

    fn with_scenario(&mut self, scenario: ScenarioKey, apply: impl FnOnce(&mut Scenario)) -> bool {
        match self.scenarios.get_mut(scenario) {
            Some(s) => {
                apply(s);
                true
            }
            None => {
                engine_warn!(SOURCE, "Unknown scenario {:?}", scenario);
                false
            }
        }
    }

    pub fn scenario_set_environment(&mut self, scenario: ScenarioKey, environment: Option<ResourceHandle>) -> bool {
        self.with_scenario(scenario, |s| s.environment = environment)
    }

    pub fn scenario_set_fallback_environment(&mut self, scenario: ScenarioKey, environment: Option<ResourceHandle>) -> bool {
        self.with_scenario(scenario, |s| s.fallback_environment = environment)
    }

    pub fn scenario_set_camera_effects(&mut self, scenario: ScenarioKey, effects: Option<ResourceHandle>) -> bool {
        self.with_scenario(scenario, |s| s.camera_effects = effects)
    }

    pub fn scenario_set_reflection_atlas_size(&mut self, scenario: ScenarioKey, size: u32, subdiv: u32) -> bool {
        self.with_scenario(scenario, |s| {
            s.reflection_atlas_size = size;
            s.reflection_atlas_subdiv = subdiv;
        })
    }

    pub fn scenario_set_shadow_atlas(&mut self, scenario: ScenarioKey, atlas: Option<ResourceHandle>) -> bool {
        self.with_scenario(scenario, |s| s.shadow_atlas = atlas)
    }

    pub fn scenario_set_debug(&mut self, scenario: ScenarioKey, mode: DebugMode) -> bool {
        self.with_scenario(scenario, |s| s.debug_mode = mode)
    }

    pub fn scenario_get_environment(&self, scenario: ScenarioKey) -> Option<ResourceHandle> {
        self.scenarios.get(scenario)?.environment
    }

    // ===== INSTANCE API =====

    pub fn instance_create(&mut self) -> InstanceKey {
        self.instances.insert(Instance::default())
    }

    pub fn instance(&self, instance: InstanceKey) -> Option<&Instance> {
        self.instances.get(instance)
    }

    pub fn is_instance(&self, instance: InstanceKey) -> bool {
        self.instances.contains_key(instance)
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    fn check_instance(&self, instance: InstanceKey, op: &str) -> bool {
        if self.instances.contains_key(instance) {
            true
        } else {
            engine_warn!(SOURCE, "{}: unknown instance {:?}", op, instance);
            false
        }
    }

    /// Assign (or clear) the base resource. The instance type follows the
    /// base; the previous payload and all pairs are dropped.
    pub fn instance_set_base(&mut self, instance: InstanceKey, base: Option<ResourceHandle>) -> bool {
        if !self.check_instance(instance, "instance_set_base") {
            return false;
        }

        let had_base = self.instances.get(instance).is_some_and(|i| i.base_type != InstanceType::None);
        if had_base {
            self.detach_instance(instance);
        }

        let info = base.and_then(|b| {
            let info = self.storage.base_info(b);
            if info.is_none() {
                engine_warn!(SOURCE, "instance_set_base: unknown base {:?}", b);
            }
            info
        });
        let storage = Arc::clone(&self.storage);
        let Some(inst) = self.instances.get_mut(instance) else {
            return false;
        };
        if let Some(old) = inst.base.take() {
            storage.base_free_dependency(old, instance);
        }
        inst.base_type = InstanceType::None;
        inst.base_aabb = None;
        inst.payload = InstancePayload::None;

        if let (Some(base), Some(info)) = (base, info) {
            if info.instance_type != InstanceType::None {
                inst.base = Some(base);
                inst.base_type = info.instance_type;
                inst.base_aabb = info.aabb;
                inst.payload = payload_for(&info);
                storage.base_update_dependency(base, instance);
            }
        }

        self.sync_directional_membership(instance);
        self.queue_update(instance, true, true);
        true
    }

    /// Move the instance to another scenario (or none).
    pub fn instance_set_scenario(&mut self, instance: InstanceKey, scenario: Option<ScenarioKey>) -> bool {
        if !self.check_instance(instance, "instance_set_scenario") {
            return false;
        }
        if let Some(key) = scenario {
            if !self.scenarios.contains_key(key) {
                engine_warn!(SOURCE, "instance_set_scenario: unknown scenario {:?}", key);
                return false;
            }
        }

        let current = self.instances.get(instance).and_then(|i| i.scenario);
        if current == scenario {
            return true;
        }

        if let Some(old) = current {
            self.detach_instance(instance);
            if let Some(s) = self.scenarios.get_mut(old) {
                s.instances.remove(&instance);
                s.remove_directional_light(instance);
            }
            if let Some(inst) = self.instances.get_mut(instance) {
                inst.scenario = None;
            }
        }

        if let Some(new) = scenario {
            if let Some(s) = self.scenarios.get_mut(new) {
                s.instances.insert(instance);
            }
            if let Some(inst) = self.instances.get_mut(instance) {
                inst.scenario = Some(new);
            }
            self.sync_directional_membership(instance);
            self.queue_update(instance, true, true);
        }
        true
    }

    pub fn instance_set_layer_mask(&mut self, instance: InstanceKey, mask: u32) -> bool {
        let Some(inst) = self.instances.get_mut(instance) else {
            engine_warn!(SOURCE, "instance_set_layer_mask: unknown instance {:?}", instance);
            return false;
        };
        inst.layer_mask = mask;
        self.refresh_array_entry(instance);
        true
    }

    pub fn instance_set_transform(&mut self, instance: InstanceKey, transform: Mat4) -> bool {
        let Some(inst) = self.instances.get_mut(instance) else {
            engine_warn!(SOURCE, "instance_set_transform: unknown instance {:?}", instance);
            return false;
        };
        if !transform.is_finite() {
            engine_warn!(SOURCE, "instance_set_transform: non-finite transform for {:?}", instance);
            return false;
        }
        if inst.transform == transform {
            return true;
        }
        inst.transform = transform;
        self.queue_update(instance, true, false);
        true
    }

    pub fn instance_attach_object_instance_id(&mut self, instance: InstanceKey, object: Option<ObjectId>) -> bool {
        let Some(inst) = self.instances.get_mut(instance) else {
            engine_warn!(SOURCE, "instance_attach_object_instance_id: unknown instance {:?}", instance);
            return false;
        };
        inst.object_id = object;
        true
    }

    pub fn instance_set_visible(&mut self, instance: InstanceKey, visible: bool) -> bool {
        let Some(inst) = self.instances.get_mut(instance) else {
            engine_warn!(SOURCE, "instance_set_visible: unknown instance {:?}", instance);
            return false;
        };
        if inst.visible == visible {
            return true;
        }
        inst.visible = visible;
        let in_scenario = inst.scenario.is_some();

        if visible {
            if in_scenario {
                self.queue_update(instance, true, false);
            }
        } else {
            self.detach_instance(instance);
        }
        self.sync_directional_membership(instance);
        true
    }

    /// Override the base bounds of a geometry instance (`None` restores them).
    pub fn instance_set_custom_aabb(&mut self, instance: InstanceKey, aabb: Option<AABB>) -> bool {
        let Some(inst) = self.instances.get_mut(instance) else {
            engine_warn!(SOURCE, "instance_set_custom_aabb: unknown instance {:?}", instance);
            return false;
        };
        if !inst.base_type.is_geometry() {
            engine_warn!(SOURCE, "instance_set_custom_aabb: {:?} is not geometry", instance);
            return false;
        }
        inst.custom_aabb = aabb;
        self.queue_update(instance, true, false);
        true
    }

    pub fn instance_set_extra_visibility_margin(&mut self, instance: InstanceKey, margin: f32) -> bool {
        let Some(inst) = self.instances.get_mut(instance) else {
            engine_warn!(SOURCE, "instance_set_extra_visibility_margin: unknown instance {:?}", instance);
            return false;
        };
        inst.extra_margin = margin.max(0.0);
        self.queue_update(instance, true, false);
        true
    }

    pub fn instance_geometry_set_cast_shadows_setting(&mut self, instance: InstanceKey, setting: ShadowCastingSetting) -> bool {
        let Some(inst) = self.instances.get_mut(instance) else {
            engine_warn!(SOURCE, "instance_geometry_set_cast_shadows_setting: unknown instance {:?}", instance);
            return false;
        };
        inst.cast_shadows = setting;
        self.refresh_array_entry(instance);
        self.queue_update(instance, false, true);
        true
    }

    pub fn instance_geometry_set_flag(&mut self, instance: InstanceKey, flag: GeometryFlag, enabled: bool) -> bool {
        let Some(inst) = self.instances.get_mut(instance) else {
            engine_warn!(SOURCE, "instance_geometry_set_flag: unknown instance {:?}", instance);
            return false;
        };
        match flag {
            GeometryFlag::UseBakedLight => inst.use_baked_light = enabled,
            GeometryFlag::DrawNextFrameIfVisible => inst.redraw_if_visible = enabled,
        }
        self.refresh_array_entry(instance);
        true
    }

    pub fn instance_geometry_set_draw_range(
        &mut self,
        instance: InstanceKey,
        begin: f32,
        end: f32,
        begin_margin: f32,
        end_margin: f32,
    ) -> bool {
        let Some(inst) = self.instances.get_mut(instance) else {
            engine_warn!(SOURCE, "instance_geometry_set_draw_range: unknown instance {:?}", instance);
            return false;
        };
        inst.visibility_range = VisibilityRange { begin, end, begin_margin, end_margin };
        self.refresh_array_entry(instance);
        true
    }

    /// Destroy an instance: detach it, release its base and drop its key.
    pub fn instance_free(&mut self, instance: InstanceKey) -> bool {
        if !self.check_instance(instance, "instance_free") {
            return false;
        }
        self.instance_set_scenario(instance, None);
        self.instance_set_base(instance, None);
        self.instances.remove(instance);
        // Stale keys left in the dirty list are skipped by the dirty pass
        true
    }

    // ===== DEPENDENCY HOOKS =====

    /// The base (or something it uses) changed: re-read bounds and/or
    /// dependencies on the next dirty pass.
    pub fn instance_dependency_changed(&mut self, instance: InstanceKey, aabb: bool, dependencies: bool) -> bool {
        if !self.check_instance(instance, "instance_dependency_changed") {
            return false;
        }
        self.queue_update(instance, aabb, dependencies);
        true
    }

    /// A resource the instance references is gone. Losing the base detaches
    /// the instance; anything else just refreshes dependencies.
    pub fn instance_dependency_deleted(&mut self, instance: InstanceKey, dependency: ResourceHandle) -> bool {
        let Some(inst) = self.instances.get(instance) else {
            engine_warn!(SOURCE, "instance_dependency_deleted: unknown instance {:?}", instance);
            return false;
        };
        if inst.base == Some(dependency) {
            self.instance_set_base(instance, None)
        } else {
            self.queue_update(instance, false, true);
            true
        }
    }

    // ===== INTERNAL =====

    /// Flag the instance for the dirty pass. Dependency changes bump the
    /// version immediately.
    pub(crate) fn queue_update(&mut self, instance: InstanceKey, update_aabb: bool, update_dependencies: bool) {
        let Some(inst) = self.instances.get_mut(instance) else {
            return;
        };
        inst.update_aabb |= update_aabb;
        if update_dependencies {
            inst.update_dependencies = true;
            inst.version += 1;
        }
        if !inst.queued {
            inst.queued = true;
            self.dirty_instances.push(instance);
        }
    }

    /// Directional lights are listed by their scenario while visible.
    pub(crate) fn sync_directional_membership(&mut self, instance: InstanceKey) {
        let Some(inst) = self.instances.get(instance) else {
            return;
        };
        let Some(scenario) = inst.scenario.and_then(|key| self.scenarios.get_mut(key)) else {
            return;
        };
        if inst.visible && inst.is_directional_light() {
            scenario.add_directional_light(instance);
        } else {
            scenario.remove_directional_light(instance);
        }
    }

    /// Tear down every pair and remove the instance from its index and the
    /// parallel arrays. The scenario assignment is kept.
    pub(crate) fn detach_instance(&mut self, instance: InstanceKey) {
        self.unpair_all(instance);
        self.remove_from_partition(instance);

        self.reflection_probe_queue.retain(|&k| k != instance);
        self.gi_probe_queue.retain(|&k| k != instance);
        let Some(inst) = self.instances.get_mut(instance) else {
            return;
        };
        match &mut inst.payload {
            InstancePayload::Geometry(geom) => {
                geom.light_cache.clear();
                geom.reflection_probe_cache.clear();
                geom.decal_cache.clear();
                geom.gi_probe_cache.clear();
                geom.captured_lightmap = None;
            }
            InstancePayload::ReflectionProbe(probe) => {
                probe.queued = false;
                probe.render_step = Default::default();
            }
            InstancePayload::GiProbe(probe) => probe.queued = false,
            _ => {}
        }
    }

    /// Drop the index entry and the array slot, fixing the slot of the
    /// entry swapped in.
    pub(crate) fn remove_from_partition(&mut self, instance: InstanceKey) {
        let Some(inst) = self.instances.get_mut(instance) else {
            return;
        };
        let index_id = inst.index_id.take();
        let array_index = inst.array_index.take();
        let partition = Scenario::indexer_for(inst.base_type);
        let Some(scenario) = inst.scenario.and_then(|key| self.scenarios.get_mut(key)) else {
            debug_assert!(index_id.is_none() && array_index.is_none());
            return;
        };

        if let Some(id) = index_id {
            scenario.indexers[partition].remove(id);
            self.stats.index_removes += 1;
        }
        if let Some(slot) = array_index {
            if let Some(moved) = scenario.swap_remove_entry(slot) {
                if let Some(moved_inst) = self.instances.get_mut(moved) {
                    moved_inst.array_index = Some(slot);
                }
            }
        }
    }

    /// Rewrite the settings-derived part of the array entry (runtime dirty
    /// bits are kept).
    pub(crate) fn refresh_array_entry(&mut self, instance: InstanceKey) {
        let Some(inst) = self.instances.get(instance) else {
            return;
        };
        let (Some(key), Some(slot)) = (inst.scenario, inst.array_index) else {
            return;
        };
        let Some(data) = self.scenarios.get_mut(key).and_then(|s| s.instance_data.get_mut(slot)) else {
            return;
        };
        debug_assert_eq!(data.instance, instance);
        let was_caster = data.flags.contains(InstanceFlags::CAST_SHADOWS);
        data.flags = (data.flags & InstanceFlags::RUNTIME) | inst.settings_flags();
        data.layer_mask = inst.layer_mask;
        data.visibility_range = inst.visibility_range.is_enabled().then_some(inst.visibility_range);
        if was_caster != data.flags.contains(InstanceFlags::CAST_SHADOWS) {
            self.mark_paired_shadows_dirty(instance);
        }
    }

    /// Flag the shadow map of every light paired with `geometry` as stale.
    pub(crate) fn mark_paired_shadows_dirty(&mut self, geometry: InstanceKey) {
        let lights: Vec<InstanceKey> = match self.instances.get(geometry).map(|i| &i.payload) {
            Some(InstancePayload::Geometry(geom)) => geom.lights.iter().copied().collect(),
            _ => return,
        };
        for light in lights {
            if let Some(InstancePayload::Light(data)) = self.instances.get_mut(light).map(|i| &mut i.payload) {
                data.shadow_dirty = true;
            }
        }
    }

    /// Set runtime bits on the array entry of an attached instance.
    pub(crate) fn mark_array_flags(&mut self, instance: InstanceKey, flags: InstanceFlags) {
        let Some(inst) = self.instances.get(instance) else {
            return;
        };
        let (Some(key), Some(slot)) = (inst.scenario, inst.array_index) else {
            return;
        };
        if let Some(data) = self.scenarios.get_mut(key).and_then(|s| s.instance_data.get_mut(slot)) {
            data.flags |= flags;
        }
    }

    /// Structural invariants, checked by tests after every scenario step.
    #[cfg(test)]
    pub(crate) fn check_consistency(&self) {
        for (key, scenario) in &self.scenarios {
            assert_eq!(scenario.instance_aabbs.len(), scenario.instance_data.len());
            for (slot, data) in scenario.instance_data.iter().enumerate() {
                let inst = &self.instances[data.instance];
                assert_eq!(inst.scenario, Some(key));
                assert_eq!(inst.array_index, Some(slot));
                assert!(inst.index_id.is_some());
            }
            let indexed = scenario.indexers[0].len() + scenario.indexers[1].len();
            assert_eq!(indexed, scenario.instance_data.len());
            for &light in &scenario.directional_lights {
                assert!(self.instances[light].is_directional_light());
            }
        }
        for (key, inst) in &self.instances {
            assert_eq!(inst.index_id.is_some(), inst.array_index.is_some());
            for other in &inst.pairs {
                assert!(self.instances[*other].pairs.contains(&key), "asymmetric pair");
            }
            assert_eq!(inst.pairs.len(), inst.payload.partner_count(), "{:?}", inst.base_type);
        }
    }
}

/// Fresh payload for a base of the given description.
fn payload_for(info: &BaseInfo) -> InstancePayload {
    match info.instance_type {
        InstanceType::None => InstancePayload::None,
        InstanceType::Mesh | InstanceType::MultiMesh | InstanceType::Particles => {
            InstancePayload::Geometry(GeometryData { can_cast_shadows: info.casts_shadows, ..Default::default() })
        }
        InstanceType::Light => InstancePayload::Light(LightData {
            info: info.light.unwrap_or_default(),
            shadow_dirty: true,
            geometries: Default::default(),
            gi_probes: Default::default(),
        }),
        InstanceType::ReflectionProbe => InstancePayload::ReflectionProbe(ReflectionProbeData {
            info: info.reflection_probe.unwrap_or_default(),
            geometries: Default::default(),
            render_step: Default::default(),
            queued: false,
        }),
        InstanceType::Decal => InstancePayload::Decal(DecalData::default()),
        InstanceType::GiProbe => InstancePayload::GiProbe(GiProbeData::default()),
        InstanceType::Lightmap => InstancePayload::Lightmap(LightmapData::default()),
        InstanceType::ParticlesCollision => InstancePayload::ParticlesCollision(ParticlesCollisionData::default()),
    }
}

/// Re-read the cached parameters of a base while keeping pair bookkeeping.
pub(crate) fn refresh_payload(payload: &mut InstancePayload, info: &BaseInfo) {
    match payload {
        InstancePayload::Geometry(geom) => geom.can_cast_shadows = info.casts_shadows,
        InstancePayload::Light(light) => {
            if let Some(new_info) = info.light {
                light.info = new_info;
            }
        }
        InstancePayload::ReflectionProbe(probe) => {
            if let Some(new_info) = info.reflection_probe {
                probe.info = new_info;
            }
        }
        _ => {}
    }
}

#[cfg(test)]
#[path = "scene_cull_tests.rs"]
mod tests;
