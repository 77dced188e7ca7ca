/// Mock geometry storage and recording backend for unit tests.
///
/// `MockStorage` plays the mesh/light/probe layer: bases are registered
/// with a `BaseInfo` and can be edited or deleted behind the registry's
/// back, like a real storage would. `RecordingBackend` keeps a plain copy
/// of every list it is handed.

use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicU64, Ordering};
use glam::{Mat4, Vec3};
use rustc_hash::FxHashMap;
use crate::camera::RenderView;
use crate::config::CullConfig;
use crate::error::{Error, Result};
use crate::math::AABB;
use super::instance::InstanceType;
use super::render::{GiProbeUpdate, ProbeFace, RenderData, SceneRenderBackend};
use super::scenario::DebugMode;
use super::scene_cull::SceneCull;
use super::storage::{BaseInfo, GeometryStorage, LightInfo, LightType, ProbeInfo};
use super::{CameraKey, InstanceKey, ResourceHandle, ScenarioKey};

// ============================================================================
// Mock Storage
// ============================================================================

#[derive(Default)]
pub struct MockStorage {
    bases: Mutex<FxHashMap<ResourceHandle, BaseInfo>>,
    next_id: AtomicU64,
    /// (base, instance) pairs passed to `base_update_dependency`
    dependency_log: Mutex<Vec<(ResourceHandle, InstanceKey)>>,
    freed: Mutex<Vec<(ResourceHandle, InstanceKey)>>,
}

impl MockStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, info: BaseInfo) -> ResourceHandle {
        let handle = ResourceHandle(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        self.bases.lock().unwrap().insert(handle, info);
        handle
    }

    pub fn set(&self, handle: ResourceHandle, info: BaseInfo) {
        self.bases.lock().unwrap().insert(handle, info);
    }

    pub fn remove(&self, handle: ResourceHandle) {
        self.bases.lock().unwrap().remove(&handle);
    }

    /// Times `base_update_dependency` was called for `instance`.
    pub fn dependency_count(&self, instance: InstanceKey) -> usize {
        self.dependency_log.lock().unwrap().iter().filter(|(_, i)| *i == instance).count()
    }

    pub fn freed_count(&self) -> usize {
        self.freed.lock().unwrap().len()
    }
}

impl GeometryStorage for MockStorage {
    fn base_info(&self, base: ResourceHandle) -> Option<BaseInfo> {
        self.bases.lock().unwrap().get(&base).cloned()
    }

    fn base_update_dependency(&self, base: ResourceHandle, instance: InstanceKey) {
        self.dependency_log.lock().unwrap().push((base, instance));
    }

    fn base_free_dependency(&self, base: ResourceHandle, instance: InstanceKey) {
        self.freed.lock().unwrap().push((base, instance));
    }
}

/// Unit cube `[0, 1]^3`.
pub fn unit_box() -> AABB {
    AABB { min: Vec3::ZERO, max: Vec3::ONE }
}

/// Box of half-size `half` around `center`.
pub fn box_at(center: Vec3, half: f32) -> AABB {
    AABB::from_center_half_extents(center, Vec3::splat(half))
}

// ============================================================================
// Fixture
// ============================================================================

/// A registry with one scenario ("main") backed by a `MockStorage`.
pub struct Fixture {
    pub cull: SceneCull,
    pub storage: Arc<MockStorage>,
    pub scenario: ScenarioKey,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config(CullConfig::default())
    }

    pub fn with_config(config: CullConfig) -> Self {
        let storage = Arc::new(MockStorage::new());
        let mut cull = SceneCull::new(config, storage.clone()).unwrap();
        let scenario = cull.scenario_create("main").unwrap();
        Self { cull, storage, scenario }
    }

    /// New instance of a fresh base, placed in the main scenario.
    pub fn spawn(&mut self, info: BaseInfo, transform: Mat4) -> InstanceKey {
        let base = self.storage.add(info);
        let instance = self.cull.instance_create();
        assert!(self.cull.instance_set_base(instance, Some(base)));
        assert!(self.cull.instance_set_transform(instance, transform));
        assert!(self.cull.instance_set_scenario(instance, Some(self.scenario)));
        instance
    }

    /// Unit-sized mesh centered on `position`.
    pub fn mesh_at(&mut self, position: Vec3) -> InstanceKey {
        self.spawn(BaseInfo::geometry(InstanceType::Mesh, box_at(Vec3::ZERO, 0.5)), Mat4::from_translation(position))
    }

    pub fn omni_light_at(&mut self, position: Vec3, range: f32, shadow: bool) -> InstanceKey {
        let info = LightInfo { light_type: LightType::Omni, range, shadow, ..Default::default() };
        self.spawn(BaseInfo::light(info, Some(box_at(Vec3::ZERO, range))), Mat4::from_translation(position))
    }

    /// Directional light shining along -Y.
    pub fn sun(&mut self, info: LightInfo) -> InstanceKey {
        let info = LightInfo { light_type: LightType::Directional, ..info };
        self.spawn(BaseInfo::light(info, None), Mat4::from_rotation_x(-std::f32::consts::FRAC_PI_2))
    }

    pub fn probe_at(&mut self, position: Vec3, half: f32, info: ProbeInfo) -> InstanceKey {
        self.spawn(BaseInfo::reflection_probe(info, box_at(Vec3::ZERO, half)), Mat4::from_translation(position))
    }

    pub fn volume_at(&mut self, instance_type: InstanceType, position: Vec3, half: f32) -> InstanceKey {
        self.spawn(BaseInfo::volume(instance_type, box_at(Vec3::ZERO, half)), Mat4::from_translation(position))
    }

    /// Run the dirty pass and check the registry invariants.
    pub fn flush(&mut self) {
        self.cull.update_dirty_instances();
        self.cull.check_consistency();
    }

    /// Perspective camera at `position` looking along -Z.
    pub fn camera_at(&mut self, position: Vec3) -> CameraKey {
        let camera = self.cull.camera_create();
        self.cull.camera_set_perspective(camera, 60.0, 0.05, 100.0);
        self.cull.camera_set_transform(camera, Mat4::from_translation(position));
        camera
    }

    pub fn render(&mut self, camera: CameraKey, backend: &mut RecordingBackend) {
        self.cull.render_camera(camera, self.scenario, 1.0, backend).unwrap();
        self.cull.check_consistency();
    }
}

// ============================================================================
// Recording Backend
// ============================================================================

/// Plain copy of one `RenderData`.
#[derive(Debug, Clone, Default)]
pub struct RecordedScene {
    pub geometry: Vec<InstanceKey>,
    pub shadow_only: Vec<InstanceKey>,
    pub lights: Vec<InstanceKey>,
    pub reflection_probes: Vec<InstanceKey>,
    pub decals: Vec<InstanceKey>,
    /// Per directional light: (light, casters per cascade)
    pub cascades: Vec<(InstanceKey, Vec<Vec<InstanceKey>>)>,
    /// Per positional light: (light, redraw, casters per face)
    pub positional: Vec<(InstanceKey, bool, Vec<Vec<InstanceKey>>)>,
    pub directional_lights: Vec<InstanceKey>,
    pub environment: Option<ResourceHandle>,
    pub camera_effects: Option<ResourceHandle>,
    pub debug_mode: DebugMode,
    pub probe_face: Option<ProbeFace>,
    pub redraw_requested: bool,
    pub sdfgi_regions: Vec<(u32, Vec<InstanceKey>)>,
    pub sdfgi_lights: Vec<(u32, Vec<InstanceKey>)>,
}

fn sorted(mut list: Vec<InstanceKey>) -> Vec<InstanceKey> {
    list.sort_unstable();
    list
}

impl RecordedScene {
    fn from_data(data: &RenderData<'_>) -> Self {
        let cull = data.cull;
        Self {
            geometry: sorted(cull.geometry().to_vec()),
            shadow_only: sorted(cull.shadow_only_geometry().to_vec()),
            lights: sorted(cull.lights().to_vec()),
            reflection_probes: sorted(cull.reflection_probes().to_vec()),
            decals: sorted(cull.decals().to_vec()),
            cascades: cull
                .directional_shadows()
                .iter()
                .map(|s| (s.light(), s.cascades().iter().map(|c| sorted(c.casters().to_vec())).collect()))
                .collect(),
            positional: cull
                .positional_shadows()
                .iter()
                .map(|s| (s.light(), s.needs_redraw(), s.faces().iter().map(|f| sorted(f.casters().to_vec())).collect()))
                .collect(),
            directional_lights: data.directional_lights.to_vec(),
            environment: data.environment,
            camera_effects: data.camera_effects,
            debug_mode: data.debug_mode,
            probe_face: data.probe_face,
            redraw_requested: cull.redraw_requested(),
            sdfgi_regions: cull
                .sdfgi_regions()
                .iter()
                .map(|r| (r.cascade(), sorted(r.instances().to_vec())))
                .collect(),
            sdfgi_lights: cull
                .sdfgi_cascade_lights()
                .iter()
                .map(|(c, lights)| (*c, sorted(lights.to_vec())))
                .collect(),
        }
    }
}

#[derive(Default)]
pub struct RecordingBackend {
    pub scenes: Vec<RecordedScene>,
    pub probe_faces: Vec<RecordedScene>,
    pub filter_calls: Vec<InstanceKey>,
    /// (probe, lights, dynamic geometry)
    pub gi_updates: Vec<(InstanceKey, Vec<InstanceKey>, Vec<InstanceKey>)>,
    /// Regions returned from `sdfgi_regions`
    pub regions: Vec<(AABB, u32)>,
    /// Filter calls each probe needs before it reports done
    pub filter_steps: usize,
    filter_progress: FxHashMap<InstanceKey, usize>,
    pub fail_render: bool,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self { filter_steps: 1, ..Default::default() }
    }

    pub fn last_scene(&self) -> &RecordedScene {
        self.scenes.last().expect("no scene rendered")
    }
}

impl SceneRenderBackend for RecordingBackend {
    fn render_scene(&mut self, data: &RenderData<'_>) -> Result<()> {
        if self.fail_render {
            return Err(Error::BackendError("mock render failure".to_string()));
        }
        self.scenes.push(RecordedScene::from_data(data));
        Ok(())
    }

    fn render_probe_face(&mut self, data: &RenderData<'_>) -> Result<()> {
        self.probe_faces.push(RecordedScene::from_data(data));
        Ok(())
    }

    fn filter_probe(&mut self, probe: InstanceKey) -> Result<bool> {
        self.filter_calls.push(probe);
        let progress = self.filter_progress.entry(probe).or_insert(0);
        *progress += 1;
        if *progress >= self.filter_steps.max(1) {
            *progress = 0;
            return Ok(true);
        }
        Ok(false)
    }

    fn update_gi_probe(&mut self, update: &GiProbeUpdate<'_>) -> Result<()> {
        self.gi_updates.push((update.probe, update.lights.to_vec(), update.dynamic_geometry.to_vec()));
        Ok(())
    }

    fn sdfgi_regions(&mut self, _view: &RenderView) -> Vec<(AABB, u32)> {
        self.regions.clone()
    }
}
