/// Frustum culling.
///
/// One linear scan over a scenario's parallel arrays fills every per-frame
/// list at once: the camera lists (geometry, lights, probes, decals, ...),
/// each directional shadow cascade and each SDFGI region. Positional light
/// shadows are culled afterwards through the geometry index, one query per
/// face, optionally spread over the rayon thread pool.
///
/// The registry and indexes are read-only for the whole cull. Results go to
/// `PagedArray`s drawn from the registry's shared page pool; dropping the
/// `CullContext` hands the pages back.

use std::f32::consts::FRAC_PI_2;
use std::sync::Arc;
use glam::{Mat4, Vec3, Vec4};
use rayon::prelude::*;
use rustc_hash::FxHashSet;
use slotmap::SlotMap;
use crate::camera::{Frustum, RenderView};
use crate::index::IndexQuery;
use crate::math::AABB;
use crate::utils::{PagedArray, PagedArrayPool};
use crate::engine_warn;
use super::instance::{Instance, InstanceFlags, InstancePayload, InstanceType};
use super::scenario::{Scenario, INDEXER_GEOMETRY};
use super::scene_cull::{SceneCull, SOURCE};
use super::storage::{LightBakeMode, LightInfo, LightType, ProbeUpdateMode};
use super::{InstanceKey, ScenarioKey};

/// SDFGI cascades the backend may report regions for.
pub const MAX_SDFGI_CASCADES: usize = 8;
/// Pending regions per SDFGI cascade.
pub const SDFGI_REGIONS_PER_CASCADE: usize = 3;

/// Near plane of positional shadow faces.
const SHADOW_ZNEAR: f32 = 0.01;

/// (view direction, up) of the six cube faces: +X, -X, +Y, -Y, +Z, -Z.
const CUBE_FACES: [(Vec3, Vec3); 6] = [
    (Vec3::X, Vec3::NEG_Y),
    (Vec3::NEG_X, Vec3::NEG_Y),
    (Vec3::Y, Vec3::Z),
    (Vec3::NEG_Y, Vec3::NEG_Z),
    (Vec3::Z, Vec3::NEG_Y),
    (Vec3::NEG_Z, Vec3::NEG_Y),
];

// ============================================================================
// Result types
// ============================================================================

pub struct ShadowCascade {
    pub(crate) view: RenderView,
    /// Camera distance where this cascade ends
    pub(crate) split: f32,
    pub(crate) casters: PagedArray<InstanceKey>,
}

impl ShadowCascade {
    pub fn view(&self) -> &RenderView {
        &self.view
    }

    pub fn split(&self) -> f32 {
        self.split
    }

    pub fn casters(&self) -> &PagedArray<InstanceKey> {
        &self.casters
    }
}

pub struct DirectionalShadow {
    pub(crate) light: InstanceKey,
    pub(crate) cull_mask: u32,
    pub(crate) cascades: Vec<ShadowCascade>,
}

impl DirectionalShadow {
    pub fn light(&self) -> InstanceKey {
        self.light
    }

    pub fn cascades(&self) -> &[ShadowCascade] {
        &self.cascades
    }
}

pub struct ShadowFace {
    pub(crate) view: RenderView,
    pub(crate) casters: PagedArray<InstanceKey>,
}

impl ShadowFace {
    pub fn view(&self) -> &RenderView {
        &self.view
    }

    pub fn casters(&self) -> &PagedArray<InstanceKey> {
        &self.casters
    }
}

pub struct PositionalShadow {
    pub(crate) light: InstanceKey,
    pub(crate) cull_mask: u32,
    /// The light's shadow map is stale and must be redrawn
    pub(crate) redraw: bool,
    pub(crate) faces: Vec<ShadowFace>,
}

impl PositionalShadow {
    pub fn light(&self) -> InstanceKey {
        self.light
    }

    pub fn needs_redraw(&self) -> bool {
        self.redraw
    }

    pub fn faces(&self) -> &[ShadowFace] {
        &self.faces
    }
}

pub struct SdfgiRegion {
    pub(crate) aabb: AABB,
    pub(crate) cascade: u32,
    pub(crate) instances: PagedArray<InstanceKey>,
}

impl SdfgiRegion {
    pub fn aabb(&self) -> &AABB {
        &self.aabb
    }

    pub fn cascade(&self) -> u32 {
        self.cascade
    }

    pub fn instances(&self) -> &PagedArray<InstanceKey> {
        &self.instances
    }
}

/// Per-frame cull scratch. Built by every cull and never kept across frames.
pub struct CullContext {
    pool: Arc<PagedArrayPool<InstanceKey>>,
    pub(crate) geometry: PagedArray<InstanceKey>,
    pub(crate) shadow_only_geometry: PagedArray<InstanceKey>,
    pub(crate) lights: PagedArray<InstanceKey>,
    pub(crate) reflection_probes: PagedArray<InstanceKey>,
    pub(crate) decals: PagedArray<InstanceKey>,
    pub(crate) gi_probes: PagedArray<InstanceKey>,
    pub(crate) lightmaps: PagedArray<InstanceKey>,
    /// Visible geometry whose cached light/probe lists are stale
    pub(crate) dirty_geometry: PagedArray<InstanceKey>,
    /// Visible reflection probes that want a re-render
    pub(crate) probes_to_render: PagedArray<InstanceKey>,
    pub(crate) redraw_requested: bool,
    pub(crate) directional_shadows: Vec<DirectionalShadow>,
    pub(crate) positional_shadows: Vec<PositionalShadow>,
    pub(crate) sdfgi_regions: Vec<SdfgiRegion>,
    /// (cascade, lights baked into it)
    pub(crate) sdfgi_cascade_lights: Vec<(u32, PagedArray<InstanceKey>)>,
}

impl CullContext {
    pub fn new(pool: Arc<PagedArrayPool<InstanceKey>>) -> Self {
        let list = || PagedArray::new(Arc::clone(&pool));
        Self {
            geometry: list(),
            shadow_only_geometry: list(),
            lights: list(),
            reflection_probes: list(),
            decals: list(),
            gi_probes: list(),
            lightmaps: list(),
            dirty_geometry: list(),
            probes_to_render: list(),
            redraw_requested: false,
            directional_shadows: Vec::new(),
            positional_shadows: Vec::new(),
            sdfgi_regions: Vec::new(),
            sdfgi_cascade_lights: Vec::new(),
            pool,
        }
    }

    fn list(&self) -> PagedArray<InstanceKey> {
        PagedArray::new(Arc::clone(&self.pool))
    }

    /// Camera-visible geometry to draw.
    pub fn geometry(&self) -> &PagedArray<InstanceKey> {
        &self.geometry
    }

    /// Camera-visible geometry that only casts shadows.
    pub fn shadow_only_geometry(&self) -> &PagedArray<InstanceKey> {
        &self.shadow_only_geometry
    }

    /// Camera-visible positional lights.
    pub fn lights(&self) -> &PagedArray<InstanceKey> {
        &self.lights
    }

    pub fn reflection_probes(&self) -> &PagedArray<InstanceKey> {
        &self.reflection_probes
    }

    pub fn decals(&self) -> &PagedArray<InstanceKey> {
        &self.decals
    }

    pub fn gi_probes(&self) -> &PagedArray<InstanceKey> {
        &self.gi_probes
    }

    pub fn lightmaps(&self) -> &PagedArray<InstanceKey> {
        &self.lightmaps
    }

    /// Some visible instance asked to be redrawn next frame.
    pub fn redraw_requested(&self) -> bool {
        self.redraw_requested
    }

    pub fn directional_shadows(&self) -> &[DirectionalShadow] {
        &self.directional_shadows
    }

    pub fn positional_shadows(&self) -> &[PositionalShadow] {
        &self.positional_shadows
    }

    pub fn sdfgi_regions(&self) -> &[SdfgiRegion] {
        &self.sdfgi_regions
    }

    pub fn sdfgi_cascade_lights(&self) -> &[(u32, PagedArray<InstanceKey>)] {
        &self.sdfgi_cascade_lights
    }

    /// Shadow caster entries over all cascades and faces.
    pub fn shadow_caster_count(&self) -> usize {
        let directional: usize = self
            .directional_shadows
            .iter()
            .flat_map(|s| &s.cascades)
            .map(|c| c.casters.len())
            .sum();
        let positional: usize = self
            .positional_shadows
            .iter()
            .flat_map(|s| &s.faces)
            .map(|f| f.casters.len())
            .sum();
        directional + positional
    }

    /// Empty every list, returning pages to the pool.
    pub fn reset(&mut self) {
        for list in [
            &mut self.geometry, &mut self.shadow_only_geometry, &mut self.lights,
            &mut self.reflection_probes, &mut self.decals, &mut self.gi_probes,
            &mut self.lightmaps, &mut self.dirty_geometry, &mut self.probes_to_render,
        ] {
            list.reset();
        }
        self.redraw_requested = false;
        self.directional_shadows.clear();
        self.positional_shadows.clear();
        self.sdfgi_regions.clear();
        self.sdfgi_cascade_lights.clear();
    }
}

// ============================================================================
// View construction
// ============================================================================

/// 90° view of one cube face from `origin`.
pub(crate) fn cube_face_view(origin: Vec3, face: usize, znear: f32, zfar: f32, layers: u32) -> RenderView {
    let (dir, up) = CUBE_FACES[face % 6];
    let view = Mat4::look_to_rh(origin, dir, up);
    let projection = Mat4::perspective_rh(FRAC_PI_2, 1.0, znear, zfar);
    let frustum = Frustum::from_view_projection(&(projection * view));
    RenderView::new(view.inverse(), projection, frustum, znear, zfar, false, layers)
}

/// Shadow views of an omni (6 faces) or spot (1 face) light.
pub(crate) fn positional_shadow_views(transform: &Mat4, info: &LightInfo) -> Vec<RenderView> {
    let origin = transform.col(3).truncate();
    let zfar = info.range.max(SHADOW_ZNEAR * 2.0);
    match info.light_type {
        LightType::Omni => (0..6)
            .map(|face| cube_face_view(origin, face, SHADOW_ZNEAR, zfar, info.cull_mask))
            .collect(),
        LightType::Spot => {
            let dir = (-transform.col(2).truncate()).normalize_or(Vec3::NEG_Z);
            let up = if dir.cross(Vec3::Y).length_squared() > 1e-6 { Vec3::Y } else { Vec3::Z };
            let view = Mat4::look_to_rh(origin, dir, up);
            let fov = (info.spot_angle * 2.0).clamp(1.0, 179.0).to_radians();
            let projection = Mat4::perspective_rh(fov, 1.0, SHADOW_ZNEAR, zfar);
            let frustum = Frustum::from_view_projection(&(projection * view));
            vec![RenderView::new(view.inverse(), projection, frustum, SHADOW_ZNEAR, zfar, false, info.cull_mask)]
        }
        LightType::Directional => Vec::new(),
    }
}

/// Camera distances bounding each cascade: `count + 1` values from the
/// camera near plane to the shadow distance.
pub(crate) fn cascade_distances(info: &LightInfo, znear: f32, zfar: f32) -> Vec<f32> {
    let max_distance = if info.shadow_max_distance > 0.0 { zfar.min(info.shadow_max_distance) } else { zfar };
    let max_distance = max_distance.max(znear + f32::EPSILON);
    let count = info.directional_shadow_mode.cascade_count();

    let mut distances = Vec::with_capacity(count + 1);
    distances.push(znear);
    for i in 0..count {
        let fraction = if i + 1 == count { 1.0 } else { info.cascade_splits[i].clamp(0.0, 1.0) };
        let d = znear + (max_distance - znear) * fraction;
        let prev = distances[distances.len() - 1];
        distances.push(d.max(prev));
    }
    distances
}

/// Orthographic views covering each camera depth slice, seen from a
/// directional light and extended by `caster_extent` toward it.
pub(crate) fn directional_cascade_views(
    light_transform: &Mat4,
    info: &LightInfo,
    camera: &RenderView,
    caster_extent: f32,
) -> Vec<(RenderView, f32)> {
    let dir = (-light_transform.col(2).truncate()).normalize_or(Vec3::NEG_Y);
    let up = if dir.cross(Vec3::Y).length_squared() > 1e-6 { Vec3::Y } else { Vec3::Z };
    let light_view = Mat4::look_to_rh(Vec3::ZERO, dir, up);
    let light_to_world = light_view.inverse();

    // Camera frustum corners on the near (z = 0) and far (z = 1) planes
    let inv_view_proj = camera.view_projection_matrix().inverse();
    let corner = |x: f32, y: f32, z: f32| {
        let p = inv_view_proj * Vec4::new(x, y, z, 1.0);
        p.truncate() / p.w
    };
    let rays: Vec<(Vec3, Vec3)> = [(-1.0, -1.0), (1.0, -1.0), (-1.0, 1.0), (1.0, 1.0)]
        .iter()
        .map(|&(x, y)| (corner(x, y, 0.0), corner(x, y, 1.0)))
        .collect();

    let (znear, zfar) = (camera.znear(), camera.zfar());
    let depth_span = (zfar - znear).max(f32::EPSILON);
    let distances = cascade_distances(info, znear, zfar);

    distances
        .windows(2)
        .map(|slice| {
            let mut min = Vec3::splat(f32::MAX);
            let mut max = Vec3::splat(f32::MIN);
            for &(near, far) in &rays {
                for d in slice {
                    let point = near.lerp(far, (d - znear) / depth_span);
                    let p = light_view.transform_point3(point);
                    min = min.min(p);
                    max = max.max(p);
                }
            }
            max.z += caster_extent.max(0.0);

            let (near, far) = (-max.z, -min.z);
            let projection = Mat4::orthographic_rh(min.x, max.x, min.y, max.y, near, far);
            let frustum = Frustum::from_view_projection(&(projection * light_view));
            let view = RenderView::new(light_to_world, projection, frustum, near, far, true, info.cull_mask);
            (view, slice[1])
        })
        .collect()
}

// ============================================================================
// Culling
// ============================================================================

fn light_info(instances: &SlotMap<InstanceKey, Instance>, key: InstanceKey) -> Option<(&Instance, LightInfo)> {
    let inst = instances.get(key)?;
    let info = inst.light()?.info;
    Some((inst, info))
}

/// Shadow casters of one face, through the geometry index.
fn cull_shadow_face(
    scenario: &Scenario,
    instances: &SlotMap<InstanceKey, Instance>,
    frustum: &Frustum,
    cull_mask: u32,
    casters: &mut PagedArray<InstanceKey>,
) {
    scenario.indexers[INDEXER_GEOMETRY].query(&IndexQuery::Frustum(frustum), &mut |key| {
        let Some(slot) = instances.get(key).and_then(|i| i.array_index) else {
            return;
        };
        let Some(data) = scenario.instance_data.get(slot) else {
            return;
        };
        if data.flags.contains(InstanceFlags::CAST_SHADOWS) && data.layer_mask & cull_mask != 0 {
            casters.push(key);
        }
    });
}

/// The single pass over the parallel arrays.
fn scan_scenario(
    scenario: &Scenario,
    instances: &SlotMap<InstanceKey, Instance>,
    view: &RenderView,
    ctx: &mut CullContext,
) {
    let frustum = view.frustum();
    let camera_position = view.position();
    let layers = view.visible_layers();

    for (bounds, data) in scenario.instance_aabbs.iter().zip(&scenario.instance_data) {
        let mut camera_visible = data.layer_mask & layers != 0 && frustum.intersects_bounds(bounds);
        if camera_visible {
            if let Some(range) = &data.visibility_range {
                camera_visible = range.contains(camera_position.distance(bounds.to_aabb().center()));
            }
        }

        if camera_visible {
            match data.base_type {
                InstanceType::Light => ctx.lights.push(data.instance),
                InstanceType::ReflectionProbe => {
                    ctx.reflection_probes.push(data.instance);
                    let always = instances
                        .get(data.instance)
                        .and_then(|i| i.reflection_probe())
                        .is_some_and(|p| p.info.update_mode == ProbeUpdateMode::Always);
                    if always || data.flags.contains(InstanceFlags::REFLECTION_PROBE_DIRTY) {
                        ctx.probes_to_render.push(data.instance);
                    }
                }
                InstanceType::Decal => ctx.decals.push(data.instance),
                InstanceType::GiProbe => ctx.gi_probes.push(data.instance),
                InstanceType::Lightmap => ctx.lightmaps.push(data.instance),
                InstanceType::Mesh | InstanceType::MultiMesh | InstanceType::Particles => {
                    if data.flags.contains(InstanceFlags::CAST_SHADOWS_ONLY) {
                        ctx.shadow_only_geometry.push(data.instance);
                    } else {
                        ctx.geometry.push(data.instance);
                    }
                    if data.flags.intersects(InstanceFlags::GEOM_DIRTY) {
                        ctx.dirty_geometry.push(data.instance);
                    }
                    if data.flags.contains(InstanceFlags::REDRAW_IF_VISIBLE) {
                        ctx.redraw_requested = true;
                    }
                }
                InstanceType::ParticlesCollision | InstanceType::None => {}
            }
        }

        if !data.base_type.is_geometry() {
            continue;
        }

        if data.flags.contains(InstanceFlags::CAST_SHADOWS) {
            for shadow in &mut ctx.directional_shadows {
                if data.layer_mask & shadow.cull_mask == 0 {
                    continue;
                }
                for cascade in &mut shadow.cascades {
                    if cascade.view.frustum().intersects_bounds(bounds) {
                        cascade.casters.push(data.instance);
                    }
                }
            }
        }

        if data.flags.contains(InstanceFlags::USES_BAKED_LIGHT) {
            for region in &mut ctx.sdfgi_regions {
                if bounds.in_aabb(&region.aabb) {
                    region.instances.push(data.instance);
                }
            }
        }
    }
}

impl SceneCull {
    /// Cull `scenario` from `view` into a fresh context.
    ///
    /// With `shadows`, directional cascades and positional shadow faces are
    /// culled too. `sdfgi_regions` are (box, cascade) pairs from the backend.
    pub(crate) fn cull_scene(
        &self,
        scenario_key: ScenarioKey,
        view: &RenderView,
        shadows: bool,
        sdfgi_regions: &[(AABB, u32)],
    ) -> CullContext {
        let mut ctx = CullContext::new(Arc::clone(&self.page_pool));
        let Some(scenario) = self.scenarios.get(scenario_key) else {
            return ctx;
        };
        let instances = &self.instances;

        if shadows {
            for &light in scenario.directional_lights.iter().take(self.config.max_directional_lights) {
                let Some((inst, info)) = light_info(instances, light) else {
                    continue;
                };
                if !info.shadow {
                    continue;
                }
                let cascades = directional_cascade_views(
                    inst.transform(),
                    &info,
                    view,
                    self.config.directional_shadow_caster_extent,
                )
                .into_iter()
                .map(|(cascade_view, split)| ShadowCascade { view: cascade_view, split, casters: ctx.list() })
                .collect();
                ctx.directional_shadows.push(DirectionalShadow { light, cull_mask: info.cull_mask, cascades });
            }
        }

        let max_regions = MAX_SDFGI_CASCADES * SDFGI_REGIONS_PER_CASCADE;
        if sdfgi_regions.len() > max_regions {
            engine_warn!(SOURCE, "{} SDFGI regions requested, culling the first {}", sdfgi_regions.len(), max_regions);
        }
        for &(aabb, cascade) in sdfgi_regions.iter().take(max_regions) {
            let members = ctx.list();
            ctx.sdfgi_regions.push(SdfgiRegion { aabb, cascade, instances: members });
        }

        scan_scenario(scenario, instances, view, &mut ctx);

        if !ctx.sdfgi_regions.is_empty() {
            self.collect_sdfgi_lights(scenario, &mut ctx);
        }
        if shadows {
            self.cull_positional_shadows(scenario, &mut ctx);
        }
        ctx
    }

    /// Lights baked into each SDFGI cascade that has a pending region.
    fn collect_sdfgi_lights(&self, scenario: &Scenario, ctx: &mut CullContext) {
        let mut cascades: Vec<u32> = ctx.sdfgi_regions.iter().map(|r| r.cascade).collect();
        cascades.sort_unstable();
        cascades.dedup();

        for cascade in cascades {
            let mut lights = ctx.list();
            let baked = |info: &LightInfo| info.bake_mode == LightBakeMode::Dynamic && info.max_sdfgi_cascade >= cascade;

            for &light in &scenario.directional_lights {
                if light_info(&self.instances, light).is_some_and(|(_, info)| baked(&info)) {
                    lights.push(light);
                }
            }
            for (bounds, data) in scenario.instance_aabbs.iter().zip(&scenario.instance_data) {
                if data.base_type != InstanceType::Light {
                    continue;
                }
                let Some((_, info)) = light_info(&self.instances, data.instance) else {
                    continue;
                };
                let overlaps = ctx
                    .sdfgi_regions
                    .iter()
                    .any(|r| r.cascade == cascade && bounds.in_aabb(&r.aabb));
                if overlaps && baked(&info) {
                    lights.push(data.instance);
                }
            }
            ctx.sdfgi_cascade_lights.push((cascade, lights));
        }
    }

    /// Faces of every camera-visible shadowed omni/spot light.
    fn cull_positional_shadows(&self, scenario: &Scenario, ctx: &mut CullContext) {
        let instances = &self.instances;
        for &light in ctx.lights.iter() {
            let Some((inst, info)) = light_info(instances, light) else {
                continue;
            };
            if !info.shadow || info.is_directional() {
                continue;
            }
            let redraw = inst.light().is_some_and(|l| l.shadow_dirty);
            let faces = positional_shadow_views(inst.transform(), &info)
                .into_iter()
                .map(|face_view| ShadowFace { view: face_view, casters: ctx.list() })
                .collect();
            ctx.positional_shadows.push(PositionalShadow { light, cull_mask: info.cull_mask, redraw, faces });
        }

        let face_count: usize = ctx.positional_shadows.iter().map(|s| s.faces.len()).sum();
        if self.config.threaded_cull && face_count > 1 {
            let mut faces: Vec<(&mut ShadowFace, u32)> = ctx
                .positional_shadows
                .iter_mut()
                .flat_map(|shadow| {
                    let cull_mask = shadow.cull_mask;
                    shadow.faces.iter_mut().map(move |face| (face, cull_mask))
                })
                .collect();
            faces.par_iter_mut().for_each(|(face, cull_mask)| {
                cull_shadow_face(scenario, instances, face.view.frustum(), *cull_mask, &mut face.casters);
            });
        } else {
            for shadow in &mut ctx.positional_shadows {
                for face in &mut shadow.faces {
                    cull_shadow_face(scenario, instances, face.view.frustum(), shadow.cull_mask, &mut face.casters);
                }
            }
        }
    }

    /// Post-scan bookkeeping that needs write access: rebuild stale
    /// per-geometry caches, queue probes that want a re-render, update stats.
    pub(crate) fn finish_cull(&mut self, ctx: &CullContext, queue_probes: bool) {
        for &geometry in ctx.dirty_geometry.iter() {
            self.refresh_geometry_caches(geometry);
        }

        if queue_probes {
            for &probe in ctx.probes_to_render.iter() {
                self.queue_reflection_probe(probe);
                self.clear_array_flags(probe, InstanceFlags::REFLECTION_PROBE_DIRTY);
            }
        }

        self.stats.visible_geometry += ctx.geometry.len() as u32;
        self.stats.shadow_casters += ctx.shadow_caster_count() as u32;
    }

    fn clear_array_flags(&mut self, instance: InstanceKey, flags: InstanceFlags) {
        let Some(inst) = self.instances.get(instance) else {
            return;
        };
        let (Some(key), Some(slot)) = (inst.scenario, inst.array_index) else {
            return;
        };
        if let Some(data) = self.scenarios.get_mut(key).and_then(|s| s.instance_data.get_mut(slot)) {
            data.flags.remove(flags);
        }
    }

    fn refresh_geometry_caches(&mut self, geometry: InstanceKey) {
        let Some(inst) = self.instances.get_mut(geometry) else {
            return;
        };
        let (Some(scenario_key), Some(slot)) = (inst.scenario, inst.array_index) else {
            return;
        };
        let Some(data) = self.scenarios.get_mut(scenario_key).and_then(|s| s.instance_data.get_mut(slot)) else {
            return;
        };
        let InstancePayload::Geometry(geom) = &mut inst.payload else {
            return;
        };

        let sorted = |set: &FxHashSet<InstanceKey>| {
            let mut list: Vec<InstanceKey> = set.iter().copied().collect();
            list.sort_unstable();
            list
        };
        if data.flags.contains(InstanceFlags::GEOM_LIGHTING_DIRTY) {
            geom.light_cache = sorted(&geom.lights);
        }
        if data.flags.contains(InstanceFlags::GEOM_REFLECTION_DIRTY) {
            geom.reflection_probe_cache = sorted(&geom.reflection_probes);
        }
        if data.flags.contains(InstanceFlags::GEOM_DECAL_DIRTY) {
            geom.decal_cache = sorted(&geom.decals);
        }
        if data.flags.contains(InstanceFlags::GEOM_GI_PROBE_DIRTY) {
            geom.gi_probe_cache = sorted(&geom.gi_probes);
        }
        data.flags.remove(InstanceFlags::GEOM_DIRTY);
    }
}

#[cfg(test)]
#[path = "culler_tests.rs"]
mod tests;
