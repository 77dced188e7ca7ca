/// Scene render orchestration.
///
/// `render_camera` drives one frame for one camera, strictly in order:
/// flush the dirty pass, resolve the view, cull (camera, shadows, SDFGI),
/// refresh the per-geometry caches of what was seen, advance pending GI and
/// reflection probe work, hand the lists to the backend, drop the scratch.
///
/// The backend owns everything GPU-side. It only ever sees instance keys,
/// resolved views and opaque resource handles.

use glam::Mat4;
use rustc_hash::FxHashSet;
use crate::camera::RenderView;
use crate::error::Result;
use crate::math::AABB;
use crate::{engine_error, engine_trace, engine_warn};
use super::culler::{cube_face_view, CullContext};
use super::instance::{InstancePayload, ProbeRenderStep};
use super::scenario::DebugMode;
use super::scene_cull::{SceneCull, SOURCE};
use super::storage::ProbeUpdateMode;
use super::{CameraKey, InstanceKey, ResourceHandle, ScenarioKey};

/// Steps an `Always` probe may take in one call before resuming next frame.
const MAX_ALWAYS_PROBE_STEPS: usize = 32;

/// Which cube face of which reflection probe a render targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeFace {
    pub probe: InstanceKey,
    /// 0..6, in +X, -X, +Y, -Y, +Z, -Z order
    pub face: u8,
}

/// Everything the backend needs to draw one view.
pub struct RenderData<'a> {
    pub scenario: ScenarioKey,
    pub view: &'a RenderView,
    pub environment: Option<ResourceHandle>,
    pub camera_effects: Option<ResourceHandle>,
    pub shadow_atlas: Option<ResourceHandle>,
    pub reflection_atlas: (u32, u32),
    pub debug_mode: DebugMode,
    /// Visible directional lights of the scenario (never culled)
    pub directional_lights: &'a [InstanceKey],
    /// Set when rendering a reflection probe face instead of a camera
    pub probe_face: Option<ProbeFace>,
    pub cull: &'a CullContext,
}

/// A queued GI probe with the inputs of its update.
pub struct GiProbeUpdate<'a> {
    pub probe: InstanceKey,
    /// Paired lights, sorted
    pub lights: &'a [InstanceKey],
    /// Paired geometry seen by the camera this frame, sorted
    pub dynamic_geometry: &'a [InstanceKey],
}

/// Rendering backend fed by the orchestrator.
///
/// Only `render_scene` is required. Calls happen on the frame thread, in
/// frame order; the data borrowed by `RenderData` is read-only during the
/// call.
pub trait SceneRenderBackend: Send + Sync {
    /// Draw a camera view.
    fn render_scene(&mut self, data: &RenderData<'_>) -> Result<()>;

    /// Draw one face of a reflection probe.
    fn render_probe_face(&mut self, data: &RenderData<'_>) -> Result<()> {
        self.render_scene(data)
    }

    /// Run one filtering step of a captured probe. Returns `true` when the
    /// probe is finished.
    fn filter_probe(&mut self, _probe: InstanceKey) -> Result<bool> {
        Ok(true)
    }

    fn update_gi_probe(&mut self, _update: &GiProbeUpdate<'_>) -> Result<()> {
        Ok(())
    }

    /// SDFGI regions (box, cascade) that need refreshing this frame.
    fn sdfgi_regions(&mut self, _view: &RenderView) -> Vec<(AABB, u32)> {
        Vec::new()
    }
}

/// Backend that draws nothing.
#[derive(Debug, Default)]
pub struct NoOpBackend;

impl SceneRenderBackend for NoOpBackend {
    fn render_scene(&mut self, _data: &RenderData<'_>) -> Result<()> {
        Ok(())
    }
}

fn sorted(set: &FxHashSet<InstanceKey>) -> Vec<InstanceKey> {
    let mut list: Vec<InstanceKey> = set.iter().copied().collect();
    list.sort_unstable();
    list
}

impl SceneCull {
    // ===== FRAME =====

    /// Render `scenario` as seen by `camera` for a viewport of the given
    /// aspect ratio (width / height).
    ///
    /// Invalid handles are logged and skipped. Backend errors are logged
    /// and returned.
    pub fn render_camera(
        &mut self,
        camera: CameraKey,
        scenario: ScenarioKey,
        aspect: f32,
        backend: &mut dyn SceneRenderBackend,
    ) -> Result<()> {
        self.reset_stats();
        self.update_dirty_instances();

        let Some(cam) = self.cameras.get(camera) else {
            engine_warn!(SOURCE, "render_camera: invalid camera {:?}", camera);
            return Ok(());
        };
        if !self.scenarios.contains_key(scenario) {
            engine_warn!(SOURCE, "render_camera: invalid scenario {:?}", scenario);
            return Ok(());
        }
        let view = cam.resolve(aspect);
        let camera_environment = cam.environment();
        let camera_effects = cam.effects();

        let regions = backend.sdfgi_regions(&view);
        let ctx = self.cull_scene(scenario, &view, true, &regions);
        self.finish_cull(&ctx, true);

        self.update_gi_probes(scenario, &ctx, backend)?;
        self.render_probes(backend)?;

        let Some(sc) = self.scenarios.get(scenario) else {
            return Ok(());
        };
        let data = RenderData {
            scenario,
            view: &view,
            environment: camera_environment.or(sc.environment).or(sc.fallback_environment),
            camera_effects: camera_effects.or(sc.camera_effects),
            shadow_atlas: sc.shadow_atlas,
            reflection_atlas: sc.reflection_atlas(),
            debug_mode: sc.debug_mode,
            directional_lights: &sc.directional_lights,
            probe_face: None,
            cull: &ctx,
        };
        if let Err(e) = backend.render_scene(&data) {
            engine_error!(SOURCE, "render_scene failed for scenario '{}': {}", sc.name(), e);
            return Err(e);
        }

        // Redrawn shadow maps are up to date again
        for shadow in ctx.positional_shadows() {
            if let Some(InstancePayload::Light(light)) = self.instances.get_mut(shadow.light()).map(|i| &mut i.payload) {
                light.shadow_dirty = false;
            }
        }

        engine_trace!(SOURCE, "frame: {:?}", self.stats);
        Ok(())
    }

    /// Render a scenario with nothing camera-visible (environment only).
    pub fn render_empty_scene(&mut self, scenario: ScenarioKey, backend: &mut dyn SceneRenderBackend) -> Result<()> {
        let Some(sc) = self.scenarios.get(scenario) else {
            engine_warn!(SOURCE, "render_empty_scene: invalid scenario {:?}", scenario);
            return Ok(());
        };
        let view = RenderView::from_projection(Mat4::IDENTITY, Mat4::IDENTITY, 0.0, 1.0);
        let ctx = CullContext::new(self.page_pool.clone());
        let data = RenderData {
            scenario,
            view: &view,
            environment: sc.environment.or(sc.fallback_environment),
            camera_effects: sc.camera_effects,
            shadow_atlas: sc.shadow_atlas,
            reflection_atlas: sc.reflection_atlas(),
            debug_mode: sc.debug_mode,
            directional_lights: &[],
            probe_face: None,
            cull: &ctx,
        };
        backend.render_scene(&data).inspect_err(|e| {
            engine_error!(SOURCE, "render_empty_scene failed for scenario '{}': {}", sc.name(), e);
        })
    }

    // ===== GI PROBES =====

    fn update_gi_probes(
        &mut self,
        scenario: ScenarioKey,
        ctx: &CullContext,
        backend: &mut dyn SceneRenderBackend,
    ) -> Result<()> {
        if self.gi_probe_queue.is_empty() {
            return Ok(());
        }
        let seen: FxHashSet<InstanceKey> = ctx.geometry().iter().chain(ctx.shadow_only_geometry().iter()).copied().collect();

        let queue = std::mem::take(&mut self.gi_probe_queue);
        let mut pending = Vec::new();
        for (i, &probe) in queue.iter().enumerate() {
            let Some(inst) = self.instances.get(probe) else {
                continue;
            };
            let Some(data) = inst.gi_probe() else {
                continue;
            };
            // Probes of other scenarios wait for one of their own cameras
            if inst.scenario != Some(scenario) {
                pending.push(probe);
                continue;
            }
            let lights = sorted(&data.lights);
            let mut dynamic_geometry: Vec<InstanceKey> =
                data.geometries.iter().copied().filter(|g| seen.contains(g)).collect();
            dynamic_geometry.sort_unstable();

            let update = GiProbeUpdate { probe, lights: &lights, dynamic_geometry: &dynamic_geometry };
            if let Err(e) = backend.update_gi_probe(&update) {
                engine_error!(SOURCE, "GI probe {:?} update failed: {}", probe, e);
                pending.extend_from_slice(&queue[i..]);
                self.gi_probe_queue = pending;
                return Err(e);
            }
            if let Some(InstancePayload::GiProbe(data)) = self.instances.get_mut(probe).map(|i| &mut i.payload) {
                data.queued = false;
            }
        }
        self.gi_probe_queue = pending;
        Ok(())
    }

    // ===== REFLECTION PROBES =====

    pub(crate) fn queue_reflection_probe(&mut self, probe: InstanceKey) {
        if let Some(InstancePayload::ReflectionProbe(data)) = self.instances.get_mut(probe).map(|i| &mut i.payload) {
            if !data.queued {
                data.queued = true;
                data.render_step = ProbeRenderStep::Idle;
                self.reflection_probe_queue.push_back(probe);
            }
        }
    }

    /// Reflection probes waiting for (or in the middle of) a capture.
    pub fn pending_reflection_probes(&self) -> usize {
        self.reflection_probe_queue.len()
    }

    /// Advance queued reflection probe captures.
    ///
    /// `Always` probes run to completion. Only the first queued `Once` probe
    /// progresses, by a single step, so the cost is spread over frames.
    pub fn render_probes(&mut self, backend: &mut dyn SceneRenderBackend) -> Result<()> {
        let mut once_stepped = false;
        let mut i = 0;
        while i < self.reflection_probe_queue.len() {
            let probe = self.reflection_probe_queue[i];
            let mode = self
                .instances
                .get(probe)
                .filter(|inst| inst.scenario.is_some())
                .and_then(|inst| inst.reflection_probe())
                .map(|data| data.info.update_mode);
            let Some(mode) = mode else {
                self.reflection_probe_queue.remove(i);
                continue;
            };

            let done = match mode {
                ProbeUpdateMode::Always => {
                    let mut done = false;
                    for _ in 0..MAX_ALWAYS_PROBE_STEPS {
                        if self.advance_probe(probe, backend)? {
                            done = true;
                            break;
                        }
                    }
                    done
                }
                ProbeUpdateMode::Once if once_stepped => false,
                ProbeUpdateMode::Once => {
                    once_stepped = true;
                    self.advance_probe(probe, backend)?
                }
            };

            if done {
                self.reflection_probe_queue.remove(i);
                if let Some(InstancePayload::ReflectionProbe(data)) = self.instances.get_mut(probe).map(|i| &mut i.payload) {
                    data.queued = false;
                }
            } else {
                i += 1;
            }
        }
        Ok(())
    }

    /// One capture step. Returns `true` once the probe is finished.
    fn advance_probe(&mut self, probe: InstanceKey, backend: &mut dyn SceneRenderBackend) -> Result<bool> {
        let Some(step) = self.instances.get(probe).and_then(|i| i.reflection_probe()).map(|p| p.render_step) else {
            return Ok(true);
        };

        let (next, done) = match step {
            ProbeRenderStep::Idle | ProbeRenderStep::Done => {
                self.render_probe_face(probe, 0, backend)?;
                (ProbeRenderStep::CapturingFace(0), false)
            }
            ProbeRenderStep::CapturingFace(face) if face < 5 => {
                self.render_probe_face(probe, face + 1, backend)?;
                (ProbeRenderStep::CapturingFace(face + 1), false)
            }
            ProbeRenderStep::CapturingFace(_) | ProbeRenderStep::Filtering => {
                if backend.filter_probe(probe)? {
                    (ProbeRenderStep::Done, true)
                } else {
                    (ProbeRenderStep::Filtering, false)
                }
            }
        };

        if let Some(InstancePayload::ReflectionProbe(data)) = self.instances.get_mut(probe).map(|i| &mut i.payload) {
            data.render_step = next;
        }
        Ok(done)
    }

    fn render_probe_face(&mut self, probe: InstanceKey, face: u8, backend: &mut dyn SceneRenderBackend) -> Result<()> {
        let Some(inst) = self.instances.get(probe) else {
            return Ok(());
        };
        let (Some(scenario), Some(data)) = (inst.scenario, inst.reflection_probe()) else {
            return Ok(());
        };
        let info = data.info;
        let origin = inst.transform.transform_point3(info.origin_offset);
        let znear = self.config.probe_znear;
        let zfar = if info.max_distance > 0.0 {
            info.max_distance
        } else {
            (inst.world_aabb.size() * 0.5).length()
        }
        .max(znear * 2.0);

        let view = cube_face_view(origin, face as usize, znear, zfar, info.cull_mask);
        let ctx = self.cull_scene(scenario, &view, info.enable_shadows, &[]);
        self.finish_cull(&ctx, false);

        let Some(sc) = self.scenarios.get(scenario) else {
            return Ok(());
        };
        let render_data = RenderData {
            scenario,
            view: &view,
            environment: sc.environment.or(sc.fallback_environment),
            camera_effects: None,
            shadow_atlas: sc.shadow_atlas,
            reflection_atlas: sc.reflection_atlas(),
            debug_mode: sc.debug_mode,
            directional_lights: &sc.directional_lights,
            probe_face: Some(ProbeFace { probe, face }),
            cull: &ctx,
        };
        backend.render_probe_face(&render_data).inspect_err(|e| {
            engine_error!(SOURCE, "reflection probe {:?} face {} failed: {}", probe, face, e);
        })
    }
}

#[cfg(test)]
#[path = "render_tests.rs"]
mod tests;
