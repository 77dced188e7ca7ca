/// Instance: one placed object of a scenario.
///
/// An instance carries a world transform, the bounds derived from its base
/// resource, visibility settings, its current pairs and a per-type payload.
/// The registry (`SceneCull`) owns every instance; scenarios and indexes
/// only hold `InstanceKey`s.

use bitflags::bitflags;
use glam::Mat4;
use rustc_hash::FxHashSet;
use crate::index::IndexId;
use crate::math::AABB;
use super::storage::{LightInfo, ProbeInfo};
use super::{InstanceKey, ObjectId, ResourceHandle, ScenarioKey};

// ============================================================================
// Types and flags
// ============================================================================

/// What kind of base resource an instance displays. Selected when the base
/// is assigned and never re-tagged afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum InstanceType {
    #[default]
    None,
    Mesh,
    MultiMesh,
    Particles,
    ParticlesCollision,
    Light,
    ReflectionProbe,
    Decal,
    GiProbe,
    Lightmap,
}

bitflags! {
    /// Set of instance types, used to describe which types an instance pairs with.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PairMask: u32 {
        const MESH = 1 << 1;
        const MULTIMESH = 1 << 2;
        const PARTICLES = 1 << 3;
        const PARTICLES_COLLISION = 1 << 4;
        const LIGHT = 1 << 5;
        const REFLECTION_PROBE = 1 << 6;
        const DECAL = 1 << 7;
        const GI_PROBE = 1 << 8;
        const LIGHTMAP = 1 << 9;
        const GEOMETRY = Self::MESH.bits() | Self::MULTIMESH.bits() | Self::PARTICLES.bits();
    }
}

impl InstanceType {
    pub fn is_geometry(self) -> bool {
        matches!(self, Self::Mesh | Self::MultiMesh | Self::Particles)
    }

    /// The single mask bit for this type (empty for `None`).
    pub fn pair_bit(self) -> PairMask {
        match self {
            Self::None => PairMask::empty(),
            Self::Mesh => PairMask::MESH,
            Self::MultiMesh => PairMask::MULTIMESH,
            Self::Particles => PairMask::PARTICLES,
            Self::ParticlesCollision => PairMask::PARTICLES_COLLISION,
            Self::Light => PairMask::LIGHT,
            Self::ReflectionProbe => PairMask::REFLECTION_PROBE,
            Self::Decal => PairMask::DECAL,
            Self::GiProbe => PairMask::GI_PROBE,
            Self::Lightmap => PairMask::LIGHTMAP,
        }
    }
}

bitflags! {
    /// Lean per-instance flags kept in the scenario's parallel arrays.
    ///
    /// The `GEOM_*_DIRTY` bits say which cached per-geometry lists must be
    /// rebuilt the next time the geometry is seen by a camera.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct InstanceFlags: u32 {
        const CAST_SHADOWS = 1 << 0;
        const CAST_SHADOWS_ONLY = 1 << 1;
        const REDRAW_IF_VISIBLE = 1 << 2;
        const GEOM_LIGHTING_DIRTY = 1 << 3;
        const GEOM_REFLECTION_DIRTY = 1 << 4;
        const GEOM_DECAL_DIRTY = 1 << 5;
        const GEOM_GI_PROBE_DIRTY = 1 << 6;
        const LIGHTMAP_CAPTURE = 1 << 7;
        const USES_BAKED_LIGHT = 1 << 8;
        const REFLECTION_PROBE_DIRTY = 1 << 9;
        const GEOM_DIRTY = Self::GEOM_LIGHTING_DIRTY.bits()
            | Self::GEOM_REFLECTION_DIRTY.bits()
            | Self::GEOM_DECAL_DIRTY.bits()
            | Self::GEOM_GI_PROBE_DIRTY.bits();
        /// Bits owned by the pairing engine and the culler, preserved when
        /// the settings-derived bits are recomputed.
        const RUNTIME = Self::GEOM_DIRTY.bits() | Self::REFLECTION_PROBE_DIRTY.bits();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShadowCastingSetting {
    Off,
    #[default]
    On,
    DoubleSided,
    ShadowsOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryFlag {
    UseBakedLight,
    DrawNextFrameIfVisible,
}

/// Distance range (from the camera to the instance center) in which an
/// instance is drawn. The margins widen the range on each side.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VisibilityRange {
    pub begin: f32,
    pub end: f32,
    pub begin_margin: f32,
    pub end_margin: f32,
}

impl VisibilityRange {
    pub fn is_enabled(&self) -> bool {
        self.begin > 0.0 || self.end > 0.0
    }

    /// `end == 0` means no upper limit.
    pub fn contains(&self, distance: f32) -> bool {
        if distance < self.begin - self.begin_margin {
            return false;
        }
        self.end <= 0.0 || distance <= self.end + self.end_margin
    }
}

// ============================================================================
// Payloads
// ============================================================================

/// Geometry side of every pair kind, plus the sorted caches handed to the
/// backend.
#[derive(Debug, Clone, Default)]
pub struct GeometryData {
    pub(crate) can_cast_shadows: bool,
    pub(crate) lights: FxHashSet<InstanceKey>,
    pub(crate) reflection_probes: FxHashSet<InstanceKey>,
    pub(crate) decals: FxHashSet<InstanceKey>,
    pub(crate) gi_probes: FxHashSet<InstanceKey>,
    pub(crate) lightmap_captures: FxHashSet<InstanceKey>,
    /// Particle colliders (particles only)
    pub(crate) particle_colliders: FxHashSet<InstanceKey>,
    pub(crate) light_cache: Vec<InstanceKey>,
    pub(crate) reflection_probe_cache: Vec<InstanceKey>,
    pub(crate) decal_cache: Vec<InstanceKey>,
    pub(crate) gi_probe_cache: Vec<InstanceKey>,
    pub(crate) captured_lightmap: Option<InstanceKey>,
}

impl GeometryData {
    pub fn can_cast_shadows(&self) -> bool {
        self.can_cast_shadows
    }

    /// Lights affecting this geometry, as of the last time it was seen.
    pub fn light_cache(&self) -> &[InstanceKey] {
        &self.light_cache
    }

    pub fn reflection_probe_cache(&self) -> &[InstanceKey] {
        &self.reflection_probe_cache
    }

    pub fn decal_cache(&self) -> &[InstanceKey] {
        &self.decal_cache
    }

    pub fn gi_probe_cache(&self) -> &[InstanceKey] {
        &self.gi_probe_cache
    }

    /// Smallest paired lightmap whose bounds contain this geometry's center.
    pub fn captured_lightmap(&self) -> Option<InstanceKey> {
        self.captured_lightmap
    }
}

#[derive(Debug, Clone)]
pub struct LightData {
    pub(crate) info: LightInfo,
    pub(crate) shadow_dirty: bool,
    pub(crate) geometries: FxHashSet<InstanceKey>,
    pub(crate) gi_probes: FxHashSet<InstanceKey>,
}

impl LightData {
    pub fn info(&self) -> &LightInfo {
        &self.info
    }

    /// Set when a shadow caster paired with or moved inside this light.
    pub fn is_shadow_dirty(&self) -> bool {
        self.shadow_dirty
    }
}

/// Progress of a reflection probe capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProbeRenderStep {
    #[default]
    Idle,
    /// Face `n` (0..6) has been rendered
    CapturingFace(u8),
    Filtering,
    Done,
}

#[derive(Debug, Clone)]
pub struct ReflectionProbeData {
    pub(crate) info: ProbeInfo,
    pub(crate) geometries: FxHashSet<InstanceKey>,
    pub(crate) render_step: ProbeRenderStep,
    pub(crate) queued: bool,
}

impl ReflectionProbeData {
    pub fn info(&self) -> &ProbeInfo {
        &self.info
    }

    pub fn render_step(&self) -> ProbeRenderStep {
        self.render_step
    }

    pub fn is_queued(&self) -> bool {
        self.queued
    }
}

#[derive(Debug, Clone, Default)]
pub struct DecalData {
    pub(crate) geometries: FxHashSet<InstanceKey>,
}

#[derive(Debug, Clone, Default)]
pub struct GiProbeData {
    pub(crate) geometries: FxHashSet<InstanceKey>,
    pub(crate) lights: FxHashSet<InstanceKey>,
    pub(crate) queued: bool,
}

impl GiProbeData {
    pub fn is_queued(&self) -> bool {
        self.queued
    }
}

#[derive(Debug, Clone, Default)]
pub struct LightmapData {
    pub(crate) geometries: FxHashSet<InstanceKey>,
}

#[derive(Debug, Clone, Default)]
pub struct ParticlesCollisionData {
    pub(crate) particles: FxHashSet<InstanceKey>,
}

/// Type-specific state. The variant always matches `Instance::base_type`.
#[derive(Debug, Clone, Default)]
pub enum InstancePayload {
    #[default]
    None,
    Geometry(GeometryData),
    Light(LightData),
    ReflectionProbe(ReflectionProbeData),
    Decal(DecalData),
    GiProbe(GiProbeData),
    Lightmap(LightmapData),
    ParticlesCollision(ParticlesCollisionData),
}

impl InstancePayload {
    /// Pair partners recorded in this payload (for consistency checks).
    pub(crate) fn partner_count(&self) -> usize {
        match self {
            Self::None => 0,
            Self::Geometry(g) => {
                g.lights.len() + g.reflection_probes.len() + g.decals.len()
                    + g.gi_probes.len() + g.lightmap_captures.len() + g.particle_colliders.len()
            }
            Self::Light(l) => l.geometries.len() + l.gi_probes.len(),
            Self::ReflectionProbe(p) => p.geometries.len(),
            Self::Decal(d) => d.geometries.len(),
            Self::GiProbe(g) => g.geometries.len() + g.lights.len(),
            Self::Lightmap(l) => l.geometries.len(),
            Self::ParticlesCollision(c) => c.particles.len(),
        }
    }
}

// ============================================================================
// Instance
// ============================================================================

#[derive(Debug, Clone)]
pub struct Instance {
    pub(crate) base: Option<ResourceHandle>,
    pub(crate) base_type: InstanceType,
    pub(crate) scenario: Option<ScenarioKey>,
    pub(crate) transform: Mat4,
    /// Bounds of the base resource in local space (`None` = unbounded)
    pub(crate) base_aabb: Option<AABB>,
    pub(crate) custom_aabb: Option<AABB>,
    pub(crate) extra_margin: f32,
    pub(crate) world_aabb: AABB,
    pub(crate) visible: bool,
    pub(crate) layer_mask: u32,
    pub(crate) object_id: Option<ObjectId>,
    pub(crate) cast_shadows: ShadowCastingSetting,
    pub(crate) use_baked_light: bool,
    pub(crate) redraw_if_visible: bool,
    pub(crate) visibility_range: VisibilityRange,
    pub(crate) index_id: Option<IndexId>,
    pub(crate) array_index: Option<usize>,
    pub(crate) pairs: FxHashSet<InstanceKey>,
    /// Epoch of the last pairing sweep that found this instance
    pub(crate) pair_check: u64,
    pub(crate) version: u64,
    pub(crate) update_aabb: bool,
    pub(crate) update_dependencies: bool,
    pub(crate) queued: bool,
    pub(crate) payload: InstancePayload,
}

impl Default for Instance {
    fn default() -> Self {
        Self {
            base: None,
            base_type: InstanceType::None,
            scenario: None,
            transform: Mat4::IDENTITY,
            base_aabb: None,
            custom_aabb: None,
            extra_margin: 0.0,
            world_aabb: AABB::default(),
            visible: true,
            layer_mask: 1,
            object_id: None,
            cast_shadows: ShadowCastingSetting::On,
            use_baked_light: false,
            redraw_if_visible: false,
            visibility_range: VisibilityRange::default(),
            index_id: None,
            array_index: None,
            pairs: FxHashSet::default(),
            pair_check: 0,
            version: 0,
            update_aabb: false,
            update_dependencies: false,
            queued: false,
            payload: InstancePayload::None,
        }
    }
}

impl Instance {
    pub fn base(&self) -> Option<ResourceHandle> {
        self.base
    }

    pub fn base_type(&self) -> InstanceType {
        self.base_type
    }

    pub fn scenario(&self) -> Option<ScenarioKey> {
        self.scenario
    }

    pub fn transform(&self) -> &Mat4 {
        &self.transform
    }

    /// World-space bounds as of the last dirty pass.
    pub fn world_aabb(&self) -> &AABB {
        &self.world_aabb
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn layer_mask(&self) -> u32 {
        self.layer_mask
    }

    pub fn object_id(&self) -> Option<ObjectId> {
        self.object_id
    }

    pub fn cast_shadows_setting(&self) -> ShadowCastingSetting {
        self.cast_shadows
    }

    pub fn visibility_range(&self) -> &VisibilityRange {
        &self.visibility_range
    }

    /// Bumped on every change dependents must observe (pairing, base swap,
    /// dependency notifications).
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Slot in the scenario's parallel arrays, if attached.
    pub fn array_index(&self) -> Option<usize> {
        self.array_index
    }

    pub fn is_indexed(&self) -> bool {
        self.index_id.is_some()
    }

    pub fn is_pending_update(&self) -> bool {
        self.queued
    }

    pub fn pairs(&self) -> impl Iterator<Item = InstanceKey> + '_ {
        self.pairs.iter().copied()
    }

    pub fn pair_count(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_paired_with(&self, other: InstanceKey) -> bool {
        self.pairs.contains(&other)
    }

    pub fn payload(&self) -> &InstancePayload {
        &self.payload
    }

    pub fn geometry(&self) -> Option<&GeometryData> {
        match &self.payload {
            InstancePayload::Geometry(g) => Some(g),
            _ => None,
        }
    }

    pub fn light(&self) -> Option<&LightData> {
        match &self.payload {
            InstancePayload::Light(l) => Some(l),
            _ => None,
        }
    }

    pub fn reflection_probe(&self) -> Option<&ReflectionProbeData> {
        match &self.payload {
            InstancePayload::ReflectionProbe(p) => Some(p),
            _ => None,
        }
    }

    pub fn gi_probe(&self) -> Option<&GiProbeData> {
        match &self.payload {
            InstancePayload::GiProbe(g) => Some(g),
            _ => None,
        }
    }

    pub(crate) fn is_directional_light(&self) -> bool {
        matches!(&self.payload, InstancePayload::Light(l) if l.info.is_directional())
    }

    /// Local bounds used for the world AABB: the custom override for
    /// geometry, else the base bounds, grown by the extra margin.
    pub(crate) fn local_aabb(&self) -> Option<AABB> {
        let aabb = match self.custom_aabb {
            Some(custom) if self.base_type.is_geometry() => Some(custom),
            _ => self.base_aabb,
        }?;
        Some(if self.extra_margin > 0.0 { aabb.grown(self.extra_margin) } else { aabb })
    }

    /// Settings-derived array flags (runtime dirty bits excluded).
    pub(crate) fn settings_flags(&self) -> InstanceFlags {
        let mut flags = InstanceFlags::empty();
        if let InstancePayload::Geometry(geom) = &self.payload {
            if self.cast_shadows != ShadowCastingSetting::Off && geom.can_cast_shadows {
                flags |= InstanceFlags::CAST_SHADOWS;
            }
            if self.cast_shadows == ShadowCastingSetting::ShadowsOnly {
                flags |= InstanceFlags::CAST_SHADOWS_ONLY;
            }
            if geom.captured_lightmap.is_some() {
                flags |= InstanceFlags::LIGHTMAP_CAPTURE;
            }
        }
        if self.redraw_if_visible {
            flags |= InstanceFlags::REDRAW_IF_VISIBLE;
        }
        if self.use_baked_light {
            flags |= InstanceFlags::USES_BAKED_LIGHT;
        }
        flags
    }
}

#[cfg(test)]
#[path = "instance_tests.rs"]
mod tests;
