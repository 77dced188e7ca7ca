/// GeometryStorage: contract with the layer that owns base resources.
///
/// Meshes, lights, probes and the rest live in an external storage; the
/// culling core only sees them through `ResourceHandle`s. Whenever it needs
/// bounds or per-type parameters it asks the storage for a `BaseInfo`.

use glam::Vec3;
use crate::math::AABB;
use super::instance::InstanceType;
use super::{InstanceKey, ResourceHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LightType {
    Directional,
    #[default]
    Omni,
    Spot,
}

/// Cascade layout of a directional light's shadow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DirectionalShadowMode {
    /// Single cascade
    #[default]
    Orthogonal,
    Parallel2Splits,
    Parallel4Splits,
}

impl DirectionalShadowMode {
    pub fn cascade_count(self) -> usize {
        match self {
            Self::Orthogonal => 1,
            Self::Parallel2Splits => 2,
            Self::Parallel4Splits => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LightBakeMode {
    Disabled,
    Static,
    #[default]
    Dynamic,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightInfo {
    pub light_type: LightType,
    pub shadow: bool,
    pub range: f32,
    /// Half-angle of a spot cone, in degrees
    pub spot_angle: f32,
    pub directional_shadow_mode: DirectionalShadowMode,
    /// Cascade split points as fractions of the shadow distance
    pub cascade_splits: [f32; 3],
    /// Upper bound on the shadowed distance (0 = camera far plane)
    pub shadow_max_distance: f32,
    pub bake_mode: LightBakeMode,
    pub max_sdfgi_cascade: u32,
    pub cull_mask: u32,
}

impl Default for LightInfo {
    fn default() -> Self {
        Self {
            light_type: LightType::Omni,
            shadow: false,
            range: 5.0,
            spot_angle: 45.0,
            directional_shadow_mode: DirectionalShadowMode::Orthogonal,
            cascade_splits: [0.1, 0.2, 0.5],
            shadow_max_distance: 100.0,
            bake_mode: LightBakeMode::Dynamic,
            max_sdfgi_cascade: 2,
            cull_mask: 0xFFFF_FFFF,
        }
    }
}

impl LightInfo {
    pub fn is_directional(&self) -> bool {
        self.light_type == LightType::Directional
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProbeUpdateMode {
    /// Re-rendered only when something it sees changed
    #[default]
    Once,
    /// Re-rendered every frame it is visible
    Always,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbeInfo {
    pub update_mode: ProbeUpdateMode,
    /// Far plane of the face cameras (0 = derived from the probe extents)
    pub max_distance: f32,
    pub origin_offset: Vec3,
    pub enable_shadows: bool,
    pub cull_mask: u32,
}

impl Default for ProbeInfo {
    fn default() -> Self {
        Self {
            update_mode: ProbeUpdateMode::Once,
            max_distance: 0.0,
            origin_offset: Vec3::ZERO,
            enable_shadows: false,
            cull_mask: 0xFFFF_FFFF,
        }
    }
}

/// Everything the culling core needs to know about a base resource.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BaseInfo {
    pub instance_type: InstanceType,
    /// Local-space bounds (`None` for unbounded bases)
    pub aabb: Option<AABB>,
    /// Whether the materials of a geometry base allow shadow casting
    pub casts_shadows: bool,
    pub light: Option<LightInfo>,
    pub reflection_probe: Option<ProbeInfo>,
}

impl BaseInfo {
    pub fn geometry(instance_type: InstanceType, aabb: AABB) -> Self {
        Self { instance_type, aabb: Some(aabb), casts_shadows: true, ..Default::default() }
    }

    pub fn light(info: LightInfo, aabb: Option<AABB>) -> Self {
        Self { instance_type: InstanceType::Light, aabb, light: Some(info), ..Default::default() }
    }

    pub fn reflection_probe(info: ProbeInfo, aabb: AABB) -> Self {
        Self {
            instance_type: InstanceType::ReflectionProbe,
            aabb: Some(aabb),
            reflection_probe: Some(info),
            ..Default::default()
        }
    }

    pub fn volume(instance_type: InstanceType, aabb: AABB) -> Self {
        Self { instance_type, aabb: Some(aabb), ..Default::default() }
    }
}

/// External storage of base resources.
///
/// Implementations must be thread-safe: the culling core may hold the
/// storage behind an `Arc` shared with the rendering backend.
pub trait GeometryStorage: Send + Sync {
    /// Type, bounds and parameters of `base`. `None` for unknown handles.
    fn base_info(&self, base: ResourceHandle) -> Option<BaseInfo>;

    /// Tell the storage that `instance` depends on `base`, so that later
    /// changes to `base` come back through `SceneCull::instance_dependency_changed`.
    fn base_update_dependency(&self, _base: ResourceHandle, _instance: InstanceKey) {}

    /// `instance` no longer depends on `base`.
    fn base_free_dependency(&self, _base: ResourceHandle, _instance: InstanceKey) {}
}

#[cfg(test)]
#[path = "storage_tests.rs"]
mod tests;
