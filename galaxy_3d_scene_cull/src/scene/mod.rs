//! Scene culling module
//!
//! Scenarios, instances and the per-frame pipeline that keeps them indexed,
//! paired and culled (dirty pass, pairing, frustum culling, render
//! orchestration).

mod instance;
mod storage;
mod scenario;
mod scene_cull;
mod updater;
mod pairing;
mod culler;
mod render;
mod query;

#[cfg(test)]
pub(crate) mod mock_storage;

use slotmap::new_key_type;

new_key_type! {
    /// Stable handle to a Scenario owned by a `SceneCull`.
    pub struct ScenarioKey;
    /// Stable handle to an Instance owned by a `SceneCull`.
    pub struct InstanceKey;
    /// Stable handle to a Camera owned by a `SceneCull`.
    pub struct CameraKey;
}

/// Opaque handle to something owned by an external layer (mesh, light,
/// environment, shadow atlas, ...). Never dereferenced here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceHandle(pub u64);

/// Identity of the game object an instance belongs to, returned by the
/// spatial query API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u64);

pub use instance::{
    Instance, InstanceType, InstanceFlags, PairMask, InstancePayload,
    GeometryData, LightData, ReflectionProbeData, ProbeRenderStep, DecalData,
    GiProbeData, LightmapData, ParticlesCollisionData,
    ShadowCastingSetting, GeometryFlag, VisibilityRange,
};
pub use storage::{
    GeometryStorage, BaseInfo, LightInfo, LightType, DirectionalShadowMode,
    LightBakeMode, ProbeInfo, ProbeUpdateMode,
};
pub use scenario::{Scenario, InstanceData, DebugMode, INDEXER_GEOMETRY, INDEXER_VOLUMES};
pub use scene_cull::SceneCull;
pub use culler::{
    CullContext, DirectionalShadow, ShadowCascade, PositionalShadow, ShadowFace,
    SdfgiRegion, MAX_SDFGI_CASCADES, SDFGI_REGIONS_PER_CASCADE,
};
pub use render::{
    SceneRenderBackend, NoOpBackend, RenderData, GiProbeUpdate, ProbeFace,
};
