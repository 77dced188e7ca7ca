use glam::Vec3;
use super::*;
use crate::scene::LightType;

fn geometry(can_cast_shadows: bool) -> Instance {
    Instance {
        base_type: InstanceType::Mesh,
        payload: InstancePayload::Geometry(GeometryData { can_cast_shadows, ..Default::default() }),
        ..Default::default()
    }
}

// ============================================================================
// Types
// ============================================================================

#[test]
fn test_geometry_types() {
    assert!(InstanceType::Mesh.is_geometry());
    assert!(InstanceType::MultiMesh.is_geometry());
    assert!(InstanceType::Particles.is_geometry());
    assert!(!InstanceType::Light.is_geometry());
    assert!(!InstanceType::None.is_geometry());
}

#[test]
fn test_pair_bits_are_distinct() {
    let all = [
        InstanceType::Mesh, InstanceType::MultiMesh, InstanceType::Particles,
        InstanceType::ParticlesCollision, InstanceType::Light, InstanceType::ReflectionProbe,
        InstanceType::Decal, InstanceType::GiProbe, InstanceType::Lightmap,
    ];
    let mut seen = PairMask::empty();
    for ty in all {
        let bit = ty.pair_bit();
        assert_eq!(bit.bits().count_ones(), 1, "{:?}", ty);
        assert!(!seen.intersects(bit));
        seen |= bit;
        assert_eq!(PairMask::GEOMETRY.contains(bit), ty.is_geometry());
    }
    assert!(InstanceType::None.pair_bit().is_empty());
}

// ============================================================================
// Visibility range
// ============================================================================

#[test]
fn test_visibility_range_disabled_by_default() {
    let range = VisibilityRange::default();
    assert!(!range.is_enabled());
    assert!(range.contains(0.0));
    assert!(range.contains(1e6));
}

#[test]
fn test_visibility_range_with_margins() {
    let range = VisibilityRange { begin: 10.0, end: 50.0, begin_margin: 2.0, end_margin: 5.0 };
    assert!(range.is_enabled());
    assert!(!range.contains(7.9));
    assert!(range.contains(8.0));
    assert!(range.contains(55.0));
    assert!(!range.contains(55.1));
}

#[test]
fn test_visibility_range_zero_end_is_unlimited() {
    let range = VisibilityRange { begin: 5.0, end: 0.0, ..Default::default() };
    assert!(!range.contains(4.0));
    assert!(range.contains(1e9));
}

// ============================================================================
// Instance
// ============================================================================

#[test]
fn test_instance_defaults() {
    let inst = Instance::default();
    assert!(inst.is_visible());
    assert_eq!(inst.layer_mask(), 1);
    assert_eq!(inst.base_type(), InstanceType::None);
    assert_eq!(inst.version(), 0);
    assert!(inst.array_index().is_none());
    assert!(!inst.is_indexed());
    assert!(inst.local_aabb().is_none());
}

#[test]
fn test_local_aabb_custom_override_and_margin() {
    let mut inst = geometry(true);
    inst.base_aabb = Some(AABB { min: Vec3::ZERO, max: Vec3::ONE });
    assert_eq!(inst.local_aabb(), Some(AABB { min: Vec3::ZERO, max: Vec3::ONE }));

    inst.custom_aabb = Some(AABB { min: Vec3::splat(-2.0), max: Vec3::splat(2.0) });
    inst.extra_margin = 1.0;
    assert_eq!(inst.local_aabb(), Some(AABB { min: Vec3::splat(-3.0), max: Vec3::splat(3.0) }));
}

#[test]
fn test_custom_aabb_ignored_for_non_geometry() {
    let mut inst = Instance {
        base_type: InstanceType::Decal,
        payload: InstancePayload::Decal(DecalData::default()),
        base_aabb: Some(AABB { min: Vec3::ZERO, max: Vec3::ONE }),
        ..Default::default()
    };
    inst.custom_aabb = Some(AABB { min: Vec3::splat(-5.0), max: Vec3::splat(5.0) });
    assert_eq!(inst.local_aabb(), inst.base_aabb);
}

#[test]
fn test_settings_flags() {
    let mut inst = geometry(true);
    assert_eq!(inst.settings_flags(), InstanceFlags::CAST_SHADOWS);

    inst.cast_shadows = ShadowCastingSetting::ShadowsOnly;
    inst.use_baked_light = true;
    inst.redraw_if_visible = true;
    assert_eq!(
        inst.settings_flags(),
        InstanceFlags::CAST_SHADOWS | InstanceFlags::CAST_SHADOWS_ONLY
            | InstanceFlags::USES_BAKED_LIGHT | InstanceFlags::REDRAW_IF_VISIBLE
    );

    inst.cast_shadows = ShadowCastingSetting::Off;
    assert!(!inst.settings_flags().contains(InstanceFlags::CAST_SHADOWS));
}

#[test]
fn test_material_without_shadows_never_casts() {
    let inst = geometry(false);
    assert!(!inst.settings_flags().contains(InstanceFlags::CAST_SHADOWS));
}

#[test]
fn test_directional_light_detection() {
    let mut info = crate::scene::LightInfo::default();
    let mut inst = Instance {
        base_type: InstanceType::Light,
        payload: InstancePayload::Light(LightData {
            info,
            shadow_dirty: false,
            geometries: Default::default(),
            gi_probes: Default::default(),
        }),
        ..Default::default()
    };
    assert!(!inst.is_directional_light());

    info.light_type = LightType::Directional;
    if let InstancePayload::Light(light) = &mut inst.payload {
        light.info = info;
    }
    assert!(inst.is_directional_light());
}

#[test]
fn test_runtime_flags_cover_dirty_bits() {
    assert!(InstanceFlags::RUNTIME.contains(InstanceFlags::GEOM_DIRTY));
    assert!(InstanceFlags::RUNTIME.contains(InstanceFlags::REFLECTION_PROBE_DIRTY));
    assert!(!InstanceFlags::RUNTIME.contains(InstanceFlags::CAST_SHADOWS));
}
