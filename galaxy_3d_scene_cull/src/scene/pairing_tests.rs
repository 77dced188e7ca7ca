use glam::{Mat4, Vec3};
use crate::config::CullConfig;
use crate::scene::mock_storage::{box_at, Fixture};
use crate::scene::{BaseInfo, InstanceFlags, LightInfo, ProbeInfo};
use super::*;

fn array_flags(f: &Fixture, instance: InstanceKey) -> InstanceFlags {
    let slot = f.cull.instance(instance).unwrap().array_index().unwrap();
    f.cull.scenario(f.scenario).unwrap().instance_data()[slot].flags
}

fn paired(f: &Fixture, a: InstanceKey, b: InstanceKey) -> bool {
    let ab = f.cull.instance(a).unwrap().is_paired_with(b);
    assert_eq!(ab, f.cull.instance(b).unwrap().is_paired_with(a), "asymmetric pair");
    ab
}

// ============================================================================
// Masks
// ============================================================================

const ALL_TYPES: [InstanceType; 10] = [
    InstanceType::None,
    InstanceType::Mesh,
    InstanceType::MultiMesh,
    InstanceType::Particles,
    InstanceType::ParticlesCollision,
    InstanceType::Light,
    InstanceType::ReflectionProbe,
    InstanceType::Decal,
    InstanceType::GiProbe,
    InstanceType::Lightmap,
];

#[test]
fn test_pair_masks_are_symmetric() {
    for volumes_to_mesh in [false, true] {
        for a in ALL_TYPES {
            for b in ALL_TYPES {
                let ab = pair_mask(a, volumes_to_mesh).intersects(b.pair_bit());
                let ba = pair_mask(b, volumes_to_mesh).intersects(a.pair_bit());
                assert_eq!(ab, ba, "{:?} / {:?} (volumes_to_mesh = {})", a, b, volumes_to_mesh);
            }
        }
    }
}

#[test]
fn test_pair_mask_contents() {
    assert_eq!(pair_mask(InstanceType::None, true), PairMask::empty());
    assert_eq!(pair_mask(InstanceType::Mesh, false), PairMask::GI_PROBE | PairMask::LIGHTMAP);
    assert!(pair_mask(InstanceType::Mesh, true).contains(PairMask::LIGHT | PairMask::DECAL | PairMask::REFLECTION_PROBE));
    assert!(pair_mask(InstanceType::Particles, false).contains(PairMask::PARTICLES_COLLISION));
    assert!(!pair_mask(InstanceType::Mesh, true).contains(PairMask::PARTICLES_COLLISION));
    assert_eq!(pair_mask(InstanceType::Light, false), PairMask::GI_PROBE);
    assert_eq!(pair_mask(InstanceType::Decal, false), PairMask::empty());
    assert_eq!(pair_mask(InstanceType::GiProbe, false), PairMask::GEOMETRY | PairMask::LIGHT);
    assert_eq!(pair_mask(InstanceType::ParticlesCollision, true), PairMask::PARTICLES);
}

// ============================================================================
// Pair lifecycle
// ============================================================================

#[test]
fn test_overlapping_light_pairs_with_mesh() {
    let mut f = Fixture::new();
    let mesh = f.mesh_at(Vec3::ZERO);
    let light = f.omni_light_at(Vec3::new(2.0, 0.0, 0.0), 2.0, false);
    let far = f.mesh_at(Vec3::new(20.0, 0.0, 0.0));
    f.flush();

    assert!(paired(&f, mesh, light));
    assert!(!paired(&f, far, light));
    let light_data = f.cull.instance(light).unwrap().light().unwrap();
    assert!(light_data.geometries.contains(&mesh));
    assert!(f.cull.instance(mesh).unwrap().geometry().unwrap().lights.contains(&light));
}

#[test]
fn test_moving_apart_unpairs() {
    let mut f = Fixture::new();
    let mesh = f.mesh_at(Vec3::ZERO);
    let light = f.omni_light_at(Vec3::ZERO, 1.0, false);
    f.flush();
    assert!(paired(&f, mesh, light));

    f.cull.instance_set_transform(mesh, Mat4::from_translation(Vec3::new(10.0, 0.0, 0.0)));
    f.flush();
    assert!(!paired(&f, mesh, light));

    f.cull.instance_set_transform(light, Mat4::from_translation(Vec3::new(10.0, 0.5, 0.0)));
    f.flush();
    assert!(paired(&f, mesh, light));
}

#[test]
fn test_removing_from_scenario_clears_partner() {
    let mut f = Fixture::new();
    let mesh = f.mesh_at(Vec3::ZERO);
    let light = f.omni_light_at(Vec3::ZERO, 1.0, false);
    f.flush();

    f.cull.instance_set_scenario(mesh, None);
    f.cull.check_consistency();
    assert_eq!(f.cull.instance(light).unwrap().pair_count(), 0);
    assert_eq!(f.cull.instance(light).unwrap().light().unwrap().geometries.len(), 0);
}

#[test]
fn test_resweep_keeps_pairs() {
    let mut f = Fixture::new();
    let mesh = f.mesh_at(Vec3::ZERO);
    let light = f.omni_light_at(Vec3::ZERO, 1.0, false);
    let decal = f.volume_at(InstanceType::Decal, Vec3::ZERO, 1.0);
    f.flush();
    let version = f.cull.instance(mesh).unwrap().version();

    f.cull.reset_stats();
    f.cull.pair_instance(mesh);
    f.cull.pair_instance(mesh);
    f.cull.pair_instance(light);
    f.cull.check_consistency();

    assert_eq!(f.cull.stats().pairs_created, 0);
    assert_eq!(f.cull.stats().pairs_removed, 0);
    assert_eq!(f.cull.instance(mesh).unwrap().version(), version);
    assert!(paired(&f, mesh, light));
    assert!(paired(&f, mesh, decal));
}

#[test]
fn test_pair_and_unpair_bump_versions_once() {
    let mut f = Fixture::new();
    let mesh = f.mesh_at(Vec3::ZERO);
    let probe = f.probe_at(Vec3::ZERO, 2.0, ProbeInfo::default());
    f.flush();
    assert!(paired(&f, mesh, probe));

    let mesh_version = f.cull.instance(mesh).unwrap().version();
    let probe_version = f.cull.instance(probe).unwrap().version();

    f.cull.instance_set_transform(mesh, Mat4::from_translation(Vec3::new(10.0, 0.0, 0.0)));
    assert_eq!(f.cull.instance(mesh).unwrap().version(), mesh_version);
    f.flush();

    assert!(!paired(&f, mesh, probe));
    assert_eq!(f.cull.instance(mesh).unwrap().version(), mesh_version + 1);
    assert_eq!(f.cull.instance(probe).unwrap().version(), probe_version + 1);
}

#[test]
fn test_volumes_to_mesh_disabled() {
    let mut f = Fixture::with_config(CullConfig { pair_volumes_to_mesh: false, ..Default::default() });
    let mesh = f.mesh_at(Vec3::ZERO);
    let light = f.omni_light_at(Vec3::ZERO, 1.0, false);
    let decal = f.volume_at(InstanceType::Decal, Vec3::ZERO, 1.0);
    let gi = f.volume_at(InstanceType::GiProbe, Vec3::ZERO, 4.0);
    f.flush();

    assert!(!paired(&f, mesh, light));
    assert!(!paired(&f, mesh, decal));
    assert!(paired(&f, mesh, gi));
    assert!(paired(&f, light, gi));
}

#[test]
fn test_particles_collision_pairs_with_particles_only() {
    let mut f = Fixture::new();
    let particles = f.spawn(BaseInfo::geometry(InstanceType::Particles, box_at(Vec3::ZERO, 1.0)), Mat4::IDENTITY);
    let mesh = f.mesh_at(Vec3::ZERO);
    let collider = f.volume_at(InstanceType::ParticlesCollision, Vec3::ZERO, 2.0);
    f.flush();

    assert!(paired(&f, particles, collider));
    assert!(!paired(&f, mesh, collider));
    assert!(f.cull.instance(particles).unwrap().geometry().unwrap().particle_colliders.contains(&collider));
}

// ============================================================================
// Side effects
// ============================================================================

#[test]
fn test_light_pair_marks_geometry_and_shadow_dirty() {
    let mut f = Fixture::new();
    let light = f.omni_light_at(Vec3::ZERO, 1.0, true);
    f.flush();
    if let InstancePayload::Light(data) = &mut f.cull.instances[light].payload {
        data.shadow_dirty = false;
    }

    let mesh = f.mesh_at(Vec3::ZERO);
    f.flush();
    assert!(paired(&f, mesh, light));
    assert!(array_flags(&f, mesh).contains(InstanceFlags::GEOM_LIGHTING_DIRTY));
    assert!(f.cull.instance(light).unwrap().light().unwrap().is_shadow_dirty());
}

#[test]
fn test_probe_pair_marks_probe_dirty() {
    let mut f = Fixture::new();
    let probe = f.probe_at(Vec3::ZERO, 2.0, ProbeInfo::default());
    f.flush();
    let slot = f.cull.instance(probe).unwrap().array_index().unwrap();
    f.cull.scenarios[f.scenario].instance_data[slot].flags.remove(InstanceFlags::REFLECTION_PROBE_DIRTY);

    let mesh = f.mesh_at(Vec3::ZERO);
    f.flush();
    assert!(array_flags(&f, probe).contains(InstanceFlags::REFLECTION_PROBE_DIRTY));
    assert!(array_flags(&f, mesh).contains(InstanceFlags::GEOM_REFLECTION_DIRTY));
}

#[test]
fn test_gi_probe_queued_on_pair() {
    let mut f = Fixture::new();
    let gi = f.volume_at(InstanceType::GiProbe, Vec3::ZERO, 5.0);
    f.flush();
    assert!(!f.cull.instance(gi).unwrap().gi_probe().unwrap().is_queued());

    let light = f.omni_light_at(Vec3::ZERO, 1.0, false);
    let mesh = f.mesh_at(Vec3::ONE);
    f.flush();

    let data = f.cull.instance(gi).unwrap().gi_probe().unwrap();
    assert!(data.is_queued());
    assert!(data.lights.contains(&light));
    assert!(data.geometries.contains(&mesh));
    assert_eq!(f.cull.gi_probe_queue, vec![gi]);
    assert!(array_flags(&f, mesh).contains(InstanceFlags::GEOM_GI_PROBE_DIRTY));
}

#[test]
fn test_lightmap_capture_picks_smallest() {
    let mut f = Fixture::new();
    let big = f.volume_at(InstanceType::Lightmap, Vec3::ZERO, 10.0);
    let small = f.volume_at(InstanceType::Lightmap, Vec3::ZERO, 2.0);
    let mesh = f.mesh_at(Vec3::ZERO);
    f.flush();

    let captured = |f: &Fixture| f.cull.instance(mesh).unwrap().geometry().unwrap().captured_lightmap();
    assert_eq!(captured(&f), Some(small));
    assert!(array_flags(&f, mesh).contains(InstanceFlags::LIGHTMAP_CAPTURE));

    f.cull.instance_set_transform(mesh, Mat4::from_translation(Vec3::new(5.0, 0.0, 0.0)));
    f.flush();
    assert!(!paired(&f, mesh, small));
    assert_eq!(captured(&f), Some(big));

    f.cull.instance_set_transform(mesh, Mat4::from_translation(Vec3::new(50.0, 0.0, 0.0)));
    f.flush();
    assert_eq!(captured(&f), None);
    assert!(!array_flags(&f, mesh).contains(InstanceFlags::LIGHTMAP_CAPTURE));
}

#[test]
fn test_stats_count_pairs() {
    let mut f = Fixture::new();
    let mesh = f.mesh_at(Vec3::ZERO);
    f.omni_light_at(Vec3::ZERO, 1.0, false);
    f.volume_at(InstanceType::Decal, Vec3::ZERO, 1.0);
    f.flush();
    assert_eq!(f.cull.stats().pairs_created, 2);

    f.cull.instance_set_scenario(mesh, None);
    assert_eq!(f.cull.stats().pairs_removed, 2);
}

// ============================================================================
// Directional lights
// ============================================================================

#[test]
fn test_directional_light_pairs_with_all_geometry() {
    let mut f = Fixture::new();
    let near = f.mesh_at(Vec3::ZERO);
    let sun = f.sun(LightInfo::default());
    let far = f.mesh_at(Vec3::new(500.0, 0.0, -300.0));
    f.flush();

    assert!(paired(&f, near, sun));
    assert!(paired(&f, far, sun));

    let late = f.mesh_at(Vec3::new(-40.0, 9.0, 0.0));
    f.flush();
    assert!(paired(&f, late, sun));
    assert_eq!(f.cull.instance(sun).unwrap().pair_count(), 3);

    f.cull.instance_set_visible(sun, false);
    f.cull.check_consistency();
    assert_eq!(f.cull.instance(near).unwrap().pair_count(), 0);
}

#[test]
fn test_directional_light_ignores_volumes_to_mesh_off() {
    let mut f = Fixture::with_config(CullConfig { pair_volumes_to_mesh: false, ..Default::default() });
    let mesh = f.mesh_at(Vec3::ZERO);
    let sun = f.sun(LightInfo::default());
    let gi = f.volume_at(InstanceType::GiProbe, Vec3::new(30.0, 0.0, 0.0), 1.0);
    f.flush();

    assert!(!paired(&f, mesh, sun));
    assert!(paired(&f, gi, sun));
}
