use glam::{Mat4, Vec3, Vec4};
use crate::config::CullConfig;
use crate::math::AABB;
use crate::scene::mock_storage::{box_at, Fixture};
use crate::scene::{InstanceKey, ObjectId};

fn tagged_mesh(f: &mut Fixture, position: Vec3, id: u64) -> InstanceKey {
    let mesh = f.mesh_at(position);
    f.cull.instance_attach_object_instance_id(mesh, Some(ObjectId(id)));
    mesh
}

fn ids(values: &[u64]) -> Vec<ObjectId> {
    values.iter().map(|&v| ObjectId(v)).collect()
}

#[test]
fn test_cull_aabb() {
    let mut f = Fixture::new();
    tagged_mesh(&mut f, Vec3::ZERO, 1);
    tagged_mesh(&mut f, Vec3::new(5.0, 0.0, 0.0), 2);
    // No object id: never reported
    f.mesh_at(Vec3::ZERO);

    let s = f.scenario;
    assert_eq!(f.cull.instances_cull_aabb(&box_at(Vec3::ZERO, 1.0), s), ids(&[1]));
    assert_eq!(f.cull.instances_cull_aabb(&box_at(Vec3::ZERO, 10.0), s), ids(&[1, 2]));
    assert!(f.cull.instances_cull_aabb(&box_at(Vec3::new(0.0, 20.0, 0.0), 1.0), s).is_empty());
}

#[test]
fn test_results_are_exact_and_deduplicated() {
    let mut f = Fixture::new();
    tagged_mesh(&mut f, Vec3::ZERO, 7);
    tagged_mesh(&mut f, Vec3::new(0.2, 0.0, 0.0), 7);

    let s = f.scenario;
    assert_eq!(f.cull.instances_cull_aabb(&box_at(Vec3::ZERO, 1.0), s), ids(&[7]));
    // Inside the index margin but outside the real bounds
    let near_miss = AABB { min: Vec3::new(0.75, -1.0, -1.0), max: Vec3::new(1.0, 1.0, 1.0) };
    assert!(f.cull.instances_cull_aabb(&near_miss, s).is_empty());
}

#[test]
fn test_queries_see_pending_moves() {
    let mut f = Fixture::new();
    let mesh = tagged_mesh(&mut f, Vec3::new(50.0, 0.0, 0.0), 3);
    f.flush();
    f.cull.instance_set_transform(mesh, Mat4::IDENTITY);
    assert_eq!(f.cull.instances_cull_aabb(&box_at(Vec3::ZERO, 1.0), f.scenario), ids(&[3]));
    assert_eq!(f.cull.dirty_count(), 0);
}

#[test]
fn test_cull_ray() {
    let mut f = Fixture::new();
    tagged_mesh(&mut f, Vec3::ZERO, 1);
    tagged_mesh(&mut f, Vec3::new(5.0, 0.0, 0.0), 2);
    tagged_mesh(&mut f, Vec3::new(0.0, 5.0, 0.0), 3);

    let s = f.scenario;
    assert_eq!(f.cull.instances_cull_ray(Vec3::new(-10.0, 0.0, 0.0), Vec3::new(10.0, 0.0, 0.0), s), ids(&[1, 2]));
    // Stops short of the mesh at the origin
    assert_eq!(f.cull.instances_cull_ray(Vec3::new(0.0, 10.0, 0.0), Vec3::new(0.0, 2.0, 0.0), s), ids(&[3]));
    assert!(f.cull.instances_cull_ray(Vec3::new(-10.0, 2.0, 0.0), Vec3::new(10.0, 2.0, 0.0), s).is_empty());
}

#[test]
fn test_cull_convex() {
    let mut f = Fixture::new();
    tagged_mesh(&mut f, Vec3::ZERO, 1);
    tagged_mesh(&mut f, Vec3::new(5.0, 0.0, 0.0), 2);
    tagged_mesh(&mut f, Vec3::new(5.0, 5.0, 0.0), 3);

    let s = f.scenario;
    // x >= 3 and y <= 2
    let planes = [Vec4::new(1.0, 0.0, 0.0, -3.0), Vec4::new(0.0, -1.0, 0.0, 2.0)];
    assert_eq!(f.cull.instances_cull_convex(&planes, s), ids(&[2]));
    assert!(f.cull.instances_cull_convex(&[], s).is_empty());
}

#[test]
fn test_volumes_are_searched() {
    let mut f = Fixture::new();
    let light = f.omni_light_at(Vec3::new(0.0, 0.0, 4.0), 1.0, false);
    f.cull.instance_attach_object_instance_id(light, Some(ObjectId(9)));
    tagged_mesh(&mut f, Vec3::ZERO, 1);

    assert_eq!(f.cull.instances_cull_aabb(&box_at(Vec3::ZERO, 10.0), f.scenario), ids(&[1, 9]));
}

#[test]
fn test_hidden_and_foreign_instances_are_skipped() {
    let mut f = Fixture::new();
    let hidden = tagged_mesh(&mut f, Vec3::ZERO, 1);
    f.cull.instance_set_visible(hidden, false);

    let other = f.cull.scenario_create("other").unwrap();
    let foreign = tagged_mesh(&mut f, Vec3::ZERO, 2);
    f.cull.instance_set_scenario(foreign, Some(other));

    let everything = box_at(Vec3::ZERO, 10.0);
    assert!(f.cull.instances_cull_aabb(&everything, f.scenario).is_empty());
    assert_eq!(f.cull.instances_cull_aabb(&everything, other), ids(&[2]));
}

#[test]
fn test_invalid_scenario() {
    let mut f = Fixture::new();
    tagged_mesh(&mut f, Vec3::ZERO, 1);
    let other = f.cull.scenario_create("other").unwrap();
    f.cull.scenario_free(other);

    assert!(f.cull.instances_cull_aabb(&box_at(Vec3::ZERO, 1.0), other).is_empty());
    assert!(f.cull.instances_cull_ray(Vec3::ZERO, Vec3::X, other).is_empty());
    assert!(f.cull.instances_cull_convex(&[Vec4::new(1.0, 0.0, 0.0, 0.0)], other).is_empty());
}

#[test]
fn test_octree_queries() {
    let mut f = Fixture::with_config(CullConfig::with_octree(64.0, 5));
    tagged_mesh(&mut f, Vec3::ZERO, 1);
    tagged_mesh(&mut f, Vec3::new(30.0, 0.0, 0.0), 2);
    // Outside the octree bounds
    tagged_mesh(&mut f, Vec3::new(200.0, 0.0, 0.0), 3);

    let s = f.scenario;
    assert_eq!(f.cull.instances_cull_aabb(&box_at(Vec3::ZERO, 1.0), s), ids(&[1]));
    assert_eq!(f.cull.instances_cull_ray(Vec3::new(-300.0, 0.0, 0.0), Vec3::new(300.0, 0.0, 0.0), s), ids(&[1, 2, 3]));
}
