use glam::Vec3;
use slotmap::SlotMap;
use crate::config::CullConfig;
use crate::math::AABB;
use super::*;

fn make_keys(count: usize) -> Vec<InstanceKey> {
    let mut sm = SlotMap::<InstanceKey, ()>::with_key();
    (0..count).map(|_| sm.insert(())).collect()
}

fn scenario() -> Scenario {
    Scenario::new("main".to_string(), &CullConfig::default().index_kind)
}

fn entry(key: InstanceKey, x: f32) -> (InstanceBounds, InstanceData) {
    let aabb = AABB { min: Vec3::new(x, 0.0, 0.0), max: Vec3::new(x + 1.0, 1.0, 1.0) };
    (
        InstanceBounds::from_aabb(&aabb),
        InstanceData {
            flags: InstanceFlags::empty(),
            layer_mask: 1,
            base_type: InstanceType::Mesh,
            instance: key,
            visibility_range: None,
        },
    )
}

#[test]
fn test_new_scenario_is_empty() {
    let s = scenario();
    assert_eq!(s.name(), "main");
    assert_eq!(s.attached_count(), 0);
    assert!(s.indexer(INDEXER_GEOMETRY).is_empty());
    assert!(s.indexer(INDEXER_VOLUMES).is_empty());
    assert_eq!(s.debug_mode(), DebugMode::Disabled);
    assert_eq!(s.reflection_atlas(), (256, 8));
}

#[test]
fn test_indexer_partition_by_type() {
    assert_eq!(Scenario::indexer_for(InstanceType::Mesh), INDEXER_GEOMETRY);
    assert_eq!(Scenario::indexer_for(InstanceType::Particles), INDEXER_GEOMETRY);
    assert_eq!(Scenario::indexer_for(InstanceType::Light), INDEXER_VOLUMES);
    assert_eq!(Scenario::indexer_for(InstanceType::Lightmap), INDEXER_VOLUMES);
}

#[test]
fn test_swap_remove_reports_moved_entry() {
    let keys = make_keys(3);
    let mut s = scenario();
    for (i, &key) in keys.iter().enumerate() {
        let (bounds, data) = entry(key, i as f32 * 2.0);
        assert_eq!(s.push_entry(bounds, data), i);
    }

    assert_eq!(s.swap_remove_entry(0), Some(keys[2]));
    assert_eq!(s.attached_count(), 2);
    assert_eq!(s.instance_data()[0].instance, keys[2]);
    assert_eq!(s.instance_aabbs()[0].bounds[0], 4.0);

    // Removing the tail moves nothing
    assert_eq!(s.swap_remove_entry(1), None);
    assert_eq!(s.attached_count(), 1);
}

#[test]
fn test_directional_list_has_no_duplicates() {
    let keys = make_keys(2);
    let mut s = scenario();
    s.add_directional_light(keys[0]);
    s.add_directional_light(keys[0]);
    s.add_directional_light(keys[1]);
    assert_eq!(s.directional_lights(), &[keys[0], keys[1]]);

    s.remove_directional_light(keys[0]);
    assert_eq!(s.directional_lights(), &[keys[1]]);
}
