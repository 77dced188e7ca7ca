/// Spatial queries for game code (picking, area tests).
///
/// Each query flushes the dirty pass first so it sees the latest
/// transforms, then searches both partitions of the scenario. Only
/// instances with an attached object id are reported. Not meant for
/// per-frame use.

use glam::{Vec3, Vec4};
use crate::index::IndexQuery;
use crate::math::AABB;
use crate::engine_warn;
use super::scene_cull::{SceneCull, SOURCE};
use super::{ObjectId, ScenarioKey};

impl SceneCull {
    /// Objects whose bounds overlap `aabb`.
    pub fn instances_cull_aabb(&mut self, aabb: &AABB, scenario: ScenarioKey) -> Vec<ObjectId> {
        self.query_objects(&IndexQuery::Aabb(*aabb), scenario, "instances_cull_aabb")
    }

    /// Objects whose bounds are crossed by the segment `from -> to`.
    pub fn instances_cull_ray(&mut self, from: Vec3, to: Vec3, scenario: ScenarioKey) -> Vec<ObjectId> {
        self.query_objects(&IndexQuery::Segment { from, to }, scenario, "instances_cull_ray")
    }

    /// Objects whose bounds touch the convex region bounded by inward-facing
    /// `planes` (`xyz` normal, `w` offset).
    pub fn instances_cull_convex(&mut self, planes: &[Vec4], scenario: ScenarioKey) -> Vec<ObjectId> {
        if planes.is_empty() {
            return Vec::new();
        }
        self.query_objects(&IndexQuery::Convex(planes), scenario, "instances_cull_convex")
    }

    fn query_objects(&mut self, query: &IndexQuery<'_>, scenario: ScenarioKey, op: &str) -> Vec<ObjectId> {
        self.update_dirty_instances();

        let Some(sc) = self.scenarios.get(scenario) else {
            engine_warn!(SOURCE, "{}: invalid scenario {:?}", op, scenario);
            return Vec::new();
        };

        let mut objects = Vec::new();
        for indexer in &sc.indexers {
            indexer.query(query, &mut |key| {
                let Some(inst) = self.instances.get(key) else {
                    return;
                };
                // The index may report fattened hits
                if !query.overlaps(&inst.world_aabb) {
                    return;
                }
                if let Some(object) = inst.object_id {
                    objects.push(object);
                }
            });
        }
        objects.sort_unstable();
        objects.dedup();
        objects
    }
}

#[cfg(test)]
#[path = "query_tests.rs"]
mod tests;
