/// Pairing: broad-phase bookkeeping of which volumes affect which geometry.
///
/// A sweep for instance A:
/// 1. query the partitions its pair mask needs, marking every overlapping
///    candidate of a matching type with the current epoch;
/// 2. walk A's existing pairs: unmarked partners are unpaired, marked ones
///    are kept (and unmarked again so step 3 skips them);
/// 3. pair with every candidate still carrying the epoch.
///
/// Masks are symmetric (if A's mask names B's type, B's names A's), so a
/// sweep from either side converges to the same set of pairs.

use crate::index::IndexQuery;
use super::instance::{InstanceFlags, InstancePayload, InstanceType, PairMask};
use super::scenario::{INDEXER_GEOMETRY, INDEXER_VOLUMES};
use super::scene_cull::SceneCull;
use super::InstanceKey;
use rustc_hash::FxHashSet;

/// Types an instance of `base_type` pairs with.
///
/// `pair_volumes_to_mesh` makes lights, decals and reflection probes pair
/// directly with geometry.
pub(crate) fn pair_mask(base_type: InstanceType, pair_volumes_to_mesh: bool) -> PairMask {
    match base_type {
        InstanceType::None => PairMask::empty(),
        InstanceType::Mesh | InstanceType::MultiMesh | InstanceType::Particles => {
            let mut mask = PairMask::GI_PROBE | PairMask::LIGHTMAP;
            if base_type == InstanceType::Particles {
                mask |= PairMask::PARTICLES_COLLISION;
            }
            if pair_volumes_to_mesh {
                mask |= PairMask::LIGHT | PairMask::DECAL | PairMask::REFLECTION_PROBE;
            }
            mask
        }
        InstanceType::Light => {
            let mut mask = PairMask::GI_PROBE;
            if pair_volumes_to_mesh {
                mask |= PairMask::GEOMETRY;
            }
            mask
        }
        InstanceType::Decal | InstanceType::ReflectionProbe => {
            if pair_volumes_to_mesh { PairMask::GEOMETRY } else { PairMask::empty() }
        }
        InstanceType::GiProbe => PairMask::GEOMETRY | PairMask::LIGHT,
        InstanceType::Lightmap => PairMask::GEOMETRY,
        InstanceType::ParticlesCollision => PairMask::PARTICLES,
    }
}

fn set_member(set: &mut FxHashSet<InstanceKey>, key: InstanceKey, present: bool) {
    if present {
        set.insert(key);
    } else {
        set.remove(&key);
    }
}

/// Follow-ups of a pair change that need `&mut SceneCull`.
#[derive(Default)]
struct PairEffects {
    geometry_flags: Option<(InstanceKey, InstanceFlags)>,
    probe_dirty: Option<InstanceKey>,
    queue_gi_probe: Option<InstanceKey>,
    recapture: Option<InstanceKey>,
}

impl SceneCull {
    /// Run a pairing sweep for `instance` against its scenario.
    pub(crate) fn pair_instance(&mut self, instance: InstanceKey) {
        let Some(inst) = self.instances.get(instance) else {
            return;
        };
        let Some(scenario_key) = inst.scenario else {
            return;
        };
        let mask = pair_mask(inst.base_type, self.config.pair_volumes_to_mesh);
        if mask.is_empty() && inst.pairs.is_empty() {
            return;
        }

        self.pair_pass += 1;
        let pass = self.pair_pass;
        let aabb = inst.world_aabb;
        let unbounded = inst.is_directional_light();
        let mut found = Vec::new();

        if let Some(scenario) = self.scenarios.get(scenario_key) {
            let instances = &mut self.instances;
            let mut visit = |other: InstanceKey| {
                if other == instance {
                    return;
                }
                let Some(candidate) = instances.get_mut(other) else {
                    return;
                };
                if !mask.intersects(candidate.base_type.pair_bit()) || candidate.pair_check == pass {
                    return;
                }
                let directional = candidate.is_directional_light();
                if !unbounded && !directional && !candidate.world_aabb.intersects(&aabb) {
                    return;
                }
                candidate.pair_check = pass;
                found.push(other);
            };

            if unbounded {
                for data in &scenario.instance_data {
                    visit(data.instance);
                }
            } else {
                let query = IndexQuery::Aabb(aabb);
                if mask.intersects(PairMask::GEOMETRY) {
                    scenario.indexers[INDEXER_GEOMETRY].query(&query, &mut visit);
                }
                if mask.intersects(!PairMask::GEOMETRY) {
                    scenario.indexers[INDEXER_VOLUMES].query(&query, &mut visit);
                }
            }
            if mask.contains(PairMask::LIGHT) {
                for &light in &scenario.directional_lights {
                    visit(light);
                }
            }
        }

        let existing: Vec<InstanceKey> = self
            .instances
            .get(instance)
            .map(|i| i.pairs.iter().copied().collect())
            .unwrap_or_default();
        for other in existing {
            match self.instances.get_mut(other) {
                Some(partner) if partner.pair_check == pass => partner.pair_check = 0,
                _ => self.unpair(instance, other),
            }
        }

        for other in found {
            if self.instances.get(other).is_some_and(|i| i.pair_check == pass) {
                self.pair(instance, other);
            }
        }
    }

    pub(crate) fn pair(&mut self, a: InstanceKey, b: InstanceKey) {
        self.set_paired(a, b, true);
    }

    pub(crate) fn unpair(&mut self, a: InstanceKey, b: InstanceKey) {
        self.set_paired(a, b, false);
    }

    /// Unpair `instance` from every partner.
    pub(crate) fn unpair_all(&mut self, instance: InstanceKey) {
        let partners: Vec<InstanceKey> = match self.instances.get(instance) {
            Some(inst) => inst.pairs.iter().copied().collect(),
            None => return,
        };
        for other in partners {
            self.unpair(instance, other);
        }
    }

    fn set_paired(&mut self, a: InstanceKey, b: InstanceKey, paired: bool) {
        let Some([first, second]) = self.instances.get_disjoint_mut([a, b]) else {
            return;
        };
        let changed = if paired { first.pairs.insert(b) } else { first.pairs.remove(&b) };
        if !changed {
            return;
        }
        if paired {
            second.pairs.insert(a);
            self.stats.pairs_created += 1;
        } else {
            second.pairs.remove(&a);
            self.stats.pairs_removed += 1;
        }
        first.version += 1;
        second.version += 1;

        // Put the geometry side first
        let ((gk, g), (vk, v)) = if second.base_type.is_geometry() && !first.base_type.is_geometry() {
            ((b, second), (a, first))
        } else {
            ((a, first), (b, second))
        };

        let mut effects = PairEffects::default();
        match (&mut g.payload, &mut v.payload) {
            (InstancePayload::Geometry(geom), InstancePayload::Light(light)) => {
                set_member(&mut geom.lights, vk, paired);
                set_member(&mut light.geometries, gk, paired);
                if geom.can_cast_shadows {
                    light.shadow_dirty = true;
                }
                effects.geometry_flags = Some((gk, InstanceFlags::GEOM_LIGHTING_DIRTY));
            }
            (InstancePayload::Geometry(geom), InstancePayload::ReflectionProbe(probe)) => {
                set_member(&mut geom.reflection_probes, vk, paired);
                set_member(&mut probe.geometries, gk, paired);
                effects.geometry_flags = Some((gk, InstanceFlags::GEOM_REFLECTION_DIRTY));
                effects.probe_dirty = Some(vk);
            }
            (InstancePayload::Geometry(geom), InstancePayload::Decal(decal)) => {
                set_member(&mut geom.decals, vk, paired);
                set_member(&mut decal.geometries, gk, paired);
                effects.geometry_flags = Some((gk, InstanceFlags::GEOM_DECAL_DIRTY));
            }
            (InstancePayload::Geometry(geom), InstancePayload::GiProbe(probe)) => {
                set_member(&mut geom.gi_probes, vk, paired);
                set_member(&mut probe.geometries, gk, paired);
                effects.geometry_flags = Some((gk, InstanceFlags::GEOM_GI_PROBE_DIRTY));
                effects.queue_gi_probe = Some(vk);
            }
            (InstancePayload::Geometry(geom), InstancePayload::Lightmap(lightmap)) => {
                set_member(&mut geom.lightmap_captures, vk, paired);
                set_member(&mut lightmap.geometries, gk, paired);
                effects.recapture = Some(gk);
            }
            (InstancePayload::Geometry(geom), InstancePayload::ParticlesCollision(collision)) => {
                set_member(&mut geom.particle_colliders, vk, paired);
                set_member(&mut collision.particles, gk, paired);
            }
            (InstancePayload::Light(light), InstancePayload::GiProbe(probe)) => {
                set_member(&mut light.gi_probes, vk, paired);
                set_member(&mut probe.lights, gk, paired);
                effects.queue_gi_probe = Some(vk);
            }
            (InstancePayload::GiProbe(probe), InstancePayload::Light(light)) => {
                set_member(&mut light.gi_probes, gk, paired);
                set_member(&mut probe.lights, vk, paired);
                effects.queue_gi_probe = Some(gk);
            }
            _ => debug_assert!(false, "no pair kind for {:?} / {:?}", g.base_type, v.base_type),
        }

        if let Some((key, flags)) = effects.geometry_flags {
            self.mark_array_flags(key, flags);
        }
        if let Some(probe) = effects.probe_dirty {
            self.mark_array_flags(probe, InstanceFlags::REFLECTION_PROBE_DIRTY);
        }
        if let Some(probe) = effects.queue_gi_probe {
            self.queue_gi_probe(probe);
        }
        if let Some(geometry) = effects.recapture {
            self.update_lightmap_capture(geometry);
        }
    }

    pub(crate) fn queue_gi_probe(&mut self, probe: InstanceKey) {
        if let Some(InstancePayload::GiProbe(data)) = self.instances.get_mut(probe).map(|i| &mut i.payload) {
            if !data.queued {
                data.queued = true;
                self.gi_probe_queue.push(probe);
            }
        }
    }

    /// Pick the smallest paired lightmap containing the geometry's center.
    pub(crate) fn update_lightmap_capture(&mut self, geometry: InstanceKey) {
        let Some(inst) = self.instances.get(geometry) else {
            return;
        };
        let Some(geom) = inst.geometry() else {
            return;
        };
        let center = inst.world_aabb.center();
        let best = geom
            .lightmap_captures
            .iter()
            .filter_map(|&key| self.instances.get(key).map(|lm| (key, lm.world_aabb)))
            .filter(|(_, aabb)| aabb.contains_point(center))
            .min_by(|(ka, a), (kb, b)| {
                let (va, vb) = (a.size().x * a.size().y * a.size().z, b.size().x * b.size().y * b.size().z);
                va.total_cmp(&vb).then(ka.cmp(kb))
            })
            .map(|(key, _)| key);

        if let Some(InstancePayload::Geometry(geom)) = self.instances.get_mut(geometry).map(|i| &mut i.payload) {
            geom.captured_lightmap = best;
        }
        self.refresh_array_entry(geometry);
    }
}

#[cfg(test)]
#[path = "pairing_tests.rs"]
mod tests;
