/// Axis-aligned bounding boxes and the packed bounds cached per scenario.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3, Vec4};

// ===== AABB =====

/// Axis-Aligned Bounding Box.
///
/// Base resources report their bounds in local space; the dirty pass
/// transforms them with the instance transform to get world bounds.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AABB {
    /// Minimum corner (x, y, z)
    pub min: Vec3,
    /// Maximum corner (x, y, z)
    pub max: Vec3,
}

impl AABB {
    /// Build from two corners (any order).
    pub fn from_corners(a: Vec3, b: Vec3) -> Self {
        Self { min: a.min(b), max: a.max(b) }
    }

    /// Build from a center and half extents.
    pub fn from_center_half_extents(center: Vec3, half: Vec3) -> Self {
        Self { min: center - half, max: center + half }
    }

    /// Center point of this AABB.
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Full size along each axis.
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Whether the box has no volume on some axis.
    pub fn has_no_volume(&self) -> bool {
        let size = self.size();
        size.x <= 0.0 || size.y <= 0.0 || size.z <= 0.0
    }

    /// Surface area, the cost metric of the dynamic BVH.
    pub fn surface_area(&self) -> f32 {
        let d = self.size().max(Vec3::ZERO);
        2.0 * (d.x * d.y + d.y * d.z + d.z * d.x)
    }

    /// Smallest AABB enclosing both boxes.
    pub fn merge(&self, other: &AABB) -> AABB {
        AABB { min: self.min.min(other.min), max: self.max.max(other.max) }
    }

    /// This AABB grown by `margin` on every side.
    pub fn grown(&self, margin: f32) -> AABB {
        AABB { min: self.min - Vec3::splat(margin), max: self.max + Vec3::splat(margin) }
    }

    /// Transform this AABB by a matrix, returning a new AABB.
    ///
    /// Uses the Arvo method: projects each matrix axis onto the AABB extents
    /// for an exact (tight) result without transforming all 8 corners.
    pub fn transformed(&self, matrix: &Mat4) -> AABB {
        let translation = matrix.col(3).truncate();
        let mut new_min = translation;
        let mut new_max = translation;

        for i in 0..3 {
            let axis = matrix.col(i).truncate();
            let a = axis * self.min[i];
            let b = axis * self.max[i];
            new_min += a.min(b);
            new_max += a.max(b);
        }

        AABB { min: new_min, max: new_max }
    }

    /// Test if this AABB fully contains another AABB.
    pub fn contains(&self, other: &AABB) -> bool {
        self.min.x <= other.min.x && self.max.x >= other.max.x
        && self.min.y <= other.min.y && self.max.y >= other.max.y
        && self.min.z <= other.min.z && self.max.z >= other.max.z
    }

    /// Test if a point lies inside or on the surface of this AABB.
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// Test if this AABB intersects (overlaps or touches) another AABB.
    pub fn intersects(&self, other: &AABB) -> bool {
        self.min.x <= other.max.x && self.max.x >= other.min.x
        && self.min.y <= other.max.y && self.max.y >= other.min.y
        && self.min.z <= other.max.z && self.max.z >= other.min.z
    }

    /// Slab test against the segment `from -> to`.
    pub fn intersects_segment(&self, from: Vec3, to: Vec3) -> bool {
        let dir = to - from;
        let mut t_min = 0.0f32;
        let mut t_max = 1.0f32;

        for axis in 0..3 {
            if dir[axis].abs() < f32::EPSILON {
                if from[axis] < self.min[axis] || from[axis] > self.max[axis] {
                    return false;
                }
                continue;
            }
            let inv = 1.0 / dir[axis];
            let mut t0 = (self.min[axis] - from[axis]) * inv;
            let mut t1 = (self.max[axis] - from[axis]) * inv;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            t_min = t_min.max(t0);
            t_max = t_max.min(t1);
            if t_min > t_max {
                return false;
            }
        }

        true
    }

    /// Conservative test against a convex volume given as inward-facing planes.
    ///
    /// Rejects only when the box lies entirely behind one plane.
    pub fn intersects_convex(&self, planes: &[Vec4]) -> bool {
        planes.iter().all(|plane| {
            let normal = plane.truncate();
            let p_vertex = Vec3::select(normal.cmpge(Vec3::ZERO), self.max, self.min);
            normal.dot(p_vertex) + plane.w >= 0.0
        })
    }
}

// ===== INSTANCE BOUNDS =====

/// World bounds packed as `[min.x, min.y, min.z, max.x, max.y, max.z]`.
///
/// This is the layout scanned by the culler: one contiguous array per
/// scenario, parallel to the instance metadata array. A `PlaneSign` picks
/// the corner to test by indexing directly into the six floats.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct InstanceBounds {
    pub bounds: [f32; 6],
}

impl InstanceBounds {
    pub fn from_aabb(aabb: &AABB) -> Self {
        Self {
            bounds: [aabb.min.x, aabb.min.y, aabb.min.z, aabb.max.x, aabb.max.y, aabb.max.z],
        }
    }

    pub fn to_aabb(&self) -> AABB {
        let b = &self.bounds;
        AABB { min: Vec3::new(b[0], b[1], b[2]), max: Vec3::new(b[3], b[4], b[5]) }
    }

    /// Inclusive overlap test against an AABB (used for SDFGI regions).
    pub fn in_aabb(&self, aabb: &AABB) -> bool {
        let b = &self.bounds;
        b[0] <= aabb.max.x && b[3] >= aabb.min.x
        && b[1] <= aabb.max.y && b[4] >= aabb.min.y
        && b[2] <= aabb.max.z && b[5] >= aabb.min.z
    }
}

#[cfg(test)]
#[path = "aabb_tests.rs"]
mod tests;
