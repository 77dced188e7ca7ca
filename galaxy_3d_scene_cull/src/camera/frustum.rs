/// Frustum: convex set of clipping planes for visibility culling.
///
/// Each plane is represented as a Vec4 (A, B, C, D) where:
/// - (A, B, C) is the inward-pointing normal
/// - D is the signed distance
/// - A point P is inside the frustum if dot(plane, P_homogeneous) >= 0 for all planes
///
/// Alongside the planes, a `PlaneSign` per plane records which corner of an
/// `InstanceBounds` lies furthest along the normal. The culler reads that
/// corner straight out of the packed bounds array without branching.

use glam::{Mat4, Vec3, Vec4};
use crate::math::{AABB, InstanceBounds};

/// Result of a 3-way frustum/AABB classification.
///
/// Used by spatial acceleration structures (OctreeSceneIndex) for
/// efficient hierarchical culling:
/// - `Outside` → skip the entire subtree
/// - `Inside` → collect all objects without further testing
/// - `Partial` → test individual objects and recurse into children
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrustumTest {
    /// AABB is entirely outside the frustum
    Outside,
    /// AABB is entirely inside the frustum
    Inside,
    /// AABB partially overlaps the frustum
    Partial,
}

/// Frustum plane indices (for frustums built from a projection)
pub const PLANE_LEFT: usize = 0;
pub const PLANE_RIGHT: usize = 1;
pub const PLANE_BOTTOM: usize = 2;
pub const PLANE_TOP: usize = 3;
pub const PLANE_NEAR: usize = 4;
pub const PLANE_FAR: usize = 5;

/// Per-plane corner selector into `InstanceBounds::bounds`.
///
/// For axis `a`, `signs[a]` is `3 + a` (the max coordinate) when the plane
/// normal is non-negative on that axis, `a` (the min coordinate) otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaneSign {
    pub signs: [usize; 3],
}

impl PlaneSign {
    pub fn from_plane(plane: &Vec4) -> Self {
        let pick = |axis: usize, n: f32| if n >= 0.0 { 3 + axis } else { axis };
        Self { signs: [pick(0, plane.x), pick(1, plane.y), pick(2, plane.z)] }
    }
}

/// Convex clipping volume.
///
/// Works with perspective and orthographic projections, and with arbitrary
/// convex plane sets (probe faces, external convex queries).
#[derive(Debug, Clone, Default)]
pub struct Frustum {
    planes: Vec<Vec4>,
    plane_signs: Vec<PlaneSign>,
}

impl Frustum {
    /// Extract frustum planes from a view-projection matrix.
    ///
    /// Uses the Gribb & Hartmann method. glam projections map depth to
    /// [0, 1], so the near plane is row 2 alone.
    pub fn from_view_projection(vp: &Mat4) -> Self {
        let m = vp.to_cols_array_2d();

        let planes = vec![
            // Left:   row3 + row0
            Vec4::new(m[0][3] + m[0][0], m[1][3] + m[1][0], m[2][3] + m[2][0], m[3][3] + m[3][0]),
            // Right:  row3 - row0
            Vec4::new(m[0][3] - m[0][0], m[1][3] - m[1][0], m[2][3] - m[2][0], m[3][3] - m[3][0]),
            // Bottom: row3 + row1
            Vec4::new(m[0][3] + m[0][1], m[1][3] + m[1][1], m[2][3] + m[2][1], m[3][3] + m[3][1]),
            // Top:    row3 - row1
            Vec4::new(m[0][3] - m[0][1], m[1][3] - m[1][1], m[2][3] - m[2][1], m[3][3] - m[3][1]),
            // Near:   row2
            Vec4::new(m[0][2], m[1][2], m[2][2], m[3][2]),
            // Far:    row3 - row2
            Vec4::new(m[0][3] - m[0][2], m[1][3] - m[1][2], m[2][3] - m[2][2], m[3][3] - m[3][2]),
        ];

        Self::from_planes(planes)
    }

    /// Build from arbitrary inward-facing planes. Planes are normalized.
    pub fn from_planes(mut planes: Vec<Vec4>) -> Self {
        for plane in &mut planes {
            let normal_len = plane.truncate().length();
            if normal_len > 0.0 {
                *plane /= normal_len;
            }
        }
        let plane_signs = planes.iter().map(PlaneSign::from_plane).collect();
        Self { planes, plane_signs }
    }

    /// The six faces of an AABB as an inward-facing plane set.
    pub fn from_aabb(aabb: &AABB) -> Self {
        Self::from_planes(vec![
            Vec4::new(1.0, 0.0, 0.0, -aabb.min.x),
            Vec4::new(-1.0, 0.0, 0.0, aabb.max.x),
            Vec4::new(0.0, 1.0, 0.0, -aabb.min.y),
            Vec4::new(0.0, -1.0, 0.0, aabb.max.y),
            Vec4::new(0.0, 0.0, 1.0, -aabb.min.z),
            Vec4::new(0.0, 0.0, -1.0, aabb.max.z),
        ])
    }

    pub fn planes(&self) -> &[Vec4] {
        &self.planes
    }

    pub fn plane_signs(&self) -> &[PlaneSign] {
        &self.plane_signs
    }

    /// Fast conservative test over packed bounds.
    ///
    /// For each plane the sign-selected corner is the one furthest along the
    /// normal. If even that corner is behind the plane, the whole box is.
    #[inline]
    pub fn intersects_bounds(&self, bounds: &InstanceBounds) -> bool {
        let b = &bounds.bounds;
        for (plane, sign) in self.planes.iter().zip(&self.plane_signs) {
            let [sx, sy, sz] = sign.signs;
            let dist = plane.x * b[sx] + plane.y * b[sy] + plane.z * b[sz] + plane.w;
            if dist < 0.0 {
                return false;
            }
        }
        true
    }

    /// Test if an AABB intersects this frustum.
    ///
    /// Uses the "positive vertex" test: for each plane, find the AABB corner
    /// most in the direction of the plane normal. If that corner is outside,
    /// the AABB is fully outside.
    ///
    /// Returns `true` if the AABB is (potentially) inside or intersecting.
    /// May return false positives (conservative), never false negatives.
    pub fn intersects_aabb(&self, aabb: &AABB) -> bool {
        aabb.intersects_convex(&self.planes)
    }

    /// Classify an AABB against the frustum (3-way test).
    ///
    /// - If the p-vertex is outside any plane → `Outside` (early out)
    /// - If the n-vertex is outside any plane → at least `Partial`
    /// - If all n-vertices are inside all planes → `Inside`
    pub fn classify_aabb(&self, aabb: &AABB) -> FrustumTest {
        let mut all_inside = true;

        for plane in &self.planes {
            let normal = plane.truncate();
            let positive = normal.cmpge(Vec3::ZERO);

            let p_vertex = Vec3::select(positive, aabb.max, aabb.min);
            if normal.dot(p_vertex) + plane.w < 0.0 {
                return FrustumTest::Outside;
            }

            let n_vertex = Vec3::select(positive, aabb.min, aabb.max);
            if normal.dot(n_vertex) + plane.w < 0.0 {
                all_inside = false;
            }
        }

        if all_inside { FrustumTest::Inside } else { FrustumTest::Partial }
    }

    /// Signed distance of a point to plane `index` (positive = inside).
    pub fn distance_to_plane(&self, index: usize, point: Vec3) -> f32 {
        let plane = self.planes[index];
        plane.truncate().dot(point) + plane.w
    }
}

#[cfg(test)]
#[path = "frustum_tests.rs"]
mod tests;
