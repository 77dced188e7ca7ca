/// RenderView: a camera resolved for one frame.
///
/// Built by `Camera::resolve()` (scene cameras) or by the culler itself
/// (probe faces, shadow faces). Holds everything the cull pass and the
/// rendering backend need: transform, projection, frustum and depth range.
///
/// Ephemeral: lives for one frame.

use glam::{Mat4, Vec3};
use super::frustum::Frustum;

#[derive(Debug, Clone)]
pub struct RenderView {
    transform: Mat4,
    projection: Mat4,
    frustum: Frustum,
    znear: f32,
    zfar: f32,
    orthogonal: bool,
    visible_layers: u32,
}

impl RenderView {
    pub(crate) fn new(
        transform: Mat4,
        projection: Mat4,
        frustum: Frustum,
        znear: f32,
        zfar: f32,
        orthogonal: bool,
        visible_layers: u32,
    ) -> Self {
        Self { transform, projection, frustum, znear, zfar, orthogonal, visible_layers }
    }

    /// Build a view from a camera-to-world transform and projection.
    pub fn from_projection(transform: Mat4, projection: Mat4, znear: f32, zfar: f32) -> Self {
        let frustum = Frustum::from_view_projection(&(projection * transform.inverse()));
        Self::new(transform, projection, frustum, znear, zfar, false, 0xFFFF_FFFF)
    }

    /// Camera-to-world transform.
    pub fn transform(&self) -> &Mat4 {
        &self.transform
    }

    /// View matrix (inverse of the camera's world transform).
    pub fn view_matrix(&self) -> Mat4 {
        self.transform.inverse()
    }

    pub fn projection_matrix(&self) -> &Mat4 {
        &self.projection
    }

    /// Combined view-projection matrix (projection * view).
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection * self.view_matrix()
    }

    pub fn frustum(&self) -> &Frustum {
        &self.frustum
    }

    pub fn znear(&self) -> f32 {
        self.znear
    }

    pub fn zfar(&self) -> f32 {
        self.zfar
    }

    pub fn is_orthogonal(&self) -> bool {
        self.orthogonal
    }

    pub fn visible_layers(&self) -> u32 {
        self.visible_layers
    }

    pub fn position(&self) -> Vec3 {
        self.transform.col(3).truncate()
    }

    /// Unit view direction (-Z of the camera transform).
    pub fn forward(&self) -> Vec3 {
        -self.transform.col(2).truncate().normalize_or_zero()
    }

    /// Depth of a world point along the view direction.
    pub fn depth_of(&self, point: Vec3) -> f32 {
        (point - self.position()).dot(self.forward())
    }
}

#[cfg(test)]
#[path = "render_view_tests.rs"]
mod tests;
