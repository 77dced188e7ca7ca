/// Camera: projection parameters and world transform of a scene camera.
///
/// Cameras are owned by `SceneCull` and referenced by `CameraKey`. At render
/// time a camera is resolved into a `RenderView` (matrices + frustum) for the
/// target viewport's aspect ratio.

use glam::{Mat4, Vec2, Vec3};
use crate::scene::ResourceHandle;
use super::frustum::Frustum;
use super::render_view::RenderView;

/// Projection model of a camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    /// Field of view in degrees
    Perspective { fov: f32 },
    /// Height (or width, see `use_vertical_aspect`) of the view volume
    Orthogonal { size: f32 },
    /// Off-center perspective: `size` at the near plane, shifted by `offset`
    Frustum { size: f32, offset: Vec2 },
}

/// Scene camera.
#[derive(Debug, Clone)]
pub struct Camera {
    projection: Projection,
    znear: f32,
    zfar: f32,
    transform: Mat4,
    visible_layers: u32,
    /// When set, `fov` and `size` are measured across the horizontal axis.
    use_vertical_aspect: bool,
    environment: Option<ResourceHandle>,
    effects: Option<ResourceHandle>,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            projection: Projection::Perspective { fov: 75.0 },
            znear: 0.05,
            zfar: 4000.0,
            transform: Mat4::IDENTITY,
            visible_layers: 0xFFFF_FFFF,
            use_vertical_aspect: false,
            environment: None,
            effects: None,
        }
    }
}

impl Camera {
    pub fn new() -> Self {
        Self::default()
    }

    // ===== GETTERS =====

    pub fn projection(&self) -> Projection {
        self.projection
    }

    pub fn znear(&self) -> f32 {
        self.znear
    }

    pub fn zfar(&self) -> f32 {
        self.zfar
    }

    /// Camera-to-world transform.
    pub fn transform(&self) -> &Mat4 {
        &self.transform
    }

    pub fn visible_layers(&self) -> u32 {
        self.visible_layers
    }

    pub fn use_vertical_aspect(&self) -> bool {
        self.use_vertical_aspect
    }

    pub fn environment(&self) -> Option<ResourceHandle> {
        self.environment
    }

    pub fn effects(&self) -> Option<ResourceHandle> {
        self.effects
    }

    // ===== SETTERS =====

    pub fn set_perspective(&mut self, fov_degrees: f32, znear: f32, zfar: f32) {
        self.projection = Projection::Perspective { fov: fov_degrees };
        self.znear = znear;
        self.zfar = zfar;
    }

    pub fn set_orthogonal(&mut self, size: f32, znear: f32, zfar: f32) {
        self.projection = Projection::Orthogonal { size };
        self.znear = znear;
        self.zfar = zfar;
    }

    pub fn set_frustum(&mut self, size: f32, offset: Vec2, znear: f32, zfar: f32) {
        self.projection = Projection::Frustum { size, offset };
        self.znear = znear;
        self.zfar = zfar;
    }

    pub fn set_transform(&mut self, transform: Mat4) {
        self.transform = transform;
    }

    pub fn set_visible_layers(&mut self, layers: u32) {
        self.visible_layers = layers;
    }

    pub fn set_use_vertical_aspect(&mut self, enable: bool) {
        self.use_vertical_aspect = enable;
    }

    pub fn set_environment(&mut self, environment: Option<ResourceHandle>) {
        self.environment = environment;
    }

    pub fn set_effects(&mut self, effects: Option<ResourceHandle>) {
        self.effects = effects;
    }

    // ===== RESOLUTION =====

    /// Projection matrix for the given viewport aspect ratio (width / height).
    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        let aspect = if aspect > 0.0 { aspect } else { 1.0 };
        match self.projection {
            Projection::Perspective { fov } => {
                let mut fovy = fov.to_radians();
                if self.use_vertical_aspect {
                    fovy = 2.0 * ((fovy * 0.5).tan() / aspect).atan();
                }
                Mat4::perspective_rh(fovy, aspect, self.znear, self.zfar)
            }
            Projection::Orthogonal { size } => {
                let (half_w, half_h) = self.half_extents(size, aspect);
                Mat4::orthographic_rh(-half_w, half_w, -half_h, half_h, self.znear, self.zfar)
            }
            Projection::Frustum { size, offset } => {
                let (half_w, half_h) = self.half_extents(size, aspect);
                off_center_perspective(
                    -half_w + offset.x,
                    half_w + offset.x,
                    -half_h + offset.y,
                    half_h + offset.y,
                    self.znear,
                    self.zfar,
                )
            }
        }
    }

    fn half_extents(&self, size: f32, aspect: f32) -> (f32, f32) {
        if self.use_vertical_aspect {
            (size * 0.5, size / aspect * 0.5)
        } else {
            (size * aspect * 0.5, size * 0.5)
        }
    }

    /// Resolve matrices and frustum for one frame.
    pub fn resolve(&self, aspect: f32) -> RenderView {
        let projection = self.projection_matrix(aspect);
        let view = self.transform.inverse();
        let frustum = Frustum::from_view_projection(&(projection * view));
        RenderView::new(
            self.transform,
            projection,
            frustum,
            self.znear,
            self.zfar,
            matches!(self.projection, Projection::Orthogonal { .. }),
            self.visible_layers,
        )
    }

    /// World-space position.
    pub fn position(&self) -> Vec3 {
        self.transform.col(3).truncate()
    }
}

/// Right-handed off-center perspective with depth mapped to [0, 1].
///
/// Bounds are given on the near plane.
pub fn off_center_perspective(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Mat4 {
    let width = right - left;
    let height = top - bottom;
    let depth = near - far;
    Mat4::from_cols_array(&[
        2.0 * near / width, 0.0, 0.0, 0.0,
        0.0, 2.0 * near / height, 0.0, 0.0,
        (right + left) / width, (top + bottom) / height, far / depth, -1.0,
        0.0, 0.0, near * far / depth, 0.0,
    ])
}

#[cfg(test)]
#[path = "camera_tests.rs"]
mod tests;
