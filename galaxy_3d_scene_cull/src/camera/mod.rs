//! Camera module: scene cameras, frustums, and resolved render views.
//!
//! A `Camera` stores projection parameters. `Camera::resolve()` turns it
//! into a `RenderView` for a given aspect ratio; the culler and the
//! rendering backend only ever see `RenderView`s.

mod camera;
mod frustum;
mod render_view;

pub use camera::{Camera, Projection, off_center_perspective};
pub use frustum::{
    Frustum, FrustumTest, PlaneSign,
    PLANE_LEFT, PLANE_RIGHT, PLANE_BOTTOM, PLANE_TOP, PLANE_NEAR, PLANE_FAR,
};
pub use render_view::RenderView;
