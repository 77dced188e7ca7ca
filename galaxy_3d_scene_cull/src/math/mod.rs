//! Bounding volume primitives shared by the index, the culler and the registry.
//!
//! Vectors, matrices and planes come from `glam`.

mod aabb;

pub use aabb::{AABB, InstanceBounds};
