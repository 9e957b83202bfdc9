//! Rendering primitives
//!
//! Camera types feeding the visibility pass.

pub mod camera;

pub use camera::{Camera, SphericalCamera, ViewCamera};
