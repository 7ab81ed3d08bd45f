//! # Camera State Management
//!
//! Owns the view, the projection and the drag rotation of the cube grid, and
//! turns them into [`FrameUniforms`] once per frame.
//!
//! Drag deltas arrive on the input side through a shared
//! [`DragAccumulator`] and are consumed exactly once per frame in
//! [`CameraState::update`].

use std::sync::Arc;

use crate::core::DragAccumulator;

pub mod camera;

pub use camera::FrameUniforms;

/// Near clip plane distance.
pub const Z_NEAR: f32 = 1.0;
/// Far clip plane distance.
pub const Z_FAR: f32 = 1000.0;

/// Camera, projection and model rotation for the cube grid.
///
/// # Fields
/// - `camera`: Fixed viewpoint
/// - `projection`: Frustum sized to the surface
/// - `rotation`: Rotation accumulated from dragging
/// - `drag`: Deltas written by input handling, read here
pub struct CameraState {
    pub camera: camera::Camera,
    pub projection: camera::Projection,
    pub rotation: camera::ModelRotation,
    drag: Arc<DragAccumulator>,
}

impl CameraState {
    /// Creates the camera state for a surface of the given size.
    ///
    /// # Arguments
    /// * `width`, `height` - Surface size in pixels
    /// * `drag` - Shared with whatever records drag input
    pub fn new(width: u32, height: u32, drag: Arc<DragAccumulator>) -> Self {
        Self {
            camera: camera::Camera::default(),
            projection: camera::Projection::new(width, height, Z_NEAR, Z_FAR),
            rotation: camera::ModelRotation::new(),
            drag,
        }
    }

    /// Adjusts the projection to a new surface size.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.projection.resize(width, height);
    }

    /// Consumes pending drag input and computes this frame's uniforms.
    pub fn update(&mut self) -> FrameUniforms {
        let (delta_x, delta_y) = self.drag.consume();
        self.rotation.apply(delta_x, delta_y);
        FrameUniforms::compute(&self.camera, &self.projection, &self.rotation)
    }
}
