//! Rendering of the cube grid.
//!
//! [`CubeRenderer`] is the frame loop: it installs finished regenerations,
//! consumes drag input and draws the active layout through any
//! [`GraphicsDevice`]. [`PipelineManager`] turns what was drawn on a
//! [`WgpuDevice`](super::gpu::WgpuDevice) into a wgpu render pass.

pub mod pipeline_manager;
mod texture;

use std::sync::Arc;

use thiserror::Error;

use crate::config::DemoConfig;
use crate::core::DragAccumulator;

use super::camera_state::{CameraState, FrameUniforms};
use super::gpu::GraphicsDevice;
use super::regeneration::{RegenerationPipeline, StatusSink};

pub use pipeline_manager::PipelineManager;

/// Fatal rendering setup and presentation errors.
#[derive(Debug, Error)]
pub enum RenderError {
    /// No adapter is compatible with the window surface.
    #[error("no compatible graphics adapter: {0}")]
    AdapterUnavailable(#[from] wgpu::RequestAdapterError),

    /// The adapter refused to create a device.
    #[error("failed to create graphics device: {0}")]
    DeviceRequest(#[from] wgpu::RequestDeviceError),

    /// The window surface could not be created.
    #[error("failed to create surface: {0}")]
    SurfaceCreation(#[from] wgpu::CreateSurfaceError),

    /// The surface supports no texture format on this adapter.
    #[error("surface is not supported by the adapter")]
    SurfaceUnsupported,

    /// The window could not be created.
    #[error("failed to create window: {0}")]
    WindowCreation(#[from] winit::error::OsError),

    /// The cube shader failed validation.
    #[error("shader compilation failed: {0}")]
    ShaderCompilation(String),

    /// The surface texture could not be acquired.
    #[error("surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),

    /// The background worker could not be started.
    #[error("failed to start geometry worker: {0}")]
    Worker(#[from] std::io::Error),
}

/// Frame loop for the cube grid.
///
/// Follows the surface lifecycle: [`surface_created`](Self::surface_created)
/// once the device exists, [`surface_changed`](Self::surface_changed) on every
/// resize and [`draw_frame`](Self::draw_frame) once per frame.
pub struct CubeRenderer {
    pub pipeline: RegenerationPipeline,
    pub camera_state: CameraState,
}

impl CubeRenderer {
    /// Creates the renderer and its geometry worker.
    ///
    /// # Arguments
    /// * `config` - Initial cube factor, layout modes and memory budget
    /// * `sink` - Receives status events
    /// * `drag` - Written by input handling, consumed once per frame
    /// * `width`, `height` - Initial surface size
    pub fn new(
        config: &DemoConfig,
        sink: Box<dyn StatusSink>,
        drag: Arc<DragAccumulator>,
        width: u32,
        height: u32,
    ) -> Result<Self, RenderError> {
        Ok(Self {
            pipeline: RegenerationPipeline::new(
                config.cube_factor,
                config.settings(),
                config.budget(),
                sink,
            )?,
            camera_state: CameraState::new(width, height, drag),
        })
    }

    /// Requests the initial cube grid.
    pub fn surface_created(&mut self) {
        log::info!(
            "Surface created, generating {} cubes",
            self.pipeline.last_requested_factor()
        );
        self.pipeline.surface_created();
    }

    /// Resizes the projection to the new surface.
    pub fn surface_changed(&mut self, width: u32, height: u32) {
        self.camera_state.resize(width, height);
    }

    /// Runs one frame.
    ///
    /// Installs at most one finished regeneration, consumes the pending drag,
    /// then draws the active layout (nothing, if there is none).
    ///
    /// # Returns
    /// The uniforms the frame was drawn with.
    pub fn draw_frame(&mut self, device: &mut dyn GraphicsDevice) -> FrameUniforms {
        self.pipeline.process_completed(device);
        self.pipeline.process_queued();

        let uniforms = self.camera_state.update();
        self.pipeline.render(device);
        uniforms
    }

    /// Releases the active layout.
    pub fn teardown(&mut self, device: &mut dyn GraphicsDevice) {
        self.pipeline.teardown(device);
    }
}
