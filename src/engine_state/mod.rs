//! # Engine State Module
//!
//! Everything between the window and the GPU for the cube grid demo.
//!
//! ## Key Components
//!
//! * `EngineState` - Owns the surface, the wgpu device and the frame loop
//! * `geometry` - Generates the cube grid vertex arrays
//! * `gpu` - Vertex-array style device interface, wgpu and recording implementations
//! * `buffer_layout` - The four ways of storing and feeding the vertex data
//! * `regeneration` - Background generation and render-thread install
//! * `task_management` - Worker threads and result hand-off
//! * `camera_state` - View, projection and drag rotation
//! * `rendering` - Frame loop and wgpu render pipelines
//!
//! ## Frame
//!
//! Each redraw runs [`CubeRenderer::draw_frame`] against the [`WgpuDevice`],
//! which records the draw, then hands the recording to the
//! [`PipelineManager`] to encode and present.

use std::sync::Arc;

use wgpu::{Device, Queue, Surface, SurfaceConfiguration};

use crate::config::DemoConfig;
use crate::core::DragAccumulator;

pub mod buffer_layout;
pub mod camera_state;
pub mod geometry;
pub mod gpu;
pub mod regeneration;
pub mod rendering;
pub mod task_management;

use gpu::WgpuDevice;
use regeneration::StatusSink;
use rendering::{CubeRenderer, PipelineManager, RenderError};

/// How often frame statistics are logged.
const FRAME_STATS_INTERVAL: web_time::Duration = web_time::Duration::from_secs(5);

/// Requests the user can make from the keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserCommand {
    IncreaseCubeCount,
    DecreaseCubeCount,
    ToggleStorage,
    ToggleStride,
}

/// Counts frames between periodic log lines.
struct FrameStats {
    window_start: web_time::Instant,
    frames: u32,
}

impl FrameStats {
    fn new() -> Self {
        Self {
            window_start: web_time::Instant::now(),
            frames: 0,
        }
    }

    fn record_frame(&mut self, cubes: Option<usize>) {
        self.frames += 1;
        let elapsed = self.window_start.elapsed();
        if elapsed >= FRAME_STATS_INTERVAL {
            log::debug!(
                "{:.1} fps drawing {} cubes",
                self.frames as f32 / elapsed.as_secs_f32(),
                cubes.unwrap_or(0)
            );
            self.window_start = web_time::Instant::now();
            self.frames = 0;
        }
    }
}

/// The main state container for the running demo.
///
/// # Examples
///
/// ```ignore
/// let mut engine_state = EngineState::new(surface, surface_config, device, queue, &config, sink, drag)?;
///
/// // Per redraw
/// engine_state.render()?;
/// ```
pub struct EngineState {
    /// The surface being rendered to
    pub surface: Surface<'static>,
    /// Configuration for the surface (size, format, etc.)
    pub surface_config: SurfaceConfiguration,
    /// Device the layouts draw through
    pub gpu: WgpuDevice,
    /// Frame loop and regeneration pipeline
    pub renderer: CubeRenderer,
    /// Render pipelines and render pass
    pub pipeline_manager: PipelineManager,
    frame_stats: FrameStats,
}

impl EngineState {
    /// Creates the engine and requests the first cube grid.
    ///
    /// # Arguments
    /// * `surface` - The configured rendering surface
    /// * `surface_config` - Configuration for the rendering surface
    /// * `device` - The GPU device
    /// * `queue` - The GPU command queue
    /// * `config` - Demo configuration
    /// * `sink` - Receives status events
    /// * `drag` - Drag deltas written by input handling
    ///
    /// # Errors
    /// `RenderError` if the shader fails to compile or the worker thread
    /// cannot be started.
    pub fn new(
        surface: Surface<'static>,
        surface_config: SurfaceConfiguration,
        device: Device,
        queue: Queue,
        config: &DemoConfig,
        sink: Box<dyn StatusSink>,
        drag: Arc<DragAccumulator>,
    ) -> Result<Self, RenderError> {
        let pipeline_manager = PipelineManager::new(&device, &surface_config)?;
        let mut renderer = CubeRenderer::new(
            config,
            sink,
            drag,
            surface_config.width,
            surface_config.height,
        )?;
        renderer.surface_created();

        Ok(Self {
            surface,
            surface_config,
            gpu: WgpuDevice::new(device, queue),
            renderer,
            pipeline_manager,
            frame_stats: FrameStats::new(),
        })
    }

    /// Resizes the rendering surface when the window size changes.
    ///
    /// Zero-sized surfaces (minimised windows) are ignored.
    pub fn resize_surface(&mut self, size: winit::dpi::PhysicalSize<u32>) {
        if size.width == 0 || size.height == 0 {
            return;
        }

        self.surface_config.width = size.width;
        self.surface_config.height = size.height;
        self.surface.configure(self.gpu.device(), &self.surface_config);

        self.renderer.surface_changed(size.width, size.height);
        self.pipeline_manager
            .resize(self.gpu.device(), &self.surface_config);
    }

    /// Runs one frame and presents it.
    ///
    /// A lost or outdated surface is reconfigured and the frame skipped.
    ///
    /// # Errors
    /// `RenderError::Surface` for any other surface failure.
    pub fn render(&mut self) -> Result<(), RenderError> {
        let uniforms = self.renderer.draw_frame(&mut self.gpu);
        let frame = self.gpu.take_frame();

        match self
            .pipeline_manager
            .render(&self.surface, &self.gpu, frame, &uniforms)
        {
            Ok(()) => {}
            Err(RenderError::Surface(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated)) => {
                log::warn!("Surface lost or outdated, reconfiguring");
                self.surface.configure(self.gpu.device(), &self.surface_config);
            }
            Err(RenderError::Surface(wgpu::SurfaceError::Timeout)) => {
                log::warn!("Timed out acquiring surface texture");
            }
            Err(error) => return Err(error),
        }

        self.frame_stats
            .record_frame(self.renderer.pipeline.actual_factor().map(|f| f.cube_count()));
        Ok(())
    }

    /// Applies a user request to the regeneration pipeline.
    pub fn handle_command(&mut self, command: UserCommand) {
        let pipeline = &mut self.renderer.pipeline;
        match command {
            UserCommand::IncreaseCubeCount => {
                if !pipeline.increase_cube_count() {
                    log::info!("Already at the maximum cube count");
                }
            }
            UserCommand::DecreaseCubeCount => {
                if !pipeline.decrease_cube_count() {
                    log::info!("Already at the minimum cube count");
                }
            }
            UserCommand::ToggleStorage => pipeline.toggle_storage(),
            UserCommand::ToggleStride => pipeline.toggle_stride(),
        }
    }

    /// Releases the active layout before the device goes away.
    pub fn teardown(&mut self) {
        self.renderer.teardown(&mut self.gpu);
    }
}
