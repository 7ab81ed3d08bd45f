//! # Graphics Resources Builder
//!
//! Creates the window, the wgpu surface and the device, and hands them back
//! to the event loop as an [`AppEvent`].
//!
//! The main components are:
//! - `Graphics`: Holds the window and the wgpu handles
//! - `GraphicsBuilder`: Builds `Graphics` once the event loop is active
//! - `MaybeGraphics`: Represents the various states of graphics initialization

use std::sync::Arc;

use wgpu::{Device, Queue, Surface, SurfaceConfiguration};
use winit::{
    event_loop::{ActiveEventLoop, EventLoopProxy},
    window::Window,
};

use super::AppEvent;
use crate::engine_state::rendering::RenderError;

/// Initial window size in logical pixels.
const INITIAL_WINDOW_SIZE: winit::dpi::LogicalSize<f64> = winit::dpi::LogicalSize::new(1024.0, 768.0);

/// Everything the engine needs from the platform to start drawing.
pub struct Graphics {
    pub window: Arc<Window>,
    pub surface: Surface<'static>,
    pub surface_config: SurfaceConfiguration,
    pub device: Device,
    pub queue: Queue,
}

/// Creates the window and initializes the wgpu device for it.
///
/// # Arguments
/// * `event_loop` - The active event loop used to create the window
/// * `title` - Initial window title
///
/// # Errors
/// Any failure along the way is fatal for the demo and reported as a
/// [`RenderError`].
async fn create_graphics(event_loop: &ActiveEventLoop, title: &str) -> Result<Graphics, RenderError> {
    let window_attrs = Window::default_attributes()
        .with_title(title)
        .with_inner_size(INITIAL_WINDOW_SIZE);
    let window = Arc::new(event_loop.create_window(window_attrs)?);

    // Backends::PRIMARY => Vulkan + Metal + DX12
    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::PRIMARY,
        flags: wgpu::InstanceFlags::empty(),
        backend_options: wgpu::BackendOptions::from_env_or_default(),
    });

    let surface = instance.create_surface(window.clone())?;

    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        })
        .await?;
    log::info!("Using adapter {:?}", adapter.get_info().name);

    let (device, queue) = adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some("cube_batch_device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            memory_hints: wgpu::MemoryHints::MemoryUsage,
            trace: wgpu::Trace::Off,
        })
        .await?;

    let size = window.inner_size();
    let surface_caps = surface.get_capabilities(&adapter);
    let surface_format = surface_caps
        .formats
        .iter()
        .find(|f| f.is_srgb())
        .copied()
        .or_else(|| surface_caps.formats.first().copied())
        .ok_or(RenderError::SurfaceUnsupported)?;

    let surface_config = wgpu::SurfaceConfiguration {
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        format: surface_format,
        width: size.width.max(1),
        height: size.height.max(1),
        present_mode: wgpu::PresentMode::AutoVsync,
        alpha_mode: surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto),
        view_formats: vec![],
        desired_maximum_frame_latency: 2,
    };
    surface.configure(&device, &surface_config);

    Ok(Graphics {
        window,
        surface,
        surface_config,
        device,
        queue,
    })
}

/// Builds [`Graphics`] once and posts the outcome to the event loop.
pub struct GraphicsBuilder {
    event_loop_proxy: Option<EventLoopProxy<AppEvent>>,
    title: String,
}

/// Represents the possible states of the graphics initialization process.
pub enum MaybeGraphics {
    /// Waiting for the event loop to resume
    Builder(GraphicsBuilder),

    /// State after graphics resources have been moved into the engine
    Moved,
}

impl GraphicsBuilder {
    /// Creates a new GraphicsBuilder.
    ///
    /// # Arguments
    /// * `event_loop_proxy` - Used to send the initialized graphics resources back to the event loop
    /// * `title` - Initial window title
    pub fn new(event_loop_proxy: EventLoopProxy<AppEvent>, title: impl Into<String>) -> Self {
        Self {
            event_loop_proxy: Some(event_loop_proxy),
            title: title.into(),
        }
    }

    /// Creates the graphics resources and sends them to the event loop.
    ///
    /// Does nothing on every call after the first.
    pub fn build_and_send(&mut self, event_loop: &ActiveEventLoop) {
        let Some(event_loop_proxy) = self.event_loop_proxy.take() else {
            return;
        };

        let event = match pollster::block_on(create_graphics(event_loop, &self.title)) {
            Ok(graphics) => AppEvent::GraphicsReady(Box::new(graphics)),
            Err(error) => AppEvent::GraphicsFailed(error),
        };
        if event_loop_proxy.send_event(event).is_err() {
            log::error!("Event loop closed before graphics were ready");
        }
    }
}
