//! # Application State Management
//!
//! This module handles the application's state management, including:
//! - Window and graphics initialization
//! - Input handling and the key bindings
//! - Status display in the window title
//! - Application lifecycle events

pub mod graphics_resources_builder;
pub mod input_manager;
pub mod input_state;

use std::sync::Arc;

use graphics_resources_builder::{Graphics, GraphicsBuilder, MaybeGraphics};
use input_manager::InputManager;

use winit::{
    application::ApplicationHandler,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoopProxy},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use crate::config::DemoConfig;
use crate::core::DragAccumulator;
use crate::engine_state::buffer_layout::{StorageMode, StrideMode};
use crate::engine_state::geometry::CubeFactor;
use crate::engine_state::regeneration::{StatusEvent, StatusSink};
use crate::engine_state::rendering::RenderError;
use crate::engine_state::EngineState;

/// Events posted to the event loop from outside `window_event`.
pub enum AppEvent {
    /// The window and device are ready
    GraphicsReady(Box<Graphics>),
    /// Graphics initialization failed; the demo cannot run
    GraphicsFailed(RenderError),
    /// A status change from the regeneration pipeline
    Status(StatusEvent),
}

impl StatusSink for EventLoopProxy<AppEvent> {
    fn publish(&self, event: StatusEvent) {
        if self.send_event(AppEvent::Status(event)).is_err() {
            log::debug!("Event loop closed, dropping {:?}", event);
        }
    }
}

/// What the window title shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleStatus {
    base: String,
    storage: Option<StorageMode>,
    stride: Option<StrideMode>,
    cube_factor: Option<CubeFactor>,
    message: Option<String>,
}

impl TitleStatus {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            storage: None,
            stride: None,
            cube_factor: None,
            message: None,
        }
    }

    /// Folds a status event into the title.
    ///
    /// A failure message stays until the next successful install reports
    /// its cube count.
    pub fn apply(&mut self, event: StatusEvent) {
        match event {
            StatusEvent::StorageMode(mode) => self.storage = Some(mode),
            StatusEvent::StrideMode(mode) => self.stride = Some(mode),
            StatusEvent::CubeCount(factor) => {
                self.cube_factor = Some(factor);
                self.message = None;
            }
            StatusEvent::GenerationFailed { .. } => self.message = Some(event.to_string()),
        }
    }

    pub fn title(&self) -> String {
        let mut parts = vec![self.base.clone()];
        if let Some(storage) = self.storage {
            parts.push(storage.to_string());
        }
        if let Some(stride) = self.stride {
            parts.push(stride.to_string());
        }
        if let Some(factor) = self.cube_factor {
            parts.push(format!("{} cubes", factor));
        }
        if let Some(message) = &self.message {
            parts.push(message.clone());
        }
        parts.join(" | ")
    }
}

/// The main application state container that manages the application's lifecycle.
pub struct ApplicationState {
    /// Graphics waiting to be built, or already moved into the engine
    pub graphics: MaybeGraphics,

    /// The initialized application state, once graphics are ready
    pub state: Option<InitializedApplicationState>,

    config: DemoConfig,
    event_loop_proxy: EventLoopProxy<AppEvent>,
    title_status: TitleStatus,
}

/// Represents the fully initialized and running state of the application.
pub struct InitializedApplicationState {
    /// Surface, device and frame loop
    pub engine_state: EngineState,

    /// Handle to the application window
    pub window: Arc<Window>,

    /// Manages input state and event processing
    pub input_manager: InputManager,
}

impl ApplicationState {
    /// Creates the application; graphics are built on the first resume.
    pub fn new(config: DemoConfig, event_loop_proxy: EventLoopProxy<AppEvent>) -> Self {
        let title_status = TitleStatus::new(config.window_title.clone());
        Self {
            graphics: MaybeGraphics::Builder(GraphicsBuilder::new(
                event_loop_proxy.clone(),
                config.window_title.clone(),
            )),
            state: None,
            config,
            event_loop_proxy,
            title_status,
        }
    }

    /// Starts the engine with freshly built graphics.
    fn initialize_application_state(&mut self, event_loop: &ActiveEventLoop, graphics: Graphics) {
        let drag = Arc::new(DragAccumulator::new());
        let Graphics {
            window,
            surface,
            surface_config,
            device,
            queue,
        } = graphics;

        match EngineState::new(
            surface,
            surface_config,
            device,
            queue,
            &self.config,
            Box::new(self.event_loop_proxy.clone()),
            drag.clone(),
        ) {
            Ok(engine_state) => {
                self.state = Some(InitializedApplicationState {
                    engine_state,
                    window,
                    input_manager: InputManager::new(drag),
                });
                self.graphics = MaybeGraphics::Moved;
            }
            Err(error) => {
                log::error!("Failed to start renderer: {}", error);
                event_loop.exit();
            }
        }
    }

    fn shut_down(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(state) = &mut self.state {
            state.engine_state.teardown();
        }
        event_loop.exit();
    }
}

impl ApplicationHandler<AppEvent> for ApplicationState {
    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        let Some(state) = &mut self.state else {
            if matches!(event, WindowEvent::CloseRequested) {
                event_loop.exit();
            }
            return;
        };

        state
            .input_manager
            .intake_input(&event, state.window.scale_factor());

        match event {
            WindowEvent::Resized(size) => {
                state.engine_state.resize_surface(size);
            }
            WindowEvent::Focused(false) => {
                state.input_manager.reset_inputs();
            }
            WindowEvent::RedrawRequested => {
                if let Err(error) = state.engine_state.render() {
                    log::error!("Rendering failed: {}", error);
                    self.shut_down(event_loop);
                }
            }
            WindowEvent::CloseRequested
            | WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state: ElementState::Pressed,
                        physical_key: PhysicalKey::Code(KeyCode::Escape),
                        ..
                    },
                ..
            } => self.shut_down(event_loop),
            _ => (),
        }
    }

    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if let MaybeGraphics::Builder(builder) = &mut self.graphics {
            builder.build_and_send(event_loop);
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: AppEvent) {
        match event {
            AppEvent::GraphicsReady(graphics) => {
                self.initialize_application_state(event_loop, *graphics);
            }
            AppEvent::GraphicsFailed(error) => {
                log::error!("Failed to initialize graphics: {}", error);
                event_loop.exit();
            }
            AppEvent::Status(status) => {
                match status {
                    StatusEvent::GenerationFailed { .. } => log::error!("{}", status),
                    _ => log::info!("{}", status),
                }
                self.title_status.apply(status);
                if let Some(state) = &self.state {
                    state.window.set_title(&self.title_status.title());
                }
            }
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(state) = &mut self.state {
            let processed_input = state.input_manager.get_and_reset_processed_input();
            for command in processed_input.commands() {
                state.engine_state.handle_command(command);
            }
            state.window.request_redraw();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(state) = &mut self.state {
            state.engine_state.teardown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::regeneration::FailurePhase;

    fn factor(n: u32) -> CubeFactor {
        CubeFactor::new(n).unwrap()
    }

    #[test]
    fn title_collects_status() {
        let mut status = TitleStatus::new("Cube Batch");
        assert_eq!(status.title(), "Cube Batch");

        status.apply(StatusEvent::StorageMode(StorageMode::Vbo));
        status.apply(StatusEvent::StrideMode(StrideMode::Interleaved));
        status.apply(StatusEvent::CubeCount(factor(3)));

        assert_eq!(
            status.title(),
            "Cube Batch | Using VBOs | Using stride | 3x3x3 cubes"
        );
    }

    #[test]
    fn failure_message_clears_on_next_install() {
        let mut status = TitleStatus::new("Cube Batch");
        status.apply(StatusEvent::CubeCount(factor(2)));
        status.apply(StatusEvent::GenerationFailed {
            phase: FailurePhase::Compute,
            cube_factor: factor(16),
        });
        assert!(status.title().ends_with("OOM generating 16x16x16 cubes"));

        status.apply(StatusEvent::CubeCount(factor(3)));
        assert_eq!(status.title(), "Cube Batch | 3x3x3 cubes");
    }
}
