#![warn(rustdoc::missing_crate_level_docs)]
#![warn(rustdoc::invalid_rust_codeblocks)]

//! # Cube Batch
//!
//! Renders an N×N×N grid of lit, textured cubes and lets the user switch
//! between four ways of storing and feeding the vertex data:
//!
//! * separate client-side arrays
//! * one interleaved client-side array
//! * separate vertex buffer objects
//! * one interleaved vertex buffer object
//!
//! ## Key Modules
//!
//! * `application_state` - Window, input, status display and the event loop handler
//! * `config` - Demo configuration loaded from JSON
//! * `core` - Small shared primitives
//! * `engine_state` - Geometry, buffer layouts, regeneration and rendering
//!
//! ## Architecture
//!
//! Geometry for a new cube count is generated on a background worker. The
//! render thread installs finished results between frames, releasing the
//! previous layout before building the new one, and draws the active layout
//! through the [`GraphicsDevice`](engine_state::gpu::GraphicsDevice) seam.
//!
//! ## Usage
//!
//! ```no_run
//! fn main() {
//!     if let Err(error) = cube_batch::run() {
//!         eprintln!("{}", error);
//!     }
//! }
//! ```

use thiserror::Error;
use winit::event_loop::EventLoop;

use application_state::{AppEvent, ApplicationState};
use config::{ConfigError, DemoConfig};

pub mod application_state;
pub mod config;
pub mod core;
pub mod engine_state;

/// Errors that stop the demo before or while the event loop runs.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("event loop failed: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
}

/// Initializes logging, loads the configuration and runs the event loop
/// until the window is closed.
///
/// # Errors
/// A [`RunError`] if the configuration is invalid or the event loop cannot
/// be created.
pub fn run() -> Result<(), RunError> {
    let mut log_builder = env_logger::Builder::new();
    log_builder
        .target(env_logger::Target::Stdout)
        .parse_env("RUST_LOG")
        .init();

    log::info!("Logger initialized");

    let config = DemoConfig::load()?;
    log::info!(
        "Starting with {} cubes, {}, {}",
        config.cube_factor,
        config.settings().storage,
        config.settings().stride
    );

    let event_loop = EventLoop::<AppEvent>::with_user_event().build()?;
    let mut state = ApplicationState::new(config, event_loop.create_proxy());

    event_loop.run_app(&mut state)?;
    Ok(())
}
