//! The background half of a regeneration request.

use crate::engine_state::buffer_layout::BufferLayout;
use crate::engine_state::geometry::{
    generate_cube_grid, CubeFactor, CubeGeometry, GeometryError, MemoryBudget,
};
use crate::engine_state::gpu::GraphicsDevice;
use crate::engine_state::task_management::task::{Task, TaskResult};

use super::status::{FailurePhase, StatusEvent};
use super::{InstallState, RegenerationRequest};

/// Generates the vertex arrays for one request on the worker thread.
pub struct CubeGenerationTask {
    pub cube_factor: CubeFactor,
    pub request: RegenerationRequest,
    pub budget: MemoryBudget,
}

impl Task<InstallState> for CubeGenerationTask {
    fn process(&self) -> Box<dyn TaskResult<InstallState> + Send> {
        log::debug!("Generating {} cubes", self.cube_factor);
        Box::new(CubeGenerationResult {
            cube_factor: self.cube_factor,
            request: self.request,
            geometry: generate_cube_grid(self.cube_factor, &self.budget),
        })
    }
}

/// Finished vertex arrays, or the reason they could not be built.
pub struct CubeGenerationResult {
    cube_factor: CubeFactor,
    request: RegenerationRequest,
    geometry: Result<CubeGeometry, GeometryError>,
}

impl TaskResult<InstallState> for CubeGenerationResult {
    /// Installs the generated geometry as the active layout.
    ///
    /// The previous layout is released before the new one is built. Mode
    /// toggles are applied to the settings current at this point, and the
    /// settings only change if the build succeeds.
    fn handle_result(
        self: Box<Self>,
        state: &mut InstallState,
        device: &mut dyn GraphicsDevice,
    ) -> Vec<Box<dyn Task<InstallState> + Send>> {
        let CubeGenerationResult {
            cube_factor,
            request,
            geometry,
        } = *self;

        let geometry = match geometry {
            Ok(geometry) => geometry,
            Err(error) => {
                log::error!("Failed to generate {} cubes: {}", cube_factor, error);
                state.sink.publish(StatusEvent::GenerationFailed {
                    phase: FailurePhase::Compute,
                    cube_factor,
                });
                return Vec::new();
            }
        };

        state.active.release(device);

        let settings = state
            .settings
            .with_toggles(request.toggle_storage, request.toggle_stride);

        match BufferLayout::build(geometry, settings, device, &state.budget) {
            Ok(layout) => {
                log::info!("Installed {} layout with {} cubes", layout.name(), cube_factor);
                state.active.install(layout);
                state.settings = settings;
                state.actual_factor = Some(cube_factor);
                state.sink.publish(StatusEvent::StorageMode(settings.storage));
                state.sink.publish(StatusEvent::StrideMode(settings.stride));
                state.sink.publish(StatusEvent::CubeCount(cube_factor));
            }
            Err(error) => {
                log::error!("Failed to install {} cubes: {}", cube_factor, error);
                state.sink.publish(StatusEvent::GenerationFailed {
                    phase: FailurePhase::Install,
                    cube_factor,
                });
            }
        }

        Vec::new()
    }
}
