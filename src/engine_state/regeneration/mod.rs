//! # Regeneration Pipeline
//!
//! Rebuilds the cube grid when the user changes the cube count or one of the
//! layout modes. Each request runs in two phases:
//!
//! 1. **compute**: a [`CubeGenerationTask`] generates the vertex arrays on
//!    the single background worker. Requests queue behind each other and are
//!    computed one at a time, in order.
//! 2. **install**: on the render thread, the finished arrays are handed over
//!    by value. The active layout is released first, then the new one is
//!    built from the settings current at that moment plus the request's
//!    toggles.
//!
//! The render thread never waits for the worker. At most one install happens
//! per [`RegenerationPipeline::process_completed`] call, and the frame loop
//! calls it before drawing, so a frame always draws a whole layout.
//!
//! Out-of-memory in either phase becomes a [`StatusEvent::GenerationFailed`].
//! A compute failure leaves the active layout alone; an install failure
//! leaves no layout until the next successful request.

pub mod generation_task;
pub mod status;

use crate::engine_state::buffer_layout::{BufferLayout, LayoutSettings};
use crate::engine_state::geometry::{CubeFactor, MemoryBudget};
use crate::engine_state::gpu::GraphicsDevice;
use crate::engine_state::task_management::TaskManager;

pub use generation_task::CubeGenerationTask;
pub use status::{FailurePhase, StatusEvent, StatusSink};

/// Mode changes carried by a regeneration request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegenerationRequest {
    pub toggle_storage: bool,
    pub toggle_stride: bool,
}

/// Slot holding the layout that is currently drawn.
#[derive(Debug, Default)]
pub struct ActiveLayout(Option<BufferLayout>);

impl ActiveLayout {
    /// The active layout, if any.
    pub fn get(&self) -> Option<&BufferLayout> {
        self.0.as_ref()
    }

    /// Releases the active layout, leaving the slot empty.
    pub fn release(&mut self, device: &mut dyn GraphicsDevice) {
        if let Some(layout) = self.0.take() {
            layout.release(device);
        }
    }

    /// Stores a new layout. The slot must have been released first.
    fn install(&mut self, layout: BufferLayout) {
        debug_assert!(self.0.is_none(), "installing over a live layout");
        self.0 = Some(layout);
    }

    /// Draws the active layout. Returns `false` if there is none.
    pub fn render(&self, device: &mut dyn GraphicsDevice) -> bool {
        match &self.0 {
            Some(layout) => {
                layout.render(device);
                true
            }
            None => false,
        }
    }
}

/// Render-thread state that install results are applied to.
pub struct InstallState {
    active: ActiveLayout,
    settings: LayoutSettings,
    actual_factor: Option<CubeFactor>,
    budget: MemoryBudget,
    sink: Box<dyn StatusSink>,
}

/// Request API and install loop for cube grid regeneration.
pub struct RegenerationPipeline {
    task_manager: TaskManager<InstallState>,
    state: InstallState,
    last_requested_factor: CubeFactor,
}

impl RegenerationPipeline {
    /// Creates the pipeline and its worker thread. Nothing is generated until
    /// [`surface_created`](Self::surface_created) or a request is made.
    ///
    /// # Arguments
    /// * `initial_factor` - Cube factor for the first generation
    /// * `settings` - Initial storage and stride modes
    /// * `budget` - Host allocation policy for generation and interleaving
    /// * `sink` - Receives status events
    pub fn new(
        initial_factor: CubeFactor,
        settings: LayoutSettings,
        budget: MemoryBudget,
        sink: Box<dyn StatusSink>,
    ) -> std::io::Result<Self> {
        Ok(Self {
            task_manager: TaskManager::new(1)?,
            state: InstallState {
                active: ActiveLayout::default(),
                settings,
                actual_factor: None,
                budget,
                sink,
            },
            last_requested_factor: initial_factor,
        })
    }

    /// Requests the initial grid at the last requested cube factor.
    pub fn surface_created(&mut self) {
        self.request_regeneration(self.last_requested_factor, RegenerationRequest::default());
    }

    /// Queues a regeneration at `cube_factor`.
    pub fn request_regeneration(&mut self, cube_factor: CubeFactor, request: RegenerationRequest) {
        log::debug!("Requesting {} cubes with {:?}", cube_factor, request);
        self.last_requested_factor = cube_factor;
        self.task_manager.publish_task(Box::new(CubeGenerationTask {
            cube_factor,
            request,
            budget: self.state.budget,
        }));
    }

    /// Requests one more cube per side. Returns `false` at the upper bound.
    pub fn increase_cube_count(&mut self) -> bool {
        match self.last_requested_factor.increased() {
            Some(factor) => {
                self.request_regeneration(factor, RegenerationRequest::default());
                true
            }
            None => false,
        }
    }

    /// Requests one fewer cube per side. Returns `false` at the lower bound.
    pub fn decrease_cube_count(&mut self) -> bool {
        match self.last_requested_factor.decreased() {
            Some(factor) => {
                self.request_regeneration(factor, RegenerationRequest::default());
                true
            }
            None => false,
        }
    }

    /// Requests a regeneration that switches between VBOs and client-side arrays.
    pub fn toggle_storage(&mut self) {
        self.request_regeneration(
            self.last_requested_factor,
            RegenerationRequest {
                toggle_storage: true,
                toggle_stride: false,
            },
        );
    }

    /// Requests a regeneration that switches between separate and interleaved streams.
    pub fn toggle_stride(&mut self) {
        self.request_regeneration(
            self.last_requested_factor,
            RegenerationRequest {
                toggle_storage: false,
                toggle_stride: true,
            },
        );
    }

    /// Installs at most one finished generation. Call on the render thread
    /// before drawing.
    ///
    /// # Returns
    /// `true` if a result was handled, successful or not.
    pub fn process_completed(&mut self, device: &mut dyn GraphicsDevice) -> bool {
        self.task_manager
            .process_completed_tasks(&mut self.state, device, 1)
            > 0
    }

    /// Hands queued requests to the worker once it is free.
    pub fn process_queued(&mut self) {
        self.task_manager.process_queued_tasks();
    }

    /// Whether no request is queued, computing or awaiting install.
    pub fn is_idle(&self) -> bool {
        self.task_manager.is_idle()
    }

    /// Draws the active layout. Returns `false` if there is none.
    pub fn render(&self, device: &mut dyn GraphicsDevice) -> bool {
        self.state.active.render(device)
    }

    /// Releases the active layout, for when the surface goes away.
    pub fn teardown(&mut self, device: &mut dyn GraphicsDevice) {
        self.state.active.release(device);
    }

    /// The layout currently drawn, if any.
    pub fn active_layout(&self) -> Option<&BufferLayout> {
        self.state.active.get()
    }

    /// Storage and stride modes of the last successful install (or the
    /// initial modes before the first one).
    pub fn settings(&self) -> LayoutSettings {
        self.state.settings
    }

    /// Cube factor of the last successful install.
    pub fn actual_factor(&self) -> Option<CubeFactor> {
        self.state.actual_factor
    }

    /// Cube factor of the most recent request.
    pub fn last_requested_factor(&self) -> CubeFactor {
        self.last_requested_factor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::buffer_layout::{StorageMode, StrideMode};
    use crate::engine_state::gpu::RecordingDevice;
    use std::sync::mpsc::{channel, Receiver};
    use std::time::{Duration, Instant};

    fn factor(n: u32) -> CubeFactor {
        CubeFactor::new(n).unwrap()
    }

    fn pipeline(n: u32, budget: MemoryBudget) -> (RegenerationPipeline, Receiver<StatusEvent>) {
        let (sender, receiver) = channel();
        let pipeline =
            RegenerationPipeline::new(factor(n), LayoutSettings::default(), budget, Box::new(sender))
                .unwrap();
        (pipeline, receiver)
    }

    fn settle(pipeline: &mut RegenerationPipeline, device: &mut RecordingDevice) {
        let deadline = Instant::now() + Duration::from_secs(30);
        while !pipeline.is_idle() {
            assert!(Instant::now() < deadline, "regeneration did not settle");
            pipeline.process_completed(device);
            pipeline.process_queued();
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn surface_created_installs_initial_grid() {
        let (mut pipeline, events) = pipeline(3, MemoryBudget::unlimited());
        let mut device = RecordingDevice::new();
        assert!(pipeline.active_layout().is_none());

        pipeline.surface_created();
        settle(&mut pipeline, &mut device);

        let layout = pipeline.active_layout().unwrap();
        assert_eq!(layout.vertex_count(), 36 * 27);
        assert_eq!(layout.settings(), LayoutSettings::default());
        assert_eq!(pipeline.actual_factor(), Some(factor(3)));

        let received: Vec<StatusEvent> = events.try_iter().collect();
        assert_eq!(
            received,
            vec![
                StatusEvent::StorageMode(StorageMode::Vbo),
                StatusEvent::StrideMode(StrideMode::Interleaved),
                StatusEvent::CubeCount(factor(3)),
            ]
        );
    }

    #[test]
    fn cube_count_requests_stop_at_bounds() {
        let (mut pipeline, _events) = pipeline(1, MemoryBudget::unlimited());
        assert!(!pipeline.decrease_cube_count());
        assert_eq!(pipeline.last_requested_factor(), factor(1));
        assert!(pipeline.is_idle());

        let (mut pipeline, _events) = pipeline_at_max();
        assert!(!pipeline.increase_cube_count());
        assert_eq!(pipeline.last_requested_factor(), factor(16));
        assert!(pipeline.is_idle());
    }

    fn pipeline_at_max() -> (RegenerationPipeline, Receiver<StatusEvent>) {
        pipeline(16, MemoryBudget::unlimited())
    }

    #[test]
    fn toggles_apply_to_settings_at_install_time() {
        let (mut pipeline, _events) = pipeline(1, MemoryBudget::unlimited());
        let mut device = RecordingDevice::new();

        pipeline.surface_created();
        pipeline.toggle_storage();
        pipeline.toggle_storage();
        pipeline.toggle_stride();
        settle(&mut pipeline, &mut device);

        assert_eq!(pipeline.settings(), LayoutSettings::from_flags(true, false));
        assert_eq!(
            pipeline.active_layout().map(BufferLayout::settings),
            Some(LayoutSettings::from_flags(true, false))
        );
    }

    #[test]
    fn compute_failure_keeps_active_layout() {
        // Enough for N = 1 arrays, not for N = 4.
        let (mut pipeline, events) = pipeline(1, MemoryBudget::limited(8 * 1024));
        let mut device = RecordingDevice::new();

        pipeline.surface_created();
        settle(&mut pipeline, &mut device);
        events.try_iter().for_each(drop);

        pipeline.request_regeneration(factor(4), RegenerationRequest::default());
        settle(&mut pipeline, &mut device);

        assert_eq!(pipeline.actual_factor(), Some(factor(1)));
        assert_eq!(pipeline.active_layout().unwrap().vertex_count(), 36);
        assert_eq!(device.live_buffer_count(), 1);
        assert_eq!(
            events.try_iter().collect::<Vec<_>>(),
            vec![StatusEvent::GenerationFailed {
                phase: FailurePhase::Compute,
                cube_factor: factor(4),
            }]
        );
    }

    #[test]
    fn install_failure_leaves_slot_empty() {
        let (mut pipeline, events) = pipeline(1, MemoryBudget::unlimited());
        let mut device = RecordingDevice::new();

        pipeline.surface_created();
        settle(&mut pipeline, &mut device);
        events.try_iter().for_each(drop);

        device.set_memory_limit(Some(1024));
        pipeline.increase_cube_count();
        settle(&mut pipeline, &mut device);

        assert!(pipeline.active_layout().is_none());
        assert_eq!(device.live_buffer_count(), 0);
        assert_eq!(pipeline.settings(), LayoutSettings::default());
        assert_eq!(
            events.try_iter().collect::<Vec<_>>(),
            vec![StatusEvent::GenerationFailed {
                phase: FailurePhase::Install,
                cube_factor: factor(2),
            }]
        );

        device.clear_log();
        assert!(!pipeline.render(&mut device));
        assert!(device.draws().is_empty());
    }

    #[test]
    fn teardown_releases_buffers() {
        let (mut pipeline, _events) = pipeline(2, MemoryBudget::unlimited());
        let mut device = RecordingDevice::new();

        pipeline.surface_created();
        pipeline.toggle_stride();
        settle(&mut pipeline, &mut device);
        assert_eq!(device.live_buffer_count(), 3);

        pipeline.teardown(&mut device);
        assert_eq!(device.live_buffer_count(), 0);
        assert!(pipeline.active_layout().is_none());
        assert!(device.violations().is_empty());
    }
}
