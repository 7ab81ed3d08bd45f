//! # Task System Core Traits
//!
//! This module defines the two halves of a unit of background work.
//!
//! ## Core Components
//! - `Task`: work that runs on a worker thread and owns everything it reads
//! - `TaskResult`: the owned output of a task, applied on the render thread
//!
//! ## Task Lifecycle
//! 1. A `Task` is created and scheduled via `TaskManager::publish_task()`
//! 2. The task's `process()` method is called on a worker thread
//! 3. The task returns a boxed `TaskResult`
//! 4. The result's `handle_result()` is called on the render thread with the
//!    render-thread state and the graphics device
//! 5. The result can spawn follow-up tasks
//!
//! ## Thread Safety
//! - `Task` and `TaskResult` must be `Send`; ownership moves across the channel
//! - Only `handle_result()` may touch GPU resources

use crate::engine_state::gpu::GraphicsDevice;

/// A unit of work that is executed on a background worker.
///
/// Tasks should be self-contained and own all the data they need. They never
/// receive the graphics device.
///
/// `S` is the render-thread state the matching result is applied to.
pub trait Task<S>: Send {
    /// Processes the task and returns a result.
    ///
    /// # Returns
    /// A boxed `TaskResult` that will be handled on the render thread.
    /// Failures are reported through the result, not by panicking.
    fn process(&self) -> Box<dyn TaskResult<S> + Send>;
}

/// The result of processing a `Task`.
pub trait TaskResult<S>: Send {
    /// Applies the result on the render thread.
    ///
    /// # Arguments
    /// * `state` - Render-thread state owned by the caller of
    ///   `TaskManager::process_completed_tasks`
    /// * `device` - The graphics device, for creating and releasing buffers
    ///
    /// # Returns
    /// Follow-up tasks to publish (usually empty).
    fn handle_result(
        self: Box<Self>,
        state: &mut S,
        device: &mut dyn GraphicsDevice,
    ) -> Vec<Box<dyn Task<S> + Send>>;
}
