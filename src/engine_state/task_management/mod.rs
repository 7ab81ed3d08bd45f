//! # Task Management System
//!
//! Runs work on background threads and hands the results back to the render
//! thread, which is the only thread allowed to touch the graphics device.
//!
//! ## Architecture Overview
//!
//! - `TaskManager`: owns the worker threads, the queue of waiting tasks and
//!   the per-worker in-flight counters
//! - `Task`: a unit of work executed on a worker
//! - `TaskResult`: the owned output of a task, applied on the render thread
//! - `TaskChannel`: the pair of channels connecting the manager to one worker
//!
//! ## Task Lifecycle
//! 1. Tasks are published via `TaskManager::publish_task()`
//! 2. The manager sends a task to a worker that has no task in flight, or
//!    queues it (FIFO) when every worker is busy
//! 3. Workers process tasks and send the results back
//! 4. Results are handled on the render thread in `process_completed_tasks()`
//! 5. `process_queued_tasks()` feeds the queue to workers as they free up
//!
//! With a single worker, tasks are processed and their results handled in
//! exactly the order they were published.
//!
//! ## Example Usage
//! ```no_run
//! # use cube_batch::engine_state::task_management::TaskManager;
//! # use cube_batch::engine_state::gpu::RecordingDevice;
//! let mut task_manager = TaskManager::<Vec<u32>>::new(1).expect("worker thread");
//! let mut state = Vec::new();
//! let mut device = RecordingDevice::new();
//!
//! // In the render loop:
//! task_manager.process_completed_tasks(&mut state, &mut device, 1);
//! task_manager.process_queued_tasks();
//! ```

pub mod task;

use std::collections::VecDeque;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::thread::{self, JoinHandle};

use task::{Task, TaskResult};

use super::gpu::GraphicsDevice;

/// A communication channel between the render thread and one worker thread.
///
/// # Fields
/// - `task_sender`: Sends tasks from the render thread to the worker
/// - `result_receiver`: Receives task results from the worker
/// - `num_tasks_in_flight`: Tasks sent whose result has not been handled yet
/// - `_worker`: Handle to the worker thread
///
/// The worker exits when `task_sender` is dropped.
pub struct TaskChannel<S> {
    task_sender: Sender<Box<dyn Task<S> + Send>>,
    result_receiver: Receiver<Box<dyn TaskResult<S> + Send>>,
    num_tasks_in_flight: usize,
    _worker: JoinHandle<()>,
}

/// Manages a pool of worker threads and coordinates task execution.
///
/// # Fields
/// - `channels`: Set of active worker channels
/// - `queued_tasks`: Tasks waiting for an available worker
/// - `current_channel`: Index for round-robin scheduling
///
/// The manager itself is not shared between threads; it lives on the render
/// thread and never blocks on a worker.
pub struct TaskManager<S> {
    channels: Vec<TaskChannel<S>>,
    queued_tasks: VecDeque<Box<dyn Task<S> + Send>>,
    current_channel: usize,
}

/// Maximum number of tasks that can be in flight per worker channel.
///
/// Set to 1 so a busy worker never has a backlog of its own; everything
/// waiting sits in the manager's FIFO queue.
pub const MAX_TASKS_IN_FLIGHT: usize = 1;

impl<S: 'static> TaskManager<S> {
    /// Creates a new `TaskManager` with the specified number of worker threads.
    ///
    /// # Arguments
    /// * `num_workers` - Number of worker threads to create. Use 1 when the
    ///   results must be handled in publication order.
    ///
    /// # Returns
    /// The manager, or the error from spawning a worker thread.
    pub fn new(num_workers: usize) -> std::io::Result<Self> {
        let mut channels = Vec::with_capacity(num_workers);

        for worker_index in 0..num_workers {
            let (task_tx, task_rx) = channel::<Box<dyn Task<S> + Send>>();
            let (result_tx, result_rx) = channel::<Box<dyn TaskResult<S> + Send>>();

            let task_closure = move || {
                while let Ok(task) = task_rx.recv() {
                    let result = task.process();
                    if result_tx.send(result).is_err() {
                        break;
                    }
                }
                log::debug!("Worker {} shutting down", worker_index);
            };

            let worker = thread::Builder::new()
                .name(format!("geometry-worker-{}", worker_index))
                .spawn(task_closure)?;

            channels.push(TaskChannel {
                task_sender: task_tx,
                result_receiver: result_rx,
                num_tasks_in_flight: 0,
                _worker: worker,
            });
        }

        log::info!("Task manager started with {} worker(s)", num_workers);

        Ok(TaskManager {
            channels,
            queued_tasks: VecDeque::new(),
            current_channel: 0,
        })
    }

    /// Attempts to send a task to a specific worker channel.
    ///
    /// # Returns
    /// - `Ok(())` if the task was sent; the in-flight counter is incremented
    /// - `Err(task)` if the worker has disconnected, handing the task back
    fn try_send_task(
        &mut self,
        task: Box<dyn Task<S> + Send>,
        channel_idx: usize,
    ) -> Result<(), Box<dyn Task<S> + Send>> {
        match self.channels[channel_idx].task_sender.send(task) {
            Ok(_) => {
                self.channels[channel_idx].num_tasks_in_flight += 1;
                Ok(())
            }
            Err(task) => {
                log::error!("Worker {} disconnected", channel_idx);
                Err(task.0)
            }
        }
    }

    /// Finds a worker channel that can accept a new task, round-robin from
    /// the last used channel.
    fn find_available_channel(&self) -> Option<usize> {
        if self.channels.is_empty() {
            return None;
        }

        let start_channel = self.current_channel % self.channels.len();
        let mut current = start_channel;

        loop {
            if self.channels[current].num_tasks_in_flight < MAX_TASKS_IN_FLIGHT {
                return Some(current);
            }
            current = (current + 1) % self.channels.len();
            if current == start_channel {
                return None;
            }
        }
    }

    /// Publishes a new task for execution.
    ///
    /// Queued tasks are always older than this one, so while anything is
    /// queued the new task joins the back of the queue instead of jumping it.
    ///
    /// # Returns
    /// - `true` if the task was immediately sent to a worker
    /// - `false` if the task was queued
    pub fn publish_task(&mut self, task: Box<dyn Task<S> + Send>) -> bool {
        if !self.queued_tasks.is_empty() {
            self.queued_tasks.push_back(task);
            return false;
        }

        match self.find_available_channel() {
            Some(channel_idx) => match self.try_send_task(task, channel_idx) {
                Ok(_) => {
                    self.current_channel = (channel_idx + 1) % self.channels.len();
                    true
                }
                Err(task) => {
                    self.queued_tasks.push_back(task);
                    false
                }
            },
            None => {
                self.queued_tasks.push_back(task);
                false
            }
        }
    }

    /// Sends queued tasks to workers while workers are available.
    ///
    /// Tasks leave the queue in FIFO order. Call once per frame.
    pub fn process_queued_tasks(&mut self) {
        while !self.queued_tasks.is_empty() {
            let Some(channel_idx) = self.find_available_channel() else {
                break;
            };
            let Some(task) = self.queued_tasks.pop_front() else {
                break;
            };
            match self.try_send_task(task, channel_idx) {
                Ok(_) => {
                    self.current_channel = (channel_idx + 1) % self.channels.len();
                }
                Err(task) => {
                    self.queued_tasks.push_front(task);
                    break;
                }
            }
        }
    }

    /// Handles results that workers have finished, without blocking.
    ///
    /// # Arguments
    /// * `state` - Render-thread state passed to each result
    /// * `device` - Graphics device passed to each result
    /// * `max_results` - Upper bound on results handled by this call; the
    ///   rest stay in their channels for the next call
    ///
    /// # Returns
    /// The number of results handled.
    pub fn process_completed_tasks(
        &mut self,
        state: &mut S,
        device: &mut dyn GraphicsDevice,
        max_results: usize,
    ) -> usize {
        let mut handled = 0;
        let mut tasks_to_queue = Vec::new();

        'channels: for channel in &mut self.channels {
            while handled < max_results {
                let Ok(result) = channel.result_receiver.try_recv() else {
                    continue 'channels;
                };
                channel.num_tasks_in_flight -= 1;
                handled += 1;
                tasks_to_queue.extend(result.handle_result(state, device));
            }
            break;
        }

        for task in tasks_to_queue {
            self.publish_task(task);
        }

        handled
    }

    /// Number of tasks waiting for a worker.
    pub fn queued_task_count(&self) -> usize {
        self.queued_tasks.len()
    }

    /// Number of tasks sent to workers whose results have not been handled.
    pub fn tasks_in_flight(&self) -> usize {
        self.channels
            .iter()
            .map(|channel| channel.num_tasks_in_flight)
            .sum()
    }

    /// Whether nothing is queued and nothing is in flight.
    pub fn is_idle(&self) -> bool {
        self.queued_tasks.is_empty() && self.tasks_in_flight() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::gpu::RecordingDevice;
    use std::time::{Duration, Instant};

    struct RecordTask {
        value: u32,
        delay: Duration,
    }

    struct RecordResult {
        value: u32,
    }

    impl Task<Vec<u32>> for RecordTask {
        fn process(&self) -> Box<dyn TaskResult<Vec<u32>> + Send> {
            thread::sleep(self.delay);
            Box::new(RecordResult { value: self.value })
        }
    }

    impl TaskResult<Vec<u32>> for RecordResult {
        fn handle_result(
            self: Box<Self>,
            state: &mut Vec<u32>,
            _device: &mut dyn GraphicsDevice,
        ) -> Vec<Box<dyn Task<Vec<u32>> + Send>> {
            state.push(self.value);
            Vec::new()
        }
    }

    fn task(value: u32, delay_ms: u64) -> Box<dyn Task<Vec<u32>> + Send> {
        Box::new(RecordTask {
            value,
            delay: Duration::from_millis(delay_ms),
        })
    }

    fn drain(
        manager: &mut TaskManager<Vec<u32>>,
        state: &mut Vec<u32>,
        device: &mut RecordingDevice,
    ) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while !manager.is_idle() {
            assert!(Instant::now() < deadline, "tasks did not finish in time");
            manager.process_completed_tasks(state, device, 1);
            manager.process_queued_tasks();
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn single_worker_handles_results_in_publication_order() {
        let mut manager = TaskManager::new(1).unwrap();
        let mut device = RecordingDevice::new();
        let mut state = Vec::new();

        assert!(manager.publish_task(task(1, 30)));
        assert!(!manager.publish_task(task(2, 0)));
        assert!(!manager.publish_task(task(3, 10)));
        assert_eq!(manager.queued_task_count(), 2);
        assert_eq!(manager.tasks_in_flight(), 1);

        drain(&mut manager, &mut state, &mut device);
        assert_eq!(state, vec![1, 2, 3]);
    }

    #[test]
    fn handles_at_most_the_requested_number_of_results() {
        let mut manager = TaskManager::new(2).unwrap();
        let mut device = RecordingDevice::new();
        let mut state = Vec::new();

        manager.publish_task(task(1, 0));
        manager.publish_task(task(2, 0));
        thread::sleep(Duration::from_millis(100));

        assert_eq!(manager.process_completed_tasks(&mut state, &mut device, 1), 1);
        assert_eq!(state.len(), 1);
        assert_eq!(manager.process_completed_tasks(&mut state, &mut device, 1), 1);
        assert_eq!(state.len(), 2);
        assert!(manager.is_idle());
    }

    #[test]
    fn new_manager_is_idle() {
        let manager = TaskManager::<Vec<u32>>::new(1).unwrap();
        assert!(manager.is_idle());
    }
}
