#![allow(dead_code)]

use std::time::{Duration, Instant};

use cube_batch::engine_state::geometry::CubeFactor;
use cube_batch::engine_state::gpu::RecordingDevice;
use cube_batch::engine_state::regeneration::RegenerationPipeline;

pub fn factor(n: u32) -> CubeFactor {
    CubeFactor::new(n).unwrap()
}

/// Drives the render-thread side until every request has been installed.
pub fn settle(pipeline: &mut RegenerationPipeline, device: &mut RecordingDevice) {
    let deadline = Instant::now() + Duration::from_secs(60);
    while !pipeline.is_idle() {
        assert!(Instant::now() < deadline, "regeneration did not settle");
        pipeline.process_completed(device);
        pipeline.process_queued();
        std::thread::sleep(Duration::from_millis(1));
    }
}
