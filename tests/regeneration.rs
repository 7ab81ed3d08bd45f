use std::sync::mpsc::{channel, Receiver};

use cube_batch::engine_state::buffer_layout::{BufferLayout, LayoutSettings, StorageMode, StrideMode};
use cube_batch::engine_state::geometry::MemoryBudget;
use cube_batch::engine_state::gpu::{DeviceCall, RecordingDevice};
use cube_batch::engine_state::regeneration::{
    FailurePhase, RegenerationPipeline, RegenerationRequest, StatusEvent,
};

mod common;
use common::{factor, settle};

fn pipeline(
    n: u32,
    settings: LayoutSettings,
    budget: MemoryBudget,
) -> (RegenerationPipeline, Receiver<StatusEvent>) {
    let (sender, receiver) = channel();
    let pipeline = RegenerationPipeline::new(factor(n), settings, budget, Box::new(sender)).unwrap();
    (pipeline, receiver)
}

fn start(n: u32, budget: MemoryBudget) -> (RegenerationPipeline, Receiver<StatusEvent>, RecordingDevice) {
    let (mut pipeline, receiver) = pipeline(n, LayoutSettings::default(), budget);
    let mut device = RecordingDevice::new();
    pipeline.surface_created();
    settle(&mut pipeline, &mut device);
    (pipeline, receiver, device)
}

fn cube_counts(events: &Receiver<StatusEvent>) -> Vec<u32> {
    events
        .try_iter()
        .filter_map(|event| match event {
            StatusEvent::CubeCount(factor) => Some(factor.get()),
            _ => None,
        })
        .collect()
}

#[test]
fn queued_requests_install_in_order() {
    let (mut pipeline, events, mut device) = start(3, MemoryBudget::unlimited());
    assert_eq!(cube_counts(&events), vec![3]);
    device.clear_log();

    assert!(pipeline.increase_cube_count());
    pipeline.toggle_stride();
    assert!(pipeline.increase_cube_count());
    settle(&mut pipeline, &mut device);

    assert_eq!(cube_counts(&events), vec![4, 4, 5]);
    assert_eq!(pipeline.actual_factor(), Some(factor(5)));
    assert_eq!(
        pipeline.settings(),
        LayoutSettings {
            storage: StorageMode::Vbo,
            stride: StrideMode::Separate,
        }
    );
    let layout = pipeline.active_layout().unwrap();
    assert!(matches!(layout, BufferLayout::SeparateVbo { .. }));
    assert_eq!(layout.vertex_count(), 36 * 125);

    // Each install deletes the previous buffers before creating its own.
    assert!(device.peak_live_buffers() <= 3, "peak {}", device.peak_live_buffers());
    let created_sizes: Vec<usize> = device
        .calls()
        .iter()
        .filter_map(|call| match call {
            DeviceCall::CreateBuffer { floats, .. } => Some(*floats),
            _ => None,
        })
        .collect();
    let interleaved_4 = 36 * 64 * 8;
    assert_eq!(created_sizes[0], interleaved_4);
    assert_eq!(created_sizes.len(), 1 + 3 + 3);

    let first_delete_after_last_n4_create = device
        .calls()
        .iter()
        .rposition(|call| matches!(call, DeviceCall::DeleteBuffers(ids) if ids.len() == 3))
        .unwrap();
    let first_n5_create = device
        .calls()
        .iter()
        .position(|call| matches!(call, DeviceCall::CreateBuffer { floats, .. } if *floats == 36 * 125 * 3))
        .unwrap();
    assert!(first_delete_after_last_n4_create < first_n5_create);
    assert!(device.violations().is_empty(), "{:?}", device.violations());
}

#[test]
fn requests_made_during_first_generation_install_in_order() {
    let (mut pipeline, events) = pipeline(3, LayoutSettings::default(), MemoryBudget::unlimited());
    let mut device = RecordingDevice::new();

    pipeline.surface_created();
    assert!(pipeline.increase_cube_count());
    pipeline.toggle_stride();
    assert!(pipeline.increase_cube_count());
    assert!(!pipeline.is_idle());
    settle(&mut pipeline, &mut device);

    assert_eq!(cube_counts(&events), vec![3, 4, 4, 5]);
    assert_eq!(pipeline.actual_factor(), Some(factor(5)));
    assert!(matches!(
        pipeline.active_layout(),
        Some(BufferLayout::SeparateVbo { vertex_count, .. }) if *vertex_count == 36 * 125
    ));
    assert!(device.peak_live_buffers() <= 3, "peak {}", device.peak_live_buffers());
    assert_eq!(device.live_buffer_count(), 3);
    assert!(device.violations().is_empty(), "{:?}", device.violations());
}

#[test]
fn largest_grid_out_of_memory_keeps_previous_arrays() {
    // Fits one N = 15 position array (1,458,000 bytes), not one for N = 16.
    let budget = MemoryBudget::limited(1_600_000);
    let (mut pipeline, events) = pipeline(15, LayoutSettings::from_flags(false, false), budget);
    let mut device = RecordingDevice::new();

    pipeline.surface_created();
    settle(&mut pipeline, &mut device);
    assert_eq!(cube_counts(&events), vec![15]);
    assert!(matches!(
        pipeline.active_layout(),
        Some(BufferLayout::SeparateArray { .. })
    ));

    assert!(pipeline.increase_cube_count());
    settle(&mut pipeline, &mut device);

    assert_eq!(
        events.try_iter().collect::<Vec<_>>(),
        vec![StatusEvent::GenerationFailed {
            phase: FailurePhase::Compute,
            cube_factor: factor(16),
        }]
    );
    assert_eq!(pipeline.actual_factor(), Some(factor(15)));
    assert_eq!(pipeline.settings(), LayoutSettings::from_flags(false, false));

    device.clear_log();
    assert!(pipeline.render(&mut device));
    assert_eq!(device.draws()[0].vertex_count, 36 * 3375);
    assert_eq!(device.live_buffer_count(), 0);
}

#[test]
fn storage_toggle_switches_to_client_arrays() {
    let (mut pipeline, events, mut device) = start(2, MemoryBudget::unlimited());
    events.try_iter().for_each(drop);

    pipeline.toggle_storage();
    settle(&mut pipeline, &mut device);

    assert!(matches!(
        pipeline.active_layout(),
        Some(BufferLayout::InterleavedArray { .. })
    ));
    assert_eq!(device.live_buffer_count(), 0);
    assert_eq!(
        events.try_iter().collect::<Vec<_>>(),
        vec![
            StatusEvent::StorageMode(StorageMode::ClientSide),
            StatusEvent::StrideMode(StrideMode::Interleaved),
            StatusEvent::CubeCount(factor(2)),
        ]
    );
}

#[test]
fn compute_out_of_memory_keeps_drawing_previous_grid() {
    let (mut pipeline, events, mut device) = start(2, MemoryBudget::limited(64 * 1024));
    events.try_iter().for_each(drop);

    pipeline.request_regeneration(factor(8), RegenerationRequest::default());
    settle(&mut pipeline, &mut device);

    assert_eq!(
        events.try_iter().collect::<Vec<_>>(),
        vec![StatusEvent::GenerationFailed {
            phase: FailurePhase::Compute,
            cube_factor: factor(8),
        }]
    );
    assert_eq!(pipeline.actual_factor(), Some(factor(2)));

    device.clear_log();
    assert!(pipeline.render(&mut device));
    assert_eq!(device.draws()[0].vertex_count, 36 * 8);
}

#[test]
fn install_out_of_memory_then_recovers() {
    let (mut pipeline, events, mut device) = start(2, MemoryBudget::unlimited());
    events.try_iter().for_each(drop);

    device.set_memory_limit(Some(4096));
    pipeline.increase_cube_count();
    settle(&mut pipeline, &mut device);

    assert!(pipeline.active_layout().is_none());
    assert_eq!(device.live_buffer_count(), 0);
    assert!(matches!(
        events.try_iter().last(),
        Some(StatusEvent::GenerationFailed {
            phase: FailurePhase::Install,
            ..
        })
    ));

    device.set_memory_limit(None);
    pipeline.decrease_cube_count();
    settle(&mut pipeline, &mut device);

    assert_eq!(pipeline.actual_factor(), Some(factor(2)));
    assert_eq!(device.live_buffer_count(), 1);
    assert!(device.violations().is_empty(), "{:?}", device.violations());
}
