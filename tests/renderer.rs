use std::sync::mpsc::channel;
use std::sync::Arc;
use std::time::{Duration, Instant};

use cube_batch::config::DemoConfig;
use cube_batch::core::DragAccumulator;
use cube_batch::engine_state::gpu::{RecordingDevice, VertexAttribute};
use cube_batch::engine_state::rendering::CubeRenderer;

mod common;
use common::factor;

fn renderer(config: &DemoConfig) -> (CubeRenderer, Arc<DragAccumulator>) {
    let (sender, _receiver) = channel();
    let drag = Arc::new(DragAccumulator::new());
    let renderer = CubeRenderer::new(config, Box::new(sender), drag.clone(), 800, 600).unwrap();
    (renderer, drag)
}

fn draw_until_installed(renderer: &mut CubeRenderer, device: &mut RecordingDevice) {
    let deadline = Instant::now() + Duration::from_secs(60);
    while !renderer.pipeline.is_idle() || renderer.pipeline.active_layout().is_none() {
        assert!(Instant::now() < deadline, "first grid was never installed");
        renderer.draw_frame(device);
        std::thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn frames_before_first_install_draw_nothing() {
    let (mut renderer, _drag) = renderer(&DemoConfig::default());
    let mut device = RecordingDevice::new();

    renderer.draw_frame(&mut device);
    assert!(device.draws().is_empty());
    assert!(device.violations().is_empty());
}

#[test]
fn draw_frame_draws_the_configured_grid() {
    let config = DemoConfig {
        cube_factor: factor(2),
        use_vbos: false,
        use_stride: false,
        ..DemoConfig::default()
    };
    let (mut renderer, _drag) = renderer(&config);
    let mut device = RecordingDevice::new();

    renderer.surface_created();
    draw_until_installed(&mut renderer, &mut device);
    device.clear_log();

    renderer.draw_frame(&mut device);
    let draws = device.draws();
    assert_eq!(draws.len(), 1);
    assert_eq!(draws[0].vertex_count, 36 * 8);
    assert!(draws[0].attributes.iter().all(|attribute| attribute
        .as_ref()
        .is_some_and(|resolved| resolved.buffer.is_none())));
    for attribute in VertexAttribute::ALL {
        assert!(!device.is_attribute_enabled(attribute));
    }
    assert_eq!(device.live_buffer_count(), 0);
}

#[test]
fn drag_is_consumed_once_per_frame() {
    let (mut renderer, drag) = renderer(&DemoConfig::default());
    let mut device = RecordingDevice::new();

    let still = renderer.draw_frame(&mut device);
    assert_eq!(renderer.draw_frame(&mut device), still);

    drag.accumulate(10.0, 0.0);
    drag.accumulate(5.0, -3.0);
    let rotated = renderer.draw_frame(&mut device);
    assert_ne!(rotated, still);
    assert_eq!(drag.pending(), (0.0, 0.0));

    // No new input: the accumulated rotation is kept as is.
    assert_eq!(renderer.draw_frame(&mut device), rotated);
}

#[test]
fn surface_changed_updates_projection_only() {
    let (mut renderer, _drag) = renderer(&DemoConfig::default());
    let mut device = RecordingDevice::new();

    let wide = renderer.draw_frame(&mut device);
    renderer.surface_changed(600, 800);
    let tall = renderer.draw_frame(&mut device);

    assert_eq!(wide.mv, tall.mv);
    assert_eq!(wide.light_pos, tall.light_pos);
    assert_ne!(wide.mvp, tall.mvp);
}

#[test]
fn teardown_releases_installed_buffers() {
    let (mut renderer, _drag) = renderer(&DemoConfig::default());
    let mut device = RecordingDevice::new();

    renderer.surface_created();
    draw_until_installed(&mut renderer, &mut device);
    assert_eq!(device.live_buffer_count(), 1);

    renderer.teardown(&mut device);
    assert_eq!(device.live_buffer_count(), 0);
    assert!(device.violations().is_empty());
}
