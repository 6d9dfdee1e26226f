use approx::assert_relative_eq;
use cgmath::InnerSpace;

use vantage3d::context::{GraphicsApi, RenderContext};
use vantage3d::render::engine::{EngineError, RenderEngine};
use vantage3d::render::headless::HeadlessTarget;
use vantage3d::scene::light::LightKind;
use vantage3d::KeyCode;

use crate::common::test_utils::init_engine;

mod common;

#[test]
fn initialization_yields_a_ready_engine_with_camera_and_directional_light() {
    let (engine, ctx, _) = init_engine((640, 360));

    assert!(engine.is_ready());
    assert_eq!(engine.selected_api(), Some(GraphicsApi::OpenGL));
    assert_eq!(ctx.canvas.size, (640, 360));

    assert!(ctx.camera.is_some(), "a default main camera must exist");

    let active_directional = ctx
        .lights
        .iter()
        .flatten()
        .filter(|light| light.is_active() && light.kind() == LightKind::Directional)
        .count();
    assert_eq!(active_directional, 1);
    assert_eq!(ctx.active_light_count(), 1);

    assert!(ctx.empty_texture.is_some());
    assert!(ctx.empty_cubemap.is_some());
    assert!(!ctx.gpu.version.is_empty());
}

#[test]
fn keyboard_forward_movement_is_tied_to_the_frame_time() {
    let (_, mut ctx, _) = init_engine((640, 360));

    let camera = ctx.camera.as_mut().expect("main camera");
    let start = camera.position();
    let forward = camera.forward();
    let dt = 1.0 / 60.0;

    assert!(camera.input_keyboard(KeyCode::KeyW, dt));

    let moved = camera.position() - start;
    assert_relative_eq!(moved.magnitude(), dt * 20.0, epsilon = 1e-5);
    assert_relative_eq!(moved.normalize().dot(forward), 1.0, epsilon = 1e-5);
}

#[test]
fn unsupported_backends_fail_fast_and_leave_the_engine_uninitialized() {
    let (mut engine, mut ctx, _) = init_engine((640, 360));
    assert!(engine.is_ready());

    for api in [
        GraphicsApi::DirectX11,
        GraphicsApi::DirectX12,
        GraphicsApi::Vulkan,
    ] {
        let result = engine.set_graphics_api(&mut ctx, api);
        assert!(matches!(result, Err(EngineError::UnsupportedApi(e)) if e == api));
        assert!(!engine.is_ready());
        assert!(matches!(engine.draw(&mut ctx), Err(EngineError::NotReady)));
    }

    // Correction requires a new explicit call; nothing retries implicitly.
    engine
        .set_graphics_api(&mut ctx, GraphicsApi::OpenGL)
        .unwrap();
    assert!(engine.is_ready());
}

#[test]
fn drawing_before_initialization_is_rejected() {
    let target = HeadlessTarget::new((640, 360));
    let mut engine = RenderEngine::new(Box::new(target));
    let mut ctx = RenderContext::new();
    assert!(matches!(engine.draw(&mut ctx), Err(EngineError::NotReady)));
}

#[test]
fn reinitialization_replaces_gpu_state_but_keeps_the_camera() {
    use vantage3d::scene::transform::Spatial;

    let (mut engine, mut ctx, _) = init_engine((640, 360));
    let camera_id = ctx.camera.as_ref().unwrap().transform().id();

    engine
        .set_graphics_api(&mut ctx, GraphicsApi::OpenGL)
        .unwrap();

    assert_eq!(ctx.camera.as_ref().unwrap().transform().id(), camera_id);
    // The light table also survives, so no second default light appears.
    assert_eq!(ctx.active_light_count(), 1);
}
