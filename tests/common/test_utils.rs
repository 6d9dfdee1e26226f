#![allow(dead_code)]

use std::rc::Rc;

use vantage3d::context::RenderContext;
use vantage3d::render::device::GraphicsDevice;
use vantage3d::render::engine::RenderEngine;
use vantage3d::render::headless::{HeadlessDevice, HeadlessTarget};
use vantage3d::scene::geometry;
use vantage3d::scene::mesh::Mesh;
use vantage3d::scene::model::Model;
use vantage3d::scene::ComponentKind;

/// Brings up a ready engine over a headless target and hands back the
/// device handle for record inspection.
pub fn init_engine(size: (u32, u32)) -> (RenderEngine, RenderContext, Rc<HeadlessDevice>) {
    let target = HeadlessTarget::new(size);
    let device = target.device();
    let mut engine = RenderEngine::new(Box::new(target));
    let mut ctx = RenderContext::new();
    engine
        .init(&mut ctx)
        .expect("engine initialization over the headless target");
    (engine, ctx, device)
}

pub fn cube_mesh(device: &Rc<dyn GraphicsDevice>, name: &str) -> Mesh {
    Mesh::from_shape(
        device.clone(),
        ComponentKind::Mesh,
        name,
        geometry::cube(1.0),
    )
}

/// One model with `count` unit cubes.
pub fn cube_model(device: &Rc<dyn GraphicsDevice>, count: usize) -> Model {
    let meshes = (0..count)
        .map(|i| cube_mesh(device, &format!("cube-{}", i)))
        .collect();
    Model::from_meshes(meshes)
}
