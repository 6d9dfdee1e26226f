use vantage3d::context::DrawMode;
use vantage3d::render::device::Topology;
use vantage3d::render::shader::ShaderKind;

use crate::common::test_utils::{cube_model, init_engine};

mod common;

#[test]
fn wireframe_mode_never_selects_the_default_lit_shader() {
    let (mut engine, mut ctx, device) = init_engine((640, 360));
    let gpu = engine.device().unwrap().clone();
    ctx.models.push(cube_model(&gpu, 2));

    let shaders = engine.shaders().unwrap();
    let wireframe = shaders.program(ShaderKind::Wireframe).program();
    let default_lit = shaders.program(ShaderKind::Default).program();
    let depth = shaders.program(ShaderKind::Depth).program();

    engine.set_draw_mode(&mut ctx, "Wireframe".parse::<DrawMode>().unwrap());
    engine.draw(&mut ctx).unwrap();

    let records = device.records();
    assert!(records.used_programs.contains(&wireframe));
    assert!(
        !records.used_programs.contains(&default_lit),
        "no non-pinned draw may use the default-lit shader in wireframe mode"
    );
    // Depth passes pin their shader regardless of the fill mode.
    assert!(records.used_programs.contains(&depth));

    assert!(records
        .draw_calls
        .iter()
        .any(|(topology, _)| *topology == Topology::LineStrip));
    assert!(!records
        .draw_calls
        .iter()
        .any(|(topology, _)| *topology == Topology::TriangleList));
}

#[test]
fn filled_mode_selects_the_default_lit_shader() {
    let (mut engine, mut ctx, device) = init_engine((640, 360));
    let gpu = engine.device().unwrap().clone();
    ctx.models.push(cube_model(&gpu, 1));

    let default_lit = engine
        .shaders()
        .unwrap()
        .program(ShaderKind::Default)
        .program();

    engine.draw(&mut ctx).unwrap();

    let records = device.records();
    assert!(records.used_programs.contains(&default_lit));
    assert!(records
        .draw_calls
        .iter()
        .all(|(topology, _)| *topology == Topology::TriangleList));
}

#[test]
fn the_frame_traversal_ends_with_the_hud_pass() {
    let (mut engine, mut ctx, device) = init_engine((640, 360));
    let gpu = engine.device().unwrap().clone();
    ctx.models.push(cube_model(&gpu, 1));

    let hud = common::test_utils::cube_mesh(&gpu, "hud");
    ctx.huds.push(hud);

    let shaders = engine.shaders().unwrap();
    let hud_program = shaders.program(ShaderKind::Hud).program();
    let depth_program = shaders.program(ShaderKind::Depth).program();
    let default_program = shaders.program(ShaderKind::Default).program();

    engine.draw(&mut ctx).unwrap();

    let records = device.records();
    let non_zero: Vec<u32> = records
        .used_programs
        .iter()
        .copied()
        .filter(|&program| program != 0)
        .collect();

    assert_eq!(non_zero.last(), Some(&hud_program), "HUD renders last");
    let first_depth = non_zero.iter().position(|&p| p == depth_program).unwrap();
    let first_default = non_zero.iter().position(|&p| p == default_program).unwrap();
    assert!(
        first_depth < first_default,
        "depth passes precede the opaque pass"
    );
}

#[test]
fn selection_splits_the_renderable_passes_and_draws_everything_once() {
    let (mut engine, mut ctx, device) = init_engine((640, 360));
    let gpu = engine.device().unwrap().clone();

    let mut model = cube_model(&gpu, 2);
    model.meshes_mut()[0].set_selected(true);
    ctx.models.push(model);

    engine.draw(&mut ctx).unwrap();

    let records = device.records();
    // One directional depth pass over both meshes (2), the opaque pass over
    // the unselected mesh (1), the light icon (1), the highlight pass over
    // the selected mesh (1).
    assert_eq!(records.draw_calls.len(), 5);
    assert!(records.unbind_sweeps >= 5);
    assert_eq!(records.depth_passes, 1);
}

#[test]
fn every_mesh_draw_is_followed_by_a_texture_unbind_sweep() {
    let (mut engine, mut ctx, device) = init_engine((640, 360));
    let gpu = engine.device().unwrap().clone();
    ctx.models.push(cube_model(&gpu, 3));

    engine.draw(&mut ctx).unwrap();

    let records = device.records();
    assert_eq!(records.unbind_sweeps as usize, records.draw_calls.len());
}

#[test]
fn bounding_volume_mode_substitutes_the_proxy_geometry() {
    let (mut engine, mut ctx, device) = init_engine((640, 360));
    let gpu = engine.device().unwrap().clone();

    let record = vantage3d::resources::model::MeshRecord {
        name: "tri".into(),
        indices: vec![0, 1, 2],
        normals: vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0],
        positions: vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
        texture_coords: Vec::new(),
        position: cgmath::Vector3::new(0.0, 0.0, 0.0),
        rotation: cgmath::Vector3::new(0.0, 0.0, 0.0),
        scale: cgmath::Vector3::new(1.0, 1.0, 1.0),
        diffuse_texture: None,
        specular_texture: None,
    };
    let mesh = vantage3d::scene::mesh::Mesh::from_record(&gpu, record, ctx.empty_texture.as_ref());
    assert!(mesh.bounding_volume().is_some());
    ctx.models
        .push(vantage3d::scene::model::Model::from_meshes(vec![mesh]));

    let baseline = {
        engine.draw(&mut ctx).unwrap();
        device.records().draw_calls.len()
    };

    ctx.draw_bounding_volumes = true;
    engine.draw(&mut ctx).unwrap();

    let records = device.records();
    // The second frame adds exactly one bounding-volume draw on top of the
    // repeated baseline frame: 36 cube indices instead of the 3-index mesh.
    assert_eq!(records.draw_calls.len(), baseline * 2 + 1);
    assert!(records
        .draw_calls
        .iter()
        .any(|&(_, count)| count == 36));
}
