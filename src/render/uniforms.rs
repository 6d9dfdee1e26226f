//! Packed uniform-block records.
//!
//! Every block is a `#[repr(C)]` struct of vec4/mat4-shaped fields so the
//! byte layout matches the std140 declarations in the GLSL sources exactly.
//! Scalars and flags are widened to a vec4 with the value in `x` (and, where
//! noted, a second value in `y`) to sidestep std140 packing differences.

use bytemuck::{Pod, Zeroable};
use cgmath::{Matrix, Matrix3, Matrix4, SquareMatrix};

use crate::context::RenderContext;
use crate::render::DrawProperties;
use crate::scene::camera::Camera;
use crate::scene::light::LightSource;
use crate::scene::mesh::Mesh;
use crate::scene::{MAX_LIGHT_SOURCES, MAX_TEXTURES};

/// Widens a flag to a vec4 (value in `x`).
pub fn flag(value: bool) -> [f32; 4] {
    [if value { 1.0 } else { 0.0 }, 0.0, 0.0, 0.0]
}

/// Widens a scalar to a vec4 (value in `x`).
pub fn scalar(value: f32) -> [f32; 4] {
    [value, 0.0, 0.0, 0.0]
}

fn vec4(v: cgmath::Vector3<f32>, w: f32) -> [f32; 4] {
    [v.x, v.y, v.z, w]
}

/// One packed light record of the lighting block.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct LightRaw {
    /// x = active flag, y = light kind tag.
    pub active: [f32; 4],
    pub ambient: [f32; 4],
    /// cos(inner), cos(outer) for spot cones, zero otherwise.
    pub angles: [f32; 4],
    pub attenuation: [f32; 4],
    pub diffuse: [f32; 4],
    pub direction: [f32; 4],
    pub position: [f32; 4],
    /// Specular intensity rgb + shininess exponent in w.
    pub specular: [f32; 4],
    pub view_projection: [[f32; 4]; 4],
}

impl LightRaw {
    pub fn new(light: &LightSource) -> Self {
        use crate::scene::transform::Spatial;

        let (inner, outer) = light.cone_angles();
        let angles = if inner > 0.1 && outer > inner {
            [inner.cos(), outer.cos(), 0.0, 0.0]
        } else {
            [0.0; 4]
        };

        Self {
            active: [
                if light.is_active() { 1.0 } else { 0.0 },
                light.kind() as i32 as f32,
                0.0,
                0.0,
            ],
            ambient: vec4(light.material.ambient, 0.0),
            angles,
            attenuation: [
                light.attenuation.constant,
                light.attenuation.linear,
                light.attenuation.quadratic,
                0.0,
            ],
            diffuse: light.material.diffuse.into(),
            direction: vec4(light.direction, 0.0),
            position: vec4(light.transform().position(), 0.0),
            specular: vec4(
                light.material.specular.intensity,
                light.material.specular.shininess,
            ),
            view_projection: (light.projection() * light.view(0)).into(),
        }
    }
}

/// The matrix block: model/normal/MVP for camera draws, model plus
/// light-space matrices for depth passes.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct MatrixRaw {
    pub model: [[f32; 4]; 4],
    pub normal: [[f32; 4]; 4],
    pub mvp: [[f32; 4]; 4],
    /// Per-cube-face view x projection matrices for omni-directional depth.
    pub vp: [[[f32; 4]; 4]; MAX_TEXTURES],
}

impl MatrixRaw {
    /// Camera-relative matrices. The MVP translation is stripped only for
    /// the skybox so it stays infinitely distant.
    pub fn for_camera(camera: &Camera, model: Matrix4<f32>, remove_translation: bool) -> Self {
        Self {
            model: model.into(),
            normal: normal_matrix(model).into(),
            mvp: camera.mvp(model, remove_translation).into(),
            vp: [Matrix4::identity().into(); MAX_TEXTURES],
        }
    }

    /// Light-space matrices for depth passes.
    pub fn for_light(light: &LightSource, model: Matrix4<f32>) -> Self {
        let projection = light.projection();
        let mut vp = [[[0.0; 4]; 4]; MAX_TEXTURES];
        for (face, slot) in vp.iter_mut().enumerate() {
            *slot = (projection * light.view(face)).into();
        }

        Self {
            model: model.into(),
            normal: Matrix4::identity().into(),
            mvp: light.mvp(model).into(),
            vp,
        }
    }
}

/// Inverse-transpose of the model's upper 3x3, widened back to a mat4, for
/// transforming normals under non-uniform scale.
fn normal_matrix(model: Matrix4<f32>) -> Matrix4<f32> {
    let m3 = Matrix3::from_cols(
        model.x.truncate(),
        model.y.truncate(),
        model.z.truncate(),
    );
    let inverted = m3.invert().unwrap_or_else(Matrix3::identity);
    Matrix4::from(inverted.transpose())
}

/// The color block: the draw's diffuse color.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct ColorRaw {
    pub color: [f32; 4],
}

/// The lighting/material block for the default shader.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct DefaultRaw {
    pub light_sources: [LightRaw; MAX_LIGHT_SOURCES],
    pub is_textured: [[f32; 4]; MAX_TEXTURES],
    pub texture_scales: [[f32; 4]; MAX_TEXTURES],
    pub mesh_specular: [f32; 4],
    pub mesh_diffuse: [f32; 4],
    pub clip_max: [f32; 4],
    pub clip_min: [f32; 4],
    pub enable_clipping: [f32; 4],
    pub camera_position: [f32; 4],
    pub component_type: [f32; 4],
    pub enable_srgb: [f32; 4],
}

impl DefaultRaw {
    pub fn new(mesh: &Mesh, ctx: &RenderContext, camera: &Camera, properties: &DrawProperties) -> Self {
        let mut light_sources = [LightRaw::zeroed(); MAX_LIGHT_SOURCES];
        // Fixed-size table; empty slots stay zeroed (inactive).
        for (slot, light) in ctx.lights.iter().enumerate() {
            if let Some(light) = light {
                light_sources[slot] = LightRaw::new(light);
            }
        }

        let mut is_textured = [[0.0; 4]; MAX_TEXTURES];
        let mut texture_scales = [[1.0, 1.0, 0.0, 0.0]; MAX_TEXTURES];
        for index in 0..MAX_TEXTURES {
            is_textured[index] = flag(mesh.is_textured(index));
            if let Some(texture) = mesh.texture(index) {
                texture_scales[index] = [texture.scale.x, texture.scale.y, 0.0, 0.0];
            }
        }

        Self {
            light_sources,
            is_textured,
            texture_scales,
            mesh_specular: vec4(
                mesh.material.specular.intensity,
                mesh.material.specular.shininess,
            ),
            mesh_diffuse: properties
                .color_override
                .unwrap_or(mesh.material.diffuse)
                .into(),
            clip_max: vec4(properties.clip_max, 0.0),
            clip_min: vec4(properties.clip_min, 0.0),
            enable_clipping: flag(properties.enable_clipping),
            camera_position: vec4(camera.position(), 0.0),
            component_type: scalar(mesh.kind() as i32 as f32),
            enable_srgb: flag(ctx.enable_srgb),
        }
    }
}

/// The depth block: the light position plus the cube-face/array layer the
/// pass renders into (in `w`).
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct DepthRaw {
    pub light_position: [f32; 4],
}

impl DepthRaw {
    pub fn new(light: &LightSource, depth_layer: u32) -> Self {
        use crate::scene::transform::Spatial;
        Self {
            light_position: vec4(light.transform().position(), depth_layer as f32),
        }
    }
}

/// The HUD block.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct HudRaw {
    pub material_color: [f32; 4],
    pub is_transparent: [f32; 4],
}

impl HudRaw {
    pub fn new(mesh: &Mesh) -> Self {
        let transparent = mesh
            .texture(0)
            .map(|texture| texture.transparent())
            .unwrap_or(false);
        Self {
            material_color: mesh.material.diffuse.into(),
            is_transparent: flag(transparent),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::light::LightKind;

    // The GLSL block declarations assume these exact sizes; a layout change
    // here must be mirrored in resources/shader/.
    #[test]
    fn record_sizes_match_the_std140_block_layout() {
        assert_eq!(std::mem::size_of::<LightRaw>(), 8 * 16 + 64);
        assert_eq!(std::mem::size_of::<MatrixRaw>(), 3 * 64 + 6 * 64);
        assert_eq!(std::mem::size_of::<ColorRaw>(), 16);
        assert_eq!(
            std::mem::size_of::<DefaultRaw>(),
            MAX_LIGHT_SOURCES * std::mem::size_of::<LightRaw>() + 2 * MAX_TEXTURES * 16 + 7 * 16
        );
        assert_eq!(std::mem::size_of::<DepthRaw>(), 16);
        assert_eq!(std::mem::size_of::<HudRaw>(), 32);
    }

    #[test]
    fn light_record_carries_the_kind_tag_and_active_flag() {
        let mut light = LightSource::new(LightKind::Spot);
        let raw = LightRaw::new(&light);
        assert_eq!(raw.active[0], 1.0);
        assert_eq!(raw.active[1], LightKind::Spot as i32 as f32);
        assert!(raw.angles[0] > raw.angles[1], "cos(inner) > cos(outer)");

        light.set_active(false);
        assert_eq!(LightRaw::new(&light).active[0], 0.0);
    }

    #[test]
    fn directional_lights_have_no_cone() {
        let raw = LightRaw::new(&LightSource::new(LightKind::Directional));
        assert_eq!(raw.angles, [0.0; 4]);
    }
}
