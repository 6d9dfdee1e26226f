//! Rendering: the graphics device abstraction, shader programs, packed
//! uniform records and the per-frame render engine.
//!
//! All raw OpenGL calls live in [`opengl`] behind the [`device::GraphicsDevice`]
//! trait, so binding discipline (state profiles per shader kind, the
//! unbind-all-textures sweep after each mesh) is enforced in one place.
//! [`headless`] provides a GPU-free device for tests and CI.

pub mod device;
pub mod engine;
pub mod headless;
pub mod opengl;
pub mod shader;
pub mod uniforms;

use cgmath::Vector3;

use crate::render::shader::ShaderKind;

/// Per-call override bundle passed through the frame traversal to every
/// draw step.
#[derive(Clone, Copy, Debug)]
pub struct DrawProperties {
    /// Pinned shader kind; `None` lets the fill mode pick. Depth passes pin
    /// the depth shaders regardless of fill mode.
    pub shader: Option<ShaderKind>,
    /// Selection filter: `Some(true)` draws the selected subset only,
    /// `Some(false)` the unselected subset, `None` everything.
    pub draw_selected: Option<bool>,
    /// Substitute each mesh's bounding volume for its real geometry.
    pub draw_bounding_volumes: bool,
    pub enable_clipping: bool,
    pub clip_min: Vector3<f32>,
    pub clip_max: Vector3<f32>,
    /// Slot of the light whose point of view a depth pass renders from.
    pub light: Option<usize>,
    /// Target layer inside the depth-map array for the active depth pass.
    pub depth_layer: u32,
    /// Diffuse override, used by the selected-object highlight pass.
    pub color_override: Option<cgmath::Vector4<f32>>,
    /// Depth-map textures for shadow sampling (0 when absent).
    pub shadow_map_2d: u32,
    pub shadow_map_cube: u32,
}

impl Default for DrawProperties {
    fn default() -> Self {
        Self {
            shader: None,
            draw_selected: None,
            draw_bounding_volumes: false,
            enable_clipping: false,
            clip_min: Vector3::new(0.0, 0.0, 0.0),
            clip_max: Vector3::new(0.0, 0.0, 0.0),
            light: None,
            depth_layer: 0,
            color_override: None,
            shadow_map_2d: 0,
            shadow_map_cube: 0,
        }
    }
}
