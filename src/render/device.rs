//! The graphics device abstraction.
//!
//! Every GPU object handle is a plain `u32` name where `0` means "invalid /
//! none", mirroring OpenGL object semantics. Resource wrappers own their
//! handles and release them through the device on drop, so the rest of the
//! crate never issues a raw binding call: the device is the single place
//! where binding invariants are enforced.

use std::rc::Rc;

use crate::context::GpuDescription;
use crate::render::shader::ShaderError;
use crate::resources::image::DecodedImage;

/// Primitive topology for draw calls. Filled mode draws triangle lists,
/// wireframe mode line strips.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Topology {
    TriangleList,
    LineStrip,
}

/// Texture binding target of a texture object. The array targets exist for
/// the layered shadow-map textures.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextureTarget {
    TwoDim,
    TwoDimArray,
    Cubemap,
    CubemapArray,
}

/// Depth comparison function for the depth test.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DepthFunc {
    Less,
    LessEqual,
}

/// Which faces get culled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CullFace {
    Back,
    Front,
}

/// Fixed GPU state profile applied before binding meshes for a shader kind.
///
/// Each shader kind has incompatible state requirements (the HUD disables
/// depth testing and blends, depth passes cull front faces under depth
/// clamp), so the profile is applied wholesale on every shader switch.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StateProfile {
    pub depth_test: Option<DepthFunc>,
    pub cull_face: Option<CullFace>,
    pub blend: bool,
    pub depth_clamp: bool,
}

/// Layer layout of an off-screen depth render target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DepthMapTarget {
    /// One layer per light (directional and spot shadows).
    Array2d,
    /// Six faces per light (omni-directional shadows).
    CubemapArray,
}

/// An off-screen depth render target: a framebuffer plus its layered depth
/// texture. Owned by the render engine; released through the device on drop.
pub struct DepthMap {
    device: Rc<dyn GraphicsDevice>,
    framebuffer: u32,
    texture: u32,
    target: DepthMapTarget,
    size: u32,
}

impl DepthMap {
    pub fn new(
        device: Rc<dyn GraphicsDevice>,
        framebuffer: u32,
        texture: u32,
        target: DepthMapTarget,
        size: u32,
    ) -> Self {
        Self {
            device,
            framebuffer,
            texture,
            target,
            size,
        }
    }

    pub fn framebuffer(&self) -> u32 {
        self.framebuffer
    }

    pub fn texture(&self) -> u32 {
        self.texture
    }

    pub fn target(&self) -> DepthMapTarget {
        self.target
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn is_ok(&self) -> bool {
        self.framebuffer > 0 && self.texture > 0
    }
}

impl Drop for DepthMap {
    fn drop(&mut self) {
        self.device.delete_depth_map(self.framebuffer, self.texture);
    }
}

/// Upload options for texture creation.
#[derive(Clone, Copy, Debug)]
pub struct TextureUpload {
    pub srgb: bool,
    pub repeat: bool,
    pub transparent: bool,
    pub mip_levels: u32,
}

/// Shader stage sources handed to program creation. Stages with empty text
/// are skipped (the geometry stage exists for exactly one shader kind).
#[derive(Clone, Debug, Default)]
pub struct StageSources {
    pub vertex: String,
    pub fragment: String,
    pub geometry: String,
}

/// The binding seam between scene/render code and the GPU.
///
/// Implementations: [`crate::render::opengl::GlDevice`] (the real backend)
/// and [`crate::render::headless::HeadlessDevice`] (fake object names and
/// recorded state, for tests and CI).
pub trait GraphicsDevice {
    fn description(&self) -> GpuDescription;

    fn set_viewport(&self, width: u32, height: u32);
    fn clear(&self, color: [f32; 4]);
    fn apply_state(&self, profile: &StateProfile);

    /// Creates an element buffer from an index array; returns 0 on failure.
    fn create_index_buffer(&self, data: &[u32]) -> u32;
    /// Creates an array buffer from float data; returns 0 on failure.
    fn create_array_buffer(&self, data: &[f32]) -> u32;
    fn delete_buffer(&self, buffer: u32);

    /// Creates, uploads and mipmaps a 2D texture; returns 0 on failure.
    fn create_texture_2d(&self, image: &DecodedImage, options: &TextureUpload) -> u32;
    /// Creates a cubemap from exactly six decoded faces; returns 0 on failure.
    fn create_texture_cubemap(&self, faces: &[DecodedImage], options: &TextureUpload) -> u32;
    fn delete_texture(&self, texture: u32);
    fn bind_texture(&self, unit: u32, target: TextureTarget, texture: u32);
    /// Unbinds both 2D and cubemap targets on the first `units` texture
    /// units, then re-activates unit 0. Run after every mesh draw so no
    /// binding leaks into the next shader kind.
    fn unbind_texture_units(&self, units: u32);

    /// Compiles all non-empty stages, links, and returns the program name.
    fn create_program(&self, name: &str, stages: &StageSources) -> Result<u32, ShaderError>;
    fn delete_program(&self, program: u32);
    /// `0` unbinds the active program.
    fn use_program(&self, program: u32);
    /// Post-upload program validation; debug builds only call this.
    fn validate_program(&self, program: u32) -> bool;
    /// `-1` means the attribute is not present in this program.
    fn attribute_location(&self, program: u32, name: &str) -> i32;
    /// `-1` means the uniform is not present in this program.
    fn uniform_location(&self, program: u32, name: &str) -> i32;
    /// `-1` means the block is not declared by this program.
    fn uniform_block_index(&self, program: u32, name: &str) -> i32;
    fn create_uniform_buffer(&self) -> u32;
    /// Uploads `data` into the uniform buffer and binds it to the block's
    /// binding point for the given program.
    fn write_uniform_block(&self, program: u32, block: i32, binding: u32, buffer: u32, data: &[u8]);
    fn set_sampler_unit(&self, location: i32, unit: u32);

    fn bind_attribute(&self, buffer: u32, location: i32, components: i32);
    fn disable_attribute(&self, location: i32);
    fn draw_indexed(&self, topology: Topology, index_buffer: u32, count: usize);
    fn draw_arrays(&self, topology: Topology, vertex_buffer: u32, count: usize);

    /// Creates a layered depth render target; `(0, 0)` on failure.
    fn create_depth_map(&self, size: u32, layers: u32, target: DepthMapTarget) -> (u32, u32);
    fn delete_depth_map(&self, framebuffer: u32, texture: u32);
    /// Binds the depth framebuffer for rendering; `layer` selects one array
    /// layer, `None` attaches the whole texture for layered rendering.
    fn begin_depth_pass(&self, map: &DepthMap, layer: Option<u32>);
    /// Restores the default framebuffer and the canvas viewport.
    fn end_depth_pass(&self, canvas_size: (u32, u32));
}
