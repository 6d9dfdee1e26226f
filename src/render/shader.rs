//! Shader programs: compile/link, location caching and per-draw uploads.
//!
//! A program's attribute and uniform locations are resolved exactly once,
//! right after a successful link, and cached for the program's lifetime. A
//! cached location of `-1` means "not present in this shader"; every upload
//! step checks for it and skips the slot instead of binding it. One uniform
//! buffer object exists per known block kind whether or not the shader
//! declares the block (absent blocks simply leave their buffer unused).

use std::path::PathBuf;
use std::rc::Rc;

use bytemuck::bytes_of;
use thiserror::Error;

use crate::context::RenderContext;
use crate::render::device::{
    CullFace, DepthFunc, GraphicsDevice, StageSources, StateProfile, TextureTarget,
};
use crate::render::uniforms::{ColorRaw, DefaultRaw, DepthRaw, HudRaw, MatrixRaw};
use crate::render::DrawProperties;
use crate::scene::mesh::Mesh;
use crate::scene::transform::Spatial;
use crate::scene::MAX_TEXTURES;

/// The closed set of shader kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShaderKind {
    Color = 0,
    Default = 1,
    Depth = 2,
    DepthOmni = 3,
    Hud = 4,
    Skybox = 5,
    Wireframe = 6,
}

pub const SHADER_COUNT: usize = 7;

impl ShaderKind {
    pub const ALL: [ShaderKind; SHADER_COUNT] = [
        ShaderKind::Color,
        ShaderKind::Default,
        ShaderKind::Depth,
        ShaderKind::DepthOmni,
        ShaderKind::Hud,
        ShaderKind::Skybox,
        ShaderKind::Wireframe,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ShaderKind::Color => "color",
            ShaderKind::Default => "default",
            ShaderKind::Depth => "depth",
            ShaderKind::DepthOmni => "depth.omni",
            ShaderKind::Hud => "hud",
            ShaderKind::Skybox => "skybox",
            ShaderKind::Wireframe => "wireframe",
        }
    }

    /// The fixed GPU state profile applied before binding meshes for this
    /// shader kind. Depth passes cull front faces under depth clamp to
    /// reduce peter-panning; the HUD draws blended on top of everything.
    pub fn state_profile(self) -> StateProfile {
        match self {
            ShaderKind::Hud => StateProfile {
                depth_test: None,
                cull_face: None,
                blend: true,
                depth_clamp: false,
            },
            ShaderKind::Skybox => StateProfile {
                depth_test: Some(DepthFunc::LessEqual),
                cull_face: None,
                blend: false,
                depth_clamp: false,
            },
            ShaderKind::Depth | ShaderKind::DepthOmni => StateProfile {
                depth_test: Some(DepthFunc::Less),
                cull_face: Some(CullFace::Front),
                blend: false,
                depth_clamp: true,
            },
            _ => StateProfile {
                depth_test: Some(DepthFunc::Less),
                cull_face: Some(CullFace::Back),
                blend: false,
                depth_clamp: false,
            },
        }
    }
}

/// Vertex attributes the engine feeds; resolved by name after link.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Attribute {
    Normal = 0,
    Position = 1,
    TextureCoords = 2,
}

pub const ATTRIBUTE_COUNT: usize = 3;

const ATTRIBUTE_NAMES: [&str; ATTRIBUTE_COUNT] =
    ["VertexNormal", "VertexPosition", "VertexTextureCoords"];

const ATTRIBUTE_COMPONENTS: [i32; ATTRIBUTE_COUNT] = [3, 3, 2];

/// Uniform slots: five buffer blocks, one sampler per texture unit, and the
/// two shadow-map array samplers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UniformBinding {
    Matrix = 0,
    Color = 1,
    Default = 2,
    Depth = 3,
    Hud = 4,
    Texture0 = 5,
    Texture1 = 6,
    Texture2 = 7,
    Texture3 = 8,
    Texture4 = 9,
    Texture5 = 10,
    DepthMap2D = 11,
    DepthMapCube = 12,
}

pub const UNIFORM_SLOTS: usize = 13;
const BLOCK_SLOTS: usize = 5;

impl UniformBinding {
    pub const ALL: [UniformBinding; UNIFORM_SLOTS] = [
        UniformBinding::Matrix,
        UniformBinding::Color,
        UniformBinding::Default,
        UniformBinding::Depth,
        UniformBinding::Hud,
        UniformBinding::Texture0,
        UniformBinding::Texture1,
        UniformBinding::Texture2,
        UniformBinding::Texture3,
        UniformBinding::Texture4,
        UniformBinding::Texture5,
        UniformBinding::DepthMap2D,
        UniformBinding::DepthMapCube,
    ];

    fn block_name(self) -> Option<&'static str> {
        match self {
            UniformBinding::Matrix => Some("MatrixBuffer"),
            UniformBinding::Color => Some("ColorBuffer"),
            UniformBinding::Default => Some("DefaultBuffer"),
            UniformBinding::Depth => Some("DepthBuffer"),
            UniformBinding::Hud => Some("HUDBuffer"),
            _ => None,
        }
    }

    fn texture_slot(index: usize) -> usize {
        UniformBinding::Texture0 as usize + index
    }
}

const SAMPLER_NAMES: [&str; MAX_TEXTURES] = [
    "Textures[0]",
    "Textures[1]",
    "Textures[2]",
    "Textures[3]",
    "Textures[4]",
    "Textures[5]",
];

#[derive(Debug, Error)]
pub enum ShaderError {
    #[error("shader source {0:?} is missing or empty")]
    MissingSource(PathBuf),
    #[error("a shader program needs both a vertex and a fragment stage")]
    MissingStage,
    #[error("the graphics device could not allocate a shader object")]
    Allocate,
    #[error("failed to compile the {stage} stage: {log}")]
    Compile { stage: &'static str, log: String },
    #[error("failed to link the program: {0}")]
    Link(String),
    #[error("the program is not linked")]
    NotLinked,
    #[error("no main camera is available for the uniform upload")]
    MissingCamera,
    #[error("no light source is bound for the depth pass")]
    MissingLight,
    #[error("program validation failed: {0}")]
    Validation(String),
}

/// A compiled and linked shader program plus its cached binding tables.
pub struct ShaderProgram {
    device: Rc<dyn GraphicsDevice>,
    kind: ShaderKind,
    program: u32,
    attributes: [i32; ATTRIBUTE_COUNT],
    uniforms: [i32; UNIFORM_SLOTS],
    uniform_buffers: [u32; UNIFORM_SLOTS],
}

impl ShaderProgram {
    pub fn new(device: Rc<dyn GraphicsDevice>, kind: ShaderKind) -> Self {
        Self {
            device,
            kind,
            program: 0,
            attributes: [-1; ATTRIBUTE_COUNT],
            uniforms: [-1; UNIFORM_SLOTS],
            uniform_buffers: [0; UNIFORM_SLOTS],
        }
    }

    /// Compiles each non-empty stage, links, and caches every attribute and
    /// uniform location. On failure the program stays unusable
    /// (`is_ok() == false`); it is never left partially linked.
    pub fn load_and_link(
        &mut self,
        vertex_src: &str,
        fragment_src: &str,
        geometry_src: Option<&str>,
    ) -> Result<(), ShaderError> {
        if vertex_src.trim().is_empty() || fragment_src.trim().is_empty() {
            return Err(ShaderError::MissingStage);
        }

        let stages = StageSources {
            vertex: vertex_src.to_string(),
            fragment: fragment_src.to_string(),
            geometry: geometry_src.unwrap_or("").to_string(),
        };

        self.program = self.device.create_program(self.kind.name(), &stages)?;

        self.resolve_locations();
        Ok(())
    }

    /// One-time location resolution, run immediately after link.
    fn resolve_locations(&mut self) {
        for (slot, name) in ATTRIBUTE_NAMES.iter().enumerate() {
            self.attributes[slot] = self.device.attribute_location(self.program, name);
        }

        for binding in UniformBinding::ALL {
            let slot = binding as usize;
            self.uniforms[slot] = match binding.block_name() {
                Some(name) => self.device.uniform_block_index(self.program, name),
                None => {
                    let name = match binding {
                        UniformBinding::DepthMap2D => "DepthMap2D",
                        UniformBinding::DepthMapCube => "DepthMapCube",
                        sampler => SAMPLER_NAMES[sampler as usize - BLOCK_SLOTS],
                    };
                    self.device.uniform_location(self.program, name)
                }
            };
        }

        // One buffer per block kind, declared by the shader or not.
        for slot in 0..BLOCK_SLOTS {
            self.uniform_buffers[slot] = self.device.create_uniform_buffer();
        }
    }

    pub fn kind(&self) -> ShaderKind {
        self.kind
    }

    pub fn program(&self) -> u32 {
        self.program
    }

    pub fn is_ok(&self) -> bool {
        self.program > 0
    }

    pub fn attribute_location(&self, attribute: Attribute) -> i32 {
        self.attributes[attribute as usize]
    }

    /// Binds the mesh's geometry buffers to the cached attribute locations.
    /// Attributes missing from the shader, or arrays missing from the mesh,
    /// are skipped or disabled rather than bound.
    pub fn update_attributes(&self, mesh: &Mesh) {
        let buffers = [mesh.nbo(), mesh.vbo(), mesh.tbo()];
        for slot in 0..ATTRIBUTE_COUNT {
            let location = self.attributes[slot];
            if location < 0 {
                continue;
            }
            if buffers[slot] > 0 {
                self.device
                    .bind_attribute(buffers[slot], location, ATTRIBUTE_COMPONENTS[slot]);
            } else {
                self.device.disable_attribute(location);
            }
        }
    }

    /// The per-draw upload step: packs one record per uniform-block kind,
    /// uploads it into that block's buffer, binds the buffer to the block's
    /// binding index and wires up every texture unit the shader declares
    /// (explicitly unbinding the units it does not).
    pub fn update_uniforms(
        &self,
        mesh: &Mesh,
        ctx: &RenderContext,
        properties: &DrawProperties,
    ) -> Result<(), ShaderError> {
        if !self.is_ok() {
            return Err(ShaderError::NotLinked);
        }
        let camera = ctx.camera.as_ref().ok_or(ShaderError::MissingCamera)?;

        let model = mesh.transform().matrix();
        let matrices = match self.kind {
            ShaderKind::Depth | ShaderKind::DepthOmni => {
                let light = properties
                    .light
                    .and_then(|slot| ctx.lights.get(slot))
                    .and_then(Option::as_ref)
                    .ok_or(ShaderError::MissingLight)?;
                MatrixRaw::for_light(light, model)
            }
            kind => MatrixRaw::for_camera(camera, model, kind == ShaderKind::Skybox),
        };
        self.write_block(UniformBinding::Matrix, bytes_of(&matrices));

        let color = ColorRaw {
            color: properties
                .color_override
                .unwrap_or(mesh.material.diffuse)
                .into(),
        };
        self.write_block(UniformBinding::Color, bytes_of(&color));

        let default_block = DefaultRaw::new(mesh, ctx, camera, properties);
        self.write_block(UniformBinding::Default, bytes_of(&default_block));

        if let Some(light) = properties
            .light
            .and_then(|slot| ctx.lights.get(slot))
            .and_then(Option::as_ref)
        {
            let depth = DepthRaw::new(light, properties.depth_layer);
            self.write_block(UniformBinding::Depth, bytes_of(&depth));
        }

        let hud = HudRaw::new(mesh);
        self.write_block(UniformBinding::Hud, bytes_of(&hud));

        for index in 0..MAX_TEXTURES {
            let location = self.uniforms[UniformBinding::texture_slot(index)];
            match mesh.texture(index) {
                Some(texture) if location >= 0 && texture.id() > 0 => {
                    self.device
                        .bind_texture(index as u32, texture.target(), texture.id());
                    self.device.set_sampler_unit(location, index as u32);
                }
                _ => {
                    // The shader does not sample this unit (or there is
                    // nothing to bind): unbind it instead of leaking state.
                    self.device
                        .bind_texture(index as u32, TextureTarget::TwoDim, 0);
                    self.device
                        .bind_texture(index as u32, TextureTarget::Cubemap, 0);
                }
            }
        }

        let shadow_2d = self.uniforms[UniformBinding::DepthMap2D as usize];
        if shadow_2d >= 0 && properties.shadow_map_2d > 0 {
            let unit = MAX_TEXTURES as u32;
            self.device.bind_texture(
                unit,
                TextureTarget::TwoDimArray,
                properties.shadow_map_2d,
            );
            self.device.set_sampler_unit(shadow_2d, unit);
        }
        let shadow_cube = self.uniforms[UniformBinding::DepthMapCube as usize];
        if shadow_cube >= 0 && properties.shadow_map_cube > 0 {
            let unit = MAX_TEXTURES as u32 + 1;
            self.device.bind_texture(
                unit,
                TextureTarget::CubemapArray,
                properties.shadow_map_cube,
            );
            self.device.set_sampler_unit(shadow_cube, unit);
        }

        #[cfg(debug_assertions)]
        if !self.device.validate_program(self.program) {
            return Err(ShaderError::Validation(format!(
                "{} shader",
                self.kind.name()
            )));
        }

        Ok(())
    }

    fn write_block(&self, binding: UniformBinding, data: &[u8]) {
        let slot = binding as usize;
        // -1 means the shader does not declare this block.
        if self.uniforms[slot] < 0 {
            return;
        }
        self.device.write_uniform_block(
            self.program,
            self.uniforms[slot],
            slot as u32,
            self.uniform_buffers[slot],
            data,
        );
    }
}

impl Drop for ShaderProgram {
    fn drop(&mut self) {
        for buffer in self.uniform_buffers {
            if buffer > 0 {
                self.device.delete_buffer(buffer);
            }
        }
        if self.program > 0 {
            self.device.delete_program(self.program);
        }
    }
}

/// The fixed table of all shader programs, loaded and linked in a fixed
/// order. A single failure aborts the whole table and names the failing
/// kind.
pub struct ShaderTable {
    programs: [ShaderProgram; SHADER_COUNT],
}

impl ShaderTable {
    pub fn init(device: &Rc<dyn GraphicsDevice>) -> Result<Self, (ShaderKind, ShaderError)> {
        use crate::resources::shader_sources::{load_text_file, SHADER_RESOURCES};

        let mut programs = Vec::with_capacity(SHADER_COUNT);

        for resource in &SHADER_RESOURCES {
            let kind = resource.kind;
            let load = |path: &str| {
                load_text_file(std::path::Path::new(path))
                    .map_err(|_| (kind, ShaderError::MissingSource(PathBuf::from(path))))
            };

            let vertex = load(resource.vertex)?;
            let fragment = load(resource.fragment)?;
            let geometry = match resource.geometry {
                Some(path) => Some(load(path)?),
                None => None,
            };

            let mut program = ShaderProgram::new(device.clone(), kind);
            program
                .load_and_link(&vertex, &fragment, geometry.as_deref())
                .map_err(|e| (kind, e))?;
            programs.push(program);
        }

        let programs: [ShaderProgram; SHADER_COUNT] = programs
            .try_into()
            .unwrap_or_else(|_| unreachable!("the shader resource table is fixed-size"));
        Ok(Self { programs })
    }

    pub fn program(&self, kind: ShaderKind) -> &ShaderProgram {
        &self.programs[kind as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::headless::HeadlessDevice;

    fn device() -> Rc<dyn GraphicsDevice> {
        Rc::new(HeadlessDevice::new())
    }

    const VS: &str = "#version 450 core\nvoid main() {}\n";
    const FS: &str = "#version 450 core\nvoid main() {}\n";

    #[test]
    fn linking_caches_locations_and_marks_the_program_usable() {
        let mut program = ShaderProgram::new(device(), ShaderKind::Default);
        assert!(!program.is_ok());
        program.load_and_link(VS, FS, None).unwrap();
        assert!(program.is_ok());
        assert!(program.program() > 0);
    }

    #[test]
    fn broken_fragment_source_leaves_the_program_unusable() {
        let mut program = ShaderProgram::new(device(), ShaderKind::Default);
        let result = program.load_and_link(VS, "#version 450 core\n#error broken\n", None);
        assert!(matches!(result, Err(ShaderError::Compile { .. })));
        assert!(!program.is_ok());
    }

    #[test]
    fn empty_stage_sources_are_rejected() {
        let mut program = ShaderProgram::new(device(), ShaderKind::Color);
        assert!(matches!(
            program.load_and_link("", FS, None),
            Err(ShaderError::MissingStage)
        ));
        assert!(!program.is_ok());
    }

    #[test]
    fn uploads_through_an_unlinked_program_are_rejected() {
        use crate::scene::geometry;
        use crate::scene::mesh::Mesh;
        use crate::scene::ComponentKind;

        let device = device();
        let program = ShaderProgram::new(device.clone(), ShaderKind::Default);
        let mesh = Mesh::from_shape(device, ComponentKind::Mesh, "cube", geometry::cube(1.0));
        let ctx = crate::context::RenderContext::new();
        let result = program.update_uniforms(&mesh, &ctx, &DrawProperties::default());
        assert!(matches!(result, Err(ShaderError::NotLinked)));
    }

    #[test]
    fn state_profiles_follow_the_shader_kind_table() {
        let hud = ShaderKind::Hud.state_profile();
        assert!(hud.blend && hud.depth_test.is_none() && hud.cull_face.is_none());

        let skybox = ShaderKind::Skybox.state_profile();
        assert_eq!(skybox.depth_test, Some(DepthFunc::LessEqual));
        assert!(skybox.cull_face.is_none() && !skybox.blend);

        for kind in [ShaderKind::Depth, ShaderKind::DepthOmni] {
            let depth = kind.state_profile();
            assert_eq!(depth.cull_face, Some(CullFace::Front));
            assert!(depth.depth_clamp);
        }

        for kind in [ShaderKind::Color, ShaderKind::Default, ShaderKind::Wireframe] {
            let profile = kind.state_profile();
            assert_eq!(profile.depth_test, Some(DepthFunc::Less));
            assert_eq!(profile.cull_face, Some(CullFace::Back));
            assert!(!profile.blend && !profile.depth_clamp);
        }
    }
}
