//! The per-frame render engine.
//!
//! State machine: `Uninitialized -> Ready -> Drawing (per frame) -> Ready`,
//! with a close/reinitialize transition back to `Uninitialized` whenever the
//! graphics backend changes. Within a frame the traversal order is fixed and
//! load-bearing: opaque renderables first, then light icons, the
//! selected-object highlight pass, bounding-volume debug geometry, the
//! skybox (depth-tested less-equal so it loses against all opaque geometry)
//! and the HUD overlays last, unlit and blended on top of everything.

use std::f32::consts::PI;
use std::rc::Rc;

use cgmath::Vector3;
use thiserror::Error;

use crate::context::{DrawMode, GraphicsApi, RenderContext, RenderTarget};
use crate::render::device::{DepthMap, DepthMapTarget, GraphicsDevice, Topology};
use crate::render::shader::{ShaderError, ShaderKind, ShaderProgram, ShaderTable};
use crate::render::DrawProperties;
use crate::scene::camera::Camera;
use crate::scene::light::{LightKind, LightSource};
use crate::scene::mesh::Mesh;
use crate::scene::transform::Spatial;
use crate::scene::MAX_TEXTURES;

/// Side length of the square shadow-map layers.
pub const DEPTH_MAP_SIZE: u32 = 1024;

const CLEAR_COLOR_DEFAULT: [f32; 4] = [0.0, 0.2, 0.4, 1.0];

#[derive(Debug, Error)]
pub enum EngineError {
    /// The backend is a recognized enum value without an implementation.
    #[error("the {0} backend is not implemented")]
    UnsupportedApi(GraphicsApi),
    #[error("failed to create the rendering context: {0}")]
    Context(String),
    #[error("failed to initialize the {} shader: {}", .0.name(), .1)]
    Shaders(ShaderKind, ShaderError),
    #[error("failed to create the shared engine resources: {0}")]
    Resources(String),
    #[error("the engine is not initialized")]
    NotReady,
    #[error("failed to present the frame: {0}")]
    Present(String),
}

/// Owns the GPU-side machinery (device, shader table, depth targets) and
/// orchestrates the per-frame draw over a [`RenderContext`].
pub struct RenderEngine {
    target: Box<dyn RenderTarget>,
    api: Option<GraphicsApi>,
    device: Option<Rc<dyn GraphicsDevice>>,
    shaders: Option<ShaderTable>,
    depth_map_2d: Option<DepthMap>,
    depth_map_cube: Option<DepthMap>,
    ready: bool,
}

impl RenderEngine {
    pub fn new(target: Box<dyn RenderTarget>) -> Self {
        Self {
            target,
            api: None,
            device: None,
            shaders: None,
            depth_map_2d: None,
            depth_map_cube: None,
            ready: false,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn selected_api(&self) -> Option<GraphicsApi> {
        self.api
    }

    pub fn shaders(&self) -> Option<&ShaderTable> {
        self.shaders.as_ref()
    }

    pub fn device(&self) -> Option<&Rc<dyn GraphicsDevice>> {
        self.device.as_ref()
    }

    /// Records the canvas geometry and brings up the OpenGL backend.
    pub fn init(&mut self, ctx: &mut RenderContext) -> Result<(), EngineError> {
        ctx.canvas = crate::context::Canvas::new(self.target.size());
        self.set_graphics_api(ctx, GraphicsApi::OpenGL)
    }

    /// Tears down all GPU resources, recreates the rendering context for
    /// the requested backend, reinitializes the shader table and the shared
    /// resources, and on the first successful initialization creates the
    /// default camera and a directional light. Every stage failure maps to
    /// a distinct error and leaves the engine uninitialized; nothing is
    /// retried.
    pub fn set_graphics_api(
        &mut self,
        ctx: &mut RenderContext,
        api: GraphicsApi,
    ) -> Result<(), EngineError> {
        self.ready = false;
        self.api = Some(api);

        self.close(ctx);

        if api != GraphicsApi::OpenGL {
            return Err(EngineError::UnsupportedApi(api));
        }

        let device = self
            .target
            .create_context()
            .map_err(|e| EngineError::Context(e.to_string()))?;
        device.set_viewport(ctx.canvas.size.0, ctx.canvas.size.1);
        ctx.gpu = device.description();
        self.device = Some(device.clone());

        match ShaderTable::init(&device) {
            Ok(table) => self.shaders = Some(table),
            Err((kind, e)) => {
                self.close(ctx);
                return Err(EngineError::Shaders(kind, e));
            }
        }

        if let Err(e) = self.init_resources(ctx, &device) {
            self.close(ctx);
            return Err(EngineError::Resources(e.to_string()));
        }

        if ctx.camera.is_none() {
            ctx.camera = Some(Camera::new(
                Vector3::new(0.0, 2.5, 10.0),
                Vector3::new(0.0, 0.0, 0.0),
                PI * 0.25,
                0.1,
                100.0,
                ctx.canvas.aspect_ratio,
            ));
            let light = LightSource::new(LightKind::Directional).with_icon(device.clone());
            if let Err(e) = ctx.add_light(light) {
                log::warn!("Could not add the default light source: {}", e);
            }
        }

        self.target.set_vsync(ctx.vsync);

        self.ready = true;
        Ok(())
    }

    /// Shared resources: the empty placeholder textures and the layered
    /// depth render targets for the shadow passes.
    fn init_resources(
        &mut self,
        ctx: &mut RenderContext,
        device: &Rc<dyn GraphicsDevice>,
    ) -> anyhow::Result<()> {
        let empty_texture = crate::scene::texture::Texture::empty(device.clone());
        let empty_cubemap = crate::scene::texture::Texture::empty_cubemap(device.clone());
        if !empty_texture.is_ok() || !empty_cubemap.is_ok() {
            anyhow::bail!("could not create the empty placeholder textures");
        }
        ctx.empty_texture = Some(Rc::new(empty_texture));
        ctx.empty_cubemap = Some(Rc::new(empty_cubemap));

        let layers = crate::scene::MAX_LIGHT_SOURCES as u32;
        let (fbo, texture) =
            device.create_depth_map(DEPTH_MAP_SIZE, layers, DepthMapTarget::Array2d);
        let map_2d = DepthMap::new(
            device.clone(),
            fbo,
            texture,
            DepthMapTarget::Array2d,
            DEPTH_MAP_SIZE,
        );
        let (fbo, texture) = device.create_depth_map(
            DEPTH_MAP_SIZE,
            layers * MAX_TEXTURES as u32,
            DepthMapTarget::CubemapArray,
        );
        let map_cube = DepthMap::new(
            device.clone(),
            fbo,
            texture,
            DepthMapTarget::CubemapArray,
            DEPTH_MAP_SIZE,
        );
        if !map_2d.is_ok() || !map_cube.is_ok() {
            anyhow::bail!("could not create the depth render targets");
        }
        self.depth_map_2d = Some(map_2d);
        self.depth_map_cube = Some(map_cube);

        Ok(())
    }

    /// Drops every GPU resource: shader programs, depth targets, the scene's
    /// GPU-backed entities and the shared placeholders, and finally the
    /// device handle itself. The camera and the light sources survive (minus
    /// their icons); they carry no GPU state of their own.
    pub fn close(&mut self, ctx: &mut RenderContext) {
        self.ready = false;

        ctx.models.clear();
        ctx.huds.clear();
        ctx.skybox = None;
        for slot in ctx.lights.iter_mut().flatten() {
            slot.clear_icon();
        }
        ctx.empty_texture = None;
        ctx.empty_cubemap = None;

        self.depth_map_2d = None;
        self.depth_map_cube = None;
        self.shaders = None;
        self.device = None;
    }

    /// Draws one frame: refresh the off-screen depth targets, clear, run the
    /// fixed scene traversal, swap buffers. A frame, once started, always
    /// runs to the buffer swap.
    pub fn draw(&mut self, ctx: &mut RenderContext) -> Result<(), EngineError> {
        if !self.ready {
            return Err(EngineError::NotReady);
        }

        // Per-frame updates: auto-rotation, icon and bounding-volume sync.
        for model in &mut ctx.models {
            for mesh in model.meshes_mut() {
                if mesh.transform().auto_rotate {
                    let amount = mesh.transform().auto_rotation;
                    mesh.rotate_by(amount);
                }
                mesh.update_bounding_volume();
            }
        }
        for light in ctx.lights.iter_mut().flatten() {
            light.sync_icon();
        }

        self.draw_depth_passes(ctx);

        let device = self.device.as_ref().ok_or(EngineError::NotReady)?;
        device.clear(CLEAR_COLOR_DEFAULT);

        self.draw_scene(ctx);

        self.target
            .swap_buffers()
            .map_err(|e| EngineError::Present(e.to_string()))
    }

    fn base_properties(&self) -> DrawProperties {
        DrawProperties {
            shadow_map_2d: self.depth_map_2d.as_ref().map_or(0, DepthMap::texture),
            shadow_map_cube: self.depth_map_cube.as_ref().map_or(0, DepthMap::texture),
            ..DrawProperties::default()
        }
    }

    fn draw_scene(&self, ctx: &RenderContext) {
        self.draw_renderables(ctx);
        self.draw_light_sources(ctx);
        self.draw_selected(ctx);
        self.draw_bounding_volumes(ctx);
        self.draw_skybox(ctx);
        self.draw_huds(ctx);
    }

    /// The main opaque pass over the unselected subset. The fill mode picks
    /// the shader unless the caller pinned one.
    fn draw_renderables(&self, ctx: &RenderContext) {
        if ctx.renderable_count() == 0 {
            return;
        }
        let mut properties = self.base_properties();
        properties.draw_selected = Some(false);
        self.draw_meshes(ctx, ctx.renderables(), &properties);
    }

    /// Debug visualization of the light sources through the color shader.
    fn draw_light_sources(&self, ctx: &RenderContext) {
        let icons = ctx
            .lights
            .iter()
            .flatten()
            .filter(|light| light.is_active())
            .filter_map(LightSource::icon);
        let mut properties = self.base_properties();
        properties.shader = Some(ShaderKind::Color);
        self.draw_meshes(ctx, icons, &properties);
    }

    /// Highlight pass: the selected subset, re-colored via the draw
    /// properties so no mesh state is mutated.
    fn draw_selected(&self, ctx: &RenderContext) {
        let mut properties = self.base_properties();
        properties.draw_selected = Some(true);
        properties.color_override = Some(ctx.select_color);
        self.draw_meshes(ctx, ctx.renderables(), &properties);
    }

    /// Bounding-volume debug pass; substitutes the proxy geometry without
    /// touching the meshes themselves.
    fn draw_bounding_volumes(&self, ctx: &RenderContext) {
        if !ctx.draw_bounding_volumes {
            return;
        }
        let mut properties = self.base_properties();
        properties.shader = Some(ShaderKind::Color);
        properties.draw_bounding_volumes = true;
        self.draw_meshes(ctx, ctx.renderables(), &properties);
    }

    /// The skybox renders after all opaque geometry (less-equal depth test)
    /// so covered fragments are rejected instead of overdrawn.
    fn draw_skybox(&self, ctx: &RenderContext) {
        if let Some(skybox) = &ctx.skybox {
            let mut properties = self.base_properties();
            properties.shader = Some(ShaderKind::Skybox);
            self.draw_meshes(ctx, std::iter::once(skybox), &properties);
        }
    }

    /// HUD overlays render last, unlit and blended, on top of everything.
    fn draw_huds(&self, ctx: &RenderContext) {
        if ctx.huds.is_empty() {
            return;
        }
        let mut properties = self.base_properties();
        properties.shader = Some(ShaderKind::Hud);
        self.draw_meshes(ctx, ctx.huds.iter(), &properties);
    }

    /// Renders the scene's depth from every active light's point of view
    /// into the layered depth targets. Directional and spot lights fill one
    /// 2D-array layer each; point lights render all six cube faces in one
    /// layered pass through the geometry-stage depth shader.
    fn draw_depth_passes(&self, ctx: &RenderContext) {
        let (Some(device), Some(map_2d), Some(map_cube)) = (
            self.device.as_ref(),
            self.depth_map_2d.as_ref(),
            self.depth_map_cube.as_ref(),
        ) else {
            return;
        };
        if ctx.active_light_count() == 0 || ctx.renderable_count() == 0 {
            return;
        }

        for (slot, light) in ctx.lights.iter().enumerate() {
            let Some(light) = light.as_ref().filter(|light| light.is_active()) else {
                continue;
            };

            let mut properties = self.base_properties();
            properties.light = Some(slot);
            properties.depth_layer = slot as u32;

            match light.kind() {
                LightKind::Point => {
                    properties.shader = Some(ShaderKind::DepthOmni);
                    device.begin_depth_pass(map_cube, None);
                }
                _ => {
                    properties.shader = Some(ShaderKind::Depth);
                    device.begin_depth_pass(map_2d, Some(slot as u32));
                }
            }

            self.draw_meshes(ctx, ctx.renderables(), &properties);
        }

        device.end_depth_pass(ctx.canvas.size);
    }

    /// Applies the state profile for the resolved shader kind, activates the
    /// program, draws every mesh that passes the selection filter, then
    /// deactivates the program.
    pub fn draw_meshes<'a>(
        &self,
        ctx: &RenderContext,
        meshes: impl Iterator<Item = &'a Mesh>,
        properties: &DrawProperties,
    ) {
        let (Some(device), Some(shaders)) = (self.device.as_ref(), self.shaders.as_ref()) else {
            return;
        };

        let kind = properties.shader.unwrap_or(match ctx.draw_mode {
            DrawMode::Filled => ShaderKind::Default,
            DrawMode::Wireframe => ShaderKind::Wireframe,
        });
        let program = shaders.program(kind);

        device.apply_state(&kind.state_profile());
        device.use_program(program.program());

        for mesh in meshes {
            if let Some(selected) = properties.draw_selected {
                if !properties.draw_bounding_volumes && mesh.is_selected() != selected {
                    continue;
                }
            }

            let result = if properties.draw_bounding_volumes {
                match mesh.bounding_volume() {
                    Some(volume) => self.draw_mesh(ctx, volume.mesh(), program, properties),
                    None => Ok(()),
                }
            } else {
                self.draw_mesh(ctx, mesh, program, properties)
            };

            if let Err(e) = result {
                log::warn!("Skipped drawing mesh {:?}: {}", mesh.name, e);
            }
        }

        device.use_program(0);
    }

    /// Uploads attributes and uniforms for one mesh and issues its draw
    /// call. Meshes with neither an index nor a vertex buffer are skipped;
    /// afterwards every texture unit is explicitly unbound so no binding
    /// leaks into the next shader kind.
    fn draw_mesh(
        &self,
        ctx: &RenderContext,
        mesh: &Mesh,
        program: &ShaderProgram,
        properties: &DrawProperties,
    ) -> Result<(), ShaderError> {
        let device = match self.device.as_ref() {
            Some(device) => device,
            None => return Ok(()),
        };
        if !program.is_ok() {
            return Err(ShaderError::NotLinked);
        }
        if mesh.ibo() == 0 && mesh.vbo() == 0 {
            return Ok(());
        }

        program.update_attributes(mesh);
        program.update_uniforms(mesh, ctx, properties)?;

        let topology = match ctx.draw_mode {
            DrawMode::Filled => Topology::TriangleList,
            DrawMode::Wireframe => Topology::LineStrip,
        };
        if mesh.ibo() > 0 {
            device.draw_indexed(topology, mesh.ibo(), mesh.nr_of_indices());
        } else {
            device.draw_arrays(topology, mesh.vbo(), mesh.nr_of_vertices());
        }

        device.unbind_texture_units(MAX_TEXTURES as u32);
        Ok(())
    }

    // Runtime configuration surface.

    pub fn set_draw_mode(&self, ctx: &mut RenderContext, mode: DrawMode) {
        ctx.draw_mode = mode;
    }

    pub fn set_vsync(&mut self, ctx: &mut RenderContext, enabled: bool) {
        ctx.vsync = enabled;
        self.target.set_vsync(enabled);
    }

    pub fn set_srgb(&self, ctx: &mut RenderContext, enabled: bool) {
        ctx.enable_srgb = enabled;
    }

    pub fn set_canvas_size(&mut self, ctx: &mut RenderContext, width: u32, height: u32) {
        ctx.canvas = crate::context::Canvas::new((width, height));
        if let Some(device) = self.device.as_ref() {
            device.set_viewport(width, height);
        }
        if let Some(camera) = ctx.camera.as_mut() {
            camera.update_projection(ctx.canvas.aspect_ratio);
        }
    }

    pub fn set_field_of_view(&self, ctx: &mut RenderContext, degrees: f32) {
        if let Some(camera) = ctx.camera.as_mut() {
            camera.set_fov(degrees.to_radians());
            camera.update_projection(ctx.canvas.aspect_ratio);
        }
    }
}
