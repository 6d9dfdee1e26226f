//! The render context: scene state, canvas info and runtime configuration.
//!
//! Everything the draw path reads lives in one [`RenderContext`] struct that
//! is constructed at startup, passed by reference into every draw and update
//! call, and torn down at shutdown. There is no process-wide mutable engine
//! state.

use std::rc::Rc;

use cgmath::Vector4;

use crate::scene::camera::Camera;
use crate::scene::light::LightSource;
use crate::scene::mesh::Mesh;
use crate::scene::model::Model;
use crate::scene::texture::Texture;
use crate::scene::MAX_LIGHT_SOURCES;

/// Fill policy for non-pinned draws.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DrawMode {
    #[default]
    Filled,
    Wireframe,
}

impl std::str::FromStr for DrawMode {
    type Err = String;

    fn from_str(mode: &str) -> Result<Self, Self::Err> {
        match mode {
            "Filled" => Ok(DrawMode::Filled),
            "Wireframe" => Ok(DrawMode::Wireframe),
            other => Err(format!("unknown draw mode {:?}", other)),
        }
    }
}

/// Recognized graphics backends. Only OpenGL is implemented; selecting any
/// other value fails fast with a distinct error instead of silently doing
/// nothing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GraphicsApi {
    OpenGL,
    DirectX11,
    DirectX12,
    Vulkan,
}

impl std::fmt::Display for GraphicsApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            GraphicsApi::OpenGL => "OpenGL",
            GraphicsApi::DirectX11 => "DirectX 11",
            GraphicsApi::DirectX12 => "DirectX 12",
            GraphicsApi::Vulkan => "Vulkan",
        };
        f.write_str(name)
    }
}

/// Identification strings of the GPU driving the context.
#[derive(Clone, Debug, Default)]
pub struct GpuDescription {
    pub renderer: String,
    pub vendor: String,
    pub version: String,
}

/// Canvas geometry of the rendering surface.
#[derive(Clone, Copy, Debug)]
pub struct Canvas {
    pub size: (u32, u32),
    pub aspect_ratio: f32,
}

impl Canvas {
    pub fn new(size: (u32, u32)) -> Self {
        Self {
            size,
            aspect_ratio: size.0 as f32 / size.1.max(1) as f32,
        }
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new((640, 360))
    }
}

/// Interface to the embedding window system.
///
/// Window creation and the event loop are the embedder's job; the engine
/// only needs a current graphics context and buffer swapping. A windowless
/// implementation backed by [`crate::render::headless::HeadlessDevice`] is
/// what tests use.
pub trait RenderTarget {
    fn size(&self) -> (u32, u32);

    /// Recreates the graphics context and hands out the device for it. The
    /// context must be current when this returns.
    fn create_context(&mut self) -> anyhow::Result<Rc<dyn crate::render::device::GraphicsDevice>>;

    fn swap_buffers(&mut self) -> anyhow::Result<()>;

    fn set_vsync(&mut self, enabled: bool);
}

/// All mutable scene and configuration state the draw path consumes.
pub struct RenderContext {
    pub canvas: Canvas,
    pub draw_mode: DrawMode,
    pub draw_bounding_volumes: bool,
    pub enable_srgb: bool,
    pub vsync: bool,
    pub gpu: GpuDescription,
    /// The main camera singleton. Implicit source of view/projection for
    /// every draw unless a light's point of view is used in a depth pass.
    /// Never owned by the scene tree, so model teardown cannot destroy it.
    pub camera: Option<Camera>,
    pub lights: [Option<LightSource>; MAX_LIGHT_SOURCES],
    pub models: Vec<Model>,
    pub huds: Vec<Mesh>,
    pub skybox: Option<Mesh>,
    /// Diffuse override color for the selected-object highlight pass.
    pub select_color: Vector4<f32>,
    pub empty_texture: Option<Rc<Texture>>,
    pub empty_cubemap: Option<Rc<Texture>>,
}

impl RenderContext {
    pub fn new() -> Self {
        Self {
            canvas: Canvas::default(),
            draw_mode: DrawMode::Filled,
            draw_bounding_volumes: false,
            enable_srgb: true,
            vsync: true,
            gpu: GpuDescription::default(),
            camera: None,
            lights: Default::default(),
            models: Vec::new(),
            huds: Vec::new(),
            skybox: None,
            select_color: Vector4::new(1.0, 0.5, 0.0, 1.0),
            empty_texture: None,
            empty_cubemap: None,
        }
    }

    /// Places a light in the first free slot; the slot index identifies the
    /// light's shadow-map layer. Fails when all slots are taken.
    pub fn add_light(&mut self, light: LightSource) -> anyhow::Result<usize> {
        match self.lights.iter().position(Option::is_none) {
            Some(slot) => {
                self.lights[slot] = Some(light);
                Ok(slot)
            }
            None => anyhow::bail!(
                "All {} light source slots are in use.",
                MAX_LIGHT_SOURCES
            ),
        }
    }

    pub fn active_light_count(&self) -> usize {
        self.lights
            .iter()
            .flatten()
            .filter(|light| light.is_active())
            .count()
    }

    /// Iterates every mesh of every model, the per-frame renderable list.
    pub fn renderables(&self) -> impl Iterator<Item = &Mesh> {
        self.models.iter().flat_map(|model| model.meshes().iter())
    }

    pub fn renderable_count(&self) -> usize {
        self.models.iter().map(|model| model.meshes().len()).sum()
    }
}

impl Default for RenderContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::light::{LightKind, LightSource};

    #[test]
    fn lights_fill_free_slots_in_order() {
        let mut ctx = RenderContext::new();
        let first = ctx.add_light(LightSource::new(LightKind::Directional)).unwrap();
        let second = ctx.add_light(LightSource::new(LightKind::Point)).unwrap();
        assert_eq!(first, 0);
        assert_eq!(second, 1);
        assert_eq!(ctx.active_light_count(), 2);

        ctx.lights[1].as_mut().unwrap().set_active(false);
        assert_eq!(ctx.active_light_count(), 1);
    }

    #[test]
    fn light_slots_are_bounded() {
        let mut ctx = RenderContext::new();
        for _ in 0..MAX_LIGHT_SOURCES {
            ctx.add_light(LightSource::new(LightKind::Point)).unwrap();
        }
        assert!(ctx.add_light(LightSource::new(LightKind::Point)).is_err());
    }

    #[test]
    fn canvas_derives_the_aspect_ratio() {
        let canvas = Canvas::new((640, 360));
        assert!((canvas.aspect_ratio - 640.0 / 360.0).abs() < 1e-6);
    }
}
