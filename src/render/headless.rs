//! A GPU-free graphics device for tests and CI.
//!
//! Allocates monotonically increasing fake object names and records every
//! state-changing call, so engine behavior (shader selection, state
//! switching, draw issuance, binding discipline) can be asserted without a
//! windowing system or a GPU. [`HeadlessTarget`] is the matching
//! [`RenderTarget`] implementation.

use std::cell::{Cell, Ref, RefCell};
use std::collections::HashSet;
use std::rc::Rc;

use crate::context::{GpuDescription, RenderTarget};
use crate::render::device::{
    DepthMap, DepthMapTarget, GraphicsDevice, StageSources, StateProfile, TextureTarget,
    TextureUpload, Topology,
};
use crate::render::shader::ShaderError;
use crate::resources::image::DecodedImage;

/// Everything the headless device observed.
#[derive(Debug, Default)]
pub struct Records {
    pub live_buffers: HashSet<u32>,
    pub live_textures: HashSet<u32>,
    pub live_programs: HashSet<u32>,
    /// Every `use_program` call, including the `0` unbinds.
    pub used_programs: Vec<u32>,
    pub applied_states: Vec<StateProfile>,
    pub draw_calls: Vec<(Topology, usize)>,
    /// `(program, binding point, byte length)` per uniform-block upload.
    pub uniform_writes: Vec<(u32, u32, usize)>,
    /// `(unit, target, texture)` per binding call; texture 0 = unbind.
    pub texture_bindings: Vec<(u32, TextureTarget, u32)>,
    pub unbind_sweeps: u32,
    pub clears: u32,
    pub depth_passes: u32,
    pub viewport: (u32, u32),
}

pub struct HeadlessDevice {
    next_id: Cell<u32>,
    records: RefCell<Records>,
}

impl HeadlessDevice {
    pub fn new() -> Self {
        Self {
            next_id: Cell::new(1),
            records: RefCell::new(Records::default()),
        }
    }

    fn next(&self) -> u32 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }

    pub fn records(&self) -> Ref<'_, Records> {
        self.records.borrow()
    }
}

impl Default for HeadlessDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphicsDevice for HeadlessDevice {
    fn description(&self) -> GpuDescription {
        GpuDescription {
            renderer: "Headless".to_string(),
            vendor: "vantage3d".to_string(),
            version: "OpenGL (headless)".to_string(),
        }
    }

    fn set_viewport(&self, width: u32, height: u32) {
        self.records.borrow_mut().viewport = (width, height);
    }

    fn clear(&self, _color: [f32; 4]) {
        self.records.borrow_mut().clears += 1;
    }

    fn apply_state(&self, profile: &StateProfile) {
        self.records.borrow_mut().applied_states.push(*profile);
    }

    fn create_index_buffer(&self, data: &[u32]) -> u32 {
        if data.is_empty() {
            return 0;
        }
        let id = self.next();
        self.records.borrow_mut().live_buffers.insert(id);
        id
    }

    fn create_array_buffer(&self, data: &[f32]) -> u32 {
        if data.is_empty() {
            return 0;
        }
        let id = self.next();
        self.records.borrow_mut().live_buffers.insert(id);
        id
    }

    fn delete_buffer(&self, buffer: u32) {
        self.records.borrow_mut().live_buffers.remove(&buffer);
    }

    fn create_texture_2d(&self, image: &DecodedImage, _options: &TextureUpload) -> u32 {
        if image.rgba.is_empty() {
            return 0;
        }
        let id = self.next();
        self.records.borrow_mut().live_textures.insert(id);
        id
    }

    fn create_texture_cubemap(&self, faces: &[DecodedImage], _options: &TextureUpload) -> u32 {
        if faces.len() != crate::scene::MAX_TEXTURES {
            return 0;
        }
        let id = self.next();
        self.records.borrow_mut().live_textures.insert(id);
        id
    }

    fn delete_texture(&self, texture: u32) {
        self.records.borrow_mut().live_textures.remove(&texture);
    }

    fn bind_texture(&self, unit: u32, target: TextureTarget, texture: u32) {
        self.records
            .borrow_mut()
            .texture_bindings
            .push((unit, target, texture));
    }

    fn unbind_texture_units(&self, units: u32) {
        let mut records = self.records.borrow_mut();
        for unit in 0..units {
            records.texture_bindings.push((unit, TextureTarget::TwoDim, 0));
            records
                .texture_bindings
                .push((unit, TextureTarget::Cubemap, 0));
        }
        records.unbind_sweeps += 1;
    }

    fn create_program(&self, _name: &str, stages: &StageSources) -> Result<u32, ShaderError> {
        // The headless stand-in for a compiler: the `#error` directive (and
        // nothing else) breaks a stage.
        for (stage, source) in [
            ("vertex", &stages.vertex),
            ("fragment", &stages.fragment),
            ("geometry", &stages.geometry),
        ] {
            if source.contains("#error") {
                return Err(ShaderError::Compile {
                    stage,
                    log: "#error directive".to_string(),
                });
            }
        }
        if stages.vertex.trim().is_empty() || stages.fragment.trim().is_empty() {
            return Err(ShaderError::MissingStage);
        }
        let id = self.next();
        self.records.borrow_mut().live_programs.insert(id);
        Ok(id)
    }

    fn delete_program(&self, program: u32) {
        self.records.borrow_mut().live_programs.remove(&program);
    }

    fn use_program(&self, program: u32) {
        self.records.borrow_mut().used_programs.push(program);
    }

    fn validate_program(&self, program: u32) -> bool {
        self.records.borrow().live_programs.contains(&program)
    }

    // The headless programs declare every known attribute and uniform, at
    // the same deterministic locations for every program.

    fn attribute_location(&self, _program: u32, name: &str) -> i32 {
        match name {
            "VertexNormal" => 0,
            "VertexPosition" => 1,
            "VertexTextureCoords" => 2,
            _ => -1,
        }
    }

    fn uniform_location(&self, _program: u32, name: &str) -> i32 {
        match name {
            "Textures[0]" => 5,
            "Textures[1]" => 6,
            "Textures[2]" => 7,
            "Textures[3]" => 8,
            "Textures[4]" => 9,
            "Textures[5]" => 10,
            "DepthMap2D" => 11,
            "DepthMapCube" => 12,
            _ => -1,
        }
    }

    fn uniform_block_index(&self, _program: u32, name: &str) -> i32 {
        match name {
            "MatrixBuffer" => 0,
            "ColorBuffer" => 1,
            "DefaultBuffer" => 2,
            "DepthBuffer" => 3,
            "HUDBuffer" => 4,
            _ => -1,
        }
    }

    fn create_uniform_buffer(&self) -> u32 {
        let id = self.next();
        self.records.borrow_mut().live_buffers.insert(id);
        id
    }

    fn write_uniform_block(
        &self,
        program: u32,
        _block: i32,
        binding: u32,
        _buffer: u32,
        data: &[u8],
    ) {
        self.records
            .borrow_mut()
            .uniform_writes
            .push((program, binding, data.len()));
    }

    fn set_sampler_unit(&self, _location: i32, _unit: u32) {}

    fn bind_attribute(&self, _buffer: u32, _location: i32, _components: i32) {}

    fn disable_attribute(&self, _location: i32) {}

    fn draw_indexed(&self, topology: Topology, _index_buffer: u32, count: usize) {
        self.records.borrow_mut().draw_calls.push((topology, count));
    }

    fn draw_arrays(&self, topology: Topology, _vertex_buffer: u32, count: usize) {
        self.records.borrow_mut().draw_calls.push((topology, count));
    }

    fn create_depth_map(&self, _size: u32, _layers: u32, _target: DepthMapTarget) -> (u32, u32) {
        let framebuffer = self.next();
        let texture = self.next();
        self.records.borrow_mut().live_textures.insert(texture);
        (framebuffer, texture)
    }

    fn delete_depth_map(&self, _framebuffer: u32, texture: u32) {
        self.records.borrow_mut().live_textures.remove(&texture);
    }

    fn begin_depth_pass(&self, _map: &DepthMap, _layer: Option<u32>) {
        self.records.borrow_mut().depth_passes += 1;
    }

    fn end_depth_pass(&self, canvas_size: (u32, u32)) {
        self.records.borrow_mut().viewport = canvas_size;
    }
}

/// A windowless render target backed by a [`HeadlessDevice`]. Keep a clone
/// of the device handle around to inspect the records afterwards.
pub struct HeadlessTarget {
    size: (u32, u32),
    device: Rc<HeadlessDevice>,
    pub swaps: u32,
    pub vsync: Option<bool>,
}

impl HeadlessTarget {
    pub fn new(size: (u32, u32)) -> Self {
        Self {
            size,
            device: Rc::new(HeadlessDevice::new()),
            swaps: 0,
            vsync: None,
        }
    }

    pub fn device(&self) -> Rc<HeadlessDevice> {
        self.device.clone()
    }
}

impl RenderTarget for HeadlessTarget {
    fn size(&self) -> (u32, u32) {
        self.size
    }

    fn create_context(&mut self) -> anyhow::Result<Rc<dyn GraphicsDevice>> {
        Ok(self.device.clone())
    }

    fn swap_buffers(&mut self) -> anyhow::Result<()> {
        self.swaps += 1;
        Ok(())
    }

    fn set_vsync(&mut self, enabled: bool) {
        self.vsync = Some(enabled);
    }
}
