//! The OpenGL implementation of [`GraphicsDevice`], built on `glow`.
//!
//! This is the only module that talks to the GL API directly. Handles cross
//! the trait boundary as plain `u32` object names (0 = invalid), matching GL
//! semantics; internally they are wrapped back into `glow`'s non-zero handle
//! types.

use std::num::NonZeroU32;

use glow::{HasContext, PixelUnpackData};

use crate::context::GpuDescription;
use crate::render::device::{
    CullFace, DepthFunc, DepthMap, DepthMapTarget, GraphicsDevice, StageSources, StateProfile,
    TextureTarget, Topology,
};
use crate::render::shader::ShaderError;
use crate::resources::image::DecodedImage;

pub struct GlDevice {
    gl: glow::Context,
    // Core profiles refuse attribute setup without a bound vertex array.
    vao: Option<glow::NativeVertexArray>,
}

impl GlDevice {
    pub fn new(gl: glow::Context) -> Self {
        let vao = unsafe {
            let vao = gl.create_vertex_array().ok();
            gl.bind_vertex_array(vao);
            vao
        };
        Self { gl, vao }
    }

    /// Builds the device from a GL function loader, e.g. the one the
    /// window system exposes after making its context current.
    ///
    /// # Safety
    ///
    /// The matching GL context must be current on this thread and stay
    /// current for the lifetime of the device.
    pub unsafe fn from_loader(loader: impl FnMut(&str) -> *const std::os::raw::c_void) -> Self {
        Self::new(glow::Context::from_loader_function(loader))
    }

    fn buffer(id: u32) -> Option<glow::NativeBuffer> {
        NonZeroU32::new(id).map(glow::NativeBuffer)
    }

    fn texture(id: u32) -> Option<glow::NativeTexture> {
        NonZeroU32::new(id).map(glow::NativeTexture)
    }

    fn program(id: u32) -> Option<glow::NativeProgram> {
        NonZeroU32::new(id).map(glow::NativeProgram)
    }

    fn framebuffer(id: u32) -> Option<glow::NativeFramebuffer> {
        NonZeroU32::new(id).map(glow::NativeFramebuffer)
    }

    fn topology(topology: Topology) -> u32 {
        match topology {
            Topology::TriangleList => glow::TRIANGLES,
            Topology::LineStrip => glow::LINE_STRIP,
        }
    }

    fn texture_target(target: TextureTarget) -> u32 {
        match target {
            TextureTarget::TwoDim => glow::TEXTURE_2D,
            TextureTarget::TwoDimArray => glow::TEXTURE_2D_ARRAY,
            TextureTarget::Cubemap => glow::TEXTURE_CUBE_MAP,
            TextureTarget::CubemapArray => glow::TEXTURE_CUBE_MAP_ARRAY,
        }
    }
}

impl GraphicsDevice for GlDevice {
    fn description(&self) -> GpuDescription {
        unsafe {
            GpuDescription {
                renderer: self.gl.get_parameter_string(glow::RENDERER),
                vendor: self.gl.get_parameter_string(glow::VENDOR),
                version: format!("OpenGL {}", self.gl.get_parameter_string(glow::VERSION)),
            }
        }
    }

    fn set_viewport(&self, width: u32, height: u32) {
        unsafe {
            self.gl.viewport(0, 0, width as i32, height as i32);
            self.gl.enable(glow::MULTISAMPLE);
            self.gl.bind_vertex_array(self.vao);
        }
    }

    fn clear(&self, color: [f32; 4]) {
        unsafe {
            self.gl.clear_color(color[0], color[1], color[2], color[3]);
            self.gl.clear_stencil(0);
            self.gl.clear(
                glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT | glow::STENCIL_BUFFER_BIT,
            );
        }
    }

    fn apply_state(&self, profile: &StateProfile) {
        unsafe {
            match profile.depth_test {
                Some(func) => {
                    self.gl.enable(glow::DEPTH_TEST);
                    self.gl.depth_func(match func {
                        DepthFunc::Less => glow::LESS,
                        DepthFunc::LessEqual => glow::LEQUAL,
                    });
                    self.gl.depth_mask(true);
                }
                None => self.gl.disable(glow::DEPTH_TEST),
            }

            match profile.cull_face {
                Some(face) => {
                    self.gl.enable(glow::CULL_FACE);
                    self.gl.cull_face(match face {
                        CullFace::Back => glow::BACK,
                        CullFace::Front => glow::FRONT,
                    });
                    self.gl.front_face(glow::CCW);
                }
                None => self.gl.disable(glow::CULL_FACE),
            }

            if profile.blend {
                self.gl.enable(glow::BLEND);
                self.gl.blend_func(glow::SRC_ALPHA, glow::ONE_MINUS_SRC_ALPHA);
            } else {
                self.gl.disable(glow::BLEND);
            }

            if profile.depth_clamp {
                self.gl.enable(glow::DEPTH_CLAMP);
            } else {
                self.gl.disable(glow::DEPTH_CLAMP);
            }

            self.gl.disable(glow::STENCIL_TEST);
        }
    }

    fn create_index_buffer(&self, data: &[u32]) -> u32 {
        unsafe {
            let Ok(buffer) = self.gl.create_buffer() else {
                return 0;
            };
            self.gl
                .bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(buffer));
            self.gl.buffer_data_u8_slice(
                glow::ELEMENT_ARRAY_BUFFER,
                bytemuck::cast_slice(data),
                glow::STATIC_DRAW,
            );
            self.gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, None);
            buffer.0.get()
        }
    }

    fn create_array_buffer(&self, data: &[f32]) -> u32 {
        unsafe {
            let Ok(buffer) = self.gl.create_buffer() else {
                return 0;
            };
            self.gl.bind_buffer(glow::ARRAY_BUFFER, Some(buffer));
            self.gl.buffer_data_u8_slice(
                glow::ARRAY_BUFFER,
                bytemuck::cast_slice(data),
                glow::STATIC_DRAW,
            );
            self.gl.bind_buffer(glow::ARRAY_BUFFER, None);
            buffer.0.get()
        }
    }

    fn delete_buffer(&self, buffer: u32) {
        if let Some(buffer) = Self::buffer(buffer) {
            unsafe { self.gl.delete_buffer(buffer) };
        }
    }

    fn create_texture_2d(&self, image: &DecodedImage, options: &crate::render::device::TextureUpload) -> u32 {
        unsafe {
            let Ok(texture) = self.gl.create_texture() else {
                return 0;
            };
            self.gl.bind_texture(glow::TEXTURE_2D, Some(texture));

            let internal = if options.srgb {
                glow::SRGB8_ALPHA8
            } else {
                glow::RGBA8
            };
            let levels = options.mip_levels.max(1) as i32;

            self.gl
                .tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_BASE_LEVEL, 0);
            self.gl
                .tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAX_LEVEL, levels - 1);

            self.gl.tex_storage_2d(
                glow::TEXTURE_2D,
                levels,
                internal,
                image.width as i32,
                image.height as i32,
            );
            self.gl.tex_sub_image_2d(
                glow::TEXTURE_2D,
                0,
                0,
                0,
                image.width as i32,
                image.height as i32,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                PixelUnpackData::Slice(&image.rgba),
            );
            self.gl.generate_mipmap(glow::TEXTURE_2D);

            let wrap = if options.repeat && !options.transparent {
                glow::REPEAT
            } else {
                glow::CLAMP_TO_EDGE
            } as i32;
            self.gl
                .tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_S, wrap);
            self.gl
                .tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_T, wrap);
            self.gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_MIN_FILTER,
                glow::LINEAR_MIPMAP_LINEAR as i32,
            );
            self.gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_MAG_FILTER,
                glow::LINEAR as i32,
            );

            self.gl.bind_texture(glow::TEXTURE_2D, None);
            texture.0.get()
        }
    }

    fn create_texture_cubemap(&self, faces: &[DecodedImage], options: &crate::render::device::TextureUpload) -> u32 {
        if faces.len() != crate::scene::MAX_TEXTURES {
            return 0;
        }
        unsafe {
            let Ok(texture) = self.gl.create_texture() else {
                return 0;
            };
            self.gl.bind_texture(glow::TEXTURE_CUBE_MAP, Some(texture));

            let internal = if options.srgb {
                glow::SRGB8_ALPHA8
            } else {
                glow::RGBA8
            };

            self.gl
                .tex_parameter_i32(glow::TEXTURE_CUBE_MAP, glow::TEXTURE_BASE_LEVEL, 0);
            self.gl
                .tex_parameter_i32(glow::TEXTURE_CUBE_MAP, glow::TEXTURE_MAX_LEVEL, 0);

            for (index, face) in faces.iter().enumerate() {
                self.gl.tex_image_2d(
                    glow::TEXTURE_CUBE_MAP_POSITIVE_X + index as u32,
                    0,
                    internal as i32,
                    face.width as i32,
                    face.height as i32,
                    0,
                    glow::RGBA,
                    glow::UNSIGNED_BYTE,
                    Some(&face.rgba),
                );
            }

            for parameter in [
                glow::TEXTURE_WRAP_S,
                glow::TEXTURE_WRAP_T,
                glow::TEXTURE_WRAP_R,
            ] {
                self.gl.tex_parameter_i32(
                    glow::TEXTURE_CUBE_MAP,
                    parameter,
                    glow::CLAMP_TO_EDGE as i32,
                );
            }
            self.gl.tex_parameter_i32(
                glow::TEXTURE_CUBE_MAP,
                glow::TEXTURE_MIN_FILTER,
                glow::LINEAR as i32,
            );
            self.gl.tex_parameter_i32(
                glow::TEXTURE_CUBE_MAP,
                glow::TEXTURE_MAG_FILTER,
                glow::LINEAR as i32,
            );

            self.gl.bind_texture(glow::TEXTURE_CUBE_MAP, None);
            texture.0.get()
        }
    }

    fn delete_texture(&self, texture: u32) {
        if let Some(texture) = Self::texture(texture) {
            unsafe { self.gl.delete_texture(texture) };
        }
    }

    fn bind_texture(&self, unit: u32, target: TextureTarget, texture: u32) {
        unsafe {
            self.gl.active_texture(glow::TEXTURE0 + unit);
            self.gl
                .bind_texture(Self::texture_target(target), Self::texture(texture));
        }
    }

    fn unbind_texture_units(&self, units: u32) {
        unsafe {
            for unit in 0..units {
                self.gl.active_texture(glow::TEXTURE0 + unit);
                self.gl.bind_texture(glow::TEXTURE_2D, None);
                self.gl.bind_texture(glow::TEXTURE_CUBE_MAP, None);
            }
            self.gl.active_texture(glow::TEXTURE0);
        }
    }

    fn create_program(&self, name: &str, stages: &StageSources) -> Result<u32, ShaderError> {
        unsafe {
            let program = self.gl.create_program().map_err(|_| ShaderError::Allocate)?;

            let stage_list: [(&'static str, u32, &str); 3] = [
                ("vertex", glow::VERTEX_SHADER, &stages.vertex),
                ("fragment", glow::FRAGMENT_SHADER, &stages.fragment),
                ("geometry", glow::GEOMETRY_SHADER, &stages.geometry),
            ];

            let mut attached = Vec::new();
            for (stage, shader_type, source) in stage_list {
                if source.trim().is_empty() {
                    continue;
                }
                let shader = match self.gl.create_shader(shader_type) {
                    Ok(shader) => shader,
                    Err(_) => {
                        for shader in attached {
                            self.gl.delete_shader(shader);
                        }
                        self.gl.delete_program(program);
                        return Err(ShaderError::Allocate);
                    }
                };
                self.gl.shader_source(shader, source);
                self.gl.compile_shader(shader);
                if !self.gl.get_shader_compile_status(shader) {
                    let log = self.gl.get_shader_info_log(shader);
                    log::error!(
                        "Failed to compile the {} stage of the {} shader: {}",
                        stage,
                        name,
                        log
                    );
                    self.gl.delete_shader(shader);
                    for shader in attached {
                        self.gl.delete_shader(shader);
                    }
                    self.gl.delete_program(program);
                    return Err(ShaderError::Compile { stage, log });
                }
                self.gl.attach_shader(program, shader);
                attached.push(shader);
            }

            self.gl.link_program(program);
            if !self.gl.get_program_link_status(program) {
                let log = self.gl.get_program_info_log(program);
                log::error!("Failed to link the {} shader: {}", name, log);
                for shader in attached {
                    self.gl.delete_shader(shader);
                }
                self.gl.delete_program(program);
                return Err(ShaderError::Link(log));
            }

            for shader in attached {
                self.gl.detach_shader(program, shader);
                self.gl.delete_shader(shader);
            }
            Ok(program.0.get())
        }
    }

    fn delete_program(&self, program: u32) {
        if let Some(program) = Self::program(program) {
            unsafe { self.gl.delete_program(program) };
        }
    }

    fn use_program(&self, program: u32) {
        unsafe { self.gl.use_program(Self::program(program)) };
    }

    fn validate_program(&self, _program: u32) -> bool {
        // Post-upload sanity check: anything the upload sequence broke shows
        // up in the error queue.
        unsafe { self.gl.get_error() == glow::NO_ERROR }
    }

    fn attribute_location(&self, program: u32, name: &str) -> i32 {
        match Self::program(program) {
            Some(program) => unsafe {
                self.gl
                    .get_attrib_location(program, name)
                    .map_or(-1, |location| location as i32)
            },
            None => -1,
        }
    }

    fn uniform_location(&self, program: u32, name: &str) -> i32 {
        match Self::program(program) {
            Some(program) => unsafe {
                self.gl
                    .get_uniform_location(program, name)
                    .map_or(-1, |location| location.0 as i32)
            },
            None => -1,
        }
    }

    fn uniform_block_index(&self, program: u32, name: &str) -> i32 {
        match Self::program(program) {
            Some(program) => unsafe {
                self.gl
                    .get_uniform_block_index(program, name)
                    .map_or(-1, |index| index as i32)
            },
            None => -1,
        }
    }

    fn create_uniform_buffer(&self) -> u32 {
        unsafe {
            self.gl
                .create_buffer()
                .map_or(0, |buffer| buffer.0.get())
        }
    }

    fn write_uniform_block(&self, program: u32, block: i32, binding: u32, buffer: u32, data: &[u8]) {
        let (Some(program), Some(buffer)) = (Self::program(program), Self::buffer(buffer)) else {
            return;
        };
        if block < 0 {
            return;
        }
        unsafe {
            self.gl.uniform_block_binding(program, block as u32, binding);
            self.gl.bind_buffer(glow::UNIFORM_BUFFER, Some(buffer));
            self.gl
                .buffer_data_u8_slice(glow::UNIFORM_BUFFER, data, glow::DYNAMIC_DRAW);
            self.gl
                .bind_buffer_base(glow::UNIFORM_BUFFER, binding, Some(buffer));
            self.gl.bind_buffer(glow::UNIFORM_BUFFER, None);
        }
    }

    fn set_sampler_unit(&self, location: i32, unit: u32) {
        if location < 0 {
            return;
        }
        unsafe {
            self.gl.uniform_1_i32(
                Some(&glow::NativeUniformLocation(location as u32)),
                unit as i32,
            );
        }
    }

    fn bind_attribute(&self, buffer: u32, location: i32, components: i32) {
        let Some(buffer) = Self::buffer(buffer) else {
            return;
        };
        if location < 0 {
            return;
        }
        unsafe {
            self.gl.bind_buffer(glow::ARRAY_BUFFER, Some(buffer));
            self.gl.vertex_attrib_pointer_f32(
                location as u32,
                components,
                glow::FLOAT,
                false,
                0,
                0,
            );
            self.gl.enable_vertex_attrib_array(location as u32);
            self.gl.bind_buffer(glow::ARRAY_BUFFER, None);
        }
    }

    fn disable_attribute(&self, location: i32) {
        if location < 0 {
            return;
        }
        unsafe { self.gl.disable_vertex_attrib_array(location as u32) };
    }

    fn draw_indexed(&self, topology: Topology, index_buffer: u32, count: usize) {
        let Some(buffer) = Self::buffer(index_buffer) else {
            return;
        };
        unsafe {
            self.gl
                .bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(buffer));
            self.gl.draw_elements(
                Self::topology(topology),
                count as i32,
                glow::UNSIGNED_INT,
                0,
            );
            self.gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, None);
        }
    }

    fn draw_arrays(&self, topology: Topology, _vertex_buffer: u32, count: usize) {
        unsafe {
            self.gl
                .draw_arrays(Self::topology(topology), 0, count as i32);
        }
    }

    fn create_depth_map(&self, size: u32, layers: u32, target: DepthMapTarget) -> (u32, u32) {
        unsafe {
            let gl_target = match target {
                DepthMapTarget::Array2d => glow::TEXTURE_2D_ARRAY,
                DepthMapTarget::CubemapArray => glow::TEXTURE_CUBE_MAP_ARRAY,
            };

            let Ok(texture) = self.gl.create_texture() else {
                return (0, 0);
            };
            self.gl.bind_texture(gl_target, Some(texture));
            self.gl.tex_storage_3d(
                gl_target,
                1,
                glow::DEPTH_COMPONENT32F,
                size as i32,
                size as i32,
                layers as i32,
            );
            for parameter in [glow::TEXTURE_WRAP_S, glow::TEXTURE_WRAP_T, glow::TEXTURE_WRAP_R] {
                self.gl
                    .tex_parameter_i32(gl_target, parameter, glow::CLAMP_TO_EDGE as i32);
            }
            self.gl
                .tex_parameter_i32(gl_target, glow::TEXTURE_MIN_FILTER, glow::NEAREST as i32);
            self.gl
                .tex_parameter_i32(gl_target, glow::TEXTURE_MAG_FILTER, glow::NEAREST as i32);
            self.gl.bind_texture(gl_target, None);

            let Ok(framebuffer) = self.gl.create_framebuffer() else {
                self.gl.delete_texture(texture);
                return (0, 0);
            };
            self.gl
                .bind_framebuffer(glow::FRAMEBUFFER, Some(framebuffer));
            self.gl.framebuffer_texture(
                glow::FRAMEBUFFER,
                glow::DEPTH_ATTACHMENT,
                Some(texture),
                0,
            );
            self.gl.draw_buffer(glow::NONE);
            self.gl.read_buffer(glow::NONE);
            let complete = self.gl.check_framebuffer_status(glow::FRAMEBUFFER)
                == glow::FRAMEBUFFER_COMPLETE;
            self.gl.bind_framebuffer(glow::FRAMEBUFFER, None);

            if !complete {
                self.gl.delete_framebuffer(framebuffer);
                self.gl.delete_texture(texture);
                return (0, 0);
            }
            (framebuffer.0.get(), texture.0.get())
        }
    }

    fn delete_depth_map(&self, framebuffer: u32, texture: u32) {
        unsafe {
            if let Some(framebuffer) = Self::framebuffer(framebuffer) {
                self.gl.delete_framebuffer(framebuffer);
            }
            if let Some(texture) = Self::texture(texture) {
                self.gl.delete_texture(texture);
            }
        }
    }

    fn begin_depth_pass(&self, map: &DepthMap, layer: Option<u32>) {
        unsafe {
            self.gl
                .bind_framebuffer(glow::FRAMEBUFFER, Self::framebuffer(map.framebuffer()));
            match layer {
                Some(layer) => self.gl.framebuffer_texture_layer(
                    glow::FRAMEBUFFER,
                    glow::DEPTH_ATTACHMENT,
                    Self::texture(map.texture()),
                    0,
                    layer as i32,
                ),
                // Layered attachment; the geometry stage routes primitives
                // to their target layer.
                None => self.gl.framebuffer_texture(
                    glow::FRAMEBUFFER,
                    glow::DEPTH_ATTACHMENT,
                    Self::texture(map.texture()),
                    0,
                ),
            }
            self.gl.viewport(0, 0, map.size() as i32, map.size() as i32);
            self.gl.clear(glow::DEPTH_BUFFER_BIT);
        }
    }

    fn end_depth_pass(&self, canvas_size: (u32, u32)) {
        unsafe {
            self.gl.bind_framebuffer(glow::FRAMEBUFFER, None);
            self.gl
                .viewport(0, 0, canvas_size.0 as i32, canvas_size.1 as i32);
        }
    }
}

impl Drop for GlDevice {
    fn drop(&mut self) {
        if let Some(vao) = self.vao.take() {
            unsafe { self.gl.delete_vertex_array(vao) };
        }
    }
}
