//! Meshes: raw geometry arrays plus their GPU buffers.

use std::rc::Rc;

use crate::render::device::GraphicsDevice;
use crate::resources::model::MeshRecord;
use crate::scene::buffer::GeometryBuffer;
use crate::scene::geometry::{self, Shape};
use crate::scene::material::{Material, TextureBinding};
use crate::scene::texture::{Texture, TextureOptions};
use crate::scene::transform::{Spatial, Transform};
use crate::scene::{ComponentKind, MAX_TEXTURES};

/// Proxy geometry derived from a mesh's extent, drawn in debug passes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BoundingVolumeKind {
    Box,
    Sphere,
}

pub struct BoundingVolume {
    kind: BoundingVolumeKind,
    mesh: Mesh,
}

impl BoundingVolume {
    pub fn new(device: Rc<dyn GraphicsDevice>, kind: BoundingVolumeKind, scale: f32) -> Self {
        let shape = match kind {
            BoundingVolumeKind::Box => geometry::cube(scale),
            BoundingVolumeKind::Sphere => geometry::sphere(scale, 12, 12),
        };
        Self {
            kind,
            mesh: Mesh::from_shape(device, ComponentKind::Mesh, "BoundingVolume", shape),
        }
    }

    pub fn kind(&self) -> BoundingVolumeKind {
        self.kind
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }
}

/// A drawable entity.
///
/// GPU buffers are created lazily, one per non-empty raw array; the mesh is
/// renderable only once both an index buffer and a vertex buffer exist.
/// Construction from an imported record runs the fixed sequence raw arrays,
/// GPU buffers, bounding volume; the mesh is valid only if all of it
/// succeeded.
pub struct Mesh {
    transform: Transform,
    pub name: String,
    kind: ComponentKind,
    pub material: Material,
    textures: [TextureBinding; MAX_TEXTURES],
    indices: Vec<u32>,
    normals: Vec<f32>,
    texture_coords: Vec<f32>,
    vertices: Vec<f32>,
    index_buffer: Option<GeometryBuffer>,
    normal_buffer: Option<GeometryBuffer>,
    texture_coords_buffer: Option<GeometryBuffer>,
    vertex_buffer: Option<GeometryBuffer>,
    bounding_volume: Option<Box<BoundingVolume>>,
    selected: bool,
    max_extent: f32,
    valid: bool,
}

impl Mesh {
    fn empty(kind: ComponentKind, name: &str) -> Self {
        Self {
            transform: Transform::default(),
            name: name.to_string(),
            kind,
            material: Material::default(),
            textures: Default::default(),
            indices: Vec::new(),
            normals: Vec::new(),
            texture_coords: Vec::new(),
            vertices: Vec::new(),
            index_buffer: None,
            normal_buffer: None,
            texture_coords_buffer: None,
            vertex_buffer: None,
            bounding_volume: None,
            selected: false,
            max_extent: 0.0,
            valid: false,
        }
    }

    /// Builds a mesh from an imported record plus its node transform, then
    /// creates the GPU buffers and the bounding volume. Any failure leaves
    /// `is_valid() == false` and the caller discards the mesh.
    pub fn from_record(
        device: &Rc<dyn GraphicsDevice>,
        record: MeshRecord,
        empty_texture: Option<&Rc<Texture>>,
    ) -> Self {
        let mut mesh = Self::empty(ComponentKind::Mesh, &record.name);

        mesh.indices = record.indices;
        mesh.normals = record.normals;
        mesh.texture_coords = record.texture_coords;
        mesh.vertices = record.positions;
        mesh.material.textures[0] = record.diffuse_texture;
        mesh.material.textures[1] = record.specular_texture;

        mesh.create_buffers(device);

        mesh.move_to(record.position);
        mesh.scale_to(record.scale);
        mesh.rotate_to(record.rotation);

        mesh.update_max_extent();
        mesh.set_bounding_volume(device.clone(), BoundingVolumeKind::Box);

        for index in 0..MAX_TEXTURES {
            if let Some(file) = mesh.material.textures[index].clone() {
                if let Err(e) = mesh.load_texture_image(device.clone(), &file, index) {
                    log::error!("Failed to texture mesh {:?}: {}", mesh.name, e);
                }
            } else if let Some(empty) = empty_texture {
                mesh.textures[index] = TextureBinding::Shared(empty.clone());
            }
        }

        mesh.valid = mesh.is_ok();
        mesh
    }

    /// Builds a mesh from generated geometry (icons, HUD quads, skyboxes,
    /// bounding volumes).
    pub fn from_shape(
        device: Rc<dyn GraphicsDevice>,
        kind: ComponentKind,
        name: &str,
        shape: Shape,
    ) -> Self {
        let mut mesh = Self::empty(kind, name);
        mesh.indices = shape.indices;
        mesh.normals = shape.normals;
        mesh.texture_coords = shape.texture_coords;
        mesh.vertices = shape.vertices;
        mesh.create_buffers(&device);
        mesh.update_max_extent();
        mesh.valid = mesh.is_ok();
        mesh
    }

    /// A skybox: a unit cube around the camera with a cubemap in texture
    /// slot 0 built from six face images (+X, -X, +Y, -Y, +Z, -Z).
    pub fn skybox(device: Rc<dyn GraphicsDevice>, face_files: &[std::path::PathBuf]) -> Self {
        let mut mesh = Self::from_shape(
            device.clone(),
            ComponentKind::Skybox,
            "Skybox",
            geometry::cube(1.0),
        );
        let cubemap = Texture::cubemap_from_files(device, face_files, TextureOptions::default());
        if cubemap.is_ok() {
            mesh.textures[0] = TextureBinding::Owned(cubemap);
        } else {
            mesh.valid = false;
        }
        mesh
    }

    /// A HUD overlay quad in normalized device coordinates; position and
    /// size it through its transform.
    pub fn hud_quad(device: Rc<dyn GraphicsDevice>, name: &str) -> Self {
        Self::from_shape(device, ComponentKind::Hud, name, geometry::quad())
    }

    fn create_buffers(&mut self, device: &Rc<dyn GraphicsDevice>) {
        if !self.indices.is_empty() {
            self.index_buffer = Some(GeometryBuffer::from_indices(device.clone(), &self.indices));
        }
        if !self.normals.is_empty() {
            self.normal_buffer = Some(GeometryBuffer::from_floats(device.clone(), &self.normals));
        }
        if !self.texture_coords.is_empty() {
            self.texture_coords_buffer = Some(GeometryBuffer::from_floats(
                device.clone(),
                &self.texture_coords,
            ));
        }
        if !self.vertices.is_empty() {
            self.vertex_buffer = Some(GeometryBuffer::from_floats(device.clone(), &self.vertices));
        }
    }

    /// Decodes an image file into the given texture slot. Slot 0 is the
    /// diffuse map and decoded as sRGB.
    pub fn load_texture_image(
        &mut self,
        device: Rc<dyn GraphicsDevice>,
        file: &std::path::Path,
        index: usize,
    ) -> anyhow::Result<()> {
        if index >= MAX_TEXTURES {
            anyhow::bail!("texture slot {} out of range", index);
        }
        if self.texture_coords.is_empty() {
            anyhow::bail!("the mesh {:?} is missing texture coordinates", self.name);
        }

        let options = TextureOptions {
            srgb: index == 0,
            ..TextureOptions::default()
        };
        self.textures[index] = TextureBinding::Owned(Texture::from_file(device, file, options));
        Ok(())
    }

    /// Installs an already-built texture binding into a slot.
    pub fn load_texture(&mut self, binding: TextureBinding, index: usize) -> anyhow::Result<()> {
        if index >= MAX_TEXTURES {
            anyhow::bail!("texture slot {} out of range", index);
        }
        self.textures[index] = binding;
        Ok(())
    }

    pub fn set_bounding_volume(
        &mut self,
        device: Rc<dyn GraphicsDevice>,
        kind: BoundingVolumeKind,
    ) {
        self.bounding_volume = Some(Box::new(BoundingVolume::new(
            device,
            kind,
            self.max_extent + 0.01,
        )));
    }

    fn update_max_extent(&mut self) {
        self.max_extent = self
            .vertices
            .iter()
            .fold(0.0f32, |extent, &v| extent.max(v.abs()));
    }

    pub fn kind(&self) -> ComponentKind {
        self.kind
    }

    pub fn ibo(&self) -> u32 {
        self.index_buffer.as_ref().map_or(0, GeometryBuffer::id)
    }

    pub fn nbo(&self) -> u32 {
        self.normal_buffer.as_ref().map_or(0, GeometryBuffer::id)
    }

    pub fn tbo(&self) -> u32 {
        self.texture_coords_buffer
            .as_ref()
            .map_or(0, GeometryBuffer::id)
    }

    pub fn vbo(&self) -> u32 {
        self.vertex_buffer.as_ref().map_or(0, GeometryBuffer::id)
    }

    pub fn nr_of_indices(&self) -> usize {
        self.indices.len()
    }

    pub fn nr_of_vertices(&self) -> usize {
        self.vertices.len() / 3
    }

    /// Renderable only with both an index buffer and a vertex buffer.
    pub fn is_ok(&self) -> bool {
        self.ibo() > 0 && self.vbo() > 0
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }

    pub fn set_selected(&mut self, selected: bool) {
        self.selected = selected;
    }

    pub fn texture(&self, index: usize) -> Option<&Texture> {
        self.textures.get(index).and_then(TextureBinding::texture)
    }

    /// Out-of-range indices report untextured rather than panicking.
    pub fn is_textured(&self, index: usize) -> bool {
        self.textures
            .get(index)
            .is_some_and(TextureBinding::is_textured)
    }

    pub fn bounding_volume(&self) -> Option<&BoundingVolume> {
        self.bounding_volume.as_deref()
    }

    /// Keeps the bounding-volume proxy aligned with this mesh's transform.
    pub fn update_bounding_volume(&mut self) {
        let position = self.transform.position();
        let rotation = self.transform.rotation();
        let scale = self.transform.scale();
        if let Some(volume) = self.bounding_volume.as_deref_mut() {
            volume.mesh.move_to(position);
            volume.mesh.rotate_to(rotation);
            volume.mesh.scale_to(scale);
        }
    }

    pub fn max_extent(&self) -> f32 {
        self.max_extent
    }
}

impl Spatial for Mesh {
    fn transform(&self) -> &Transform {
        &self.transform
    }

    fn transform_mut(&mut self) -> &mut Transform {
        &mut self.transform
    }
}

impl std::fmt::Debug for Mesh {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mesh")
            .field("name", &self.name)
            .field("id", &self.transform.id())
            .field("indices", &self.indices.len())
            .field("vertices", &self.nr_of_vertices())
            .field("valid", &self.valid)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::headless::HeadlessDevice;
    use cgmath::Vector3 as V3;

    fn record(indices: Vec<u32>, positions: Vec<f32>) -> MeshRecord {
        MeshRecord {
            name: "test".into(),
            indices,
            normals: vec![0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0],
            positions,
            texture_coords: Vec::new(),
            position: V3::new(0.0, 0.0, 0.0),
            rotation: V3::new(0.0, 0.0, 0.0),
            scale: V3::new(1.0, 1.0, 1.0),
            diffuse_texture: None,
            specular_texture: None,
        }
    }

    fn device() -> Rc<dyn GraphicsDevice> {
        Rc::new(HeadlessDevice::new())
    }

    #[test]
    fn record_with_indices_and_vertices_is_renderable() {
        let device = device();
        let positions = vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 2.5, 0.0];
        let mesh = Mesh::from_record(&device, record(vec![0, 1, 2], positions), None);
        assert!(mesh.is_ok());
        assert!(mesh.is_valid());
        assert_eq!(mesh.nr_of_indices(), 3);
        assert_eq!(mesh.nr_of_vertices(), 3);
    }

    #[test]
    fn missing_indices_leave_the_mesh_invalid() {
        let device = device();
        let positions = vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        let mesh = Mesh::from_record(&device, record(Vec::new(), positions), None);
        assert!(!mesh.is_ok());
        assert!(!mesh.is_valid());
    }

    #[test]
    fn missing_vertices_leave_the_mesh_invalid() {
        let device = device();
        let mesh = Mesh::from_record(&device, record(vec![0, 1, 2], Vec::new()), None);
        assert!(!mesh.is_ok());
        assert!(!mesh.is_valid());
    }

    #[test]
    fn max_extent_is_the_largest_absolute_coordinate() {
        let device = device();
        let positions = vec![0.5, -4.0, 0.0, 1.0, 0.0, 0.0, 0.0, 2.5, 0.0];
        let mesh = Mesh::from_record(&device, record(vec![0, 1, 2], positions), None);
        assert_eq!(mesh.max_extent(), 4.0);
        let volume = mesh.bounding_volume().expect("bounding volume");
        assert_eq!(volume.kind(), BoundingVolumeKind::Box);
        assert!(volume.mesh().is_ok());
    }

    #[test]
    fn out_of_range_texture_slot_reports_untextured() {
        let device = device();
        let positions = vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        let mut mesh = Mesh::from_record(&device, record(vec![0, 1, 2], positions), None);
        assert!(!mesh.is_textured(MAX_TEXTURES));
        assert!(!mesh.is_textured(0));
        assert!(mesh
            .load_texture(TextureBinding::Unset, MAX_TEXTURES)
            .is_err());
    }

    #[test]
    fn shared_empty_texture_fills_unset_slots() {
        let device = device();
        let empty = Rc::new(Texture::empty(device.clone()));
        let positions = vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        let mesh = Mesh::from_record(&device, record(vec![0, 1, 2], positions), Some(&empty));
        // The placeholder is live GPU-side but has no image file, so the
        // slot still counts as untextured.
        assert!(mesh.texture(0).is_some());
        assert!(mesh.texture(0).unwrap().is_ok());
        assert!(!mesh.is_textured(0));
    }
}
