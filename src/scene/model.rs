//! Models: the tree node grouping all meshes imported from one file.

use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::render::device::GraphicsDevice;
use crate::resources::model::load_model_file;
use crate::scene::mesh::Mesh;
use crate::scene::texture::Texture;
use crate::scene::transform::{Spatial, Transform};
use crate::scene::ComponentKind;

/// A model owns the meshes imported from one model file, exclusively: a
/// dropped model drops its meshes and their GPU buffers with it. Cameras are
/// never owned by the tree, so nothing here can cascade into the camera
/// singleton.
pub struct Model {
    transform: Transform,
    model_file: PathBuf,
    meshes: Vec<Mesh>,
}

impl Model {
    /// Imports a model file and turns every usable record into a mesh.
    /// Records that fail to produce a valid, GPU-buffer-backed mesh are
    /// discarded with a warning. A model with zero usable meshes is an
    /// error.
    pub fn load(
        device: &Rc<dyn GraphicsDevice>,
        model_file: &Path,
        empty_texture: Option<&Rc<Texture>>,
    ) -> anyhow::Result<Self> {
        let records = load_model_file(model_file)?;

        let meshes: Vec<Mesh> = records
            .into_iter()
            .enumerate()
            .filter_map(|(idx, record)| {
                let mesh = Mesh::from_record(device, record, empty_texture);
                if mesh.is_valid() {
                    Some(mesh)
                } else {
                    log::warn!(
                        "Mesh at index {} in file {:?} was discarded: no usable geometry buffers.",
                        idx,
                        model_file
                    );
                    None
                }
            })
            .collect();

        if meshes.is_empty() {
            anyhow::bail!("No usable meshes in model file {:?}", model_file);
        }

        Ok(Self {
            transform: Transform::default(),
            model_file: model_file.to_path_buf(),
            meshes,
        })
    }

    /// Wraps already-built meshes (generated geometry, tests).
    pub fn from_meshes(meshes: Vec<Mesh>) -> Self {
        Self {
            transform: Transform::default(),
            model_file: PathBuf::new(),
            meshes,
        }
    }

    pub fn kind(&self) -> ComponentKind {
        ComponentKind::Model
    }

    pub fn model_file(&self) -> &Path {
        &self.model_file
    }

    pub fn is_valid(&self) -> bool {
        !self.meshes.is_empty()
    }

    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    pub fn meshes_mut(&mut self) -> &mut [Mesh] {
        &mut self.meshes
    }

    /// Takes ownership of another mesh.
    pub fn add_mesh(&mut self, mesh: Mesh) {
        self.meshes.push(mesh);
    }

    pub fn mesh_index(&self, id: u32) -> Option<usize> {
        self.meshes
            .iter()
            .position(|mesh| mesh.transform().id() == id)
    }

    /// Detaches a mesh by id without destroying it.
    pub fn remove_mesh(&mut self, id: u32) -> Option<Mesh> {
        let index = self.mesh_index(id)?;
        Some(self.meshes.remove(index))
    }
}

impl Spatial for Model {
    fn transform(&self) -> &Transform {
        &self.transform
    }

    fn transform_mut(&mut self) -> &mut Transform {
        &mut self.transform
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::headless::HeadlessDevice;
    use crate::scene::geometry;

    fn cube_mesh(device: &Rc<dyn GraphicsDevice>) -> Mesh {
        Mesh::from_shape(
            device.clone(),
            ComponentKind::Mesh,
            "cube",
            geometry::cube(1.0),
        )
    }

    #[test]
    fn remove_mesh_detaches_without_destroying() {
        let device: Rc<dyn GraphicsDevice> = Rc::new(HeadlessDevice::new());
        let mesh = cube_mesh(&device);
        let id = mesh.transform().id();
        let mut model = Model::from_meshes(vec![mesh, cube_mesh(&device)]);

        let removed = model.remove_mesh(id).expect("mesh present");
        assert_eq!(removed.transform().id(), id);
        assert!(removed.is_ok(), "detached mesh keeps its GPU buffers");
        assert_eq!(model.meshes().len(), 1);
        assert!(model.remove_mesh(id).is_none());
    }

    #[test]
    fn missing_model_file_is_an_error() {
        let device: Rc<dyn GraphicsDevice> = Rc::new(HeadlessDevice::new());
        assert!(Model::load(&device, Path::new("no/such/model.obj"), None).is_err());
    }
}
