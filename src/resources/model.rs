//! Model import boundary.
//!
//! A model file turns into an ordered list of [`MeshRecord`]s: flat geometry
//! arrays, a decomposed node transform and the material texture paths
//! resolved relative to the model file's directory. The engine consumes the
//! records as opaque arrays; file parsing is `tobj`'s job.

use std::path::{Path, PathBuf};

use anyhow::Context;
use cgmath::Vector3;

/// One imported mesh: everything needed to build a scene mesh.
#[derive(Clone, Debug)]
pub struct MeshRecord {
    pub name: String,
    /// Triangle-list indices.
    pub indices: Vec<u32>,
    /// Three floats per vertex.
    pub normals: Vec<f32>,
    /// Three floats per vertex.
    pub positions: Vec<f32>,
    /// Two floats per vertex; empty when the file has no texture coords.
    pub texture_coords: Vec<f32>,
    pub position: Vector3<f32>,
    pub rotation: Vector3<f32>,
    pub scale: Vector3<f32>,
    /// Diffuse texture path, resolved relative to the model file.
    pub diffuse_texture: Option<PathBuf>,
    /// Specular texture path, resolved relative to the model file.
    pub specular_texture: Option<PathBuf>,
}

/// Imports a model file into mesh records. Zero records is an error; a
/// record that later fails to produce GPU buffers is the caller's problem
/// to discard.
pub fn load_model_file(model_file: &Path) -> anyhow::Result<Vec<MeshRecord>> {
    let (models, materials) = tobj::load_obj(
        model_file,
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
    )
    .with_context(|| format!("Failed to import model file {:?}", model_file))?;

    let materials = materials.unwrap_or_default();
    let base_dir = model_file.parent().unwrap_or_else(|| Path::new("."));

    let records: Vec<MeshRecord> = models
        .into_iter()
        .map(|model| {
            let (diffuse_texture, specular_texture) = match model
                .mesh
                .material_id
                .and_then(|id| materials.get(id))
            {
                Some(material) => (
                    material
                        .diffuse_texture
                        .as_ref()
                        .map(|file| base_dir.join(file)),
                    material
                        .specular_texture
                        .as_ref()
                        .map(|file| base_dir.join(file)),
                ),
                None => (None, None),
            };

            MeshRecord {
                name: if model.name.is_empty() {
                    "Mesh".to_string()
                } else {
                    model.name
                },
                indices: model.mesh.indices,
                normals: model.mesh.normals,
                positions: model.mesh.positions,
                texture_coords: model.mesh.texcoords,
                // Wavefront files carry no node transforms; the records
                // start at the identity and the caller repositions them.
                position: Vector3::new(0.0, 0.0, 0.0),
                rotation: Vector3::new(0.0, 0.0, 0.0),
                scale: Vector3::new(1.0, 1.0, 1.0),
                diffuse_texture,
                specular_texture,
            }
        })
        .collect();

    if records.is_empty() {
        anyhow::bail!("Model file {:?} contains no meshes", model_file);
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_is_an_error() {
        assert!(load_model_file(Path::new("no/such/file.obj")).is_err());
    }

    #[test]
    fn a_minimal_obj_yields_one_record() {
        let dir = std::env::temp_dir().join("vantage3d-model-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("triangle.obj");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "o Triangle").unwrap();
        writeln!(file, "v 0.0 0.0 0.0").unwrap();
        writeln!(file, "v 1.0 0.0 0.0").unwrap();
        writeln!(file, "v 0.0 1.0 0.0").unwrap();
        writeln!(file, "vn 0.0 0.0 1.0").unwrap();
        writeln!(file, "f 1//1 2//1 3//1").unwrap();
        drop(file);

        let records = load_model_file(&path).unwrap();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.indices.len(), 3);
        assert_eq!(record.positions.len(), 9);
        assert!(record.texture_coords.is_empty());
        assert!(record.diffuse_texture.is_none());
    }
}
