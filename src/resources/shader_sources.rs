//! The shader resource table and source loading.
//!
//! Each shader kind maps to a vertex/fragment source pair under
//! `resources/shader/`; exactly one kind (the omni-directional depth shader)
//! adds a geometry stage, and the wireframe kind reuses the color sources.
//! The table order is fixed and matches [`ShaderKind`]'s discriminants.

use std::path::Path;

use anyhow::Context;

use crate::render::shader::{ShaderKind, SHADER_COUNT};

/// One entry of the shader resource table.
pub struct ShaderResource {
    pub kind: ShaderKind,
    pub vertex: &'static str,
    pub fragment: &'static str,
    pub geometry: Option<&'static str>,
}

pub const SHADER_RESOURCES: [ShaderResource; SHADER_COUNT] = [
    ShaderResource {
        kind: ShaderKind::Color,
        vertex: "resources/shader/color.vs.glsl",
        fragment: "resources/shader/color.fs.glsl",
        geometry: None,
    },
    ShaderResource {
        kind: ShaderKind::Default,
        vertex: "resources/shader/default.vs.glsl",
        fragment: "resources/shader/default.fs.glsl",
        geometry: None,
    },
    ShaderResource {
        kind: ShaderKind::Depth,
        vertex: "resources/shader/depth.vs.glsl",
        fragment: "resources/shader/depth.fs.glsl",
        geometry: None,
    },
    ShaderResource {
        kind: ShaderKind::DepthOmni,
        vertex: "resources/shader/depth.omni.vs.glsl",
        fragment: "resources/shader/depth.omni.fs.glsl",
        geometry: Some("resources/shader/depth.omni.gs.glsl"),
    },
    ShaderResource {
        kind: ShaderKind::Hud,
        vertex: "resources/shader/hud.vs.glsl",
        fragment: "resources/shader/hud.fs.glsl",
        geometry: None,
    },
    ShaderResource {
        kind: ShaderKind::Skybox,
        vertex: "resources/shader/skybox.vs.glsl",
        fragment: "resources/shader/skybox.fs.glsl",
        geometry: None,
    },
    ShaderResource {
        kind: ShaderKind::Wireframe,
        vertex: "resources/shader/color.vs.glsl",
        fragment: "resources/shader/color.fs.glsl",
        geometry: None,
    },
];

/// Reads a text resource; an empty file counts as missing.
pub fn load_text_file(path: &Path) -> anyhow::Result<String> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read text file {:?}", path))?;
    if text.trim().is_empty() {
        anyhow::bail!("Text file {:?} is empty", path);
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_table_order_matches_the_shader_kind_discriminants() {
        for (index, resource) in SHADER_RESOURCES.iter().enumerate() {
            assert_eq!(resource.kind as usize, index);
        }
    }

    #[test]
    fn only_the_omni_depth_shader_has_a_geometry_stage() {
        for resource in &SHADER_RESOURCES {
            assert_eq!(
                resource.geometry.is_some(),
                resource.kind == ShaderKind::DepthOmni
            );
        }
    }

    #[test]
    fn wireframe_reuses_the_color_sources() {
        let color = &SHADER_RESOURCES[ShaderKind::Color as usize];
        let wireframe = &SHADER_RESOURCES[ShaderKind::Wireframe as usize];
        assert_eq!(color.vertex, wireframe.vertex);
        assert_eq!(color.fragment, wireframe.fragment);
    }

    #[test]
    fn all_shader_sources_exist_and_are_non_empty() {
        for resource in &SHADER_RESOURCES {
            load_text_file(Path::new(resource.vertex)).unwrap();
            load_text_file(Path::new(resource.fragment)).unwrap();
            if let Some(geometry) = resource.geometry {
                load_text_file(Path::new(geometry)).unwrap();
            }
        }
    }
}
