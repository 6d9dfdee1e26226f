//! Surface material state and texture slot bindings.

use std::path::PathBuf;
use std::rc::Rc;

use cgmath::{Vector3, Vector4};

use crate::scene::texture::Texture;
use crate::scene::MAX_TEXTURES;

/// Specular reflection parameters.
#[derive(Clone, Debug)]
pub struct Specular {
    pub intensity: Vector3<f32>,
    pub shininess: f32,
}

impl Default for Specular {
    fn default() -> Self {
        Self {
            intensity: Vector3::new(0.1, 0.1, 0.1),
            shininess: 32.0,
        }
    }
}

/// Material state of a scene entity: colors plus the texture file names the
/// importer associated with it.
#[derive(Clone, Debug)]
pub struct Material {
    pub ambient: Vector3<f32>,
    pub diffuse: Vector4<f32>,
    pub specular: Specular,
    pub textures: [Option<PathBuf>; MAX_TEXTURES],
}

impl Default for Material {
    fn default() -> Self {
        Self {
            ambient: Vector3::new(0.8, 0.8, 0.8),
            diffuse: Vector4::new(0.8, 0.8, 0.8, 1.0),
            specular: Specular::default(),
            textures: Default::default(),
        }
    }
}

/// A texture slot binding.
///
/// `Owned` textures belong to the holding entity and release their GPU
/// object when the entity drops. `Shared` is the distinct non-owned form for
/// the engine-wide empty placeholder textures: dropping the binding only
/// drops the reference, never the underlying GPU object, so a mesh can never
/// free the shared placeholder.
#[derive(Debug, Default)]
pub enum TextureBinding {
    #[default]
    Unset,
    Owned(Texture),
    Shared(Rc<Texture>),
}

impl TextureBinding {
    pub fn texture(&self) -> Option<&Texture> {
        match self {
            TextureBinding::Unset => None,
            TextureBinding::Owned(texture) => Some(texture),
            TextureBinding::Shared(texture) => Some(texture),
        }
    }

    /// A slot counts as textured only when it holds a live GPU object that
    /// was loaded from an actual image file. The shared empty placeholders
    /// are generated, carry no file, and therefore never count.
    pub fn is_textured(&self) -> bool {
        match self.texture() {
            Some(texture) => texture.id() > 0 && texture.image_file(0).is_some(),
            None => false,
        }
    }
}
