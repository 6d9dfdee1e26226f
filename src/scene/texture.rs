//! GPU texture resources: single 2D images and six-face cubemaps.
//!
//! Construction is also upload: the GPU object is created and filled by the
//! constructor and released on drop; there is no separate upload step. A
//! texture that failed to construct keeps GPU id 0 and reports
//! `is_ok() == false` instead of being partially populated.

use std::path::{Path, PathBuf};
use std::rc::Rc;

use cgmath::Vector2;

use crate::render::device::{GraphicsDevice, TextureTarget, TextureUpload};
use crate::resources::image::{load_image, DecodedImage};
use crate::scene::MAX_TEXTURES;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextureKind {
    TwoDim,
    Cubemap,
}

/// Creation options; `scale` is the 2D tiling factor handed to shaders.
#[derive(Clone, Copy, Debug)]
pub struct TextureOptions {
    pub srgb: bool,
    pub repeat: bool,
    pub flip_y: bool,
    pub transparent: bool,
    pub scale: Vector2<f32>,
}

impl Default for TextureOptions {
    fn default() -> Self {
        Self {
            srgb: false,
            repeat: true,
            flip_y: false,
            transparent: false,
            scale: Vector2::new(1.0, 1.0),
        }
    }
}

pub struct Texture {
    device: Rc<dyn GraphicsDevice>,
    id: u32,
    kind: TextureKind,
    image_files: Vec<PathBuf>,
    repeat: bool,
    flip_y: bool,
    srgb: bool,
    transparent: bool,
    pub scale: Vector2<f32>,
    mip_levels: u32,
    size: (u32, u32),
}

impl Texture {
    /// Creates a 2D texture from already-decoded pixels.
    ///
    /// The transparency flag only sticks when it was requested *and* the
    /// decoded image actually carries an alpha channel.
    pub fn from_image(
        device: Rc<dyn GraphicsDevice>,
        image: DecodedImage,
        image_file: Option<PathBuf>,
        options: TextureOptions,
    ) -> Self {
        let image = if options.flip_y {
            image.flipped_vertically()
        } else {
            image
        };
        let transparent = options.transparent && image.has_alpha;
        let mip_levels = image.mip_levels();

        let id = device.create_texture_2d(
            &image,
            &TextureUpload {
                srgb: options.srgb,
                repeat: options.repeat && !transparent,
                transparent,
                mip_levels,
            },
        );

        Self {
            device,
            id,
            kind: TextureKind::TwoDim,
            image_files: image_file.into_iter().collect(),
            repeat: options.repeat,
            flip_y: options.flip_y,
            srgb: options.srgb,
            transparent,
            scale: options.scale,
            mip_levels,
            size: (image.width, image.height),
        }
    }

    /// Decodes and uploads a 2D texture from a file. A failed decode leaves
    /// the texture invalid (id 0) rather than partially constructed.
    pub fn from_file(
        device: Rc<dyn GraphicsDevice>,
        image_file: &Path,
        options: TextureOptions,
    ) -> Self {
        match load_image(image_file) {
            Ok(image) => Self::from_image(device, image, Some(image_file.to_path_buf()), options),
            Err(e) => {
                log::error!("Failed to load texture {:?}: {}", image_file, e);
                Self::invalid(device, TextureKind::TwoDim, options)
            }
        }
    }

    /// Builds a cubemap from exactly six image files in the fixed face order
    /// +X, -X, +Y, -Y, +Z, -Z. Anything short of six valid decoded images
    /// leaves the texture invalid; there is no partially populated cubemap.
    pub fn cubemap_from_files(
        device: Rc<dyn GraphicsDevice>,
        image_files: &[PathBuf],
        options: TextureOptions,
    ) -> Self {
        // Cubemaps are always treated as sRGB color data.
        let options = TextureOptions {
            srgb: true,
            ..options
        };

        if image_files.len() != MAX_TEXTURES {
            log::error!(
                "A cubemap needs exactly {} faces, got {}",
                MAX_TEXTURES,
                image_files.len()
            );
            return Self::invalid(device, TextureKind::Cubemap, options);
        }

        let mut faces = Vec::with_capacity(MAX_TEXTURES);
        for file in image_files {
            match load_image(file) {
                Ok(image) => {
                    faces.push(if options.flip_y {
                        image.flipped_vertically()
                    } else {
                        image
                    });
                }
                Err(e) => log::error!("Failed to load cubemap face {:?}: {}", file, e),
            }
        }

        if faces.len() != MAX_TEXTURES {
            return Self::invalid(device, TextureKind::Cubemap, options);
        }

        let transparent = options.transparent && faces.iter().all(|face| face.has_alpha);
        let id = device.create_texture_cubemap(
            &faces,
            &TextureUpload {
                srgb: options.srgb,
                repeat: false,
                transparent,
                mip_levels: 1,
            },
        );

        Self {
            device,
            id,
            kind: TextureKind::Cubemap,
            image_files: image_files.to_vec(),
            repeat: options.repeat,
            flip_y: options.flip_y,
            srgb: options.srgb,
            transparent,
            scale: options.scale,
            mip_levels: 1,
            size: (faces[0].width, faces[0].height),
        }
    }

    /// The engine-wide empty placeholder: a generated single white pixel
    /// with no backing file, so slots holding it never count as textured.
    pub fn empty(device: Rc<dyn GraphicsDevice>) -> Self {
        Self::from_image(
            device,
            DecodedImage::solid([255, 255, 255, 255]),
            None,
            TextureOptions::default(),
        )
    }

    /// Cubemap counterpart of [`Texture::empty`].
    pub fn empty_cubemap(device: Rc<dyn GraphicsDevice>) -> Self {
        let face = DecodedImage::solid([255, 255, 255, 255]);
        let faces = vec![face; MAX_TEXTURES];
        let id = device.create_texture_cubemap(
            &faces,
            &TextureUpload {
                srgb: true,
                repeat: false,
                transparent: false,
                mip_levels: 1,
            },
        );
        Self {
            device,
            id,
            kind: TextureKind::Cubemap,
            image_files: Vec::new(),
            repeat: false,
            flip_y: false,
            srgb: true,
            transparent: false,
            scale: Vector2::new(1.0, 1.0),
            mip_levels: 1,
            size: (1, 1),
        }
    }

    fn invalid(device: Rc<dyn GraphicsDevice>, kind: TextureKind, options: TextureOptions) -> Self {
        Self {
            device,
            id: 0,
            kind,
            image_files: Vec::new(),
            repeat: options.repeat,
            flip_y: options.flip_y,
            srgb: options.srgb,
            transparent: false,
            scale: options.scale,
            mip_levels: 1,
            size: (0, 0),
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn is_ok(&self) -> bool {
        self.id > 0
    }

    pub fn kind(&self) -> TextureKind {
        self.kind
    }

    pub fn target(&self) -> TextureTarget {
        match self.kind {
            TextureKind::TwoDim => TextureTarget::TwoDim,
            TextureKind::Cubemap => TextureTarget::Cubemap,
        }
    }

    pub fn image_file(&self, index: usize) -> Option<&Path> {
        self.image_files.get(index).map(PathBuf::as_path)
    }

    pub fn mip_levels(&self) -> u32 {
        self.mip_levels
    }

    pub fn repeat(&self) -> bool {
        self.repeat
    }

    pub fn flip_y(&self) -> bool {
        self.flip_y
    }

    pub fn srgb(&self) -> bool {
        self.srgb
    }

    pub fn transparent(&self) -> bool {
        self.transparent
    }

    pub fn size(&self) -> (u32, u32) {
        self.size
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        if self.id > 0 {
            self.device.delete_texture(self.id);
        }
    }
}

impl std::fmt::Debug for Texture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Texture")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("size", &self.size)
            .field("mip_levels", &self.mip_levels)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::headless::HeadlessDevice;
    use crate::scene::material::TextureBinding;

    fn devices() -> (Rc<HeadlessDevice>, Rc<dyn GraphicsDevice>) {
        let concrete = Rc::new(HeadlessDevice::new());
        let device: Rc<dyn GraphicsDevice> = concrete.clone();
        (concrete, device)
    }

    fn test_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join("vantage3d-texture-test").join(name);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_rgba_png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
        let path = dir.join(name);
        let pixels = vec![128u8; (width * height * 4) as usize];
        image::save_buffer(&path, &pixels, width, height, image::ColorType::Rgba8).unwrap();
        path
    }

    fn write_rgb_png(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        image::save_buffer(&path, &[10, 20, 30], 1, 1, image::ColorType::Rgb8).unwrap();
        path
    }

    #[test]
    fn a_decoded_image_yields_a_live_texture() {
        let (_, device) = devices();
        let dir = test_dir("valid-2d");
        let file = write_rgba_png(&dir, "pixel.png", 4, 2);

        let texture = Texture::from_file(device, &file, TextureOptions::default());
        assert!(texture.is_ok());
        assert_eq!(texture.kind(), TextureKind::TwoDim);
        assert_eq!(texture.size(), (4, 2));
        assert_eq!(texture.mip_levels(), 3);
        assert_eq!(texture.image_file(0), Some(file.as_path()));
    }

    #[test]
    fn a_failed_decode_leaves_the_texture_invalid() {
        let (_, device) = devices();
        let texture = Texture::from_file(
            device,
            Path::new("no/such/texture.png"),
            TextureOptions::default(),
        );
        assert_eq!(texture.id(), 0);
        assert!(!texture.is_ok());
    }

    #[test]
    fn transparency_requires_an_actual_alpha_channel() {
        let (_, device) = devices();
        let dir = test_dir("alpha");
        let with_alpha = write_rgba_png(&dir, "rgba.png", 1, 1);
        let without_alpha = write_rgb_png(&dir, "rgb.png");

        let options = TextureOptions {
            transparent: true,
            ..TextureOptions::default()
        };

        let texture = Texture::from_file(device.clone(), &with_alpha, options);
        assert!(texture.transparent());

        let texture = Texture::from_file(device, &without_alpha, options);
        assert!(!texture.transparent());
    }

    #[test]
    fn a_cubemap_needs_exactly_six_valid_faces() {
        let (_, device) = devices();
        let dir = test_dir("cubemap");
        let faces: Vec<PathBuf> = (0..MAX_TEXTURES)
            .map(|i| write_rgba_png(&dir, &format!("face{}.png", i), 1, 1))
            .collect();

        let complete =
            Texture::cubemap_from_files(device.clone(), &faces, TextureOptions::default());
        assert!(complete.is_ok());
        assert_eq!(complete.kind(), TextureKind::Cubemap);
        assert!(complete.srgb());

        let short = Texture::cubemap_from_files(
            device.clone(),
            &faces[..MAX_TEXTURES - 1],
            TextureOptions::default(),
        );
        assert_eq!(short.id(), 0);
        assert!(!short.is_ok());

        let mut broken = faces.clone();
        broken[3] = dir.join("missing.png");
        let broken = Texture::cubemap_from_files(device, &broken, TextureOptions::default());
        assert_eq!(broken.id(), 0);
        assert!(!broken.is_ok());
    }

    #[test]
    fn owned_textures_release_their_gpu_object_on_drop() {
        let (concrete, device) = devices();
        let id = {
            let texture = Texture::empty(device);
            assert!(texture.is_ok());
            texture.id()
        };
        assert!(!concrete.records().live_textures.contains(&id));
    }

    #[test]
    fn shared_bindings_never_free_the_placeholder() {
        let (concrete, device) = devices();
        let placeholder = Rc::new(Texture::empty(device));
        let id = placeholder.id();

        let binding = TextureBinding::Shared(placeholder.clone());
        drop(binding);
        assert!(concrete.records().live_textures.contains(&id));

        drop(placeholder);
        assert!(!concrete.records().live_textures.contains(&id));
    }
}
