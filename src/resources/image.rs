//! Image decoding boundary.
//!
//! The engine consumes decoded RGBA pixel data only; file parsing is the
//! `image` crate's job. A failed decode surfaces as an error carrying the
//! offending path so the caller can report it.

use std::path::Path;

use anyhow::Context;
use image::GenericImageView;

/// Decoded pixel data: dimensions, tightly packed RGBA8 bytes and whether
/// the source image actually carried an alpha channel.
#[derive(Clone, Debug)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
    pub has_alpha: bool,
}

impl DecodedImage {
    /// A solid-color single-pixel image, used for the shared empty texture
    /// placeholders.
    pub fn solid(rgba: [u8; 4]) -> Self {
        Self {
            width: 1,
            height: 1,
            rgba: rgba.to_vec(),
            has_alpha: false,
        }
    }

    /// Flips the pixel rows vertically (some image sources store the first
    /// row at the bottom).
    pub fn flipped_vertically(&self) -> Self {
        let row_len = (self.width * 4) as usize;
        let mut rgba = Vec::with_capacity(self.rgba.len());
        for row in self.rgba.chunks(row_len).rev() {
            rgba.extend_from_slice(row);
        }
        Self {
            width: self.width,
            height: self.height,
            rgba,
            has_alpha: self.has_alpha,
        }
    }

    /// Mip chain length for this image: `floor(log2(max(w, h))) + 1`.
    pub fn mip_levels(&self) -> u32 {
        (self.width.max(self.height).max(1) as f32).log2().floor() as u32 + 1
    }
}

/// Decodes one image file into RGBA8.
pub fn load_image(path: &Path) -> anyhow::Result<DecodedImage> {
    let img = image::open(path).with_context(|| format!("Failed to decode image {:?}", path))?;
    let (width, height) = img.dimensions();
    let has_alpha = img.color().has_alpha();

    Ok(DecodedImage {
        width,
        height,
        rgba: img.to_rgba8().into_raw(),
        has_alpha,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mip_levels_follow_the_largest_dimension() {
        let mut image = DecodedImage::solid([255, 255, 255, 255]);
        assert_eq!(image.mip_levels(), 1);

        image.width = 256;
        image.height = 64;
        assert_eq!(image.mip_levels(), 9);

        image.width = 300;
        assert_eq!(image.mip_levels(), 9);
    }

    #[test]
    fn vertical_flip_reverses_rows() {
        let image = DecodedImage {
            width: 1,
            height: 2,
            rgba: vec![1, 1, 1, 1, 2, 2, 2, 2],
            has_alpha: false,
        };
        let flipped = image.flipped_vertically();
        assert_eq!(flipped.rgba, vec![2, 2, 2, 2, 1, 1, 1, 1]);
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(load_image(Path::new("no/such/image.png")).is_err());
    }
}
