//! Texture decoding and upload helpers.
//!
//! Decoding happens on the CPU via the [image] crate; the resulting RGBA8
//! pixel buffers are uploaded through the [`Device`] so the renderer never
//! touches file formats itself.
//!
//! [image]: https://docs.rs/image

use std::path::Path;

use anyhow::{anyhow, Context};

use crate::device::{Device, TextureId};

/// Decoded RGBA8 pixels, tightly packed row by row.
#[derive(Debug, Clone)]
pub struct TextureImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl TextureImage {
    /// Decode image file contents (PNG, JPEG, ...).
    pub fn from_bytes(bytes: &[u8]) -> anyhow::Result<Self> {
        let image = image::load_from_memory(bytes)
            .context("decoding image data")?
            .to_rgba8();
        let (width, height) = image.dimensions();
        Ok(Self {
            width,
            height,
            pixels: image.into_raw(),
        })
    }

    /// A single-colour image, mostly useful for tests and placeholders.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        Self {
            width,
            height,
            pixels: rgba
                .iter()
                .cycle()
                .take(width as usize * height as usize * 4)
                .copied()
                .collect(),
        }
    }
}

/// Decode an image file from disk.
pub fn load_image(path: impl AsRef<Path>) -> anyhow::Result<TextureImage> {
    let path = path.as_ref();
    let image = image::open(path)
        .with_context(|| format!("reading texture {}", path.display()))?
        .to_rgba8();
    let (width, height) = image.dimensions();
    Ok(TextureImage {
        width,
        height,
        pixels: image.into_raw(),
    })
}

/// Upload a decoded image into a fresh 2D texture.
pub fn upload_texture<D: Device>(device: &D, image: &TextureImage) -> TextureId {
    let texture = device.create_texture();
    device.bind_texture_2d(texture);
    device.upload_texture_2d(image.width, image.height, &image.pixels);
    texture
}

/// Skybox face files in cube-map upload order +X, -X, +Y, -Y, +Z, -Z.
pub const SKYBOX_FACE_FILES: [&str; 6] = [
    "right.png",
    "left.png",
    "top.png",
    "bottom.png",
    "back.png",
    "front.png",
];

/// Load the six cube-map faces from `<dir>/{right,left,top,bottom,back,front}.png`.
pub fn load_skybox_faces(dir: impl AsRef<Path>) -> anyhow::Result<[TextureImage; 6]> {
    let dir = dir.as_ref();
    let mut faces = Vec::with_capacity(6);
    for name in SKYBOX_FACE_FILES {
        faces.push(load_image(dir.join(name))?);
    }
    faces
        .try_into()
        .map_err(|_| anyhow!("expected six skybox faces"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::trace::{Call, TraceDevice};

    #[test]
    fn solid_image_has_tightly_packed_pixels() {
        let image = TextureImage::solid(4, 2, [1, 2, 3, 4]);
        assert_eq!(image.pixels.len(), 4 * 2 * 4);
        assert_eq!(&image.pixels[..4], &[1, 2, 3, 4]);
        assert_eq!(&image.pixels[28..], &[1, 2, 3, 4]);
    }

    #[test]
    fn upload_binds_then_uploads() {
        let device = TraceDevice::new();
        let image = TextureImage::solid(8, 8, [255, 0, 0, 255]);
        let texture = upload_texture(&device, &image);

        assert!(texture.is_valid());
        let calls = device.calls();
        assert_eq!(
            calls,
            vec![
                Call::CreateTexture { texture: texture.raw() },
                Call::BindTexture2d { texture: texture.raw() },
                Call::UploadTexture2d { width: 8, height: 8 },
            ]
        );
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        assert!(TextureImage::from_bytes(&[0, 1, 2, 3]).is_err());
    }

    #[test]
    fn missing_skybox_directory_is_an_error() {
        let result = load_skybox_faces("/nonexistent-strata-ngin-skybox");
        let message = format!("{:#}", result.unwrap_err());
        assert!(message.contains("right.png"));
    }
}
