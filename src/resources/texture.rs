//! Texture decoding and GPU textures

use crate::error::{AssetError, Result};
use crate::gpu::{GpuDevice, GpuTextureFormat, TextureDescriptor};
use image::io::Reader as ImageReader;
use image::ImageFormat;
use std::path::Path;
use std::sync::OnceLock;

/// Decoded RGBA8 pixels
#[derive(Debug, Clone, PartialEq)]
pub struct TextureData {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl TextureData {
    /// Convert normalized RGBA floats to RGBA8
    ///
    /// `data` must hold exactly `width * height * 4` values.
    pub fn from_f32(width: u32, height: u32, data: &[f32]) -> Result<Self> {
        let expected = width as usize * height as usize * 4;
        if data.is_empty() || data.len() != expected {
            return Err(AssetError::InvalidBuffer(format!(
                "expected {} floats for a {}x{} texture, got {}",
                expected,
                width,
                height,
                data.len()
            )));
        }

        let pixels = data
            .iter()
            .map(|v| (v.clamp(0.0, 1.0) * 255.0).round() as u8)
            .collect();
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn byte_len(&self) -> usize {
        self.pixels.len()
    }
}

/// Decodes image files into [`TextureData`]
#[derive(Debug, Default, Clone, Copy)]
pub struct TextureLoader {
    flip_vertically: bool,
}

impl TextureLoader {
    /// Loader for regular textures; rows are flipped so the first row is the bottom
    pub fn new() -> Self {
        Self {
            flip_vertically: true,
        }
    }

    /// Loader for cube map faces, which keep their row order
    pub fn unflipped() -> Self {
        Self {
            flip_vertically: false,
        }
    }

    /// Decode an image from binary data
    pub fn load(&self, data: &[u8], origin: &str) -> Result<TextureData> {
        let decode_error = |reason: String| AssetError::Decode {
            path: origin.to_string(),
            reason,
        };

        // TGA has no magic bytes; fall back to the extension
        let format = image::guess_format(data)
            .or_else(|_| ImageFormat::from_path(origin))
            .map_err(|e| decode_error(e.to_string()))?;
        match format {
            ImageFormat::Png | ImageFormat::Jpeg | ImageFormat::Bmp | ImageFormat::Tga => {}
            _ => {
                return Err(decode_error(format!(
                    "unsupported format {:?}",
                    format.extensions_str()
                )))
            }
        }

        let mut img = ImageReader::with_format(std::io::Cursor::new(data), format)
            .decode()
            .map_err(|e| decode_error(e.to_string()))?;
        if self.flip_vertically {
            img = img.flipv();
        }

        let rgba = img.into_rgba8();
        let (width, height) = rgba.dimensions();
        Ok(TextureData {
            width,
            height,
            pixels: rgba.into_raw(),
        })
    }

    /// Read and decode an image file
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<TextureData> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|e| AssetError::io(path, e))?;
        self.load(&data, &path.display().to_string())
    }
}

/// A texture with its CPU pixels and, once uploaded, its GPU handle
#[derive(Debug)]
pub struct Texture<G: GpuDevice> {
    data: TextureData,
    gpu: OnceLock<G::Texture>,
}

impl<G: GpuDevice> Texture<G> {
    pub fn new(data: TextureData) -> Self {
        Self {
            data,
            gpu: OnceLock::new(),
        }
    }

    pub fn width(&self) -> u32 {
        self.data.width
    }

    pub fn height(&self) -> u32 {
        self.data.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.data.pixels
    }

    /// GPU texture, once uploaded
    pub fn gpu_texture(&self) -> Option<&G::Texture> {
        self.gpu.get()
    }

    /// Create the GPU texture; must run on the owning thread
    pub(crate) fn upload(&self, gpu: &G) -> Result<()> {
        if self.data.pixels.is_empty() {
            return Err(AssetError::InvalidBuffer("texture has no pixel data".into()));
        }

        let desc = TextureDescriptor {
            width: self.data.width,
            height: self.data.height,
            format: GpuTextureFormat::Rgba8Srgb,
            generate_mipmaps: true,
            ..Default::default()
        };
        let texture = gpu.create_texture(&desc, &self.data.pixels)?;
        if let Err(duplicate) = self.gpu.set(texture) {
            gpu.destroy_texture(duplicate);
        }
        Ok(())
    }

    pub(crate) fn release(&self, gpu: &G) {
        if let Some(texture) = self.gpu.get() {
            gpu.destroy_texture(texture.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::MockGpu;

    fn encode(img: &image::RgbaImage, format: ImageFormat) -> Vec<u8> {
        let mut bytes = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut bytes), format)
            .expect("Failed to encode test image");
        bytes
    }

    #[test]
    fn test_load_png_flips_rows() {
        let mut img = image::RgbaImage::new(1, 2);
        img.put_pixel(0, 0, image::Rgba([255, 0, 0, 255]));
        img.put_pixel(0, 1, image::Rgba([0, 0, 255, 255]));
        let bytes = encode(&img, ImageFormat::Png);

        let flipped = TextureLoader::new().load(&bytes, "mem.png").unwrap();
        assert_eq!((flipped.width, flipped.height), (1, 2));
        assert_eq!(&flipped.pixels[0..4], &[0, 0, 255, 255]);

        let kept = TextureLoader::unflipped().load(&bytes, "mem.png").unwrap();
        assert_eq!(&kept.pixels[0..4], &[255, 0, 0, 255]);
    }

    #[test]
    fn test_load_jpeg() {
        let mut img = image::RgbaImage::new(1, 1);
        img.put_pixel(0, 0, image::Rgba([255, 255, 255, 255]));
        let rgb = image::DynamicImage::ImageRgba8(img).into_rgb8();
        let mut bytes = Vec::new();
        rgb.write_to(&mut std::io::Cursor::new(&mut bytes), ImageFormat::Jpeg)
            .expect("Failed to encode test image");

        let texture = TextureLoader::new().load(&bytes, "mem.jpg").unwrap();
        assert_eq!(texture.width, 1);
        assert_eq!(texture.pixels.len(), 4);
    }

    #[test]
    fn test_garbage_is_a_decode_error() {
        let result = TextureLoader::new().load(b"not an image", "junk.png");
        assert!(matches!(result, Err(AssetError::Decode { .. })));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = TextureLoader::new().load_file("/definitely/not/here.png");
        assert!(matches!(result, Err(AssetError::Io { .. })));
    }

    #[test]
    fn test_from_f32_checks_length() {
        assert!(TextureData::from_f32(1, 1, &[]).is_err());
        assert!(TextureData::from_f32(2, 1, &[1.0; 4]).is_err());

        let white = TextureData::from_f32(1, 1, &[1.0, 1.0, 1.0, 1.0]).unwrap();
        assert_eq!(white.pixels, vec![255, 255, 255, 255]);
    }

    #[test]
    fn test_upload_and_release() {
        let gpu = MockGpu::new();
        let texture: Texture<MockGpu> =
            Texture::new(TextureData::from_f32(1, 1, &[0.0, 0.0, 0.0, 1.0]).unwrap());
        assert!(texture.gpu_texture().is_none());

        texture.upload(&gpu).unwrap();
        assert!(texture.gpu_texture().is_some());
        assert_eq!(gpu.live_resources(), 1);

        texture.release(&gpu);
        assert_eq!(gpu.live_resources(), 0);
    }
}
