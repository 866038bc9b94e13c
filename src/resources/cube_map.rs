//! Six-face cube map textures

use super::texture::{TextureData, TextureLoader};
use crate::error::{AssetError, Result};
use crate::gpu::{GpuDevice, GpuTextureFormat, TextureDescriptor};
use std::path::Path;
use std::sync::OnceLock;

/// Face count of a cube map
pub const CUBE_FACES: usize = 6;

/// A cube map: six equally sized faces stored back to back
#[derive(Debug)]
pub struct CubeMap<G: GpuDevice> {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    loaded_faces: usize,
    gpu: OnceLock<G::Texture>,
}

impl<G: GpuDevice> CubeMap<G> {
    /// Decode the six face images
    ///
    /// A face that fails to load, or whose size differs from the first good
    /// face, is logged and left black. Fails only if no face loads at all.
    pub fn decode(paths: &[impl AsRef<Path>]) -> Result<Self> {
        if paths.len() != CUBE_FACES {
            return Err(AssetError::InvalidCubeMap(paths.len()));
        }

        let loader = TextureLoader::unflipped();
        let faces: Vec<Option<TextureData>> = paths
            .iter()
            .map(|path| match loader.load_file(path) {
                Ok(face) => Some(face),
                Err(e) => {
                    log::error!("[CubeMap] Cube map texture failed to load: {}", e);
                    None
                }
            })
            .collect();

        let (width, height) = faces
            .iter()
            .flatten()
            .map(|face| (face.width, face.height))
            .next()
            .ok_or_else(|| AssetError::InvalidBuffer("no cube map face could be loaded".into()))?;

        let face_len = width as usize * height as usize * 4;
        let mut pixels = Vec::with_capacity(face_len * CUBE_FACES);
        let mut loaded_faces = 0;
        for (index, face) in faces.into_iter().enumerate() {
            match face {
                Some(face) if face.width == width && face.height == height => {
                    pixels.extend_from_slice(&face.pixels);
                    loaded_faces += 1;
                }
                Some(face) => {
                    log::warn!(
                        "[CubeMap] Face {} is {}x{}, expected {}x{}",
                        index,
                        face.width,
                        face.height,
                        width,
                        height
                    );
                    pixels.resize(pixels.len() + face_len, 0);
                }
                None => pixels.resize(pixels.len() + face_len, 0),
            }
        }

        Ok(Self {
            width,
            height,
            pixels,
            loaded_faces,
            gpu: OnceLock::new(),
        })
    }

    pub fn face_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Faces that decoded successfully
    pub fn loaded_faces(&self) -> usize {
        self.loaded_faces
    }

    pub fn gpu_texture(&self) -> Option<&G::Texture> {
        self.gpu.get()
    }

    pub(crate) fn upload(&self, gpu: &G) -> Result<()> {
        if self.pixels.is_empty() {
            return Err(AssetError::InvalidBuffer("cube map has no pixel data".into()));
        }

        let desc = TextureDescriptor {
            width: self.width,
            height: self.height,
            layers: CUBE_FACES as u32,
            format: GpuTextureFormat::Rgba8Srgb,
            generate_mipmaps: false,
        };
        let texture = gpu.create_texture(&desc, &self.pixels)?;
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

    #[test]
    fn test_wrong_face_count() {
        let result = CubeMap::<MockGpu>::decode(&["a.png", "b.png"]);
        assert!(matches!(result, Err(AssetError::InvalidCubeMap(2))));
    }

    #[test]
    fn test_missing_faces_are_black() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("px.png");
        image::RgbaImage::from_pixel(2, 2, image::Rgba([9, 9, 9, 255]))
            .save(&good)
            .unwrap();

        let mut paths = vec![good];
        for name in ["nx", "py", "ny", "pz", "nz"] {
            paths.push(dir.path().join(format!("{name}.png")));
        }

        let cube = CubeMap::<MockGpu>::decode(paths.as_slice()).unwrap();
        assert_eq!(cube.loaded_faces(), 1);
        assert_eq!(cube.face_size(), (2, 2));

        let gpu = MockGpu::new();
        cube.upload(&gpu).unwrap();
        let texture = cube.gpu_texture().unwrap();
        assert_eq!(texture.layers, 6);
        assert_eq!(texture.data.read()[0], 9);
        assert_eq!(texture.data.read()[16], 0);
    }

    #[test]
    fn test_no_faces_fails() {
        let paths: Vec<String> = (0..6).map(|i| format!("/missing/{i}.png")).collect();
        let result = CubeMap::<MockGpu>::decode(paths.as_slice());
        assert!(matches!(result, Err(AssetError::InvalidBuffer(_))));
    }
}
