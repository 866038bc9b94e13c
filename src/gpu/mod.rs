//! GPU abstraction layer
//!
//! The loader only needs three things from a graphics backend: upload a
//! buffer, upload a texture, delete a resource. All three must happen on
//! the thread that owns the graphics context, which [`GpuContext`] enforces.

pub mod context;
pub mod mock;

use std::fmt::Debug;
use thiserror::Error;

/// Error type for GPU operations
#[derive(Error, Debug)]
pub enum GpuError {
    #[error("Buffer allocation failed: {0}")]
    AllocationFailed(String),

    #[error("Buffer upload failed: {0}")]
    UploadFailed(String),

    #[error("Texture creation failed: {0}")]
    TextureCreationFailed(String),

    #[error("Invalid buffer size: {0}")]
    InvalidSize(usize),

    #[error("GPU context used from {0}, which does not own it")]
    WrongThread(String),
}

/// Result type for GPU operations
pub type GpuResult<T> = Result<T, GpuError>;

/// Buffer usage flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferUsage {
    /// Interleaved vertex attributes
    Vertex,
    /// Index buffer
    Index,
}

/// Texture format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GpuTextureFormat {
    /// RGBA 8-bit with sRGB color space
    Rgba8Srgb,
    /// RGBA 8-bit unorm
    Rgba8Unorm,
}

/// Texture descriptor for creation
#[derive(Debug, Clone)]
pub struct TextureDescriptor {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Array layers; 6 for a cube map
    pub layers: u32,
    /// Texture format
    pub format: GpuTextureFormat,
    /// Generate mipmaps after upload
    pub generate_mipmaps: bool,
}

impl Default for TextureDescriptor {
    fn default() -> Self {
        Self {
            width: 1,
            height: 1,
            layers: 1,
            format: GpuTextureFormat::Rgba8Srgb,
            generate_mipmaps: false,
        }
    }
}

impl TextureDescriptor {
    /// Bytes of RGBA8 data this descriptor describes
    pub fn byte_len(&self) -> usize {
        self.width as usize * self.height as usize * self.layers as usize * 4
    }
}

/// Core GPU device trait for backend-agnostic operations
///
/// Implementations may assume every call arrives on the thread that owns
/// the context; [`GpuContext`] is what hands out references to the device.
///
/// # Example
/// ```ignore
/// let gpu = MockGpu::new();
/// let buffer = gpu.upload_buffer(&vertex_bytes, BufferUsage::Vertex)?;
/// gpu.destroy_buffer(buffer);
/// ```
pub trait GpuDevice: Send + Sync + Clone + Debug + 'static {
    /// Buffer type for this GPU backend
    type Buffer: Clone + Send + Sync + Debug;

    /// Texture type for this GPU backend
    type Texture: Clone + Send + Sync + Debug;

    /// Allocate a GPU buffer of `size` bytes
    fn allocate_buffer(&self, size: usize, usage: BufferUsage) -> GpuResult<Self::Buffer>;

    /// Upload data to a buffer
    fn upload_buffer_data(
        &self,
        buffer: &Self::Buffer,
        offset: usize,
        data: &[u8],
    ) -> GpuResult<()>;

    /// Create a texture from RGBA8 data, layers laid out back to back
    fn create_texture(&self, desc: &TextureDescriptor, data: &[u8]) -> GpuResult<Self::Texture>;

    /// Release a buffer
    fn destroy_buffer(&self, buffer: Self::Buffer);

    /// Release a texture
    fn destroy_texture(&self, texture: Self::Texture);

    /// Get the name of this GPU backend (for debugging)
    fn backend_name(&self) -> &'static str;

    /// Allocate a buffer sized to `data` and fill it
    fn upload_buffer(&self, data: &[u8], usage: BufferUsage) -> GpuResult<Self::Buffer> {
        let buffer = self.allocate_buffer(data.len(), usage)?;
        if let Err(e) = self.upload_buffer_data(&buffer, 0, data) {
            self.destroy_buffer(buffer);
            return Err(e);
        }
        Ok(buffer)
    }
}

// Re-export implementations
pub use context::GpuContext;
pub use mock::MockGpu;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_texture_descriptor_default() {
        let desc = TextureDescriptor::default();
        assert_eq!(desc.width, 1);
        assert_eq!(desc.height, 1);
        assert_eq!(desc.layers, 1);
        assert_eq!(desc.byte_len(), 4);
    }

    #[test]
    fn test_cube_descriptor_byte_len() {
        let desc = TextureDescriptor {
            width: 2,
            height: 2,
            layers: 6,
            ..Default::default()
        };
        assert_eq!(desc.byte_len(), 2 * 2 * 6 * 4);
    }
}
