//! Mock GPU implementation for testing
//!
//! Stores data in memory and records which threads issued calls, so tests
//! can check that uploads stay on the owning thread.

use super::{BufferUsage, GpuDevice, GpuError, GpuResult, GpuTextureFormat, TextureDescriptor};
use parking_lot::{Mutex, RwLock};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};

/// Counter for generating unique buffer/texture IDs
static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn next_id() -> u64 {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

#[derive(Debug, Default)]
struct MockStats {
    allocated_bytes: AtomicU64,
    buffers: AtomicUsize,
    textures: AtomicUsize,
    live_resources: AtomicUsize,
    calling_threads: Mutex<HashSet<ThreadId>>,
}

/// Mock GPU device for testing
///
/// Clones share their statistics.
#[derive(Clone, Debug, Default)]
pub struct MockGpu {
    stats: Arc<MockStats>,
}

impl MockGpu {
    /// Create a new mock GPU device
    pub fn new() -> Self {
        Self::default()
    }

    /// Get total allocated memory (for testing)
    pub fn allocated_bytes(&self) -> u64 {
        self.stats.allocated_bytes.load(Ordering::SeqCst)
    }

    /// Buffers allocated so far
    pub fn buffers_created(&self) -> usize {
        self.stats.buffers.load(Ordering::SeqCst)
    }

    /// Textures created so far
    pub fn textures_created(&self) -> usize {
        self.stats.textures.load(Ordering::SeqCst)
    }

    /// Buffers and textures created and not yet destroyed
    pub fn live_resources(&self) -> usize {
        self.stats.live_resources.load(Ordering::SeqCst)
    }

    /// Every thread that has called into this device
    pub fn calling_threads(&self) -> HashSet<ThreadId> {
        self.stats.calling_threads.lock().clone()
    }

    fn touch(&self) {
        self.stats.calling_threads.lock().insert(thread::current().id());
    }
}

/// Mock buffer that stores data in memory
#[derive(Clone, Debug)]
pub struct MockBuffer {
    /// Unique identifier
    pub id: u64,
    /// Buffer data
    pub data: Arc<RwLock<Vec<u8>>>,
    /// Buffer usage
    pub usage: BufferUsage,
}

impl MockBuffer {
    /// Create a new mock buffer
    pub fn new(size: usize, usage: BufferUsage) -> Self {
        Self {
            id: next_id(),
            data: Arc::new(RwLock::new(vec![0u8; size])),
            usage,
        }
    }

    /// Get the size of the buffer
    pub fn size(&self) -> usize {
        self.data.read().len()
    }

    /// Read buffer data
    pub fn read_data(&self) -> Vec<u8> {
        self.data.read().clone()
    }
}

/// Mock texture that stores pixel data in memory
#[derive(Clone, Debug)]
pub struct MockTexture {
    /// Unique identifier
    pub id: u64,
    pub width: u32,
    pub height: u32,
    pub layers: u32,
    pub format: GpuTextureFormat,
    /// Pixel data
    pub data: Arc<RwLock<Vec<u8>>>,
}

impl MockTexture {
    /// Create a new mock texture
    pub fn new(desc: &TextureDescriptor, data: &[u8]) -> Self {
        Self {
            id: next_id(),
            width: desc.width,
            height: desc.height,
            layers: desc.layers,
            format: desc.format,
            data: Arc::new(RwLock::new(data.to_vec())),
        }
    }

    fn byte_len(&self) -> u64 {
        self.width as u64 * self.height as u64 * self.layers as u64 * 4
    }
}

impl GpuDevice for MockGpu {
    type Buffer = MockBuffer;
    type Texture = MockTexture;

    fn allocate_buffer(&self, size: usize, usage: BufferUsage) -> GpuResult<Self::Buffer> {
        self.touch();
        if size == 0 {
            return Err(GpuError::InvalidSize(size));
        }

        self.stats
            .allocated_bytes
            .fetch_add(size as u64, Ordering::SeqCst);
        self.stats.buffers.fetch_add(1, Ordering::SeqCst);
        self.stats.live_resources.fetch_add(1, Ordering::SeqCst);
        Ok(MockBuffer::new(size, usage))
    }

    fn upload_buffer_data(
        &self,
        buffer: &Self::Buffer,
        offset: usize,
        data: &[u8],
    ) -> GpuResult<()> {
        self.touch();
        let mut buf_data = buffer.data.write();

        if offset + data.len() > buf_data.len() {
            return Err(GpuError::UploadFailed(format!(
                "Data exceeds buffer size: offset={}, data_len={}, buffer_size={}",
                offset,
                data.len(),
                buf_data.len()
            )));
        }

        buf_data[offset..offset + data.len()].copy_from_slice(data);
        Ok(())
    }

    fn create_texture(&self, desc: &TextureDescriptor, data: &[u8]) -> GpuResult<Self::Texture> {
        self.touch();
        if desc.width == 0 || desc.height == 0 || desc.layers == 0 {
            return Err(GpuError::TextureCreationFailed(
                "Invalid texture dimensions".to_string(),
            ));
        }
        if data.len() != desc.byte_len() {
            return Err(GpuError::TextureCreationFailed(format!(
                "Expected {} bytes of pixel data, got {}",
                desc.byte_len(),
                data.len()
            )));
        }

        let texture = MockTexture::new(desc, data);
        self.stats
            .allocated_bytes
            .fetch_add(texture.byte_len(), Ordering::SeqCst);
        self.stats.textures.fetch_add(1, Ordering::SeqCst);
        self.stats.live_resources.fetch_add(1, Ordering::SeqCst);
        Ok(texture)
    }

    fn destroy_buffer(&self, buffer: Self::Buffer) {
        self.touch();
        let size = buffer.size() as u64;
        self.stats.allocated_bytes.fetch_sub(size, Ordering::SeqCst);
        self.stats.live_resources.fetch_sub(1, Ordering::SeqCst);
    }

    fn destroy_texture(&self, texture: Self::Texture) {
        self.touch();
        self.stats
            .allocated_bytes
            .fetch_sub(texture.byte_len(), Ordering::SeqCst);
        self.stats.live_resources.fetch_sub(1, Ordering::SeqCst);
    }

    fn backend_name(&self) -> &'static str {
        "Mock"
    }
}
