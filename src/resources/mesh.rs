//! Triangle meshes with interleaved vertex attributes

use crate::error::{AssetError, Result};
use crate::gpu::{BufferUsage, GpuDevice};
use glam::Vec3;
use std::sync::OnceLock;

/// One triangle corner: indices into the position, texture coordinate and
/// normal lists, already zero-based
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Corner {
    pub position: usize,
    pub tex_coord: usize,
    pub normal: usize,
}

/// CPU-side geometry for one sub-mesh
///
/// Every corner contributes position (3), texture coordinate (3, only when
/// the source has any) and normal (3) floats.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<f32>,
    pub vertex_count: usize,
    pub has_tex_coords: bool,
}

impl MeshData {
    /// Interleave the attributes referenced by `corners`
    pub fn interleave(
        positions: &[Vec3],
        tex_coords: &[Vec3],
        normals: &[Vec3],
        corners: &[Corner],
    ) -> Result<Self> {
        let has_tex_coords = !tex_coords.is_empty();
        let stride = if has_tex_coords { 9 } else { 6 };
        let mut vertices = Vec::with_capacity(corners.len() * stride);

        for corner in corners {
            vertices.extend_from_slice(&lookup(positions, corner.position, "position")?.to_array());
            if has_tex_coords {
                vertices.extend_from_slice(
                    &lookup(tex_coords, corner.tex_coord, "texture coordinate")?.to_array(),
                );
            }
            vertices.extend_from_slice(&lookup(normals, corner.normal, "normal")?.to_array());
        }

        Ok(Self {
            vertices,
            vertex_count: corners.len(),
            has_tex_coords,
        })
    }

    /// Floats per vertex
    pub fn stride(&self) -> usize {
        if self.has_tex_coords {
            9
        } else {
            6
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.vertex_count / 3
    }
}

fn lookup(list: &[Vec3], index: usize, what: &str) -> Result<Vec3> {
    list.get(index).copied().ok_or_else(|| {
        AssetError::InvalidBuffer(format!(
            "{} index {} out of range ({} available)",
            what,
            index + 1,
            list.len()
        ))
    })
}

/// A named sub-mesh and, once uploaded, its vertex buffer
#[derive(Debug)]
pub struct Mesh<G: GpuDevice> {
    name: String,
    data: MeshData,
    gpu: OnceLock<G::Buffer>,
}

impl<G: GpuDevice> Mesh<G> {
    pub fn new(name: impl Into<String>, data: MeshData) -> Self {
        Self {
            name: name.into(),
            data,
            gpu: OnceLock::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> &MeshData {
        &self.data
    }

    pub fn triangle_count(&self) -> usize {
        self.data.triangle_count()
    }

    pub fn gpu_buffer(&self) -> Option<&G::Buffer> {
        self.gpu.get()
    }

    /// Upload the interleaved vertices; must run on the owning thread
    pub(crate) fn upload(&self, gpu: &G) -> Result<()> {
        if self.data.vertices.is_empty() {
            return Err(AssetError::InvalidBuffer(format!(
                "mesh {} has no vertices",
                self.name
            )));
        }

        let bytes: &[u8] = bytemuck::cast_slice(&self.data.vertices);
        let buffer = gpu.upload_buffer(bytes, BufferUsage::Vertex)?;
        if let Err(duplicate) = self.gpu.set(buffer) {
            gpu.destroy_buffer(duplicate);
        }
        Ok(())
    }

    pub(crate) fn release(&self, gpu: &G) {
        if let Some(buffer) = self.gpu.get() {
            gpu.destroy_buffer(buffer.clone());
        }
    }
}
