//! Models: an ordered list of sub-meshes with their materials

use super::material::{Material, MaterialLibrary};
use super::mesh::Mesh;
use crate::cache::Handle;
use crate::gpu::GpuDevice;

/// A mesh drawn with one material
#[derive(Debug)]
pub struct SubModel<G: GpuDevice> {
    pub mesh: Handle<Mesh<G>>,
    pub material: Handle<Material<G>>,
}

impl<G: GpuDevice> Clone for SubModel<G> {
    fn clone(&self) -> Self {
        Self {
            mesh: self.mesh.clone(),
            material: self.material.clone(),
        }
    }
}

/// Everything one model file produced
#[derive(Debug)]
pub struct Model<G: GpuDevice> {
    pub path: String,
    pub sub_models: Vec<SubModel<G>>,
    /// Libraries named by `mtllib`, kept alive as long as the model
    pub libraries: Vec<Handle<MaterialLibrary>>,
}

impl<G: GpuDevice> Model<G> {
    /// Triangles across every populated sub-mesh
    pub fn triangle_count(&self) -> usize {
        self.sub_models
            .iter()
            .filter_map(|sub| sub.mesh.get())
            .map(|mesh| mesh.triangle_count())
            .sum()
    }

    /// Whether every sub-mesh has been uploaded
    pub fn meshes_ready(&self) -> bool {
        self.sub_models.iter().all(|sub| sub.mesh.is_ready())
    }

    /// First sub-mesh whose load or upload gave up
    pub fn failed_mesh(&self) -> Option<&Handle<Mesh<G>>> {
        self.sub_models
            .iter()
            .map(|sub| &sub.mesh)
            .find(|mesh| mesh.is_failed())
    }
}
