//! Materials and material libraries

use super::texture::Texture;
use crate::cache::Handle;
use crate::gpu::GpuDevice;
use glam::Vec3;

/// Surface parameters of one `newmtl` block
#[derive(Debug)]
pub struct Material<G: GpuDevice> {
    pub name: String,
    /// `Ns`
    pub shininess: f32,
    /// `Ka`
    pub ambient: Vec3,
    /// `Kd`
    pub diffuse: Vec3,
    /// `Ks`
    pub specular: Vec3,
    /// `Ke`
    pub emissive: Vec3,
    /// `Ni`
    pub optical_density: f32,
    /// `d`
    pub opacity: f32,
    /// `illum`
    pub illumination: u32,
    pub ambient_map: Option<Handle<Texture<G>>>,
    pub diffuse_map: Option<Handle<Texture<G>>>,
    pub specular_map: Option<Handle<Texture<G>>>,
    pub emissive_map: Option<Handle<Texture<G>>>,
    pub alpha_map: Option<Handle<Texture<G>>>,
}

impl<G: GpuDevice> Material<G> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            shininess: 0.0,
            ambient: Vec3::ZERO,
            diffuse: Vec3::ONE,
            specular: Vec3::ZERO,
            emissive: Vec3::ZERO,
            optical_density: 1.0,
            opacity: 1.0,
            illumination: 0,
            ambient_map: None,
            diffuse_map: None,
            specular_map: None,
            emissive_map: None,
            alpha_map: None,
        }
    }

    /// Texture maps this material references
    pub fn maps(&self) -> impl Iterator<Item = &Handle<Texture<G>>> {
        [
            &self.ambient_map,
            &self.diffuse_map,
            &self.specular_map,
            &self.emissive_map,
            &self.alpha_map,
        ]
        .into_iter()
        .flatten()
    }
}

/// Names of the materials a `.mtl` file defined
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterialLibrary {
    pub path: String,
    pub materials: Vec<String>,
}
