//! MTL material libraries

use super::{parse_vec3, split_record};
use crate::cache::Handle;
use crate::error::AssetError;
use crate::gpu::GpuDevice;
use crate::manager::{AssetManager, LoadMode};
use crate::resources::{Material, MaterialLibrary, Texture};
use glam::Vec3;
use std::path::Path;

/// Texture slot named by a `map_*` record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapSlot {
    Ambient,
    Diffuse,
    Specular,
    Emissive,
    Alpha,
}

impl MapSlot {
    fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "map_Ka" => Some(Self::Ambient),
            "map_Kd" => Some(Self::Diffuse),
            "map_Ks" => Some(Self::Specular),
            "map_Ke" => Some(Self::Emissive),
            "map_d" => Some(Self::Alpha),
            _ => None,
        }
    }
}

/// One parsed `newmtl` block, before its textures are loaded
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialSpec {
    pub name: String,
    pub shininess: f32,
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
    pub emissive: Vec3,
    pub optical_density: f32,
    pub opacity: f32,
    pub illumination: u32,
    /// Texture file names, directories already stripped
    pub maps: Vec<(MapSlot, String)>,
}

impl MaterialSpec {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            shininess: 0.0,
            ambient: Vec3::ZERO,
            diffuse: Vec3::ONE,
            specular: Vec3::ZERO,
            emissive: Vec3::ZERO,
            optical_density: 1.0,
            opacity: 1.0,
            illumination: 0,
            maps: Vec::new(),
        }
    }

    /// Build the material, asking `texture` for each referenced map
    pub fn into_material<G, F>(self, mut texture: F) -> Material<G>
    where
        G: GpuDevice,
        F: FnMut(&str) -> Handle<Texture<G>>,
    {
        let mut material = Material::new(self.name);
        material.shininess = self.shininess;
        material.ambient = self.ambient;
        material.diffuse = self.diffuse;
        material.specular = self.specular;
        material.emissive = self.emissive;
        material.optical_density = self.optical_density;
        material.opacity = self.opacity;
        material.illumination = self.illumination;

        for (slot, file) in &self.maps {
            let handle = Some(texture(file));
            match slot {
                MapSlot::Ambient => material.ambient_map = handle,
                MapSlot::Diffuse => material.diffuse_map = handle,
                MapSlot::Specular => material.specular_map = handle,
                MapSlot::Emissive => material.emissive_map = handle,
                MapSlot::Alpha => material.alpha_map = handle,
            }
        }
        material
    }
}

/// Last path component, accepting both separators
///
/// Exporters often write absolute paths from another machine; maps are
/// looked up next to the library instead.
fn file_name(path: &str) -> &str {
    path.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or(path)
}

fn parse_scalar<T: std::str::FromStr>(origin: &str, line_no: usize, rest: &str) -> Option<T> {
    let token = rest.split_whitespace().next().unwrap_or("");
    match token.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            log::warn!("[MtlLoader] {}:{} '{}' is not a number", origin, line_no, token);
            None
        }
    }
}

/// Parse every material of a library
///
/// Records before the first `newmtl` are ignored.
pub fn parse_mtl(origin: &str, text: &str) -> Vec<MaterialSpec> {
    let mut materials: Vec<MaterialSpec> = Vec::new();

    for (index, line) in text.lines().enumerate() {
        let line_no = index + 1;
        let Some((keyword, rest)) = split_record(line) else {
            continue;
        };

        if keyword == "newmtl" {
            materials.push(MaterialSpec::new(rest));
            continue;
        }
        let Some(current) = materials.last_mut() else {
            log::debug!("[MtlLoader] {}:{} '{}' outside any material", origin, line_no, keyword);
            continue;
        };

        let color = |rest: &str| {
            parse_vec3(rest)
                .map_err(|reason| log::warn!("[MtlLoader] {}:{} {}", origin, line_no, reason))
                .ok()
        };

        match keyword {
            "Ns" => current.shininess = parse_scalar(origin, line_no, rest).unwrap_or(current.shininess),
            "Ni" => {
                current.optical_density =
                    parse_scalar(origin, line_no, rest).unwrap_or(current.optical_density)
            }
            "d" => current.opacity = parse_scalar(origin, line_no, rest).unwrap_or(current.opacity),
            "illum" => {
                current.illumination =
                    parse_scalar(origin, line_no, rest).unwrap_or(current.illumination)
            }
            "Ka" => current.ambient = color(rest).unwrap_or(current.ambient),
            "Kd" => current.diffuse = color(rest).unwrap_or(current.diffuse),
            "Ks" => current.specular = color(rest).unwrap_or(current.specular),
            "Ke" => current.emissive = color(rest).unwrap_or(current.emissive),
            other => match MapSlot::from_keyword(other) {
                // Options such as `-bm 1.0` come first; the file is last.
                Some(slot) => match rest.split_whitespace().last() {
                    Some(path) => current.maps.push((slot, file_name(path).to_string())),
                    None => log::warn!("[MtlLoader] {}:{} {} without a file", origin, line_no, other),
                },
                None => log::debug!("[MtlLoader] {}:{} ignoring '{}'", origin, line_no, other),
            },
        }
    }

    materials
}

/// Load job for one material library entry
///
/// Every material is populated and marked ready here; their textures follow
/// their own upload route. A material some other library already defined
/// keeps its first definition.
pub(crate) fn load_mtl<G: GpuDevice>(
    manager: &AssetManager<G>,
    library: &Handle<MaterialLibrary>,
    path: &Path,
    mode: LoadMode,
) {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            manager.report_failure(
                manager.material_libraries().metrics(),
                library,
                &AssetError::io(path, e),
            );
            return;
        }
    };

    let directory = path.parent().map(Path::to_path_buf).unwrap_or_default();
    let origin = path.display().to_string();
    let specs = parse_mtl(&origin, &text);
    let mut names = Vec::with_capacity(specs.len());

    for spec in specs {
        names.push(spec.name.clone());
        let entry = manager.load_material(&spec.name);
        if entry.is_populated() {
            log::warn!("[MtlLoader] Material {} already defined, keeping the first", spec.name);
            continue;
        }

        let material = spec.into_material(|file| manager.load_texture(directory.join(file), mode));
        if entry.populate(material) {
            entry.mark_ready();
        }
    }

    log::debug!("[MtlLoader] {} defines {} materials", origin, names.len());
    library.populate(MaterialLibrary {
        path: origin,
        materials: names,
    });
    library.mark_ready();
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIBRARY: &str = "\
# exported
newmtl wood
Ns 96.0
Ka 0.1 0.1 0.1
Kd 0.6 0.4 0.2
d 0.5
illum 2
map_Kd -bm 1.0 C:\\textures\\wood.png
map_Ks textures/wood_spec.png

newmtl glass
Ni 1.45
Kd x 0 0
";

    #[test]
    fn test_parse_materials() {
        let specs = parse_mtl("lib.mtl", LIBRARY);
        assert_eq!(specs.len(), 2);

        let wood = &specs[0];
        assert_eq!(wood.name, "wood");
        assert_eq!(wood.shininess, 96.0);
        assert_eq!(wood.diffuse, Vec3::new(0.6, 0.4, 0.2));
        assert_eq!(wood.opacity, 0.5);
        assert_eq!(wood.illumination, 2);
        assert_eq!(
            wood.maps,
            vec![
                (MapSlot::Diffuse, "wood.png".to_string()),
                (MapSlot::Specular, "wood_spec.png".to_string()),
            ]
        );

        let glass = &specs[1];
        assert_eq!(glass.optical_density, 1.45);
        // A malformed color keeps the default
        assert_eq!(glass.diffuse, Vec3::ONE);
        assert!(glass.maps.is_empty());
    }

    #[test]
    fn test_records_before_newmtl_ignored() {
        let specs = parse_mtl("lib.mtl", "Kd 1 0 0\nnewmtl a\n");
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].diffuse, Vec3::ONE);
    }

    #[test]
    fn test_file_name_strips_directories() {
        assert_eq!(file_name("a/b/c.png"), "c.png");
        assert_eq!(file_name("C:\\x\\y.tga"), "y.tga");
        assert_eq!(file_name("plain.jpg"), "plain.jpg");
    }
}
