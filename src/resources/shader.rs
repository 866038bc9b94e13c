//! Shader sources and programs
//!
//! Compiling and linking belong to the renderer. Here a shader is its
//! source text and a program is the set of stages it links.

use crate::cache::Handle;
use crate::error::{AssetError, Result};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    Geometry,
}

impl ShaderStage {
    /// Stage implied by a file extension (`vert`/`vs`, `frag`/`fs`, `geom`/`gs`)
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "vert" | "vs" => Some(Self::Vertex),
            "frag" | "fs" => Some(Self::Fragment),
            "geom" | "gs" => Some(Self::Geometry),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shader {
    pub path: String,
    pub stage: ShaderStage,
    pub source: String,
}

impl Shader {
    pub fn read(path: &Path) -> Result<Self> {
        let stage = ShaderStage::from_path(path).ok_or_else(|| AssetError::Parse {
            path: path.display().to_string(),
            line: 0,
            reason: "unknown shader stage extension".into(),
        })?;
        let source = std::fs::read_to_string(path).map_err(|e| AssetError::io(path, e))?;
        Ok(Self {
            path: path.display().to_string(),
            stage,
            source,
        })
    }
}

#[derive(Debug)]
pub struct ShaderProgram {
    pub name: String,
    pub vertex: Handle<Shader>,
    pub fragment: Handle<Shader>,
    pub geometry: Option<Handle<Shader>>,
}

impl ShaderProgram {
    /// Whether every stage loaded
    pub fn stages_ready(&self) -> bool {
        self.vertex.is_ready()
            && self.fragment.is_ready()
            && self.geometry.as_ref().map_or(true, |g| g.is_ready())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_from_extension() {
        assert_eq!(ShaderStage::from_path(Path::new("a/basic.vert")), Some(ShaderStage::Vertex));
        assert_eq!(ShaderStage::from_path(Path::new("basic.fs")), Some(ShaderStage::Fragment));
        assert_eq!(ShaderStage::from_path(Path::new("x.geom")), Some(ShaderStage::Geometry));
        assert_eq!(ShaderStage::from_path(Path::new("x.glsl")), None);
    }

    #[test]
    fn test_read_shader() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flat.frag");
        std::fs::write(&path, "void main() {}").unwrap();

        let shader = Shader::read(&path).unwrap();
        assert_eq!(shader.stage, ShaderStage::Fragment);
        assert_eq!(shader.source, "void main() {}");
    }
}
