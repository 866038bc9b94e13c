use crate::error::{AssetError, Result};
use std::path::Path;

/// Raw font file contents; glyph rasterization is up to the renderer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Font {
    pub path: String,
    pub bytes: Vec<u8>,
}

impl Font {
    pub fn read(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| AssetError::io(path, e))?;
        if bytes.is_empty() {
            return Err(AssetError::InvalidBuffer(format!(
                "font {} is empty",
                path.display()
            )));
        }
        Ok(Self {
            path: path.display().to_string(),
            bytes,
        })
    }
}
