use crate::error::{AssetError, Result};
use std::path::Path;

/// A prefab description: one component record per line
///
/// The records are interpreted by the entity layer, not here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipe {
    pub path: String,
    pub records: Vec<String>,
}

impl Recipe {
    pub fn parse(path: &str, text: &str) -> Self {
        let records = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(str::to_string)
            .collect();
        Self {
            path: path.to_string(),
            records,
        }
    }

    pub fn read(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| AssetError::io(path, e))?;
        Ok(Self::parse(&path.display().to_string(), &text))
    }
}
