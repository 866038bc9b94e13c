//! Error types for asset_relay

use thiserror::Error;

/// Main error type for asset operations
///
/// Load jobs running on workers never return these across the task
/// boundary; they log them and leave the entry unready.
#[derive(Error, Debug)]
pub enum AssetError {
    #[error("{kind} not found: {key}")]
    NotFound { kind: &'static str, key: String },

    #[error("Unable to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Unable to decode {path}: {reason}")]
    Decode { path: String, reason: String },

    #[error("{0} is already initialized")]
    AlreadyInitialized(&'static str),

    #[error("Invalid buffer: {0}")]
    InvalidBuffer(String),

    #[error("Parse error in {path} line {line}: {reason}")]
    Parse {
        path: String,
        line: usize,
        reason: String,
    },

    #[error("A cube map needs 6 faces, got {0}")]
    InvalidCubeMap(usize),

    #[error("GPU error: {0}")]
    Gpu(#[from] crate::gpu::GpuError),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl AssetError {
    /// Build an `Io` error tagged with the path that failed
    pub fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }
}

/// Result type alias for asset operations
pub type Result<T> = std::result::Result<T, AssetError>;
