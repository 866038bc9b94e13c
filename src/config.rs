//! Engine configuration
//!
//! Every field has a default, so a TOML file only needs the keys it
//! overrides:
//!
//! ```toml
//! asset_root = "assets"
//! worker_count = 4
//! benchmark_reloads = 10
//!
//! [[shader_programs]]
//! name = "skyBox"
//! vertex = "shaders/skyBox.vert"
//! fragment = "shaders/skyBox.frag"
//! ```

use crate::error::{AssetError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default cap on deferred requests executed per tick
pub const MAX_REQUESTS_PER_TICK: usize = 3;

/// Default reloads per threading mode for a benchmark run
pub const DEFAULT_BENCHMARK_RELOADS: u32 = 5;

/// A shader program registered when the asset manager initializes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShaderProgramConfig {
    pub name: String,
    pub vertex: PathBuf,
    pub fragment: PathBuf,
    #[serde(default)]
    pub geometry: Option<PathBuf>,
}

impl ShaderProgramConfig {
    pub fn new<P: Into<PathBuf>>(name: &str, vertex: P, fragment: P) -> Self {
        Self {
            name: name.to_string(),
            vertex: vertex.into(),
            fragment: fragment.into(),
            geometry: None,
        }
    }

    pub fn with_geometry<P: Into<PathBuf>>(mut self, geometry: P) -> Self {
        self.geometry = Some(geometry.into());
        self
    }
}

/// The stock engine programs, under `shaders/` in the asset root
pub fn builtin_shader_programs() -> Vec<ShaderProgramConfig> {
    vec![
        ShaderProgramConfig::new(
            "shader",
            "shaders/vertexShader.vert",
            "shaders/fragmentShader.frag",
        ),
        ShaderProgramConfig::new("skyBox", "shaders/skyBox.vert", "shaders/skyBox.frag"),
        ShaderProgramConfig::new(
            "colliderShader",
            "shaders/vertexCollider.vert",
            "shaders/fragmentCollider.frag",
        ),
        ShaderProgramConfig::new(
            "spriteShader",
            "shaders/spriteVertex.vert",
            "shaders/spriteFragment.frag",
        ),
        ShaderProgramConfig::new(
            "depthShader",
            "shaders/depthShader.vert",
            "shaders/depthShader.frag",
        ),
        ShaderProgramConfig::new(
            "depthCubeShader",
            "shaders/depthCubeShader.vert",
            "shaders/depthShader.frag",
        )
        .with_geometry("shaders/depthCubeShader.geom"),
    ]
}

/// Configuration for an [`Engine`](crate::Engine)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Prefix for every relative resource path
    pub asset_root: PathBuf,
    /// Number of pool workers; `None` uses the hardware concurrency
    pub worker_count: Option<usize>,
    /// Deferred requests executed per tick
    pub max_requests_per_tick: usize,
    /// How long an idle worker blocks before re-checking for shutdown
    pub worker_idle_poll_ms: u64,
    /// Reloads per threading mode for a benchmark run
    pub benchmark_reloads: u32,
    /// Default benchmark report location
    pub report_path: PathBuf,
    /// Programs loaded by [`AssetManager::init`](crate::AssetManager::init)
    pub shader_programs: Vec<ShaderProgramConfig>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            asset_root: PathBuf::from("."),
            worker_count: None,
            max_requests_per_tick: MAX_REQUESTS_PER_TICK,
            worker_idle_poll_ms: 20,
            benchmark_reloads: DEFAULT_BENCHMARK_RELOADS,
            report_path: PathBuf::from("logs/benchmark.txt"),
            shader_programs: Vec::new(),
        }
    }
}

impl EngineConfig {
    /// Parse a configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| AssetError::io(path, e))?;
        log::info!("[EngineConfig] Loaded configuration from {}", path.display());
        Self::from_toml_str(&text)
    }

    /// Use `root` as the asset root
    pub fn with_asset_root<P: Into<PathBuf>>(mut self, root: P) -> Self {
        self.asset_root = root.into();
        self
    }

    /// Use a fixed worker count instead of the hardware concurrency
    pub fn with_workers(mut self, count: usize) -> Self {
        self.worker_count = Some(count);
        self
    }

    /// Register `programs` for loading at init
    pub fn with_shader_programs(mut self, programs: Vec<ShaderProgramConfig>) -> Self {
        self.shader_programs = programs;
        self
    }

    /// Worker count after resolving the hardware default
    pub fn resolved_worker_count(&self) -> usize {
        self.worker_count.unwrap_or_else(num_cpus::get).max(1)
    }

    pub fn idle_poll(&self) -> Duration {
        Duration::from_millis(self.worker_idle_poll_ms)
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.worker_count == Some(0) {
            return Err(AssetError::Config("worker_count cannot be 0".into()));
        }
        if self.max_requests_per_tick == 0 {
            return Err(AssetError::Config(
                "max_requests_per_tick cannot be 0".into(),
            ));
        }
        if self.worker_idle_poll_ms == 0 {
            return Err(AssetError::Config("worker_idle_poll_ms cannot be 0".into()));
        }
        if self.benchmark_reloads == 0 {
            return Err(AssetError::Config("benchmark_reloads cannot be 0".into()));
        }
        if let Some(program) = self.shader_programs.iter().find(|p| p.name.is_empty()) {
            return Err(AssetError::Config(format!(
                "shader program using {} has no name",
                program.vertex.display()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_requests_per_tick, 3);
        assert!(config.resolved_worker_count() >= 1);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = EngineConfig::from_toml_str("worker_count = 4\nasset_root = \"assets\"").unwrap();
        assert_eq!(config.worker_count, Some(4));
        assert_eq!(config.asset_root, PathBuf::from("assets"));
        assert_eq!(config.max_requests_per_tick, MAX_REQUESTS_PER_TICK);
        assert_eq!(config.report_path, PathBuf::from("logs/benchmark.txt"));
    }

    #[test]
    fn test_zero_workers_rejected() {
        let result = EngineConfig::from_toml_str("worker_count = 0");
        assert!(matches!(result, Err(AssetError::Config(_))));
    }

    #[test]
    fn test_shader_program_tables() {
        let config = EngineConfig::from_toml_str(
            "[[shader_programs]]\n\
             name = \"depthCubeShader\"\n\
             vertex = \"shaders/depthCubeShader.vert\"\n\
             fragment = \"shaders/depthShader.frag\"\n\
             geometry = \"shaders/depthCubeShader.geom\"\n\
             [[shader_programs]]\n\
             name = \"skyBox\"\n\
             vertex = \"shaders/skyBox.vert\"\n\
             fragment = \"shaders/skyBox.frag\"\n",
        )
        .unwrap();

        assert_eq!(config.shader_programs.len(), 2);
        assert_eq!(config.shader_programs[0], builtin_shader_programs()[5]);
        assert_eq!(config.shader_programs[1].geometry, None);
        assert!(EngineConfig::default().shader_programs.is_empty());
    }

    #[test]
    fn test_unnamed_shader_program_rejected() {
        let config = EngineConfig::default()
            .with_shader_programs(vec![ShaderProgramConfig::new("", "a.vert", "a.frag")]);
        assert!(matches!(config.validate(), Err(AssetError::Config(_))));
    }

    #[test]
    fn test_bad_toml_reported() {
        let result = EngineConfig::from_toml_str("worker_count = \"many\"");
        assert!(matches!(result, Err(AssetError::Toml(_))));
    }
}
