//! asset_relay - Asset loading core with a worker pool and an owner-thread
//! GPU upload queue
//!
//! # Features
//! - Fixed worker pool with an idle check (`running()`)
//! - One deduplicating cache per resource kind, shared handles with a
//!   placeholder / populated / ready lifecycle
//! - Deferred requests drained on the thread that owns the GPU, a few per tick
//! - OBJ / MTL loading with fan triangulation, images, cube maps, shaders,
//!   fonts and recipes
//! - Mono versus multi loading benchmark with a plain-text report
//!
//! # Quick Start
//!
//! ```ignore
//! use asset_relay::{Engine, EngineConfig, LoadMode, MockGpu};
//!
//! let mut engine = Engine::new(EngineConfig::default(), MockGpu::new())?;
//! let model = engine.manager().load_model("models/crate.obj", LoadMode::Multi);
//! while !model.is_ready() {
//!     engine.tick();
//! }
//! ```

// Core modules
pub mod cache;
pub mod deferred;
pub mod gpu;
pub mod loader;
pub mod manager;
pub mod resources;
pub mod runtime;

// Support modules
pub mod benchmark;
pub mod config;
pub mod engine;
pub mod scene;

// Error types
mod error;
pub use error::{AssetError, Result};

// Re-export cache types
pub use cache::metrics::{AssetMetrics, AssetMetricsHandle};
pub use cache::{EntryState, Handle, ResourceCache, ResourceEntry, ResourceKey};

// Re-export GPU types
pub use gpu::{
    BufferUsage, GpuContext, GpuDevice, GpuError, GpuResult, GpuTextureFormat, MockGpu,
    TextureDescriptor,
};

// Re-export runtime types
pub use runtime::{InlineSpawner, SpawnBehavior, Task, TaskSpawner, WorkerPool};

// Re-export resource types
pub use resources::{
    CubeMap, Font, Material, MaterialLibrary, Mesh, MeshData, Model, Recipe, Shader,
    ShaderProgram, ShaderStage, SubModel, Texture, TextureData,
};

pub use benchmark::{Benchmark, BenchmarkState, BenchmarkStep, SampleSet, SceneCounts, SceneStats};
pub use config::{
    builtin_shader_programs, EngineConfig, ShaderProgramConfig, MAX_REQUESTS_PER_TICK,
};
pub use deferred::DeferredQueue;
pub use engine::Engine;
pub use manager::{AssetManager, DefaultResources, LoadMode};
pub use scene::{Scene, SceneObject};

// Version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
