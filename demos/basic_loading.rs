//! Basic loading example for asset_relay
//!
//! Loads one OBJ model on the worker pool and ticks until it is ready.

use anyhow::bail;
use asset_relay::{Engine, EngineConfig, LoadMode, MockGpu};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(about = "Load an OBJ model and print what it produced")]
struct CliArgs {
    /// OBJ file to load
    model: PathBuf,

    /// Load on the calling thread instead of the pool
    #[arg(long)]
    mono: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = CliArgs::parse();
    let mode = if args.mono { LoadMode::Mono } else { LoadMode::Multi };

    // A mock GPU device (no real hardware needed)
    let gpu = MockGpu::new();
    let mut engine = Engine::new(EngineConfig::default(), gpu.clone())?;
    println!("asset_relay v{}", asset_relay::VERSION);

    let model = engine.manager().load_model(&args.model, mode);
    if !engine.run_until_idle(Duration::from_secs(60)) || !model.is_ready() {
        bail!("{} did not load, see the log", args.model.display());
    }

    let Some(loaded) = model.get() else {
        bail!("{} has no data", args.model.display());
    };
    println!("Loaded {} in {} mode", args.model.display(), mode);
    for sub in &loaded.sub_models {
        let Some(mesh) = sub.mesh.get() else { continue };
        println!(
            "  {:<24} {:>8} triangles  material {}",
            mesh.name(),
            mesh.triangle_count(),
            sub.material.key()
        );
    }

    let metrics = engine.manager().models().metrics();
    if let Some(time) = metrics.load_time(model.key().as_str()) {
        println!("Parse time: {:.3} s", time.as_secs_f32());
    }
    println!(
        "GPU: {} buffers, {} textures, {} bytes",
        gpu.buffers_created(),
        gpu.textures_created(),
        gpu.allocated_bytes()
    );

    engine.shutdown();
    Ok(())
}
