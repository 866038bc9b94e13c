//! Load a scene, then benchmark multi against mono reloads of it
//!
//! ```text
//! RUST_LOG=info cargo run --example scene_benchmark -- scenes/demo.scn --assets assets -r 5
//! ```

use anyhow::bail;
use asset_relay::{Engine, EngineConfig, LoadMode, MockGpu};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "scene_benchmark")]
#[command(about = "Compare multi-threaded and single-threaded scene loading")]
struct CliArgs {
    /// Scene manifest, relative to the asset root
    scene: PathBuf,

    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Asset root, overriding the configuration
    #[arg(long)]
    assets: Option<PathBuf>,

    /// Reloads per threading mode
    #[arg(short, long)]
    reloads: Option<u32>,

    /// Worker threads (defaults to the hardware concurrency)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Report location, overriding the configuration
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Give up after this many seconds
    #[arg(long, default_value_t = 300)]
    timeout: u64,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = CliArgs::parse();

    let mut config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if let Some(assets) = args.assets {
        config = config.with_asset_root(assets);
    }
    if let Some(workers) = args.workers {
        config = config.with_workers(workers);
    }
    let timeout = Duration::from_secs(args.timeout);

    let mut engine = Engine::new(config, MockGpu::new())?;
    engine.load_scene(&args.scene, LoadMode::Multi)?;
    if !engine.run_until_idle(timeout) {
        bail!("{} did not finish loading", args.scene.display());
    }

    engine.start_benchmark(args.reloads)?;
    if !engine.run_until_idle(timeout) {
        bail!("benchmark did not finish within {:?}", timeout);
    }

    engine.write_report(args.output.as_deref())?;
    print!(
        "{}",
        engine.benchmark().render_report(&engine.scene_counts())
    );

    if !engine.shutdown() {
        log::warn!("Some workers did not exit");
    }
    Ok(())
}
