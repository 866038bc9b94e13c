//! Top-level engine context
//!
//! Ties the worker pool, the asset manager, the current scene and the
//! benchmark harness together. The thread that builds the engine owns the
//! GPU context and must be the one calling [`Engine::tick`].

use crate::benchmark::{Benchmark, BenchmarkStep, SceneCounts};
use crate::config::EngineConfig;
use crate::error::{AssetError, Result};
use crate::gpu::{GpuDevice, MockGpu};
use crate::manager::{AssetManager, LoadMode};
use crate::runtime::{TaskSpawner, WorkerPool};
use crate::scene::Scene;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Engine context: one per owning thread
///
/// # Example
/// ```ignore
/// let mut engine = Engine::new(EngineConfig::default(), MockGpu::new())?;
/// engine.load_scene("scenes/demo.scn", LoadMode::Multi)?;
/// engine.run_until_idle(Duration::from_secs(10));
/// ```
pub struct Engine<G: GpuDevice = MockGpu> {
    config: EngineConfig,
    pool: Arc<WorkerPool>,
    manager: AssetManager<G>,
    scene: Arc<Mutex<Scene<G>>>,
    scene_path: Option<PathBuf>,
    mode: LoadMode,
    mode_before_benchmark: LoadMode,
    benchmark: Benchmark,
}

impl<G: GpuDevice> Engine<G> {
    /// Start the worker pool and create the default resources
    pub fn new(config: EngineConfig, gpu: G) -> Result<Self> {
        config.validate()?;

        let pool = Arc::new(
            WorkerPool::new(config.resolved_worker_count()).with_idle_poll(config.idle_poll()),
        );
        pool.init()?;

        let spawner: Arc<dyn TaskSpawner> = pool.clone();
        let manager = AssetManager::new(gpu, spawner, &config);
        manager.init()?;

        log::info!(
            "[Engine] Ready with {} workers, asset root {}",
            pool.worker_count(),
            config.asset_root.display()
        );

        Ok(Self {
            benchmark: Benchmark::new(config.benchmark_reloads),
            config,
            pool,
            manager,
            scene: Arc::new(Mutex::new(Scene::new())),
            scene_path: None,
            mode: LoadMode::Multi,
            mode_before_benchmark: LoadMode::Multi,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn manager(&self) -> &AssetManager<G> {
        &self.manager
    }

    pub fn pool(&self) -> &Arc<WorkerPool> {
        &self.pool
    }

    /// The current scene; locked by a pool task during a mono benchmark load
    pub fn scene(&self) -> &Arc<Mutex<Scene<G>>> {
        &self.scene
    }

    pub fn benchmark(&self) -> &Benchmark {
        &self.benchmark
    }

    pub fn mode(&self) -> LoadMode {
        self.mode
    }

    /// Mode used by the next [`reload`](Self::reload)
    pub fn set_mode(&mut self, mode: LoadMode) {
        self.mode = mode;
    }

    /// Replace the current scene with the one at `path`
    pub fn load_scene<P: AsRef<Path>>(&mut self, path: P, mode: LoadMode) -> Result<()> {
        self.scene_path = Some(path.as_ref().to_path_buf());
        self.mode = mode;
        self.reload()
    }

    /// Clear the scene and load it again in the current mode
    ///
    /// Pending deferred requests are kept: they belong to entries some
    /// other holder may still be waiting on.
    pub fn reload(&mut self) -> Result<()> {
        let path = self
            .scene_path
            .clone()
            .ok_or_else(|| AssetError::Config("no scene loaded".to_string()))?;
        let mode = self.mode;

        self.manager.stats().reset();
        self.scene.lock().clear(&self.manager);
        self.benchmark.begin_load(mode, Instant::now());

        if mode == LoadMode::Mono && self.benchmark.is_running() {
            // Parsed on a worker so this thread keeps draining the uploads
            let manager = self.manager.clone();
            let scene = Arc::clone(&self.scene);
            self.pool.add_task(Box::new(move || {
                if let Err(e) = scene.lock().load(&manager, &path, mode) {
                    log::error!("[Engine] Scene reload failed: {}", e);
                }
            }));
            Ok(())
        } else {
            self.scene.lock().load(&self.manager, &path, mode)
        }
    }

    /// One frame of owner-thread work
    ///
    /// Advances the benchmark when nothing is loading, then runs up to the
    /// per-tick cap of deferred requests. Returns how many ran.
    pub fn tick(&mut self) -> usize {
        if self.manager.is_idle() {
            self.step_benchmark();
        }
        self.manager.check_requests()
    }

    /// No task in flight and no deferred request pending
    pub fn is_idle(&self) -> bool {
        self.manager.is_idle()
    }

    /// Tick until every load, timed sample and benchmark run has completed
    ///
    /// Returns `false` if `timeout` elapsed first.
    pub fn run_until_idle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            self.tick();
            if self.is_idle() && !self.benchmark.is_running() && !self.benchmark.is_timing() {
                return true;
            }
            if Instant::now() >= deadline {
                log::warn!(
                    "[Engine] Still busy after {:?}: {} tasks, {} requests",
                    timeout,
                    self.pool.in_flight(),
                    self.manager.pending_requests()
                );
                return false;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    /// Run `reloads` multi reloads then as many mono reloads of the current
    /// scene; `None` uses the configured count
    pub fn start_benchmark(&mut self, reloads: Option<u32>) -> Result<()> {
        if self.scene_path.is_none() {
            return Err(AssetError::Config(
                "load a scene before starting a benchmark".to_string(),
            ));
        }

        let was_running = self.benchmark.is_running();
        self.benchmark
            .start(reloads.unwrap_or(self.config.benchmark_reloads))?;
        if !was_running {
            self.mode_before_benchmark = self.mode;
        }
        self.manager.set_benchmark_active(true);
        Ok(())
    }

    /// Abandon a running benchmark; returns whether one was running
    pub fn stop_benchmark(&mut self) -> bool {
        let was_running = self.benchmark.stop();
        if was_running {
            self.finish_benchmark();
        }
        was_running
    }

    pub fn scene_counts(&self) -> SceneCounts {
        self.manager.stats().snapshot()
    }

    /// Write the benchmark report; `None` uses the configured path
    pub fn write_report(&self, path: Option<&Path>) -> Result<()> {
        let path = path.unwrap_or(self.config.report_path.as_path());
        self.benchmark.write_report(&self.scene_counts(), path)
    }

    /// Stop the benchmark, release the scene and join the workers
    ///
    /// Returns whether every worker exited.
    pub fn shutdown(&mut self) -> bool {
        self.stop_benchmark();
        self.scene.lock().clear(&self.manager);
        self.pool.end();
        let clean = self.pool.allow_kill();
        log::info!("[Engine] Shut down (clean: {})", clean);
        clean
    }

    fn step_benchmark(&mut self) {
        match self.benchmark.on_idle(Instant::now()) {
            BenchmarkStep::Idle => {}
            BenchmarkStep::Reload(mode) => {
                self.mode = mode;
                if let Err(e) = self.reload() {
                    log::error!("[Engine] Benchmark reload failed, stopping: {}", e);
                    self.benchmark.stop();
                    self.finish_benchmark();
                }
            }
            BenchmarkStep::Finished => {
                self.finish_benchmark();
                if let Some(ratio) = self.benchmark.ratio() {
                    log::info!("[Engine] Benchmark ratio mono/multi: {:.3}", ratio);
                }
            }
        }
    }

    fn finish_benchmark(&mut self) {
        self.manager.set_benchmark_active(false);
        self.mode = self.mode_before_benchmark;
    }
}

impl<G: GpuDevice> std::fmt::Debug for Engine<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("scene_path", &self.scene_path)
            .field("mode", &self.mode)
            .field("benchmark", &self.benchmark.state())
            .field("manager", &self.manager)
            .finish()
    }
}

impl<G: GpuDevice> Drop for Engine<G> {
    fn drop(&mut self) {
        // Tasks hold manager clones, which hold the pool; end it explicitly.
        self.pool.end();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> Engine {
        let config = EngineConfig::default().with_workers(2);
        Engine::new(config, MockGpu::new()).unwrap()
    }

    #[test]
    fn test_new_creates_defaults() {
        let engine = engine();
        assert!(engine.manager().defaults().is_some());
        assert_eq!(engine.pool().worker_count(), 2);
        assert!(engine.is_idle());
    }

    #[test]
    fn test_benchmark_needs_a_scene() {
        let mut engine = engine();
        assert!(matches!(
            engine.start_benchmark(Some(2)),
            Err(AssetError::Config(_))
        ));
        assert!(matches!(engine.reload(), Err(AssetError::Config(_))));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = EngineConfig::default().with_workers(0);
        assert!(Engine::new(config, MockGpu::new()).is_err());
    }

    #[test]
    fn test_shutdown_joins_workers() {
        let mut engine = engine();
        assert!(engine.shutdown());
    }
}
