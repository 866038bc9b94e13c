//! Mono versus multi scene loading benchmark
//!
//! The harness is a small state machine driven once per tick by the engine,
//! and only while nothing is loading: no task in flight and no deferred
//! request pending.
//!
//! ```text
//! start(n) ──► Running(Multi, n) ──► ... Running(Multi, 0)
//!                                         │
//!                                         ▼
//!              Running(Mono, n)  ──► ... Running(Mono, 0) ──► Idle
//! ```

pub mod report;
pub mod stats;

pub use report::{format_seconds, render_report};
pub use stats::{SceneCounts, SceneStats};

use crate::error::{AssetError, Result};
use crate::manager::LoadMode;
use std::path::Path;
use std::time::Instant;

/// Load times of one mode, in seconds
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleSet {
    samples: Vec<f32>,
    average: f32,
}

impl SampleSet {
    /// Record a sample and recompute the mean
    pub fn push(&mut self, seconds: f32) {
        self.samples.push(seconds);
        self.average = self.samples.iter().sum::<f32>() / self.samples.len() as f32;
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Arithmetic mean, 0 without samples
    pub fn average(&self) -> f32 {
        self.average
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
        self.average = 0.0;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BenchmarkState {
    Idle,
    Running { mode: LoadMode, remaining: u32 },
}

/// What the engine must do after an idle tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BenchmarkStep {
    /// Nothing to do
    Idle,
    /// Reload the scene in this mode and call [`Benchmark::begin_load`]
    Reload(LoadMode),
    /// The last mono run just completed
    Finished,
}

/// Benchmark state, samples and the pending load timer
#[derive(Debug)]
pub struct Benchmark {
    state: BenchmarkState,
    max_reloads: u32,
    multi: SampleSet,
    mono: SampleSet,
    timer: Option<(LoadMode, Instant)>,
}

impl Benchmark {
    pub fn new(max_reloads: u32) -> Self {
        Self {
            state: BenchmarkState::Idle,
            max_reloads,
            multi: SampleSet::default(),
            mono: SampleSet::default(),
            timer: None,
        }
    }

    /// Begin a run of `max_reloads` multi reloads followed by as many mono
    /// reloads
    ///
    /// Clears earlier samples and forgets any load being timed.
    pub fn start(&mut self, max_reloads: u32) -> Result<()> {
        if max_reloads == 0 {
            return Err(AssetError::Config(
                "a benchmark needs at least one reload".to_string(),
            ));
        }

        self.multi.clear();
        self.mono.clear();
        self.timer = None;
        self.max_reloads = max_reloads;
        self.state = BenchmarkState::Running {
            mode: LoadMode::Multi,
            remaining: max_reloads,
        };
        log::info!("[Benchmark] Started with {} reloads per mode", max_reloads);
        Ok(())
    }

    /// Abandon the run; a load already being timed is still recorded
    pub fn stop(&mut self) -> bool {
        let was_running = self.is_running();
        if was_running {
            log::info!("[Benchmark] Stopped");
        }
        self.state = BenchmarkState::Idle;
        was_running
    }

    /// Start timing a scene load
    pub fn begin_load(&mut self, mode: LoadMode, now: Instant) {
        self.timer = Some((mode, now));
    }

    /// Advance the state machine; call only when nothing is loading
    pub fn on_idle(&mut self, now: Instant) -> BenchmarkStep {
        if let Some((mode, started)) = self.timer.take() {
            let seconds = now.saturating_duration_since(started).as_secs_f32();
            self.samples_mut(mode).push(seconds);
            log::info!("[Benchmark] {} load took {}", mode, format_seconds(seconds));
        }

        let BenchmarkState::Running { mode, remaining } = self.state else {
            return BenchmarkStep::Idle;
        };

        let (mode, remaining) = match (mode, remaining) {
            (LoadMode::Multi, 0) => (LoadMode::Mono, self.max_reloads),
            (LoadMode::Mono, 0) => {
                self.state = BenchmarkState::Idle;
                log::info!(
                    "[Benchmark] Finished: multi {} / mono {}",
                    format_seconds(self.multi.average()),
                    format_seconds(self.mono.average())
                );
                return BenchmarkStep::Finished;
            }
            running => running,
        };

        self.state = BenchmarkState::Running {
            mode,
            remaining: remaining - 1,
        };
        BenchmarkStep::Reload(mode)
    }

    pub fn state(&self) -> BenchmarkState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, BenchmarkState::Running { .. })
    }

    /// Whether a load is being timed
    pub fn is_timing(&self) -> bool {
        self.timer.is_some()
    }

    pub fn max_reloads(&self) -> u32 {
        self.max_reloads
    }

    pub fn samples(&self, mode: LoadMode) -> &SampleSet {
        match mode {
            LoadMode::Multi => &self.multi,
            LoadMode::Mono => &self.mono,
        }
    }

    fn samples_mut(&mut self, mode: LoadMode) -> &mut SampleSet {
        match mode {
            LoadMode::Multi => &mut self.multi,
            LoadMode::Mono => &mut self.mono,
        }
    }

    /// `avg_mono / avg_multi`; above 1 means multi loading was faster
    ///
    /// `None` until both modes have a non-zero average.
    pub fn ratio(&self) -> Option<f32> {
        let (multi, mono) = (self.multi.average(), self.mono.average());
        (multi > 0.0 && mono > 0.0).then(|| mono / multi)
    }

    pub fn render_report(&self, counts: &SceneCounts) -> String {
        render_report(counts, &self.multi, &self.mono, self.ratio())
    }

    /// Write the report to `path`, creating parent directories
    pub fn write_report<P: AsRef<Path>>(&self, counts: &SceneCounts, path: P) -> Result<()> {
        report::write_text(path.as_ref(), &self.render_report(counts))
    }
}

impl Default for Benchmark {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_BENCHMARK_RELOADS)
    }
}
