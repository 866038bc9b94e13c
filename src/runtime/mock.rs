//! Inline spawner for testing
//!
//! Runs tasks on the calling thread, or drops them entirely, so loader
//! code paths can be exercised without worker threads.

use super::{Task, TaskSpawner};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Spawn behavior for InlineSpawner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnBehavior {
    /// Drop tasks immediately (don't execute)
    Drop,
    /// Run tasks synchronously on the spawning thread
    RunInline,
}

/// Spawner that never leaves the calling thread
#[derive(Debug)]
pub struct InlineSpawner {
    behavior: SpawnBehavior,
    in_flight: AtomicUsize,
    spawned: AtomicUsize,
}

impl Default for InlineSpawner {
    fn default() -> Self {
        Self::new()
    }
}

impl InlineSpawner {
    /// Create a spawner that runs tasks inline
    pub fn new() -> Self {
        Self::with_behavior(SpawnBehavior::RunInline)
    }

    /// Create a spawner with specific behavior
    pub fn with_behavior(behavior: SpawnBehavior) -> Self {
        Self {
            behavior,
            in_flight: AtomicUsize::new(0),
            spawned: AtomicUsize::new(0),
        }
    }

    /// Create a spawner that drops every task
    pub fn dropping() -> Self {
        Self::with_behavior(SpawnBehavior::Drop)
    }

    /// Total number of tasks handed to this spawner
    pub fn spawned(&self) -> usize {
        self.spawned.load(Ordering::SeqCst)
    }
}

impl TaskSpawner for InlineSpawner {
    fn spawn(&self, task: Task) {
        self.spawned.fetch_add(1, Ordering::SeqCst);
        match self.behavior {
            SpawnBehavior::Drop => drop(task),
            SpawnBehavior::RunInline => {
                self.in_flight.fetch_add(1, Ordering::SeqCst);
                task();
                self.in_flight.fetch_sub(1, Ordering::SeqCst);
            }
        }
    }

    fn running(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }

    fn runtime_name(&self) -> &'static str {
        "Inline"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;

    #[test]
    fn test_inline_spawner_drop() {
        let spawner = InlineSpawner::dropping();
        spawner.spawn(Box::new(|| panic!("Should not run")));
        assert_eq!(spawner.spawned(), 1);
        assert!(!spawner.running());
    }

    #[test]
    fn test_inline_spawner_runs_immediately() {
        let spawner = InlineSpawner::new();
        let ran = Arc::new(AtomicBool::new(false));
        let ran_clone = ran.clone();

        spawner.spawn(Box::new(move || {
            ran_clone.store(true, Ordering::SeqCst);
        }));

        assert!(ran.load(Ordering::SeqCst));
        assert!(!spawner.running());
    }

    #[test]
    fn test_inline_spawner_reports_running_inside_task() {
        let spawner = Arc::new(InlineSpawner::new());
        let seen = Arc::new(AtomicBool::new(false));
        let (inner, seen_clone) = (spawner.clone(), seen.clone());

        spawner.spawn(Box::new(move || {
            seen_clone.store(inner.running(), Ordering::SeqCst);
        }));

        assert!(seen.load(Ordering::SeqCst));
    }
}
