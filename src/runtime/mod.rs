//! Task execution abstraction
//!
//! Loads that run off the calling thread go through a [`TaskSpawner`]. The
//! engine uses a fixed [`WorkerPool`]; tests can swap in an
//! [`InlineSpawner`] to run the same code paths deterministically.

pub mod mock;
pub mod pool;

use std::fmt::Debug;

/// A fire-and-forget unit of work
///
/// Captures everything it needs by value or shared ownership. There is no
/// result channel and no cancellation.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Task spawner trait
///
/// # Example
/// ```ignore
/// let pool = WorkerPool::new(4);
/// pool.init()?;
/// pool.spawn(Box::new(|| println!("on a worker")));
/// ```
pub trait TaskSpawner: Send + Sync + Debug {
    /// Queue a task for execution
    fn spawn(&self, task: Task);

    /// Whether any spawned task has not finished yet
    fn running(&self) -> bool;

    /// Get the name of this spawner (for debugging)
    fn runtime_name(&self) -> &'static str;
}

// Re-export implementations
pub use mock::{InlineSpawner, SpawnBehavior};
pub use pool::WorkerPool;
