//! Fixed-size worker pool
//!
//! Workers block on a shared channel. The in-flight counter is raised before
//! a task is queued and lowered after it has run, so `running()` never
//! reports idle while work is queued or executing.

use super::{Task, TaskSpawner};
use crate::error::{AssetError, Result};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

const DEFAULT_IDLE_POLL: Duration = Duration::from_millis(20);

#[derive(Debug, Default)]
struct PoolState {
    in_flight: AtomicUsize,
    exited: AtomicUsize,
    initialized: AtomicBool,
    shutdown: AtomicBool,
}

/// Fixed pool of OS threads consuming one task queue
///
/// Completion order across workers is not preserved.
#[derive(Debug)]
pub struct WorkerPool {
    sender: Sender<Task>,
    receiver: Receiver<Task>,
    state: Arc<PoolState>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    worker_count: usize,
    idle_poll: Duration,
}

impl WorkerPool {
    /// Create a pool of `worker_count` workers (at least one)
    ///
    /// No thread is started until [`init`](Self::init).
    pub fn new(worker_count: usize) -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        Self {
            sender,
            receiver,
            state: Arc::new(PoolState::default()),
            workers: Mutex::new(Vec::new()),
            worker_count: worker_count.max(1),
            idle_poll: DEFAULT_IDLE_POLL,
        }
    }

    /// Create a pool sized to the hardware concurrency
    pub fn with_hardware_concurrency() -> Self {
        Self::new(num_cpus::get())
    }

    /// Bound on how long an idle worker waits before re-checking shutdown
    pub fn with_idle_poll(mut self, idle_poll: Duration) -> Self {
        self.idle_poll = idle_poll;
        self
    }

    /// Spawn the workers
    ///
    /// A second call logs a warning and leaves the pool untouched.
    pub fn init(&self) -> Result<()> {
        if self.state.initialized.swap(true, Ordering::SeqCst) {
            log::warn!("[WorkerPool] init called twice, ignoring");
            return Err(AssetError::AlreadyInitialized("WorkerPool"));
        }

        let mut workers = self.workers.lock();
        for index in 0..self.worker_count {
            let receiver = self.receiver.clone();
            let state = Arc::clone(&self.state);
            let idle_poll = self.idle_poll;
            let handle = thread::Builder::new()
                .name(format!("asset-worker-{index}"))
                .spawn(move || worker_loop(index, receiver, state, idle_poll))
                .map_err(|e| AssetError::io(format!("asset-worker-{index}"), e))?;
            workers.push(handle);
        }

        log::info!("[WorkerPool] Started {} workers", self.worker_count);
        Ok(())
    }

    /// Queue a task
    ///
    /// Tasks queued before `init` run once the workers start. After `end`
    /// the task is dropped.
    pub fn add_task(&self, task: Task) {
        if self.state.shutdown.load(Ordering::SeqCst) {
            log::warn!("[WorkerPool] Task submitted after shutdown, dropping it");
            return;
        }

        self.state.in_flight.fetch_add(1, Ordering::SeqCst);
        if self.sender.send(task).is_err() {
            // The pool owns a receiver, so this only happens mid-teardown.
            self.state.in_flight.fetch_sub(1, Ordering::SeqCst);
            log::error!("[WorkerPool] Task queue disconnected");
        }
    }

    /// Stop the workers and wait for them to exit
    ///
    /// Queued tasks that no worker picked up are discarded. Calling this
    /// twice is harmless.
    pub fn end(&self) {
        self.state.shutdown.store(true, Ordering::SeqCst);

        let handles: Vec<_> = self.workers.lock().drain(..).collect();
        let current = thread::current().id();
        for handle in handles {
            // The last owner can be a task on one of our own workers.
            if handle.thread().id() == current {
                continue;
            }
            let name = handle.thread().name().unwrap_or("asset-worker").to_string();
            if handle.join().is_err() {
                log::error!("[WorkerPool] {} panicked", name);
            }
        }

        let discarded = self.receiver.try_iter().count();
        if discarded > 0 {
            self.state.in_flight.fetch_sub(discarded, Ordering::SeqCst);
            log::warn!("[WorkerPool] {} queued tasks were never executed", discarded);
        }
    }

    /// Whether any task is queued or executing
    pub fn running(&self) -> bool {
        self.in_flight() > 0
    }

    /// Number of tasks queued or executing
    pub fn in_flight(&self) -> usize {
        self.state.in_flight.load(Ordering::SeqCst)
    }

    /// True once every worker has observed shutdown and exited
    pub fn allow_kill(&self) -> bool {
        self.state.initialized.load(Ordering::SeqCst)
            && self.state.exited.load(Ordering::SeqCst) == self.worker_count
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    pub fn is_initialized(&self) -> bool {
        self.state.initialized.load(Ordering::SeqCst)
    }
}

impl TaskSpawner for WorkerPool {
    fn spawn(&self, task: Task) {
        self.add_task(task);
    }

    fn running(&self) -> bool {
        WorkerPool::running(self)
    }

    fn runtime_name(&self) -> &'static str {
        "WorkerPool"
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.end();
    }
}

fn worker_loop(index: usize, receiver: Receiver<Task>, state: Arc<PoolState>, idle_poll: Duration) {
    while !state.shutdown.load(Ordering::SeqCst) {
        match receiver.recv_timeout(idle_poll) {
            Ok(task) => {
                task();
                state.in_flight.fetch_sub(1, Ordering::SeqCst);
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    log::debug!("[WorkerPool] Thread {} has finished", index);
    state.exited.fetch_add(1, Ordering::SeqCst);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn wait_idle(pool: &WorkerPool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while pool.running() {
            assert!(Instant::now() < deadline, "pool never became idle");
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn test_second_init_is_rejected() {
        let pool = WorkerPool::new(2);
        pool.init().unwrap();
        assert!(matches!(
            pool.init(),
            Err(AssetError::AlreadyInitialized(_))
        ));
        assert_eq!(pool.worker_count(), 2);
        pool.end();
    }

    #[test]
    fn test_tasks_before_init_run_after_init() {
        let pool = WorkerPool::new(2);
        let counter = Arc::new(AtomicUsize::new(0));
        for _ in 0..5 {
            let counter = counter.clone();
            pool.add_task(Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }));
        }
        assert_eq!(pool.in_flight(), 5);

        pool.init().unwrap();
        wait_idle(&pool);
        assert_eq!(counter.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn test_allow_kill_after_end() {
        let pool = WorkerPool::new(3).with_idle_poll(Duration::from_millis(5));
        assert!(!pool.allow_kill());
        pool.init().unwrap();
        assert!(!pool.allow_kill());
        pool.end();
        assert!(pool.allow_kill());
        // second end is a no-op
        pool.end();
        assert!(pool.allow_kill());
    }

    #[test]
    fn test_task_after_end_is_dropped() {
        let pool = WorkerPool::new(1);
        pool.init().unwrap();
        pool.end();
        pool.add_task(Box::new(|| panic!("must not run")));
        assert!(!pool.running());
    }

    #[test]
    fn test_end_discards_unstarted_tasks() {
        let pool = WorkerPool::new(1);
        for _ in 0..3 {
            pool.add_task(Box::new(|| {}));
        }
        // never initialized, so nothing picks these up
        pool.end();
        assert_eq!(pool.in_flight(), 0);
    }
}
