//! Owner-thread request queue
//!
//! Any thread can queue a closure that needs the GPU device. The thread
//! owning the graphics context drains at most a fixed number of them per
//! tick, in submission order.

use crate::config::MAX_REQUESTS_PER_TICK;
use crate::gpu::GpuDevice;
use crossbeam_channel::{Receiver, Sender};
use std::fmt;

/// Work that must run on the thread owning the GPU context
pub type DeferredRequest<G> = Box<dyn FnOnce(&G) + Send + 'static>;

/// Unbounded FIFO of [`DeferredRequest`]s
pub struct DeferredQueue<G: GpuDevice> {
    sender: Sender<DeferredRequest<G>>,
    receiver: Receiver<DeferredRequest<G>>,
    max_per_tick: usize,
}

impl<G: GpuDevice> DeferredQueue<G> {
    /// Create a queue draining `max_per_tick` requests per tick (at least one)
    pub fn new(max_per_tick: usize) -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        Self {
            sender,
            receiver,
            max_per_tick: max_per_tick.max(1),
        }
    }

    /// Queue a request; never blocks
    pub fn add_request<F>(&self, request: F)
    where
        F: FnOnce(&G) + Send + 'static,
    {
        // Both ends live in `self`, so the channel cannot be disconnected.
        let _ = self.sender.send(Box::new(request));
    }

    /// Run up to `max_per_tick` queued requests against `gpu`
    ///
    /// Must only be called on the thread owning `gpu`. Returns how many ran.
    pub fn check_requests(&self, gpu: &G) -> usize {
        let mut executed = 0;
        while executed < self.max_per_tick {
            match self.receiver.try_recv() {
                Ok(request) => {
                    request(gpu);
                    executed += 1;
                }
                Err(_) => break,
            }
        }
        executed
    }

    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    pub fn max_per_tick(&self) -> usize {
        self.max_per_tick
    }

    /// Drop every queued request without running it
    pub fn clear(&self) -> usize {
        self.receiver.try_iter().count()
    }
}

impl<G: GpuDevice> Default for DeferredQueue<G> {
    fn default() -> Self {
        Self::new(MAX_REQUESTS_PER_TICK)
    }
}

impl<G: GpuDevice> fmt::Debug for DeferredQueue<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredQueue")
            .field("pending", &self.len())
            .field("max_per_tick", &self.max_per_tick)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::MockGpu;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn test_cap_and_order() {
        let queue: DeferredQueue<MockGpu> = DeferredQueue::default();
        let gpu = MockGpu::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for i in 0..10 {
            let order = order.clone();
            queue.add_request(move |_| order.lock().push(i));
        }
        assert_eq!(queue.len(), 10);

        assert_eq!(queue.check_requests(&gpu), 3);
        assert_eq!(*order.lock(), vec![0, 1, 2]);
        assert_eq!(queue.check_requests(&gpu), 3);
        assert_eq!(*order.lock(), vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(queue.check_requests(&gpu), 3);
        assert_eq!(queue.check_requests(&gpu), 1);
        assert_eq!(queue.check_requests(&gpu), 0);
        assert_eq!(*order.lock(), (0..10).collect::<Vec<_>>());
        assert!(queue.is_empty());
    }

    #[test]
    fn test_request_may_queue_more_work() {
        let queue = Arc::new(DeferredQueue::<MockGpu>::new(1));
        let gpu = MockGpu::new();
        let inner = queue.clone();
        queue.add_request(move |_| inner.add_request(|_| {}));

        assert_eq!(queue.check_requests(&gpu), 1);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_clear_drops_pending() {
        let queue: DeferredQueue<MockGpu> = DeferredQueue::new(3);
        queue.add_request(|_| panic!("must not run"));
        queue.add_request(|_| panic!("must not run"));
        assert_eq!(queue.clear(), 2);
        assert_eq!(queue.check_requests(&MockGpu::new()), 0);
    }
}
