//! Owner-thread guard around a GPU device

use super::{GpuDevice, GpuError, GpuResult};
use std::thread::{self, ThreadId};

/// A GPU device bound to the thread that created the context
///
/// Every GPU call goes through [`device`](Self::device), which refuses to
/// hand the device out on any other thread.
#[derive(Debug)]
pub struct GpuContext<G: GpuDevice> {
    device: G,
    owner: ThreadId,
}

impl<G: GpuDevice> GpuContext<G> {
    /// Bind `device` to the calling thread
    pub fn new(device: G) -> Self {
        Self {
            device,
            owner: thread::current().id(),
        }
    }

    /// Whether the calling thread owns the context
    pub fn is_owner(&self) -> bool {
        thread::current().id() == self.owner
    }

    pub fn owner(&self) -> ThreadId {
        self.owner
    }

    /// Borrow the device, only on the owning thread
    pub fn device(&self) -> GpuResult<&G> {
        if self.is_owner() {
            Ok(&self.device)
        } else {
            let current = thread::current();
            Err(GpuError::WrongThread(
                current.name().map(str::to_string).unwrap_or_else(|| format!("{:?}", current.id())),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::MockGpu;
    use std::sync::Arc;

    #[test]
    fn test_owner_thread_gets_device() {
        let context = GpuContext::new(MockGpu::new());
        assert!(context.is_owner());
        assert_eq!(context.device().unwrap().backend_name(), "Mock");
    }

    #[test]
    fn test_foreign_thread_is_refused() {
        let context = Arc::new(GpuContext::new(MockGpu::new()));
        let remote = context.clone();
        let refused = thread::spawn(move || {
            matches!(remote.device(), Err(GpuError::WrongThread(_)))
        })
        .join()
        .unwrap();
        assert!(refused);
    }
}
