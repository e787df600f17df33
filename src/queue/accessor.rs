//! Submission front-ends for a resolved queue.
//!
//! [`DirectQueueAccessor`] submits without synchronisation and is therefore
//! `!Sync`: the compiler keeps it on one producer thread at a time.
//! [`MutexedQueueAccessor`] serialises every submission under one lock held
//! for the duration of the driver call, and can be shared through an `Arc`.

use std::{cell::Cell, marker::PhantomData, sync::Arc};

use ash::vk;
use parking_lot::Mutex;

use crate::{
    capability::Capabilities,
    device::{Device, Queue},
    error::{DriverResultExt, Result},
};

pub trait QueueAccessor {
    fn queue(&self) -> &Queue;

    fn submit(&self, submits: &[vk::SubmitInfo], fence: vk::Fence) -> Result<()>;

    fn capabilities(&self) -> Capabilities {
        self.queue().capabilities
    }

    fn family_index(&self) -> u32 {
        self.queue().family_index
    }

    fn transfer_capable(&self) -> bool {
        self.capabilities().contains(Capabilities::TRANSFER)
    }

    fn compute_capable(&self) -> bool {
        self.capabilities().contains(Capabilities::COMPUTE)
    }

    fn graphics_capable(&self) -> bool {
        self.capabilities().contains(Capabilities::GRAPHICS)
    }

    fn present_capable(&self) -> bool {
        self.capabilities().contains(Capabilities::PRESENTABLE)
    }
}

fn queue_submit(
    device: &Device,
    queue: &Queue,
    submits: &[vk::SubmitInfo],
    fence: vk::Fence,
) -> Result<()> {
    log::trace!(
        "submitting {} batch(es) to family {} slot {}",
        submits.len(),
        queue.family_index,
        queue.slot
    );
    unsafe { device.handle.queue_submit(queue.handle, submits, fence) }.or_driver("vkQueueSubmit")
}

pub struct DirectQueueAccessor {
    device: Arc<Device>,
    queue: Queue,
    _single_producer: PhantomData<Cell<()>>,
}

impl DirectQueueAccessor {
    /// Accessor for the queue granted to request `index`, if there is one.
    pub fn new(device: Arc<Device>, index: usize) -> Option<Self> {
        let queue = *device.queues.get(index)?;
        Some(Self {
            device,
            queue,
            _single_producer: PhantomData,
        })
    }
}

impl QueueAccessor for DirectQueueAccessor {
    fn queue(&self) -> &Queue {
        &self.queue
    }

    fn submit(&self, submits: &[vk::SubmitInfo], fence: vk::Fence) -> Result<()> {
        queue_submit(&self.device, &self.queue, submits, fence)
    }
}

pub struct MutexedQueueAccessor {
    device: Arc<Device>,
    queue: Queue,
    lock: Mutex<()>,
}

impl MutexedQueueAccessor {
    /// Accessor for the queue granted to request `index`, if there is one.
    ///
    /// Only submissions made through the same accessor are serialised; share
    /// one instance per queue.
    pub fn new(device: Arc<Device>, index: usize) -> Option<Self> {
        let queue = *device.queues.get(index)?;
        Some(Self {
            device,
            queue,
            lock: Mutex::new(()),
        })
    }
}

impl QueueAccessor for MutexedQueueAccessor {
    fn queue(&self) -> &Queue {
        &self.queue
    }

    fn submit(&self, submits: &[vk::SubmitInfo], fence: vk::Fence) -> Result<()> {
        let _guard = self.lock.lock();
        queue_submit(&self.device, &self.queue, submits, fence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn mutexed_accessor_can_be_shared_between_producers() {
        assert_send::<MutexedQueueAccessor>();
        assert_sync::<MutexedQueueAccessor>();
        assert_send::<Arc<MutexedQueueAccessor>>();
    }

    #[test]
    fn direct_accessor_can_move_between_threads() {
        assert_send::<DirectQueueAccessor>();
    }

    #[test]
    fn accessors_are_object_safe() {
        fn takes_any(_: Option<&dyn QueueAccessor>) {}
        takes_any(None);
    }
}
