use std::sync::Arc;

use ash::vk;

use crate::{
    device::Device,
    error::{DriverResultExt, Error, Result},
};

/// Timeout that never elapses.
pub const WAIT_FOREVER: u64 = u64::MAX;

pub struct Fence {
    pub handle: vk::Fence,
    device: Arc<Device>,
}

impl Fence {
    pub fn new(device: Arc<Device>, signaled: bool) -> Result<Self> {
        let flags = if signaled {
            vk::FenceCreateFlags::SIGNALED
        } else {
            vk::FenceCreateFlags::empty()
        };
        let handle = unsafe {
            device
                .handle
                .create_fence(&vk::FenceCreateInfo::builder().flags(flags), None)
        }
        .or_driver("vkCreateFence")?;
        Ok(Self { handle, device })
    }

    pub fn reset(&self) -> Result<()> {
        unsafe { self.device.handle.reset_fences(&[self.handle]) }.or_driver("vkResetFences")
    }

    pub fn is_signaled(&self) -> Result<bool> {
        unsafe { self.device.handle.get_fence_status(self.handle) }.or_driver("vkGetFenceStatus")
    }

    /// Blocks the calling thread for at most `timeout` nanoseconds.
    /// Returns `false` if the fence was still unsignalled when it elapsed.
    pub fn wait(&self, timeout: u64) -> Result<bool> {
        log::trace!("waiting on fence {:?} for {timeout}ns", self.handle);
        match unsafe { self.device.handle.wait_for_fences(&[self.handle], true, timeout) } {
            Ok(()) => Ok(true),
            Err(vk::Result::TIMEOUT) => Ok(false),
            Err(result) => Err(Error::Driver {
                operation: "vkWaitForFences",
                result,
            }),
        }
    }

    pub fn wait_forever(&self) -> Result<()> {
        self.wait(WAIT_FOREVER).map(|_| ())
    }
}

impl Drop for Fence {
    fn drop(&mut self) {
        unsafe { self.device.handle.destroy_fence(self.handle, None) };
    }
}
