use ash::{prelude::VkResult, vk};
use thiserror::Error;

use crate::capability::Capabilities;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(
        "could not resolve a queue for requested capability {capabilities:?} (request {request})"
    )]
    UnsatisfiableCapability {
        request: usize,
        capabilities: Capabilities,
    },

    #[error("no memory type satisfies restriction mask {mask:#034b}")]
    UnsatisfiableMemory { mask: u32 },

    #[error("\"{operation}\" unsuccessful: {result}")]
    Driver {
        operation: &'static str,
        result: vk::Result,
    },

    #[error("required extension \"{name}\" unsupported by {device}")]
    MissingExtension { name: String, device: String },

    #[error("required layer \"{name}\" unsupported by {device}")]
    MissingLayer { name: String, device: String },

    #[error("resource is already bound to device memory")]
    AlreadyBound,

    #[error("resource is not bound to this allocation")]
    NotBound,

    #[error("device memory cannot be allocated with a size of zero")]
    EmptyAllocation,

    #[error(
        "cannot place {size} bytes aligned to {alignment} at offset {offset} \
         in an allocation of {allocation_size} bytes"
    )]
    Misplaced {
        offset: vk::DeviceSize,
        size: vk::DeviceSize,
        alignment: vk::DeviceSize,
        allocation_size: vk::DeviceSize,
    },

    #[error("window handle is not supported by any surface extension")]
    UnsupportedWindowHandle,

    #[error("could not load the Vulkan library: {0}")]
    Loading(#[from] ash::LoadingError),

    #[error("window handle unavailable: {0}")]
    WindowHandle(#[from] raw_window_handle::HandleError),

    #[error("string contains an interior nul byte: {0}")]
    Nul(#[from] std::ffi::NulError),
}

/// Tags a raw driver result with the name of the call that produced it.
pub trait DriverResultExt<T> {
    fn or_driver(self, operation: &'static str) -> Result<T>;
}

impl<T> DriverResultExt<T> for VkResult<T> {
    fn or_driver(self, operation: &'static str) -> Result<T> {
        self.map_err(|result| Error::Driver { operation, result })
    }
}
