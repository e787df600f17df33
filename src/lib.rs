//! Queue and memory planning on top of `ash`.
//!
//! Three pieces do the planning and never touch the driver themselves:
//! [`queue::resolve`] places capability requests onto queue families,
//! [`memory::select`] picks a memory type for a restriction mask, and
//! [`memory::pack`] lays several resources out in one allocation. The rest
//! of the crate feeds them a [`DeviceInventory`] and carries their answers
//! to the driver.

pub mod capability;
pub mod config;
pub mod device;
pub mod error;
pub mod instance;
pub mod inventory;
pub mod memory;
pub mod physical_device;
pub mod queue;
pub mod resource;
pub mod surface;
pub mod sync;

pub use capability::Capabilities;
pub use config::InstanceConfig;
pub use device::{Device, Queue};
pub use error::{Error, Result};
pub use instance::Instance;
pub use inventory::DeviceInventory;
pub use memory::{Allocation, MemoryPolicy};
pub use physical_device::PhysicalDevice;
pub use resource::{Buffer, Image, ImageDesc, MemoryBound};
pub use surface::Surface;
pub use sync::Fence;
