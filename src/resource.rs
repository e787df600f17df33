//! Buffers and images: the resources an [`Allocation`] can back.
//!
//! A resource remembers which memory it was bound to and where, but does not
//! own that memory. Once bound, the binding never changes.

use std::sync::Arc;

use ash::vk;

use crate::{
    device::Device,
    error::{DriverResultExt, Error, Result},
    memory::{packer, Allocation},
};

use self::sealed::Bind as _;

/// Non-owning record of where a resource lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binding {
    pub memory: vk::DeviceMemory,
    pub offset: vk::DeviceSize,
}

pub(crate) mod sealed {
    use super::*;

    pub trait Bind {
        /// Issues the driver bind without recording it.
        fn bind_memory(&self, memory: vk::DeviceMemory, offset: vk::DeviceSize) -> Result<()>;

        fn record_binding(&mut self, binding: Binding);
    }
}

pub trait MemoryBound: sealed::Bind {
    fn memory_requirements(&self) -> vk::MemoryRequirements;

    fn binding(&self) -> Option<Binding>;

    fn is_bound(&self) -> bool {
        self.binding().is_some()
    }

    /// Binds at `offset`, which must satisfy the resource's alignment and
    /// leave it inside `allocation`.
    fn bind(&mut self, allocation: &Allocation, offset: vk::DeviceSize) -> Result<()> {
        bind_checked(self, allocation.handle, allocation.size, offset)
    }
}

fn bind_checked<R: MemoryBound + ?Sized>(
    resource: &mut R,
    memory: vk::DeviceMemory,
    allocation_size: vk::DeviceSize,
    offset: vk::DeviceSize,
) -> Result<()> {
    if resource.is_bound() {
        return Err(Error::AlreadyBound);
    }
    packer::check_placement(&resource.memory_requirements(), offset, allocation_size)?;
    resource.bind_memory(memory, offset)?;
    resource.record_binding(Binding { memory, offset });
    Ok(())
}

/// Binds every resource at its offset in `memory`, recording the bindings
/// only once the driver has accepted all of them.
///
/// When the driver rejects resource `k`, resources `0..k` are already bound
/// at the driver and cannot be bound again. They keep a binding to `memory`
/// so a later [`MemoryBound::bind`] fails with [`Error::AlreadyBound`]
/// instead of reaching the driver; such resources must be discarded.
pub(crate) fn bind_all(
    resources: &mut [&mut dyn MemoryBound],
    memory: vk::DeviceMemory,
    offsets: &[vk::DeviceSize],
) -> Result<()> {
    let mut outcome = Ok(());
    let mut accepted = 0;
    for (resource, &offset) in resources.iter().zip(offsets) {
        if let Err(error) = resource.bind_memory(memory, offset) {
            outcome = Err(error);
            break;
        }
        accepted += 1;
    }
    for (resource, &offset) in resources[..accepted].iter_mut().zip(offsets) {
        resource.record_binding(Binding { memory, offset });
    }
    outcome
}

pub struct Buffer {
    pub handle: vk::Buffer,
    pub size: vk::DeviceSize,
    pub usage: vk::BufferUsageFlags,
    device: Arc<Device>,
    binding: Option<Binding>,
}

impl Buffer {
    pub fn new(
        device: Arc<Device>,
        size: vk::DeviceSize,
        usage: vk::BufferUsageFlags,
    ) -> Result<Self> {
        let handle = unsafe {
            device.handle.create_buffer(
                &vk::BufferCreateInfo::builder()
                    .size(size)
                    .usage(usage)
                    .sharing_mode(vk::SharingMode::EXCLUSIVE),
                None,
            )
        }
        .or_driver("vkCreateBuffer")?;
        Ok(Self {
            handle,
            size,
            usage,
            device,
            binding: None,
        })
    }

    pub fn descriptor_info(
        &self,
        offset: vk::DeviceSize,
        range: vk::DeviceSize,
    ) -> vk::DescriptorBufferInfo {
        vk::DescriptorBufferInfo {
            buffer: self.handle,
            offset,
            range,
        }
    }
}

impl sealed::Bind for Buffer {
    fn bind_memory(&self, memory: vk::DeviceMemory, offset: vk::DeviceSize) -> Result<()> {
        unsafe { self.device.handle.bind_buffer_memory(self.handle, memory, offset) }
            .or_driver("vkBindBufferMemory")
    }

    fn record_binding(&mut self, binding: Binding) {
        self.binding = Some(binding);
    }
}

impl MemoryBound for Buffer {
    fn memory_requirements(&self) -> vk::MemoryRequirements {
        unsafe { self.device.handle.get_buffer_memory_requirements(self.handle) }
    }

    fn binding(&self) -> Option<Binding> {
        self.binding
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        unsafe { self.device.handle.destroy_buffer(self.handle, None) };
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ImageDesc {
    pub image_type: vk::ImageType,
    pub format: vk::Format,
    pub extent: vk::Extent3D,
    pub usage: vk::ImageUsageFlags,
    pub tiling: vk::ImageTiling,
    pub mip_levels: u32,
    pub array_layers: u32,
    pub samples: vk::SampleCountFlags,
}

impl ImageDesc {
    pub fn new_2d(format: vk::Format, width: u32, height: u32, usage: vk::ImageUsageFlags) -> Self {
        Self {
            image_type: vk::ImageType::TYPE_2D,
            format,
            extent: vk::Extent3D {
                width,
                height,
                depth: 1,
            },
            usage,
            tiling: vk::ImageTiling::OPTIMAL,
            mip_levels: 1,
            array_layers: 1,
            samples: vk::SampleCountFlags::TYPE_1,
        }
    }
}

pub struct Image {
    pub handle: vk::Image,
    pub desc: ImageDesc,
    device: Arc<Device>,
    binding: Option<Binding>,
}

impl Image {
    pub fn new(device: Arc<Device>, desc: ImageDesc) -> Result<Self> {
        let handle = unsafe {
            device.handle.create_image(
                &vk::ImageCreateInfo::builder()
                    .image_type(desc.image_type)
                    .format(desc.format)
                    .extent(desc.extent)
                    .mip_levels(desc.mip_levels)
                    .array_layers(desc.array_layers)
                    .samples(desc.samples)
                    .tiling(desc.tiling)
                    .usage(desc.usage)
                    .sharing_mode(vk::SharingMode::EXCLUSIVE)
                    .initial_layout(vk::ImageLayout::UNDEFINED),
                None,
            )
        }
        .or_driver("vkCreateImage")?;
        Ok(Self {
            handle,
            desc,
            device,
            binding: None,
        })
    }
}

impl sealed::Bind for Image {
    fn bind_memory(&self, memory: vk::DeviceMemory, offset: vk::DeviceSize) -> Result<()> {
        unsafe { self.device.handle.bind_image_memory(self.handle, memory, offset) }
            .or_driver("vkBindImageMemory")
    }

    fn record_binding(&mut self, binding: Binding) {
        self.binding = Some(binding);
    }
}

impl MemoryBound for Image {
    fn memory_requirements(&self) -> vk::MemoryRequirements {
        unsafe { self.device.handle.get_image_memory_requirements(self.handle) }
    }

    fn binding(&self) -> Option<Binding> {
        self.binding
    }
}

impl Drop for Image {
    fn drop(&mut self) {
        unsafe { self.device.handle.destroy_image(self.handle, None) };
    }
}
