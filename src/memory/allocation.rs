use std::{ffi::c_void, sync::Arc};

use ash::vk;

use crate::{
    device::Device,
    error::{DriverResultExt, Error, Result},
    memory::{
        packer,
        selector::{self, MemoryPolicy},
    },
    resource::{self, MemoryBound},
};

/// Byte range currently mapped into host address space. On memory that is
/// not host-coherent it covers whole non-coherent atoms, so it is also the
/// range flushed on unmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MappedRange {
    pub offset: vk::DeviceSize,
    pub size: vk::DeviceSize,
}

/// One block of device memory, optionally shared by several resources.
///
/// Must outlive every resource bound into it.
pub struct Allocation {
    pub handle: vk::DeviceMemory,
    pub size: vk::DeviceSize,
    pub memory_type: u32,
    device: Arc<Device>,
    mapped: Option<MappedRange>,
}

impl Allocation {
    /// Fails with [`Error::EmptyAllocation`] when `size` is zero.
    pub fn new(device: Arc<Device>, memory_type: u32, size: vk::DeviceSize) -> Result<Self> {
        let size = checked_size(size)?;
        let handle = unsafe {
            device.handle.allocate_memory(
                &vk::MemoryAllocateInfo::builder()
                    .allocation_size(size)
                    .memory_type_index(memory_type),
                None,
            )
        }
        .or_driver("vkAllocateMemory")?;
        log::debug!("allocated {size} bytes of memory type {memory_type}");
        Ok(Self {
            handle,
            size,
            memory_type,
            device,
            mapped: None,
        })
    }

    /// Packs `resources` back to back in the order given, allocates exactly
    /// enough memory for all of them and binds each at its offset.
    ///
    /// Either every resource ends up bound or the call fails. An empty list
    /// fails with [`Error::EmptyAllocation`]. If a driver bind fails, the
    /// resources the driver had already bound report a binding to the freed
    /// memory and must be discarded.
    pub fn with_resources(
        device: Arc<Device>,
        memory_type: u32,
        resources: &mut [&mut dyn MemoryBound],
    ) -> Result<Self> {
        if resources.iter().any(|resource| resource.is_bound()) {
            return Err(Error::AlreadyBound);
        }
        let requirements: Vec<_> = resources
            .iter()
            .map(|resource| resource.memory_requirements())
            .collect();
        let layout = packer::pack(&requirements);
        let allocation = Self::new(device, memory_type, layout.size)?;

        resource::bind_all(resources, allocation.handle, &layout.offsets)?;
        Ok(allocation)
    }

    /// Like [`Allocation::with_resources`], choosing the memory type from
    /// the types every resource accepts.
    pub fn for_resources(
        device: Arc<Device>,
        policy: MemoryPolicy,
        resources: &mut [&mut dyn MemoryBound],
    ) -> Result<Self> {
        if resources.is_empty() {
            return Err(Error::EmptyAllocation);
        }
        let mask = resources.iter().fold(!0u32, |mask, resource| {
            mask & resource.memory_requirements().memory_type_bits
        });
        let memory_type = selector::select(&device.physical_device.inventory, mask, policy)?;
        Self::with_resources(device, memory_type, resources)
    }

    pub fn mapped(&self) -> Option<MappedRange> {
        self.mapped
    }

    /// Maps `size` bytes at `offset`, unmapping any earlier range first.
    /// `vk::WHOLE_SIZE` maps to the end of the allocation. The returned
    /// pointer addresses `offset` even when the mapping itself was widened to
    /// whole atoms.
    pub fn map(&mut self, offset: vk::DeviceSize, size: vk::DeviceSize) -> Result<*mut c_void> {
        if self.mapped.is_some() {
            self.unmap()?;
        }
        let range = if self.is_coherent() {
            MappedRange { offset, size }
        } else {
            let atom = self
                .device
                .physical_device
                .properties
                .limits
                .non_coherent_atom_size;
            atom_range(offset, size, atom, self.size)
        };
        let base = unsafe {
            self.device.handle.map_memory(
                self.handle,
                range.offset,
                range.size,
                vk::MemoryMapFlags::empty(),
            )
        }
        .or_driver("vkMapMemory")?;
        self.mapped = Some(range);
        let lead = (offset - range.offset) as usize;
        Ok(unsafe { base.cast::<u8>().add(lead) }.cast())
    }

    /// Maps exactly the bytes `resource` occupies in this allocation.
    pub fn map_resource(&mut self, resource: &dyn MemoryBound) -> Result<*mut c_void> {
        match resource.binding() {
            Some(binding) if binding.memory == self.handle => {
                let size = resource.memory_requirements().size;
                self.map(binding.offset, size)
            }
            _ => Err(Error::NotBound),
        }
    }

    /// Flushes the mapped range when the memory is not host-coherent, then
    /// unmaps. Does nothing when nothing is mapped.
    pub fn unmap(&mut self) -> Result<()> {
        let Some(range) = self.mapped.take() else {
            return Ok(());
        };
        let flushed = if self.is_coherent() {
            Ok(())
        } else {
            let flush = vk::MappedMemoryRange::builder()
                .memory(self.handle)
                .offset(range.offset)
                .size(range.size)
                .build();
            unsafe { self.device.handle.flush_mapped_memory_ranges(&[flush]) }
                .or_driver("vkFlushMappedMemoryRanges")
        };
        unsafe { self.device.handle.unmap_memory(self.handle) };
        flushed
    }

    fn is_coherent(&self) -> bool {
        self.device
            .physical_device
            .inventory
            .memory_type(self.memory_type)
            .is_some_and(|memory_type| {
                memory_type
                    .properties
                    .contains(vk::MemoryPropertyFlags::HOST_COHERENT)
            })
    }
}

impl Drop for Allocation {
    fn drop(&mut self) {
        if let Err(error) = self.unmap() {
            log::warn!("unmapping memory before free failed: {error}");
        }
        unsafe { self.device.handle.free_memory(self.handle, None) };
    }
}

fn checked_size(size: vk::DeviceSize) -> Result<vk::DeviceSize> {
    match size {
        0 => Err(Error::EmptyAllocation),
        size => Ok(size),
    }
}

/// Widens `[offset, offset + size)` to whole non-coherent atoms, ending at
/// `vk::WHOLE_SIZE` when the rounded end would reach the allocation's end.
fn atom_range(
    offset: vk::DeviceSize,
    size: vk::DeviceSize,
    atom: vk::DeviceSize,
    allocation_size: vk::DeviceSize,
) -> MappedRange {
    let start = match atom {
        0 => offset,
        atom => offset - offset % atom,
    };
    if size == vk::WHOLE_SIZE {
        return MappedRange {
            offset: start,
            size: vk::WHOLE_SIZE,
        };
    }
    let end = packer::align_up(offset + size, atom);
    let size = if end >= allocation_size {
        vk::WHOLE_SIZE
    } else {
        end - start
    };
    MappedRange {
        offset: start,
        size,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(offset: vk::DeviceSize, size: vk::DeviceSize) -> MappedRange {
        MappedRange { offset, size }
    }

    #[test]
    fn mapping_widens_to_whole_atoms() {
        assert_eq!(atom_range(16, 5, 64, 1024), range(0, 64));
        assert_eq!(atom_range(70, 10, 64, 1024), range(64, 64));
        assert_eq!(atom_range(128, 64, 64, 1024), range(128, 64));
        assert_eq!(atom_range(60, 10, 64, 1024), range(0, 128));
    }

    #[test]
    fn mapping_uses_whole_size_at_the_tail() {
        assert_eq!(atom_range(960, 30, 64, 1000), range(960, vk::WHOLE_SIZE));
        assert_eq!(atom_range(0, vk::WHOLE_SIZE, 64, 1000), range(0, vk::WHOLE_SIZE));
        assert_eq!(atom_range(100, vk::WHOLE_SIZE, 64, 1000), range(64, vk::WHOLE_SIZE));
    }

    #[test]
    fn mapping_with_zero_atom_is_unchanged() {
        assert_eq!(atom_range(3, 5, 0, 100), range(3, 5));
    }

    #[test]
    fn widened_mapping_is_a_valid_flush_covering_the_request() {
        let allocation_size = 1000;
        let atom = 64;
        for (offset, size) in [(0, 1), (16, 5), (63, 2), (500, 436), (900, 99), (999, 1)] {
            let mapped = atom_range(offset, size, atom, allocation_size);
            assert_eq!(mapped.offset % atom, 0);
            assert!(mapped.offset <= offset);
            if mapped.size != vk::WHOLE_SIZE {
                assert_eq!(mapped.size % atom, 0);
                assert!(mapped.offset + mapped.size >= offset + size);
                assert!(mapped.offset + mapped.size <= allocation_size);
            }
        }
    }

    #[test]
    fn empty_resource_list_cannot_be_allocated() {
        assert!(matches!(
            checked_size(packer::pack(&[]).size),
            Err(Error::EmptyAllocation)
        ));
        assert_eq!(checked_size(52).unwrap(), 52);
    }
}
