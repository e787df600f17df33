//! Read-only snapshot of a physical device's queue and memory topology.
//!
//! Taken once at discovery and never refreshed, so the resolver and the
//! memory selector can run as pure functions over it.

use ash::vk;

use crate::capability::Capabilities;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueFamilyDescriptor {
    pub index: u32,
    /// Transfer, compute and graphics bits as reported by the driver.
    pub capabilities: Capabilities,
    pub queue_count: u32,
    pub presentable: bool,
}

impl QueueFamilyDescriptor {
    /// True when every requested capability is offered by this family.
    /// Presentation is answered by the per-family flag alone.
    pub fn supports(&self, requested: Capabilities) -> bool {
        let executes = requested.difference(Capabilities::PRESENTABLE);
        if !self.capabilities.contains(executes) {
            return false;
        }
        !requested.contains(Capabilities::PRESENTABLE) || self.presentable
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryTypeDescriptor {
    pub index: u32,
    pub properties: vk::MemoryPropertyFlags,
    pub heap_index: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryHeapDescriptor {
    pub size: vk::DeviceSize,
    pub device_local: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceInventory {
    pub queue_families: Vec<QueueFamilyDescriptor>,
    pub memory_types: Vec<MemoryTypeDescriptor>,
    pub memory_heaps: Vec<MemoryHeapDescriptor>,
}

impl DeviceInventory {
    /// Builds the snapshot from raw driver queries. `presentable` holds one
    /// entry per queue family; missing entries count as not presentable.
    pub fn from_properties(
        queue_families: &[vk::QueueFamilyProperties],
        presentable: &[bool],
        memory_properties: &vk::PhysicalDeviceMemoryProperties,
    ) -> Self {
        let queue_families = queue_families
            .iter()
            .enumerate()
            .map(|(index, properties)| QueueFamilyDescriptor {
                index: index as u32,
                capabilities: capabilities_from_queue_flags(properties.queue_flags),
                queue_count: properties.queue_count,
                presentable: presentable.get(index).copied().unwrap_or(false),
            })
            .collect();
        let memory_types = memory_properties.memory_types
            [..memory_properties.memory_type_count as usize]
            .iter()
            .enumerate()
            .map(|(index, memory_type)| MemoryTypeDescriptor {
                index: index as u32,
                properties: memory_type.property_flags,
                heap_index: memory_type.heap_index,
            })
            .collect();
        let memory_heaps = memory_properties.memory_heaps
            [..memory_properties.memory_heap_count as usize]
            .iter()
            .map(|heap| MemoryHeapDescriptor {
                size: heap.size,
                device_local: heap.flags.contains(vk::MemoryHeapFlags::DEVICE_LOCAL),
            })
            .collect();
        Self {
            queue_families,
            memory_types,
            memory_heaps,
        }
    }

    pub fn memory_type(&self, index: u32) -> Option<&MemoryTypeDescriptor> {
        self.memory_types.get(index as usize)
    }

    /// Heap backing `memory_type`.
    ///
    /// # Panics
    /// If the type names a heap outside the snapshot, which a conforming
    /// driver never reports.
    pub fn heap_of(&self, memory_type: &MemoryTypeDescriptor) -> &MemoryHeapDescriptor {
        &self.memory_heaps[memory_type.heap_index as usize]
    }
}

fn capabilities_from_queue_flags(flags: vk::QueueFlags) -> Capabilities {
    let mut capabilities = Capabilities::empty();
    capabilities.set(
        Capabilities::TRANSFER,
        flags.contains(vk::QueueFlags::TRANSFER),
    );
    capabilities.set(Capabilities::COMPUTE, flags.contains(vk::QueueFlags::COMPUTE));
    capabilities.set(
        Capabilities::GRAPHICS,
        flags.contains(vk::QueueFlags::GRAPHICS),
    );
    capabilities
}
