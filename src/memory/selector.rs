//! Picks one memory type out of a restriction mask.
//!
//! Types are scanned in index order; the first admissible one seeds the
//! incumbent and every later one replaces it only if it wins the policy's
//! criteria chain. Each criterion is consulted only when all earlier ones
//! tie.

use std::cmp::Ordering;

use ash::vk;

use crate::{
    error::{Error, Result},
    inventory::{DeviceInventory, MemoryTypeDescriptor},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryPolicy {
    /// CPU-writable upload memory. Only host-visible types are considered.
    Staging,
    /// GPU-resident memory.
    Device,
}

pub fn select(inventory: &DeviceInventory, mask: u32, policy: MemoryPolicy) -> Result<u32> {
    let mut best: Option<&MemoryTypeDescriptor> = None;

    for candidate in inventory
        .memory_types
        .iter()
        .filter(|memory_type| admitted(mask, memory_type.index))
    {
        if policy == MemoryPolicy::Staging
            && !candidate
                .properties
                .contains(vk::MemoryPropertyFlags::HOST_VISIBLE)
        {
            continue;
        }
        best = match best {
            Some(incumbent) if compare(inventory, policy, candidate, incumbent).is_le() => {
                Some(incumbent)
            }
            _ => Some(candidate),
        };
    }

    let chosen = best.ok_or(Error::UnsatisfiableMemory { mask })?;
    log::debug!(
        "{policy:?} memory for mask {mask:#b} -> type {} ({:?})",
        chosen.index,
        chosen.properties
    );
    Ok(chosen.index)
}

fn admitted(mask: u32, index: u32) -> bool {
    index < u32::BITS && mask & (1 << index) != 0
}

/// `Greater` when `candidate` should replace `incumbent`.
fn compare(
    inventory: &DeviceInventory,
    policy: MemoryPolicy,
    candidate: &MemoryTypeDescriptor,
    incumbent: &MemoryTypeDescriptor,
) -> Ordering {
    let (heap, incumbent_heap) = (inventory.heap_of(candidate), inventory.heap_of(incumbent));
    let property = |flag: vk::MemoryPropertyFlags| {
        candidate
            .properties
            .contains(flag)
            .cmp(&incumbent.properties.contains(flag))
    };
    let heap_size = || heap.size.cmp(&incumbent_heap.size);
    let heap_device_local = || heap.device_local.cmp(&incumbent_heap.device_local);

    match policy {
        MemoryPolicy::Staging => heap_size()
            .then_with(|| property(vk::MemoryPropertyFlags::DEVICE_LOCAL))
            .then_with(|| property(vk::MemoryPropertyFlags::HOST_CACHED))
            .then_with(|| property(vk::MemoryPropertyFlags::HOST_COHERENT))
            .then_with(heap_device_local),
        MemoryPolicy::Device => heap_device_local()
            .then_with(|| property(vk::MemoryPropertyFlags::DEVICE_LOCAL))
            .then_with(heap_size)
            .then_with(|| property(vk::MemoryPropertyFlags::HOST_VISIBLE))
            .then_with(|| property(vk::MemoryPropertyFlags::HOST_CACHED))
            .then_with(|| property(vk::MemoryPropertyFlags::HOST_COHERENT)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::MemoryHeapDescriptor;

    const MIB: vk::DeviceSize = 1 << 20;

    type Flags = vk::MemoryPropertyFlags;

    fn inventory(heaps: &[(vk::DeviceSize, bool)], types: &[(Flags, u32)]) -> DeviceInventory {
        DeviceInventory {
            queue_families: Vec::new(),
            memory_types: types
                .iter()
                .enumerate()
                .map(|(index, &(properties, heap_index))| MemoryTypeDescriptor {
                    index: index as u32,
                    properties,
                    heap_index,
                })
                .collect(),
            memory_heaps: heaps
                .iter()
                .map(|&(size, device_local)| MemoryHeapDescriptor { size, device_local })
                .collect(),
        }
    }

    /// Typical discrete card: VRAM, system RAM, and a small BAR window.
    fn discrete() -> DeviceInventory {
        inventory(
            &[(8192 * MIB, true), (16384 * MIB, false), (256 * MIB, true)],
            &[
                (Flags::DEVICE_LOCAL, 0),
                (Flags::HOST_VISIBLE | Flags::HOST_COHERENT, 1),
                (Flags::HOST_VISIBLE | Flags::HOST_COHERENT | Flags::HOST_CACHED, 1),
                (
                    Flags::DEVICE_LOCAL | Flags::HOST_VISIBLE | Flags::HOST_COHERENT,
                    2,
                ),
            ],
        )
    }

    #[test]
    fn staging_device_local_breaks_equal_heap_tie() {
        let inventory = inventory(
            &[(256 * MIB, false), (256 * MIB, false)],
            &[
                (Flags::HOST_VISIBLE, 0),
                (Flags::HOST_VISIBLE | Flags::DEVICE_LOCAL, 1),
            ],
        );
        assert_eq!(select(&inventory, 0b11, MemoryPolicy::Staging).unwrap(), 1);
    }

    #[test]
    fn staging_prefers_larger_heap_before_any_property() {
        let inventory = discrete();
        // Type 2 lives on the 16 GiB heap and is cached; type 3 is device-local
        // but on the small heap.
        assert_eq!(select(&inventory, 0b1110, MemoryPolicy::Staging).unwrap(), 2);
    }

    #[test]
    fn staging_skips_types_that_are_not_host_visible() {
        let inventory = discrete();
        assert!(matches!(
            select(&inventory, 0b0001, MemoryPolicy::Staging),
            Err(Error::UnsatisfiableMemory { mask: 0b0001 })
        ));
        assert_eq!(select(&inventory, 0b1001, MemoryPolicy::Staging).unwrap(), 3);
    }

    #[test]
    fn staging_coherent_then_heap_device_local_decide_last() {
        let inventory = inventory(
            &[(64 * MIB, false), (64 * MIB, true)],
            &[
                (Flags::HOST_VISIBLE, 0),
                (Flags::HOST_VISIBLE | Flags::HOST_COHERENT, 0),
                (Flags::HOST_VISIBLE | Flags::HOST_COHERENT, 1),
            ],
        );
        assert_eq!(select(&inventory, 0b011, MemoryPolicy::Staging).unwrap(), 1);
        assert_eq!(select(&inventory, 0b111, MemoryPolicy::Staging).unwrap(), 2);
    }

    #[test]
    fn device_prefers_device_local_heap() {
        let inventory = discrete();
        assert_eq!(select(&inventory, 0b1111, MemoryPolicy::Device).unwrap(), 0);
        // Without the pure VRAM type the BAR window still beats system RAM.
        assert_eq!(select(&inventory, 0b1110, MemoryPolicy::Device).unwrap(), 3);
    }

    #[test]
    fn device_policy_has_no_host_visible_filter() {
        let inventory = discrete();
        assert_eq!(select(&inventory, 0b0001, MemoryPolicy::Device).unwrap(), 0);
        // On system RAM the cached type wins after host-visible ties.
        assert_eq!(select(&inventory, 0b0110, MemoryPolicy::Device).unwrap(), 2);
    }

    #[test]
    fn device_heap_size_outranks_host_visibility() {
        let inventory = inventory(
            &[(128 * MIB, true), (512 * MIB, true)],
            &[
                (Flags::DEVICE_LOCAL | Flags::HOST_VISIBLE, 0),
                (Flags::DEVICE_LOCAL, 1),
            ],
        );
        assert_eq!(select(&inventory, 0b11, MemoryPolicy::Device).unwrap(), 1);
    }

    #[test]
    fn full_tie_keeps_lowest_index() {
        let inventory = inventory(
            &[(64 * MIB, true)],
            &[(Flags::DEVICE_LOCAL, 0), (Flags::DEVICE_LOCAL, 0)],
        );
        assert_eq!(select(&inventory, 0b11, MemoryPolicy::Device).unwrap(), 0);
        assert_eq!(select(&inventory, 0b10, MemoryPolicy::Device).unwrap(), 1);
    }

    #[test]
    fn empty_mask_fails() {
        let inventory = discrete();
        for policy in [MemoryPolicy::Staging, MemoryPolicy::Device] {
            assert!(matches!(
                select(&inventory, 0, policy),
                Err(Error::UnsatisfiableMemory { mask: 0 })
            ));
        }
        // Bits past the last type admit nothing either.
        assert!(select(&inventory, 0xffff_fff0, MemoryPolicy::Device).is_err());
    }

    #[test]
    fn result_is_stable_and_always_admitted() {
        let inventory = discrete();
        for mask in 0u32..16 {
            for policy in [MemoryPolicy::Staging, MemoryPolicy::Device] {
                let first = select(&inventory, mask, policy);
                let second = select(&inventory, mask, policy);
                match (first, second) {
                    (Ok(a), Ok(b)) => {
                        assert_eq!(a, b);
                        assert_ne!(mask & (1 << a), 0, "mask {mask:#b} excludes {a}");
                    }
                    (Err(_), Err(_)) => {
                        let admissible = inventory.memory_types.iter().any(|t| {
                            admitted(mask, t.index)
                                && (policy == MemoryPolicy::Device
                                    || t.properties.contains(Flags::HOST_VISIBLE))
                        });
                        assert!(!admissible, "mask {mask:#b} should have succeeded");
                    }
                    (a, b) => panic!("unstable result: {a:?} vs {b:?}"),
                }
            }
        }
    }
}
