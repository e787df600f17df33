use ash::vk;

use crate::error::{Error, Result};

/// Byte layout of several resources inside one allocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackedLayout {
    /// One offset per input, in input order.
    pub offsets: Vec<vk::DeviceSize>,
    /// Bytes the allocation must span.
    pub size: vk::DeviceSize,
}

/// Rounds `position` up to the next multiple of `alignment`. An alignment of
/// zero leaves the position untouched.
pub fn align_up(position: vk::DeviceSize, alignment: vk::DeviceSize) -> vk::DeviceSize {
    if alignment == 0 {
        return position;
    }
    match position % alignment {
        0 => position,
        remainder => position + (alignment - remainder),
    }
}

/// Bump-packs resources in the order given. Nothing is ever reused, so
/// reordering the inputs only changes padding.
pub fn pack(requirements: &[vk::MemoryRequirements]) -> PackedLayout {
    let mut cursor = 0;
    let offsets = requirements
        .iter()
        .map(|requirement| {
            let offset = align_up(cursor, requirement.alignment);
            cursor = offset + requirement.size;
            offset
        })
        .collect();
    log::debug!(
        "packed {} resource(s) into {cursor} bytes",
        requirements.len()
    );
    PackedLayout {
        offsets,
        size: cursor,
    }
}

/// Checks that a resource with `requirements` can live at `offset` in an
/// allocation of `allocation_size` bytes, the same way [`pack`] places it.
pub fn check_placement(
    requirements: &vk::MemoryRequirements,
    offset: vk::DeviceSize,
    allocation_size: vk::DeviceSize,
) -> Result<()> {
    let aligned = align_up(offset, requirements.alignment) == offset;
    let fits = offset
        .checked_add(requirements.size)
        .is_some_and(|end| end <= allocation_size);
    if aligned && fits {
        Ok(())
    } else {
        Err(Error::Misplaced {
            offset,
            size: requirements.size,
            alignment: requirements.alignment,
            allocation_size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(size: vk::DeviceSize, alignment: vk::DeviceSize) -> vk::MemoryRequirements {
        vk::MemoryRequirements {
            size,
            alignment,
            memory_type_bits: !0,
        }
    }

    fn assert_well_formed(requirements: &[vk::MemoryRequirements], layout: &PackedLayout) {
        assert_eq!(layout.offsets.len(), requirements.len());
        for (requirement, &offset) in requirements.iter().zip(&layout.offsets) {
            if requirement.alignment != 0 {
                assert_eq!(offset % requirement.alignment, 0);
            }
            assert!(offset + requirement.size <= layout.size);
        }
        for i in 1..layout.offsets.len() {
            assert!(layout.offsets[i - 1] + requirements[i - 1].size <= layout.offsets[i]);
        }
        if let (Some(last), Some(requirement)) = (layout.offsets.last(), requirements.last()) {
            assert_eq!(layout.size, last + requirement.size);
        }
    }

    #[test]
    fn three_resources_pack_with_padding() {
        let requirements = [req(10, 16), req(5, 4), req(20, 32)];
        let layout = pack(&requirements);
        // 10 rounds up to 12 for the second resource; 17 rounds up to 32.
        assert_eq!(layout.offsets, vec![0, 12, 32]);
        assert_eq!(layout.size, 52);
        assert_well_formed(&requirements, &layout);
    }

    #[test]
    fn every_ordering_stays_in_bounds() {
        let base = [req(10, 16), req(5, 4), req(20, 32), req(1, 0), req(64, 256)];
        let orders = [
            [0, 1, 2, 3, 4],
            [4, 3, 2, 1, 0],
            [1, 3, 0, 4, 2],
            [3, 4, 1, 2, 0],
            [2, 0, 4, 3, 1],
        ];
        for order in orders {
            let requirements: Vec<_> = order.iter().map(|&i| base[i]).collect();
            assert_well_formed(&requirements, &pack(&requirements));
        }
    }

    #[test]
    fn ordering_changes_total_size() {
        let small_first = pack(&[req(4, 4), req(256, 256)]);
        let large_first = pack(&[req(256, 256), req(4, 4)]);
        assert_eq!(small_first.size, 512);
        assert_eq!(large_first.size, 260);
    }

    #[test]
    fn zero_alignment_means_no_rounding() {
        let layout = pack(&[req(3, 0), req(7, 0), req(1, 1)]);
        assert_eq!(layout.offsets, vec![0, 3, 10]);
        assert_eq!(layout.size, 11);
    }

    #[test]
    fn empty_input_packs_to_nothing() {
        assert_eq!(pack(&[]), PackedLayout::default());
    }

    #[test]
    fn packed_offsets_pass_placement_check() {
        let requirements = [req(10, 16), req(5, 4), req(20, 32)];
        let layout = pack(&requirements);
        for (requirement, &offset) in requirements.iter().zip(&layout.offsets) {
            assert!(check_placement(requirement, offset, layout.size).is_ok());
        }
    }

    #[test]
    fn placement_rejects_misaligned_and_overflowing_offsets() {
        let requirement = req(20, 32);
        assert!(matches!(
            check_placement(&requirement, 16, 1024),
            Err(Error::Misplaced { offset: 16, alignment: 32, .. })
        ));
        assert!(matches!(
            check_placement(&requirement, 32, 51),
            Err(Error::Misplaced { allocation_size: 51, .. })
        ));
        assert!(check_placement(&requirement, 32, 52).is_ok());
        assert!(check_placement(&req(1, 0), vk::DeviceSize::MAX, 1024).is_err());
    }

    #[test]
    fn align_up_handles_non_power_of_two() {
        assert_eq!(align_up(0, 12), 0);
        assert_eq!(align_up(13, 12), 24);
        assert_eq!(align_up(24, 12), 24);
        assert_eq!(align_up(5, 0), 5);
    }
}
