pub mod allocation;
pub mod packer;
pub mod selector;

pub use allocation::{Allocation, MappedRange};
pub use packer::{align_up, check_placement, pack, PackedLayout};
pub use selector::{select, MemoryPolicy};
