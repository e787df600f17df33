use std::ffi::{c_char, CStr};

use ash::vk;

use crate::{
    error::{Error, Result},
    inventory::DeviceInventory,
    memory::{self, MemoryPolicy},
};

#[derive(Debug, Clone)]
pub struct PhysicalDevice {
    pub handle: vk::PhysicalDevice,
    pub name: String,
    pub properties: vk::PhysicalDeviceProperties,
    pub extensions: Vec<vk::ExtensionProperties>,
    pub layers: Vec<vk::LayerProperties>,
    pub inventory: DeviceInventory,
    /// Best staging type over every memory type, if any is host-visible.
    pub best_staging_memory: Option<u32>,
    /// Best device type over every memory type.
    pub best_device_memory: Option<u32>,
}

impl PhysicalDevice {
    pub fn new(
        handle: vk::PhysicalDevice,
        name: String,
        properties: vk::PhysicalDeviceProperties,
        extensions: Vec<vk::ExtensionProperties>,
        layers: Vec<vk::LayerProperties>,
        inventory: DeviceInventory,
    ) -> Self {
        let best_staging_memory = memory::select(&inventory, !0, MemoryPolicy::Staging).ok();
        let best_device_memory = memory::select(&inventory, !0, MemoryPolicy::Device).ok();
        Self {
            handle,
            name,
            properties,
            extensions,
            layers,
            inventory,
            best_staging_memory,
            best_device_memory,
        }
    }

    pub fn supports_extension(&self, name: &CStr) -> bool {
        self.extensions
            .iter()
            .any(|extension| fixed_str(&extension.extension_name) == name)
    }

    pub fn supports_layer(&self, name: &CStr) -> bool {
        self.layers
            .iter()
            .any(|layer| fixed_str(&layer.layer_name) == name)
    }

    pub fn require_extensions<'a>(&self, names: impl IntoIterator<Item = &'a CStr>) -> Result<()> {
        match names.into_iter().find(|name| !self.supports_extension(name)) {
            Some(name) => Err(Error::MissingExtension {
                name: name.to_string_lossy().into_owned(),
                device: self.name.clone(),
            }),
            None => Ok(()),
        }
    }

    pub fn require_layers<'a>(&self, names: impl IntoIterator<Item = &'a CStr>) -> Result<()> {
        match names.into_iter().find(|name| !self.supports_layer(name)) {
            Some(name) => Err(Error::MissingLayer {
                name: name.to_string_lossy().into_owned(),
                device: self.name.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Best host-visible memory type admitted by `mask`.
    pub fn find_staging_memory(&self, mask: u32) -> Result<u32> {
        match self.best_staging_memory {
            Some(best) if mask == !0 => Ok(best),
            _ => memory::select(&self.inventory, mask, MemoryPolicy::Staging),
        }
    }

    /// Best GPU-resident memory type admitted by `mask`.
    pub fn find_device_memory(&self, mask: u32) -> Result<u32> {
        match self.best_device_memory {
            Some(best) if mask == !0 => Ok(best),
            _ => memory::select(&self.inventory, mask, MemoryPolicy::Device),
        }
    }
}

/// Reads a nul-terminated name out of a fixed-size driver array. An array
/// without a terminator reads as empty.
pub(crate) fn fixed_str(raw: &[c_char]) -> &CStr {
    let bytes: &[u8] = unsafe { std::slice::from_raw_parts(raw.as_ptr().cast(), raw.len()) };
    CStr::from_bytes_until_nul(bytes).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::{MemoryHeapDescriptor, MemoryTypeDescriptor};

    fn extension(name: &str) -> vk::ExtensionProperties {
        let mut properties = vk::ExtensionProperties::default();
        for (slot, byte) in properties.extension_name.iter_mut().zip(name.bytes()) {
            *slot = byte as c_char;
        }
        properties
    }

    fn device(extensions: &[&str]) -> PhysicalDevice {
        with_inventory(extensions, DeviceInventory::default())
    }

    fn with_inventory(extensions: &[&str], inventory: DeviceInventory) -> PhysicalDevice {
        PhysicalDevice::new(
            vk::PhysicalDevice::null(),
            "test gpu".into(),
            vk::PhysicalDeviceProperties::default(),
            extensions.iter().map(|name| extension(name)).collect(),
            Vec::new(),
            inventory,
        )
    }

    #[test]
    fn fixed_str_stops_at_first_nul() {
        let raw = [b'a' as c_char, b'b' as c_char, 0, b'c' as c_char];
        assert_eq!(fixed_str(&raw), c"ab");
        assert_eq!(fixed_str(&[b'x' as c_char; 4]), c"");
    }

    #[test]
    fn missing_extension_is_named() {
        let gpu = device(&["VK_KHR_swapchain"]);
        assert!(gpu.require_extensions([c"VK_KHR_swapchain"]).is_ok());

        match gpu.require_extensions([c"VK_KHR_swapchain", c"VK_KHR_ray_query"]) {
            Err(Error::MissingExtension { name, device }) => {
                assert_eq!(name, "VK_KHR_ray_query");
                assert_eq!(device, "test gpu");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn missing_layer_is_reported() {
        let gpu = device(&[]);
        assert!(gpu.require_layers(std::iter::empty()).is_ok());
        assert!(matches!(
            gpu.require_layers([c"VK_LAYER_KHRONOS_validation"]),
            Err(Error::MissingLayer { .. })
        ));
    }

    #[test]
    fn memory_lookups_fail_on_empty_inventory() {
        let gpu = device(&[]);
        assert_eq!(gpu.best_staging_memory, None);
        assert_eq!(gpu.best_device_memory, None);
        assert!(gpu.find_staging_memory(!0).is_err());
        assert!(gpu.find_device_memory(!0).is_err());
    }

    #[test]
    fn best_memory_types_are_chosen_at_discovery() {
        type Flags = vk::MemoryPropertyFlags;
        let memory_types = [
            (Flags::DEVICE_LOCAL, 0),
            (Flags::HOST_VISIBLE | Flags::HOST_COHERENT, 1),
        ];
        let inventory = DeviceInventory {
            queue_families: Vec::new(),
            memory_types: memory_types
                .iter()
                .enumerate()
                .map(|(index, &(properties, heap_index))| MemoryTypeDescriptor {
                    index: index as u32,
                    properties,
                    heap_index,
                })
                .collect(),
            memory_heaps: vec![
                MemoryHeapDescriptor {
                    size: 8 << 30,
                    device_local: true,
                },
                MemoryHeapDescriptor {
                    size: 16 << 30,
                    device_local: false,
                },
            ],
        };
        let gpu = with_inventory(&[], inventory);

        assert_eq!(gpu.best_staging_memory, Some(1));
        assert_eq!(gpu.best_device_memory, Some(0));
        assert_eq!(gpu.find_staging_memory(!0).unwrap(), 1);
        assert_eq!(gpu.find_device_memory(0b10).unwrap(), 1);
    }
}
