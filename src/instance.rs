use std::ffi::{CStr, CString};

use ash::vk;

use crate::{
    config::InstanceConfig,
    error::{DriverResultExt, Error, Result},
    inventory::DeviceInventory,
    physical_device::{fixed_str, PhysicalDevice},
    surface::Surface,
};

/// The loaded Vulkan library and its instance.
///
/// Everything that talks to the driver holds an `Arc<Instance>`; the
/// instance is destroyed once, when the last of them goes away.
pub struct Instance {
    pub entry: ash::Entry,
    pub handle: ash::Instance,
    pub extensions: Vec<CString>,
    pub layers: Vec<CString>,
}

impl Instance {
    pub fn new(config: &InstanceConfig) -> Result<Self> {
        let entry = unsafe { ash::Entry::load()? };

        let extensions = config.enabled_extensions();
        let layers = config.enabled_layers();

        let supported_extensions = entry
            .enumerate_instance_extension_properties(None)
            .or_driver("vkEnumerateInstanceExtensionProperties")?;
        if let Some(missing) = extensions.iter().find(|name| {
            !supported_extensions
                .iter()
                .any(|supported| fixed_str(&supported.extension_name) == name.as_c_str())
        }) {
            return Err(Error::MissingExtension {
                name: missing.to_string_lossy().into_owned(),
                device: "the Vulkan loader".into(),
            });
        }

        let supported_layers = entry
            .enumerate_instance_layer_properties()
            .or_driver("vkEnumerateInstanceLayerProperties")?;
        if let Some(missing) = layers.iter().find(|name| {
            !supported_layers
                .iter()
                .any(|supported| fixed_str(&supported.layer_name) == name.as_c_str())
        }) {
            return Err(Error::MissingLayer {
                name: missing.to_string_lossy().into_owned(),
                device: "the Vulkan loader".into(),
            });
        }

        let handle = {
            let application_name = CString::new(config.application_name.as_str())?;
            let engine_name = CString::new(config.engine_name.as_str())?;
            let enabled_extension_names: Vec<_> = extensions.iter().map(|e| e.as_ptr()).collect();
            let enabled_layer_names: Vec<_> = layers.iter().map(|l| l.as_ptr()).collect();

            unsafe {
                entry.create_instance(
                    &vk::InstanceCreateInfo::builder()
                        .application_info(
                            &vk::ApplicationInfo::builder()
                                .application_name(&application_name)
                                .application_version(config.application_version)
                                .engine_name(&engine_name)
                                .engine_version(config.engine_version)
                                .api_version(config.api_version),
                        )
                        .enabled_layer_names(&enabled_layer_names)
                        .enabled_extension_names(&enabled_extension_names),
                    None,
                )
            }
            .or_driver("vkCreateInstance")?
        };
        log::info!(
            "created Vulkan instance for \"{}\" ({} extension(s), {} layer(s))",
            config.application_name,
            extensions.len(),
            layers.len()
        );

        Ok(Self {
            entry,
            handle,
            extensions,
            layers,
        })
    }

    /// Enumerates the physical devices and snapshots each one. Queue families
    /// are presentable only when `surface` is given and supports them.
    ///
    /// A device that cannot be queried is skipped with a warning.
    pub fn physical_devices(&self, surface: Option<&Surface>) -> Result<Vec<PhysicalDevice>> {
        let handles = unsafe { self.handle.enumerate_physical_devices() }
            .or_driver("vkEnumeratePhysicalDevices")?;
        let physical_devices = handles
            .into_iter()
            .filter_map(|handle| match self.physical_device(handle, surface) {
                Ok(physical_device) => Some(physical_device),
                Err(error) => {
                    log::warn!("a physical device could not be resolved: {error}");
                    None
                }
            })
            .collect();
        Ok(physical_devices)
    }

    fn physical_device(
        &self,
        handle: vk::PhysicalDevice,
        surface: Option<&Surface>,
    ) -> Result<PhysicalDevice> {
        let properties = unsafe { self.handle.get_physical_device_properties(handle) };
        let name = unsafe { CStr::from_ptr(properties.device_name.as_ptr()) }
            .to_string_lossy()
            .into_owned();
        let extensions = unsafe { self.handle.enumerate_device_extension_properties(handle) }
            .or_driver("vkEnumerateDeviceExtensionProperties")?;
        let layers = unsafe { self.handle.enumerate_device_layer_properties(handle) }
            .or_driver("vkEnumerateDeviceLayerProperties")?;
        let queue_families =
            unsafe { self.handle.get_physical_device_queue_family_properties(handle) };
        let memory_properties =
            unsafe { self.handle.get_physical_device_memory_properties(handle) };

        let presentable = match surface {
            Some(surface) => (0..queue_families.len() as u32)
                .map(|family| surface.supports(handle, family))
                .collect::<Result<Vec<_>>>()?,
            None => Vec::new(),
        };

        let inventory =
            DeviceInventory::from_properties(&queue_families, &presentable, &memory_properties);
        log::debug!(
            "found {name}: {} queue famil(ies), {} memory type(s)",
            inventory.queue_families.len(),
            inventory.memory_types.len()
        );

        Ok(PhysicalDevice::new(
            handle,
            name,
            properties,
            extensions,
            layers,
            inventory,
        ))
    }
}

impl Drop for Instance {
    fn drop(&mut self) {
        unsafe { self.handle.destroy_instance(None) };
    }
}
