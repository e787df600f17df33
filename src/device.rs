use std::{ffi::CStr, sync::Arc};

use ash::{extensions::khr, vk};

use crate::{
    capability::Capabilities,
    error::{DriverResultExt, Result},
    instance::Instance,
    physical_device::PhysicalDevice,
    queue::{self, QueuePlan},
};

/// A queue created for one capability request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Queue {
    pub handle: vk::Queue,
    pub family_index: u32,
    pub slot: u32,
    pub capabilities: Capabilities,
    pub priority: f32,
}

pub struct Device {
    pub handle: ash::Device,
    pub instance: Arc<Instance>,
    pub physical_device: PhysicalDevice,
    /// One queue per capability request, in request order.
    pub queues: Vec<Queue>,
    /// Union of every granted capability.
    pub capabilities: Capabilities,
}

impl Device {
    /// Creates a device with one queue per entry of `requests`.
    pub fn new(
        instance: Arc<Instance>,
        physical_device: PhysicalDevice,
        requests: &[Capabilities],
    ) -> Result<Self> {
        Self::with_extensions(instance, physical_device, requests, &[])
    }

    /// Like [`Device::new`], also enabling `extensions`. The swapchain
    /// extension is added automatically when any request is presentable.
    pub fn with_extensions(
        instance: Arc<Instance>,
        physical_device: PhysicalDevice,
        requests: &[Capabilities],
        extensions: &[&CStr],
    ) -> Result<Self> {
        let plan = queue::resolve(&physical_device.inventory.queue_families, requests)?;

        let mut extensions = extensions.to_vec();
        let swapchain = khr::Swapchain::name();
        if plan.overall.contains(Capabilities::PRESENTABLE) && !extensions.contains(&swapchain) {
            extensions.push(swapchain);
        }
        physical_device.require_extensions(extensions.iter().copied())?;
        physical_device.require_layers(instance.layers.iter().map(|layer| layer.as_c_str()))?;

        let handle = create_device(&instance, &physical_device, &plan, &extensions)?;

        let queues: Vec<Queue> = plan
            .assignments
            .iter()
            .map(|assignment| Queue {
                handle: unsafe {
                    handle.get_device_queue(assignment.family_index, assignment.slot)
                },
                family_index: assignment.family_index,
                slot: assignment.slot,
                capabilities: assignment.capabilities,
                priority: assignment.priority,
            })
            .collect();
        log::info!(
            "created device on {} with {} queue(s) across {} famil(ies)",
            physical_device.name,
            queues.len(),
            plan.families.len()
        );

        Ok(Self {
            handle,
            instance,
            physical_device,
            queues,
            capabilities: plan.overall,
        })
    }

    /// Best host-visible memory type admitted by `mask`.
    pub fn find_staging_memory(&self, mask: u32) -> Result<u32> {
        self.physical_device.find_staging_memory(mask)
    }

    /// Best GPU-resident memory type admitted by `mask`.
    pub fn find_device_memory(&self, mask: u32) -> Result<u32> {
        self.physical_device.find_device_memory(mask)
    }

    pub fn wait_idle(&self) -> Result<()> {
        unsafe { self.handle.device_wait_idle() }.or_driver("vkDeviceWaitIdle")
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        unsafe { self.handle.destroy_device(None) };
    }
}

fn create_device(
    instance: &Instance,
    physical_device: &PhysicalDevice,
    plan: &QueuePlan,
    extensions: &[&CStr],
) -> Result<ash::Device> {
    let queue_create_infos: Vec<vk::DeviceQueueCreateInfo> = plan
        .families
        .iter()
        .map(|family| {
            vk::DeviceQueueCreateInfo::builder()
                .queue_family_index(family.family_index)
                .queue_priorities(&family.priorities)
                .build()
        })
        .collect();
    let enabled_extension_names: Vec<_> = extensions.iter().map(|name| name.as_ptr()).collect();
    let enabled_layer_names: Vec<_> = instance.layers.iter().map(|name| name.as_ptr()).collect();

    unsafe {
        instance.handle.create_device(
            physical_device.handle,
            &vk::DeviceCreateInfo::builder()
                .queue_create_infos(&queue_create_infos)
                .enabled_extension_names(&enabled_extension_names)
                .enabled_layer_names(&enabled_layer_names),
            None,
        )
    }
    .or_driver("vkCreateDevice")
}
