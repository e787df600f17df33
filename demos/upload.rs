use std::{mem, sync::Arc};

use ash::{util::Align, vk};
use vulkan_planner::{
    capability::{self, Capabilities},
    queue::{MutexedQueueAccessor, QueueAccessor},
    Allocation, Buffer, Device, Fence, Instance, InstanceConfig, MemoryBound, MemoryPolicy, Surface,
};
use winit::{
    event::{Event, WindowEvent},
    event_loop::EventLoop,
    window::WindowBuilder,
};

#[derive(Debug, Clone, Copy)]
#[repr(C)]
struct Vertex {
    position: [f32; 3],
    color: [f32; 3],
}

fn upload<T: Copy>(allocation: &mut Allocation, buffer: &Buffer, data: &[T]) -> anyhow::Result<()> {
    let region = allocation.map_resource(buffer)?;
    let size = buffer.memory_requirements().size;
    let mut align = unsafe { Align::new(region, mem::align_of::<T>() as u64, size) };
    align.copy_from_slice(data);
    allocation.unmap()?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let event_loop = EventLoop::new()?;
    let window = WindowBuilder::new()
        .with_title("vulkan-planner upload")
        .build(&event_loop)?;

    let config = InstanceConfig::default().with_extensions(Surface::required_extensions(&window)?);
    let instance = Arc::new(Instance::new(&config)?);
    let surface = Surface::new(&window, &instance)?;
    let physical_device = instance
        .physical_devices(Some(&surface))?
        .into_iter()
        .find(|physical_device| {
            physical_device
                .inventory
                .queue_families
                .iter()
                .any(|family| family.presentable)
        })
        .ok_or_else(|| anyhow::anyhow!("no physical device can present to the window"))?;

    let mut requests = [
        Capabilities::TRANSFER,
        Capabilities::GRAPHICS | Capabilities::PRESENTABLE,
    ];
    capability::sort_by_importance(&mut requests);
    let device = Arc::new(Device::new(instance.clone(), physical_device, &requests)?);
    for queue in &device.queues {
        log::info!(
            "{:?}: family {} slot {} priority {}",
            queue.capabilities,
            queue.family_index,
            queue.slot,
            queue.priority
        );
    }

    let vertices = [
        Vertex {
            position: [0.0, -0.5, 0.0],
            color: [1.0, 0.0, 0.0],
        },
        Vertex {
            position: [0.5, 0.5, 0.0],
            color: [0.0, 1.0, 0.0],
        },
        Vertex {
            position: [-0.5, 0.5, 0.0],
            color: [0.0, 0.0, 1.0],
        },
    ];
    let indices: [u16; 3] = [0, 1, 2];

    let mut vertex_buffer = Buffer::new(
        device.clone(),
        mem::size_of_val(&vertices) as u64,
        vk::BufferUsageFlags::VERTEX_BUFFER | vk::BufferUsageFlags::TRANSFER_SRC,
    )?;
    let mut index_buffer = Buffer::new(
        device.clone(),
        mem::size_of_val(&indices) as u64,
        vk::BufferUsageFlags::INDEX_BUFFER | vk::BufferUsageFlags::TRANSFER_SRC,
    )?;
    let mut allocation = Allocation::for_resources(
        device.clone(),
        MemoryPolicy::Staging,
        &mut [&mut vertex_buffer as &mut dyn MemoryBound, &mut index_buffer],
    )?;
    log::info!(
        "staging allocation: {} bytes of memory type {}, index buffer at {:?}",
        allocation.size,
        allocation.memory_type,
        index_buffer.binding()
    );

    upload(&mut allocation, &vertex_buffer, &vertices)?;
    upload(&mut allocation, &index_buffer, &indices)?;

    let transfer = MutexedQueueAccessor::new(device.clone(), 1)
        .ok_or_else(|| anyhow::anyhow!("transfer queue missing"))?;
    let fence = Fence::new(device.clone(), false)?;
    transfer.submit(&[], fence.handle)?;
    fence.wait_forever()?;

    drop(vertex_buffer);
    drop(index_buffer);
    drop(allocation);

    event_loop.run(move |event, elwt| {
        if let Event::WindowEvent {
            event: WindowEvent::CloseRequested,
            ..
        } = event
        {
            elwt.exit();
        }
    })?;
    Ok(())
}
