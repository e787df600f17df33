use std::{ffi::CStr, ptr, sync::Arc};

use ash::{extensions::khr, vk};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle, RawDisplayHandle, RawWindowHandle};

use crate::{
    error::{DriverResultExt, Error, Result},
    instance::Instance,
    physical_device::PhysicalDevice,
};

pub struct Surface {
    pub handle: vk::SurfaceKHR,
    pub functions: khr::Surface,
    _instance: Arc<Instance>,
}

/// What a surface offers on one physical device.
#[derive(Debug, Clone)]
pub struct SurfaceSupport {
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    pub formats: Vec<vk::SurfaceFormatKHR>,
    pub present_modes: Vec<vk::PresentModeKHR>,
}

impl Surface {
    /// Instance extensions needed to create a surface for `display`.
    pub fn required_extensions(display: &impl HasDisplayHandle) -> Result<Vec<&'static CStr>> {
        let platform = match display.display_handle()?.as_raw() {
            RawDisplayHandle::Windows(_) => khr::Win32Surface::name(),
            RawDisplayHandle::Xlib(_) => khr::XlibSurface::name(),
            RawDisplayHandle::Xcb(_) => khr::XcbSurface::name(),
            RawDisplayHandle::Wayland(_) => khr::WaylandSurface::name(),
            _ => return Err(Error::UnsupportedWindowHandle),
        };
        Ok(vec![khr::Surface::name(), platform])
    }

    pub fn new(
        window: &(impl HasWindowHandle + HasDisplayHandle),
        instance: &Arc<Instance>,
    ) -> Result<Self> {
        let (entry, vk_instance) = (&instance.entry, &instance.handle);
        let handle = match (
            window.window_handle()?.as_raw(),
            window.display_handle()?.as_raw(),
        ) {
            (RawWindowHandle::Win32(window), _) => {
                let hinstance = window
                    .hinstance
                    .map_or(ptr::null(), |hinstance| hinstance.get() as vk::HINSTANCE);
                let hwnd = window.hwnd.get() as vk::HWND;
                unsafe {
                    khr::Win32Surface::new(entry, vk_instance).create_win32_surface(
                        &vk::Win32SurfaceCreateInfoKHR::builder()
                            .hinstance(hinstance)
                            .hwnd(hwnd),
                        None,
                    )
                }
                .or_driver("vkCreateWin32SurfaceKHR")?
            }
            (RawWindowHandle::Xlib(window), RawDisplayHandle::Xlib(display)) => {
                let dpy = display
                    .display
                    .ok_or(Error::UnsupportedWindowHandle)?
                    .as_ptr();
                unsafe {
                    khr::XlibSurface::new(entry, vk_instance).create_xlib_surface(
                        &vk::XlibSurfaceCreateInfoKHR::builder()
                            .dpy(dpy.cast())
                            .window(window.window),
                        None,
                    )
                }
                .or_driver("vkCreateXlibSurfaceKHR")?
            }
            (RawWindowHandle::Xcb(window), RawDisplayHandle::Xcb(display)) => {
                let connection = display
                    .connection
                    .ok_or(Error::UnsupportedWindowHandle)?
                    .as_ptr();
                unsafe {
                    khr::XcbSurface::new(entry, vk_instance).create_xcb_surface(
                        &vk::XcbSurfaceCreateInfoKHR::builder()
                            .connection(connection.cast())
                            .window(window.window.get()),
                        None,
                    )
                }
                .or_driver("vkCreateXcbSurfaceKHR")?
            }
            (RawWindowHandle::Wayland(window), RawDisplayHandle::Wayland(display)) => unsafe {
                khr::WaylandSurface::new(entry, vk_instance).create_wayland_surface(
                    &vk::WaylandSurfaceCreateInfoKHR::builder()
                        .display(display.display.as_ptr().cast())
                        .surface(window.surface.as_ptr().cast()),
                    None,
                )
            }
            .or_driver("vkCreateWaylandSurfaceKHR")?,
            _ => return Err(Error::UnsupportedWindowHandle),
        };
        let functions = khr::Surface::new(entry, vk_instance);
        Ok(Self {
            handle,
            functions,
            _instance: instance.clone(),
        })
    }

    /// Whether queue family `family` of `physical_device` can present here.
    pub fn supports(&self, physical_device: vk::PhysicalDevice, family: u32) -> Result<bool> {
        unsafe {
            self.functions
                .get_physical_device_surface_support(physical_device, family, self.handle)
        }
        .or_driver("vkGetPhysicalDeviceSurfaceSupportKHR")
    }

    pub fn query(&self, physical_device: &PhysicalDevice) -> Result<SurfaceSupport> {
        let handle = physical_device.handle;
        unsafe {
            Ok(SurfaceSupport {
                capabilities: self
                    .functions
                    .get_physical_device_surface_capabilities(handle, self.handle)
                    .or_driver("vkGetPhysicalDeviceSurfaceCapabilitiesKHR")?,
                formats: self
                    .functions
                    .get_physical_device_surface_formats(handle, self.handle)
                    .or_driver("vkGetPhysicalDeviceSurfaceFormatsKHR")?,
                present_modes: self
                    .functions
                    .get_physical_device_surface_present_modes(handle, self.handle)
                    .or_driver("vkGetPhysicalDeviceSurfacePresentModesKHR")?,
            })
        }
    }
}

impl Drop for Surface {
    fn drop(&mut self) {
        unsafe { self.functions.destroy_surface(self.handle, None) };
    }
}
