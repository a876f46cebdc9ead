//! Presentation surfaces for windowed rendering.
//!
//! The surface belongs to the window side of the application. The core only
//! borrows it for device selection and swapchain creation.

use crate::context::GraphicsContext;
use crate::device::LogicalDevice;
use crate::driver::Driver;
use crate::error::{GpuError, Result};
use ash::vk;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle, RawDisplayHandle, RawWindowHandle};
use std::sync::Arc;

/// A `VkSurfaceKHR` bound to a native window.
///
/// Destroyed on drop. It must be dropped after the swapchain and logical
/// device that use it and before the [`GraphicsContext`].
pub struct PresentationSurface {
    driver: Arc<dyn Driver>,
    instance: vk::Instance,
    handle: vk::SurfaceKHR,
}

impl PresentationSurface {
    /// Create a surface for a window.
    ///
    /// # Safety
    /// The window must outlive the surface.
    pub unsafe fn from_window<W>(context: &GraphicsContext, window: &W) -> Result<Self>
    where
        W: HasDisplayHandle + HasWindowHandle,
    {
        let display = window
            .display_handle()
            .map_err(|e| GpuError::SurfaceCreation(format!("Failed to get display handle: {e}")))?;
        let window_handle = window
            .window_handle()
            .map_err(|e| GpuError::SurfaceCreation(format!("Failed to get window handle: {e}")))?;

        // SAFETY: forwarded from the caller.
        unsafe { Self::from_raw_handles(context, display.as_raw(), window_handle.as_raw()) }
    }

    /// Create a surface from raw window system handles.
    ///
    /// # Safety
    /// The handles must be valid and the window must outlive the surface.
    pub unsafe fn from_raw_handles(
        context: &GraphicsContext,
        display: RawDisplayHandle,
        window: RawWindowHandle,
    ) -> Result<Self> {
        let driver = context.driver().clone();
        let instance = context.instance();

        let handle = unsafe { driver.create_surface(instance, display, window) }
            .map_err(|e| GpuError::SurfaceCreation(e.to_string()))?;

        tracing::info!("Presentation surface created");

        Ok(Self {
            driver,
            instance,
            handle,
        })
    }

    /// The Vulkan surface handle.
    pub fn handle(&self) -> vk::SurfaceKHR {
        self.handle
    }
}

impl Drop for PresentationSurface {
    fn drop(&mut self) {
        // SAFETY: the surface was created on this instance, and the owner
        // drops it after every swapchain built on it.
        unsafe { self.driver.destroy_surface(self.instance, self.handle) };
        tracing::debug!("Presentation surface destroyed");
    }
}

/// What a physical device can do with a surface.
#[derive(Debug, Clone)]
pub struct SurfaceSupport {
    /// Raw surface capabilities.
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    /// Supported surface formats.
    pub formats: Vec<vk::SurfaceFormatKHR>,
    /// Supported present modes.
    pub present_modes: Vec<vk::PresentModeKHR>,
}

impl SurfaceSupport {
    /// Query surface support on the device's physical device.
    pub fn query(device: &LogicalDevice, surface: &PresentationSurface) -> Result<Self> {
        let driver = device.driver();
        let physical_device = device.physical_device();
        let surface = surface.handle();

        // SAFETY: the physical device belongs to the live instance the
        // surface was created on.
        unsafe {
            Ok(Self {
                capabilities: driver.surface_capabilities(physical_device, surface)?,
                formats: driver.surface_formats(physical_device, surface)?,
                present_modes: driver.surface_present_modes(physical_device, surface)?,
            })
        }
    }

    /// Whether the format / colour space pair is supported.
    pub fn supports_format(&self, format: vk::Format, color_space: vk::ColorSpaceKHR) -> bool {
        self.formats
            .iter()
            .any(|f| f.format == format && f.color_space == color_space)
    }

    /// Whether the present mode is supported.
    pub fn supports_present_mode(&self, mode: vk::PresentModeKHR) -> bool {
        self.present_modes.contains(&mode)
    }

    /// The preferred present mode if supported, otherwise FIFO, which every
    /// driver must offer.
    pub fn recommended_present_mode(&self, preferred: vk::PresentModeKHR) -> vk::PresentModeKHR {
        if self.supports_present_mode(preferred) {
            preferred
        } else {
            vk::PresentModeKHR::FIFO
        }
    }
}
