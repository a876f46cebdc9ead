//! Logical device and queue provisioning.

use crate::context::{join_names, GraphicsContext};
use crate::driver::{DeviceRequest, Driver, QueueRequest};
use crate::error::{GpuError, Result};
use crate::physical_device::{PhysicalDeviceCandidate, QueueFamilySelection};
use ash::vk;
use std::ffi::CString;
use std::sync::Arc;

/// The logical device and the queues retrieved from it.
///
/// Waits for the device to go idle and destroys it on drop. Must be dropped
/// before the surface and context it was created from.
pub struct LogicalDevice {
    driver: Arc<dyn Driver>,
    handle: vk::Device,
    physical_device: vk::PhysicalDevice,
    selection: QueueFamilySelection,
    graphics_queue: vk::Queue,
    present_queue: Option<vk::Queue>,
    transfer_queue: vk::Queue,
    extensions: Vec<CString>,
}

impl LogicalDevice {
    /// Create the device with one queue per distinct selected family.
    ///
    /// `extensions` are enabled on the device; selection has already
    /// checked that the candidate supports them.
    pub fn new(
        context: &GraphicsContext,
        candidate: &PhysicalDeviceCandidate,
        selection: QueueFamilySelection,
        extensions: &[CString],
    ) -> Result<Self> {
        let graphics_family = selection.graphics.ok_or_else(|| {
            GpuError::DeviceCreation(format!(
                "{} has no graphics queue family",
                candidate.info.name
            ))
        })?;

        let request = DeviceRequest {
            queues: selection
                .unique_families()
                .into_iter()
                .map(|family| QueueRequest {
                    family,
                    priority: 1.0,
                })
                .collect(),
            extensions: extensions.to_vec(),
        };

        let driver = context.driver().clone();

        // SAFETY: the candidate was enumerated from the context's instance.
        let handle = unsafe { driver.create_device(candidate.handle, &request) }.map_err(|e| {
            GpuError::DeviceCreation(format!(
                "{e} on {} (extensions: {})",
                candidate.info.name,
                join_names(&request.extensions)
            ))
        })?;

        tracing::info!(
            "Logical device created on {} with {} queue families",
            candidate.info.name,
            request.queues.len()
        );

        // Construct with placeholder queues so an early return below still
        // destroys the device.
        let mut device = Self {
            driver,
            handle,
            physical_device: candidate.handle,
            selection,
            graphics_queue: vk::Queue::null(),
            present_queue: None,
            transfer_queue: vk::Queue::null(),
            extensions: request.extensions,
        };

        device.graphics_queue = device.queue("graphics", graphics_family)?;
        device.present_queue = match selection.present {
            Some(family) => Some(device.queue("present", family)?),
            None => None,
        };
        // Without a transfer family the graphics queue takes transfers.
        device.transfer_queue = match selection.transfer {
            Some(family) => device.queue("transfer", family)?,
            None => device.graphics_queue,
        };

        Ok(device)
    }

    fn queue(&self, role: &'static str, family: u32) -> Result<vk::Queue> {
        // SAFETY: the device is alive and was created with a queue on every
        // selected family.
        let queue = unsafe { self.driver.device_queue(self.handle, family, 0) };
        if queue == vk::Queue::null() {
            return Err(GpuError::QueueRetrieval { role, family });
        }
        Ok(queue)
    }

    /// The driver this device was created with.
    pub fn driver(&self) -> &Arc<dyn Driver> {
        &self.driver
    }

    /// Get the logical device handle.
    pub fn handle(&self) -> vk::Device {
        self.handle
    }

    /// Get the physical device handle.
    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    /// Queue families the device was created with.
    pub fn selection(&self) -> QueueFamilySelection {
        self.selection
    }

    /// Get the graphics queue.
    pub fn graphics_queue(&self) -> vk::Queue {
        self.graphics_queue
    }

    /// Get the present queue, if a presenting family was selected.
    pub fn present_queue(&self) -> Option<vk::Queue> {
        self.present_queue
    }

    /// Get the transfer queue. Same as the graphics queue when no transfer
    /// family was selected.
    pub fn transfer_queue(&self) -> vk::Queue {
        self.transfer_queue
    }

    /// Device extensions that were enabled.
    pub fn extensions(&self) -> &[CString] {
        &self.extensions
    }

    /// Wait for the device to be idle.
    pub fn wait_idle(&self) -> Result<()> {
        // SAFETY: the device is alive.
        unsafe { self.driver.device_wait_idle(self.handle)? };
        Ok(())
    }
}

impl Drop for LogicalDevice {
    fn drop(&mut self) {
        if let Err(e) = self.wait_idle() {
            tracing::warn!("Device wait idle failed during teardown: {e}");
        }
        // SAFETY: every swapchain on this device is owned by values dropped
        // before the device.
        unsafe { self.driver.destroy_device(self.handle) };
        tracing::debug!("Logical device destroyed");
    }
}
