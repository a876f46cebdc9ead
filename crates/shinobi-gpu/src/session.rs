//! The complete bootstrap sequence.

use crate::context::{GraphicsContext, GraphicsContextBuilder};
use crate::device::LogicalDevice;
use crate::driver::Driver;
use crate::error::Result;
use crate::physical_device::{select_device, DeviceRequirements};
use crate::surface::{PresentationSurface, SurfaceSupport};
use crate::swapchain::{SwapchainConfig, SwapchainResources};
use std::sync::Arc;

/// Everything the bootstrap produces, ready for rendering.
///
/// Fields drop in declaration order: swapchain, device, surface, context.
/// Dropping waits for the device to go idle before the swapchain goes.
pub struct GpuSession {
    swapchain: SwapchainResources,
    device: LogicalDevice,
    surface: PresentationSurface,
    context: GraphicsContext,
}

impl GpuSession {
    /// Run context creation, surface creation, device selection, device
    /// creation and swapchain creation in order.
    ///
    /// `create_surface` is called once the context exists. Any failure
    /// releases what was already created, newest first.
    pub fn bootstrap<F>(
        driver: Arc<dyn Driver>,
        context: GraphicsContextBuilder,
        requirements: &DeviceRequirements,
        swapchain: &SwapchainConfig,
        create_surface: F,
    ) -> Result<Self>
    where
        F: FnOnce(&GraphicsContext) -> Result<PresentationSurface>,
    {
        let context = context.build(driver)?;
        let surface = create_surface(&context)?;

        let (candidate, selection) = select_device(&context, &surface, requirements)?;
        let device = LogicalDevice::new(&context, &candidate, selection, &requirements.extensions)?;

        let support = SurfaceSupport::query(&device, &surface)?;
        let config = swapchain.adapted_to(&support);
        let swapchain = SwapchainResources::new(&device, &surface, &config)?;

        tracing::info!("GPU session ready on {}", candidate.info.name);

        Ok(Self {
            swapchain,
            device,
            surface,
            context,
        })
    }

    /// The instance and debug messenger.
    pub fn context(&self) -> &GraphicsContext {
        &self.context
    }

    /// The presentation surface.
    pub fn surface(&self) -> &PresentationSurface {
        &self.surface
    }

    /// The logical device and its queues.
    pub fn device(&self) -> &LogicalDevice {
        &self.device
    }

    /// The swapchain and its image views.
    pub fn swapchain(&self) -> &SwapchainResources {
        &self.swapchain
    }
}

impl Drop for GpuSession {
    fn drop(&mut self) {
        // The swapchain is released before the device, so wait here while its
        // images may still be in use. The device waits again when it drops.
        if let Err(e) = self.device.wait_idle() {
            tracing::warn!("Device wait idle failed during teardown: {e}");
        }
    }
}
