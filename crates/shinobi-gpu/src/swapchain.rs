//! Swapchain management.

use crate::device::LogicalDevice;
use crate::driver::{Driver, ImageViewRequest, SharingMode, SwapchainRequest};
use crate::error::{GpuError, Result};
use crate::surface::{PresentationSurface, SurfaceSupport};
use ash::vk;
use std::sync::Arc;

/// Swapchain configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapchainConfig {
    /// Target image extent
    pub extent: vk::Extent2D,
    /// Desired number of images, clamped to what the surface allows
    pub image_count: u32,
    /// Image format
    pub format: vk::Format,
    /// Colour space paired with the format
    pub color_space: vk::ColorSpaceKHR,
    /// Preferred present mode
    pub present_mode: vk::PresentModeKHR,
    /// Use FIFO when the preferred present mode is not offered
    pub fallback_to_fifo: bool,
}

impl Default for SwapchainConfig {
    fn default() -> Self {
        Self {
            extent: vk::Extent2D {
                width: 900,
                height: 600,
            },
            image_count: 3,
            format: vk::Format::B8G8R8A8_SRGB,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            present_mode: vk::PresentModeKHR::MAILBOX,
            fallback_to_fifo: true,
        }
    }
}

impl SwapchainConfig {
    /// Set the target extent.
    pub fn with_extent(mut self, width: u32, height: u32) -> Self {
        self.extent = vk::Extent2D { width, height };
        self
    }

    /// Set the desired image count.
    pub fn with_image_count(mut self, count: u32) -> Self {
        self.image_count = count;
        self
    }

    /// Set the image format and colour space.
    pub fn with_format(mut self, format: vk::Format, color_space: vk::ColorSpaceKHR) -> Self {
        self.format = format;
        self.color_space = color_space;
        self
    }

    /// Set the preferred present mode.
    pub fn with_present_mode(mut self, mode: vk::PresentModeKHR) -> Self {
        self.present_mode = mode;
        self
    }

    /// Whether an unsupported present mode falls back to FIFO.
    pub fn with_fallback_to_fifo(mut self, fallback: bool) -> Self {
        self.fallback_to_fifo = fallback;
        self
    }

    /// Fit the configuration to what the surface reports.
    ///
    /// The extent follows the surface when it dictates one and is clamped
    /// otherwise. With `fallback_to_fifo` an unsupported present mode is
    /// replaced by FIFO. Format and image count are left for validation.
    pub fn adapted_to(mut self, support: &SurfaceSupport) -> Self {
        self.extent = calculate_extent(
            &support.capabilities,
            self.extent.width,
            self.extent.height,
        );

        if self.fallback_to_fifo {
            let mode = support.recommended_present_mode(self.present_mode);
            if mode != self.present_mode {
                tracing::warn!(
                    "Present mode {:?} unsupported, falling back to {mode:?}",
                    self.present_mode
                );
                self.present_mode = mode;
            }
        }

        self
    }
}

/// Clamp a desired image count to the surface limits. A maximum of zero
/// means the surface has no upper bound.
pub fn clamp_image_count(desired: u32, capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let count = desired.max(capabilities.min_image_count);
    if capabilities.max_image_count > 0 {
        count.min(capabilities.max_image_count)
    } else {
        count
    }
}

/// Calculate swapchain extent.
pub fn calculate_extent(
    capabilities: &vk::SurfaceCapabilitiesKHR,
    desired_width: u32,
    desired_height: u32,
) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        capabilities.current_extent
    } else {
        vk::Extent2D {
            width: desired_width.clamp(
                capabilities.min_image_extent.width,
                capabilities.max_image_extent.width,
            ),
            height: desired_height.clamp(
                capabilities.min_image_extent.height,
                capabilities.max_image_extent.height,
            ),
        }
    }
}

fn validate(config: &SwapchainConfig, support: &SurfaceSupport) -> Result<()> {
    let caps = &support.capabilities;
    let extent = config.extent;

    if extent.width < caps.min_image_extent.width
        || extent.height < caps.min_image_extent.height
        || extent.width > caps.max_image_extent.width
        || extent.height > caps.max_image_extent.height
    {
        return Err(GpuError::SwapchainCreation(format!(
            "extent {}x{} outside surface range {}x{}..={}x{}",
            extent.width,
            extent.height,
            caps.min_image_extent.width,
            caps.min_image_extent.height,
            caps.max_image_extent.width,
            caps.max_image_extent.height,
        )));
    }

    if !support.supports_format(config.format, config.color_space) {
        return Err(GpuError::SwapchainCreation(format!(
            "surface format {:?} / {:?} unsupported",
            config.format, config.color_space
        )));
    }

    if !support.supports_present_mode(config.present_mode) {
        return Err(GpuError::SwapchainCreation(format!(
            "present mode {:?} unsupported",
            config.present_mode
        )));
    }

    Ok(())
}

/// The swapchain, its images and one view per image.
///
/// Views and swapchain are destroyed on drop. Must be dropped before the
/// logical device.
pub struct SwapchainResources {
    driver: Arc<dyn Driver>,
    device: vk::Device,
    handle: vk::SwapchainKHR,
    images: Vec<vk::Image>,
    image_views: Vec<vk::ImageView>,
    format: vk::Format,
    extent: vk::Extent2D,
    present_mode: vk::PresentModeKHR,
}

impl SwapchainResources {
    /// Create the swapchain and its image views.
    pub fn new(
        device: &LogicalDevice,
        surface: &PresentationSurface,
        config: &SwapchainConfig,
    ) -> Result<Self> {
        let selection = device.selection();
        let present_family = selection.present.ok_or_else(|| {
            GpuError::SwapchainCreation("no presentation queue family selected".to_string())
        })?;
        let graphics_family = selection.graphics.ok_or_else(|| {
            GpuError::SwapchainCreation("no graphics queue family selected".to_string())
        })?;

        let support = SurfaceSupport::query(device, surface)?;
        validate(config, &support)?;

        let image_count = clamp_image_count(config.image_count, &support.capabilities);
        let request = SwapchainRequest {
            surface: surface.handle(),
            min_image_count: image_count,
            format: config.format,
            color_space: config.color_space,
            extent: config.extent,
            usage: vk::ImageUsageFlags::COLOR_ATTACHMENT,
            sharing: SharingMode::for_families(graphics_family, present_family),
            pre_transform: support.capabilities.current_transform,
            present_mode: config.present_mode,
        };

        let driver = device.driver().clone();
        let device = device.handle();

        // SAFETY: device and surface are alive and belong to one instance.
        let handle = unsafe { driver.create_swapchain(device, &request) }
            .map_err(|e| GpuError::SwapchainCreation(e.to_string()))?;

        let mut resources = Self {
            driver,
            device,
            handle,
            images: Vec::new(),
            image_views: Vec::new(),
            format: config.format,
            extent: config.extent,
            present_mode: config.present_mode,
        };

        // From here on an early return drops `resources`, releasing every
        // view created so far and then the swapchain.
        // SAFETY: the swapchain was just created on this device.
        resources.images = unsafe { resources.driver.swapchain_images(device, handle)? };
        resources.image_views.reserve(resources.images.len());

        for (index, &image) in resources.images.iter().enumerate() {
            let view_request = ImageViewRequest {
                image,
                format: config.format,
            };
            // SAFETY: the image belongs to the live swapchain.
            let view = unsafe { resources.driver.create_image_view(device, &view_request) }
                .map_err(|result| GpuError::ImageViewCreation { index, result })?;
            resources.image_views.push(view);
        }

        tracing::info!(
            "Swapchain created: {}x{}, {} images, {:?}, {:?}",
            resources.extent.width,
            resources.extent.height,
            resources.images.len(),
            resources.format,
            resources.present_mode
        );

        Ok(resources)
    }

    /// Get the swapchain handle.
    pub fn handle(&self) -> vk::SwapchainKHR {
        self.handle
    }

    /// Swapchain images, in presentation index order.
    pub fn images(&self) -> &[vk::Image] {
        &self.images
    }

    /// One view per image, same order as [`Self::images`].
    pub fn image_views(&self) -> &[vk::ImageView] {
        &self.image_views
    }

    /// Image extent.
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    /// Image format.
    pub fn format(&self) -> vk::Format {
        self.format
    }

    /// Present mode in use.
    pub fn present_mode(&self) -> vk::PresentModeKHR {
        self.present_mode
    }
}

impl Drop for SwapchainResources {
    fn drop(&mut self) {
        // SAFETY: the views and swapchain were created on this device, which
        // outlives this value.
        unsafe {
            for view in self.image_views.drain(..).rev() {
                self.driver.destroy_image_view(self.device, view);
            }
            self.driver.destroy_swapchain(self.device, self.handle);
        }
        tracing::debug!("Swapchain destroyed");
    }
}
