//! Driver boundary.
//!
//! Every Vulkan call made during bootstrap goes through [`Driver`]. The
//! production implementation is [`AshDriver`](crate::vulkan::AshDriver);
//! the request types below are plain owned data so that an implementation
//! never has to keep borrowed create-info chains alive.

use crate::capabilities::DeviceInfo;
use crate::debug::DiagnosticSink;
use ash::prelude::VkResult;
use ash::vk;
use raw_window_handle::{RawDisplayHandle, RawWindowHandle};
use std::ffi::CString;
use std::fmt;
use std::sync::Arc;

/// Parameters for `vkCreateInstance`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceRequest {
    pub app_name: CString,
    pub app_version: u32,
    pub engine_name: CString,
    pub engine_version: u32,
    pub api_version: u32,
    pub extensions: Vec<CString>,
    pub layers: Vec<CString>,
}

/// Parameters for `vkCreateDebugUtilsMessengerEXT`.
#[derive(Clone)]
pub struct MessengerRequest {
    /// Severities forwarded to the sink.
    pub severities: vk::DebugUtilsMessageSeverityFlagsEXT,
    /// Message categories forwarded to the sink.
    pub categories: vk::DebugUtilsMessageTypeFlagsEXT,
    /// Receiver of the diagnostic stream.
    pub sink: Arc<dyn DiagnosticSink>,
}

impl fmt::Debug for MessengerRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessengerRequest")
            .field("severities", &self.severities)
            .field("categories", &self.categories)
            .finish_non_exhaustive()
    }
}

/// One queue requested from a family.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueueRequest {
    pub family: u32,
    pub priority: f32,
}

/// Parameters for `vkCreateDevice`.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceRequest {
    pub queues: Vec<QueueRequest>,
    pub extensions: Vec<CString>,
}

/// How swapchain images are shared between queue families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SharingMode {
    /// Owned by one family at a time; no family list is passed.
    Exclusive,
    /// Shared between exactly these two distinct families.
    Concurrent([u32; 2]),
}

impl SharingMode {
    /// Sharing mode for the given graphics and present families.
    pub fn for_families(graphics: u32, present: u32) -> Self {
        if graphics == present {
            Self::Exclusive
        } else {
            Self::Concurrent([graphics, present])
        }
    }

    /// The Vulkan sharing mode.
    pub fn vk_mode(&self) -> vk::SharingMode {
        match self {
            Self::Exclusive => vk::SharingMode::EXCLUSIVE,
            Self::Concurrent(_) => vk::SharingMode::CONCURRENT,
        }
    }

    /// Queue family indices to pass with the sharing mode.
    pub fn family_indices(&self) -> &[u32] {
        match self {
            Self::Exclusive => &[],
            Self::Concurrent(families) => families,
        }
    }
}

/// Parameters for `vkCreateSwapchainKHR`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapchainRequest {
    pub surface: vk::SurfaceKHR,
    pub min_image_count: u32,
    pub format: vk::Format,
    pub color_space: vk::ColorSpaceKHR,
    pub extent: vk::Extent2D,
    pub usage: vk::ImageUsageFlags,
    pub sharing: SharingMode,
    pub pre_transform: vk::SurfaceTransformFlagsKHR,
    pub present_mode: vk::PresentModeKHR,
}

/// Parameters for a 2D colour view of a swapchain image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageViewRequest {
    pub image: vk::Image,
    pub format: vk::Format,
}

/// The calls the bootstrap sequence makes into a Vulkan driver.
///
/// The driver holds at most one instance and one logical device at a time.
///
/// # Safety
/// Methods marked `unsafe` take raw handles. Callers must pass handles
/// created by the same driver that have not been destroyed yet, and must
/// destroy children before their parents.
pub trait Driver {
    /// Names of the instance layers the loader can enable.
    fn instance_layer_names(&self) -> VkResult<Vec<CString>>;

    /// Create the instance.
    fn create_instance(&self, request: &InstanceRequest) -> VkResult<vk::Instance>;

    /// Destroy the instance.
    unsafe fn destroy_instance(&self, instance: vk::Instance);

    /// Register a debug messenger on the instance.
    unsafe fn create_debug_messenger(
        &self,
        instance: vk::Instance,
        request: &MessengerRequest,
    ) -> VkResult<vk::DebugUtilsMessengerEXT>;

    /// Unregister a debug messenger.
    unsafe fn destroy_debug_messenger(
        &self,
        instance: vk::Instance,
        messenger: vk::DebugUtilsMessengerEXT,
    );

    /// Create a presentation surface for a native window.
    ///
    /// The window behind the raw handles must outlive the surface.
    unsafe fn create_surface(
        &self,
        instance: vk::Instance,
        display: RawDisplayHandle,
        window: RawWindowHandle,
    ) -> VkResult<vk::SurfaceKHR>;

    /// Destroy a presentation surface.
    unsafe fn destroy_surface(&self, instance: vk::Instance, surface: vk::SurfaceKHR);

    /// Physical devices visible to the instance.
    unsafe fn enumerate_physical_devices(
        &self,
        instance: vk::Instance,
    ) -> VkResult<Vec<vk::PhysicalDevice>>;

    /// Identity and type of a physical device.
    unsafe fn device_info(&self, physical_device: vk::PhysicalDevice) -> VkResult<DeviceInfo>;

    /// Queue families of a physical device, in index order.
    unsafe fn queue_families(
        &self,
        physical_device: vk::PhysicalDevice,
    ) -> VkResult<Vec<vk::QueueFamilyProperties>>;

    /// Device extensions a physical device supports.
    unsafe fn device_extension_names(
        &self,
        physical_device: vk::PhysicalDevice,
    ) -> VkResult<Vec<CString>>;

    /// Whether a queue family can present to the surface.
    unsafe fn surface_support(
        &self,
        physical_device: vk::PhysicalDevice,
        family: u32,
        surface: vk::SurfaceKHR,
    ) -> VkResult<bool>;

    /// Current surface capabilities.
    unsafe fn surface_capabilities(
        &self,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<vk::SurfaceCapabilitiesKHR>;

    /// Supported surface formats.
    unsafe fn surface_formats(
        &self,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<Vec<vk::SurfaceFormatKHR>>;

    /// Supported present modes.
    unsafe fn surface_present_modes(
        &self,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<Vec<vk::PresentModeKHR>>;

    /// Create the logical device.
    unsafe fn create_device(
        &self,
        physical_device: vk::PhysicalDevice,
        request: &DeviceRequest,
    ) -> VkResult<vk::Device>;

    /// Fetch a queue created with the device. Returns a null handle when the
    /// queue does not exist.
    unsafe fn device_queue(&self, device: vk::Device, family: u32, index: u32) -> vk::Queue;

    /// Block until the device is idle.
    unsafe fn device_wait_idle(&self, device: vk::Device) -> VkResult<()>;

    /// Destroy the logical device.
    unsafe fn destroy_device(&self, device: vk::Device);

    /// Create a swapchain.
    unsafe fn create_swapchain(
        &self,
        device: vk::Device,
        request: &SwapchainRequest,
    ) -> VkResult<vk::SwapchainKHR>;

    /// Images owned by a swapchain.
    unsafe fn swapchain_images(
        &self,
        device: vk::Device,
        swapchain: vk::SwapchainKHR,
    ) -> VkResult<Vec<vk::Image>>;

    /// Destroy a swapchain.
    unsafe fn destroy_swapchain(&self, device: vk::Device, swapchain: vk::SwapchainKHR);

    /// Create a view of a swapchain image.
    unsafe fn create_image_view(
        &self,
        device: vk::Device,
        request: &ImageViewRequest,
    ) -> VkResult<vk::ImageView>;

    /// Destroy an image view.
    unsafe fn destroy_image_view(&self, device: vk::Device, view: vk::ImageView);
}
