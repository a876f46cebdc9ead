//! Vulkan bootstrap for the Shinobi render engine.
//!
//! This crate provides:
//! - Layer and instance extension probing
//! - Instance creation with an optional validation debug messenger
//! - Physical device and queue family selection
//! - Logical device and queue provisioning
//! - Swapchain and image view creation
//!
//! [`GpuSession::bootstrap`] runs the whole sequence. Every Vulkan call goes
//! through the [`Driver`] trait; [`AshDriver`] is the real implementation.

pub mod capabilities;
pub mod context;
pub mod debug;
pub mod device;
pub mod driver;
pub mod error;
pub mod physical_device;
pub mod session;
pub mod surface;
pub mod swapchain;
pub mod vulkan;

#[cfg(test)]
mod testing;

pub use capabilities::{
    has_layer_support, required_instance_extensions, validation_layers, DeviceInfo, GpuVendor,
};
pub use context::{GraphicsContext, GraphicsContextBuilder};
pub use debug::{DiagnosticRecord, DiagnosticSink, Severity, TracingSink};
pub use device::LogicalDevice;
pub use driver::{Driver, SharingMode};
pub use error::{GpuError, Result};
pub use physical_device::{
    probe_queue_families, select_device, DeviceRequirements, PhysicalDeviceCandidate,
    QueueFamilySelection,
};
pub use session::GpuSession;
pub use surface::{PresentationSurface, SurfaceSupport};
pub use swapchain::{calculate_extent, clamp_image_count, SwapchainConfig, SwapchainResources};
pub use vulkan::AshDriver;
