//! GPU bootstrap error types.

use ash::vk;
use thiserror::Error;

/// Errors raised while bringing up or tearing down the GPU context.
///
/// Every variant is terminal for the bootstrap sequence. Resources acquired
/// before the failing step have already been released when the caller sees
/// the error.
#[derive(Error, Debug)]
pub enum GpuError {
    /// Diagnostics were requested but the driver cannot provide them.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The Vulkan loader or instance creation failed.
    #[error("Instance creation failed: {0}")]
    ContextCreation(String),

    /// The debug messenger could not be registered.
    #[error("Debug messenger creation failed: {0}")]
    DebugSink(vk::Result),

    /// The instance reports no physical devices at all.
    #[error("No Vulkan-capable physical device found")]
    NoDevice,

    /// Physical devices exist but none meets the requirements.
    #[error("No suitable physical device: {0}")]
    NoSuitableDevice(String),

    /// The driver rejected the logical device configuration.
    #[error("Logical device creation failed: {0}")]
    DeviceCreation(String),

    /// A queue that was requested at device creation is missing.
    #[error("Failed to retrieve {role} queue from family {family}")]
    QueueRetrieval {
        /// Role the queue was requested for.
        role: &'static str,
        /// Queue family index.
        family: u32,
    },

    /// Presentation surface creation failed.
    #[error("Surface creation failed: {0}")]
    SurfaceCreation(String),

    /// Swapchain creation was rejected.
    #[error("Swapchain creation failed: {0}")]
    SwapchainCreation(String),

    /// An image view for a swapchain image could not be created.
    #[error("Image view creation failed for swapchain image {index}: {result}")]
    ImageViewCreation {
        /// Position of the image in the swapchain.
        index: usize,
        /// Driver result.
        result: vk::Result,
    },

    /// A driver query failed.
    #[error("Vulkan error: {0}")]
    Vulkan(#[from] vk::Result),
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, GpuError>;
