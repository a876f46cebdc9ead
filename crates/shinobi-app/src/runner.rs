//! Application runner and event loop.

use std::ffi::CString;
use std::sync::Arc;

use ash::vk;
use shinobi_gpu::{DeviceRequirements, GraphicsContextBuilder, SwapchainConfig};
use shinobi_platform::PlatformConfig;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::WindowId;

use crate::context::AppContext;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Window title, also reported to the driver as the application name.
    pub title: String,
    /// Initial window width.
    pub width: u32,
    /// Initial window height.
    pub height: u32,
    /// Enable Vulkan validation layers (default: debug builds only).
    pub validation: bool,
    /// Desired number of swapchain images.
    pub image_count: u32,
    /// Preferred present mode.
    pub present_mode: vk::PresentModeKHR,
}

impl Default for AppConfig {
    fn default() -> Self {
        let platform = PlatformConfig::default();
        let swapchain = SwapchainConfig::default();
        Self {
            title: platform.title,
            width: platform.width,
            height: platform.height,
            validation: cfg!(debug_assertions),
            image_count: swapchain.image_count,
            present_mode: swapchain.present_mode,
        }
    }
}

impl AppConfig {
    /// Create a new config with the given title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    /// Set the window dimensions.
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Enable or disable validation layers.
    pub fn with_validation(mut self, validation: bool) -> Self {
        self.validation = validation;
        self
    }

    /// Set the desired swapchain image count.
    pub fn with_image_count(mut self, count: u32) -> Self {
        self.image_count = count;
        self
    }

    /// Set the preferred present mode.
    pub fn with_present_mode(mut self, mode: vk::PresentModeKHR) -> Self {
        self.present_mode = mode;
        self
    }

    /// Window settings.
    pub fn platform_config(&self) -> PlatformConfig {
        PlatformConfig::default()
            .with_title(self.title.clone())
            .with_size(self.width, self.height)
    }

    /// Context settings for a display needing `platform_extensions`.
    pub fn context_builder(&self, platform_extensions: Vec<CString>) -> GraphicsContextBuilder {
        GraphicsContextBuilder::new()
            .app_name(self.title.clone())
            .diagnostics(self.validation)
            .platform_extensions(platform_extensions)
    }

    /// Device requirements: graphics, presentation and the swapchain
    /// extension.
    pub fn device_requirements(&self) -> DeviceRequirements {
        DeviceRequirements::default()
    }

    /// Swapchain settings sized to the configured window.
    pub fn swapchain_config(&self) -> SwapchainConfig {
        SwapchainConfig::default()
            .with_extent(self.width, self.height)
            .with_image_count(self.image_count)
            .with_present_mode(self.present_mode)
    }
}

/// Open the window, bootstrap the GPU and run until the window closes.
///
/// Returns the bootstrap error if the GPU could not be brought up.
pub fn run_app(config: AppConfig) -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("{} starting...", config.title);

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut runner = AppRunner {
        config,
        state: None,
        startup_error: None,
    };

    event_loop.run_app(&mut runner)?;

    match runner.startup_error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Internal application runner that implements winit's ApplicationHandler.
struct AppRunner {
    config: AppConfig,
    state: Option<AppContext>,
    startup_error: Option<anyhow::Error>,
}

impl ApplicationHandler for AppRunner {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }

        info!("Creating application state...");

        match self.create_state(event_loop) {
            Ok(state) => {
                let swapchain = state.session.swapchain();
                info!(
                    "Ready: {} swapchain images at {}x{}",
                    swapchain.images().len(),
                    swapchain.extent().width,
                    swapchain.extent().height
                );
                self.state = Some(state);
            }
            Err(e) => {
                error!("Failed to initialize application: {e:#}");
                self.startup_error = Some(e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        if let WindowEvent::CloseRequested = event {
            info!("Close requested");
            // Drops the GPU session, then the window.
            self.state = None;
            event_loop.exit();
        }
    }
}

impl AppRunner {
    fn create_state(&self, event_loop: &ActiveEventLoop) -> anyhow::Result<AppContext> {
        let attributes = self.config.platform_config().window_attributes();
        let window = Arc::new(event_loop.create_window(attributes)?);

        AppContext::new(window, &self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_engine_window_and_swapchain() {
        let config = AppConfig::default();
        assert_eq!(config.title, "Shinobi Render Engine");
        assert_eq!((config.width, config.height), (900, 600));
        assert_eq!(config.validation, cfg!(debug_assertions));
        assert_eq!(config.image_count, 3);
        assert_eq!(config.present_mode, vk::PresentModeKHR::MAILBOX);
    }

    #[test]
    fn swapchain_config_follows_app_config() {
        let config = AppConfig::new("Test")
            .with_size(1280, 720)
            .with_image_count(2)
            .with_present_mode(vk::PresentModeKHR::FIFO);
        let swapchain = config.swapchain_config();

        assert_eq!(
            (swapchain.extent.width, swapchain.extent.height),
            (1280, 720)
        );
        assert_eq!(swapchain.image_count, 2);
        assert_eq!(swapchain.present_mode, vk::PresentModeKHR::FIFO);
        assert!(swapchain.fallback_to_fifo);

        let platform = config.platform_config();
        assert_eq!(platform.title, "Test");
        assert_eq!((platform.width, platform.height), (1280, 720));
    }

    #[test]
    fn validation_flag_and_device_requirements() {
        assert!(AppConfig::default().with_validation(true).validation);
        assert!(!AppConfig::default().with_validation(false).validation);

        let requirements = AppConfig::default().device_requirements();
        assert!(requirements.present);
        assert_eq!(
            requirements.extensions,
            vec![ash::khr::swapchain::NAME.to_owned()]
        );
    }
}
