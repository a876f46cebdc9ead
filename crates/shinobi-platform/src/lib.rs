//! Window system integration for the Shinobi render engine.
//!
//! Provides window attributes for winit and the instance extensions a
//! window's display needs for Vulkan surface creation.

use ash::vk;
use raw_window_handle::HasDisplayHandle;
use std::ffi::{CStr, CString};
use thiserror::Error;
use winit::dpi::LogicalSize;
use winit::window::WindowAttributes;

#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("Window handle unavailable: {0}")]
    Handle(#[from] raw_window_handle::HandleError),
    #[error("Display not supported by Vulkan: {0}")]
    UnsupportedDisplay(vk::Result),
}

pub type Result<T> = std::result::Result<T, PlatformError>;

/// Platform configuration.
#[derive(Debug, Clone)]
pub struct PlatformConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub resizable: bool,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            title: "Shinobi Render Engine".to_string(),
            width: 900,
            height: 600,
            resizable: false,
        }
    }
}

impl PlatformConfig {
    /// Set the window title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Set the window size.
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Attributes for creating the window.
    pub fn window_attributes(&self) -> WindowAttributes {
        WindowAttributes::default()
            .with_title(self.title.clone())
            .with_inner_size(LogicalSize::new(self.width, self.height))
            .with_resizable(self.resizable)
    }
}

/// Instance extensions needed to create surfaces on this window's display.
pub fn required_extensions<W: HasDisplayHandle>(window: &W) -> Result<Vec<CString>> {
    let display = window.display_handle()?.as_raw();
    let names = ash_window::enumerate_required_extensions(display)
        .map_err(PlatformError::UnsupportedDisplay)?;

    // SAFETY: ash-window returns pointers to static, NUL-terminated
    // extension name constants.
    let extensions: Vec<CString> = names
        .iter()
        .map(|&name| unsafe { CStr::from_ptr(name) }.to_owned())
        .collect();

    tracing::debug!(
        "Display requires instance extensions: {}",
        extensions
            .iter()
            .map(|name| name.to_string_lossy())
            .collect::<Vec<_>>()
            .join(", ")
    );

    Ok(extensions)
}
