//! Instance and debug messenger creation.

use crate::capabilities::{missing_layers, required_instance_extensions, validation_layers};
use crate::debug::{DiagnosticSink, TracingSink};
use crate::driver::{Driver, InstanceRequest, MessengerRequest};
use crate::error::{GpuError, Result};
use ash::vk;
use std::ffi::{CStr, CString};
use std::sync::Arc;

/// Root of the GPU object hierarchy: the instance and, when diagnostics are
/// enabled, the debug messenger.
///
/// Dropping the context destroys the messenger and then the instance, so it
/// must outlive every surface, device and swapchain created from it.
pub struct GraphicsContext {
    driver: Arc<dyn Driver>,
    instance: vk::Instance,
    debug_messenger: Option<vk::DebugUtilsMessengerEXT>,
    extensions: Vec<CString>,
    layers: Vec<CString>,
}

impl GraphicsContext {
    /// The driver this context was created with.
    pub fn driver(&self) -> &Arc<dyn Driver> {
        &self.driver
    }

    /// Get the Vulkan instance handle.
    pub fn instance(&self) -> vk::Instance {
        self.instance
    }

    /// Whether a debug messenger is active.
    pub fn diagnostics_enabled(&self) -> bool {
        self.debug_messenger.is_some()
    }

    /// Instance extensions that were enabled.
    pub fn extensions(&self) -> &[CString] {
        &self.extensions
    }

    /// Instance layers that were enabled.
    pub fn layers(&self) -> &[CString] {
        &self.layers
    }
}

impl Drop for GraphicsContext {
    fn drop(&mut self) {
        // SAFETY: both handles were created by `self.driver` and every child
        // object is owned by values that must be dropped before the context.
        unsafe {
            if let Some(messenger) = self.debug_messenger.take() {
                self.driver.destroy_debug_messenger(self.instance, messenger);
                tracing::debug!("Debug messenger destroyed");
            }
            self.driver.destroy_instance(self.instance);
        }
        tracing::debug!("Vulkan instance destroyed");
    }
}

/// Builder for creating a graphics context.
pub struct GraphicsContextBuilder {
    app_name: String,
    engine_name: String,
    api_version: u32,
    diagnostics: bool,
    layers: Vec<CString>,
    severities: vk::DebugUtilsMessageSeverityFlagsEXT,
    categories: vk::DebugUtilsMessageTypeFlagsEXT,
    platform_extensions: Vec<CString>,
    sink: Arc<dyn DiagnosticSink>,
}

impl Default for GraphicsContextBuilder {
    fn default() -> Self {
        Self {
            app_name: "Shinobi".to_string(),
            engine_name: "Shinobi Render Engine".to_string(),
            api_version: vk::API_VERSION_1_1,
            diagnostics: cfg!(debug_assertions),
            layers: validation_layers(),
            severities: vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
            categories: vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
            platform_extensions: Vec::new(),
            sink: Arc::new(TracingSink),
        }
    }
}

impl GraphicsContextBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the application name.
    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = name.into();
        self
    }

    /// Set the engine name.
    pub fn engine_name(mut self, name: impl Into<String>) -> Self {
        self.engine_name = name.into();
        self
    }

    /// Set the Vulkan API version requested from the instance.
    pub fn api_version(mut self, version: u32) -> Self {
        self.api_version = version;
        self
    }

    /// Enable or disable validation diagnostics.
    pub fn diagnostics(mut self, enable: bool) -> Self {
        self.diagnostics = enable;
        self
    }

    /// Replace the layers enabled with diagnostics.
    pub fn layers(mut self, layers: Vec<CString>) -> Self {
        self.layers = layers;
        self
    }

    /// Severities forwarded to the diagnostic sink.
    pub fn severities(mut self, severities: vk::DebugUtilsMessageSeverityFlagsEXT) -> Self {
        self.severities = severities;
        self
    }

    /// Message categories forwarded to the diagnostic sink.
    pub fn categories(mut self, categories: vk::DebugUtilsMessageTypeFlagsEXT) -> Self {
        self.categories = categories;
        self
    }

    /// Instance extensions required by the window system.
    pub fn platform_extensions(mut self, extensions: Vec<CString>) -> Self {
        self.platform_extensions = extensions;
        self
    }

    /// Receiver of validation messages.
    pub fn sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Build the graphics context.
    pub fn build(self, driver: Arc<dyn Driver>) -> Result<GraphicsContext> {
        let extensions: Vec<CString> =
            required_instance_extensions(&self.platform_extensions, self.diagnostics)
                .into_iter()
                .collect();

        let layers = if self.diagnostics {
            let missing = missing_layers(driver.as_ref(), &self.layers)?;
            if !missing.is_empty() {
                return Err(GpuError::Configuration(format!(
                    "diagnostics requested but layers are unavailable: {}",
                    join_names(&missing)
                )));
            }
            self.layers.clone()
        } else {
            Vec::new()
        };

        let request = InstanceRequest {
            app_name: to_c_string(&self.app_name, "application name")?,
            app_version: vk::make_api_version(0, 1, 0, 0),
            engine_name: to_c_string(&self.engine_name, "engine name")?,
            engine_version: vk::make_api_version(0, 1, 0, 0),
            api_version: self.api_version,
            extensions,
            layers,
        };

        let instance = driver.create_instance(&request).map_err(|e| {
            GpuError::ContextCreation(format!(
                "{e} (Vulkan {}.{}, extensions: {}, layers: {})",
                vk::api_version_major(self.api_version),
                vk::api_version_minor(self.api_version),
                join_names(&request.extensions),
                join_names(&request.layers),
            ))
        })?;

        tracing::info!(
            "Vulkan instance created ({} extensions, {} layers)",
            request.extensions.len(),
            request.layers.len()
        );

        let mut context = GraphicsContext {
            driver,
            instance,
            debug_messenger: None,
            extensions: request.extensions,
            layers: request.layers,
        };

        if self.diagnostics {
            let messenger_request = MessengerRequest {
                severities: self.severities,
                categories: self.categories,
                sink: self.sink,
            };
            // SAFETY: the instance was just created by this driver. On
            // failure `context` drops and destroys it.
            let messenger = unsafe {
                context
                    .driver
                    .create_debug_messenger(instance, &messenger_request)
            }
            .map_err(GpuError::DebugSink)?;
            context.debug_messenger = Some(messenger);
            tracing::info!("Debug messenger created");
        }

        Ok(context)
    }
}

fn to_c_string(value: &str, what: &str) -> Result<CString> {
    CString::new(value)
        .map_err(|_| GpuError::Configuration(format!("{what} contains a NUL byte: {value:?}")))
}

pub(crate) fn join_names(names: &[CString]) -> String {
    names
        .iter()
        .map(|name| name.to_string_lossy())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Convenience for comparing against `ash` extension name constants.
pub(crate) fn contains_name(names: &[CString], name: &CStr) -> bool {
    names.iter().any(|candidate| candidate.as_c_str() == name)
}
