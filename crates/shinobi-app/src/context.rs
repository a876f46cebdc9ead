//! Application context.

use std::sync::Arc;

use shinobi_gpu::{AshDriver, GpuSession, PresentationSurface};
use winit::window::Window;

use crate::runner::AppConfig;

/// The window and the GPU session bootstrapped against it.
///
/// The session is declared first so that it, and the surface inside it, is
/// dropped before the window.
pub struct AppContext {
    /// GPU session with device, queues and swapchain.
    pub session: GpuSession,
    /// The window handle.
    pub window: Arc<Window>,
}

impl AppContext {
    /// Bootstrap the GPU session for a window.
    pub(crate) fn new(window: Arc<Window>, config: &AppConfig) -> anyhow::Result<Self> {
        let platform_extensions = shinobi_platform::required_extensions(window.as_ref())?;
        let driver = Arc::new(AshDriver::load()?);

        let size = window.inner_size();
        let swapchain = config
            .swapchain_config()
            .with_extent(size.width.max(1), size.height.max(1));

        let session = GpuSession::bootstrap(
            driver,
            config.context_builder(platform_extensions),
            &config.device_requirements(),
            &swapchain,
            // SAFETY: the window is stored next to the session and outlives it.
            |context| unsafe { PresentationSurface::from_window(context, window.as_ref()) },
        )?;

        Ok(Self { session, window })
    }
}
