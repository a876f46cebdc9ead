//! Application runner for the Shinobi render engine.
//!
//! Opens the window, bootstraps the GPU session against it and keeps the
//! event loop running until the window is closed.
//!
//! # Example
//!
//! ```no_run
//! use shinobi_app::{run_app, AppConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     run_app(AppConfig::default().with_image_count(2))
//! }
//! ```

mod context;
mod runner;

pub use context::AppContext;
pub use runner::{run_app, AppConfig};

// Re-export commonly used types for convenience
pub use shinobi_gpu::{GpuSession, SwapchainConfig};
pub use winit::event::WindowEvent;
