//! Shinobi Render Engine viewer
//!
//! Opens a window, creates the Vulkan instance, picks a GPU, creates the
//! logical device and swapchain, then waits until the window is closed.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p shinobi-viewer -- [OPTIONS]
//! ```
//!
//! ## Options
//!
//! - `--validation`: Enable Vulkan validation layers (default in debug builds)
//! - `--no-validation`: Disable Vulkan validation layers
//! - `--images <N>`: Desired swapchain image count (default: 3)
//! - `--present-mode <MODE>`: fifo, mailbox or immediate (default: mailbox)
//! - `--size <WxH>`: Window size (default: 900x600)
//! - `-h, --help`: Print help message
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: Set log level (e.g., info, debug, trace)

mod args;

use shinobi_app::{run_app, AppConfig};

fn main() -> anyhow::Result<()> {
    // Check for help flag before starting the app
    if std::env::args().any(|arg| arg == "-h" || arg == "--help") {
        print_help();
        return Ok(());
    }

    let args: Vec<String> = std::env::args().skip(1).collect();
    run_app(args::apply(AppConfig::default(), &args))
}

fn print_help() {
    eprintln!(
        "Shinobi Render Engine viewer

USAGE:
    shinobi-viewer [OPTIONS]

OPTIONS:
    --validation             Enable Vulkan validation layers
    --no-validation          Disable Vulkan validation layers
    --images <N>             Desired swapchain image count [default: 3]
    --present-mode <MODE>    fifo, mailbox or immediate [default: mailbox]
    --size <WxH>             Window size [default: 900x600]
    -h, --help               Print help

ENVIRONMENT:
    RUST_LOG                 Log filter (e.g. info, debug, shinobi_gpu=trace)"
    );
}
