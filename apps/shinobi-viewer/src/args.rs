//! Command-line flags.

use ash::vk;
use shinobi_app::AppConfig;

/// Apply command-line flags to a config. Unknown flags and unparsable
/// values are ignored.
pub fn apply(mut config: AppConfig, args: &[String]) -> AppConfig {
    let mut i = 0;
    while i < args.len() {
        let value = args.get(i + 1).map(String::as_str);
        match args[i].as_str() {
            "--validation" => config.validation = true,
            "--no-validation" => config.validation = false,
            "--images" => {
                if let Some(count) = value.and_then(|v| v.parse().ok()) {
                    config.image_count = count;
                    i += 1;
                }
            }
            "--present-mode" => {
                if let Some(mode) = value.and_then(parse_present_mode) {
                    config.present_mode = mode;
                    i += 1;
                }
            }
            "--size" => {
                if let Some((width, height)) = value.and_then(parse_size) {
                    config = config.with_size(width, height);
                    i += 1;
                }
            }
            _ => {}
        }
        i += 1;
    }
    config
}

fn parse_present_mode(value: &str) -> Option<vk::PresentModeKHR> {
    match value.to_ascii_lowercase().as_str() {
        "fifo" => Some(vk::PresentModeKHR::FIFO),
        "mailbox" => Some(vk::PresentModeKHR::MAILBOX),
        "immediate" => Some(vk::PresentModeKHR::IMMEDIATE),
        _ => None,
    }
}

fn parse_size(value: &str) -> Option<(u32, u32)> {
    let (width, height) = value.split_once(['x', 'X'])?;
    let width = width.parse().ok().filter(|&w| w > 0)?;
    let height = height.parse().ok().filter(|&h| h > 0)?;
    Some((width, height))
}
